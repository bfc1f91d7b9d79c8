#![forbid(unsafe_code)]

//! Mount Visibility Tester (mvt) — measures bind-mount propagation latency
//! between host filesystem mutations and container visibility.
//!
//! One invocation is a bounded experiment: provision a pool of
//! (host dir, container) environments, run N probe-then-poll samples, and
//! emit a JSON report with percentile statistics. Reported latencies
//! include per-check exec round-trip overhead and are upper bounds, not
//! microsecond-accurate measurements.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use mount_visibility_tester::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use mount_visibility_tester::core::config::Config;
//! use mount_visibility_tester::report::stats::summarize;
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod pool;
pub mod probe;
pub mod report;
pub mod runtime;
pub mod sampler;
