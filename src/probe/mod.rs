//! The two halves of one measurement: host-side mutation, container-side
//! visibility polling.

pub mod mutation;
pub mod poller;
