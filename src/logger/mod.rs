//! Run logging: append-only JSONL for agent-friendly consumption.

pub mod jsonl;
