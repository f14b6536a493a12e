//! Atelier generation worker.
//!
//! A single sequential consumer loop: claim one queue entry, drive the
//! owning job through its state machine (running, then success or
//! failed), acknowledge, repeat. Multiple worker processes may run
//! against the same queue; `FOR UPDATE SKIP LOCKED` keeps them from
//! double-claiming a live entry.

pub mod config;
pub mod runner;

pub use config::WorkerConfig;
pub use runner::Worker;
