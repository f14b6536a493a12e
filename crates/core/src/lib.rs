//! Domain logic for the Atelier generation service.
//!
//! Pure types and functions shared by the API server and the worker.
//! This crate has no internal dependencies and touches nothing but the
//! local filesystem (artifact persistence).

pub mod artifacts;
pub mod error;
pub mod generation;
pub mod safety;
pub mod types;
