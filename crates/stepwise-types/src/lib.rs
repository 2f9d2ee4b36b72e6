//! Shared domain types for Stepwise.
//!
//! This crate contains the core domain types used across the Stepwise
//! workflow engine: workflow definitions, execution runs, step records,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod error;
pub mod workflow;
