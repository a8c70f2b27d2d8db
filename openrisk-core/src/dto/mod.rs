//! Data Transfer Objects for the HTTP API
//!
//! Request and response bodies exchanged between the operator UI and the
//! orchestrator. DTOs are thin wrappers around domain types.

pub mod advisory;
pub mod cache;
pub mod pipeline;
pub mod registry;
