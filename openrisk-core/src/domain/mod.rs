//! Core domain types
//!
//! This module contains the core domain structures used across OpenRisk crates.
//! The orchestrator owns persistence and projection, the runner owns execution;
//! both share these shapes.

pub mod metric;
pub mod pipeline;
pub mod registry;
pub mod sample;
