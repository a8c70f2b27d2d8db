//! OpenRisk Core
//!
//! Core types and abstractions for the OpenRisk control layer.
//!
//! This crate contains:
//! - Domain types: registry records, metric summaries, pipeline steps and results
//! - DTOs: request and response bodies exchanged with the operator UI

pub mod domain;
pub mod dto;
