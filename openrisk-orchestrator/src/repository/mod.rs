//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Each repository handles the files backing one domain concern.

pub mod cache;
pub mod registry;
pub mod risk_report;
pub mod sample;
pub mod scoped;

// Re-export for convenience
pub use cache as cache_repository;
pub use registry as registry_repository;
pub use risk_report as risk_report_repository;
pub use sample as sample_repository;
