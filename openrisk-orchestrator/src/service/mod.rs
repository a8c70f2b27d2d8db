//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between repositories, the runner and the provider.

pub mod advisory;
pub mod cache;
pub mod catalog;
pub mod locks;
pub mod pipeline;
pub mod registry;

// Re-export for convenience
pub use advisory as advisory_service;
pub use cache as cache_service;
pub use pipeline as pipeline_service;
pub use registry as registry_service;
