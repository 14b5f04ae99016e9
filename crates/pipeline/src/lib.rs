//! Job registry and orchestration.
//!
//! Ties the core workspace and separation engine to the artifact
//! publisher: submissions become tracked jobs whose background execution
//! runs under a bounded number of worker slots.

pub mod config;
pub mod orchestrator;
pub mod registry;

pub use config::PipelineConfig;
pub use orchestrator::{Orchestrator, RUNNING_DETAIL};
pub use registry::{JobRegistry, RegistryError};
