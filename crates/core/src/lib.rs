//! Domain logic for the stem separation service.
//!
//! Everything here is transport-agnostic: job lifecycle types, artifact
//! naming conventions, message sanitization, the per-job filesystem
//! workspace, and the separation engine runner. Nothing in this crate
//! knows about HTTP or object storage.

pub mod config;
pub mod error;
pub mod job;
pub mod sanitize;
pub mod separation;
pub mod stems;
pub mod types;
pub mod workspace;
