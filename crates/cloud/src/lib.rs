//! Object storage for published stem artifacts.
//!
//! [`ObjectStore`] is the seam between the pipeline and a concrete blob
//! store. [`S3Store`] targets any S3-compatible endpoint (AWS, R2, MinIO);
//! [`LocalStore`] writes into a directory for development. The
//! [`ArtifactPublisher`] applies the key/URL conventions on top.

pub mod config;
pub mod local;
pub mod provider;
pub mod publisher;
pub mod s3;

pub use config::{LocalConfig, S3Config, StorageConfig};
pub use local::LocalStore;
pub use provider::{ObjectStore, StoreError};
pub use publisher::{ArtifactPublisher, PublishError};
pub use s3::S3Store;
