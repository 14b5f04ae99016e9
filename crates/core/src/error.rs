//! Domain error shared by every crate in the workspace.
//!
//! Job failures are not errors: they are recorded on the job (see
//! [`crate::job::JobFailure`]). `CoreError` only covers requests the
//! service refuses outright.

use crate::types::JobId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No such entity. `id` is kept as text so malformed ids can be echoed.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The request itself is unusable (empty upload, bad file name).
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The request is valid but cannot be accepted in the current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Lookup miss for a job id, parsed or not.
    pub fn job_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "Job",
            id: id.to_string(),
        }
    }

    /// Shorthand used when a known [`JobId`] is missing.
    pub fn missing_job(id: &JobId) -> Self {
        Self::job_not_found(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
