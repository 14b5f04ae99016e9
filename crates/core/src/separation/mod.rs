//! Separation Runner: invokes the external source-separation engine.
//!
//! The engine is a black-box batch program. A run either succeeds, fails
//! as an engine ([`RunOutcome::EngineFailure`]), or fails operationally
//! before/while launching it ([`SeparationError`]). The two failure paths
//! are reported to clients differently.

pub mod demucs;
pub mod engine;
mod subprocess;

pub use demucs::DemucsEngine;
pub use engine::{ExitInfo, RunOutcome, SeparationEngine, SeparationError};
