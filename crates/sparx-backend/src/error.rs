//! Error types for the backend crate.

use thiserror::Error;

/// Errors produced while assembling or eliminating a port system.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    /// The connected-port sub-system could not be solved at one batch sample.
    #[error("{backend} backend: singular or non-finite system at sample {sample}: {detail}")]
    Singular {
        /// Backend that failed.
        backend: &'static str,
        /// First failing batch sample.
        sample: usize,
        /// Solver diagnostic.
        detail: String,
    },

    /// A model returned an entry for a port the plan does not know.
    #[error("Instance '{instance}' returned unknown port '{port}'")]
    UnknownPort {
        /// Instance name.
        instance: String,
        /// Port name as returned by the model.
        port: String,
    },

    /// Instance relations with incompatible batch lengths.
    #[error("Instance '{instance}' has batch length {got}, expected {expected}")]
    BatchMismatch {
        /// Instance name.
        instance: String,
        /// Batch length established by earlier instances.
        expected: usize,
        /// Batch length of this instance.
        got: usize,
    },

    /// Plan inputs that do not describe a valid port system.
    #[error("Invalid elimination plan: {0}")]
    InvalidPlan(String),

    /// Unrecognised backend name.
    #[error("Unknown backend '{0}' (expected dense, klu or forward)")]
    UnknownBackend(String),

    /// IR conversion failure.
    #[error("IR error: {0}")]
    Ir(#[from] sparx_ir::IrError),
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
