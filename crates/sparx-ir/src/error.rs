//! Error types for the IR crate.

use thiserror::Error;

/// Errors that can occur while building or converting IR values.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// A port reference that is not of the form `instance,port`.
    #[error("Invalid port reference '{0}': expected 'instance,port'")]
    InvalidPortRef(String),

    /// An instance name that cannot be used in a netlist.
    #[error("Invalid instance name '{name}': {reason}")]
    InvalidInstanceName {
        /// The offending name.
        name: String,
        /// Why the name was rejected.
        reason: &'static str,
    },

    /// A component name that cannot be used in a netlist.
    #[error("Invalid component name '{0}': must not contain ','")]
    InvalidComponentName(String),

    /// Port not present in a representation's port map.
    #[error("Port '{0}' not found")]
    PortNotFound(String),

    /// A port referenced on an instance that does not expose it.
    #[error("Instance '{instance}' has no port '{port}'")]
    UnknownInstancePort {
        /// Instance name.
        instance: String,
        /// Port name.
        port: String,
    },

    /// A parameter whose sweep length does not match the batch.
    #[error("Batch size mismatch for parameter '{param}': expected {expected}, got {got}")]
    BatchMismatch {
        /// The parameter name.
        param: String,
        /// Batch length established by other values.
        expected: usize,
        /// Length of the offending value.
        got: usize,
    },

    /// A parameter the model needs but the settings do not provide.
    #[error("Missing parameter '{0}'")]
    MissingParameter(String),

    /// A parameter sweep with no samples.
    #[error("Parameter '{0}' is an empty sweep")]
    EmptySweep(String),

    /// Array shapes that do not describe a valid representation.
    #[error("Shape mismatch: {0}")]
    Shape(String),

    /// A port set mixing mode-resolved and plain ports.
    #[error("Port set mixes mode-resolved and plain ports (e.g. '{0}')")]
    MixedModes(String),

    /// A mode-resolved port whose mode is not declared by the circuit.
    #[error("Port '{port}' uses undeclared mode '{mode}'")]
    UndeclaredMode {
        /// The port carrying the mode tag.
        port: String,
        /// The undeclared mode.
        mode: String,
    },

    /// A netlist referenced by name that does not exist.
    #[error("Netlist '{0}' not found")]
    NetlistNotFound(String),

    /// Netlists that (transitively) contain themselves.
    #[error("Cyclic netlist reference through '{0}'")]
    CyclicNetlist(String),

    /// Structurally invalid netlist.
    #[error("Invalid netlist: {0}")]
    InvalidNetlist(String),

    /// A leaf model failed while computing its S-matrix.
    #[error("Model error: {0}")]
    Model(String),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
