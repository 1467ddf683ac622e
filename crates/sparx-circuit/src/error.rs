//! Error types for the circuit crate.

use sparx_backend::BackendError;
use sparx_ir::IrError;
use thiserror::Error;

/// Errors produced while building or evaluating a circuit.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CircuitError {
    /// A component name no model source or sub-netlist provides.
    #[error("Instance '{instance}': component '{component}' not found in any model source")]
    UnknownComponent {
        /// Instance using the component.
        instance: String,
        /// The unresolved component name.
        component: String,
    },

    /// A connection or external port that names a missing instance.
    #[error("Reference '{reference}' names unknown instance '{instance}'")]
    UnknownInstance {
        /// The missing instance.
        instance: String,
        /// The reference as written.
        reference: String,
    },

    /// A connection or external port that names a port the instance lacks.
    #[error("Instance '{instance}' has no port '{port}'")]
    UnknownPort {
        /// Instance name.
        instance: String,
        /// Port name.
        port: String,
    },

    /// An instance port referenced more than once.
    #[error("Port '{instance},{port}' is referenced more than once")]
    DuplicatePort {
        /// Instance name.
        instance: String,
        /// Port name.
        port: String,
    },

    /// An instance port that is neither connected nor exposed.
    #[error("Port '{instance},{port}' is neither connected nor exposed")]
    UnconnectedPort {
        /// Instance name.
        instance: String,
        /// Port name.
        port: String,
    },

    /// A netlist with no instances.
    #[error("Netlist has no instances")]
    EmptyNetlist,

    /// A path-addressed setting for a parameter the leaf does not declare.
    #[error("Instance '{instance}' has no parameter '{param}'")]
    UnknownParameter {
        /// Dotted instance path.
        instance: String,
        /// Parameter name.
        param: String,
    },

    /// A settings path whose first segment is not an instance.
    #[error("Settings path '{0}' does not name an instance")]
    UnknownSettingsPath(String),

    /// A parameter sweep whose length disagrees with the batch.
    #[error(
        "Instance '{instance}': parameter '{param}' has {got} samples, expected {expected}"
    )]
    BatchMismatch {
        /// Dotted instance path.
        instance: String,
        /// Parameter name.
        param: String,
        /// Batch length established earlier in the evaluation.
        expected: usize,
        /// Length of this parameter.
        got: usize,
    },

    /// A leaf model failed.
    #[error("Instance '{instance}': {source}")]
    Model {
        /// Dotted instance path.
        instance: String,
        /// Underlying failure.
        #[source]
        source: IrError,
    },

    /// An unrecognized return representation name.
    #[error("Unknown return type: {0}")]
    UnknownReturnType(String),

    /// Invalid finite-difference request.
    #[error("Sensitivity error: {0}")]
    Sensitivity(String),

    /// IR error.
    #[error(transparent)]
    Ir(#[from] IrError),

    /// Backend error.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Result type for circuit operations.
pub type CircuitResult<T> = Result<T, CircuitError>;
