//! Backend trait and backend selection.

use std::fmt;
use std::str::FromStr;

use ndarray::Array3;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use sparx_ir::SDense;

use crate::dense::DenseBackend;
use crate::error::{BackendError, BackendResult};
use crate::forward::ForwardBackend;
use crate::klu::KluBackend;
use crate::plan::{BlockSystem, EliminationPlan};

/// A strategy for eliminating internal ports.
///
/// Backends are stateless; the same instance may be shared across threads
/// and evaluations.
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &'static str;

    /// Eliminate every internal port of `system`.
    ///
    /// Returns a `(batch, n, n)` stack over the plan's external ports in
    /// [`EliminationPlan::external_names`] order.
    fn eliminate(
        &self,
        plan: &EliminationPlan,
        system: &BlockSystem,
    ) -> BackendResult<Array3<Complex64>>;

    /// Eliminate and wrap the result with its port names.
    fn solve(&self, plan: &EliminationPlan, system: &BlockSystem) -> BackendResult<SDense> {
        let data = self.eliminate(plan, system)?;
        Ok(SDense::new(plan.external_names().to_vec(), data)?)
    }
}

/// Selects one of the built-in backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Dense LU solve; exact for any topology.
    #[default]
    #[serde(alias = "default")]
    Dense,
    /// Sparse LU solve; same result as dense.
    #[serde(alias = "sparse")]
    Klu,
    /// Forward substitution; exact only without feedback paths.
    #[serde(alias = "forward-only", alias = "forward_only")]
    Forward,
}

impl BackendKind {
    /// Every backend, in a fixed order.
    pub const ALL: [BackendKind; 3] = [BackendKind::Dense, BackendKind::Klu, BackendKind::Forward];

    /// The backend implementation.
    pub fn backend(self) -> &'static dyn Backend {
        match self {
            BackendKind::Dense => &DenseBackend,
            BackendKind::Klu => &KluBackend,
            BackendKind::Forward => &ForwardBackend,
        }
    }

    /// Canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Dense => "dense",
            BackendKind::Klu => "klu",
            BackendKind::Forward => "forward",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = BackendError;

    fn from_str(s: &str) -> BackendResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dense" | "default" => Ok(BackendKind::Dense),
            "klu" | "sparse" => Ok(BackendKind::Klu),
            "forward" | "forward-only" | "forward_only" => Ok(BackendKind::Forward),
            other => Err(BackendError::UnknownBackend(other.to_string())),
        }
    }
}
