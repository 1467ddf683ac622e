//! Build reports.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sparx_backend::BackendKind;

use crate::builder::ReturnType;

/// What one instance resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    /// Component name as written in the netlist.
    pub component: String,
    /// Model source, or `netlist` for sub-circuits.
    pub source: String,
}

/// Information about a built circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitInfo {
    /// External ports in result order.
    pub ports: Vec<String>,
    /// Every instance by dotted path.
    pub instances: BTreeMap<String, InstanceInfo>,
    /// Backend used.
    pub backend: BackendKind,
    /// Declared modes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modes: Option<Vec<String>>,
    /// Representation returned by evaluation.
    pub return_type: ReturnType,
    /// Whether the compiled structure came from the cache.
    pub cache_hit: bool,
}

impl CircuitInfo {
    /// Number of leaf instances.
    pub fn num_leaves(&self) -> usize {
        self.instances
            .values()
            .filter(|i| i.source != crate::compiled::NETLIST_SOURCE)
            .count()
    }
}

impl fmt::Display for CircuitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ports: {}", self.ports.join(", "))?;
        writeln!(f, "backend: {}", self.backend)?;
        if let Some(modes) = &self.modes {
            writeln!(f, "modes: {}", modes.join(", "))?;
        }
        writeln!(f, "instances:")?;
        for (path, inst) in &self.instances {
            writeln!(f, "  {path}: {} ({})", inst.component, inst.source)?;
        }
        Ok(())
    }
}
