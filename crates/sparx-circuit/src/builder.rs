//! Circuit construction.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sparx_backend::BackendKind;
use sparx_ir::{ModelSource, RecursiveNetlist};
use tracing::{info, instrument};

use crate::cache::CircuitCache;
use crate::circuit::Circuit;
use crate::compiled::{Compiler, netlist_settings};
use crate::error::{CircuitError, CircuitResult};
use crate::info::CircuitInfo;
use crate::source::ModelSources;

/// Representation returned by circuit evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    /// Sparse mapping from port pairs to values.
    #[default]
    Dict,
    /// Dense matrix stack.
    Dense,
    /// Coordinate arrays.
    Coo,
}

impl ReturnType {
    /// Canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            ReturnType::Dict => "dict",
            ReturnType::Dense => "dense",
            ReturnType::Coo => "coo",
        }
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReturnType {
    type Err = CircuitError;

    fn from_str(s: &str) -> CircuitResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dict" | "sdict" => Ok(ReturnType::Dict),
            "dense" | "sdense" => Ok(ReturnType::Dense),
            "coo" | "scoo" => Ok(ReturnType::Coo),
            other => Err(CircuitError::UnknownReturnType(other.to_string())),
        }
    }
}

/// Build configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitOptions {
    /// Elimination backend.
    pub backend: BackendKind,
    /// Modes to lift every port into; `None` for a single-mode circuit.
    pub modes: Option<Vec<String>>,
    /// Representation returned by evaluation.
    pub return_type: ReturnType,
    /// Drop instances unreachable from the external ports before building.
    pub remove_unused_instances: bool,
    /// Reuse compiled structures across builds.
    pub use_cache: bool,
}

impl Default for CircuitOptions {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            modes: None,
            return_type: ReturnType::default(),
            remove_unused_instances: false,
            use_cache: true,
        }
    }
}

/// Builder for circuits.
pub struct CircuitBuilder {
    netlist: RecursiveNetlist,
    sources: ModelSources,
    options: CircuitOptions,
    cache: Option<Arc<CircuitCache>>,
}

impl CircuitBuilder {
    /// Start from a flat or recursive netlist.
    pub fn new(netlist: impl Into<RecursiveNetlist>) -> Self {
        Self {
            netlist: netlist.into(),
            sources: ModelSources::new(),
            options: CircuitOptions::default(),
            cache: None,
        }
    }

    /// Add a model source after the ones already present.
    #[must_use]
    pub fn with_models(self, source: impl ModelSource + 'static) -> Self {
        self.with_model_source(Arc::new(source))
    }

    /// Add a shared model source after the ones already present.
    #[must_use]
    pub fn with_model_source(mut self, source: Arc<dyn ModelSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Replace the model sources.
    #[must_use]
    pub fn with_sources(mut self, sources: ModelSources) -> Self {
        self.sources = sources;
        self
    }

    /// Set the elimination backend.
    #[must_use]
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.options.backend = backend;
        self
    }

    /// Lift the circuit into the given modes.
    #[must_use]
    pub fn with_modes<I, S>(mut self, modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.modes = Some(modes.into_iter().map(Into::into).collect());
        self
    }

    /// Set the representation returned by evaluation.
    #[must_use]
    pub fn with_return_type(mut self, return_type: ReturnType) -> Self {
        self.options.return_type = return_type;
        self
    }

    /// Drop instances unreachable from the external ports.
    #[must_use]
    pub fn with_unused_instances_removed(mut self) -> Self {
        self.options.remove_unused_instances = true;
        self
    }

    /// Replace every option at once.
    #[must_use]
    pub fn with_options(mut self, options: CircuitOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a specific cache instead of the process-wide one.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<CircuitCache>) -> Self {
        self.cache = Some(cache);
        self.options.use_cache = true;
        self
    }

    /// Always compile, bypassing any cache.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self.options.use_cache = false;
        self
    }

    /// Validate, resolve and compile the netlist.
    #[instrument(skip(self), fields(backend = %self.options.backend))]
    pub fn build(self) -> CircuitResult<(Circuit, CircuitInfo)> {
        let netlists = if self.options.remove_unused_instances {
            self.netlist.remove_unused_instances()
        } else {
            self.netlist
        };
        let modes = self.options.modes.as_deref().filter(|m| !m.is_empty());
        let backend = self.options.backend;

        let mut compiler = Compiler::new(&netlists, &self.sources, backend, modes)?;
        let top = compiler.top()?;
        let cache = if self.options.use_cache {
            Some(self.cache.unwrap_or_else(CircuitCache::global))
        } else {
            None
        };
        let (compiled, cache_hit) = match cache {
            Some(cache) => {
                let key = compiler.key(top)?;
                cache.get_or_try_insert(&key, || compiler.compile(top))?
            }
            None => (compiler.compile(top)?, false),
        };

        let settings = netlist_settings(&netlists, top, &compiled)?;
        let mut instances = std::collections::BTreeMap::new();
        compiled.collect_info("", &mut instances);
        let info = CircuitInfo {
            ports: compiled.ports().to_vec(),
            instances,
            backend,
            modes: modes.map(<[String]>::to_vec),
            return_type: self.options.return_type,
            cache_hit,
        };

        info!(
            "Built circuit: {} ports, {} leaves, backend {}, cache {}",
            info.ports.len(),
            compiled.num_leaves(),
            backend,
            if cache_hit { "hit" } else { "miss" }
        );

        Ok((
            Circuit::new(compiled, settings, self.options.return_type),
            info,
        ))
    }
}

/// Build a circuit from a netlist, model sources and options.
pub fn build(
    netlist: impl Into<RecursiveNetlist>,
    models: impl Into<ModelSources>,
    options: CircuitOptions,
) -> CircuitResult<(Circuit, CircuitInfo)> {
    CircuitBuilder::new(netlist)
        .with_sources(models.into())
        .with_options(options)
        .build()
}
