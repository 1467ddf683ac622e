//! Leaf model contract and model sources.
//!
//! A [`Model`] declares its ports and its parameters with numeric defaults,
//! and maps a complete parameter set to a scattering representation. Models
//! must broadcast over the batch axis: when any parameter is a sweep of
//! length `n`, every returned entry has either one sample or `n` samples.
//!
//! A [`ModelSource`] resolves component names to models. Sources are either
//! explicit name tables ([`ModelTable`]) or namespace-like libraries that
//! implement the trait directly.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::IrResult;
use crate::settings::Settings;
use crate::stype::SType;

/// A component whose scattering behaviour is a function of its parameters.
pub trait Model: Send + Sync {
    /// Ports exposed by the component.
    fn ports(&self) -> Vec<String>;

    /// Parameter defaults.
    fn settings(&self) -> Settings;

    /// Compute the scattering relation.
    ///
    /// `settings` holds every parameter from [`Model::settings`], with
    /// caller overrides already applied.
    fn evaluate(&self, settings: &Settings) -> IrResult<SType>;

    /// Short human-readable description.
    fn describe(&self) -> String {
        format!("model with {} ports", self.ports().len())
    }
}

/// Shared handle to a model.
pub type ModelRef = Arc<dyn Model>;

type ModelFn = dyn Fn(&Settings) -> IrResult<SType> + Send + Sync;

/// A model backed by a closure.
pub struct FnModel {
    name: String,
    ports: Vec<String>,
    defaults: Settings,
    func: Box<ModelFn>,
}

impl FnModel {
    /// Wrap `func` as a model with the given ports and defaults.
    pub fn new<F>(name: impl Into<String>, ports: &[&str], defaults: Settings, func: F) -> Self
    where
        F: Fn(&Settings) -> IrResult<SType> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            ports: ports.iter().map(|p| p.to_string()).collect(),
            defaults,
            func: Box::new(func),
        }
    }

    /// Wrap into a shared [`ModelRef`].
    pub fn into_ref(self) -> ModelRef {
        Arc::new(self)
    }

    /// Name of the model.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Model for FnModel {
    fn ports(&self) -> Vec<String> {
        self.ports.clone()
    }

    fn settings(&self) -> Settings {
        self.defaults.clone()
    }

    fn evaluate(&self, settings: &Settings) -> IrResult<SType> {
        (self.func)(settings)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl fmt::Debug for FnModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModel")
            .field("name", &self.name)
            .field("ports", &self.ports)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// Something that resolves component names to models.
pub trait ModelSource: Send + Sync {
    /// Look up a component by name.
    fn get(&self, component: &str) -> Option<ModelRef>;

    /// Every component name this source provides.
    fn components(&self) -> Vec<String>;

    /// Name of the source, used in build reports.
    fn name(&self) -> &str;
}

/// An explicit component name to model table.
#[derive(Clone, Default)]
pub struct ModelTable {
    name: String,
    models: BTreeMap<String, ModelRef>,
}

impl ModelTable {
    /// Create an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            models: BTreeMap::new(),
        }
    }

    /// Register a model under `component`, replacing any previous one.
    pub fn insert(&mut self, component: impl Into<String>, model: ModelRef) {
        self.models.insert(component.into(), model);
    }

    /// Builder-style [`ModelTable::insert`].
    #[must_use]
    pub fn with(mut self, component: impl Into<String>, model: ModelRef) -> Self {
        self.insert(component, model);
        self
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl ModelSource for ModelTable {
    fn get(&self, component: &str) -> Option<ModelRef> {
        self.models.get(component).cloned()
    }

    fn components(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ModelTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelTable")
            .field("name", &self.name)
            .field("components", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}
