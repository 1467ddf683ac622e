//! The built-in model library.

use std::collections::BTreeMap;
use std::sync::Arc;

use sparx_ir::{ModelRef, ModelSource};

use crate::coupler::{Coupler, Mmi1x2};
use crate::mirror::Mirror;
use crate::waveguide::{Attenuator, PhaseShifter, Straight};

/// Every built-in model, addressed by component name.
///
/// Models are created once per library, so builds against the same library
/// share model identities and hit the circuit cache.
#[derive(Clone)]
pub struct Library {
    name: String,
    models: BTreeMap<&'static str, ModelRef>,
}

impl Library {
    /// Create the library under its default name.
    pub fn new() -> Self {
        Self::named("sparx")
    }

    /// Create the library under a custom source name.
    pub fn named(name: impl Into<String>) -> Self {
        let mut models: BTreeMap<&'static str, ModelRef> = BTreeMap::new();
        models.insert("straight", Arc::new(Straight));
        models.insert("coupler", Arc::new(Coupler));
        models.insert("attenuator", Arc::new(Attenuator));
        models.insert("phase_shifter", Arc::new(PhaseShifter));
        models.insert("mirror", Arc::new(Mirror));
        models.insert("mmi1x2", Arc::new(Mmi1x2));
        Self {
            name: name.into(),
            models,
        }
    }

    /// Component names with their descriptions.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        self.models
            .iter()
            .map(|(name, model)| (*name, model.describe()))
            .collect()
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelSource for Library {
    fn get(&self, component: &str) -> Option<ModelRef> {
        self.models.get(component).cloned()
    }

    fn components(&self) -> Vec<String> {
        self.models.keys().map(|k| k.to_string()).collect()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("name", &self.name)
            .field("components", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}
