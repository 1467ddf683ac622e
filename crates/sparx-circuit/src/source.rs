//! Ordered model source lists.

use std::fmt;
use std::sync::Arc;

use sparx_ir::{ModelRef, ModelSource, ModelTable};

/// Model sources checked in order; the first source providing a component wins.
#[derive(Clone, Default)]
pub struct ModelSources {
    sources: Vec<Arc<dyn ModelSource>>,
}

impl ModelSources {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source with lower precedence than every source already present.
    pub fn push(&mut self, source: Arc<dyn ModelSource>) {
        self.sources.push(source);
    }

    /// Builder-style [`ModelSources::push`].
    #[must_use]
    pub fn with(mut self, source: impl ModelSource + 'static) -> Self {
        self.push(Arc::new(source));
        self
    }

    /// Resolve a component, returning the model and the name of the source that provided it.
    pub fn resolve(&self, component: &str) -> Option<(ModelRef, &str)> {
        self.sources
            .iter()
            .find_map(|s| s.get(component).map(|m| (m, s.name())))
    }

    /// Every component name across all sources, first occurrence only.
    pub fn components(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for source in &self.sources {
            for name in source.components() {
                if !seen.contains(&name) {
                    seen.push(name);
                }
            }
        }
        seen
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether there are no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl fmt::Debug for ModelSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|s| s.name()))
            .finish()
    }
}

impl From<ModelTable> for ModelSources {
    fn from(table: ModelTable) -> Self {
        ModelSources::new().with(table)
    }
}

impl From<Arc<dyn ModelSource>> for ModelSources {
    fn from(source: Arc<dyn ModelSource>) -> Self {
        Self {
            sources: vec![source],
        }
    }
}

impl FromIterator<Arc<dyn ModelSource>> for ModelSources {
    fn from_iter<I: IntoIterator<Item = Arc<dyn ModelSource>>>(iter: I) -> Self {
        Self {
            sources: iter.into_iter().collect(),
        }
    }
}
