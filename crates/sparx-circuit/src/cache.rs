//! Structural cache of compiled circuits.
//!
//! Compiled circuits are keyed by structure only: instance names with the
//! identity of the model or sub-netlist each one uses, the connection
//! topology, the external ports, the declared modes and the backend.
//! Parameter values never enter the key.
//!
//! Lookups share a read lock on the key table. Each key owns its own slot
//! mutex, so concurrent builds of the same new structure compile it once
//! while builds of other structures proceed in parallel.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock, Mutex, RwLock};

use rustc_hash::FxHashMap;
use sparx_backend::BackendKind;
use sparx_ir::{Connection, PortRef};
use tracing::debug;

use crate::compiled::CompiledCircuit;
use crate::error::CircuitResult;

/// Identity of one instance within a [`CircuitKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    /// A leaf model, identified by component name and model address.
    Leaf {
        /// Component name.
        component: String,
        /// Address of the shared model.
        model: usize,
    },
    /// A nested netlist.
    Netlist(Box<CircuitKey>),
}

/// Structural identity of a netlist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CircuitKey {
    instances: Vec<(String, NodeKey)>,
    connections: Vec<(PortRef, PortRef)>,
    ports: Vec<(String, PortRef)>,
    modes: Option<Vec<String>>,
    backend: BackendKind,
}

impl CircuitKey {
    /// Build a key; connections are normalized and sorted.
    pub fn new(
        instances: Vec<(String, NodeKey)>,
        connections: &[Connection],
        ports: &BTreeMap<String, PortRef>,
        modes: Option<&[String]>,
        backend: BackendKind,
    ) -> Self {
        let mut connections: Vec<(PortRef, PortRef)> = connections
            .iter()
            .map(|c| {
                let c = c.normalized();
                (c.a, c.b)
            })
            .collect();
        connections.sort();
        Self {
            instances,
            connections,
            ports: ports.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            modes: modes.map(<[String]>::to_vec),
            backend,
        }
    }
}

type Slot = Arc<Mutex<Option<Arc<CompiledCircuit>>>>;

/// Thread-safe cache of compiled circuits.
#[derive(Default)]
pub struct CircuitCache {
    slots: RwLock<FxHashMap<CircuitKey, Slot>>,
}

static GLOBAL: LazyLock<Arc<CircuitCache>> = LazyLock::new(|| Arc::new(CircuitCache::new()));

impl CircuitCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by default.
    pub fn global() -> Arc<CircuitCache> {
        Arc::clone(&GLOBAL)
    }

    fn slot(&self, key: &CircuitKey) -> Slot {
        {
            let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
            if let Some(slot) = slots.get(key) {
                return Arc::clone(slot);
            }
        }
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// Return the cached circuit for `key`, compiling it on a miss.
    ///
    /// The boolean is `true` on a hit. A failed compilation leaves the slot
    /// empty so a later call retries.
    pub fn get_or_try_insert<F>(
        &self,
        key: &CircuitKey,
        compile: F,
    ) -> CircuitResult<(Arc<CompiledCircuit>, bool)>
    where
        F: FnOnce() -> CircuitResult<Arc<CompiledCircuit>>,
    {
        let slot = self.slot(key);
        let mut guard = slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(compiled) = guard.as_ref() {
            debug!("Circuit cache hit");
            return Ok((Arc::clone(compiled), true));
        }
        debug!("Circuit cache miss, compiling");
        let compiled = compile()?;
        *guard = Some(Arc::clone(&compiled));
        Ok((compiled, false))
    }

    /// Number of compiled circuits held.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|slot| slot.lock().map(|s| s.is_some()).unwrap_or(false))
            .count()
    }

    /// Whether the cache holds no compiled circuits.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached circuit.
    pub fn clear(&self) {
        self.slots
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl std::fmt::Debug for CircuitCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitCache")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(connections: &[(&str, &str)]) -> CircuitKey {
        let connections: Vec<Connection> = connections
            .iter()
            .map(|(a, b)| Connection::new(PortRef::parse(a).unwrap(), PortRef::parse(b).unwrap()))
            .collect();
        CircuitKey::new(
            vec![(
                "wg".to_string(),
                NodeKey::Leaf {
                    component: "straight".to_string(),
                    model: 1,
                },
            )],
            &connections,
            &BTreeMap::new(),
            None,
            BackendKind::Dense,
        )
    }

    #[test]
    fn test_key_ignores_connection_order_and_direction() {
        let a = key(&[("a,out0", "b,in0"), ("b,out0", "c,in0")]);
        let b = key(&[("c,in0", "b,out0"), ("b,in0", "a,out0")]);
        assert_eq!(a, b);
        assert_ne!(a, key(&[("a,out0", "b,in0")]));
    }

    #[test]
    fn test_empty_cache() {
        let cache = CircuitCache::new();
        assert!(cache.is_empty());
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
