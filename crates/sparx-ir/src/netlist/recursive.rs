//! Collections of named netlists that reference each other.

use std::collections::BTreeMap;
use std::fmt;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::error::{IrError, IrResult};
use crate::port::PortRef;
use crate::settings::Settings;

use super::{ComponentRef, Connection, Instance, Netlist};

/// Name given to a flat netlist when it is wrapped into a [`RecursiveNetlist`].
pub const TOP_LEVEL: &str = "top_level";

/// Separator between parent and child instance names in flattened netlists.
pub const DEFAULT_FLATTEN_SEPARATOR: &str = "~";

/// An ordered collection of named netlists.
///
/// The first netlist is the top level. Instance components that name another
/// netlist of the collection refer to that netlist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecursiveNetlist {
    netlists: Vec<(String, Netlist)>,
}

impl RecursiveNetlist {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse either a flat netlist or a name-to-netlist map from JSON.
    ///
    /// The netlists are read straight from the text, so a repeated key inside
    /// one of them is an error rather than a silent overwrite.
    pub fn from_json_str(json: &str) -> IrResult<Self> {
        let top: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        if top.contains_key("instances") {
            return Ok(Netlist::from_json_str(json)?.into());
        }
        let NamedNetlists(netlists) = serde_json::from_str(json)?;
        Ok(Self { netlists })
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> IrResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Insert a netlist, replacing any with the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, netlist: Netlist) {
        let name = name.into();
        match self.netlists.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = netlist,
            None => self.netlists.push((name, netlist)),
        }
    }

    /// Builder-style [`RecursiveNetlist::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, netlist: Netlist) -> Self {
        self.insert(name, netlist);
        self
    }

    /// The top-level netlist and its name.
    pub fn top(&self) -> Option<(&str, &Netlist)> {
        self.netlists.first().map(|(n, net)| (n.as_str(), net))
    }

    /// Look up a netlist by name.
    pub fn get(&self, name: &str) -> Option<&Netlist> {
        self.netlists
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, net)| net)
    }

    /// Whether a netlist with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Netlists in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Netlist)> {
        self.netlists.iter().map(|(n, net)| (n.as_str(), net))
    }

    /// Netlist names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.netlists.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Number of netlists.
    pub fn len(&self) -> usize {
        self.netlists.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.netlists.is_empty()
    }

    /// Names of netlists starting with `prefix`.
    pub fn netlists_with_prefix(&self, prefix: &str) -> Vec<&str> {
        self.netlists
            .iter()
            .filter(|(n, _)| n.starts_with(prefix))
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Instances of components starting with `component_prefix` in the first
    /// netlist whose name starts with `netlist_prefix`.
    pub fn instances_of_component(&self, netlist_prefix: &str, component_prefix: &str) -> Vec<&str> {
        self.netlists
            .iter()
            .find(|(n, _)| n.starts_with(netlist_prefix))
            .map(|(_, net)| net.instances_of_component(component_prefix))
            .unwrap_or_default()
    }

    /// Prune every netlist with [`Netlist::remove_unused_instances`].
    #[must_use]
    pub fn remove_unused_instances(&self) -> RecursiveNetlist {
        RecursiveNetlist {
            netlists: self
                .netlists
                .iter()
                .map(|(n, net)| (n.clone(), net.remove_unused_instances()))
                .collect(),
        }
    }

    /// Netlist names ordered so every netlist comes after the netlists it uses.
    pub fn dependency_order(&self) -> IrResult<Vec<&str>> {
        let mut graph = DiGraph::<&str, ()>::new();
        let nodes: FxHashMap<&str, NodeIndex> = self
            .netlists
            .iter()
            .map(|(n, _)| (n.as_str(), graph.add_node(n.as_str())))
            .collect();

        for (name, net) in &self.netlists {
            for component in net.component_names() {
                if let Some(&child) = nodes.get(component) {
                    graph.add_edge(nodes[name.as_str()], child, ());
                }
            }
        }

        let order = toposort(&graph, None)
            .map_err(|cycle| IrError::CyclicNetlist(graph[cycle.node_id()].to_string()))?;
        Ok(order.into_iter().rev().map(|node| graph[node]).collect())
    }

    /// Inline every sub-netlist of the top level into one flat netlist.
    ///
    /// Nested instances are named `outer{sep}inner`. Settings of an instance
    /// that wraps a netlist are pushed down: undotted keys reach every inner
    /// instance, `inner.param` keys reach the named inner instance.
    pub fn flatten(&self, sep: &str) -> IrResult<Netlist> {
        self.dependency_order()?;
        let (name, top) = self
            .top()
            .ok_or_else(|| IrError::NetlistNotFound(TOP_LEVEL.to_string()))?;
        debug!("Flattening netlist '{}' with separator '{}'", name, sep);
        self.inline(top, &Settings::new(), sep)
    }

    fn sub_netlist<'a>(&'a self, component: &'a ComponentRef) -> Option<&'a Netlist> {
        match component {
            ComponentRef::Netlist(net) => Some(net.as_ref()),
            ComponentRef::Name(name) => self.get(name),
        }
    }

    fn inline(&self, net: &Netlist, overrides: &Settings, sep: &str) -> IrResult<Netlist> {
        let globals = overrides.globals();
        let mut out = Netlist::new();
        let mut port_maps: FxHashMap<&str, BTreeMap<String, PortRef>> = FxHashMap::default();

        for (name, inst) in &net.instances {
            let settings = inst
                .settings
                .merged(&globals)
                .merged(&overrides.scoped(name));

            let Some(sub) = self.sub_netlist(&inst.component) else {
                out.instances.insert(
                    name.clone(),
                    Instance {
                        component: inst.component.clone(),
                        settings,
                    },
                );
                continue;
            };

            let child = self.inline(sub, &settings, sep)?;
            let rename = |r: &PortRef| PortRef::new(format!("{name}{sep}{}", r.instance), r.port.clone());
            for conn in &child.connections {
                out.connections
                    .push(Connection::new(rename(&conn.a), rename(&conn.b)));
            }
            port_maps.insert(
                name.as_str(),
                child.ports.iter().map(|(p, r)| (p.clone(), rename(r))).collect(),
            );
            for (inner, inner_inst) in child.instances {
                out.instances.insert(format!("{name}{sep}{inner}"), inner_inst);
            }
        }

        let resolve = |r: &PortRef| -> IrResult<PortRef> {
            match port_maps.get(r.instance.as_str()) {
                None => Ok(r.clone()),
                Some(map) => map.get(&r.port).cloned().ok_or_else(|| {
                    IrError::UnknownInstancePort {
                        instance: r.instance.clone(),
                        port: r.port.clone(),
                    }
                }),
            }
        };
        for conn in &net.connections {
            out.connections
                .push(Connection::new(resolve(&conn.a)?, resolve(&conn.b)?));
        }
        for (port, target) in &net.ports {
            out.ports.insert(port.clone(), resolve(target)?);
        }
        Ok(out)
    }
}

impl From<Netlist> for RecursiveNetlist {
    fn from(netlist: Netlist) -> Self {
        Self {
            netlists: vec![(TOP_LEVEL.to_string(), netlist)],
        }
    }
}

impl Serialize for RecursiveNetlist {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.netlists.len()))?;
        for (name, net) in &self.netlists {
            map.serialize_entry(name, net)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RecursiveNetlist {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecursiveVisitor;

        impl<'de> Visitor<'de> for RecursiveVisitor {
            type Value = RecursiveNetlist;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a netlist or a map of netlist names to netlists")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, serde_json::Value)> = Vec::new();
                while let Some(entry) = access.next_entry()? {
                    entries.push(entry);
                }

                // A flat netlist is recognised by its `instances` key.
                if entries.iter().any(|(k, _)| k == "instances") {
                    let object: serde_json::Map<String, serde_json::Value> =
                        entries.into_iter().collect();
                    let net = Netlist::deserialize(serde_json::Value::Object(object))
                        .map_err(<A::Error as de::Error>::custom)?;
                    return Ok(net.into());
                }

                let mut out = RecursiveNetlist::new();
                for (name, value) in entries {
                    let net = Netlist::deserialize(value).map_err(|e| {
                        <A::Error as de::Error>::custom(format!("netlist '{name}': {e}"))
                    })?;
                    out.netlists.push((name, net));
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(RecursiveVisitor)
    }
}

/// A name-to-netlist map read entry by entry, in file order.
struct NamedNetlists(Vec<(String, Netlist)>);

impl<'de> Deserialize<'de> for NamedNetlists {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NamedVisitor;

        impl<'de> Visitor<'de> for NamedVisitor {
            type Value = NamedNetlists;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of netlist names to netlists")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut out: Vec<(String, Netlist)> = Vec::new();
                while let Some(name) = access.next_key::<String>()? {
                    let net = access.next_value::<Netlist>().map_err(|e| {
                        <A::Error as de::Error>::custom(format!("netlist '{name}': {e}"))
                    })?;
                    if out.iter().any(|(n, _)| *n == name) {
                        return Err(de::Error::custom(format!("duplicate netlist '{name}'")));
                    }
                    out.push((name, net));
                }
                Ok(NamedNetlists(out))
            }
        }

        deserializer.deserialize_map(NamedVisitor)
    }
}
