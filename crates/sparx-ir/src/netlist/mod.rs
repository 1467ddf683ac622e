//! Declarative circuit descriptions.
//!
//! A [`Netlist`] maps instance names to [`Instance`]s, joins instance ports
//! pairwise through [`Connection`]s and exposes some instance ports as the
//! circuit's external ports. The file form is a JSON object:
//!
//! ```json
//! {
//!   "instances": {"lft": "coupler", "top": {"component": "straight", "settings": {"length": 25.0}}},
//!   "connections": {"lft,out0": "top,in0"},
//!   "ports": {"in0": "lft,in0"}
//! }
//! ```
//!
//! Other top-level keys (such as layout placements) are ignored.

mod instance;
mod recursive;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Dfs;
use rustc_hash::FxHashMap;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::error::IrResult;
use crate::port::{PortRef, validate_instance_name};

pub use instance::{ComponentRef, Instance};
pub use recursive::{DEFAULT_FLATTEN_SEPARATOR, RecursiveNetlist, TOP_LEVEL};

/// An unordered pair of joined instance ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    /// One end.
    pub a: PortRef,
    /// The other end.
    pub b: PortRef,
}

impl Connection {
    /// Join two ports.
    pub fn new(a: PortRef, b: PortRef) -> Self {
        Self { a, b }
    }

    /// Both ends.
    pub fn ends(&self) -> [&PortRef; 2] {
        [&self.a, &self.b]
    }

    /// The end opposite `port`, if `port` is one of the ends.
    pub fn other(&self, port: &PortRef) -> Option<&PortRef> {
        if &self.a == port {
            Some(&self.b)
        } else if &self.b == port {
            Some(&self.a)
        } else {
            None
        }
    }

    /// The same connection with its ends in sorted order.
    pub fn normalized(&self) -> Self {
        if self.a <= self.b {
            self.clone()
        } else {
            Self::new(self.b.clone(), self.a.clone())
        }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.a, self.b)
    }
}

/// A flat or hierarchical circuit description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Netlist {
    /// Instances by name.
    #[serde(deserialize_with = "deserialize_instances")]
    pub instances: BTreeMap<String, Instance>,
    /// Port-to-port connections, in declaration order.
    #[serde(
        default,
        serialize_with = "serialize_connections",
        deserialize_with = "deserialize_connections"
    )]
    pub connections: Vec<Connection>,
    /// External port name to instance port.
    #[serde(default, deserialize_with = "deserialize_ports")]
    pub ports: BTreeMap<String, PortRef>,
}

impl Netlist {
    /// Create an empty netlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a netlist from JSON.
    pub fn from_json_str(json: &str) -> IrResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> IrResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Add an instance.
    pub fn add_instance(&mut self, name: impl Into<String>, instance: Instance) -> IrResult<()> {
        let name = name.into();
        validate_instance_name(&name)?;
        self.instances.insert(name, instance);
        Ok(())
    }

    /// Builder-style [`Netlist::add_instance`].
    pub fn with_instance(mut self, name: impl Into<String>, instance: Instance) -> IrResult<Self> {
        self.add_instance(name, instance)?;
        Ok(self)
    }

    /// Join two `instance,port` references.
    pub fn connect(mut self, a: &str, b: &str) -> IrResult<Self> {
        self.connections
            .push(Connection::new(PortRef::parse(a)?, PortRef::parse(b)?));
        Ok(self)
    }

    /// Expose an `instance,port` reference as external port `name`.
    pub fn expose(mut self, name: impl Into<String>, target: &str) -> IrResult<Self> {
        self.ports.insert(name.into(), PortRef::parse(target)?);
        Ok(self)
    }

    /// Instances whose component name starts with `prefix`, in name order.
    pub fn instances_of_component(&self, prefix: &str) -> Vec<&str> {
        self.instances
            .iter()
            .filter(|(_, inst)| {
                inst.component_name()
                    .is_some_and(|name| name.starts_with(prefix))
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Names of every component referenced by name, including inside inline netlists.
    pub fn component_names(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        for inst in self.instances.values() {
            match &inst.component {
                ComponentRef::Name(name) => {
                    names.insert(name.as_str());
                }
                ComponentRef::Netlist(net) => names.extend(net.component_names()),
            }
        }
        names
    }

    /// Drop instances that no external port can reach through connections.
    ///
    /// Connections and ports touching a dropped instance go with it.
    #[must_use]
    pub fn remove_unused_instances(&self) -> Netlist {
        let mut graph = UnGraph::<&str, ()>::new_undirected();
        let nodes: FxHashMap<&str, NodeIndex> = self
            .instances
            .keys()
            .map(|name| (name.as_str(), graph.add_node(name.as_str())))
            .collect();

        for conn in &self.connections {
            if let (Some(&a), Some(&b)) = (
                nodes.get(conn.a.instance.as_str()),
                nodes.get(conn.b.instance.as_str()),
            ) {
                graph.add_edge(a, b, ());
            }
        }

        let mut used = BTreeSet::new();
        for target in self.ports.values() {
            let Some(&start) = nodes.get(target.instance.as_str()) else {
                continue;
            };
            let mut dfs = Dfs::new(&graph, start);
            while let Some(node) = dfs.next(&graph) {
                used.insert(graph[node]);
            }
        }

        let removed = self.instances.len() - used.len();
        if removed > 0 {
            debug!("Removing {} unused instances", removed);
        }

        Netlist {
            instances: self
                .instances
                .iter()
                .filter(|(name, _)| used.contains(name.as_str()))
                .map(|(name, inst)| (name.clone(), inst.clone()))
                .collect(),
            connections: self
                .connections
                .iter()
                .filter(|c| {
                    used.contains(c.a.instance.as_str()) && used.contains(c.b.instance.as_str())
                })
                .cloned()
                .collect(),
            ports: self.ports.clone(),
        }
    }

    /// Inline every nested netlist into a single flat netlist.
    pub fn flatten(&self, sep: &str) -> IrResult<Netlist> {
        RecursiveNetlist::from(self.clone()).flatten(sep)
    }
}

fn deserialize_instances<'de, D>(deserializer: D) -> Result<BTreeMap<String, Instance>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Instance>::deserialize(deserializer)?;
    let mut instances = BTreeMap::new();
    for (name, inst) in raw {
        let name = name.trim().to_string();
        validate_instance_name(&name).map_err(<D::Error as de::Error>::custom)?;
        instances.insert(name, inst);
    }
    Ok(instances)
}

fn serialize_connections<S>(connections: &[Connection], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(connections.len()))?;
    for conn in connections {
        map.serialize_entry(&conn.a, &conn.b)?;
    }
    map.end()
}

fn deserialize_connections<'de, D>(deserializer: D) -> Result<Vec<Connection>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ConnectionsVisitor;

    impl<'de> Visitor<'de> for ConnectionsVisitor {
        type Value = Vec<Connection>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of \"instance,port\" to \"instance,port\"")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((a, b)) = access.next_entry::<PortRef, PortRef>()? {
                out.push(Connection::new(a, b));
            }
            Ok(out)
        }
    }

    deserializer.deserialize_map(ConnectionsVisitor)
}

fn deserialize_ports<'de, D>(deserializer: D) -> Result<BTreeMap<String, PortRef>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PortsVisitor;

    impl<'de> Visitor<'de> for PortsVisitor {
        type Value = BTreeMap<String, PortRef>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of external port name to \"instance,port\"")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out = BTreeMap::new();
            while let Some((name, target)) = access.next_entry::<String, PortRef>()? {
                if out.contains_key(&name) {
                    return Err(de::Error::custom(format!("duplicate external port '{name}'")));
                }
                out.insert(name, target);
            }
            Ok(out)
        }
    }

    deserializer.deserialize_map(PortsVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MZI: &str = r#"{
        "instances": {
            "lft": "coupler",
            "top": {"component": "straight", "settings": {"length": 25.0}},
            "btm": {"component": "straight", "settings": {"length": 15.0}},
            "rgt": "coupler$1"
        },
        "connections": {
            "lft,out0": "btm,in0",
            "btm,out0": "rgt,in0",
            "lft,out1": "top,in0",
            "top,out0": "rgt,in1"
        },
        "ports": {
            "in0": "lft,in0",
            "in1": "lft,in1",
            "out0": "rgt,out0",
            "out1": "rgt,out1"
        },
        "placements": {"lft": {"x": 0.0}}
    }"#;

    #[test]
    fn test_parse_mzi() {
        let net = Netlist::from_json_str(MZI).unwrap();
        assert_eq!(net.instances.len(), 4);
        assert_eq!(net.connections.len(), 4);
        assert_eq!(net.ports.len(), 4);
        assert_eq!(net.instances["rgt"].component_name(), Some("coupler"));
        assert_eq!(net.connections[0].a, PortRef::new("lft", "out0"));
        assert_eq!(net.connections[1].a, PortRef::new("btm", "out0"));
    }

    #[test]
    fn test_json_roundtrip_preserves_connection_order() {
        let net = Netlist::from_json_str(MZI).unwrap();
        let back = Netlist::from_json_str(&net.to_json_string().unwrap()).unwrap();
        assert_eq!(back, net);
    }

    #[test]
    fn test_rejects_dotted_instance_name() {
        let res = Netlist::from_json_str(r#"{"instances": {"a.b": "straight"}}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_rejects_duplicate_external_port() {
        let err = Netlist::from_json_str(
            r#"{
                "instances": {"a": "straight", "b": "straight"},
                "ports": {"in0": "a,in0", "in0": "b,in0"}
            }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate external port 'in0'"), "{err}");

        let net = Netlist::from_json_str(
            r#"{"instances": {"a": "straight"}, "ports": {"in0": "a,in0", "out0": "a,out0"}}"#,
        )
        .unwrap();
        assert_eq!(net.ports.len(), 2);
    }

    #[test]
    fn test_requires_instances() {
        assert!(Netlist::from_json_str(r#"{"ports": {}}"#).is_err());
    }

    #[test]
    fn test_instances_of_component() {
        let net = Netlist::from_json_str(MZI).unwrap();
        assert_eq!(net.instances_of_component("coup"), vec!["lft", "rgt"]);
        assert_eq!(net.instances_of_component("straight"), vec!["btm", "top"]);
    }

    #[test]
    fn test_remove_unused_instances() {
        let net = Netlist::new()
            .with_instance("a", Instance::new("straight"))
            .unwrap()
            .with_instance("b", Instance::new("straight"))
            .unwrap()
            .with_instance("orphan", Instance::new("straight"))
            .unwrap()
            .with_instance("orphan2", Instance::new("straight"))
            .unwrap()
            .connect("a,out0", "b,in0")
            .unwrap()
            .connect("orphan,out0", "orphan2,in0")
            .unwrap()
            .expose("in0", "a,in0")
            .unwrap();

        let pruned = net.remove_unused_instances();
        assert_eq!(pruned.instances.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(pruned.connections.len(), 1);
    }

    #[test]
    fn test_connection_other_end() {
        let c = Connection::new(PortRef::new("a", "x"), PortRef::new("b", "y"));
        assert_eq!(c.other(&PortRef::new("b", "y")), Some(&PortRef::new("a", "x")));
        assert_eq!(c.other(&PortRef::new("c", "z")), None);
        assert_eq!(c.normalized(), c);
    }
}
