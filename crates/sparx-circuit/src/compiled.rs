//! Compiled circuit structure and its evaluation.
//!
//! A [`CompiledCircuit`] fixes everything that does not depend on parameter
//! values: which model or sub-circuit each instance uses, the global port
//! space, and the [`EliminationPlan`]. Parameter values only enter in
//! [`CompiledCircuit::evaluate`], so one compiled circuit serves every
//! evaluation of the same structure.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use sparx_backend::{BackendKind, BlockSystem, EliminationPlan};
use sparx_ir::{
    ComponentRef, IrError, ModelRef, Netlist, PortRef, RecursiveNetlist, SDense, SDict, SType,
    Settings, expand_ports, multimode, split_mode, with_mode,
};
use tracing::debug;

use crate::cache::{CircuitKey, NodeKey};
use crate::error::{CircuitError, CircuitResult};
use crate::info::InstanceInfo;
use crate::source::ModelSources;

/// Component label used for netlists nested inline in an instance.
pub const INLINE_COMPONENT: &str = "<inline>";

/// Source label used for instances that resolve to a netlist.
pub const NETLIST_SOURCE: &str = "netlist";

/// How one instance is evaluated.
#[derive(Clone)]
pub enum Node {
    /// A leaf model.
    Leaf {
        /// The resolved model.
        model: ModelRef,
        /// The model's parameter defaults.
        defaults: Settings,
        /// Name of the model source that provided the model.
        source: String,
    },
    /// A nested circuit.
    Circuit(Arc<CompiledCircuit>),
}

/// An instance with its resolved implementation.
#[derive(Clone)]
pub struct CompiledInstance {
    /// Instance name within its netlist.
    pub name: String,
    /// Component name as written, or [`INLINE_COMPONENT`].
    pub component: String,
    /// Ports without mode tags.
    pub ports: Vec<String>,
    /// Implementation.
    pub node: Node,
}

/// The structure of a circuit, independent of parameter values.
pub struct CompiledCircuit {
    instances: Vec<CompiledInstance>,
    plan: EliminationPlan,
    backend: BackendKind,
    modes: Option<Vec<String>>,
}

impl CompiledCircuit {
    /// Instances in name order.
    pub fn instances(&self) -> &[CompiledInstance] {
        &self.instances
    }

    /// Look up an instance by name.
    pub fn instance(&self, name: &str) -> Option<&CompiledInstance> {
        self.instances
            .binary_search_by(|i| i.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.instances[idx])
    }

    /// The static elimination plan.
    pub fn plan(&self) -> &EliminationPlan {
        &self.plan
    }

    /// External ports, mode-expanded, in result order.
    pub fn ports(&self) -> &[String] {
        self.plan.external_names()
    }

    /// Backend used to eliminate internal ports.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Declared modes, if the circuit is multimode.
    pub fn modes(&self) -> Option<&[String]> {
        self.modes.as_deref()
    }

    /// Number of leaf instances, counting through nested circuits.
    pub fn num_leaves(&self) -> usize {
        self.instances
            .iter()
            .map(|inst| match &inst.node {
                Node::Leaf { .. } => 1,
                Node::Circuit(sub) => sub.num_leaves(),
            })
            .sum()
    }

    /// Every leaf parameter default, keyed by dotted instance path.
    pub fn default_settings(&self) -> Settings {
        let mut out = Settings::new();
        for inst in &self.instances {
            let inner = match &inst.node {
                Node::Leaf { defaults, .. } => defaults.prefixed(&inst.name),
                Node::Circuit(sub) => sub.default_settings().prefixed(&inst.name),
            };
            out.overlay(&inner);
        }
        out
    }

    /// Every leaf parameter name, undotted, with the first default found in
    /// instance order.
    pub fn global_defaults(&self) -> Settings {
        let mut out = Settings::new();
        for inst in &self.instances {
            let inner = match &inst.node {
                Node::Leaf { defaults, .. } => defaults.clone(),
                Node::Circuit(sub) => sub.global_defaults(),
            };
            for (key, value) in &inner {
                if !out.contains(key) {
                    out.insert(key, value.clone());
                }
            }
        }
        out
    }

    /// Record what every instance resolved to, keyed by dotted path.
    pub fn collect_info(&self, prefix: &str, out: &mut BTreeMap<String, InstanceInfo>) {
        for inst in &self.instances {
            let path = join_path(prefix, &inst.name);
            match &inst.node {
                Node::Leaf { source, .. } => {
                    out.insert(
                        path,
                        InstanceInfo {
                            component: inst.component.clone(),
                            source: source.clone(),
                        },
                    );
                }
                Node::Circuit(sub) => {
                    out.insert(
                        path.clone(),
                        InstanceInfo {
                            component: inst.component.clone(),
                            source: NETLIST_SOURCE.to_string(),
                        },
                    );
                    sub.collect_info(&path, out);
                }
            }
        }
    }

    /// Evaluate with the given parameter layers.
    ///
    /// `netlist` holds netlist-level settings addressed by leaf path relative
    /// to this circuit, `call` the caller's settings relative to this circuit,
    /// and `inherited` the undotted caller settings of every enclosing level.
    pub fn evaluate(
        &self,
        netlist: &Settings,
        call: &Settings,
        inherited: &Settings,
        path: &str,
        batch: &mut BatchTracker,
    ) -> CircuitResult<SDense> {
        for scope in call.scopes() {
            if self.instance(scope).is_none() {
                return Err(CircuitError::UnknownSettingsPath(join_path(path, scope)));
            }
        }
        let globals = inherited.merged(&call.globals());

        let mut blocks: Vec<(&str, SDict)> = Vec::with_capacity(self.instances.len());
        for inst in &self.instances {
            let inst_path = join_path(path, &inst.name);
            let inst_netlist = netlist.scoped(&inst.name);
            let inst_call = call.scoped(&inst.name);

            let sdict = match &inst.node {
                Node::Leaf {
                    model, defaults, ..
                } => {
                    let params =
                        leaf_params(&inst_path, defaults, &inst_netlist, &globals, &inst_call)?;
                    batch.observe(&inst_path, &params)?;
                    debug!("Evaluating leaf '{}' ({})", inst_path, inst.component);
                    let model_error = |source: IrError| CircuitError::Model {
                        instance: inst_path.clone(),
                        source,
                    };
                    let s = model.evaluate(&params).map_err(model_error)?.into_sdict();
                    match &self.modes {
                        Some(modes) => multimode(&s, modes).map_err(model_error)?,
                        None => s,
                    }
                }
                Node::Circuit(sub) => {
                    debug!("Evaluating sub-circuit '{}' ({})", inst_path, inst.component);
                    let dense = sub.evaluate(&inst_netlist, &inst_call, &globals, &inst_path, batch)?;
                    SType::from(dense).into_sdict()
                }
            };
            blocks.push((inst.name.as_str(), sdict));
        }

        let system = BlockSystem::assemble(&self.plan, blocks.iter().map(|(n, s)| (*n, s)))?;
        Ok(self.backend.backend().solve(&self.plan, &system)?)
    }
}

/// Parameters of one leaf, layered from lowest to highest precedence.
fn leaf_params(
    path: &str,
    defaults: &Settings,
    netlist: &Settings,
    globals: &Settings,
    call: &Settings,
) -> CircuitResult<Settings> {
    let mut params = defaults.clone();
    for layer in [netlist, globals] {
        for (key, value) in layer {
            if defaults.contains(key) {
                params.insert(key, value.clone());
            }
        }
    }
    for (key, value) in call {
        if !defaults.contains(key) {
            return Err(CircuitError::UnknownParameter {
                instance: path.to_string(),
                param: key.to_string(),
            });
        }
        params.insert(key, value.clone());
    }
    Ok(params)
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Batch length agreement across every leaf of one evaluation.
#[derive(Debug, Default)]
pub struct BatchTracker {
    len: Option<usize>,
}

impl BatchTracker {
    /// Create a tracker with no batch length fixed yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check every parameter of a leaf against the batch length so far.
    pub fn observe(&mut self, instance: &str, params: &Settings) -> CircuitResult<()> {
        for (param, value) in params {
            let got = value.len();
            if got == 0 {
                return Err(CircuitError::Model {
                    instance: instance.to_string(),
                    source: IrError::EmptySweep(param.to_string()),
                });
            }
            if got == 1 {
                continue;
            }
            match self.len {
                None => self.len = Some(got),
                Some(expected) if expected != got => {
                    return Err(CircuitError::BatchMismatch {
                        instance: instance.to_string(),
                        param: param.to_string(),
                        expected,
                        got,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// The batch length fixed so far.
    pub fn len(&self) -> Option<usize> {
        self.len
    }
}

// ----------------------------------------------------------------------------
// Compilation
// ----------------------------------------------------------------------------

/// What an instance's component reference resolved to.
enum Resolved<'a> {
    Leaf {
        component: &'a str,
        model: ModelRef,
        source: String,
    },
    Netlist {
        component: &'a str,
        netlist: &'a Netlist,
        named: bool,
    },
}

/// Resolves and compiles the netlists of one build.
pub struct Compiler<'a> {
    netlists: &'a RecursiveNetlist,
    sources: &'a ModelSources,
    backend: BackendKind,
    modes: Option<&'a [String]>,
    named: FxHashMap<&'a str, Arc<CompiledCircuit>>,
}

impl<'a> Compiler<'a> {
    /// Create a compiler over a recursive netlist and model sources.
    pub fn new(
        netlists: &'a RecursiveNetlist,
        sources: &'a ModelSources,
        backend: BackendKind,
        modes: Option<&'a [String]>,
    ) -> CircuitResult<Self> {
        netlists.dependency_order()?;
        Ok(Self {
            netlists,
            sources,
            backend,
            modes,
            named: FxHashMap::default(),
        })
    }

    /// The top-level netlist.
    pub fn top(&self) -> CircuitResult<&'a Netlist> {
        self.netlists
            .top()
            .map(|(_, net)| net)
            .ok_or(CircuitError::EmptyNetlist)
    }

    fn resolve(&self, instance: &str, component: &'a ComponentRef) -> CircuitResult<Resolved<'a>> {
        match component {
            ComponentRef::Netlist(net) => Ok(Resolved::Netlist {
                component: INLINE_COMPONENT,
                netlist: net.as_ref(),
                named: false,
            }),
            ComponentRef::Name(name) => {
                if let Some(net) = self.netlists.get(name) {
                    return Ok(Resolved::Netlist {
                        component: name,
                        netlist: net,
                        named: true,
                    });
                }
                let (model, source) =
                    self.sources
                        .resolve(name)
                        .ok_or_else(|| CircuitError::UnknownComponent {
                            instance: instance.to_string(),
                            component: name.clone(),
                        })?;
                let source = source.to_string();
                Ok(Resolved::Leaf {
                    component: name,
                    model,
                    source,
                })
            }
        }
    }

    /// Structural identity of `net`, used as the cache key.
    pub fn key(&self, net: &'a Netlist) -> CircuitResult<CircuitKey> {
        let mut instances = Vec::with_capacity(net.instances.len());
        for (name, inst) in &net.instances {
            let node = match self.resolve(name, &inst.component)? {
                Resolved::Leaf {
                    component, model, ..
                } => NodeKey::Leaf {
                    component: component.to_string(),
                    model: Arc::as_ptr(&model) as *const () as usize,
                },
                Resolved::Netlist { netlist, .. } => NodeKey::Netlist(Box::new(self.key(netlist)?)),
            };
            instances.push((name.clone(), node));
        }
        Ok(CircuitKey::new(
            instances,
            &net.connections,
            &net.ports,
            self.modes,
            self.backend,
        ))
    }

    /// Compile `net` and every netlist it uses.
    pub fn compile(&mut self, net: &'a Netlist) -> CircuitResult<Arc<CompiledCircuit>> {
        if net.instances.is_empty() {
            return Err(CircuitError::EmptyNetlist);
        }

        let mut instances = Vec::with_capacity(net.instances.len());
        for (name, inst) in &net.instances {
            let compiled = match self.resolve(name, &inst.component)? {
                Resolved::Leaf {
                    component,
                    model,
                    source,
                } => CompiledInstance {
                    name: name.clone(),
                    component: component.to_string(),
                    ports: self.base_ports(&model.ports()),
                    node: Node::Leaf {
                        defaults: model.settings(),
                        model,
                        source,
                    },
                },
                Resolved::Netlist {
                    component,
                    netlist,
                    named,
                } => {
                    let sub = if named {
                        self.compile_named(component, netlist)?
                    } else {
                        self.compile(netlist)?
                    };
                    CompiledInstance {
                        name: name.clone(),
                        component: component.to_string(),
                        ports: netlist.ports.keys().cloned().collect(),
                        node: Node::Circuit(sub),
                    }
                }
            };
            instances.push(compiled);
        }

        validate(net, &instances)?;
        let plan = self.plan(net, &instances)?;
        debug!(
            "Compiled netlist: {} instances, {} internal ports, {} external ports",
            instances.len(),
            plan.num_internal(),
            plan.num_external()
        );

        Ok(Arc::new(CompiledCircuit {
            instances,
            plan,
            backend: self.backend,
            modes: self.modes.map(<[String]>::to_vec),
        }))
    }

    fn compile_named(
        &mut self,
        name: &'a str,
        net: &'a Netlist,
    ) -> CircuitResult<Arc<CompiledCircuit>> {
        if let Some(done) = self.named.get(name) {
            return Ok(Arc::clone(done));
        }
        let compiled = self.compile(net)?;
        self.named.insert(name, Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Port names without mode tags, in declaration order.
    ///
    /// Single-mode circuits use port names exactly as declared.
    fn base_ports(&self, ports: &[String]) -> Vec<String> {
        if self.modes.is_none() {
            return ports.to_vec();
        }
        let mut out: Vec<String> = Vec::with_capacity(ports.len());
        for port in ports {
            let base = split_mode(port).0;
            if !out.iter().any(|p| p == base) {
                out.push(base.to_string());
            }
        }
        out
    }

    fn expand(&self, ports: &[String]) -> Vec<String> {
        match self.modes {
            Some(modes) => expand_ports(ports, modes),
            None => ports.to_vec(),
        }
    }

    fn plan(&self, net: &Netlist, instances: &[CompiledInstance]) -> CircuitResult<EliminationPlan> {
        let mut ports = Vec::new();
        for inst in instances {
            for port in self.expand(&inst.ports) {
                ports.push(PortRef::new(inst.name.clone(), port).to_string());
            }
        }
        let index: FxHashMap<&str, usize> = ports
            .iter()
            .enumerate()
            .map(|(i, p)| (p.as_str(), i))
            .collect();
        let lookup = |r: &PortRef, mode: Option<&str>| -> CircuitResult<usize> {
            let port = match mode {
                Some(m) => r.with_mode(m).to_string(),
                None => r.to_string(),
            };
            index
                .get(port.as_str())
                .copied()
                .ok_or_else(|| CircuitError::UnknownPort {
                    instance: r.instance.clone(),
                    port: r.port.clone(),
                })
        };

        let modes: Vec<Option<&str>> = match self.modes {
            Some(modes) => modes.iter().map(|m| Some(m.as_str())).collect(),
            None => vec![None],
        };
        let mut connections = Vec::with_capacity(net.connections.len() * modes.len());
        for conn in &net.connections {
            for &mode in &modes {
                connections.push((lookup(&conn.a, mode)?, lookup(&conn.b, mode)?));
            }
        }
        let mut externals = Vec::with_capacity(net.ports.len() * modes.len());
        for (name, target) in &net.ports {
            for &mode in &modes {
                let external = match mode {
                    Some(m) => with_mode(name, m),
                    None => name.clone(),
                };
                externals.push((external, lookup(target, mode)?));
            }
        }

        Ok(EliminationPlan::new(ports, &connections, &externals)?)
    }
}

/// Check references, port usage and completeness of a netlist.
fn validate(net: &Netlist, instances: &[CompiledInstance]) -> CircuitResult<()> {
    let ports_of: FxHashMap<&str, &[String]> = instances
        .iter()
        .map(|i| (i.name.as_str(), i.ports.as_slice()))
        .collect();

    let mut used: FxHashSet<&PortRef> = FxHashSet::default();
    let references = net
        .connections
        .iter()
        .flat_map(|c| c.ends())
        .chain(net.ports.values());
    for r in references {
        let ports = ports_of
            .get(r.instance.as_str())
            .ok_or_else(|| CircuitError::UnknownInstance {
                instance: r.instance.clone(),
                reference: r.to_string(),
            })?;
        if !ports.iter().any(|p| *p == r.port) {
            return Err(CircuitError::UnknownPort {
                instance: r.instance.clone(),
                port: r.port.clone(),
            });
        }
        if !used.insert(r) {
            return Err(CircuitError::DuplicatePort {
                instance: r.instance.clone(),
                port: r.port.clone(),
            });
        }
    }

    for inst in instances {
        for port in &inst.ports {
            if !used.contains(&PortRef::new(inst.name.clone(), port.clone())) {
                return Err(CircuitError::UnconnectedPort {
                    instance: inst.name.clone(),
                    port: port.clone(),
                });
            }
        }
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Netlist settings
// ----------------------------------------------------------------------------

/// Resolve the netlist-level settings of every leaf into dotted paths.
///
/// Settings on an instance that wraps a netlist are pushed down: undotted
/// keys reach every inner leaf that declares them and `inner.param` keys
/// reach the named inner instance. Outer settings override inner ones.
pub fn netlist_settings(
    netlists: &RecursiveNetlist,
    net: &Netlist,
    compiled: &CompiledCircuit,
) -> CircuitResult<Settings> {
    let mut out = Settings::new();
    collect_settings(netlists, net, compiled, &Settings::new(), "", &mut out)?;
    Ok(out)
}

fn collect_settings(
    netlists: &RecursiveNetlist,
    net: &Netlist,
    compiled: &CompiledCircuit,
    pushed: &Settings,
    prefix: &str,
    out: &mut Settings,
) -> CircuitResult<()> {
    let pushed_globals = pushed.globals();
    for (name, inst) in &net.instances {
        let Some(ci) = compiled.instance(name) else {
            continue;
        };
        let path = join_path(prefix, name);
        let scoped = pushed.scoped(name);
        match &ci.node {
            Node::Leaf { defaults, .. } => {
                if let Some(key) = inst
                    .settings
                    .keys()
                    .chain(scoped.keys())
                    .find(|k| !defaults.contains(k))
                {
                    return Err(CircuitError::UnknownParameter {
                        instance: path,
                        param: key.to_string(),
                    });
                }
                let mut leaf = inst.settings.clone();
                for (key, value) in &pushed_globals {
                    if defaults.contains(key) {
                        leaf.insert(key, value.clone());
                    }
                }
                leaf.overlay(&scoped);
                out.overlay(&leaf.prefixed(&path));
            }
            Node::Circuit(sub) => {
                let sub_net = match &inst.component {
                    ComponentRef::Netlist(inline) => inline.as_ref(),
                    ComponentRef::Name(component) => match netlists.get(component) {
                        Some(found) => found,
                        None => continue,
                    },
                };
                let settings = inst.settings.merged(&pushed_globals).merged(&scoped);
                collect_settings(netlists, sub_net, sub, &settings, &path, out)?;
            }
        }
    }
    Ok(())
}
