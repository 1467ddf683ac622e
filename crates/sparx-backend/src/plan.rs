//! Static elimination plans and the assembled block system.
//!
//! The global port space is the union of every instance's ports, each named
//! `instance,port`. A plan splits it into *internal* ports (joined pairwise
//! by connections) and *external* ports (exposed under a circuit port name).
//! With `M` the block-diagonal union of the instance relations, `C` the
//! permutation pairing each internal port with its partner, the circuit
//! relation over the external ports is
//!
//! ```text
//! S = M_ee + M_ei (C - M_ii)^-1 M_ie
//! ```
//!
//! The plan is fixed at build time; only [`BlockSystem`] values change per
//! evaluation.

use ndarray::{Array1, ArrayView2, ArrayViewMut2};
use num_complex::Complex64;
use rustc_hash::FxHashMap;
use sparx_ir::{PortRef, SDict};

use crate::error::{BackendError, BackendResult};

/// Where a global port ends up in the elimination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Position among the internal ports.
    Internal(usize),
    /// Position among the external ports.
    External(usize),
}

/// Port partitioning and pairing, independent of parameter values.
#[derive(Debug, Clone)]
pub struct EliminationPlan {
    ports: Vec<String>,
    index: FxHashMap<String, usize>,
    roles: Vec<Role>,
    internal: Vec<usize>,
    partner: Vec<usize>,
    external: Vec<usize>,
    external_names: Vec<String>,
}

impl EliminationPlan {
    /// Build a plan.
    ///
    /// `ports` are global port names, `connections` join pairs of global
    /// indices, and `externals` maps circuit port names to global indices.
    /// Every global port must be used exactly once. External ports are
    /// ordered by name.
    pub fn new(
        ports: Vec<String>,
        connections: &[(usize, usize)],
        externals: &[(String, usize)],
    ) -> BackendResult<Self> {
        let n = ports.len();
        let mut roles: Vec<Option<Role>> = vec![None; n];
        let mut internal = Vec::with_capacity(2 * connections.len());
        let mut partner = Vec::with_capacity(2 * connections.len());

        let claim = |idx: usize, role: Role, roles: &mut Vec<Option<Role>>| {
            match roles.get(idx) {
                None => Err(BackendError::InvalidPlan(format!(
                    "port index {idx} out of range for {n} ports"
                ))),
                Some(Some(_)) => Err(BackendError::InvalidPlan(format!(
                    "port '{}' used more than once",
                    ports[idx]
                ))),
                Some(None) => {
                    roles[idx] = Some(role);
                    Ok(())
                }
            }
        };

        for &(a, b) in connections {
            let ka = internal.len();
            claim(a, Role::Internal(ka), &mut roles)?;
            claim(b, Role::Internal(ka + 1), &mut roles)?;
            internal.extend([a, b]);
            partner.extend([ka + 1, ka]);
        }

        let mut sorted: Vec<&(String, usize)> = externals.iter().collect();
        sorted.sort_by(|x, y| x.0.cmp(&y.0));
        let mut external = Vec::with_capacity(sorted.len());
        let mut external_names = Vec::with_capacity(sorted.len());
        for (ke, (name, idx)) in sorted.into_iter().enumerate() {
            if external_names.last() == Some(name) {
                return Err(BackendError::InvalidPlan(format!(
                    "external port '{name}' declared twice"
                )));
            }
            claim(*idx, Role::External(ke), &mut roles)?;
            external.push(*idx);
            external_names.push(name.clone());
        }

        let roles = roles
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                r.ok_or_else(|| {
                    BackendError::InvalidPlan(format!(
                        "port '{}' is neither connected nor exposed",
                        ports[i]
                    ))
                })
            })
            .collect::<BackendResult<Vec<_>>>()?;

        let index = ports
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), i))
            .collect();

        Ok(Self {
            ports,
            index,
            roles,
            internal,
            partner,
            external,
            external_names,
        })
    }

    /// Global port names.
    pub fn ports(&self) -> &[String] {
        &self.ports
    }

    /// Global index of a port name.
    pub fn index_of(&self, port: &str) -> Option<usize> {
        self.index.get(port).copied()
    }

    /// Role of global port `idx`.
    pub fn role(&self, idx: usize) -> Role {
        self.roles[idx]
    }

    /// Number of internal ports.
    pub fn num_internal(&self) -> usize {
        self.internal.len()
    }

    /// Number of external ports.
    pub fn num_external(&self) -> usize {
        self.external.len()
    }

    /// Internal position of the partner of internal port `k`.
    pub fn partner(&self, k: usize) -> usize {
        self.partner[k]
    }

    /// Global index of internal port `k`.
    pub fn internal_port(&self, k: usize) -> usize {
        self.internal[k]
    }

    /// Global index of external port `k`.
    pub fn external_port(&self, k: usize) -> usize {
        self.external[k]
    }

    /// External port names, sorted.
    pub fn external_names(&self) -> &[String] {
        &self.external_names
    }
}

/// One non-zero block entry of the global relation.
#[derive(Debug, Clone)]
pub struct BlockEntry {
    /// Global source index.
    pub row: usize,
    /// Global destination index.
    pub col: usize,
    /// One sample, or one per batch element.
    pub values: Array1<Complex64>,
}

impl BlockEntry {
    /// Sample `b`, broadcasting single values.
    #[inline]
    pub fn at(&self, b: usize) -> Complex64 {
        if self.values.len() == 1 {
            self.values[0]
        } else {
            self.values[b]
        }
    }
}

/// Block-diagonal union of instance relations over the global port space.
#[derive(Debug, Clone, Default)]
pub struct BlockSystem {
    batch: usize,
    entries: Vec<BlockEntry>,
}

impl BlockSystem {
    /// Gather instance relations into global coordinates.
    ///
    /// Each relation's ports are local to its instance; they are mapped to
    /// `instance,port` in the plan. Batch lengths must agree up to
    /// broadcasting of single-sample relations.
    pub fn assemble<'a, I>(plan: &EliminationPlan, blocks: I) -> BackendResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a SDict)>,
    {
        let mut batch: Option<(usize, &str)> = None;
        let mut entries = Vec::new();

        for (instance, sdict) in blocks {
            let len = sdict.batch_len()?;
            match batch {
                _ if len == 1 => {}
                None => batch = Some((len, instance)),
                Some((expected, _)) if expected != len => {
                    return Err(BackendError::BatchMismatch {
                        instance: instance.to_string(),
                        expected,
                        got: len,
                    });
                }
                Some(_) => {}
            }

            let global = |port: &str| {
                plan.index_of(&PortRef::new(instance, port).to_string())
                    .ok_or_else(|| BackendError::UnknownPort {
                        instance: instance.to_string(),
                        port: port.to_string(),
                    })
            };
            for (p, q, values) in sdict.entries() {
                entries.push(BlockEntry {
                    row: global(p)?,
                    col: global(q)?,
                    values: values.clone(),
                });
            }
        }

        Ok(Self {
            batch: batch.map_or(1, |(n, _)| n),
            entries,
        })
    }

    /// Common batch length.
    pub fn batch_len(&self) -> usize {
        self.batch
    }

    /// All entries.
    pub fn entries(&self) -> &[BlockEntry] {
        &self.entries
    }

    /// Write `M_ee + M_ei X` for one sample into `out`.
    ///
    /// `x` is the `(internal, external)` solution of the connected-port
    /// system at that sample.
    pub fn combine(
        &self,
        plan: &EliminationPlan,
        sample: usize,
        x: ArrayView2<'_, Complex64>,
        mut out: ArrayViewMut2<'_, Complex64>,
    ) {
        for entry in &self.entries {
            let Role::External(ke) = plan.role(entry.row) else {
                continue;
            };
            let v = entry.at(sample);
            match plan.role(entry.col) {
                Role::External(kf) => out[[ke, kf]] += v,
                Role::Internal(ki) => {
                    let mut row = out.row_mut(ke);
                    row.scaled_add(v, &x.row(ki));
                }
            }
        }
    }
}
