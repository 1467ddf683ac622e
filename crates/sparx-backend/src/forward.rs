//! Forward-only elimination.
//!
//! Rewriting `(C - M_ii) X = M_ie` as `X = C (M_ie + M_ii X)` gives, for the
//! wave entering internal port `m` from its partner `p(m)`,
//!
//! ```text
//! X[m, :] = M[p(m), ext] + sum_j M[p(m), j] X[j, :]
//! ```
//!
//! When the declared entries induce no feedback path this is a substitution
//! in dependency order and needs no solve. Rows that are still being computed
//! when a feedback path reaches them read as zero, which truncates every
//! loop after its first pass. That precondition is not checked.

use ndarray::{Array2, Array3, Axis};
use num_complex::Complex64;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;
use tracing::debug;

use crate::backend::Backend;
use crate::error::BackendResult;
use crate::plan::{BlockSystem, EliminationPlan, Role};

/// Composes transmissions in dependency order without a linear solve.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardBackend;

/// Row evaluation order for the internal waves.
fn evaluation_order(plan: &EliminationPlan, system: &BlockSystem) -> Vec<usize> {
    let ni = plan.num_internal();
    let mut graph = DiGraph::<usize, ()>::with_capacity(ni, system.entries().len());
    let nodes: Vec<NodeIndex> = (0..ni).map(|k| graph.add_node(k)).collect();

    for entry in system.entries() {
        if let (Role::Internal(kr), Role::Internal(kc)) =
            (plan.role(entry.row), plan.role(entry.col))
        {
            graph.add_edge(nodes[plan.partner(kr)], nodes[kc], ());
        }
    }

    let mut order = Vec::with_capacity(ni);
    let mut dfs = DfsPostOrder::empty(&graph);
    for &start in &nodes {
        dfs.move_to(start);
        while let Some(node) = dfs.next(&graph) {
            order.push(graph[node]);
        }
    }
    order
}

impl Backend for ForwardBackend {
    fn name(&self) -> &'static str {
        "forward"
    }

    fn eliminate(
        &self,
        plan: &EliminationPlan,
        system: &BlockSystem,
    ) -> BackendResult<Array3<Complex64>> {
        let ni = plan.num_internal();
        let ne = plan.num_external();
        let batch = system.batch_len();
        debug!(
            "Forward elimination: {} internal, {} external, batch {}",
            ni, ne, batch
        );

        let order = evaluation_order(plan, system);

        // Entries leaving each internal port.
        let mut by_row: Vec<Vec<usize>> = vec![Vec::new(); ni];
        for (idx, entry) in system.entries().iter().enumerate() {
            if let Role::Internal(kr) = plan.role(entry.row) {
                by_row[kr].push(idx);
            }
        }

        let entries = system.entries();
        let mut out = Array3::<Complex64>::zeros((batch, ne, ne));
        for b in 0..batch {
            let mut x = Array2::<Complex64>::zeros((ni, ne));
            let mut done = vec![false; ni];
            for &m in &order {
                let mut row = ndarray::Array1::<Complex64>::zeros(ne);
                for &idx in &by_row[plan.partner(m)] {
                    let entry = &entries[idx];
                    let v = entry.at(b);
                    match plan.role(entry.col) {
                        Role::External(ke) => row[ke] += v,
                        Role::Internal(kc) if done[kc] => row.scaled_add(v, &x.row(kc)),
                        Role::Internal(_) => {}
                    }
                }
                x.row_mut(m).assign(&row);
                done[m] = true;
            }
            system.combine(plan, b, x.view(), out.index_axis_mut(Axis(0), b));
        }
        Ok(out)
    }
}
