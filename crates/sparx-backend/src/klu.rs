//! Sparse-direct elimination.
//!
//! The connected-port system `(C - M_ii) X = M_ie` is sparse: `C` has one
//! entry per row and `M_ii` only couples ports of the same instance. Its
//! pattern depends on the plan and the declared entries only, so the symbolic
//! analysis runs once per call and every sample reuses it for a sparse QR
//! factorization. A rank-deficient system does not fail a pivot. It shows up as
//! non-finite values or a wrong answer for a right-hand side whose solution is
//! known, and is reported as [`BackendError::Singular`].

use faer::prelude::*;
use faer::sparse::linalg::solvers::{Qr, SymbolicQr};
use faer::sparse::{Argsort, Pair, SparseColMat, SymbolicSparseColMat};
use ndarray::{Array2, Array3, Axis};
use num_complex::Complex64;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::backend::Backend;
use crate::error::{BackendError, BackendResult};
use crate::plan::{BlockSystem, EliminationPlan, Role};

/// Relative residual above which a solution is treated as singular.
const RESIDUAL_TOLERANCE: f64 = 1e-8;

/// Largest error tolerated when re-solving for a known all-ones vector.
const UNIT_TOLERANCE: f64 = 1e-6;

/// Solves the connected-port system with a sparse factorization per sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct KluBackend;

/// Where one block entry lands in the connected-port system.
#[derive(Debug, Clone, Copy)]
enum Target {
    Matrix(usize),
    Rhs(usize, usize),
    Skip,
}

/// The sample-independent part of a sparse solve.
struct Pattern {
    symbolic: SymbolicSparseColMat<usize>,
    argsort: Argsort<usize>,
    qr: SymbolicQr<usize>,
    /// `(row, col)` of every stored value, in argsort input order.
    positions: Vec<(usize, usize)>,
    /// Value slot of each partner entry `(k, partner(k))`.
    partners: Vec<usize>,
    targets: Vec<Target>,
}

impl KluBackend {
    fn singular(&self, sample: usize, detail: String) -> BackendError {
        BackendError::Singular {
            backend: self.name(),
            sample,
            detail,
        }
    }

    fn analyze(&self, plan: &EliminationPlan, system: &BlockSystem) -> BackendResult<Pattern> {
        let ni = plan.num_internal();
        let mut slots: FxHashMap<(usize, usize), usize> = FxHashMap::default();
        let mut positions = Vec::new();
        let mut slot = |i: usize, j: usize| {
            *slots.entry((i, j)).or_insert_with(|| {
                positions.push((i, j));
                positions.len() - 1
            })
        };

        let partners: Vec<usize> = (0..ni).map(|k| slot(k, plan.partner(k))).collect();
        let targets: Vec<Target> = system
            .entries()
            .iter()
            .map(|entry| match (plan.role(entry.row), plan.role(entry.col)) {
                (Role::Internal(ki), Role::Internal(kj)) => Target::Matrix(slot(ki, kj)),
                (Role::Internal(ki), Role::External(ke)) => Target::Rhs(ki, ke),
                (Role::External(_), _) => Target::Skip,
            })
            .collect();

        let pairs: Vec<Pair<usize, usize>> =
            positions.iter().map(|&(i, j)| Pair::new(i, j)).collect();
        let (symbolic, argsort) = SymbolicSparseColMat::try_new_from_indices(ni, ni, &pairs)
            .map_err(|e| BackendError::InvalidPlan(format!("sparse pattern: {e:?}")))?;
        let qr = SymbolicQr::try_new(symbolic.as_ref())
            .map_err(|e| BackendError::InvalidPlan(format!("sparse symbolic analysis: {e:?}")))?;

        Ok(Pattern {
            symbolic,
            argsort,
            qr,
            positions,
            partners,
            targets,
        })
    }

    fn solve_sample(
        &self,
        plan: &EliminationPlan,
        system: &BlockSystem,
        pattern: &Pattern,
        sample: usize,
    ) -> BackendResult<Array2<Complex64>> {
        let ni = plan.num_internal();
        let ne = plan.num_external();

        let mut values = vec![Complex64::new(0.0, 0.0); pattern.positions.len()];
        // One extra column holding `A 1`, whose solution must come back as ones.
        let mut b = Mat::<c64>::zeros(ni, ne + 1);
        for &p in &pattern.partners {
            values[p] += Complex64::new(1.0, 0.0);
        }
        for (entry, target) in system.entries().iter().zip(&pattern.targets) {
            let v = entry.at(sample);
            match *target {
                Target::Matrix(p) => values[p] -= v,
                Target::Rhs(ki, ke) => b[(ki, ke)] += v,
                Target::Skip => {}
            }
        }
        if values.iter().any(|v| !v.re.is_finite() || !v.im.is_finite()) {
            return Err(self.singular(sample, "sparse system contains NaN/Inf".into()));
        }
        for (&(i, _), v) in pattern.positions.iter().zip(&values) {
            b[(i, ne)] += *v;
        }

        let a = SparseColMat::new_from_argsort(pattern.symbolic.clone(), &pattern.argsort, &values)
            .map_err(|e| self.singular(sample, format!("sparse matrix build failed: {e:?}")))?;
        let qr = Qr::try_new_with_symbolic(pattern.qr.clone(), a.as_ref())
            .map_err(|e| self.singular(sample, format!("sparse factorization failed: {e:?}")))?;
        let x = qr.solve(&b);

        let mut deviation = 0.0_f64;
        for i in 0..ni {
            let d = (x[(i, ne)] - Complex64::new(1.0, 0.0)).norm();
            deviation = if d.is_finite() { deviation.max(d) } else { f64::INFINITY };
        }
        if deviation > UNIT_TOLERANCE {
            return Err(self.singular(sample, format!("sparse solve lost rank ({deviation:.3e})")));
        }

        // b - A x over the stored pattern.
        let mut residual = b.clone();
        for (&(i, j), v) in pattern.positions.iter().zip(&values) {
            for col in 0..=ne {
                residual[(i, col)] -= *v * x[(j, col)];
            }
        }
        let scale = 1.0 + b.as_ref().norm_l2();
        let r = residual.as_ref().norm_l2();
        if !r.is_finite() || r > RESIDUAL_TOLERANCE * scale * (1.0 + x.as_ref().norm_l2()) {
            return Err(self.singular(sample, format!("sparse solve residual {r:.3e}")));
        }

        let mut out = Array2::<Complex64>::zeros((ni, ne));
        for i in 0..ni {
            for j in 0..ne {
                out[[i, j]] = x[(i, j)];
            }
        }
        Ok(out)
    }
}

impl Backend for KluBackend {
    fn name(&self) -> &'static str {
        "klu"
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
            "Sparse elimination: {} internal, {} external, batch {}",
            ni, ne, batch
        );

        let mut out = Array3::<Complex64>::zeros((batch, ne, ne));
        if ni == 0 {
            let x = Array2::zeros((0, ne));
            for b in 0..batch {
                system.combine(plan, b, x.view(), out.index_axis_mut(Axis(0), b));
            }
            return Ok(out);
        }

        let pattern = self.analyze(plan, system)?;
        for b in 0..batch {
            let x = self.solve_sample(plan, system, &pattern, b)?;
            system.combine(plan, b, x.view(), out.index_axis_mut(Axis(0), b));
        }
        Ok(out)
    }
}
