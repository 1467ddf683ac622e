//! Dense LU elimination.

use nalgebra::DMatrix;
use ndarray::{Array2, Array3, Axis};
use num_complex::Complex64;
use tracing::debug;

use crate::backend::Backend;
use crate::error::{BackendError, BackendResult};
use crate::plan::{BlockSystem, EliminationPlan, Role};

/// Solves the connected-port system with a dense complex LU per sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseBackend;

impl Backend for DenseBackend {
    fn name(&self) -> &'static str {
        "dense"
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
            "Dense elimination: {} internal, {} external, batch {}",
            ni, ne, batch
        );

        let mut out = Array3::<Complex64>::zeros((batch, ne, ne));
        for b in 0..batch {
            let mut a = DMatrix::<Complex64>::zeros(ni, ni);
            let mut rhs = DMatrix::<Complex64>::zeros(ni, ne);
            for k in 0..ni {
                a[(k, plan.partner(k))] += Complex64::new(1.0, 0.0);
            }
            for entry in system.entries() {
                let Role::Internal(ki) = plan.role(entry.row) else {
                    continue;
                };
                match plan.role(entry.col) {
                    Role::Internal(kj) => a[(ki, kj)] -= entry.at(b),
                    Role::External(ke) => rhs[(ki, ke)] += entry.at(b),
                }
            }

            let x = if ni == 0 {
                Array2::zeros((0, ne))
            } else {
                let solved = a.lu().solve(&rhs).ok_or_else(|| BackendError::Singular {
                    backend: self.name(),
                    sample: b,
                    detail: "LU factor is singular".into(),
                })?;
                if solved.iter().any(|v| !v.re.is_finite() || !v.im.is_finite()) {
                    return Err(BackendError::Singular {
                        backend: self.name(),
                        sample: b,
                        detail: "solution contains NaN/Inf".into(),
                    });
                }
                Array2::from_shape_fn((ni, ne), |(i, j)| solved[(i, j)])
            };

            system.combine(plan, b, x.view(), out.index_axis_mut(Axis(0), b));
        }
        Ok(out)
    }
}
