//! Port-elimination backends for sparx.
//!
//! A circuit is a block-diagonal union of instance relations plus a pairing
//! of connected ports. Eliminating the connected ports leaves the relation
//! over the circuit's external ports. The static part of that computation
//! (which ports are internal, who their partners are, the external port
//! order) lives in an [`EliminationPlan`] built once per circuit structure;
//! the numeric part is a [`BlockSystem`] assembled per evaluation.
//!
//! # Backends
//!
//! | Backend | Method | Topology |
//! |---------|--------|----------|
//! | [`DenseBackend`] | dense complex LU (nalgebra) | any, including resonant loops |
//! | [`KluBackend`] | sparse LU of the real embedding (faer) | any, same result as dense |
//! | [`ForwardBackend`] | substitution in dependency order | feedback-free only, unchecked |
//!
//! Every backend processes the whole batch in one call and fails the whole
//! call on the first singular sample.
//!
//! # Example
//!
//! ```rust
//! use num_complex::Complex64;
//! use sparx_backend::{BackendKind, BlockSystem, EliminationPlan};
//! use sparx_ir::SDict;
//!
//! let ports = ["a,in0", "a,out0", "b,in0", "b,out0"].map(String::from).to_vec();
//! let plan = EliminationPlan::new(
//!     ports,
//!     &[(1, 2)],
//!     &[("in0".to_string(), 0), ("out0".to_string(), 3)],
//! ).unwrap();
//!
//! let wg = SDict::new().with("in0", "out0", Complex64::new(0.0, 1.0));
//! let system = BlockSystem::assemble(&plan, [("a", &wg), ("b", &wg)]).unwrap();
//!
//! let s = BackendKind::Dense.backend().solve(&plan, &system).unwrap();
//! assert!((s.get("in0", "out0", 0).unwrap() + 1.0).norm() < 1e-12);
//! ```

pub mod backend;
pub mod dense;
pub mod error;
pub mod forward;
pub mod klu;
pub mod plan;

pub use backend::{Backend, BackendKind};
pub use dense::DenseBackend;
pub use error::{BackendError, BackendResult};
pub use forward::ForwardBackend;
pub use klu::KluBackend;
pub use plan::{BlockEntry, BlockSystem, EliminationPlan, Role};
