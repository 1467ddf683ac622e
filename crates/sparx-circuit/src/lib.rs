//! Sparx Circuit Builder
//!
//! This crate turns a (possibly nested) netlist plus model sources into an
//! evaluable [`Circuit`].
//!
//! # Overview
//!
//! Building happens once per netlist structure:
//! 1. **Resolution**: every instance is matched to a sub-netlist or to a
//!    model from the first [`ModelSources`] entry that provides it
//! 2. **Validation**: every reference names a known instance port, no port
//!    is used twice, every port is connected or exposed
//! 3. **Compilation**: ports are expanded into modes and an elimination plan
//!    is fixed for each netlist level
//!
//! Compiled structures are memoized in a [`CircuitCache`] keyed by structure
//! only, so rebuilding a netlist with different instance settings is cheap.
//! Parameter values enter at evaluation time, layered from lowest to highest
//! precedence:
//!
//! | Layer | Example key |
//! |-------|-------------|
//! | model default | (declared by the model) |
//! | netlist instance setting | `"settings": {"length": 25.0}` |
//! | global call setting | `wl` |
//! | path-addressed call setting | `top.length`, `outer.inner.wl` |
//!
//! # Example
//!
//! ```rust
//! use num_complex::Complex64;
//! use sparx_circuit::CircuitBuilder;
//! use sparx_ir::{FnModel, ModelTable, Netlist, SDict, Settings};
//!
//! let phase = FnModel::new("phase", &["in0", "out0"], Settings::new().with("phi", 0.0), |s| {
//!     let t = Complex64::from_polar(1.0, s.scalar("phi")?);
//!     Ok(SDict::new().with("in0", "out0", t).with("out0", "in0", t).into())
//! });
//! let models = ModelTable::new("local").with("phase", phase.into_ref());
//!
//! let net = Netlist::from_json_str(r#"{
//!     "instances": {"a": "phase", "b": "phase"},
//!     "connections": {"a,out0": "b,in0"},
//!     "ports": {"in0": "a,in0", "out0": "b,out0"}
//! }"#).unwrap();
//!
//! let (circuit, info) = CircuitBuilder::new(net).with_models(models).build().unwrap();
//! assert_eq!(info.ports, vec!["in0", "out0"]);
//!
//! let s = circuit
//!     .evaluate_dense(&Settings::new().with("a.phi", 0.5).with("b.phi", 1.0))
//!     .unwrap();
//! let expected = Complex64::from_polar(1.0, 1.5);
//! assert!((s.get("in0", "out0", 0).unwrap() - expected).norm() < 1e-12);
//! ```

pub mod builder;
pub mod cache;
pub mod circuit;
pub mod compiled;
pub mod error;
pub mod info;
pub mod source;

pub use builder::{CircuitBuilder, CircuitOptions, ReturnType, build};
pub use cache::{CircuitCache, CircuitKey, NodeKey};
pub use circuit::Circuit;
pub use compiled::{CompiledCircuit, CompiledInstance, Node};
pub use error::{CircuitError, CircuitResult};
pub use info::{CircuitInfo, InstanceInfo};
pub use source::ModelSources;

// Re-export the backend selector for convenience
pub use sparx_backend::BackendKind;
