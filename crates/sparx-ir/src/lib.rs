//! Sparx Scattering Intermediate Representation
//!
//! This crate provides the data structures shared by every layer of sparx:
//! scattering relations, parameter settings, the leaf model contract and the
//! netlist description of a circuit.
//!
//! # Overview
//!
//! A scattering relation over a finite port set can be held in three
//! interchangeable encodings:
//!
//! - [`SDict`]: sparse `(from, to) -> samples` mapping, absent pairs are zero
//! - [`SDense`]: dense `(batch, n, n)` stack with a port order
//! - [`SCoo`]: coordinate arrays with `(batch, nnz)` values
//!
//! [`SType`] wraps any of them and converts between them deterministically
//! (ports in lexicographic order). [`reciprocal`] completes one-directional
//! entries, [`multimode`] and [`singlemode`] move between plain ports and the
//! `port@mode` product space.
//!
//! # Core Components
//!
//! - **Settings**: [`Param`] scalars and sweeps, [`Settings`] dotted-path maps
//! - **Models**: the [`Model`] trait, [`FnModel`] closures and [`ModelSource`]s
//! - **Netlists**: [`Netlist`], [`Instance`], [`Connection`] and the
//!   hierarchical [`RecursiveNetlist`]
//!
//! # Example: Sparse to Dense
//!
//! ```rust
//! use num_complex::Complex64;
//! use sparx_ir::{SDict, sdense};
//!
//! let s = SDict::new()
//!     .with("in0", "out0", Complex64::new(0.0, 1.0))
//!     .with("out0", "in0", Complex64::new(0.0, 1.0));
//!
//! let dense = sdense(s).unwrap();
//! assert_eq!(dense.ports(), &["in0".to_string(), "out0".to_string()]);
//! assert_eq!(dense.get("in0", "in0", 0).unwrap(), Complex64::new(0.0, 0.0));
//! ```
//!
//! # Example: Parsing a Netlist
//!
//! ```rust
//! use sparx_ir::Netlist;
//!
//! let net = Netlist::from_json_str(r#"{
//!     "instances": {"wg": {"component": "straight", "settings": {"length": 5.0}}},
//!     "ports": {"in0": "wg,in0", "out0": "wg,out0"}
//! }"#).unwrap();
//!
//! assert_eq!(net.instances_of_component("str"), vec!["wg"]);
//! ```

pub mod error;
pub mod model;
pub mod multimode;
pub mod netlist;
pub mod port;
pub mod reciprocal;
pub mod scoo;
pub mod sdense;
pub mod sdict;
pub mod settings;
pub mod stype;

pub use error::{IrError, IrResult};
pub use model::{FnModel, Model, ModelRef, ModelSource, ModelTable};
pub use multimode::{expand_ports, is_multimode, modes_of, multimode, singlemode};
pub use netlist::{
    ComponentRef, Connection, DEFAULT_FLATTEN_SEPARATOR, Instance, Netlist, RecursiveNetlist,
    TOP_LEVEL,
};
pub use port::{PortRef, is_mode_resolved, split_mode, with_mode};
pub use reciprocal::reciprocal;
pub use scoo::SCoo;
pub use sdense::SDense;
pub use sdict::{Batch, SDict};
pub use settings::{Param, Settings};
pub use stype::{SType, scoo, sdense, sdict};
