//! Ideal photonic component models for sparx.
//!
//! Every model is closed-form, reciprocal and broadcasts over parameter
//! sweeps. The [`Library`] source exposes them by component name:
//!
//! | Component | Ports | Parameters (defaults) |
//! |-----------|-------|-----------------------|
//! | `straight` | `in0, out0` | `wl=1.55, wl0=1.55, neff=2.34, ng=3.4, length=10.0, loss=0.0` |
//! | `coupler` | `in0, in1, out0, out1` | `coupling=0.5` |
//! | `attenuator` | `in0, out0` | `loss=0.0` |
//! | `phase_shifter` | `in0, out0` | `phase=0.0, loss=0.0` |
//! | `mirror` | `in0, out0` | `reflection=0.5` |
//! | `mmi1x2` | `in0, out0, out1` | |
//!
//! Lengths and wavelengths share one unit (micrometers by convention),
//! losses are in dB (per unit length for `straight`).
//!
//! # Example
//!
//! ```rust
//! use sparx_ir::{ModelSource, Settings};
//! use sparx_models::Library;
//!
//! let coupler = Library::new().get("coupler").unwrap();
//! let s = coupler.evaluate(&Settings::new().with("coupling", 0.5)).unwrap().into_sdict();
//! let total = s.value("in0", "out0", 0).norm_sqr() + s.value("in0", "out1", 0).norm_sqr();
//! assert!((total - 1.0).abs() < 1e-12);
//! ```

pub mod coupler;
pub mod library;
pub mod mirror;
pub mod waveguide;

pub use coupler::{Coupler, Mmi1x2};
pub use library::Library;
pub use mirror::Mirror;
pub use waveguide::{Attenuator, PhaseShifter, Straight};
