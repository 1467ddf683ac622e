//! Partial reflectors.

use num_complex::Complex64;
use sparx_ir::{IrResult, Model, SDict, SType, Settings, reciprocal};

/// A lossless partial mirror reflecting on both sides.
///
/// `reflection` is the reflected power fraction. Reflection is real,
/// transmission carries a `+i` phase so the relation stays unitary.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mirror;

impl Model for Mirror {
    fn ports(&self) -> Vec<String> {
        vec!["in0".into(), "out0".into()]
    }

    fn settings(&self) -> Settings {
        Settings::new().with("reflection", 0.5)
    }

    fn evaluate(&self, settings: &Settings) -> IrResult<SType> {
        let n = settings.batch_len()?;
        let reflection = settings.array("reflection", n)?;
        let r = reflection.mapv(|p| Complex64::new(p.sqrt(), 0.0));
        let t = reflection.mapv(|p| Complex64::new(0.0, (1.0 - p).sqrt()));

        let mut s = SDict::with_ports(self.ports());
        s.insert("in0", "in0", r.clone());
        s.insert("out0", "out0", r);
        s.insert("in0", "out0", t);
        Ok(reciprocal(&s).into())
    }

    fn describe(&self) -> String {
        "partial mirror (reflection = reflected power fraction)".into()
    }
}
