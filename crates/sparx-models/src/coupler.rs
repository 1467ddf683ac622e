//! Splitters and couplers.

use std::f64::consts::FRAC_1_SQRT_2;

use num_complex::Complex64;
use sparx_ir::{IrResult, Model, SDict, SType, Settings, reciprocal};

/// An ideal lossless directional coupler.
///
/// `coupling` is the power fraction crossing over. Bar transmission is
/// `sqrt(1 - coupling)`, cross transmission `-i sqrt(coupling)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Coupler;

impl Model for Coupler {
    fn ports(&self) -> Vec<String> {
        ["in0", "in1", "out0", "out1"].map(String::from).to_vec()
    }

    fn settings(&self) -> Settings {
        Settings::new().with("coupling", 0.5)
    }

    fn evaluate(&self, settings: &Settings) -> IrResult<SType> {
        let n = settings.batch_len()?;
        let coupling = settings.array("coupling", n)?;
        let tau = coupling.mapv(|c| Complex64::new((1.0 - c).sqrt(), 0.0));
        let kappa = coupling.mapv(|c| Complex64::new(0.0, -c.sqrt()));

        let mut s = SDict::with_ports(self.ports());
        s.insert("in0", "out0", tau.clone());
        s.insert("in1", "out1", tau);
        s.insert("in0", "out1", kappa.clone());
        s.insert("in1", "out0", kappa);
        Ok(reciprocal(&s).into())
    }

    fn describe(&self) -> String {
        "directional coupler (coupling = cross power fraction)".into()
    }
}

/// An ideal 1x2 splitter dividing power equally.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mmi1x2;

impl Model for Mmi1x2 {
    fn ports(&self) -> Vec<String> {
        ["in0", "out0", "out1"].map(String::from).to_vec()
    }

    fn settings(&self) -> Settings {
        Settings::new()
    }

    fn evaluate(&self, _settings: &Settings) -> IrResult<SType> {
        let t = Complex64::new(FRAC_1_SQRT_2, 0.0);
        let s = SDict::with_ports(self.ports())
            .with("in0", "out0", t)
            .with("in0", "out1", t);
        Ok(reciprocal(&s).into())
    }

    fn describe(&self) -> String {
        "1x2 splitter".into()
    }
}
