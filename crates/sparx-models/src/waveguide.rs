//! Two-port transmission elements.

use std::f64::consts::PI;

use ndarray::{Array1, Zip};
use num_complex::Complex64;
use sparx_ir::{Batch, IrResult, Model, SDict, SType, Settings, reciprocal};

/// Field amplitude after `db` decibels of power loss.
pub(crate) fn db_to_amplitude(db: f64) -> f64 {
    10f64.powf(-db / 20.0)
}

/// Elementwise `amplitude * exp(i phase)`.
pub(crate) fn polar(amplitude: &Array1<f64>, phase: &Array1<f64>) -> Batch {
    Zip::from(amplitude)
        .and(phase)
        .map_collect(|&a, &p| Complex64::from_polar(a, p))
}

/// Symmetric `in0 <-> out0` relation.
fn two_port(t: Batch) -> SType {
    let mut s = SDict::with_ports(["in0", "out0"]);
    s.insert("in0", "out0", t);
    reciprocal(&s).into()
}

/// A straight waveguide with first-order dispersion.
///
/// The effective index at `wl` is `neff - (wl - wl0) * (ng - neff) / wl0`;
/// `loss` is in dB per unit length.
#[derive(Debug, Clone, Copy, Default)]
pub struct Straight;

impl Model for Straight {
    fn ports(&self) -> Vec<String> {
        vec!["in0".into(), "out0".into()]
    }

    fn settings(&self) -> Settings {
        Settings::new()
            .with("wl", 1.55)
            .with("wl0", 1.55)
            .with("neff", 2.34)
            .with("ng", 3.4)
            .with("length", 10.0)
            .with("loss", 0.0)
    }

    fn evaluate(&self, settings: &Settings) -> IrResult<SType> {
        let n = settings.batch_len()?;
        let wl = settings.array("wl", n)?;
        let wl0 = settings.array("wl0", n)?;
        let neff = settings.array("neff", n)?;
        let ng = settings.array("ng", n)?;
        let length = settings.array("length", n)?;
        let loss = settings.array("loss", n)?;

        let neff_wl = &neff - &((&wl - &wl0) * (&ng - &neff) / &wl0);
        let phase = 2.0 * PI * &neff_wl * &length / &wl;
        let amplitude = (&loss * &length).mapv(db_to_amplitude);
        Ok(two_port(polar(&amplitude, &phase)))
    }

    fn describe(&self) -> String {
        "straight waveguide".into()
    }
}

/// A lossy element with no phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct Attenuator;

impl Model for Attenuator {
    fn ports(&self) -> Vec<String> {
        vec!["in0".into(), "out0".into()]
    }

    fn settings(&self) -> Settings {
        Settings::new().with("loss", 0.0)
    }

    fn evaluate(&self, settings: &Settings) -> IrResult<SType> {
        let n = settings.batch_len()?;
        let amplitude = settings.array("loss", n)?.mapv(db_to_amplitude);
        Ok(two_port(polar(&amplitude, &Array1::zeros(n))))
    }

    fn describe(&self) -> String {
        "attenuator (loss in dB)".into()
    }
}

/// A fixed phase shift with optional loss.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseShifter;

impl Model for PhaseShifter {
    fn ports(&self) -> Vec<String> {
        vec!["in0".into(), "out0".into()]
    }

    fn settings(&self) -> Settings {
        Settings::new().with("phase", 0.0).with("loss", 0.0)
    }

    fn evaluate(&self, settings: &Settings) -> IrResult<SType> {
        let n = settings.batch_len()?;
        let phase = settings.array("phase", n)?;
        let amplitude = settings.array("loss", n)?.mapv(db_to_amplitude);
        Ok(two_port(polar(&amplitude, &phase)))
    }

    fn describe(&self) -> String {
        "phase shifter (phase in rad, loss in dB)".into()
    }
}
