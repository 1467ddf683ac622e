//! Evaluable circuits.

use std::fmt;
use std::sync::Arc;

use ndarray::s;
use num_complex::Complex64;
use sparx_ir::{IrError, IrResult, Model, Param, SDense, SType, Settings};
use tracing::{debug, instrument};

use crate::builder::ReturnType;
use crate::compiled::{BatchTracker, CompiledCircuit};
use crate::error::{CircuitError, CircuitResult};

/// A compiled circuit bound to its netlist-level settings.
///
/// Cloning is cheap; the compiled structure is shared.
#[derive(Clone)]
pub struct Circuit {
    compiled: Arc<CompiledCircuit>,
    netlist_settings: Settings,
    return_type: ReturnType,
}

impl Circuit {
    pub(crate) fn new(
        compiled: Arc<CompiledCircuit>,
        netlist_settings: Settings,
        return_type: ReturnType,
    ) -> Self {
        Self {
            compiled,
            netlist_settings,
            return_type,
        }
    }

    /// External ports in result order.
    pub fn ports(&self) -> &[String] {
        self.compiled.ports()
    }

    /// The shared compiled structure.
    pub fn compiled(&self) -> &Arc<CompiledCircuit> {
        &self.compiled
    }

    /// Representation returned by [`Circuit::evaluate`].
    pub fn return_type(&self) -> ReturnType {
        self.return_type
    }

    /// Netlist-level settings by dotted leaf path.
    pub fn netlist_settings(&self) -> &Settings {
        &self.netlist_settings
    }

    /// Every leaf parameter by dotted path, with netlist settings applied.
    pub fn default_settings(&self) -> Settings {
        self.compiled
            .default_settings()
            .merged(&self.netlist_settings)
    }

    /// Every leaf parameter name as an undotted global key, valued by the
    /// first leaf default found in instance order.
    pub fn global_settings(&self) -> Settings {
        self.compiled.global_defaults()
    }

    /// Evaluate as a dense stack over the external ports.
    ///
    /// Undotted keys apply to every leaf that declares the parameter.
    /// Dotted keys address one instance path and take precedence.
    #[instrument(skip(self, settings), fields(ports = self.ports().len()))]
    pub fn evaluate_dense(&self, settings: &Settings) -> CircuitResult<SDense> {
        self.evaluate_with(&self.netlist_settings, settings)
    }

    /// Evaluate in the configured return representation.
    pub fn evaluate(&self, settings: &Settings) -> CircuitResult<SType> {
        let dense = self.evaluate_dense(settings)?;
        Ok(match self.return_type {
            ReturnType::Dense => SType::Dense(dense),
            ReturnType::Dict => SType::from(dense).into_sdict().into(),
            ReturnType::Coo => SType::Coo(SType::from(dense).to_scoo()?),
        })
    }

    fn evaluate_with(&self, netlist: &Settings, call: &Settings) -> CircuitResult<SDense> {
        let mut batch = BatchTracker::new();
        let out = self
            .compiled
            .evaluate(netlist, call, &Settings::new(), "", &mut batch)?;
        debug!("Evaluated batch of {}", out.batch_len());
        Ok(out)
    }

    /// Central finite-difference derivative of the result with respect to one parameter.
    ///
    /// `param` is a dotted leaf path or an undotted global key. Its value is
    /// taken from `settings` or, failing that, from
    /// [`Circuit::default_settings`] for a dotted path and
    /// [`Circuit::global_settings`] for a global key, and must be a scalar.
    /// Both perturbed points are evaluated in one batched call, so other
    /// sweeps in `settings` are kept and the result carries their batch length.
    pub fn sensitivity(&self, settings: &Settings, param: &str, step: f64) -> CircuitResult<SDense> {
        if !(step.is_finite() && step > 0.0) {
            return Err(CircuitError::Sensitivity(format!(
                "step must be positive and finite, got {step}"
            )));
        }
        let value = match settings.get(param) {
            Some(v) => v.clone(),
            None => {
                let defaults = if param.contains('.') {
                    self.default_settings()
                } else {
                    self.global_settings()
                };
                defaults.get(param).cloned().ok_or_else(|| {
                    CircuitError::Sensitivity(format!("no value for parameter '{param}'"))
                })?
            }
        };
        let p0 = value.as_scalar().ok_or_else(|| {
            CircuitError::Sensitivity(format!("parameter '{param}' must be a scalar"))
        })?;

        let n = self.netlist_settings.merged(settings).batch_len()?;
        let mut call = tile(settings, n);
        let mut stacked = vec![p0 + step; n];
        stacked.extend(std::iter::repeat_n(p0 - step, n));
        call.insert(param, Param::Sweep(stacked));

        let result = self.evaluate_with(&tile(&self.netlist_settings, n), &call)?;
        let (ports, data) = result.into_parts();
        let plus = data.slice(s![..n, .., ..]);
        let minus = data.slice(s![n.., .., ..]);
        let scale = Complex64::new(0.5 / step, 0.0);
        let derivative = (&plus - &minus).mapv(|v| v * scale);
        Ok(SDense::new(ports, derivative)?)
    }
}

/// Repeat every sweep of `settings` twice along the batch axis.
///
/// Scalars are kept; a batch of one becomes two identical samples.
fn tile(settings: &Settings, n: usize) -> Settings {
    settings
        .iter()
        .map(|(key, value)| {
            let tiled = match value {
                Param::Sweep(values) if values.len() == n && n > 1 => {
                    Param::Sweep(values.iter().chain(values.iter()).copied().collect())
                }
                other => other.clone(),
            };
            (key, tiled)
        })
        .collect()
}

impl Model for Circuit {
    fn ports(&self) -> Vec<String> {
        self.compiled.ports().to_vec()
    }

    /// Dotted leaf paths plus every leaf parameter name as a global key.
    fn settings(&self) -> Settings {
        self.default_settings().merged(&self.global_settings())
    }

    /// Keys still holding their declared default are left to the inner
    /// layering, so an enclosing global reaches every leaf that declares it
    /// while inner netlist settings keep their values.
    fn evaluate(&self, settings: &Settings) -> IrResult<SType> {
        let declared = Model::settings(self);
        let explicit: Settings = settings
            .iter()
            .filter(|(key, value)| declared.get(key) != Some(*value))
            .map(|(key, value)| (key, value.clone()))
            .collect();
        Circuit::evaluate(self, &explicit).map_err(|e| IrError::Model(e.to_string()))
    }

    fn describe(&self) -> String {
        format!(
            "circuit with {} ports and {} leaves",
            self.compiled.ports().len(),
            self.compiled.num_leaves()
        )
    }
}

impl fmt::Debug for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Circuit")
            .field("ports", &self.ports())
            .field("backend", &self.compiled.backend())
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}
