//! Parameter values and settings maps.
//!
//! Every parameter is either a scalar or a sweep (one value per batch
//! sample). A batch of length `n` is formed by broadcasting: scalars and
//! single-element sweeps stretch to `n`, every other sweep must have
//! exactly `n` samples.
//!
//! Settings keys are dotted paths. A key without a dot (`wl`) is global and
//! applies to every leaf that declares the parameter; `arm.length` addresses
//! the `length` parameter of instance `arm`; `mzi.arm.length` reaches one
//! level deeper into a nested netlist.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::port::PATH_SEPARATOR;

/// A single parameter value: a scalar or a sweep over the batch axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    /// One value shared by every batch sample.
    Scalar(f64),
    /// One value per batch sample.
    Sweep(Vec<f64>),
}

impl Param {
    /// Number of samples carried by this value.
    pub fn len(&self) -> usize {
        match self {
            Param::Scalar(_) => 1,
            Param::Sweep(v) => v.len(),
        }
    }

    /// Whether this is an empty sweep.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this value varies across the batch.
    pub fn is_sweep(&self) -> bool {
        self.len() > 1
    }

    /// The value as a scalar, if it has exactly one sample.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Param::Scalar(v) => Some(*v),
            Param::Sweep(v) if v.len() == 1 => Some(v[0]),
            Param::Sweep(_) => None,
        }
    }

    /// Sample `i`, broadcasting single values.
    pub fn at(&self, i: usize) -> f64 {
        match self {
            Param::Scalar(v) => *v,
            Param::Sweep(v) if v.len() == 1 => v[0],
            Param::Sweep(v) => v[i],
        }
    }

    /// The value broadcast to `len` samples, or `None` if it cannot be.
    pub fn broadcast(&self, len: usize) -> Option<Array1<f64>> {
        match self.len() {
            1 => Some(Array1::from_elem(len, self.at(0))),
            n if n == len => Some(self.to_array()),
            _ => None,
        }
    }

    /// The raw samples as an array.
    pub fn to_array(&self) -> Array1<f64> {
        match self {
            Param::Scalar(v) => Array1::from_elem(1, *v),
            Param::Sweep(v) => Array1::from_vec(v.clone()),
        }
    }

    /// A linearly spaced sweep of `n` samples from `start` to `stop` inclusive.
    pub fn linspace(start: f64, stop: f64, n: usize) -> Self {
        if n <= 1 {
            return Param::Sweep(vec![start; n]);
        }
        Param::Sweep(Array1::linspace(start, stop, n).to_vec())
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Scalar(v)
    }
}

impl From<Vec<f64>> for Param {
    fn from(v: Vec<f64>) -> Self {
        Param::Sweep(v)
    }
}

impl From<&[f64]> for Param {
    fn from(v: &[f64]) -> Self {
        Param::Sweep(v.to_vec())
    }
}

impl From<Array1<f64>> for Param {
    fn from(v: Array1<f64>) -> Self {
        Param::Sweep(v.to_vec())
    }
}

/// A map of parameter paths to values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: BTreeMap<String, Param>,
}

impl Settings {
    /// Create empty settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Param>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Param>) {
        self.values.insert(key.into(), value.into());
    }

    /// Remove a value.
    pub fn remove(&mut self, key: &str) -> Option<Param> {
        self.values.remove(key)
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&Param> {
        self.values.get(key)
    }

    /// Whether a value is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate over keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Copy every entry of `overlay` over `self`.
    pub fn overlay(&mut self, overlay: &Settings) {
        for (k, v) in &overlay.values {
            self.values.insert(k.clone(), v.clone());
        }
    }

    /// A copy of `self` with `overlay` applied on top.
    #[must_use]
    pub fn merged(&self, overlay: &Settings) -> Settings {
        let mut out = self.clone();
        out.overlay(overlay);
        out
    }

    /// Entries whose key has no path separator.
    pub fn globals(&self) -> Settings {
        self.values
            .iter()
            .filter(|(k, _)| !k.contains(PATH_SEPARATOR))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Entries below `prefix`, with `prefix.` stripped from their keys.
    pub fn scoped(&self, prefix: &str) -> Settings {
        self.values
            .iter()
            .filter_map(|(k, v)| {
                let (head, rest) = k.split_once(PATH_SEPARATOR)?;
                (head == prefix).then(|| (rest.to_string(), v.clone()))
            })
            .collect()
    }

    /// Every key prefixed with `prefix.`.
    pub fn prefixed(&self, prefix: &str) -> Settings {
        self.values
            .iter()
            .map(|(k, v)| (format!("{prefix}{PATH_SEPARATOR}{k}"), v.clone()))
            .collect()
    }

    /// First path segment of every dotted key.
    pub fn scopes(&self) -> BTreeSet<&str> {
        self.values
            .keys()
            .filter_map(|k| k.split_once(PATH_SEPARATOR).map(|(head, _)| head))
            .collect()
    }

    /// The common batch length of every value.
    ///
    /// Single-sample values broadcast; any two sweeps of different lengths
    /// are an error naming the second one.
    pub fn batch_len(&self) -> IrResult<usize> {
        let mut batch: Option<(usize, &str)> = None;
        for (key, value) in &self.values {
            let n = value.len();
            if n == 0 {
                return Err(IrError::EmptySweep(key.clone()));
            }
            if n == 1 {
                continue;
            }
            match batch {
                None => batch = Some((n, key)),
                Some((expected, _)) if expected != n => {
                    return Err(IrError::BatchMismatch {
                        param: key.clone(),
                        expected,
                        got: n,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(batch.map_or(1, |(n, _)| n))
    }

    /// The first value that varies across the batch, with its length.
    pub fn batch_driver(&self) -> Option<(&str, usize)> {
        self.values
            .iter()
            .find(|(_, v)| v.is_sweep())
            .map(|(k, v)| (k.as_str(), v.len()))
    }

    /// A required scalar value.
    pub fn scalar(&self, key: &str) -> IrResult<f64> {
        let value = self
            .get(key)
            .ok_or_else(|| IrError::MissingParameter(key.to_string()))?;
        value.as_scalar().ok_or(IrError::BatchMismatch {
            param: key.to_string(),
            expected: 1,
            got: value.len(),
        })
    }

    /// A required value broadcast to `len` samples.
    pub fn array(&self, key: &str, len: usize) -> IrResult<Array1<f64>> {
        let value = self
            .get(key)
            .ok_or_else(|| IrError::MissingParameter(key.to_string()))?;
        value.broadcast(len).ok_or(IrError::BatchMismatch {
            param: key.to_string(),
            expected: len,
            got: value.len(),
        })
    }
}

impl<K: Into<String>, P: Into<Param>> FromIterator<(K, P)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, P)>>(iter: I) -> Self {
        let mut settings = Settings::new();
        for (k, v) in iter {
            settings.insert(k, v);
        }
        settings
    }
}

impl<'a> IntoIterator for &'a Settings {
    type Item = (&'a String, &'a Param);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
