//! Sparse port-pair mapping of scattering values.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};

/// Batched complex samples of one S-matrix entry.
pub type Batch = Array1<Complex64>;

/// A scattering relation keyed by `(from, to)` port pairs.
///
/// Absent pairs are zero. Every entry carries either a single sample (which
/// broadcasts) or one sample per batch element. The port set is tracked
/// explicitly so that ports with no declared entries still belong to the
/// relation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "SDictRepr", try_from = "SDictRepr")]
pub struct SDict {
    ports: BTreeSet<String>,
    entries: BTreeMap<(String, String), Batch>,
}

impl SDict {
    /// Create an empty relation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty relation over `ports`.
    pub fn with_ports<I, S>(ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ports: ports.into_iter().map(Into::into).collect(),
            entries: BTreeMap::new(),
        }
    }

    /// Declare a port without adding entries.
    pub fn add_port(&mut self, port: impl Into<String>) {
        self.ports.insert(port.into());
    }

    /// Insert a batched entry, declaring both ports.
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>, values: Batch) {
        let from = from.into();
        let to = to.into();
        self.ports.insert(from.clone());
        self.ports.insert(to.clone());
        self.entries.insert((from, to), values);
    }

    /// Insert a single-sample entry.
    pub fn insert_scalar(&mut self, from: impl Into<String>, to: impl Into<String>, value: Complex64) {
        self.insert(from, to, Array1::from_elem(1, value));
    }

    /// Builder-style [`SDict::insert_scalar`].
    #[must_use]
    pub fn with(mut self, from: impl Into<String>, to: impl Into<String>, value: Complex64) -> Self {
        self.insert_scalar(from, to, value);
        self
    }

    /// The declared entry for `(from, to)`, if any.
    pub fn get(&self, from: &str, to: &str) -> Option<&Batch> {
        self.entries.get(&(from.to_string(), to.to_string()))
    }

    /// Sample `sample` of `(from, to)`, zero when undeclared.
    pub fn value(&self, from: &str, to: &str, sample: usize) -> Complex64 {
        match self.get(from, to) {
            Some(v) if v.len() == 1 => v[0],
            Some(v) => v.get(sample).copied().unwrap_or_default(),
            None => Complex64::new(0.0, 0.0),
        }
    }

    /// Whether `(from, to)` is declared.
    pub fn contains(&self, from: &str, to: &str) -> bool {
        self.get(from, to).is_some()
    }

    /// Port set in sorted order.
    pub fn ports(&self) -> impl Iterator<Item = &str> {
        self.ports.iter().map(String::as_str)
    }

    /// Port set as owned, sorted names.
    pub fn port_names(&self) -> Vec<String> {
        self.ports.iter().cloned().collect()
    }

    /// Number of ports.
    pub fn num_ports(&self) -> usize {
        self.ports.len()
    }

    /// Whether `port` belongs to the relation.
    pub fn has_port(&self, port: &str) -> bool {
        self.ports.contains(port)
    }

    /// Declared entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &Batch)> {
        self.entries
            .iter()
            .map(|((p, q), v)| (p.as_str(), q.as_str(), v))
    }

    /// Number of declared entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The common batch length of all entries.
    pub fn batch_len(&self) -> IrResult<usize> {
        let mut batch = 1;
        for ((p, q), v) in &self.entries {
            match (batch, v.len()) {
                (_, 0) => return Err(IrError::Shape(format!("entry ({p}, {q}) has no samples"))),
                (_, 1) => {}
                (1, n) => batch = n,
                (b, n) if b == n => {}
                (b, n) => {
                    return Err(IrError::Shape(format!(
                        "entry ({p}, {q}) has {n} samples, expected {b}"
                    )));
                }
            }
        }
        Ok(batch)
    }

    /// Rename every port through `f`.
    #[must_use]
    pub fn map_ports(&self, f: impl Fn(&str) -> String) -> SDict {
        SDict {
            ports: self.ports.iter().map(|p| f(p)).collect(),
            entries: self
                .entries
                .iter()
                .map(|((p, q), v)| ((f(p), f(q)), v.clone()))
                .collect(),
        }
    }

    /// Whether every entry matches `other` within `tol`, treating absent entries as zero.
    pub fn approx_eq(&self, other: &SDict, tol: f64) -> bool {
        if self.ports != other.ports {
            return false;
        }
        let (Ok(a), Ok(b)) = (self.batch_len(), other.batch_len()) else {
            return false;
        };
        let batch = a.max(b);
        let keys: BTreeSet<_> = self.entries.keys().chain(other.entries.keys()).collect();
        keys.into_iter().all(|(p, q)| {
            (0..batch).all(|i| (self.value(p, q, i) - other.value(p, q, i)).norm() <= tol)
        })
    }
}

/// Wire form of an [`SDict`]: entries are a list since JSON keys must be strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SDictRepr {
    ports: Vec<String>,
    entries: Vec<SDictEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SDictEntry {
    from: String,
    to: String,
    values: Vec<Complex64>,
}

impl From<SDict> for SDictRepr {
    fn from(s: SDict) -> Self {
        Self {
            ports: s.ports.into_iter().collect(),
            entries: s
                .entries
                .into_iter()
                .map(|((from, to), v)| SDictEntry {
                    from,
                    to,
                    values: v.to_vec(),
                })
                .collect(),
        }
    }
}

impl TryFrom<SDictRepr> for SDict {
    type Error = IrError;

    fn try_from(repr: SDictRepr) -> IrResult<Self> {
        let mut sdict = SDict::with_ports(repr.ports);
        for entry in repr.entries {
            sdict.insert(entry.from, entry.to, Array1::from_vec(entry.values));
        }
        sdict.batch_len()?;
        Ok(sdict)
    }
}
