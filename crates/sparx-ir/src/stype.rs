//! Conversions among the three scattering representations.
//!
//! Index assignment is deterministic: [`SDict`] keeps its ports sorted, so the
//! dense and coordinate forms derived from it always use lexicographic port
//! order. Conversions preserve the batch axis; single-sample entries of a
//! batched [`SDict`] are broadcast.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Array3};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::IrResult;
use crate::scoo::SCoo;
use crate::sdense::SDense;
use crate::sdict::SDict;

/// Any of the three scattering representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SType {
    /// Sparse port-pair mapping.
    Dict(SDict),
    /// Dense batched matrix.
    Dense(SDense),
    /// Coordinate-sparse arrays.
    Coo(SCoo),
}

impl SType {
    /// Ports of the relation, sorted for dict form and in index order otherwise.
    pub fn ports(&self) -> Vec<String> {
        match self {
            SType::Dict(s) => s.port_names(),
            SType::Dense(s) => s.ports().to_vec(),
            SType::Coo(s) => s.ports().to_vec(),
        }
    }

    /// Number of batch samples.
    pub fn batch_len(&self) -> IrResult<usize> {
        match self {
            SType::Dict(s) => s.batch_len(),
            SType::Dense(s) => Ok(s.batch_len()),
            SType::Coo(s) => Ok(s.batch_len()),
        }
    }

    /// Convert to [`SDict`].
    pub fn to_sdict(&self) -> SDict {
        match self {
            SType::Dict(s) => s.clone(),
            SType::Dense(s) => dense_to_dict(s),
            SType::Coo(s) => coo_to_dict(s),
        }
    }

    /// Convert to [`SDense`].
    pub fn to_sdense(&self) -> IrResult<SDense> {
        match self {
            SType::Dict(s) => dict_to_dense(s),
            SType::Dense(s) => Ok(s.clone()),
            SType::Coo(s) => dict_to_dense(&coo_to_dict(s)),
        }
    }

    /// Convert to [`SCoo`].
    pub fn to_scoo(&self) -> IrResult<SCoo> {
        match self {
            SType::Dict(s) => dict_to_coo(s),
            SType::Dense(s) => dict_to_coo(&dense_to_dict(s)),
            SType::Coo(s) => Ok(s.clone()),
        }
    }

    /// Consume into [`SDict`].
    pub fn into_sdict(self) -> SDict {
        match self {
            SType::Dict(s) => s,
            other => other.to_sdict(),
        }
    }
}

impl From<SDict> for SType {
    fn from(s: SDict) -> Self {
        SType::Dict(s)
    }
}

impl From<SDense> for SType {
    fn from(s: SDense) -> Self {
        SType::Dense(s)
    }
}

impl From<SCoo> for SType {
    fn from(s: SCoo) -> Self {
        SType::Coo(s)
    }
}

/// Convert any representation to [`SDict`].
pub fn sdict(s: impl Into<SType>) -> SDict {
    s.into().into_sdict()
}

/// Convert any representation to [`SDense`].
pub fn sdense(s: impl Into<SType>) -> IrResult<SDense> {
    s.into().to_sdense()
}

/// Convert any representation to [`SCoo`].
pub fn scoo(s: impl Into<SType>) -> IrResult<SCoo> {
    s.into().to_scoo()
}

fn dict_to_dense(s: &SDict) -> IrResult<SDense> {
    let ports = s.port_names();
    let index: BTreeMap<&str, usize> = ports.iter().enumerate().map(|(i, p)| (p.as_str(), i)).collect();
    let batch = s.batch_len()?;
    let n = ports.len();
    let mut data = Array3::<Complex64>::zeros((batch, n, n));
    for (p, q, v) in s.entries() {
        let (i, j) = (index[p], index[q]);
        for b in 0..batch {
            data[[b, i, j]] = if v.len() == 1 { v[0] } else { v[b] };
        }
    }
    SDense::new(ports, data)
}

fn dict_to_coo(s: &SDict) -> IrResult<SCoo> {
    let ports = s.port_names();
    let index: BTreeMap<&str, usize> = ports.iter().enumerate().map(|(i, p)| (p.as_str(), i)).collect();
    let batch = s.batch_len()?;
    let nnz = s.len();
    let mut rows = Vec::with_capacity(nnz);
    let mut cols = Vec::with_capacity(nnz);
    let mut values = Array2::<Complex64>::zeros((batch, nnz));
    for (k, (p, q, v)) in s.entries().enumerate() {
        rows.push(index[p]);
        cols.push(index[q]);
        for b in 0..batch {
            values[[b, k]] = if v.len() == 1 { v[0] } else { v[b] };
        }
    }
    SCoo::new(ports, rows, cols, values)
}

fn dense_to_dict(s: &SDense) -> SDict {
    let ports = s.ports();
    let data = s.data();
    let mut out = SDict::with_ports(ports.iter().cloned());
    for (i, p) in ports.iter().enumerate() {
        for (j, q) in ports.iter().enumerate() {
            let column = data.slice(ndarray::s![.., i, j]);
            if column.iter().any(|v| *v != Complex64::new(0.0, 0.0)) {
                out.insert(p.clone(), q.clone(), column.to_owned());
            }
        }
    }
    out
}

fn coo_to_dict(s: &SCoo) -> SDict {
    let mut out = SDict::with_ports(s.ports().iter().cloned());
    let mut summed: BTreeMap<(&str, &str), Array1<Complex64>> = BTreeMap::new();
    for (p, q, v) in s.iter() {
        summed
            .entry((p, q))
            .and_modify(|acc| *acc += &v)
            .or_insert_with(|| v.to_owned());
    }
    for ((p, q), v) in summed {
        out.insert(p, q, v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    fn example() -> SDict {
        SDict::new()
            .with("in0", "out0", Complex64::new(0.6, 0.8))
            .with("out0", "in0", Complex64::new(0.6, 0.8))
            .with("in0", "in0", c(0.1))
    }

    #[test]
    fn test_dict_dense_roundtrip() {
        let s = example();
        let dense = sdense(s.clone()).unwrap();
        assert_eq!(dense.ports(), &["in0".to_string(), "out0".to_string()]);
        assert_eq!(dense.get("out0", "out0", 0).unwrap(), c(0.0));
        let back = sdict(dense);
        assert_eq!(back, s);
    }

    #[test]
    fn test_dict_coo_keeps_explicit_zero() {
        let s = example().with("out0", "out0", c(0.0));
        let coo = scoo(s.clone()).unwrap();
        assert_eq!(coo.nnz(), 4);
        let back = sdict(coo);
        assert_eq!(back, s);
    }

    #[test]
    fn test_coo_duplicates_are_summed() {
        let ports = vec!["a".to_string(), "b".to_string()];
        let values = Array2::from_shape_vec((1, 2), vec![c(0.25), c(0.5)]).unwrap();
        let coo = SCoo::new(ports, vec![0, 0], vec![1, 1], values).unwrap();
        assert_eq!(sdict(coo).value("a", "b", 0), c(0.75));
    }

    #[test]
    fn test_batch_preserved() {
        let mut s = SDict::new();
        s.insert("a", "b", Array1::from_vec(vec![c(1.0), c(2.0), c(3.0)]));
        s.insert_scalar("b", "a", c(5.0));
        let dense = sdense(s.clone()).unwrap();
        assert_eq!(dense.batch_len(), 3);
        assert_eq!(dense.get("b", "a", 2).unwrap(), c(5.0));
        let coo = scoo(s).unwrap();
        assert_eq!(coo.batch_len(), 3);
    }

    #[test]
    fn test_stype_serde_tag() {
        let st = SType::from(example());
        let json = serde_json::to_value(&st).unwrap();
        assert_eq!(json["kind"], "dict");
        let back: SType = serde_json::from_value(json).unwrap();
        assert_eq!(back, st);
    }
}
