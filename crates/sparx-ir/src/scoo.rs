//! Coordinate-sparse batched scattering matrices.

use ndarray::{Array2, ArrayView1};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};

/// Coordinate encoding of a scattering relation.
///
/// Entry `k` maps `ports[rows[k]]` to `ports[cols[k]]`; `values` has shape
/// `(batch, nnz)`. Explicit zeros are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SCoo {
    ports: Vec<String>,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Array2<Complex64>,
}

impl SCoo {
    /// Create a coordinate relation, validating indices and shapes.
    pub fn new(
        ports: Vec<String>,
        rows: Vec<usize>,
        cols: Vec<usize>,
        values: Array2<Complex64>,
    ) -> IrResult<Self> {
        let (batch, nnz) = values.dim();
        if rows.len() != nnz || cols.len() != nnz {
            return Err(IrError::Shape(format!(
                "coordinate arrays have {} rows and {} cols for {nnz} values",
                rows.len(),
                cols.len()
            )));
        }
        if batch == 0 {
            return Err(IrError::Shape("coordinate values have an empty batch".into()));
        }
        let n = ports.len();
        if let Some(&bad) = rows.iter().chain(&cols).find(|&&i| i >= n) {
            return Err(IrError::Shape(format!(
                "index {bad} out of range for {n} ports"
            )));
        }
        Ok(Self {
            ports,
            rows,
            cols,
            values,
        })
    }

    /// Ports in index order.
    pub fn ports(&self) -> &[String] {
        &self.ports
    }

    /// Row (source port) indices.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Column (destination port) indices.
    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    /// Values of shape `(batch, nnz)`.
    pub fn values(&self) -> &Array2<Complex64> {
        &self.values
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.rows.len()
    }

    /// Number of batch samples.
    pub fn batch_len(&self) -> usize {
        self.values.dim().0
    }

    /// Samples of stored entry `k`.
    pub fn entry(&self, k: usize) -> ArrayView1<'_, Complex64> {
        self.values.column(k)
    }

    /// Iterate over `(from, to, samples)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, ArrayView1<'_, Complex64>)> {
        (0..self.nnz()).map(move |k| {
            (
                self.ports[self.rows[k]].as_str(),
                self.ports[self.cols[k]].as_str(),
                self.entry(k),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates() {
        let ports = vec!["a".to_string(), "b".to_string()];
        let values = Array2::from_elem((1, 1), Complex64::new(1.0, 0.0));
        let coo = SCoo::new(ports.clone(), vec![0], vec![1], values.clone()).unwrap();
        assert_eq!(coo.nnz(), 1);
        let (from, to, v) = coo.iter().next().unwrap();
        assert_eq!((from, to, v[0]), ("a", "b", Complex64::new(1.0, 0.0)));

        assert!(SCoo::new(ports.clone(), vec![0], vec![2], values.clone()).is_err());
        assert!(SCoo::new(ports, vec![0, 1], vec![1], values).is_err());
    }
}
