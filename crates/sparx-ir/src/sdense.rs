//! Dense batched scattering matrices.

use ndarray::{Array2, Array3, ArrayView2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};

/// A stack of square scattering matrices with named ports.
///
/// `data` has shape `(batch, n, n)` and `data[[b, i, j]]` is the entry from
/// `ports[i]` to `ports[j]` at sample `b`. Port order is the index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SDense {
    ports: Vec<String>,
    data: Array3<Complex64>,
}

impl SDense {
    /// Create a dense relation, validating the shape against the port list.
    pub fn new(ports: Vec<String>, data: Array3<Complex64>) -> IrResult<Self> {
        let (_, rows, cols) = data.dim();
        if rows != ports.len() || cols != ports.len() {
            return Err(IrError::Shape(format!(
                "dense matrix is {rows}x{cols} but has {} ports",
                ports.len()
            )));
        }
        if data.dim().0 == 0 {
            return Err(IrError::Shape("dense matrix has an empty batch".into()));
        }
        for (i, p) in ports.iter().enumerate() {
            if ports[..i].contains(p) {
                return Err(IrError::Shape(format!("duplicate port '{p}'")));
            }
        }
        Ok(Self { ports, data })
    }

    /// A single-sample dense relation.
    pub fn from_matrix(ports: Vec<String>, matrix: Array2<Complex64>) -> IrResult<Self> {
        let (r, c) = matrix.dim();
        let data = matrix
            .into_shape_with_order((1, r, c))
            .map_err(|e| IrError::Shape(e.to_string()))?;
        Self::new(ports, data)
    }

    /// Ports in index order.
    pub fn ports(&self) -> &[String] {
        &self.ports
    }

    /// Number of ports.
    pub fn num_ports(&self) -> usize {
        self.ports.len()
    }

    /// Number of batch samples.
    pub fn batch_len(&self) -> usize {
        self.data.dim().0
    }

    /// Raw `(batch, n, n)` data.
    pub fn data(&self) -> &Array3<Complex64> {
        &self.data
    }

    /// Consume into ports and data.
    pub fn into_parts(self) -> (Vec<String>, Array3<Complex64>) {
        (self.ports, self.data)
    }

    /// Matrix index of `port`.
    pub fn index_of(&self, port: &str) -> Option<usize> {
        self.ports.iter().position(|p| p == port)
    }

    /// The matrix of one batch sample.
    pub fn sample(&self, sample: usize) -> ArrayView2<'_, Complex64> {
        self.data.index_axis(ndarray::Axis(0), sample)
    }

    /// Entry `(from, to)` at `sample`.
    pub fn get(&self, from: &str, to: &str, sample: usize) -> IrResult<Complex64> {
        let i = self
            .index_of(from)
            .ok_or_else(|| IrError::PortNotFound(from.to_string()))?;
        let j = self
            .index_of(to)
            .ok_or_else(|| IrError::PortNotFound(to.to_string()))?;
        if sample >= self.batch_len() {
            return Err(IrError::Shape(format!(
                "sample {sample} out of range for batch of {}",
                self.batch_len()
            )));
        }
        Ok(self.data[[sample, i, j]])
    }

    /// Power transmission `|S(from, to)|²` across the batch.
    pub fn power(&self, from: &str, to: &str) -> IrResult<Vec<f64>> {
        (0..self.batch_len())
            .map(|b| self.get(from, to, b).map(|v| v.norm_sqr()))
            .collect()
    }
}
