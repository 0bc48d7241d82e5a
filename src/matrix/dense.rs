use ndarray::Array2;
use num_traits::ToPrimitive;
use single_utilities::traits::FloatOpsTS;

use super::{Axis, ColumnEntries};
use crate::error::{RankSumError, Result};

/// A full grid of values. Row- and column-major `Array2` layouts are both accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    data: Array2<f64>,
    axis: Axis,
}

impl DenseMatrix {
    pub fn new(data: Array2<f64>, axis: Axis) -> Result<Self> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(RankSumError::EmptyMatrix);
        }
        Ok(DenseMatrix { data, axis })
    }

    /// Widens any float matrix to `f64` storage.
    pub fn from_array<T>(data: &Array2<T>, axis: Axis) -> Result<Self>
    where
        T: FloatOpsTS,
    {
        Self::new(data.mapv(|v| ToPrimitive::to_f64(&v).unwrap_or(f64::NAN)), axis)
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.data
    }

    pub(crate) fn column_entries(&self, col: usize) -> ColumnEntries<'_> {
        ColumnEntries::Dense(self.data.column(col).into_iter().enumerate())
    }

    pub(crate) fn stored_count(&self, col: usize) -> usize {
        assert!(col < self.ncols(), "column {} out of range for {} columns", col, self.ncols());
        self.nrows()
    }

    pub fn to_observations_as_rows(&self) -> DenseMatrix {
        match self.axis {
            Axis::ObservationsAsRows => self.clone(),
            Axis::ObservationsAsColumns => DenseMatrix {
                data: self.data.t().as_standard_layout().into_owned(),
                axis: Axis::ObservationsAsRows,
            },
        }
    }

    pub(crate) fn select_observations(&self, observations: &[usize]) -> Result<DenseMatrix> {
        let nd_axis = match self.axis {
            Axis::ObservationsAsRows => ndarray::Axis(0),
            Axis::ObservationsAsColumns => ndarray::Axis(1),
        };
        let n_obs = self.data.len_of(nd_axis);
        if let Some(&bad) = observations.iter().find(|&&o| o >= n_obs) {
            return Err(RankSumError::DimensionMismatch {
                expected: n_obs,
                found: bad + 1,
            });
        }
        Self::new(self.data.select(nd_axis, observations), self.axis)
    }
}
