use nalgebra_sparse::{CscMatrix, CsrMatrix};
use num_traits::ToPrimitive;
use single_utilities::traits::FloatOpsTS;

use super::{Axis, BACKGROUND, ColumnEntries, DenseMatrix};
use crate::error::{RankSumError, Result};

/// Compressed-sparse-column storage.
///
/// Invariants, checked by [`SparseMatrix::try_new`]:
/// - `col_ptr` has `ncols + 1` non-decreasing entries starting at 0 and ending at `nnz`
/// - row indices within a column are strictly increasing and below `nrows`
/// - no stored value equals [`BACKGROUND`] and every stored value is finite
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    nrows: usize,
    ncols: usize,
    col_ptr: Vec<usize>,
    row_idx: Vec<usize>,
    values: Vec<f64>,
    axis: Axis,
}

impl SparseMatrix {
    pub fn try_new(
        nrows: usize,
        ncols: usize,
        col_ptr: Vec<usize>,
        row_idx: Vec<usize>,
        values: Vec<f64>,
        axis: Axis,
    ) -> Result<Self> {
        if nrows == 0 || ncols == 0 {
            return Err(RankSumError::EmptyMatrix);
        }
        if col_ptr.len() != ncols + 1 {
            return Err(RankSumError::MalformedStorage(format!(
                "column pointer has length {}, expected {}",
                col_ptr.len(),
                ncols + 1
            )));
        }
        if row_idx.len() != values.len() {
            return Err(RankSumError::MalformedStorage(
                "row indices and values must have equal length".into(),
            ));
        }
        if col_ptr[0] != 0 || col_ptr[ncols] != values.len() {
            return Err(RankSumError::MalformedStorage(
                "column pointer must start at 0 and end at nnz".into(),
            ));
        }
        // with both ends pinned, monotonicity keeps every offset within 0..=nnz
        if let Some(col) = col_ptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(RankSumError::MalformedStorage(format!(
                "column pointer decreases at column {}",
                col
            )));
        }

        for col in 0..ncols {
            let (start, end) = (col_ptr[col], col_ptr[col + 1]);
            let mut prev: Option<usize> = None;
            for k in start..end {
                let row = row_idx[k];
                if row >= nrows {
                    return Err(RankSumError::MalformedStorage(format!(
                        "row index {} out of bounds in column {}",
                        row, col
                    )));
                }
                if prev.is_some_and(|p| row <= p) {
                    return Err(RankSumError::SparsityInvariantViolation {
                        column: col,
                        reason: format!("row indices not strictly increasing at row {}", row),
                    });
                }
                let value = values[k];
                if !value.is_finite() {
                    return Err(RankSumError::NonFiniteValue { row, column: col });
                }
                if value == BACKGROUND {
                    return Err(RankSumError::SparsityInvariantViolation {
                        column: col,
                        reason: format!("explicitly stored background value at row {}", row),
                    });
                }
                prev = Some(row);
            }
        }

        Ok(SparseMatrix {
            nrows,
            ncols,
            col_ptr,
            row_idx,
            values,
            axis,
        })
    }

    /// Observations as rows: the CSC layout ranking works on directly.
    pub fn from_csc<T>(matrix: &CscMatrix<T>) -> Result<Self>
    where
        T: FloatOpsTS,
    {
        Self::try_new(
            matrix.nrows(),
            matrix.ncols(),
            matrix.col_offsets().to_vec(),
            matrix.row_indices().to_vec(),
            widen(matrix.values()),
            Axis::ObservationsAsRows,
        )
    }

    /// Observations as rows, stored as the CSC of the transpose: the CSR row pointer becomes the
    /// column pointer of a features-by-observations matrix.
    pub fn from_csr<T>(matrix: &CsrMatrix<T>) -> Result<Self>
    where
        T: FloatOpsTS,
    {
        Self::try_new(
            matrix.ncols(),
            matrix.nrows(),
            matrix.row_offsets().to_vec(),
            matrix.col_indices().to_vec(),
            widen(matrix.values()),
            Axis::ObservationsAsColumns,
        )
    }

    /// Drops background entries of a dense matrix, keeping its orientation.
    pub fn from_dense(dense: &DenseMatrix) -> Result<Self> {
        let data = dense.data();
        let mut col_ptr = Vec::with_capacity(dense.ncols() + 1);
        let mut row_idx = Vec::new();
        let mut values = Vec::new();
        col_ptr.push(0);
        for column in data.columns() {
            for (row, &value) in column.iter().enumerate() {
                if value != BACKGROUND {
                    row_idx.push(row);
                    values.push(value);
                }
            }
            col_ptr.push(values.len());
        }
        Self::try_new(dense.nrows(), dense.ncols(), col_ptr, row_idx, values, dense.axis())
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn col_ptr(&self) -> &[usize] {
        &self.col_ptr
    }

    pub fn row_indices(&self) -> &[usize] {
        &self.row_idx
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Row indices and values of the stored entries of `col`.
    pub fn column(&self, col: usize) -> (&[usize], &[f64]) {
        let range = self.column_range(col);
        (&self.row_idx[range.clone()], &self.values[range])
    }

    #[inline]
    fn column_range(&self, col: usize) -> std::ops::Range<usize> {
        assert!(col < self.ncols, "column {} out of range for {} columns", col, self.ncols);
        self.col_ptr[col]..self.col_ptr[col + 1]
    }

    pub(crate) fn column_entries(&self, col: usize) -> ColumnEntries<'_> {
        let (rows, values) = self.column(col);
        ColumnEntries::Sparse(rows.iter().zip(values.iter()))
    }

    pub(crate) fn stored_count(&self, col: usize) -> usize {
        self.column_range(col).len()
    }

    /// Same sparsity pattern, new stored values. Used to carry ranks in place of raw values.
    pub(crate) fn with_values(&self, values: Vec<f64>) -> SparseMatrix {
        debug_assert_eq!(values.len(), self.values.len());
        SparseMatrix {
            nrows: self.nrows,
            ncols: self.ncols,
            col_ptr: self.col_ptr.clone(),
            row_idx: self.row_idx.clone(),
            values,
            axis: self.axis,
        }
    }

    /// CSC of the transposed matrix, with the orientation flag flipped so the logical
    /// observations stay the same. Runs in O(nnz + nrows + ncols).
    pub fn transpose(&self) -> SparseMatrix {
        let mut counts = vec![0usize; self.nrows + 1];
        for &row in &self.row_idx {
            counts[row + 1] += 1;
        }
        for i in 0..self.nrows {
            counts[i + 1] += counts[i];
        }
        let col_ptr = counts.clone();

        let nnz = self.nnz();
        let mut row_idx = vec![0usize; nnz];
        let mut values = vec![0.0f64; nnz];
        let mut next = counts;
        for col in 0..self.ncols {
            let (rows, vals) = self.column(col);
            for (&row, &value) in rows.iter().zip(vals) {
                let dest = next[row];
                row_idx[dest] = col;
                values[dest] = value;
                next[row] += 1;
            }
        }

        SparseMatrix {
            nrows: self.ncols,
            ncols: self.nrows,
            col_ptr,
            row_idx,
            values,
            axis: self.axis.flipped(),
        }
    }

    pub fn to_observations_as_rows(&self) -> SparseMatrix {
        match self.axis {
            Axis::ObservationsAsRows => self.clone(),
            Axis::ObservationsAsColumns => self.transpose(),
        }
    }

    pub(crate) fn select_observations(&self, observations: &[usize]) -> Result<SparseMatrix> {
        let n_obs = match self.axis {
            Axis::ObservationsAsRows => self.nrows,
            Axis::ObservationsAsColumns => self.ncols,
        };
        if let Some(&bad) = observations.iter().find(|&&o| o >= n_obs) {
            return Err(RankSumError::DimensionMismatch {
                expected: n_obs,
                found: bad + 1,
            });
        }

        let mut col_ptr = vec![0usize];
        let mut row_idx = Vec::new();
        let mut values = Vec::new();

        match self.axis {
            Axis::ObservationsAsColumns => {
                for &col in observations {
                    let (rows, vals) = self.column(col);
                    row_idx.extend_from_slice(rows);
                    values.extend_from_slice(vals);
                    col_ptr.push(values.len());
                }
                Self::try_new(self.nrows, observations.len(), col_ptr, row_idx, values, self.axis)
            }
            Axis::ObservationsAsRows => {
                // Rows may be picked out of order, so each column is re-sorted after remapping.
                let mut new_positions: Vec<Vec<usize>> = vec![Vec::new(); self.nrows];
                for (new_row, &old_row) in observations.iter().enumerate() {
                    new_positions[old_row].push(new_row);
                }
                let mut scratch: Vec<(usize, f64)> = Vec::new();
                for col in 0..self.ncols {
                    scratch.clear();
                    let (rows, vals) = self.column(col);
                    for (&row, &value) in rows.iter().zip(vals) {
                        scratch.extend(new_positions[row].iter().map(|&r| (r, value)));
                    }
                    scratch.sort_unstable_by_key(|&(r, _)| r);
                    for &(r, v) in &scratch {
                        row_idx.push(r);
                        values.push(v);
                    }
                    col_ptr.push(values.len());
                }
                Self::try_new(observations.len(), self.ncols, col_ptr, row_idx, values, self.axis)
            }
        }
    }
}

fn widen<T>(values: &[T]) -> Vec<f64>
where
    T: FloatOpsTS,
{
    values
        .iter()
        .map(|v| ToPrimitive::to_f64(v).unwrap_or(f64::NAN))
        .collect()
}
