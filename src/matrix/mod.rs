//! Layout-independent access to feature-by-observation matrices.
//!
//! Every kernel in this crate sees its input through [`Matrix`], a tagged variant over a dense
//! [`DenseMatrix`] and a compressed-sparse-column [`SparseMatrix`]. Callers branch on the tag
//! once per operation; inside a column, [`ColumnEntries`] yields `(row, value)` pairs ordered by
//! row, covering every entry for dense storage and only the stored (non-background) entries for
//! sparse storage.
//!
//! Values are held as `f64` internally. Constructors accept any `T: FloatOpsTS` and widen.

mod dense;
mod sparse;

pub use dense::DenseMatrix;
pub use sparse::SparseMatrix;

use crate::error::Result;

/// The value omitted by sparse storage. Every kernel assumes it is the additive identity.
pub const BACKGROUND: f64 = 0.0;

/// Orientation of a matrix relative to the observations being grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    /// Rows are observations (cells), columns are features (genes).
    #[default]
    ObservationsAsRows,
    /// Rows are features, columns are observations.
    ObservationsAsColumns,
}

impl Axis {
    pub fn flipped(self) -> Self {
        match self {
            Axis::ObservationsAsRows => Axis::ObservationsAsColumns,
            Axis::ObservationsAsColumns => Axis::ObservationsAsRows,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Matrix {
    Dense(DenseMatrix),
    Sparse(SparseMatrix),
}

impl Matrix {
    pub fn nrows(&self) -> usize {
        match self {
            Matrix::Dense(m) => m.nrows(),
            Matrix::Sparse(m) => m.nrows(),
        }
    }

    pub fn ncols(&self) -> usize {
        match self {
            Matrix::Dense(m) => m.ncols(),
            Matrix::Sparse(m) => m.ncols(),
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            Matrix::Dense(m) => m.axis(),
            Matrix::Sparse(m) => m.axis(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Matrix::Sparse(_))
    }

    /// Number of observations along the grouping axis.
    pub fn n_observations(&self) -> usize {
        match self.axis() {
            Axis::ObservationsAsRows => self.nrows(),
            Axis::ObservationsAsColumns => self.ncols(),
        }
    }

    pub fn n_features(&self) -> usize {
        match self.axis() {
            Axis::ObservationsAsRows => self.ncols(),
            Axis::ObservationsAsColumns => self.nrows(),
        }
    }

    /// Entries of `col` ordered by row. Panics if `col` is out of range.
    pub fn column_entries(&self, col: usize) -> ColumnEntries<'_> {
        match self {
            Matrix::Dense(m) => m.column_entries(col),
            Matrix::Sparse(m) => m.column_entries(col),
        }
    }

    /// Number of stored entries in `col`: all of them for dense storage.
    pub fn stored_count(&self, col: usize) -> usize {
        match self {
            Matrix::Dense(m) => m.stored_count(col),
            Matrix::Sparse(m) => m.stored_count(col),
        }
    }

    /// Owned copy with observations as rows, so that each column is one feature.
    pub fn to_observations_as_rows(&self) -> Matrix {
        match self {
            Matrix::Dense(m) => Matrix::Dense(m.to_observations_as_rows()),
            Matrix::Sparse(m) => Matrix::Sparse(m.to_observations_as_rows()),
        }
    }

    /// Keeps only the listed observations, in the order given.
    pub fn select_observations(&self, observations: &[usize]) -> Result<Matrix> {
        Ok(match self {
            Matrix::Dense(m) => Matrix::Dense(m.select_observations(observations)?),
            Matrix::Sparse(m) => Matrix::Sparse(m.select_observations(observations)?),
        })
    }
}

impl From<DenseMatrix> for Matrix {
    fn from(m: DenseMatrix) -> Self {
        Matrix::Dense(m)
    }
}

impl From<SparseMatrix> for Matrix {
    fn from(m: SparseMatrix) -> Self {
        Matrix::Sparse(m)
    }
}

/// Lazily produced `(row, value)` pairs of one column.
pub enum ColumnEntries<'a> {
    Dense(std::iter::Enumerate<ndarray::iter::Iter<'a, f64, ndarray::Ix1>>),
    Sparse(std::iter::Zip<std::slice::Iter<'a, usize>, std::slice::Iter<'a, f64>>),
}

impl Iterator for ColumnEntries<'_> {
    type Item = (usize, f64);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ColumnEntries::Dense(it) => it.next().map(|(row, &value)| (row, value)),
            ColumnEntries::Sparse(it) => it.next().map(|(&row, &value)| (row, value)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            ColumnEntries::Dense(it) => it.size_hint(),
            ColumnEntries::Sparse(it) => it.size_hint(),
        }
    }
}
