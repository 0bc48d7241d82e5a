//! Per-group sums and non-background counts of every feature.
//!
//! Both aggregations visit each stored entry exactly once and add it into the
//! `(group_of(observation), feature)` cell of a dense `G x F` output. Background entries are
//! skipped, which is only valid because the background value is zero.

use ndarray::Array2;

use crate::error::{RankSumError, Result};
use crate::matrix::{Axis, BACKGROUND, Matrix};
use crate::testing::utils::GroupLabels;

/// Dense `G x F` matrix indexed by `[group, feature]`.
pub type GroupFeatureMatrix<V> = Array2<V>;

fn check_labels(matrix: &Matrix, labels: &GroupLabels) -> Result<()> {
    let n_obs = matrix.n_observations();
    if labels.len() != n_obs {
        return Err(RankSumError::DimensionMismatch {
            expected: n_obs,
            found: labels.len(),
        });
    }
    Ok(())
}

fn accumulate<V, F>(matrix: &Matrix, labels: &GroupLabels, mut visit: F) -> Result<GroupFeatureMatrix<V>>
where
    V: Clone + Default,
    F: FnMut(&mut V, f64),
{
    check_labels(matrix, labels)?;
    let mut out = Array2::<V>::default((labels.n_groups(), matrix.n_features()));

    match matrix.axis() {
        Axis::ObservationsAsRows => {
            for feature in 0..matrix.ncols() {
                for (obs, value) in matrix.column_entries(feature) {
                    visit(&mut out[[labels.group_of(obs), feature]], value);
                }
            }
        }
        Axis::ObservationsAsColumns => {
            for obs in 0..matrix.ncols() {
                let group = labels.group_of(obs);
                for (feature, value) in matrix.column_entries(obs) {
                    visit(&mut out[[group, feature]], value);
                }
            }
        }
    }
    Ok(out)
}

/// Sum of values per `(group, feature)`.
pub fn group_sum(matrix: &Matrix, labels: &GroupLabels) -> Result<GroupFeatureMatrix<f64>> {
    accumulate(matrix, labels, |cell: &mut f64, value| *cell += value)
}

/// Count of non-background entries per `(group, feature)`.
///
/// Sparse input counts stored entries without looking at their values; construction already
/// guarantees none of them is the background value.
pub fn group_nnz(matrix: &Matrix, labels: &GroupLabels) -> Result<GroupFeatureMatrix<usize>> {
    match matrix {
        Matrix::Sparse(_) => accumulate(matrix, labels, |cell: &mut usize, _| *cell += 1),
        Matrix::Dense(_) => accumulate(matrix, labels, |cell: &mut usize, value| {
            if value != BACKGROUND {
                *cell += 1;
            }
        }),
    }
}
