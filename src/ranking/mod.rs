//! Mid-rank transform of every feature column.
//!
//! Ranking always runs on an owned working copy with observations as rows, so each column is one
//! feature. Dense columns are ranked in full. Sparse columns rank only their stored entries: the
//! background run is never materialized, all of its members share the implicit rank
//! `(n_background + 1) / 2`, and stored ranks are shifted up by `n_background` so that they are
//! the ranks the entries would receive in the full column.

use ndarray::Array2;
use rayon::prelude::*;

use crate::error::{RankSumError, Result};
use crate::matrix::{Axis, BACKGROUND, DenseMatrix, Matrix, SparseMatrix};

/// Lengths of the runs of equal values (length >= 2) within one column.
///
/// For sparse columns this includes the implicit background run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TieRunList {
    runs: Vec<usize>,
}

impl TieRunList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a run; runs shorter than two carry no tie information and are skipped.
    pub fn push(&mut self, len: usize) {
        if len > 1 {
            self.runs.push(len);
        }
    }

    pub fn runs(&self) -> &[usize] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// `sum(len^3 - len)` over all runs, the quantity the tie-corrected variance subtracts.
    pub fn correction_sum(&self) -> f64 {
        self.runs
            .iter()
            .map(|&len| {
                let t = len as f64;
                t * t * t - t
            })
            .sum()
    }
}

/// Ranks of a matrix plus the per-column metadata downstream stages need.
#[derive(Debug, Clone)]
pub struct RankedMatrix {
    ranks: Matrix,
    background_counts: Vec<usize>,
    ties: Vec<TieRunList>,
}

impl RankedMatrix {
    /// Ranked values, observations as rows. Sparse input stays sparse with the same pattern.
    pub fn ranks(&self) -> &Matrix {
        &self.ranks
    }

    pub fn ties(&self) -> &[TieRunList] {
        &self.ties
    }

    pub fn into_ties(self) -> Vec<TieRunList> {
        self.ties
    }

    pub fn is_sparse(&self) -> bool {
        self.ranks.is_sparse()
    }

    pub fn n_observations(&self) -> usize {
        self.ranks.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.ranks.ncols()
    }

    /// Number of implicit background entries in `feature`. Always 0 for dense input.
    pub fn background_count(&self, feature: usize) -> usize {
        self.background_counts[feature]
    }

    /// Rank shared by every implicit background entry of `feature`.
    pub fn background_rank(&self, feature: usize) -> f64 {
        (self.background_counts[feature] as f64 + 1.0) / 2.0
    }

    /// Total of all ranks in a column, background included. Equals `n (n + 1) / 2`.
    pub fn column_rank_sum(&self, feature: usize) -> f64 {
        let stored: f64 = self.ranks.column_entries(feature).map(|(_, r)| r).sum();
        stored + self.background_count(feature) as f64 * self.background_rank(feature)
    }
}

/// Mid-ranks of `values`, 1-based and shifted by `offset`, with the tie runs found.
///
/// Values must be finite.
pub fn rank_values(values: &[f64], offset: f64) -> (Vec<f64>, TieRunList) {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_unstable_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut ties = TieRunList::new();
    let mut i = 0;
    while i < n {
        let current = values[order[i]];
        let start = i;
        while i < n && values[order[i]] == current {
            i += 1;
        }
        // Run occupies ranks start+1 ..= i.
        let avg_rank = (start + i + 1) as f64 / 2.0 + offset;
        for &idx in &order[start..i] {
            ranks[idx] = avg_rank;
        }
        ties.push(i - start);
    }
    (ranks, ties)
}

/// Ranks every feature column of `matrix` without touching the caller's data.
pub fn rank(matrix: &Matrix, parallel: bool) -> Result<RankedMatrix> {
    match matrix {
        Matrix::Dense(m) => rank_dense(m, parallel),
        Matrix::Sparse(m) => rank_sparse(m, parallel),
    }
}

fn map_columns<F, R>(ncols: usize, parallel: bool, f: F) -> Result<Vec<R>>
where
    F: Fn(usize) -> Result<R> + Sync + Send,
    R: Send,
{
    if parallel {
        (0..ncols).into_par_iter().map(f).collect()
    } else {
        (0..ncols).map(f).collect()
    }
}

fn rank_dense(matrix: &DenseMatrix, parallel: bool) -> Result<RankedMatrix> {
    let working = matrix.to_observations_as_rows();
    let data = working.data();
    let (nrows, ncols) = data.dim();

    let columns = map_columns(ncols, parallel, |col| {
        let values: Vec<f64> = data.column(col).to_vec();
        if let Some(row) = values.iter().position(|v| !v.is_finite()) {
            return Err(RankSumError::NonFiniteValue { row, column: col });
        }
        Ok(rank_values(&values, 0.0))
    })?;

    let mut ranks = Array2::<f64>::zeros((nrows, ncols));
    let mut ties = Vec::with_capacity(ncols);
    for (col, (column_ranks, column_ties)) in columns.into_iter().enumerate() {
        ranks
            .column_mut(col)
            .iter_mut()
            .zip(column_ranks)
            .for_each(|(dst, r)| *dst = r);
        ties.push(column_ties);
    }

    Ok(RankedMatrix {
        ranks: Matrix::Dense(DenseMatrix::new(ranks, Axis::ObservationsAsRows)?),
        background_counts: vec![0; ncols],
        ties,
    })
}

fn rank_sparse(matrix: &SparseMatrix, parallel: bool) -> Result<RankedMatrix> {
    let working = matrix.to_observations_as_rows();
    let nrows = working.nrows();

    let columns = map_columns(working.ncols(), parallel, |col| {
        let (rows, values) = working.column(col);
        if let Some(k) = values.iter().position(|&v| v.is_nan() || v <= BACKGROUND) {
            if !values[k].is_finite() {
                return Err(RankSumError::NonFiniteValue { row: rows[k], column: col });
            }
            return Err(RankSumError::SparsityInvariantViolation {
                column: col,
                reason: format!(
                    "stored value {} at row {} is below the background value",
                    values[k], rows[k]
                ),
            });
        }
        let n_background = nrows - values.len();
        let (ranks, mut ties) = rank_values(values, n_background as f64);
        ties.push(n_background);
        Ok((ranks, ties, n_background))
    })?;

    let mut rank_values_flat = Vec::with_capacity(working.nnz());
    let mut ties = Vec::with_capacity(columns.len());
    let mut background_counts = Vec::with_capacity(columns.len());
    for (column_ranks, column_ties, n_background) in columns {
        rank_values_flat.extend(column_ranks);
        ties.push(column_ties);
        background_counts.push(n_background);
    }

    Ok(RankedMatrix {
        ranks: Matrix::Sparse(working.with_values(rank_values_flat)),
        background_counts,
        ties,
    })
}
