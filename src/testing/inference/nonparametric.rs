use std::borrow::Cow;

use log::{debug, warn};
use ndarray::{Array2, Zip};
use statrs::function::erf::erfc;

use crate::aggregation::{GroupFeatureMatrix, group_nnz, group_sum};
use crate::error::{RankSumError, Result};
use crate::matrix::Matrix;
use crate::ranking::{RankedMatrix, TieRunList, rank};
use crate::testing::effect::auc_from_u;
use crate::testing::utils::GroupLabels;
use crate::testing::{Alternative, RankSumConfig, RankSumResults};

/// One-vs-rest Mann-Whitney tests of every feature for every group.
///
/// Runs the whole pipeline: raw group sums and non-background counts, the rank transform on a
/// working copy, rank sums, U statistics, tie-corrected p-values and AUC. Structural problems
/// with the inputs abort before any computation; zero-variance cells come back as NaN.
///
/// # Arguments
///
/// * `matrix` - Feature-by-observation matrix in either layout and orientation
/// * `labels` - Group of every observation along the matrix's observation axis
/// * `config` - Alternative hypothesis, optional group subset and threading
pub fn mann_whitney_matrix_groups(
    matrix: &Matrix,
    labels: &GroupLabels,
    config: &RankSumConfig,
) -> Result<RankSumResults> {
    let n_obs = matrix.n_observations();
    if labels.len() != n_obs {
        return Err(RankSumError::DimensionMismatch {
            expected: n_obs,
            found: labels.len(),
        });
    }

    let (matrix, labels, groups) = match &config.groups_use {
        Some(groups_use) => {
            let (restricted, observations) = labels.restrict(groups_use)?;
            let mut groups = groups_use.clone();
            groups.sort_unstable();
            groups.dedup();
            (
                Cow::Owned(matrix.select_observations(&observations)?),
                Cow::Owned(restricted),
                groups,
            )
        }
        None => (
            Cow::Borrowed(matrix),
            Cow::Borrowed(labels),
            (0..labels.n_groups()).collect(),
        ),
    };

    debug!(
        "rank-sum test: {} observations x {} features, {} groups, sparse={}",
        matrix.n_observations(),
        matrix.n_features(),
        labels.n_groups(),
        matrix.is_sparse()
    );

    let group_sums = group_sum(&matrix, &labels)?;
    let nnz = group_nnz(&matrix, &labels)?;

    let ranked = rank(&matrix, config.parallel)?;
    let rank_sums = group_sum(ranked.ranks(), &labels)?;
    debug!("ranked {} feature columns", ranked.n_features());

    let u_statistics = u_stat(&ranked, &rank_sums, labels.sizes(), &nnz)?;
    let p_values = p_value(
        &u_statistics,
        ranked.ties(),
        labels.sizes(),
        labels.total(),
        config.alternative,
        config.parallel,
    )?;
    let auc = auc_from_u(&u_statistics, labels.sizes(), labels.total());

    let n_degenerate = p_values.iter().filter(|p| p.is_nan()).count();
    if n_degenerate > 0 {
        warn!(
            "{} of {} group/feature cells have zero variance; their p-values are undefined",
            n_degenerate,
            p_values.len()
        );
    }

    Ok(RankSumResults {
        group_sums,
        group_nnz: nnz,
        u_statistics,
        p_values,
        auc,
        group_sizes: labels.sizes().to_vec(),
        total_n: labels.total(),
        groups,
        ties: ranked.into_ties(),
        alternative: config.alternative,
    })
}

/// Mann-Whitney U of each group against the rest, from per-group rank sums.
///
/// For sparse input the rank sums only cover stored entries. Each group's background entries,
/// `group_size - group_nnz` of them, all carry the column's implicit background rank and are
/// added back before the `n (n + 1) / 2` offset is removed.
///
/// All three inputs must come from the same labels: `rank_sums` and `group_nnz` are
/// `group_sizes.len() x n_features`, and no group holds more stored entries than members.
pub fn u_stat(
    ranked: &RankedMatrix,
    rank_sums: &GroupFeatureMatrix<f64>,
    group_sizes: &[usize],
    group_nnz: &GroupFeatureMatrix<usize>,
) -> Result<GroupFeatureMatrix<f64>> {
    let shape = (group_sizes.len(), ranked.n_features());
    check_shape(shape, rank_sums.dim())?;
    check_shape(shape, group_nnz.dim())?;

    let mut u = rank_sums.clone();

    if ranked.is_sparse() {
        for (row, &size) in group_nnz.rows().into_iter().zip(group_sizes) {
            if let Some(&nnz) = row.iter().find(|&&nnz| nnz > size) {
                return Err(RankSumError::DimensionMismatch {
                    expected: size,
                    found: nnz,
                });
            }
        }
        let background_ranks: Vec<f64> = (0..ranked.n_features())
            .map(|f| ranked.background_rank(f))
            .collect();
        Zip::indexed(&mut u)
            .and(group_nnz)
            .for_each(|(g, f), cell, &nnz| {
                *cell += (group_sizes[g] - nnz) as f64 * background_ranks[f];
            });
    }

    for (mut row, &size) in u.rows_mut().into_iter().zip(group_sizes) {
        let n = size as f64;
        let offset = n * (n + 1.0) / 2.0;
        row.mapv_inplace(|r| r - offset);
    }
    Ok(u)
}

/// Compares `(groups, features)` shapes, reporting the first differing extent.
fn check_shape(expected: (usize, usize), found: (usize, usize)) -> Result<()> {
    if expected.0 != found.0 {
        return Err(RankSumError::DimensionMismatch {
            expected: expected.0,
            found: found.0,
        });
    }
    if expected.1 != found.1 {
        return Err(RankSumError::DimensionMismatch {
            expected: expected.1,
            found: found.1,
        });
    }
    Ok(())
}

/// Tie-corrected variance factor of one feature, `((N^3 - N) - sum(t^3 - t)) / (12 (N^2 - N))`.
///
/// Multiplied by `n1 * n2` this gives the variance of U.
pub fn tie_term(ties: &TieRunList, total_n: usize) -> f64 {
    let n = total_n as f64;
    ((n * n * n - n) - ties.correction_sum()) / (12.0 * (n * n - n))
}

/// Sign that maps zero to zero.
#[inline]
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[inline]
fn upper_tail(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

#[inline]
fn lower_tail(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

/// Normal-approximation p-value of a single cell.
///
/// Returns NaN when the variance is zero.
pub fn p_value_cell(u: f64, n1n2: f64, tie_term: f64, alternative: Alternative) -> f64 {
    let variance = n1n2 * tie_term;
    if variance.is_nan() || variance <= 0.0 {
        return f64::NAN;
    }

    let z = u - 0.5 * n1n2;
    let correction = match alternative {
        Alternative::TwoSided => sign(z) * 0.5,
        Alternative::Greater => 0.5,
        Alternative::Less => -0.5,
    };
    let z = (z - correction) / variance.sqrt();

    match alternative {
        Alternative::TwoSided => (2.0 * upper_tail(z.abs())).min(1.0),
        Alternative::Greater => upper_tail(z),
        Alternative::Less => lower_tail(z),
    }
}

/// P-values for every `(group, feature)` cell of a U matrix.
///
/// `ties` holds one run list per feature column of `u`, `group_sizes` one size per row.
pub fn p_value(
    u: &GroupFeatureMatrix<f64>,
    ties: &[TieRunList],
    group_sizes: &[usize],
    total_n: usize,
    alternative: Alternative,
    parallel: bool,
) -> Result<GroupFeatureMatrix<f64>> {
    check_shape((group_sizes.len(), ties.len()), u.dim())?;
    if let Some(&size) = group_sizes.iter().find(|&&size| size > total_n) {
        return Err(RankSumError::DimensionMismatch {
            expected: total_n,
            found: size,
        });
    }

    let tie_terms: Vec<f64> = ties.iter().map(|t| tie_term(t, total_n)).collect();
    let n1n2: Vec<f64> = group_sizes
        .iter()
        .map(|&size| (size * (total_n - size)) as f64)
        .collect();

    let mut p = Array2::<f64>::zeros(u.raw_dim());
    let zip = Zip::indexed(&mut p).and(u);
    let fill = |(g, f): (usize, usize), cell: &mut f64, &u: &f64| {
        *cell = p_value_cell(u, n1n2[g], tie_terms[f], alternative);
    };
    if parallel {
        zip.par_for_each(fill);
    } else {
        zip.for_each(fill);
    }
    Ok(p)
}
