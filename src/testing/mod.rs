use ndarray::Array2;

use crate::error::{RankSumError, Result};
use crate::ranking::TieRunList;

pub mod effect;
pub mod inference;

pub mod utils;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alternative {
    #[default]
    TwoSided,
    Less,
    Greater,
}

/// Options for a one-vs-rest rank-sum run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankSumConfig {
    /// Direction of the alternative hypothesis, applied to every group against its complement
    pub alternative: Alternative,
    /// Restrict the comparison to these group ids; other observations are dropped
    pub groups_use: Option<Vec<usize>>,
    /// Rank columns and fill p-value cells on the rayon pool
    pub parallel: bool,
}

impl Default for RankSumConfig {
    fn default() -> Self {
        RankSumConfig {
            alternative: Alternative::TwoSided,
            groups_use: None,
            parallel: true,
        }
    }
}

impl RankSumConfig {
    pub fn with_alternative(mut self, alternative: Alternative) -> Self {
        self.alternative = alternative;
        self
    }

    pub fn with_groups_use(mut self, groups: &[usize]) -> Self {
        self.groups_use = Some(groups.to_vec());
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Every statistic of a one-vs-rest run, each as a `G x F` matrix indexed by
/// `[group, feature]`.
#[derive(Debug, Clone)]
pub struct RankSumResults {
    /// Sum of the raw values per group
    pub group_sums: Array2<f64>,
    /// Non-background entries per group
    pub group_nnz: Array2<usize>,
    /// Mann-Whitney U of each group against the rest
    pub u_statistics: Array2<f64>,
    /// Normal-approximation p-values; NaN where the variance is zero
    pub p_values: Array2<f64>,
    /// `U / (n1 * n2)`
    pub auc: Array2<f64>,
    pub group_sizes: Vec<usize>,
    pub total_n: usize,
    /// Original group id of each result row. Identity unless `groups_use` was set.
    pub groups: Vec<usize>,
    pub ties: Vec<TieRunList>,
    pub alternative: Alternative,
}

impl RankSumResults {
    pub fn n_groups(&self) -> usize {
        self.p_values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.p_values.ncols()
    }

    /// The p-value of one cell, or `DegenerateStatistic` if it is undefined.
    pub fn p_value(&self, group: usize, feature: usize) -> Result<f64> {
        let p = self.p_values[[group, feature]];
        if p.is_nan() {
            return Err(RankSumError::DegenerateStatistic { group, feature });
        }
        Ok(p)
    }

    /// Cells whose p-value is undefined because the feature has zero variance.
    pub fn degenerate_cells(&self) -> Vec<(usize, usize)> {
        self.p_values
            .indexed_iter()
            .filter_map(|(idx, p)| if p.is_nan() { Some(idx) } else { None })
            .collect()
    }

    /// Cells with a p-value below `alpha`. Undefined cells never qualify.
    pub fn significant_cells(&self, alpha: f64) -> Vec<(usize, usize)> {
        self.p_values
            .indexed_iter()
            .filter_map(|(idx, &p)| if p < alpha { Some(idx) } else { None })
            .collect()
    }

    /// Top `n` features of a group by p-value, undefined cells last.
    pub fn top_features(&self, group: usize, n: usize) -> Vec<usize> {
        let p_values = self.p_values.row(group);
        let mut indices: Vec<usize> = (0..p_values.len()).collect();
        indices.sort_by(|&a, &b| {
            let (pa, pb) = (p_values[a], p_values[b]);
            pa.is_nan().cmp(&pb.is_nan()).then(pa.total_cmp(&pb))
        });
        indices.truncate(n);
        indices
    }
}
