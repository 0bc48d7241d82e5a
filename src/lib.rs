//! # single-ranksum
//!
//! Sparse-aware Wilcoxon rank-sum (Mann-Whitney U) testing for single-cell data, part of the
//! single-rust ecosystem.
//!
//! Every feature (gene) of a feature-by-observation matrix is tested for every group of a
//! multi-level label against all remaining observations. For sparse input the work is
//! proportional to the number of stored entries: background (zero) entries are never ranked
//! individually, they share one implicit rank per feature that is folded back into the U
//! statistic per group.
//!
//! ## Core Features
//!
//! - **Rank transform**: mid-rank ties, per-feature tie runs, implicit background ranks
//! - **Group aggregation**: per-group sums and non-zero counts for dense and CSC input, in
//!   either orientation
//! - **Statistics**: U, AUC, and tie-corrected normal-approximation p-values with continuity
//!   correction for two-sided, greater and less alternatives
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nalgebra_sparse::{CooMatrix, CsrMatrix};
//! use single_ranksum::testing::inference::MatrixRankSumTests;
//! use single_ranksum::testing::Alternative;
//!
//! let mut coo = CooMatrix::<f64>::new(4, 2);
//! coo.push(0, 0, 1.0);
//! coo.push(2, 1, 3.0);
//! let cells_by_genes = CsrMatrix::from(&coo);
//!
//! let results = cells_by_genes
//!     .mann_whitney_test(&[0, 0, 1, 1], Alternative::TwoSided)
//!     .unwrap();
//! println!("{:?}", results.p_values);
//! ```
//!
//! ## Module Organization
//!
//! - **[`matrix`]**: dense and CSC storage behind one [`matrix::Matrix`] view
//! - **[`ranking`]**: the rank transform and tie runs
//! - **[`aggregation`]**: per-group sums and counts
//! - **[`testing`]**: labels, configuration, U statistics, p-values and results

pub mod aggregation;
pub mod error;
pub mod matrix;
pub mod ranking;
pub mod testing;

pub use error::RankSumError;
pub use matrix::{Axis, DenseMatrix, Matrix, SparseMatrix};
pub use testing::inference::nonparametric::mann_whitney_matrix_groups;
pub use testing::utils::GroupLabels;
pub use testing::{Alternative, RankSumConfig, RankSumResults};
