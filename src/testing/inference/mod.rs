use anyhow::Context;
use nalgebra_sparse::{CscMatrix, CsrMatrix};
use ndarray::Array2;
use single_utilities::traits::FloatOpsTS;

use crate::matrix::{Axis, DenseMatrix, Matrix, SparseMatrix};
use crate::testing::utils::GroupLabels;
use crate::testing::{Alternative, RankSumConfig, RankSumResults};

pub mod nonparametric;

/// One-vs-rest rank-sum testing directly on common matrix types.
///
/// The `nalgebra-sparse` and `ndarray` implementations treat rows as observations (cells) and
/// columns as features (genes); a [`Matrix`] keeps its own orientation.
pub trait MatrixRankSumTests {
    fn to_rank_sum_matrix(&self) -> anyhow::Result<Matrix>;

    fn rank_sum_test(
        &self,
        group_ids: &[usize],
        config: &RankSumConfig,
    ) -> anyhow::Result<RankSumResults> {
        let matrix = self.to_rank_sum_matrix()?;
        let labels = GroupLabels::new(group_ids)?;
        let results = nonparametric::mann_whitney_matrix_groups(&matrix, &labels, config)
            .with_context(|| {
                format!(
                    "rank-sum test over {} observations and {} features failed",
                    matrix.n_observations(),
                    matrix.n_features()
                )
            })?;
        Ok(results)
    }

    fn mann_whitney_test(
        &self,
        group_ids: &[usize],
        alternative: Alternative,
    ) -> anyhow::Result<RankSumResults> {
        self.rank_sum_test(
            group_ids,
            &RankSumConfig::default().with_alternative(alternative),
        )
    }
}

impl<T> MatrixRankSumTests for CscMatrix<T>
where
    T: FloatOpsTS,
{
    fn to_rank_sum_matrix(&self) -> anyhow::Result<Matrix> {
        Ok(Matrix::Sparse(SparseMatrix::from_csc(self)?))
    }
}

impl<T> MatrixRankSumTests for CsrMatrix<T>
where
    T: FloatOpsTS,
{
    fn to_rank_sum_matrix(&self) -> anyhow::Result<Matrix> {
        Ok(Matrix::Sparse(SparseMatrix::from_csr(self)?))
    }
}

impl<T> MatrixRankSumTests for Array2<T>
where
    T: FloatOpsTS,
{
    fn to_rank_sum_matrix(&self) -> anyhow::Result<Matrix> {
        Ok(Matrix::Dense(DenseMatrix::from_array(self, Axis::ObservationsAsRows)?))
    }
}

impl MatrixRankSumTests for Matrix {
    fn to_rank_sum_matrix(&self) -> anyhow::Result<Matrix> {
        Ok(self.clone())
    }
}
