use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::{Array2, array};
use single_ranksum::aggregation::{group_nnz, group_sum};
use single_ranksum::ranking::rank;
use single_ranksum::testing::inference::nonparametric::{mann_whitney_matrix_groups, u_stat};
use single_ranksum::{
    Alternative, Axis, DenseMatrix, GroupLabels, Matrix, RankSumConfig, RankSumError, SparseMatrix,
};

/// 12 observations x 5 features with plenty of zeros and ties.
fn synthetic_counts() -> Array2<f64> {
    Array2::from_shape_fn((12, 5), |(i, j)| {
        if (i * 3 + j * 5) % 4 == 0 {
            0.0
        } else {
            ((i * 7 + j * 11) % 6) as f64
        }
    })
}

fn three_groups() -> GroupLabels {
    GroupLabels::new(&[0, 1, 2, 0, 1, 2, 0, 1, 2, 0, 0, 1]).unwrap()
}

fn assert_same_cells(a: &Array2<f64>, b: &Array2<f64>) {
    assert_eq!(a.dim(), b.dim());
    for (x, y) in a.iter().zip(b.iter()) {
        if x.is_nan() || y.is_nan() {
            assert!(x.is_nan() && y.is_nan(), "{} vs {}", x, y);
        } else {
            assert_abs_diff_eq!(x, y, epsilon = 1e-10);
        }
    }
}

#[cfg(test)]
mod worked_examples {
    use super::*;

    #[test]
    fn dense_ties_example() {
        let m = DenseMatrix::new(
            array![[1.0], [1.0], [2.0], [3.0], [3.0], [3.0]],
            Axis::ObservationsAsRows,
        )
        .unwrap();
        let labels = GroupLabels::new(&[0, 0, 0, 1, 1, 1]).unwrap();
        let results =
            mann_whitney_matrix_groups(&Matrix::Dense(m), &labels, &RankSumConfig::default())
                .unwrap();

        assert_eq!(results.ties[0].runs(), &[2, 3]);
        assert_relative_eq!(results.u_statistics[[0, 0]], 0.0);
        assert_relative_eq!(results.u_statistics[[1, 0]], 9.0);
        assert_abs_diff_eq!(results.p_value(1, 0).unwrap(), 0.05934, epsilon = 1e-4);
        assert_abs_diff_eq!(results.p_value(0, 0).unwrap(), 0.05934, epsilon = 1e-4);
        assert_relative_eq!(results.auc[[1, 0]], 1.0);
        assert_eq!(results.group_sums, array![[4.0], [9.0]]);
        assert_eq!(results.group_nnz, array![[3usize], [3]]);
    }

    #[test]
    fn sparse_background_example() {
        let m = SparseMatrix::try_new(
            5,
            1,
            vec![0, 2],
            vec![2, 4],
            vec![3.0, 2.0],
            Axis::ObservationsAsRows,
        )
        .unwrap();
        let m = Matrix::Sparse(m);
        let labels = GroupLabels::new(&[0, 0, 1, 0, 1]).unwrap();

        let ranked = rank(&m, false).unwrap();
        assert_relative_eq!(ranked.background_rank(0), 2.0);
        assert_relative_eq!(ranked.column_rank_sum(0), 15.0);

        let results = mann_whitney_matrix_groups(&m, &labels, &RankSumConfig::default()).unwrap();
        assert_eq!(results.group_nnz, array![[0usize], [2]]);
        assert_relative_eq!(results.u_statistics[[0, 0]], 0.0);
        assert_relative_eq!(results.u_statistics[[1, 0]], 6.0);
    }
}

#[cfg(test)]
mod properties {
    use super::*;

    #[test]
    fn rank_sums_are_triangular_numbers() {
        let dense = DenseMatrix::new(synthetic_counts(), Axis::ObservationsAsRows).unwrap();
        let sparse = SparseMatrix::from_dense(&dense).unwrap();
        let n = 12.0;

        for m in [Matrix::Dense(dense), Matrix::Sparse(sparse)] {
            let ranked = rank(&m, true).unwrap();
            for f in 0..ranked.n_features() {
                assert_relative_eq!(ranked.column_rank_sum(f), n * (n + 1.0) / 2.0);
            }
        }
    }

    #[test]
    fn aggregates_cover_every_observation() {
        let counts = synthetic_counts();
        let dense = DenseMatrix::new(counts.clone(), Axis::ObservationsAsRows).unwrap();
        let sparse = Matrix::Sparse(SparseMatrix::from_dense(&dense).unwrap());
        let labels = three_groups();

        let sums = group_sum(&sparse, &labels).unwrap();
        let nnz = group_nnz(&sparse, &labels).unwrap();
        for f in 0..counts.ncols() {
            let column = counts.column(f);
            assert_relative_eq!(sums.column(f).sum(), column.sum());
            assert_eq!(
                nnz.column(f).sum(),
                column.iter().filter(|&&v| v != 0.0).count()
            );
        }
        assert_eq!(group_nnz(&Matrix::Dense(dense), &labels).unwrap(), nnz);
    }

    #[test]
    fn u_statistics_are_bounded() {
        let dense = DenseMatrix::new(synthetic_counts(), Axis::ObservationsAsRows).unwrap();
        let labels = three_groups();
        let results =
            mann_whitney_matrix_groups(&Matrix::Dense(dense), &labels, &RankSumConfig::default())
                .unwrap();

        for ((g, _), &u) in results.u_statistics.indexed_iter() {
            let size = labels.sizes()[g];
            let max = (size * (labels.total() - size)) as f64;
            assert!((0.0..=max).contains(&u), "U = {} outside [0, {}]", u, max);
        }
    }

    #[test]
    fn dense_and_sparse_agree() {
        let dense = DenseMatrix::new(synthetic_counts(), Axis::ObservationsAsRows).unwrap();
        let sparse = SparseMatrix::from_dense(&dense).unwrap();
        let labels = three_groups();

        for alternative in [Alternative::TwoSided, Alternative::Greater, Alternative::Less] {
            let config = RankSumConfig::default().with_alternative(alternative);
            let d = mann_whitney_matrix_groups(&Matrix::Dense(dense.clone()), &labels, &config)
                .unwrap();
            let s = mann_whitney_matrix_groups(&Matrix::Sparse(sparse.clone()), &labels, &config)
                .unwrap();

            assert_same_cells(&d.u_statistics, &s.u_statistics);
            assert_same_cells(&d.p_values, &s.p_values);
            assert_same_cells(&d.auc, &s.auc);
            assert_same_cells(&d.group_sums, &s.group_sums);
            assert_eq!(d.group_nnz, s.group_nnz);
        }
    }

    #[test]
    fn orientation_does_not_change_results() {
        let counts = synthetic_counts();
        let rows = DenseMatrix::new(counts.clone(), Axis::ObservationsAsRows).unwrap();
        let cols = DenseMatrix::new(counts.t().to_owned(), Axis::ObservationsAsColumns).unwrap();
        let sparse_cols = SparseMatrix::from_dense(&cols).unwrap();
        let labels = three_groups();
        let config = RankSumConfig::default();

        let reference = mann_whitney_matrix_groups(&Matrix::Dense(rows), &labels, &config).unwrap();
        for m in [Matrix::Dense(cols), Matrix::Sparse(sparse_cols)] {
            let other = mann_whitney_matrix_groups(&m, &labels, &config).unwrap();
            assert_same_cells(&reference.u_statistics, &other.u_statistics);
            assert_same_cells(&reference.p_values, &other.p_values);
            assert_same_cells(&reference.group_sums, &other.group_sums);
        }
    }

    #[test]
    fn swapping_groups_exchanges_one_sided_alternatives() {
        let dense = DenseMatrix::new(synthetic_counts(), Axis::ObservationsAsRows).unwrap();
        let m = Matrix::Dense(dense);
        let labels = GroupLabels::new(&[0, 1, 1, 0, 1, 0, 0, 1, 1, 0, 1, 0]).unwrap();

        let run = |alternative| {
            mann_whitney_matrix_groups(
                &m,
                &labels,
                &RankSumConfig::default().with_alternative(alternative),
            )
            .unwrap()
            .p_values
        };
        let two = run(Alternative::TwoSided);
        let greater = run(Alternative::Greater);
        let less = run(Alternative::Less);

        for f in 0..m.n_features() {
            if two[[0, f]].is_nan() {
                continue;
            }
            assert_abs_diff_eq!(two[[0, f]], two[[1, f]], epsilon = 1e-12);
            assert_abs_diff_eq!(greater[[0, f]], less[[1, f]], epsilon = 1e-12);
            assert_abs_diff_eq!(less[[0, f]], greater[[1, f]], epsilon = 1e-12);
        }
    }

    #[test]
    fn serial_and_parallel_agree() {
        let dense = DenseMatrix::new(synthetic_counts(), Axis::ObservationsAsRows).unwrap();
        let sparse = Matrix::Sparse(SparseMatrix::from_dense(&dense).unwrap());
        let labels = three_groups();
        let par = mann_whitney_matrix_groups(&sparse, &labels, &RankSumConfig::default()).unwrap();
        let serial = mann_whitney_matrix_groups(
            &sparse,
            &labels,
            &RankSumConfig::default().with_parallel(false),
        )
        .unwrap();
        assert_same_cells(&par.p_values, &serial.p_values);
        assert_eq!(par.ties, serial.ties);
    }
}

#[cfg(test)]
mod edge_cases {
    use super::*;

    #[test]
    fn constant_feature_is_degenerate() {
        let m = SparseMatrix::try_new(
            4,
            2,
            vec![0, 0, 2],
            vec![0, 3],
            vec![1.0, 2.0],
            Axis::ObservationsAsRows,
        )
        .unwrap();
        let labels = GroupLabels::new(&[0, 1, 0, 1]).unwrap();
        let results =
            mann_whitney_matrix_groups(&Matrix::Sparse(m), &labels, &RankSumConfig::default())
                .unwrap();

        assert_eq!(results.degenerate_cells(), vec![(0, 0), (1, 0)]);
        assert_eq!(
            results.p_value(0, 0),
            Err(RankSumError::DegenerateStatistic { group: 0, feature: 0 })
        );
        assert!(results.p_value(0, 1).is_ok());
        assert_eq!(results.top_features(0, 2), vec![1, 0]);
    }

    #[test]
    fn groups_use_restricts_observations() {
        let counts = synthetic_counts();
        let dense = DenseMatrix::new(counts.clone(), Axis::ObservationsAsRows).unwrap();
        let labels = three_groups();
        let config = RankSumConfig::default().with_groups_use(&[2, 0]);
        let restricted =
            mann_whitney_matrix_groups(&Matrix::Dense(dense), &labels, &config).unwrap();

        assert_eq!(restricted.groups, vec![0, 2]);
        assert_eq!(restricted.group_sizes, vec![5, 3]);
        assert_eq!(restricted.total_n, 8);

        let keep: Vec<usize> = (0..12).filter(|&i| labels.labels()[i] != 1).collect();
        let subset = DenseMatrix::new(
            counts.select(ndarray::Axis(0), &keep),
            Axis::ObservationsAsRows,
        )
        .unwrap();
        let sub_labels: Vec<usize> = keep
            .iter()
            .map(|&i| if labels.labels()[i] == 0 { 0 } else { 1 })
            .collect();
        let direct = mann_whitney_matrix_groups(
            &Matrix::Dense(subset),
            &GroupLabels::new(&sub_labels).unwrap(),
            &RankSumConfig::default(),
        )
        .unwrap();
        assert_same_cells(&restricted.p_values, &direct.p_values);
    }

    #[test]
    fn label_gaps_are_fatal() {
        let dense = DenseMatrix::new(synthetic_counts(), Axis::ObservationsAsRows).unwrap();
        let config = RankSumConfig::default().with_groups_use(&[7]);
        let err = mann_whitney_matrix_groups(&Matrix::Dense(dense), &three_groups(), &config)
            .unwrap_err();
        assert!(matches!(err, RankSumError::InvalidGroupLabeling(_)));
    }

    #[test]
    fn negative_sparse_values_are_fatal() {
        let m = SparseMatrix::try_new(
            3,
            1,
            vec![0, 2],
            vec![0, 2],
            vec![1.0, -1.0],
            Axis::ObservationsAsRows,
        )
        .unwrap();
        let labels = GroupLabels::new(&[0, 1, 1]).unwrap();
        let err = mann_whitney_matrix_groups(&Matrix::Sparse(m), &labels, &RankSumConfig::default())
            .unwrap_err();
        assert!(matches!(err, RankSumError::SparsityInvariantViolation { .. }));
    }

    #[test]
    fn u_stat_direct_dense() {
        let m = Matrix::Dense(
            DenseMatrix::new(array![[5.0], [1.0], [3.0]], Axis::ObservationsAsRows).unwrap(),
        );
        let labels = GroupLabels::new(&[1, 0, 0]).unwrap();
        let ranked = rank(&m, false).unwrap();
        let rank_sums = group_sum(ranked.ranks(), &labels).unwrap();
        let u = u_stat(&ranked, &rank_sums, labels.sizes(), &group_nnz(&m, &labels).unwrap())
            .unwrap();
        assert_eq!(u, array![[0.0], [2.0]]);
    }
}
