use ndarray::Array2;

/// Area under the ROC curve of each feature as a classifier of group membership.
///
/// `auc[g, f] = U[g, f] / (n_g * (N - n_g))`. A group with an empty complement yields NaN.
pub fn auc_from_u(u_statistics: &Array2<f64>, group_sizes: &[usize], total_n: usize) -> Array2<f64> {
    let mut auc = u_statistics.clone();
    for (mut row, &size) in auc.rows_mut().into_iter().zip(group_sizes) {
        let n1n2 = (size * (total_n - size)) as f64;
        if n1n2 > 0.0 {
            row.mapv_inplace(|u| u / n1n2);
        } else {
            row.fill(f64::NAN);
        }
    }
    auc
}
