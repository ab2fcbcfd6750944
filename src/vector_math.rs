use ndarray::{Array1, Array2, ArrayView1, Axis};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum NormalizeError {
    #[error("vector has zero length")]
    ZeroNorm,
    #[error("vector contains non-finite values")]
    NonFinite,
    #[error("vector is empty")]
    Empty,
}

/// Scales `vector` to unit L2 norm.
///
/// Any finite vector with a non-zero component succeeds, however large or small
/// its magnitude. Zero, empty and non-finite vectors are rejected.
pub fn normalize(vector: ArrayView1<'_, f32>) -> Result<Array1<f32>, NormalizeError> {
    let (scale, norm) = scaled_norm(vector)?;
    Ok(vector.mapv(|x| (x / scale) / norm))
}

/// Normalizes every row of `matrix` in place. On failure the offending row index
/// is returned and the matrix is left partially normalized.
pub fn normalize_rows(matrix: &mut Array2<f32>) -> Result<(), (usize, NormalizeError)> {
    for (row_idx, mut row) in matrix.axis_iter_mut(Axis(0)).enumerate() {
        let (scale, norm) = scaled_norm(row.view()).map_err(|err| (row_idx, err))?;
        row.mapv_inplace(|x| (x / scale) / norm);
    }
    Ok(())
}

pub fn l2_norm(vector: ArrayView1<'_, f32>) -> f32 {
    match scaled_norm(vector) {
        Ok((scale, norm)) => scale * norm,
        Err(NormalizeError::NonFinite) => f32::NAN,
        Err(_) => 0.0,
    }
}

pub fn squared_euclidean(left: ArrayView1<'_, f32>, right: ArrayView1<'_, f32>) -> f32 {
    left.iter()
        .zip(right.iter())
        .map(|(a, b)| {
            let d = a - b;
            d * d
        })
        .sum()
}

/// Splits the norm into `scale * norm` with `scale` the largest absolute
/// component, so squaring never overflows or underflows.
fn scaled_norm(vector: ArrayView1<'_, f32>) -> Result<(f32, f32), NormalizeError> {
    if vector.is_empty() {
        return Err(NormalizeError::Empty);
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(NormalizeError::NonFinite);
    }
    let scale = vector.iter().fold(0.0_f32, |acc, x| acc.max(x.abs()));
    if scale == 0.0 {
        return Err(NormalizeError::ZeroNorm);
    }
    let norm = vector
        .iter()
        .map(|x| {
            let scaled = x / scale;
            scaled * scaled
        })
        .sum::<f32>()
        .sqrt();
    Ok((scale, norm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn normalize_produces_unit_norm() {
        let v = array![3.0_f32, 4.0];
        let n = normalize(v.view()).expect("normalize should work");
        assert!(approx_eq(n[0], 0.6));
        assert!(approx_eq(n[1], 0.8));
        assert!(approx_eq(l2_norm(n.view()), 1.0));
    }

    #[test]
    fn normalize_keeps_unit_vectors_unchanged() {
        let v = array![0.0_f32, 1.0, 0.0];
        let n = normalize(v.view()).unwrap();
        assert_eq!(n, v);
    }

    #[test]
    fn normalize_rejects_zero_vector() {
        let v = array![0.0_f32, 0.0, 0.0];
        assert_eq!(normalize(v.view()), Err(NormalizeError::ZeroNorm));
    }

    #[test]
    fn normalize_rejects_nan() {
        let v = array![f32::NAN, 1.0];
        assert_eq!(normalize(v.view()), Err(NormalizeError::NonFinite));
    }

    #[test]
    fn normalize_rejects_empty() {
        let v: Array1<f32> = Array1::zeros(0);
        assert_eq!(normalize(v.view()), Err(NormalizeError::Empty));
    }

    #[test]
    fn normalize_handles_huge_components() {
        let v = array![1e20_f32, 0.0];
        let n = normalize(v.view()).unwrap();
        assert!(approx_eq(n[0], 1.0));
        assert_eq!(n[1], 0.0);

        let v = array![f32::MAX, f32::MAX];
        let n = normalize(v.view()).unwrap();
        assert!(approx_eq(n[0], std::f32::consts::FRAC_1_SQRT_2));
    }

    #[test]
    fn normalize_handles_tiny_components() {
        let v = array![1e-10_f32, 0.0];
        let n = normalize(v.view()).unwrap();
        assert!(approx_eq(n[0], 1.0));

        let v = array![3e-40_f32, 4e-40];
        let n = normalize(v.view()).unwrap();
        assert!((n[0] - 0.6).abs() < 1e-3);
        assert!((n[1] - 0.8).abs() < 1e-3);
    }

    #[test]
    fn normalize_rows_scales_each_row() {
        let mut m = array![[2.0_f32, 0.0], [1.0, 1.0], [0.0, -5.0]];
        normalize_rows(&mut m).unwrap();
        for row in m.axis_iter(Axis(0)) {
            assert!(approx_eq(l2_norm(row), 1.0));
        }
        assert!(approx_eq(m[[2, 1]], -1.0));
    }

    #[test]
    fn normalize_rows_reports_zero_row() {
        let mut m = array![[1.0_f32, 0.0], [0.0, 0.0]];
        assert_eq!(normalize_rows(&mut m), Err((1, NormalizeError::ZeroNorm)));
    }

    #[test]
    fn squared_euclidean_matches_hand_computation() {
        let a = array![1.0_f32, 0.0];
        let b = array![0.0_f32, 1.0];
        assert!(approx_eq(squared_euclidean(a.view(), b.view()), 2.0));
        assert!(approx_eq(squared_euclidean(a.view(), a.view()), 0.0));
    }
}
