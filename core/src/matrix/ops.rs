use nalgebra::{DMatrix, Scalar};
use num_complex::Complex64;

use crate::error::{ExtractError, Result};

/// `M + Mᵀ` with the diagonal of `M` kept once. `M` holds a lower triangle.
pub fn symmetrize_lower(lower: &DMatrix<f64>) -> DMatrix<f64> {
    let mut symmetric = lower + lower.transpose();
    symmetric.set_diagonal(&lower.diagonal());
    symmetric
}

/// Pair a real and an imaginary part of the same shape.
pub fn combine_complex(
    real: &DMatrix<f64>,
    imaginary: &DMatrix<f64>,
) -> Result<DMatrix<Complex64>> {
    if real.shape() != imaginary.shape() {
        return Err(ExtractError::InvalidArgument(format!(
            "real part is {:?} but imaginary part is {:?}",
            real.shape(),
            imaginary.shape()
        )));
    }
    Ok(real.zip_map(imaginary, |re, im| Complex64::new(re, im)))
}

/// Rows of `first` at even positions and rows of `second` at odd positions.
pub fn interleave_rows<T: Scalar>(first: &DMatrix<T>, second: &DMatrix<T>) -> Result<DMatrix<T>> {
    if first.shape() != second.shape() {
        return Err(ExtractError::InvalidArgument(format!(
            "cannot interleave a {:?} matrix with a {:?} matrix",
            first.shape(),
            second.shape()
        )));
    }

    Ok(DMatrix::from_fn(first.nrows() * 2, first.ncols(), |i, j| {
        if i % 2 == 0 {
            first[(i / 2, j)].clone()
        } else {
            second[(i / 2, j)].clone()
        }
    }))
}

/// Every other row, starting at `parity` (0 or 1).
pub fn alternate_rows(matrix: &DMatrix<f64>, parity: usize) -> DMatrix<f64> {
    let rows = (matrix.nrows() + 1 - parity.min(1)) / 2;
    DMatrix::from_fn(rows, matrix.ncols(), |i, j| matrix[(2 * i + parity, j)])
}

/// Spin-blocked overlap `S ⊗ I₂` for two-component orbitals.
pub fn kron_identity2(overlap: &DMatrix<f64>) -> DMatrix<Complex64> {
    overlap
        .map(|x| Complex64::new(x, 0.0))
        .kronecker(&DMatrix::<Complex64>::identity(2, 2))
}
