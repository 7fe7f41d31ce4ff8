use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::{
    error::{ExtractError, Result},
    matrix::ops,
};

/// A matrix that is real for RHF/ROHF/UHF and complex for GHF.
#[derive(Clone, Debug, PartialEq)]
pub enum OrbitalMatrix {
    Real(DMatrix<f64>),
    Complex(DMatrix<Complex64>),
}

impl OrbitalMatrix {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::Real(matrix) => matrix.shape(),
            Self::Complex(matrix) => matrix.shape(),
        }
    }

    pub fn nrows(&self) -> usize {
        self.shape().0
    }

    pub fn ncols(&self) -> usize {
        self.shape().1
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Self::Complex(_))
    }

    pub fn as_real(&self) -> Option<&DMatrix<f64>> {
        match self {
            Self::Real(matrix) => Some(matrix),
            Self::Complex(_) => None,
        }
    }

    pub fn as_complex(&self) -> Option<&DMatrix<Complex64>> {
        match self {
            Self::Real(_) => None,
            Self::Complex(matrix) => Some(matrix),
        }
    }

    /// Promote to a complex matrix.
    pub fn to_complex(&self) -> DMatrix<Complex64> {
        match self {
            Self::Real(matrix) => matrix.map(|x| Complex64::new(x, 0.0)),
            Self::Complex(matrix) => matrix.clone(),
        }
    }

    pub fn transpose(&self) -> Self {
        match self {
            Self::Real(matrix) => Self::Real(matrix.transpose()),
            Self::Complex(matrix) => Self::Complex(matrix.transpose()),
        }
    }

    /// `count` consecutive rows starting at `start`.
    pub fn rows(&self, start: usize, count: usize) -> Result<Self> {
        if start + count > self.nrows() {
            return Err(ExtractError::count_mismatch(
                format!("rows at least, to take rows {start}..{}", start + count),
                start + count,
                self.nrows(),
            ));
        }

        Ok(match self {
            Self::Real(matrix) => Self::Real(matrix.rows(start, count).into_owned()),
            Self::Complex(matrix) => Self::Complex(matrix.rows(start, count).into_owned()),
        })
    }

    /// Interleave the rows of two matrices of the same kind.
    pub fn interleave_rows(&self, other: &Self) -> Result<Self> {
        match (self, other) {
            (Self::Real(first), Self::Real(second)) => {
                Ok(Self::Real(ops::interleave_rows(first, second)?))
            }
            _ => Ok(Self::Complex(ops::interleave_rows(
                &self.to_complex(),
                &other.to_complex(),
            )?)),
        }
    }
}

/// The AO projection `(S·C) ∘ conj(C)`: how much each AO contributes to
/// each MO.
pub fn ao_projection(
    overlap: &OrbitalMatrix,
    coefficients: &OrbitalMatrix,
) -> Result<OrbitalMatrix> {
    if overlap.ncols() != coefficients.nrows() {
        return Err(ExtractError::count_mismatch(
            "coefficient rows matching the overlap matrix",
            overlap.ncols(),
            coefficients.nrows(),
        ));
    }

    Ok(match (overlap, coefficients) {
        (OrbitalMatrix::Real(s), OrbitalMatrix::Real(c)) => {
            OrbitalMatrix::Real((s * c).component_mul(c))
        }
        _ => {
            let s = overlap.to_complex();
            let c = coefficients.to_complex();
            OrbitalMatrix::Complex((&s * &c).component_mul(&c.conjugate()))
        }
    })
}

/// Orbital data of one spin (or of both, for restricted and generalized
/// calculations).
#[derive(Clone, Debug, PartialEq)]
pub struct ElectronBlock {
    coefficients: OrbitalMatrix,
    eigenvalues: DVector<f64>,
    density: Option<OrbitalMatrix>,
    ao_projection: OrbitalMatrix,
}

impl ElectronBlock {
    /// anything less than this is considered zero
    const ZERO_CUTOFF: f64 = 1e-4;

    /// Assemble a block, computing its AO projection against `overlap`.
    pub fn new(
        coefficients: OrbitalMatrix,
        eigenvalues: DVector<f64>,
        density: Option<OrbitalMatrix>,
        overlap: &OrbitalMatrix,
    ) -> Result<Self> {
        if eigenvalues.len() != coefficients.ncols() {
            return Err(ExtractError::count_mismatch(
                "eigenvalues, one per MO",
                coefficients.ncols(),
                eigenvalues.len(),
            ));
        }

        let ao_projection = ao_projection(overlap, &coefficients)?;

        Ok(Self {
            coefficients,
            eigenvalues,
            density,
            ao_projection,
        })
    }

    /// MO coefficients; rows are AOs (spin orbitals for GHF), columns MOs.
    pub fn coefficients(&self) -> &OrbitalMatrix {
        &self.coefficients
    }

    pub fn eigenvalues(&self) -> &DVector<f64> {
        &self.eigenvalues
    }

    pub fn density(&self) -> Option<&OrbitalMatrix> {
        self.density.as_ref()
    }

    pub fn ao_projection(&self) -> &OrbitalMatrix {
        &self.ao_projection
    }

    pub fn n_mo(&self) -> usize {
        self.coefficients.ncols()
    }

    /// AOs with a non-negligible share of MO `mo` (0-based), largest first.
    pub fn dominant_aos(&self, mo: usize) -> Vec<(usize, f64)> {
        if mo >= self.n_mo() {
            return Vec::new();
        }

        let mut shares: Vec<(usize, f64)> = match &self.ao_projection {
            OrbitalMatrix::Real(projection) => {
                projection.column(mo).iter().copied().enumerate().collect()
            }
            OrbitalMatrix::Complex(projection) => {
                projection.column(mo).iter().map(|x| x.re).enumerate().collect()
            }
        };

        shares.retain(|(_, share)| share.abs() > Self::ZERO_CUTOFF);
        shares.sort_unstable_by(|(_, a), (_, b)| b.abs().total_cmp(&a.abs()));
        shares
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};
    use num_complex::Complex64;

    use super::{ao_projection, ElectronBlock, OrbitalMatrix};
    use crate::error::ExtractError;

    fn minimal_basis_h2() -> (OrbitalMatrix, OrbitalMatrix) {
        let s: f64 = 0.6593;
        let overlap = DMatrix::from_row_slice(2, 2, &[1.0, s, s, 1.0]);
        let bonding = 1.0 / (2.0 * (1.0 + s)).sqrt();
        let antibonding = 1.0 / (2.0 * (1.0 - s)).sqrt();
        let coefficients =
            DMatrix::from_row_slice(2, 2, &[bonding, antibonding, bonding, -antibonding]);
        (OrbitalMatrix::Real(overlap), OrbitalMatrix::Real(coefficients))
    }

    #[test]
    fn projection_columns_sum_to_one_for_normalized_orbitals() {
        let (overlap, coefficients) = minimal_basis_h2();
        let projection = ao_projection(&overlap, &coefficients).unwrap();
        let projection = projection.as_real().unwrap();

        for column in projection.column_iter() {
            assert_relative_eq!(column.sum(), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(projection[(0, 0)], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn complex_projection_matches_the_real_one() {
        let (overlap, coefficients) = minimal_basis_h2();
        let real = ao_projection(&overlap, &coefficients).unwrap();
        let phased = OrbitalMatrix::Complex(coefficients.to_complex() * Complex64::new(0.0, 1.0));
        let complex = ao_projection(&overlap, &phased).unwrap();

        let real = real.as_real().unwrap();
        let complex = complex.as_complex().unwrap();
        for (i, j) in itertools::iproduct!(0..2, 0..2) {
            assert_relative_eq!(complex[(i, j)].re, real[(i, j)], epsilon = 1e-12);
            assert_relative_eq!(complex[(i, j)].im, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn eigenvalue_count_must_match_the_orbitals() {
        let (overlap, coefficients) = minimal_basis_h2();

        assert!(matches!(
            ElectronBlock::new(coefficients, DVector::from_element(3, -0.5), None, &overlap),
            Err(ExtractError::CountMismatch { .. })
        ));
    }

    #[test]
    fn dominant_aos_are_sorted_and_filtered() {
        let overlap = OrbitalMatrix::Real(DMatrix::identity(3, 3));
        let coefficients = OrbitalMatrix::Real(DMatrix::from_row_slice(
            3,
            1,
            &[0.6, 0.8, 0.001],
        ));
        let eigenvalues = DVector::from_element(1, -0.5);
        let block = ElectronBlock::new(coefficients, eigenvalues, None, &overlap).unwrap();

        let dominant = block.dominant_aos(0);
        assert_eq!(dominant.len(), 2);
        assert_eq!(dominant[0].0, 1);
        assert_relative_eq!(dominant[0].1, 0.64, epsilon = 1e-12);
        assert!(block.dominant_aos(1).is_empty());
    }
}
