//! Dimensions and SCF metadata every other extraction step depends on.

mod chronus;
mod gaussian;

use serde::Serialize;

use crate::{
    dialect::{Dialect, Layout, ScfVariant},
    error::Result,
    reader::Job,
};

/// Basic information about the calculation of one job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BasicInfo {
    /// atom symbols in input order
    pub atoms: Vec<String>,
    pub variant: ScfVariant,
    pub n_basis: usize,
    pub n_primitive: usize,
    pub n_alpha: usize,
    pub n_beta: usize,
    pub n_electron: usize,
    /// number of molecular orbitals, doubled for GHF
    pub n_mo: usize,
    /// number of (spin) atomic orbitals, doubled for GHF
    pub n_ao: usize,
    /// 1-based index of the highest occupied MO
    pub homo: usize,
    pub lumo: usize,
}

impl BasicInfo {
    /// Derive the orbital counts and frontier indices from the parsed counts.
    pub fn new(
        atoms: Vec<String>,
        variant: ScfVariant,
        n_basis: usize,
        n_primitive: usize,
        n_alpha: usize,
        n_beta: usize,
        n_electron: usize,
    ) -> Self {
        let n_mo = n_basis * variant.spin_factor();
        let homo = if variant.is_restricted() {
            n_electron / 2
        } else {
            n_electron
        };

        Self {
            atoms,
            variant,
            n_basis,
            n_primitive,
            n_alpha,
            n_beta,
            n_electron,
            n_mo,
            n_ao: n_mo,
            homo,
            lumo: homo + 1,
        }
    }

    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// Capability table for the rest of the extraction.
    pub fn layout(&self, dialect: Dialect) -> Layout {
        Layout::new(dialect, self.variant)
    }
}

/// Read the basic information of a job in its dialect.
pub fn extract(job: &Job) -> Result<BasicInfo> {
    let basic = match job.dialect() {
        Dialect::Gaussian => gaussian::extract(job)?,
        Dialect::Chronus => chronus::extract(job)?,
    };

    log::debug!(
        "{} with {} atoms: {} basis functions, {} electrons ({} alpha, {} beta), HOMO {}",
        basic.variant,
        basic.n_atoms(),
        basic.n_basis,
        basic.n_electron,
        basic.n_alpha,
        basic.n_beta,
        basic.homo
    );
    Ok(basic)
}

#[cfg(test)]
mod tests {
    use super::BasicInfo;
    use crate::dialect::ScfVariant;

    fn basic(variant: ScfVariant, n_basis: usize, n_alpha: usize, n_beta: usize) -> BasicInfo {
        BasicInfo::new(
            vec!["O".into(), "H".into(), "H".into()],
            variant,
            n_basis,
            2 * n_basis,
            n_alpha,
            n_beta,
            n_alpha + n_beta,
        )
    }

    #[test]
    fn restricted_frontier_orbitals_count_pairs() {
        let rhf = basic(ScfVariant::Rhf, 7, 5, 5);
        assert_eq!((rhf.homo, rhf.lumo), (5, 6));
        assert_eq!(rhf.n_mo, 7);
        assert_eq!(rhf.n_ao, 7);

        let rohf = basic(ScfVariant::Rohf, 7, 5, 4);
        assert_eq!((rohf.homo, rohf.lumo), (4, 5));
    }

    #[test]
    fn generalized_orbitals_double_the_basis() {
        let ghf = basic(ScfVariant::Ghf, 7, 5, 5);
        assert_eq!((ghf.homo, ghf.lumo), (10, 11));
        assert_eq!(ghf.n_mo, 14);
        assert_eq!(ghf.n_ao, 14);

        let uhf = basic(ScfVariant::Uhf, 7, 5, 4);
        assert_eq!((uhf.homo, uhf.lumo), (9, 10));
        assert_eq!(uhf.n_mo, 7);
    }
}
