//! Population analysis: AO labels, the overlap matrix and the orbital
//! blocks of a job.

mod chronus;
mod gaussian;

use nalgebra::DVector;
use serde::Serialize;

use crate::{
    archive::MatrixSource,
    basic::BasicInfo,
    dialect::{Dialect, Layout},
    electron::{ElectronBlock, OrbitalMatrix},
    error::{ExtractError, Result, Warning},
    fields, matrix,
    reader::Job,
};

/// Which atomic orbital a coefficient row belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AoLabel {
    /// 1-based index of the atom
    pub atom_index: usize,
    pub atom_type: String,
    pub principal: u32,
    /// `S`, `P`, `D`, `F`, ...
    pub subshell: String,
    /// e.g. `PX`, `D+1`, `DXX`, or `0` for ChronusQ S orbitals
    pub orbital: String,
}

impl AoLabel {
    /// Build a label from the fields printed before the subshell column.
    ///
    /// The first row of an atom prints `atom_index atom_type principal`;
    /// later rows only print `principal` and take the atom from `previous`.
    fn from_prefix(
        prefix: &[&str],
        subshell: String,
        orbital: String,
        previous: Option<&AoLabel>,
        line_number: usize,
        line: &str,
    ) -> Result<Self> {
        let (atom_index, atom_type, principal) = match (prefix, previous) {
            ([atom_index, atom_type, principal], _) => (
                fields::number(atom_index, line_number, line)?,
                atom_type.split('-').next().unwrap_or(*atom_type).to_owned(),
                *principal,
            ),
            ([principal], Some(previous)) => {
                (previous.atom_index, previous.atom_type.clone(), *principal)
            }
            _ => {
                return Err(ExtractError::not_found(
                    format!("atom of line {line_number}"),
                    "atomic orbital labels",
                ))
            }
        };

        Ok(Self {
            atom_index,
            atom_type,
            principal: fields::number(principal, line_number, line)?,
            subshell,
            orbital,
        })
    }
}

/// Population analysis data of one job.
#[derive(Clone, Debug, PartialEq)]
pub struct Population {
    labels: Vec<AoLabel>,
    overlap: OrbitalMatrix,
    alpha: ElectronBlock,
    beta: Option<ElectronBlock>,
}

impl Population {
    pub fn new(
        labels: Vec<AoLabel>,
        overlap: OrbitalMatrix,
        alpha: ElectronBlock,
        beta: Option<ElectronBlock>,
    ) -> Result<Self> {
        if labels.len() != overlap.nrows() {
            return Err(ExtractError::count_mismatch(
                "atomic orbital labels",
                overlap.nrows(),
                labels.len(),
            ));
        }

        Ok(Self {
            labels,
            overlap,
            alpha,
            beta,
        })
    }

    pub fn labels(&self) -> &[AoLabel] {
        &self.labels
    }

    pub fn overlap(&self) -> &OrbitalMatrix {
        &self.overlap
    }

    /// Alpha orbitals, or the only set of orbitals for RHF and GHF.
    pub fn alpha(&self) -> &ElectronBlock {
        &self.alpha
    }

    pub fn beta(&self) -> Option<&ElectronBlock> {
        self.beta.as_ref()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Spin {
    Alpha,
    Beta,
}

/// Orbital energies printed on the eigenvalue header lines of consecutive
/// coefficient blocks, one header per block.
fn read_eigenvalues(
    job: &Job,
    headers: &[usize],
    n_mo: usize,
    layout: &Layout,
) -> Result<DVector<f64>> {
    let cycles = layout.cycles(n_mo);
    if headers.len() != cycles {
        return Err(ExtractError::count_mismatch(
            format!("`{}` lines for {n_mo} eigenvalues", layout.eigenvalue_keyword),
            cycles,
            headers.len(),
        ));
    }
    let Some(&first) = headers.first() else {
        return Ok(DVector::zeros(0));
    };

    let spec = layout.eigenvalue_spec();
    let prefix = spec.require_prefix_width(job.line(first, "eigenvalues")?, first)?;
    let mut eigenvalues = Vec::with_capacity(n_mo);

    for (cycle, &line_number) in headers.iter().enumerate() {
        let expected = spec.columns.min(n_mo - cycle * spec.columns);
        let values = matrix::parse_row(
            job.line(line_number, "eigenvalues")?,
            line_number,
            prefix,
            spec.exponent_marker,
        )?;
        if values.len() != expected {
            return Err(ExtractError::count_mismatch(
                format!("eigenvalues on line {line_number}"),
                expected,
                values.len(),
            ));
        }
        eigenvalues.extend(values);
    }

    Ok(DVector::from_vec(eigenvalues))
}

/// Header lines `start..start + count`, or a count mismatch naming how many exist.
fn header_range<'a>(
    headers: &'a [usize],
    start: usize,
    count: usize,
    keyword: &str,
) -> Result<&'a [usize]> {
    headers.get(start..start + count).ok_or_else(|| {
        let what = format!("`{keyword}` header lines at least");
        ExtractError::count_mismatch(what, start + count, headers.len())
    })
}

/// Everything population extraction needs besides the job itself.
pub struct PopulationContext<'a> {
    pub basic: &'a BasicInfo,
    pub layout: &'a Layout,
    /// a CAS block is present, which selects different density matrices
    pub cas: bool,
    pub companion: Option<&'a dyn MatrixSource>,
}

/// Extract the population analysis if the job requested one.
///
/// Returns `Ok(None)` when the job has no population analysis, or when a
/// matrix it needs is only available from a companion container that was
/// not supplied (a warning is recorded in that case).
pub fn extract(
    job: &Job,
    context: &PopulationContext<'_>,
    warnings: &mut Vec<Warning>,
) -> Result<Option<Population>> {
    let population = match job.dialect() {
        Dialect::Gaussian => gaussian::extract(job, context)?,
        Dialect::Chronus => chronus::extract(job, context, warnings)?,
    };

    if let Some(population) = &population {
        log::debug!(
            "population analysis: {} AOs, overlap {:?}, alpha coefficients {:?}, beta: {}",
            population.labels.len(),
            population.overlap.shape(),
            population.alpha.coefficients().shape(),
            population.beta.is_some()
        );
    }
    Ok(population)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use num_complex::Complex64;

    use super::AoLabel;
    use crate::{
        archive::{MatrixArchive, MatrixSource},
        config::ParseConfig,
        dialect::{Dialect, ScfVariant},
        electron::OrbitalMatrix,
        matrix::ops,
        pipeline::extract_job,
        reader::segment,
        result::ParsedJob,
        testing::{SyntheticGhf, SyntheticOpenShell, SyntheticRhf},
    };

    fn parse(text: &str, dialect: Dialect, companion: Option<&MatrixArchive>) -> ParsedJob {
        let jobs = segment(text, dialect);
        let companion = companion.map(|archive| archive as &dyn MatrixSource);
        extract_job(&jobs[0], &ParseConfig::default(), companion).unwrap()
    }

    fn assert_close(actual: &DMatrix<Complex64>, expected: &DMatrix<Complex64>, tolerance: f64) {
        assert_eq!(actual.shape(), expected.shape());
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).norm() < tolerance, "{a} differs from {e}");
        }
    }

    fn assert_projections_sum_to_one(projection: &OrbitalMatrix) {
        for column in projection.to_complex().column_iter() {
            let sum: Complex64 = column.iter().sum();
            assert!((sum - 1.0).norm() < 1e-3, "projection column sums to {sum}");
        }
    }

    #[test]
    fn continuation_rows_inherit_the_atom() {
        let first =
            AoLabel::from_prefix(&["2", "H-1", "1"], "S".into(), "0".into(), None, 5, "").unwrap();
        assert_eq!(first.atom_index, 2);
        assert_eq!(first.atom_type, "H");

        let next =
            AoLabel::from_prefix(&["2"], "P".into(), "X".into(), Some(&first), 6, "").unwrap();
        assert_eq!(next.atom_index, 2);
        assert_eq!(next.atom_type, "H");
        assert_eq!(next.principal, 2);

        assert!(AoLabel::from_prefix(&["2"], "S".into(), "0".into(), None, 7, "").is_err());
        assert!(
            AoLabel::from_prefix(&["x", "H", "1"], "S".into(), "0".into(), None, 8, "").is_err()
        );
    }

    #[test]
    fn generalized_gaussian_rows_alternate_real_and_imaginary() {
        let ghf = SyntheticGhf::chain(3, 2);
        let parsed = parse(&ghf.gaussian(), Dialect::Gaussian, None);
        assert_eq!(parsed.basic().variant, ScfVariant::Ghf);

        let population = parsed.population().unwrap();
        let labels = population.labels();
        assert_eq!(labels.len(), 6);
        assert_eq!(labels[2], labels[3]);
        assert_eq!(labels[2].atom_index, 2);

        let overlap = population.overlap().as_complex().unwrap();
        assert_close(overlap, &ops::kron_identity2(&ghf.overlap), 1e-6);

        let alpha = population.alpha();
        assert!(population.beta().is_none());
        assert_close(alpha.coefficients().as_complex().unwrap(), &ghf.coefficients, 1e-5);
        assert_relative_eq!(alpha.eigenvalues(), &ghf.eigenvalues, epsilon = 1e-9);

        let density = alpha.density().and_then(|density| density.as_complex()).unwrap();
        assert_eq!(density.shape(), (6, 6));
        assert_relative_eq!(density.map(|x| x.re), ghf.density.map(|x| x.re), epsilon = 1e-6);

        assert_projections_sum_to_one(alpha.ao_projection());
    }

    #[test]
    fn generalized_chronus_coefficients_from_either_source() {
        let ghf = SyntheticGhf::chain(3, 2);

        let parsed = parse(&ghf.chronus(), Dialect::Chronus, Some(&ghf.archive()));
        let population = parsed.population().unwrap();
        assert_eq!(population.labels().len(), 6);
        assert_eq!(population.labels()[0], population.labels()[1]);
        assert_eq!(
            population.overlap(),
            &OrbitalMatrix::Complex(ops::kron_identity2(&ghf.overlap))
        );
        let alpha = population.alpha();
        assert_eq!(alpha.coefficients().as_complex().unwrap(), &ghf.coefficients);
        assert_relative_eq!(alpha.eigenvalues(), &ghf.eigenvalues, epsilon = 1e-9);
        assert_projections_sum_to_one(alpha.ao_projection());

        // without stored coefficients the four printed sets of blocks are paired up
        let parsed = parse(&ghf.chronus(), Dialect::Chronus, Some(&ghf.overlap_archive()));
        let alpha = parsed.population().unwrap().alpha();
        assert_close(alpha.coefficients().as_complex().unwrap(), &ghf.coefficients, 1e-5);
        assert_projections_sum_to_one(alpha.ao_projection());
    }

    #[test]
    fn unrestricted_chronus_reads_both_spins() {
        let uhf = SyntheticOpenShell::unrestricted(5, 3, 2);

        let stored = parse(&uhf.chronus(), Dialect::Chronus, Some(&uhf.archive()));
        let printed = parse(&uhf.chronus(), Dialect::Chronus, Some(&uhf.overlap_archive()));
        let stored = stored.population().unwrap();
        let printed = printed.population().unwrap();
        assert_eq!(
            stored.beta().unwrap().coefficients().as_real().unwrap(),
            &uhf.beta.coefficients
        );

        for population in [stored, printed] {
            let beta = population.beta().unwrap();
            for (block, expected) in [(population.alpha(), &uhf.alpha), (beta, &uhf.beta)] {
                assert_relative_eq!(
                    block.coefficients().as_real().unwrap(),
                    &expected.coefficients,
                    epsilon = 1e-5
                );
                assert_relative_eq!(block.eigenvalues(), &expected.eigenvalues, epsilon = 1e-9);
                assert!(block.density().is_none());
                assert_projections_sum_to_one(block.ao_projection());
            }
        }
    }

    #[test]
    fn nuclear_orbitals_are_printed_before_the_electronic_ones() {
        let chain = SyntheticRhf::chain(5, 2).with_nuclear_orbitals();
        let parsed = parse(&chain.chronus(), Dialect::Chronus, Some(&chain.overlap_archive()));

        let population = parsed.population().unwrap();
        assert_eq!(population.labels().len(), 5);
        let alpha = population.alpha();
        assert_relative_eq!(alpha.eigenvalues(), &chain.eigenvalues, epsilon = 1e-9);
        assert_relative_eq!(
            alpha.coefficients().as_real().unwrap(),
            &chain.coefficients,
            epsilon = 1e-5
        );
        assert_projections_sum_to_one(alpha.ao_projection());
    }
}
