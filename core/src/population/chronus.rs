use super::{header_range, read_eigenvalues, AoLabel, Population, PopulationContext};
use crate::{
    archive,
    basic::BasicInfo,
    dialect::{Layout, ScfVariant},
    electron::{ElectronBlock, OrbitalMatrix},
    error::{ExtractError, Result, Warning},
    matrix::{decode_matrix, ops},
    options::{chronus_integer, chronus_option},
    reader::Job,
};

/// `PRINTMOS` levels that print the MO coefficients.
const PRINTS_ORBITALS: [i64; 5] = [1, 3, 5, 7, 9];

pub(super) fn extract(
    job: &Job,
    context: &PopulationContext<'_>,
    warnings: &mut Vec<Warning>,
) -> Result<Option<Population>> {
    if !chronus_integer(job, "PRINTMOS")?.is_some_and(|level| PRINTS_ORBITALS.contains(&level)) {
        return Ok(None);
    }
    let PopulationContext {
        basic,
        layout,
        companion,
        ..
    } = *context;

    let headers = job
        .index()
        .require(layout.eigenvalue_keyword, "MO coefficients")?;
    let labels = ao_labels(job, basic, headers[0] + layout.coefficient_offset)?;

    let Some(companion) = companion else {
        log::warn!(
            "the overlap matrix is not printed in ChronusQ output, skipping the population analysis"
        );
        warnings.push(Warning::MissingCompanion {
            matrix: archive::OVERLAP.to_owned(),
        });
        return Ok(None);
    };

    let overlap = match companion.matrix(archive::OVERLAP)? {
        Some(OrbitalMatrix::Real(overlap)) if basic.variant.is_complex() => {
            OrbitalMatrix::Complex(ops::kron_identity2(&overlap))
        }
        Some(overlap) => overlap,
        None => return Err(ExtractError::not_found(archive::OVERLAP, "overlap matrix")),
    };

    let blocks = BlockIndices::new(job, basic, layout);
    let text = TextOrbitals {
        job,
        basic,
        layout,
        headers: &headers,
    };

    let alpha_coefficients = match companion.matrix(archive::ALPHA_COEFFICIENTS)? {
        Some(stored) if basic.variant.is_complex() => {
            let stored = stored.transpose();
            stored
                .rows(0, basic.n_basis)?
                .interleave_rows(&stored.rows(basic.n_basis, basic.n_basis)?)?
        }
        Some(stored) => stored.transpose(),
        None if basic.variant.is_complex() => text
            .coefficients(blocks.alpha)?
            .interleave_rows(&text.coefficients(blocks.beta)?)?,
        None => text.coefficients(blocks.alpha)?,
    };
    let alpha = ElectronBlock::new(
        alpha_coefficients,
        text.eigenvalues(blocks.alpha)?,
        None,
        &overlap,
    )?;

    let beta = if basic.variant == ScfVariant::Uhf {
        let coefficients = match companion.matrix(archive::BETA_COEFFICIENTS)? {
            Some(stored) => stored.transpose(),
            None => text.coefficients(blocks.beta)?,
        };
        Some(ElectronBlock::new(
            coefficients,
            text.eigenvalues(blocks.beta)?,
            None,
            &overlap,
        )?)
    } else {
        None
    };

    Population::new(labels, overlap, alpha, beta).map(Some)
}

/// Index of the first `EigV` header of each spin's coefficient blocks.
struct BlockIndices {
    alpha: usize,
    beta: usize,
}

impl BlockIndices {
    fn new(job: &Job, basic: &BasicInfo, layout: &Layout) -> Self {
        let cycles = layout.cycles(basic.n_mo);
        let neo =
            chronus_option(job, "NEO").is_some_and(|value| value.eq_ignore_ascii_case("TRUE"));
        // nuclear orbitals are printed first in NEO calculations
        let shift = if neo { basic.variant.neo_blocks() } else { 0 };
        // GHF prints an imaginary set of blocks after each real one
        let per_spin = 1 + usize::from(basic.variant.is_complex());

        Self {
            alpha: cycles * shift,
            beta: cycles * (per_spin + shift),
        }
    }
}

/// Orbitals decoded from the text output.
struct TextOrbitals<'a> {
    job: &'a Job,
    basic: &'a BasicInfo,
    layout: &'a Layout,
    headers: &'a [usize],
}

impl TextOrbitals<'_> {
    fn cycles(&self) -> usize {
        self.layout.cycles(self.basic.n_mo)
    }

    fn header(&self, index: usize) -> Result<usize> {
        header_range(self.headers, index, 1, self.layout.eigenvalue_keyword).map(|lines| lines[0])
    }

    fn real_block(&self, index: usize) -> Result<nalgebra::DMatrix<f64>> {
        let start = self.header(index)? + self.layout.coefficient_offset;
        Ok(decode_matrix(
            self.job.lines(),
            start,
            self.basic.n_basis,
            self.basic.n_mo,
            &self.layout.coefficients,
        )?
        .value)
    }

    /// Coefficients of the blocks starting at header `index`; one spin
    /// component for GHF.
    fn coefficients(&self, index: usize) -> Result<OrbitalMatrix> {
        let real = self.real_block(index)?;
        if self.basic.variant.is_complex() {
            let imaginary = self.real_block(index + self.cycles())?;
            Ok(OrbitalMatrix::Complex(ops::combine_complex(&real, &imaginary)?))
        } else {
            Ok(OrbitalMatrix::Real(real))
        }
    }

    fn eigenvalues(&self, index: usize) -> Result<nalgebra::DVector<f64>> {
        let keyword = self.layout.eigenvalue_keyword;
        let headers = header_range(self.headers, index, self.cycles(), keyword)?;
        read_eigenvalues(self.job, headers, self.basic.n_mo, self.layout)
    }
}

/// AO labels of the first coefficient block; atoms are separated by blank
/// lines. GHF repeats each label for the two spin components.
fn ao_labels(job: &Job, basic: &BasicInfo, start: usize) -> Result<Vec<AoLabel>> {
    let first = job.line(start, "atomic orbital labels")?;
    let column = first
        .rfind('S')
        .ok_or_else(|| {
            ExtractError::not_found("S", "subshell column of the atomic orbital labels")
        })?;

    let mut labels: Vec<AoLabel> = Vec::with_capacity(basic.n_ao);
    let mut line_number = start;

    while labels.len() < basic.n_ao {
        let line = job.line(line_number, "atomic orbital labels")?;
        if !line.trim().is_empty() {
            let label = parse_label(line, column, labels.last(), line_number)?;
            if basic.variant.is_complex() {
                labels.push(label.clone());
            }
            labels.push(label);
        }
        line_number += 1;
    }

    Ok(labels)
}

fn parse_label(
    line: &str,
    column: usize,
    previous: Option<&AoLabel>,
    line_number: usize,
) -> Result<AoLabel> {
    let (Some(prefix), Some(subshell)) = (line.get(..column), line.get(column..=column)) else {
        return Err(ExtractError::not_found(
            format!("subshell column {column} of line {line_number}"),
            "atomic orbital labels",
        ));
    };

    let orbital = if subshell == "S" {
        "0".to_owned()
    } else {
        line.get(column + 1..(column + 3).min(line.len()))
            .unwrap_or_default()
            .trim()
            .to_owned()
    };

    let fields: Vec<&str> = prefix.split_whitespace().skip(1).collect();
    AoLabel::from_prefix(&fields, subshell.to_owned(), orbital, previous, line_number, line)
}

#[cfg(test)]
mod tests {
    use super::parse_label;

    #[test]
    fn labels_strip_atom_suffixes() {
        let first = parse_label("    1   1 O-1   1S      0.99", 17, None, 1).unwrap();
        assert_eq!(first.atom_index, 1);
        assert_eq!(first.atom_type, "O");
        assert_eq!((first.subshell.as_str(), first.orbital.as_str()), ("S", "0"));

        let p = parse_label("    3           2PX     0.00", 17, Some(&first), 3).unwrap();
        assert_eq!((p.principal, p.subshell.as_str(), p.orbital.as_str()), (2, "P", "X"));
        assert_eq!(p.atom_index, 1);
    }
}
