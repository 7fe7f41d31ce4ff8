use super::{header_range, read_eigenvalues, AoLabel, Population, PopulationContext, Spin};
use crate::{
    basic::BasicInfo,
    dialect::{Layout, ScfVariant},
    electron::{ElectronBlock, OrbitalMatrix},
    error::{ExtractError, Result},
    matrix::{decode_matrix, decode_triangular, ops},
    options::iop,
    reader::Job,
};

/// Cartesian components Gaussian prints in place of a D subshell letter.
const CARTESIAN_D: [&str; 6] = ["XX", "YY", "ZZ", "XY", "XZ", "YZ"];
/// Cartesian components Gaussian prints in place of an F subshell letter.
const CARTESIAN_F: [&str; 10] = [
    "XXX", "YYY", "ZZZ", "XYY", "XXY", "XXZ", "XZZ", "YZZ", "YYZ", "XYZ",
];

pub(super) fn extract(job: &Job, context: &PopulationContext<'_>) -> Result<Option<Population>> {
    if !iop(job, 3, 33)?.is_some_and(|level| level >= 1) {
        return Ok(None);
    }
    let PopulationContext {
        basic, layout, cas, ..
    } = *context;

    let headers = job
        .index()
        .require(layout.eigenvalue_keyword, "MO coefficients")?;
    let cycles = layout.cycles(basic.n_mo);

    let labels = ao_labels(job, basic, headers[0] + layout.coefficient_offset)?;
    let overlap = overlap(job, basic, layout)?;

    let alpha_coefficients = coefficients(job, basic, layout, headers[0])?;
    let alpha_eigenvalues = read_eigenvalues(
        job,
        header_range(&headers, 0, cycles, layout.eigenvalue_keyword)?,
        basic.n_mo,
        layout,
    )?;

    let beta = match basic.variant {
        ScfVariant::Uhf => {
            let beta_headers = &headers[cycles.min(headers.len())..];
            let first = *beta_headers.first().ok_or_else(|| {
                ExtractError::count_mismatch("`Eigenvalues` lines for the beta orbitals", cycles, 0)
            })?;
            Some(ElectronBlock::new(
                coefficients(job, basic, layout, first)?,
                read_eigenvalues(job, beta_headers, basic.n_mo, layout)?,
                density(job, basic, layout, Spin::Beta, cas)?,
                &overlap,
            )?)
        }
        // restricted-open CAS prints one set of orbitals with separate spin densities
        ScfVariant::Rohf if cas => Some(ElectronBlock::new(
            alpha_coefficients.clone(),
            alpha_eigenvalues.clone(),
            density(job, basic, layout, Spin::Beta, cas)?,
            &overlap,
        )?),
        _ => None,
    };

    let alpha = ElectronBlock::new(
        alpha_coefficients,
        alpha_eigenvalues,
        density(job, basic, layout, Spin::Alpha, cas)?,
        &overlap,
    )?;

    Population::new(labels, overlap, alpha, beta).map(Some)
}

/// AO labels printed in front of the first coefficient block.
fn ao_labels(job: &Job, basic: &BasicInfo, start: usize) -> Result<Vec<AoLabel>> {
    let first = job.line(start, "atomic orbital labels")?;
    let column = first
        .rfind('S')
        .ok_or_else(|| {
            ExtractError::not_found("S", "subshell column of the atomic orbital labels")
        })?;

    // GHF prints a real and an imaginary row per label
    let step = basic.variant.spin_factor();
    let mut labels: Vec<AoLabel> = Vec::with_capacity(basic.n_ao);

    for row in 0..basic.n_ao {
        let line_number = start + row * step;
        let line = job.line(line_number, "atomic orbital labels")?;
        let label = parse_label(line, column, labels.last(), line_number)?;
        labels.push(label);
    }

    Ok(labels)
}

fn parse_label(
    line: &str,
    column: usize,
    previous: Option<&AoLabel>,
    line_number: usize,
) -> Result<AoLabel> {
    let (prefix, rest) = match (line.get(..column), line.get(column..)) {
        (Some(prefix), Some(rest)) if !rest.is_empty() => (prefix, rest),
        _ => {
            return Err(ExtractError::not_found(
                format!("subshell column {column} of line {line_number}"),
                "atomic orbital labels",
            ))
        }
    };

    let raw = rest.get(..rest.len().min(3)).unwrap_or(rest).trim();
    let letter = raw.get(..1).filter(|letter| !letter.trim().is_empty()).ok_or_else(|| {
        ExtractError::not_found(format!("subshell on line {line_number}"), "atomic orbital labels")
    })?;

    let (subshell, orbital) = if CARTESIAN_D.contains(&raw) {
        ("D".to_owned(), format!("D{raw}"))
    } else if CARTESIAN_F.contains(&raw) {
        ("F".to_owned(), format!("F{raw}"))
    } else {
        (letter.to_owned(), raw.replace(" 0", "0"))
    };

    let fields: Vec<&str> = prefix.split_whitespace().skip(1).collect();
    AoLabel::from_prefix(&fields, subshell, orbital, previous, line_number, line)
}

fn overlap(job: &Job, basic: &BasicInfo, layout: &Layout) -> Result<OrbitalMatrix> {
    let start = job.index().require_first("Overlap", "overlap matrix")? + 2;
    let overlap = decode_triangular(job.lines(), start, basic.n_basis, &layout.triangular)?.value;

    Ok(if basic.variant.is_complex() {
        OrbitalMatrix::Complex(ops::kron_identity2(&overlap))
    } else {
        OrbitalMatrix::Real(overlap)
    })
}

/// The coefficient blocks following the eigenvalue header at `header`.
fn coefficients(
    job: &Job,
    basic: &BasicInfo,
    layout: &Layout,
    header: usize,
) -> Result<OrbitalMatrix> {
    let rows = basic.n_ao * basic.variant.spin_factor();
    let printed = decode_matrix(
        job.lines(),
        header + layout.coefficient_offset,
        rows,
        basic.n_mo,
        &layout.coefficients,
    )?
    .value;

    if basic.variant.is_complex() {
        let real = ops::alternate_rows(&printed, 0);
        let imaginary = ops::alternate_rows(&printed, 1);
        Ok(OrbitalMatrix::Complex(ops::combine_complex(&real, &imaginary)?))
    } else {
        Ok(OrbitalMatrix::Real(printed))
    }
}

/// The last printed density matrix of a spin, if the job printed one.
fn density(
    job: &Job,
    basic: &BasicInfo,
    layout: &Layout,
    spin: Spin,
    cas: bool,
) -> Result<Option<OrbitalMatrix>> {
    let index = job.index();

    if basic.variant.is_complex() {
        let Some(&[real, imaginary, ..]) = index.find("Density matrix").as_deref() else {
            return Ok(None);
        };
        let triangle = |line_number: usize| {
            decode_triangular(job.lines(), line_number + 2, basic.n_mo, &layout.triangular)
        };
        let real = triangle(real)?.value;
        let imaginary = triangle(imaginary)?.value;
        return Ok(Some(OrbitalMatrix::Complex(ops::combine_complex(&real, &imaginary)?)));
    }

    let keyword = match spin {
        Spin::Beta => "Beta Density Matrix",
        Spin::Alpha
            if basic.variant == ScfVariant::Rhf || (basic.variant == ScfVariant::Rohf && cas) =>
        {
            "Density Matrix"
        }
        Spin::Alpha => "Alpha Density Matrix",
    };
    // `Density Matrix` would also match the spin densities printed after it
    let last = index.find(keyword).and_then(|lines| {
        lines.into_iter().rev().find(|&line_number| {
            job.lines()
                .get(line_number - 1)
                .is_some_and(|line| line.trim_start().starts_with(keyword))
        })
    });
    let Some(last) = last else {
        log::debug!("no `{keyword}` printed");
        return Ok(None);
    };

    let density =
        decode_triangular(job.lines(), last + 2, basic.n_mo, &layout.labelled_triangular)?.value;
    Ok(Some(OrbitalMatrix::Real(density)))
}
