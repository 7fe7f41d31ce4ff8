use super::BasicInfo;
use crate::{
    dialect::ScfVariant,
    error::{ExtractError, Result},
    fields,
    options::{iop, IopTable},
    reader::Job,
};

/// IOp(3/116) value asking to look at the `SCF Done` label instead.
const SCF_FROM_ENERGY_LABEL: i64 = -2;

pub(super) fn extract(job: &Job) -> Result<BasicInfo> {
    let atoms = atoms(job)?;
    let variant = scf_variant(job)?;

    let index = job.index();
    let alpha_line = index.require_first("alpha electrons", "electron counts")?;
    let electrons = job.line(alpha_line, "electron counts")?;
    let n_alpha = fields::number_before(electrons, "alpha", alpha_line)?;
    let n_beta = fields::number_before(electrons, "beta", alpha_line)?;

    let basis_line = alpha_line - 1;
    let basis = job.line(basis_line, "basis function counts")?;
    let n_basis = fields::number_before(basis, "basis", basis_line)?;
    let n_primitive = fields::number_before(basis, "primitive", basis_line)?;

    Ok(BasicInfo::new(
        atoms,
        variant,
        n_basis,
        n_primitive,
        n_alpha,
        n_beta,
        n_alpha + n_beta,
    ))
}

fn atoms(job: &Job) -> Result<Vec<String>> {
    let index = job.index();
    let mut start = index.require_first("Symbolic Z-matrix", "atom list")? + 2;

    let n_atoms_line = index.require_first("NAtoms", "atom count")?;
    let n_atoms: usize =
        fields::number_field(job.line(n_atoms_line, "atom count")?, 1, n_atoms_line, "atom count")?;

    // read-in geometries have no charge line and separate fields by commas
    let read_in = matches!(iop(job, 1, 29)?, Some(6 | 7));
    if read_in {
        start -= 1;
    }

    (start..start + n_atoms)
        .map(|line_number| {
            let line = job.line(line_number, "atom list")?;
            let symbol = if read_in {
                line.split([',', ' ', '\t']).find(|field| !field.is_empty())
            } else {
                line.split_whitespace().next()
            };
            symbol.map(str::to_owned).ok_or_else(|| {
                ExtractError::not_found(format!("atom on line {line_number}"), "atom list")
            })
        })
        .collect()
}

fn scf_variant(job: &Job) -> Result<ScfVariant> {
    let Some(code) = IopTable::locate(job, 3)?.and_then(|overlay| overlay.get(116)) else {
        log::debug!("no IOp(3/116), assuming RHF");
        return Ok(ScfVariant::Rhf);
    };

    if code == SCF_FROM_ENERGY_LABEL {
        let line_number = job.index().require_first("SCF Done", "SCF type")?;
        let line = job.line(line_number, "SCF type")?;
        // E(RB3LYP) or E(UHF)
        let label = fields::field(line, 2, line_number, "SCF type")?;
        let indicator = label.get(2..).unwrap_or_default();

        return ScfVariant::from_indicator(indicator).ok_or_else(|| ExtractError::UnsupportedScf {
            indicator: label.to_owned(),
        });
    }

    ScfVariant::from_iop(code).ok_or_else(|| ExtractError::UnsupportedScf {
        indicator: format!("IOp(3/116)={code}"),
    })
}
