use super::BasicInfo;
use crate::{
    dialect::ScfVariant,
    error::{ExtractError, Result},
    fields,
    reader::Job,
};

pub(super) fn extract(job: &Job) -> Result<BasicInfo> {
    let atoms = atoms(job)?;
    let variant = scf_variant(job)?;

    let n_basis = count(job, "NBasis")?;
    let n_primitive = count(job, "NPrimitive")?;
    let n_electron = count(job, "Total Electrons")?;

    let n_alpha = if variant == ScfVariant::Ghf {
        n_electron / 2
    } else {
        count_orbital_energies(job, "Eigenenergies (Alpha)")?
    };
    let n_beta = match variant {
        ScfVariant::Rhf | ScfVariant::Ghf => n_alpha,
        ScfVariant::Rohf | ScfVariant::Uhf => count_orbital_energies(job, "Eigenenergies (Beta)")?,
    };

    Ok(BasicInfo::new(
        atoms,
        variant,
        n_basis,
        n_primitive,
        n_alpha,
        n_beta,
        n_electron,
    ))
}

/// Atom symbols of the upper-cased geometry echo, up to the first blank line.
fn atoms(job: &Job) -> Result<Vec<String>> {
    let start = job.index().require_first("GEOM:", "atom list")? + 1;

    Ok(job.lines()[start - 1..]
        .iter()
        .map_while(|line| line.split_whitespace().next())
        .map(str::to_uppercase)
        .collect())
}

fn scf_variant(job: &Job) -> Result<ScfVariant> {
    let line_number = job.index().require_first("REFERENCE", "SCF type")?;
    let line = job.line(line_number, "SCF type")?;

    let position = if line.contains("COMPLEX") || line.contains("REAL") {
        3
    } else {
        2
    };
    let indicator = fields::field(line, position, line_number, "SCF type")?;

    ScfVariant::from_indicator(indicator).ok_or_else(|| ExtractError::UnsupportedScf {
        indicator: indicator.to_owned(),
    })
}

fn count(job: &Job, keyword: &str) -> Result<usize> {
    let line_number = job.index().require_first(keyword, "basic counts")?;
    fields::number_after(job.line(line_number, "basic counts")?, keyword, line_number)
}

/// Number of occupied orbital energies printed three lines below `phrase`.
fn count_orbital_energies(job: &Job, phrase: &str) -> Result<usize> {
    let start = job.index().require_first(phrase, "electron counts")? + 3;
    job.line(start, "electron counts")?;

    Ok(job.lines()[start - 1..]
        .iter()
        .take_while(|line| !line.trim().is_empty())
        .map(|line| line.split_whitespace().count())
        .sum())
}

#[cfg(test)]
mod tests {
    use super::extract;
    use crate::{
        dialect::{Dialect, ScfVariant},
        error::ExtractError,
        reader::{segment, Job},
    };

    fn job(text: &str) -> Job {
        segment(text, Dialect::Chronus).remove(0)
    }

    const WATER_UHF: &str = "\
 Input File:
 ===========
 [Molecule]
 charge = 1
 geom:
   o   0.0   0.0   0.0
   h   0.0   0.76  0.59
   h   0.0  -0.76  0.59

 [QM]
 reference = uhf
 ===========
  NBasis            = 7
  NPrimitive        = 21
  Total Electrons   = 9

  Orbital Eigenenergies (Alpha) / Eh
  ---------------------------------
  Occupied
  -20.2  -1.4  -0.7
  -0.6  -0.5

  Orbital Eigenenergies (Beta) / Eh
  ---------------------------------
  Occupied
  -20.1  -1.3  -0.6
  -0.5

 ChronusQ Job Ended
 ChronusQ Job Ended
";

    #[test]
    fn unrestricted_counts_come_from_eigenenergy_blocks() {
        let basic = extract(&job(WATER_UHF)).unwrap();

        assert_eq!(basic.atoms, vec!["O", "H", "H"]);
        assert_eq!(basic.variant, ScfVariant::Uhf);
        assert_eq!((basic.n_basis, basic.n_primitive, basic.n_electron), (7, 21, 9));
        assert_eq!((basic.n_alpha, basic.n_beta), (5, 4));
        assert_eq!((basic.homo, basic.lumo), (9, 10));
    }

    #[test]
    fn complex_references_shift_the_indicator() {
        let text = WATER_UHF
            .replace("reference = uhf", "reference = complex ghf")
            .replace("= 9", "= 10");
        let basic = extract(&job(&text)).unwrap();

        assert_eq!(basic.variant, ScfVariant::Ghf);
        assert_eq!((basic.n_alpha, basic.n_beta), (5, 5));
        assert_eq!(basic.n_mo, 14);
    }

    #[test]
    fn unknown_references_are_rejected() {
        let text = WATER_UHF.replace("reference = uhf", "reference = ks");

        assert!(matches!(
            extract(&job(&text)),
            Err(ExtractError::UnsupportedScf { .. })
        ));
    }
}
