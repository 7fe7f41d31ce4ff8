//! Complete-active-space (CAS) transitions.

use nalgebra::DVector;

use super::{
    expected_excitation_count, state_pairs, ActiveSpace, CasInfo, ExcitationRecord, ExcitationSet,
    Method, HARTREE_TO_EV,
};
use crate::{
    basic::BasicInfo,
    dialect::Dialect,
    error::{ExtractError, Result},
    fields,
    matrix::{decode_matrix, BlockSpec, PrefixAnchor},
    options::{chronus_integer, IopTable},
    reader::Job,
};

/// Rows of a Gaussian 1PDM diagonal.
const GAUSSIAN_DIAGONAL: BlockSpec = BlockSpec {
    columns: 1,
    block_skip: 0,
    anchor: PrefixAnchor::First('1'),
    offset: 2,
    exponent_marker: Some('D'),
};

/// Field holding the state energy on a Gaussian `Energy (Hartree)` line.
const GAUSSIAN_ENERGY_FIELD: usize = 4;
/// Field holding the strength on a Gaussian `Oscillator Strength For States` line.
const GAUSSIAN_OSCILLATOR_FIELD: usize = 8;
/// Fields of a ChronusQ `E(Eh)` transition line.
const CHRONUS_ENERGY_FIELD: usize = 8;
const CHRONUS_OSCILLATOR_FIELD: usize = 11;

/// Root counts above this are packed as `<roots><last four digits>` when
/// IOp(9/13) = 1.
const PACKED_ROOTS: i64 = 9999;

/// Whether the job ran a CAS calculation with transitions to report.
pub(super) fn requested(job: &Job) -> Result<bool> {
    Ok(match job.dialect() {
        Dialect::Gaussian => IopTable::locate(job, 9)?.is_some_and(|table| table.get(6).is_some()),
        Dialect::Chronus => {
            job.index().find("MCSCF").is_some()
                && chronus_integer(job, "OSCISTREN")?.is_some_and(|states| states >= 1)
        }
    })
}

pub(super) fn gaussian(job: &Job, basic: &BasicInfo) -> Result<Option<ExcitationSet>> {
    let Some(table) = IopTable::locate(job, 9)? else {
        return Ok(None);
    };
    let Some(n_active_electron) = table.get(6) else {
        return Ok(None);
    };
    let required = |option: u32| {
        table
            .get(option)
            .ok_or_else(|| ExtractError::not_found(format!("IOp(9/{option})"), "CAS calculation"))
    };

    let n_active_mo = count(required(7)?, "IOp(9/7)")?;
    let de_min = required(13)?;
    let mut n_root = required(17)?;
    let n_ground_state = count(table.get(19).unwrap_or(1), "IOp(9/19)")?;

    let ndet_line = job.index().require_first("NDet=", "Slater determinant count")?;
    let n_slater_determinant: usize =
        fields::number_after(job.line(ndet_line, "Slater determinant count")?, "NDet=", ndet_line)?;

    let mut final_state_full = n_slater_determinant;
    if de_min == 1 {
        n_root = unpack_roots(n_root);
        final_state_full = count(n_root, "IOp(9/17)")?;
    }
    let n_root = count(n_root, "IOp(9/17)")?;
    let n_excitation_full = expected_excitation_count(final_state_full, n_ground_state);

    let diagonal_lines = counted(job, "diagonals of 1PDM for State:", n_root)?;
    let energy_lines = counted(job, "Energy (Hartree)", n_root)?;
    let oscillator_lines = counted(job, "Oscillator Strength For States", n_excitation_full)?;

    let diagonals = diagonal_lines
        .iter()
        .map(|&line_number| {
            Ok(decode_matrix(job.lines(), line_number + 2, n_active_mo, 1, &GAUSSIAN_DIAGONAL)?
                .value
                .column(0)
                .into_owned())
        })
        .collect::<Result<Vec<DVector<f64>>>>()?;
    let energies = energy_lines
        .iter()
        .map(|&line_number| {
            let line = job.line(line_number, "CAS state energy")?;
            let aspect = "CAS state energy";
            fields::number_field::<f64>(line, GAUSSIAN_ENERGY_FIELD, line_number, aspect)
        })
        .collect::<Result<Vec<_>>>()?;

    let records = state_pairs(n_ground_state, n_root)
        .enumerate()
        .map(|(k, (ground, excited))| {
            let line_number = *oscillator_lines.get(k).ok_or_else(|| {
                let found = oscillator_lines.len();
                ExtractError::count_mismatch("oscillator strengths at least", k + 1, found)
            })?;
            let line = job.line(line_number, "CAS oscillator strength")?;
            Ok(ExcitationRecord {
                ground_state: ground,
                excited_state: excited,
                energy: (energies[excited - 1] - energies[ground - 1]) * HARTREE_TO_EV,
                oscillator_strength: fields::number_field(
                    line,
                    GAUSSIAN_OSCILLATOR_FIELD,
                    line_number,
                    "CAS oscillator strength",
                )?,
                rotatory_strength: None,
                delta_diagonal: &diagonals[excited - 1] - &diagonals[ground - 1],
                beta_delta_diagonal: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let method = Method::Cas(CasInfo {
        n_root,
        n_excitation_full,
        n_slater_determinant: Some(n_slater_determinant),
        switched_orbitals: switched_orbitals(job),
    });
    let active_space = ActiveSpace {
        start: basic.homo as i64 - n_active_electron,
        n_mo: n_active_mo,
        n_electron: count(n_active_electron, "IOp(9/6)")?,
    };
    ExcitationSet::new(method, n_ground_state, n_root, active_space, records).map(Some)
}

/// Decode a root count packed as leading digits followed by four more.
fn unpack_roots(n_root: i64) -> i64 {
    if n_root > PACKED_ROOTS {
        n_root / 10_000 + n_root % 10_000
    } else {
        n_root
    }
}

/// Orbital pairs listed between the `orbitals` header and the CAS output,
/// if the job swapped any.
fn switched_orbitals(job: &Job) -> Option<Vec<(usize, usize)>> {
    let index = job.index();
    let start = index.first("orbitals")? + 1;
    let end = index.first("MCSCF")?.checked_sub(4)?;
    if end < start {
        return None;
    }

    let pairs = job.lines().get(start - 1..end - 1)?.iter().map(|line| {
        let mut tokens = line
            .split_whitespace()
            .map(|token| token.parse::<usize>().ok()?.checked_sub(1));
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(Some(first)), Some(Some(second)), None) => Some((first, second)),
            _ => None,
        }
    });
    let pairs = pairs.collect::<Option<Vec<_>>>();
    if pairs.is_none() {
        log::debug!(
            "lines {start}..{end} do not list orbital pairs, assuming nothing was switched"
        );
    }
    pairs
}

pub(super) fn chronus(job: &Job, basic: &BasicInfo) -> Result<Option<ExcitationSet>> {
    if job.index().find("MCSCF").is_none() {
        return Ok(None);
    }
    let n_ground_state = chronus_integer(job, "OSCISTREN")?.filter(|&states| states >= 1);
    let Some(n_ground_state) = n_ground_state else {
        return Ok(None);
    };
    let n_ground_state = count(n_ground_state, "OSCISTREN")?;

    let required = |key: &str| -> Result<usize> {
        let value = chronus_integer(job, key)?
            .ok_or_else(|| ExtractError::not_found(key, "CAS calculation"))?;
        count(value, key)
    };
    let n_active_electron = required("NACTE")?;
    let n_active_mo = required("NACTO")?;
    let n_root = required("NROOTS")?;
    let n_excitation_full = expected_excitation_count(n_root, n_ground_state);

    counted(job, &format!("State {n_root}:"), 1)?;
    let first = job.index().require_first("State 1:", "CAS state diagonals")?;
    let second = job.index().require_first("State 2:", "CAS state diagonals")?;
    let lines_per_state = second.checked_sub(first).filter(|&lines| lines > 0).ok_or_else(|| {
        ExtractError::count_mismatch("lines at least between the diagonals of states 1 and 2", 1, 0)
    })?;

    let diagonals = (0..n_root)
        .map(|state| {
            let start = first + state * lines_per_state;
            chronus_diagonal(job, start, lines_per_state, n_active_mo)
        })
        .collect::<Result<Vec<_>>>()?;
    let transition_lines = counted(job, "E(Eh)", n_excitation_full)?;

    let records = state_pairs(n_ground_state, n_root)
        .zip(transition_lines)
        .map(|((ground, excited), line_number)| {
            let line = job.line(line_number, "CAS transition")?;
            let energy: f64 =
                fields::number_field(line, CHRONUS_ENERGY_FIELD, line_number, "CAS transition")?;
            Ok(ExcitationRecord {
                ground_state: ground,
                excited_state: excited,
                energy: energy * HARTREE_TO_EV,
                oscillator_strength: fields::number_field(
                    line,
                    CHRONUS_OSCILLATOR_FIELD,
                    line_number,
                    "CAS transition",
                )?,
                rotatory_strength: None,
                delta_diagonal: &diagonals[excited - 1] - &diagonals[ground - 1],
                beta_delta_diagonal: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let method = Method::Cas(CasInfo {
        n_root,
        n_excitation_full,
        n_slater_determinant: None,
        switched_orbitals: None,
    });
    let active_space = ActiveSpace {
        start: basic.homo as i64 - n_active_electron as i64,
        n_mo: n_active_mo,
        n_electron: n_active_electron,
    };
    ExcitationSet::new(method, n_ground_state, n_root, active_space, records).map(Some)
}

/// Occupations of one state, printed as `(orbital) occupation` pairs over
/// `n_lines` lines, the first of which starts with `State k:`.
fn chronus_diagonal(
    job: &Job,
    start: usize,
    n_lines: usize,
    n_active_mo: usize,
) -> Result<DVector<f64>> {
    let mut occupations = Vec::with_capacity(n_active_mo);

    for line_number in start..start + n_lines {
        let line = job.line(line_number, "CAS state diagonal")?;
        let cleaned = line.replace('(', " ").replace(')', "");
        let tokens: Vec<&str> = cleaned.split_whitespace().collect();
        let first = if tokens.contains(&"State") { 3 } else { 1 };

        for token in tokens.iter().skip(first).step_by(2) {
            occupations.push(fields::number::<f64>(token, line_number, line)?);
        }
    }

    if occupations.len() != n_active_mo {
        return Err(ExtractError::count_mismatch(
            format!("occupations in the state diagonal starting on line {start}"),
            n_active_mo,
            occupations.len(),
        ));
    }
    Ok(DVector::from_vec(occupations))
}

/// Lines matching `phrase`, which must occur exactly `expected` times.
fn counted(job: &Job, phrase: &str, expected: usize) -> Result<Vec<usize>> {
    let lines = job.index().find(phrase).unwrap_or_default();
    if lines.len() != expected {
        let what = format!("`{phrase}` lines");
        return Err(ExtractError::count_mismatch(what, expected, lines.len()));
    }
    Ok(lines)
}

fn count(value: i64, source: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        ExtractError::InvalidArgument(format!("{source} must not be negative, got {value}"))
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{chronus, gaussian, requested, unpack_roots};
    use crate::{
        basic::BasicInfo,
        dialect::{Dialect, ScfVariant},
        error::ExtractError,
        excitation::{Method, HARTREE_TO_EV},
        reader::{segment, Job},
    };

    fn h4() -> BasicInfo {
        BasicInfo::new(vec!["H".to_owned(); 4], ScfVariant::Rhf, 4, 12, 2, 2, 4)
    }

    const GAUSSIAN_CAS: &str = "\
 ----------------------------------
 #p cas(4,4,nroots=3) sto-3g
 ----------------------------------
 1/38=1/1;
 9/6=4,7=4,13=1,17=3/14;
 NDet=      36 NCSF=      20
 Pairs of Alpha orbitals switched:
     2    3
 Orbital symmetries are not used.
 ------------------------------
 Initial guess from CI.
 ------------------------------
 Enter MCSCF program.
 MCSCF converged.
 State   1  Energy (Hartree):   -1.10000000
 diagonals of 1PDM for State:   1
                 1
      1  0.190000D+01
      2  0.190000D+01
      3  0.100000D+00
      4  0.100000D+00
 State   2  Energy (Hartree):   -0.90000000
 diagonals of 1PDM for State:   2
                 1
      1  0.190000D+01
      2  0.100000D+01
      3  0.100000D+01
      4  0.100000D+00
 State   3  Energy (Hartree):   -0.80000000
 diagonals of 1PDM for State:   3
                 1
      1  0.100000D+01
      2  0.190000D+01
      3  0.100000D+01
      4  0.100000D+00
 Oscillator Strength For States   1 :   2   f=   0.01234567
 Oscillator Strength For States   1 :   3   f=   0.20000000
 Normal termination of Gaussian 16
";

    fn job(text: &str, dialect: Dialect) -> Job {
        segment(text, dialect).remove(0)
    }

    #[test]
    fn packed_root_counts() {
        assert_eq!(unpack_roots(8), 8);
        assert_eq!(unpack_roots(9999), 9999);
        assert_eq!(unpack_roots(30004), 7);
        assert_eq!(unpack_roots(120010), 22);
    }

    #[test]
    fn gaussian_states_differ_from_the_ground_state() {
        let set = gaussian(&job(GAUSSIAN_CAS, Dialect::Gaussian), &h4()).unwrap().unwrap();

        let Method::Cas(info) = set.method() else {
            panic!("expected a CAS set");
        };
        assert_eq!((info.n_root, info.n_excitation_full), (3, 2));
        assert_eq!(info.n_slater_determinant, Some(36));
        assert_eq!(info.switched_orbitals, Some(vec![(1, 2)]));

        let window = set.active_space();
        assert_eq!((window.start, window.end(), window.n_electron), (-2, 2, 4));

        let records = set.records();
        assert_eq!(records.len(), 2);
        assert_eq!((records[1].ground_state, records[1].excited_state), (1, 3));
        assert_relative_eq!(records[0].energy, 0.2 * HARTREE_TO_EV, epsilon = 1e-9);
        assert_relative_eq!(records[0].oscillator_strength, 0.01234567);
        assert_relative_eq!(
            records[0].delta_diagonal.as_slice(),
            [0.0, -0.9, 0.9, 0.0].as_slice(),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            records[1].delta_diagonal.as_slice(),
            [-0.9, 0.0, 0.9, 0.0].as_slice(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn gaussian_state_counts_must_agree() {
        let missing = GAUSSIAN_CAS.replace(" State   3  Energy (Hartree):   -0.80000000\n", "");

        assert!(matches!(
            gaussian(&job(&missing, Dialect::Gaussian), &h4()),
            Err(ExtractError::CountMismatch { expected: 3, found: 2, .. })
        ));
    }

    #[test]
    fn gaussian_without_active_space_is_not_cas() {
        let text = GAUSSIAN_CAS.replace("9/6=4,7=4,13=1,17=3/14;", "9/41=3,42=1/14;");

        assert!(gaussian(&job(&text, Dialect::Gaussian), &h4()).unwrap().is_none());
    }

    #[test]
    fn cas_jobs_are_recognised_from_their_options() {
        assert!(requested(&job(GAUSSIAN_CAS, Dialect::Gaussian)).unwrap());
        let td = GAUSSIAN_CAS.replace("9/6=4,7=4,13=1,17=3/14;", "9/41=3,42=1/14;");
        assert!(!requested(&job(&td, Dialect::Gaussian)).unwrap());

        assert!(requested(&job(CHRONUS_CAS, Dialect::Chronus)).unwrap());
        let text = CHRONUS_CAS.replace("oscistren = 1", "oscistren = 0");
        assert!(!requested(&job(&text, Dialect::Chronus)).unwrap());
    }

    const CHRONUS_CAS: &str = "\
 Input File:
 ===========
 [MCSCF]
 nacte = 2
 nacto = 2
 nroots = 3
 oscistren = 1
 ===========
  MCSCF Results:
  State 1: (1) 1.90000 (2) 0.10000
  State 2: (1) 1.00000 (2) 1.00000
  State 3: (1) 0.10000 (2) 1.90000
  Excitation 1 -> 2 : dE E(Eh) = 0.15000000 f = 0.01230000
  Excitation 1 -> 3 : dE E(Eh) = 0.30000000 f = 0.04560000
 ChronusQ Job Ended
 ChronusQ Job Ended
";

    #[test]
    fn chronus_transitions_read_their_own_lines() {
        let set = chronus(&job(CHRONUS_CAS, Dialect::Chronus), &h4()).unwrap().unwrap();

        assert_eq!(set.n_ground_state(), 1);
        assert_eq!(set.final_state(), 3);
        assert_eq!(set.active_space().start, 0);

        let records = set.records();
        assert_eq!(records.len(), 2);
        assert_relative_eq!(records[1].energy, 0.3 * HARTREE_TO_EV, epsilon = 1e-9);
        assert_relative_eq!(records[1].oscillator_strength, 0.0456);
        assert_relative_eq!(
            records[0].delta_diagonal.as_slice(),
            [-0.9, 0.9].as_slice(),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            records[1].delta_diagonal.as_slice(),
            [-1.8, 1.8].as_slice(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn chronus_without_oscillator_strengths_is_not_cas() {
        let text = CHRONUS_CAS.replace("oscistren = 1", "oscistren = 0");
        assert!(chronus(&job(&text, Dialect::Chronus), &h4()).unwrap().is_none());

        let text = CHRONUS_CAS
            .replace("  Excitation 1 -> 3 : dE E(Eh) = 0.30000000 f = 0.04560000\n", "");
        assert!(matches!(
            chronus(&job(&text, Dialect::Chronus), &h4()),
            Err(ExtractError::CountMismatch { .. })
        ));
    }
}
