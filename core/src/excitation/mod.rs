//! Electronic excitations: TD (linear response) and CAS transitions.
//!
//! Each record describes a transition between two states with its energy,
//! oscillator strength and the change of orbital occupations it causes.

mod cas;
mod td;

use nalgebra::DVector;
use serde::Serialize;

use crate::{
    basic::BasicInfo,
    dialect::{Dialect, Layout},
    error::{ExtractError, Result},
    fields,
    reader::Job,
};

/// Hartree to electronvolt.
pub const HARTREE_TO_EV: f64 = 27.2114;

/// Velocity and length gauge rotatory strengths of a transition.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct RotatoryStrength {
    pub velocity: f64,
    pub length: f64,
}

/// One transition between a ground (reference) state and an excited state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExcitationRecord {
    /// 1-based index of the reference state
    pub ground_state: usize,
    /// 1-based index of the excited state
    pub excited_state: usize,
    /// transition energy in eV
    pub energy: f64,
    pub oscillator_strength: f64,
    pub rotatory_strength: Option<RotatoryStrength>,
    /// occupation change per orbital of the active space
    pub delta_diagonal: DVector<f64>,
    /// occupation change of the beta orbitals, for unrestricted TD
    pub beta_delta_diagonal: Option<DVector<f64>>,
}

/// CAS metadata that TD calculations do not have.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CasInfo {
    pub n_root: usize,
    /// transitions between every ground state and every determinant-space state
    pub n_excitation_full: usize,
    pub n_slater_determinant: Option<usize>,
    /// 0-based orbital pairs swapped before the CAS calculation
    pub switched_orbitals: Option<Vec<(usize, usize)>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Method {
    Td,
    Cas(CasInfo),
}

/// The orbital window the delta diagonals are reported over.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActiveSpace {
    /// 0-based first orbital; CAS windows may start below zero when more
    /// electrons are active than there are occupied orbitals
    pub start: i64,
    pub n_mo: usize,
    pub n_electron: usize,
}

impl ActiveSpace {
    /// One past the last orbital of the window.
    pub fn end(&self) -> i64 {
        self.start + self.n_mo as i64
    }
}

/// All excitations of one job.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExcitationSet {
    method: Method,
    n_ground_state: usize,
    final_state: usize,
    active_space: ActiveSpace,
    records: Vec<ExcitationRecord>,
}

impl ExcitationSet {
    /// Assemble a set, checking the record count against the state counts.
    pub fn new(
        method: Method,
        n_ground_state: usize,
        final_state: usize,
        active_space: ActiveSpace,
        records: Vec<ExcitationRecord>,
    ) -> Result<Self> {
        let expected = expected_excitation_count(final_state, n_ground_state);
        if records.len() != expected {
            return Err(ExtractError::count_mismatch(
                format!(
                    "excitations between {n_ground_state} ground states and {final_state} states"
                ),
                expected,
                records.len(),
            ));
        }
        let mismatched = records
            .iter()
            .find(|record| record.delta_diagonal.len() != active_space.n_mo);
        if let Some(record) = mismatched {
            return Err(ExtractError::count_mismatch(
                format!(
                    "delta diagonal entries for the {} -> {} excitation",
                    record.ground_state, record.excited_state
                ),
                active_space.n_mo,
                record.delta_diagonal.len(),
            ));
        }

        Ok(Self {
            method,
            n_ground_state,
            final_state,
            active_space,
            records,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn is_cas(&self) -> bool {
        matches!(self.method, Method::Cas(_))
    }

    pub fn n_ground_state(&self) -> usize {
        self.n_ground_state
    }

    /// Highest state index, counting the ground states.
    pub fn final_state(&self) -> usize {
        self.final_state
    }

    pub fn n_excited_state(&self) -> usize {
        self.final_state.saturating_sub(self.n_ground_state)
    }

    pub fn active_space(&self) -> ActiveSpace {
        self.active_space
    }

    pub fn records(&self) -> &[ExcitationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Number of transitions from each of `n_ground_state` states to every
/// higher state up to `final_state`.
pub fn expected_excitation_count(final_state: usize, n_ground_state: usize) -> usize {
    (final_state * n_ground_state).saturating_sub(n_ground_state * (n_ground_state + 1) / 2)
}

/// `(ground, excited)` state pairs in printing order, 1-based.
pub fn state_pairs(
    n_ground_state: usize,
    final_state: usize,
) -> impl Iterator<Item = (usize, usize)> {
    (0..n_ground_state).flat_map(move |x| {
        (0..final_state.saturating_sub(x + 1)).map(move |y| (x + 1, x + y + 2))
    })
}

/// Extract the excitations of a job. TD output is looked for first, then CAS.
pub fn extract(job: &Job, basic: &BasicInfo, layout: &Layout) -> Result<Option<ExcitationSet>> {
    let set = match job.dialect() {
        Dialect::Gaussian => match td::gaussian(job, basic, layout)? {
            Some(set) => Some(set),
            None => cas::gaussian(job, basic)?,
        },
        Dialect::Chronus => match td::chronus(job, basic, layout)? {
            Some(set) => Some(set),
            None => cas::chronus(job, basic)?,
        },
    };

    if let Some(set) = &set {
        let window = set.active_space();
        log::debug!(
            "{} excitations ({}), {} ground states, final state {}, window [{}, {})",
            set.len(),
            if set.is_cas() { "CAS" } else { "TD" },
            set.n_ground_state,
            set.final_state,
            window.start,
            window.end()
        );
    }
    Ok(set)
}

/// Whether the job holds CAS transitions, decided without reading them.
///
/// Population analysis depends on this even when excitations are not
/// extracted.
pub fn is_cas(job: &Job) -> Result<bool> {
    Ok(!td::requested(job)? && cas::requested(job)?)
}

/// Occupation changes accumulated from `from -> to amplitude` lines.
struct Contributions {
    alpha: DVector<f64>,
    beta: DVector<f64>,
    /// whether any contribution named a beta orbital
    has_beta: bool,
}

impl Contributions {
    /// Read contribution lines from `start` until a line without an arrow.
    fn read(job: &Job, start: usize, n_mo: usize, layout: &Layout) -> Result<Self> {
        let mut contributions = Self {
            alpha: DVector::zeros(n_mo),
            beta: DVector::zeros(n_mo),
            has_beta: false,
        };

        let mut line_number = start;
        while let Some(line) = line_number
            .checked_sub(1)
            .and_then(|index| job.lines().get(index))
            .filter(|line| line.contains("->") || line.contains("<-"))
        {
            contributions.add(line, line_number, layout)?;
            line_number += 1;
        }
        log::trace!("{} contribution lines from line {start}", line_number - start);

        Ok(contributions)
    }

    fn add(&mut self, line: &str, line_number: usize, layout: &Layout) -> Result<()> {
        let normalized = line.replace("<-", "->").replace('>', "> ");
        let field = |n| fields::field(&normalized, n, line_number, "excitation contribution");

        let origin = field(0)?;
        let destination = field(2)?;
        let squared: f64 = if layout.variant.is_complex() {
            let re: f64 = fields::number(field(3)?, line_number, line)?;
            let im: f64 = fields::number(field(4)?, line_number, line)?;
            re * re + im * im
        } else {
            let amplitude: f64 = fields::number(field(3)?, line_number, line)?;
            amplitude * amplitude
        };
        let weight = layout.excitation_multiplier * squared;

        let beta = origin.contains('B');
        let origin = orbital_index(origin, line_number, line)?;
        let destination = orbital_index(destination, line_number, line)?;

        self.has_beta |= beta;
        let vector = if beta { &mut self.beta } else { &mut self.alpha };
        for index in [origin, destination] {
            if index >= vector.len() {
                return Err(ExtractError::count_mismatch(
                    format!("orbitals at least for the contribution on line {line_number}"),
                    index + 1,
                    vector.len(),
                ));
            }
        }
        vector[origin] -= weight;
        vector[destination] += weight;
        Ok(())
    }
}

/// 0-based orbital index of a printed `12A`, `12B` or `12` token.
fn orbital_index(token: &str, line_number: usize, line: &str) -> Result<usize> {
    let digits = token.trim_end_matches(['A', 'B']);
    fields::number::<usize>(digits, line_number, line)?
        .checked_sub(1)
        .ok_or_else(|| ExtractError::malformed(token, line_number, line))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    use super::{
        expected_excitation_count, orbital_index, state_pairs, ActiveSpace, Contributions,
        ExcitationRecord, ExcitationSet, Method,
    };
    use crate::{
        dialect::{Dialect, Layout, ScfVariant},
        error::ExtractError,
        reader::segment,
    };

    fn record(ground_state: usize, excited_state: usize) -> ExcitationRecord {
        ExcitationRecord {
            ground_state,
            excited_state,
            energy: 1.0,
            oscillator_strength: 0.0,
            rotatory_strength: None,
            delta_diagonal: DVector::zeros(4),
            beta_delta_diagonal: None,
        }
    }

    const WINDOW: ActiveSpace = ActiveSpace {
        start: 0,
        n_mo: 4,
        n_electron: 2,
    };

    #[test]
    fn two_ground_states_and_five_states() {
        assert_eq!(expected_excitation_count(5, 2), 7);
        assert_eq!(expected_excitation_count(4, 1), 3);
        assert_eq!(expected_excitation_count(0, 0), 0);

        let pairs: Vec<_> = state_pairs(2, 5).collect();
        assert_eq!(
            pairs,
            vec![(1, 2), (1, 3), (1, 4), (1, 5), (2, 3), (2, 4), (2, 5)]
        );
    }

    #[test]
    fn record_count_is_checked() {
        let seven: Vec<_> = state_pairs(2, 5).map(|(g, e)| record(g, e)).collect();
        let set = ExcitationSet::new(Method::Td, 2, 5, WINDOW, seven.clone()).unwrap();
        assert_eq!(set.len(), 7);
        assert_eq!(set.n_excited_state(), 3);
        assert_eq!(set.active_space().end(), 4);

        let six = seven[..6].to_vec();
        assert!(matches!(
            ExcitationSet::new(Method::Td, 2, 5, WINDOW, six),
            Err(ExtractError::CountMismatch {
                expected: 7,
                found: 6,
                ..
            })
        ));
    }

    #[test]
    fn delta_diagonals_must_span_the_window() {
        let mut short = record(1, 2);
        short.delta_diagonal = DVector::zeros(3);

        assert!(matches!(
            ExcitationSet::new(Method::Td, 1, 2, WINDOW, vec![short]),
            Err(ExtractError::CountMismatch { .. })
        ));
    }

    #[test]
    fn orbital_tokens_drop_spin_suffixes() {
        assert_eq!(orbital_index("12A", 1, "").unwrap(), 11);
        assert_eq!(orbital_index("3B", 1, "").unwrap(), 2);
        assert_eq!(orbital_index("1", 1, "").unwrap(), 0);
        assert!(orbital_index("0", 1, "").is_err());
        assert!(orbital_index("xA", 1, "").is_err());
    }

    #[test]
    fn restricted_contributions_double_the_weight() {
        let text = "\
 header
      2 -> 3         0.70000
      2 <- 3         0.10000
      1 ->4         -0.10000
 SavETr:  write IOETrn=   770
";
        let job = &segment(text, Dialect::Gaussian)[0];
        let layout = Layout::new(Dialect::Gaussian, ScfVariant::Rhf);
        let contributions = Contributions::read(job, 2, 4, &layout).unwrap();

        let alpha = &contributions.alpha;
        assert_relative_eq!(alpha[1], -2.0 * (0.49 + 0.01), epsilon = 1e-12);
        assert_relative_eq!(alpha[2], 2.0 * (0.49 + 0.01), epsilon = 1e-12);
        assert_relative_eq!(alpha[0], -0.02, epsilon = 1e-12);
        assert_relative_eq!(alpha[3], 0.02, epsilon = 1e-12);
        assert_relative_eq!(alpha.sum(), 0.0, epsilon = 1e-12);
        assert!(!contributions.has_beta);
    }

    #[test]
    fn unrestricted_and_generalized_contributions() {
        let text = "\
 header
      2A -> 3A       0.60000
      2B -> 4B       0.80000
";
        let job = &segment(text, Dialect::Gaussian)[0];
        let layout = Layout::new(Dialect::Gaussian, ScfVariant::Uhf);
        let contributions = Contributions::read(job, 2, 4, &layout).unwrap();
        assert_relative_eq!(contributions.alpha[2], 0.36, epsilon = 1e-12);
        assert_relative_eq!(contributions.beta[1], -0.64, epsilon = 1e-12);
        assert_relative_eq!(contributions.beta[3], 0.64, epsilon = 1e-12);
        assert!(contributions.has_beta);

        let text = "\
 header
      1 -> 2       0.30000   0.40000
";
        let job = &segment(text, Dialect::Chronus)[0];
        let layout = Layout::new(Dialect::Chronus, ScfVariant::Ghf);
        let contributions = Contributions::read(job, 2, 2, &layout).unwrap();
        assert_relative_eq!(contributions.alpha[0], -0.25, epsilon = 1e-12);
        assert_relative_eq!(contributions.alpha[1], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn contributions_past_the_orbitals_are_rejected() {
        let text = " header\n      2 -> 9         0.70000\n";
        let job = &segment(text, Dialect::Gaussian)[0];
        let layout = Layout::new(Dialect::Gaussian, ScfVariant::Rhf);

        assert!(matches!(
            Contributions::read(job, 2, 4, &layout),
            Err(ExtractError::CountMismatch { .. })
        ));
    }
}
