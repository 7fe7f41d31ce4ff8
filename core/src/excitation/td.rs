//! Linear-response (TD) excitations.

use super::{ActiveSpace, Contributions, ExcitationRecord, ExcitationSet, Method, RotatoryStrength};
use crate::{
    basic::BasicInfo,
    dialect::{Dialect, Layout},
    error::{ExtractError, Result},
    fields,
    matrix::{decode_matrix, BlockSpec, PrefixAnchor},
    options::{chronus_integer, chronus_option, iop},
    reader::Job,
};

/// Rows of the Gaussian rotatory strength tables: the state number, then
/// five values.
const ROTATORY_TABLE: BlockSpec = BlockSpec {
    columns: 5,
    block_skip: 0,
    anchor: PrefixAnchor::Start,
    offset: 10,
    exponent_marker: None,
};
/// Column of the rotatory strength in each table.
const ROTATORY_COLUMN: usize = 4;

/// ChronusQ partial response solves for this many roots unless told otherwise.
const DEFAULT_ROOTS: i64 = 3;

/// Header line, energy and oscillator strength of one excited state.
struct StateHeader {
    line_number: usize,
    energy: f64,
    oscillator_strength: f64,
}

/// Whether the job printed linear-response states.
pub(super) fn requested(job: &Job) -> Result<bool> {
    Ok(match job.dialect() {
        Dialect::Gaussian => iop(job, 9, 42)? == Some(1),
        Dialect::Chronus => job.index().find("RESP").is_some(),
    })
}

pub(super) fn gaussian(
    job: &Job,
    basic: &BasicInfo,
    layout: &Layout,
) -> Result<Option<ExcitationSet>> {
    if !requested(job)? {
        return Ok(None);
    }
    let n_states = iop(job, 9, 41)?
        .ok_or_else(|| ExtractError::not_found("IOp(9/41)", "number of excited states"))?;
    let n_states = state_count(n_states, "IOp(9/41)")?;

    let headers = job.index().find("Excited State").unwrap_or_default();
    if headers.len() != n_states {
        return Err(ExtractError::count_mismatch("`Excited State` blocks", n_states, headers.len()));
    }

    let states = headers
        .iter()
        .map(|&line_number| {
            let line = job.line(line_number, "excited state")?;
            Ok(StateHeader {
                line_number,
                energy: fields::number_before(line, "eV", line_number)?,
                oscillator_strength: gaussian_oscillator(line, line_number)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let rotatory = rotatory_strengths(job, n_states)?;
    let records = states
        .iter()
        .enumerate()
        .map(|(k, state)| {
            let mut record = record(job, basic, layout, k, state, state.line_number + 1)?;
            record.rotatory_strength = rotatory.as_ref().map(|(velocity, length)| RotatoryStrength {
                velocity: velocity[k],
                length: length[k],
            });
            Ok(record)
        })
        .collect::<Result<Vec<_>>>()?;

    td_set(basic, n_states, records).map(Some)
}

/// Oscillator strength of an `Excited State` line, printed as `f=0.0123`.
fn gaussian_oscillator(line: &str, line_number: usize) -> Result<f64> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let token = tokens
        .iter()
        .find_map(|token| token.strip_prefix("f=").filter(|value| !value.is_empty()))
        .or_else(|| value_after(&tokens, "f"))
        .ok_or_else(|| {
            ExtractError::not_found("f=", format!("oscillator strength on line {line_number}"))
        })?;
    fields::number(token, line_number, line)
}

/// The token two places after `keyword`, as in `f = 0.0123`.
fn value_after<'a>(tokens: &[&'a str], keyword: &str) -> Option<&'a str> {
    let position = tokens.iter().position(|&token| token == keyword)?;
    tokens.get(position + 2).copied()
}

/// Velocity and length rotatory strengths, one per state, if both tables
/// were printed.
fn rotatory_strengths(job: &Job, n_states: usize) -> Result<Option<(Vec<f64>, Vec<f64>)>> {
    let Some(&[velocity, length, ..]) = job.index().find("Rotatory Strength").as_deref() else {
        return Ok(None);
    };

    let column = |table: usize| -> Result<Vec<f64>> {
        let decoded = decode_matrix(
            job.lines(),
            table + 2,
            n_states,
            ROTATORY_TABLE.columns,
            &ROTATORY_TABLE,
        )?;
        Ok(decoded.value.column(ROTATORY_COLUMN).iter().copied().collect())
    };

    Ok(Some((column(velocity)?, column(length)?)))
}

pub(super) fn chronus(
    job: &Job,
    basic: &BasicInfo,
    layout: &Layout,
) -> Result<Option<ExcitationSet>> {
    if !requested(job)? {
        return Ok(None);
    }

    let full = chronus_option(job, "DOFULL") != Some("FALSE");
    let n_states = if full {
        full_response_count(basic)
    } else {
        let roots = chronus_integer(job, "NROOTS")?.unwrap_or(DEFAULT_ROOTS);
        state_count(roots, "NROOTS")?
    };
    log::debug!("{} response with {n_states} roots", if full { "full" } else { "partial" });

    let headers = job.index().find("Root").unwrap_or_default();
    if headers.len() != n_states {
        return Err(ExtractError::count_mismatch("`Root` blocks", n_states, headers.len()));
    }

    let records = headers
        .iter()
        .enumerate()
        .map(|(k, &line_number)| {
            let header = job.line(line_number, "response root")?;
            let energy = value_after(&header.split_whitespace().collect::<Vec<_>>(), "W(eV)")
                .ok_or_else(|| {
                    ExtractError::not_found("W(eV)", format!("root energy on line {line_number}"))
                })?;
            let energy = fields::number(energy, line_number, header)?;

            let strength_line = job.line(line_number + 1, "oscillator strength")?;
            let strength = value_after(&strength_line.split_whitespace().collect::<Vec<_>>(), "f")
                .ok_or_else(|| {
                    let aspect = format!("oscillator strength on line {}", line_number + 1);
                    ExtractError::not_found("f", aspect)
                })?;
            let oscillator_strength = fields::number(strength, line_number + 1, strength_line)?;

            let state = StateHeader {
                line_number,
                energy,
                oscillator_strength,
            };
            record(job, basic, layout, k, &state, line_number + 3)
        })
        .collect::<Result<Vec<_>>>()?;

    td_set(basic, n_states, records).map(Some)
}

/// Number of single excitations a full response calculation solves for.
fn full_response_count(basic: &BasicInfo) -> usize {
    let virtuals = |occupied: usize, n: usize| occupied * n.saturating_sub(occupied);

    if basic.variant.is_complex() {
        virtuals(basic.homo, 2 * basic.n_basis)
    } else {
        virtuals(basic.n_alpha, basic.n_basis) + virtuals(basic.n_beta, basic.n_basis)
    }
}

fn state_count(value: i64, source: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        ExtractError::InvalidArgument(format!("{source} must not be negative, got {value}"))
    })
}

/// The record of the `k`-th excited state, whose contributions start at `contributions`.
fn record(
    job: &Job,
    basic: &BasicInfo,
    layout: &Layout,
    k: usize,
    state: &StateHeader,
    contributions: usize,
) -> Result<ExcitationRecord> {
    let contributions = Contributions::read(job, contributions, basic.n_mo, layout)?;
    log::trace!("state {} on line {}: {} eV", k + 2, state.line_number, state.energy);

    Ok(ExcitationRecord {
        ground_state: 1,
        excited_state: k + 2,
        energy: state.energy,
        oscillator_strength: state.oscillator_strength,
        rotatory_strength: None,
        delta_diagonal: contributions.alpha,
        beta_delta_diagonal: (!layout.variant.is_restricted() && !layout.variant.is_complex())
            .then_some(contributions.beta),
    })
}

fn td_set(
    basic: &BasicInfo,
    n_states: usize,
    records: Vec<ExcitationRecord>,
) -> Result<ExcitationSet> {
    let active_space = ActiveSpace {
        start: 0,
        n_mo: basic.n_mo,
        n_electron: basic.n_electron,
    };
    ExcitationSet::new(Method::Td, 1, n_states + 1, active_space, records)
}
