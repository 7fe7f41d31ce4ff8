//! Whole-file extraction: segment, then extract every job on its own.

use std::path::Path;

use crate::{
    archive::{MatrixArchive, MatrixSource},
    basic,
    config::ParseConfig,
    error::{ExtractError, Result, Warning},
    excitation,
    population::{self, PopulationContext},
    reader::{self, Job},
    result::ParsedJob,
};

/// Parse every job of a file.
///
/// The outer error is reserved for problems with the file itself (it cannot
/// be read, its dialect is unknown, the companion container is broken). A
/// job that fails to parse yields an `Err` in its slot without affecting the
/// other jobs.
pub fn parse_file(path: impl AsRef<Path>, config: &ParseConfig) -> Result<Vec<Result<ParsedJob>>> {
    let path = path.as_ref();
    let jobs = reader::read_file(path, config.dialect)?;
    let companion = config.companion.as_ref().map(MatrixArchive::load).transpose()?;
    log::info!("{path:?}: {} jobs", jobs.len());

    Ok(extract_jobs(&jobs, config, companion.as_ref()))
}

#[cfg(feature = "rayon")]
fn extract_jobs(
    jobs: &[Job],
    config: &ParseConfig,
    companion: Option<&MatrixArchive>,
) -> Vec<Result<ParsedJob>> {
    use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

    jobs.par_iter()
        .map(|job| extract_job(job, config, companion.map(|archive| archive as &dyn MatrixSource)))
        .collect()
}

#[cfg(not(feature = "rayon"))]
fn extract_jobs(
    jobs: &[Job],
    config: &ParseConfig,
    companion: Option<&MatrixArchive>,
) -> Vec<Result<ParsedJob>> {
    jobs.iter()
        .map(|job| extract_job(job, config, companion.map(|archive| archive as &dyn MatrixSource)))
        .collect()
}

/// Extract basic information, excitations and population analysis of one job.
pub fn extract_job(
    job: &Job,
    config: &ParseConfig,
    companion: Option<&dyn MatrixSource>,
) -> Result<ParsedJob> {
    let mut warnings = Vec::new();
    if !job.terminated_normally() {
        if config.strict_termination {
            return Err(ExtractError::AbnormalTermination(job.dialect()));
        }
        warnings.push(Warning::AbnormalTermination);
    }

    let basic = basic::extract(job)?;
    let layout = basic.layout(job.dialect());

    let excitations = if config.excitations {
        excitation::extract(job, &basic, &layout)?
    } else {
        None
    };

    let population = if config.population {
        let context = PopulationContext {
            basic: &basic,
            layout: &layout,
            cas: match &excitations {
                Some(set) => set.is_cas(),
                None => excitation::is_cas(job)?,
            },
            companion,
        };
        population::extract(job, &context, &mut warnings)?
    } else {
        None
    };

    log::info!(
        "{} {} job: {} basis functions, {} excitations, population analysis: {}",
        job.dialect(),
        basic.variant,
        basic.n_basis,
        excitations.as_ref().map_or(0, |set| set.len()),
        population.is_some()
    );

    let mut builder = ParsedJob::builder(basic).warnings(warnings);
    if let Some(excitations) = excitations {
        builder = builder.excitations(excitations)?;
    }
    if let Some(population) = population {
        builder = builder.population(population)?;
    }
    Ok(builder.build())
}
