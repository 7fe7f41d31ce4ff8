use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use fasma_core::{
    basic::BasicInfo,
    electron::ElectronBlock,
    excitation::{ExcitationSet, Method},
    parse_file,
    population::Population,
    Dialect, ParseConfig, ParsedJob, Warning,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Gaussian `.log` or ChronusQ `.out` file to read
    path: PathBuf,
    /// Companion matrix container for the ChronusQ population analysis
    #[arg(long, short)]
    companion: Option<PathBuf>,
    /// JSON file with parse options; flags given here take precedence
    #[arg(long)]
    config: Option<PathBuf>,
    /// Read the file as this dialect instead of guessing from its suffix
    #[arg(long, short, value_enum)]
    dialect: Option<DialectArg>,
    /// Print basic information and excitations of every job as JSON
    #[arg(long)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DialectArg {
    Gaussian,
    Chronus,
}

impl From<DialectArg> for Dialect {
    fn from(value: DialectArg) -> Self {
        match value {
            DialectArg::Gaussian => Dialect::Gaussian,
            DialectArg::Chronus => Dialect::Chronus,
        }
    }
}

#[derive(Serialize)]
struct JobSummary<'a> {
    job: usize,
    basic: &'a BasicInfo,
    excitations: Option<&'a ExcitationSet>,
    warnings: &'a [Warning],
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ParseConfig::load(path)
            .with_context(|| format!("failed to load the options in {path:?}"))?,
        None => ParseConfig::default(),
    };
    if let Some(dialect) = args.dialect {
        config.dialect = Some(dialect.into());
    }
    if args.companion.is_some() {
        config.companion = args.companion.clone();
    }

    let jobs = parse_file(&args.path, &config)
        .with_context(|| format!("failed to read {:?}", args.path))?;

    let mut summaries = Vec::new();
    for (k, job) in jobs.iter().enumerate() {
        let number = k + 1;
        match job {
            Ok(parsed) if args.json => summaries.push(JobSummary {
                job: number,
                basic: parsed.basic(),
                excitations: parsed.excitations(),
                warnings: parsed.warnings(),
            }),
            Ok(parsed) => print_job(number, parsed),
            Err(error) => {
                log::error!("job {number} could not be parsed: {error}");
                eprintln!("job {number}: {error}");
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    }

    Ok(())
}

fn print_job(number: usize, parsed: &ParsedJob) {
    let basic = parsed.basic();

    println!("job {number}: {} with {} atoms", basic.variant, basic.n_atoms());
    println!(
        "  basis functions: {}, primitives: {}, electrons: {} ({} alpha, {} beta)",
        basic.n_basis, basic.n_primitive, basic.n_electron, basic.n_alpha, basic.n_beta
    );
    println!("  homo: {}, lumo: {}", basic.homo, basic.lumo);

    if let Some(excitations) = parsed.excitations() {
        print_excitations(excitations);
    }
    if let Some(population) = parsed.population() {
        print_population(population, basic);
    }
    for warning in parsed.warnings() {
        println!("  warning: {warning}");
    }
}

fn print_excitations(excitations: &ExcitationSet) {
    let method = match excitations.method() {
        Method::Td => "TD".to_owned(),
        Method::Cas(info) => format!("CAS with {} roots", info.n_root),
    };
    let window = excitations.active_space();

    println!(
        "  {method} excitations: {} from {} ground state(s), orbitals {}..{}, {} active electrons",
        excitations.len(),
        excitations.n_ground_state(),
        window.start,
        window.end(),
        window.n_electron
    );
    for record in excitations.records() {
        println!(
            "    {} -> {}: {:10.4} eV, f = {:.4}",
            record.ground_state, record.excited_state, record.energy, record.oscillator_strength
        );
    }
}

fn print_population(population: &Population, basic: &BasicInfo) {
    let (rows, columns) = population.overlap().shape();
    println!("  overlap: {rows}x{columns}");

    print_block("alpha", population.alpha(), population, basic);
    if let Some(beta) = population.beta() {
        print_block("beta", beta, population, basic);
    }
}

fn print_block(name: &str, block: &ElectronBlock, population: &Population, basic: &BasicInfo) {
    let (rows, columns) = block.coefficients().shape();
    let density = block
        .density()
        .map_or("none".to_owned(), |density| format!("{}x{}", density.nrows(), density.ncols()));
    println!("  {name} coefficients: {rows}x{columns}, density: {density}");

    for (orbital, mo) in [("homo", basic.homo), ("lumo", basic.lumo)] {
        let Some(mo) = mo.checked_sub(1) else {
            continue;
        };
        let leading = block
            .dominant_aos(mo)
            .into_iter()
            .take(3)
            .filter_map(|(ao, share)| {
                let label = population.labels().get(ao)?;
                let name = format!("{}{}", label.atom_type, label.atom_index);
                Some(format!("{name} {} ({share:.2})", label.orbital))
            })
            .collect::<Vec<_>>();
        if !leading.is_empty() {
            println!("    {name} {orbital}: {}", leading.join(", "));
        }
    }
}
