//! Synthetic output for tests and benchmarks.
//!
//! Everything here renders text in the fixed-width layouts the decoders
//! expect, from matrices whose values are known in advance. Orbitals are
//! orthonormal in the metric of the overlap printed with them, so each of
//! their AO projections sums to one.

use std::ops::Range;

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::{
    archive::{self, MatrixArchive},
    electron::OrbitalMatrix,
};

/// Output lines, joined once complete.
#[derive(Debug, Default)]
struct Output {
    lines: Vec<String>,
}

impl Output {
    fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn blank(&mut self) {
        self.lines.push(String::new());
    }

    fn finish(self) -> String {
        self.lines.into_iter().map(|line| line + "\n").collect()
    }
}

/// Render `matrix` as labelled blocks of at most `k` columns, each preceded
/// by a header line. NaN cells are printed as an overflow field.
pub fn labelled_blocks(matrix: &DMatrix<f64>, k: usize) -> String {
    let mut out = Output::default();

    for first in (0..matrix.ncols()).step_by(k.max(1)) {
        let columns = first..(first + k).min(matrix.ncols());
        out.line(column_numbers(columns.clone()));
        for i in 0..matrix.nrows() {
            let values: String = columns
                .clone()
                .map(|j| match matrix[(i, j)] {
                    value if value.is_nan() => format!("{:>12}", "**********"),
                    value => format!("{value:>12.6}"),
                })
                .collect();
            out.line(format!("{:>5} 1   O  1S    {values}", i + 1));
        }
    }
    out.finish()
}

fn column_numbers(columns: Range<usize>) -> String {
    let numbers: String = columns.map(|j| format!("{:>10}", j + 1)).collect();
    format!("              {numbers}")
}

/// A number the way Gaussian prints it, with a `D` exponent.
fn fortran(value: f64) -> String {
    format!("{value:>14.6E}").replace('E', "D")
}

fn fixed(values: impl IntoIterator<Item = f64>) -> String {
    values.into_iter().map(|value| format!("{value:>10.5}")).collect()
}

/// Overlap of a chain of 1S functions, decaying with distance.
fn chain_overlap(n: usize) -> DMatrix<f64> {
    DMatrix::from_fn(n, n, |i, j| 0.3f64.powi(i.abs_diff(j) as i32))
}

/// `M^(-1/2)` of a symmetric positive definite matrix.
fn inverse_sqrt(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let eigen = matrix.clone().symmetric_eigen();
    let scaled = DMatrix::from_diagonal(&eigen.eigenvalues.map(|x| 1.0 / x.sqrt()));
    &eigen.eigenvectors * scaled * eigen.eigenvectors.transpose()
}

/// An orthogonal `n` x `n` matrix; `twist` picks which one.
fn rotation(n: usize, twist: f64) -> DMatrix<f64> {
    DMatrix::from_fn(n, n, |i, j| {
        (twist * ((i + 1) * (j + 2)) as f64).sin() + if i == j { 2.0 } else { 0.0 }
    })
    .qr()
    .q()
}

/// Orbitals `S^(-1/2)·Q`, orthonormal in the metric of `overlap`.
fn orthonormal_orbitals(overlap: &DMatrix<f64>, twist: f64) -> DMatrix<f64> {
    inverse_sqrt(overlap) * rotation(overlap.nrows(), twist)
}

/// Evenly spaced orbital energies.
fn ladder(n: usize, lowest: f64) -> DVector<f64> {
    DVector::from_fn(n, |j, _| lowest + 0.25 * j as f64)
}

/// `weight · C_occ·C_occᵀ` over the first `n_occupied` orbitals.
fn occupied_density(coefficients: &DMatrix<f64>, n_occupied: usize, weight: f64) -> DMatrix<f64> {
    let occupied = coefficients.columns(0, n_occupied).into_owned();
    &occupied * occupied.transpose() * weight
}

/// Coefficients (AOs by MOs) and energies of one set of orbitals.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticOrbitals {
    pub coefficients: DMatrix<f64>,
    pub eigenvalues: DVector<f64>,
}

/// One `from -> to` term of an excited state, with 1-based orbitals.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticContribution {
    pub from: usize,
    pub to: usize,
    pub amplitude: Complex64,
    /// excites a beta orbital of an unrestricted calculation
    pub beta: bool,
}

impl SyntheticContribution {
    fn real(from: usize, to: usize, amplitude: f64, beta: bool) -> Self {
        Self {
            from,
            to,
            amplitude: Complex64::new(amplitude, 0.0),
            beta,
        }
    }

    /// Printed with `A`/`B` suffixes when `spin` is set, and with an
    /// imaginary part when `complex` is.
    fn line(&self, arrow: &str, spin: bool, complex: bool) -> String {
        let suffix = match (spin, self.beta) {
            (false, _) => "",
            (true, false) => "A",
            (true, true) => "B",
        };
        let from = format!("{}{suffix}", self.from);
        let to = format!("{}{suffix}", self.to);

        if complex {
            format!(
                "   {from:>6} {arrow}{to:>5}   {:>10.5}{:>10.5}",
                self.amplitude.re, self.amplitude.im
            )
        } else {
            format!("   {from:>6} {arrow}{to:>5}   {:>10.5}", self.amplitude.re)
        }
    }
}

/// One excited state of a synthetic TD calculation.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticState {
    /// eV
    pub energy: f64,
    pub oscillator_strength: f64,
    /// velocity and length gauge
    pub rotatory_strength: (f64, f64),
    pub contributions: Vec<SyntheticContribution>,
}

impl SyntheticState {
    fn new(k: usize, contributions: Vec<SyntheticContribution>) -> Self {
        Self {
            energy: 7.5 + 1.25 * k as f64,
            oscillator_strength: 0.1 * (k + 1) as f64,
            rotatory_strength: (0.5 * (k + 1) as f64, -0.25 * (k + 1) as f64),
            contributions,
        }
    }

    /// Expected alpha and beta occupation changes over `n_mo` orbitals, with
    /// squared amplitudes scaled by `weight`.
    pub fn delta_diagonals(&self, n_mo: usize, weight: f64) -> (DVector<f64>, DVector<f64>) {
        let mut alpha = DVector::zeros(n_mo);
        let mut beta = DVector::zeros(n_mo);
        for contribution in &self.contributions {
            let delta = if contribution.beta { &mut beta } else { &mut alpha };
            let share = weight * contribution.amplitude.norm_sqr();
            delta[contribution.from - 1] -= share;
            delta[contribution.to - 1] += share;
        }
        (alpha, beta)
    }
}

/// One state per single excitation `(from, to, beta)`.
fn single_excitations(
    excitations: impl IntoIterator<Item = (usize, usize, bool)>,
    amplitude: Complex64,
) -> Vec<SyntheticState> {
    excitations
        .into_iter()
        .enumerate()
        .map(|(k, (from, to, beta))| {
            SyntheticState::new(
                k,
                vec![SyntheticContribution {
                    from,
                    to,
                    amplitude,
                    beta,
                }],
            )
        })
        .collect()
}

/// Every occupied to virtual excitation among `n` orbitals.
fn excitations_from(
    n_occupied: usize,
    n: usize,
    beta: bool,
) -> impl Iterator<Item = (usize, usize, bool)> {
    (1..=n_occupied).flat_map(move |from| (n_occupied + 1..=n).map(move |to| (from, to, beta)))
}

/// AO label of a Gaussian coefficient or density row; atom `i + 1` owns
/// basis function `i + 1`.
fn gaussian_label(i: usize) -> String {
    format!("{:>4} {:<3} H  1S    ", i + 1, i + 1)
}

/// Route, link lines, geometry and electron counts of a Gaussian job.
fn gaussian_preamble(
    out: &mut Output,
    route: &str,
    scf_code: i64,
    overlay_9: Option<String>,
    n_basis: usize,
    (n_alpha, n_beta): (usize, usize),
) {
    out.line(" Entering Gaussian System, Link 0=g16");
    out.line(" ----------------------------------------------");
    out.line(format!(" #p {route}"));
    out.line(" ----------------------------------------------");
    out.line(" 1/38=1,57=2/1;");
    out.line(" 2/12=2,17=6,18=5,40=1/2;");
    out.line(format!(" 3/6=3,11=9,25=1,30=1,33=1,116={scf_code}/1,2,3;"));
    if let Some(options) = overlay_9 {
        out.line(format!(" 9/{options}/14;"));
    }
    out.line(" 99/5=1,9=1/99;");
    out.line(" Symbolic Z-matrix:");
    out.line(format!(
        " Charge =  0 Multiplicity = {}",
        n_alpha.abs_diff(n_beta) + 1
    ));
    for i in 0..n_basis {
        out.line(format!(" H                     0.        0.    {:>10.5}", 0.74 * i as f64));
    }
    out.blank();

    let n = n_basis;
    out.line(format!(" NAtoms={n:>7} NQM={n:>11} NQMF=       0 NMMI=      0"));
    out.line(format!(
        "{n:>6} basis functions,{:>6} primitive gaussians,{n:>6} cartesian basis functions",
        3 * n
    ));
    out.line(format!("{n_alpha:>6} alpha electrons{n_beta:>12} beta electrons"));
}

/// Lower triangle in blocks of five, with numeric or AO row labels.
fn gaussian_triangular(out: &mut Output, matrix: &DMatrix<f64>, labelled: bool) {
    let n = matrix.nrows();
    for first in (0..n).step_by(5) {
        out.line(column_numbers(first..(first + 5).min(n)));
        for i in first..n {
            let label = if labelled {
                gaussian_label(i)
            } else {
                format!("{:>7}", i + 1)
            };
            let values: String =
                (first..=i.min(first + 4)).map(|j| fortran(matrix[(i, j)])).collect();
            out.line(format!("{label}{values}"));
        }
    }
}

/// MO coefficient blocks of five columns under `title`. `rows` are the
/// printed rows and `label` names each of them.
fn gaussian_orbitals(
    out: &mut Output,
    title: &str,
    rows: &DMatrix<f64>,
    eigenvalues: &DVector<f64>,
    n_occupied: usize,
    label: impl Fn(usize) -> String,
) {
    out.line(format!("     {title}"));
    let n_mo = rows.ncols();

    for first in (0..n_mo).step_by(5) {
        let columns = first..(first + 5).min(n_mo);
        out.line(column_numbers(columns.clone()));
        let occupations: String = columns
            .clone()
            .map(|j| format!("{:>10}", if j < n_occupied { "O" } else { "V" }))
            .collect();
        out.line(format!("                   {occupations}"));
        out.line(format!(
            "     Eigenvalues --{}",
            fixed(columns.clone().map(|j| eigenvalues[j]))
        ));
        for i in 0..rows.nrows() {
            out.line(format!("{}{}", label(i), fixed(columns.clone().map(|j| rows[(i, j)]))));
        }
    }
}

/// The TD section: one header per state, then its contributions.
fn gaussian_states(out: &mut Output, states: &[SyntheticState], spin: bool) {
    out.line(" Excitation energies and oscillator strengths:");
    for (k, state) in states.iter().enumerate() {
        out.blank();
        out.line(format!(
            " Excited State {:>3}:      Singlet-A   {:>10.4} eV {:>7.2} nm  f={:.4}  <S**2>=0.000",
            k + 1,
            state.energy,
            1239.84 / state.energy,
            state.oscillator_strength
        ));
        for (index, contribution) in state.contributions.iter().enumerate() {
            // de-excitations are printed with a reversed arrow
            let arrow = if index % 2 == 0 { "->" } else { "<-" };
            out.line(contribution.line(arrow, spin, false));
        }
    }
    out.blank();
}

fn gaussian_termination(out: &mut Output) {
    out.line(" Normal termination of Gaussian 16 at Fri Oct 16 12:00:00 2026.");
}

/// Input echo, geometry and basis counts of a ChronusQ job.
fn chronus_preamble(
    out: &mut Output,
    reference: &str,
    n_basis: usize,
    n_electron: usize,
    options: &[String],
) {
    out.line(" ChronusQ");
    out.line(" Input File:");
    out.line(" ===========");
    out.line(" [Molecule]");
    out.line(" charge = 0");
    out.line(" geom:");
    for i in 0..n_basis {
        out.line(format!("   h   0.0   0.0   {:.4}", 0.74 * i as f64));
    }
    out.blank();
    out.line(" [QM]");
    out.line(format!(" reference = {reference}"));
    for option in options {
        out.line(format!(" {option}"));
    }
    out.line(" [Misc]");
    out.line(" printmos = 1");
    out.line(" ===========");
    out.line(format!("  NBasis            = {n_basis}"));
    out.line(format!("  NPrimitive        = {}", 3 * n_basis));
    out.line(format!("  Total Electrons   = {n_electron}"));
    out.blank();
}

/// Occupied orbital energies of one spin, four per line.
fn chronus_eigenenergies(out: &mut Output, spin: &str, occupied: &[f64]) {
    out.line(format!("  Orbital Eigenenergies ({spin}) / Eh"));
    out.line("  ---------------------------------");
    out.line("  Occupied");
    for chunk in occupied.chunks(4) {
        out.line(chunk.iter().map(|value| format!("  {value:>10.5}")).collect::<String>());
    }
    out.blank();
}

/// `EigV` blocks of four columns. Every atom owns one function and atoms
/// are separated by blank lines.
fn chronus_orbitals(out: &mut Output, coefficients: &DMatrix<f64>, eigenvalues: &DVector<f64>) {
    let n_mo = coefficients.ncols();

    for first in (0..n_mo).step_by(4) {
        let columns = first..(first + 4).min(n_mo);
        out.line("  ----------------------------------------");
        out.line(column_numbers(columns.clone()));
        out.line(format!("  EigV --        {}", fixed(columns.clone().map(|j| eigenvalues[j]))));
        out.blank();
        for i in 0..coefficients.nrows() {
            if i > 0 {
                out.blank();
            }
            out.line(format!(
                "{:>6}{:>4} {:<6}1S    {}",
                i + 1,
                i + 1,
                format!("H-{}", i + 1),
                fixed(columns.clone().map(|j| coefficients[(i, j)]))
            ));
        }
        out.blank();
    }
}

fn chronus_roots(out: &mut Output, states: &[SyntheticState], spin: bool, complex: bool) {
    out.line("  RESPONSE Results:");
    for (k, state) in states.iter().enumerate() {
        out.line(format!(
            "  Root {:>4}:  W(Eh) = {:.8}  W(eV) = {:.8}",
            k + 1,
            state.energy / 27.2114,
            state.energy
        ));
        out.line(format!("    f = {:.8}", state.oscillator_strength));
        out.line("    ----------------------------");
        for contribution in &state.contributions {
            out.line(contribution.line("->", spin, complex));
        }
        out.blank();
    }
}

fn chronus_termination(out: &mut Output) {
    out.line(" ChronusQ Job Ended");
    out.line(" ChronusQ Job Ended");
}

/// A closed-shell chain of hydrogen atoms with one 1S function each.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticRhf {
    pub n_occupied: usize,
    pub overlap: DMatrix<f64>,
    pub coefficients: DMatrix<f64>,
    pub eigenvalues: DVector<f64>,
    pub density: DMatrix<f64>,
    pub states: Vec<SyntheticState>,
    /// nuclear orbitals of a NEO calculation, printed before the electronic ones
    pub nuclear: Option<SyntheticOrbitals>,
}

impl SyntheticRhf {
    pub fn chain(n_basis: usize, n_occupied: usize) -> Self {
        let overlap = chain_overlap(n_basis);
        let coefficients = orthonormal_orbitals(&overlap, 0.37);
        let density = occupied_density(&coefficients, n_occupied, 2.0);

        let states = (0..n_basis.saturating_sub(n_occupied).min(3))
            .map(|k| {
                let to = n_occupied + k + 1;
                SyntheticState::new(
                    k,
                    vec![
                        SyntheticContribution::real(n_occupied, to, 0.7, false),
                        SyntheticContribution::real(n_occupied, to, -0.1, false),
                    ],
                )
            })
            .collect();

        Self {
            n_occupied,
            overlap,
            coefficients,
            eigenvalues: ladder(n_basis, -0.8),
            density,
            states,
            nuclear: None,
        }
    }

    /// Turn the job into a nuclear-electronic one.
    pub fn with_nuclear_orbitals(mut self) -> Self {
        self.nuclear = Some(SyntheticOrbitals {
            coefficients: orthonormal_orbitals(&self.overlap, 0.53),
            eigenvalues: ladder(self.n_basis(), 3.0),
        });
        self
    }

    pub fn n_basis(&self) -> usize {
        self.overlap.nrows()
    }

    /// Companion container holding the overlap and the alpha coefficients,
    /// stored MO-major the way ChronusQ writes them.
    pub fn archive(&self) -> MatrixArchive {
        let mut archive = overlap_archive(&self.overlap);
        archive.insert(
            archive::ALPHA_COEFFICIENTS,
            &OrbitalMatrix::Real(self.coefficients.transpose()),
        );
        archive
    }

    /// Companion container with the overlap only; coefficients come from
    /// the text output.
    pub fn overlap_archive(&self) -> MatrixArchive {
        overlap_archive(&self.overlap)
    }

    /// A Gaussian `.log` job with population analysis and TD output.
    pub fn gaussian(&self) -> String {
        let n = self.n_basis();
        let n_states = self.states.len();
        let mut out = Output::default();

        gaussian_preamble(
            &mut out,
            &format!("td(nstates={n_states}) rhf/sto-3g pop=full"),
            1,
            Some(format!("41={n_states},42=1")),
            n,
            (self.n_occupied, self.n_occupied),
        );
        out.line(" *** Overlap ***");
        gaussian_triangular(&mut out, &self.overlap, false);
        gaussian_orbitals(
            &mut out,
            "Molecular Orbital Coefficients:",
            &self.coefficients,
            &self.eigenvalues,
            self.n_occupied,
            gaussian_label,
        );
        out.line("     Density Matrix:");
        gaussian_triangular(&mut out, &self.density, true);
        gaussian_states(&mut out, &self.states, false);

        for (gauge, label) in [(0, "R(velocity)"), (1, "R(length)")] {
            out.line(" Rotatory Strengths (R) in cgs (10**-40 erg-esu-cm/Gauss)");
            out.line(format!(
                "       state          XX          YY          ZZ        R(au)  {label}"
            ));
            for (k, state) in self.states.iter().enumerate() {
                let value = if gauge == 0 {
                    state.rotatory_strength.0
                } else {
                    state.rotatory_strength.1
                };
                out.line(format!(
                    "{:>10}{:>12.4}{:>12.4}{:>12.4}{:>12.4}{value:>12.4}",
                    k + 1,
                    0.0,
                    0.0,
                    0.0,
                    value / 100.0
                ));
            }
        }

        gaussian_termination(&mut out);
        out.finish()
    }

    /// A ChronusQ `.out` job with printed MOs and partial linear response.
    ///
    /// The overlap is not printed; pair it with [`SyntheticRhf::archive`].
    pub fn chronus(&self) -> String {
        let n = self.n_basis();
        let mut out = Output::default();

        let mut options = Vec::new();
        if self.nuclear.is_some() {
            options.push("neo = true".to_owned());
        }
        options.extend([
            "job = resp".to_owned(),
            "[Response]".to_owned(),
            format!("nroots = {}", self.states.len()),
            "dofull = false".to_owned(),
        ]);
        chronus_preamble(&mut out, "real rhf", n, 2 * self.n_occupied, &options);
        chronus_eigenenergies(&mut out, "Alpha", &self.eigenvalues.as_slice()[..self.n_occupied]);

        out.line("  Canonical Molecular Orbital Coefficients");
        if let Some(nuclear) = &self.nuclear {
            chronus_orbitals(&mut out, &nuclear.coefficients, &nuclear.eigenvalues);
        }
        chronus_orbitals(&mut out, &self.coefficients, &self.eigenvalues);
        chronus_roots(&mut out, &self.states, false, false);

        chronus_termination(&mut out);
        out.finish()
    }

    /// Expected alpha delta diagonal of `state` in a closed-shell calculation.
    pub fn delta_diagonal(&self, state: usize) -> DVector<f64> {
        self.states[state].delta_diagonals(self.n_basis(), 2.0).0
    }
}

fn overlap_archive(overlap: &DMatrix<f64>) -> MatrixArchive {
    let mut archive = MatrixArchive::new();
    archive.insert(archive::OVERLAP, &OrbitalMatrix::Real(overlap.clone()));
    archive
}

/// An open-shell chain: unrestricted, or restricted-open with a CAS block.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticOpenShell {
    pub n_alpha: usize,
    pub n_beta: usize,
    pub overlap: DMatrix<f64>,
    pub alpha: SyntheticOrbitals,
    /// the alpha orbitals again for restricted-open jobs
    pub beta: SyntheticOrbitals,
    pub alpha_density: DMatrix<f64>,
    pub beta_density: DMatrix<f64>,
    /// every single excitation of either spin, for unrestricted jobs
    pub states: Vec<SyntheticState>,
    restricted: bool,
}

impl SyntheticOpenShell {
    /// Unrestricted orbitals with every single excitation as a state.
    pub fn unrestricted(n_basis: usize, n_alpha: usize, n_beta: usize) -> Self {
        let overlap = chain_overlap(n_basis);
        let alpha = SyntheticOrbitals {
            coefficients: orthonormal_orbitals(&overlap, 0.37),
            eigenvalues: ladder(n_basis, -0.8),
        };
        let beta = SyntheticOrbitals {
            coefficients: orthonormal_orbitals(&overlap, 0.61),
            eigenvalues: ladder(n_basis, -0.7),
        };
        let excitations = excitations_from(n_alpha, n_basis, false)
            .chain(excitations_from(n_beta, n_basis, true));
        let states = single_excitations(excitations, Complex64::new(0.6, 0.0));

        Self {
            n_alpha,
            n_beta,
            alpha_density: occupied_density(&alpha.coefficients, n_alpha, 1.0),
            beta_density: occupied_density(&beta.coefficients, n_beta, 1.0),
            overlap,
            alpha,
            beta,
            states,
            restricted: false,
        }
    }

    /// Restricted-open orbitals from a CAS job; no excitations are printed.
    pub fn restricted_open_cas(n_basis: usize, n_alpha: usize, n_beta: usize) -> Self {
        let overlap = chain_overlap(n_basis);
        let orbitals = SyntheticOrbitals {
            coefficients: orthonormal_orbitals(&overlap, 0.37),
            eigenvalues: ladder(n_basis, -0.8),
        };

        Self {
            n_alpha,
            n_beta,
            alpha_density: occupied_density(&orbitals.coefficients, n_alpha, 1.0),
            beta_density: occupied_density(&orbitals.coefficients, n_beta, 1.0),
            overlap,
            alpha: orbitals.clone(),
            beta: orbitals,
            states: Vec::new(),
            restricted: true,
        }
    }

    pub fn n_basis(&self) -> usize {
        self.overlap.nrows()
    }

    /// Companion container with the overlap and both spins' coefficients.
    pub fn archive(&self) -> MatrixArchive {
        let mut archive = overlap_archive(&self.overlap);
        archive.insert(
            archive::ALPHA_COEFFICIENTS,
            &OrbitalMatrix::Real(self.alpha.coefficients.transpose()),
        );
        archive.insert(
            archive::BETA_COEFFICIENTS,
            &OrbitalMatrix::Real(self.beta.coefficients.transpose()),
        );
        archive
    }

    pub fn overlap_archive(&self) -> MatrixArchive {
        overlap_archive(&self.overlap)
    }

    /// A Gaussian `.log` job. Unrestricted jobs print both spins' orbitals,
    /// densities and TD output; restricted-open CAS jobs print one set of
    /// orbitals with separate spin densities.
    pub fn gaussian(&self) -> String {
        let n = self.n_basis();
        let n_states = self.states.len();
        let mut out = Output::default();

        if self.restricted {
            gaussian_preamble(
                &mut out,
                "rohf/sto-3g cas(2,2) pop=full",
                101,
                Some("6=2,7=2,13=1,17=2".to_owned()),
                n,
                (self.n_alpha, self.n_beta),
            );
        } else {
            gaussian_preamble(
                &mut out,
                &format!("td(nstates={n_states}) uhf/sto-3g pop=full"),
                2,
                Some(format!("41={n_states},42=1")),
                n,
                (self.n_alpha, self.n_beta),
            );
        }
        out.line(" *** Overlap ***");
        gaussian_triangular(&mut out, &self.overlap, false);

        if self.restricted {
            gaussian_orbitals(
                &mut out,
                "Molecular Orbital Coefficients:",
                &self.alpha.coefficients,
                &self.alpha.eigenvalues,
                self.n_alpha,
                gaussian_label,
            );
            out.line("     Density Matrix:");
        } else {
            for (title, orbitals, n_occupied) in [
                ("Alpha Molecular Orbital Coefficients:", &self.alpha, self.n_alpha),
                ("Beta Molecular Orbital Coefficients:", &self.beta, self.n_beta),
            ] {
                gaussian_orbitals(
                    &mut out,
                    title,
                    &orbitals.coefficients,
                    &orbitals.eigenvalues,
                    n_occupied,
                    gaussian_label,
                );
            }
            out.line("     Alpha Density Matrix:");
        }
        gaussian_triangular(&mut out, &self.alpha_density, true);
        out.line("     Beta Density Matrix:");
        gaussian_triangular(&mut out, &self.beta_density, true);

        if !self.restricted {
            gaussian_states(&mut out, &self.states, true);
        }
        gaussian_termination(&mut out);
        out.finish()
    }

    /// A ChronusQ `.out` job of an unrestricted chain with full linear
    /// response.
    pub fn chronus(&self) -> String {
        let n = self.n_basis();
        let mut out = Output::default();

        let options = ["job = resp", "[Response]", "dofull = true"].map(str::to_owned);
        chronus_preamble(&mut out, "real uhf", n, self.n_alpha + self.n_beta, &options);
        let alpha = &self.alpha.eigenvalues.as_slice()[..self.n_alpha];
        let beta = &self.beta.eigenvalues.as_slice()[..self.n_beta];
        chronus_eigenenergies(&mut out, "Alpha", alpha);
        chronus_eigenenergies(&mut out, "Beta", beta);

        out.line("  Canonical Molecular Orbital Coefficients");
        chronus_orbitals(&mut out, &self.alpha.coefficients, &self.alpha.eigenvalues);
        chronus_orbitals(&mut out, &self.beta.coefficients, &self.beta.eigenvalues);
        chronus_roots(&mut out, &self.states, true, false);

        chronus_termination(&mut out);
        out.finish()
    }
}

/// A chain of generalized (two-component) orbitals mixing both spins.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticGhf {
    pub n_electron: usize,
    /// overlap of the spatial basis functions
    pub overlap: DMatrix<f64>,
    /// rows are spin orbitals `2μ + σ`, columns MOs
    pub coefficients: DMatrix<Complex64>,
    pub eigenvalues: DVector<f64>,
    pub density: DMatrix<Complex64>,
    /// every single excitation
    pub states: Vec<SyntheticState>,
}

impl SyntheticGhf {
    pub fn chain(n_basis: usize, n_electron: usize) -> Self {
        let n_mo = 2 * n_basis;
        let overlap = chain_overlap(n_basis);

        let metric = inverse_sqrt(&overlap).kronecker(&DMatrix::<f64>::identity(2, 2));
        let phases = DVector::from_fn(n_mo, |j, _| Complex64::from_polar(1.0, 0.4 * j as f64));
        let real = (metric * rotation(n_mo, 0.29)).map(|x| Complex64::new(x, 0.0));
        let coefficients = real * DMatrix::from_diagonal(&phases);

        let occupied = coefficients.columns(0, n_electron).into_owned();
        let density = &occupied * occupied.adjoint();

        Self {
            n_electron,
            overlap,
            coefficients,
            eigenvalues: ladder(n_mo, -0.8),
            density,
            states: single_excitations(
                excitations_from(n_electron, n_mo, false),
                Complex64::new(0.6, 0.3),
            ),
        }
    }

    pub fn n_basis(&self) -> usize {
        self.overlap.nrows()
    }

    /// Coefficients with all alpha rows first, then all beta rows.
    pub fn spin_blocked(&self) -> DMatrix<Complex64> {
        let n = self.n_basis();
        DMatrix::from_fn(2 * n, 2 * n, |i, j| {
            if i < n {
                self.coefficients[(2 * i, j)]
            } else {
                self.coefficients[(2 * (i - n) + 1, j)]
            }
        })
    }

    /// Companion container with the spatial overlap and the spin-blocked
    /// coefficients, stored MO-major.
    pub fn archive(&self) -> MatrixArchive {
        let mut archive = overlap_archive(&self.overlap);
        archive.insert(
            archive::ALPHA_COEFFICIENTS,
            &OrbitalMatrix::Complex(self.spin_blocked().transpose()),
        );
        archive
    }

    pub fn overlap_archive(&self) -> MatrixArchive {
        overlap_archive(&self.overlap)
    }

    /// A Gaussian `.log` job. Each spin orbital row is printed as a real row
    /// followed by an imaginary row, and the density as a real and an
    /// imaginary lower triangle.
    pub fn gaussian(&self) -> String {
        let n = self.n_basis();
        let mut out = Output::default();

        let n_alpha = self.n_electron.div_ceil(2);
        gaussian_preamble(
            &mut out,
            "ghf/sto-3g pop=full",
            7,
            None,
            n,
            (n_alpha, self.n_electron - n_alpha),
        );
        out.line(" *** Overlap ***");
        gaussian_triangular(&mut out, &self.overlap, false);

        let printed = DMatrix::from_fn(4 * n, 2 * n, |p, j| {
            let value = self.coefficients[(p / 2, j)];
            if p % 2 == 0 {
                value.re
            } else {
                value.im
            }
        });
        gaussian_orbitals(
            &mut out,
            "Molecular Orbital Coefficients:",
            &printed,
            &self.eigenvalues,
            self.n_electron,
            |p| gaussian_label(p / 4),
        );

        for part in [self.density.map(|x| x.re), self.density.map(|x| x.im)] {
            out.line("     Density matrix:");
            gaussian_triangular(&mut out, &part, false);
        }

        gaussian_termination(&mut out);
        out.finish()
    }

    /// A ChronusQ `.out` job with full linear response. The coefficients are
    /// printed as four sets of blocks: alpha real, alpha imaginary, beta
    /// real and beta imaginary.
    pub fn chronus(&self) -> String {
        let n = self.n_basis();
        let mut out = Output::default();

        let options = ["job = resp", "[Response]", "dofull = true"].map(str::to_owned);
        chronus_preamble(&mut out, "complex ghf", n, self.n_electron, &options);

        out.line("  Canonical Molecular Orbital Coefficients");
        for spin in 0..2 {
            let rows = DMatrix::from_fn(n, 2 * n, |i, j| self.coefficients[(2 * i + spin, j)]);
            chronus_orbitals(&mut out, &rows.map(|x| x.re), &self.eigenvalues);
            chronus_orbitals(&mut out, &rows.map(|x| x.im), &self.eigenvalues);
        }
        chronus_roots(&mut out, &self.states, false, true);

        chronus_termination(&mut out);
        out.finish()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    use super::{fortran, labelled_blocks, SyntheticGhf, SyntheticOpenShell, SyntheticRhf};

    #[test]
    fn fortran_numbers_use_d_exponents() {
        assert_eq!(fortran(1.0).trim(), "1.000000D0");
        assert_eq!(fortran(-0.25).trim(), "-2.500000D-1");
    }

    #[test]
    fn labelled_blocks_wrap_columns() {
        let text = labelled_blocks(&DMatrix::from_element(2, 5, 1.0), 4);

        // two headers and two rows per block
        assert_eq!(text.lines().count(), 6);
        assert!(text.lines().nth(1).is_some_and(|line| line.ends_with("1.000000")));
    }

    #[test]
    fn chain_excites_out_of_the_highest_occupied_orbital() {
        let chain = SyntheticRhf::chain(4, 2);

        assert_eq!(chain.states.len(), 2);
        assert_eq!(chain.density, chain.density.transpose());
        let delta = chain.delta_diagonal(1);
        assert_eq!(delta.sum(), 0.0);
        assert!(delta[1] < 0.0 && delta[3] > 0.0);
    }

    #[test]
    fn orbitals_are_orthonormal_in_the_overlap_metric() {
        let chain = SyntheticRhf::chain(5, 2);
        let c = &chain.coefficients;
        assert_relative_eq!(
            c.transpose() * &chain.overlap * c,
            DMatrix::identity(5, 5),
            epsilon = 1e-10
        );

        let ghf = SyntheticGhf::chain(3, 2);
        let overlap = ghf
            .overlap
            .kronecker(&DMatrix::<f64>::identity(2, 2))
            .map(|x| num_complex::Complex64::new(x, 0.0));
        let metric = ghf.coefficients.adjoint() * overlap * &ghf.coefficients;
        for (i, j) in itertools::iproduct!(0..6, 0..6) {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!((metric[(i, j)] - expected).norm() < 1e-10);
        }
    }

    #[test]
    fn open_shell_states_cover_both_spins() {
        let uhf = SyntheticOpenShell::unrestricted(3, 2, 1);
        assert_eq!(uhf.states.len(), 2 + 2);
        assert_eq!(uhf.states.iter().filter(|state| state.contributions[0].beta).count(), 2);

        let (alpha, beta) = uhf.states[3].delta_diagonals(3, 1.0);
        assert_eq!(alpha.sum(), 0.0);
        assert!(beta[0] < 0.0 && beta[2] > 0.0);
    }
}
