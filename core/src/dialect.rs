use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::matrix::{BlockSpec, PrefixAnchor};

/// The program that produced an output file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Gaussian `.log` output
    Gaussian,
    /// ChronusQ `.out` output
    Chronus,
}

impl Dialect {
    /// Guess the dialect from a file name suffix.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        match path.as_ref().extension()?.to_str()? {
            "log" => Some(Self::Gaussian),
            "out" => Some(Self::Chronus),
            _ => None,
        }
    }

    /// The marker that closes a job
    pub fn termination_marker(self) -> &'static str {
        match self {
            Self::Gaussian => "Normal termination",
            Self::Chronus => "ChronusQ Job Ended",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Gaussian => "log",
            Self::Chronus => "out",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gaussian => write!(f, "Gaussian"),
            Self::Chronus => write!(f, "ChronusQ"),
        }
    }
}

/// The self-consistent-field family of a calculation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScfVariant {
    Rhf,
    Rohf,
    Uhf,
    Ghf,
}

impl ScfVariant {
    /// Decode a Gaussian IOp(3/116) value.
    pub fn from_iop(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Rhf),
            101 => Some(Self::Rohf),
            2 => Some(Self::Uhf),
            7 => Some(Self::Ghf),
            _ => None,
        }
    }

    /// Decode a method label such as `RB3LYP`, `ROHF`, `UHF` or `X2C`.
    ///
    /// Only the first one or two characters are significant.
    pub fn from_indicator(label: &str) -> Option<Self> {
        let mut chars = label.chars();
        match (chars.next()?, chars.next()) {
            ('R', Some('O')) => Some(Self::Rohf),
            ('R', _) => Some(Self::Rhf),
            ('U', _) => Some(Self::Uhf),
            ('G' | 'X', _) => Some(Self::Ghf),
            _ => None,
        }
    }

    /// Closed or restricted-open shell: both spins share spatial orbitals.
    pub fn is_restricted(self) -> bool {
        matches!(self, Self::Rhf | Self::Rohf)
    }

    /// Generalized spin orbitals carry complex coefficients.
    pub fn is_complex(self) -> bool {
        self == Self::Ghf
    }

    /// How many basis-sized orbital sets make up one set of MOs.
    pub fn spin_factor(self) -> usize {
        if self.is_complex() {
            2
        } else {
            1
        }
    }

    /// Block offset multiplier of nuclear-electronic (NEO) ChronusQ output.
    pub(crate) fn neo_blocks(self) -> usize {
        match self {
            Self::Rhf => 1,
            Self::Rohf | Self::Uhf => 2,
            Self::Ghf => 4,
        }
    }
}

impl std::fmt::Display for ScfVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Rhf => "RHF",
            Self::Rohf => "ROHF",
            Self::Uhf => "UHF",
            Self::Ghf => "GHF",
        };
        write!(f, "{name}")
    }
}

/// Per-job capability table: where things are printed and how they are laid
/// out for one (dialect, SCF variant) pair. Built once per job and handed to
/// every extractor.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub dialect: Dialect,
    pub variant: ScfVariant,
    /// Header anchoring each MO coefficient block; it carries the eigenvalues.
    pub eigenvalue_keyword: &'static str,
    /// Lines between an eigenvalue header and the first coefficient row.
    pub coefficient_offset: usize,
    /// Geometry of MO coefficient blocks.
    pub coefficients: BlockSpec,
    /// Geometry of lower-triangular (overlap, density) blocks.
    pub triangular: BlockSpec,
    /// Geometry of lower-triangular blocks labelled with AO names.
    pub labelled_triangular: BlockSpec,
    /// Scale of squared amplitudes in delta diagonals.
    pub excitation_multiplier: f64,
}

impl Layout {
    pub fn new(dialect: Dialect, variant: ScfVariant) -> Self {
        let excitation_multiplier = if variant.is_restricted() { 2.0 } else { 1.0 };

        match dialect {
            Dialect::Gaussian => Self {
                dialect,
                variant,
                eigenvalue_keyword: "Eigenvalues",
                coefficient_offset: 1,
                coefficients: BlockSpec {
                    columns: 5,
                    block_skip: 3,
                    anchor: PrefixAnchor::Last('S'),
                    offset: 6,
                    exponent_marker: Some('D'),
                },
                triangular: BlockSpec {
                    columns: 5,
                    block_skip: 1,
                    anchor: PrefixAnchor::First('1'),
                    offset: 2,
                    exponent_marker: Some('D'),
                },
                labelled_triangular: BlockSpec {
                    columns: 5,
                    block_skip: 1,
                    anchor: PrefixAnchor::Last('S'),
                    offset: 6,
                    exponent_marker: Some('D'),
                },
                excitation_multiplier,
            },
            Dialect::Chronus => Self {
                dialect,
                variant,
                eigenvalue_keyword: "EigV",
                coefficient_offset: 2,
                coefficients: BlockSpec {
                    columns: 4,
                    block_skip: 4,
                    anchor: PrefixAnchor::Last('S'),
                    offset: 6,
                    exponent_marker: None,
                },
                triangular: BlockSpec {
                    columns: 4,
                    block_skip: 1,
                    anchor: PrefixAnchor::First('1'),
                    offset: 2,
                    exponent_marker: None,
                },
                labelled_triangular: BlockSpec {
                    columns: 4,
                    block_skip: 1,
                    anchor: PrefixAnchor::Last('S'),
                    offset: 6,
                    exponent_marker: None,
                },
                excitation_multiplier,
            },
        }
    }

    /// Number of printed blocks needed for `n_columns` MO columns.
    pub fn cycles(&self, n_columns: usize) -> usize {
        n_columns.div_ceil(self.coefficients.columns)
    }

    /// Spec of the eigenvalue header lines: values follow the `--` marker.
    pub fn eigenvalue_spec(&self) -> BlockSpec {
        BlockSpec {
            anchor: PrefixAnchor::First('-'),
            offset: 2,
            block_skip: 0,
            ..self.coefficients
        }
    }
}
