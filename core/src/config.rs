use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    dialect::Dialect,
    error::{ExtractError, Result},
};

/// Options of a parse run, usually read from a JSON file.
///
/// ```json
/// { "dialect": "chronus", "companion": "h2o.bin.json", "population": true }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseConfig {
    /// Use this dialect instead of guessing it from the file suffix.
    pub dialect: Option<Dialect>,
    /// Companion matrix container for matrices the text output lacks.
    pub companion: Option<PathBuf>,
    pub population: bool,
    pub excitations: bool,
    /// Fail jobs that do not end with the success marker instead of warning.
    pub strict_termination: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            dialect: None,
            companion: None,
            population: true,
            excitations: true,
            strict_termination: false,
        }
    }
}

impl ParseConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ExtractError::Io {
            path: path.to_owned(),
            source,
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|source| ExtractError::Config {
            path: path.to_owned(),
            source,
        })
    }
}
