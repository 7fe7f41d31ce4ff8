//! Companion matrix containers.
//!
//! ChronusQ writes some matrices (the AO overlap, the converged MO
//! coefficients) only to a binary container next to the text output. The
//! container is read here as a JSON document of named row-major matrices:
//!
//! ```json
//! {
//!   "/INTS/OVERLAP": { "rows": 2, "cols": 2, "real": [1.0, 0.66, 0.66, 1.0] },
//!   "/SCF/MO1": { "rows": 2, "cols": 2, "real": [...], "imaginary": [...] }
//! }
//! ```

use std::{collections::HashMap, path::Path};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{
    electron::OrbitalMatrix,
    error::{ExtractError, Result},
    matrix::ops,
};

pub const OVERLAP: &str = "/INTS/OVERLAP";
pub const ALPHA_COEFFICIENTS: &str = "/SCF/MO1";
pub const BETA_COEFFICIENTS: &str = "/SCF/MO2";

/// Named matrix lookups that bypass text decoding.
pub trait MatrixSource {
    /// The matrix stored under `path`, or `None` if there is none.
    fn matrix(&self, path: &str) -> Result<Option<OrbitalMatrix>>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct StoredMatrix {
    rows: usize,
    cols: usize,
    real: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    imaginary: Option<Vec<f64>>,
}

impl StoredMatrix {
    fn from_matrix(matrix: &OrbitalMatrix) -> Self {
        let (rows, cols) = matrix.shape();
        let row_major = |values: Vec<f64>| {
            DMatrix::from_vec(rows, cols, values).transpose().as_slice().to_vec()
        };

        match matrix {
            OrbitalMatrix::Real(real) => Self {
                rows,
                cols,
                real: row_major(real.as_slice().to_vec()),
                imaginary: None,
            },
            OrbitalMatrix::Complex(complex) => Self {
                rows,
                cols,
                real: row_major(complex.iter().map(|x| x.re).collect()),
                imaginary: Some(row_major(complex.iter().map(|x| x.im).collect())),
            },
        }
    }

    fn to_matrix(&self, path: &str) -> Result<OrbitalMatrix> {
        let part = |values: &[f64], name: &str| {
            if values.len() != self.rows * self.cols {
                return Err(ExtractError::count_mismatch(
                    format!("{name} values in {path}"),
                    self.rows * self.cols,
                    values.len(),
                ));
            }
            Ok(DMatrix::from_row_slice(self.rows, self.cols, values))
        };

        let real = part(&self.real, "real")?;
        match &self.imaginary {
            None => Ok(OrbitalMatrix::Real(real)),
            Some(imaginary) => Ok(OrbitalMatrix::Complex(ops::combine_complex(
                &real,
                &part(imaginary, "imaginary")?,
            )?)),
        }
    }
}

/// An in-memory companion container.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatrixArchive {
    matrices: HashMap<String, StoredMatrix>,
}

impl MatrixArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a container from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
            path: path.to_owned(),
            source,
        })?;

        let archive: Self = serde_json::from_str(&text).map_err(|source| ExtractError::Companion {
            path: path.to_owned(),
            source,
        })?;
        log::info!("loaded {} companion matrices from {path:?}", archive.matrices.len());
        Ok(archive)
    }

    pub fn insert(&mut self, path: impl Into<String>, matrix: &OrbitalMatrix) {
        self.matrices.insert(path.into(), StoredMatrix::from_matrix(matrix));
    }

    pub fn contains(&self, path: &str) -> bool {
        self.matrices.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }
}

impl MatrixSource for MatrixArchive {
    fn matrix(&self, path: &str) -> Result<Option<OrbitalMatrix>> {
        self.matrices
            .get(path)
            .map(|stored| stored.to_matrix(path))
            .transpose()
    }
}
