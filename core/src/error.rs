use std::path::PathBuf;

use thiserror::Error;

/// Result type used by every extraction step
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Fatal conditions raised while reading a file or extracting a job.
///
/// Everything except [`ExtractError::Io`] and [`ExtractError::UnknownDialect`]
/// aborts only the job it was raised for.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// A required anchor is absent from the keyword index.
    #[error("`{keyword}` cannot be found, so the {aspect} cannot be read. This is not a valid file of the expected kind")]
    StructuralNotFound { keyword: String, aspect: String },

    /// An anchor pointed at a line that does not exist in the job.
    #[error("line {line_number} is past the end of the job while reading the {aspect}. This is not a valid file of the expected kind")]
    LineOutOfRange { line_number: usize, aspect: String },

    /// The number of located anchors or values disagrees with the expected count.
    #[error("expected {expected} {what} but found {found}. The file is incomplete or corrupt")]
    CountMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    /// A numeric field could not be converted.
    #[error("malformed numeric token `{token}` on line {line_number}: {line}")]
    MalformedNumericToken {
        token: String,
        line_number: usize,
        line: String,
    },

    #[error("unsupported SCF type indicator `{indicator}`")]
    UnsupportedScf { indicator: String },

    /// A job without its success marker, when termination is checked strictly.
    #[error("the {0} job was not terminated normally")]
    AbnormalTermination(crate::dialect::Dialect),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cannot determine the output dialect of {0:?}; expected a .log or .out file")]
    UnknownDialect(PathBuf),

    #[error("the file {path:?} cannot be opened")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("the configuration file {path:?} cannot be read")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("the companion matrix container {path:?} cannot be read")]
    Companion {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ExtractError {
    pub(crate) fn not_found(keyword: impl Into<String>, aspect: impl Into<String>) -> Self {
        Self::StructuralNotFound {
            keyword: keyword.into(),
            aspect: aspect.into(),
        }
    }

    pub(crate) fn count_mismatch(what: impl Into<String>, expected: usize, found: usize) -> Self {
        Self::CountMismatch {
            what: what.into(),
            expected,
            found,
        }
    }

    pub(crate) fn malformed(token: &str, line_number: usize, line: &str) -> Self {
        Self::MalformedNumericToken {
            token: token.to_owned(),
            line_number,
            line: line.to_owned(),
        }
    }
}

/// Non-fatal conditions recorded alongside a job's results.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub enum Warning {
    /// The job does not end with its dialect's success marker.
    AbnormalTermination,
    /// A matrix is only available from a companion container that was not supplied.
    MissingCompanion { matrix: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AbnormalTermination => {
                write!(f, "the job was not terminated normally")
            }
            Self::MissingCompanion { matrix } => {
                let hint = "pass a companion matrix container";
                write!(f, "{matrix} is not printed in the output; {hint}")
            }
        }
    }
}
