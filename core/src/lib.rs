pub mod archive;
pub mod basic;
pub mod config;
pub mod dialect;
pub mod electron;
pub mod error;
pub mod excitation;
mod fields;
pub mod keyword_index;
pub mod matrix;
pub mod options;
pub mod pipeline;
pub mod population;
pub mod reader;
pub mod result;
pub mod testing;

pub use config::ParseConfig;
pub use dialect::{Dialect, ScfVariant};
pub use error::{ExtractError, Result, Warning};
pub use pipeline::{extract_job, parse_file};
pub use result::ParsedJob;
