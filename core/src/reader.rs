//! Splits a whole output file into independent jobs and indexes each of them.

use std::path::Path;

use crate::{
    dialect::Dialect,
    error::{ExtractError, Result},
    keyword_index::KeywordIndex,
};

/// One calculation run: its lines and the keyword index over them.
#[derive(Debug, Clone)]
pub struct Job {
    dialect: Dialect,
    lines: Vec<String>,
    index: KeywordIndex,
    terminated_normally: bool,
}

impl Job {
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn index(&self) -> &KeywordIndex {
        &self.index
    }

    /// Whether the job ends with its dialect's success marker.
    pub fn terminated_normally(&self) -> bool {
        self.terminated_normally
    }

    /// Number of lines in the job
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The line with the given 1-based number.
    pub fn line(&self, line_number: usize, aspect: &str) -> Result<&str> {
        line_at(&self.lines, line_number, aspect)
    }
}

/// Look up a 1-based line number in a slice of lines.
pub(crate) fn line_at<'a>(
    lines: &'a [String],
    line_number: usize,
    aspect: &str,
) -> Result<&'a str> {
    line_number
        .checked_sub(1)
        .and_then(|index| lines.get(index))
        .map(String::as_str)
        .ok_or_else(|| ExtractError::LineOutOfRange {
            line_number,
            aspect: aspect.to_owned(),
        })
}

/// Accumulates the lines of the job currently being read.
struct JobBuilder {
    dialect: Dialect,
    lines: Vec<String>,
    index: KeywordIndex,
}

impl JobBuilder {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            lines: Vec::new(),
            index: KeywordIndex::new(),
        }
    }

    /// Append a line, indexing its tokens if it is a structural line.
    fn push(&mut self, line: String) {
        self.lines.push(line);
        let line_number = self.lines.len();
        let line = &self.lines[line_number - 1];

        if is_structural(line) {
            for token in line.split_whitespace() {
                // tokens are non-empty and line numbers 1-based
                let _ = self.index.insert(token, line_number);
            }
        }
    }

    fn finish(self, terminated_normally: bool) -> Job {
        if !terminated_normally {
            log::warn!(
                "this {} job was not terminated normally, check that this is the intended .{} file",
                self.dialect,
                self.dialect.extension()
            );
        }

        Job {
            dialect: self.dialect,
            lines: self.lines,
            index: self.index,
            terminated_normally,
        }
    }
}

/// A line is indexed if some token is purely alphabetic or carries `=` or
/// `:`; rows of bare numbers are left out of the index.
fn is_structural(line: &str) -> bool {
    line.split_whitespace().any(|token| {
        !token.chars().all(|c| c.is_numeric())
            && (token.chars().all(char::is_alphabetic)
                || token.contains('=')
                || token.contains(':'))
    })
}

/// Read a file and split it into jobs.
///
/// The dialect is taken from the file suffix unless `dialect` is given.
pub fn read_file(path: impl AsRef<Path>, dialect: Option<Dialect>) -> Result<Vec<Job>> {
    let path = path.as_ref();
    let dialect = dialect
        .or_else(|| Dialect::from_path(path))
        .ok_or_else(|| ExtractError::UnknownDialect(path.to_owned()))?;

    let text = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
        path: path.to_owned(),
        source,
    })?;

    let jobs = segment(&text, dialect);
    log::info!("read {} job(s) from {path:?} as {dialect} output", jobs.len());
    Ok(jobs)
}

/// Split already loaded text into jobs.
pub fn segment(text: &str, dialect: Dialect) -> Vec<Job> {
    match dialect {
        Dialect::Gaussian => segment_gaussian(text),
        Dialect::Chronus => segment_chronus(text),
    }
}

fn segment_gaussian(text: &str) -> Vec<Job> {
    let marker = Dialect::Gaussian.termination_marker();
    let mut jobs = Vec::new();
    let mut current = JobBuilder::new(Dialect::Gaussian);

    for line in text.lines() {
        // read-in geometries print a different header, and connectivity
        // recovery is noise between the header and the atoms
        let line = if line.contains("Redundant internal coordinates found in file")
            || line.contains("Z-Matrix found in chk file")
        {
            "Symbolic Z-matrix:".to_owned()
        } else if line.contains("Recover connectivity data from disk") {
            String::new()
        } else {
            line.to_owned()
        };

        let ends_job = line.contains(marker);
        current.push(line);

        if ends_job {
            let finished = std::mem::replace(&mut current, JobBuilder::new(Dialect::Gaussian));
            jobs.push(finished.finish(true));
        }
    }

    if !current.lines.is_empty() {
        jobs.push(current.finish(false));
    }

    jobs
}

/// Where the reader is relative to the upper-cased input echo of a job.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum EchoState {
    Before,
    /// upper-casing starts at this 1-based line number
    Pending(usize),
    Done,
}

fn segment_chronus(text: &str) -> Vec<Job> {
    let marker = Dialect::Chronus.termination_marker();
    let mut jobs = Vec::new();
    let mut current = JobBuilder::new(Dialect::Chronus);
    let mut echo = EchoState::Before;
    let mut markers_seen = 0;

    for line in text.lines() {
        let mut owned = line.to_owned();

        match echo {
            EchoState::Before if line.contains("Input File") => {
                // the line right after the header is a divider
                echo = EchoState::Pending(current.lines.len() + 3);
            }
            EchoState::Pending(start) if current.lines.len() + 1 >= start => {
                owned = owned.to_uppercase();
                if line.contains("====") {
                    echo = EchoState::Done;
                }
            }
            _ => {}
        }

        if line.contains(marker) {
            markers_seen += 1;
        }
        current.push(owned);

        if markers_seen == 2 {
            let finished = std::mem::replace(&mut current, JobBuilder::new(Dialect::Chronus));
            jobs.push(finished.finish(true));
            echo = EchoState::Before;
            markers_seen = 0;
        }
    }

    if !current.lines.is_empty() {
        jobs.push(current.finish(false));
    }

    jobs
}

#[cfg(test)]
mod tests {
    use super::{is_structural, segment};
    use crate::dialect::Dialect;

    #[test]
    fn numeric_rows_are_not_indexed() {
        assert!(!is_structural("     1   0.100000D+01  -0.2"));
        assert!(!is_structural("   12   13   14"));
        assert!(is_structural(" NAtoms=      3 NActive=      3"));
        assert!(is_structural("     5 alpha electrons        5 beta electrons"));
        assert!(is_structural(" 3/5=1,6=6,116=2/1,2,3;"));
        assert!(!is_structural(""));
    }

    #[test]
    fn gaussian_jobs_split_on_normal_termination() {
        let text = "\
 Entering Gaussian System
 first job
 Normal termination of Gaussian 16
 Entering Gaussian System
 second job
 Normal termination of Gaussian 16
";
        let jobs = segment(text, Dialect::Gaussian);

        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|job| job.terminated_normally()));
        assert_eq!(jobs[1].len(), 3);
        assert_eq!(jobs[1].index().find("second job"), Some(vec![2]));
        // indices are per job
        assert_eq!(jobs[1].index().find("first"), None);
    }

    #[test]
    fn truncated_trailing_job_is_kept_but_flagged() {
        let text = "\
 job one
 Normal termination of Gaussian 16
 job two was cut
";
        let jobs = segment(text, Dialect::Gaussian);

        assert_eq!(jobs.len(), 2);
        assert!(jobs[0].terminated_normally());
        assert!(!jobs[1].terminated_normally());
    }

    #[test]
    fn read_in_geometry_headers_are_normalized() {
        let text = "\
 Redundant internal coordinates found in file.  (old form).
 Recover connectivity data from disk.
 O,0,0.,0.,0.
";
        let jobs = segment(text, Dialect::Gaussian);
        let job = &jobs[0];

        assert_eq!(job.lines()[0], "Symbolic Z-matrix:");
        assert_eq!(job.lines()[1], "");
        assert_eq!(job.index().find("Symbolic Z-matrix"), Some(vec![1]));
        assert_eq!(job.index().find("Recover"), None);
    }

    #[test]
    fn chronus_input_echo_is_uppercased() {
        let text = "\
 Input File:
 ===========
 [Molecule]
 geom:
   o 0.0 0.0 0.0
 ===========
 Reference: real uhf
 ChronusQ Job Ended
 ChronusQ Job Ended
 trailing
";
        let jobs = segment(text, Dialect::Chronus);

        assert_eq!(jobs.len(), 2);
        let job = &jobs[0];
        assert!(job.terminated_normally());
        assert_eq!(job.lines()[2], " [MOLECULE]");
        assert_eq!(job.lines()[4], "   O 0.0 0.0 0.0");
        assert_eq!(job.lines()[6], " Reference: real uhf");
        assert_eq!(job.index().find("GEOM:"), Some(vec![4]));
        assert!(!jobs[1].terminated_normally());
    }

    #[test]
    fn chronus_job_needs_two_markers() {
        let text = "\
 work
 ChronusQ Job Ended
 more report
";
        let jobs = segment(text, Dialect::Chronus);

        assert_eq!(jobs.len(), 1);
        assert!(!jobs[0].terminated_normally());
        assert_eq!(jobs[0].len(), 3);
    }
}
