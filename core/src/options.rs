//! Calculation options echoed into the output.
//!
//! Gaussian prints internal options (IOps) on the link lines of each overlay,
//! e.g. ` 3/5=1,6=6,116=2/1,2,3;`, after the route section. ChronusQ echoes
//! its upper-cased input as `KEY = VALUE` lines.

use std::collections::HashMap;

use crate::{
    error::{ExtractError, Result},
    fields,
    reader::Job,
};

/// The IOps set on one Gaussian overlay link line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IopTable {
    overlay: u32,
    line_number: usize,
    values: HashMap<u32, i64>,
}

impl IopTable {
    /// Locate and parse the link line of `overlay`.
    ///
    /// Returns `None` when the job has no link line for the overlay.
    pub fn locate(job: &Job, overlay: u32) -> Result<Option<Self>> {
        let prefix = format!("{overlay}/");
        let Some(candidates) = job.index().find(&prefix) else {
            return Ok(None);
        };

        let route_end = route_section_end(job);
        let found = candidates
            .into_iter()
            .filter(|&line_number| line_number > route_end)
            .find_map(|line_number| {
                let line = job.lines().get(line_number - 1)?;
                line.trim_start()
                    .starts_with(&prefix)
                    .then_some((line_number, line))
            });

        let Some((line_number, line)) = found else {
            return Ok(None);
        };

        let table = Self::parse(overlay, line_number, line)?;
        log::debug!("overlay {overlay} link line {line_number}: {:?}", table.values);
        Ok(Some(table))
    }

    fn parse(overlay: u32, line_number: usize, line: &str) -> Result<Self> {
        let compact: String = line.split_whitespace().collect();
        let mut values = HashMap::new();

        for assignment in compact.split(['/', ',']) {
            let Some((option, value)) = assignment.split_once('=') else {
                continue;
            };
            let option = fields::number(option, line_number, line)?;
            let value = fields::number(value, line_number, line)?;
            values.insert(option, value);
        }

        Ok(Self {
            overlay,
            line_number,
            values,
        })
    }

    pub fn overlay(&self) -> u32 {
        self.overlay
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn get(&self, option: u32) -> Option<i64> {
        self.values.get(&option).copied()
    }
}

/// Value of IOp `overlay/option`, if the overlay and the option are printed.
pub fn iop(job: &Job, overlay: u32, option: u32) -> Result<Option<i64>> {
    Ok(IopTable::locate(job, overlay)?.and_then(|table| table.get(option)))
}

/// The divider closing the route section; link lines come after it.
fn route_section_end(job: &Job) -> usize {
    let Some(route) = job.index().first("#") else {
        return 0;
    };

    job.lines()
        .iter()
        .enumerate()
        .skip(route - 1)
        .find(|(_, line)| line.contains("----"))
        .map_or(route, |(index, _)| index + 1)
}

/// The first `KEY = VALUE` echo line whose key is exactly `key`.
///
/// The index matches token prefixes, so `NEO` alone would also find
/// `NEOSCF = ...`.
fn chronus_option_line<'a>(job: &'a Job, key: &str) -> Option<(usize, &'a str)> {
    job.index().find(key)?.into_iter().find_map(|line_number| {
        let line = job.lines().get(line_number - 1)?;
        (line.split_whitespace().next() == Some(key)).then_some((line_number, line.as_str()))
    })
}

/// The raw value of a ChronusQ `KEY = VALUE` echo line.
pub fn chronus_option<'a>(job: &'a Job, key: &str) -> Option<&'a str> {
    let (_, line) = chronus_option_line(job, key)?;
    line.split_whitespace().nth(2)
}

/// A ChronusQ option parsed as an integer.
pub fn chronus_integer(job: &Job, key: &str) -> Result<Option<i64>> {
    let Some((line_number, line)) = chronus_option_line(job, key) else {
        return Ok(None);
    };
    let Some(value) = line.split_whitespace().nth(2) else {
        return Ok(None);
    };

    value
        .parse()
        .map(Some)
        .map_err(|_| ExtractError::malformed(value, line_number, line))
}

#[cfg(test)]
mod tests {
    use super::{chronus_integer, chronus_option, iop, IopTable};
    use crate::{dialect::Dialect, reader::segment};

    const ROUTE: &str = "\
 %chk=water.chk
 ----------------------------------
 #p hf/sto-3g pop=full iop(3/33=1)
 ----------------------------------
 1/38=1,57=2/1;
 2/12=2,17=6,18=5,40=1/2;
 3/6=3,11=9,25=1,30=1,33=1,116=-2/1,2,3;
 9/41=3,42=1/14;
 Normal termination of Gaussian 16
";

    #[test]
    fn link_lines_are_parsed_after_the_route() {
        let jobs = segment(ROUTE, Dialect::Gaussian);
        let job = &jobs[0];

        let overlay = IopTable::locate(job, 3).unwrap().unwrap();
        assert_eq!(overlay.line_number(), 7);
        assert_eq!(overlay.get(116), Some(-2));
        assert_eq!(overlay.get(33), Some(1));
        assert_eq!(overlay.get(117), None);

        assert_eq!(iop(job, 9, 41).unwrap(), Some(3));
        assert_eq!(iop(job, 9, 6).unwrap(), None);
        assert_eq!(iop(job, 4, 1).unwrap(), None);
    }

    #[test]
    fn chronus_options_read_the_third_field() {
        let text = "\
 Input File:
 ===========
 [Response]
 nroots = 4
 dofull = false
 ===========
";
        let jobs = segment(text, Dialect::Chronus);
        let job = &jobs[0];

        assert_eq!(chronus_option(job, "DOFULL"), Some("FALSE"));
        assert_eq!(chronus_integer(job, "NROOTS").unwrap(), Some(4));
        assert_eq!(chronus_integer(job, "OSCISTREN").unwrap(), None);
        assert!(chronus_integer(job, "DOFULL").is_err());
    }

    #[test]
    fn chronus_option_keys_match_whole_words() {
        let text = "\
 Input File:
 ===========
 [QM]
 neoscf = true
 nrootsmax = 12
 [Misc]
 neo = false
 ===========
";
        let jobs = segment(text, Dialect::Chronus);
        let job = &jobs[0];

        assert_eq!(chronus_option(job, "NEO"), Some("FALSE"));
        assert_eq!(chronus_option(job, "NEOSCF"), Some("TRUE"));
        assert_eq!(chronus_integer(job, "NROOTS").unwrap(), None);
        assert_eq!(chronus_integer(job, "NROOTSMAX").unwrap(), Some(12));
    }
}
