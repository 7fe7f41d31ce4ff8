//! Small helpers for pulling whitespace separated fields out of a line.

use std::str::FromStr;

use crate::error::{ExtractError, Result};

/// The `n`-th (0-based) whitespace separated field of a line.
pub(crate) fn field<'a>(
    line: &'a str,
    n: usize,
    line_number: usize,
    aspect: &str,
) -> Result<&'a str> {
    line.split_whitespace().nth(n).ok_or_else(|| {
        ExtractError::not_found(format!("field {} of line {line_number}", n + 1), aspect)
    })
}

pub(crate) fn number<T: FromStr>(token: &str, line_number: usize, line: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| ExtractError::malformed(token, line_number, line))
}

/// Parse the `n`-th field of a line as a number.
pub(crate) fn number_field<T: FromStr>(
    line: &str,
    n: usize,
    line_number: usize,
    aspect: &str,
) -> Result<T> {
    number(field(line, n, line_number, aspect)?, line_number, line)
}

/// The number printed right before the first field equal to `word`,
/// as in `5 alpha electrons`.
pub(crate) fn number_before<T: FromStr>(line: &str, word: &str, line_number: usize) -> Result<T> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let position = fields
        .iter()
        .position(|&field| field == word)
        .filter(|&position| position > 0)
        .ok_or_else(|| ExtractError::not_found(word, format!("count on line {line_number}")))?;
    number(fields[position - 1], line_number, line)
}

/// The number following `keyword` on a line, skipping `=` and `:` separators,
/// as in `NBasis = 24`.
pub(crate) fn number_after<T: FromStr>(line: &str, keyword: &str, line_number: usize) -> Result<T> {
    let rest = line
        .find(keyword)
        .map(|position| &line[position + keyword.len()..])
        .ok_or_else(|| ExtractError::not_found(keyword, format!("value on line {line_number}")))?;

    let token = rest
        .trim_start_matches(|c: char| c.is_whitespace() || c == '=' || c == ':')
        .split_whitespace()
        .next()
        .ok_or_else(|| ExtractError::not_found(keyword, format!("value on line {line_number}")))?;
    number(token, line_number, line)
}

#[cfg(test)]
mod tests {
    use super::{field, number_after, number_before, number_field};

    #[test]
    fn fields_and_numbers() {
        let line = " NAtoms=      3 NQM=        3";
        assert_eq!(field(line, 0, 7, "atoms").unwrap(), "NAtoms=");
        assert_eq!(number_field::<usize>(line, 1, 7, "atoms").unwrap(), 3);
        assert!(field(line, 9, 7, "atoms").is_err());
        assert!(number_field::<usize>(line, 0, 7, "atoms").is_err());
    }

    #[test]
    fn numbers_around_words() {
        let counts =
            "    24 basis functions,    48 primitive gaussians,    25 cartesian basis functions";
        assert_eq!(number_before::<usize>(counts, "basis", 1).unwrap(), 24);
        assert_eq!(number_before::<usize>(counts, "primitive", 1).unwrap(), 48);
        assert!(number_before::<usize>(counts, "alpha", 1).is_err());

        assert_eq!(number_after::<usize>("  NBasis        = 24", "NBasis", 1).unwrap(), 24);
        assert_eq!(
            number_after::<usize>("  Total Electrons:   10", "Total Electrons", 1).unwrap(),
            10
        );
    }
}
