//! Decoding of matrices printed as fixed-width column blocks.
//!
//! Programs print wide matrices in blocks of at most `K` columns. Each block
//! repeats the row labels, so a row is decoded by cutting off a label prefix
//! and splitting the remainder on whitespace:
//!
//! ```text
//!                           1         2         3         4         5
//!     1 1   O  1S          0.99421  -0.23376   0.00000  -0.10403   0.00000
//!     2        2S          0.02585   0.84442   0.00000   0.53815   0.00000
//!                           6         7
//!     1 1   O  1S         -0.13023   0.00000
//!     2        2S          0.83519   0.00000
//! ```
//!
//! Every decoding step takes an explicit starting line and returns the line
//! where the next step should continue.

pub mod ops;

use nalgebra::DMatrix;

use crate::{
    error::{ExtractError, Result},
    reader::line_at,
};

/// Printed in place of a number too wide for its field.
const OVERFLOW: &str = "**********";

/// How the label prefix of a row is located in the first row of a matrix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrefixAnchor {
    /// first occurrence of the character
    First(char),
    /// last occurrence of the character
    Last(char),
    /// the start of the line; the prefix is the offset alone
    Start,
}

/// Geometry of a printed block matrix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockSpec {
    /// maximum number of columns printed side by side
    pub columns: usize,
    /// header lines between the last row of a block and the first row of the next
    pub block_skip: usize,
    pub anchor: PrefixAnchor,
    /// added to the anchor position to get the prefix width
    pub offset: usize,
    /// character used instead of `E` for floating point exponents
    pub exponent_marker: Option<char>,
}

impl BlockSpec {
    /// Width of the label prefix, measured on a row of the matrix.
    pub fn prefix_width(&self, line: &str) -> Option<usize> {
        let position = match self.anchor {
            PrefixAnchor::First(c) => line.find(c),
            PrefixAnchor::Last(c) => line.rfind(c),
            PrefixAnchor::Start => Some(0),
        }?;
        Some(position + self.offset)
    }

    pub(crate) fn require_prefix_width(&self, line: &str, line_number: usize) -> Result<usize> {
        self.prefix_width(line).ok_or_else(|| {
            let anchor = match self.anchor {
                PrefixAnchor::First(c) | PrefixAnchor::Last(c) => format!("'{c}'"),
                PrefixAnchor::Start => "line start".to_owned(),
            };
            ExtractError::not_found(
                anchor,
                format!("row label prefix of the matrix starting on line {line_number}"),
            )
        })
    }
}

/// How many values each row of a block carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RowWidth {
    /// every row fills the block
    Full,
    /// row `r` of a block of a lower triangle carries `r + 1` values, up to the block width
    Lower,
}

impl RowWidth {
    fn expected(self, row: usize, columns: usize) -> usize {
        match self {
            RowWidth::Full => columns,
            RowWidth::Lower => (row + 1).min(columns),
        }
    }
}

/// A decoded value together with the line the next decoding step starts at.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded<T> {
    pub value: T,
    pub next_line: usize,
}

/// Decode the numbers of a single printed row.
///
/// Overflow fields become NaN, the dialect exponent marker is read as `E`,
/// and a minus sign glued to a preceding number starts a new value.
pub fn parse_row(
    line: &str,
    line_number: usize,
    prefix: usize,
    exponent_marker: Option<char>,
) -> Result<Vec<f64>> {
    let body = if prefix >= line.len() {
        ""
    } else {
        line.get(prefix..)
            .ok_or_else(|| ExtractError::malformed(line, line_number, line))?
    };

    normalize(body, exponent_marker)
        .split_whitespace()
        .map(|token| {
            parse_value(token).ok_or_else(|| ExtractError::malformed(token, line_number, line))
        })
        .collect()
}

fn normalize(body: &str, exponent_marker: Option<char>) -> String {
    let body = body.replace(OVERFLOW, " nan ").replace('*', " ");

    let mut normalized = String::with_capacity(body.len() + 8);
    let mut previous = None;
    for c in body.chars() {
        let c = if Some(c) == exponent_marker { 'E' } else { c };
        if c == '-' && previous.is_some_and(|p: char| p.is_ascii_digit() || p == '.') {
            normalized.push(' ');
        }
        normalized.push(c);
        previous = Some(c);
    }
    normalized
}

fn parse_value(token: &str) -> Option<f64> {
    if token == "nan" {
        return Some(f64::NAN);
    }
    token.parse().ok()
}

/// Decode `rows` rows of a block `columns` wide starting at `start`.
///
/// Each row must carry exactly the number of values `width` gives it;
/// values missing from a row are never filled in. Blank lines between rows
/// are skipped without counting as rows. The returned cursor skips blank
/// lines after the block and then `spec.block_skip` header lines.
pub fn decode_block(
    lines: &[String],
    start: usize,
    rows: usize,
    columns: usize,
    width: RowWidth,
    prefix: usize,
    spec: &BlockSpec,
) -> Result<Decoded<DMatrix<f64>>> {
    let mut block = DMatrix::zeros(rows, columns);
    let mut cursor = start;

    for row in 0..rows {
        let mut line = line_at(lines, cursor, "matrix row")?;
        while line.trim().is_empty() {
            cursor += 1;
            line = line_at(lines, cursor, "matrix row")?;
        }

        let values = parse_row(line, cursor, prefix, spec.exponent_marker)?;
        let expected = width.expected(row, columns);
        if values.len() != expected {
            return Err(ExtractError::count_mismatch(
                format!("values on matrix row (line {cursor})"),
                expected,
                values.len(),
            ));
        }
        log::trace!("line {cursor}: {values:?}");

        for (column, value) in values.into_iter().enumerate() {
            block[(row, column)] = value;
        }
        cursor += 1;
    }

    while lines
        .get(cursor.wrapping_sub(1))
        .is_some_and(|line| line.trim().is_empty())
    {
        cursor += 1;
    }

    Ok(Decoded {
        value: block,
        next_line: cursor + spec.block_skip,
    })
}

/// Decode a `rows` x `columns` matrix printed in consecutive blocks.
///
/// The label prefix is measured once on the first row, at `start`.
pub fn decode_matrix(
    lines: &[String],
    start: usize,
    rows: usize,
    columns: usize,
    spec: &BlockSpec,
) -> Result<Decoded<DMatrix<f64>>> {
    decode_blocks(lines, start, rows, columns, spec, false)
}

/// Decode a symmetric `n` x `n` matrix printed as its lower triangle.
///
/// Each successive block is `K` rows shorter than the previous one. The
/// result is `M + Mᵀ` with the diagonal of `M` restored.
pub fn decode_triangular(
    lines: &[String],
    start: usize,
    n: usize,
    spec: &BlockSpec,
) -> Result<Decoded<DMatrix<f64>>> {
    let Decoded { value, next_line } = decode_blocks(lines, start, n, n, spec, true)?;
    Ok(Decoded {
        value: ops::symmetrize_lower(&value),
        next_line,
    })
}

fn decode_blocks(
    lines: &[String],
    start: usize,
    rows: usize,
    columns: usize,
    spec: &BlockSpec,
    triangular: bool,
) -> Result<Decoded<DMatrix<f64>>> {
    if spec.columns == 0 {
        return Err(ExtractError::InvalidArgument(
            "a block must have at least one column".to_owned(),
        ));
    }

    let mut matrix = DMatrix::zeros(rows, columns);
    let prefix = spec.require_prefix_width(line_at(lines, start, "matrix")?, start)?;
    let cycles = columns.div_ceil(spec.columns);
    let mut cursor = start;

    for cycle in 0..cycles {
        let first_column = cycle * spec.columns;
        let block_columns = spec.columns.min(columns - first_column);
        let (block_rows, width) = if triangular {
            (rows - first_column, RowWidth::Lower)
        } else {
            (rows, RowWidth::Full)
        };

        let Decoded { value, next_line } =
            decode_block(lines, cursor, block_rows, block_columns, width, prefix, spec)?;
        matrix
            .view_mut((rows - block_rows, first_column), (block_rows, block_columns))
            .copy_from(&value);
        cursor = next_line;
    }

    Ok(Decoded {
        value: matrix,
        next_line: cursor,
    })
}
