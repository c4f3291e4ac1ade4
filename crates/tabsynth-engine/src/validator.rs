//! Structural validation of uploaded tables
//!
//! Uploads are untrusted. Before a file is persisted we look at its first three
//! lines and require:
//!
//! 1. a `.csv` file name (checked first, no I/O needed)
//! 2. a header row, decided by the classic "has header" vote
//! 3. a comma delimiter
//! 4. header cells made only of ASCII alphanumerics and `. - : , _`
//!
//! The stream is rewound to position 0 whether validation passes or not.

use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use thiserror::Error;

/// Number of lines inspected from the head of the upload.
pub const SAMPLE_LINES: usize = 3;

/// Delimiters considered by the sniffer, in order of preference.
const CANDIDATE_DELIMITERS: [char; 6] = [',', '\t', ';', '|', ':', ' '];

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("The file must be a csv file.")]
    WrongExtension,

    #[error("The file must start with a header row.")]
    MissingHeader,

    #[error("The file must be comma separated (found '{0}').")]
    Delimiter(char),

    #[error("Header contains an illegal character '{0}'.")]
    IllegalHeaderCharacter(char),

    #[error("The file is not readable text.")]
    Unreadable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validate an uploaded table and leave `stream` at position 0.
pub fn validate<R: Read + Seek>(filename: &str, stream: &mut R) -> Result<(), ValidationError> {
    if !has_csv_extension(filename) {
        return Err(ValidationError::WrongExtension);
    }

    let outcome = read_sample(stream).and_then(|sample| check_sample(&sample));
    stream.seek(SeekFrom::Start(0))?;
    outcome
}

/// The text after the last `.` must be exactly `csv`.
pub fn has_csv_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext == "csv")
}

fn read_sample<R: Read>(stream: &mut R) -> Result<Vec<String>, ValidationError> {
    let mut reader = BufReader::new(stream);
    let mut lines = Vec::with_capacity(SAMPLE_LINES);

    for _ in 0..SAMPLE_LINES {
        let mut raw = Vec::new();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        let line = String::from_utf8(raw).map_err(|_| ValidationError::Unreadable)?;
        let line = line.trim_end_matches(['\n', '\r']);
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }

    Ok(lines)
}

fn check_sample(lines: &[String]) -> Result<(), ValidationError> {
    let header = lines.first().ok_or(ValidationError::MissingHeader)?;

    let delimiter = sniff_delimiter(lines);
    if !has_header(lines, delimiter) {
        return Err(ValidationError::MissingHeader);
    }
    if delimiter != ',' {
        return Err(ValidationError::Delimiter(delimiter));
    }
    if let Some(bad) = header.chars().find(|c| !is_header_char(*c)) {
        return Err(ValidationError::IllegalHeaderCharacter(bad));
    }

    Ok(())
}

fn is_header_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | ',' | '_')
}

/// Occurrences of `delimiter` outside double-quoted sections.
fn count_unquoted(line: &str, delimiter: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for c in line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Guess the delimiter of a sample.
///
/// A candidate that appears the same, non-zero number of times on every line
/// wins, in preference order. Otherwise the candidate most frequent on the
/// header line is used. A sample without any candidate is a single comma column.
pub fn sniff_delimiter(lines: &[String]) -> char {
    let consistent = CANDIDATE_DELIMITERS.iter().copied().find(|&d| {
        let mut counts = lines.iter().map(|l| count_unquoted(l, d));
        match counts.next() {
            Some(first) if first > 0 => counts.all(|c| c == first),
            _ => false,
        }
    });
    if let Some(delimiter) = consistent {
        return delimiter;
    }

    let Some(header) = lines.first() else {
        return ',';
    };
    CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .map(|d| (d, count_unquoted(header, d)))
        .filter(|(_, n)| *n > 0)
        // max_by_key keeps the last maximum; reverse so earlier candidates win ties
        .rev()
        .max_by_key(|(_, n)| *n)
        .map(|(d, _)| d)
        .unwrap_or(',')
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CellKind {
    Numeric,
    Length(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnVote {
    Unseen,
    Kind(CellKind),
    Inconsistent,
}

fn cell_kind(cell: &str) -> CellKind {
    if cell.trim().parse::<f64>().is_ok() {
        CellKind::Numeric
    } else {
        CellKind::Length(cell.chars().count())
    }
}

fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(line.as_bytes());

    reader
        .records()
        .next()
        .and_then(|r| r.ok())
        .map(|record| record.iter().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Decide whether the first sampled line is a header.
///
/// Each column of the data rows is typed as numeric or as a fixed length.
/// Columns typed inconsistently abstain. Every other column votes for a header
/// when the first line's cell does not fit that type, and against otherwise.
/// A column without data rows votes for a header.
pub fn has_header(lines: &[String], delimiter: char) -> bool {
    let Some((first, data)) = lines.split_first() else {
        return false;
    };
    let header = split_line(first, delimiter);
    let mut votes = vec![ColumnVote::Unseen; header.len()];

    for line in data {
        let row = split_line(line, delimiter);
        if row.len() != header.len() {
            continue;
        }
        for (vote, cell) in votes.iter_mut().zip(&row) {
            let kind = cell_kind(cell);
            *vote = match *vote {
                ColumnVote::Unseen => ColumnVote::Kind(kind),
                ColumnVote::Kind(seen) if seen == kind => ColumnVote::Kind(seen),
                _ => ColumnVote::Inconsistent,
            };
        }
    }

    let score: i64 = votes
        .iter()
        .zip(&header)
        .map(|(vote, cell)| match vote {
            ColumnVote::Unseen => 1,
            ColumnVote::Inconsistent => 0,
            ColumnVote::Kind(kind) => {
                if cell_kind(cell) == *kind {
                    -1
                } else {
                    1
                }
            },
        })
        .sum();

    score > 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(name: &str, body: &str) -> Result<(), ValidationError> {
        let mut cursor = Cursor::new(body.as_bytes().to_vec());
        let result = validate(name, &mut cursor);
        assert_eq!(cursor.position(), 0, "stream must be rewound");
        result
    }

    #[test]
    fn test_accepts_plain_csv() {
        run("data.csv", "a,b,c\n1,2,3\n4,5,6\n").unwrap();
    }

    #[test]
    fn test_extension_checked_first() {
        // Body would also fail the delimiter check
        let err = run("data.txt", "a;b\n1;2\n").unwrap_err();
        assert!(matches!(err, ValidationError::WrongExtension));
        assert!(matches!(
            run("csv", "a,b\n1,2\n").unwrap_err(),
            ValidationError::WrongExtension
        ));
        assert!(matches!(
            run("data.CSV", "a,b\n1,2\n").unwrap_err(),
            ValidationError::WrongExtension
        ));
    }

    #[test]
    fn test_missing_header() {
        let err = run("nums.csv", "1,2,3\n4,5,6\n7,8,9\n").unwrap_err();
        assert!(matches!(err, ValidationError::MissingHeader));
        assert!(matches!(
            run("empty.csv", "").unwrap_err(),
            ValidationError::MissingHeader
        ));
    }

    #[test]
    fn test_semicolon_rejected() {
        let err = run("semi.csv", "a;b\n1;2\n").unwrap_err();
        assert!(matches!(err, ValidationError::Delimiter(';')));
    }

    #[test]
    fn test_illegal_header_character() {
        let err = run("space.csv", "first name,age\nann,3\nbob,4\n").unwrap_err();
        assert!(matches!(err, ValidationError::IllegalHeaderCharacter(' ')));

        let err = run("hash.csv", "a#,b\nx,1\ny,2\n").unwrap_err();
        assert!(matches!(err, ValidationError::IllegalHeaderCharacter('#')));
    }

    #[test]
    fn test_allowed_header_punctuation() {
        run("ok.csv", "col.a,col-b,col:c,col_d\n1,2,3,4\n5,6,7,8\n").unwrap();
    }

    #[test]
    fn test_crlf_and_string_columns() {
        run("iris.csv", "sepal_length,species\r\n5.1,setosa\r\n4.9,setosa\r\n").unwrap();
    }

    #[test]
    fn test_rewinds_after_failure_and_success() {
        let mut cursor = Cursor::new(b"x;y\n1;2\n".to_vec());
        assert!(validate("f.csv", &mut cursor).is_err());
        let mut rest = String::new();
        cursor.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "x;y\n1;2\n");
    }

    #[test]
    fn test_sniff_delimiter() {
        let lines = |s: &str| s.lines().map(str::to_string).collect::<Vec<_>>();
        assert_eq!(sniff_delimiter(&lines("a,b\n1,2")), ',');
        assert_eq!(sniff_delimiter(&lines("a\tb\n1\t2")), '\t');
        assert_eq!(sniff_delimiter(&lines("\"x,y\";b\n1;2")), ';');
        assert_eq!(sniff_delimiter(&lines("single\n1\n2")), ',');
    }

    #[test]
    fn test_has_header_votes() {
        let lines = |s: &str| s.lines().map(str::to_string).collect::<Vec<_>>();
        assert!(has_header(&lines("name,age\nann,31\nbob,42"), ','));
        assert!(!has_header(&lines("10,20\n30,40\n50,60"), ','));
        // Header only: every column is unseen
        assert!(has_header(&lines("a,b"), ','));
    }
}
