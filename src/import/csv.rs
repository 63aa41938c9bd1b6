//! Delimited text loader
//!
//! Reads the whole file into a [`Table`]. Cells matching a null token become
//! `None`; everything else is kept as raw text for the classifier.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use super::{ImportError, read_text};
use crate::inference::formats::is_null_token;
use crate::table::Table;

/// Bytes inspected when sniffing the delimiter
pub const SNIFF_SAMPLE_BYTES: usize = 8192;

/// Delimiters considered by the sniffer, in tie-break order
pub const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Field delimiter selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delimiter {
    /// Sniff from the start of the file
    #[default]
    Auto,
    /// Use this byte
    Byte(u8),
}

impl FromStr for Delimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" | "" => Ok(Delimiter::Auto),
            "tab" | "\\t" | "\t" => Ok(Delimiter::Byte(b'\t')),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii() => Ok(Delimiter::Byte(c as u8)),
                    _ => Err(format!(
                        "invalid delimiter '{}' (expected auto, tab or a single ASCII character)",
                        s
                    )),
                }
            }
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Auto => f.write_str("auto"),
            Delimiter::Byte(b'\t') => f.write_str("\\t"),
            Delimiter::Byte(b) => write!(f, "{}", *b as char),
        }
    }
}

/// A loaded table and the delimiter it was read with
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable {
    pub table: Table,
    pub delimiter: u8,
}

/// Count delimiter occurrences outside double quotes
fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut quoted = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            quoted = !quoted;
        } else if byte == delimiter && !quoted {
            count += 1;
        }
    }
    count
}

/// Pick the delimiter that splits every sampled line the same non-zero
/// number of times
///
/// Falls back to `,` for an empty sample or when no candidate is consistent.
pub fn sniff_delimiter(sample: &str, truncated: bool) -> u8 {
    let mut lines: Vec<&str> = sample.lines().filter(|l| !l.trim().is_empty()).collect();
    if truncated && lines.len() > 1 {
        lines.pop();
    }
    if lines.is_empty() {
        return b',';
    }

    DELIMITER_CANDIDATES
        .into_iter()
        .find(|&candidate| {
            let first = count_unquoted(lines[0], candidate);
            first > 0 && lines.iter().all(|l| count_unquoted(l, candidate) == first)
        })
        .unwrap_or(b',')
}

fn sample_of(text: &str) -> (&str, bool) {
    if text.len() <= SNIFF_SAMPLE_BYTES {
        return (text, false);
    }
    let mut end = SNIFF_SAMPLE_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    (&text[..end], true)
}

/// Parse delimited text into a table
///
/// `origin` names the source in error messages.
pub fn parse_csv(text: &str, delimiter: Delimiter, origin: &str) -> Result<LoadedTable, ImportError> {
    let delimiter = match delimiter {
        Delimiter::Byte(byte) => byte,
        Delimiter::Auto => {
            let (sample, truncated) = sample_of(text);
            let sniffed = sniff_delimiter(sample, truncated);
            debug!(delimiter = %(sniffed as char).escape_default(), "sniffed delimiter");
            sniffed
        }
    };

    let parse_error = |e: ::csv::Error| ImportError::ParseError {
        path: origin.to_string(),
        message: e.to_string(),
    };

    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(parse_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(parse_error)?;
        rows.push(
            record
                .iter()
                .map(|cell| (!is_null_token(cell)).then(|| cell.to_string()))
                .collect(),
        );
    }

    let table = Table::from_rows(headers, rows).map_err(|source| ImportError::ValidationError {
        path: origin.to_string(),
        source,
    })?;
    Ok(LoadedTable { table, delimiter })
}

/// Load a delimited file
pub fn load_csv(path: &Path, delimiter: Delimiter) -> Result<LoadedTable, ImportError> {
    let text = read_text(path)?;
    let loaded = parse_csv(&text, delimiter, &path.display().to_string())?;
    info!(
        path = %path.display(),
        rows = loaded.table.row_count(),
        columns = loaded.table.column_count(),
        "loaded table"
    );
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n", false), b';');
        assert_eq!(sniff_delimiter("a\tb\n1\t2\n", false), b'\t');
        assert_eq!(sniff_delimiter("a|b\n1|2\n", false), b'|');
        assert_eq!(sniff_delimiter("", false), b',');
        assert_eq!(sniff_delimiter("single\nvalue\n", false), b',');
    }

    #[test]
    fn test_sniff_ignores_quoted_delimiters() {
        assert_eq!(sniff_delimiter("name;note\n\"a\";\"x, y\"\n", false), b';');
    }

    #[test]
    fn test_sniff_prefers_earlier_candidate_on_tie() {
        assert_eq!(sniff_delimiter("a,b;c\n1,2;3\n", false), b',');
    }

    #[test]
    fn test_parse_marks_nulls() {
        let loaded = parse_csv("age,name\n25,NA\n,bob\n40,n/a\n", Delimiter::Auto, "inline").unwrap();
        let table = loaded.table;
        assert_eq!(loaded.delimiter, b',');
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column("age").unwrap().null_count(), 1);
        assert_eq!(table.column("name").unwrap().null_count(), 2);
        assert_eq!(table.column("name").unwrap().values[1].as_deref(), Some("bob"));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = parse_csv("a,b\n1,2\n3\n", Delimiter::Byte(b','), "inline");
        assert!(matches!(result, Err(ImportError::ParseError { .. })));
    }

    #[test]
    fn test_delimiter_from_str() {
        assert_eq!("auto".parse::<Delimiter>(), Ok(Delimiter::Auto));
        assert_eq!("tab".parse::<Delimiter>(), Ok(Delimiter::Byte(b'\t')));
        assert_eq!(";".parse::<Delimiter>(), Ok(Delimiter::Byte(b';')));
        assert!(";;".parse::<Delimiter>().is_err());
    }

    #[test]
    fn test_load_csv_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "x;y\n1;2\n3;4\n").unwrap();
        let loaded = load_csv(file.path(), Delimiter::Auto).unwrap();
        assert_eq!(loaded.delimiter, b';');
        assert_eq!(loaded.table.column_names(), vec!["x", "y"]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_csv(Path::new("/nonexistent/data.csv"), Delimiter::Auto);
        assert!(matches!(result, Err(ImportError::IoError { .. })));
    }
}
