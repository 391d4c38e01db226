//! Raw loader for delimited text exports.
//!
//! The encoding and delimiter of an export are not known up front. [`load_table_from_path`]
//! walks the candidate combinations from [`LoadOptions`] in priority order and keeps the first
//! one that:
//!
//! - decodes without a malformed byte sequence,
//! - parses without a structural error (a data row wider than the header), and
//! - does not collapse into a single column whose header still contains a delimiter.
//!
//! When every combination is rejected, the delimiter is sniffed once from the first decodable
//! text before giving up with [`IngestionError::UnreadableInput`].
//!
//! The header shape is chosen by the caller; the loader never guesses it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult, PipelineStage};
use crate::types::Value;

use super::encoding::TextEncoding;

/// Delimiters that mark a header as "unsplit" when it lands in a single column.
const DELIMITER_MARKERS: [char; 3] = [';', ',', '\t'];

/// Candidates for the sniffing fallback, in tie-break order.
const SNIFF_CANDIDATES: [u8; 5] = [b';', b',', b'\t', b'|', b':'];

/// Number of non-empty lines inspected by the sniffer.
const SNIFF_SAMPLE_LINES: usize = 20;

/// Header layout of a delimited export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeaderShape {
    /// One header row with the field names.
    #[default]
    Single,
    /// Two header rows: the upper holds a year (or is blank), the lower the field label.
    TwoRow,
}

/// Options controlling encoding/delimiter detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Encodings in priority order.
    pub encodings: Vec<TextEncoding>,
    /// Delimiters in priority order.
    pub delimiters: Vec<u8>,
    /// Header layout to read.
    pub header_shape: HeaderShape,
    /// Sniff the delimiter once if every combination fails.
    pub sniff_fallback: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            encodings: TextEncoding::DEFAULT_ORDER.to_vec(),
            delimiters: vec![b';', b',', b'\t'],
            header_shape: HeaderShape::Single,
            sniff_fallback: true,
        }
    }
}

impl LoadOptions {
    /// Default detection order with the given header shape.
    pub fn with_header_shape(header_shape: HeaderShape) -> Self {
        Self {
            header_shape,
            ..Default::default()
        }
    }

    /// All (encoding, delimiter) pairs in the order they are attempted.
    pub fn candidates(&self) -> Vec<(TextEncoding, u8)> {
        self.encodings
            .iter()
            .flat_map(|&enc| self.delimiters.iter().map(move |&d| (enc, d)))
            .collect()
    }
}

/// A header cell as read from the file, before name normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    /// Upper header row cell (two-row headers only). `None` when blank.
    pub top: Option<String>,
    /// Header cell holding the field label.
    pub label: String,
}

/// Table of raw strings produced by the loader.
///
/// Every cell is either [`Value::Utf8`] or [`Value::Null`] (empty field or short row).
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Header cells in file order.
    pub columns: Vec<RawColumn>,
    /// Data rows, padded to the header width.
    pub rows: Vec<Vec<Value>>,
    /// Encoding that decoded the file.
    pub encoding: TextEncoding,
    /// Field delimiter that split the file.
    pub delimiter: u8,
    /// True when the delimiter came from the sniffing fallback.
    pub sniffed: bool,
}

/// Read `path` and detect its encoding and delimiter.
pub fn load_table_from_path(path: impl AsRef<Path>, options: &LoadOptions) -> IngestionResult<RawTable> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| IngestionError::input_io(path, e))?;
    load_table_from_bytes(&bytes, path, options)
}

/// Detect encoding and delimiter of in-memory file content.
///
/// `source` is only used to label errors and log events.
pub fn load_table_from_bytes(bytes: &[u8], source: &Path, options: &LoadOptions) -> IngestionResult<RawTable> {
    let mut attempts: Vec<String> = Vec::new();

    for (encoding, delimiter) in options.candidates() {
        let label = format!("{encoding}/{}", delimiter_label(delimiter));
        tracing::debug!(path = %source.display(), combo = %label, "trying combination");

        let text = match encoding.decode(bytes) {
            Ok(text) => text,
            Err(e) => {
                attempts.push(format!("{label}: {e}"));
                continue;
            }
        };

        match parse_text(&text, delimiter, options.header_shape) {
            Ok((columns, rows)) => {
                if let Some(header) = unsplit_header(&columns) {
                    tracing::debug!(combo = %label, header = %header, "header looks unsplit, skipping");
                    attempts.push(format!("{label}: single column with unsplit header '{header}'"));
                    continue;
                }
                tracing::info!(
                    path = %source.display(),
                    combo = %label,
                    columns = columns.len(),
                    rows = rows.len(),
                    "loaded table"
                );
                return Ok(RawTable {
                    columns,
                    rows,
                    encoding,
                    delimiter,
                    sniffed: false,
                });
            }
            Err(e) => attempts.push(format!("{label}: {e}")),
        }
    }

    if options.sniff_fallback {
        tracing::warn!(
            path = %source.display(),
            last_error = attempts.last().map(String::as_str).unwrap_or(""),
            "falling back to delimiter sniffing"
        );
        match sniff_and_parse(bytes, options) {
            Ok(table) => return Ok(table),
            Err(e) => attempts.push(format!("sniff: {e}")),
        }
    }

    Err(IngestionError::UnreadableInput {
        path: source.to_path_buf(),
        stage: PipelineStage::Load,
        attempts,
    })
}

fn sniff_and_parse(bytes: &[u8], options: &LoadOptions) -> Result<RawTable, String> {
    let (encoding, text) = options
        .encodings
        .iter()
        .find_map(|&enc| enc.decode(bytes).ok().map(|text| (enc, text)))
        .ok_or_else(|| "no encoding could decode the input".to_string())?;

    let delimiter = sniff_delimiter(&text).ok_or_else(|| "could not determine delimiter".to_string())?;
    let (columns, rows) = parse_text(&text, delimiter, options.header_shape)?;
    tracing::info!(encoding = %encoding, delimiter = %delimiter_label(delimiter), "sniffed delimiter");

    Ok(RawTable {
        columns,
        rows,
        encoding,
        delimiter,
        sniffed: true,
    })
}

/// Pick the candidate delimiter that splits the sampled lines most consistently.
///
/// The score of a delimiter is the number of sampled lines whose field count equals its most
/// common non-zero field count. Ties go to the earlier candidate.
pub fn sniff_delimiter(text: &str) -> Option<u8> {
    let sample: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_SAMPLE_LINES)
        .collect();
    if sample.is_empty() {
        return None;
    }

    let mut best: Option<(u8, usize)> = None;
    for &candidate in &SNIFF_CANDIDATES {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| line.bytes().filter(|&b| b == candidate).count())
            .collect();

        let mut modal: Option<(usize, usize)> = None;
        for &c in counts.iter().filter(|&&c| c > 0) {
            let freq = counts.iter().filter(|&&x| x == c).count();
            if modal.map_or(true, |(_, f)| freq > f) {
                modal = Some((c, freq));
            }
        }

        if let Some((_, freq)) = modal {
            if best.map_or(true, |(_, score)| freq > score) {
                best = Some((candidate, freq));
            }
        }
    }
    best.map(|(d, _)| d)
}

fn parse_text(
    text: &str,
    delimiter: u8,
    shape: HeaderShape,
) -> Result<(Vec<RawColumn>, Vec<Vec<Value>>), String> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = rdr.records();
    let mut next_record = |what: &str| -> Result<csv::StringRecord, String> {
        match records.next() {
            Some(Ok(r)) => Ok(r),
            Some(Err(e)) => Err(e.to_string()),
            None => Err(format!("missing {what}")),
        }
    };

    let columns: Vec<RawColumn> = match shape {
        HeaderShape::Single => {
            let header = next_record("header row")?;
            header
                .iter()
                .map(|label| RawColumn {
                    top: None,
                    label: label.to_string(),
                })
                .collect()
        }
        HeaderShape::TwoRow => {
            let top = next_record("upper header row")?;
            let bottom = next_record("lower header row")?;
            let width = top.len().max(bottom.len());
            (0..width)
                .map(|i| RawColumn {
                    top: top
                        .get(i)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                    label: bottom.get(i).unwrap_or("").to_string(),
                })
                .collect()
        }
    };

    let width = columns.len();
    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (idx0, result) in records.enumerate() {
        let record = result.map_err(|e| e.to_string())?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() > width {
            return Err(format!(
                "data row {} has {} fields, header has {}",
                idx0 + 1,
                record.len(),
                width
            ));
        }
        let mut row: Vec<Value> = record
            .iter()
            .map(|cell| {
                if cell.is_empty() {
                    Value::Null
                } else {
                    Value::Utf8(cell.to_string())
                }
            })
            .collect();
        row.resize(width, Value::Null);
        rows.push(row);
    }

    Ok((columns, rows))
}

fn unsplit_header(columns: &[RawColumn]) -> Option<String> {
    if columns.len() != 1 {
        return None;
    }
    let col = &columns[0];
    let header = match &col.top {
        Some(top) => format!("{top} {}", col.label),
        None => col.label.clone(),
    };
    header.contains(DELIMITER_MARKERS).then_some(header)
}

fn delimiter_label(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "'\\t'".to_string(),
        d => format!("'{}'", d as char),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_follow_priority_order() {
        let opts = LoadOptions::default();
        let c = opts.candidates();
        assert_eq!(c.len(), 9);
        assert_eq!(c[0], (TextEncoding::Utf8Sig, b';'));
        assert_eq!(c[1], (TextEncoding::Utf8Sig, b','));
        assert_eq!(c[3], (TextEncoding::Utf16, b';'));
        assert_eq!(c[8], (TextEncoding::Windows1252, b'\t'));
    }

    #[test]
    fn missing_file_names_path_and_load_stage() {
        let path = Path::new("/nonexistent/dir/fangst_2024.csv");
        let err = load_table_from_path(path, &LoadOptions::default()).unwrap_err();
        assert_eq!(err.path(), Some(path));
        assert_eq!(err.stage(), Some(PipelineStage::Load));
        assert!(err.to_string().contains("fangst_2024.csv"));
    }

    #[test]
    fn comma_file_skips_semicolon_misparse() {
        let input = b"a,b,c\n1,2,3\n";
        let t = load_table_from_bytes(input, Path::new("mem.csv"), &LoadOptions::default()).unwrap();
        assert_eq!(t.delimiter, b',');
        assert_eq!(t.columns.len(), 3);
        assert_eq!(t.rows[0][2], Value::Utf8("3".to_string()));
    }

    #[test]
    fn short_rows_are_padded_with_null() {
        let input = b"a;b;c\n1;2\n";
        let t = load_table_from_bytes(input, Path::new("mem.csv"), &LoadOptions::default()).unwrap();
        assert_eq!(t.rows[0], vec![Value::Utf8("1".into()), Value::Utf8("2".into()), Value::Null]);
    }

    #[test]
    fn wide_row_rejects_combination() {
        // Semicolon split gives a 1-wide header but 2-wide data rows; comma wins.
        let input = b"a,b\n1;x,2\n";
        let t = load_table_from_bytes(input, Path::new("mem.csv"), &LoadOptions::default()).unwrap();
        assert_eq!(t.delimiter, b',');
    }

    #[test]
    fn two_row_header_keeps_both_rows() {
        let input = "Landingsmåned\tArt\t2023\t2024\n\t\tRundvekt (tonn)\tRundvekt (tonn)\nJanuar\tTorsk\t1\t2\n";
        let opts = LoadOptions::with_header_shape(HeaderShape::TwoRow);
        let t = load_table_from_bytes(input.as_bytes(), Path::new("mem.csv"), &opts).unwrap();
        assert_eq!(t.delimiter, b'\t');
        assert_eq!(t.columns[0].top.as_deref(), Some("Landingsmåned"));
        assert_eq!(t.columns[0].label, "");
        assert_eq!(t.columns[2].top.as_deref(), Some("2023"));
        assert_eq!(t.columns[2].label, "Rundvekt (tonn)");
        assert_eq!(t.rows.len(), 1);
    }

    #[test]
    fn sniffer_prefers_consistent_delimiter() {
        assert_eq!(sniff_delimiter("a|b|c\n1|2|3\n4|5|6\n"), Some(b'|'));
        assert_eq!(sniff_delimiter("abc\ndef\n"), None);
    }

    #[test]
    fn single_unsplit_column_falls_back_to_sniffing() {
        let opts = LoadOptions {
            encodings: vec![TextEncoding::Utf8Sig],
            delimiters: vec![b'\t'],
            ..Default::default()
        };
        let input = b"a|b,x\n1|2\n";
        let t = load_table_from_bytes(input, Path::new("mem.csv"), &opts).unwrap();
        assert!(t.sniffed);
        assert_eq!(t.delimiter, b'|');
        assert_eq!(t.columns[1].label, "b,x");
        assert_eq!(t.rows[0][1], Value::Utf8("2".to_string()));
    }

    #[test]
    fn single_column_without_delimiter_marks_is_accepted() {
        let t = load_table_from_bytes(b"a|b\n1|2\n", Path::new("mem.csv"), &LoadOptions::default()).unwrap();
        assert!(!t.sniffed);
        assert_eq!(t.columns.len(), 1);
    }

    #[test]
    fn empty_input_is_unreadable() {
        let err = load_table_from_bytes(b"", Path::new("empty.csv"), &LoadOptions::default()).unwrap_err();
        match err {
            IngestionError::UnreadableInput { path, stage, attempts } => {
                assert_eq!(path, Path::new("empty.csv"));
                assert_eq!(stage, PipelineStage::Load);
                assert!(!attempts.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
