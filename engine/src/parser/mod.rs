//! CSV reading and writing for [`Table`], with encoding and delimiter auto-detection.
//!
//! This is the I/O collaborator around the reshaping core: the reshapers
//! never touch files themselves.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::io::Write;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::table::{Column, Kind, Table, Value};

/// Options for reading CSV input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Delimiter to use (auto-detect if not specified)
    pub delimiter: Option<char>,

    /// Cell texts read as missing values
    pub na_values: Vec<String>,

    /// Infer bool/int/float cells; when false every non-missing cell is a string
    pub infer_types: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            na_values: vec![String::new(), "NA".to_string()],
            infer_types: true,
        }
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed table
    pub table: Table,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        // UTF-8 and unknown encodings: lossy UTF-8
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Infer a cell value from its text.
pub fn infer_cell(raw: &str, options: &ReadOptions) -> Value {
    if options.na_values.iter().any(|na| na == raw) {
        return Value::Null;
    }
    if !options.infer_types {
        return Value::Str(raw.to_string());
    }

    let trimmed = raw.trim();
    match trimmed {
        "true" | "TRUE" | "True" => return Value::Bool(true),
        "false" | "FALSE" | "False" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(x) = trimmed.parse::<f64>() {
        if x.is_finite() {
            return Value::Float(x);
        }
    }
    Value::Str(raw.to_string())
}

/// Parse CSV text with explicit delimiter into a table.
///
/// # Example
/// ```
/// use tidyshape::parser::{parse_str, ReadOptions};
/// use tidyshape::Value;
///
/// let table = parse_str("id;wk1\n1;5\n2;NA", ';', &ReadOptions::default()).unwrap();
///
/// assert_eq!(table.n_rows(), 2);
/// assert_eq!(table.get(0, "wk1"), Some(&Value::Int(5)));
/// assert_eq!(table.get(1, "wk1"), Some(&Value::Null));
/// ```
pub fn parse_str(content: &str, delimiter: char, options: &ReadOptions) -> CsvResult<Table> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut cells: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];

    for record in reader.records() {
        let record = record?;
        for (slot, raw) in cells.iter_mut().zip(record.iter()) {
            slot.push(infer_cell(raw, options));
        }
    }

    // Columns whose cells disagree on kind fall back to their raw text.
    let columns = headers
        .iter()
        .zip(cells)
        .map(|(name, values)| match Column::new(name.as_str(), values.clone()) {
            Ok(col) => col,
            Err(_) => {
                tracing::debug!(column = %name, "mixed cell kinds, reading column as text");
                let text = values
                    .into_iter()
                    .map(|v| match v {
                        Value::Null => Value::Null,
                        Value::Str(s) => Value::Str(s),
                        other => Value::Str(other.to_string()),
                    })
                    .collect();
                Column::from_parts(name.clone(), Kind::Str, text)
            }
        })
        .collect();

    Ok(Table::new(columns)?)
}

/// Parse CSV bytes with auto-detection of encoding and (unless given) delimiter.
pub fn parse_bytes_auto(bytes: &[u8], options: &ReadOptions) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = options.delimiter.unwrap_or_else(|| detect_delimiter(&content));
    let table = parse_str(&content, delimiter, options)?;

    tracing::info!(
        encoding = %encoding,
        delimiter = %format_delimiter(delimiter),
        rows = table.n_rows(),
        cols = table.n_cols(),
        "parsed CSV"
    );

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
    })
}

/// Parse CSV file with auto-detection of encoding and delimiter.
pub fn parse_file_auto<P: AsRef<Path>>(path: P, options: &ReadOptions) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes, options)
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn delimiter_byte(d: char) -> CsvResult<u8> {
    u8::try_from(d).map_err(|_| CsvError::Parse {
        line: 0,
        message: format!("delimiter '{}' is not a single-byte character", d),
    })
}

/// Text of a cell in CSV output: nulls are empty, list items are joined with `|`.
fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::List(items) => items.iter().map(render_cell).collect::<Vec<_>>().join("|"),
        other => other.to_string(),
    }
}

/// Write a table as CSV.
pub fn write_csv<W: Write>(table: &Table, writer: W, delimiter: char) -> CsvResult<()> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(delimiter_byte(delimiter)?)
        .from_writer(writer);

    out.write_record(table.column_names())?;
    for row in 0..table.n_rows() {
        out.write_record(table.columns().iter().map(|c| render_cell(&c.values()[row])))?;
    }
    out.flush()?;
    Ok(())
}

/// Render a table to a CSV string.
pub fn to_csv_string(table: &Table, delimiter: char) -> CsvResult<String> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf, delimiter)?;
    String::from_utf8(buf).map_err(|e| CsvError::Write(e.to_string()))
}

/// Convert a table to a JSON array of records (one object per row).
pub fn table_to_json(table: &Table) -> Json {
    let records = (0..table.n_rows())
        .map(|row| {
            let mut obj = Map::new();
            for col in table.columns() {
                let cell = serde_json::to_value(&col.values()[row]).unwrap_or(Json::Null);
                obj.insert(col.name().to_string(), cell);
            }
            Json::Object(obj)
        })
        .collect();
    Json::Array(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(csv: &str, delimiter: char) -> Table {
        parse_str(csv, delimiter, &ReadOptions::default()).unwrap()
    }

    #[test]
    fn test_simple_csv() {
        let t = parse("name;age\nAlice;30\nBob;25", ';');
        assert_eq!(t.n_rows(), 2);
        assert_eq!(t.get(0, "name"), Some(&Value::from("Alice")));
        assert_eq!(t.get(1, "age"), Some(&Value::Int(25)));
        assert_eq!(t.column("age").unwrap().kind(), Kind::Int);
    }

    #[test]
    fn test_quoted_values() {
        let t = parse("name,value\n\"Smith, J\",\"Hello World\"", ',');
        assert_eq!(t.get(0, "name"), Some(&Value::from("Smith, J")));
        assert_eq!(t.get(0, "value"), Some(&Value::from("Hello World")));
    }

    #[test]
    fn test_missing_and_na_values() {
        let t = parse("a,b,c\n1,,NA\n2,x,3", ',');
        assert_eq!(t.get(0, "b"), Some(&Value::Null));
        assert_eq!(t.get(0, "c"), Some(&Value::Null));
        assert_eq!(t.column("c").unwrap().kind(), Kind::Int);
    }

    #[test]
    fn test_kind_inference() {
        let opts = ReadOptions::default();
        assert_eq!(infer_cell("true", &opts), Value::Bool(true));
        assert_eq!(infer_cell("-4", &opts), Value::Int(-4));
        assert_eq!(infer_cell("2.5", &opts), Value::Float(2.5));
        assert_eq!(infer_cell("inf", &opts), Value::from("inf"));
        assert_eq!(infer_cell("wk1", &opts), Value::from("wk1"));

        let raw = ReadOptions {
            infer_types: false,
            ..ReadOptions::default()
        };
        assert_eq!(infer_cell("42", &raw), Value::from("42"));
        assert_eq!(infer_cell("NA", &raw), Value::Null);
    }

    #[test]
    fn test_mixed_column_read_as_text() {
        let t = parse("a\n1\nx", ',');
        assert_eq!(t.column("a").unwrap().kind(), Kind::Str);
        assert_eq!(t.get(0, "a"), Some(&Value::from("1")));
    }

    #[test]
    fn test_int_float_column_widened() {
        let t = parse("a\n1\n2.5", ',');
        assert_eq!(t.column("a").unwrap().kind(), Kind::Float);
        assert_eq!(t.get(0, "a"), Some(&Value::Float(1.0)));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = parse_str("a,b\n1,2,3", ',', &ReadOptions::default());
        assert!(matches!(result, Err(CsvError::Parse { .. })));
    }

    #[test]
    fn test_empty_csv_error() {
        let result = parse_str("", ',', &ReadOptions::default());
        assert!(matches!(result, Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_auto_parse() {
        let result = parse_bytes_auto(b"name;age\nAlice;30\nBob;25", &ReadOptions::default()).unwrap();
        assert_eq!(result.delimiter, ';');
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.table.column_names(), vec!["name", "age"]);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_write_csv() {
        let t = Table::from_rows(
            &["id", "x"],
            vec![
                vec![1.into(), Value::List(vec![1.into(), 5.into()])],
                vec![2.into(), Value::Null],
            ],
        )
        .unwrap();
        let out = to_csv_string(&t, ',').unwrap();
        assert_eq!(out, "id,x\n1,1|5\n2,\n");
    }

    #[test]
    fn test_table_to_json() {
        let t = parse("id,wk1\n1,5\n2,NA", ',');
        let json = table_to_json(&t);
        assert_eq!(json, serde_json::json!([{ "id": 1, "wk1": 5 }, { "id": 2, "wk1": null }]));
    }

    #[test]
    fn test_csv_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let t = parse("id,name\n1,Susan\n2,Mark", ',');
        std::fs::write(&path, to_csv_string(&t, ',').unwrap()).unwrap();

        let back = parse_file_auto(&path, &ReadOptions::default()).unwrap();
        assert_eq!(back.table, t);
    }
}
