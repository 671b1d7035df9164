//! CSV text to coerced rows.

use ::csv::{ReaderBuilder, Trim};
use serde_json::{Number, Value};

use crate::import::{ImportKind, Row};

/// Parse CSV text with a header line into rows keyed by the header columns.
///
/// Every row carries exactly the header keys: missing trailing values become
/// `null` and surplus values are dropped. Input without a data line yields an
/// empty vector. Malformed input never errors; reading stops at the first
/// record the reader cannot make sense of.
pub fn parse(text: &str) -> Vec<Row> {
    parse_with(text, &[])
}

/// [`parse`] for one import type: its verbatim columns are kept as text.
pub fn parse_for(kind: ImportKind, text: &str) -> Vec<Row> {
    parse_with(text, kind.verbatim_columns())
}

/// Columns named in `verbatim` skip coercion; a blank one is still `null`.
pub fn parse_with(text: &str, verbatim: &[&str]) -> Vec<Row> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(headers) => headers.iter().map(str::to_string).collect(),
        Err(err) => {
            log::warn!("csv header could not be read: {}", err);
            return Vec::new();
        }
    };
    if headers.iter().all(|h| h.is_empty()) {
        return Vec::new();
    }

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                log::warn!("csv parsing stopped at data line {}: {}", line + 1, err);
                break;
            }
        };

        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let raw = record.get(i).unwrap_or("");
                let value = if verbatim.contains(&header.as_str()) {
                    keep_text(raw)
                } else {
                    coerce(raw)
                };
                (header.clone(), value)
            })
            .collect();
        rows.push(row);
    }

    log::debug!("parsed {} csv rows with {} columns", rows.len(), headers.len());
    rows
}

/// Heuristic typing of a single field value.
pub fn coerce(raw: &str) -> Value {
    let raw = raw.trim();

    if raw.starts_with('[') && raw.ends_with(']') {
        return serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    }

    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if looks_numeric(raw) {
        if let Some(number) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    }

    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "" => Value::Null,
        _ => Value::String(raw.to_string()),
    }
}

fn keep_text(raw: &str) -> Value {
    match raw.trim() {
        "" => Value::Null,
        text => Value::String(text.to_string()),
    }
}

/// Rust's float parser also accepts `inf` and `NaN`; only digit-based input
/// counts as a number here.
fn looks_numeric(raw: &str) -> bool {
    raw.chars().any(|c| c.is_ascii_digit())
        && raw
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rows_carry_every_header_column() {
        let rows = parse("name,description,icon,color\nDesign,,brush\nData,All about data,db,#fff,extra\n");
        assert_eq!(rows.len(), 2);
        for row in &rows {
            let keys: Vec<&str> = row.keys().map(String::as_str).collect();
            assert_eq!(keys.len(), 4);
            for column in ["name", "description", "icon", "color"] {
                assert!(keys.contains(&column), "missing {column}");
            }
        }
        assert_eq!(rows[0]["description"], Value::Null);
        assert_eq!(rows[0]["color"], Value::Null);
        assert_eq!(rows[1]["color"], json!("#fff"));
    }

    #[test]
    fn coercion_is_deterministic() {
        assert_eq!(coerce("42"), json!(42));
        assert_eq!(coerce("19.99"), json!(19.99));
        assert_eq!(coerce("-3"), json!(-3));
        assert_eq!(coerce("true"), json!(true));
        assert_eq!(coerce("false"), json!(false));
        assert_eq!(coerce(""), Value::Null);
        assert_eq!(coerce("[1,2]"), json!([1, 2]));
        assert_eq!(coerce("abc"), json!("abc"));
        assert_eq!(coerce("[not json]"), json!("[not json]"));
        assert_eq!(coerce("inf"), json!("inf"));
        assert_eq!(coerce("NaN"), json!("NaN"));
        assert_eq!(coerce("True"), json!("True"));
    }

    #[test]
    fn verbatim_columns_skip_coercion() {
        let text = "email,password,bio\nana@example.com,0012345678,42\nbo@example.com,true,\nce@example.com,,\n";
        let rows = parse_for(ImportKind::Users, text);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["password"], json!("0012345678"));
        assert_eq!(rows[0]["bio"], json!(42));
        assert_eq!(rows[1]["password"], json!("true"));
        assert_eq!(rows[2]["password"], Value::Null);

        let coerced = parse(text);
        assert_eq!(coerced[0]["password"], json!(12345678));
    }

    #[test]
    fn too_few_lines_yield_nothing() {
        assert!(parse("").is_empty());
        assert!(parse("name,color").is_empty());
        assert!(parse("name,color\n").is_empty());
    }

    #[test]
    fn quoted_fields_keep_embedded_commas_and_quotes() {
        let rows = parse(
            "title,description,requirements\n\"Rust, the book\",\"Say \"\"hi\"\"\",\"[\"\"cargo\"\",\"\"git\"\"]\"\n",
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], json!("Rust, the book"));
        assert_eq!(rows[0]["description"], json!("Say \"hi\""));
        assert_eq!(rows[0]["requirements"], json!(["cargo", "git"]));
    }

    #[test]
    fn byte_order_mark_and_padding_are_stripped() {
        let rows = parse("\u{feff} name , color \n Programación , #3b82f6 \n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("Programación"));
        assert_eq!(rows[0]["color"], json!("#3b82f6"));
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let rows = parse("name,order_index\r\nIntro,1\r\nSetup,2\r\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["order_index"], json!(2));
    }
}
