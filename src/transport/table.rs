use std::fs::File;
use std::path::{Path, PathBuf};

use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::reader::RowIter;
use serde_json::{Map, Value};

use crate::errors::FlatfileError;
use crate::types::{SourceName, Uprn};

/// Read-only handle on one parquet source table.
pub struct ParquetTable {
    source_id: SourceName,
    path: PathBuf,
    reader: SerializedFileReader<File>,
    columns: Vec<String>,
}

impl ParquetTable {
    /// Open `path`, reading only the footer metadata.
    pub fn open(source_id: impl Into<SourceName>, path: &Path) -> Result<Self, FlatfileError> {
        let source_id = source_id.into();
        let file = File::open(path).map_err(|err| FlatfileError::SourceUnavailable {
            source_id: source_id.clone(),
            reason: format!("failed opening parquet table {}: {err}", path.display()),
        })?;
        let reader =
            SerializedFileReader::new(file).map_err(|err| FlatfileError::SourceUnavailable {
                source_id: source_id.clone(),
                reason: format!("failed reading parquet metadata {}: {err}", path.display()),
            })?;
        let columns = reader
            .metadata()
            .file_metadata()
            .schema_descr()
            .root_schema()
            .get_fields()
            .iter()
            .map(|field| field.name().to_ascii_lowercase())
            .collect();
        Ok(Self {
            source_id,
            path: path.to_path_buf(),
            reader,
            columns,
        })
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercased top-level column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    /// First name in `required` that is absent from the table, if any.
    pub fn first_missing<'a>(&self, required: &[&'a str]) -> Option<&'a str> {
        required
            .iter()
            .copied()
            .find(|column| !self.has_column(column))
    }

    /// Row count recorded in the footer.
    pub fn row_count(&self) -> u64 {
        u64::try_from(self.reader.metadata().file_metadata().num_rows()).unwrap_or(0)
    }

    /// Consume the table into a lazy row sequence.
    pub fn into_rows(self) -> TableRows {
        TableRows {
            source_id: self.source_id,
            path: self.path,
            iter: RowIter::from_file_into(Box::new(self.reader)),
            position: 0,
        }
    }
}

/// Lazy sequence over a table's rows, decoded into named fields.
pub struct TableRows {
    source_id: SourceName,
    path: PathBuf,
    iter: RowIter<'static>,
    position: u64,
}

impl Iterator for TableRows {
    type Item = Result<(u64, RowFields), FlatfileError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.iter.next()?;
        let position = self.position;
        self.position += 1;
        Some(
            row.map_err(|err| FlatfileError::SourceUnavailable {
                source_id: self.source_id.clone(),
                reason: format!(
                    "failed reading parquet row {} in {}: {err}",
                    position,
                    self.path.display()
                ),
            })
            .map(|row| (position, RowFields::from_json(row.to_json_value()))),
        )
    }
}

/// One decoded row keyed by lowercased column name.
#[derive(Clone, Debug, Default)]
pub struct RowFields {
    values: Map<String, Value>,
}

impl RowFields {
    pub fn from_json(value: Value) -> Self {
        let values = match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| (key.to_ascii_lowercase(), value))
                .collect(),
            _ => Map::new(),
        };
        Self { values }
    }

    /// Trimmed, non-empty text; numbers and booleans are rendered as text.
    pub fn text(&self, column: &str) -> Option<String> {
        let rendered = match self.values.get(column)? {
            Value::String(text) => text.trim().to_string(),
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            _ => return None,
        };
        if rendered.is_empty() {
            None
        } else {
            Some(rendered)
        }
    }

    /// Identifier cell as an unsigned integer; accepts integers, whole floats,
    /// and numeric strings.
    pub fn uprn(&self, column: &str) -> Option<Uprn> {
        match self.values.get(column)? {
            Value::Number(number) => number.as_u64().or_else(|| {
                number
                    .as_f64()
                    .filter(|value| *value >= 0.0 && value.fract() == 0.0)
                    .map(|value| value as Uprn)
            }),
            Value::String(text) => {
                let text = text.trim();
                text.parse::<Uprn>().ok().or_else(|| {
                    text.parse::<f64>()
                        .ok()
                        .filter(|value| *value >= 0.0 && value.fract() == 0.0)
                        .map(|value| value as Uprn)
                })
            }
            _ => None,
        }
    }

    pub fn float(&self, column: &str) -> Option<f64> {
        match self.values.get(column)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_fields_lowercase_keys_and_trim_text() {
        let fields = RowFields::from_json(json!({
            "UPRN": 6001491,
            "FullAddress": "  10 HIGH STREET, LEEDS  ",
            "Blank": "   ",
            "BuildingNumber": 10,
        }));
        assert_eq!(fields.uprn("uprn"), Some(6001491));
        assert_eq!(fields.text("fulladdress").as_deref(), Some("10 HIGH STREET, LEEDS"));
        assert_eq!(fields.text("blank"), None);
        assert_eq!(fields.text("buildingnumber").as_deref(), Some("10"));
        assert_eq!(fields.text("absent"), None);
    }

    #[test]
    fn uprn_accepts_numeric_strings_and_whole_floats() {
        let fields = RowFields::from_json(json!({
            "a": "100023336956",
            "b": 42.0,
            "c": 42.5,
            "d": -1,
            "e": null,
        }));
        assert_eq!(fields.uprn("a"), Some(100023336956));
        assert_eq!(fields.uprn("b"), Some(42));
        assert_eq!(fields.uprn("c"), None);
        assert_eq!(fields.uprn("d"), None);
        assert_eq!(fields.uprn("e"), None);
    }

    #[test]
    fn float_parses_numbers_and_strings() {
        let fields = RowFields::from_json(json!({"low": -1, "high": "2.5", "bad": "x"}));
        assert_eq!(fields.float("low"), Some(-1.0));
        assert_eq!(fields.float("high"), Some(2.5));
        assert_eq!(fields.float("bad"), None);
    }
}
