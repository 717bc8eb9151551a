use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arrow::array::{
    Array, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, LargeStringArray,
    StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::{PipelineError, Result};
use super::model::{Dataset, Record, Value};

// ---------------------------------------------------------------------------
// Source description
// ---------------------------------------------------------------------------

/// Where the session's dataset comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// A CSV (or `.json`) reachable over HTTP(S).
    Url(String),
    /// A local `.csv`, `.json` or `.parquet` file.
    File(PathBuf),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => write!(f, "{url}"),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Options for a single load attempt.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub timeout: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Csv,
    Json,
    Parquet,
}

fn format_of(name: &str) -> Option<Format> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" | "txt" => Some(Format::Csv),
        "json" => Some(Format::Json),
        "parquet" | "pq" => Some(Format::Parquet),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the dataset. A single attempt is made; there are no retries.
pub fn load(source: &Source, options: &LoadOptions) -> Result<Dataset> {
    let dataset = match source {
        Source::Url(url) => load_url(url, options)?,
        Source::File(path) => load_file(path)?,
    };
    log::info!(
        "Loaded {} rows with columns {:?} from {source}",
        dataset.len(),
        dataset.column_names
    );
    Ok(dataset)
}

/// Load a local file, dispatching on its extension.
///
/// Supported formats:
/// * `.csv`     – header row plus one record per line
/// * `.json`    – `[{ "State": "...", "year": 2020, ... }, ...]`
/// * `.parquet` – flat columns of strings, integers, floats or booleans
pub fn load_file(path: &Path) -> Result<Dataset> {
    let name = path.display().to_string();
    let unavailable = |e: std::io::Error| PipelineError::SourceUnavailable {
        source_name: name.clone(),
        reason: e.to_string(),
    };

    match format_of(&name) {
        Some(Format::Csv) => {
            let file = std::fs::File::open(path).map_err(unavailable)?;
            read_csv(file, &name)
        }
        Some(Format::Json) => {
            let text = std::fs::read_to_string(path).map_err(unavailable)?;
            read_json(&text, &name)
        }
        Some(Format::Parquet) => {
            let file = std::fs::File::open(path).map_err(unavailable)?;
            read_parquet(file, &name)
        }
        None => Err(PipelineError::SourceUnavailable {
            source_name: name.clone(),
            reason: "unsupported file extension".to_string(),
        }),
    }
}

fn load_url(url: &str, options: &LoadOptions) -> Result<Dataset> {
    log::info!("Fetching dataset from {url}");
    let unavailable = |reason: String| PipelineError::SourceUnavailable {
        source_name: url.to_string(),
        reason,
    };

    // ureq reports HTTP status >= 400 as `Error::Status`.
    let response = ureq::get(url)
        .timeout(options.timeout)
        .call()
        .map_err(|e| match e {
            ureq::Error::Status(code, resp) => {
                unavailable(format!("server returned {code} {}", resp.status_text()))
            }
            ureq::Error::Transport(t) => unavailable(t.to_string()),
        })?;

    match format_of(url) {
        Some(Format::Json) => {
            let text = response
                .into_string()
                .map_err(|e| unavailable(e.to_string()))?;
            read_json(&text, url)
        }
        Some(Format::Parquet) => Err(unavailable(
            "remote Parquet is not supported; download the file and open it locally".to_string(),
        )),
        _ => read_csv(response.into_reader(), url),
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// Read a CSV table with a header row. Cells are typed by inference.
pub fn read_csv<R: Read>(reader: R, source_name: &str) -> Result<Dataset> {
    let parse = |reason: String| PipelineError::Parse {
        source_name: source_name.to_string(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| parse(format!("reading CSV headers: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| parse(format!("CSV row {row_no}: {e}")))?;

        let values: BTreeMap<String, Value> = headers
            .iter()
            .enumerate()
            .map(|(i, col)| (col.clone(), Value::infer(record.get(i).unwrap_or(""))))
            .collect();
        rows.push(Record::new(values));
    }

    Ok(Dataset::from_records(headers, rows))
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`:
///
/// ```json
/// [
///   { "State": "Punjab", "Crop": "Rice", "year": 2020, "MSP": 1868.0 },
///   ...
/// ]
/// ```
pub fn read_json(text: &str, source_name: &str) -> Result<Dataset> {
    let parse = |reason: String| PipelineError::Parse {
        source_name: source_name.to_string(),
        reason,
    };

    let root: JsonValue = serde_json::from_str(text).map_err(|e| parse(e.to_string()))?;
    let records = root
        .as_array()
        .ok_or_else(|| parse("expected top-level JSON array".to_string()))?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| parse(format!("row {i} is not a JSON object")))?;

        let mut values = BTreeMap::new();
        for (key, val) in obj {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
            values.insert(key.clone(), json_to_value(val));
        }
        rows.push(Record::new(values));
    }

    Ok(Dataset::from_records(columns, rows))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Read a Parquet file with flat columns.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn read_parquet(file: std::fs::File, source_name: &str) -> Result<Dataset> {
    let parse = |reason: String| PipelineError::Parse {
        source_name: source_name.to_string(),
        reason,
    };

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| parse(format!("reading parquet metadata: {e}")))?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder
        .build()
        .map_err(|e| parse(format!("building parquet reader: {e}")))?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.map_err(|e| parse(format!("reading record batch: {e}")))?;
        for row in 0..batch.num_rows() {
            let values: BTreeMap<String, Value> = columns
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), extract_value(batch.column(i), row)))
                .collect();
            rows.push(Record::new(values));
        }
    }

    Ok(Dataset::from_records(columns, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &Arc<dyn Array>, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| Value::Text(a.value(row).to_string())),
        DataType::LargeUtf8 => any
            .downcast_ref::<LargeStringArray>()
            .map(|a| Value::Text(a.value(row).to_string())),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| Value::Integer(a.value(row) as i64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| Value::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| Value::Float(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| Value::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| Value::Bool(a.value(row))),
        _ => None,
    };
    value.unwrap_or_else(|| Value::Text(format!("{:?}", col.data_type())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "State,Crop,year,Yield_(kg/Ha)\n\
                          A,Rice,2020,10\n\
                          A,Rice,2021,\n\
                          B,Wheat,2020,5.5\n";

    #[test]
    fn reads_csv_with_inferred_types() {
        let ds = read_csv(SAMPLE.as_bytes(), "inline").unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(
            ds.column_names,
            vec!["State", "Crop", "year", "Yield_(kg/Ha)"]
        );
        assert_eq!(ds.rows[0].get("year"), &Value::Integer(2020));
        assert_eq!(ds.rows[1].get("Yield_(kg/Ha)"), &Value::Null);
        assert_eq!(ds.rows[2].get("Yield_(kg/Ha)"), &Value::Float(5.5));
        assert!(ds.is_numeric("year"));
        assert!(!ds.is_numeric("State"));
    }

    #[test]
    fn reads_json_records() {
        let text = r#"[{"State": "A", "year": 2020, "MSP": 1.5}, {"State": "B", "year": null}]"#;
        let ds = read_json(text, "inline").unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows[1].get("year"), &Value::Null);
        assert_eq!(ds.rows[1].get("MSP"), &Value::Null);
        assert!(ds.has_column("MSP"));
    }

    #[test]
    fn rejects_non_array_json() {
        let err = read_json(r#"{"State": "A"}"#, "inline").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }

    #[test]
    fn loads_csv_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let ds = load(&Source::File(file.path().to_path_buf()), &LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn loads_parquet_file_by_extension() {
        use arrow::array::ArrayRef;
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![
            Field::new("State", DataType::Utf8, false),
            Field::new("year", DataType::Int64, false),
            Field::new("MSP", DataType::Float64, true),
        ]));
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec!["A", "B"])),
            Arc::new(Int64Array::from(vec![2020, 2021])),
            Arc::new(Float64Array::from(vec![Some(1750.5), None])),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer = ArrowWriter::try_new(file.reopen().unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load(&Source::File(file.path().to_path_buf()), &LoadOptions::default()).unwrap();
        assert_eq!(ds.column_names, vec!["State", "year", "MSP"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows[0].get("State"), &Value::from("A"));
        assert_eq!(ds.rows[1].get("year"), &Value::Integer(2021));
        assert_eq!(ds.rows[0].get("MSP"), &Value::Float(1750.5));
        assert_eq!(ds.rows[1].get("MSP"), &Value::Null);
        assert!(ds.is_numeric("year"));
        assert!(ds.is_numeric("MSP"));
        assert!(!ds.is_numeric("State"));
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let err = load_file(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
    }

    #[test]
    fn unknown_extension_is_source_unavailable() {
        let err = load_file(Path::new("data.xlsx")).unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
    }
}
