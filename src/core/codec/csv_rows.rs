use super::CodecError;
use serde_json::{Map, Value};

/// Header row names the fields; each following row becomes a mapping of header to cell.
/// Reading stops quietly at the first row that fails to parse.
pub(super) fn decode(bytes: &[u8]) -> Result<Value, CodecError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(CodecError::Shape("csv input has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                tracing::debug!(error = %err, rows = rows.len(), "csv decoding stopped early");
                break;
            }
        };
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(name, cell)| (name.to_string(), Value::String(cell.to_string())))
            .collect::<Map<String, Value>>();
        rows.push(Value::Object(row));
    }
    Ok(Value::Array(rows))
}

/// Columns follow the key order of the first record; absent cells are written empty.
pub(super) fn encode(value: &Value) -> Result<Vec<u8>, CodecError> {
    let records = value
        .as_array()
        .filter(|records| !records.is_empty())
        .ok_or_else(|| {
            CodecError::Shape("csv encoding requires a non-empty sequence of mappings".to_string())
        })?;
    let records = records
        .iter()
        .map(|record| {
            record.as_object().ok_or_else(|| {
                CodecError::Shape(format!("csv record is not a mapping: {}", record))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let header: Vec<&str> = records[0].keys().map(String::as_str).collect();
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(&header)?;
    for record in &records {
        writer.write_record(
            header
                .iter()
                .map(|column| record.get(*column).map(cell_text).unwrap_or_default()),
        )?;
    }
    writer
        .into_inner()
        .map_err(|err| CodecError::Shape(format!("failed to flush csv output: {}", err)))
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
