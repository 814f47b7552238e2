use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(object)) = (data, response.as_object_mut()) {
                object.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(
    output_format: &OutputFormat,
    message: &str,
    error_code: Option<&str>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    collection_name: []
                }))?
            );
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Output a single DOOR record keyed by its id.
///
/// Text output is one `key: value` line per top-level field.
pub fn output_record<T: Serialize>(
    output_format: &OutputFormat,
    kind: &str,
    id: &str,
    record: &T,
) -> anyhow::Result<()> {
    let value = serde_json::to_value(record)?;
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "id": id, kind: value }))?
            );
        }
        OutputFormat::Text => {
            println!("{} {}", kind, id);
            if let Value::Object(fields) = &value {
                for (key, field) in fields {
                    println!("  {}: {}", key, text_value(field));
                }
            }
        }
    }
    Ok(())
}

/// Wrap records whose id is not part of their JSON as `{"id", kind}`,
/// the same shape `output_record` prints.
pub fn keyed_records<T: Serialize>(
    kind: &str,
    records: &[T],
    id: impl Fn(&T) -> &str,
) -> anyhow::Result<Vec<Value>> {
    records
        .iter()
        .map(|record| Ok(json!({ "id": id(record), kind: serde_json::to_value(record)? })))
        .collect()
}

/// Output a list of records, one summary line each in text mode.
pub fn output_collection<T: Serialize>(
    output_format: &OutputFormat,
    collection_name: &str,
    records: &[T],
    summary: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if records.is_empty() {
        return output_empty_collection(
            output_format,
            collection_name,
            &format!("No {} found", collection_name),
        );
    }

    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ collection_name: records }))?
            );
        }
        OutputFormat::Text => {
            for record in records {
                println!("{}", summary(record));
            }
            println!("{} {}", records.len(), collection_name);
        }
    }
    Ok(())
}

fn text_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
