use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a result as the JSON envelope, or as the plain text summary
pub fn output_success(output_format: OutputFormat, text: &str, data: Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let response = json!({
                "success": true,
                "data": data
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("{}", text);
        }
    }
    Ok(())
}

/// Output rows as aligned two-column text, or as a JSON array
pub fn output_table(output_format: OutputFormat, rows: &[(String, String)], data: Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => output_success(output_format, "", data),
        OutputFormat::Text => {
            let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
            for (left, right) in rows {
                println!("{:<width$}  {}", left, right, width = width);
            }
            Ok(())
        }
    }
}

/// Render an optional timestamp for text output
pub fn format_until(until: Option<chrono::DateTime<chrono::Utc>>) -> String {
    until.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_until() {
        assert_eq!(format_until(None), "-");
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(format_until(Some(at)), "2026-03-01T12:00:00+00:00");
    }
}
