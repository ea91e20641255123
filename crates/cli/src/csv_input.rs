//! CSV file to leads + aligned sidecar.
//!
//! The header row names the platform fields; each data row becomes one lead
//! field-map. The same rows, untouched, become the sidecar used to re-export
//! failed leads in their original shape.

use leadsync_engine::{CsvSidecar, FieldMap};

use crate::exit_codes;
use crate::CliError;

pub fn parse_leads(text: &str) -> Result<(Vec<FieldMap>, CsvSidecar), CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| parse_error(format!("cannot read CSV header: {e}")))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut leads = Vec::new();
    let mut rows = Vec::new();

    for (line, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| parse_error(format!("cannot read CSV row {}: {e}", line + 2)))?;

        let mut lead = FieldMap::new();
        for (i, name) in header.iter().enumerate() {
            let value = record.get(i).unwrap_or("");
            lead.insert(name.clone(), value.into());
        }

        rows.push(record.iter().map(|v| v.to_string()).collect());
        leads.push(lead);
    }

    Ok((leads, CsvSidecar { header, rows }))
}

fn parse_error(message: String) -> CliError {
    CliError {
        code: exit_codes::EXIT_USAGE,
        message,
        hint: Some("expected a CSV file with a header row of platform field names".into()),
    }
}
