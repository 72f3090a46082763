//! CSV export of generated alt text.

use crate::error::{AltTextError, Result};
use crate::types::ImageRecord;

pub const CSV_HEADER: &str = "Filename/URL,Generated Alt Text";

/// Serialize `(label, alt text)` pairs as CSV.
///
/// Only records with non-empty alt text produce a row, in collection order.
/// Both fields are always quoted, with embedded quotes doubled.
///
/// # Errors
///
/// [`AltTextError::NothingToExport`] if the collection is empty or no record
/// has alt text yet.
pub fn export_csv(records: &[ImageRecord]) -> Result<String> {
    let captioned: Vec<(&str, &str)> = records
        .iter()
        .filter_map(|r| match r.alt_text.as_deref() {
            Some(text) if !text.is_empty() => Some((r.label(), text)),
            _ => None,
        })
        .collect();

    if captioned.is_empty() {
        return Err(AltTextError::NothingToExport);
    }

    let mut out = Vec::new();
    out.extend_from_slice(CSV_HEADER.as_bytes());
    out.push(b'\n');

    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Always)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(&mut out);

        for row in &captioned {
            writer.write_record([row.0, row.1])?;
        }
        writer.flush()?;
    }

    String::from_utf8(out).map_err(|e| AltTextError::Other(e.to_string()))
}
