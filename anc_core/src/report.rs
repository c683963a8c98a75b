//! CSV export of indicator results.

use crate::{IndicatorResult, Result};
use std::io::Write;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    name: &'a str,
    numerator: usize,
    denominator: usize,
    percentage: String,
    target: String,
    status: String,
}

impl<'a> From<&'a IndicatorResult> for CsvRow<'a> {
    fn from(result: &'a IndicatorResult) -> Self {
        CsvRow {
            id: &result.id,
            name: &result.name,
            numerator: result.numerator,
            denominator: result.denominator,
            percentage: format!("{:.2}", result.percentage),
            target: format!("{:.1}", result.target),
            status: result.status.to_string(),
        }
    }
}

/// Write indicator results as CSV, one row per indicator, with headers
pub fn write_indicators_csv<W: Write>(results: &[IndicatorResult], writer: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);

    for result in results {
        writer.serialize(CsvRow::from(result))?;
    }

    writer.flush()?;
    tracing::debug!("Wrote {} indicator rows to CSV", results.len());
    Ok(())
}
