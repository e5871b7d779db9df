use std::collections::{BTreeSet, HashMap};

use crate::errors::{BigPandaError, Result};

/// Serialize mapping records into the CSV document expected by the
/// mapping-enrichment upload endpoint.
///
/// The header row is the sorted union of the field names across all
/// records. Records missing a header field produce an empty cell; a
/// record can never carry a field outside the header, since the header
/// is derived from the records themselves.
pub(crate) fn records_to_csv(records: &[HashMap<String, String>]) -> Result<String> {
    let mut columns: BTreeSet<&str> = BTreeSet::new();
    for record in records {
        columns.extend(record.keys().map(String::as_str));
    }
    if columns.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns).map_err(BigPandaError::Csv)?;
    for record in records {
        let row = columns
            .iter()
            .map(|column| record.get(*column).map(String::as_str).unwrap_or(""));
        writer.write_record(row).map_err(BigPandaError::Csv)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| BigPandaError::Csv(err.into_error().into()))?;
    Ok(String::from_utf8(bytes).expect("CSV output is UTF-8"))
}

/// Extract the enrichment name from an uploaded CSV document.
///
/// The second header column is the result tag, which names the
/// enrichment upstream.
pub(crate) fn enrichment_name_from_csv(csv_text: &str) -> Result<String> {
    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let headers = reader.headers().map_err(BigPandaError::Csv)?;
    headers.get(1).map(str::to_string).ok_or_else(|| {
        BigPandaError::Validation(
            "CSV header must have at least two columns; the second names the enrichment"
                .to_string(),
        )
    })
}
