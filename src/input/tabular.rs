//! First-column extraction for comma-separated input.

/// Return the first field of every record, skipping blank or missing cells.
///
/// Records may have differing field counts; there is no header row.
pub fn first_column(content: &str) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut cells = Vec::new();
    for (index, record) in reader.records().enumerate() {
        match record {
            Ok(record) => {
                if let Some(cell) = record.get(0).filter(|c| !c.trim().is_empty()) {
                    cells.push(cell.to_string());
                }
            }
            Err(e) => tracing::warn!(record = index, error = %e, "skipping malformed row"),
        }
    }
    cells
}
