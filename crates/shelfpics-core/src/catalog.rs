use crate::{Error, Result};
use calamine::{Data, Range, Reader, open_workbook_auto};
use serde::Serialize;
use std::path::Path;

/// One spreadsheet row to fetch pictures for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogRecord {
    pub item_code: String,
    pub trademark: String,
    pub product_type: String,
}

/// Read catalog records from the first worksheet of a spreadsheet.
///
/// Row 1 is a header. Columns are positional: item code, trademark,
/// product type.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogRecord>> {
    tracing::debug!("Reading catalog from: {}", path.display());

    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Catalog(format!("{} has no worksheets", path.display())))??;

    let records = records_from_range(&range);
    tracing::info!(
        "Loaded {} catalog records from {}",
        records.len(),
        path.display()
    );

    Ok(records)
}

/// Map every populated row below the header to a record
pub fn records_from_range(range: &Range<Data>) -> Vec<CatalogRecord> {
    let Some((last_row, _)) = range.end() else {
        return Vec::new();
    };

    (1..=last_row)
        .map(|row| CatalogRecord {
            item_code: cell_text(range, row, 0),
            trademark: cell_text(range, row, 1),
            product_type: cell_text(range, row, 2),
        })
        .collect()
}

fn cell_text(range: &Range<Data>, row: u32, col: u32) -> String {
    range
        .get_value((row, col))
        .map(|value| value.to_string().trim().to_string())
        .unwrap_or_default()
}
