//! Delimited (CSV/TSV) table reader with per-column dtype inference.
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::dataset::{Column, ColumnData, Dataset};
use crate::error::{ModelingError, Result};

/// Cell values read as missing.
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Read a delimited file into a `Dataset`.
///
/// Files ending in `.tsv` or `.tab` are tab separated, everything else is
/// read as CSV. The first row holds the column names.
pub fn read_delimited<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    let delimiter = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("tab") => b'\t',
        _ => b',',
    };
    let file = std::fs::File::open(path)?;
    let dataset = read_delimited_from_reader(file, delimiter)?;
    log::info!("Read {} rows from {}", dataset.n_rows(), path.display());
    dataset.log_summary();
    Ok(dataset)
}

/// Read delimited text from any reader.
pub fn read_delimited_from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if let Some(empty) = headers.iter().position(|h| h.is_empty()) {
        return Err(ModelingError::ShapeMismatch(format!(
            "header column {} has no name",
            empty + 1
        )));
    }

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        for (column, value) in cells.iter_mut().zip(record.iter()) {
            column.push(if MISSING_MARKERS.contains(&value) {
                None
            } else {
                Some(value.to_string())
            });
        }
    }

    let columns = headers
        .iter()
        .zip(cells)
        .map(|(name, values)| {
            let data = infer_column(values);
            log::debug!("Column '{}' inferred as {}", name, data.dtype());
            Column::new(name, data)
        })
        .collect();
    Dataset::new(columns)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_all<T>(values: &[Option<String>], parse: impl Fn(&str) -> Option<T>) -> Option<Vec<Option<T>>> {
    values
        .iter()
        .map(|v| match v {
            None => Some(None),
            Some(s) => parse(s).map(Some),
        })
        .collect()
}

/// Narrowest of integer, float, boolean and text that fits every present cell.
/// A column with no present cells is float.
fn infer_column(values: Vec<Option<String>>) -> ColumnData {
    if values.iter().all(Option::is_none) {
        return ColumnData::Float(vec![None; values.len()]);
    }
    if let Some(ints) = parse_all(&values, |s| s.parse::<i64>().ok()) {
        return ColumnData::Integer(ints);
    }
    if let Some(floats) = parse_all(&values, |s| s.parse::<f64>().ok().filter(|f| !f.is_nan())) {
        return ColumnData::Float(floats);
    }
    if let Some(bools) = parse_all(&values, parse_bool) {
        return ColumnData::Boolean(bools);
    }
    ColumnData::Text(values)
}
