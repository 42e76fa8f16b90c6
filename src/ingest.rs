use std::collections::HashSet;

use encoding_rs::{Encoding, UTF_8};
use log::{debug, info};

use crate::{
    data::{Column, Table, infer_kind, parse_typed_value},
    error::{DashboardError, DashboardResult, Source},
    io_utils,
};

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
        }
    }
}

/// Parses an uploaded CSV byte stream (header row required) into a [`Table`].
pub fn read_csv(bytes: &[u8], side: Source, options: &IngestOptions) -> DashboardResult<Table> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(DashboardError::parse(side, "no columns to parse from input"));
    }

    let mut reader = io_utils::open_csv_reader(bytes, options.delimiter);
    let raw_headers = io_utils::reader_headers(&mut reader, options.encoding)
        .map_err(|err| DashboardError::parse(side, format!("reading header row: {err:#}")))?;
    if raw_headers.iter().all(|h| h.trim().is_empty()) {
        return Err(DashboardError::parse(side, "header row is empty"));
    }
    let headers = dedupe_headers(&raw_headers);

    let mut fields: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.map_err(|err| {
            DashboardError::parse(side, format!("reading row {}: {err}", row_idx + 2))
        })?;
        let line = row_idx + 2;
        if record.len() > headers.len() {
            return Err(DashboardError::parse(
                side,
                format!(
                    "row {line} has {} fields, but the header has {}",
                    record.len(),
                    headers.len()
                ),
            ));
        }
        let mut decoded = io_utils::decode_record(&record, options.encoding).map_err(|err| {
            DashboardError::parse(side, format!("decoding row {line}: {err:#}"))
        })?;
        // Short rows: trailing cells are missing.
        decoded.resize(headers.len(), String::new());
        for (column, value) in fields.iter_mut().zip(decoded) {
            column.push(value);
        }
    }

    let columns = headers
        .into_iter()
        .zip(fields)
        .map(|(name, raw)| {
            let kind = infer_kind(raw.iter().map(String::as_str));
            debug!("Column '{name}' in {side} inferred as {}", kind.label());
            let values = raw.iter().map(|v| parse_typed_value(v, kind)).collect();
            Column::new(name, kind, values)
        })
        .collect::<Vec<_>>();

    let table = Table::from_columns(columns)
        .ok_or_else(|| DashboardError::parse(side, "columns have unequal lengths"))?;
    info!(
        "Ingested {} row(s) across {} column(s) from {side}",
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

/// Names blank headers `Unnamed: <idx>` and suffixes repeats as `name.1`,
/// `name.2`, ... so every column name in a table is unique.
fn dedupe_headers(raw: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::with_capacity(raw.len());
    for (idx, name) in raw.iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {idx}")
        } else {
            name.clone()
        };
        let mut candidate = base.clone();
        let mut counter = 1usize;
        while seen.contains(&candidate) {
            candidate = format!("{base}.{counter}");
            counter += 1;
        }
        seen.insert(candidate.clone());
        headers.push(candidate);
    }
    headers
}
