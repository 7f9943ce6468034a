//! CSV loading for source tables.
//!
//! The loader is deliberately lenient at the cell level: a value that fails
//! to parse becomes `None` and is left to the repair stage to deal with. Only
//! a file that cannot be opened or read at all is an error, which the
//! pipeline treats as that source being unavailable.

use super::{TableSchema, TrackRecord, TrackTable};
use crate::pipeline::normalize::{mark_present, resolve_column, Column};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Load one CSV file into a [`TrackTable`], applying the schema normalizer's
/// column mapping to the headers.
pub fn load_csv(path: &Path) -> Result<TrackTable> {
    let source = source_name(path);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open source file: {:?}", path))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read headers from: {:?}", path))?
        .clone();

    let mut schema = TableSchema::default();
    let columns: Vec<Option<Column>> = headers
        .iter()
        .map(|header| {
            let column = resolve_column(header);
            if let Some(column) = column {
                mark_present(&mut schema, column);
            }
            column
        })
        .collect();

    let mut table = TrackTable::new(source, schema);
    for record in reader.records() {
        let record =
            record.with_context(|| format!("Failed to read a row from: {:?}", path))?;
        let mut row = TrackRecord::default();
        for (value, column) in record.iter().zip(&columns) {
            if let Some(column) = column {
                set_cell(&mut row, *column, value);
            }
        }
        table.rows.push(row);
    }

    info!(
        source = %table.source,
        rows = table.len(),
        "loaded source table"
    );
    Ok(table)
}

/// The source identifier for a path: the file stem, so that decade tokens
/// like `dataset-of-80s` survive intact.
pub fn source_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn set_cell(row: &mut TrackRecord, column: Column, raw: &str) {
    let raw = raw.trim();
    if raw.is_empty() {
        return;
    }
    match column {
        Column::RowId => row.row_id = raw.parse().ok(),
        Column::TrackId => row.track_id = Some(raw.to_string()),
        Column::Uri => row.uri = Some(raw.to_string()),
        Column::TrackName => row.track_name = Some(raw.to_string()),
        Column::ArtistName => row.artist_name = Some(raw.to_string()),
        Column::Energy => row.energy = parse_float(raw),
        Column::Loudness => row.loudness = parse_float(raw),
        Column::Tempo => row.tempo = parse_float(raw),
        Column::Danceability => row.danceability = parse_float(raw),
        Column::Valence => row.valence = parse_float(raw),
        Column::DurationMs => row.duration_ms = parse_float(raw),
        Column::Year => row.year = parse_year(raw),
        Column::Genre => row.genre = Some(raw.to_string()),
    }
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Years sometimes arrive as floats ("1985.0") from spreadsheet round-trips.
fn parse_year(raw: &str) -> Option<i32> {
    if let Ok(year) = raw.parse::<i32>() {
        return Some(year);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v as i32)
}
