//! Field repair: range validation, date derivation, and normalization.
//!
//! This is a filter pipeline for unrecoverable fields: a row that fails a
//! hard constraint is dropped and counted, never patched. Later steps operate
//! on the survivors of earlier ones, so the order here is load-bearing.

use crate::table::TrackTable;
use chrono::{Datelike, NaiveDate};
use tracing::info;

pub const MIN_RELEASE_YEAR: i32 = 1920;
pub const MAX_RELEASE_YEAR: i32 = 2024;

pub const MIN_LOUDNESS_DB: f64 = -60.0;
pub const MAX_LOUDNESS_DB: f64 = 0.0;

/// Per-reason drop counts for one table's repair pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub missing_energy_or_loudness: usize,
    pub energy_out_of_range: usize,
    pub loudness_out_of_range: usize,
    pub missing_year: usize,
    pub invalid_date: usize,
    pub year_out_of_range: usize,
    pub genres_defaulted: usize,
    pub energy_rescaled: bool,
}

impl RepairReport {
    pub fn total_dropped(&self) -> usize {
        self.missing_energy_or_loudness
            + self.energy_out_of_range
            + self.loudness_out_of_range
            + self.missing_year
            + self.invalid_date
            + self.year_out_of_range
    }
}

/// Run the full repair sequence on one table.
pub fn repair(table: &mut TrackTable) -> RepairReport {
    let mut report = RepairReport::default();

    drop_missing_critical(table, &mut report);
    drop_out_of_range(table, &mut report);
    repair_dates(table, &mut report);
    default_genres(table, &mut report);
    report.energy_rescaled = rescale_energy(table);
    normalize_loudness(table);
    derive_date_columns(table);

    info!(
        source = %table.source,
        dropped = report.total_dropped(),
        remaining = table.len(),
        "repaired source table"
    );
    report
}

/// Step 1: a track without both energy and loudness is unusable for the
/// intensity metric. Only applies when the source carries both columns.
fn drop_missing_critical(table: &mut TrackTable, report: &mut RepairReport) {
    if !(table.schema.has_energy && table.schema.has_loudness) {
        return;
    }
    let before = table.len();
    table
        .rows
        .retain(|row| row.energy.is_some() && row.loudness.is_some());
    report.missing_energy_or_loudness = before - table.len();
}

/// Step 2: range checks on the surviving values.
fn drop_out_of_range(table: &mut TrackTable, report: &mut RepairReport) {
    if table.schema.has_energy {
        let before = table.len();
        table.rows.retain(|row| match row.energy {
            Some(energy) => (0.0..=1.0).contains(&energy),
            None => true,
        });
        report.energy_out_of_range = before - table.len();
    }
    if table.schema.has_loudness {
        let before = table.len();
        table.rows.retain(|row| match row.loudness {
            Some(loudness) => (MIN_LOUDNESS_DB..=MAX_LOUDNESS_DB).contains(&loudness),
            None => true,
        });
        report.loudness_out_of_range = before - table.len();
    }
}

/// Step 3: derive `release_date` from the raw year, dropping rows where the
/// year is missing, underivable, or outside the plausible range.
fn repair_dates(table: &mut TrackTable, report: &mut RepairReport) {
    if !table.schema.has_year {
        return;
    }

    let before = table.len();
    table.rows.retain(|row| row.year.is_some());
    report.missing_year = before - table.len();

    let before = table.len();
    table.rows.retain_mut(|row| {
        // retain above guarantees year is set
        let Some(year) = row.year else { return false };
        match NaiveDate::from_ymd_opt(year, 1, 1) {
            Some(date) => {
                row.release_date = Some(date);
                true
            }
            None => false,
        }
    });
    report.invalid_date = before - table.len();

    let before = table.len();
    table.rows.retain(|row| match row.release_date {
        Some(date) => (MIN_RELEASE_YEAR..=MAX_RELEASE_YEAR).contains(&date.year()),
        None => false,
    });
    report.year_out_of_range = before - table.len();

    table.schema.has_release_date = true;
}

/// Step 4: every surviving row gets a genre. A table without a genre column
/// gets the literal "Unknown" everywhere; in a table that has one, nulls are
/// filled and the whole column is lowercased and trimmed.
fn default_genres(table: &mut TrackTable, report: &mut RepairReport) {
    if !table.schema.has_genre {
        for row in &mut table.rows {
            row.genre = Some("Unknown".to_string());
            report.genres_defaulted += 1;
        }
        table.schema.has_genre = true;
        return;
    }
    for row in &mut table.rows {
        let raw = row.genre.as_deref().unwrap_or("Unknown");
        if row.genre.is_none() {
            report.genres_defaulted += 1;
        }
        row.genre = Some(raw.trim().to_lowercase());
    }
}

/// Step 5: some exports use a 0-100 energy scale. If the maximum observed
/// value exceeds 1 the whole column is divided by 100, then clamped.
/// Returns whether the rescale fired.
pub fn rescale_energy(table: &mut TrackTable) -> bool {
    if !table.schema.has_energy {
        return false;
    }
    let max = table
        .rows
        .iter()
        .filter_map(|row| row.energy)
        .fold(f64::NEG_INFINITY, f64::max);
    let rescale = max > 1.0;
    for row in &mut table.rows {
        if let Some(energy) = row.energy {
            let energy = if rescale { energy / 100.0 } else { energy };
            row.energy = Some(energy.clamp(0.0, 1.0));
        }
    }
    rescale
}

/// Step 6: clamp loudness to its dB range and derive the 0-1 normalized
/// version used by the intensity metric.
fn normalize_loudness(table: &mut TrackTable) {
    if !table.schema.has_loudness {
        return;
    }
    for row in &mut table.rows {
        if let Some(loudness) = row.loudness {
            let clamped = loudness.clamp(MIN_LOUDNESS_DB, MAX_LOUDNESS_DB);
            row.loudness = Some(clamped);
            row.loudness_normalized = Some(((clamped + 60.0) / 60.0).clamp(0.0, 1.0));
        }
    }
    table.schema.has_loudness_normalized = true;
}

/// Step 7: derive `release_year` and `release_decade` from the repaired date.
fn derive_date_columns(table: &mut TrackTable) {
    if !table.schema.has_release_date {
        return;
    }
    for row in &mut table.rows {
        if let Some(date) = row.release_date {
            let year = date.year();
            row.release_year = Some(year);
            row.release_decade = Some(decade_label(year));
        }
    }
    table.schema.has_release_year = true;
    table.schema.has_release_decade = true;
}

/// `1985` -> `"1980s"`.
pub fn decade_label(year: i32) -> String {
    format!("{}s", (year / 10) * 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{TableSchema, TrackRecord};

    fn audio_schema() -> TableSchema {
        TableSchema {
            has_energy: true,
            has_loudness: true,
            has_year: true,
            has_genre: true,
            ..Default::default()
        }
    }

    fn row(energy: Option<f64>, loudness: Option<f64>, year: Option<i32>) -> TrackRecord {
        TrackRecord {
            energy,
            loudness,
            year,
            ..Default::default()
        }
    }

    #[test]
    fn test_drops_missing_and_out_of_range() {
        let mut table = TrackTable::new("test", audio_schema());
        table.rows = vec![
            row(Some(0.5), Some(-10.0), Some(1985)), // survives
            row(None, Some(-10.0), Some(1985)),      // missing energy
            row(Some(1.5), Some(-10.0), Some(1985)), // energy out of range
            row(Some(0.5), Some(-80.0), Some(1985)), // loudness out of range
            row(Some(0.5), Some(-10.0), None),       // missing year
            row(Some(0.5), Some(-10.0), Some(1890)), // year out of range
            row(Some(0.5), Some(-10.0), Some(2030)), // future year
        ];

        let report = repair(&mut table);

        assert_eq!(table.len(), 1);
        assert_eq!(report.missing_energy_or_loudness, 1);
        assert_eq!(report.energy_out_of_range, 1);
        assert_eq!(report.loudness_out_of_range, 1);
        assert_eq!(report.missing_year, 1);
        assert_eq!(report.year_out_of_range, 2);
        assert_eq!(report.total_dropped(), 6);
    }

    #[test]
    fn test_derives_date_columns() {
        let mut table = TrackTable::new("test", audio_schema());
        table.rows = vec![row(Some(0.5), Some(-30.0), Some(1987))];

        repair(&mut table);

        let record = &table.rows[0];
        assert_eq!(
            record.release_date,
            NaiveDate::from_ymd_opt(1987, 1, 1)
        );
        assert_eq!(record.release_year, Some(1987));
        assert_eq!(record.release_decade.as_deref(), Some("1980s"));
        assert!((record.loudness_normalized.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_loudness_normalized_round_trip() {
        let mut table = TrackTable::new("test", audio_schema());
        table.rows = vec![
            row(Some(0.2), Some(-60.0), Some(1960)),
            row(Some(0.2), Some(-33.3), Some(1960)),
            row(Some(0.2), Some(0.0), Some(1960)),
        ];

        repair(&mut table);

        for record in &table.rows {
            let loudness = record.loudness.unwrap();
            let expected = (loudness + 60.0) / 60.0;
            assert!((record.loudness_normalized.unwrap() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rescale_energy_from_percent_scale() {
        let mut table = TrackTable::new(
            "test",
            TableSchema {
                has_energy: true,
                ..Default::default()
            },
        );
        table.rows = vec![
            row(Some(45.0), None, None),
            row(Some(90.0), None, None),
        ];

        let rescaled = rescale_energy(&mut table);

        assert!(rescaled);
        assert_eq!(table.rows[0].energy, Some(0.45));
        assert_eq!(table.rows[1].energy, Some(0.90));
    }

    #[test]
    fn test_rescale_noop_for_unit_scale() {
        let mut table = TrackTable::new(
            "test",
            TableSchema {
                has_energy: true,
                ..Default::default()
            },
        );
        table.rows = vec![row(Some(0.45), None, None), row(Some(0.90), None, None)];

        assert!(!rescale_energy(&mut table));
        assert_eq!(table.rows[0].energy, Some(0.45));
    }

    #[test]
    fn test_missing_genre_column_defaults_all_rows() {
        let mut schema = audio_schema();
        schema.has_genre = false;
        let mut table = TrackTable::new("test", schema);
        table.rows = vec![row(Some(0.5), Some(-10.0), Some(1985))];

        let report = repair(&mut table);

        assert!(table.schema.has_genre);
        assert_eq!(report.genres_defaulted, 1);
        assert_eq!(table.rows[0].genre.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_genre_lowercased_and_trimmed() {
        let mut table = TrackTable::new("test", audio_schema());
        let mut record = row(Some(0.5), Some(-10.0), Some(1985));
        record.genre = Some("  Hard Rock ".into());
        table.rows = vec![record];

        repair(&mut table);
        assert_eq!(table.rows[0].genre.as_deref(), Some("hard rock"));
    }

    #[test]
    fn test_tables_without_audio_columns_pass_through() {
        // No energy/loudness/year columns at all: nothing to validate.
        let mut table = TrackTable::new("test", TableSchema::default());
        table.rows = vec![TrackRecord {
            track_name: Some("Song".into()),
            ..Default::default()
        }];

        let report = repair(&mut table);
        assert_eq!(table.len(), 1);
        assert_eq!(report.total_dropped(), 0);
    }
}
