//! Cross-source conflict resolution.
//!
//! After combining, the same track can appear once per source. Groups are
//! formed by the best available identity key and collapsed to a single row
//! using a fixed per-field aggregation contract. Each aggregation ignores
//! missing values, so a group where some source lacks a field still merges
//! cleanly.

use crate::pipeline::genre::clean_genre;
use crate::table::{MainGenre, TrackRecord, TrackTable};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{info, warn};

/// Which identity the resolver grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveKey {
    TrackId,
    NameArtist,
}

/// Result of a resolution pass. `key` is `None` when no identity column was
/// available and the table was returned unresolved.
#[derive(Debug)]
pub struct ResolveOutcome {
    pub key: Option<ResolveKey>,
    pub input_rows: usize,
    pub output_rows: usize,
    pub merged_groups: usize,
}

/// Collapse duplicate identities in the combined table. Rows that lack the
/// identity field entirely pass through unmerged.
pub fn resolve(table: TrackTable) -> (TrackTable, ResolveOutcome) {
    let key = if table.schema.has_track_id {
        Some(ResolveKey::TrackId)
    } else if table.schema.has_track_name && table.schema.has_artist_name {
        Some(ResolveKey::NameArtist)
    } else {
        None
    };

    let Some(key) = key else {
        warn!("cannot identify duplicates: no usable identity columns, returning table unresolved");
        let outcome = ResolveOutcome {
            key: None,
            input_rows: table.len(),
            output_rows: table.len(),
            merged_groups: 0,
        };
        return (table, outcome);
    };

    let input_rows = table.len();

    // Group rows by rendered key, preserving first-encounter order.
    let mut order: Vec<Option<String>> = Vec::new();
    let mut groups: HashMap<String, Vec<TrackRecord>> = HashMap::new();
    let mut passthrough: Vec<(usize, TrackRecord)> = Vec::new();

    for row in table.rows {
        match render_key(key, &row) {
            Some(rendered) => {
                let slot = groups.entry(rendered.clone()).or_default();
                if slot.is_empty() {
                    order.push(Some(rendered));
                }
                slot.push(row);
            }
            None => {
                passthrough.push((order.len(), row));
                order.push(None);
            }
        }
    }

    let mut merged_groups = 0;
    let mut rows = Vec::with_capacity(order.len());
    let mut passthrough = passthrough.into_iter().peekable();
    for (position, slot) in order.into_iter().enumerate() {
        match slot {
            Some(rendered) => {
                let group = groups.remove(&rendered).unwrap_or_default();
                if group.len() > 1 {
                    merged_groups += 1;
                }
                rows.push(merge_group(group));
            }
            None => {
                if let Some((_, row)) = passthrough.next_if(|(pos, _)| *pos == position) {
                    rows.push(row);
                }
            }
        }
    }

    let outcome = ResolveOutcome {
        key: Some(key),
        input_rows,
        output_rows: rows.len(),
        merged_groups,
    };
    info!(
        key = ?key,
        input = input_rows,
        output = rows.len(),
        merged_groups,
        "resolved cross-source duplicates"
    );

    let mut resolved = TrackTable::new(table.source, table.schema);
    resolved.rows = rows;
    (resolved, outcome)
}

fn render_key(key: ResolveKey, row: &TrackRecord) -> Option<String> {
    match key {
        ResolveKey::TrackId => row.track_id.clone(),
        ResolveKey::NameArtist => match (&row.track_name, &row.artist_name) {
            (Some(name), Some(artist)) => Some(format!("{}\u{1f}{}", name, artist)),
            _ => None,
        },
    }
}

/// Collapse one group to a single record using the per-field aggregation
/// contract.
fn merge_group(group: Vec<TrackRecord>) -> TrackRecord {
    if group.len() == 1 {
        return group.into_iter().next().unwrap_or_default();
    }

    let genre = mode_or_default(
        group.iter().filter_map(|r| r.genre.clone()),
        "Unknown".to_string(),
    );
    let genre_clean = Some(clean_genre(&genre));
    let main_genre = mode_or_default(
        group.iter().filter_map(|r| r.main_genre),
        MainGenre::Other,
    );

    TrackRecord {
        row_id: first_wins(group.iter().map(|r| r.row_id)),
        track_id: first_wins(group.iter().map(|r| r.track_id.clone())),
        uri: first_wins(group.iter().map(|r| r.uri.clone())),
        track_name: first_wins(group.iter().map(|r| r.track_name.clone())),
        artist_name: first_wins(group.iter().map(|r| r.artist_name.clone())),
        energy: mean_of(group.iter().map(|r| r.energy)),
        loudness: mean_of(group.iter().map(|r| r.loudness)),
        loudness_normalized: mean_of(group.iter().map(|r| r.loudness_normalized)),
        tempo: mean_of(group.iter().map(|r| r.tempo)),
        danceability: mean_of(group.iter().map(|r| r.danceability)),
        valence: mean_of(group.iter().map(|r| r.valence)),
        duration_ms: mean_of(group.iter().map(|r| r.duration_ms)),
        year: first_wins(group.iter().map(|r| r.year)),
        genre: Some(genre),
        genre_clean,
        main_genre: Some(main_genre),
        release_date: earliest_date(group.iter().map(|r| r.release_date)),
        release_year: earliest_year(group.iter().map(|r| r.release_year)),
        release_decade: first_wins(group.iter().map(|r| r.release_decade.clone())),
        data_source: source_union(group.iter().map(|r| r.data_source.clone())),
    }
}

/// First non-missing value in group order.
fn first_wins<T>(values: impl Iterator<Item = Option<T>>) -> Option<T> {
    values.flatten().next()
}

/// Arithmetic mean of the non-missing values.
fn mean_of(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let values: Vec<f64> = values.flatten().collect();
    crate::table::stats::mean(&values)
}

fn earliest_date(values: impl Iterator<Item = Option<NaiveDate>>) -> Option<NaiveDate> {
    values.flatten().min()
}

fn earliest_year(values: impl Iterator<Item = Option<i32>>) -> Option<i32> {
    values.flatten().min()
}

/// Most frequent value; a tie for the highest count yields the default.
fn mode_or_default<T: Clone + Eq + std::hash::Hash>(
    values: impl Iterator<Item = T>,
    default: T,
) -> T {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }
    let Some(best) = counts.iter().map(|(_, c)| *c).max() else {
        return default;
    };
    let mut leaders = counts.iter().filter(|(_, c)| *c == best);
    match (leaders.next(), leaders.next()) {
        (Some((value, _)), None) => value.clone(),
        _ => default,
    }
}

/// Unique sources in group order, comma-joined.
fn source_union(values: impl Iterator<Item = Option<String>>) -> Option<String> {
    let mut unique: Vec<String> = Vec::new();
    for value in values.flatten() {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    if unique.is_empty() {
        None
    } else {
        Some(unique.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableSchema;

    fn id_schema() -> TableSchema {
        TableSchema {
            has_track_id: true,
            has_energy: true,
            ..Default::default()
        }
    }

    fn row(track_id: &str, energy: f64, source: &str) -> TrackRecord {
        TrackRecord {
            track_id: Some(track_id.to_string()),
            energy: Some(energy),
            data_source: Some(source.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_groups_collapse_to_one_row_with_mean() {
        let mut table = TrackTable::new("combined", id_schema());
        table.rows = vec![row("A", 0.2, "src-1"), row("A", 0.8, "src-2")];

        let (resolved, outcome) = resolve(table);

        assert_eq!(outcome.output_rows, 1);
        assert_eq!(outcome.merged_groups, 1);
        let merged = &resolved.rows[0];
        assert_eq!(merged.energy, Some(0.5));
        assert_eq!(merged.data_source.as_deref(), Some("src-1, src-2"));
    }

    #[test]
    fn test_distinct_keys_stay_distinct() {
        let mut table = TrackTable::new("combined", id_schema());
        table.rows = vec![row("A", 0.2, "s"), row("B", 0.8, "s"), row("C", 0.5, "s")];

        let (resolved, outcome) = resolve(table);
        assert_eq!(resolved.len(), 3);
        assert_eq!(outcome.merged_groups, 0);
    }

    #[test]
    fn test_earliest_date_and_first_name_win() {
        let mut table = TrackTable::new("combined", id_schema());
        let mut first = row("A", 0.4, "s1");
        first.track_name = Some("Later Title".into());
        first.release_year = Some(1995);
        first.release_date = NaiveDate::from_ymd_opt(1995, 1, 1);
        let mut second = row("A", 0.6, "s2");
        second.track_name = Some("Earlier Title".into());
        second.release_year = Some(1988);
        second.release_date = NaiveDate::from_ymd_opt(1988, 1, 1);
        table.rows = vec![first, second];

        let (resolved, _) = resolve(table);
        let merged = &resolved.rows[0];
        assert_eq!(merged.track_name.as_deref(), Some("Later Title"));
        assert_eq!(merged.release_year, Some(1988));
        assert_eq!(merged.release_date, NaiveDate::from_ymd_opt(1988, 1, 1));
    }

    #[test]
    fn test_mode_with_clear_winner() {
        let mut table = TrackTable::new("combined", id_schema());
        let mut rows = vec![
            row("A", 0.5, "s1"),
            row("A", 0.5, "s2"),
            row("A", 0.5, "s3"),
        ];
        rows[0].main_genre = Some(MainGenre::Rock);
        rows[1].main_genre = Some(MainGenre::Rock);
        rows[2].main_genre = Some(MainGenre::Pop);
        table.rows = rows;

        let (resolved, _) = resolve(table);
        assert_eq!(resolved.rows[0].main_genre, Some(MainGenre::Rock));
    }

    #[test]
    fn test_mode_tie_falls_back_to_default() {
        let mut table = TrackTable::new("combined", id_schema());
        let mut rows = vec![row("A", 0.5, "s1"), row("A", 0.5, "s2")];
        rows[0].main_genre = Some(MainGenre::Rock);
        rows[0].genre = Some("rock".into());
        rows[1].main_genre = Some(MainGenre::Pop);
        rows[1].genre = Some("pop".into());
        table.rows = rows;

        let (resolved, _) = resolve(table);
        assert_eq!(resolved.rows[0].main_genre, Some(MainGenre::Other));
        assert_eq!(resolved.rows[0].genre.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_mean_ignores_missing_values() {
        let mut table = TrackTable::new("combined", id_schema());
        let mut rows = vec![row("A", 0.3, "s1"), row("A", 0.9, "s2")];
        rows[0].tempo = Some(120.0);
        rows[1].tempo = None;
        table.rows = rows;

        let (resolved, _) = resolve(table);
        let merged = &resolved.rows[0];
        assert!((merged.energy.unwrap() - 0.6).abs() < 1e-12);
        assert_eq!(merged.tempo, Some(120.0));
    }

    #[test]
    fn test_name_artist_grouping_when_no_track_id() {
        let schema = TableSchema {
            has_track_name: true,
            has_artist_name: true,
            has_energy: true,
            ..Default::default()
        };
        let mut table = TrackTable::new("combined", schema);
        table.rows = vec![
            TrackRecord {
                track_name: Some("Song".into()),
                artist_name: Some("Artist".into()),
                energy: Some(0.2),
                ..Default::default()
            },
            TrackRecord {
                track_name: Some("Song".into()),
                artist_name: Some("Artist".into()),
                energy: Some(0.4),
                ..Default::default()
            },
        ];

        let (resolved, outcome) = resolve(table);
        assert_eq!(outcome.key, Some(ResolveKey::NameArtist));
        assert_eq!(resolved.len(), 1);
        assert!((resolved.rows[0].energy.unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_no_identity_columns_returns_unresolved() {
        let mut table = TrackTable::new("combined", TableSchema::default());
        table.rows = vec![TrackRecord::default(), TrackRecord::default()];

        let (resolved, outcome) = resolve(table);
        assert_eq!(outcome.key, None);
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_rows_without_key_pass_through() {
        let mut table = TrackTable::new("combined", id_schema());
        let mut keyless = row("X", 0.7, "s");
        keyless.track_id = None;
        table.rows = vec![row("A", 0.2, "s"), keyless, row("A", 0.8, "s")];

        let (resolved, _) = resolve(table);
        assert_eq!(resolved.len(), 2);
        // Merged A first (first encounter), keyless row preserved after it
        assert_eq!(resolved.rows[0].track_id.as_deref(), Some("A"));
        assert_eq!(resolved.rows[1].track_id, None);
        assert_eq!(resolved.rows[1].energy, Some(0.7));
    }
}
