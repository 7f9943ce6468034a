//! Schema normalization: maps heterogeneous per-source column names onto the
//! canonical schema.
//!
//! The decade-partitioned exports name their columns differently (`track` vs
//! `track_name`, `uri` vs `track_id`, a nameless positional index column).
//! Normalization is purely a renaming concern: it never drops rows, and a
//! column that stays unrecognized is simply absent downstream.

use crate::table::{TableSchema, TrackTable};
use tracing::debug;

/// Canonical columns the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    RowId,
    TrackId,
    Uri,
    TrackName,
    ArtistName,
    Energy,
    Loudness,
    Tempo,
    Danceability,
    Valence,
    DurationMs,
    Year,
    Genre,
}

/// Resolve a raw header to its canonical column, applying the fixed synonym
/// mapping. Unknown headers resolve to `None` and are ignored at load time.
pub fn resolve_column(header: &str) -> Option<Column> {
    let normalized = header.trim().to_lowercase();
    match normalized.as_str() {
        // Positional index column: pandas exports call it "Unnamed: 0",
        // hand-written files sometimes leave the header empty.
        "" | "id" | "unnamed: 0" => Some(Column::RowId),
        "track_id" => Some(Column::TrackId),
        "uri" => Some(Column::Uri),
        "track" | "track_name" => Some(Column::TrackName),
        "artist" | "artist_name" => Some(Column::ArtistName),
        "energy" => Some(Column::Energy),
        "loudness" => Some(Column::Loudness),
        "tempo" => Some(Column::Tempo),
        "danceability" => Some(Column::Danceability),
        "valence" => Some(Column::Valence),
        "duration_ms" => Some(Column::DurationMs),
        "year" => Some(Column::Year),
        "genre" => Some(Column::Genre),
        _ => None,
    }
}

/// Mark the schema as having the given canonical column.
pub fn mark_present(schema: &mut TableSchema, column: Column) {
    match column {
        Column::RowId => schema.has_row_id = true,
        Column::TrackId => schema.has_track_id = true,
        Column::Uri => schema.has_uri = true,
        Column::TrackName => schema.has_track_name = true,
        Column::ArtistName => schema.has_artist_name = true,
        Column::Energy => schema.has_energy = true,
        Column::Loudness => schema.has_loudness = true,
        Column::Tempo => schema.has_tempo = true,
        Column::Danceability => schema.has_danceability = true,
        Column::Valence => schema.has_valence = true,
        Column::DurationMs => schema.has_duration_ms = true,
        Column::Year => schema.has_year = true,
        Column::Genre => schema.has_genre = true,
    }
}

/// Fallback identity promotion: a table with a `uri` column but no `track_id`
/// column gets `track_id` copied from the uri. The raw uri stays on the
/// record.
pub fn promote_identity(table: &mut TrackTable) {
    if table.schema.has_track_id || !table.schema.has_uri {
        return;
    }
    debug!(
        source = %table.source,
        "no track_id column, promoting uri to track_id"
    );
    for row in &mut table.rows {
        if row.track_id.is_none() {
            row.track_id = row.uri.clone();
        }
    }
    table.schema.has_track_id = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TrackRecord;

    #[test]
    fn test_resolve_synonyms() {
        assert_eq!(resolve_column("track"), Some(Column::TrackName));
        assert_eq!(resolve_column("track_name"), Some(Column::TrackName));
        assert_eq!(resolve_column("artist"), Some(Column::ArtistName));
        assert_eq!(resolve_column("uri"), Some(Column::Uri));
        assert_eq!(resolve_column("Unnamed: 0"), Some(Column::RowId));
        assert_eq!(resolve_column("  Energy "), Some(Column::Energy));
        assert_eq!(resolve_column("chorus_hit"), None);
    }

    #[test]
    fn test_promote_identity_from_uri() {
        let mut table = TrackTable::new(
            "dataset-of-60s",
            TableSchema {
                has_uri: true,
                ..Default::default()
            },
        );
        table.rows.push(TrackRecord {
            uri: Some("spotify:track:abc".into()),
            ..Default::default()
        });

        promote_identity(&mut table);

        assert!(table.schema.has_track_id);
        assert_eq!(
            table.rows[0].track_id.as_deref(),
            Some("spotify:track:abc")
        );
        assert_eq!(table.rows[0].uri.as_deref(), Some("spotify:track:abc"));
    }

    #[test]
    fn test_promote_identity_noop_when_track_id_exists() {
        let mut table = TrackTable::new(
            "spotify_data",
            TableSchema {
                has_track_id: true,
                has_uri: true,
                ..Default::default()
            },
        );
        table.rows.push(TrackRecord {
            track_id: Some("id-1".into()),
            uri: Some("spotify:track:other".into()),
            ..Default::default()
        });

        promote_identity(&mut table);
        assert_eq!(table.rows[0].track_id.as_deref(), Some("id-1"));
    }
}
