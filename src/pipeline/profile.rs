//! Pre-cleaning diagnostics for a loaded source.
//!
//! Read-only: counts the problems the later stages will fix or drop, so a run
//! log shows what each raw export looked like before any mutation.

use crate::pipeline::dedup::IdentityKey;
use crate::pipeline::repair::{
    MAX_LOUDNESS_DB, MAX_RELEASE_YEAR, MIN_LOUDNESS_DB, MIN_RELEASE_YEAR,
};
use crate::table::TrackTable;
use std::collections::HashSet;
use tracing::info;

/// Plausible tempo band for popular music, in BPM.
pub const MIN_TEMPO_BPM: f64 = 40.0;
pub const MAX_TEMPO_BPM: f64 = 200.0;

/// Null counts for the columns the source declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullCounts {
    pub track_name: usize,
    pub artist_name: usize,
    pub energy: usize,
    pub loudness: usize,
    pub tempo: usize,
    pub year: usize,
    pub genre: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceProfile {
    pub source: String,
    pub rows: usize,
    pub nulls: NullCounts,
    /// Rows sharing an identity key with an earlier row.
    pub duplicate_rows: usize,
    pub identity_key: IdentityKey,
    pub energy_out_of_range: usize,
    pub loudness_out_of_range: usize,
    pub tempo_out_of_range: usize,
    pub year_out_of_range: usize,
    pub distinct_genres: usize,
}

impl SourceProfile {
    pub fn total_problems(&self) -> usize {
        self.duplicate_rows
            + self.energy_out_of_range
            + self.loudness_out_of_range
            + self.tempo_out_of_range
            + self.year_out_of_range
    }
}

/// Profile a freshly loaded table. Only columns the schema declares are
/// inspected; an absent column contributes nothing.
pub fn profile(table: &TrackTable) -> SourceProfile {
    let schema = &table.schema;
    let mut nulls = NullCounts::default();
    let mut energy_out_of_range = 0;
    let mut loudness_out_of_range = 0;
    let mut tempo_out_of_range = 0;
    let mut year_out_of_range = 0;
    let mut genres = HashSet::new();

    for row in &table.rows {
        if schema.has_track_name && row.track_name.is_none() {
            nulls.track_name += 1;
        }
        if schema.has_artist_name && row.artist_name.is_none() {
            nulls.artist_name += 1;
        }
        if schema.has_energy {
            match row.energy {
                None => nulls.energy += 1,
                Some(e) if !(0.0..=1.0).contains(&e) => energy_out_of_range += 1,
                Some(_) => {}
            }
        }
        if schema.has_loudness {
            match row.loudness {
                None => nulls.loudness += 1,
                Some(l) if !(MIN_LOUDNESS_DB..=MAX_LOUDNESS_DB).contains(&l) => {
                    loudness_out_of_range += 1
                }
                Some(_) => {}
            }
        }
        if schema.has_tempo {
            match row.tempo {
                None => nulls.tempo += 1,
                Some(t) if !(MIN_TEMPO_BPM..=MAX_TEMPO_BPM).contains(&t) => {
                    tempo_out_of_range += 1
                }
                Some(_) => {}
            }
        }
        if schema.has_year {
            match row.year {
                None => nulls.year += 1,
                Some(y) if !(MIN_RELEASE_YEAR..=MAX_RELEASE_YEAR).contains(&y) => {
                    year_out_of_range += 1
                }
                Some(_) => {}
            }
        }
        if schema.has_genre {
            match &row.genre {
                None => nulls.genre += 1,
                Some(genre) => {
                    genres.insert(genre.trim().to_lowercase());
                }
            }
        }
    }

    let identity_key = IdentityKey::choose(schema);
    let mut seen = HashSet::new();
    let duplicate_rows = table
        .rows
        .iter()
        .filter(|row| !seen.insert(identity_key.render(row)))
        .count();

    let profile = SourceProfile {
        source: table.source.clone(),
        rows: table.len(),
        nulls,
        duplicate_rows,
        identity_key,
        energy_out_of_range,
        loudness_out_of_range,
        tempo_out_of_range,
        year_out_of_range,
        distinct_genres: genres.len(),
    };

    info!(
        source = %profile.source,
        rows = profile.rows,
        duplicates = profile.duplicate_rows,
        problems = profile.total_problems(),
        distinct_genres = profile.distinct_genres,
        "profiled source"
    );
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{TableSchema, TrackRecord};

    fn schema() -> TableSchema {
        TableSchema {
            has_track_id: true,
            has_track_name: true,
            has_artist_name: true,
            has_energy: true,
            has_loudness: true,
            has_tempo: true,
            has_year: true,
            has_genre: true,
            ..Default::default()
        }
    }

    fn row(id: &str) -> TrackRecord {
        TrackRecord {
            track_id: Some(id.into()),
            track_name: Some("Song".into()),
            artist_name: Some("Band".into()),
            energy: Some(0.5),
            loudness: Some(-10.0),
            tempo: Some(120.0),
            year: Some(1995),
            genre: Some("rock".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_table_has_no_problems() {
        let mut table = TrackTable::new("clean", schema());
        table.rows = vec![row("A"), row("B")];

        let profile = profile(&table);
        assert_eq!(profile.total_problems(), 0);
        assert_eq!(profile.nulls, NullCounts::default());
        assert_eq!(profile.distinct_genres, 1);
    }

    #[test]
    fn test_counts_nulls_duplicates_and_ranges() {
        let mut table = TrackTable::new("messy", schema());
        let mut missing = row("B");
        missing.energy = None;
        missing.genre = None;
        let mut out_of_range = row("C");
        out_of_range.energy = Some(1.8);
        out_of_range.tempo = Some(300.0);
        out_of_range.year = Some(2030);
        table.rows = vec![row("A"), row("A"), missing, out_of_range];

        let profile = profile(&table);
        assert_eq!(profile.identity_key, IdentityKey::TrackId);
        assert_eq!(profile.duplicate_rows, 1);
        assert_eq!(profile.nulls.energy, 1);
        assert_eq!(profile.nulls.genre, 1);
        assert_eq!(profile.energy_out_of_range, 1);
        assert_eq!(profile.tempo_out_of_range, 1);
        assert_eq!(profile.year_out_of_range, 1);
        assert_eq!(profile.total_problems(), 4);
    }

    #[test]
    fn test_absent_columns_contribute_nothing() {
        let mut table = TrackTable::new("narrow", TableSchema::default());
        let mut bare = TrackRecord::default();
        bare.energy = Some(99.0); // column not declared, ignored
        table.rows = vec![bare];

        let profile = profile(&table);
        assert_eq!(profile.energy_out_of_range, 0);
        assert_eq!(profile.nulls.energy, 0);
    }

    #[test]
    fn test_distinct_genres_normalized() {
        let mut table = TrackTable::new("genres", schema());
        let mut a = row("A");
        a.genre = Some("Rock".into());
        let mut b = row("B");
        b.genre = Some("  rock ".into());
        let mut c = row("C");
        c.genre = Some("jazz".into());
        table.rows = vec![a, b, c];

        assert_eq!(profile(&table).distinct_genres, 2);
    }
}
