//! In-memory tabular model for track records.
//!
//! Every raw field on a [`TrackRecord`] is optional: a `None` means the value
//! was absent, unparseable, or the source never had the column at all. Which
//! of those it is gets decided once at load time and recorded in the table's
//! [`TableSchema`], so later stages branch on declared capabilities instead of
//! probing individual rows.

pub mod loader;
pub mod stats;

use chrono::NaiveDate;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The fixed main-genre taxonomy. Free-text genres are classified into one of
/// these; anything unrecognized lands in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MainGenre {
    Pop,
    Rock,
    HipHop,
    Electronic,
    RnB,
    Country,
    Latin,
    Jazz,
    Classical,
    Other,
}

impl MainGenre {
    /// All taxonomy members, in classification priority order (`Other` last).
    pub const ALL: [MainGenre; 10] = [
        MainGenre::Pop,
        MainGenre::Rock,
        MainGenre::HipHop,
        MainGenre::Electronic,
        MainGenre::RnB,
        MainGenre::Country,
        MainGenre::Latin,
        MainGenre::Jazz,
        MainGenre::Classical,
        MainGenre::Other,
    ];

    /// The canonical label used in reports and exported tables.
    pub fn label(&self) -> &'static str {
        match self {
            MainGenre::Pop => "Pop",
            MainGenre::Rock => "Rock",
            MainGenre::HipHop => "Hip-Hop",
            MainGenre::Electronic => "Electronic",
            MainGenre::RnB => "R&B",
            MainGenre::Country => "Country",
            MainGenre::Latin => "Latin",
            MainGenre::Jazz => "Jazz",
            MainGenre::Classical => "Classical",
            MainGenre::Other => "Other",
        }
    }
}

impl fmt::Display for MainGenre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of a source table, progressively enriched by the pipeline stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackRecord {
    /// Positional index column, when the source carries one.
    pub row_id: Option<i64>,
    pub track_id: Option<String>,
    /// Raw uri, retained even after being promoted to `track_id`.
    pub uri: Option<String>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub energy: Option<f64>,
    pub loudness: Option<f64>,
    pub loudness_normalized: Option<f64>,
    pub tempo: Option<f64>,
    pub danceability: Option<f64>,
    pub valence: Option<f64>,
    pub duration_ms: Option<f64>,
    /// Raw year column, before date repair.
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub genre_clean: Option<String>,
    pub main_genre: Option<MainGenre>,
    pub release_date: Option<NaiveDate>,
    pub release_year: Option<i32>,
    pub release_decade: Option<String>,
    pub data_source: Option<String>,
}

impl TrackRecord {
    /// Hash of every raw field, used as the last-resort identity key when a
    /// table has no usable identifier columns. Floats hash by bit pattern.
    pub fn full_row_key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.row_id.hash(&mut hasher);
        self.track_id.hash(&mut hasher);
        self.uri.hash(&mut hasher);
        self.track_name.hash(&mut hasher);
        self.artist_name.hash(&mut hasher);
        self.energy.map(f64::to_bits).hash(&mut hasher);
        self.loudness.map(f64::to_bits).hash(&mut hasher);
        self.tempo.map(f64::to_bits).hash(&mut hasher);
        self.danceability.map(f64::to_bits).hash(&mut hasher);
        self.valence.map(f64::to_bits).hash(&mut hasher);
        self.duration_ms.map(f64::to_bits).hash(&mut hasher);
        self.year.hash(&mut hasher);
        self.genre.hash(&mut hasher);
        hasher.finish()
    }
}

/// Which columns a table actually has. Decided once when the table is built
/// and updated only by stages that add derived columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableSchema {
    pub has_row_id: bool,
    pub has_track_id: bool,
    pub has_uri: bool,
    pub has_track_name: bool,
    pub has_artist_name: bool,
    pub has_energy: bool,
    pub has_loudness: bool,
    pub has_loudness_normalized: bool,
    pub has_tempo: bool,
    pub has_danceability: bool,
    pub has_valence: bool,
    pub has_duration_ms: bool,
    pub has_year: bool,
    pub has_genre: bool,
    pub has_release_date: bool,
    pub has_release_year: bool,
    pub has_release_decade: bool,
}

impl TableSchema {
    /// Merge two schemas, keeping every column either side has. Used by the
    /// combiner when concatenating heterogeneous sources.
    pub fn union(&self, other: &TableSchema) -> TableSchema {
        TableSchema {
            has_row_id: self.has_row_id || other.has_row_id,
            has_track_id: self.has_track_id || other.has_track_id,
            has_uri: self.has_uri || other.has_uri,
            has_track_name: self.has_track_name || other.has_track_name,
            has_artist_name: self.has_artist_name || other.has_artist_name,
            has_energy: self.has_energy || other.has_energy,
            has_loudness: self.has_loudness || other.has_loudness,
            has_loudness_normalized: self.has_loudness_normalized
                || other.has_loudness_normalized,
            has_tempo: self.has_tempo || other.has_tempo,
            has_danceability: self.has_danceability || other.has_danceability,
            has_valence: self.has_valence || other.has_valence,
            has_duration_ms: self.has_duration_ms || other.has_duration_ms,
            has_year: self.has_year || other.has_year,
            has_genre: self.has_genre || other.has_genre,
            has_release_date: self.has_release_date || other.has_release_date,
            has_release_year: self.has_release_year || other.has_release_year,
            has_release_decade: self.has_release_decade || other.has_release_decade,
        }
    }
}

/// A source table: the rows plus the schema they were loaded with.
#[derive(Debug, Clone)]
pub struct TrackTable {
    /// Source identifier, e.g. `dataset-of-80s` or a file stem.
    pub source: String,
    pub schema: TableSchema,
    pub rows: Vec<TrackRecord>,
}

impl TrackTable {
    pub fn new(source: impl Into<String>, schema: TableSchema) -> Self {
        Self {
            source: source.into(),
            schema,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Intensity bucket derived from `intensity_weighted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntensityCategory {
    MuyBaja,
    Baja,
    Media,
    Alta,
    MuyAlta,
}

impl IntensityCategory {
    pub fn label(&self) -> &'static str {
        match self {
            IntensityCategory::MuyBaja => "Muy Baja",
            IntensityCategory::Baja => "Baja",
            IntensityCategory::Media => "Media",
            IntensityCategory::Alta => "Alta",
            IntensityCategory::MuyAlta => "Muy Alta",
        }
    }
}

impl fmt::Display for IntensityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A finalized row: the reconciled record plus all derived intensity and
/// quality fields. Immutable once the scoring stage has produced it.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: TrackRecord,
    pub intensity_weighted: Option<f64>,
    pub intensity_simple: Option<f64>,
    pub intensity_complex: Option<f64>,
    pub is_complete: bool,
    pub is_valid_date: bool,
    pub is_outlier: bool,
    pub data_quality_score: u32,
    pub intensity_category: Option<IntensityCategory>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_genre_labels() {
        assert_eq!(MainGenre::HipHop.to_string(), "Hip-Hop");
        assert_eq!(MainGenre::RnB.to_string(), "R&B");
        assert_eq!(MainGenre::Other.to_string(), "Other");
    }

    #[test]
    fn test_full_row_key_distinguishes_rows() {
        let a = TrackRecord {
            track_name: Some("Song".into()),
            energy: Some(0.5),
            ..Default::default()
        };
        let mut b = a.clone();
        assert_eq!(a.full_row_key(), b.full_row_key());
        b.energy = Some(0.6);
        assert_ne!(a.full_row_key(), b.full_row_key());
    }

    #[test]
    fn test_schema_union() {
        let a = TableSchema {
            has_energy: true,
            ..Default::default()
        };
        let b = TableSchema {
            has_genre: true,
            ..Default::default()
        };
        let merged = a.union(&b);
        assert!(merged.has_energy);
        assert!(merged.has_genre);
        assert!(!merged.has_tempo);
    }

    #[test]
    fn test_intensity_category_labels() {
        assert_eq!(IntensityCategory::MuyBaja.label(), "Muy Baja");
        assert_eq!(IntensityCategory::MuyAlta.label(), "Muy Alta");
    }
}
