//! Per-source deduplication.
//!
//! Uses the first available identity key from a fixed priority list and keeps
//! the first-encountered row per key, preserving input order. Only one key is
//! ever used per table; keys are never combined.

use crate::table::{TableSchema, TrackRecord, TrackTable};
use std::collections::HashSet;
use tracing::info;

/// The field(s) used to decide two rows represent the same track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKey {
    TrackId,
    Uri,
    NameArtist,
    FullRow,
}

impl IdentityKey {
    /// Pick the highest-priority key the table's schema can support.
    /// Full-row equality is always available as the last resort.
    pub fn choose(schema: &TableSchema) -> IdentityKey {
        if schema.has_track_id {
            IdentityKey::TrackId
        } else if schema.has_uri {
            IdentityKey::Uri
        } else if schema.has_track_name && schema.has_artist_name {
            IdentityKey::NameArtist
        } else {
            IdentityKey::FullRow
        }
    }

    /// Render the key for one row. Missing values all render to the same
    /// marker, so rows without the identity field collapse together, the same
    /// way the source exports treat them.
    pub(crate) fn render(&self, row: &TrackRecord) -> String {
        match self {
            IdentityKey::TrackId => row.track_id.clone().unwrap_or_default(),
            IdentityKey::Uri => row.uri.clone().unwrap_or_default(),
            IdentityKey::NameArtist => format!(
                "{}\u{1f}{}",
                row.track_name.as_deref().unwrap_or(""),
                row.artist_name.as_deref().unwrap_or("")
            ),
            IdentityKey::FullRow => row.full_row_key().to_string(),
        }
    }
}

/// Result of a deduplication pass.
#[derive(Debug)]
pub struct DedupOutcome {
    pub key: IdentityKey,
    pub removed: usize,
}

/// Remove all but the first row per identity key. Stable and idempotent.
pub fn deduplicate(table: &mut TrackTable) -> DedupOutcome {
    let key = IdentityKey::choose(&table.schema);
    let before = table.len();

    let mut seen = HashSet::with_capacity(before);
    table.rows.retain(|row| seen.insert(key.render(row)));

    let removed = before - table.len();
    info!(
        source = %table.source,
        key = ?key,
        removed,
        remaining = table.len(),
        "deduplicated source table"
    );
    DedupOutcome { key, removed }
}
