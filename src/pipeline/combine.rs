//! Combining per-source tables into one provenance-stamped table.
//!
//! Sources named with an embedded decade token (`dataset-of-60s` ..
//! `dataset-of-10s`) get their decade and year stamped from the token. For
//! those datasets the stamp is authoritative metadata: by default it
//! overwrites whatever the repair stage derived, which is the historical
//! behavior of these exports. The policy toggle exists so the overwrite can
//! be narrowed to filling gaps only.

use crate::table::{TableSchema, TrackTable};
use chrono::NaiveDate;
use clap::ValueEnum;
use tracing::info;

/// How a decade-labeled source's stamp interacts with already-derived
/// date fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DecadeOverridePolicy {
    /// Stamp decade and midpoint year unconditionally (historical behavior).
    #[default]
    Overwrite,
    /// Stamp only rows that have no decade/year yet.
    FillMissing,
}

/// Decade stamp for a source identifier, when its name carries a decade
/// token. The year is the decade's midpoint.
pub fn decade_token(source: &str) -> Option<(&'static str, i32)> {
    const TOKENS: &[(&str, &str, i32)] = &[
        ("dataset-of-60s", "1960s", 1965),
        ("dataset-of-70s", "1970s", 1975),
        ("dataset-of-80s", "1980s", 1985),
        ("dataset-of-90s", "1990s", 1995),
        ("dataset-of-00s", "2000s", 2005),
        ("dataset-of-10s", "2010s", 2015),
    ];
    TOKENS
        .iter()
        .find(|(token, _, _)| source.contains(token))
        .map(|(_, decade, year)| (*decade, *year))
}

/// Concatenate all per-source tables in order, stamping provenance and
/// decade metadata, and filling `release_date` from `release_year` where
/// absent.
pub fn combine(tables: Vec<TrackTable>, policy: DecadeOverridePolicy) -> TrackTable {
    let mut schema = TableSchema::default();
    let mut rows = Vec::new();
    let source_count = tables.len();

    for mut table in tables {
        let stamp = decade_token(&table.source);
        if stamp.is_some() {
            table.schema.has_release_year = true;
            table.schema.has_release_decade = true;
        }

        for mut row in table.rows {
            row.data_source = Some(table.source.clone());

            if let Some((decade, year)) = stamp {
                match policy {
                    DecadeOverridePolicy::Overwrite => {
                        row.release_decade = Some(decade.to_string());
                        row.release_year = Some(year);
                    }
                    DecadeOverridePolicy::FillMissing => {
                        if row.release_decade.is_none() {
                            row.release_decade = Some(decade.to_string());
                        }
                        if row.release_year.is_none() {
                            row.release_year = Some(year);
                        }
                    }
                }
            }

            if row.release_date.is_none() {
                if let Some(year) = row.release_year {
                    row.release_date = NaiveDate::from_ymd_opt(year, 1, 1);
                }
            }

            rows.push(row);
        }

        if table.schema.has_release_year {
            table.schema.has_release_date = true;
        }
        schema = schema.union(&table.schema);
    }

    info!(
        sources = source_count,
        rows = rows.len(),
        "combined source tables"
    );

    let mut combined = TrackTable::new("combined", schema);
    combined.rows = rows;
    combined
}
