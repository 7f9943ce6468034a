//! Grouped summary views over the scored table.
//!
//! Pure read-only aggregation: nothing here mutates the scored records. Each
//! builder groups rows, computes the stat block its consumers expect, and
//! returns plain rows ready for the sink.

use crate::table::{stats, IntensityCategory, MainGenre, ScoredRecord};
use std::collections::BTreeMap;

/// Minimum group size for the decade-by-genre view; smaller combinations are
/// statistically meaningless and dropped.
pub const MIN_DECADE_GENRE_COUNT: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct DecadeSummary {
    pub decade: String,
    pub intensity_mean: Option<f64>,
    pub intensity_median: Option<f64>,
    pub intensity_std: Option<f64>,
    pub intensity_min: Option<f64>,
    pub intensity_max: Option<f64>,
    pub energy_mean: Option<f64>,
    pub energy_median: Option<f64>,
    pub loudness_mean: Option<f64>,
    pub loudness_median: Option<f64>,
    pub track_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecadeGenreSummary {
    pub decade: String,
    pub genre: MainGenre,
    pub intensity_mean: Option<f64>,
    pub intensity_median: Option<f64>,
    pub intensity_std: Option<f64>,
    pub energy_mean: Option<f64>,
    pub loudness_mean: Option<f64>,
    pub track_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenreSummary {
    pub genre: MainGenre,
    pub intensity_mean: Option<f64>,
    pub intensity_median: Option<f64>,
    pub intensity_std: Option<f64>,
    pub intensity_min: Option<f64>,
    pub intensity_max: Option<f64>,
    pub energy_mean: Option<f64>,
    pub energy_std: Option<f64>,
    pub loudness_mean: Option<f64>,
    pub loudness_std: Option<f64>,
    pub danceability_mean: Option<f64>,
    pub tempo_mean: Option<f64>,
    pub tempo_std: Option<f64>,
    pub track_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: IntensityCategory,
    pub intensity_mean: Option<f64>,
    pub intensity_median: Option<f64>,
    pub intensity_std: Option<f64>,
    pub intensity_min: Option<f64>,
    pub intensity_max: Option<f64>,
    pub energy_mean: Option<f64>,
    pub energy_median: Option<f64>,
    pub loudness_mean: Option<f64>,
    pub loudness_median: Option<f64>,
    pub track_count: usize,
}

fn collect<'a>(
    group: &[&'a ScoredRecord],
    value: impl Fn(&'a ScoredRecord) -> Option<f64>,
) -> Vec<f64> {
    group.iter().filter_map(|s| value(s)).collect()
}

/// Intensity statistics per decade, sorted by decade.
pub fn by_decade(scored: &[ScoredRecord]) -> Vec<DecadeSummary> {
    let mut groups: BTreeMap<String, Vec<&ScoredRecord>> = BTreeMap::new();
    for record in scored {
        if let Some(decade) = &record.record.release_decade {
            groups.entry(decade.clone()).or_default().push(record);
        }
    }

    groups
        .into_iter()
        .map(|(decade, group)| {
            let intensity = collect(&group, |s| s.intensity_weighted);
            let energy = collect(&group, |s| s.record.energy);
            let loudness = collect(&group, |s| s.record.loudness);
            DecadeSummary {
                decade,
                intensity_mean: stats::mean(&intensity),
                intensity_median: stats::median(&intensity),
                intensity_std: stats::sample_std(&intensity),
                intensity_min: stats::min(&intensity),
                intensity_max: stats::max(&intensity),
                energy_mean: stats::mean(&energy),
                energy_median: stats::median(&energy),
                loudness_mean: stats::mean(&loudness),
                loudness_median: stats::median(&loudness),
                track_count: group.len(),
            }
        })
        .collect()
}

/// Intensity statistics per (decade, genre), keeping only combinations with
/// at least [`MIN_DECADE_GENRE_COUNT`] rows.
pub fn by_decade_genre(scored: &[ScoredRecord]) -> Vec<DecadeGenreSummary> {
    let mut groups: BTreeMap<(String, MainGenre), Vec<&ScoredRecord>> = BTreeMap::new();
    for record in scored {
        if let (Some(decade), Some(genre)) =
            (&record.record.release_decade, record.record.main_genre)
        {
            groups
                .entry((decade.clone(), genre))
                .or_default()
                .push(record);
        }
    }

    groups
        .into_iter()
        .filter(|(_, group)| group.len() >= MIN_DECADE_GENRE_COUNT)
        .map(|((decade, genre), group)| {
            let intensity = collect(&group, |s| s.intensity_weighted);
            let energy = collect(&group, |s| s.record.energy);
            let loudness = collect(&group, |s| s.record.loudness);
            DecadeGenreSummary {
                decade,
                genre,
                intensity_mean: stats::mean(&intensity),
                intensity_median: stats::median(&intensity),
                intensity_std: stats::sample_std(&intensity),
                energy_mean: stats::mean(&energy),
                loudness_mean: stats::mean(&loudness),
                track_count: group.len(),
            }
        })
        .collect()
}

/// Full stat block per genre, with danceability and tempo when any row in
/// the group carries them.
pub fn by_genre(scored: &[ScoredRecord]) -> Vec<GenreSummary> {
    let mut groups: BTreeMap<MainGenre, Vec<&ScoredRecord>> = BTreeMap::new();
    for record in scored {
        if let Some(genre) = record.record.main_genre {
            groups.entry(genre).or_default().push(record);
        }
    }

    groups
        .into_iter()
        .map(|(genre, group)| {
            let intensity = collect(&group, |s| s.intensity_weighted);
            let energy = collect(&group, |s| s.record.energy);
            let loudness = collect(&group, |s| s.record.loudness);
            let danceability = collect(&group, |s| s.record.danceability);
            let tempo = collect(&group, |s| s.record.tempo);
            GenreSummary {
                genre,
                intensity_mean: stats::mean(&intensity),
                intensity_median: stats::median(&intensity),
                intensity_std: stats::sample_std(&intensity),
                intensity_min: stats::min(&intensity),
                intensity_max: stats::max(&intensity),
                energy_mean: stats::mean(&energy),
                energy_std: stats::sample_std(&energy),
                loudness_mean: stats::mean(&loudness),
                loudness_std: stats::sample_std(&loudness),
                danceability_mean: stats::mean(&danceability),
                tempo_mean: stats::mean(&tempo),
                tempo_std: stats::sample_std(&tempo),
                track_count: group.len(),
            }
        })
        .collect()
}

/// Statistics per intensity category, from calmest to most intense.
pub fn by_category(scored: &[ScoredRecord]) -> Vec<CategorySummary> {
    let mut groups: BTreeMap<IntensityCategory, Vec<&ScoredRecord>> = BTreeMap::new();
    for record in scored {
        if let Some(category) = record.intensity_category {
            groups.entry(category).or_default().push(record);
        }
    }

    groups
        .into_iter()
        .map(|(category, group)| {
            let intensity = collect(&group, |s| s.intensity_weighted);
            let energy = collect(&group, |s| s.record.energy);
            let loudness = collect(&group, |s| s.record.loudness);
            CategorySummary {
                category,
                intensity_mean: stats::mean(&intensity),
                intensity_median: stats::median(&intensity),
                intensity_std: stats::sample_std(&intensity),
                intensity_min: stats::min(&intensity),
                intensity_max: stats::max(&intensity),
                energy_mean: stats::mean(&energy),
                energy_median: stats::median(&energy),
                loudness_mean: stats::mean(&loudness),
                loudness_median: stats::median(&loudness),
                track_count: group.len(),
            }
        })
        .collect()
}
