//! Derived intensity metrics and per-row quality scoring.
//!
//! All metrics are pure functions of fields already on the record. The
//! outlier flag is the only cross-row computation: a Tukey fence over the
//! weighted intensity of the whole final table.

use crate::table::{stats, IntensityCategory, ScoredRecord, TrackTable};
use tracing::info;

/// Weight of energy vs normalized loudness in the recommended metric.
pub const ENERGY_WEIGHT: f64 = 0.6;
pub const LOUDNESS_WEIGHT: f64 = 0.4;

/// Tempo is normalized against this BPM ceiling in the complex metric.
pub const TEMPO_CEILING_BPM: f64 = 200.0;

/// Tukey fence multiplier for outlier detection.
pub const IQR_FENCE: f64 = 1.5;

/// Flat score every row receives, on the assumption that the merge stage
/// already resolved conflicts.
pub const BASE_SCORE: u32 = 20;
pub const COMPLETE_SCORE: u32 = 40;
pub const VALID_DATE_SCORE: u32 = 20;
pub const NON_OUTLIER_SCORE: u32 = 20;

use crate::pipeline::repair::{MAX_RELEASE_YEAR, MIN_RELEASE_YEAR};

/// `0.6 * energy + 0.4 * loudness_normalized` — the recommended metric.
pub fn intensity_weighted(energy: Option<f64>, loudness_normalized: Option<f64>) -> Option<f64> {
    Some(ENERGY_WEIGHT * energy? + LOUDNESS_WEIGHT * loudness_normalized?)
}

/// Unweighted average of energy and normalized loudness.
pub fn intensity_simple(energy: Option<f64>, loudness_normalized: Option<f64>) -> Option<f64> {
    Some(0.5 * (energy? + loudness_normalized?))
}

/// Tempo-aware metric; falls back to the weighted formula when tempo is
/// unavailable.
pub fn intensity_complex(
    energy: Option<f64>,
    loudness_normalized: Option<f64>,
    tempo: Option<f64>,
) -> Option<f64> {
    match tempo {
        Some(tempo) => {
            let tempo_normalized = (tempo / TEMPO_CEILING_BPM).clamp(0.0, 1.0);
            Some(0.5 * energy? + 0.3 * loudness_normalized? + 0.2 * tempo_normalized)
        }
        None => intensity_weighted(energy, loudness_normalized),
    }
}

/// Bucket a weighted intensity value.
pub fn categorize(intensity: f64) -> IntensityCategory {
    if intensity < 0.3 {
        IntensityCategory::MuyBaja
    } else if intensity < 0.5 {
        IntensityCategory::Baja
    } else if intensity < 0.7 {
        IntensityCategory::Media
    } else if intensity < 0.9 {
        IntensityCategory::Alta
    } else {
        IntensityCategory::MuyAlta
    }
}

/// The Tukey fence `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]` for a series.
pub fn tukey_fence(values: &[f64]) -> Option<(f64, f64)> {
    let q1 = stats::quantile(values, 0.25)?;
    let q3 = stats::quantile(values, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - IQR_FENCE * iqr, q3 + IQR_FENCE * iqr))
}

/// Score the final reconciled table: compute every derived metric, flag
/// outliers globally, and assign the composite quality score. Consumes the
/// table; the result is immutable output.
pub fn score_table(table: TrackTable) -> Vec<ScoredRecord> {
    let weighted: Vec<f64> = table
        .rows
        .iter()
        .filter_map(|row| intensity_weighted(row.energy, row.loudness_normalized))
        .collect();
    let fence = tukey_fence(&weighted);

    let mut scored = Vec::with_capacity(table.len());
    for record in table.rows {
        let intensity = intensity_weighted(record.energy, record.loudness_normalized);

        let is_complete = record.energy.is_some()
            && record.loudness.is_some()
            && record.release_date.is_some()
            && record.main_genre.is_some();
        let is_valid_date = record
            .release_year
            .map(|year| (MIN_RELEASE_YEAR..=MAX_RELEASE_YEAR).contains(&year))
            .unwrap_or(false);
        let is_outlier = match (intensity, fence) {
            (Some(value), Some((low, high))) => value < low || value > high,
            _ => false,
        };

        let data_quality_score = BASE_SCORE
            + if is_complete { COMPLETE_SCORE } else { 0 }
            + if is_valid_date { VALID_DATE_SCORE } else { 0 }
            + if is_outlier { 0 } else { NON_OUTLIER_SCORE };

        scored.push(ScoredRecord {
            intensity_weighted: intensity,
            intensity_simple: intensity_simple(record.energy, record.loudness_normalized),
            intensity_complex: intensity_complex(
                record.energy,
                record.loudness_normalized,
                record.tempo,
            ),
            is_complete,
            is_valid_date,
            is_outlier,
            data_quality_score,
            intensity_category: intensity.map(categorize),
            record,
        });
    }

    let mean_intensity = stats::mean(&weighted);
    let mean_quality = stats::mean(
        &scored
            .iter()
            .map(|s| s.data_quality_score as f64)
            .collect::<Vec<_>>(),
    );
    info!(
        rows = scored.len(),
        mean_intensity = mean_intensity.unwrap_or(f64::NAN),
        mean_quality = mean_quality.unwrap_or(f64::NAN),
        outliers = scored.iter().filter(|s| s.is_outlier).count(),
        "scored final table"
    );
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{MainGenre, TableSchema, TrackRecord};
    use chrono::NaiveDate;

    fn complete_row(energy: f64, loudness_normalized: f64) -> TrackRecord {
        TrackRecord {
            energy: Some(energy),
            loudness: Some(loudness_normalized * 60.0 - 60.0),
            loudness_normalized: Some(loudness_normalized),
            release_date: NaiveDate::from_ymd_opt(1990, 1, 1),
            release_year: Some(1990),
            main_genre: Some(MainGenre::Rock),
            ..Default::default()
        }
    }

    fn table_of(rows: Vec<TrackRecord>) -> TrackTable {
        let mut table = TrackTable::new("final", TableSchema::default());
        table.rows = rows;
        table
    }

    #[test]
    fn test_weighted_formula() {
        let v = intensity_weighted(Some(0.5), Some(1.0)).unwrap();
        assert!((v - 0.7).abs() < 1e-12);
        assert_eq!(intensity_weighted(None, Some(1.0)), None);
    }

    #[test]
    fn test_simple_formula() {
        let v = intensity_simple(Some(0.4), Some(0.8)).unwrap();
        assert!((v - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_complex_formula_with_and_without_tempo() {
        let with_tempo = intensity_complex(Some(0.5), Some(0.5), Some(100.0)).unwrap();
        // 0.25 + 0.15 + 0.2 * 0.5
        assert!((with_tempo - 0.5).abs() < 1e-12);

        let clipped = intensity_complex(Some(0.0), Some(0.0), Some(400.0)).unwrap();
        assert!((clipped - 0.2).abs() < 1e-12);

        let fallback = intensity_complex(Some(0.5), Some(1.0), None).unwrap();
        assert!((fallback - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_categorize_buckets() {
        assert_eq!(categorize(0.1), IntensityCategory::MuyBaja);
        assert_eq!(categorize(0.3), IntensityCategory::Baja);
        assert_eq!(categorize(0.5), IntensityCategory::Media);
        assert_eq!(categorize(0.7), IntensityCategory::Alta);
        assert_eq!(categorize(0.9), IntensityCategory::MuyAlta);
    }

    #[test]
    fn test_tukey_fence_flags_expected_outlier() {
        // Q1=0.2, Q3=0.3 -> fence [0.05, 0.45]
        let values = [0.1, 0.2, 0.2, 0.3, 0.9];
        let (low, high) = tukey_fence(&values).unwrap();
        assert!((low - 0.05).abs() < 1e-12);
        assert!((high - 0.45).abs() < 1e-12);

        // Build rows whose weighted intensity hits those exact values:
        // energy == loudness_normalized == v gives intensity v.
        let rows: Vec<TrackRecord> = values.iter().map(|v| complete_row(*v, *v)).collect();
        let scored = score_table(table_of(rows));

        let flags: Vec<bool> = scored.iter().map(|s| s.is_outlier).collect();
        assert_eq!(flags, vec![false, false, false, false, true]);
    }

    #[test]
    fn test_quality_score_components() {
        let values = [0.1, 0.2, 0.2, 0.3, 0.9];
        let rows: Vec<TrackRecord> = values.iter().map(|v| complete_row(*v, *v)).collect();
        let scored = score_table(table_of(rows));

        // Complete, valid date, non-outlier
        assert_eq!(scored[0].data_quality_score, 100);
        // Complete, valid date, outlier
        assert_eq!(scored[4].data_quality_score, 80);
    }

    #[test]
    fn test_incomplete_row_scores_lower() {
        let mut incomplete = complete_row(0.5, 0.5);
        incomplete.release_date = None;
        incomplete.release_year = None;
        let scored = score_table(table_of(vec![complete_row(0.5, 0.5), incomplete]));

        // Missing date: not complete (40) and not valid (20)
        assert_eq!(scored[1].data_quality_score, 40);
        assert!(!scored[1].is_complete);
        assert!(!scored[1].is_valid_date);
    }

    #[test]
    fn test_rows_without_audio_fields_get_no_intensity() {
        let scored = score_table(table_of(vec![TrackRecord::default()]));
        assert_eq!(scored[0].intensity_weighted, None);
        assert_eq!(scored[0].intensity_category, None);
        assert!(!scored[0].is_outlier);
    }
}
