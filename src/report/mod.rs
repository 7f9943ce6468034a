//! Output sink: the cleaned table, summary views, documentation, and the
//! machine-readable run metadata.
//!
//! The sink never recomputes anything; it renders what the pipeline already
//! produced. Verification outcomes are written alongside but never block a
//! write.

use crate::pipeline::PipelineReport;
use crate::table::{stats, ScoredRecord};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CLEAN_TABLE_FILE: &str = "spotify_music_intensity_clean.csv";
pub const DECADE_SUMMARY_FILE: &str = "intensity_by_decade.csv";
pub const DECADE_GENRE_SUMMARY_FILE: &str = "intensity_by_decade_genre.csv";
pub const GENRE_SUMMARY_FILE: &str = "genre_statistics.csv";
pub const CATEGORY_SUMMARY_FILE: &str = "intensity_by_level.csv";
pub const README_FILE: &str = "README.md";
pub const DATA_DICTIONARY_FILE: &str = "data_dictionary.md";
pub const METADATA_FILE: &str = "metadata.json";

/// Machine-readable summary of one run.
#[derive(Debug, Serialize)]
pub struct RunMetadata {
    pub generated_at: String,
    pub sources: Vec<String>,
    pub skipped_sources: Vec<String>,
    pub row_count: usize,
    pub column_count: usize,
    pub mean_intensity: Option<f64>,
    pub mean_quality_score: Option<f64>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub top_genres: Vec<GenreCount>,
    pub verification_passed: bool,
    pub verification_warnings: usize,
    pub files_written: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: usize,
}

/// Write every output file into `dir`, creating it if needed. Returns the
/// paths written.
pub fn write_all(dir: &Path, report: &PipelineReport) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

    let mut written = Vec::new();
    written.push(write_clean_table(dir, &report.scored)?);
    written.push(write_decade_summary(dir, report)?);
    written.push(write_decade_genre_summary(dir, report)?);
    written.push(write_genre_summary(dir, report)?);
    written.push(write_category_summary(dir, report)?);
    written.push(write_readme(dir, report)?);
    written.push(write_data_dictionary(dir)?);
    written.push(write_metadata(dir, report, &written)?);

    info!(dir = %dir.display(), files = written.len(), "wrote output files");
    Ok(written)
}

fn fmt_opt_f64(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

fn fmt_opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(T::to_string).unwrap_or_default()
}

fn write_clean_table(dir: &Path, scored: &[ScoredRecord]) -> Result<PathBuf> {
    let path = dir.join(CLEAN_TABLE_FILE);
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;

    writer.write_record([
        "track_id",
        "track_name",
        "artist_name",
        "genre",
        "main_genre",
        "release_date",
        "release_year",
        "release_decade",
        "energy",
        "loudness",
        "loudness_normalized",
        "tempo",
        "danceability",
        "valence",
        "duration_ms",
        "intensity_weighted",
        "intensity_simple",
        "intensity_complex",
        "intensity_category",
        "is_complete",
        "is_valid_date",
        "is_outlier",
        "data_quality_score",
        "data_source",
    ])?;

    for scored in scored {
        let row = &scored.record;
        writer.write_record([
            fmt_opt(&row.track_id),
            fmt_opt(&row.track_name),
            fmt_opt(&row.artist_name),
            fmt_opt(&row.genre_clean),
            fmt_opt(&row.main_genre),
            row.release_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            fmt_opt(&row.release_year),
            fmt_opt(&row.release_decade),
            fmt_opt(&row.energy),
            fmt_opt(&row.loudness),
            fmt_opt(&row.loudness_normalized),
            fmt_opt(&row.tempo),
            fmt_opt(&row.danceability),
            fmt_opt(&row.valence),
            fmt_opt(&row.duration_ms),
            fmt_opt_f64(scored.intensity_weighted),
            fmt_opt_f64(scored.intensity_simple),
            fmt_opt_f64(scored.intensity_complex),
            fmt_opt(&scored.intensity_category),
            scored.is_complete.to_string(),
            scored.is_valid_date.to_string(),
            scored.is_outlier.to_string(),
            scored.data_quality_score.to_string(),
            fmt_opt(&row.data_source),
        ])?;
    }
    writer.flush()?;
    Ok(path)
}

fn write_decade_summary(dir: &Path, report: &PipelineReport) -> Result<PathBuf> {
    let path = dir.join(DECADE_SUMMARY_FILE);
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;

    writer.write_record([
        "decade",
        "intensity_mean",
        "intensity_median",
        "intensity_std",
        "intensity_min",
        "intensity_max",
        "energy_mean",
        "energy_median",
        "loudness_mean",
        "loudness_median",
        "track_count",
    ])?;
    for row in &report.by_decade {
        writer.write_record([
            row.decade.clone(),
            fmt_opt_f64(row.intensity_mean),
            fmt_opt_f64(row.intensity_median),
            fmt_opt_f64(row.intensity_std),
            fmt_opt_f64(row.intensity_min),
            fmt_opt_f64(row.intensity_max),
            fmt_opt_f64(row.energy_mean),
            fmt_opt_f64(row.energy_median),
            fmt_opt_f64(row.loudness_mean),
            fmt_opt_f64(row.loudness_median),
            row.track_count.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(path)
}

fn write_decade_genre_summary(dir: &Path, report: &PipelineReport) -> Result<PathBuf> {
    let path = dir.join(DECADE_GENRE_SUMMARY_FILE);
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;

    writer.write_record([
        "decade",
        "main_genre",
        "intensity_mean",
        "intensity_median",
        "intensity_std",
        "energy_mean",
        "loudness_mean",
        "track_count",
    ])?;
    for row in &report.by_decade_genre {
        writer.write_record([
            row.decade.clone(),
            row.genre.to_string(),
            fmt_opt_f64(row.intensity_mean),
            fmt_opt_f64(row.intensity_median),
            fmt_opt_f64(row.intensity_std),
            fmt_opt_f64(row.energy_mean),
            fmt_opt_f64(row.loudness_mean),
            row.track_count.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(path)
}

fn write_genre_summary(dir: &Path, report: &PipelineReport) -> Result<PathBuf> {
    let path = dir.join(GENRE_SUMMARY_FILE);
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;

    writer.write_record([
        "main_genre",
        "intensity_mean",
        "intensity_median",
        "intensity_std",
        "intensity_min",
        "intensity_max",
        "energy_mean",
        "energy_std",
        "loudness_mean",
        "loudness_std",
        "danceability_mean",
        "tempo_mean",
        "tempo_std",
        "track_count",
    ])?;
    for row in &report.by_genre {
        writer.write_record([
            row.genre.to_string(),
            fmt_opt_f64(row.intensity_mean),
            fmt_opt_f64(row.intensity_median),
            fmt_opt_f64(row.intensity_std),
            fmt_opt_f64(row.intensity_min),
            fmt_opt_f64(row.intensity_max),
            fmt_opt_f64(row.energy_mean),
            fmt_opt_f64(row.energy_std),
            fmt_opt_f64(row.loudness_mean),
            fmt_opt_f64(row.loudness_std),
            fmt_opt_f64(row.danceability_mean),
            fmt_opt_f64(row.tempo_mean),
            fmt_opt_f64(row.tempo_std),
            row.track_count.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(path)
}

fn write_category_summary(dir: &Path, report: &PipelineReport) -> Result<PathBuf> {
    let path = dir.join(CATEGORY_SUMMARY_FILE);
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;

    writer.write_record([
        "intensity_category",
        "intensity_mean",
        "intensity_median",
        "intensity_std",
        "intensity_min",
        "intensity_max",
        "energy_mean",
        "energy_median",
        "loudness_mean",
        "loudness_median",
        "track_count",
    ])?;
    for row in &report.by_category {
        writer.write_record([
            row.category.to_string(),
            fmt_opt_f64(row.intensity_mean),
            fmt_opt_f64(row.intensity_median),
            fmt_opt_f64(row.intensity_std),
            fmt_opt_f64(row.intensity_min),
            fmt_opt_f64(row.intensity_max),
            fmt_opt_f64(row.energy_mean),
            fmt_opt_f64(row.energy_median),
            fmt_opt_f64(row.loudness_mean),
            fmt_opt_f64(row.loudness_median),
            row.track_count.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(path)
}

fn write_readme(dir: &Path, report: &PipelineReport) -> Result<PathBuf> {
    let path = dir.join(README_FILE);

    let mut sources = String::new();
    for source in &report.sources {
        sources.push_str(&format!(
            "- `{}`: {} rows loaded, {} kept\n",
            source.source, source.loaded_rows, source.final_rows
        ));
    }
    for skipped in &report.skipped {
        sources.push_str(&format!(
            "- `{}`: skipped ({})\n",
            skipped.path.display(),
            skipped.reason
        ));
    }

    let verdict = if report.verification.passed() {
        "passed"
    } else {
        "FAILED"
    };
    let content = format!(
        "# Spotify Music Intensity Dataset\n\n\
         Cleaned and reconciled track data with derived musical intensity\n\
         metrics and per-row quality scores.\n\n\
         ## Sources\n\n{sources}\n\
         ## Contents\n\n\
         - `{CLEAN_TABLE_FILE}`: the final scored table ({rows} rows)\n\
         - `{DECADE_SUMMARY_FILE}`: intensity statistics per decade\n\
         - `{DECADE_GENRE_SUMMARY_FILE}`: per decade and genre\n\
         - `{GENRE_SUMMARY_FILE}`: per genre\n\
         - `{CATEGORY_SUMMARY_FILE}`: per intensity level\n\
         - `{DATA_DICTIONARY_FILE}`: column reference\n\
         - `{METADATA_FILE}`: machine-readable run summary\n\n\
         ## Verification\n\n\
         {checks} checks ran, {warnings} warnings; hard checks {verdict}.\n",
        rows = report.scored.len(),
        checks = report.verification.checks.len(),
        warnings = report.verification.warnings(),
    );
    fs::write(&path, content)
        .with_context(|| format!("Failed to write README: {:?}", path))?;
    Ok(path)
}

fn write_data_dictionary(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(DATA_DICTIONARY_FILE);
    let content = "\
# Data Dictionary

| Column | Type | Description |
|---|---|---|
| track_id | string | Spotify track identifier (or promoted URI) |
| track_name | string | Track title |
| artist_name | string | Primary artist |
| genre | string | Cleaned free-text genre label |
| main_genre | string | Fixed taxonomy genre (Pop, Rock, Hip-Hop, ...) |
| release_date | date | Release date, January 1st when derived from a year |
| release_year | int | Release year |
| release_decade | string | Decade label, e.g. `1980s` |
| energy | float | Spotify energy, 0 to 1 |
| loudness | float | Loudness in dB, -60 to 0 |
| loudness_normalized | float | Loudness rescaled to 0 to 1 |
| tempo | float | Tempo in BPM |
| danceability | float | Spotify danceability, 0 to 1 |
| valence | float | Spotify valence, 0 to 1 |
| duration_ms | float | Track duration in milliseconds |
| intensity_weighted | float | `0.6 * energy + 0.4 * loudness_normalized` |
| intensity_simple | float | Unweighted mean of energy and normalized loudness |
| intensity_complex | float | Tempo-aware intensity variant |
| intensity_category | string | Muy Baja, Baja, Media, Alta, Muy Alta |
| is_complete | bool | Energy, loudness, date, and genre all present |
| is_valid_date | bool | Release year within the plausible range |
| is_outlier | bool | Weighted intensity outside the Tukey fence |
| data_quality_score | int | Composite quality score, 0 to 100 |
| data_source | string | Source dataset(s) the row came from |
";
    fs::write(&path, content)
        .with_context(|| format!("Failed to write data dictionary: {:?}", path))?;
    Ok(path)
}

fn write_metadata(dir: &Path, report: &PipelineReport, written: &[PathBuf]) -> Result<PathBuf> {
    let path = dir.join(METADATA_FILE);

    let intensities: Vec<f64> = report
        .scored
        .iter()
        .filter_map(|s| s.intensity_weighted)
        .collect();
    let qualities: Vec<f64> = report
        .scored
        .iter()
        .map(|s| s.data_quality_score as f64)
        .collect();
    let years: Vec<i32> = report
        .scored
        .iter()
        .filter_map(|s| s.record.release_year)
        .collect();

    let mut genre_counts: HashMap<String, usize> = HashMap::new();
    for scored in &report.scored {
        if let Some(genre) = scored.record.main_genre {
            *genre_counts.entry(genre.to_string()).or_default() += 1;
        }
    }
    let mut top_genres: Vec<GenreCount> = genre_counts
        .into_iter()
        .map(|(genre, count)| GenreCount { genre, count })
        .collect();
    top_genres.sort_by(|a, b| b.count.cmp(&a.count).then(a.genre.cmp(&b.genre)));
    top_genres.truncate(5);

    let metadata = RunMetadata {
        generated_at: chrono::Utc::now().to_rfc3339(),
        sources: report.sources.iter().map(|s| s.source.clone()).collect(),
        skipped_sources: report
            .skipped
            .iter()
            .map(|s| s.path.display().to_string())
            .collect(),
        row_count: report.scored.len(),
        column_count: 24,
        mean_intensity: stats::mean(&intensities),
        mean_quality_score: stats::mean(&qualities),
        year_min: years.iter().min().copied(),
        year_max: years.iter().max().copied(),
        top_genres,
        verification_passed: report.verification.passed(),
        verification_warnings: report.verification.warnings(),
        files_written: written
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect(),
    };

    let json = serde_json::to_string_pretty(&metadata)?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write metadata: {:?}", path))?;
    Ok(path)
}
