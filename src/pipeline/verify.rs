//! Post-run verification of the scored table.
//!
//! Read-only: every check inspects the final records and reports an outcome,
//! nothing here mutates or blocks the written outputs. Hard checks decide the
//! overall verdict; the rest are advisory.

use crate::table::{stats, MainGenre, ScoredRecord};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// Latest release year the catalog can plausibly contain.
use crate::pipeline::repair::MAX_RELEASE_YEAR;

/// Below this energy-loudness correlation the audio fields are inconsistent;
/// above [`REDUNDANT_ENERGY_LOUDNESS_CORR`] they are nearly redundant. Both
/// bands fail the verdict.
pub const MIN_ENERGY_LOUDNESS_CORR: f64 = 0.3;
pub const REDUNDANT_ENERGY_LOUDNESS_CORR: f64 = 0.7;

/// Pearson threshold for calling the year-intensity trend rising or falling.
pub const TREND_CORR: f64 = 0.3;

/// Genres expected to score intense / calm on average.
pub const EXPECTED_INTENSE: &[MainGenre] =
    &[MainGenre::Electronic, MainGenre::HipHop, MainGenre::Rock];
pub const EXPECTED_CALM: &[MainGenre] =
    &[MainGenre::Jazz, MainGenre::Classical, MainGenre::Country];

pub const INTENSE_GENRE_FLOOR: f64 = 0.6;
pub const CALM_GENRE_CEILING: f64 = 0.5;

pub const LOW_DECADE_COUNT: usize = 500;
pub const ACCEPTABLE_DECADE_COUNT: usize = 1000;
pub const LOW_GENRE_COUNT: usize = 1000;
pub const MIN_DECADE_COMPLETENESS: f64 = 0.8;
pub const DECADE_DOMINANCE_SHARE: f64 = 0.5;
pub const TOP_GENRES_SHARE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
    /// Hard checks decide the overall verdict; advisory ones never fail it.
    pub hard: bool,
}

#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    pub checks: Vec<CheckOutcome>,
}

impl VerificationReport {
    /// Overall verdict: no hard check failed.
    pub fn passed(&self) -> bool {
        !self
            .checks
            .iter()
            .any(|check| check.hard && check.status == CheckStatus::Fail)
    }

    pub fn warnings(&self) -> usize {
        self.checks
            .iter()
            .filter(|check| check.status == CheckStatus::Warning)
            .count()
    }

    fn push(&mut self, name: &str, status: CheckStatus, detail: String, hard: bool) {
        match status {
            CheckStatus::Pass => info!(check = name, %detail, "check passed"),
            CheckStatus::Warning => warn!(check = name, %detail, "check warning"),
            CheckStatus::Fail => error!(check = name, %detail, "check failed"),
        }
        self.checks.push(CheckOutcome {
            name: name.to_string(),
            status,
            detail,
            hard,
        });
    }
}

fn decade_groups(scored: &[ScoredRecord]) -> BTreeMap<String, Vec<&ScoredRecord>> {
    let mut groups: BTreeMap<String, Vec<&ScoredRecord>> = BTreeMap::new();
    for record in scored {
        if let Some(decade) = &record.record.release_decade {
            groups.entry(decade.clone()).or_default().push(record);
        }
    }
    groups
}

fn genre_groups(scored: &[ScoredRecord]) -> BTreeMap<MainGenre, Vec<&ScoredRecord>> {
    let mut groups: BTreeMap<MainGenre, Vec<&ScoredRecord>> = BTreeMap::new();
    for record in scored {
        if let Some(genre) = record.record.main_genre {
            groups.entry(genre).or_default().push(record);
        }
    }
    groups
}

fn group_intensity_mean(group: &[&ScoredRecord]) -> Option<f64> {
    let values: Vec<f64> = group.iter().filter_map(|s| s.intensity_weighted).collect();
    stats::mean(&values)
}

/// Run every check against the scored table.
pub fn verify(scored: &[ScoredRecord]) -> VerificationReport {
    let mut report = VerificationReport::default();

    check_release_years(scored, &mut report);
    check_value_ranges(scored, &mut report);
    check_energy_loudness_correlation(scored, &mut report);
    check_decade_distributions(scored, &mut report);
    check_year_intensity_trend(scored, &mut report);
    check_genre_coherence(scored, &mut report);
    check_genre_counts(scored, &mut report);
    check_balance(scored, &mut report);

    info!(
        checks = report.checks.len(),
        warnings = report.warnings(),
        passed = report.passed(),
        "verification complete"
    );
    report
}

fn check_release_years(scored: &[ScoredRecord], report: &mut VerificationReport) {
    let future = scored
        .iter()
        .filter(|s| s.record.release_year.map_or(false, |y| y > MAX_RELEASE_YEAR))
        .count();
    let status = if future == 0 {
        CheckStatus::Pass
    } else {
        CheckStatus::Fail
    };
    report.push(
        "release_years_plausible",
        status,
        format!("{future} rows with release_year beyond {MAX_RELEASE_YEAR}"),
        true,
    );
}

fn check_value_ranges(scored: &[ScoredRecord], report: &mut VerificationReport) {
    let bad_energy = scored
        .iter()
        .filter(|s| s.record.energy.map_or(false, |e| !(0.0..=1.0).contains(&e)))
        .count();
    report.push(
        "energy_in_range",
        if bad_energy == 0 {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        },
        format!("{bad_energy} rows with energy outside [0, 1]"),
        true,
    );

    let bad_loudness = scored
        .iter()
        .filter(|s| {
            s.record
                .loudness_normalized
                .map_or(false, |l| !(0.0..=1.0).contains(&l))
        })
        .count();
    report.push(
        "loudness_normalized_in_range",
        if bad_loudness == 0 {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        },
        format!("{bad_loudness} rows with loudness_normalized outside [0, 1]"),
        true,
    );
}

fn check_energy_loudness_correlation(scored: &[ScoredRecord], report: &mut VerificationReport) {
    let pairs: (Vec<f64>, Vec<f64>) = scored
        .iter()
        .filter_map(|s| Some((s.record.energy?, s.record.loudness?)))
        .unzip();
    match stats::pearson(&pairs.0, &pairs.1) {
        Some(corr) if corr < MIN_ENERGY_LOUDNESS_CORR => report.push(
            "energy_loudness_correlation",
            CheckStatus::Fail,
            format!("correlation {corr:.3} below {MIN_ENERGY_LOUDNESS_CORR}"),
            true,
        ),
        Some(corr) if corr > REDUNDANT_ENERGY_LOUDNESS_CORR => report.push(
            "energy_loudness_correlation",
            CheckStatus::Fail,
            format!("correlation {corr:.3} above {REDUNDANT_ENERGY_LOUDNESS_CORR}, fields nearly redundant"),
            true,
        ),
        Some(corr) => report.push(
            "energy_loudness_correlation",
            CheckStatus::Pass,
            format!("correlation {corr:.3}"),
            true,
        ),
        None => report.push(
            "energy_loudness_correlation",
            CheckStatus::Warning,
            "not enough paired values to correlate".to_string(),
            true,
        ),
    }
}

fn check_decade_distributions(scored: &[ScoredRecord], report: &mut VerificationReport) {
    for (decade, group) in decade_groups(scored) {
        let count = group.len();
        let mean = group_intensity_mean(&group);
        let complete = group.iter().filter(|s| s.is_complete).count();
        let completeness = complete as f64 / count as f64;

        let (status, volume) = if count < LOW_DECADE_COUNT {
            (CheckStatus::Warning, "low volume")
        } else if count < ACCEPTABLE_DECADE_COUNT {
            (CheckStatus::Pass, "acceptable volume")
        } else {
            (CheckStatus::Pass, "excellent volume")
        };
        report.push(
            &format!("decade_{decade}_volume"),
            status,
            format!(
                "{count} rows ({volume}), mean intensity {}",
                mean.map_or_else(|| "n/a".to_string(), |m| format!("{m:.3}"))
            ),
            false,
        );

        if completeness < MIN_DECADE_COMPLETENESS {
            report.push(
                &format!("decade_{decade}_completeness"),
                CheckStatus::Warning,
                format!("{:.1}% complete rows", completeness * 100.0),
                false,
            );
        }
    }
}

fn check_year_intensity_trend(scored: &[ScoredRecord], report: &mut VerificationReport) {
    let mut years = Vec::new();
    let mut intensities = Vec::new();
    for (_, group) in decade_groups(scored) {
        let year_values: Vec<f64> = group
            .iter()
            .filter_map(|s| s.record.release_year.map(f64::from))
            .collect();
        if let (Some(year), Some(intensity)) =
            (stats::mean(&year_values), group_intensity_mean(&group))
        {
            years.push(year);
            intensities.push(intensity);
        }
    }

    let detail = match stats::pearson(&years, &intensities) {
        Some(corr) if corr > TREND_CORR => format!("rising (corr {corr:.3})"),
        Some(corr) if corr < -TREND_CORR => format!("falling (corr {corr:.3})"),
        Some(corr) => format!("flat (corr {corr:.3})"),
        None => "not enough decades to estimate".to_string(),
    };
    report.push("year_intensity_trend", CheckStatus::Pass, detail, false);
}

fn check_genre_coherence(scored: &[ScoredRecord], report: &mut VerificationReport) {
    let groups = genre_groups(scored);

    for genre in EXPECTED_INTENSE {
        let Some(mean) = groups.get(genre).and_then(|g| group_intensity_mean(g)) else {
            continue;
        };
        let status = if mean > INTENSE_GENRE_FLOOR {
            CheckStatus::Pass
        } else {
            CheckStatus::Warning
        };
        report.push(
            &format!("genre_{genre}_intense"),
            status,
            format!("mean intensity {mean:.3}, expected above {INTENSE_GENRE_FLOOR}"),
            false,
        );
    }

    for genre in EXPECTED_CALM {
        let Some(mean) = groups.get(genre).and_then(|g| group_intensity_mean(g)) else {
            continue;
        };
        let status = if mean < CALM_GENRE_CEILING {
            CheckStatus::Pass
        } else {
            CheckStatus::Warning
        };
        report.push(
            &format!("genre_{genre}_calm"),
            status,
            format!("mean intensity {mean:.3}, expected below {CALM_GENRE_CEILING}"),
            false,
        );
    }
}

fn check_genre_counts(scored: &[ScoredRecord], report: &mut VerificationReport) {
    for (genre, group) in genre_groups(scored) {
        if group.len() < LOW_GENRE_COUNT {
            report.push(
                &format!("genre_{genre}_volume"),
                CheckStatus::Warning,
                format!("{} rows, below {LOW_GENRE_COUNT}", group.len()),
                false,
            );
        }
    }
}

fn check_balance(scored: &[ScoredRecord], report: &mut VerificationReport) {
    if scored.is_empty() {
        return;
    }
    let total = scored.len() as f64;

    for (decade, group) in decade_groups(scored) {
        let share = group.len() as f64 / total;
        if share > DECADE_DOMINANCE_SHARE {
            report.push(
                "decade_balance",
                CheckStatus::Warning,
                format!("{decade} holds {:.1}% of all rows", share * 100.0),
                false,
            );
        }
    }

    let mut genre_counts: Vec<usize> = genre_groups(scored)
        .values()
        .map(|group| group.len())
        .collect();
    genre_counts.sort_unstable_by(|a, b| b.cmp(a));
    let top5: usize = genre_counts.iter().take(5).sum();
    let share = top5 as f64 / total;
    if share > TOP_GENRES_SHARE {
        report.push(
            "genre_balance",
            CheckStatus::Warning,
            format!("top 5 genres hold {:.1}% of all rows", share * 100.0),
            false,
        );
    }
}
