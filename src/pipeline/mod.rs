//! The batch pipeline: per-source cleaning, cross-source reconciliation,
//! scoring, summarization, and verification.
//!
//! Single-threaded by design: each stage consumes the fully materialized
//! output of the previous one, so stage boundaries are also audit points.

pub mod combine;
pub mod dedup;
pub mod genre;
pub mod intensity;
pub mod normalize;
pub mod profile;
pub mod repair;
pub mod resolve;
pub mod summary;
pub mod verify;

use crate::table::{loader, ScoredRecord, TrackTable};
use combine::DecadeOverridePolicy;
use dedup::DedupOutcome;
use profile::SourceProfile;
use repair::RepairReport;
use resolve::ResolveOutcome;
use std::path::{Path, PathBuf};
use summary::{CategorySummary, DecadeGenreSummary, DecadeSummary, GenreSummary};
use thiserror::Error;
use tracing::{error, info, warn};
use verify::VerificationReport;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Source unavailable: {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("No usable sources: all {attempted} source(s) failed to load")]
    NoUsableSources { attempted: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// What happened to one source on its way into the combined table.
#[derive(Debug)]
pub struct SourceReport {
    pub source: String,
    pub path: PathBuf,
    pub loaded_rows: usize,
    pub profile: SourceProfile,
    pub dedup: DedupOutcome,
    pub repair: RepairReport,
    pub final_rows: usize,
}

/// A skipped source, kept in the run report for the operator.
#[derive(Debug)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a run produced, apart from the files the sink writes.
#[derive(Debug)]
pub struct PipelineReport {
    pub sources: Vec<SourceReport>,
    pub skipped: Vec<SkippedSource>,
    pub combined_rows: usize,
    pub resolve: ResolveOutcome,
    pub scored: Vec<ScoredRecord>,
    pub by_decade: Vec<DecadeSummary>,
    pub by_decade_genre: Vec<DecadeGenreSummary>,
    pub by_genre: Vec<GenreSummary>,
    pub by_category: Vec<CategorySummary>,
    pub verification: VerificationReport,
}

/// The full batch pipeline over a set of CSV source paths.
#[derive(Default)]
pub struct Pipeline {
    pub decade_policy: DecadeOverridePolicy,
}

impl Pipeline {
    pub fn new(decade_policy: DecadeOverridePolicy) -> Self {
        Self { decade_policy }
    }

    /// Run end to end. A source that fails to load is skipped and recorded;
    /// only a run where every source fails is an error.
    pub fn run(&self, paths: &[PathBuf]) -> Result<PipelineReport, PipelineError> {
        let mut sources = Vec::new();
        let mut skipped = Vec::new();
        let mut tables = Vec::new();

        for path in paths {
            match self.prepare_source(path) {
                Ok((report, table)) => {
                    sources.push(report);
                    tables.push(table);
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "skipping unavailable source");
                    skipped.push(SkippedSource {
                        path: path.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        if tables.is_empty() {
            error!(attempted = paths.len(), "no source could be loaded");
            return Err(PipelineError::NoUsableSources {
                attempted: paths.len(),
            });
        }

        let combined = combine::combine(tables, self.decade_policy);
        let combined_rows = combined.len();
        let (resolved, resolve_outcome) = resolve::resolve(combined);
        let scored = intensity::score_table(resolved);

        let report = PipelineReport {
            sources,
            skipped,
            combined_rows,
            resolve: resolve_outcome,
            by_decade: summary::by_decade(&scored),
            by_decade_genre: summary::by_decade_genre(&scored),
            by_genre: summary::by_genre(&scored),
            by_category: summary::by_category(&scored),
            verification: verify::verify(&scored),
            scored,
        };

        info!(
            sources = report.sources.len(),
            skipped = report.skipped.len(),
            final_rows = report.scored.len(),
            verification_passed = report.verification.passed(),
            "pipeline run complete"
        );
        Ok(report)
    }

    /// Load and clean one source: load, profile, promote identity, dedup,
    /// repair, classify.
    fn prepare_source(&self, path: &Path) -> Result<(SourceReport, TrackTable), PipelineError> {
        let mut table =
            loader::load_csv(path).map_err(|err| PipelineError::SourceUnavailable {
                path: path.to_path_buf(),
                reason: format!("{err:#}"),
            })?;
        let loaded_rows = table.len();

        let profile = profile::profile(&table);
        normalize::promote_identity(&mut table);
        let dedup = dedup::deduplicate(&mut table);
        let repair = repair::repair(&mut table);
        genre::classify_table(&mut table);

        let report = SourceReport {
            source: table.source.clone(),
            path: path.to_path_buf(),
            loaded_rows,
            profile,
            dedup,
            repair,
            final_rows: table.len(),
        };
        Ok((report, table))
    }
}
