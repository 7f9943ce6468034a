//! Music Intensity Pipeline Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod pipeline;
pub mod report;
pub mod table;

// Re-export commonly used types for convenience
pub use config::{AppConfig, CliConfig, FileConfig};
pub use pipeline::combine::DecadeOverridePolicy;
pub use pipeline::{Pipeline, PipelineError, PipelineReport};
pub use table::{ScoredRecord, TrackRecord, TrackTable};
