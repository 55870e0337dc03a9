#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line runners shared by the binaries.
pub mod cli;
/// Run configuration.
pub mod config;
/// Centralized constants for sources, ranks, and output artifacts.
pub mod constants;
/// Normalized, ranked, and output row types.
pub mod data;
/// Identity-group deduplication and core winner selection.
pub mod dedup;
/// Core attribute propagation onto output rows.
pub mod enrich;
mod hash;
/// Parent/root/level resolution over core uprns.
pub mod hierarchy;
/// Read-back and summaries of written artifacts.
pub mod inspect;
/// Chunk balance metrics.
pub mod metrics;
/// End-to-end run orchestration.
pub mod pipeline;
/// Rank tuples for normalized rows.
pub mod rank;
/// Source collection catalog and record normalization.
pub mod source;
/// Input transports (filesystem scan and parquet row reader).
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Bucketing and chunk artifact persistence.
pub mod writer;

mod errors;

pub use config::FlatfileConfig;
pub use data::{
    CanonicalAddressRow, FeatureTag, FeatureType, FloorLevels, Language, RankTuple, RankedRow,
    RawFeatureRow,
};
pub use dedup::{CoreWinners, DedupStats, deduplicate};
pub use enrich::{CoreAttributeIndex, enrich};
pub use errors::FlatfileError;
pub use hierarchy::{HierarchyAnomaly, HierarchyForest, HierarchyNode};
pub use inspect::{OutputInspection, inspect_output, read_artifact};
pub use pipeline::{ChunkReport, ChunkStatus, FlatfilePipeline, RunSummary, run_flatfile};
pub use rank::rank_row;
pub use source::{SourceCatalog, SourceKind, SourceSpec};
pub use types::{AddressText, ClassificationCode, ProductName, SourceName, SourceStem, Uprn};
pub use writer::{ChunkWriter, artifact_name, bucket_for};
