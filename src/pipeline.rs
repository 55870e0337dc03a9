//! One flatfile run: schema checks, the global hierarchy pass, then each
//! chunk scanned, deduplicated, enriched, and written independently.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::FlatfileConfig;
use crate::data::RankedRow;
use crate::dedup::{CoreWinners, DedupStats, deduplicate};
use crate::enrich::{CoreAttributeIndex, enrich};
use crate::errors::FlatfileError;
use crate::hierarchy::{HierarchyAnomaly, HierarchyForest};
use crate::metrics::{ChunkSkew, chunk_skew};
use crate::rank::rank_row;
use crate::source::{SourceCatalog, SourceTable};
use crate::types::SourceName;
use crate::writer::{ChunkWriter, WrittenChunk, bucket_for};

/// What happened to one configured chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkStatus {
    /// Computed and written during this run.
    Written,
    /// Artifact already existed and overwrite was off.
    Skipped,
}

/// Per-chunk outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkReport {
    /// 0-based chunk index.
    pub index: usize,
    /// Final artifact path for this chunk.
    pub artifact: PathBuf,
    pub status: ChunkStatus,
    /// Rows written (0 for skipped chunks).
    pub rows: usize,
    /// Duplicate counts for this chunk.
    pub dedup: DedupStats,
    /// Excluded rows (Non-Addressable) dropped from this bucket.
    pub excluded: u64,
    /// Rows without a usable uprn seen while scanning for this bucket.
    pub unusable_rows: u64,
}

/// Aggregated outcome of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub num_chunks: usize,
    /// Tables discovered under the input directory, in catalog order.
    pub source_tables: Vec<SourceName>,
    /// Tables that were present but held no rows.
    pub empty_sources: Vec<SourceName>,
    pub hierarchy_nodes: usize,
    pub max_hierarchy_level: u32,
    /// Dangling parents and broken cycles, in uprn order.
    pub anomalies: Vec<HierarchyAnomaly>,
    pub chunks: Vec<ChunkReport>,
    /// Row balance across chunks; only set when every chunk was written.
    pub skew: Option<ChunkSkew>,
}

impl RunSummary {
    /// Rows written by this run (skipped chunks count as zero).
    pub fn rows_written(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.rows).sum()
    }

    pub fn written_chunks(&self) -> usize {
        self.chunks
            .iter()
            .filter(|chunk| chunk.status == ChunkStatus::Written)
            .count()
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &PathBuf> {
        self.chunks.iter().map(|chunk| &chunk.artifact)
    }
}

/// Ranked rows of one table that fall in one bucket.
#[derive(Default)]
struct BucketScan {
    ranked: Vec<RankedRow>,
    excluded: u64,
    unusable: u64,
}

/// Drives a run for one validated configuration.
pub struct FlatfilePipeline {
    config: FlatfileConfig,
    writer: ChunkWriter,
}

impl FlatfilePipeline {
    /// Validate `config` and bind a writer to its output directory.
    pub fn new(config: FlatfileConfig) -> Result<Self, FlatfileError> {
        let config = config.validated()?;
        let writer = ChunkWriter::new(&config);
        Ok(Self { config, writer })
    }

    pub fn config(&self) -> &FlatfileConfig {
        &self.config
    }

    /// Execute the run, writing every chunk whose artifact is missing.
    ///
    /// Chunks written before a failure are removed again.
    pub fn run(&self) -> Result<RunSummary, FlatfileError> {
        let started_at = Utc::now();
        let num_chunks = self.config.num_chunks;
        self.writer.prepare()?;
        if self.config.overwrite {
            self.writer.purge_existing()?;
        }

        let pending: BTreeSet<usize> = (0..num_chunks)
            .filter(|&index| !self.writer.artifact_path(index).exists())
            .collect();
        if pending.is_empty() {
            info!(
                "[ngd:flatfile] all {num_chunks} artifact(s) already exist in {}; nothing to do",
                self.writer.output_dir().display()
            );
            return Ok(RunSummary {
                started_at,
                finished_at: Utc::now(),
                num_chunks,
                source_tables: Vec::new(),
                empty_sources: Vec::new(),
                hierarchy_nodes: 0,
                max_hierarchy_level: 0,
                anomalies: Vec::new(),
                chunks: (0..num_chunks).map(|index| self.skipped(index)).collect(),
                skew: None,
            });
        }

        let catalog = SourceCatalog::discover(&self.config.input_dir)?;
        let checks = catalog.verify_schemas()?;
        let empty_sources: Vec<SourceName> = checks
            .iter()
            .filter(|check| check.rows == 0)
            .map(|check| check.name.clone())
            .collect();
        for name in &empty_sources {
            info!("[ngd:flatfile] source {name} is empty; it contributes no rows");
        }
        info!(
            "[ngd:flatfile] {} source table(s) under {}; writing {} of {num_chunks} chunk(s)",
            catalog.len(),
            self.config.input_dir.display(),
            pending.len()
        );

        let forest = build_forest(&catalog)?;
        info!(
            "[ngd:hierarchy] {} node(s), max level {}, {} anomaly(ies)",
            forest.len(),
            forest.max_level(),
            forest.anomalies().len()
        );

        let mut written: Vec<WrittenChunk> = Vec::new();
        let mut chunks = Vec::with_capacity(num_chunks);
        for index in 0..num_chunks {
            if !pending.contains(&index) {
                info!(
                    "[ngd:flatfile] chunk {}/{num_chunks} exists; leaving it in place",
                    index + 1
                );
                chunks.push(self.skipped(index));
                continue;
            }
            match self.process_chunk(index, &catalog, &forest) {
                Ok((report, chunk)) => {
                    written.push(chunk);
                    chunks.push(report);
                }
                Err(err) => {
                    warn!(
                        "[ngd:flatfile] chunk {}/{num_chunks} failed: {err}; rolling back",
                        index + 1
                    );
                    self.writer.rollback(&written);
                    return Err(err);
                }
            }
        }

        let skew = if written.len() == num_chunks {
            let counts: Vec<usize> = chunks.iter().map(|chunk| chunk.rows).collect();
            chunk_skew(&counts)
        } else {
            None
        };
        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            num_chunks,
            source_tables: catalog.tables().map(|table| table.name.clone()).collect(),
            empty_sources,
            hierarchy_nodes: forest.len(),
            max_hierarchy_level: forest.max_level(),
            anomalies: forest.anomalies().to_vec(),
            chunks,
            skew,
        };
        info!(
            "[ngd:flatfile] wrote {} row(s) across {} chunk(s) in {}ms",
            summary.rows_written(),
            summary.written_chunks(),
            (summary.finished_at - summary.started_at).num_milliseconds()
        );
        Ok(summary)
    }

    fn skipped(&self, index: usize) -> ChunkReport {
        ChunkReport {
            index,
            artifact: self.writer.artifact_path(index),
            status: ChunkStatus::Skipped,
            rows: 0,
            dedup: DedupStats::default(),
            excluded: 0,
            unusable_rows: 0,
        }
    }

    fn process_chunk(
        &self,
        index: usize,
        catalog: &SourceCatalog,
        forest: &HierarchyForest,
    ) -> Result<(ChunkReport, WrittenChunk), FlatfileError> {
        let num_chunks = self.config.num_chunks;
        let tables: Vec<&SourceTable> = catalog.tables().collect();
        let scans = tables
            .par_iter()
            .map(|table| scan_bucket(table, index, num_chunks))
            .collect::<Result<Vec<_>, _>>()?;

        let mut ranked = Vec::new();
        let mut excluded = 0;
        let mut unusable = 0;
        for scan in scans {
            ranked.extend(scan.ranked);
            excluded += scan.excluded;
            unusable += scan.unusable;
        }
        if unusable > 0 {
            warn!(
                "[ngd:flatfile] chunk {}/{num_chunks}: skipped {unusable} row(s) without a usable uprn",
                index + 1
            );
        }

        let mut winners = CoreWinners::new();
        for row in ranked.iter().filter(|row| row.row.feature.is_core()) {
            winners.offer(row.clone());
        }
        let core = CoreAttributeIndex::from_winners(&winners);
        let (survivors, dedup) = deduplicate(ranked);
        let rows = enrich(survivors, &core, forest);
        let chunk = self.writer.write_chunk(index, &rows)?;
        info!(
            "[ngd:flatfile] chunk {}/{num_chunks}: {} row(s) -> {}",
            index + 1,
            chunk.rows,
            chunk.path.display()
        );
        debug!(
            "[ngd:flatfile] chunk {}/{num_chunks}: {} candidate(s), {} duplicate(s), {excluded} excluded",
            index + 1,
            dedup.candidates,
            dedup.dropped
        );
        Ok((
            ChunkReport {
                index,
                artifact: chunk.path.clone(),
                status: ChunkStatus::Written,
                rows: chunk.rows,
                dedup,
                excluded,
                unusable_rows: unusable,
            },
            chunk,
        ))
    }
}

/// Run the pipeline once for `config`.
pub fn run_flatfile(config: &FlatfileConfig) -> Result<RunSummary, FlatfileError> {
    FlatfilePipeline::new(config.clone())?.run()
}

/// Scan every core table once and resolve the global forest.
fn build_forest(catalog: &SourceCatalog) -> Result<HierarchyForest, FlatfileError> {
    let tables: Vec<&SourceTable> = catalog.core_tables().collect();
    let partials = tables
        .par_iter()
        .map(|table| -> Result<CoreWinners, FlatfileError> {
            let mut winners = CoreWinners::new();
            for row in table.normalized_rows()? {
                if let Some(ranked) = rank_row(row?) {
                    winners.offer(ranked);
                }
            }
            Ok(winners)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let mut winners = CoreWinners::new();
    for partial in partials {
        winners.merge(partial);
    }
    Ok(HierarchyForest::build(&winners.parent_pointers()))
}

fn scan_bucket(
    table: &SourceTable,
    index: usize,
    num_chunks: usize,
) -> Result<BucketScan, FlatfileError> {
    let mut scan = BucketScan::default();
    let mut rows = table.normalized_rows()?;
    for row in rows.by_ref() {
        let row = row?;
        if bucket_for(row.uprn, num_chunks) != index {
            continue;
        }
        match rank_row(row) {
            Some(ranked) => scan.ranked.push(ranked),
            None => scan.excluded += 1,
        }
    }
    scan.unusable = rows.skipped();
    Ok(scan)
}
