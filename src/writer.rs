//! Partitioned writer: uprn buckets and chunk artifact persistence.
//!
//! Artifacts are written to `<artifact>.partial` and renamed into place once
//! the parquet footer is closed, so a finished name always refers to a
//! complete file.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use tracing::{debug, info, warn};

use crate::config::FlatfileConfig;
use crate::constants::output::{
    ARTIFACT_INFIX, BUCKET_SEED, CHUNK_INDEX_WIDTH, PARTIAL_SUFFIX,
};
use crate::constants::schema;
use crate::constants::sources::PARQUET_EXTENSION;
use crate::data::CanonicalAddressRow;
use crate::errors::FlatfileError;
use crate::hash::stable_hash_uprn;
use crate::transport::fs::{list_file_names, remove_if_exists};
use crate::types::Uprn;

/// Bucket (0-based chunk index) owning `uprn` when writing `num_chunks` chunks.
pub fn bucket_for(uprn: Uprn, num_chunks: usize) -> usize {
    if num_chunks <= 1 {
        return 0;
    }
    (stable_hash_uprn(BUCKET_SEED, uprn) % num_chunks as u64) as usize
}

/// `<product>_for_uk_address_matcher.chunk_<iii>_of_<NNN>.parquet` for the
/// 0-based `index`.
///
/// Both numbers share one width, so names of a run sort in chunk order.
pub fn artifact_name(product: &str, index: usize, num_chunks: usize) -> String {
    format!(
        "{}chunk_{:0width$}_of_{:0width$}.{}",
        artifact_prefix(product),
        index + 1,
        num_chunks,
        PARQUET_EXTENSION,
        width = chunk_index_width(num_chunks)
    )
}

/// Digits used for chunk numbers: at least `CHUNK_INDEX_WIDTH`, more when
/// `num_chunks` needs them.
pub fn chunk_index_width(num_chunks: usize) -> usize {
    let mut digits = 1;
    let mut rest = num_chunks / 10;
    while rest > 0 {
        digits += 1;
        rest /= 10;
    }
    digits.max(CHUNK_INDEX_WIDTH)
}

/// Shared prefix of every artifact for `product`, whatever the chunk count.
pub fn artifact_prefix(product: &str) -> String {
    format!("{product}{ARTIFACT_INFIX}.")
}

/// In-progress path for `artifact`.
pub fn partial_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_os_string();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// True for finished artifacts of `product` with any chunk count.
pub fn is_product_artifact(file_name: &str, product: &str) -> bool {
    parse_chunk_suffix(file_name, product).is_some()
}

/// True for in-progress files left behind for `product`.
pub fn is_product_partial(file_name: &str, product: &str) -> bool {
    file_name
        .strip_suffix(PARTIAL_SUFFIX)
        .and_then(|rest| rest.strip_suffix('.'))
        .map(|artifact| is_product_artifact(artifact, product))
        .unwrap_or(false)
}

/// `(index, num_chunks)` (both 1-based as written) parsed from an artifact name.
pub fn parse_chunk_suffix(file_name: &str, product: &str) -> Option<(usize, usize)> {
    let rest = file_name.strip_prefix(&artifact_prefix(product))?;
    let rest = rest.strip_suffix(PARQUET_EXTENSION)?.strip_suffix('.')?;
    let (index, total) = rest.strip_prefix("chunk_")?.split_once("_of_")?;
    Some((index.parse().ok()?, total.parse().ok()?))
}

/// Arrow schema of every chunk artifact.
pub fn output_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(schema::UPRN, DataType::UInt64, false),
        Field::new(schema::ADDRESS_CONCAT, DataType::Utf8, false),
        Field::new(schema::POSTCODE, DataType::Utf8, true),
        Field::new(schema::SOURCE_FILENAME, DataType::Utf8, false),
        Field::new(schema::CLASSIFICATION_CODE, DataType::Utf8, true),
        Field::new(schema::PARENT_UPRN, DataType::UInt64, true),
        Field::new(schema::ROOT_UPRN, DataType::UInt64, true),
        Field::new(schema::HIERARCHY_LEVEL, DataType::UInt32, true),
        Field::new(schema::FLOOR_LEVEL, DataType::Utf8, true),
        Field::new(schema::LOWEST_FLOOR_LEVEL, DataType::Float64, true),
        Field::new(schema::HIGHEST_FLOOR_LEVEL, DataType::Float64, true),
    ]))
}

/// Columnar batch for `rows`, in row order.
pub fn rows_to_batch(rows: &[CanonicalAddressRow]) -> Result<RecordBatch, ParquetError> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|row| row.uprn))),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|row| row.address_concat.as_str()),
        )),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|row| row.postcode.as_deref()),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|row| row.source_filename.as_str()),
        )),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|row| row.classification_code.as_deref()),
        )),
        Arc::new(UInt64Array::from_iter(rows.iter().map(|row| row.parent_uprn))),
        Arc::new(UInt64Array::from_iter(rows.iter().map(|row| row.root_uprn))),
        Arc::new(UInt32Array::from_iter(
            rows.iter().map(|row| row.hierarchy_level),
        )),
        Arc::new(StringArray::from_iter(
            rows.iter().map(|row| row.floor_level.as_deref()),
        )),
        Arc::new(Float64Array::from_iter(
            rows.iter().map(|row| row.lowest_floor_level),
        )),
        Arc::new(Float64Array::from_iter(
            rows.iter().map(|row| row.highest_floor_level),
        )),
    ];
    Ok(RecordBatch::try_new(output_schema(), columns)?)
}

/// A chunk artifact written during this run.
#[derive(Clone, Debug, PartialEq)]
pub struct WrittenChunk {
    pub path: PathBuf,
    pub rows: usize,
}

/// Writes the chunk artifacts of one run.
#[derive(Clone, Debug)]
pub struct ChunkWriter {
    output_dir: PathBuf,
    product: String,
    num_chunks: usize,
    compression_level: i32,
}

impl ChunkWriter {
    pub fn new(config: &FlatfileConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            product: config.product.clone(),
            num_chunks: config.num_chunks,
            compression_level: config.compression_level,
        }
    }

    pub fn num_chunks(&self) -> usize {
        self.num_chunks
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn artifact_path(&self, index: usize) -> PathBuf {
        self.output_dir
            .join(artifact_name(&self.product, index, self.num_chunks))
    }

    /// Create the output directory and drop `.partial` leftovers.
    pub fn prepare(&self) -> Result<usize, FlatfileError> {
        fs::create_dir_all(&self.output_dir)?;
        let mut removed = 0;
        for name in list_file_names(&self.output_dir)? {
            if is_product_partial(&name, &self.product)
                && remove_if_exists(&self.output_dir.join(&name))?
            {
                removed += 1;
                info!("[ngd:writer] removed stale partial artifact {name}");
            }
        }
        Ok(removed)
    }

    /// Remove every finished artifact of the product, for any chunk count.
    pub fn purge_existing(&self) -> Result<usize, FlatfileError> {
        let mut removed = 0;
        for name in list_file_names(&self.output_dir)? {
            if is_product_artifact(&name, &self.product)
                && remove_if_exists(&self.output_dir.join(&name))?
            {
                removed += 1;
                debug!("[ngd:writer] removed existing artifact {name}");
            }
        }
        if removed > 0 {
            info!("[ngd:writer] overwrite: removed {removed} existing artifact(s)");
        }
        Ok(removed)
    }

    /// Write one chunk; the finished artifact appears only on success.
    pub fn write_chunk(
        &self,
        index: usize,
        rows: &[CanonicalAddressRow],
    ) -> Result<WrittenChunk, FlatfileError> {
        let artifact = self.artifact_path(index);
        let partial = partial_path(&artifact);
        let written = self
            .write_parquet(&partial, rows)
            .map_err(|err| err.to_string())
            .and_then(|()| fs::rename(&partial, &artifact).map_err(|err| err.to_string()));
        if let Err(reason) = written {
            if let Err(err) = remove_if_exists(&partial) {
                warn!(
                    "[ngd:writer] failed removing partial artifact {}: {err}",
                    partial.display()
                );
            }
            return Err(FlatfileError::PartialChunkWrite { artifact, reason });
        }
        Ok(WrittenChunk {
            path: artifact,
            rows: rows.len(),
        })
    }

    fn write_parquet(&self, path: &Path, rows: &[CanonicalAddressRow]) -> Result<(), ParquetError> {
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(ZstdLevel::try_new(
                self.compression_level,
            )?))
            .build();
        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, output_schema(), Some(props))?;
        if !rows.is_empty() {
            writer.write(&rows_to_batch(rows)?)?;
        }
        writer.close()?;
        Ok(())
    }

    /// Remove artifacts written earlier in a failed run.
    pub fn rollback(&self, written: &[WrittenChunk]) {
        for chunk in written {
            match remove_if_exists(&chunk.path) {
                Ok(_) => warn!(
                    "[ngd:writer] rolled back artifact {}",
                    chunk.path.display()
                ),
                Err(err) => warn!(
                    "[ngd:writer] failed rolling back artifact {}: {err}",
                    chunk.path.display()
                ),
            }
        }
    }
}
