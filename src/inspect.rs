//! Read written artifacts back and summarize them.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::{Array, Float64Array, StringArray, UInt32Array, UInt64Array};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};

use crate::constants::schema;
use crate::data::CanonicalAddressRow;
use crate::errors::FlatfileError;
use crate::transport::fs::list_file_names;
use crate::types::{SourceName, Uprn};
use crate::writer::is_product_artifact;

/// Address-variant counts per uprn across the inspected artifacts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariantStatistics {
    pub total_uprns: usize,
    pub total_variants: usize,
    pub mean_variants: f64,
    pub median_variants: f64,
    pub min_variants: usize,
    pub max_variants: usize,
}

/// Summary of one artifact file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub distinct_uprns: usize,
}

/// Summary of every artifact of a product in one directory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputInspection {
    pub artifacts: Vec<ArtifactSummary>,
    pub total_rows: usize,
    pub rows_by_source: BTreeMap<SourceName, usize>,
    pub with_classification: usize,
    pub with_hierarchy: usize,
    pub variants: Option<VariantStatistics>,
    /// First rows of the first artifact, in file order.
    pub sample: Vec<CanonicalAddressRow>,
}

/// Artifact paths for `product` in `dir`, sorted by name.
pub fn artifact_files(dir: &Path, product: &str) -> Result<Vec<PathBuf>, FlatfileError> {
    Ok(list_file_names(dir)?
        .into_iter()
        .filter(|name| is_product_artifact(name, product))
        .map(|name| dir.join(name))
        .collect())
}

fn unreadable(path: &Path, reason: impl ToString) -> FlatfileError {
    FlatfileError::OutputUnreadable {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn column<'a, T: 'static>(
    batch: &'a RecordBatch,
    name: &str,
    path: &Path,
) -> Result<&'a T, FlatfileError> {
    batch
        .column_by_name(name)
        .and_then(|array| array.as_any().downcast_ref::<T>())
        .ok_or_else(|| unreadable(path, format!("missing or mistyped column '{name}'")))
}

fn text(array: &StringArray, index: usize) -> Option<String> {
    (!array.is_null(index)).then(|| array.value(index).to_string())
}

/// Decode one artifact into rows, in file order.
///
/// `language` is not stored in artifacts and comes back as `None`.
pub fn read_artifact(path: &Path) -> Result<Vec<CanonicalAddressRow>, FlatfileError> {
    let file = File::open(path).map_err(|err| unreadable(path, err))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .and_then(|builder| builder.build())
        .map_err(|err| unreadable(path, err))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|err| unreadable(path, err))?;
        let uprn = column::<UInt64Array>(&batch, schema::UPRN, path)?;
        let address = column::<StringArray>(&batch, schema::ADDRESS_CONCAT, path)?;
        let postcode = column::<StringArray>(&batch, schema::POSTCODE, path)?;
        let source = column::<StringArray>(&batch, schema::SOURCE_FILENAME, path)?;
        let classification = column::<StringArray>(&batch, schema::CLASSIFICATION_CODE, path)?;
        let parent = column::<UInt64Array>(&batch, schema::PARENT_UPRN, path)?;
        let root = column::<UInt64Array>(&batch, schema::ROOT_UPRN, path)?;
        let level = column::<UInt32Array>(&batch, schema::HIERARCHY_LEVEL, path)?;
        let floor = column::<StringArray>(&batch, schema::FLOOR_LEVEL, path)?;
        let lowest = column::<Float64Array>(&batch, schema::LOWEST_FLOOR_LEVEL, path)?;
        let highest = column::<Float64Array>(&batch, schema::HIGHEST_FLOOR_LEVEL, path)?;

        for i in 0..batch.num_rows() {
            rows.push(CanonicalAddressRow {
                uprn: uprn.value(i),
                address_concat: address.value(i).to_string(),
                postcode: text(postcode, i),
                source_filename: source.value(i).to_string(),
                classification_code: text(classification, i),
                parent_uprn: (!parent.is_null(i)).then(|| parent.value(i)),
                root_uprn: (!root.is_null(i)).then(|| root.value(i)),
                hierarchy_level: (!level.is_null(i)).then(|| level.value(i)),
                floor_level: text(floor, i),
                lowest_floor_level: (!lowest.is_null(i)).then(|| lowest.value(i)),
                highest_floor_level: (!highest.is_null(i)).then(|| highest.value(i)),
                language: None,
            });
        }
    }
    Ok(rows)
}

/// Variant statistics over `rows`; `None` when there are no rows.
pub fn variant_statistics(rows: &[CanonicalAddressRow]) -> Option<VariantStatistics> {
    let mut per_uprn: BTreeMap<Uprn, usize> = BTreeMap::new();
    for row in rows {
        *per_uprn.entry(row.uprn).or_default() += 1;
    }
    let mut counts: Vec<usize> = per_uprn.into_values().collect();
    counts.sort_unstable();
    let total_uprns = counts.len();
    let min_variants = *counts.first()?;
    let max_variants = *counts.last()?;
    let middle = total_uprns / 2;
    let median_variants = if total_uprns % 2 == 0 {
        (counts[middle - 1] + counts[middle]) as f64 / 2.0
    } else {
        counts[middle] as f64
    };
    Some(VariantStatistics {
        total_uprns,
        total_variants: rows.len(),
        mean_variants: rows.len() as f64 / total_uprns as f64,
        median_variants,
        min_variants,
        max_variants,
    })
}

/// Read every artifact of `product` under `dir` and summarize them.
pub fn inspect_output(
    dir: &Path,
    product: &str,
    sample_size: usize,
) -> Result<OutputInspection, FlatfileError> {
    let files = artifact_files(dir, product)?;
    if files.is_empty() {
        return Err(unreadable(
            dir,
            format!("no {product} artifacts found"),
        ));
    }

    let mut all_rows = Vec::new();
    let mut artifacts = Vec::with_capacity(files.len());
    for path in files {
        let rows = read_artifact(&path)?;
        let mut uprns: Vec<Uprn> = rows.iter().map(|row| row.uprn).collect();
        uprns.sort_unstable();
        uprns.dedup();
        artifacts.push(ArtifactSummary {
            path,
            rows: rows.len(),
            distinct_uprns: uprns.len(),
        });
        all_rows.extend(rows);
    }

    let mut rows_by_source: BTreeMap<SourceName, usize> = BTreeMap::new();
    for row in &all_rows {
        *rows_by_source.entry(row.source_filename.clone()).or_default() += 1;
    }
    Ok(OutputInspection {
        artifacts,
        total_rows: all_rows.len(),
        rows_by_source,
        with_classification: all_rows
            .iter()
            .filter(|row| row.classification_code.is_some())
            .count(),
        with_hierarchy: all_rows.iter().filter(|row| row.root_uprn.is_some()).count(),
        variants: variant_statistics(&all_rows),
        sample: all_rows.iter().take(sample_size).cloned().collect(),
    })
}

/// All rows for one uprn across the product's artifacts.
pub fn rows_for_uprn(
    dir: &Path,
    product: &str,
    uprn: Uprn,
) -> Result<Vec<CanonicalAddressRow>, FlatfileError> {
    let mut matches = Vec::new();
    for path in artifact_files(dir, product)? {
        matches.extend(read_artifact(&path)?.into_iter().filter(|row| row.uprn == uprn));
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlatfileConfig;
    use crate::writer::ChunkWriter;
    use tempfile::tempdir;

    fn row(uprn: Uprn, text: &str, root: Option<Uprn>) -> CanonicalAddressRow {
        CanonicalAddressRow {
            uprn,
            address_concat: text.to_string(),
            postcode: None,
            source_filename: "add_gb_royalmailaddress.parquet".to_string(),
            classification_code: None,
            parent_uprn: None,
            root_uprn: root,
            hierarchy_level: root.map(|_| 1),
            floor_level: Some("G".to_string()),
            lowest_floor_level: None,
            highest_floor_level: None,
            language: None,
        }
    }

    #[test]
    fn variant_statistics_count_rows_per_uprn() {
        let stats = variant_statistics(&[
            row(1, "A", None),
            row(1, "B", None),
            row(2, "C", None),
            row(3, "D", None),
        ])
        .unwrap();
        assert_eq!(stats.total_uprns, 3);
        assert_eq!(stats.total_variants, 4);
        assert_eq!(stats.min_variants, 1);
        assert_eq!(stats.max_variants, 2);
        assert!((stats.median_variants - 1.0).abs() < 1e-9);
        assert!(variant_statistics(&[]).is_none());
    }

    #[test]
    fn written_rows_read_back_unchanged() {
        let temp = tempdir().unwrap();
        let config = FlatfileConfig::new(temp.path(), temp.path().join("out"));
        let writer = ChunkWriter::new(&config.with_num_chunks(1));
        writer.prepare().unwrap();
        let rows = vec![row(7, "7 MILL LANE", Some(7)), row(8, "8 MILL LANE", None)];
        writer.write_chunk(0, &rows).unwrap();

        let inspection = inspect_output(writer.output_dir(), "ngd", 1).unwrap();
        assert_eq!(inspection.total_rows, 2);
        assert_eq!(inspection.with_hierarchy, 1);
        assert_eq!(inspection.with_classification, 0);
        assert_eq!(inspection.artifacts[0].distinct_uprns, 2);
        assert_eq!(inspection.sample, vec![rows[0].clone()]);
        assert_eq!(
            rows_for_uprn(writer.output_dir(), "ngd", 8).unwrap(),
            vec![rows[1].clone()]
        );
    }

    #[test]
    fn inspecting_empty_directory_fails() {
        let temp = tempdir().unwrap();
        let err = inspect_output(temp.path(), "ngd", 5).unwrap_err();
        assert!(matches!(err, FlatfileError::OutputUnreadable { .. }));
    }
}
