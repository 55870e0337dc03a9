//! Source collections and their discovery.
//!
//! Ownership model:
//! - `SourceSpec` says what a collection *is* (kind + feature type), derived
//!   purely from its file stem.
//! - `SourceTable` ties a spec to a file on disk.
//! - `SourceCatalog` owns the discovered tables in deterministic name order.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::columns::{
    ADDRESS_STATUS, BUILD_STATUS, CLASSIFICATION_CODE, FULL_ADDRESS, PARENT_UPRN, POST_TOWN,
    POSTCODE, UPRN,
};
use crate::constants::sources::{
    ALTERNATE_SUFFIX, BUILT_ADDRESS, HISTORIC_ADDRESS, NON_ADDRESSABLE_OBJECT, PREBUILD_ADDRESS,
    ROYAL_MAIL_ADDRESS,
};
use crate::data::{FeatureTag, FeatureType};
use crate::errors::FlatfileError;
use crate::transport::{ParquetTable, TableScan};
use crate::transport::fs::lower_stem;
use crate::types::{SourceName, SourceStem};

/// Record normalization for each source kind.
pub mod normalize;

pub use normalize::{NormalizedRows, normalize_fields};

/// Schema family of a source collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Full address records with classification, hierarchy, and language columns.
    Core,
    /// `*_altadd` companions: address text and status only.
    Alternate,
    /// Postal delivery records built from address components.
    RoyalMail,
}

impl SourceKind {
    /// Columns whose absence makes the table unusable.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::Core => &[
                UPRN,
                FULL_ADDRESS,
                POSTCODE,
                CLASSIFICATION_CODE,
                PARENT_UPRN,
                ADDRESS_STATUS,
                BUILD_STATUS,
            ],
            Self::Alternate => &[UPRN, FULL_ADDRESS, POSTCODE, ADDRESS_STATUS],
            Self::RoyalMail => &[UPRN, POSTCODE, POST_TOWN],
        }
    }
}

/// What a collection is, independent of where it lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpec {
    pub kind: SourceKind,
    pub feature: FeatureType,
}

impl SourceSpec {
    /// Resolve a lowercased file stem; `None` for collections outside the flatfile.
    pub fn for_stem(stem: &str) -> Option<Self> {
        if stem == ROYAL_MAIL_ADDRESS {
            return Some(Self {
                kind: SourceKind::RoyalMail,
                feature: FeatureType::RoyalMail,
            });
        }
        let (base, kind) = match stem.strip_suffix(ALTERNATE_SUFFIX) {
            Some(base) => (base, SourceKind::Alternate),
            None => (stem, SourceKind::Core),
        };
        let feature = match base {
            BUILT_ADDRESS => FeatureType::Built,
            PREBUILD_ADDRESS => FeatureType::PreBuild,
            HISTORIC_ADDRESS => FeatureType::Historic,
            NON_ADDRESSABLE_OBJECT => FeatureType::NonAddressable,
            _ => return None,
        };
        Some(Self { kind, feature })
    }

    /// Feature tag stamped on rows read from this collection.
    pub fn tag(self) -> FeatureTag {
        match self.kind {
            SourceKind::Alternate => FeatureTag::alternate(self.feature),
            SourceKind::Core | SourceKind::RoyalMail => FeatureTag::primary(self.feature),
        }
    }

    /// True when rows from this collection feed the hierarchy.
    pub fn is_core(self) -> bool {
        self.tag().is_core()
    }
}

/// A recognised source collection on disk.
#[derive(Clone, Debug)]
pub struct SourceTable {
    /// File name, used as provenance and as the dedup tie-break key.
    pub name: SourceName,
    pub stem: SourceStem,
    pub path: PathBuf,
    pub spec: SourceSpec,
}

impl SourceTable {
    /// Open the table and verify its required columns.
    pub fn open_checked(&self) -> Result<ParquetTable, FlatfileError> {
        let table = ParquetTable::open(self.name.clone(), &self.path)?;
        if let Some(column) = table.first_missing(self.spec.kind.required_columns()) {
            return Err(FlatfileError::SchemaMismatch {
                feature_type: self.stem.clone(),
                column: column.to_string(),
            });
        }
        Ok(table)
    }

    /// Open, check, and stream this table as normalized rows.
    pub fn normalized_rows(&self) -> Result<NormalizedRows, FlatfileError> {
        let table = self.open_checked()?;
        Ok(NormalizedRows::new(self.name.clone(), self.spec, table.into_rows()))
    }
}

/// Result of checking one table's schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCheck {
    pub name: SourceName,
    /// Row count recorded in the table footer.
    pub rows: u64,
}

/// Recognised source tables, ordered by file name.
#[derive(Clone, Debug, Default)]
pub struct SourceCatalog {
    tables: IndexMap<SourceStem, SourceTable>,
}

impl SourceCatalog {
    /// Scan `dir` recursively for recognised `<stem>.parquet` tables.
    pub fn discover(dir: &Path) -> Result<Self, FlatfileError> {
        let mut found: Vec<SourceTable> = Vec::new();
        for path in TableScan::new(dir).parquet_files() {
            let Some(stem) = lower_stem(&path) else {
                continue;
            };
            let Some(spec) = SourceSpec::for_stem(&stem) else {
                debug!(
                    "[ngd:catalog] skipping {} (not a recognised address table)",
                    path.display()
                );
                continue;
            };
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("{stem}.parquet"));
            found.push(SourceTable {
                name,
                stem,
                path,
                spec,
            });
        }
        found.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));

        let mut tables: IndexMap<SourceStem, SourceTable> = IndexMap::new();
        for table in found {
            if let Some(existing) = tables.get(&table.stem) {
                warn!(
                    "[ngd:catalog] duplicate table for '{}': keeping {}, ignoring {}",
                    table.stem,
                    existing.path.display(),
                    table.path.display()
                );
                continue;
            }
            tables.insert(table.stem.clone(), table);
        }
        if tables.is_empty() {
            return Err(FlatfileError::NoSourceTables {
                dir: dir.to_path_buf(),
            });
        }
        Ok(Self { tables })
    }

    pub fn tables(&self) -> impl Iterator<Item = &SourceTable> {
        self.tables.values()
    }

    /// Tables whose rows are authoritative for the hierarchy.
    pub fn core_tables(&self) -> impl Iterator<Item = &SourceTable> {
        self.tables.values().filter(|table| table.spec.is_core())
    }

    pub fn get(&self, stem: &str) -> Option<&SourceTable> {
        self.tables.get(stem)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Open every table once and verify required columns before any work starts.
    pub fn verify_schemas(&self) -> Result<Vec<TableCheck>, FlatfileError> {
        self.tables()
            .map(|table| {
                let opened = table.open_checked()?;
                debug!(
                    "[ngd:catalog] {} ok: {} column(s), {} row(s)",
                    table.name,
                    opened.columns().len(),
                    opened.row_count()
                );
                Ok(TableCheck {
                    name: table.name.clone(),
                    rows: opened.row_count(),
                })
            })
            .collect()
    }
}
