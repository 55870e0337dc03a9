use serde::{Deserialize, Serialize};

use crate::constants::language::{PRIMARY_CODE, SECONDARY_CODE};

pub use crate::types::{AddressText, ClassificationCode, SourceName, Uprn};

/// Feature type of the collection a record was read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureType {
    Built,
    PreBuild,
    Historic,
    RoyalMail,
    NonAddressable,
}

impl FeatureType {
    /// True for collections whose parent pointers and classification are authoritative.
    pub fn is_core(self) -> bool {
        matches!(self, Self::Built | Self::PreBuild | Self::Historic)
    }

    /// Human-readable label as used by the OS product documentation.
    pub fn label(self) -> &'static str {
        match self {
            Self::Built => "Built Address",
            Self::PreBuild => "Pre-Build Address",
            Self::Historic => "Historic Address",
            Self::RoyalMail => "Royal Mail Address",
            Self::NonAddressable => "Non-Addressable Object",
        }
    }
}

/// Feature tag of a normalized row.
///
/// Alternate-address records keep the feature type of their parent collection
/// and set `alternate`; they are never treated as core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureTag {
    pub feature: FeatureType,
    pub alternate: bool,
}

impl FeatureTag {
    pub fn primary(feature: FeatureType) -> Self {
        Self {
            feature,
            alternate: false,
        }
    }

    pub fn alternate(feature: FeatureType) -> Self {
        Self {
            feature,
            alternate: true,
        }
    }

    /// Core rows feed the hierarchy and the classification lookup.
    pub fn is_core(self) -> bool {
        !self.alternate && self.feature.is_core()
    }
}

/// Language of a normalized row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    /// English (primary) address text.
    Primary,
    /// Welsh (secondary) address text.
    Secondary,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Self::Primary => PRIMARY_CODE,
            Self::Secondary => SECONDARY_CODE,
        }
    }
}

/// Floor-level attributes shared by core and alternate records.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FloorLevels {
    pub floor_level: Option<String>,
    pub lowest_floor_level: Option<f64>,
    pub highest_floor_level: Option<f64>,
}

impl FloorLevels {
    /// Fill each absent field from `fallback`.
    pub fn or(self, fallback: &FloorLevels) -> FloorLevels {
        FloorLevels {
            floor_level: self.floor_level.or_else(|| fallback.floor_level.clone()),
            lowest_floor_level: self.lowest_floor_level.or(fallback.lowest_floor_level),
            highest_floor_level: self.highest_floor_level.or(fallback.highest_floor_level),
        }
    }
}

/// One record from a single source collection, mapped into the common shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawFeatureRow {
    pub uprn: Uprn,
    pub address_concat: AddressText,
    pub postcode: Option<String>,
    /// File name of the source table (provenance and tie-break key).
    pub source_filename: SourceName,
    pub feature: FeatureTag,
    pub address_status: Option<String>,
    pub build_status: Option<String>,
    pub language: Language,
    pub classification_code: Option<ClassificationCode>,
    pub parent_uprn: Option<Uprn>,
    pub floors: FloorLevels,
    /// Position of the record within its source table (ingestion order).
    pub ordinal: u64,
    /// Set for Non-Addressable records; they never reach deduplication.
    pub excluded: bool,
}

/// Priority of a row along the feature, address-status, and build-status axes.
///
/// Lower is preferred on every axis; tuples compare lexicographically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RankTuple {
    pub feature_rank: u8,
    pub status_rank: u8,
    pub build_rank: u8,
}

/// A normalized row with its computed rank.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedRow {
    pub row: RawFeatureRow,
    pub rank: RankTuple,
}

impl RankedRow {
    /// Full ordering key: rank, then source name, then ingestion order.
    pub fn preference_key(&self) -> (RankTuple, &str, u64) {
        (self.rank, self.row.source_filename.as_str(), self.row.ordinal)
    }
}

/// Final output unit written to chunk artifacts.
///
/// `language` is part of the identity key but is not written as a column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalAddressRow {
    pub uprn: Uprn,
    pub address_concat: AddressText,
    pub postcode: Option<String>,
    pub source_filename: SourceName,
    pub classification_code: Option<ClassificationCode>,
    pub parent_uprn: Option<Uprn>,
    pub root_uprn: Option<Uprn>,
    pub hierarchy_level: Option<u32>,
    pub floor_level: Option<String>,
    pub lowest_floor_level: Option<f64>,
    pub highest_floor_level: Option<f64>,
    #[serde(skip)]
    pub language: Option<Language>,
}
