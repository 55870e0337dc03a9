//! Priority resolver: rank tuples for normalized rows.

use crate::constants::ranks::{
    ADDRESS_STATUS_ORDER, BUILD_STATUS_ORDER, WORST_BUILD_RANK, WORST_STATUS_RANK,
};
use crate::data::{FeatureType, RankTuple, RankedRow, RawFeatureRow};

/// Preference of a feature type; `None` for types that are never ranked.
pub fn feature_rank(feature: FeatureType) -> Option<u8> {
    match feature {
        FeatureType::Built => Some(1),
        FeatureType::PreBuild => Some(2),
        FeatureType::RoyalMail => Some(3),
        FeatureType::Historic => Some(4),
        FeatureType::NonAddressable => None,
    }
}

fn position_rank(tag: Option<&str>, order: &[&str], worst: u8) -> u8 {
    let Some(tag) = tag.map(str::trim).filter(|tag| !tag.is_empty()) else {
        return worst;
    };
    order
        .iter()
        .position(|known| known.eq_ignore_ascii_case(tag))
        .map(|index| index as u8 + 1)
        .unwrap_or(worst)
}

/// Address status rank; absent or unknown tags rank worst.
pub fn status_rank(status: Option<&str>) -> u8 {
    position_rank(status, &ADDRESS_STATUS_ORDER, WORST_STATUS_RANK)
}

/// Build status rank; absent or unknown tags rank worst.
pub fn build_rank(build: Option<&str>) -> u8 {
    position_rank(build, &BUILD_STATUS_ORDER, WORST_BUILD_RANK)
}

/// Rank a row, or `None` when it is excluded from deduplication.
pub fn rank_row(row: RawFeatureRow) -> Option<RankedRow> {
    if row.excluded {
        return None;
    }
    let rank = RankTuple {
        feature_rank: feature_rank(row.feature.feature)?,
        status_rank: status_rank(row.address_status.as_deref()),
        build_rank: build_rank(row.build_status.as_deref()),
    };
    Some(RankedRow { row, rank })
}
