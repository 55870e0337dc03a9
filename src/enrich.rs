//! Metadata enricher: copy core attributes and hierarchy onto output rows.

use std::collections::HashMap;

use crate::data::{CanonicalAddressRow, ClassificationCode, FloorLevels, RankedRow};
use crate::dedup::CoreWinners;
use crate::hierarchy::HierarchyForest;
use crate::types::Uprn;

/// Attributes of the winning core row for one uprn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoreAttributes {
    pub classification_code: Option<ClassificationCode>,
    pub floors: FloorLevels,
}

/// uprn -> core attributes.
#[derive(Clone, Debug, Default)]
pub struct CoreAttributeIndex {
    attributes: HashMap<Uprn, CoreAttributes>,
}

impl CoreAttributeIndex {
    pub fn from_winners(winners: &CoreWinners) -> Self {
        let attributes = winners
            .iter()
            .map(|winner| {
                (
                    winner.row.uprn,
                    CoreAttributes {
                        classification_code: winner.row.classification_code.clone(),
                        floors: winner.row.floors.clone(),
                    },
                )
            })
            .collect();
        Self { attributes }
    }

    pub fn get(&self, uprn: Uprn) -> Option<&CoreAttributes> {
        self.attributes.get(&uprn)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Build the output row for one dedup survivor.
///
/// Core rows keep their own classification and floors; other rows fill
/// missing values from the core winner of their uprn. Hierarchy fields always
/// come from the forest and stay null for uprns without a core record.
pub fn enrich_row(
    ranked: RankedRow,
    core: &CoreAttributeIndex,
    forest: &HierarchyForest,
) -> CanonicalAddressRow {
    let row = ranked.row;
    let (classification_code, floors) = match core.get(row.uprn) {
        Some(attributes) if !row.feature.is_core() => (
            row.classification_code
                .or_else(|| attributes.classification_code.clone()),
            row.floors.or(&attributes.floors),
        ),
        _ => (row.classification_code, row.floors),
    };
    let node = forest.get(row.uprn);
    CanonicalAddressRow {
        uprn: row.uprn,
        address_concat: row.address_concat,
        postcode: row.postcode,
        source_filename: row.source_filename,
        classification_code,
        // Recorded pointer; roots from dangling or cyclic pointers keep it.
        parent_uprn: node.and_then(|node| node.declared_parent),
        root_uprn: node.map(|node| node.root),
        hierarchy_level: node.map(|node| node.level),
        floor_level: floors.floor_level,
        lowest_floor_level: floors.lowest_floor_level,
        highest_floor_level: floors.highest_floor_level,
        language: Some(row.language),
    }
}

/// Enrich survivors, preserving their order.
pub fn enrich<I>(
    survivors: I,
    core: &CoreAttributeIndex,
    forest: &HierarchyForest,
) -> Vec<CanonicalAddressRow>
where
    I: IntoIterator<Item = RankedRow>,
{
    survivors
        .into_iter()
        .map(|ranked| enrich_row(ranked, core, forest))
        .collect()
}
