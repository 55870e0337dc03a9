//! Map each source schema into `RawFeatureRow`.
//!
//! Dispatch is a plain match from `SourceKind` to a column-mapping function;
//! every mapper sees one decoded row and returns the primary row plus an
//! optional secondary-language row.

use tracing::debug;

use crate::constants::columns::{
    ADDRESS_STATUS, ALTERNATE_LANGUAGE, ALTERNATE_LANGUAGE_COMPONENTS,
    ALTERNATE_LANGUAGE_FULL_ADDRESS, BUILD_STATUS, CLASSIFICATION_CODE, FLOOR_LEVEL, FULL_ADDRESS,
    HIGHEST_FLOOR_LEVEL, LOWEST_FLOOR_LEVEL, MATCHED_FEATURE_TYPE, PARENT_UPRN, POSTCODE,
    ROYAL_MAIL_LOCALITY, ROYAL_MAIL_PREMISES, ROYAL_MAIL_WELSH_LOCALITY, UPRN,
};
use crate::constants::language::WELSH_MARKERS;
use crate::constants::sources::NON_ADDRESSABLE_LABEL;
use crate::data::{FeatureType, FloorLevels, Language, RawFeatureRow};
use crate::errors::FlatfileError;
use crate::transport::{RowFields, TableRows};
use crate::types::{SourceName, Uprn};

use super::{SourceKind, SourceSpec};

/// Rows produced from one source record.
#[derive(Clone, Debug, PartialEq)]
pub struct MappedRecord {
    pub primary: RawFeatureRow,
    pub secondary: Option<RawFeatureRow>,
}

/// Per-record context handed to a mapper.
struct RowContext<'a> {
    source_filename: &'a str,
    spec: SourceSpec,
    ordinal: u64,
    uprn: Uprn,
}

type RowMapper = fn(&RowContext<'_>, &RowFields) -> MappedRecord;

fn mapper_for(kind: SourceKind) -> RowMapper {
    match kind {
        SourceKind::Core => map_core,
        SourceKind::Alternate => map_alternate,
        SourceKind::RoyalMail => map_royal_mail,
    }
}

/// Map one decoded row; `None` when the row carries no usable uprn.
pub fn normalize_fields(
    source_filename: &str,
    spec: SourceSpec,
    ordinal: u64,
    fields: &RowFields,
) -> Option<MappedRecord> {
    let uprn = fields.uprn(UPRN)?;
    let ctx = RowContext {
        source_filename,
        spec,
        ordinal,
        uprn,
    };
    Some(mapper_for(spec.kind)(&ctx, fields))
}

/// Lazy sequence of normalized rows from one table.
///
/// Secondary-language rows are yielded directly after their primary row.
pub struct NormalizedRows {
    source_filename: SourceName,
    spec: SourceSpec,
    rows: TableRows,
    pending: Option<RawFeatureRow>,
    skipped: u64,
}

impl NormalizedRows {
    pub fn new(source_filename: SourceName, spec: SourceSpec, rows: TableRows) -> Self {
        Self {
            source_filename,
            spec,
            rows,
            pending: None,
            skipped: 0,
        }
    }

    /// Records dropped so far because they had no usable uprn.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl Iterator for NormalizedRows {
    type Item = Result<RawFeatureRow, FlatfileError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(row) = self.pending.take() {
            return Some(Ok(row));
        }
        loop {
            let (ordinal, fields) = match self.rows.next()? {
                Ok(decoded) => decoded,
                Err(err) => return Some(Err(err)),
            };
            match normalize_fields(&self.source_filename, self.spec, ordinal, &fields) {
                Some(mapped) => {
                    self.pending = mapped.secondary;
                    return Some(Ok(mapped.primary));
                }
                None => {
                    self.skipped += 1;
                    debug!(
                        "[ngd:normalize] {} row {} has no usable uprn; skipped",
                        self.source_filename, ordinal
                    );
                }
            }
        }
    }
}

fn base_row(ctx: &RowContext<'_>, address_concat: String, postcode: Option<String>) -> RawFeatureRow {
    RawFeatureRow {
        uprn: ctx.uprn,
        address_concat,
        postcode,
        source_filename: ctx.source_filename.to_string(),
        feature: ctx.spec.tag(),
        address_status: None,
        build_status: None,
        language: Language::Primary,
        classification_code: None,
        parent_uprn: None,
        floors: FloorLevels::default(),
        ordinal: ctx.ordinal,
        excluded: ctx.spec.feature == FeatureType::NonAddressable,
    }
}

fn floors(fields: &RowFields) -> FloorLevels {
    FloorLevels {
        floor_level: fields.text(FLOOR_LEVEL),
        lowest_floor_level: fields.float(LOWEST_FLOOR_LEVEL),
        highest_floor_level: fields.float(HIGHEST_FLOOR_LEVEL),
    }
}

/// A secondary row only exists when its text adds something.
fn secondary_from(primary: &RawFeatureRow, address_concat: String) -> Option<RawFeatureRow> {
    if address_concat.is_empty() || address_concat == primary.address_concat {
        return None;
    }
    Some(RawFeatureRow {
        address_concat,
        language: Language::Secondary,
        ..primary.clone()
    })
}

fn map_core(ctx: &RowContext<'_>, fields: &RowFields) -> MappedRecord {
    let postcode = fields.text(POSTCODE);
    let address = strip_postcode(fields.text(FULL_ADDRESS), postcode.as_deref());
    let primary = RawFeatureRow {
        address_status: fields.text(ADDRESS_STATUS),
        build_status: fields.text(BUILD_STATUS),
        classification_code: fields.text(CLASSIFICATION_CODE),
        parent_uprn: fields.uprn(PARENT_UPRN),
        floors: floors(fields),
        ..base_row(ctx, address, postcode.clone())
    };

    let is_welsh = fields
        .text(ALTERNATE_LANGUAGE)
        .map(|code| {
            WELSH_MARKERS
                .iter()
                .any(|marker| code.eq_ignore_ascii_case(marker))
        })
        .unwrap_or(false);
    let secondary = if is_welsh {
        let text = match fields.text(ALTERNATE_LANGUAGE_FULL_ADDRESS) {
            Some(full) => strip_postcode(Some(full), postcode.as_deref()),
            None => join_components(
                ALTERNATE_LANGUAGE_COMPONENTS
                    .iter()
                    .map(|column| fields.text(column)),
            ),
        };
        secondary_from(&primary, text)
    } else {
        None
    };
    MappedRecord { primary, secondary }
}

fn map_alternate(ctx: &RowContext<'_>, fields: &RowFields) -> MappedRecord {
    let postcode = fields.text(POSTCODE);
    let address = strip_postcode(fields.text(FULL_ADDRESS), postcode.as_deref());
    let primary = RawFeatureRow {
        address_status: fields.text(ADDRESS_STATUS),
        floors: floors(fields),
        ..base_row(ctx, address, postcode)
    };
    MappedRecord {
        primary,
        secondary: None,
    }
}

fn map_royal_mail(ctx: &RowContext<'_>, fields: &RowFields) -> MappedRecord {
    let premises: Vec<Option<String>> = ROYAL_MAIL_PREMISES
        .iter()
        .map(|column| fields.text(column))
        .collect();
    let english = join_components(
        premises
            .iter()
            .cloned()
            .chain(ROYAL_MAIL_LOCALITY.iter().map(|column| fields.text(column))),
    );
    let matched_non_addressable = fields
        .text(MATCHED_FEATURE_TYPE)
        .map(|label| label.eq_ignore_ascii_case(NON_ADDRESSABLE_LABEL))
        .unwrap_or(false);
    let mut primary = base_row(ctx, english, fields.text(POSTCODE));
    primary.excluded |= matched_non_addressable;

    let welsh: Vec<Option<String>> = ROYAL_MAIL_WELSH_LOCALITY
        .iter()
        .map(|column| fields.text(column))
        .collect();
    let secondary = if welsh.iter().any(Option::is_some) {
        let text = join_components(premises.into_iter().chain(welsh));
        secondary_from(&primary, text)
    } else {
        None
    };
    MappedRecord { primary, secondary }
}

/// Drop a trailing `", <postcode>"` from a full address line.
pub fn strip_postcode(full: Option<String>, postcode: Option<&str>) -> String {
    let Some(full) = full else {
        return String::new();
    };
    if let Some(postcode) = postcode
        && let Some(head) = full.strip_suffix(postcode)
        && head.ends_with(", ")
    {
        return head.trim_end_matches([',', ' ']).to_string();
    }
    full
}

/// Join present components with `", "`, trimming stray separators.
pub fn join_components<I>(parts: I) -> String
where
    I: IntoIterator<Item = Option<String>>,
{
    parts
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
        .trim_matches([',', ' '])
        .to_string()
}
