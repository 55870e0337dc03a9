//! Deduplicator: one winner per `(uprn, address_concat, language)`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::data::{Language, RankedRow};
use crate::types::Uprn;

/// Counters describing one deduplication pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupStats {
    /// Ranked rows offered to the pass.
    pub candidates: usize,
    /// Distinct identity groups (and therefore survivors).
    pub groups: usize,
    /// Rows discarded because a better row shared their identity.
    pub dropped: usize,
}

type IdentityKey = (Uprn, Language, String);

/// True when `candidate` beats `incumbent` on `(rank, source_filename, ordinal)`.
pub fn prefers(candidate: &RankedRow, incumbent: &RankedRow) -> bool {
    candidate.preference_key() < incumbent.preference_key()
}

/// Keep the preferred row of every identity group.
///
/// Empty address text is an identity like any other. Survivors come back
/// sorted by `(uprn, language, address_concat)`, independent of input order.
pub fn deduplicate<I>(rows: I) -> (Vec<RankedRow>, DedupStats)
where
    I: IntoIterator<Item = RankedRow>,
{
    let mut stats = DedupStats::default();
    let mut winners: HashMap<IdentityKey, RankedRow> = HashMap::new();
    for candidate in rows {
        stats.candidates += 1;
        let key = (
            candidate.row.uprn,
            candidate.row.language,
            candidate.row.address_concat.clone(),
        );
        match winners.get_mut(&key) {
            Some(incumbent) => {
                stats.dropped += 1;
                if prefers(&candidate, incumbent) {
                    *incumbent = candidate;
                }
            }
            None => {
                winners.insert(key, candidate);
            }
        }
    }

    let mut survivors: Vec<(IdentityKey, RankedRow)> = winners.into_iter().collect();
    survivors.sort_by(|a, b| a.0.cmp(&b.0));
    stats.groups = survivors.len();
    (survivors.into_iter().map(|(_, row)| row).collect(), stats)
}

/// Winning primary-language core row per uprn.
///
/// Same preference as `deduplicate`, keyed by uprn alone; the winner supplies
/// the parent pointer and the attributes copied onto non-core rows.
#[derive(Clone, Debug, Default)]
pub struct CoreWinners {
    winners: BTreeMap<Uprn, RankedRow>,
}

impl CoreWinners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a row; non-core and secondary-language rows are ignored.
    pub fn offer(&mut self, candidate: RankedRow) {
        if !candidate.row.feature.is_core() || candidate.row.language != Language::Primary {
            return;
        }
        match self.winners.get_mut(&candidate.row.uprn) {
            Some(incumbent) => {
                if prefers(&candidate, incumbent) {
                    *incumbent = candidate;
                }
            }
            None => {
                self.winners.insert(candidate.row.uprn, candidate);
            }
        }
    }

    /// Fold another accumulator in; the result does not depend on merge order.
    pub fn merge(&mut self, other: CoreWinners) {
        for (_, candidate) in other.winners {
            self.offer(candidate);
        }
    }

    pub fn get(&self, uprn: Uprn) -> Option<&RankedRow> {
        self.winners.get(&uprn)
    }

    pub fn len(&self) -> usize {
        self.winners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }

    /// Declared parent pointer of each winner, in uprn order.
    pub fn parent_pointers(&self) -> BTreeMap<Uprn, Option<Uprn>> {
        self.winners
            .iter()
            .map(|(&uprn, winner)| (uprn, winner.row.parent_uprn))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedRow> {
        self.winners.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FeatureTag, FeatureType, FloorLevels, RawFeatureRow};
    use crate::rank::rank_row;

    fn ranked(
        uprn: Uprn,
        text: &str,
        feature: FeatureTag,
        source: &str,
        ordinal: u64,
    ) -> RankedRow {
        rank_row(RawFeatureRow {
            uprn,
            address_concat: text.to_string(),
            postcode: Some("LS1 4AP".to_string()),
            source_filename: source.to_string(),
            feature,
            address_status: Some("Approved".to_string()),
            build_status: Some("Built Complete".to_string()),
            language: Language::Primary,
            classification_code: None,
            parent_uprn: None,
            floors: FloorLevels::default(),
            ordinal,
            excluded: false,
        })
        .unwrap()
    }

    #[test]
    fn built_row_beats_royal_mail_for_same_identity() {
        let royal = ranked(
            6001491,
            "10 HIGH STREET, LEEDS",
            FeatureTag::primary(FeatureType::RoyalMail),
            "add_gb_royalmailaddress.parquet",
            0,
        );
        let built = ranked(
            6001491,
            "10 HIGH STREET, LEEDS",
            FeatureTag::primary(FeatureType::Built),
            "add_gb_builtaddress.parquet",
            4,
        );
        let (survivors, stats) = deduplicate(vec![royal, built]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].row.feature.feature, FeatureType::Built);
        assert_eq!(
            stats,
            DedupStats {
                candidates: 2,
                groups: 1,
                dropped: 1,
            }
        );
    }

    #[test]
    fn identical_ranks_tie_break_on_source_then_ordinal() {
        let tag = FeatureTag::primary(FeatureType::Built);
        let rows = vec![
            ranked(1, "A", tag, "b.parquet", 0),
            ranked(1, "A", tag, "a.parquet", 9),
            ranked(1, "A", tag, "a.parquet", 3),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        let (forward, _) = deduplicate(rows);
        let (backward, _) = deduplicate(reversed);
        assert_eq!(forward, backward);
        assert_eq!(forward[0].row.source_filename, "a.parquet");
        assert_eq!(forward[0].row.ordinal, 3);
    }

    #[test]
    fn languages_and_texts_form_separate_groups() {
        let tag = FeatureTag::primary(FeatureType::Built);
        let english = ranked(5, "1 CHURCH STREET", tag, "a.parquet", 0);
        let mut welsh = ranked(5, "1 STRYD YR EGLWYS", tag, "a.parquet", 0);
        welsh.row.language = Language::Secondary;
        let other = ranked(2, "9 MILL LANE", tag, "a.parquet", 1);

        let (survivors, stats) = deduplicate(vec![welsh, english, other]);
        let keys: Vec<(Uprn, Language)> = survivors
            .iter()
            .map(|ranked| (ranked.row.uprn, ranked.row.language))
            .collect();
        assert_eq!(
            keys,
            vec![
                (2, Language::Primary),
                (5, Language::Primary),
                (5, Language::Secondary),
            ]
        );
        assert_eq!(stats.dropped, 0);
    }

    #[test]
    fn core_winners_ignore_non_core_rows_and_prefer_best_rank() {
        let mut winners = CoreWinners::new();
        let mut historic = ranked(
            8,
            "OLD COTTAGE",
            FeatureTag::primary(FeatureType::Historic),
            "add_gb_historicaddress.parquet",
            0,
        );
        historic.row.parent_uprn = Some(1);
        let mut built = ranked(
            8,
            "8 NEW ROAD",
            FeatureTag::primary(FeatureType::Built),
            "add_gb_builtaddress.parquet",
            0,
        );
        built.row.parent_uprn = Some(2);
        winners.offer(historic);
        winners.offer(ranked(
            8,
            "8 NEW ROAD",
            FeatureTag::alternate(FeatureType::Built),
            "add_gb_builtaddress_altadd.parquet",
            0,
        ));
        winners.offer(ranked(
            9,
            "9 NEW ROAD",
            FeatureTag::primary(FeatureType::RoyalMail),
            "add_gb_royalmailaddress.parquet",
            0,
        ));

        let mut late = CoreWinners::new();
        late.offer(built);
        winners.merge(late);

        assert_eq!(winners.len(), 1);
        assert_eq!(winners.get(8).unwrap().row.feature.feature, FeatureType::Built);
        assert_eq!(winners.parent_pointers().get(&8), Some(&Some(2)));
    }

    #[test]
    fn empty_address_text_is_still_an_identity() {
        let built = FeatureTag::primary(FeatureType::Built);
        let royal = FeatureTag::primary(FeatureType::RoyalMail);
        let (survivors, stats) = deduplicate(vec![
            ranked(1, "", royal, "r.parquet", 0),
            ranked(1, "", built, "b.parquet", 0),
            ranked(2, "2 ROAD", built, "b.parquet", 1),
        ]);
        assert_eq!(survivors.len(), 2);
        assert_eq!(survivors[0].row.uprn, 1);
        assert_eq!(survivors[0].row.address_concat, "");
        assert_eq!(survivors[0].row.source_filename, "b.parquet");
        assert_eq!(
            stats,
            DedupStats {
                candidates: 3,
                groups: 2,
                dropped: 1,
            }
        );
    }
}
