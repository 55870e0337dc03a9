#![allow(dead_code)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use ngd_flatfile::CanonicalAddressRow;
use ngd_flatfile::inspect::{artifact_files, read_artifact};

pub const BUILT: &str = "add_gb_builtaddress.parquet";
pub const BUILT_ALT: &str = "add_gb_builtaddress_altadd.parquet";
pub const HISTORIC: &str = "add_gb_historicaddress.parquet";
pub const PREBUILD: &str = "add_gb_prebuildaddress.parquet";
pub const NON_ADDRESSABLE: &str = "add_gb_nonaddressableobject.parquet";
pub const ROYAL_MAIL: &str = "add_gb_royalmailaddress.parquet";

/// One record of a core-shaped table (built, pre-build, historic, non-addressable).
#[derive(Clone, Debug)]
pub struct CoreRecord {
    pub uprn: i64,
    pub fulladdress: String,
    pub postcode: String,
    pub classification: Option<String>,
    pub parent: Option<i64>,
    pub status: Option<String>,
    pub build: Option<String>,
    pub floor: Option<String>,
    pub lowest: Option<f64>,
    pub highest: Option<f64>,
    pub alternate_language: Option<String>,
    pub alternate_fulladdress: Option<String>,
}

impl CoreRecord {
    pub fn new(uprn: i64, fulladdress: &str, postcode: &str) -> Self {
        Self {
            uprn,
            fulladdress: fulladdress.to_string(),
            postcode: postcode.to_string(),
            classification: Some("RD04".to_string()),
            parent: None,
            status: Some("Approved".to_string()),
            build: Some("Built Complete".to_string()),
            floor: None,
            lowest: None,
            highest: None,
            alternate_language: None,
            alternate_fulladdress: None,
        }
    }

    pub fn parent(mut self, parent: i64) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn classification(mut self, code: &str) -> Self {
        self.classification = Some(code.to_string());
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn floors(mut self, floor: &str, lowest: f64, highest: f64) -> Self {
        self.floor = Some(floor.to_string());
        self.lowest = Some(lowest);
        self.highest = Some(highest);
        self
    }

    pub fn welsh(mut self, fulladdress: &str) -> Self {
        self.alternate_language = Some("cym".to_string());
        self.alternate_fulladdress = Some(fulladdress.to_string());
        self
    }
}

/// One Royal Mail delivery point.
#[derive(Clone, Debug, Default)]
pub struct RoyalMailRecord {
    pub uprn: i64,
    pub subbuildingname: Option<String>,
    pub buildingname: Option<String>,
    pub buildingnumber: Option<String>,
    pub thoroughfare: Option<String>,
    pub posttown: String,
    pub postcode: String,
    pub matched_feature: Option<String>,
    pub welsh_thoroughfare: Option<String>,
    pub welsh_posttown: Option<String>,
}

impl RoyalMailRecord {
    pub fn new(uprn: i64, posttown: &str, postcode: &str) -> Self {
        Self {
            uprn,
            posttown: posttown.to_string(),
            postcode: postcode.to_string(),
            ..Self::default()
        }
    }

    pub fn premises(mut self, sub: Option<&str>, name: Option<&str>, number: Option<&str>) -> Self {
        self.subbuildingname = sub.map(str::to_string);
        self.buildingname = name.map(str::to_string);
        self.buildingnumber = number.map(str::to_string);
        self
    }

    pub fn thoroughfare(mut self, street: &str) -> Self {
        self.thoroughfare = Some(street.to_string());
        self
    }

    pub fn welsh(mut self, street: &str, town: &str) -> Self {
        self.welsh_thoroughfare = Some(street.to_string());
        self.welsh_posttown = Some(town.to_string());
        self
    }

    pub fn matched(mut self, feature: &str) -> Self {
        self.matched_feature = Some(feature.to_string());
        self
    }
}

/// One `*_altadd` record.
#[derive(Clone, Debug)]
pub struct AlternateRecord {
    pub uprn: i64,
    pub fulladdress: String,
    pub postcode: String,
    pub status: String,
}

impl AlternateRecord {
    pub fn new(uprn: i64, fulladdress: &str, postcode: &str) -> Self {
        Self {
            uprn,
            fulladdress: fulladdress.to_string(),
            postcode: postcode.to_string(),
            status: "Alternative".to_string(),
        }
    }
}

fn text<'a>(values: impl Iterator<Item = Option<&'a str>>) -> ArrayRef {
    Arc::new(StringArray::from_iter(values))
}

fn write_batch(path: &Path, columns: Vec<(&str, ArrayRef)>) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let batch = RecordBatch::try_from_iter(columns).unwrap();
    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

pub fn write_core_table(path: &Path, records: &[CoreRecord]) {
    write_batch(
        path,
        vec![
            (
                "UPRN",
                Arc::new(Int64Array::from_iter_values(records.iter().map(|r| r.uprn))) as ArrayRef,
            ),
            ("fullAddress", text(records.iter().map(|r| Some(r.fulladdress.as_str())))),
            ("postcode", text(records.iter().map(|r| Some(r.postcode.as_str())))),
            (
                "classificationCode",
                text(records.iter().map(|r| r.classification.as_deref())),
            ),
            (
                "parentUPRN",
                Arc::new(Int64Array::from_iter(records.iter().map(|r| r.parent))) as ArrayRef,
            ),
            ("addressStatus", text(records.iter().map(|r| r.status.as_deref()))),
            ("buildStatus", text(records.iter().map(|r| r.build.as_deref()))),
            ("floorLevel", text(records.iter().map(|r| r.floor.as_deref()))),
            (
                "lowestFloorLevel",
                Arc::new(Float64Array::from_iter(records.iter().map(|r| r.lowest))) as ArrayRef,
            ),
            (
                "highestFloorLevel",
                Arc::new(Float64Array::from_iter(records.iter().map(|r| r.highest))) as ArrayRef,
            ),
            (
                "alternateLanguage",
                text(records.iter().map(|r| r.alternate_language.as_deref())),
            ),
            (
                "alternateLanguageFullAddress",
                text(records.iter().map(|r| r.alternate_fulladdress.as_deref())),
            ),
        ],
    );
}

pub fn write_royal_mail_table(path: &Path, records: &[RoyalMailRecord]) {
    write_batch(
        path,
        vec![
            (
                "uprn",
                Arc::new(Int64Array::from_iter_values(records.iter().map(|r| r.uprn))) as ArrayRef,
            ),
            ("subBuildingName", text(records.iter().map(|r| r.subbuildingname.as_deref()))),
            ("buildingName", text(records.iter().map(|r| r.buildingname.as_deref()))),
            ("buildingNumber", text(records.iter().map(|r| r.buildingnumber.as_deref()))),
            ("thoroughfare", text(records.iter().map(|r| r.thoroughfare.as_deref()))),
            ("postTown", text(records.iter().map(|r| Some(r.posttown.as_str())))),
            ("postcode", text(records.iter().map(|r| Some(r.postcode.as_str())))),
            (
                "matchedAddressFeatureType",
                text(records.iter().map(|r| r.matched_feature.as_deref())),
            ),
            (
                "welshThoroughfare",
                text(records.iter().map(|r| r.welsh_thoroughfare.as_deref())),
            ),
            ("welshPostTown", text(records.iter().map(|r| r.welsh_posttown.as_deref()))),
        ],
    );
}

pub fn write_alternate_table(path: &Path, records: &[AlternateRecord]) {
    write_batch(
        path,
        vec![
            (
                "uprn",
                Arc::new(Int64Array::from_iter_values(records.iter().map(|r| r.uprn))) as ArrayRef,
            ),
            ("fulladdress", text(records.iter().map(|r| Some(r.fulladdress.as_str())))),
            ("postcode", text(records.iter().map(|r| Some(r.postcode.as_str())))),
            ("addressstatus", text(records.iter().map(|r| Some(r.status.as_str())))),
        ],
    );
}

/// A small dataset exercising dedup, hierarchy, Welsh variants, exclusions,
/// and enrichment, plus enough filler uprns to spread across chunks.
pub fn write_standard_dataset(dir: &Path) {
    let mut built = vec![
        CoreRecord::new(6001490, "10 HIGH STREET, LEEDS, LS1 4AP", "LS1 4AP").classification("PP"),
        CoreRecord::new(6001491, "FLAT 1, 10 HIGH STREET, LEEDS, LS1 4AP", "LS1 4AP")
            .classification("RD06")
            .parent(6001490)
            .floors("1", 1.0, 1.0),
        CoreRecord::new(6001492, "FLAT 2, 10 HIGH STREET, LEEDS, LS1 4AP", "LS1 4AP")
            .classification("RD06")
            .parent(6001490)
            .floors("2", 2.0, 2.0),
        CoreRecord::new(7000001, "1 CHURCH STREET, CARDIFF, CF10 1AA", "CF10 1AA")
            .welsh("1 STRYD YR EGLWYS, CAERDYDD, CF10 1AA"),
        CoreRecord::new(8000001, "5 ORPHAN ROAD, YORK, YO1 1AA", "YO1 1AA").parent(9999999),
        CoreRecord::new(8100001, "A LOOP HOUSE, HULL, HU1 1AA", "HU1 1AA").parent(8100002),
        CoreRecord::new(8100002, "B LOOP HOUSE, HULL, HU1 1AA", "HU1 1AA").parent(8100001),
    ];
    for offset in 0..40 {
        let uprn = 9_000_000 + offset;
        built.push(CoreRecord::new(
            uprn,
            &format!("{offset} FILLER LANE, BATH, BA1 1AA"),
            "BA1 1AA",
        ));
    }
    write_core_table(&dir.join(BUILT), &built);

    write_core_table(
        &dir.join(HISTORIC),
        &[
            CoreRecord::new(6001491, "FLAT 1, 10 HIGH STREET, LEEDS, LS1 4AP", "LS1 4AP")
                .classification("RD")
                .status("Historical"),
        ],
    );

    write_core_table(
        &dir.join(NON_ADDRESSABLE),
        &[CoreRecord::new(4440001, "LAND AT FIELD END, LEEDS", "LS2 2AA")],
    );

    write_alternate_table(
        &dir.join(BUILT_ALT),
        &[AlternateRecord::new(
            6001490,
            "THE OLD BANK, 10 HIGH STREET, LEEDS, LS1 4AP",
            "LS1 4AP",
        )],
    );

    write_royal_mail_table(
        &dir.join(ROYAL_MAIL),
        &[
            RoyalMailRecord::new(6001491, "LEEDS", "LS1 4AP")
                .premises(Some("FLAT 1"), Some("10 HIGH STREET"), None),
            RoyalMailRecord::new(6001492, "LEEDS", "LS1 4AP")
                .premises(Some("FLAT 2"), None, Some("10"))
                .thoroughfare("HIGH STREET"),
            RoyalMailRecord::new(5550001, "LEEDS", "LS9 9ZZ")
                .premises(None, Some("PO BOX 12"), None),
            RoyalMailRecord::new(5550002, "LEEDS", "LS9 9ZZ")
                .premises(None, Some("STREET KIOSK"), None)
                .matched("Non-Addressable Object"),
            RoyalMailRecord::new(7000002, "CARDIFF", "CF10 1AB")
                .premises(None, None, Some("2"))
                .thoroughfare("CHURCH STREET")
                .welsh("STRYD YR EGLWYS", "CAERDYDD"),
        ],
    );
}

/// Every row of every artifact for `product` in `dir`, in file then row order.
pub fn read_all_rows(dir: &Path, product: &str) -> Vec<CanonicalAddressRow> {
    artifact_files(dir, product)
        .unwrap()
        .iter()
        .flat_map(|path| read_artifact(path).unwrap())
        .collect()
}

pub fn artifact_paths(dir: &Path, product: &str) -> Vec<PathBuf> {
    artifact_files(dir, product).unwrap()
}

/// Rows keyed for set comparison, independent of chunk layout.
pub fn row_keys(rows: &[CanonicalAddressRow]) -> Vec<String> {
    let mut keys: Vec<String> = rows
        .iter()
        .map(|row| serde_json::to_string(row).unwrap())
        .collect();
    keys.sort();
    keys
}
