/// Constants describing the OS NGD source collections.
pub mod sources {
    /// Extension of every columnar input and output table.
    pub const PARQUET_EXTENSION: &str = "parquet";
    /// Built Address core collection.
    pub const BUILT_ADDRESS: &str = "add_gb_builtaddress";
    /// Pre-Build Address core collection.
    pub const PREBUILD_ADDRESS: &str = "add_gb_prebuildaddress";
    /// Historic Address core collection.
    pub const HISTORIC_ADDRESS: &str = "add_gb_historicaddress";
    /// Non-Addressable Object collection (read but never emitted).
    pub const NON_ADDRESSABLE_OBJECT: &str = "add_gb_nonaddressableobject";
    /// Royal Mail postal delivery collection.
    pub const ROYAL_MAIL_ADDRESS: &str = "add_gb_royalmailaddress";
    /// Suffix marking an alternate-address companion collection.
    pub const ALTERNATE_SUFFIX: &str = "_altadd";
    /// Value of `matchedaddressfeaturetype` that excludes a Royal Mail record.
    pub const NON_ADDRESSABLE_LABEL: &str = "Non-Addressable Object";
}

/// Column names read from source tables (matched case-insensitively).
pub mod columns {
    pub const UPRN: &str = "uprn";
    pub const FULL_ADDRESS: &str = "fulladdress";
    pub const POSTCODE: &str = "postcode";
    pub const CLASSIFICATION_CODE: &str = "classificationcode";
    pub const PARENT_UPRN: &str = "parentuprn";
    pub const ADDRESS_STATUS: &str = "addressstatus";
    pub const BUILD_STATUS: &str = "buildstatus";
    pub const FLOOR_LEVEL: &str = "floorlevel";
    pub const LOWEST_FLOOR_LEVEL: &str = "lowestfloorlevel";
    pub const HIGHEST_FLOOR_LEVEL: &str = "highestfloorlevel";
    pub const ALTERNATE_LANGUAGE: &str = "alternatelanguage";
    pub const ALTERNATE_LANGUAGE_FULL_ADDRESS: &str = "alternatelanguagefulladdress";
    /// Alternate-language address components, in concatenation order.
    pub const ALTERNATE_LANGUAGE_COMPONENTS: [&str; 7] = [
        "alternatelanguagesubname",
        "alternatelanguagename",
        "alternatelanguagenumber",
        "alternatelanguagestreetname",
        "alternatelanguagelocality",
        "alternatelanguagetownname",
        "alternatelanguageislandname",
    ];
    pub const MATCHED_FEATURE_TYPE: &str = "matchedaddressfeaturetype";
    pub const POST_TOWN: &str = "posttown";
    /// Royal Mail components preceding the thoroughfare block.
    pub const ROYAL_MAIL_PREMISES: [&str; 5] = [
        "organisationname",
        "departmentname",
        "subbuildingname",
        "buildingname",
        "buildingnumber",
    ];
    /// English locality block, paired index-for-index with the Welsh block.
    pub const ROYAL_MAIL_LOCALITY: [&str; 5] = [
        "dependentthoroughfare",
        "thoroughfare",
        "doubledependentlocality",
        "dependentlocality",
        "posttown",
    ];
    pub const ROYAL_MAIL_WELSH_LOCALITY: [&str; 5] = [
        "welshdependentthoroughfare",
        "welshthoroughfare",
        "welshdoubledependentlocality",
        "welshdependentlocality",
        "welshposttown",
    ];
}

/// Language codes carried on normalized rows.
pub mod language {
    /// Code for primary (English) address rows.
    pub const PRIMARY_CODE: &str = "eng";
    /// Code for secondary (Welsh) address rows.
    pub const SECONDARY_CODE: &str = "cym";
    /// `alternatelanguage` values that mark a Welsh variant.
    pub const WELSH_MARKERS: [&str; 4] = ["wel", "cym", "welsh", "cymraeg"];
}

/// Rank tables used by the priority resolver (lower is preferred).
pub mod ranks {
    /// Address status tags in preference order; position + 1 is the rank.
    pub const ADDRESS_STATUS_ORDER: [&str; 4] =
        ["approved", "provisional", "alternative", "historical"];
    /// Build status tags in preference order; position + 1 is the rank.
    pub const BUILD_STATUS_ORDER: [&str; 5] = [
        "built complete",
        "under construction",
        "prebuild",
        "historic",
        "demolished",
    ];
    /// Rank assigned when the address status is absent or unrecognised.
    pub const WORST_STATUS_RANK: u8 = ADDRESS_STATUS_ORDER.len() as u8 + 1;
    /// Rank assigned when the build status is absent or unrecognised.
    pub const WORST_BUILD_RANK: u8 = BUILD_STATUS_ORDER.len() as u8 + 1;
}

/// Constants used for output artifacts and their write protocol.
pub mod output {
    /// Infix between the product label and the chunk suffix.
    pub const ARTIFACT_INFIX: &str = "_for_uk_address_matcher";
    /// Minimum zero-padding width for chunk indices in artifact names.
    pub const CHUNK_INDEX_WIDTH: usize = 3;
    /// Suffix for in-progress chunk files; renamed away once complete.
    pub const PARTIAL_SUFFIX: &str = "partial";
    /// Default product label.
    pub const DEFAULT_PRODUCT: &str = "ngd";
    /// Default number of output chunks.
    pub const DEFAULT_NUM_CHUNKS: usize = 20;
    /// Default ZSTD compression level for output artifacts.
    pub const DEFAULT_COMPRESSION_LEVEL: i32 = 9;
    /// Seed mixed into uprn bucket hashing.
    pub const BUCKET_SEED: u64 = 0x5EED_0F_F1A7;
}

/// Column names of output artifacts, in schema order.
pub mod schema {
    pub const UPRN: &str = "uprn";
    pub const ADDRESS_CONCAT: &str = "address_concat";
    pub const POSTCODE: &str = "postcode";
    pub const SOURCE_FILENAME: &str = "source_filename";
    pub const CLASSIFICATION_CODE: &str = "classification_code";
    pub const PARENT_UPRN: &str = "parent_uprn";
    pub const ROOT_UPRN: &str = "root_uprn";
    pub const HIERARCHY_LEVEL: &str = "hierarchy_level";
    pub const FLOOR_LEVEL: &str = "floor_level";
    pub const LOWEST_FLOOR_LEVEL: &str = "lowest_floor_level";
    pub const HIGHEST_FLOOR_LEVEL: &str = "highest_floor_level";
}
