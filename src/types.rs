/// Unique Property Reference Number keying every address record.
/// Example: `6001491`
pub type Uprn = u64;
/// Source table file name used for provenance and tie-breaking.
/// Examples: `add_gb_builtaddress.parquet`, `add_gb_royalmailaddress.parquet`
pub type SourceName = String;
/// Lowercased file stem identifying a feature collection.
/// Examples: `add_gb_builtaddress`, `add_gb_prebuildaddress_altadd`
pub type SourceStem = String;
/// Concatenated single-line address text (postcode excluded).
/// Example: `FLAT 2, 10 HIGH STREET, LEEDS`
pub type AddressText = String;
/// OS classification code carried by core records.
/// Examples: `RD04`, `CR08`
pub type ClassificationCode = String;
/// Product label used in output artifact names.
/// Examples: `ngd`, `abp`
pub type ProductName = String;
