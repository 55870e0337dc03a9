use std::path::PathBuf;

use crate::constants::output::{
    DEFAULT_COMPRESSION_LEVEL, DEFAULT_NUM_CHUNKS, DEFAULT_PRODUCT,
};
use crate::errors::FlatfileError;
use crate::types::ProductName;

/// Top-level configuration for one flatfile run.
#[derive(Clone, Debug)]
pub struct FlatfileConfig {
    /// Directory holding one `<stem>.parquet` table per source collection.
    pub input_dir: PathBuf,
    /// Directory receiving the chunk artifacts.
    pub output_dir: PathBuf,
    /// Number of uprn buckets (and output artifacts). Must be at least 1.
    pub num_chunks: usize,
    /// Rewrite artifacts that already exist instead of leaving them in place.
    pub overwrite: bool,
    /// Product label used as the artifact name prefix.
    pub product: ProductName,
    /// ZSTD level used when writing artifacts.
    pub compression_level: i32,
}

impl Default for FlatfileConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/extracted/parquet"),
            output_dir: PathBuf::from("data/output"),
            num_chunks: DEFAULT_NUM_CHUNKS,
            overwrite: false,
            product: DEFAULT_PRODUCT.to_string(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl FlatfileConfig {
    /// Create a config for `input_dir` → `output_dir` with default knobs.
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Set the number of output chunks.
    pub fn with_num_chunks(mut self, num_chunks: usize) -> Self {
        self.num_chunks = num_chunks;
        self
    }

    /// Set the overwrite flag.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Validate knob ranges, returning the config unchanged on success.
    pub fn validated(self) -> Result<Self, FlatfileError> {
        if self.num_chunks == 0 {
            return Err(FlatfileError::Configuration(
                "num_chunks must be >= 1".to_string(),
            ));
        }
        if self.product.trim().is_empty()
            || self
                .product
                .chars()
                .any(|ch| ch == '/' || ch == '\\' || ch.is_whitespace())
        {
            return Err(FlatfileError::Configuration(format!(
                "product label '{}' must be a non-empty file name fragment",
                self.product
            )));
        }
        // zstd accepts 1..=22
        if !(1..=22).contains(&self.compression_level) {
            return Err(FlatfileError::Configuration(format!(
                "compression_level must be within 1..=22 (found {})",
                self.compression_level
            )));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validated_rejects_zero_chunks() {
        let err = FlatfileConfig::new("in", "out")
            .with_num_chunks(0)
            .validated()
            .unwrap_err();
        assert!(matches!(err, FlatfileError::Configuration(_)));
    }

    #[test]
    fn validated_rejects_path_like_product() {
        let config = FlatfileConfig {
            product: "ngd/../x".to_string(),
            ..FlatfileConfig::default()
        };
        assert!(config.validated().is_err());
    }

    #[test]
    fn defaults_follow_processing_settings() {
        let config = FlatfileConfig::default().validated().unwrap();
        assert_eq!(config.num_chunks, 20);
        assert_eq!(config.compression_level, 9);
        assert_eq!(config.product, "ngd");
        assert!(!config.overwrite);
    }
}
