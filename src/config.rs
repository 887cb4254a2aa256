//! Tunable parameters for the chunker and the delta encoder.

use serde::{Deserialize, Serialize};

use crate::error::{CdcError, Result};

/// Default width of the rolling-hash window in bytes.
pub const DEFAULT_WINDOW_SIZE: usize = 64;

/// Default number of low hash bits that must be zero to signal a boundary.
pub const DEFAULT_MASK_BITS: u32 = 15;

/// Default minimum chunk length (8 KiB).
pub const DEFAULT_MIN_CHUNK: usize = 8 * 1024;

/// Default maximum chunk length (64 KiB).
pub const DEFAULT_MAX_CHUNK: usize = 64 * 1024;

/// Default zstd compression level for delta artifacts.
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Boundary detection parameters.
///
/// Boundaries are only reproducible between runs that use identical
/// parameters, so a chunk store should pin these once it holds data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Number of trailing bytes covered by the rolling hash.
    pub window_size: usize,
    /// A cut is signalled when the low `mask_bits` bits of the hash are zero.
    pub mask_bits: u32,
    /// No boundary is tested before a chunk reaches this length.
    pub min_chunk: usize,
    /// A chunk reaching this length is always cut.
    pub max_chunk: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            mask_bits: DEFAULT_MASK_BITS,
            min_chunk: DEFAULT_MIN_CHUNK,
            max_chunk: DEFAULT_MAX_CHUNK,
        }
    }
}

impl ChunkerConfig {
    /// Creates a configuration from explicit parameters.
    pub fn new(window_size: usize, mask_bits: u32, min_chunk: usize, max_chunk: usize) -> Self {
        Self {
            window_size,
            mask_bits,
            min_chunk,
            max_chunk,
        }
    }

    /// Bit mask applied to the rolling hash when testing for a cut.
    #[inline]
    pub fn mask(&self) -> u64 {
        (1u64 << self.mask_bits) - 1
    }

    /// Checks that the parameters describe a usable chunker.
    ///
    /// # Errors
    ///
    /// Returns [`CdcError::InvalidConfig`] if the window is empty, the mask
    /// does not fit in 64 bits, or the size bounds are inconsistent.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(CdcError::InvalidConfig(
                "window_size must be greater than zero".to_string(),
            ));
        }
        if self.mask_bits > 63 {
            return Err(CdcError::InvalidConfig(format!(
                "mask_bits must be at most 63, got {}",
                self.mask_bits
            )));
        }
        // The first cut test happens once the window is full and one more byte arrives.
        if self.min_chunk <= self.window_size {
            return Err(CdcError::InvalidConfig(format!(
                "min_chunk ({}) must exceed window_size ({})",
                self.min_chunk, self.window_size
            )));
        }
        if self.min_chunk > self.max_chunk {
            return Err(CdcError::InvalidConfig(format!(
                "min_chunk ({}) must not exceed max_chunk ({})",
                self.min_chunk, self.max_chunk
            )));
        }
        Ok(())
    }
}

/// Stream compression filter applied to every delta artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Zstd frame (good balance)
    #[default]
    Zstd,
    /// LZ4 frame (faster)
    Lz4,
}

/// How to encode a modified chunk that is shorter than its base chunk.
///
/// Sparse and run payloads can only overwrite or extend, so positions past
/// the end of a shorter modified chunk are recorded as zero writes and the
/// reconstructed chunk keeps the base length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShrinkPolicy {
    /// Store shrunk chunks in `full` mode so reconstruction is exact.
    #[default]
    Full,
    /// Keep cost-based selection and record trailing positions as zero bytes.
    ZeroFill,
}

/// Delta encoder parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaConfig {
    /// Filter used to compress artifacts.
    pub compression: Compression,
    /// Compression level (zstd: 1..=22, lz4: 0..=16).
    pub level: i32,
    /// Handling of modified chunks shorter than their base.
    pub shrink_policy: ShrinkPolicy,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            compression: Compression::Zstd,
            level: DEFAULT_ZSTD_LEVEL,
            shrink_policy: ShrinkPolicy::Full,
        }
    }
}

impl DeltaConfig {
    /// Checks the compression level against the selected filter.
    ///
    /// # Errors
    ///
    /// Returns [`CdcError::InvalidConfig`] if the level is out of range.
    pub fn validate(&self) -> Result<()> {
        let range = match self.compression {
            Compression::Zstd => 1..=22,
            Compression::Lz4 => 0..=16,
        };
        if !range.contains(&self.level) {
            return Err(CdcError::InvalidConfig(format!(
                "{:?} level must be in {}..={}, got {}",
                self.compression,
                range.start(),
                range.end(),
                self.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chunker_config_is_valid() {
        let config = ChunkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mask(), 0x7FFF);
    }

    #[test]
    fn test_invalid_chunker_configs() {
        assert!(ChunkerConfig::new(0, 15, 8192, 65536).validate().is_err());
        assert!(ChunkerConfig::new(64, 64, 8192, 65536).validate().is_err());
        assert!(ChunkerConfig::new(64, 15, 64, 65536).validate().is_err());
        assert!(ChunkerConfig::new(64, 15, 8192, 4096).validate().is_err());
    }

    #[test]
    fn test_zero_mask_bits() {
        let config = ChunkerConfig::new(16, 0, 32, 64);
        assert!(config.validate().is_ok());
        assert_eq!(config.mask(), 0);
    }

    #[test]
    fn test_delta_config_levels() {
        assert!(DeltaConfig::default().validate().is_ok());

        let bad = DeltaConfig {
            level: 30,
            ..DeltaConfig::default()
        };
        assert!(bad.validate().is_err());

        let lz4 = DeltaConfig {
            compression: Compression::Lz4,
            level: 1,
            ..DeltaConfig::default()
        };
        assert!(lz4.validate().is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let config: ChunkerConfig =
            serde_json::from_str(r#"{"mask_bits": 10, "min_chunk": 512, "max_chunk": 4096}"#)
                .unwrap();
        assert_eq!(config.window_size, DEFAULT_WINDOW_SIZE);
        assert_eq!(config.mask_bits, 10);
        assert!(config.validate().is_ok());

        let delta: DeltaConfig =
            serde_json::from_str(r#"{"compression": "lz4", "shrink_policy": "zero_fill"}"#)
                .unwrap();
        assert_eq!(delta.compression, Compression::Lz4);
        assert_eq!(delta.shrink_policy, ShrinkPolicy::ZeroFill);
    }
}
