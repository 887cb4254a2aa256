//! Compression filter for delta artifacts.
//!
//! Artifacts are written as a zstd or LZ4 frame. Decoding detects the frame
//! type from its magic bytes, so a directory may mix both.

use std::io;

use crate::config::{Compression, DeltaConfig};
use crate::error::{CdcError, Result};

const ZSTD_MAGIC: &[u8] = &[0x28, 0xB5, 0x2F, 0xFD];
const LZ4_MAGIC: &[u8] = &[0x04, 0x22, 0x4D, 0x18];

/// Compresses a serialized payload with the configured filter.
pub fn compress(data: &[u8], config: &DeltaConfig) -> Result<Vec<u8>> {
    match config.compression {
        Compression::Zstd => compress_zstd(data, config.level),
        Compression::Lz4 => compress_lz4(data, config.level),
    }
}

/// Detects the frame format of `data` and decompresses it.
///
/// # Errors
///
/// Returns [`CdcError::Compression`] for unknown or corrupted frames.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    match detect(data) {
        Some(Compression::Zstd) => {
            zstd::decode_all(data).map_err(|e| CdcError::Compression(format!("zstd: {e}")))
        }
        Some(Compression::Lz4) => decompress_lz4(data),
        None => Err(CdcError::Compression("unrecognized artifact frame".to_string())),
    }
}

/// Identifies the compression filter from the frame magic.
pub fn detect(data: &[u8]) -> Option<Compression> {
    if data.starts_with(ZSTD_MAGIC) {
        Some(Compression::Zstd)
    } else if data.starts_with(LZ4_MAGIC) {
        Some(Compression::Lz4)
    } else {
        None
    }
}

fn compress_zstd(data: &[u8], level: i32) -> Result<Vec<u8>> {
    zstd::encode_all(data, level).map_err(|e| CdcError::Compression(format!("zstd: {e}")))
}

#[allow(clippy::cast_sign_loss)]
fn compress_lz4(data: &[u8], level: i32) -> Result<Vec<u8>> {
    let lz4_err = |e: io::Error| CdcError::Compression(format!("lz4: {e}"));

    let mut compressed = Vec::new();
    let mut encoder = lz4::EncoderBuilder::new()
        .level(level.max(0) as u32)
        .build(&mut compressed)
        .map_err(lz4_err)?;

    io::copy(&mut &data[..], &mut encoder).map_err(lz4_err)?;

    let (_output, result) = encoder.finish();
    result.map_err(lz4_err)?;

    Ok(compressed)
}

fn decompress_lz4(data: &[u8]) -> Result<Vec<u8>> {
    let lz4_err = |e: io::Error| CdcError::Compression(format!("lz4: {e}"));

    let mut decoder = lz4::Decoder::new(data).map_err(lz4_err)?;
    let mut decompressed = Vec::new();
    io::copy(&mut decoder, &mut decompressed).map_err(lz4_err)?;

    Ok(decompressed)
}
