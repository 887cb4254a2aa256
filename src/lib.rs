//! # cdelta
//!
//! Content-defined chunking and chunk-level delta compression for binary files.
//!
//! `cdelta` stores successive versions of a file space-efficiently: each
//! version is split into content-defined chunks, and a new version is kept
//! as one small delta artifact per chunk against the previous version.
//!
//! ## Quick Start
//!
//! ```
//! use cdelta::{
//!     ChunkerConfig, DeltaConfig, chunk_reader, generate_deltas, reconstruct_from_manifest,
//! };
//! use tempfile::TempDir;
//!
//! let work = TempDir::new().unwrap();
//! let v1 = work.path().join("v1");
//! let v2 = work.path().join("v2");
//! let deltas = work.path().join("deltas");
//!
//! let original: Vec<u8> = (0..5000u32).map(|i| (i * 7 % 251) as u8).collect();
//! let mut modified = original.clone();
//! modified[1234] ^= 0xFF;
//!
//! let config = ChunkerConfig::new(32, 8, 512, 2048);
//! chunk_reader(&original[..], &v1, &config).unwrap();
//! chunk_reader(&modified[..], &v2, &config).unwrap();
//!
//! generate_deltas(&v1, &v2, &deltas, &DeltaConfig::default()).unwrap();
//!
//! let output = work.path().join("rebuilt.bin");
//! reconstruct_from_manifest(&v1, &deltas, &output).unwrap();
//! assert_eq!(std::fs::read(&output).unwrap(), modified);
//! ```
//!
//! ## Algorithm Details
//!
//! 1. A polynomial rolling hash over a trailing window marks chunk
//!    boundaries where its low bits are zero, within `[min_chunk, max_chunk]`.
//! 2. Chunks are stored as blobs named by sequence number and a truncated
//!    SHA-256 fingerprint, with a manifest recording their order.
//! 3. Chunks of two versions are paired by sequence number, never by
//!    content, and each pair is diffed byte by byte.
//! 4. Each delta is stored as `full`, `run` or `sparse`, whichever is
//!    cheapest, and compressed with zstd or LZ4.
//! 5. Reconstruction replays each artifact against its base chunk and
//!    concatenates the results in sequence order.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod buffer;
mod chunker;
mod codec;
mod config;
mod delta;
mod diff;
mod error;
mod manifest;
mod reconstruct;
mod rolling;

pub use chunker::{
    Chunk, Chunker, READ_BUFFER_SIZE, chunk_file, chunk_reader, hash_concat_chunks, split,
    verify_chunks,
};
pub use codec::{compress, decompress, detect};
pub use config::{
    ChunkerConfig, Compression, DEFAULT_MASK_BITS, DEFAULT_MAX_CHUNK, DEFAULT_MIN_CHUNK,
    DEFAULT_WINDOW_SIZE, DEFAULT_ZSTD_LEVEL, DeltaConfig, ShrinkPolicy,
};
pub use delta::{
    ArtifactEntry, DeltaCost, DeltaMode, DeltaPayload, DeltaRecord, DeltaSummary,
    RUN_HEADER_SIZE, SPARSE_ENTRY_SIZE, artifact_name, clear_artifacts, encode_chunk,
    generate_deltas, list_artifacts, parse_artifact_name, read_artifact, write_artifact,
};
pub use diff::{Run, changed_positions, group_runs};
pub use error::{CdcError, Result};
pub use manifest::{ChunkRef, FINGERPRINT_LEN, MANIFEST_FILE, Manifest, fingerprint};
pub use reconstruct::{
    ReconstructSummary, decode_chunk, reconstruct_chunk, reconstruct_file,
    reconstruct_from_manifest,
};
pub use rolling::{BASE, RollingHash, hash_window};
