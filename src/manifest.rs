//! Chunk manifests and blob naming.
//!
//! A chunk directory holds one blob per chunk, named
//! `chunk_{sequence:06}_{fingerprint}.bin`, plus a `manifest.json` listing
//! the blob names in byte order. [`Manifest`] keeps that list as an
//! in-memory index from sequence number to chunk, so lookups never scan
//! the directory.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{CdcError, Result};

/// File name of the manifest inside a chunk directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Number of hex characters kept from the SHA-256 of a chunk.
pub const FINGERPRINT_LEN: usize = 16;

const CHUNK_PREFIX: &str = "chunk_";
const BLOB_EXTENSION: &str = ".bin";

/// Computes the truncated content fingerprint of a chunk.
pub fn fingerprint(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// Identity of one stored chunk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkRef {
    /// Zero-based position of the chunk in its source file.
    pub sequence: usize,
    /// Truncated hex SHA-256 of the chunk bytes.
    pub fingerprint: String,
}

impl ChunkRef {
    /// Creates a reference from its parts.
    pub fn new(sequence: usize, fingerprint: impl Into<String>) -> Self {
        Self {
            sequence,
            fingerprint: fingerprint.into(),
        }
    }

    /// Blob file name for this chunk.
    pub fn file_name(&self) -> String {
        format!(
            "{CHUNK_PREFIX}{:06}_{}{BLOB_EXTENSION}",
            self.sequence, self.fingerprint
        )
    }

    /// Parses a blob file name back into a reference.
    pub fn parse(name: &str) -> Option<Self> {
        let stem = name
            .strip_prefix(CHUNK_PREFIX)?
            .strip_suffix(BLOB_EXTENSION)?;
        let (sequence, fingerprint) = stem.split_once('_')?;
        if fingerprint.is_empty() || !fingerprint.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self {
            sequence: sequence.parse().ok()?,
            fingerprint: fingerprint.to_string(),
        })
    }
}

/// Ordered list of the chunks making up one file version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    chunks: Vec<ChunkRef>,
}

impl Manifest {
    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next chunk.
    ///
    /// # Errors
    ///
    /// Returns [`CdcError::InvalidManifest`] if the chunk's sequence number is
    /// not the next one in order.
    pub fn push(&mut self, chunk: ChunkRef) -> Result<()> {
        if chunk.sequence != self.chunks.len() {
            return Err(CdcError::InvalidManifest(format!(
                "expected sequence {}, got {}",
                self.chunks.len(),
                chunk.sequence
            )));
        }
        self.chunks.push(chunk);
        Ok(())
    }

    /// Number of chunks.
    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if the manifest lists no chunks.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Looks up a chunk by sequence number.
    #[inline]
    pub fn get(&self, sequence: usize) -> Option<&ChunkRef> {
        self.chunks.get(sequence)
    }

    /// Iterates over chunks in byte order.
    pub fn iter(&self) -> std::slice::Iter<'_, ChunkRef> {
        self.chunks.iter()
    }

    /// Blob names in manifest order.
    pub fn file_names(&self) -> Vec<String> {
        self.chunks.iter().map(ChunkRef::file_name).collect()
    }

    /// Path of the blob for `sequence` inside `dir`, if the chunk exists.
    pub fn chunk_path(&self, dir: &Path, sequence: usize) -> Option<PathBuf> {
        self.get(sequence).map(|chunk| dir.join(chunk.file_name()))
    }

    /// Reads the bytes of chunk `sequence`, or `None` past the end.
    pub fn read_chunk(&self, dir: &Path, sequence: usize) -> Result<Option<Vec<u8>>> {
        match self.chunk_path(dir, sequence) {
            Some(path) => Ok(Some(fs::read(path)?)),
            None => Ok(None),
        }
    }

    /// Loads `manifest.json` from a chunk directory.
    ///
    /// # Errors
    ///
    /// Returns [`CdcError::MissingManifest`] if the file does not exist and
    /// [`CdcError::InvalidManifest`] if a name is malformed or out of order.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(CdcError::MissingManifest(path));
        }
        let names: Vec<String> = serde_json::from_slice(&fs::read(&path)?)?;

        let mut manifest = Self::new();
        for name in names {
            let chunk = ChunkRef::parse(&name)
                .ok_or_else(|| CdcError::InvalidManifest(format!("bad chunk name: {name}")))?;
            manifest.push(chunk)?;
        }
        Ok(manifest)
    }

    /// Writes `manifest.json` into a chunk directory.
    ///
    /// The file is written under a temporary name and renamed into place, so
    /// readers never observe a partial manifest.
    pub fn store(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(MANIFEST_FILE);
        let tmp = dir.join(format!("{MANIFEST_FILE}.tmp"));
        let json = serde_json::to_vec_pretty(&self.file_names())?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(path)
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a ChunkRef;
    type IntoIter = std::slice::Iter<'a, ChunkRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
