//! Streaming content-defined chunker.
//!
//! Bytes are read through a fixed-size buffer and fed one at a time into a
//! [`RollingHash`] over the trailing `window_size` bytes of the open chunk.
//! Once the chunk holds at least `min_chunk` bytes, a boundary is cut when
//! the low `mask_bits` bits of the hash are zero or the chunk reaches
//! `max_chunk`. After a cut the hash restarts from an empty window.

use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::ChunkerConfig;
use crate::error::{CdcError, Result};
use crate::manifest::{ChunkRef, Manifest, fingerprint};
use crate::rolling::RollingHash;

/// Size of the read buffer used when streaming a source.
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// A chunk emitted by the [`Chunker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position of the chunk in the stream.
    pub sequence: usize,
    /// Byte offset of the chunk in the stream.
    pub offset: u64,
    /// Truncated hex SHA-256 of `data`.
    pub fingerprint: String,
    /// The chunk bytes.
    pub data: Vec<u8>,
}

impl Chunk {
    /// Length of the chunk in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the chunk holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Manifest entry for this chunk.
    pub fn chunk_ref(&self) -> ChunkRef {
        ChunkRef::new(self.sequence, self.fingerprint.clone())
    }
}

/// Splits a byte stream into content-defined chunks.
///
/// The chunker is an iterator yielding `Result<Chunk>`; iteration stops after
/// the final chunk or the first read error. A stream shorter than one window
/// yields no chunks at all.
///
/// ```
/// use cdelta::{Chunker, ChunkerConfig};
///
/// let data = vec![7u8; 1000];
/// let config = ChunkerConfig::new(16, 4, 64, 256);
/// let chunks: Vec<_> = Chunker::new(&data[..], config)
///     .unwrap()
///     .collect::<Result<_, _>>()
///     .unwrap();
///
/// let total: usize = chunks.iter().map(|c| c.len()).sum();
/// assert_eq!(total, data.len());
/// ```
pub struct Chunker<R: Read> {
    source: R,
    buffer: Box<[u8]>,
    cursor: usize,
    filled: usize,
    eof: bool,
    done: bool,
    config: ChunkerConfig,
    mask: u64,
    hash: RollingHash,
    chunk: Vec<u8>,
    sequence: usize,
    offset: u64,
    source_hasher: Sha256,
    bytes_read: u64,
    digest: Option<String>,
}

impl<R: Read> Chunker<R> {
    /// Creates a chunker reading from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`CdcError::InvalidConfig`] if `config` fails validation.
    pub fn new(source: R, config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            buffer: vec![0u8; READ_BUFFER_SIZE].into_boxed_slice(),
            cursor: 0,
            filled: 0,
            eof: false,
            done: false,
            config,
            mask: config.mask(),
            hash: RollingHash::new(config.window_size),
            chunk: Vec::with_capacity(config.min_chunk),
            sequence: 0,
            offset: 0,
            source_hasher: Sha256::new(),
            bytes_read: 0,
            digest: None,
        })
    }

    /// Number of source bytes consumed so far.
    #[inline]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Hex SHA-256 of the whole source, available once iteration has finished.
    pub fn source_digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Refills the read buffer, returning false at end of stream.
    fn fill(&mut self) -> Result<bool> {
        loop {
            match self.source.read(&mut self.buffer) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(false);
                }
                Ok(n) => {
                    self.source_hasher.update(&self.buffer[..n]);
                    self.bytes_read += n as u64;
                    self.cursor = 0;
                    self.filled = n;
                    return Ok(true);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Appends one byte to the open chunk, returning a chunk if a cut occurs.
    #[inline]
    fn push_byte(&mut self, byte: u8) -> Option<Chunk> {
        self.chunk.push(byte);
        let len = self.chunk.len();
        let window = self.config.window_size;

        if len <= window {
            self.hash.push(byte);
            return None;
        }

        let outgoing = self.chunk[len - 1 - window];
        self.hash.roll(outgoing, byte);

        if len >= self.config.min_chunk
            && ((self.hash.value() & self.mask) == 0 || len >= self.config.max_chunk)
        {
            return Some(self.cut());
        }
        None
    }

    /// Closes the open chunk and restarts the window.
    fn cut(&mut self) -> Chunk {
        let data = std::mem::replace(&mut self.chunk, Vec::with_capacity(self.config.min_chunk));
        self.hash.reset();

        let chunk = Chunk {
            sequence: self.sequence,
            offset: self.offset,
            fingerprint: fingerprint(&data),
            data,
        };
        self.sequence += 1;
        self.offset += chunk.len() as u64;
        chunk
    }

    /// Handles end of stream: emits the trailing chunk if there is one.
    fn finish(&mut self) -> Option<Chunk> {
        self.done = true;
        self.digest = Some(hex::encode(self.source_hasher.clone().finalize()));

        if self.chunk.is_empty() {
            return None;
        }
        if self.sequence == 0 && self.chunk.len() < self.config.window_size {
            warn!(
                "Source of {} bytes is shorter than the {}-byte window, no chunks produced",
                self.chunk.len(),
                self.config.window_size
            );
            self.chunk.clear();
            return None;
        }
        Some(self.cut())
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Result<Chunk>> {
        if self.done {
            return None;
        }
        loop {
            if self.cursor == self.filled {
                if self.eof {
                    return self.finish().map(Ok);
                }
                match self.fill() {
                    Ok(_) => continue,
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
            }

            let byte = self.buffer[self.cursor];
            self.cursor += 1;
            if let Some(chunk) = self.push_byte(byte) {
                return Some(Ok(chunk));
            }
        }
    }
}

/// Chunks an in-memory buffer without touching the filesystem.
pub fn split(data: &[u8], config: ChunkerConfig) -> Result<Vec<Chunk>> {
    Chunker::new(data, config)?.collect()
}

/// Chunks a stream into `output_dir`, writing one blob per chunk and the manifest.
///
/// After writing, the blobs are read back in manifest order and their
/// concatenation is hashed and compared against the hash of the source.
///
/// # Errors
///
/// Returns [`CdcError::IntegrityViolation`] if the written chunks do not
/// reproduce the source, and I/O errors from reading or writing.
pub fn chunk_reader<R: Read>(
    source: R,
    output_dir: &Path,
    config: &ChunkerConfig,
) -> Result<Manifest> {
    let mut chunker = Chunker::new(source, *config)?;
    fs::create_dir_all(output_dir)?;

    let mut manifest = Manifest::new();
    for chunk in chunker.by_ref() {
        let chunk = chunk?;
        let chunk_ref = chunk.chunk_ref();
        fs::write(output_dir.join(chunk_ref.file_name()), &chunk.data)?;
        debug!(
            "Wrote chunk {} at offset {} ({} bytes)",
            chunk_ref.file_name(),
            chunk.offset,
            chunk.len()
        );
        manifest.push(chunk_ref)?;
    }
    manifest.store(output_dir)?;

    let expected = chunker.source_digest().unwrap_or_default().to_string();
    if manifest.is_empty() && chunker.bytes_read() > 0 {
        warn!(
            "Skipping integrity check for {}: source was not chunked",
            output_dir.display()
        );
        return Ok(manifest);
    }

    verify_chunks(output_dir, &expected)?;

    info!(
        "Chunked {} bytes into {} chunks at {}",
        chunker.bytes_read(),
        manifest.len(),
        output_dir.display()
    );
    Ok(manifest)
}

/// Chunks the file at `path` into `output_dir`.
///
/// See [`chunk_reader`] for the integrity guarantees.
pub fn chunk_file(path: &Path, output_dir: &Path, config: &ChunkerConfig) -> Result<Manifest> {
    let file = File::open(path)?;
    debug!("Chunking {} into {}", path.display(), output_dir.display());
    chunk_reader(file, output_dir, config)
}

/// Checks that a chunk directory reproduces a source with the given SHA-256.
///
/// # Errors
///
/// Returns [`CdcError::IntegrityViolation`] if the concatenated blobs hash
/// to anything other than `expected`.
pub fn verify_chunks(dir: &Path, expected: &str) -> Result<()> {
    let actual = hash_concat_chunks(dir)?;
    if actual != expected {
        return Err(CdcError::IntegrityViolation {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Hashes the concatenation of a chunk directory's blobs in manifest order.
pub fn hash_concat_chunks(dir: &Path) -> Result<String> {
    let manifest = Manifest::load(dir)?;
    let mut hasher = Sha256::new();
    for chunk in &manifest {
        hasher.update(fs::read(dir.join(chunk.file_name()))?);
    }
    Ok(hex::encode(hasher.finalize()))
}
