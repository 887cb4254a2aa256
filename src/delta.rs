//! Chunk-level delta encoding.
//!
//! Chunks are paired strictly by sequence number: chunk `i` of the modified
//! version is compared with chunk `i` of the base version, or with nothing
//! when the base has fewer chunks. Each pair is encoded in the cheapest of
//! three modes:
//!
//! - `full`: the modified chunk verbatim.
//! - `run`: `u32` run count, then per run `u32` start, `u32` length and the
//!   run bytes.
//! - `sparse`: one `(u32 index, u8 value)` pair per changed position.
//!
//! Integers are little-endian. Every payload is compressed and written to
//! `{mode}_{sequence:06}.bin`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::buffer::BufferStream;
use crate::codec;
use crate::config::{DeltaConfig, ShrinkPolicy};
use crate::diff::{Run, changed_positions, group_runs};
use crate::error::{CdcError, Result};
use crate::manifest::Manifest;

/// Encoded size of one sparse entry: 4-byte offset plus 1-byte value.
pub const SPARSE_ENTRY_SIZE: usize = 5;

/// Encoded size of a run header: 4-byte start plus 4-byte length.
pub const RUN_HEADER_SIZE: usize = 8;

const ARTIFACT_EXTENSION: &str = ".bin";

/// Representation chosen for one chunk delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaMode {
    /// Verbatim copy of the modified chunk.
    Full,
    /// Contiguous-range patches.
    Run,
    /// Individual byte patches.
    Sparse,
}

impl DeltaMode {
    /// File name prefix of artifacts in this mode.
    pub fn prefix(self) -> &'static str {
        match self {
            DeltaMode::Full => "full",
            DeltaMode::Run => "run",
            DeltaMode::Sparse => "sparse",
        }
    }

    /// Recovers the mode from an artifact file name.
    ///
    /// Anything not starting with `full_` or `run_` is sparse, which also
    /// covers artifacts named `delta_{sequence}.bin`.
    pub fn from_file_name(name: &str) -> Self {
        if name.starts_with("full_") {
            DeltaMode::Full
        } else if name.starts_with("run_") {
            DeltaMode::Run
        } else {
            DeltaMode::Sparse
        }
    }
}

impl fmt::Display for DeltaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Artifact file name for a chunk delta.
pub fn artifact_name(mode: DeltaMode, sequence: usize) -> String {
    format!("{}_{sequence:06}{ARTIFACT_EXTENSION}", mode.prefix())
}

/// Parses an artifact file name into its mode and sequence number.
pub fn parse_artifact_name(name: &str) -> Option<(DeltaMode, usize)> {
    let stem = name.strip_suffix(ARTIFACT_EXTENSION)?;
    let (_, sequence) = stem.rsplit_once('_')?;
    if sequence.is_empty() || !sequence.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((DeltaMode::from_file_name(name), sequence.parse().ok()?))
}

/// Mode-specific delta payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaPayload {
    /// The modified chunk.
    Full(Vec<u8>),
    /// Runs in ascending offset order.
    Run(Vec<Run>),
    /// `(offset, value)` pairs in ascending offset order.
    Sparse(Vec<(usize, u8)>),
}

impl DeltaPayload {
    /// Mode of this payload.
    pub fn mode(&self) -> DeltaMode {
        match self {
            DeltaPayload::Full(_) => DeltaMode::Full,
            DeltaPayload::Run(_) => DeltaMode::Run,
            DeltaPayload::Sparse(_) => DeltaMode::Sparse,
        }
    }

    /// Serializes the payload in its uncompressed wire layout.
    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            DeltaPayload::Full(data) => data.clone(),
            DeltaPayload::Run(runs) => {
                let size = 4 + runs.iter().map(|r| RUN_HEADER_SIZE + r.len()).sum::<usize>();
                let mut out = BufferStream::with_capacity(size);
                out.write_u32(runs.len() as u32);
                for run in runs {
                    out.write_u32(run.start as u32);
                    out.write_u32(run.len() as u32);
                    out.write_bytes(&run.bytes);
                }
                out.into_vec()
            }
            DeltaPayload::Sparse(entries) => {
                let mut out = BufferStream::with_capacity(entries.len() * SPARSE_ENTRY_SIZE);
                for &(index, value) in entries {
                    out.write_u32(index as u32);
                    out.write_u8(value);
                }
                out.into_vec()
            }
        }
    }

    /// Parses an uncompressed payload.
    ///
    /// A payload cut short ends at the last complete entry; the partial
    /// entry is dropped with a warning.
    pub fn parse(mode: DeltaMode, data: Vec<u8>) -> Self {
        match mode {
            DeltaMode::Full => DeltaPayload::Full(data),
            DeltaMode::Run => DeltaPayload::Run(parse_runs(data)),
            DeltaMode::Sparse => DeltaPayload::Sparse(parse_sparse(data)),
        }
    }

    /// Replays the payload against a base chunk.
    ///
    /// `full` ignores the base. `run` and `sparse` start from the base bytes
    /// (or an empty buffer), overwrite positions inside the buffer and
    /// zero-extend it to reach positions past its end.
    pub fn apply(&self, base: Option<&[u8]>) -> Vec<u8> {
        match self {
            DeltaPayload::Full(data) => data.clone(),
            DeltaPayload::Run(runs) => {
                let mut out = base.map(<[u8]>::to_vec).unwrap_or_default();
                for run in runs {
                    if run.start < out.len() {
                        let overlap = run.len().min(out.len() - run.start);
                        out[run.start..run.start + overlap].copy_from_slice(&run.bytes[..overlap]);
                        out.extend_from_slice(&run.bytes[overlap..]);
                    } else {
                        out.resize(run.start, 0);
                        out.extend_from_slice(&run.bytes);
                    }
                }
                out
            }
            DeltaPayload::Sparse(entries) => {
                let mut out = base.map(<[u8]>::to_vec).unwrap_or_default();
                for &(index, value) in entries {
                    if index < out.len() {
                        out[index] = value;
                    } else {
                        out.resize(index, 0);
                        out.push(value);
                    }
                }
                out
            }
        }
    }
}

fn parse_runs(data: Vec<u8>) -> Vec<Run> {
    let mut input = BufferStream::from_vec(data);
    let Some(count) = input.read_u32() else {
        return Vec::new();
    };

    let mut runs = Vec::new();
    for _ in 0..count {
        let run = input.read_u32().and_then(|start| {
            let len = input.read_u32()? as usize;
            let bytes = input.read_bytes(len)?.to_vec();
            Some(Run {
                start: start as usize,
                bytes,
            })
        });
        match run {
            Some(run) => runs.push(run),
            None => {
                warn!("Run payload truncated after {} of {} runs", runs.len(), count);
                break;
            }
        }
    }
    runs
}

fn parse_sparse(data: Vec<u8>) -> Vec<(usize, u8)> {
    let mut input = BufferStream::from_vec(data);
    let mut entries = Vec::with_capacity(input.remaining() / SPARSE_ENTRY_SIZE);

    while input.remaining() > 0 {
        let Some(index) = input.read_u32() else { break };
        let Some(value) = input.read_u8() else { break };
        entries.push((index as usize, value));
    }
    if input.remaining() > 0 || input.position() % SPARSE_ENTRY_SIZE != 0 {
        warn!("Sparse payload truncated after {} entries", entries.len());
    }
    entries
}

/// Delta of one modified chunk against the base chunk at the same sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaRecord {
    /// Shared sequence number of the base and modified chunks.
    pub sequence: usize,
    /// Encoded difference.
    pub payload: DeltaPayload,
}

impl DeltaRecord {
    /// Mode of the payload.
    #[inline]
    pub fn mode(&self) -> DeltaMode {
        self.payload.mode()
    }

    /// Artifact file name for this record.
    pub fn artifact_name(&self) -> String {
        artifact_name(self.mode(), self.sequence)
    }
}

/// Encoding costs used for mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaCost {
    /// Size of the modified chunk.
    pub raw: usize,
    /// Size of a sparse encoding.
    pub sparse: usize,
    /// Size of a run encoding, excluding the run count.
    pub run: usize,
}

impl DeltaCost {
    /// Computes the costs for a set of changes.
    pub fn new(raw: usize, changes: &[(usize, u8)], runs: &[Run]) -> Self {
        Self {
            raw,
            sparse: changes.len() * SPARSE_ENTRY_SIZE,
            run: runs.iter().map(|r| RUN_HEADER_SIZE + r.len()).sum(),
        }
    }

    /// Cheapest mode under these costs.
    pub fn select(&self) -> DeltaMode {
        if self.sparse > self.raw {
            DeltaMode::Full
        } else if self.run < self.sparse {
            DeltaMode::Run
        } else {
            DeltaMode::Sparse
        }
    }
}

/// Encodes the difference between a base chunk and a modified chunk.
///
/// A missing base is treated as an empty chunk. Under
/// [`ShrinkPolicy::Full`], a modified chunk shorter than its base is always
/// stored in `full` mode.
///
/// ```
/// use cdelta::{DeltaMode, ShrinkPolicy, encode_chunk};
///
/// let base = vec![0u8; 100];
/// let mut modified = base.clone();
/// modified[40] = 1;
///
/// let record = encode_chunk(0, Some(&base), &modified, ShrinkPolicy::Full);
/// assert_eq!(record.mode(), DeltaMode::Sparse);
/// assert_eq!(record.payload.apply(Some(&base)), modified);
/// ```
pub fn encode_chunk(
    sequence: usize,
    base: Option<&[u8]>,
    modified: &[u8],
    shrink_policy: ShrinkPolicy,
) -> DeltaRecord {
    let base = base.unwrap_or_default();

    let shrunk = modified.len() < base.len() && shrink_policy == ShrinkPolicy::Full;
    let addressable = u32::try_from(base.len().max(modified.len())).is_ok();
    if shrunk || !addressable {
        return DeltaRecord {
            sequence,
            payload: DeltaPayload::Full(modified.to_vec()),
        };
    }

    let changes = changed_positions(base, modified);
    let runs = group_runs(&changes);
    let payload = match DeltaCost::new(modified.len(), &changes, &runs).select() {
        DeltaMode::Full => DeltaPayload::Full(modified.to_vec()),
        DeltaMode::Run => DeltaPayload::Run(runs),
        DeltaMode::Sparse => DeltaPayload::Sparse(changes),
    };
    DeltaRecord { sequence, payload }
}

/// Compresses a record and writes it into `dir`.
pub fn write_artifact(dir: &Path, record: &DeltaRecord, config: &DeltaConfig) -> Result<PathBuf> {
    let path = dir.join(record.artifact_name());
    let compressed = codec::compress(&record.payload.serialize(), config)?;
    fs::write(&path, compressed)?;
    Ok(path)
}

/// Reads and decompresses an artifact, taking the mode from its file name.
///
/// # Errors
///
/// Returns [`CdcError::MissingDeltaSource`] if the file does not exist and
/// [`CdcError::Compression`] if it is not a valid compressed frame.
pub fn read_artifact(path: &Path) -> Result<DeltaPayload> {
    if !path.is_file() {
        return Err(CdcError::MissingDeltaSource(path.to_path_buf()));
    }
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let mode = DeltaMode::from_file_name(name);
    let payload = codec::decompress(&fs::read(path)?)?;
    Ok(DeltaPayload::parse(mode, payload))
}

/// An artifact found in a delta directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    /// Sequence number embedded in the name.
    pub sequence: usize,
    /// Mode recovered from the name prefix.
    pub mode: DeltaMode,
    /// Location of the artifact.
    pub path: PathBuf,
}

/// Lists the artifacts in a delta directory, sorted by sequence number.
///
/// Files that are not `.bin` or carry no sequence number are ignored.
///
/// # Errors
///
/// Returns [`CdcError::MissingDeltaSource`] if `dir` does not exist and
/// [`CdcError::InvalidArtifactSet`] if two artifacts share a sequence number.
pub fn list_artifacts(dir: &Path) -> Result<Vec<ArtifactEntry>> {
    if !dir.is_dir() {
        return Err(CdcError::MissingDeltaSource(dir.to_path_buf()));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some((mode, sequence)) = name.to_str().and_then(parse_artifact_name) else {
            continue;
        };
        entries.push(ArtifactEntry {
            sequence,
            mode,
            path: entry.path(),
        });
    }
    entries.sort_by_key(|e| e.sequence);

    if let Some(pair) = entries.windows(2).find(|w| w[0].sequence == w[1].sequence) {
        return Err(CdcError::InvalidArtifactSet(format!(
            "sequence {} has both {} and {}",
            pair[0].sequence,
            pair[0].path.display(),
            pair[1].path.display()
        )));
    }
    Ok(entries)
}

/// Counts of artifacts written by [`generate_deltas`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaSummary {
    /// Artifacts stored in `full` mode.
    pub full: usize,
    /// Artifacts stored in `run` mode.
    pub run: usize,
    /// Artifacts stored in `sparse` mode.
    pub sparse: usize,
    /// Total compressed bytes written.
    pub bytes_written: u64,
}

impl DeltaSummary {
    /// Total number of artifacts.
    pub fn artifacts(&self) -> usize {
        self.full + self.run + self.sparse
    }

    fn record(&mut self, mode: DeltaMode, bytes: u64) {
        match mode {
            DeltaMode::Full => self.full += 1,
            DeltaMode::Run => self.run += 1,
            DeltaMode::Sparse => self.sparse += 1,
        }
        self.bytes_written += bytes;
    }
}

/// Removes every artifact in `dir`, leaving other files in place.
///
/// Returns the number of files removed.
pub fn clear_artifacts(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let is_artifact = name.to_str().and_then(parse_artifact_name).is_some();
        if !is_artifact || !entry.file_type()?.is_file() {
            continue;
        }
        fs::remove_file(entry.path())?;
        removed += 1;
    }
    Ok(removed)
}

/// Writes one delta artifact per chunk of the modified version.
///
/// Both directories must hold a manifest written by the chunker. Artifacts
/// already present in `output_dir` are removed first, so the directory only
/// ever describes the latest modified version.
///
/// # Errors
///
/// Returns [`CdcError::MissingManifest`] if either manifest is absent, and
/// I/O or compression errors from writing artifacts.
pub fn generate_deltas(
    base_dir: &Path,
    modified_dir: &Path,
    output_dir: &Path,
    config: &DeltaConfig,
) -> Result<DeltaSummary> {
    config.validate()?;
    let base = Manifest::load(base_dir)?;
    let modified = Manifest::load(modified_dir)?;
    fs::create_dir_all(output_dir)?;

    let stale = clear_artifacts(output_dir)?;
    if stale > 0 {
        warn!("Removed {} stale artifacts from {}", stale, output_dir.display());
    }

    let mut summary = DeltaSummary::default();
    for chunk in &modified {
        let modified_bytes = fs::read(modified_dir.join(chunk.file_name()))?;
        let base_bytes = base.read_chunk(base_dir, chunk.sequence)?;

        let record = encode_chunk(
            chunk.sequence,
            base_bytes.as_deref(),
            &modified_bytes,
            config.shrink_policy,
        );
        let path = write_artifact(output_dir, &record, config)?;
        let written = fs::metadata(&path)?.len();
        debug!(
            "Wrote {} ({} bytes) for chunk {}",
            record.artifact_name(),
            written,
            chunk.file_name()
        );
        summary.record(record.mode(), written);
    }

    info!(
        "Generated {} deltas into {} (full: {}, run: {}, sparse: {}, {} bytes)",
        summary.artifacts(),
        output_dir.display(),
        summary.full,
        summary.run,
        summary.sparse,
        summary.bytes_written
    );
    Ok(summary)
}
