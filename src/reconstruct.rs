//! Rebuilding modified chunks and files from delta artifacts.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

use crate::chunker::chunk_file;
use crate::config::ChunkerConfig;
use crate::delta::{list_artifacts, read_artifact};
use crate::error::Result;
use crate::manifest::Manifest;

/// Totals for a whole-file reconstruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructSummary {
    /// Number of chunks written.
    pub chunks: usize,
    /// Chunks with no base chunk at their sequence number.
    pub new_chunks: usize,
    /// Size of the reconstructed file.
    pub bytes: u64,
}

/// Applies one artifact to a base chunk and returns the modified chunk.
///
/// The mode is taken from the artifact's file name prefix.
pub fn decode_chunk(base: Option<&[u8]>, artifact_path: &Path) -> Result<Vec<u8>> {
    let payload = read_artifact(artifact_path)?;
    Ok(payload.apply(base))
}

/// Applies one artifact to a base chunk and writes the result to `output_path`.
///
/// Returns the number of bytes written.
pub fn reconstruct_chunk(
    base: Option<&[u8]>,
    artifact_path: &Path,
    output_path: &Path,
) -> Result<usize> {
    let data = decode_chunk(base, artifact_path)?;
    fs::write(output_path, &data)?;
    debug!(
        "Reconstructed {} ({} bytes) from {}",
        output_path.display(),
        data.len(),
        artifact_path.display()
    );
    Ok(data.len())
}

/// Rebuilds a file from a chunked base version and a directory of artifacts.
///
/// Artifacts are applied in ascending sequence order; the base chunk for
/// each comes from `base_dir`'s manifest, or is absent past its end. The
/// output is written to a temporary file next to `output_path` and moved
/// into place only once every chunk has been written.
///
/// # Errors
///
/// Returns [`CdcError::MissingManifest`](crate::CdcError::MissingManifest)
/// or [`CdcError::MissingDeltaSource`](crate::CdcError::MissingDeltaSource)
/// when an input is absent, plus I/O and decompression errors.
pub fn reconstruct_from_manifest(
    base_dir: &Path,
    deltas_dir: &Path,
    output_path: &Path,
) -> Result<ReconstructSummary> {
    let base = Manifest::load(base_dir)?;
    let artifacts = list_artifacts(deltas_dir)?;

    let parent = match output_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let staging = NamedTempFile::new_in(parent)?;
    let mut writer = BufWriter::new(staging);

    let mut summary = ReconstructSummary::default();
    for artifact in &artifacts {
        let base_bytes = base.read_chunk(base_dir, artifact.sequence)?;
        if base_bytes.is_none() {
            summary.new_chunks += 1;
        }
        let chunk = decode_chunk(base_bytes.as_deref(), &artifact.path)?;
        writer.write_all(&chunk)?;

        debug!(
            "Applied {} artifact for chunk {} ({} bytes)",
            artifact.mode,
            artifact.sequence,
            chunk.len()
        );
        summary.chunks += 1;
        summary.bytes += chunk.len() as u64;
    }

    let staging = writer.into_inner().map_err(|e| e.into_error())?;
    staging.persist(output_path).map_err(|e| e.error)?;

    info!(
        "Reconstructed {} ({} chunks, {} new, {} bytes)",
        output_path.display(),
        summary.chunks,
        summary.new_chunks,
        summary.bytes
    );
    Ok(summary)
}

/// Rebuilds a file from the original version and a directory of artifacts.
///
/// The original is re-chunked into a temporary directory with `config`,
/// which must match the parameters used when the artifacts were generated.
pub fn reconstruct_file(
    original: &Path,
    deltas_dir: &Path,
    output_path: &Path,
    config: &ChunkerConfig,
) -> Result<ReconstructSummary> {
    let scratch = TempDir::new()?;
    chunk_file(original, scratch.path(), config)?;
    reconstruct_from_manifest(scratch.path(), deltas_dir, output_path)
}
