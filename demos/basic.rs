//! Basic usage example for cdelta.
//!
//! Chunks two versions of a buffer, stores the second as deltas against the
//! first, and rebuilds it.

use cdelta::{ChunkerConfig, DeltaConfig, chunk_reader, generate_deltas, reconstruct_from_manifest};
use std::fs;

fn main() -> cdelta::Result<()> {
    let work = tempfile::TempDir::new()?;
    let v1 = work.path().join("version1_chunks");
    let v2 = work.path().join("version2_chunks");
    let deltas = work.path().join("deltas");

    // Pseudo-random original with a small edit and an appended tail
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    let original: Vec<u8> = (0..200_000)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 32) as u8
        })
        .collect();
    let mut modified = original.clone();
    modified[50_000..50_016].copy_from_slice(b"edited in place!");
    modified.extend_from_slice(b"appended trailer");

    let config = ChunkerConfig::default();

    println!("=== Chunking ===");
    let m1 = chunk_reader(&original[..], &v1, &config)?;
    let m2 = chunk_reader(&modified[..], &v2, &config)?;
    println!("Original: {} bytes in {} chunks", original.len(), m1.len());
    println!("Modified: {} bytes in {} chunks", modified.len(), m2.len());

    println!();
    println!("=== Generating deltas ===");
    let summary = generate_deltas(&v1, &v2, &deltas, &DeltaConfig::default())?;
    println!(
        "{} artifacts (full: {}, run: {}, sparse: {}), {} bytes",
        summary.artifacts(),
        summary.full,
        summary.run,
        summary.sparse,
        summary.bytes_written
    );
    println!(
        "Compression: {:.1}% of modified size",
        summary.bytes_written as f64 / modified.len() as f64 * 100.0
    );

    println!();
    println!("=== Reconstructing ===");
    let output = work.path().join("rebuilt.bin");
    let rebuilt = reconstruct_from_manifest(&v1, &deltas, &output)?;
    assert_eq!(fs::read(&output)?, modified);
    println!("✓ Rebuilt {} bytes from {} chunks", rebuilt.bytes, rebuilt.chunks);

    Ok(())
}
