//! Position-wise byte comparison of two chunks.

/// A maximal range of consecutive changed positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    /// Offset of the first changed byte.
    pub start: usize,
    /// Modified-side values for `start..start + bytes.len()`.
    pub bytes: Vec<u8>,
}

impl Run {
    /// Number of bytes covered by the run.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the run covers no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Offset one past the last byte of the run.
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.bytes.len()
    }
}

/// Lists every position where `base` and `modified` differ, in ascending order.
///
/// Positions past the end of `base` always count as changed. Positions past
/// the end of `modified` are recorded with the value `0`.
pub fn changed_positions(base: &[u8], modified: &[u8]) -> Vec<(usize, u8)> {
    let common = base.len().min(modified.len());
    let mut changes = Vec::new();

    let mut pos = 0;
    while pos < common {
        pos = skip_equal(base, modified, pos, common);
        if pos < common {
            changes.push((pos, modified[pos]));
            pos += 1;
        }
    }

    if modified.len() > common {
        changes.extend((common..modified.len()).map(|i| (i, modified[i])));
    } else {
        changes.extend((common..base.len()).map(|i| (i, 0)));
    }
    changes
}

/// Advances from `pos` past bytes that are equal on both sides.
fn skip_equal(a: &[u8], b: &[u8], mut pos: usize, end: usize) -> usize {
    #[cfg(feature = "simd")]
    {
        use wide::u8x16;

        // Skip 16 bytes at a time with SIMD
        while pos + 16 <= end {
            let (Ok(a_block), Ok(b_block)) = (
                <[u8; 16]>::try_from(&a[pos..pos + 16]),
                <[u8; 16]>::try_from(&b[pos..pos + 16]),
            ) else {
                break;
            };
            if u8x16::new(a_block) != u8x16::new(b_block) {
                break;
            }
            pos += 16;
        }
    }

    // Skip 8-byte words
    while pos + 8 <= end && a[pos..pos + 8] == b[pos..pos + 8] {
        pos += 8;
    }

    while pos < end && a[pos] == b[pos] {
        pos += 1;
    }
    pos
}

/// Groups ascending changed positions into maximal runs.
pub fn group_runs(changes: &[(usize, u8)]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for &(index, value) in changes {
        match runs.last_mut() {
            Some(run) if run.end() == index => run.bytes.push(value),
            _ => runs.push(Run {
                start: index,
                bytes: vec![value],
            }),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_chunks() {
        let data: Vec<u8> = (0..100).collect();
        assert!(changed_positions(&data, &data).is_empty());
    }

    #[test]
    fn test_single_byte_change() {
        let base = vec![0u8; 64];
        let mut modified = base.clone();
        modified[37] = 9;
        assert_eq!(changed_positions(&base, &modified), vec![(37, 9)]);
    }

    #[test]
    fn test_changes_across_blocks() {
        let base: Vec<u8> = (0..=255).collect();
        let mut modified = base.clone();
        for i in [0, 15, 16, 17, 100, 255] {
            modified[i] = modified[i].wrapping_add(1);
        }
        let positions: Vec<usize> = changed_positions(&base, &modified)
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        assert_eq!(positions, vec![0, 15, 16, 17, 100, 255]);
    }

    #[test]
    fn test_modified_longer() {
        let base = b"abc";
        let modified = b"abc\0z";
        assert_eq!(changed_positions(base, modified), vec![(3, 0), (4, b'z')]);
    }

    #[test]
    fn test_modified_shorter_records_zero() {
        let base = b"abcde";
        let modified = b"abX";
        assert_eq!(
            changed_positions(base, modified),
            vec![(2, b'X'), (3, 0), (4, 0)]
        );
    }

    #[test]
    fn test_group_runs() {
        let changes = vec![(2, 1), (3, 2), (4, 3), (10, 4), (12, 5), (13, 6)];
        let runs = group_runs(&changes);
        assert_eq!(
            runs,
            vec![
                Run { start: 2, bytes: vec![1, 2, 3] },
                Run { start: 10, bytes: vec![4] },
                Run { start: 12, bytes: vec![5, 6] },
            ]
        );
        assert!(group_runs(&[]).is_empty());
    }
}
