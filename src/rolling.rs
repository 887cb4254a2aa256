//! Polynomial rolling hash used for boundary detection.
//!
//! The hash of a window `b[0..w]` is `Σ b[i] · BASE^(w-1-i)` with all
//! arithmetic wrapping at 64 bits. It is only a boundary signal, never a
//! content identifier.

/// Multiplicative base of the polynomial.
pub const BASE: u64 = 257;

/// Rolling hash state over a fixed-width trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingHash {
    hash: u64,
    power: u64,
    window_size: usize,
}

impl RollingHash {
    /// Creates an empty hash for windows of `window_size` bytes.
    pub fn new(window_size: usize) -> Self {
        Self {
            hash: 0,
            power: window_power(window_size),
            window_size,
        }
    }

    /// Clears the hash value, keeping the precomputed power.
    #[inline]
    pub fn reset(&mut self) {
        self.hash = 0;
    }

    /// Current hash value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.hash
    }

    /// Width of the window in bytes.
    #[inline]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Appends a byte while the window is still filling.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.hash = self.hash.wrapping_mul(BASE).wrapping_add(u64::from(byte));
    }

    /// Slides the full window by one byte.
    #[inline]
    pub fn roll(&mut self, outgoing: u8, incoming: u8) {
        self.hash = self
            .hash
            .wrapping_sub(u64::from(outgoing).wrapping_mul(self.power));
        self.push(incoming);
    }
}

/// Computes `BASE^(window_size - 1) mod 2^64`.
fn window_power(window_size: usize) -> u64 {
    (1..window_size).fold(1u64, |power, _| power.wrapping_mul(BASE))
}

/// Hashes a complete window from scratch.
pub fn hash_window(window: &[u8]) -> u64 {
    let mut hash = RollingHash::new(window.len());
    for &byte in window {
        hash.push(byte);
    }
    hash.value()
}
