//! Stateless bit-level transforms used by the response normalizer and the
//! metric evaluators.
//!
//! Responses are carried as `u64` words. Bit positions in a [`BitSlice`] are
//! counted most-significant first: position 0 is the top bit of the word.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PufError, Result};

/// Largest supported response word.
pub const MAX_WORD_WIDTH: u32 = 64;

// ---------------------------------------------------------------------------
// Distances
// ---------------------------------------------------------------------------

/// Number of differing bits between `a` and `b`.
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// Number of set bits in `n`.
pub fn hamming_weight(n: u64) -> u32 {
    n.count_ones()
}

// ---------------------------------------------------------------------------
// Word transforms
// ---------------------------------------------------------------------------

/// Collapse single-bit counter transitions: `n ^ (n >> 1)`.
pub fn gray_decode(n: u64) -> u64 {
    n ^ (n >> 1)
}

/// Inverse of [`gray_decode`] (prefix XOR from the top bit down).
pub fn gray_encode(n: u64) -> u64 {
    let mut x = n;
    let mut shift = 1;
    while shift < MAX_WORD_WIDTH {
        x ^= x >> shift;
        shift <<= 1;
    }
    x
}

/// All-ones mask of `width` bits.
pub fn word_mask(width: u32) -> u64 {
    if width >= MAX_WORD_WIDTH {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

fn check_width(width: u32) -> Result<()> {
    if width == 0 || width > MAX_WORD_WIDTH {
        return Err(PufError::InvalidWidth(width));
    }
    Ok(())
}

/// Reinterpret the low `width` bits of `n` as a signed integer
/// (sign bit = `width - 1`).
pub fn twos_complement(n: u64, width: u32) -> Result<i64> {
    check_width(width)?;
    if width == MAX_WORD_WIDTH {
        return Ok(n as i64);
    }
    let n = n & word_mask(width);
    let sign = 1u64 << (width - 1);
    if n & sign != 0 {
        Ok(n as i64 - (1i64 << width))
    } else {
        Ok(n as i64)
    }
}

/// Extract the bits at `positions` (MSB-first within a `width`-bit word) and
/// pack them, first position highest, into a `positions.len()`-bit integer.
pub fn bit_slice(n: u64, positions: &[u32], width: u32) -> Result<u64> {
    check_width(width)?;
    if positions.is_empty() {
        return Err(PufError::EmptySlice);
    }
    if positions.len() > MAX_WORD_WIDTH as usize {
        return Err(PufError::InvalidWidth(positions.len() as u32));
    }
    let mut out = 0u64;
    for &position in positions {
        if position >= width {
            return Err(PufError::InvalidSlice { position, width });
        }
        let bit = (n >> (width - 1 - position)) & 1;
        out = (out << 1) | bit;
    }
    Ok(out)
}

/// Per-bit majority over `values`, reassembled into a `width`-bit word.
///
/// An exact 50/50 split at a bit position resolves to 0.
pub fn bitwise_mode(values: &[u64], width: u32) -> Result<u64> {
    check_width(width)?;
    if values.is_empty() {
        return Err(PufError::EmptyInput(
            "bitwise mode over zero values".to_string(),
        ));
    }
    let n = values.len();
    let mut mode = 0u64;
    for bit in 0..width {
        let ones = values.iter().filter(|&&v| (v >> bit) & 1 == 1).count();
        if ones * 2 > n {
            mode |= 1 << bit;
        }
    }
    Ok(mode)
}

// ---------------------------------------------------------------------------
// Bit slices
// ---------------------------------------------------------------------------

/// Ordered selection of bit positions (MSB-first) forming a sub-word.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BitSlice {
    positions: Vec<u32>,
}

impl BitSlice {
    /// Slice from explicit positions, kept in the given order.
    pub fn from_positions(positions: Vec<u32>) -> Result<Self> {
        if positions.is_empty() {
            return Err(PufError::EmptySlice);
        }
        Ok(Self { positions })
    }

    /// Contiguous half-open range `start..end`.
    pub fn range(start: u32, end: u32) -> Result<Self> {
        Self::from_positions((start..end).collect())
    }

    /// A single bit.
    pub fn single(position: u32) -> Self {
        Self {
            positions: vec![position],
        }
    }

    /// One single-bit slice per position of a `width`-bit word.
    pub fn per_bit(width: u32) -> Vec<Self> {
        (0..width).map(Self::single).collect()
    }

    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    /// Effective response bit-length under this slice.
    pub fn len(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Fail early if any position is outside a `width`-bit word.
    pub fn validate(&self, width: u32) -> Result<()> {
        check_width(width)?;
        if self.positions.is_empty() {
            return Err(PufError::EmptySlice);
        }
        if self.positions.len() > MAX_WORD_WIDTH as usize {
            return Err(PufError::InvalidWidth(self.len()));
        }
        match self.positions.iter().find(|&&p| p >= width) {
            Some(&position) => Err(PufError::InvalidSlice { position, width }),
            None => Ok(()),
        }
    }

    /// Apply to a `width`-bit word.
    pub fn apply(&self, n: u64, width: u32) -> Result<u64> {
        bit_slice(n, &self.positions, width)
    }
}

impl fmt::Display for BitSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let contiguous = self.positions.windows(2).all(|w| w[1] == w[0] + 1);
        match self.positions.as_slice() {
            [single] => write!(f, "{single}"),
            [first, .., last] if contiguous => write!(f, "{first}..{}", last + 1),
            positions => {
                let parts: Vec<String> = positions.iter().map(|p| p.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

impl FromStr for BitSlice {
    type Err = String;

    /// Accepts `"4..8"` (half-open range) or `"0,3,7"` (explicit positions).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((start, end)) = s.split_once("..") {
            let start: u32 = start
                .trim()
                .parse()
                .map_err(|_| format!("invalid slice start in '{s}'"))?;
            let end: u32 = end
                .trim()
                .parse()
                .map_err(|_| format!("invalid slice end in '{s}'"))?;
            if end <= start {
                return Err(format!("empty slice range '{s}'"));
            }
            return Self::range(start, end).map_err(|e| e.to_string());
        }
        let positions = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<u32>()
                    .map_err(|_| format!("invalid bit position '{}'", p.trim()))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Self::from_positions(positions).map_err(|e| e.to_string())
    }
}
