//! Randomness: per-bit bias of the whole response population at one sweep
//! point (all chips, all challenges, all samples).
//!
//! For each bit position with frequency of ones `p`:
//! - bias `|p − 0.5|`
//! - min-entropy `−log2(max(p, 1 − p))` bits
//! - monobit frequency-test p-value `erfc(|2·ones − n| / √(2n))`
//!
//! The aggregate min-entropy is the minimum over bit positions.

use serde::Serialize;
use statrs::function::erf::erfc;

use crate::dump::ResponseSet;
use crate::error::{PufError, Result};

/// Below this p-value a bit position is flagged as biased.
pub const BIAS_SIGNIFICANCE: f64 = 0.01;

/// Statistics for one bit position (0 = most significant).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BitFrequency {
    pub position: u32,
    pub ones: u64,
    pub total: u64,
    pub frequency: f64,
    pub bias: f64,
    pub min_entropy: f64,
    pub p_value: f64,
}

impl BitFrequency {
    pub fn is_biased(&self) -> bool {
        self.p_value < BIAS_SIGNIFICANCE
    }
}

/// Randomness of the response population at one sweep point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RandomnessReport {
    pub bit_len: u32,
    pub responses: u64,
    pub bits: Vec<BitFrequency>,
    /// Minimum per-bit min-entropy.
    pub min_entropy: f64,
    pub mean_min_entropy: f64,
    /// Mean of per-bit `|p − 0.5|`.
    pub overall_bias: f64,
}

impl RandomnessReport {
    pub fn biased_positions(&self) -> Vec<u32> {
        self.bits
            .iter()
            .filter(|b| b.is_biased())
            .map(|b| b.position)
            .collect()
    }
}

fn bit_frequency(position: u32, ones: u64, total: u64) -> BitFrequency {
    let n = total as f64;
    let frequency = ones as f64 / n;
    let p_max = frequency.max(1.0 - frequency);
    let min_entropy = (-p_max.log2()).max(0.0);
    let s_obs = (2.0 * ones as f64 - n).abs() / n.sqrt();
    let p_value = erfc(s_obs / std::f64::consts::SQRT_2);
    BitFrequency {
        position,
        ones,
        total,
        frequency,
        bias: (frequency - 0.5).abs(),
        min_entropy,
        p_value,
    }
}

/// Per-bit frequency and min-entropy over every response of every chip.
pub fn randomness(response_sets: &[ResponseSet], response_bit_len: u32) -> Result<RandomnessReport> {
    if response_bit_len == 0 {
        return Err(PufError::EmptySlice);
    }
    let width = response_bit_len as usize;
    let mut ones = vec![0u64; width];
    let mut total = 0u64;

    for set in response_sets {
        if set.bit_len() != response_bit_len {
            return Err(PufError::BitLengthMismatch {
                expected: response_bit_len,
                found: set.bit_len(),
            });
        }
        for &response in set.challenges().values().flatten() {
            total += 1;
            for (position, count) in ones.iter_mut().enumerate() {
                let shift = width - 1 - position;
                *count += (response >> shift) & 1;
            }
        }
    }
    if total == 0 {
        return Err(PufError::EmptyInput(
            "no responses to estimate randomness from".to_string(),
        ));
    }

    let bits: Vec<BitFrequency> = ones
        .iter()
        .enumerate()
        .map(|(position, &count)| bit_frequency(position as u32, count, total))
        .collect();
    let min_entropy = bits
        .iter()
        .map(|b| b.min_entropy)
        .fold(f64::INFINITY, f64::min);
    let mean_min_entropy = bits.iter().map(|b| b.min_entropy).sum::<f64>() / width as f64;
    let overall_bias = bits.iter().map(|b| b.bias).sum::<f64>() / width as f64;

    Ok(RandomnessReport {
        bit_len: response_bit_len,
        responses: total,
        bits,
        min_entropy,
        mean_min_entropy,
        overall_bias,
    })
}
