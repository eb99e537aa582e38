//! Uniqueness: inter-chip distinguishability.
//!
//! Averaged over all `k·(k−1)` ordered pairs of distinct chips, each pair
//! contributing the mean over challenges of
//! `HD(ref_i[c], ref_j[c]) / bit_len`. Ideal value 0.5. A single chip is
//! defined to have uniqueness 1.

use serde::Serialize;

use crate::bits::hamming_distance;
use crate::error::{PufError, Result};
use crate::reference::Reference;

/// Mean normalized distance for one ordered chip pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChipPair {
    pub chip_a: usize,
    pub chip_b: usize,
    pub distance: f64,
}

/// Mean normalized distance of every ordered pair `(i, j)`, `i != j`.
pub fn pairwise_uniqueness(references: &[Reference], response_bit_len: u32) -> Result<Vec<ChipPair>> {
    if response_bit_len == 0 {
        return Err(PufError::EmptySlice);
    }
    for reference in references {
        if reference.bit_len() != response_bit_len {
            return Err(PufError::BitLengthMismatch {
                expected: response_bit_len,
                found: reference.bit_len(),
            });
        }
    }
    let bit_len = response_bit_len as f64;

    let mut pairs = Vec::with_capacity(references.len() * references.len().saturating_sub(1));
    for (i, a) in references.iter().enumerate() {
        for (j, b) in references.iter().enumerate() {
            if i == j {
                continue;
            }
            if a.is_empty() {
                return Err(PufError::EmptyInput(format!(
                    "chip {i} has no challenges to compare"
                )));
            }
            let mut sum = 0.0;
            for (challenge, &ra) in a.responses() {
                let rb = b.get(challenge).ok_or_else(|| PufError::MissingChallenge {
                    challenge: challenge.clone(),
                    side: format!("chip {j}"),
                })?;
                sum += hamming_distance(ra, rb) as f64 / bit_len;
            }
            pairs.push(ChipPair {
                chip_a: i,
                chip_b: j,
                distance: sum / a.len() as f64,
            });
        }
    }
    Ok(pairs)
}

/// Uniqueness over the per-chip references of one sweep point.
pub fn uniqueness(references: &[Reference], response_bit_len: u32) -> Result<f64> {
    match references.len() {
        0 => Err(PufError::EmptyInput(
            "no chips to evaluate uniqueness over".to_string(),
        )),
        1 => {
            if references[0].bit_len() != response_bit_len {
                return Err(PufError::BitLengthMismatch {
                    expected: response_bit_len,
                    found: references[0].bit_len(),
                });
            }
            Ok(1.0)
        }
        k => {
            let pairs = pairwise_uniqueness(references, response_bit_len)?;
            let sum: f64 = pairs.iter().map(|p| p.distance).sum();
            Ok(sum / (k * (k - 1)) as f64)
        }
    }
}
