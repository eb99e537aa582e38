//! Steadiness: intra-chip reproducibility against a reference.
//!
//! For a challenge with responses `s_1..s_n` and reference `r`:
//!
//! ```text
//! steadiness = 1 - mean(HD(s_i, r) / bit_len)
//! ```
//!
//! 1.0 means every repeated measurement reproduced the reference exactly.

use serde::Serialize;

use crate::bits::hamming_distance;
use crate::dump::ResponseSet;
use crate::error::{PufError, Result};
use crate::reference::Reference;

/// Steadiness of one chip with its per-challenge spread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChipSteadiness {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub per_challenge: Vec<f64>,
}

/// Across-chip aggregate with asymmetric error bars.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SteadinessSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// `mean - min`
    pub error_low: f64,
    /// `max - mean`
    pub error_high: f64,
    pub per_chip: Vec<f64>,
}

fn check_bit_len(expected: u32, found: u32) -> Result<()> {
    if expected != found {
        return Err(PufError::BitLengthMismatch { expected, found });
    }
    Ok(())
}

fn extremes(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Per-challenge steadiness values, in challenge order.
pub fn steadiness(
    responses: &ResponseSet,
    reference: &Reference,
    response_bit_len: u32,
) -> Result<Vec<f64>> {
    check_bit_len(response_bit_len, responses.bit_len())?;
    check_bit_len(response_bit_len, reference.bit_len())?;
    if response_bit_len == 0 {
        return Err(PufError::EmptySlice);
    }
    let bit_len = response_bit_len as f64;

    let mut out = Vec::with_capacity(responses.challenges().len());
    for (challenge, values) in responses.challenges() {
        if values.is_empty() {
            return Err(PufError::EmptyChallenge {
                challenge: challenge.clone(),
            });
        }
        let r = reference
            .get(challenge)
            .ok_or_else(|| PufError::MissingChallenge {
                challenge: challenge.clone(),
                side: "reference".to_string(),
            })?;
        let distance_sum: f64 = values
            .iter()
            .map(|&s| hamming_distance(s, r) as f64 / bit_len)
            .sum();
        out.push(1.0 - distance_sum / values.len() as f64);
    }
    Ok(out)
}

/// Mean steadiness of one chip across its challenges.
pub fn chip_steadiness(
    responses: &ResponseSet,
    reference: &Reference,
    response_bit_len: u32,
) -> Result<ChipSteadiness> {
    let per_challenge = steadiness(responses, reference, response_bit_len)?;
    if per_challenge.is_empty() {
        return Err(PufError::EmptyInput(
            "chip has no challenges to evaluate steadiness over".to_string(),
        ));
    }
    let mean = per_challenge.iter().sum::<f64>() / per_challenge.len() as f64;
    let (min, max) = extremes(&per_challenge);
    Ok(ChipSteadiness {
        mean,
        min,
        max,
        per_challenge,
    })
}

/// Aggregate per-chip steadiness into mean and `(mean - min, max - mean)`.
pub fn summarize(per_chip: &[f64]) -> Result<SteadinessSummary> {
    if per_chip.is_empty() {
        return Err(PufError::EmptyInput(
            "no chips to aggregate steadiness over".to_string(),
        ));
    }
    let mean = per_chip.iter().sum::<f64>() / per_chip.len() as f64;
    let (min, max) = extremes(per_chip);
    Ok(SteadinessSummary {
        mean,
        min,
        max,
        error_low: mean - min,
        error_high: max - mean,
        per_chip: per_chip.to_vec(),
    })
}
