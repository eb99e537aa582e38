//! Per-challenge majority-vote reference responses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bits::bitwise_mode;
use crate::dump::{ResponseSet, SweepValue};
use crate::error::{PufError, Result};

/// Canonical response per challenge for one chip at one sweep point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    bit_len: u32,
    responses: BTreeMap<String, u64>,
}

impl Reference {
    pub fn new(bit_len: u32, responses: BTreeMap<String, u64>) -> Self {
        Self { bit_len, responses }
    }

    pub fn bit_len(&self) -> u32 {
        self.bit_len
    }

    pub fn get(&self, challenge: &str) -> Option<u64> {
        self.responses.get(challenge).copied()
    }

    pub fn responses(&self) -> &BTreeMap<String, u64> {
        &self.responses
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

/// Where steadiness references come from during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceMode {
    /// Recompute at every sweep point from that point's own samples.
    #[default]
    Sliding,
    /// Compute once at the given sweep value and reuse for every point.
    Fixed(SweepValue),
}

/// Bitwise mode of every challenge's responses.
///
/// A challenge without responses is an error: an empty sample list here means
/// the sweep filter selected nothing, and a zero reference would hide that.
pub fn derive_reference(responses: &ResponseSet) -> Result<Reference> {
    let bit_len = responses.bit_len();
    let mut out = BTreeMap::new();
    for (challenge, values) in responses.challenges() {
        if values.is_empty() {
            return Err(PufError::EmptyInput(format!(
                "no responses for challenge '{challenge}' to derive a reference from"
            )));
        }
        out.insert(challenge.clone(), bitwise_mode(values, bit_len)?);
    }
    if out.is_empty() {
        return Err(PufError::EmptyInput(
            "no challenges to derive a reference from".to_string(),
        ));
    }
    Ok(Reference::new(bit_len, out))
}
