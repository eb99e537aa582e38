//! Challenge-response dataset model and sweep filtering.
//!
//! A [`Dataset`] is an ordered list of [`ChipDump`]s, one per physical chip.
//! Each chip maps challenge labels (`"<cell0>:<cell1>"`) to the samples
//! captured under that challenge, in acquisition order. Samples optionally
//! carry sweep attributes such as `offset` (clock cycles) or `voltage`
//! (volts); samples without any attribute form the "plain" dataset.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bits::BitSlice;
use crate::error::Result;
use crate::response::ResponseFormat;

/// Sweep key used by offset (clock cycle) sweeps.
pub const OFFSET_KEY: &str = "offset";
/// Sweep key used by supply voltage sweeps.
pub const VOLTAGE_KEY: &str = "voltage";

// ---------------------------------------------------------------------------
// Sweep values
// ---------------------------------------------------------------------------

/// Value of a sweep attribute. Integers and floats compare numerically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SweepValue {
    Int(i64),
    Float(f64),
}

impl SweepValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

impl PartialEq for SweepValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl PartialOrd for SweepValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl From<i64> for SweepValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for SweepValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl fmt::Display for SweepValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

impl FromStr for SweepValue {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(v) = s.parse::<i64>() {
            return Ok(Self::Int(v));
        }
        s.parse::<f64>()
            .map(Self::Float)
            .map_err(|_| format!("invalid sweep value '{s}'"))
    }
}

/// Which slice of the acquisition sweep to keep.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepPoint {
    /// Samples carrying no sweep attributes at all.
    Plain,
    /// Samples whose `key` attribute equals `value`.
    At { key: String, value: SweepValue },
}

impl SweepPoint {
    pub fn at(key: impl Into<String>, value: SweepValue) -> Self {
        Self::At {
            key: key.into(),
            value,
        }
    }

    /// The sweep value, `None` for the plain dataset.
    pub fn value(&self) -> Option<SweepValue> {
        match self {
            Self::Plain => None,
            Self::At { value, .. } => Some(*value),
        }
    }

    pub fn matches(&self, sample: &Sample) -> bool {
        match self {
            Self::Plain => sample.is_plain(),
            Self::At { key, value } => sample.sweep_value(key) == Some(value),
        }
    }
}

impl fmt::Display for SweepPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::At { key, value } => write!(f, "{key}={value}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Samples and dumps
// ---------------------------------------------------------------------------

/// One raw measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: i64,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, SweepValue>,
}

impl Sample {
    /// Plain sample without sweep attributes.
    pub fn new(value: i64) -> Self {
        Self {
            value,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<SweepValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn sweep_value(&self, key: &str) -> Option<&SweepValue> {
        self.attributes.get(key)
    }

    pub fn is_plain(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Challenge → samples for one chip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChipDump {
    pub challenges: BTreeMap<String, Vec<Sample>>,
}

impl ChipDump {
    pub fn new(challenges: BTreeMap<String, Vec<Sample>>) -> Self {
        Self { challenges }
    }

    /// Build from raw plain values, mostly useful in tests and tooling.
    pub fn from_values<I, S>(challenges: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<i64>)>,
        S: Into<String>,
    {
        Self {
            challenges: challenges
                .into_iter()
                .map(|(c, values)| (c.into(), values.into_iter().map(Sample::new).collect()))
                .collect(),
        }
    }

    pub fn challenge_count(&self) -> usize {
        self.challenges.len()
    }

    pub fn sample_count(&self) -> usize {
        self.challenges.values().map(Vec::len).sum()
    }

    /// Normalize every sample into a canonical response word.
    pub fn normalize(&self, format: &ResponseFormat, slice: Option<&BitSlice>) -> Result<ResponseSet> {
        let bit_len = format.response_bit_len(slice)?;
        let mut challenges = BTreeMap::new();
        for (challenge, samples) in &self.challenges {
            let responses = samples
                .iter()
                .map(|s| format.normalize(s.value, slice))
                .collect::<Result<Vec<u64>>>()?;
            challenges.insert(challenge.clone(), responses);
        }
        Ok(ResponseSet {
            bit_len,
            challenges,
        })
    }
}

/// Ordered chips of one evaluation run. Index = chip identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    pub chips: Vec<ChipDump>,
}

impl Dataset {
    pub fn new(chips: Vec<ChipDump>) -> Self {
        Self { chips }
    }

    pub fn chip_count(&self) -> usize {
        self.chips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    /// All sweep attribute keys appearing anywhere in the dataset.
    pub fn sweep_keys(&self) -> Vec<String> {
        let keys: BTreeSet<&String> = self
            .chips
            .iter()
            .flat_map(|chip| chip.challenges.values())
            .flatten()
            .flat_map(|sample| sample.attributes.keys())
            .collect();
        keys.into_iter().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Keep only the samples at `point`. Every challenge key survives, possibly
/// with an empty sample list.
pub fn filter_by_sweep(chip_dump: &ChipDump, point: &SweepPoint) -> ChipDump {
    let challenges = chip_dump
        .challenges
        .iter()
        .map(|(challenge, samples)| {
            let kept = samples
                .iter()
                .filter(|s| point.matches(s))
                .cloned()
                .collect();
            (challenge.clone(), kept)
        })
        .collect();
    ChipDump { challenges }
}

/// Distinct values of `sweep_key` in first-occurrence order, scanned from the
/// first chip's first challenge. That challenge is assumed to cover the whole
/// sweep domain of the dataset.
pub fn distinct_sweep_values(dataset: &Dataset, sweep_key: &str) -> Vec<SweepValue> {
    let mut values: Vec<SweepValue> = Vec::new();
    let Some(samples) = dataset
        .chips
        .first()
        .and_then(|chip| chip.challenges.values().next())
    else {
        return values;
    };
    for value in samples.iter().filter_map(|s| s.sweep_value(sweep_key)) {
        if !values.contains(value) {
            values.push(*value);
        }
    }
    values
}

// ---------------------------------------------------------------------------
// Normalized responses
// ---------------------------------------------------------------------------

/// Normalized responses of one chip at one sweep point, all of `bit_len` bits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSet {
    bit_len: u32,
    challenges: BTreeMap<String, Vec<u64>>,
}

impl ResponseSet {
    pub fn new(bit_len: u32, challenges: BTreeMap<String, Vec<u64>>) -> Self {
        Self {
            bit_len,
            challenges,
        }
    }

    pub fn bit_len(&self) -> u32 {
        self.bit_len
    }

    pub fn challenges(&self) -> &BTreeMap<String, Vec<u64>> {
        &self.challenges
    }

    pub fn responses(&self, challenge: &str) -> Option<&[u64]> {
        self.challenges.get(challenge).map(Vec::as_slice)
    }

    pub fn response_count(&self) -> usize {
        self.challenges.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseVariant;

    fn swept_chip() -> ChipDump {
        let samples = vec![
            Sample::new(7),
            Sample::new(1).with_attribute(OFFSET_KEY, 0i64),
            Sample::new(2).with_attribute(OFFSET_KEY, 10i64),
            Sample::new(3).with_attribute(OFFSET_KEY, 0i64),
            Sample::new(4).with_attribute(OFFSET_KEY, 20i64),
        ];
        let mut challenges = BTreeMap::new();
        challenges.insert("0:1".to_string(), samples.clone());
        challenges.insert("1:0".to_string(), samples);
        ChipDump::new(challenges)
    }

    #[test]
    fn test_sweep_value_numeric_equality() {
        assert_eq!(SweepValue::Int(3), SweepValue::Float(3.0));
        assert_ne!(SweepValue::Float(1.1), SweepValue::Float(1.12));
        assert!(SweepValue::Int(1) < SweepValue::Float(1.5));
    }

    #[test]
    fn test_sweep_value_parse() {
        assert_eq!("20".parse::<SweepValue>().unwrap(), SweepValue::Int(20));
        assert!(matches!(
            "1.15".parse::<SweepValue>().unwrap(),
            SweepValue::Float(v) if (v - 1.15).abs() < 1e-12
        ));
        assert!("abc".parse::<SweepValue>().is_err());
    }

    #[test]
    fn test_filter_by_sweep_value() {
        let chip = swept_chip();
        let filtered = filter_by_sweep(&chip, &SweepPoint::at(OFFSET_KEY, SweepValue::Int(0)));
        assert_eq!(filtered.challenge_count(), 2);
        let values: Vec<i64> = filtered.challenges["0:1"].iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1, 3]);
    }

    #[test]
    fn test_filter_plain_keeps_unattributed_only() {
        let chip = swept_chip();
        let filtered = filter_by_sweep(&chip, &SweepPoint::Plain);
        let values: Vec<i64> = filtered.challenges["1:0"].iter().map(|s| s.value).collect();
        assert_eq!(values, vec![7]);
    }

    #[test]
    fn test_filter_absent_key_leaves_empty_challenges() {
        let chip = swept_chip();
        let filtered = filter_by_sweep(&chip, &SweepPoint::at(VOLTAGE_KEY, SweepValue::Float(1.2)));
        assert_eq!(filtered.challenge_count(), 2);
        assert!(filtered.challenges.values().all(Vec::is_empty));
    }

    #[test]
    fn test_distinct_sweep_values_first_occurrence_order() {
        let dataset = Dataset::new(vec![swept_chip()]);
        let values = distinct_sweep_values(&dataset, OFFSET_KEY);
        assert_eq!(
            values,
            vec![SweepValue::Int(0), SweepValue::Int(10), SweepValue::Int(20)]
        );
        assert!(distinct_sweep_values(&dataset, VOLTAGE_KEY).is_empty());
        assert!(distinct_sweep_values(&Dataset::default(), OFFSET_KEY).is_empty());
    }

    #[test]
    fn test_sweep_keys() {
        let plain = ChipDump::from_values([("0:1", vec![1, 2])]);
        let dataset = Dataset::new(vec![swept_chip(), plain]);
        assert_eq!(dataset.sweep_keys(), vec![OFFSET_KEY.to_string()]);
    }

    #[test]
    fn test_sample_deserializes_attributes() {
        let json = r#"[{"value": -12}, {"value": 5, "offset": 10}, {"value": 1, "voltage": 1.15}]"#;
        let samples: Vec<Sample> = serde_json::from_str(json).unwrap();
        assert!(samples[0].is_plain());
        assert_eq!(samples[0].value, -12);
        assert_eq!(samples[1].sweep_value(OFFSET_KEY), Some(&SweepValue::Int(10)));
        assert_eq!(
            samples[2].sweep_value(VOLTAGE_KEY),
            Some(&SweepValue::Float(1.15))
        );
    }

    #[test]
    fn test_normalize_chip() {
        let chip = ChipDump::from_values([("0:1", vec![5, -5, 0])]);
        let set = chip
            .normalize(&ResponseFormat::new(ResponseVariant::Sign), None)
            .unwrap();
        assert_eq!(set.bit_len(), 1);
        assert_eq!(set.responses("0:1").unwrap(), &[1, 0, 0]);
        assert_eq!(set.response_count(), 3);
    }
}
