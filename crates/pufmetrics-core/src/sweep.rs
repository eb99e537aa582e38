//! Sweep driver: evaluates uniqueness, steadiness and (optionally) randomness
//! at every (bit slice, sweep value) point of a dataset.
//!
//! Every parameter is explicit in [`EvaluationConfig`]. Points share only the
//! immutable [`Dataset`], so the grid is evaluated in parallel with rayon;
//! indexed collection keeps results in the requested order.

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bits::BitSlice;
use crate::dump::{Dataset, SweepPoint, SweepValue, distinct_sweep_values, filter_by_sweep};
use crate::error::{PufError, Result};
use crate::randomness::{RandomnessReport, randomness};
use crate::reference::{Reference, ReferenceMode, derive_reference};
use crate::response::{ResponseFormat, ResponseVariant};
use crate::steadiness::{ChipSteadiness, chip_steadiness, summarize};
use crate::uniqueness::uniqueness;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when one (slice, sweep value) point fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the whole evaluation at the first failing point.
    #[default]
    Abort,
    /// Record the failure and carry on with the remaining points.
    Continue,
}

/// Parameters of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub variant: ResponseVariant,
    /// Raw word width; the variant's default when `None`.
    pub word_width: Option<u32>,
    /// Sample attribute swept over (`offset`, `voltage`); `None` evaluates
    /// the plain samples once.
    pub sweep_key: Option<String>,
    /// Explicit sweep values; discovered from the dataset when `None`.
    pub sweep_values: Option<Vec<SweepValue>>,
    /// Bit slices to evaluate independently; empty means "no slice".
    pub bit_slices: Vec<BitSlice>,
    pub reference_mode: ReferenceMode,
    pub randomness: bool,
    pub failure_policy: FailurePolicy,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            variant: ResponseVariant::Sign,
            word_width: None,
            sweep_key: None,
            sweep_values: None,
            bit_slices: Vec::new(),
            reference_mode: ReferenceMode::Sliding,
            randomness: false,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl EvaluationConfig {
    pub fn format(&self) -> Result<ResponseFormat> {
        match self.word_width {
            Some(width) => ResponseFormat::with_word_width(self.variant, width),
            None => Ok(ResponseFormat::new(self.variant)),
        }
    }

    /// Sweep points in evaluation order.
    pub fn sweep_points(&self, dataset: &Dataset) -> Result<Vec<SweepPoint>> {
        let Some(key) = &self.sweep_key else {
            return Ok(vec![SweepPoint::Plain]);
        };
        let values = match &self.sweep_values {
            Some(values) => values.clone(),
            None => distinct_sweep_values(dataset, key),
        };
        if values.is_empty() {
            return Err(PufError::EmptyInput(format!(
                "no values found for sweep key '{key}'"
            )));
        }
        Ok(values
            .into_iter()
            .map(|value| SweepPoint::at(key.clone(), value))
            .collect())
    }

    fn slices(&self) -> Vec<Option<BitSlice>> {
        if self.bit_slices.is_empty() {
            vec![None]
        } else {
            self.bit_slices.iter().cloned().map(Some).collect()
        }
    }

    fn fixed_point(&self) -> Option<SweepPoint> {
        match self.reference_mode {
            ReferenceMode::Sliding => None,
            ReferenceMode::Fixed(value) => Some(match &self.sweep_key {
                Some(key) => SweepPoint::at(key.clone(), value),
                None => SweepPoint::Plain,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Metrics at one sweep point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub sweep_value: Option<SweepValue>,
    pub uniqueness: f64,
    pub steadiness_mean: f64,
    pub steadiness_error_low: f64,
    pub steadiness_error_high: f64,
    pub chip_steadiness: Vec<ChipSteadiness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub randomness: Option<RandomnessReport>,
}

/// A point that failed under [`FailurePolicy::Continue`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointFailure {
    pub sweep_value: Option<SweepValue>,
    pub error: PufErrorReport,
}

/// Serializable rendering of a [`PufError`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PufErrorReport {
    pub message: String,
    #[serde(skip)]
    pub error: Option<PufError>,
}

impl From<PufError> for PufErrorReport {
    fn from(error: PufError) -> Self {
        Self {
            message: error.to_string(),
            error: Some(error),
        }
    }
}

/// Ordered result series for one bit slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceSeries {
    /// `None` when the full response word is used.
    pub slice: Option<BitSlice>,
    pub bit_len: Option<u32>,
    pub points: Vec<SeriesPoint>,
    pub failures: Vec<PointFailure>,
}

impl SliceSeries {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// `(sweep value, uniqueness)` pairs for plotting.
    pub fn uniqueness_series(&self) -> Vec<(Option<SweepValue>, f64)> {
        self.points
            .iter()
            .map(|p| (p.sweep_value, p.uniqueness))
            .collect()
    }

    /// `(sweep value, mean, error_low, error_high)` tuples for plotting.
    pub fn steadiness_series(&self) -> Vec<(Option<SweepValue>, f64, f64, f64)> {
        self.points
            .iter()
            .map(|p| {
                (
                    p.sweep_value,
                    p.steadiness_mean,
                    p.steadiness_error_low,
                    p.steadiness_error_high,
                )
            })
            .collect()
    }
}

/// Full output of [`evaluate_sweep`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResults {
    pub sweep_key: Option<String>,
    pub reference_mode: ReferenceMode,
    pub series: Vec<SliceSeries>,
}

impl SweepResults {
    pub fn failure_count(&self) -> usize {
        self.series.iter().map(|s| s.failures.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Per-chip references at `point`.
pub fn derive_references(
    dataset: &Dataset,
    format: &ResponseFormat,
    slice: Option<&BitSlice>,
    point: &SweepPoint,
) -> Result<Vec<Reference>> {
    dataset
        .chips
        .iter()
        .map(|chip| derive_reference(&filter_by_sweep(chip, point).normalize(format, slice)?))
        .collect()
}

/// Evaluate one point. Uniqueness always uses the point's own references;
/// steadiness uses `fixed_references` when given.
pub fn evaluate_point(
    dataset: &Dataset,
    format: &ResponseFormat,
    slice: Option<&BitSlice>,
    point: &SweepPoint,
    fixed_references: Option<&[Reference]>,
    include_randomness: bool,
) -> Result<SeriesPoint> {
    if dataset.is_empty() {
        return Err(PufError::EmptyInput("dataset has no chips".to_string()));
    }
    let bit_len = format.response_bit_len(slice)?;
    let chips = dataset
        .chips
        .iter()
        .map(|chip| filter_by_sweep(chip, point).normalize(format, slice))
        .collect::<Result<Vec<_>>>()?;
    let references = chips
        .iter()
        .map(derive_reference)
        .collect::<Result<Vec<_>>>()?;

    let uniqueness = uniqueness(&references, bit_len)?;

    let steadiness_refs = fixed_references.unwrap_or(&references);
    if steadiness_refs.len() != chips.len() {
        return Err(PufError::EmptyInput(format!(
            "{} references for {} chips",
            steadiness_refs.len(),
            chips.len()
        )));
    }
    let chip_steadiness = chips
        .iter()
        .zip(steadiness_refs)
        .map(|(responses, reference)| chip_steadiness(responses, reference, bit_len))
        .collect::<Result<Vec<_>>>()?;
    let per_chip: Vec<f64> = chip_steadiness.iter().map(|c| c.mean).collect();
    let summary = summarize(&per_chip)?;

    let randomness = if include_randomness {
        Some(randomness(&chips, bit_len)?)
    } else {
        None
    };

    debug!(
        "point {point}: uniqueness {uniqueness:.4}, steadiness {:.4} (-{:.4}/+{:.4})",
        summary.mean, summary.error_low, summary.error_high
    );

    Ok(SeriesPoint {
        sweep_value: point.value(),
        uniqueness,
        steadiness_mean: summary.mean,
        steadiness_error_low: summary.error_low,
        steadiness_error_high: summary.error_high,
        chip_steadiness,
        randomness,
    })
}

fn evaluate_slice(
    dataset: &Dataset,
    config: &EvaluationConfig,
    format: &ResponseFormat,
    slice: Option<&BitSlice>,
    points: &[SweepPoint],
) -> Result<SliceSeries> {
    let bit_len = format.response_bit_len(slice);
    let fixed = config
        .fixed_point()
        .map(|point| derive_references(dataset, format, slice, &point));

    let outcomes: Vec<Result<SeriesPoint>> = points
        .par_iter()
        .map(|point| {
            let fixed = match &fixed {
                Some(Ok(refs)) => Some(refs.as_slice()),
                Some(Err(e)) => return Err(e.clone()),
                None => None,
            };
            evaluate_point(dataset, format, slice, point, fixed, config.randomness)
        })
        .collect();

    let label = slice.map_or_else(|| "full".to_string(), |s| s.to_string());
    let mut series = SliceSeries {
        slice: slice.cloned(),
        bit_len: bit_len.ok(),
        points: Vec::with_capacity(points.len()),
        failures: Vec::new(),
    };
    for (point, outcome) in points.iter().zip(outcomes) {
        match outcome {
            Ok(p) => series.points.push(p),
            Err(e) => match config.failure_policy {
                FailurePolicy::Abort => return Err(e),
                FailurePolicy::Continue => {
                    warn!("slice {label}, point {point}: {e}");
                    series.failures.push(PointFailure {
                        sweep_value: point.value(),
                        error: e.into(),
                    });
                }
            },
        }
    }
    info!(
        "slice {label}: {} point(s) evaluated, {} failed",
        series.points.len(),
        series.failures.len()
    );
    Ok(series)
}

/// Evaluate every configured bit slice over every sweep point.
pub fn evaluate_sweep(dataset: &Dataset, config: &EvaluationConfig) -> Result<SweepResults> {
    if dataset.is_empty() {
        return Err(PufError::EmptyInput("dataset has no chips".to_string()));
    }
    let format = config.format()?;
    let points = config.sweep_points(dataset)?;
    let slices = config.slices();
    info!(
        "evaluating {} chip(s), {} slice(s) x {} sweep point(s), variant {}",
        dataset.chip_count(),
        slices.len(),
        points.len(),
        format.variant
    );

    let series = slices
        .par_iter()
        .map(|slice| evaluate_slice(dataset, config, &format, slice.as_ref(), &points))
        .collect::<Vec<Result<SliceSeries>>>()
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    Ok(SweepResults {
        sweep_key: config.sweep_key.clone(),
        reference_mode: config.reference_mode,
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::{ChipDump, OFFSET_KEY, Sample};
    use std::collections::BTreeMap;

    fn swept_chip(per_offset: &[(i64, &[i64])]) -> ChipDump {
        let samples: Vec<Sample> = per_offset
            .iter()
            .flat_map(|&(offset, values)| {
                values
                    .iter()
                    .map(move |&v| Sample::new(v).with_attribute(OFFSET_KEY, offset))
            })
            .collect();
        let mut challenges = BTreeMap::new();
        challenges.insert("0:1".to_string(), samples);
        ChipDump::new(challenges)
    }

    fn word_config(width: u32) -> EvaluationConfig {
        EvaluationConfig {
            variant: ResponseVariant::Word,
            word_width: Some(width),
            ..EvaluationConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = EvaluationConfig::default();
        assert_eq!(config.variant, ResponseVariant::Sign);
        assert_eq!(config.reference_mode, ReferenceMode::Sliding);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.slices(), vec![None]);
    }

    #[test]
    fn test_plain_evaluation() {
        let dataset = Dataset::new(vec![
            ChipDump::from_values([("0:1", vec![3, 3, 3, 3])]),
            ChipDump::from_values([("0:1", vec![0, 0, 0, 0])]),
        ]);
        let results = evaluate_sweep(&dataset, &word_config(2)).unwrap();
        assert_eq!(results.series.len(), 1);
        let point = &results.series[0].points[0];
        assert_eq!(point.sweep_value, None);
        assert_eq!(point.uniqueness, 1.0);
        assert_eq!(point.steadiness_mean, 1.0);
        assert_eq!(point.steadiness_error_low, 0.0);
    }

    #[test]
    fn test_offset_sweep_discovers_values_in_order() {
        let dataset = Dataset::new(vec![
            swept_chip(&[(10, &[1, 1]), (0, &[1, 0, 1])]),
            swept_chip(&[(10, &[0, 0]), (0, &[0, 0, 0])]),
        ]);
        let config = EvaluationConfig {
            sweep_key: Some(OFFSET_KEY.to_string()),
            ..word_config(1)
        };
        let results = evaluate_sweep(&dataset, &config).unwrap();
        let series = &results.series[0];
        let values: Vec<_> = series.points.iter().map(|p| p.sweep_value).collect();
        assert_eq!(values, vec![Some(SweepValue::Int(10)), Some(SweepValue::Int(0))]);
        assert_eq!(series.points[0].steadiness_mean, 1.0);
        // Chip 0 at offset 0: mode 1, one of three off → 2/3; chip 1 → 1.
        let expected = (2.0 / 3.0 + 1.0) / 2.0;
        assert!((series.points[1].steadiness_mean - expected).abs() < 1e-12);
    }

    #[test]
    fn test_fixed_reference_reused() {
        // Chip 0 flips from 1 at offset 0 to 0 at offset 10.
        let dataset = Dataset::new(vec![swept_chip(&[(0, &[1, 1]), (10, &[0, 0])])]);
        let sliding = EvaluationConfig {
            sweep_key: Some(OFFSET_KEY.to_string()),
            ..word_config(1)
        };
        let fixed = EvaluationConfig {
            reference_mode: ReferenceMode::Fixed(SweepValue::Int(0)),
            ..sliding.clone()
        };
        let sliding = evaluate_sweep(&dataset, &sliding).unwrap();
        let fixed = evaluate_sweep(&dataset, &fixed).unwrap();
        assert_eq!(sliding.series[0].points[1].steadiness_mean, 1.0);
        assert_eq!(fixed.series[0].points[0].steadiness_mean, 1.0);
        assert_eq!(fixed.series[0].points[1].steadiness_mean, 0.0);
    }

    #[test]
    fn test_fixed_reference_at_missing_value_fails() {
        let dataset = Dataset::new(vec![swept_chip(&[(0, &[1, 1])])]);
        let config = EvaluationConfig {
            sweep_key: Some(OFFSET_KEY.to_string()),
            reference_mode: ReferenceMode::Fixed(SweepValue::Int(99)),
            ..word_config(1)
        };
        assert!(matches!(
            evaluate_sweep(&dataset, &config),
            Err(PufError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_continue_policy_collects_failures() {
        let dataset = Dataset::new(vec![swept_chip(&[(0, &[1, 1])])]);
        let config = EvaluationConfig {
            sweep_key: Some(OFFSET_KEY.to_string()),
            sweep_values: Some(vec![SweepValue::Int(0), SweepValue::Int(5)]),
            failure_policy: FailurePolicy::Continue,
            ..word_config(1)
        };
        let results = evaluate_sweep(&dataset, &config).unwrap();
        let series = &results.series[0];
        assert_eq!(series.points.len(), 1);
        assert_eq!(series.failures.len(), 1);
        assert_eq!(series.failures[0].sweep_value, Some(SweepValue::Int(5)));
        assert!(matches!(
            series.failures[0].error.error,
            Some(PufError::EmptyInput(_))
        ));
        assert!(!series.is_complete());
        assert_eq!(results.failure_count(), 1);
    }

    #[test]
    fn test_abort_policy_surfaces_error() {
        let dataset = Dataset::new(vec![swept_chip(&[(0, &[1, 1])])]);
        let config = EvaluationConfig {
            sweep_key: Some(OFFSET_KEY.to_string()),
            sweep_values: Some(vec![SweepValue::Int(0), SweepValue::Int(5)]),
            ..word_config(1)
        };
        assert!(evaluate_sweep(&dataset, &config).is_err());
    }

    #[test]
    fn test_invalid_slice_fails_point() {
        let dataset = Dataset::new(vec![ChipDump::from_values([("0:1", vec![1])])]);
        let config = EvaluationConfig {
            bit_slices: vec![BitSlice::single(0), BitSlice::single(8)],
            failure_policy: FailurePolicy::Continue,
            ..word_config(8)
        };
        let results = evaluate_sweep(&dataset, &config).unwrap();
        assert!(results.series[0].is_complete());
        assert_eq!(results.series[1].bit_len, None);
        assert_eq!(
            results.series[1].failures[0].error.error,
            Some(PufError::InvalidSlice {
                position: 8,
                width: 8
            })
        );
    }

    #[test]
    fn test_missing_sweep_key_values() {
        let dataset = Dataset::new(vec![ChipDump::from_values([("0:1", vec![1])])]);
        let config = EvaluationConfig {
            sweep_key: Some(OFFSET_KEY.to_string()),
            ..word_config(1)
        };
        assert!(matches!(
            evaluate_sweep(&dataset, &config),
            Err(PufError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_randomness_included_on_request() {
        let dataset = Dataset::new(vec![ChipDump::from_values([("0:1", vec![1, 0])])]);
        let config = EvaluationConfig {
            randomness: true,
            ..word_config(1)
        };
        let results = evaluate_sweep(&dataset, &config).unwrap();
        let report = results.series[0].points[0].randomness.as_ref().unwrap();
        assert_eq!(report.responses, 2);
    }

    #[test]
    fn test_empty_dataset() {
        assert!(matches!(
            evaluate_sweep(&Dataset::default(), &EvaluationConfig::default()),
            Err(PufError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_config_from_json() {
        let config: EvaluationConfig = serde_json::from_str(
            r#"{"variant": "counter-diff", "sweep_key": "voltage",
                "bit_slices": [[0], [15]], "reference_mode": {"fixed": 1.2},
                "failure_policy": "continue"}"#,
        )
        .unwrap();
        assert_eq!(config.variant, ResponseVariant::CounterDiff);
        assert_eq!(config.bit_slices.len(), 2);
        assert_eq!(
            config.reference_mode,
            ReferenceMode::Fixed(SweepValue::Float(1.2))
        );
        assert_eq!(config.failure_policy, FailurePolicy::Continue);
        assert!(!config.randomness);
        assert_eq!(config.format().unwrap().word_width, 16);
    }
}
