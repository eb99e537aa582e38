//! # pufmetrics-core
//!
//! **Quality metrics for Physical Unclonable Functions.**
//!
//! `pufmetrics-core` turns challenge-response dumps captured from one or more
//! PUF instances ("chips") into the three standard quality metrics:
//!
//! - **Uniqueness**: mean normalized Hamming distance between different
//!   chips' responses to the same challenge (ideal 0.5).
//! - **Steadiness**: agreement of repeated responses of one chip with its
//!   majority-vote reference (ideal 1.0).
//! - **Randomness**: per-bit frequency of ones and min-entropy across the
//!   whole response population.
//!
//! ## Quick Start
//!
//! ```
//! use pufmetrics_core::{ChipDump, Dataset, EvaluationConfig, evaluate_sweep};
//!
//! let dataset = Dataset::new(vec![
//!     ChipDump::from_values([("0:1", vec![12, 9, 15, -3])]),
//!     ChipDump::from_values([("0:1", vec![-7, -2, -9, -4])]),
//! ]);
//!
//! let results = evaluate_sweep(&dataset, &EvaluationConfig::default()).unwrap();
//! let point = &results.series[0].points[0];
//! assert_eq!(point.uniqueness, 1.0);
//! assert_eq!(point.steadiness_mean, 0.875);
//! ```
//!
//! ## Architecture
//!
//! Raw dump → Normalizer → filtered ChipDump → {Reference → Steadiness,
//! Uniqueness, Randomness} → Sweep driver → result series
//!
//! The engine is a pure function of an in-memory [`Dataset`]: it does not
//! read files, drive instruments or render plots.

pub mod bits;
pub mod dump;
pub mod error;
pub mod randomness;
pub mod reference;
pub mod response;
pub mod steadiness;
pub mod sweep;
pub mod uniqueness;

pub use bits::{
    BitSlice, bit_slice, bitwise_mode, gray_decode, gray_encode, hamming_distance,
    hamming_weight, twos_complement,
};
pub use dump::{
    ChipDump, Dataset, OFFSET_KEY, ResponseSet, Sample, SweepPoint, SweepValue, VOLTAGE_KEY,
    distinct_sweep_values, filter_by_sweep,
};
pub use error::{PufError, Result};
pub use randomness::{BitFrequency, RandomnessReport, randomness};
pub use reference::{Reference, ReferenceMode, derive_reference};
pub use response::{ResponseFormat, ResponseVariant};
pub use steadiness::{ChipSteadiness, SteadinessSummary, chip_steadiness, steadiness, summarize};
pub use sweep::{
    EvaluationConfig, FailurePolicy, PointFailure, PufErrorReport, SeriesPoint, SliceSeries,
    SweepResults,
    derive_references, evaluate_point, evaluate_sweep,
};
pub use uniqueness::{ChipPair, pairwise_uniqueness, uniqueness};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
