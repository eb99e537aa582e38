//! `pufmetrics evaluate` — run the sweep driver over dump files.

use pufmetrics_core::{
    BitSlice, EvaluationConfig, FailurePolicy, ReferenceMode, ResponseVariant, SeriesPoint,
    SliceSeries, SweepResults, SweepValue, evaluate_sweep,
};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EvaluateView {
    Summary,
    Detailed,
}

impl EvaluateView {
    fn parse(s: &str) -> Self {
        match s {
            "detailed" => Self::Detailed,
            _ => Self::Summary,
        }
    }
}

pub struct EvaluateCommandConfig<'a> {
    pub dump_paths: &'a [String],
    pub config_path: Option<&'a str>,
    pub variant: Option<&'a str>,
    pub word_width: Option<u32>,
    pub sweep_key: Option<&'a str>,
    pub sweep_values: &'a [String],
    pub reference: Option<&'a str>,
    pub slices: &'a [String],
    pub per_bit_width: Option<u32>,
    pub randomness: bool,
    pub continue_on_error: bool,
    pub output_path: Option<&'a str>,
    pub view: &'a str,
}

/// JSON document written by `--output`.
#[derive(Serialize)]
struct EvaluationReport<'a> {
    pufmetrics_version: &'static str,
    chips: Vec<String>,
    config: &'a EvaluationConfig,
    results: &'a SweepResults,
}

/// Merge the optional config file with command-line overrides.
fn build_config(cfg: &EvaluateCommandConfig<'_>) -> Result<EvaluationConfig, String> {
    let mut config = match cfg.config_path {
        Some(path) => super::load_config(path)?,
        None => EvaluationConfig::default(),
    };

    if let Some(variant) = cfg.variant {
        config.variant = variant
            .parse::<ResponseVariant>()
            .map_err(|e| e.to_string())?;
    }
    if cfg.word_width.is_some() {
        config.word_width = cfg.word_width;
    }
    if let Some(key) = cfg.sweep_key {
        config.sweep_key = Some(key.to_string());
    }
    if !cfg.sweep_values.is_empty() {
        let values = cfg
            .sweep_values
            .iter()
            .map(|v| v.parse::<SweepValue>())
            .collect::<Result<Vec<_>, _>>()?;
        config.sweep_values = Some(values);
    }
    if let Some(reference) = cfg.reference {
        config.reference_mode = ReferenceMode::Fixed(reference.parse::<SweepValue>()?);
    }

    let mut slices = cfg
        .slices
        .iter()
        .map(|s| s.parse::<BitSlice>())
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(width) = cfg.per_bit_width {
        slices.extend(BitSlice::per_bit(width));
    }
    if !slices.is_empty() {
        config.bit_slices = slices;
    }

    if cfg.randomness {
        config.randomness = true;
    }
    if cfg.continue_on_error {
        config.failure_policy = FailurePolicy::Continue;
    }
    Ok(config)
}

pub fn run(cfg: EvaluateCommandConfig<'_>) {
    let config = match build_config(&cfg) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let view = EvaluateView::parse(cfg.view);

    let (dumps, dataset) = super::load_dataset_or_exit(cfg.dump_paths);
    let format = match config.format() {
        Ok(format) => format,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    println!(
        "Evaluating {} chip(s), variant {} ({}-bit words), {}\n",
        dataset.chip_count(),
        format.variant,
        format.word_width,
        describe_reference(&config)
    );
    if view == EvaluateView::Detailed {
        for (i, dump) in dumps.iter().enumerate() {
            println!(
                "  chip {i}: {} ({} challenges, {} samples)",
                dump.label(),
                dump.chip.challenge_count(),
                dump.chip.sample_count()
            );
        }
        println!();
    }

    let results = match evaluate_sweep(&dataset, &config) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("Evaluation failed: {e}");
            std::process::exit(1);
        }
    };

    for series in &results.series {
        print_series(series, &results, config.randomness, view);
    }

    let failures = results.failure_count();
    if failures > 0 {
        println!("{failures} sweep point(s) failed; see above.");
    }

    if let Some(path) = cfg.output_path {
        let report = EvaluationReport {
            pufmetrics_version: pufmetrics_core::VERSION,
            chips: dumps.iter().map(|d| d.label()).collect(),
            config: &config,
            results: &results,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => match std::fs::write(path, json) {
                Ok(()) => println!("Results written to {path}"),
                Err(e) => {
                    eprintln!("Failed to write {path}: {e}");
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Failed to serialize results: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn describe_reference(config: &EvaluationConfig) -> String {
    match config.reference_mode {
        ReferenceMode::Sliding => "sliding reference".to_string(),
        ReferenceMode::Fixed(value) => match &config.sweep_key {
            Some(key) => format!("fixed reference at {key}={value}"),
            None => format!("fixed reference at {value}"),
        },
    }
}

fn sweep_label(results: &SweepResults, value: Option<SweepValue>) -> String {
    match (&results.sweep_key, value) {
        (Some(key), Some(value)) => format!("{key}={value}"),
        _ => "plain".to_string(),
    }
}

fn print_series(series: &SliceSeries, results: &SweepResults, randomness: bool, view: EvaluateView) {
    let slice = series
        .slice
        .as_ref()
        .map_or_else(|| "full word".to_string(), |s| format!("bits {s}"));
    let bits = series
        .bit_len
        .map_or_else(|| "invalid".to_string(), |b| format!("{b}-bit"));
    println!("{:=<72}", "");
    println!("Slice: {slice} ({bits} responses)");
    println!("{:=<72}", "");

    if randomness {
        println!(
            "  {:<16} {:>10} {:>10} {:>8} {:>8} {:>10}",
            "sweep", "unique", "steady", "-err", "+err", "min-H"
        );
    } else {
        println!(
            "  {:<16} {:>10} {:>10} {:>8} {:>8}",
            "sweep", "unique", "steady", "-err", "+err"
        );
    }

    for point in &series.points {
        let label = sweep_label(results, point.sweep_value);
        print!(
            "  {:<16} {:>10.4} {:>10.4} {:>8.4} {:>8.4}",
            label,
            point.uniqueness,
            point.steadiness_mean,
            point.steadiness_error_low,
            point.steadiness_error_high
        );
        match &point.randomness {
            Some(r) => println!(" {:>10.4}", r.min_entropy),
            None => println!(),
        }
        if view == EvaluateView::Detailed {
            print_point_detail(point);
        }
    }

    for failure in &series.failures {
        println!(
            "  {:<16} FAILED: {}",
            sweep_label(results, failure.sweep_value),
            failure.error.message
        );
    }
    println!();
}

fn print_point_detail(point: &SeriesPoint) {
    for (i, chip) in point.chip_steadiness.iter().enumerate() {
        println!(
            "    chip {i}: steadiness {:.4} (challenge min {:.4}, max {:.4})",
            chip.mean, chip.min, chip.max
        );
    }
    if let Some(r) = &point.randomness {
        println!(
            "    randomness: {} responses, mean min-entropy {:.4}, overall bias {:.4}",
            r.responses, r.mean_min_entropy, r.overall_bias
        );
        for bit in &r.bits {
            let flag = if bit.is_biased() { " !" } else { "" };
            println!(
                "      bit {:>2}: p(1) = {:.4}, H_min = {:.4}, p-value = {:.4}{flag}",
                bit.position, bit.frequency, bit.min_entropy, bit.p_value
            );
        }
    }
}
