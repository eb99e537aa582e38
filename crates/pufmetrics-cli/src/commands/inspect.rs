//! `pufmetrics inspect` — summarize dump files before evaluating them.

use pufmetrics_core::{Dataset, SweepValue, distinct_sweep_values};

fn format_values(values: &[SweepValue]) -> String {
    const SHOWN: usize = 12;
    let mut parts: Vec<String> = values.iter().take(SHOWN).map(|v| v.to_string()).collect();
    if values.len() > SHOWN {
        parts.push(format!("… ({} total)", values.len()));
    }
    parts.join(", ")
}

pub fn run(paths: &[String]) {
    let (dumps, dataset) = super::load_dataset_or_exit(paths);

    println!("{} chip(s)\n", dataset.chip_count());
    for (i, dump) in dumps.iter().enumerate() {
        let chip = &dump.chip;
        let plain = chip
            .challenges
            .values()
            .flatten()
            .filter(|s| s.is_plain())
            .count();
        println!("  chip {i}: {}", dump.label());
        println!("    file:       {}", dump.path);
        println!("    challenges: {}", chip.challenge_count());
        println!("    samples:    {} ({plain} plain)", chip.sample_count());

        let single = Dataset::new(vec![chip.clone()]);
        for key in single.sweep_keys() {
            let values = distinct_sweep_values(&single, &key);
            println!("    {key}: {} value(s): {}", values.len(), format_values(&values));
        }
        println!();
    }

    let keys = dataset.sweep_keys();
    if keys.is_empty() {
        println!("No sweep attributes; evaluate without --sweep-key.");
    } else {
        println!("Sweep keys: {}", keys.join(", "));
        println!("Sweep values are taken from chip 0's first challenge unless given explicitly.");
    }
}
