//! CLI for pufmetrics — PUF quality metrics from challenge-response dumps.

mod commands;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pufmetrics")]
#[command(about = "pufmetrics — uniqueness, steadiness and randomness of PUF response dumps")]
#[command(version = pufmetrics_core::VERSION)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate uniqueness and steadiness (and optionally randomness) over
    /// one dump file per chip, sweeping over offset/voltage and bit slices.
    Evaluate {
        /// Dump files, one per chip (JSON with "ident" and "dump")
        #[arg(required = true)]
        dumps: Vec<String>,

        /// JSON evaluation config; flags below override its fields
        #[arg(long)]
        config: Option<String>,

        /// Response variant: sign, counter-diff, word
        #[arg(long)]
        variant: Option<String>,

        /// Raw word width in bits (default: 16 for sign/counter-diff, 32 for word)
        #[arg(long)]
        word_width: Option<u32>,

        /// Sample attribute to sweep over (e.g. offset, voltage)
        #[arg(long)]
        sweep_key: Option<String>,

        /// Explicit sweep value (repeatable); discovered from the first dump when absent
        #[arg(long = "sweep-value")]
        sweep_values: Vec<String>,

        /// Fixed steadiness reference at this sweep value (sliding by default)
        #[arg(long = "ref")]
        reference: Option<String>,

        /// Bit slice, MSB-first: "4..8" or "0,3,7" (repeatable)
        #[arg(long = "slice")]
        slices: Vec<String>,

        /// Evaluate every single bit of a word of this width as its own slice
        #[arg(long)]
        bit_slices: Option<u32>,

        /// Also estimate per-bit frequency and min-entropy
        #[arg(long)]
        randomness: bool,

        /// Record failing sweep points and continue instead of aborting
        #[arg(long)]
        continue_on_error: bool,

        /// Write full results as JSON
        #[arg(long)]
        output: Option<String>,

        /// Output view: summary (default) or detailed (per-chip and per-bit)
        #[arg(long, default_value = "summary", value_parser = ["summary", "detailed"])]
        view: String,
    },

    /// Show chips, challenges, sample counts and sweep values of dump files
    Inspect {
        /// Dump files, one per chip
        #[arg(required = true)]
        dumps: Vec<String>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Evaluate {
            dumps,
            config,
            variant,
            word_width,
            sweep_key,
            sweep_values,
            reference,
            slices,
            bit_slices,
            randomness,
            continue_on_error,
            output,
            view,
        } => commands::evaluate::run(commands::evaluate::EvaluateCommandConfig {
            dump_paths: &dumps,
            config_path: config.as_deref(),
            variant: variant.as_deref(),
            word_width,
            sweep_key: sweep_key.as_deref(),
            sweep_values: &sweep_values,
            reference: reference.as_deref(),
            slices: &slices,
            per_bit_width: bit_slices,
            randomness,
            continue_on_error,
            output_path: output.as_deref(),
            view: &view,
        }),
        Commands::Inspect { dumps } => commands::inspect::run(&dumps),
    }
}
