pub mod evaluate;
pub mod inspect;

use std::path::Path;

use pufmetrics_core::{ChipDump, Dataset, EvaluationConfig};
use serde::Deserialize;

/// One chip's dump file as written by the acquisition scripts.
#[derive(Debug, Deserialize)]
pub struct DumpFile {
    #[serde(default)]
    pub ident: Option<String>,
    pub dump: ChipDump,
}

/// A dump file together with where it came from.
#[derive(Debug)]
pub struct LoadedDump {
    pub path: String,
    pub ident: Option<String>,
    pub chip: ChipDump,
}

impl LoadedDump {
    /// Ident if recorded, else the file name.
    pub fn label(&self) -> String {
        self.ident.clone().unwrap_or_else(|| {
            Path::new(&self.path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.path.clone())
        })
    }
}

/// Read and parse one dump file.
pub fn load_dump(path: &str) -> Result<LoadedDump, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("Failed to read {path}: {e}"))?;
    let file: DumpFile =
        serde_json::from_str(&text).map_err(|e| format!("Failed to parse {path}: {e}"))?;
    log::debug!(
        "loaded {path}: {} challenge(s), {} sample(s)",
        file.dump.challenge_count(),
        file.dump.sample_count()
    );
    Ok(LoadedDump {
        path: path.to_string(),
        ident: file.ident,
        chip: file.dump,
    })
}

/// Load every dump in command-line order; chip index = position.
pub fn load_dumps(paths: &[String]) -> Result<Vec<LoadedDump>, String> {
    paths.iter().map(|p| load_dump(p)).collect()
}

/// Assemble the dataset from loaded dumps, preserving order.
pub fn to_dataset(dumps: &[LoadedDump]) -> Dataset {
    Dataset::new(dumps.iter().map(|d| d.chip.clone()).collect())
}

/// Read an evaluation config JSON file.
pub fn load_config(path: &str) -> Result<EvaluationConfig, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("Failed to read {path}: {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("Invalid config {path}: {e}"))
}

/// Load dumps or exit with an error message.
pub fn load_dataset_or_exit(paths: &[String]) -> (Vec<LoadedDump>, Dataset) {
    match load_dumps(paths) {
        Ok(dumps) => {
            let dataset = to_dataset(&dumps);
            (dumps, dataset)
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
