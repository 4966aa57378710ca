//! Model discovery on the device and random model selection.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::domain::{AtopError, Framework};
use crate::shell::ShellExecutor;

use super::options::Delegate;

pub const DEVICE_TMP_DIR: &str = "/data/local/tmp";
pub const TFLITE_BENCHMARK_BINARY: &str = "/data/local/tmp/benchmark_model";
pub const SNPE_ROOT: &str = "/data/local/tmp/snpe";

const TFLITE_MODEL_GLOB: &str = "/data/local/tmp/*.tflite";
const SNPE_MODEL_GLOB: &str = "/data/local/tmp/snpe/models/*.dlc";

/// True when `ls <path>` echoes the path back.
///
/// # Errors
/// Shell failures.
pub fn file_exists_on_device(shell: &dyn ShellExecutor, path: &str) -> Result<bool, AtopError> {
    let out = shell.execute(&format!("ls {path}"))?;
    Ok(out.first().is_some_and(|first| first.trim() == path))
}

/// # Errors
/// `AtopError::MissingDeviceBinary` when `path` is absent.
pub fn require_file_on_device(shell: &dyn ShellExecutor, path: &str) -> Result<(), AtopError> {
    if file_exists_on_device(shell, path)? {
        Ok(())
    } else {
        Err(AtopError::MissingDeviceBinary(path.to_string()))
    }
}

fn list_models(
    shell: &dyn ShellExecutor,
    glob: &str,
    extension: &str,
) -> Result<Vec<String>, AtopError> {
    let models: Vec<String> = shell
        .execute(&format!("ls -d {glob}"))?
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| line.ends_with(extension) && !line.contains('*'))
        .collect();
    debug!("found {} models matching {glob}", models.len());
    Ok(models)
}

/// Model files available to `framework`'s benchmark tool.
///
/// # Errors
/// - `AtopError::MissingDeviceBinary` when `benchmark_model` is not installed
/// - `AtopError::NotImplemented` for MLPerf
pub fn models_on_device(
    shell: &dyn ShellExecutor,
    framework: Framework,
) -> Result<Vec<String>, AtopError> {
    match framework {
        Framework::TfLite => {
            require_file_on_device(shell, TFLITE_BENCHMARK_BINARY)?;
            list_models(shell, TFLITE_MODEL_GLOB, ".tflite")
        }
        Framework::TfLiteApp => list_models(shell, TFLITE_MODEL_GLOB, ".tflite"),
        Framework::Snpe => list_models(shell, SNPE_MODEL_GLOB, ".dlc"),
        Framework::MlPerf => Err(AtopError::NotImplemented(format!("Framework {framework}"))),
    }
}

/// Drop models the delegate cannot run (non-quantized graphs on the DSP).
#[must_use]
pub fn filter_for_delegate(
    models: Vec<String>,
    framework: Framework,
    delegate: Delegate,
) -> Vec<String> {
    if !(framework.is_tflite() && delegate.requires_quantized()) {
        return models;
    }
    let (kept, dropped): (Vec<_>, Vec<_>) = models.into_iter().partition(|m| m.contains("_quant"));
    if !dropped.is_empty() {
        info!("{delegate} only runs quantized models, skipping {}", dropped.join(", "));
    }
    kept
}

/// Picks a model for each benchmark process.
#[derive(Debug)]
pub struct ModelSelector {
    rng: StdRng,
}

impl ModelSelector {
    /// Fixed seed gives a reproducible sequence.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniformly random element; `None` for an empty list.
    pub fn pick<'a>(&mut self, models: &'a [String]) -> Option<&'a str> {
        models.choose(&mut self.rng).map(String::as_str)
    }
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::from_entropy()
    }
}
