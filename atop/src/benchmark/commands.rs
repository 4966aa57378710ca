//! Benchmark job construction.
//!
//! Builds the device shell commands for each framework. Nothing here runs a
//! command; the result is a [`BenchmarkJob`] for the [`BenchmarkRunner`].
//!
//! [`BenchmarkRunner`]: super::runner::BenchmarkRunner

use std::time::Duration;

use crate::domain::{AtopError, Framework};

use super::models::{ModelSelector, SNPE_ROOT, TFLITE_BENCHMARK_BINARY};
use super::options::{SnpeOptions, TfliteOptions};
use super::runner::{BenchmarkJob, WaitCondition};

const TFLITE_APP_ACTIVITY: &str = "org.tensorflow.lite.benchmark/.BenchmarkModelActivity";
const TFLITE_TIMINGS_NEEDLE: &str = "Inference timings in us";
const TFLITE_APP_POLL: &str = "logcat -d -v raw -s tflite:I";
const TFLITE_APP_POLL_INTERVAL: Duration = Duration::from_secs(1);
const TFLITE_APP_TIMEOUT: Duration = Duration::from_secs(600);

const SNPE_INPUT_LIST: &str = "input_list.txt";

fn pick_models(
    models: &[String],
    processes: u32,
    selector: &mut ModelSelector,
    framework: Framework,
) -> Result<Vec<String>, AtopError> {
    (0..processes.max(1))
        .map(|_| {
            selector
                .pick(models)
                .map(ToString::to_string)
                .ok_or_else(|| AtopError::NoModels(framework.to_string()))
        })
        .collect()
}

/// `processes` concurrent `benchmark_model` instances, each on a random model.
///
/// # Errors
/// `AtopError::NoModels` for an empty model list.
pub fn tflite_job(
    models: &[String],
    options: &TfliteOptions,
    processes: u32,
    selector: &mut ModelSelector,
) -> Result<BenchmarkJob, AtopError> {
    let base = format!("{TFLITE_BENCHMARK_BINARY} {}", options.to_args());
    let mut cmd = String::new();
    for graph in pick_models(models, processes, selector, Framework::TfLite)? {
        cmd.push_str(&format!("{base} --graph={graph} & "));
    }
    cmd.push_str("wait");
    Ok(BenchmarkJob::new(Framework::TfLite, vec![cmd]))
}

/// Launch the TFLite benchmark app once per process and collect its timing
/// report from logcat.
///
/// # Errors
/// `AtopError::NoModels` for an empty model list.
pub fn tflite_app_job(
    models: &[String],
    options: &TfliteOptions,
    processes: u32,
    selector: &mut ModelSelector,
) -> Result<BenchmarkJob, AtopError> {
    let mut run = vec!["logcat -c".to_string()];
    for graph in pick_models(models, processes, selector, Framework::TfLiteApp)? {
        run.push(format!(
            "am start -S -W -n {TFLITE_APP_ACTIVITY} --es args '\"--graph={graph} {}\"'",
            options.to_args()
        ));
    }

    Ok(BenchmarkJob::new(Framework::TfLiteApp, run)
        .wait_for(WaitCondition {
            command: TFLITE_APP_POLL.to_string(),
            needle: TFLITE_TIMINGS_NEEDLE.to_string(),
            poll_interval: TFLITE_APP_POLL_INTERVAL,
            timeout: TFLITE_APP_TIMEOUT,
        })
        .post(vec![TFLITE_APP_POLL.to_string()]))
}

fn snpe_env() -> String {
    format!(
        "cd {SNPE_ROOT} && export LD_LIBRARY_PATH={SNPE_ROOT}/lib:$LD_LIBRARY_PATH \
         ADSP_LIBRARY_PATH=\"{SNPE_ROOT}/dsp/lib;/system/lib/rfsa/adsp;\
         /system/vendor/lib/rfsa/adsp;/dsp\" \
         PATH={SNPE_ROOT}/bin:$PATH"
    )
}

/// `runs` sequential rounds of `snpe-net-run`, each round with `processes`
/// concurrent instances. Only the first instance of a round writes the
/// diagnostic log that is summarized.
///
/// # Errors
/// `AtopError::NoModels` for an empty model list.
pub fn snpe_job(
    models: &[String],
    options: &SnpeOptions,
    processes: u32,
    runs: u32,
    selector: &mut ModelSelector,
) -> Result<BenchmarkJob, AtopError> {
    let env = snpe_env();
    let mut run = Vec::new();
    let mut post = Vec::new();

    for r in 0..runs.max(1) {
        let mut cmd = format!("{env} && ");
        let containers = pick_models(models, processes, selector, Framework::Snpe)?;
        for (p, container) in containers.iter().enumerate() {
            let output_dir =
                if p == 0 { format!("output_{r}") } else { format!("output_{r}_p{p}") };
            cmd.push_str(&format!(
                "snpe-net-run --container {container} --input_list {SNPE_INPUT_LIST} \
                 --output_dir {output_dir} {} & ",
                options.to_args()
            ));
        }
        cmd.push_str("wait");
        run.push(cmd);
        post.push(format!(
            "{env} && snpe-diagview --input_log {SNPE_ROOT}/output_{r}/SNPEDiag_0.log"
        ));
    }

    Ok(BenchmarkJob::new(Framework::Snpe, run).post(post))
}

/// Job for `framework`, or `NotImplemented` for frameworks without a tool.
///
/// # Errors
/// See the per-framework builders.
pub fn job_for(
    framework: Framework,
    models: &[String],
    tflite: &TfliteOptions,
    snpe: Option<&SnpeOptions>,
    processes: u32,
    selector: &mut ModelSelector,
) -> Result<BenchmarkJob, AtopError> {
    match framework {
        Framework::TfLite => tflite_job(models, tflite, processes, selector),
        Framework::TfLiteApp => tflite_app_job(models, tflite, processes, selector),
        Framework::Snpe => {
            let snpe = snpe.ok_or_else(|| {
                AtopError::NotImplemented(format!("Framework {framework} without options"))
            })?;
            snpe_job(models, snpe, processes, tflite.runs, selector)
        }
        Framework::MlPerf => Err(AtopError::NotImplemented(format!("Framework {framework}"))),
    }
}
