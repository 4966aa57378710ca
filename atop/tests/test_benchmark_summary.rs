use std::sync::Arc;
use std::time::{Duration, Instant};

use atop::analysis::BenchmarkSummarizer;
use atop::benchmark::{
    job_for, BenchmarkRunner, Delegate, ModelSelector, SnpeOptions, TfliteOptions,
};
use atop::shell::ReplayShell;
use atop::streaming::LogcatSnapshot;
use atop::{Framework, Session};
use atop_common::BenchmarkStats;

const SNPE_DIAGVIEW: &str = include_str!("fixtures/snpe_diagview.txt");
const TFLITE_BENCHMARK: &str = include_str!("fixtures/tflite_benchmark.txt");

fn lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

#[test]
fn test_tflite_output_summarized() {
    let summarizer = BenchmarkSummarizer::new().expect("patterns compile");
    let mut stats = BenchmarkStats::default();
    summarizer
        .summarize(&lines(TFLITE_BENCHMARK), Framework::TfLite, 1, &mut stats)
        .expect("tflite is supported");

    assert_eq!(stats.preproc, 1500);
    assert_eq!(stats.init, 2000);
    assert_eq!(stats.inference, 5000);
    assert_eq!(stats.offload, 0);
}

#[test]
fn test_tflite_inference_excludes_kernel_offload() {
    let summarizer = BenchmarkSummarizer::new().expect("patterns compile");
    // 1.5 ms of offload, in nanoseconds
    let mut stats = BenchmarkStats {
        offload: 1_500_000,
        ..BenchmarkStats::default()
    };
    summarizer
        .summarize(&lines(TFLITE_BENCHMARK), Framework::TfLite, 1, &mut stats)
        .expect("tflite is supported");

    assert_eq!(stats.inference, 3500);
    assert_eq!(stats.offload, 1_500_000);
}

#[test]
fn test_tflite_session_offload_is_per_run() {
    let shell = Arc::new(
        ReplayShell::new().respond("/data/local/tmp/benchmark_model", lines(TFLITE_BENCHMARK)),
    );
    let runner = BenchmarkRunner::new(shell, 1).expect("pool starts");
    let tflite = TfliteOptions {
        runs: 4,
        ..TfliteOptions::default()
    };
    let models = vec!["/data/local/tmp/mobilenet_v1.tflite".to_string()];
    let job = job_for(Framework::TfLite, &models, &tflite, None, 1, &mut ModelSelector::seeded(7))
        .expect("job builds");

    let mut session = Session::new(Framework::TfLite, 4).expect("session builds");
    session.track(runner.launch(job).expect("pool accepts job"));
    // 8 ms of driver time accumulated over 4 runs
    session.apply_logcat(&LogcatSnapshot {
        data: [(
            "ExecutionBuilder".to_string(),
            vec![
                "05-13 23:23:08.123 1 2 V ExecutionBuilder: (app: benchmark_model) (driver) 0.008"
                    .to_string(),
            ],
        )]
        .into_iter()
        .collect(),
        is_data_fresh: true,
    });
    assert_eq!(session.stats().offload, 8_000_000);

    let started = Instant::now();
    while session.pending_benchmarks() > 0 && started.elapsed() < Duration::from_secs(5) {
        session.poll_benchmarks();
        std::thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(session.completed_benchmarks(), 1);
    // 5000 us average minus 2000 us of offload per run
    assert_eq!(session.stats().inference, 3000);
}

#[test]
fn test_diagview_sections_averaged() {
    let summarizer = BenchmarkSummarizer::new().expect("patterns compile");
    let mut stats = BenchmarkStats {
        preproc: 7,
        ..BenchmarkStats::default()
    };
    summarizer
        .summarize(&lines(SNPE_DIAGVIEW), Framework::Snpe, 2, &mut stats)
        .expect("SNPE is supported");

    assert_eq!(stats.preproc, 0);
    assert_eq!(stats.postproc, 0);
    assert_eq!(stats.inference, 11_000);
    assert_eq!(stats.offload, 3000);
    assert_eq!(stats.delegation, 2000);
    assert_eq!(stats.init, 62_000);
}

#[test]
fn test_mlperf_rejected() {
    let summarizer = BenchmarkSummarizer::new().expect("patterns compile");
    let mut stats = BenchmarkStats::default();
    assert!(summarizer
        .summarize(&lines(TFLITE_BENCHMARK), Framework::MlPerf, 1, &mut stats)
        .is_err());
    assert_eq!(stats, BenchmarkStats::default());
}

#[test]
fn test_snpe_job_end_to_end() {
    // Every SNPE command runs from the SNPE root; only the diagview output is kept
    let shell =
        Arc::new(ReplayShell::new().respond("cd /data/local/tmp/snpe", lines(SNPE_DIAGVIEW)));
    let runner = BenchmarkRunner::new(shell.clone(), 2).expect("pool starts");

    let tflite = TfliteOptions {
        runs: 2,
        ..TfliteOptions::default()
    };
    let snpe = SnpeOptions::new(Delegate::Hexagon, false).expect("DSP is supported");
    let models = vec!["/data/local/tmp/snpe/models/inception_v3_quantized.dlc".to_string()];
    let mut selector = ModelSelector::seeded(7);
    let job = job_for(Framework::Snpe, &models, &tflite, Some(&snpe), 1, &mut selector)
        .expect("job builds");

    let mut session = Session::new(Framework::Snpe, 2).expect("session builds");
    session.track(runner.launch(job).expect("pool accepts job"));

    let started = Instant::now();
    while session.pending_benchmarks() > 0 && started.elapsed() < Duration::from_secs(5) {
        session.poll_benchmarks();
        std::thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(session.completed_benchmarks(), 1);
    assert_eq!(session.stats().inference, 11_000);

    let commands = shell.commands();
    assert!(commands.iter().any(|c| c.contains("snpe-net-run") && c.contains("--use_dsp")));
    assert!(commands
        .iter()
        .any(|c| c.contains("--input_log /data/local/tmp/snpe/output_0/SNPEDiag_0.log")));
}
