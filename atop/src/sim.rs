//! Simulated device for `--sim`
//!
//! A [`ReplayShell`] primed with a kernel log that grows over a number of
//! polls, a quiet logcat, moving `/proc/stat` counters and canned benchmark
//! output, so the whole pipeline can run without hardware.

use crate::shell::ReplayShell;

/// Polls over which the simulated logs keep growing
const SIM_STEPS: u32 = 30;
const SIM_CORES: u32 = 4;

const SIM_DRIVERS: [&str; 4] = ["kgsl", "cDSP", "vidioc", "aDSP"];

fn dmesg_line(ts: f64, step: u32, i: u32) -> String {
    let driver = SIM_DRIVERS[((step + i) as usize) % SIM_DRIVERS.len()];
    match i % 4 {
        0 => format!("[{ts:12.6}] TIME adsprpc: (app: benchmark_model) (ioctl) 0.00{}", 2 + i % 3),
        1 => format!("[{ts:12.6}] TIME adsprpc: (app: benchmark_model) (invoke) 0.001"),
        2 => format!(
            "[{ts:12.6}] IOCTL {driver}: (app: benchmark_model) \
             (cmd: IOCTL_KGSL_GPU_COMMAND [74]) (time: 0.0004)"
        ),
        _ => format!(
            "[{ts:12.6}] IOCTL {driver}: (app: surfaceflinger) (cmd: IOCTL_KGSL_GPUOBJ_SYNC [72])"
        ),
    }
}

fn dmesg_snapshots() -> Vec<Vec<String>> {
    let mut log = vec!["[    0.000000] Booting Linux on physical CPU 0x0".to_string()];
    let mut snapshots = Vec::new();
    for step in 0..SIM_STEPS {
        for i in 0..6 {
            let ts = 100.0 + f64::from(step) * 2.0 + f64::from(i) * 0.1;
            log.push(dmesg_line(ts, step, i));
        }
        snapshots.push(log.clone());
    }
    snapshots
}

fn proc_stat_snapshots() -> Vec<Vec<String>> {
    (0..SIM_STEPS)
        .map(|step| {
            let mut rows = vec!["cpu  0 0 0 0 0 0 0 0 0 0".to_string()];
            for core in 0..SIM_CORES {
                let busy = u64::from(step) * u64::from(10 + core * 15);
                let idle = u64::from(step) * u64::from(90 - core * 15);
                rows.push(format!("cpu{core} {busy} 0 0 {idle} 0 0 0 0 0 0"));
            }
            rows.push("intr 12345".to_string());
            rows
        })
        .collect()
}

const SIM_TFLITE_OUTPUT: [&str; 4] = [
    "STARTING!",
    "Graph: [/data/local/tmp/mobilenet_v1_quant.tflite]",
    "PRE-PROCESSING done 1500",
    "Inference timings in us: Init: 2000, First inference: 9000, Warmup (avg): 6000, Inference (avg): 5000",
];

const SIM_LOGCAT_OUTPUT: [&str; 2] = [
    "05-13 23:23:08.123  4242  4250 V ExecutionBuilder: (app: benchmark_model) (driver) 0.0007",
    "05-13 23:23:08.456  4242  4250 I tflite  : Inference timings in us: Init: 2000, Inference (avg): 5000",
];

/// A replay shell that behaves like a rooted device running benchmarks.
#[must_use]
pub fn simulated_device() -> ReplayShell {
    let mut shell = ReplayShell::new()
        .respond("ls /data/local/tmp/benchmark_model", ["/data/local/tmp/benchmark_model"])
        .respond(
            "ls -d",
            ["/data/local/tmp/mobilenet_v1_quant.tflite", "/data/local/tmp/inception_v3.tflite"],
        )
        .respond("/data/local/tmp/benchmark_model", SIM_TFLITE_OUTPUT)
        .respond("logcat -d -v raw", SIM_TFLITE_OUTPUT)
        .respond("logcat -d -v threadtime", SIM_LOGCAT_OUTPUT)
        .respond("getprop", ["0"]);

    for snapshot in dmesg_snapshots() {
        shell = shell.respond("dmesg", snapshot);
    }
    for snapshot in proc_stat_snapshots() {
        shell = shell.respond("cat /proc/stat", snapshot);
    }
    shell
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::ShellExecutor;

    #[test]
    fn test_dmesg_grows_then_settles() {
        let shell = simulated_device();
        let first = shell.execute("dmesg").unwrap();
        let second = shell.execute("dmesg").unwrap();
        assert!(second.len() > first.len());
        assert!(second.starts_with(&first));
    }

    #[test]
    fn test_benchmark_and_models_available() {
        let shell = simulated_device();
        assert_eq!(shell.execute("ls -d /data/local/tmp/*.tflite").unwrap().len(), 2);
        let out =
            shell.execute("/data/local/tmp/benchmark_model --num_runs=1 --graph=x & wait").unwrap();
        assert!(out.iter().any(|l| l.starts_with("Inference timings in us:")));
    }
}
