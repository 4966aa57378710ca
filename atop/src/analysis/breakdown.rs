//! Per-application breakdown of driver interactions.

use log::debug;
use regex::Regex;

use atop_common::IoctlBreakdown;

use crate::domain::{AtopError, DmesgProbe};

/// Accumulates `app → command → count` from IOCTL and INFO lines.
#[derive(Debug, Clone)]
pub struct BreakdownParser {
    /// `(app: A) (cmd: C [n])`
    ioctl: Regex,
    /// `INFO: (app: A) rest`
    info: Regex,
}

impl BreakdownParser {
    /// # Errors
    /// Pattern compilation failure.
    pub fn new() -> Result<Self, AtopError> {
        Ok(Self {
            ioctl: Regex::new(r"\(app:\s*([^)]*?)\s*\)\s*\(cmd:\s*(.+?)\s*\[\d+\]\s*\)")?,
            info: Regex::new(r"INFO:\s*\(app:\s*([^)]*?)\s*\)\s*(.*?)\s*$")?,
        })
    }

    /// Count every recognised line of `probe` into `breakdown`.
    ///
    /// # Errors
    /// `AtopError::NotImplemented` for TIME lines, which carry no command.
    pub fn ioctl_breakdown<S: AsRef<str>>(
        &self,
        breakdown: &mut IoctlBreakdown,
        lines: &[S],
        probe: DmesgProbe,
    ) -> Result<(), AtopError> {
        let pattern = match probe {
            DmesgProbe::Ioctl => &self.ioctl,
            DmesgProbe::Info => &self.info,
            DmesgProbe::Time => {
                return Err(AtopError::NotImplemented(format!("Breakdown of {probe} lines")));
            }
        };

        for line in lines {
            let line = line.as_ref();
            let Some(caps) = pattern.captures(line) else {
                debug!("no breakdown key in {line:?}");
                continue;
            };
            let app = caps[1].to_string();
            let command = caps[2].to_string();
            *breakdown.entry(app).or_default().entry(command).or_default() += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ioctl_breakdown() {
        let lines = [
            "[1.0] IOCTL kgsl: (app: benchmark_model) (cmd: IOCTL_KGSL_GPU_COMMAND [74])",
            "[1.1] IOCTL kgsl: (app: benchmark_model) (cmd: IOCTL_KGSL_GPU_COMMAND [74]) (time: 0.1)",
            "[1.2] IOCTL adsprpc: (app: benchmark_model) (cmd: FASTRPC_IOCTL_INVOKE [1])",
            "[1.3] IOCTL kgsl: garbled",
        ];
        let mut breakdown = IoctlBreakdown::new();
        let parser = BreakdownParser::new().unwrap();
        parser.ioctl_breakdown(&mut breakdown, &lines, DmesgProbe::Ioctl).unwrap();

        let app = &breakdown["benchmark_model"];
        assert_eq!(app["IOCTL_KGSL_GPU_COMMAND"], 2);
        assert_eq!(app["FASTRPC_IOCTL_INVOKE"], 1);
        assert_eq!(breakdown.len(), 1);
    }

    #[test]
    fn test_info_breakdown_accumulates() {
        let parser = BreakdownParser::new().unwrap();
        let mut breakdown = IoctlBreakdown::new();
        let lines = ["[3.0] INFO: (app: snpe-net-run) session opened "];
        parser.ioctl_breakdown(&mut breakdown, &lines, DmesgProbe::Info).unwrap();
        parser.ioctl_breakdown(&mut breakdown, &lines, DmesgProbe::Info).unwrap();
        assert_eq!(breakdown["snpe-net-run"]["session opened"], 2);
    }

    #[test]
    fn test_time_not_implemented() {
        let mut breakdown = IoctlBreakdown::new();
        let result = BreakdownParser::new().unwrap().ioctl_breakdown(
            &mut breakdown,
            &["[1.0] TIME adsprpc: x"],
            DmesgProbe::Time,
        );
        assert!(matches!(result, Err(AtopError::NotImplemented(_))));
        assert!(breakdown.is_empty());
    }
}
