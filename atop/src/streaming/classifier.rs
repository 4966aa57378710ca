//! Probe classification of kernel log lines.
//!
//! One combined regex covers every configured probe:
//!
//! ```text
//! ^\[\s*<num>.<num>\s*\]\s+(?:(IOCTL)|(TIME)|(INFO))
//! ```
//!
//! The index of the participating group tells which probe matched, so a batch
//! is partitioned in a single pass.

use regex::Regex;

use crate::domain::{AtopError, DmesgProbe};

/// Per-probe buckets of whole log lines, chronological (newest last).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeBuckets {
    probes: Vec<DmesgProbe>,
    buckets: Vec<Vec<String>>,
}

impl ProbeBuckets {
    /// Empty bucket for each probe, in order.
    #[must_use]
    pub fn empty(probes: &[DmesgProbe]) -> Self {
        Self {
            probes: probes.to_vec(),
            buckets: vec![Vec::new(); probes.len()],
        }
    }

    /// Lines classified under `probe`; empty when the probe is not configured.
    #[must_use]
    pub fn get(&self, probe: DmesgProbe) -> &[String] {
        match self.index_of(probe) {
            Some(i) => &self.buckets[i],
            None => &[],
        }
    }

    pub(crate) fn get_mut(&mut self, probe: DmesgProbe) -> Option<&mut Vec<String>> {
        let i = self.index_of(probe)?;
        Some(&mut self.buckets[i])
    }

    #[must_use]
    pub fn probes(&self) -> &[DmesgProbe] {
        &self.probes
    }

    /// `(probe, lines)` pairs in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = (DmesgProbe, &[String])> {
        self.probes.iter().copied().zip(self.buckets.iter().map(Vec::as_slice))
    }

    /// True when no bucket holds a line.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    #[must_use]
    pub fn total_lines(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    fn index_of(&self, probe: DmesgProbe) -> Option<usize> {
        self.probes.iter().position(|p| *p == probe)
    }
}

/// Partitions raw kernel log lines into per-probe buckets.
#[derive(Debug, Clone)]
pub struct ProbeClassifier {
    probes: Vec<DmesgProbe>,
    pattern: Regex,
}

impl ProbeClassifier {
    /// Compile the combined pattern for `probes`.
    ///
    /// # Errors
    /// `AtopError::NoProbes` for an empty probe list.
    pub fn new(probes: &[DmesgProbe]) -> Result<Self, AtopError> {
        if probes.is_empty() {
            return Err(AtopError::NoProbes);
        }

        let alternation = probes
            .iter()
            .map(|p| format!("({})", regex::escape(p.as_str())))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"^\[\s*\d+\.\d+\s*\]\s+(?:{alternation})"))?;

        Ok(Self {
            probes: probes.to_vec(),
            pattern,
        })
    }

    #[must_use]
    pub fn probes(&self) -> &[DmesgProbe] {
        &self.probes
    }

    /// Probe matched by `line`, if any.
    #[must_use]
    pub fn probe_of(&self, line: &str) -> Option<DmesgProbe> {
        let caps = self.pattern.captures(line)?;
        (1..caps.len()).find(|&i| caps.get(i).is_some()).map(|i| self.probes[i - 1])
    }

    /// Partition `lines`; lines matching no probe are dropped.
    #[must_use]
    pub fn classify<S: AsRef<str>>(&self, lines: &[S]) -> ProbeBuckets {
        let mut buckets = ProbeBuckets::empty(&self.probes);
        for line in lines {
            let line = line.as_ref();
            if let Some(probe) = self.probe_of(line) {
                if let Some(bucket) = buckets.get_mut(probe) {
                    bucket.push(line.to_string());
                }
            }
        }
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_partitions_and_drops() {
        let classifier = ProbeClassifier::new(&[DmesgProbe::Ioctl, DmesgProbe::Info]).unwrap();
        let lines = [
            "[1.0] IOCTL foo: (app: a) (cmd: X [1])",
            "[2.0] INFO: (app: a) Y",
            "[3.0] UNRELATED",
        ];

        let buckets = classifier.classify(&lines);

        assert_eq!(buckets.get(DmesgProbe::Ioctl), [lines[0]]);
        assert_eq!(buckets.get(DmesgProbe::Info), [lines[1]]);
        assert_eq!(buckets.total_lines(), 2);
        assert!(buckets.get(DmesgProbe::Time).is_empty());
    }

    #[test]
    fn test_classifier_requires_timestamp_prefix() {
        let classifier = ProbeClassifier::new(&DmesgProbe::ALL).unwrap();
        assert_eq!(classifier.probe_of("[ 3633.459327] TIME adsprpc: x"), Some(DmesgProbe::Time));
        assert_eq!(classifier.probe_of("IOCTL kgsl: no timestamp"), None);
        assert_eq!(classifier.probe_of("[12] IOCTL kgsl: integer timestamp"), None);
    }

    #[test]
    fn test_classifier_keeps_order() {
        let classifier = ProbeClassifier::new(&[DmesgProbe::Ioctl]).unwrap();
        let lines = ["[1.0] IOCTL a:", "[2.0] IOCTL b:", "[3.0] IOCTL c:"];
        assert_eq!(classifier.classify(&lines).get(DmesgProbe::Ioctl), lines);
    }

    #[test]
    fn test_empty_probe_list_rejected() {
        assert!(matches!(ProbeClassifier::new(&[]), Err(AtopError::NoProbes)));
    }
}
