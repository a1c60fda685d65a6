use serde::Serialize;
use tracing::{debug, info, warn};

use crate::correlation::{CorrelationReport, correlate};
use crate::extract::LogExtraction;
use crate::profile::{StructuralProfile, profile};
use crate::protocol::{ChecksumRegistry, ChecksumTally, Classifier, HypothesisResult};
use crate::{AnalysisError, DecodedPacket, Frame, PacketFields, ProtocolError};

/// Number of frames whose per-hypothesis checksum results are kept verbatim.
pub const DEFAULT_SAMPLE_LIMIT: usize = 10;

/// A frame the classifier refused, kept with its position in the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedFrame {
    pub index: usize,
    pub frame: Frame,
    #[serde(serialize_with = "serialize_error")]
    pub error: ProtocolError,
}

fn serialize_error<S: serde::Serializer>(error: &ProtocolError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

/// Per-hypothesis results for one frame of the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumSample {
    pub index: usize,
    pub frame: Frame,
    pub results: Vec<HypothesisResult>,
}

/// Everything one analysis pass learned about a capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub frame_count: usize,
    pub skipped_lines: usize,
    pub profile: StructuralProfile,
    pub checksum_tallies: Vec<ChecksumTally>,
    pub checksum_samples: Vec<ChecksumSample>,
    pub packets: Vec<DecodedPacket>,
    pub rejected: Vec<RejectedFrame>,
    pub correlation: Option<CorrelationReport>,
}

impl AnalysisReport {
    /// Hypothesis that explained the most frames, if any explained one.
    ///
    /// Ties go to the hypothesis registered first.
    pub fn best_checksum(&self) -> Option<&ChecksumTally> {
        self.checksum_tallies
            .iter()
            .filter(|t| t.matches > 0)
            .fold(None, |best: Option<&ChecksumTally>, t| match best {
                Some(b) if b.matches >= t.matches => Some(b),
                _ => Some(t),
            })
    }

    pub fn distinct_frames(&self) -> usize {
        self.profile.classes.len()
    }
}

/// Runs every analysis stage over an extracted capture.
#[derive(Debug, Clone)]
pub struct Analyzer {
    classifier: Classifier,
    checksums: ChecksumRegistry,
    reference: Option<f64>,
    sample_limit: usize,
}

impl Analyzer {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            checksums: ChecksumRegistry::default(),
            reference: None,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }

    pub fn with_checksums(mut self, checksums: ChecksumRegistry) -> Self {
        self.checksums = checksums;
        self
    }

    /// Ambient temperature in degrees Fahrenheit to correlate against.
    pub fn with_reference(mut self, reference: f64) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    pub fn analyze(&self, extraction: LogExtraction) -> Result<AnalysisReport, AnalysisError> {
        let frames = extraction.frames;
        info!(
            frames = frames.len(),
            skipped = extraction.skipped,
            "analyzing capture"
        );

        // header validation is advisory here: every frame is profiled
        let profile = profile(&frames)?;
        let checksum_tallies = self.checksums.tally(&frames);

        let checksum_samples = frames
            .iter()
            .take(self.sample_limit)
            .enumerate()
            .map(|(index, frame)| ChecksumSample {
                index,
                frame: *frame,
                results: self.checksums.evaluate(frame),
            })
            .collect();

        let mut packets = Vec::with_capacity(frames.len());
        let mut rejected = Vec::new();
        for (index, frame) in frames.iter().enumerate() {
            match self.classifier.classify(frame) {
                Ok(packet) => packets.push(packet),
                Err(error) => {
                    debug!(index, %frame, %error, "frame rejected by classifier");
                    rejected.push(RejectedFrame {
                        index,
                        frame: *frame,
                        error,
                    });
                }
            }
        }

        // header-rejected frames stay in the profile even when nothing decodes
        let correlation = match self.reference {
            Some(reference) if packets.is_empty() && reference.is_finite() => {
                warn!(
                    rejected = rejected.len(),
                    "no frame passed header validation, skipping correlation"
                );
                None
            }
            Some(reference) => {
                let fields: Vec<PacketFields> = packets.iter().map(|p| p.fields).collect();
                Some(correlate(&fields, reference)?)
            }
            None => None,
        };

        Ok(AnalysisReport {
            frame_count: frames.len(),
            skipped_lines: extraction.skipped,
            profile,
            checksum_tallies,
            checksum_samples,
            packets,
            rejected,
            correlation,
        })
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(Classifier::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{Confidence, TemperatureVerdict};
    use crate::extract_log;

    const SCENARIO: &str = "\
HEX: 55 AA 08 00 15 49 00 AB                          ASCII: [U....I..]
HEX: 55 AA 08 00 15 49 00 AB                          ASCII: [U....I..]
HEX: 55 AA 08 00 15 49 00 AB                          ASCII: [U....I..]
";

    #[test]
    fn end_to_end_identical_frames() {
        let report = Analyzer::default().analyze(extract_log(SCENARIO)).unwrap();

        assert_eq!(report.frame_count, 3);
        assert_eq!(report.distinct_frames(), 1);
        assert_eq!(report.profile.classes[0].occurrences, 3);
        for position in 0..3 {
            assert!(report.profile.positions[position].is_constant());
        }

        let xor = &report.checksum_tallies[0];
        assert_eq!(xor.name, "xor-fold");
        assert_eq!(xor.matches, 3);
        assert_eq!(report.best_checksum().map(|t| t.name), Some("xor-fold"));
        assert!(report.checksum_samples.iter().all(|s| s.results[0].matches));

        assert_eq!(report.packets.len(), 3);
        assert!(report.rejected.is_empty());
        assert!(report.correlation.is_none());
    }

    #[test]
    fn empty_capture_fails() {
        let result = Analyzer::default().analyze(extract_log("no frames here\n"));
        assert_eq!(result, Err(AnalysisError::EmptyCorpus));
    }

    #[test]
    fn bad_headers_are_profiled_but_not_decoded() {
        let text = "\
HEX: 55 AA 08 00 15 49 00 AB   ASCII: [U....I..]
HEX: AA 55 08 00 15 49 00 AB   ASCII: [.U...I..]
HEX: 55 AA 08 00 15   ASCII: [U....]
";
        let report = Analyzer::default().analyze(extract_log(text)).unwrap();

        assert_eq!(report.frame_count, 2);
        assert_eq!(report.skipped_lines, 1);
        assert_eq!(report.profile.frames, 2);
        assert_eq!(report.packets.len(), 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].index, 1);
    }

    #[test]
    fn correlation_runs_with_reference() {
        let text = "\
HEX: 55 AA 08 00 15 49 00 AB   ASCII: [U....I..]
HEX: 55 AA 08 01 1E 4B 00 A3   ASCII: [U....K..]
";
        let report = Analyzer::default()
            .with_reference(73.0)
            .analyze(extract_log(text))
            .unwrap();

        let correlation = report.correlation.unwrap();
        assert_eq!(correlation.sensors.len(), 2);
        assert!(
            correlation
                .sensors
                .iter()
                .all(|r| r.confidence == Confidence::Likely)
        );
        assert_eq!(correlation.verdict, TemperatureVerdict::Supported);
    }

    #[test]
    fn reference_with_only_bad_headers_keeps_report() {
        let text = "\
HEX: AA 55 08 00 15 49 00 AB   ASCII: [.U...I..]
HEX: AA 55 08 01 1E 4B 00 A3   ASCII: [.U...K..]
";
        let report = Analyzer::default()
            .with_reference(73.0)
            .analyze(extract_log(text))
            .unwrap();

        assert_eq!(report.frame_count, 2);
        assert_eq!(report.profile.frames, 2);
        assert_eq!(report.checksum_tallies[0].total, 2);
        assert!(report.packets.is_empty());
        assert_eq!(report.rejected.len(), 2);
        assert!(report.correlation.is_none());
    }

    #[test]
    fn invalid_reference_still_fails() {
        let result = Analyzer::default()
            .with_reference(f64::NAN)
            .analyze(extract_log(SCENARIO));

        assert!(matches!(result, Err(AnalysisError::InvalidReference(_))));
    }

    #[test]
    fn sample_limit_caps_checksum_samples() {
        let report = Analyzer::default()
            .with_sample_limit(2)
            .analyze(extract_log(SCENARIO))
            .unwrap();

        assert_eq!(report.checksum_samples.len(), 2);
        assert_eq!(report.checksum_tallies[0].total, 3);
    }

    #[test]
    fn no_checksum_fits() {
        let text = "HEX: 55 AA 08 00 15 49 00 01   ASCII: [U....I..]\n";
        let report = Analyzer::default().analyze(extract_log(text)).unwrap();

        assert!(report.best_checksum().is_none());
        assert!(!report.packets[0].checksum_valid);
    }

    #[test]
    fn report_serializes() {
        let report = Analyzer::default()
            .with_reference(73.0)
            .analyze(extract_log(SCENARIO))
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["frame_count"], 3);
        assert_eq!(json["packets"][0]["location"], "Front Left (FL)");
        assert_eq!(json["correlation"]["verdict"], "Supported");
    }
}
