use serde::Serialize;

use crate::Frame;

/// Candidate algorithm for the trailing validation byte.
///
/// `compute` receives every byte of the frame except the trailer and returns
/// the byte it predicts the trailer to be.
#[derive(Debug, Clone, Copy)]
pub struct ChecksumHypothesis {
    pub name: &'static str,
    pub compute: fn(&[u8]) -> u8,
}

impl ChecksumHypothesis {
    pub const XOR_FOLD: Self = Self {
        name: "xor-fold",
        compute: xor_fold,
    };

    pub const ADDITIVE_SUM: Self = Self {
        name: "additive-sum",
        compute: additive_sum,
    };

    pub const TWOS_COMPLEMENT: Self = Self {
        name: "twos-complement",
        compute: twos_complement,
    };

    pub fn evaluate(&self, frame: &Frame) -> HypothesisResult {
        let predicted = (self.compute)(frame.body());
        let actual = frame.trailer();

        HypothesisResult {
            name: self.name,
            predicted,
            actual,
            matches: predicted == actual,
        }
    }
}

pub fn xor_fold(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

fn additive_sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

fn twos_complement(bytes: &[u8]) -> u8 {
    additive_sum(bytes).wrapping_neg()
}

/// Outcome of one hypothesis against one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HypothesisResult {
    pub name: &'static str,
    pub predicted: u8,
    pub actual: u8,
    pub matches: bool,
}

/// How often one hypothesis matched across a corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChecksumTally {
    pub name: &'static str,
    pub matches: usize,
    pub total: usize,
}

impl ChecksumTally {
    /// Fraction of frames the hypothesis explained, `0.0` for an empty corpus.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.matches as f64 / self.total as f64
    }
}

/// Ordered set of checksum hypotheses evaluated uniformly against frames.
#[derive(Debug, Clone)]
pub struct ChecksumRegistry {
    hypotheses: Vec<ChecksumHypothesis>,
}

impl ChecksumRegistry {
    pub fn empty() -> Self {
        Self {
            hypotheses: Vec::new(),
        }
    }

    pub fn with_hypothesis(mut self, hypothesis: ChecksumHypothesis) -> Self {
        self.hypotheses.push(hypothesis);
        self
    }

    pub fn hypotheses(&self) -> &[ChecksumHypothesis] {
        &self.hypotheses
    }

    /// Results for every hypothesis, in registration order.
    pub fn evaluate(&self, frame: &Frame) -> Vec<HypothesisResult> {
        self.hypotheses.iter().map(|h| h.evaluate(frame)).collect()
    }

    /// Per-hypothesis match counts over a corpus, in registration order.
    pub fn tally(&self, frames: &[Frame]) -> Vec<ChecksumTally> {
        self.hypotheses
            .iter()
            .map(|h| ChecksumTally {
                name: h.name,
                matches: frames.iter().filter(|f| h.evaluate(f).matches).count(),
                total: frames.len(),
            })
            .collect()
    }
}

impl Default for ChecksumRegistry {
    fn default() -> Self {
        Self::empty()
            .with_hypothesis(ChecksumHypothesis::XOR_FOLD)
            .with_hypothesis(ChecksumHypothesis::ADDITIVE_SUM)
            .with_hypothesis(ChecksumHypothesis::TWOS_COMPLEMENT)
    }
}
