use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::protocol::FRAME_SIZE;
use crate::{AnalysisError, Frame};

/// Value histogram for one byte position across a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ByteProfile {
    pub position: usize,
    pub counts: BTreeMap<u8, usize>,
}

impl ByteProfile {
    /// Number of distinct values observed at this position.
    pub fn cardinality(&self) -> usize {
        self.counts.len()
    }

    /// A constant position is a candidate header or reserved byte.
    pub fn is_constant(&self) -> bool {
        self.cardinality() == 1
    }

    pub fn constant_value(&self) -> Option<u8> {
        match self.is_constant() {
            true => self.counts.keys().next().copied(),
            false => None,
        }
    }

    /// Value/count pairs, most frequent first, ties by ascending value.
    pub fn ranked(&self) -> Vec<(u8, usize)> {
        let mut ranked: Vec<_> = self.counts.iter().map(|(v, c)| (*v, *c)).collect();
        // the map is already value-ordered, so a stable sort keeps ties ascending
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

/// One distinct frame and how often it occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameClass {
    pub frame: Frame,
    pub occurrences: usize,
}

/// Per-position statistics for a corpus of frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralProfile {
    /// Number of frames profiled.
    pub frames: usize,
    /// One profile per byte position, indexed by position.
    pub positions: Vec<ByteProfile>,
    /// Distinct frames in first-seen order.
    pub classes: Vec<FrameClass>,
}

impl StructuralProfile {
    pub fn constant_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.positions
            .iter()
            .filter(|p| p.is_constant())
            .map(|p| p.position)
    }

    pub fn variable_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.positions
            .iter()
            .filter(|p| !p.is_constant())
            .map(|p| p.position)
    }
}

/// Profiles every byte position of `frames`.
///
/// Fails with [`AnalysisError::EmptyCorpus`] when there is nothing to
/// profile rather than reporting empty histograms.
pub fn profile(frames: &[Frame]) -> Result<StructuralProfile, AnalysisError> {
    if frames.is_empty() {
        return Err(AnalysisError::EmptyCorpus);
    }

    let mut positions: Vec<ByteProfile> = (0..FRAME_SIZE)
        .map(|position| ByteProfile {
            position,
            counts: BTreeMap::new(),
        })
        .collect();

    let mut classes: Vec<FrameClass> = Vec::new();
    let mut class_index: HashMap<Frame, usize> = HashMap::new();

    for frame in frames {
        for (profile, byte) in positions.iter_mut().zip(frame.bytes()) {
            *profile.counts.entry(*byte).or_default() += 1;
        }

        match class_index.get(frame) {
            Some(&i) => classes[i].occurrences += 1,
            None => {
                class_index.insert(*frame, classes.len());
                classes.push(FrameClass {
                    frame: *frame,
                    occurrences: 1,
                });
            }
        }
    }

    Ok(StructuralProfile {
        frames: frames.len(),
        positions,
        classes,
    })
}
