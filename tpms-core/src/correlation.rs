use std::collections::{BTreeMap, BTreeSet};

use ordered_float::NotNan;
use serde::Serialize;

use crate::{AnalysisError, PacketFields, SensorId};

/// Largest |delta| still treated as a direct temperature reading.
pub const LIKELY_DELTA: f64 = 5.0;
/// Largest |delta| still treated as a temperature reading with an offset.
pub const POSSIBLE_DELTA: f64 = 15.0;

/// How plausibly a sensor's temperature field tracks the ambient reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Confidence {
    Likely,
    /// Close enough to be temperature with a calibration or heating offset.
    Possible,
    Unlikely,
}

impl Confidence {
    pub fn from_delta(delta: f64) -> Self {
        let delta = delta.abs();
        if delta <= LIKELY_DELTA {
            Self::Likely
        } else if delta <= POSSIBLE_DELTA {
            Self::Possible
        } else {
            Self::Unlikely
        }
    }
}

/// Overall judgment on the hypothesized temperature field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TemperatureVerdict {
    /// At least half of the distinct values sit near the reference.
    Supported,
    Inconclusive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    pub sensor_id: SensorId,
    pub samples: usize,
    pub mean: f64,
    /// `mean - reference`; positive when the sensor reads warmer.
    pub delta: f64,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationReport {
    pub reference: NotNan<f64>,
    /// Ordered by sensor id.
    pub sensors: Vec<CorrelationResult>,
    pub distinct_values: BTreeSet<u8>,
    /// Distinct values within [`POSSIBLE_DELTA`] of the reference.
    pub close_values: BTreeSet<u8>,
    pub verdict: TemperatureVerdict,
}

/// Scores the temperature field of `packets` against an ambient reading
/// in degrees Fahrenheit.
pub fn correlate(
    packets: &[PacketFields],
    reference: f64,
) -> Result<CorrelationReport, AnalysisError> {
    let reference = NotNan::new(reference)
        .ok()
        .filter(|r| r.is_finite())
        .ok_or(AnalysisError::InvalidReference(reference))?;

    if packets.is_empty() {
        return Err(AnalysisError::EmptyCorpus);
    }

    let mut by_sensor: BTreeMap<SensorId, Vec<u8>> = BTreeMap::new();
    for packet in packets {
        by_sensor
            .entry(packet.sensor_id)
            .or_default()
            .push(packet.temperature);
    }

    let sensors = by_sensor
        .iter()
        .map(|(sensor_id, temps)| {
            let sum: f64 = temps.iter().map(|t| f64::from(*t)).sum();
            let mean = sum / temps.len() as f64;
            let delta = mean - *reference;

            CorrelationResult {
                sensor_id: *sensor_id,
                samples: temps.len(),
                mean,
                delta,
                confidence: Confidence::from_delta(delta),
            }
        })
        .collect();

    let distinct_values: BTreeSet<u8> = packets.iter().map(|p| p.temperature).collect();
    let close_values: BTreeSet<u8> = distinct_values
        .iter()
        .copied()
        .filter(|t| (f64::from(*t) - *reference).abs() <= POSSIBLE_DELTA)
        .collect();

    let verdict = if close_values.len() * 2 >= distinct_values.len() {
        TemperatureVerdict::Supported
    } else {
        TemperatureVerdict::Inconclusive
    };

    Ok(CorrelationReport {
        reference,
        sensors,
        distinct_values,
        close_values,
        verdict,
    })
}
