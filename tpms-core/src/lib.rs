use std::fmt;

use serde::Serialize;

pub mod correlation;
pub mod extract;
pub mod profile;
pub mod protocol;
pub mod registry;
pub mod report;

pub use correlation::{Confidence, CorrelationReport, CorrelationResult, TemperatureVerdict};
pub use extract::{LogExtraction, StreamFramer, extract_log};
pub use profile::{ByteProfile, FrameClass, StructuralProfile};
pub use protocol::{
    ChecksumHypothesis, ChecksumRegistry, ChecksumTally, Classifier, FieldLayout,
    HypothesisResult, ProtocolError,
};
pub use registry::SensorRegistry;
pub use report::{AnalysisReport, Analyzer, RejectedFrame};

use protocol::{FRAME_LENGTH, FRAME_SIZE, SYNC_PATTERN};

// Location labels never change after the registry is built, so we keep them
// as `Box<str>` rather than `String`.
type BoxStr = Box<str>;

/// Sensor identifier as carried on the wire.
pub type SensorId = u8;

/// Errors raised by corpus-level analysis operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("analysis requires at least one frame")]
    EmptyCorpus,

    #[error("ambient reference must be a finite temperature, got {0}")]
    InvalidReference(f64),
}

/// One fixed-length unit cut from the receiver byte stream.
///
/// A `Frame` always holds exactly [`FRAME_SIZE`] bytes; anything else is
/// rejected when the frame is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Frame([u8; FRAME_SIZE]);

impl Frame {
    pub const fn new(bytes: [u8; FRAME_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.0
    }

    /// Every byte covered by the checksum (all but the trailing byte).
    pub fn body(&self) -> &[u8] {
        &self.0[..FRAME_SIZE - 1]
    }

    /// The trailing byte, assumed to be the checksum.
    pub fn trailer(&self) -> u8 {
        self.0[FRAME_SIZE - 1]
    }

    /// Whether the frame starts with the sync pattern and the fixed length byte.
    pub fn has_valid_prefix(&self) -> bool {
        self.0[..2] == SYNC_PATTERN && self.0[2] == FRAME_LENGTH
    }
}

impl TryFrom<&[u8]> for Frame {
    type Error = ProtocolError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; FRAME_SIZE] =
            value
                .try_into()
                .map_err(|_| ProtocolError::InvalidFrameLength {
                    expected: FRAME_SIZE,
                    actual: value.len(),
                })?;

        Ok(Self(bytes))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// Semantic decomposition of a [`Frame`] under a [`FieldLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PacketFields {
    /// Sync bytes, expected to be `55 AA`.
    pub header: [u8; 2],
    /// Declared frame length, expected to be 8.
    pub length: u8,
    pub sensor_id: SensorId,
    /// Tire pressure in PSI.
    pub pressure: u8,
    /// Tire temperature in degrees Fahrenheit.
    pub temperature: u8,
    /// Usually `0x00`.
    pub reserved: u8,
    pub checksum: u8,
}

/// Pressure band derived from the PSI reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PressureStatus {
    /// Sensor reports zero pressure, usually because it has not woken up.
    Dormant,
    Low,
    Normal,
    High,
    VeryHigh,
}

impl PressureStatus {
    pub fn from_psi(psi: u8) -> Self {
        match psi {
            0 => Self::Dormant,
            1..=14 => Self::Low,
            15..=29 => Self::Normal,
            30..=39 => Self::High,
            _ => Self::VeryHigh,
        }
    }
}

/// Temperature band derived from the Fahrenheit reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TemperatureStatus {
    Freezing,
    Cold,
    Normal,
    Hot,
    Overheating,
}

impl TemperatureStatus {
    pub fn from_fahrenheit(temp: u8) -> Self {
        match temp {
            0..=31 => Self::Freezing,
            32..=59 => Self::Cold,
            60..=79 => Self::Normal,
            80..=99 => Self::Hot,
            _ => Self::Overheating,
        }
    }
}

/// A frame that passed header validation, with its status bands resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedPacket {
    pub fields: PacketFields,
    /// Result of the XOR-fold check. A mismatch never prevents decoding.
    pub checksum_valid: bool,
    pub pressure_status: PressureStatus,
    pub temperature_status: TemperatureStatus,
    /// Physical location of the sensor, from the registry.
    pub location: BoxStr,
}
