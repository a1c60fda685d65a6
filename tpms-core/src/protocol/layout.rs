use serde::{Deserialize, Serialize};

use super::{PAYLOAD_OFFSETS, error::ProtocolError, error::ProtocolResult};
use crate::{Frame, PacketFields};

/// Hypothesized placement of the semantic fields inside a frame.
///
/// The header, length and checksum positions are fixed by the wire format;
/// only the four payload bytes between them are up for debate. Each field
/// names the byte offset it is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldLayout")]
pub struct FieldLayout {
    sensor_id: usize,
    pressure: usize,
    temperature: usize,
    reserved: usize,
}

#[derive(Deserialize)]
struct RawFieldLayout {
    sensor_id: usize,
    pressure: usize,
    temperature: usize,
    reserved: usize,
}

impl TryFrom<RawFieldLayout> for FieldLayout {
    type Error = ProtocolError;

    fn try_from(raw: RawFieldLayout) -> Result<Self, Self::Error> {
        Self::new(raw.sensor_id, raw.pressure, raw.temperature, raw.reserved)
    }
}

impl FieldLayout {
    /// The layout confirmed against live tire readings.
    pub const WIRE: Self = Self {
        sensor_id: 3,
        pressure: 4,
        temperature: 5,
        reserved: 6,
    };

    pub fn new(
        sensor_id: usize,
        pressure: usize,
        temperature: usize,
        reserved: usize,
    ) -> ProtocolResult<Self> {
        let offsets = [sensor_id, pressure, temperature, reserved];

        if offsets.iter().any(|o| !PAYLOAD_OFFSETS.contains(o)) {
            return Err(ProtocolError::InvalidLayout(
                "field offsets must address payload bytes 3 to 6",
            ));
        }

        for (i, a) in offsets.iter().enumerate() {
            if offsets[i + 1..].contains(a) {
                return Err(ProtocolError::InvalidLayout(
                    "two fields share the same offset",
                ));
            }
        }

        Ok(Self {
            sensor_id,
            pressure,
            temperature,
            reserved,
        })
    }

    pub fn project(&self, frame: &Frame) -> PacketFields {
        let bytes = frame.bytes();

        PacketFields {
            header: [bytes[0], bytes[1]],
            length: bytes[2],
            sensor_id: bytes[self.sensor_id],
            pressure: bytes[self.pressure],
            temperature: bytes[self.temperature],
            reserved: bytes[self.reserved],
            checksum: frame.trailer(),
        }
    }
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self::WIRE
    }
}
