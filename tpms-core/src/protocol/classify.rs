use std::sync::Arc;

use super::{FieldLayout, checksum::xor_fold, error::ProtocolError, error::ProtocolResult};
use crate::{DecodedPacket, Frame, PressureStatus, SensorRegistry, TemperatureStatus};

/// Maps validated frames onto semantic fields and status bands.
///
/// The registry is shared rather than owned so a classifier can be cloned
/// into long-running tasks without copying the location table.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    layout: FieldLayout,
    registry: Arc<SensorRegistry>,
}

impl Classifier {
    pub fn new(layout: FieldLayout, registry: Arc<SensorRegistry>) -> Self {
        Self { layout, registry }
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    /// Decodes a frame.
    ///
    /// Fails only on a bad sync pattern or length byte. The checksum is
    /// checked with the XOR fold and reported through
    /// [`DecodedPacket::checksum_valid`]; a mismatch still yields a packet.
    pub fn classify(&self, frame: &Frame) -> ProtocolResult<DecodedPacket> {
        if !frame.has_valid_prefix() {
            let bytes = frame.bytes();
            return Err(ProtocolError::InvalidHeader {
                header: [bytes[0], bytes[1]],
                length: bytes[2],
            });
        }

        let fields = self.layout.project(frame);

        Ok(DecodedPacket {
            fields,
            checksum_valid: xor_fold(frame.body()) == fields.checksum,
            pressure_status: PressureStatus::from_psi(fields.pressure),
            temperature_status: TemperatureStatus::from_fahrenheit(fields.temperature),
            location: self.registry.location(fields.sensor_id).into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(sensor: u8, pressure: u8, temp: u8) -> Frame {
        let mut bytes = [0x55, 0xAA, 0x08, sensor, pressure, temp, 0x00, 0x00];
        bytes[7] = xor_fold(&bytes[..7]);
        Frame::new(bytes)
    }

    #[test]
    fn decodes_front_left() {
        let packet = Classifier::default().classify(&frame(0, 21, 73)).unwrap();

        assert_eq!(packet.fields.sensor_id, 0);
        assert_eq!(packet.fields.pressure, 21);
        assert_eq!(packet.fields.temperature, 73);
        assert!(packet.checksum_valid);
        assert_eq!(packet.pressure_status, PressureStatus::Normal);
        assert_eq!(packet.temperature_status, TemperatureStatus::Normal);
        assert_eq!(&*packet.location, "Front Left (FL)");
    }

    #[test]
    fn bad_checksum_is_flagged_not_fatal() {
        let mut bytes = *frame(1, 30, 75).bytes();
        bytes[7] ^= 0xFF;

        let packet = Classifier::default().classify(&Frame::new(bytes)).unwrap();
        assert!(!packet.checksum_valid);
        assert_eq!(packet.pressure_status, PressureStatus::High);
    }

    #[test]
    fn rejects_bad_sync() {
        let bytes = [0x54, 0xAA, 0x08, 0x00, 0x15, 0x49, 0x00, 0xAA];
        let err = Classifier::default()
            .classify(&Frame::new(bytes))
            .unwrap_err();

        assert_eq!(
            err,
            ProtocolError::InvalidHeader {
                header: [0x54, 0xAA],
                length: 0x08
            }
        );
    }

    #[test]
    fn rejects_bad_length_byte() {
        let bytes = [0x55, 0xAA, 0x07, 0x00, 0x15, 0x49, 0x00, 0xAA];
        let err = Classifier::default()
            .classify(&Frame::new(bytes))
            .unwrap_err();

        assert!(matches!(err, ProtocolError::InvalidHeader { length: 0x07, .. }));
    }

    #[test]
    fn classification_is_idempotent() {
        let classifier = Classifier::default();
        let f = frame(16, 23, 68);

        assert_eq!(classifier.classify(&f), classifier.classify(&f));
    }

    #[test]
    fn unknown_sensor_still_decodes() {
        let packet = Classifier::default().classify(&frame(99, 0, 20)).unwrap();

        assert_eq!(&*packet.location, "Unknown Sensor 99");
        assert_eq!(packet.pressure_status, PressureStatus::Dormant);
        assert_eq!(packet.temperature_status, TemperatureStatus::Freezing);
    }

    #[test]
    fn uses_injected_layout_and_registry() {
        let layout = FieldLayout::new(3, 5, 4, 6).unwrap();
        let registry = SensorRegistry::empty().with_location(7, "Spare");
        let classifier = Classifier::new(layout, Arc::new(registry));

        let packet = classifier.classify(&frame(7, 40, 100)).unwrap();
        assert_eq!(packet.fields.pressure, 100);
        assert_eq!(packet.fields.temperature, 40);
        assert_eq!(&*packet.location, "Spare");
    }

    #[test]
    fn pressure_band_boundaries() {
        let cases = [
            (0, PressureStatus::Dormant),
            (1, PressureStatus::Low),
            (14, PressureStatus::Low),
            (15, PressureStatus::Normal),
            (29, PressureStatus::Normal),
            (30, PressureStatus::High),
            (39, PressureStatus::High),
            (40, PressureStatus::VeryHigh),
            (255, PressureStatus::VeryHigh),
        ];

        for (psi, expected) in cases {
            assert_eq!(PressureStatus::from_psi(psi), expected, "psi {psi}");
        }
    }

    #[test]
    fn temperature_band_boundaries() {
        let cases = [
            (0, TemperatureStatus::Freezing),
            (31, TemperatureStatus::Freezing),
            (32, TemperatureStatus::Cold),
            (59, TemperatureStatus::Cold),
            (60, TemperatureStatus::Normal),
            (79, TemperatureStatus::Normal),
            (80, TemperatureStatus::Hot),
            (99, TemperatureStatus::Hot),
            (100, TemperatureStatus::Overheating),
        ];

        for (temp, expected) in cases {
            assert_eq!(
                TemperatureStatus::from_fahrenheit(temp),
                expected,
                "temp {temp}"
            );
        }
    }
}
