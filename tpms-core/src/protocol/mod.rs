pub mod checksum;
pub mod classify;
mod error;
mod layout;

use std::ops::RangeInclusive;

pub use checksum::{ChecksumHypothesis, ChecksumRegistry, ChecksumTally, HypothesisResult, xor_fold};
pub use classify::Classifier;
pub use error::{ProtocolError, ProtocolResult};
pub use layout::FieldLayout;

// packet structure : sync(2) + length(1) + sensor(1) + pressure(1) + temp(1) + reserved(1) + checksum(1)

pub const SYNC_PATTERN: [u8; 2] = [0x55, 0xAA];
pub const FRAME_LENGTH: u8 = 0x08;
pub const FRAME_SIZE: usize = FRAME_LENGTH as usize;
pub const PREFIX_SIZE: usize = 3;
pub const FRAME_PREFIX: [u8; PREFIX_SIZE] = [SYNC_PATTERN[0], SYNC_PATTERN[1], FRAME_LENGTH];
/// Byte offsets that may carry semantic fields under some layout.
pub const PAYLOAD_OFFSETS: RangeInclusive<usize> = PREFIX_SIZE..=FRAME_SIZE - 2;
