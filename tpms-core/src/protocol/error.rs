pub type ProtocolResult<T> = core::result::Result<T, ProtocolError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame must be {expected} bytes, got {actual}")]
    InvalidFrameLength { expected: usize, actual: usize },

    #[error("invalid header {header:02X?} with length byte {length:#04X}")]
    InvalidHeader { header: [u8; 2], length: u8 },

    #[error("invalid field layout: {0}")]
    InvalidLayout(&'static str),
}
