pub mod mock;
pub mod serial;

/// Ordered byte source backing the live decoder.
///
/// Both methods must return immediately. The live reader polls
/// `bytes_available` and only reads what the source reports as ready, so an
/// implementation never has to block waiting for the receiver.
pub trait ByteSource: Send + 'static {
    /// Error type for this byte source implementation.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Number of bytes that can be read without waiting.
    fn bytes_available(&mut self) -> Result<usize, Self::Error>;

    /// Reads up to `buf.len()` available bytes, returning how many were read.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}
