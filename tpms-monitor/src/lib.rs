pub mod capture;
pub mod config;
pub mod live;
pub mod present;
pub mod transport;

pub use capture::CaptureLog;
pub use config::{CaptureConfig, Config, DecoderConfig, SensorLabel, TransportConfig};
pub use live::{FrameReader, LiveEvent, spawn_decoder};
pub use transport::ByteSource;
pub use transport::mock::{ReplaySource, SimulatedSource};
pub use transport::serial::{SerialError, SerialSource};
