use std::io::{self, Read};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortInfo, StopBits};
use tracing::info;

use super::ByteSource;

pub const DEFAULT_BAUD_RATE: u32 = 9600;

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Serial port error: {0}")]
    Port(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// USB TPMS receiver attached to a serial port, read at 8-N-1.
pub struct SerialSource {
    port: Box<dyn SerialPort>,
}

impl SerialSource {
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, SerialError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()?;

        info!(path, baud_rate, "Serial port opened");
        Ok(Self { port })
    }
}

impl ByteSource for SerialSource {
    type Error = SerialError;

    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(SerialError::Io(e)),
        }
    }
}

/// Serial ports visible to the host.
pub fn available_ports() -> Result<Vec<SerialPortInfo>, SerialError> {
    Ok(serialport::available_ports()?)
}

pub fn port_type_name(info: &SerialPortInfo) -> &'static str {
    match info.port_type {
        serialport::SerialPortType::UsbPort(_) => "USB",
        serialport::SerialPortType::BluetoothPort => "Bluetooth",
        serialport::SerialPortType::PciPort => "PCI",
        serialport::SerialPortType::Unknown => "Unknown",
    }
}
