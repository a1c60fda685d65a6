use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tpms_core::Frame;

/// Width of the padded hex column, wide enough for 16 bytes.
const HEX_COLUMN_WIDTH: usize = 48;

/// `HEX: 55 AA 08 ...  ASCII: [U..]`, the line the log extractor reads back.
pub fn format_hex_ascii(data: &[u8]) -> String {
    let hex = data
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ");
    let ascii: String = data
        .iter()
        .map(|&b| match b {
            32..=126 => b as char,
            _ => '.',
        })
        .collect();

    format!("HEX: {hex:<HEX_COLUMN_WIDTH$} ASCII: [{ascii}]")
}

/// `BYTES: 55 AA 08 ...`, a received chunk in hex.
///
/// The log extractor skips these; only reassembled frames are written as
/// `HEX:` lines.
pub fn format_chunk(data: &[u8]) -> String {
    let hex = data
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ");

    format!("BYTES: {hex}")
}

/// `RAW: 85 170 8 ...`, the same bytes in decimal.
pub fn format_raw(data: &[u8]) -> String {
    let raw = data
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(" ");

    format!("RAW: {raw}")
}

/// Append-only record of the receiver traffic.
///
/// Raw chunks are kept for inspection; every complete frame gets its own
/// `HEX:` line, which is what offline analysis reads back.
pub struct CaptureLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CaptureLog {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records a chunk exactly as the transport delivered it.
    pub fn record(&mut self, data: &[u8]) -> io::Result<()> {
        let stamp = timestamp();

        writeln!(self.writer)?;
        writeln!(self.writer, "--- {stamp} ---")?;
        writeln!(self.writer, "[{stamp}] Received {} bytes:", data.len())?;
        writeln!(self.writer, "{}", format_chunk(data))?;
        writeln!(self.writer, "{}", format_raw(data))?;
        self.writer.flush()
    }

    /// Records one reassembled frame.
    pub fn record_frame(&mut self, frame: &Frame) -> io::Result<()> {
        writeln!(self.writer, "[{}] Frame:", timestamp())?;
        writeln!(self.writer, "{}", format_hex_ascii(frame.bytes()))?;
        self.writer.flush()
    }
}

fn timestamp() -> String {
    let now = jiff::Zoned::now();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        now.hour(),
        now.minute(),
        now.second(),
        now.millisecond()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: [u8; 8] = [0x55, 0xAA, 0x08, 0x00, 0x15, 0x49, 0x00, 0xAB];

    #[test]
    fn hex_ascii_line() {
        let line = format_hex_ascii(&FRAME);

        assert!(line.starts_with("HEX: 55 AA 08 00 15 49 00 AB "));
        assert!(line.ends_with(" ASCII: [U....I..]"));
        assert_eq!(line.find("ASCII:"), Some(5 + HEX_COLUMN_WIDTH + 1));
    }

    #[test]
    fn raw_line() {
        assert_eq!(format_raw(&FRAME), "RAW: 85 170 8 0 21 73 0 171");
    }

    #[test]
    fn chunk_line_is_not_extractable() {
        let line = format_chunk(&FRAME);

        assert_eq!(line, "BYTES: 55 AA 08 00 15 49 00 AB");
        assert!(!line.contains("HEX:"));
    }

    #[test]
    fn long_chunks_overflow_the_column() {
        let line = format_hex_ascii(&[0x41; 20]);
        assert!(line.contains("41 41 ASCII: [AAAAAAAAAAAAAAAAAAAA]"));
    }
}
