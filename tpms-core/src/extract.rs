//! Cutting raw input into candidate [`Frame`]s.
//!
//! Two sources are supported. Capture logs are scanned line by line for a
//! `HEX: <bytes> ASCII:` run; live byte streams are resynchronized on the
//! `55 AA 08` prefix. Neither path ever hands out a frame that is not exactly
//! [`FRAME_SIZE`] bytes long.

use serde::Serialize;
use tracing::{debug, trace};

use crate::Frame;
use crate::protocol::{FRAME_PREFIX, FRAME_SIZE, PREFIX_SIZE};

const HEX_MARKER: &str = "HEX:";
const ASCII_MARKER: &str = "ASCII:";

/// Frames recovered from a capture log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogExtraction {
    /// Accepted frames, in log order.
    pub frames: Vec<Frame>,
    /// Lines that carried a `HEX:` marker.
    pub candidates: usize,
    /// Candidate lines dropped as malformed or not frame-sized.
    pub skipped: usize,
}

/// Scans capture log text for frames.
///
/// A line is a candidate when it contains `HEX:`. It is accepted when the
/// text between that marker and the following `ASCII:` marker is a run of
/// exactly eight whitespace-separated, two-digit, uppercase hex bytes.
/// Everything else is skipped and counted.
pub fn extract_log(text: &str) -> LogExtraction {
    let mut extraction = LogExtraction::default();

    for (number, line) in text.lines().enumerate() {
        let Some(start) = line.find(HEX_MARKER) else {
            continue;
        };
        extraction.candidates += 1;

        match parse_hex_run(&line[start + HEX_MARKER.len()..]) {
            Some(frame) => extraction.frames.push(frame),
            None => {
                trace!(line = number + 1, "skipping malformed HEX line");
                extraction.skipped += 1;
            }
        }
    }

    debug!(
        frames = extraction.frames.len(),
        candidates = extraction.candidates,
        skipped = extraction.skipped,
        "log extraction finished"
    );

    extraction
}

fn parse_hex_run(rest: &str) -> Option<Frame> {
    let end = rest.find(ASCII_MARKER)?;
    let run = &rest[..end];

    // at least one whitespace must separate the run from the ASCII marker
    if !run.ends_with(char::is_whitespace) {
        return None;
    }

    let mut bytes = [0u8; FRAME_SIZE];
    let mut count = 0;

    for token in run.split_whitespace() {
        if count == FRAME_SIZE {
            return None;
        }
        bytes[count] = parse_byte(token)?;
        count += 1;
    }

    (count == FRAME_SIZE).then(|| Frame::new(bytes))
}

fn parse_byte(token: &str) -> Option<u8> {
    let valid = token.len() == 2
        && token
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b));

    if !valid {
        return None;
    }

    u8::from_str_radix(token, 16).ok()
}

/// Incremental framer for a live receiver byte stream.
///
/// Bytes are pushed in whatever chunks the transport delivers. Frames are
/// recognized by their `55 AA 08` prefix; anything in front of a prefix is
/// discarded and counted. A frame is only released once all of its bytes
/// have arrived.
#[derive(Debug, Default)]
pub struct StreamFramer {
    buf: Vec<u8>,
    discarded: usize,
}

impl StreamFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes currently held waiting for a complete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Total bytes dropped while hunting for a frame prefix.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Returns the next complete frame, or `None` if more bytes are needed.
    pub fn next_frame(&mut self) -> Option<Frame> {
        let start = match self
            .buf
            .windows(PREFIX_SIZE)
            .position(|w| w == FRAME_PREFIX)
        {
            Some(start) => start,
            None => {
                // keep the longest tail that could still begin a prefix
                let keep = (1..PREFIX_SIZE)
                    .rev()
                    .find(|&n| self.buf.ends_with(&FRAME_PREFIX[..n]))
                    .unwrap_or(0);
                self.drop_front(self.buf.len() - keep);
                return None;
            }
        };

        self.drop_front(start);

        // the length byte declares the whole frame, prefix included
        let declared = usize::from(self.buf[PREFIX_SIZE - 1]);
        if self.buf.len() < declared {
            return None;
        }

        let frame = Frame::try_from(&self.buf[..declared]).ok()?;
        self.buf.drain(..declared);
        Some(frame)
    }

    fn drop_front(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        trace!(bytes = n, "discarding bytes before frame prefix");
        self.discarded += n;
        self.buf.drain(..n);
    }
}

impl Iterator for StreamFramer {
    type Item = Frame;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
--- 14:02:11.482 ---
[14:02:11.482] Received 8 bytes:
HEX: 55 AA 08 00 15 49 00 AB                          ASCII: [U......]
RAW: 85 170 8 0 21 73 0 171

--- 14:02:11.990 ---
[14:02:11.990] Received 8 bytes:
HEX: 55 AA 08 01 1E 4B 00 A3                          ASCII: [U....K..]
RAW: 85 170 8 1 30 75 0 163
";

    #[test]
    fn extracts_frames_in_order() {
        let extraction = extract_log(LOG);

        assert_eq!(extraction.frames.len(), 2);
        assert_eq!(extraction.candidates, 2);
        assert_eq!(extraction.skipped, 0);
        assert_eq!(extraction.frames[0].bytes()[3], 0x00);
        assert_eq!(extraction.frames[1].bytes()[3], 0x01);
    }

    #[test]
    fn skips_wrong_token_count() {
        let text = "\
HEX: 55 AA 08 00 15 49 00     ASCII: [U.....]
HEX: 55 AA 08 00 15 49 00 AB 00   ASCII: [U......]
HEX: 55 AA 08 00 15 49 00 AB   ASCII: [U......]
";
        let extraction = extract_log(text);

        assert_eq!(extraction.frames.len(), 1);
        assert_eq!(extraction.candidates, 3);
        assert_eq!(extraction.skipped, 2);
    }

    #[test]
    fn skips_lowercase_and_bad_tokens() {
        let text = "\
HEX: 55 aa 08 00 15 49 00 AB   ASCII: [U......]
HEX: 55 AA 08 00 15 49 00 ABC   ASCII: [U......]
HEX: 55 AA 08 00 15 49 00 GG   ASCII: [U......]
HEX: 55 AA 08 00 15 49 00 AB
";
        let extraction = extract_log(text);

        assert!(extraction.frames.is_empty());
        assert_eq!(extraction.skipped, 4);
    }

    #[test]
    fn ignores_unmarked_lines() {
        let extraction = extract_log("RAW: 85 170 8 0 21 73 0 171\nnothing here\n");

        assert_eq!(extraction, LogExtraction::default());
    }

    #[test]
    fn framer_waits_for_complete_frame() {
        let mut framer = StreamFramer::new();

        framer.push(&[0x55, 0xAA, 0x08, 0x00, 0x15]);
        assert_eq!(framer.next_frame(), None);
        assert_eq!(framer.buffered(), 5);

        framer.push(&[0x49, 0x00, 0xAB]);
        let frame = framer.next_frame().unwrap();
        assert_eq!(frame.trailer(), 0xAB);
        assert_eq!(framer.buffered(), 0);
        assert_eq!(framer.discarded(), 0);
    }

    #[test]
    fn framer_resyncs_past_noise() {
        let mut framer = StreamFramer::new();

        framer.push(&[0x00, 0xFF, 0x55, 0x13]);
        framer.push(&[0x55, 0xAA, 0x08, 0x01, 0x1E, 0x4B, 0x00, 0xA3]);

        let frames: Vec<_> = framer.by_ref().collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].bytes()[3], 0x01);
        assert_eq!(framer.discarded(), 4);
    }

    #[test]
    fn framer_keeps_partial_prefix() {
        let mut framer = StreamFramer::new();

        framer.push(&[0x10, 0x20, 0x55, 0xAA]);
        assert_eq!(framer.next_frame(), None);
        assert_eq!(framer.buffered(), 2);
        assert_eq!(framer.discarded(), 2);

        framer.push(&[0x08, 0x00, 0x15, 0x49, 0x00, 0xAB]);
        assert!(framer.next_frame().is_some());
    }

    #[test]
    fn framer_yields_back_to_back_frames() {
        let mut framer = StreamFramer::new();
        let mut stream = Vec::new();
        stream.extend_from_slice(&[0x55, 0xAA, 0x08, 0x00, 0x15, 0x49, 0x00, 0xAB]);
        stream.extend_from_slice(&[0x55, 0xAA, 0x08, 0x01, 0x1E, 0x4B, 0x00, 0xA3]);
        stream.extend_from_slice(&[0x55, 0xAA, 0x08]);

        framer.push(&stream);

        assert_eq!(framer.by_ref().count(), 2);
        assert_eq!(framer.buffered(), 3);
    }
}
