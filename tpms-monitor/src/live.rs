use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tpms_core::{Classifier, DecodedPacket, Frame, ProtocolError, StreamFramer};
use tracing::{debug, info, instrument, warn};

use crate::capture::CaptureLog;
use crate::transport::ByteSource;

/// Largest single read taken from the transport.
const READ_CHUNK: usize = 256;

/// Event emitted by the live decoder task.
#[derive(Debug, Clone)]
pub enum LiveEvent {
    /// A frame passed header validation and was decoded.
    Decoded {
        packet: DecodedPacket,
        received_at: jiff::Timestamp,
    },
    /// A complete frame came off the wire but the classifier refused it.
    Rejected {
        frame: Frame,
        error: ProtocolError,
        received_at: jiff::Timestamp,
    },
}

/// Pulls whole frames out of a polled byte source.
pub struct FrameReader<S> {
    source: S,
    framer: StreamFramer,
    poll_interval: Duration,
    capture: Option<CaptureLog>,
}

impl<S: ByteSource> FrameReader<S> {
    pub fn new(source: S, poll_interval: Duration) -> Self {
        Self {
            source,
            framer: StreamFramer::new(),
            poll_interval,
            capture: None,
        }
    }

    /// Records every chunk read from the source and every frame cut from it.
    pub fn with_capture(mut self, capture: CaptureLog) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Bytes dropped so far while resynchronizing.
    pub fn discarded(&self) -> usize {
        self.framer.discarded()
    }

    /// Waits for the next complete frame.
    ///
    /// Returns `Ok(None)` once `cancel` fires. Transport errors end the read.
    pub async fn next_frame(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<Frame>, S::Error> {
        let mut buf = [0u8; READ_CHUNK];

        loop {
            if let Some(frame) = self.framer.next_frame() {
                self.capture_frame(&frame);
                return Ok(Some(frame));
            }

            if cancel.is_cancelled() {
                return Ok(None);
            }

            let available = self.source.bytes_available()?;
            if available > 0 {
                let n = self
                    .source
                    .read_available(&mut buf[..available.min(READ_CHUNK)])?;
                if n > 0 {
                    self.ingest(&buf[..n]);
                    continue;
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = sleep(self.poll_interval) => {}
            }
        }
    }

    fn ingest(&mut self, data: &[u8]) {
        if let Some(capture) = &mut self.capture {
            if let Err(e) = capture.record(data) {
                warn!(error = %e, path = ?capture.path(), "Failed to write capture log");
            }
        }

        debug!(bytes = data.len(), "Received bytes");
        self.framer.push(data);
    }

    fn capture_frame(&mut self, frame: &Frame) {
        if let Some(capture) = &mut self.capture {
            if let Err(e) = capture.record_frame(frame) {
                warn!(error = %e, path = ?capture.path(), "Failed to write capture log");
            }
        }
    }
}

/// Spawns a task that decodes frames from `reader` until `cancel` fires or
/// the transport fails.
///
/// Events are delivered on the returned channel. The task also stops when
/// the receiver is dropped.
pub fn spawn_decoder<S: ByteSource>(
    reader: FrameReader<S>,
    classifier: Classifier,
    cancel: CancellationToken,
    capacity: usize,
) -> (mpsc::Receiver<LiveEvent>, JoinHandle<Result<(), S::Error>>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(run_decoder(reader, classifier, tx, cancel));
    (rx, handle)
}

#[instrument(name = "decoder_loop", skip_all)]
async fn run_decoder<S: ByteSource>(
    mut reader: FrameReader<S>,
    classifier: Classifier,
    tx: mpsc::Sender<LiveEvent>,
    cancel: CancellationToken,
) -> Result<(), S::Error> {
    info!("Live decoder started");

    while let Some(frame) = reader.next_frame(&cancel).await? {
        let received_at = jiff::Timestamp::now();
        let event = match classifier.classify(&frame) {
            Ok(packet) => LiveEvent::Decoded {
                packet,
                received_at,
            },
            Err(error) => {
                warn!(%frame, %error, "Rejected frame");
                LiveEvent::Rejected {
                    frame,
                    error,
                    received_at,
                }
            }
        };

        if tx.send(event).await.is_err() {
            info!("Event receiver dropped");
            break;
        }
    }

    info!(discarded = reader.discarded(), "Live decoder stopped");
    Ok(())
}
