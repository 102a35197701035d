//! MJPEG stream loop.
//!
//! The loop blocks its thread for the lifetime of the stream: acquire a
//! frame, copy it out and release it, write one multipart part, sleep,
//! repeat. The camera is unlocked while writing, so a slow client only
//! stalls its own stream. The loop ends on the first write failure (the
//! client went away) or when no frame can be acquired. Dropping the stream
//! restores the sensor configuration.

use growpod_core::{Camera, StreamSession};
use growpod_protocol::codec::{part_header, PART_TRAILER};
use std::fmt::Display;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default pause between frames.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Destination of stream parts, typically the HTTP response body.
pub trait PartSink {
    type Error: Display;

    /// Send bytes to the client.
    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Why a stream stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Writing to the client failed.
    ClientGone,
    /// The camera yielded no frame.
    CaptureFailed,
}

/// Totals of a finished stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub frames: usize,
    pub bytes: usize,
    pub end: StreamEnd,
}

/// An opened stream, ready to run once the response headers are sent.
pub struct MjpegStream<'a, C: Camera> {
    session: StreamSession<'a, C>,
    quality: u8,
    interval: Duration,
}

impl<'a, C: Camera> MjpegStream<'a, C> {
    pub(crate) fn new(session: StreamSession<'a, C>, quality: u8, interval: Duration) -> Self {
        Self {
            session,
            quality,
            interval,
        }
    }

    /// JPEG quality this stream runs at.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Send parts until the client disconnects or capture fails.
    pub fn run<S: PartSink>(mut self, sink: &mut S) -> StreamSummary {
        let mut frames = 0;
        let mut bytes = 0;

        let end = loop {
            let jpeg = match self.session.next_frame(|frame| frame.map(|f| f.data().to_vec())) {
                Ok(jpeg) => jpeg,
                Err(e) => {
                    warn!("Camera capture failed during stream: {}", e);
                    break StreamEnd::CaptureFailed;
                }
            };

            let sent = write_part(sink, &jpeg).map_err(|e| {
                debug!("Stream write failed: {}", e);
                StreamEnd::ClientGone
            });

            match sent {
                Ok(len) => {
                    frames += 1;
                    bytes += len;
                }
                Err(end) => break end,
            }

            if !self.interval.is_zero() {
                std::thread::sleep(self.interval);
            }
        };

        info!("Stream ended after {} frames ({} bytes): {:?}", frames, bytes, end);
        StreamSummary { frames, bytes, end }
    }
}

/// Write one multipart part; returns the JPEG length.
pub fn write_part<S: PartSink>(sink: &mut S, jpeg: &[u8]) -> Result<usize, S::Error> {
    sink.send(part_header(jpeg.len()).as_bytes())?;
    sink.send(jpeg)?;
    sink.send(PART_TRAILER)?;
    Ok(jpeg.len())
}

/// Collects parts in memory. Useful for tests and diagnostics.
impl PartSink for Vec<u8> {
    type Error = std::convert::Infallible;

    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}
