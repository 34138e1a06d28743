//! Doubles shared by this crate's tests and downstream crates.

use crate::codec::BccCodec;
use crate::message::BccMessage;
use crate::protocol::{Transport, TransportError};
use parking_lot::Mutex;
use std::sync::Arc;

/// A `Transport` that records frames instead of writing to a session.
#[derive(Default)]
pub struct CaptureTransport {
    frames: Mutex<Vec<(Vec<u8>, Vec<u8>)>>,
    closed: Mutex<bool>,
}

impl CaptureTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Raw `(header, body)` frames sent so far, oldest first.
    pub fn frames(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.frames.lock().clone()
    }

    /// Captured frames decoded with `codec`, oldest first.
    pub fn messages(&self, codec: &BccCodec) -> Vec<BccMessage> {
        self.frames
            .lock()
            .iter()
            .map(|(header, body)| {
                codec
                    .decode(header, body)
                    .expect("captured frame should decode")
            })
            .collect()
    }

    pub fn clear(&self) {
        self.frames.lock().clear()
    }

    /// Makes every subsequent send fail.
    pub fn close(&self) {
        *self.closed.lock() = true;
    }
}

impl Transport for CaptureTransport {
    fn send(&self, header: Vec<u8>, body: Vec<u8>) -> Result<(), TransportError> {
        if *self.closed.lock() {
            return Err(TransportError::Closed);
        }
        self.frames.lock().push((header, body));
        Ok(())
    }
}
