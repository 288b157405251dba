use std::cmp;
use std::io;
use std::result::Result;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder, Framed};

use super::{Event, Request};
use crate::error::{ProtocolError, TransportError};

pub type MessageProtocol<S> = Framed<S, MessageCodec>;

/// Largest frame accepted by default
pub const MAX_FRAME_LENGTH: usize = 1 << 20;

/// Newline-delimited JSON frames: [`Request`]s out, [`Event`]s in.
///
/// A frame that fails to decode is yielded as an `Err` item rather than a
/// stream error, so one bad message never ends the feed. A frame longer
/// than `max_length` is reported once and skipped up to the next newline.
#[derive(Debug)]
pub struct MessageCodec {
    // Bytes already searched for a delimiter
    next_index: usize,
    max_length: usize,
    // Dropping the rest of an oversized frame
    is_discarding: bool,
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::with_max_length(MAX_FRAME_LENGTH)
    }
}

impl MessageCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
            is_discarding: false,
        }
    }
}

impl Decoder for MessageCodec {
    type Item = Result<Event, ProtocolError>;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, io::Error> {
        loop {
            // Never look further than one byte past the longest allowed frame
            let read_to = cmp::min(self.max_length.saturating_add(1), buf.len());
            let offset = find_frame_end(&buf[self.next_index..read_to]);
            match (self.is_discarding, offset) {
                (true, Some(offset)) => {
                    buf.advance(self.next_index + offset + 1);
                    self.is_discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let end = self.next_index + offset;
                    self.next_index = 0;
                    let frame = buf.split_to(end + 1);
                    let frame = trim_frame(&frame[..end]);
                    if frame.is_empty() {
                        continue;
                    }
                    return Ok(Some(decode_event(frame)));
                }
                (false, None) if buf.len() > self.max_length => {
                    self.is_discarding = true;
                    return Ok(Some(Err(ProtocolError::FrameTooLong(self.max_length))));
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, io::Error> {
        if let Some(item) = self.decode(buf)? {
            return Ok(Some(item));
        }
        self.next_index = 0;
        if self.is_discarding {
            buf.clear();
            self.is_discarding = false;
            return Ok(None);
        }
        // Final frame without a trailing delimiter
        let frame = buf.split_to(buf.len());
        let frame = trim_frame(&frame);
        if frame.is_empty() {
            Ok(None)
        } else {
            Ok(Some(decode_event(frame)))
        }
    }
}

impl Encoder<Request> for MessageCodec {
    type Error = TransportError;

    fn encode(&mut self, request: Request, buf: &mut BytesMut) -> Result<(), TransportError> {
        let json = serde_json::to_vec(&request).map_err(TransportError::Encode)?;
        buf.reserve(json.len() + 1);
        buf.put_slice(&json);
        buf.put_u8(b'\n');
        Ok(())
    }
}

/// Decode a single frame (without delimiter) into an [`Event`]
pub fn decode_event(frame: &[u8]) -> Result<Event, ProtocolError> {
    let text = std::str::from_utf8(frame).map_err(|_| ProtocolError::Utf8)?;
    Ok(serde_json::from_str(text)?)
}

/// Offset of the next frame delimiter, if a full frame is buffered
fn find_frame_end(data: &[u8]) -> Option<usize> {
    data.iter().position(|b| *b == b'\n')
}

fn trim_frame(frame: &[u8]) -> &[u8] {
    match frame.last() {
        Some(b'\r') => &frame[..frame.len() - 1],
        _ => frame,
    }
}
