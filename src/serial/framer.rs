//! Serial frame state machine
//!
//! The serial transport has no native framing, so frames are carried as
//!
//! ```text
//! 0xFF | request_type(1) | channel(2, big-endian) | [length(1) | payload | checksum(1)]
//! ```
//!
//! The length/payload/checksum group is present only for write-type
//! requests; read and notify-control requests are 4 bytes total. The
//! checksum is the sum of all preceding frame bytes modulo 255.
//!
//! A sentinel byte can legitimately appear inside payload data, so on
//! any rejection (invalid request type, oversized length, checksum
//! mismatch) the decoder drops exactly one buffered byte and re-scans
//! from the next sentinel candidate. Dropping more would lose a genuine
//! frame that starts inside the rejected window.

use heapless::Vec;

use crate::config::protocol::MAX_CHANNEL_PAYLOAD;
use crate::config::serial::{FRAME_BUFFER_SIZE, SENTINEL};

/// Host request types.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Read = 0x01,
    Write = 0x10,
    WriteWithResponse = 0x11,
    NotifyStop = 0x20,
    NotifyStart = 0x21,
}

impl RequestType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Read),
            0x10 => Some(Self::Write),
            0x11 => Some(Self::WriteWithResponse),
            0x20 => Some(Self::NotifyStop),
            0x21 => Some(Self::NotifyStart),
            _ => None,
        }
    }

    /// Whether this request carries length/payload/checksum.
    pub fn has_payload(self) -> bool {
        matches!(self, Self::Write | Self::WriteWithResponse)
    }
}

/// Device response types.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Read = 0x01,
    Write = 0x11,
    Notify = 0x21,
}

/// One fully validated host request.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialRequest {
    pub request: RequestType,
    pub channel: u16,
    pub payload: Option<Vec<u8, MAX_CHANNEL_PAYLOAD>>,
}

/// Sum of the bytes modulo 255.
pub fn checksum(data: &[u8]) -> u8 {
    let sum: u32 = data.iter().map(|&b| u32::from(b)).sum();
    (sum % 0xFF) as u8
}

/// Encode a response or notification frame.
pub fn encode_frame(
    kind: ResponseType,
    channel: u16,
    payload: &[u8],
) -> Vec<u8, FRAME_BUFFER_SIZE> {
    let mut frame: Vec<u8, FRAME_BUFFER_SIZE> = Vec::new();
    let _ = frame.push(SENTINEL);
    let _ = frame.push(kind as u8);
    let _ = frame.extend_from_slice(&channel.to_be_bytes());
    let _ = frame.push(payload.len().min(MAX_CHANNEL_PAYLOAD) as u8);
    let _ = frame.extend_from_slice(&payload[..payload.len().min(MAX_CHANNEL_PAYLOAD)]);
    let sum = checksum(&frame);
    let _ = frame.push(sum);
    frame
}

/// Encode the acknowledgement for a write-with-response request.
pub fn encode_write_ack(channel: u16) -> Vec<u8, FRAME_BUFFER_SIZE> {
    encode_frame(ResponseType::Write, channel, &[1])
}

enum Parse {
    /// Prefix is a plausible frame in progress
    NeedMore,
    /// Prefix cannot start a frame; slide one byte
    Reject,
    /// Complete frame of the given length
    Complete(SerialRequest, usize),
}

/// Byte-at-a-time frame decoder.
///
/// Feed every received byte through [`push`](Self::push); a returned
/// request has already passed type, length and checksum validation.
pub struct FrameDecoder {
    buffer: Vec<u8, FRAME_BUFFER_SIZE>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Push one received byte, returning a request when it completes
    /// a valid frame.
    pub fn push(&mut self, byte: u8) -> Option<SerialRequest> {
        if self.buffer.push(byte).is_err() {
            // Cannot happen while scan() keeps the buffer below one
            // frame, but never drop the new byte if it does.
            self.slide();
            let _ = self.buffer.push(byte);
        }
        self.scan()
    }

    /// Abandon the frame in progress: drop the first buffered byte and
    /// re-synchronize. Used by the pump when a peer stalls mid-frame.
    pub fn abandon(&mut self) -> Option<SerialRequest> {
        self.slide();
        self.scan()
    }

    /// Bytes currently buffered.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn scan(&mut self) -> Option<SerialRequest> {
        loop {
            match self.try_parse() {
                Parse::NeedMore => return None,
                Parse::Reject => self.slide(),
                Parse::Complete(request, consumed) => {
                    self.consume(consumed);
                    return Some(request);
                }
            }
        }
    }

    fn try_parse(&self) -> Parse {
        let buffer = &self.buffer;
        let Some(&first) = buffer.first() else {
            return Parse::NeedMore;
        };
        if first != SENTINEL {
            return Parse::Reject;
        }
        if buffer.len() < 2 {
            return Parse::NeedMore;
        }
        let Some(request) = RequestType::from_byte(buffer[1]) else {
            return Parse::Reject;
        };
        if buffer.len() < 4 {
            return Parse::NeedMore;
        }
        let channel = u16::from_be_bytes([buffer[2], buffer[3]]);

        if !request.has_payload() {
            return Parse::Complete(
                SerialRequest {
                    request,
                    channel,
                    payload: None,
                },
                4,
            );
        }

        if buffer.len() < 5 {
            return Parse::NeedMore;
        }
        let length = buffer[4] as usize;
        if length > MAX_CHANNEL_PAYLOAD {
            return Parse::Reject;
        }
        let total = 5 + length + 1;
        if buffer.len() < total {
            return Parse::NeedMore;
        }
        if checksum(&buffer[..5 + length]) != buffer[5 + length] {
            return Parse::Reject;
        }
        // Slice length is bounded by the check above.
        let payload = Vec::from_slice(&buffer[5..5 + length]).unwrap_or_default();
        Parse::Complete(
            SerialRequest {
                request,
                channel,
                payload: Some(payload),
            },
            total,
        )
    }

    fn slide(&mut self) {
        if !self.buffer.is_empty() {
            self.buffer.remove(0);
        }
    }

    fn consume(&mut self, count: usize) {
        for _ in 0..count {
            self.buffer.remove(0);
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
