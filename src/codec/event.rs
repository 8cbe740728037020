//! Pin and action event codecs
//!
//! Both event shapes ride notify channels in a 20-byte buffer with a
//! format tag at the reserved offset. Timestamps are the low 32 bits of
//! the device's monotonic millisecond counter; wraparound after the
//! downcast is accepted.

use crate::codec::format::DataFormat;
use crate::config::protocol::MAX_CHANNEL_PAYLOAD;

/// Edge/pulse events reported for a configured pin.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinEventKind {
    Rise = 2,
    Fall = 3,
    PulseHigh = 4,
    PulseLow = 5,
}

impl PinEventKind {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            2 => Some(Self::Rise),
            3 => Some(Self::Fall),
            4 => Some(Self::PulseHigh),
            5 => Some(Self::PulseLow),
            _ => None,
        }
    }
}

/// One event on a listening pin.
///
/// Layout: `[0]` pin, `[1..3]` event code u16 LE, `[3..7]` timestamp
/// u32 LE, tag [`DataFormat::PinEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinEvent {
    pub pin: u8,
    pub kind: PinEventKind,
    pub timestamp: u32,
}

impl PinEvent {
    pub fn encode(&self, buffer: &mut [u8; MAX_CHANNEL_PAYLOAD]) {
        buffer.fill(0);
        buffer[0] = self.pin;
        buffer[1..3].copy_from_slice(&(self.kind as u16).to_le_bytes());
        buffer[3..7].copy_from_slice(&self.timestamp.to_le_bytes());
        DataFormat::PinEvent.stamp(buffer);
    }

    pub fn decode(buffer: &[u8; MAX_CHANNEL_PAYLOAD]) -> Option<Self> {
        if DataFormat::of(buffer) != Some(DataFormat::PinEvent) {
            return None;
        }
        let code = u16::from_le_bytes([buffer[1], buffer[2]]);
        Some(Self {
            pin: buffer[0],
            kind: PinEventKind::from_code(code)?,
            timestamp: u32::from_le_bytes([buffer[3], buffer[4], buffer[5], buffer[6]]),
        })
    }
}

/// Button events, matching the host-side block palette.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Down = 1,
    Up = 2,
    Click = 3,
    LongClick = 4,
    Hold = 5,
    DoubleClick = 6,
}

impl ButtonEvent {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Down),
            2 => Some(Self::Up),
            3 => Some(Self::Click),
            4 => Some(Self::LongClick),
            5 => Some(Self::Hold),
            6 => Some(Self::DoubleClick),
            _ => None,
        }
    }
}

/// Orientation gestures derived from the accelerometer.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    TiltUp = 1,
    TiltDown = 2,
    TiltLeft = 3,
    TiltRight = 4,
    FaceUp = 5,
    FaceDown = 6,
    Freefall = 7,
    G3 = 8,
    G6 = 9,
    G8 = 10,
    Shake = 11,
}

impl GestureEvent {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::TiltUp),
            2 => Some(Self::TiltDown),
            3 => Some(Self::TiltLeft),
            4 => Some(Self::TiltRight),
            5 => Some(Self::FaceUp),
            6 => Some(Self::FaceDown),
            7 => Some(Self::Freefall),
            8 => Some(Self::G3),
            9 => Some(Self::G6),
            10 => Some(Self::G8),
            11 => Some(Self::Shake),
            _ => None,
        }
    }
}

/// One button or gesture event.
///
/// Layout: `[0]` kind discriminant (1 = button, 2 = gesture), then
/// button: `[1..3]` source pin u16 LE, `[3]` event code, `[4..8]`
/// timestamp u32 LE; gesture: `[1]` event code, `[2..6]` timestamp
/// u32 LE. Tag [`DataFormat::ActionEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionEvent {
    Button {
        /// Pin-equivalent source ID (A and B buttons report their
        /// dedicated pins, the logo reports its touch sensor index)
        source: u16,
        event: ButtonEvent,
        timestamp: u32,
    },
    Gesture {
        event: GestureEvent,
        timestamp: u32,
    },
}

const ACTION_KIND_BUTTON: u8 = 1;
const ACTION_KIND_GESTURE: u8 = 2;

impl ActionEvent {
    pub fn encode(&self, buffer: &mut [u8; MAX_CHANNEL_PAYLOAD]) {
        buffer.fill(0);
        match *self {
            Self::Button {
                source,
                event,
                timestamp,
            } => {
                buffer[0] = ACTION_KIND_BUTTON;
                buffer[1..3].copy_from_slice(&source.to_le_bytes());
                buffer[3] = event as u8;
                buffer[4..8].copy_from_slice(&timestamp.to_le_bytes());
            }
            Self::Gesture { event, timestamp } => {
                buffer[0] = ACTION_KIND_GESTURE;
                buffer[1] = event as u8;
                buffer[2..6].copy_from_slice(&timestamp.to_le_bytes());
            }
        }
        DataFormat::ActionEvent.stamp(buffer);
    }

    pub fn decode(buffer: &[u8; MAX_CHANNEL_PAYLOAD]) -> Option<Self> {
        if DataFormat::of(buffer) != Some(DataFormat::ActionEvent) {
            return None;
        }
        match buffer[0] {
            ACTION_KIND_BUTTON => Some(Self::Button {
                source: u16::from_le_bytes([buffer[1], buffer[2]]),
                event: ButtonEvent::from_code(buffer[3])?,
                timestamp: u32::from_le_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]),
            }),
            ACTION_KIND_GESTURE => Some(Self::Gesture {
                event: GestureEvent::from_code(buffer[1])?,
                timestamp: u32::from_le_bytes([buffer[2], buffer[3], buffer[4], buffer[5]]),
            }),
            _ => None,
        }
    }
}
