//! Command types for the host-to-device opcode grammar
//!
//! # Opcode format
//!
//! A command is a single opcode byte followed by a class-specific
//! payload of up to 19 bytes:
//!
//! ```text
//! [class: 3 bits][sub: 5 bits][payload...]
//! ```
//!
//! | Class   | Value | Sub-commands |
//! |---------|-------|--------------|
//! | Config  | 0     | Mic=0x01, Touch=0x02 |
//! | Pin     | 1     | SetOutput=0x01, SetPwm=0x02, SetServo=0x03, SetPull=0x04, SetEvent=0x05 |
//! | Display | 2     | Clear=0x00, Text=0x01, Pixels0=0x02, Pixels1=0x03 |
//! | Audio   | 3     | StopTone=0x00, PlayTone=0x01 |
//! | Data    | 4     | sub = content type (1=number, 2=text) |
//!
//! Commands are transient: decoded, applied, discarded. There is no
//! error reporting path for a rejected command; unknown or truncated
//! commands are dropped.

use heapless::{String, Vec};

use crate::registry::ContentType;

/// Maximum text length in a display-text command (20 - opcode - delay).
pub const DISPLAY_TEXT_MAX: usize = 18;

/// Maximum content length in an inbound data command.
pub const DATA_CONTENT_MAX: usize = crate::config::registry::CONTENT_SIZE;

/// Label width in an inbound data command.
pub const DATA_LABEL_SIZE: usize = crate::config::registry::LABEL_SIZE;

/// Command classes, the top 3 bits of the opcode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandClass {
    Config = 0,
    Pin = 1,
    Display = 2,
    Audio = 3,
    Data = 4,
}

impl CommandClass {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Config),
            1 => Some(Self::Pin),
            2 => Some(Self::Display),
            3 => Some(Self::Audio),
            4 => Some(Self::Data),
            _ => None,
        }
    }
}

/// Pull mode of a GPIO pin.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PullMode {
    #[default]
    None = 0,
    Down = 1,
    Up = 2,
}

impl PullMode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::None),
            1 => Some(Self::Down),
            2 => Some(Self::Up),
            _ => None,
        }
    }
}

/// Event listener type attachable to a pin.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinEventType {
    #[default]
    None = 0,
    OnEdge = 1,
    OnPulse = 2,
    OnTouch = 3,
}

impl PinEventType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::None),
            1 => Some(Self::OnEdge),
            2 => Some(Self::OnPulse),
            3 => Some(Self::OnTouch),
            _ => None,
        }
    }
}

/// A decoded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Set a pin's digital output level
    SetOutput { pin: u8, level: bool },

    /// Drive a pin with PWM (0..=1023)
    SetPwm { pin: u8, value: u16 },

    /// Drive a pin as a servo. Zero range selects the hardware default
    /// range; zero center (with nonzero range) the default center.
    SetServo {
        pin: u8,
        angle: u16,
        range: u16,
        center: u16,
    },

    /// Set a pin's pull mode
    SetPull { pin: u8, mode: PullMode },

    /// Attach or detach an event listener on a pin
    SetEvent { pin: u8, event_type: PinEventType },

    /// Clear the display
    DisplayClear,

    /// Scroll text with an inter-character delay in milliseconds
    DisplayText {
        delay_ms: u16,
        text: String<DISPLAY_TEXT_MAX>,
    },

    /// Stage brightness rows 0..=2 of the 5x5 matrix
    DisplayRows0 { rows: [[u8; 5]; 3] },

    /// Stage brightness rows 3..=4 and commit the staged matrix
    DisplayRows1 { rows: [[u8; 5]; 2] },

    /// Start a tone with the given PWM period and volume
    PlayTone { period_us: u32, volume: u8 },

    /// Stop any playing tone
    StopTone,

    /// Enable or disable the onboard microphone level source
    ConfigMic { active: bool },

    /// Enable or disable capacitive touch detection on a pin
    ConfigTouch { pin: u8, active: bool },

    /// Inbound labeled data for the registry
    Data {
        content_type: ContentType,
        label: [u8; DATA_LABEL_SIZE],
        content: Vec<u8, DATA_CONTENT_MAX>,
    },
}
