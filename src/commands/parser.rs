//! Command parser for inbound command-channel payloads
//!
//! Decodes the opcode byte and the class-specific payload into a
//! [`Command`]. The wire protocol has no NACK for commands, so every
//! malformed input (unknown class, unknown sub-command, payload shorter
//! than the fields it must carry) decodes to `None` and is dropped by
//! the caller.

use heapless::{String, Vec};

use crate::commands::types::{
    Command, CommandClass, PinEventType, PullMode, DATA_CONTENT_MAX, DATA_LABEL_SIZE,
};
use crate::registry::ContentType;

mod config_sub {
    pub const MIC: u8 = 0x01;
    pub const TOUCH: u8 = 0x02;
}

mod pin_sub {
    pub const SET_OUTPUT: u8 = 0x01;
    pub const SET_PWM: u8 = 0x02;
    pub const SET_SERVO: u8 = 0x03;
    pub const SET_PULL: u8 = 0x04;
    pub const SET_EVENT: u8 = 0x05;
}

mod display_sub {
    pub const CLEAR: u8 = 0x00;
    pub const TEXT: u8 = 0x01;
    pub const PIXELS_0: u8 = 0x02;
    pub const PIXELS_1: u8 = 0x03;
}

mod audio_sub {
    pub const STOP_TONE: u8 = 0x00;
    pub const PLAY_TONE: u8 = 0x01;
}

/// Multiplier applied to the display-text delay byte.
const TEXT_DELAY_UNIT_MS: u16 = 10;

/// Parser for command-channel payloads.
pub struct CommandParser;

impl CommandParser {
    pub fn new() -> Self {
        Self
    }

    /// Decode a command buffer. `None` means the command is dropped.
    pub fn parse(&self, data: &[u8]) -> Option<Command> {
        let opcode = *data.first()?;
        let sub = opcode & 0x1F;
        match CommandClass::from_byte(opcode >> 5)? {
            CommandClass::Config => self.parse_config(sub, &data[1..]),
            CommandClass::Pin => self.parse_pin(sub, &data[1..]),
            CommandClass::Display => self.parse_display(sub, &data[1..]),
            CommandClass::Audio => self.parse_audio(sub, &data[1..]),
            CommandClass::Data => self.parse_data(sub, &data[1..]),
        }
    }

    fn parse_config(&self, sub: u8, payload: &[u8]) -> Option<Command> {
        match sub {
            config_sub::MIC => Some(Command::ConfigMic {
                active: *payload.first()? != 0,
            }),
            config_sub::TOUCH => {
                if payload.len() < 2 {
                    return None;
                }
                Some(Command::ConfigTouch {
                    pin: payload[0],
                    active: payload[1] != 0,
                })
            }
            _ => None,
        }
    }

    fn parse_pin(&self, sub: u8, payload: &[u8]) -> Option<Command> {
        match sub {
            pin_sub::SET_OUTPUT => {
                if payload.len() < 2 {
                    return None;
                }
                Some(Command::SetOutput {
                    pin: payload[0],
                    level: payload[1] != 0,
                })
            }
            pin_sub::SET_PWM => {
                if payload.len() < 3 {
                    return None;
                }
                Some(Command::SetPwm {
                    pin: payload[0],
                    value: u16::from_le_bytes([payload[1], payload[2]]),
                })
            }
            pin_sub::SET_SERVO => {
                // Range and center are optional trailing fields; absent
                // means zero, which selects the hardware defaults.
                if payload.len() < 3 {
                    return None;
                }
                let word = |offset: usize| {
                    if payload.len() >= offset + 2 {
                        u16::from_le_bytes([payload[offset], payload[offset + 1]])
                    } else {
                        0
                    }
                };
                Some(Command::SetServo {
                    pin: payload[0],
                    angle: u16::from_le_bytes([payload[1], payload[2]]),
                    range: word(3),
                    center: word(5),
                })
            }
            pin_sub::SET_PULL => {
                if payload.len() < 2 {
                    return None;
                }
                Some(Command::SetPull {
                    pin: payload[0],
                    mode: PullMode::from_byte(payload[1])?,
                })
            }
            pin_sub::SET_EVENT => {
                if payload.len() < 2 {
                    return None;
                }
                Some(Command::SetEvent {
                    pin: payload[0],
                    event_type: PinEventType::from_byte(payload[1])?,
                })
            }
            _ => None,
        }
    }

    fn parse_display(&self, sub: u8, payload: &[u8]) -> Option<Command> {
        match sub {
            display_sub::CLEAR => Some(Command::DisplayClear),
            display_sub::TEXT => {
                let delay = *payload.first()?;
                let text = core::str::from_utf8(&payload[1..]).ok()?;
                Some(Command::DisplayText {
                    delay_ms: u16::from(delay) * TEXT_DELAY_UNIT_MS,
                    text: String::try_from(text).ok()?,
                })
            }
            display_sub::PIXELS_0 => {
                if payload.len() < 15 {
                    return None;
                }
                let mut rows = [[0u8; 5]; 3];
                for (i, row) in rows.iter_mut().enumerate() {
                    row.copy_from_slice(&payload[i * 5..i * 5 + 5]);
                }
                Some(Command::DisplayRows0 { rows })
            }
            display_sub::PIXELS_1 => {
                if payload.len() < 10 {
                    return None;
                }
                let mut rows = [[0u8; 5]; 2];
                for (i, row) in rows.iter_mut().enumerate() {
                    row.copy_from_slice(&payload[i * 5..i * 5 + 5]);
                }
                Some(Command::DisplayRows1 { rows })
            }
            _ => None,
        }
    }

    fn parse_audio(&self, sub: u8, payload: &[u8]) -> Option<Command> {
        match sub {
            audio_sub::STOP_TONE => Some(Command::StopTone),
            audio_sub::PLAY_TONE => {
                if payload.len() < 5 {
                    return None;
                }
                Some(Command::PlayTone {
                    period_us: u32::from_le_bytes([
                        payload[0], payload[1], payload[2], payload[3],
                    ]),
                    volume: payload[4],
                })
            }
            _ => None,
        }
    }

    fn parse_data(&self, sub: u8, payload: &[u8]) -> Option<Command> {
        let content_type = ContentType::from_byte(sub)?;
        if payload.len() < DATA_LABEL_SIZE {
            return None;
        }
        let mut label = [0u8; DATA_LABEL_SIZE];
        label.copy_from_slice(&payload[..DATA_LABEL_SIZE]);
        let rest = &payload[DATA_LABEL_SIZE..];
        let content_len = rest.len().min(DATA_CONTENT_MAX);
        let content: Vec<u8, DATA_CONTENT_MAX> =
            Vec::from_slice(&rest[..content_len]).ok()?;
        Some(Command::Data {
            content_type,
            label,
            content,
        })
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> Option<Command> {
        CommandParser::new().parse(data)
    }

    #[test]
    fn test_parse_set_output() {
        assert_eq!(
            parse(&[0x21, 8, 1]),
            Some(Command::SetOutput {
                pin: 8,
                level: true
            })
        );
    }

    #[test]
    fn test_parse_set_pwm() {
        assert_eq!(
            parse(&[0x22, 1, 0x00, 0x02]),
            Some(Command::SetPwm {
                pin: 1,
                value: 512
            })
        );
    }

    #[test]
    fn test_parse_set_servo_full() {
        assert_eq!(
            parse(&[0x23, 2, 90, 0, 0xD0, 0x07, 0xDC, 0x05]),
            Some(Command::SetServo {
                pin: 2,
                angle: 90,
                range: 2000,
                center: 1500,
            })
        );
    }

    #[test]
    fn test_parse_set_servo_angle_only() {
        // Absent range/center read as zero and select defaults later.
        assert_eq!(
            parse(&[0x23, 2, 180, 0]),
            Some(Command::SetServo {
                pin: 2,
                angle: 180,
                range: 0,
                center: 0,
            })
        );
    }

    #[test]
    fn test_parse_set_pull() {
        assert_eq!(
            parse(&[0x24, 0, 2]),
            Some(Command::SetPull {
                pin: 0,
                mode: PullMode::Up
            })
        );
        // Unknown pull mode is dropped, not clamped.
        assert_eq!(parse(&[0x24, 0, 3]), None);
    }

    #[test]
    fn test_parse_set_event() {
        assert_eq!(
            parse(&[0x25, 14, 2]),
            Some(Command::SetEvent {
                pin: 14,
                event_type: PinEventType::OnPulse
            })
        );
    }

    #[test]
    fn test_parse_display_clear() {
        assert_eq!(parse(&[0x40]), Some(Command::DisplayClear));
    }

    #[test]
    fn test_parse_display_text() {
        let command = parse(&[0x41, 12, b'h', b'i']).unwrap();
        assert_eq!(
            command,
            Command::DisplayText {
                delay_ms: 120,
                text: String::try_from("hi").unwrap(),
            }
        );
    }

    #[test]
    fn test_parse_display_text_empty() {
        assert_eq!(
            parse(&[0x41, 0]),
            Some(Command::DisplayText {
                delay_ms: 0,
                text: String::new(),
            })
        );
    }

    #[test]
    fn test_parse_display_rows() {
        let mut data = [0u8; 16];
        data[0] = 0x42;
        data[1] = 255;
        data[15] = 9;
        let command = parse(&data).unwrap();
        match command {
            Command::DisplayRows0 { rows } => {
                assert_eq!(rows[0][0], 255);
                assert_eq!(rows[2][4], 9);
            }
            other => panic!("expected DisplayRows0, got {:?}", other),
        }

        let mut data = [0u8; 11];
        data[0] = 0x43;
        data[10] = 77;
        let command = parse(&data).unwrap();
        match command {
            Command::DisplayRows1 { rows } => assert_eq!(rows[1][4], 77),
            other => panic!("expected DisplayRows1, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_audio() {
        assert_eq!(parse(&[0x60]), Some(Command::StopTone));
        assert_eq!(
            parse(&[0x61, 0xE8, 0x03, 0x00, 0x00, 128]),
            Some(Command::PlayTone {
                period_us: 1000,
                volume: 128
            })
        );
    }

    #[test]
    fn test_parse_config() {
        assert_eq!(parse(&[0x01, 1]), Some(Command::ConfigMic { active: true }));
        assert_eq!(
            parse(&[0x02, 1, 0]),
            Some(Command::ConfigTouch {
                pin: 1,
                active: false
            })
        );
    }

    #[test]
    fn test_parse_data_number() {
        let mut data = heapless::Vec::<u8, 20>::new();
        data.push(0x81).unwrap();
        data.extend_from_slice(b"speed\0\0\0").unwrap();
        data.extend_from_slice(&1.5f32.to_le_bytes()).unwrap();

        let command = parse(&data).unwrap();
        match command {
            Command::Data {
                content_type,
                label,
                content,
            } => {
                assert_eq!(content_type, ContentType::Number);
                assert_eq!(&label, b"speed\0\0\0");
                assert_eq!(content.as_slice(), &1.5f32.to_le_bytes());
            }
            other => panic!("expected Data, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_data_text() {
        let mut data = heapless::Vec::<u8, 20>::new();
        data.push(0x82).unwrap();
        data.extend_from_slice(b"chat\0\0\0\0").unwrap();
        data.extend_from_slice(b"hello").unwrap();

        let command = parse(&data).unwrap();
        match command {
            Command::Data {
                content_type,
                content,
                ..
            } => {
                assert_eq!(content_type, ContentType::Text);
                assert_eq!(content.as_slice(), b"hello");
            }
            other => panic!("expected Data, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_class_ignored() {
        assert_eq!(parse(&[0xA0]), None);
        assert_eq!(parse(&[0xFF, 1, 2, 3]), None);
    }

    #[test]
    fn test_unknown_sub_command_ignored() {
        assert_eq!(parse(&[0x26, 0, 0]), None); // pin class, sub 6
        assert_eq!(parse(&[0x44]), None); // display class, sub 4
        assert_eq!(parse(&[0x83, 0, 0, 0, 0, 0, 0, 0, 0]), None); // data, bad type
    }

    #[test]
    fn test_truncated_payloads_ignored() {
        assert_eq!(parse(&[]), None);
        assert_eq!(parse(&[0x21, 8]), None); // SetOutput without level
        assert_eq!(parse(&[0x22, 1, 0x00]), None); // SetPwm missing high byte
        assert_eq!(parse(&[0x61, 0xE8, 0x03]), None); // PlayTone truncated
        assert_eq!(parse(&[0x42, 0, 0, 0]), None); // Pixels0 short rows
        assert_eq!(parse(&[0x81, b'x']), None); // Data label truncated
    }
}
