//! Labeled message codec
//!
//! Device-to-host half of the free-form messaging channel. Layout:
//! `[0..8]` label NUL-padded, `[8..19]` content, tag
//! [`DataFormat::MessageNumber`] or [`DataFormat::MessageText`].
//! Numbers travel as a little-endian f32 in the first four content
//! bytes; text is NUL-terminated within the content area.

use heapless::{String, Vec};

use crate::codec::format::DataFormat;
use crate::config::protocol::MAX_CHANNEL_PAYLOAD;
use crate::config::registry::{CONTENT_SIZE, LABEL_SIZE};

#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Number(f32),
    Text(String<CONTENT_SIZE>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMessage {
    pub label: [u8; LABEL_SIZE],
    pub content: MessageContent,
}

impl LabeledMessage {
    /// Build a number message. The label is truncated to fixed width.
    pub fn number(label: &[u8], value: f32) -> Self {
        Self {
            label: pad(label),
            content: MessageContent::Number(value),
        }
    }

    /// Build a text message. Label and text are truncated to fit.
    pub fn text(label: &[u8], text: &str) -> Self {
        let mut content: String<CONTENT_SIZE> = String::new();
        for ch in text.chars() {
            if content.push(ch).is_err() {
                break;
            }
        }
        Self {
            label: pad(label),
            content: MessageContent::Text(content),
        }
    }

    pub fn encode(&self, buffer: &mut [u8; MAX_CHANNEL_PAYLOAD]) {
        buffer.fill(0);
        buffer[..LABEL_SIZE].copy_from_slice(&self.label);
        match &self.content {
            MessageContent::Number(value) => {
                buffer[LABEL_SIZE..LABEL_SIZE + 4].copy_from_slice(&value.to_le_bytes());
                DataFormat::MessageNumber.stamp(buffer);
            }
            MessageContent::Text(text) => {
                let bytes = text.as_bytes();
                buffer[LABEL_SIZE..LABEL_SIZE + bytes.len()].copy_from_slice(bytes);
                DataFormat::MessageText.stamp(buffer);
            }
        }
    }

    pub fn decode(buffer: &[u8; MAX_CHANNEL_PAYLOAD]) -> Option<Self> {
        let mut label = [0u8; LABEL_SIZE];
        label.copy_from_slice(&buffer[..LABEL_SIZE]);
        let content = &buffer[LABEL_SIZE..LABEL_SIZE + CONTENT_SIZE];
        match DataFormat::of(buffer)? {
            DataFormat::MessageNumber => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&content[..4]);
                Some(Self {
                    label,
                    content: MessageContent::Number(f32::from_le_bytes(raw)),
                })
            }
            DataFormat::MessageText => {
                let len = content.iter().position(|&b| b == 0).unwrap_or(CONTENT_SIZE);
                let bytes: Vec<u8, CONTENT_SIZE> = Vec::from_slice(&content[..len]).ok()?;
                Some(Self {
                    label,
                    content: MessageContent::Text(String::from_utf8(bytes).ok()?),
                })
            }
            _ => None,
        }
    }
}

fn pad(label: &[u8]) -> [u8; LABEL_SIZE] {
    let mut padded = [0u8; LABEL_SIZE];
    let len = label.len().min(LABEL_SIZE);
    padded[..len].copy_from_slice(&label[..len]);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::protocol::FORMAT_TAG_INDEX;

    #[test]
    fn test_number_round_trip() {
        let message = LabeledMessage::number(b"speed", -3.25);
        let mut buffer = [0u8; MAX_CHANNEL_PAYLOAD];
        message.encode(&mut buffer);
        assert_eq!(buffer[FORMAT_TAG_INDEX], DataFormat::MessageNumber as u8);
        assert_eq!(LabeledMessage::decode(&buffer), Some(message));
    }

    #[test]
    fn test_text_round_trip() {
        let message = LabeledMessage::text(b"chat", "hi there");
        let mut buffer = [0u8; MAX_CHANNEL_PAYLOAD];
        message.encode(&mut buffer);
        assert_eq!(buffer[FORMAT_TAG_INDEX], DataFormat::MessageText as u8);
        assert_eq!(LabeledMessage::decode(&buffer), Some(message));
    }

    #[test]
    fn test_label_is_nul_padded() {
        let message = LabeledMessage::number(b"ab", 1.0);
        let mut buffer = [0u8; MAX_CHANNEL_PAYLOAD];
        message.encode(&mut buffer);
        assert_eq!(&buffer[..LABEL_SIZE], b"ab\0\0\0\0\0\0");
    }

    #[test]
    fn test_max_length_text() {
        let message = LabeledMessage::text(b"full", "0123456789a");
        let mut buffer = [0u8; MAX_CHANNEL_PAYLOAD];
        message.encode(&mut buffer);
        let decoded = LabeledMessage::decode(&buffer).unwrap();
        assert_eq!(
            decoded.content,
            MessageContent::Text(String::try_from("0123456789a").unwrap())
        );
    }

    #[test]
    fn test_overlong_text_is_truncated() {
        let message = LabeledMessage::text(b"full", "0123456789abcdef");
        match &message.content {
            MessageContent::Text(text) => assert_eq!(text.as_str(), "0123456789a"),
            _ => panic!("expected text content"),
        }
    }

    #[test]
    fn test_wrong_tag_rejected() {
        let message = LabeledMessage::number(b"x", 0.0);
        let mut buffer = [0u8; MAX_CHANNEL_PAYLOAD];
        message.encode(&mut buffer);
        buffer[FORMAT_TAG_INDEX] = DataFormat::PinEvent as u8;
        assert_eq!(LabeledMessage::decode(&buffer), None);
    }
}
