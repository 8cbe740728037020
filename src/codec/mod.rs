//! Channel payload codecs
//!
//! Fixed-layout encoders/decoders for every channel. Encoding is purely
//! positional: each field has a fixed offset and width, trailing bytes
//! are zero-filled, and multi-byte values are little-endian. These
//! functions never fail and never validate semantic ranges; that is the
//! dispatcher's job on the inbound path.
//!
//! Several logically distinct payloads (pin events, action events,
//! labeled messages) share one physical notify buffer over time, so
//! those buffers carry a format tag at a fixed offset near the end.
//! [`format::DataFormat`] models the tag and decode is an exhaustive
//! match on it.

pub mod event;
pub mod format;
pub mod message;
pub mod motion;
pub mod state;

pub use event::{ActionEvent, ButtonEvent, GestureEvent, PinEvent, PinEventKind};
pub use format::DataFormat;
pub use message::LabeledMessage;
pub use motion::MotionSnapshot;
pub use state::StateSnapshot;

use crate::config::protocol::{ANALOG_IN_PAYLOAD, MAX_CHANNEL_PAYLOAD};

/// Any payload that can occupy a shared notify buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyPayload {
    PinEvent(PinEvent),
    ActionEvent(ActionEvent),
    Message(LabeledMessage),
}

/// Decode a notify buffer by its format tag.
pub fn decode_notify(buffer: &[u8; MAX_CHANNEL_PAYLOAD]) -> Option<NotifyPayload> {
    match DataFormat::of(buffer)? {
        DataFormat::PinEvent => PinEvent::decode(buffer).map(NotifyPayload::PinEvent),
        DataFormat::ActionEvent => ActionEvent::decode(buffer).map(NotifyPayload::ActionEvent),
        DataFormat::MessageNumber | DataFormat::MessageText => {
            LabeledMessage::decode(buffer).map(NotifyPayload::Message)
        }
    }
}

/// Encode a filtered analog reading (0..=1023).
pub fn encode_analog_in(value: u16, buffer: &mut [u8; ANALOG_IN_PAYLOAD]) {
    buffer.copy_from_slice(&value.to_le_bytes());
}

/// Decode an analog-in channel payload.
pub fn decode_analog_in(buffer: &[u8; ANALOG_IN_PAYLOAD]) -> u16 {
    u16::from_le_bytes(*buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analog_in_round_trip() {
        let mut buffer = [0u8; ANALOG_IN_PAYLOAD];
        encode_analog_in(1023, &mut buffer);
        assert_eq!(buffer, [0xFF, 0x03]);
        assert_eq!(decode_analog_in(&buffer), 1023);
    }

    #[test]
    fn test_analog_in_is_little_endian() {
        let mut buffer = [0u8; ANALOG_IN_PAYLOAD];
        encode_analog_in(0x0102, &mut buffer);
        assert_eq!(buffer, [0x02, 0x01]);
    }

    #[test]
    fn test_decode_notify_dispatches_on_tag() {
        let mut buffer = [0u8; MAX_CHANNEL_PAYLOAD];

        let pin_event = PinEvent {
            pin: 1,
            kind: PinEventKind::Rise,
            timestamp: 7,
        };
        pin_event.encode(&mut buffer);
        assert_eq!(
            decode_notify(&buffer),
            Some(NotifyPayload::PinEvent(pin_event))
        );

        let message = LabeledMessage::number(b"t", 2.0);
        message.encode(&mut buffer);
        assert_eq!(decode_notify(&buffer), Some(NotifyPayload::Message(message)));
    }

    #[test]
    fn test_decode_notify_unknown_tag() {
        let buffer = [0u8; MAX_CHANNEL_PAYLOAD];
        assert_eq!(decode_notify(&buffer), None);
    }
}
