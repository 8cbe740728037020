//! Serial link pump
//!
//! Connects the frame decoder to the engine: received bytes go through
//! the decoder, completed requests are handled by the engine, and the
//! resulting response frames are written back to the port. The receive
//! task drives [`SerialLink::process`] with each chunk it reads and
//! calls [`SerialLink::abandon`] when a peer stalls mid-frame, so a
//! half-received frame can never wedge the link.

use crate::hal::Hardware;
use crate::serial::framer::FrameDecoder;
use crate::serial::traits::{SerialError, SerialPort};
use crate::transport::Engine;

pub struct SerialLink {
    decoder: FrameDecoder,
}

impl SerialLink {
    pub fn new() -> Self {
        Self {
            decoder: FrameDecoder::new(),
        }
    }

    /// Feed received bytes through the decoder, dispatching every
    /// completed request and transmitting its responses.
    pub async fn process<H: Hardware, S: SerialPort>(
        &mut self,
        engine: &mut Engine<H>,
        serial: &mut S,
        bytes: &[u8],
    ) -> Result<(), SerialError> {
        for &byte in bytes {
            if let Some(request) = self.decoder.push(byte) {
                for frame in engine.handle_serial_request(request) {
                    serial.write(&frame).await?;
                }
            }
        }
        Ok(())
    }

    /// Whether a frame is partially buffered, i.e. the pump should
    /// bound its wait for the next byte.
    pub fn mid_frame(&self) -> bool {
        self.decoder.pending() > 0
    }

    /// Abandon a stalled frame: slide one byte and dispatch anything
    /// that parses from the remainder.
    pub async fn abandon<H: Hardware, S: SerialPort>(
        &mut self,
        engine: &mut Engine<H>,
        serial: &mut S,
    ) -> Result<(), SerialError> {
        if let Some(request) = self.decoder.abandon() {
            for frame in engine.handle_serial_request(request) {
                serial.write(&frame).await?;
            }
        }
        Ok(())
    }
}

impl Default for SerialLink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::protocol::{HARDWARE_VERSION, PROTOCOL_VERSION};
    use crate::config::serial::SENTINEL;
    use crate::hal::traits::mock::MockHardware;
    use crate::serial::framer::checksum;
    use crate::serial::traits::mock::MockSerialPort;

    fn write_frame(channel: u16, payload: &[u8]) -> heapless::Vec<u8, 32> {
        let mut frame: heapless::Vec<u8, 32> = heapless::Vec::new();
        frame.push(SENTINEL).unwrap();
        frame.push(0x10).unwrap();
        frame.extend_from_slice(&channel.to_be_bytes()).unwrap();
        frame.push(payload.len() as u8).unwrap();
        frame.extend_from_slice(payload).unwrap();
        let sum = checksum(&frame);
        frame.push(sum).unwrap();
        frame
    }

    #[test]
    fn test_version_handshake_end_to_end() {
        let mut link = SerialLink::new();
        let mut engine = Engine::new(MockHardware::new(), "BBX");
        let mut port = MockSerialPort::new();

        futures::executor::block_on(async {
            link.process(&mut engine, &mut port, &[SENTINEL, 0x01, 0x01, 0x00])
                .await
                .unwrap();
        });

        let tx = port.tx_data();
        // Read response for the command channel, leading with the
        // hardware and protocol version bytes.
        assert_eq!(&tx[..5], &[SENTINEL, 0x01, 0x01, 0x00, 20]);
        assert_eq!(tx[5], HARDWARE_VERSION);
        assert_eq!(tx[6], PROTOCOL_VERSION);
        assert!(engine.serial_session());
    }

    #[test]
    fn test_garbage_then_command() {
        let mut link = SerialLink::new();
        let mut engine = Engine::new(MockHardware::new(), "BBX");
        let mut port = MockSerialPort::new();

        let mut stream: heapless::Vec<u8, 64> = heapless::Vec::new();
        stream.extend_from_slice(&[0x12, 0x34, 0x56]).unwrap();
        stream
            .extend_from_slice(&write_frame(0x0100, &[0x40]))
            .unwrap();

        futures::executor::block_on(async {
            link.process(&mut engine, &mut port, &stream).await.unwrap();
        });

        assert_eq!(engine.hw.display_cleared, 1);
        assert!(!link.mid_frame());
    }

    #[test]
    fn test_corrupt_frame_recovery() {
        let mut link = SerialLink::new();
        let mut engine = Engine::new(MockHardware::new(), "BBX");
        let mut port = MockSerialPort::new();

        let good = write_frame(0x0100, &[0x40]);
        let mut corrupt = good.clone();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0x55;

        futures::executor::block_on(async {
            link.process(&mut engine, &mut port, &good).await.unwrap();
            link.process(&mut engine, &mut port, &corrupt).await.unwrap();
            link.process(&mut engine, &mut port, &good).await.unwrap();
        });

        // Both intact frames dispatched, the corrupt one dropped.
        assert_eq!(engine.hw.display_cleared, 2);
    }

    #[test]
    fn test_stalled_frame_abandon() {
        let mut link = SerialLink::new();
        let mut engine = Engine::new(MockHardware::new(), "BBX");
        let mut port = MockSerialPort::new();

        futures::executor::block_on(async {
            // Header of a write frame that never finishes.
            link.process(&mut engine, &mut port, &[SENTINEL, 0x10, 0x01, 0x00, 10])
                .await
                .unwrap();
            assert!(link.mid_frame());

            link.abandon(&mut engine, &mut port).await.unwrap();

            // The link accepts fresh frames afterwards.
            for _ in 0..8 {
                if !link.mid_frame() {
                    break;
                }
                link.abandon(&mut engine, &mut port).await.unwrap();
            }
            link.process(&mut engine, &mut port, &write_frame(0x0100, &[0x40]))
                .await
                .unwrap();
        });

        assert_eq!(engine.hw.display_cleared, 1);
    }

    #[test]
    fn test_write_error_propagates() {
        let mut link = SerialLink::new();
        let mut engine = Engine::new(MockHardware::new(), "BBX");
        let mut port = MockSerialPort::new();
        port.fail_next_write(SerialError::WriteFailed);

        futures::executor::block_on(async {
            let result = link
                .process(&mut engine, &mut port, &[SENTINEL, 0x01, 0x01, 0x00])
                .await;
            assert_eq!(result, Err(SerialError::WriteFailed));
        });
    }
}
