//! Motion snapshot codec
//!
//! Layout (18 bytes, all little-endian):
//! `[0..2]` pitch, `[2..4]` roll (milliradians, i16),
//! `[4..10]` acceleration x/y/z (milli-g, i16),
//! `[10..12]` compass heading (degrees, u16),
//! `[12..18]` magnetic force x/y/z (microteslas, i16).

use crate::config::protocol::MOTION_PAYLOAD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionSnapshot {
    /// Pitch in milliradians
    pub pitch: i16,
    /// Roll in milliradians
    pub roll: i16,
    /// Acceleration in milli-g
    pub acceleration: [i16; 3],
    /// Compass heading in degrees, 0..=360
    pub heading: u16,
    /// Magnetic force in microteslas
    pub magnetic_force: [i16; 3],
}

impl MotionSnapshot {
    pub fn encode(&self, buffer: &mut [u8; MOTION_PAYLOAD]) {
        buffer[0..2].copy_from_slice(&self.pitch.to_le_bytes());
        buffer[2..4].copy_from_slice(&self.roll.to_le_bytes());
        for (i, accel) in self.acceleration.iter().enumerate() {
            buffer[4 + i * 2..6 + i * 2].copy_from_slice(&accel.to_le_bytes());
        }
        buffer[10..12].copy_from_slice(&self.heading.to_le_bytes());
        for (i, force) in self.magnetic_force.iter().enumerate() {
            buffer[12 + i * 2..14 + i * 2].copy_from_slice(&force.to_le_bytes());
        }
    }

    pub fn decode(buffer: &[u8; MOTION_PAYLOAD]) -> Self {
        let read_i16 = |offset: usize| i16::from_le_bytes([buffer[offset], buffer[offset + 1]]);
        Self {
            pitch: read_i16(0),
            roll: read_i16(2),
            acceleration: [read_i16(4), read_i16(6), read_i16(8)],
            heading: u16::from_le_bytes([buffer[10], buffer[11]]),
            magnetic_force: [read_i16(12), read_i16(14), read_i16(16)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let snapshot = MotionSnapshot {
            pitch: -1570,
            roll: 785,
            acceleration: [-1000, 20, 980],
            heading: 359,
            magnetic_force: [-30, 0, 52],
        };
        let mut buffer = [0u8; MOTION_PAYLOAD];
        snapshot.encode(&mut buffer);
        assert_eq!(MotionSnapshot::decode(&buffer), snapshot);
    }

    #[test]
    fn test_field_offsets() {
        let snapshot = MotionSnapshot {
            pitch: 0x0102,
            roll: 0x0304,
            acceleration: [0x0506, 0x0708, 0x090A],
            heading: 0x0B0C,
            magnetic_force: [0x0D0E, 0x0F10, 0x1112],
        };
        let mut buffer = [0u8; MOTION_PAYLOAD];
        snapshot.encode(&mut buffer);
        assert_eq!(
            buffer,
            [
                0x02, 0x01, 0x04, 0x03, // pitch, roll
                0x06, 0x05, 0x08, 0x07, 0x0A, 0x09, // acceleration
                0x0C, 0x0B, // heading
                0x0E, 0x0D, 0x10, 0x0F, 0x12, 0x11, // magnetic force
            ]
        );
    }

    #[test]
    fn test_extreme_values_round_trip() {
        let snapshot = MotionSnapshot {
            pitch: i16::MIN,
            roll: i16::MAX,
            acceleration: [i16::MIN, 0, i16::MAX],
            heading: u16::MAX,
            magnetic_force: [i16::MAX, i16::MIN, -1],
        };
        let mut buffer = [0u8; MOTION_PAYLOAD];
        snapshot.encode(&mut buffer);
        assert_eq!(MotionSnapshot::decode(&buffer), snapshot);
    }
}
