//! Hardware capability trait for abstraction and testability
//!
//! Everything the protocol engine needs from the board is behind this
//! trait: pin I/O, the display, audio, and the sensor set. The real
//! board layer implements it for the target hardware; tests use the
//! mock. Hardware generations that differ in available sensors differ
//! only in their implementation of this trait.

use crate::codec::MotionSnapshot;
use crate::commands::{PinEventType, PullMode};

/// Synchronous board interface consumed by the engine.
///
/// All operations are simple register-level accesses with no failure
/// modes of their own; absent sensors report neutral values.
pub trait Hardware {
    fn set_pull(&mut self, pin: u8, mode: PullMode);

    fn write_digital(&mut self, pin: u8, level: bool);

    /// PWM output, 0..=1023
    fn write_analog(&mut self, pin: u8, value: u16);

    /// Servo output. Range and center arrive already resolved; the
    /// dispatcher substitutes defaults for zero values.
    fn set_servo(&mut self, pin: u8, angle: u16, range_us: u16, center_us: u16);

    /// Attach or detach the hardware event source for a pin.
    fn listen_pin_event(&mut self, pin: u8, event_type: PinEventType);

    fn set_touch_mode(&mut self, pin: u8, active: bool);

    fn set_mic_active(&mut self, active: bool);

    /// Composed digital levels word: pin levels in bits 0..=16,
    /// touch/button states in bits 24..=29.
    fn read_digital_levels(&mut self) -> u32;

    /// One raw ADC sample, 0..=1023. Callers filter.
    fn read_analog(&mut self, pin: u8) -> u16;

    /// One raw ambient light sample. Callers filter.
    fn read_light_level(&mut self) -> u16;

    /// Degrees Celsius
    fn read_temperature(&mut self) -> i8;

    /// Microphone loudness, 0..=255; zero while the mic is off
    fn read_sound_level(&mut self) -> u8;

    fn read_motion(&mut self) -> MotionSnapshot;

    fn display_clear(&mut self);

    fn display_text(&mut self, text: &str, delay_ms: u16);

    /// Show a 5x5 brightness matrix.
    fn display_show(&mut self, pixels: &[[u8; 5]; 5]);

    fn play_tone(&mut self, period_us: u32, volume: u8);

    fn stop_tone(&mut self);
}
