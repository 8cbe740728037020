//! Device-side session state
//!
//! One [`DeviceState`] is constructed at start-up and passed by
//! reference into the dispatcher and the transport adapter; there is no
//! global device object. Under the cooperative task model the pin table
//! and registry are mutated only on the command path and read on the
//! update path, which is what makes lock-free access safe.

use crate::commands::{PinEventType, PullMode};
use crate::config::pins::{GPIO, INITIAL_PULL_UP, PIN_COUNT};
use crate::filters::LightLevelFilter;
use crate::hal::Hardware;
use crate::registry::LabelRegistry;

/// Per-pin configuration attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PinState {
    pub pull: PullMode,
    pub touch_mode: bool,
    pub event_type: PinEventType,
}

/// Mutable session state shared by the dispatcher and the update path.
pub struct DeviceState {
    pins: [PinState; PIN_COUNT],
    pub registry: LabelRegistry,
    pub mic_active: bool,
    pub light_filter: LightLevelFilter,
    // Matrix rows staged by the two display-pixels commands; committed
    // on the second frame.
    shadow_pixels: [[u8; 5]; 5],
}

impl DeviceState {
    pub fn new() -> Self {
        Self {
            pins: [PinState::default(); PIN_COUNT],
            registry: LabelRegistry::new(),
            mic_active: false,
            light_filter: LightLevelFilter::new(),
            shadow_pixels: [[0; 5]; 5],
        }
    }

    /// Whether a pin index names a controllable GPIO pin.
    pub fn is_gpio(pin: u8) -> bool {
        GPIO.contains(&pin)
    }

    pub fn pin(&self, pin: u8) -> Option<&PinState> {
        self.pins.get(pin as usize)
    }

    pub fn pin_mut(&mut self, pin: u8) -> Option<&mut PinState> {
        self.pins.get_mut(pin as usize)
    }

    /// Reset pin configuration to the session default: edge pins 0..=2
    /// pulled up, everything else floating, no listeners. Runs on peer
    /// connect.
    pub fn reset_pins<H: Hardware>(&mut self, hw: &mut H) {
        self.pins = [PinState::default(); PIN_COUNT];
        for &pin in INITIAL_PULL_UP.iter() {
            self.pins[pin as usize].pull = PullMode::Up;
            hw.set_pull(pin, PullMode::Up);
        }
    }

    pub fn stage_rows0(&mut self, rows: &[[u8; 5]; 3]) {
        self.shadow_pixels[..3].copy_from_slice(rows);
    }

    pub fn stage_rows1(&mut self, rows: &[[u8; 5]; 2]) {
        self.shadow_pixels[3..].copy_from_slice(rows);
    }

    pub fn shadow_pixels(&self) -> &[[u8; 5]; 5] {
        &self.shadow_pixels
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::traits::mock::MockHardware;

    #[test]
    fn test_gpio_table() {
        for pin in [0, 1, 2, 8, 12, 13, 14, 15, 16] {
            assert!(DeviceState::is_gpio(pin));
        }
        for pin in [3, 4, 5, 11, 17, 200] {
            assert!(!DeviceState::is_gpio(pin));
        }
    }

    #[test]
    fn test_reset_pins_applies_initial_pull_up() {
        let mut state = DeviceState::new();
        let mut hw = MockHardware::new();

        state.pin_mut(8).unwrap().pull = PullMode::Down;
        state.pin_mut(8).unwrap().event_type = PinEventType::OnEdge;
        state.reset_pins(&mut hw);

        assert_eq!(state.pin(0).unwrap().pull, PullMode::Up);
        assert_eq!(state.pin(2).unwrap().pull, PullMode::Up);
        assert_eq!(state.pin(8).unwrap().pull, PullMode::None);
        assert_eq!(state.pin(8).unwrap().event_type, PinEventType::None);
        assert_eq!(hw.pulls.as_slice(), &[
            (0, PullMode::Up),
            (1, PullMode::Up),
            (2, PullMode::Up),
        ]);
    }

    #[test]
    fn test_staged_rows_commit_as_whole_matrix() {
        let mut state = DeviceState::new();
        state.stage_rows0(&[[1; 5], [2; 5], [3; 5]]);
        state.stage_rows1(&[[4; 5], [5; 5]]);
        assert_eq!(
            state.shadow_pixels(),
            &[[1; 5], [2; 5], [3; 5], [4; 5], [5; 5]]
        );
    }
}
