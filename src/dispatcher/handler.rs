//! Command dispatcher
//!
//! Decodes an inbound command-channel payload and applies the device
//! mutation it names. The wire protocol has no NACK for commands, so
//! anything that fails to decode or validate is dropped here.

use crate::commands::{Command, CommandParser, PinEventType};
use crate::config::servo::{DEFAULT_CENTER_US, DEFAULT_RANGE_US};
use crate::device::DeviceState;
use crate::hal::Hardware;
use crate::registry::NO_ID;

/// Events raised for application code as a side effect of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalEvent {
    /// A labeled message arrived; `id` is the registry slot's
    /// external ID.
    DataReceived { id: u8 },
}

/// Decodes command payloads and applies them to the device.
pub struct CommandExecutor {
    parser: CommandParser,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self {
            parser: CommandParser::new(),
        }
    }

    /// Decode and apply one command buffer.
    pub fn execute<H: Hardware>(
        &self,
        state: &mut DeviceState,
        hw: &mut H,
        data: &[u8],
    ) -> Option<LocalEvent> {
        let Some(command) = self.parser.parse(data) else {
            log::debug!("ignoring malformed command, opcode {:#04x}", data.first().copied().unwrap_or(0));
            return None;
        };
        self.apply(state, hw, command)
    }

    fn apply<H: Hardware>(
        &self,
        state: &mut DeviceState,
        hw: &mut H,
        command: Command,
    ) -> Option<LocalEvent> {
        match command {
            Command::SetOutput { pin, level } => {
                let _ = self.gpio(state, pin)?;
                hw.write_digital(pin, level);
            }
            Command::SetPwm { pin, value } => {
                let _ = self.gpio(state, pin)?;
                hw.write_analog(pin, value);
            }
            Command::SetServo {
                pin,
                angle,
                range,
                center,
            } => {
                let _ = self.gpio(state, pin)?;
                let range = if range == 0 { DEFAULT_RANGE_US } else { range };
                let center = if center == 0 { DEFAULT_CENTER_US } else { center };
                hw.set_servo(pin, angle, range, center);
            }
            Command::SetPull { pin, mode } => {
                self.gpio(state, pin)?.pull = mode;
                hw.set_pull(pin, mode);
            }
            Command::SetEvent { pin, event_type } => {
                self.gpio(state, pin)?.event_type = event_type;
                hw.listen_pin_event(pin, event_type);
            }
            Command::DisplayClear => hw.display_clear(),
            Command::DisplayText { delay_ms, text } => hw.display_text(&text, delay_ms),
            Command::DisplayRows0 { rows } => state.stage_rows0(&rows),
            Command::DisplayRows1 { rows } => {
                state.stage_rows1(&rows);
                hw.display_show(state.shadow_pixels());
            }
            Command::PlayTone { period_us, volume } => hw.play_tone(period_us, volume),
            Command::StopTone => hw.stop_tone(),
            Command::ConfigMic { active } => {
                state.mic_active = active;
                hw.set_mic_active(active);
            }
            Command::ConfigTouch { pin, active } => {
                let pin_state = self.gpio(state, pin)?;
                pin_state.touch_mode = active;
                let event_type = if active {
                    PinEventType::OnTouch
                } else {
                    PinEventType::None
                };
                pin_state.event_type = event_type;
                hw.set_touch_mode(pin, active);
                hw.listen_pin_event(pin, event_type);
            }
            Command::Data {
                content_type,
                label,
                content,
            } => {
                let id = state.registry.register(&label, content_type);
                if id == NO_ID {
                    log::debug!("label registry full, dropping data command");
                    return None;
                }
                state.registry.ingest(id, &content);
                return Some(LocalEvent::DataReceived { id });
            }
        }
        None
    }

    /// Range-validate a pin index on the way in. Out-of-table pins drop
    /// the whole command.
    fn gpio<'a>(
        &self,
        state: &'a mut DeviceState,
        pin: u8,
    ) -> Option<&'a mut crate::device::PinState> {
        if !DeviceState::is_gpio(pin) {
            log::debug!("ignoring command for non-GPIO pin {}", pin);
            return None;
        }
        state.pin_mut(pin)
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::PullMode;
    use crate::hal::traits::mock::MockHardware;
    use crate::registry::ContentType;

    fn setup() -> (CommandExecutor, DeviceState, MockHardware) {
        (CommandExecutor::new(), DeviceState::new(), MockHardware::new())
    }

    #[test]
    fn test_set_output() {
        let (executor, mut state, mut hw) = setup();
        executor.execute(&mut state, &mut hw, &[0x21, 8, 1]);
        assert_eq!(hw.digital_writes.as_slice(), &[(8, true)]);
    }

    #[test]
    fn test_set_pwm() {
        let (executor, mut state, mut hw) = setup();
        executor.execute(&mut state, &mut hw, &[0x22, 1, 0xFF, 0x03]);
        assert_eq!(hw.analog_writes.as_slice(), &[(1, 1023)]);
    }

    #[test]
    fn test_set_servo_defaults() {
        let (executor, mut state, mut hw) = setup();
        // Zero range selects both defaults.
        executor.execute(&mut state, &mut hw, &[0x23, 2, 90, 0]);
        // Zero center with explicit range selects the default center.
        executor.execute(&mut state, &mut hw, &[0x23, 2, 90, 0, 0xB8, 0x0B]);
        assert_eq!(hw.servo_writes.as_slice(), &[
            (2, 90, DEFAULT_RANGE_US, DEFAULT_CENTER_US),
            (2, 90, 3000, DEFAULT_CENTER_US),
        ]);
    }

    #[test]
    fn test_set_pull_updates_state_and_hardware() {
        let (executor, mut state, mut hw) = setup();
        executor.execute(&mut state, &mut hw, &[0x24, 0, 1]);
        assert_eq!(state.pin(0).unwrap().pull, PullMode::Down);
        assert_eq!(hw.pulls.as_slice(), &[(0, PullMode::Down)]);
    }

    #[test]
    fn test_set_event_listener() {
        let (executor, mut state, mut hw) = setup();
        executor.execute(&mut state, &mut hw, &[0x25, 14, 1]);
        assert_eq!(state.pin(14).unwrap().event_type, PinEventType::OnEdge);
        assert_eq!(hw.event_listens.as_slice(), &[(14, PinEventType::OnEdge)]);

        executor.execute(&mut state, &mut hw, &[0x25, 14, 0]);
        assert_eq!(state.pin(14).unwrap().event_type, PinEventType::None);
    }

    #[test]
    fn test_non_gpio_pin_ignored() {
        let (executor, mut state, mut hw) = setup();
        executor.execute(&mut state, &mut hw, &[0x21, 5, 1]);
        executor.execute(&mut state, &mut hw, &[0x24, 17, 2]);
        assert!(hw.digital_writes.is_empty());
        assert!(hw.pulls.is_empty());
    }

    #[test]
    fn test_display_clear_and_text() {
        let (executor, mut state, mut hw) = setup();
        executor.execute(&mut state, &mut hw, &[0x40]);
        assert_eq!(hw.display_cleared, 1);

        executor.execute(&mut state, &mut hw, &[0x41, 12, b'o', b'k']);
        assert_eq!(hw.displayed_texts.len(), 1);
        assert_eq!(hw.displayed_texts[0].0.as_str(), "ok");
        assert_eq!(hw.displayed_texts[0].1, 120);
    }

    #[test]
    fn test_matrix_commits_on_second_frame() {
        let (executor, mut state, mut hw) = setup();

        let mut rows0 = [0u8; 16];
        rows0[0] = 0x42;
        rows0[1..16].copy_from_slice(&[9; 15]);
        executor.execute(&mut state, &mut hw, &rows0);
        // First frame only stages.
        assert!(hw.shown_matrices.is_empty());

        let mut rows1 = [0u8; 11];
        rows1[0] = 0x43;
        rows1[1..11].copy_from_slice(&[7; 10]);
        executor.execute(&mut state, &mut hw, &rows1);
        assert_eq!(
            hw.shown_matrices.as_slice(),
            &[[[9; 5], [9; 5], [9; 5], [7; 5], [7; 5]]]
        );
    }

    #[test]
    fn test_audio() {
        let (executor, mut state, mut hw) = setup();
        executor.execute(&mut state, &mut hw, &[0x61, 0xE8, 0x03, 0x00, 0x00, 200]);
        executor.execute(&mut state, &mut hw, &[0x60]);
        assert_eq!(hw.tones.as_slice(), &[(1000, 200)]);
        assert_eq!(hw.tone_stops, 1);
    }

    #[test]
    fn test_config_mic() {
        let (executor, mut state, mut hw) = setup();
        executor.execute(&mut state, &mut hw, &[0x01, 1]);
        assert!(state.mic_active);
        assert!(hw.mic_active);
    }

    #[test]
    fn test_config_touch_attaches_listener() {
        let (executor, mut state, mut hw) = setup();
        executor.execute(&mut state, &mut hw, &[0x02, 1, 1]);
        assert!(state.pin(1).unwrap().touch_mode);
        assert_eq!(state.pin(1).unwrap().event_type, PinEventType::OnTouch);
        assert_eq!(hw.touch_modes.as_slice(), &[(1, true)]);
        assert_eq!(hw.event_listens.as_slice(), &[(1, PinEventType::OnTouch)]);

        executor.execute(&mut state, &mut hw, &[0x02, 1, 0]);
        assert!(!state.pin(1).unwrap().touch_mode);
        assert_eq!(state.pin(1).unwrap().event_type, PinEventType::None);
    }

    #[test]
    fn test_data_command_registers_and_signals() {
        let (executor, mut state, mut hw) = setup();
        let mut data = heapless::Vec::<u8, 20>::new();
        data.push(0x81).unwrap();
        data.extend_from_slice(b"speed\0\0\0").unwrap();
        data.extend_from_slice(&2.5f32.to_le_bytes()).unwrap();

        let event = executor.execute(&mut state, &mut hw, &data);
        assert_eq!(event, Some(LocalEvent::DataReceived { id: 1 }));
        assert_eq!(state.registry.read_as_number(1), Ok(2.5));
        assert_eq!(state.registry.find(b"speed", ContentType::Number), Some(1));
    }

    #[test]
    fn test_data_command_reuses_slot() {
        let (executor, mut state, mut hw) = setup();
        let mut frame = heapless::Vec::<u8, 20>::new();
        frame.push(0x82).unwrap();
        frame.extend_from_slice(b"chat\0\0\0\0").unwrap();
        frame.extend_from_slice(b"one").unwrap();
        executor.execute(&mut state, &mut hw, &frame);

        let mut frame2 = heapless::Vec::<u8, 20>::new();
        frame2.push(0x82).unwrap();
        frame2.extend_from_slice(b"chat\0\0\0\0").unwrap();
        frame2.extend_from_slice(b"two").unwrap();
        let event = executor.execute(&mut state, &mut hw, &frame2);

        assert_eq!(event, Some(LocalEvent::DataReceived { id: 1 }));
        assert_eq!(state.registry.read_as_text(1), Ok("two"));
    }

    #[test]
    fn test_malformed_commands_are_silently_dropped() {
        let (executor, mut state, mut hw) = setup();
        assert_eq!(executor.execute(&mut state, &mut hw, &[]), None);
        assert_eq!(executor.execute(&mut state, &mut hw, &[0xA0, 1, 2]), None);
        assert_eq!(executor.execute(&mut state, &mut hw, &[0x21, 8]), None);
        assert!(hw.digital_writes.is_empty());
    }
}
