//! Board support for the ESP32-S3 carrier
//!
//! Rev-A carrier routing:
//! - edge pins 0..=2 are analog-capable inputs on GPIO1..=3
//! - ambient light sensor (photoresistor divider) on GPIO4
//! - edge pins 12..=14 carry the PWM-capable outputs (LEDC channels)
//! - speaker on GPIO21 (LEDC channel 3)
//! - remaining edge pins are plain GPIO
//!
//! No IMU, compass or microphone is fitted on rev A; those sensors
//! report neutral values. The 5x5 matrix header is unpopulated, so
//! display operations go to the log.

use core::sync::atomic::{AtomicU32, Ordering};

use esp_hal::analog::adc::{Adc, AdcPin};
use esp_hal::gpio::{Flex, InputConfig, Pull};
use esp_hal::ledc::channel::{self, ChannelIFace};
use esp_hal::ledc::timer::{self, TimerIFace};
use esp_hal::ledc::LowSpeed;
use esp_hal::peripherals::{ADC1, GPIO1, GPIO2, GPIO3, GPIO4};
use esp_hal::time::Rate;
use esp_hal::Blocking;

use crate::codec::MotionSnapshot;
use crate::commands::{PinEventType, PullMode};
use crate::config::pins::PIN_COUNT;
use crate::hal::Hardware;

/// Touch/button bits (state-word layout, bits 24..=29) maintained by
/// the input watcher task.
pub static BUTTON_BITS: AtomicU32 = AtomicU32::new(0);

/// Edge pins routed to LEDC output channels on this carrier.
const PWM_PINS: [u8; 3] = [12, 13, 14];

type AnalogInput<P> = AdcPin<P, ADC1<'static>>;

pub struct BoardHardware {
    /// Edge-pin GPIOs indexed by edge pin number
    pins: [Option<Flex<'static>>; PIN_COUNT],
    adc: Adc<'static, ADC1<'static>, Blocking>,
    analog_p0: AnalogInput<GPIO1<'static>>,
    analog_p1: AnalogInput<GPIO2<'static>>,
    analog_p2: AnalogInput<GPIO3<'static>>,
    light: AnalogInput<GPIO4<'static>>,
    /// Output channels for edge pins 12..=14
    pwm: [channel::Channel<'static, LowSpeed>; 3],
    speaker: channel::Channel<'static, LowSpeed>,
    /// Retuning handle for the tone timer. The speaker channel is bound
    /// to the same hardware timer at start-up; this handle only changes
    /// its frequency.
    tone_timer: timer::Timer<'static, LowSpeed>,
}

impl BoardHardware {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pins: [Option<Flex<'static>>; PIN_COUNT],
        adc: Adc<'static, ADC1<'static>, Blocking>,
        analog_p0: AnalogInput<GPIO1<'static>>,
        analog_p1: AnalogInput<GPIO2<'static>>,
        analog_p2: AnalogInput<GPIO3<'static>>,
        light: AnalogInput<GPIO4<'static>>,
        pwm: [channel::Channel<'static, LowSpeed>; 3],
        speaker: channel::Channel<'static, LowSpeed>,
        tone_timer: timer::Timer<'static, LowSpeed>,
    ) -> Self {
        Self {
            pins,
            adc,
            analog_p0,
            analog_p1,
            analog_p2,
            light,
            pwm,
            speaker,
            tone_timer,
        }
    }

    fn pwm_channel(&mut self, pin: u8) -> Option<&mut channel::Channel<'static, LowSpeed>> {
        PWM_PINS
            .iter()
            .position(|&p| p == pin)
            .map(|index| &mut self.pwm[index])
    }

    fn read_adc_scaled(&mut self, pin: u8) -> u16 {
        let raw = match pin {
            0 => self.adc.read_blocking(&mut self.analog_p0),
            1 => self.adc.read_blocking(&mut self.analog_p1),
            2 => self.adc.read_blocking(&mut self.analog_p2),
            _ => return 0,
        };
        // 12-bit ADC scaled to the protocol's 0..=1023 range
        raw >> 2
    }
}

impl Hardware for BoardHardware {
    fn set_pull(&mut self, pin: u8, mode: PullMode) {
        let Some(gpio) = self.pins.get_mut(pin as usize).and_then(Option::as_mut) else {
            return;
        };
        let pull = match mode {
            PullMode::None => Pull::None,
            PullMode::Down => Pull::Down,
            PullMode::Up => Pull::Up,
        };
        gpio.apply_input_config(&InputConfig::default().with_pull(pull));
        gpio.set_input_enable(true);
    }

    fn write_digital(&mut self, pin: u8, level: bool) {
        let Some(gpio) = self.pins.get_mut(pin as usize).and_then(Option::as_mut) else {
            return;
        };
        gpio.set_output_enable(true);
        if level {
            gpio.set_high();
        } else {
            gpio.set_low();
        }
    }

    fn write_analog(&mut self, pin: u8, value: u16) {
        let Some(channel) = self.pwm_channel(pin) else {
            log::debug!("pin {} has no PWM route on this carrier", pin);
            return;
        };
        let duty = (u32::from(value.min(1023)) * 100 / 1023) as u8;
        let _ = channel.set_duty(duty);
    }

    fn set_servo(&mut self, pin: u8, angle: u16, range_us: u16, center_us: u16) {
        let Some(channel) = self.pwm_channel(pin) else {
            log::debug!("pin {} has no PWM route on this carrier", pin);
            return;
        };
        // Map the angle onto a pulse width inside a 20 ms servo period.
        let half_range = u32::from(range_us) / 2;
        let low = u32::from(center_us).saturating_sub(half_range);
        let pulse_us = low + u32::from(angle.min(180)) * u32::from(range_us) / 180;
        let duty = (pulse_us * 100 / 20_000).min(100) as u8;
        let _ = channel.set_duty(duty);
    }

    fn listen_pin_event(&mut self, pin: u8, event_type: PinEventType) {
        // Edge listeners are polled by the input watcher task; it picks
        // the configuration up from the pin state table.
        log::debug!("pin {} event listener set to {:?}", pin, event_type);
    }

    fn set_touch_mode(&mut self, pin: u8, active: bool) {
        log::debug!("pin {} touch mode {}", pin, active);
    }

    fn set_mic_active(&mut self, _active: bool) {
        // No microphone fitted on rev A.
    }

    fn read_digital_levels(&mut self) -> u32 {
        let mut levels = 0u32;
        for (index, slot) in self.pins.iter_mut().enumerate() {
            if let Some(gpio) = slot.as_mut() {
                if gpio.is_high() {
                    levels |= 1 << index;
                }
            }
        }
        levels | BUTTON_BITS.load(Ordering::Relaxed)
    }

    fn read_analog(&mut self, pin: u8) -> u16 {
        self.read_adc_scaled(pin)
    }

    fn read_light_level(&mut self) -> u16 {
        // Scale the divider reading to the protocol's 0..=255 range.
        self.adc.read_blocking(&mut self.light) >> 4
    }

    fn read_temperature(&mut self) -> i8 {
        // No thermometer on rev A; the SoC sensor lives in the radio
        // domain once BLE is up, so report ambient-neutral.
        20
    }

    fn read_sound_level(&mut self) -> u8 {
        0
    }

    fn read_motion(&mut self) -> MotionSnapshot {
        // No IMU or compass fitted on rev A.
        MotionSnapshot::default()
    }

    fn display_clear(&mut self) {
        log::info!("display: clear");
    }

    fn display_text(&mut self, text: &str, delay_ms: u16) {
        log::info!("display: scroll '{}' ({} ms)", text, delay_ms);
    }

    fn display_show(&mut self, pixels: &[[u8; 5]; 5]) {
        log::info!("display: matrix {:?}", pixels);
    }

    fn play_tone(&mut self, period_us: u32, volume: u8) {
        if period_us == 0 {
            return;
        }
        let frequency = 1_000_000 / period_us;
        if frequency == 0 {
            return;
        }
        let _ = self.tone_timer.configure(timer::config::Config {
            duty: timer::config::Duty::Duty10Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_hz(frequency),
        });
        let duty = (u32::from(volume) * 50 / 255) as u8;
        let _ = self.speaker.set_duty(duty);
    }

    fn stop_tone(&mut self) {
        let _ = self.speaker.set_duty(0);
    }
}
