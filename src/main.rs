#![no_std]
#![no_main]

extern crate alloc;

// Required for ESP-IDF bootloader compatibility
// Use explicit parameters to ensure correct efuse block revision values
esp_bootloader_esp_idf::esp_app_desc!(
    env!("CARGO_PKG_VERSION"),  // version
    env!("CARGO_PKG_NAME"),     // project_name
    "00:00:00",                 // build_time
    "2025-01-01",               // build_date
    "0.0.0",                    // idf_ver (not using IDF)
    0x10000,                    // mmu_page_size (64KB)
    0,                          // min_efuse_blk_rev_full (accept all)
    u16::MAX                    // max_efuse_blk_rev_full (accept all)
);

use embassy_executor::Spawner;
use embassy_time::{Duration, Instant, Timer};
use esp_backtrace as _;
use esp_hal::analog::adc::{Adc, AdcConfig, Attenuation};
use esp_hal::gpio::{Flex, Input, InputConfig, Pull};
use esp_hal::ledc::channel::{self, ChannelIFace};
use esp_hal::ledc::timer::{self, TimerIFace};
use esp_hal::ledc::{LSGlobalClkSource, Ledc, LowSpeed};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::usb_serial_jtag::UsbSerialJtag;
use static_cell::StaticCell;

mod ble;
mod channels;
mod codec;
mod commands;
mod config;
mod device;
mod dispatcher;
mod filters;
mod hal;
mod registry;
mod serial;
mod tasks;
mod transport;

use codec::{ActionEvent, ButtonEvent};
use config::pins::{PIN_COUNT, STATE_BIT_BUTTON_A, STATE_BIT_BUTTON_B};
use hal::board::{BoardHardware, BUTTON_BITS};
use serial::jtag::JtagSerialPort;
use tasks::engine::{HardwareEvent, HARDWARE_EVENTS};
use transport::Engine;

/// Pin-equivalent source IDs the buttons report in action events
const BUTTON_A_SOURCE: u16 = 5;
const BUTTON_B_SOURCE: u16 = 11;

/// Static executor for embassy
static EXECUTOR: StaticCell<esp_rtos::embassy::Executor> = StaticCell::new();

/// Static cell for esp-radio controller (needed for 'static lifetime)
static RADIO_CONTROLLER: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();

/// LEDC driver and timers need 'static lifetimes for the channels
static LEDC: StaticCell<Ledc<'static>> = StaticCell::new();
static PWM_TIMER: StaticCell<timer::Timer<'static, LowSpeed>> = StaticCell::new();
static TONE_TIMER: StaticCell<timer::Timer<'static, LowSpeed>> = StaticCell::new();

#[esp_hal::main]
fn main() -> ! {
    // Heap for the BLE stack
    esp_alloc::heap_allocator!(size: 64 * 1024);
    esp_println::logger::init_logger_from_env();

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // Initialise the RTOS scheduler with timer - MUST be done before any async operations
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Edge-pin GPIOs. Pins 0..=2 are analog-only and 12..=14 are LEDC
    // outputs on this carrier, so only the plain digital pins get Flex
    // handles.
    let mut pins: [Option<Flex<'static>>; PIN_COUNT] = Default::default();
    pins[8] = Some(Flex::new(peripherals.GPIO8));
    pins[15] = Some(Flex::new(peripherals.GPIO15));
    pins[16] = Some(Flex::new(peripherals.GPIO16));

    // ADC inputs: edge pins 0..=2 plus the light sensor divider
    let mut adc_config = AdcConfig::new();
    let analog_p0 = adc_config.enable_pin(peripherals.GPIO1, Attenuation::_11dB);
    let analog_p1 = adc_config.enable_pin(peripherals.GPIO2, Attenuation::_11dB);
    let analog_p2 = adc_config.enable_pin(peripherals.GPIO3, Attenuation::_11dB);
    let light = adc_config.enable_pin(peripherals.GPIO4, Attenuation::_11dB);
    let adc = Adc::new(peripherals.ADC1, adc_config);

    // LEDC: one timer for the PWM/servo outputs, one retuned per tone
    let ledc = LEDC.init(Ledc::new(peripherals.LEDC));
    ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);

    let pwm_timer = PWM_TIMER.init(ledc.timer::<LowSpeed>(timer::Number::Timer0));
    pwm_timer
        .configure(timer::config::Config {
            duty: timer::config::Duty::Duty10Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_hz(1000),
        })
        .expect("Failed to configure PWM timer");

    let tone_timer = TONE_TIMER.init(ledc.timer::<LowSpeed>(timer::Number::Timer1));
    tone_timer
        .configure(timer::config::Config {
            duty: timer::config::Duty::Duty10Bit,
            clock_source: timer::LSClockSource::APBClk,
            frequency: Rate::from_hz(440),
        })
        .expect("Failed to configure tone timer");

    let mut pwm12 = ledc.channel(channel::Number::Channel0, peripherals.GPIO12);
    let mut pwm13 = ledc.channel(channel::Number::Channel1, peripherals.GPIO13);
    let mut pwm14 = ledc.channel(channel::Number::Channel2, peripherals.GPIO14);
    let mut speaker = ledc.channel(channel::Number::Channel3, peripherals.GPIO21);
    for (ch, tmr) in [
        (&mut pwm12, &*pwm_timer),
        (&mut pwm13, &*pwm_timer),
        (&mut pwm14, &*pwm_timer),
        (&mut speaker, &*tone_timer),
    ] {
        ch.configure(channel::config::Config {
            timer: tmr,
            duty_pct: 0,
            pin_config: channel::config::PinConfig::PushPull,
        })
        .expect("Failed to configure LEDC channel");
    }

    // Buttons A/B, active low
    let button_config = InputConfig::default().with_pull(Pull::Up);
    let button_a = Input::new(peripherals.GPIO17, button_config);
    let button_b = Input::new(peripherals.GPIO18, button_config);

    // USB Serial JTAG carries the framed serial transport
    let usb_serial = UsbSerialJtag::new(peripherals.USB_DEVICE).into_async();
    let (usb_rx, usb_tx) = usb_serial.split();
    let serial_port = JtagSerialPort::new(usb_rx, usb_tx);

    // Read unique device ID from eFuse MAC address (last 3 bytes)
    let mac = esp_hal::efuse::Efuse::read_base_mac_address();
    let device_id: [u8; 3] = [mac[3], mac[4], mac[5]];

    // Second handle onto the tone timer: the speaker channel above
    // keeps its binding, the board layer retunes the frequency through
    // this one.
    let tone_retune = ledc.timer::<LowSpeed>(timer::Number::Timer1);

    let board = BoardHardware::new(
        pins, adc, analog_p0, analog_p1, analog_p2, light,
        [pwm12, pwm13, pwm14], speaker, tone_retune,
    );

    let mut name_buf = [0u8; 20];
    let device_name = tasks::ble::format_device_name(&mut name_buf, &device_id);
    let engine = Engine::new(board, device_name);

    // Initialise esp-radio for BLE support (must be after esp_rtos::start)
    let radio_controller =
        RADIO_CONTROLLER.init(esp_radio::init().expect("Failed to initialize esp-radio"));

    let ble_connector = esp_radio::ble::controller::BleConnector::new(
        radio_controller,
        peripherals.BT,
        esp_radio::ble::Config::default(),
    )
    .expect("Failed to initialize BLE connector");

    let controller: trouble_host::prelude::ExternalController<_, 10> =
        trouble_host::prelude::ExternalController::new(ble_connector);

    let executor = EXECUTOR.init(esp_rtos::embassy::Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(async_main(
            spawner,
            engine,
            serial_port,
            controller,
            device_id,
            button_a,
            button_b,
        ));
    })
}

/// Type alias for the BLE controller
type BleController = trouble_host::prelude::ExternalController<
    esp_radio::ble::controller::BleConnector<'static>,
    10,
>;

#[embassy_executor::task]
async fn async_main(
    spawner: Spawner,
    engine: Engine<BoardHardware>,
    serial_port: JtagSerialPort,
    ble_controller: BleController,
    device_id: [u8; 3],
    button_a: Input<'static>,
    button_b: Input<'static>,
) {
    spawner.spawn(engine_runner(engine, serial_port)).unwrap();
    spawner.spawn(ble_host_task(ble_controller, device_id)).unwrap();
    spawner.spawn(input_watcher(button_a, button_b)).unwrap();
}

/// Task that runs the protocol engine over the serial transport
#[embassy_executor::task]
async fn engine_runner(engine: Engine<BoardHardware>, serial_port: JtagSerialPort) {
    tasks::engine::engine_task(engine, serial_port).await
}

/// Task that manages BLE connectivity
#[embassy_executor::task]
async fn ble_host_task(controller: BleController, device_id: [u8; 3]) {
    tasks::ble::ble_task(controller, device_id).await;
}

/// Poll period for the button inputs
const BUTTON_POLL_MS: u64 = 10;

/// Presses shorter than this report a click on release
const CLICK_MS: u64 = 500;

/// Task that watches the buttons, maintains their bits in the state
/// word and emits action events.
#[embassy_executor::task]
async fn input_watcher(button_a: Input<'static>, button_b: Input<'static>) {
    struct Tracker {
        source: u16,
        state_bit: u8,
        pressed: bool,
        pressed_at: Instant,
    }

    let mut trackers = [
        Tracker {
            source: BUTTON_A_SOURCE,
            state_bit: STATE_BIT_BUTTON_A,
            pressed: false,
            pressed_at: Instant::MIN,
        },
        Tracker {
            source: BUTTON_B_SOURCE,
            state_bit: STATE_BIT_BUTTON_B,
            pressed: false,
            pressed_at: Instant::MIN,
        },
    ];
    let buttons = [button_a, button_b];
    let events = HARDWARE_EVENTS.sender();

    loop {
        for (tracker, button) in trackers.iter_mut().zip(buttons.iter()) {
            let pressed = button.is_low();
            if pressed == tracker.pressed {
                continue;
            }
            tracker.pressed = pressed;
            let now = Instant::now();
            let timestamp = now.as_millis() as u32;

            if pressed {
                tracker.pressed_at = now;
                BUTTON_BITS.fetch_or(1 << tracker.state_bit, core::sync::atomic::Ordering::Relaxed);
                let _ = events.try_send(HardwareEvent::Action(ActionEvent::Button {
                    source: tracker.source,
                    event: ButtonEvent::Down,
                    timestamp,
                }));
            } else {
                BUTTON_BITS.fetch_and(
                    !(1 << tracker.state_bit),
                    core::sync::atomic::Ordering::Relaxed,
                );
                let _ = events.try_send(HardwareEvent::Action(ActionEvent::Button {
                    source: tracker.source,
                    event: ButtonEvent::Up,
                    timestamp,
                }));
                if now - tracker.pressed_at < Duration::from_millis(CLICK_MS) {
                    let _ = events.try_send(HardwareEvent::Action(ActionEvent::Button {
                        source: tracker.source,
                        event: ButtonEvent::Click,
                        timestamp,
                    }));
                }
            }
        }
        Timer::after(Duration::from_millis(BUTTON_POLL_MS)).await;
    }
}
