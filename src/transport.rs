//! Transport adapter
//!
//! One [`Engine`] owns the hardware handle, the session state and the
//! channel buffer table, and serves both transports: GATT maps each
//! channel to a characteristic, serial multiplexes them through the
//! frame state machine. Each transport supplies only its own glue; the
//! payloads are identical.

use heapless::{String, Vec};

use crate::channels::Channel;
use crate::codec::{
    self, ActionEvent, LabeledMessage, MotionSnapshot, PinEvent, StateSnapshot,
};
use crate::config::filters::ANALOG_IN_SAMPLES;
use crate::config::pins::ANALOG_IN;
use crate::config::protocol::{
    ANALOG_IN_PAYLOAD, HARDWARE_VERSION, MAX_CHANNEL_PAYLOAD, MOTION_PAYLOAD, PROTOCOL_VERSION,
    STATE_PAYLOAD,
};
use crate::config::serial::FRAME_BUFFER_SIZE;
use crate::device::DeviceState;
use crate::dispatcher::{CommandExecutor, LocalEvent};
use crate::filters::median;
use crate::hal::Hardware;
use crate::serial::framer::{
    encode_frame, encode_write_ack, RequestType, ResponseType, SerialRequest,
};

/// Communication route reported in version info.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Ble = 0,
    Serial = 1,
}

/// Maximum characters in the idle banner (device name).
pub const DEVICE_NAME_MAX: usize = 20;

/// One encoded serial frame.
pub type Frame = Vec<u8, FRAME_BUFFER_SIZE>;

/// The channel buffer table. Buffers are owned here exclusively and
/// mutated in place by the codecs.
pub struct ChannelBuffers {
    pub command: [u8; MAX_CHANNEL_PAYLOAD],
    pub state: [u8; STATE_PAYLOAD],
    pub motion: [u8; MOTION_PAYLOAD],
    pub analog_in: [[u8; ANALOG_IN_PAYLOAD]; 3],
    pub pin_event: [u8; MAX_CHANNEL_PAYLOAD],
    pub action_event: [u8; MAX_CHANNEL_PAYLOAD],
    pub message: [u8; MAX_CHANNEL_PAYLOAD],
}

impl ChannelBuffers {
    fn new() -> Self {
        Self {
            command: [0; MAX_CHANNEL_PAYLOAD],
            state: [0; STATE_PAYLOAD],
            motion: [0; MOTION_PAYLOAD],
            analog_in: [[0; ANALOG_IN_PAYLOAD]; 3],
            pin_event: [0; MAX_CHANNEL_PAYLOAD],
            action_event: [0; MAX_CHANNEL_PAYLOAD],
            message: [0; MAX_CHANNEL_PAYLOAD],
        }
    }

    /// Current contents of a channel.
    pub fn get(&self, channel: Channel) -> &[u8] {
        match channel {
            Channel::Command => &self.command,
            Channel::State => &self.state,
            Channel::Motion => &self.motion,
            Channel::AnalogIn0 => &self.analog_in[0],
            Channel::AnalogIn1 => &self.analog_in[1],
            Channel::AnalogIn2 => &self.analog_in[2],
            Channel::PinEvent => &self.pin_event,
            Channel::ActionEvent => &self.action_event,
            Channel::Message => &self.message,
        }
    }
}

/// Protocol engine shared by both transports.
pub struct Engine<H: Hardware> {
    pub hw: H,
    pub state: DeviceState,
    pub buffers: ChannelBuffers,
    executor: CommandExecutor,
    device_name: String<DEVICE_NAME_MAX>,
    ble_connected: bool,
    serial_session: bool,
    idle_banner_shown: bool,
    pending_event: Option<LocalEvent>,
    // Serial-side notification gates, toggled by NotifyStart/NotifyStop.
    serial_notify: [bool; 3],
}

const NOTIFY_GATE_PIN_EVENT: usize = 0;
const NOTIFY_GATE_ACTION_EVENT: usize = 1;
const NOTIFY_GATE_MESSAGE: usize = 2;

impl<H: Hardware> Engine<H> {
    pub fn new(hw: H, device_name: &str) -> Self {
        let mut name: String<DEVICE_NAME_MAX> = String::new();
        for ch in device_name.chars() {
            if name.push(ch).is_err() {
                break;
            }
        }
        Self {
            hw,
            state: DeviceState::new(),
            buffers: ChannelBuffers::new(),
            executor: CommandExecutor::new(),
            device_name: name,
            ble_connected: false,
            serial_session: false,
            idle_banner_shown: false,
            pending_event: None,
            serial_notify: [true; 3],
        }
    }

    pub fn serial_session(&self) -> bool {
        self.serial_session
    }

    pub fn peer_attached(&self) -> bool {
        self.ble_connected || self.serial_session
    }

    /// Take the local event raised by the last dispatched command.
    pub fn take_local_event(&mut self) -> Option<LocalEvent> {
        self.pending_event.take()
    }

    /// Whether serial notifications are enabled for a notify channel.
    pub fn serial_notify_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::PinEvent => self.serial_notify[NOTIFY_GATE_PIN_EVENT],
            Channel::ActionEvent => self.serial_notify[NOTIFY_GATE_ACTION_EVENT],
            Channel::Message => self.serial_notify[NOTIFY_GATE_MESSAGE],
            _ => false,
        }
    }

    /// Peer connected over GATT: reset pin configuration and show the
    /// version banner.
    pub fn on_ble_connected(&mut self) {
        self.ble_connected = true;
        self.idle_banner_shown = false;
        self.state.reset_pins(&mut self.hw);
        let mut banner: String<8> = String::new();
        let _ = core::fmt::write(
            &mut banner,
            format_args!("-{}.{}-", HARDWARE_VERSION, PROTOCOL_VERSION),
        );
        self.hw.display_text(&banner, 120);
        log::info!("ble peer connected");
    }

    pub fn on_ble_disconnected(&mut self) {
        self.ble_connected = false;
        self.idle_banner_shown = false;
        log::info!("ble peer disconnected");
    }

    /// First serial exchange completed: the serial session is active
    /// and the idle-loop name display stays suppressed from here on.
    fn on_serial_connected(&mut self) {
        self.serial_session = true;
        self.state.reset_pins(&mut self.hw);
        log::info!("serial session started");
    }

    /// Periodic update entry point. Refreshes the snapshot channels
    /// while a peer is attached; otherwise shows the idle banner once.
    pub fn poll(&mut self) {
        if self.peer_attached() {
            self.refresh_state();
            self.refresh_motion();
            for index in 0..ANALOG_IN.len() {
                self.refresh_analog(index);
            }
        } else if !self.idle_banner_shown {
            self.idle_banner_shown = true;
            let name = self.device_name.clone();
            self.hw.display_text(&name, 120);
        }
    }

    /// Refresh the state channel from current sensor values.
    pub fn refresh_state(&mut self) {
        let light_raw = self.hw.read_light_level();
        let light = self.state.light_filter.sample(light_raw);
        let snapshot = StateSnapshot {
            digital_levels: self.hw.read_digital_levels(),
            light_level: light.min(255) as u8,
            temperature: self.hw.read_temperature(),
            sound_level: if self.state.mic_active {
                self.hw.read_sound_level()
            } else {
                0
            },
        };
        snapshot.encode(&mut self.buffers.state);
    }

    /// Refresh the motion channel.
    pub fn refresh_motion(&mut self) {
        let snapshot: MotionSnapshot = self.hw.read_motion();
        snapshot.encode(&mut self.buffers.motion);
    }

    /// Refresh one analog-in channel with a median-filtered burst.
    pub fn refresh_analog(&mut self, index: usize) {
        let Some(&pin) = ANALOG_IN.get(index) else {
            return;
        };
        let mut samples = [0u16; ANALOG_IN_SAMPLES];
        for sample in samples.iter_mut() {
            *sample = self.hw.read_analog(pin);
        }
        codec::encode_analog_in(median(samples), &mut self.buffers.analog_in[index]);
    }

    /// Refresh the version info held in the command channel buffer.
    pub fn update_version_info(&mut self, route: Route) {
        self.buffers.command = [0; MAX_CHANNEL_PAYLOAD];
        self.buffers.command[0] = HARDWARE_VERSION;
        self.buffers.command[1] = PROTOCOL_VERSION;
        self.buffers.command[2] = route as u8;
    }

    /// Apply one command-channel write, from either transport.
    pub fn apply_command(&mut self, payload: &[u8]) {
        let len = payload.len().min(MAX_CHANNEL_PAYLOAD);
        self.buffers.command[..len].copy_from_slice(&payload[..len]);
        if let Some(event) = self
            .executor
            .execute(&mut self.state, &mut self.hw, &payload[..len])
        {
            self.pending_event = Some(event);
        }
    }

    /// Encode a pin event into its notify buffer and return it.
    pub fn encode_pin_event(&mut self, event: PinEvent) -> &[u8; MAX_CHANNEL_PAYLOAD] {
        let mut buffer = [0u8; MAX_CHANNEL_PAYLOAD];
        event.encode(&mut buffer);
        self.buffers.pin_event = buffer;
        &self.buffers.pin_event
    }

    /// Encode an action event into its notify buffer and return it.
    pub fn encode_action_event(&mut self, event: ActionEvent) -> &[u8; MAX_CHANNEL_PAYLOAD] {
        let mut buffer = [0u8; MAX_CHANNEL_PAYLOAD];
        event.encode(&mut buffer);
        self.buffers.action_event = buffer;
        &self.buffers.action_event
    }

    /// Encode an outbound labeled message into its notify buffer.
    pub fn encode_message(&mut self, message: &LabeledMessage) -> &[u8; MAX_CHANNEL_PAYLOAD] {
        let mut buffer = [0u8; MAX_CHANNEL_PAYLOAD];
        message.encode(&mut buffer);
        self.buffers.message = buffer;
        &self.buffers.message
    }

    /// Handle one validated serial request, returning the frames to
    /// transmit. Unknown (channel, request) combinations produce none.
    pub fn handle_serial_request(&mut self, request: SerialRequest) -> Vec<Frame, 2> {
        let mut frames: Vec<Frame, 2> = Vec::new();
        let Some(channel) = Channel::from_id(request.channel) else {
            log::debug!("serial request for unknown channel {:#06x}", request.channel);
            return frames;
        };

        match (channel, request.request) {
            (Channel::Command, RequestType::Read) => {
                self.update_version_info(Route::Serial);
                let _ = frames.push(encode_frame(
                    ResponseType::Read,
                    channel.id(),
                    &self.buffers.command,
                ));
                if !self.serial_session {
                    self.on_serial_connected();
                }
            }
            (Channel::Command, RequestType::Write | RequestType::WriteWithResponse) => {
                if let Some(payload) = request.payload {
                    self.apply_command(&payload);
                }
                if request.request == RequestType::WriteWithResponse {
                    let _ = frames.push(encode_write_ack(channel.id()));
                }
            }
            (Channel::State, RequestType::Read) => {
                self.refresh_state();
                let _ = frames.push(encode_frame(
                    ResponseType::Read,
                    channel.id(),
                    &self.buffers.state,
                ));
            }
            (Channel::Motion, RequestType::Read) => {
                self.refresh_motion();
                let _ = frames.push(encode_frame(
                    ResponseType::Read,
                    channel.id(),
                    &self.buffers.motion,
                ));
            }
            (
                Channel::AnalogIn0 | Channel::AnalogIn1 | Channel::AnalogIn2,
                RequestType::Read,
            ) => {
                let index = (channel.index() & 0x0F) as usize;
                self.refresh_analog(index);
                let _ = frames.push(encode_frame(
                    ResponseType::Read,
                    channel.id(),
                    &self.buffers.analog_in[index],
                ));
            }
            (
                Channel::PinEvent | Channel::ActionEvent | Channel::Message,
                RequestType::NotifyStart | RequestType::NotifyStop,
            ) => {
                let enabled = request.request == RequestType::NotifyStart;
                let gate = match channel {
                    Channel::PinEvent => NOTIFY_GATE_PIN_EVENT,
                    Channel::ActionEvent => NOTIFY_GATE_ACTION_EVENT,
                    _ => NOTIFY_GATE_MESSAGE,
                };
                self.serial_notify[gate] = enabled;
            }
            _ => {
                log::debug!(
                    "ignoring serial {:?} on channel {:#06x}",
                    request.request,
                    request.channel
                );
            }
        }
        frames
    }

    /// Build a serial notify frame for a notify channel, respecting its
    /// gate. The buffer must already hold the encoded payload.
    pub fn serial_notify_frame(&self, channel: Channel) -> Option<Frame> {
        if !self.serial_notify_enabled(channel) {
            return None;
        }
        Some(encode_frame(
            ResponseType::Notify,
            channel.id(),
            self.buffers.get(channel),
        ))
    }
}
