//! Engine task
//!
//! Single owner of the protocol engine and the serial port. Everything
//! that mutates device state funnels through here: serial frames are
//! decoded and dispatched inline, BLE command writes and connection
//! events arrive over [`ENGINE_REQUESTS`], and board events arrive over
//! [`HARDWARE_EVENTS`]. Refreshed channel values are broadcast on
//! [`CHANNEL_UPDATES`] for the BLE task to mirror into the GATT server.

use embassy_futures::select::{select4, Either4};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel as MessageChannel;
use embassy_sync::pubsub::PubSubChannel;
use embassy_time::{with_timeout, Duration, Ticker, Timer};
use heapless::Vec;

use crate::channels::Channel;
use crate::codec::{ActionEvent, LabeledMessage, PinEvent};
use crate::config::protocol::MAX_CHANNEL_PAYLOAD;
use crate::config::timing::{
    FRAME_BYTE_TIMEOUT_MS, NOTIFY_PERIOD_MS, SERIAL_UPDATE_GAP_MS, UPDATE_PERIOD_MS,
};
use crate::dispatcher::LocalEvent;
use crate::hal::Hardware;
use crate::serial::framer::{encode_frame, ResponseType};
use crate::serial::{SerialError, SerialLink, SerialPort};
use crate::transport::{Engine, Route};

/// Requests from the BLE task to the engine.
#[derive(Debug, Clone)]
pub enum EngineRequest {
    /// Payload written to the command characteristic
    BleCommand(Vec<u8, MAX_CHANNEL_PAYLOAD>),
    BleConnected,
    BleDisconnected,
}

/// Events produced by the board layer.
#[derive(Debug, Clone)]
pub enum HardwareEvent {
    Pin(PinEvent),
    Action(ActionEvent),
    /// Outbound labeled message from application code
    Message(LabeledMessage),
}

/// A refreshed channel value for the GATT side.
#[derive(Debug, Clone)]
pub struct ChannelUpdate {
    pub channel: Channel,
    pub payload: Vec<u8, MAX_CHANNEL_PAYLOAD>,
    /// Push a notification rather than only updating the value
    pub notify: bool,
}

/// BLE task and board glue send into the engine here.
pub static ENGINE_REQUESTS: MessageChannel<CriticalSectionRawMutex, EngineRequest, 8> =
    MessageChannel::new();

/// Board event sources (buttons, pin listeners) send here.
pub static HARDWARE_EVENTS: MessageChannel<CriticalSectionRawMutex, HardwareEvent, 8> =
    MessageChannel::new();

/// Engine broadcasts refreshed channel values here. CAP=8, SUBS=2, PUBS=1.
pub static CHANNEL_UPDATES: PubSubChannel<CriticalSectionRawMutex, ChannelUpdate, 8, 2, 1> =
    PubSubChannel::new();

/// Update ticks between GATT snapshot broadcasts.
const NOTIFY_TICKS: u64 = NOTIFY_PERIOD_MS.div_ceil(UPDATE_PERIOD_MS);

/// Update ticks between serial snapshot pushes.
const SERIAL_PUSH_TICKS: u64 = SERIAL_UPDATE_GAP_MS.div_ceil(UPDATE_PERIOD_MS);

const SNAPSHOT_CHANNELS: [Channel; 5] = [
    Channel::State,
    Channel::Motion,
    Channel::AnalogIn0,
    Channel::AnalogIn1,
    Channel::AnalogIn2,
];

/// Run the engine over a serial port. Never returns.
pub async fn engine_task<H: Hardware, S: SerialPort>(mut engine: Engine<H>, mut serial: S) -> ! {
    let mut link = SerialLink::new();
    let mut ticker = Ticker::every(Duration::from_millis(UPDATE_PERIOD_MS));
    let updates = CHANNEL_UPDATES.immediate_publisher();
    let mut notify_ticks: u64 = 0;
    let mut serial_ticks: u64 = 0;
    let mut push_motion = false;

    loop {
        let mut buf = [0u8; 64];
        let mid_frame = link.mid_frame();
        let read = async {
            if mid_frame {
                // A stalled peer must not wedge the receive path.
                match with_timeout(
                    Duration::from_millis(FRAME_BYTE_TIMEOUT_MS),
                    serial.read(&mut buf),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(SerialError::Timeout),
                }
            } else {
                serial.read(&mut buf).await
            }
        };

        match select4(
            read,
            ENGINE_REQUESTS.receive(),
            HARDWARE_EVENTS.receive(),
            ticker.next(),
        )
        .await
        {
            Either4::First(Ok(0)) => {}
            Either4::First(Ok(n)) => {
                if link.process(&mut engine, &mut serial, &buf[..n]).await.is_err() {
                    log::warn!("serial write failed");
                }
            }
            Either4::First(Err(SerialError::Timeout)) => {
                let _ = link.abandon(&mut engine, &mut serial).await;
            }
            Either4::First(Err(_)) => {
                // UART error, back off briefly
                Timer::after(Duration::from_millis(10)).await;
            }
            Either4::Second(request) => match request {
                EngineRequest::BleCommand(data) => engine.apply_command(&data),
                EngineRequest::BleConnected => {
                    engine.on_ble_connected();
                    // A read of the command characteristic serves
                    // version info, so stage it at connect time.
                    engine.update_version_info(Route::Ble);
                    updates.publish_immediate(ChannelUpdate {
                        channel: Channel::Command,
                        payload: Vec::from_slice(&engine.buffers.command).unwrap_or_default(),
                        notify: false,
                    });
                }
                EngineRequest::BleDisconnected => engine.on_ble_disconnected(),
            },
            Either4::Third(event) => {
                let (channel, payload) = match event {
                    HardwareEvent::Pin(ev) => (Channel::PinEvent, *engine.encode_pin_event(ev)),
                    HardwareEvent::Action(ev) => {
                        (Channel::ActionEvent, *engine.encode_action_event(ev))
                    }
                    HardwareEvent::Message(msg) => {
                        (Channel::Message, *engine.encode_message(&msg))
                    }
                };
                if engine.serial_session() {
                    if let Some(frame) = engine.serial_notify_frame(channel) {
                        let _ = serial.write(&frame).await;
                    }
                }
                updates.publish_immediate(ChannelUpdate {
                    channel,
                    payload: Vec::from_slice(&payload).unwrap_or_default(),
                    notify: true,
                });
            }
            Either4::Fourth(_) => {
                engine.poll();
                if !engine.peer_attached() {
                    continue;
                }

                notify_ticks += 1;
                if notify_ticks >= NOTIFY_TICKS {
                    notify_ticks = 0;
                    for channel in SNAPSHOT_CHANNELS {
                        updates.publish_immediate(ChannelUpdate {
                            channel,
                            payload: Vec::from_slice(engine.buffers.get(channel))
                                .unwrap_or_default(),
                            notify: false,
                        });
                    }
                }

                if engine.serial_session() {
                    serial_ticks += 1;
                    if serial_ticks >= SERIAL_PUSH_TICKS {
                        serial_ticks = 0;
                        let channel = if push_motion {
                            Channel::Motion
                        } else {
                            Channel::State
                        };
                        push_motion = !push_motion;
                        let frame =
                            encode_frame(ResponseType::Read, channel.id(), engine.buffers.get(channel));
                        let _ = serial.write(&frame).await;
                    }
                }
            }
        }

        if let Some(LocalEvent::DataReceived { id }) = engine.take_local_event() {
            log::debug!("labeled data received, id {}", id);
        }
    }
}
