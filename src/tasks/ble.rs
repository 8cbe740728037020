//! BLE task for the GATT transport
//!
//! Advertises the channel service, forwards command-characteristic
//! writes into the engine task, and mirrors channel updates from the
//! engine into characteristic values and notifications.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use trouble_host::prelude::*;

use crate::ble::service::ChannelService;
use crate::channels::Channel;
use crate::config::protocol::{
    ANALOG_IN_PAYLOAD, MAX_CHANNEL_PAYLOAD, MOTION_PAYLOAD, STATE_PAYLOAD,
};
use crate::tasks::engine::{
    ChannelUpdate, EngineRequest, CHANNEL_UPDATES, ENGINE_REQUESTS,
};

/// Device name prefix for BLE advertising
const DEVICE_NAME_PREFIX: &str = "BBridge-";

/// Format device ID bytes as uppercase hex into a buffer
/// Returns the formatted string slice
pub fn format_device_name<'a>(buf: &'a mut [u8; 20], device_id: &[u8; 3]) -> &'a str {
    const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";
    let prefix = DEVICE_NAME_PREFIX.as_bytes();

    buf[..prefix.len()].copy_from_slice(prefix);

    let mut pos = prefix.len();
    for &byte in device_id {
        buf[pos] = HEX_CHARS[(byte >> 4) as usize];
        buf[pos + 1] = HEX_CHARS[(byte & 0x0F) as usize];
        pos += 2;
    }

    // All bytes are ASCII, so this will always succeed
    core::str::from_utf8(&buf[..pos]).unwrap_or(DEVICE_NAME_PREFIX)
}

/// Number of maximum concurrent connections
const CONNECTIONS_MAX: usize = 1;
/// Number of L2CAP channels
const L2CAP_CHANNELS_MAX: usize = 3;

/// BLE GATT server exposing the channel service
#[gatt_server(mutex_type = CriticalSectionRawMutex)]
struct Server {
    channels: ChannelService,
}

/// Main BLE task that manages the Bluetooth stack and connections
///
/// This task:
/// 1. Starts advertising with a name unique per device
/// 2. Routes command-characteristic writes to the engine task
/// 3. Mirrors channel updates into characteristic values
/// 4. Pushes notify-channel updates as GATT notifications
pub async fn ble_task<C: Controller>(controller: C, device_id: [u8; 3]) {
    let mut device_name_buf = [0u8; 20];
    let device_name = format_device_name(&mut device_name_buf, &device_id);

    log::info!("ble: starting as '{}'", device_name);

    let mut resources: HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX> =
        HostResources::new();

    let stack = trouble_host::new(controller, &mut resources).set_random_address(Address::random(
        [device_id[0], device_id[1], device_id[2], 0x2B, 0x7A, 0xC5],
    ));

    let Host {
        mut peripheral,
        mut runner,
        ..
    } = stack.build();

    let gap = GapConfig::Peripheral(PeripheralConfig {
        name: device_name,
        appearance: &appearance::UNKNOWN,
    });
    let server: Server = match Server::new_with_config(gap) {
        Ok(s) => s,
        Err(_) => return,
    };

    let runner_task = runner.run();

    let peripheral_task = async {
        let mut adv_data = [0u8; 31];
        let len = match AdStructure::encode_slice(
            &[
                AdStructure::Flags(LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED),
                AdStructure::CompleteLocalName(device_name.as_bytes()),
            ],
            &mut adv_data,
        ) {
            Ok(l) => l,
            Err(_) => return,
        };

        let request_sender = ENGINE_REQUESTS.sender();

        loop {
            log::info!("ble: advertising");
            let advertiser = match peripheral
                .advertise(
                    &Default::default(),
                    Advertisement::ConnectableScannableUndirected {
                        adv_data: &adv_data[..len],
                        scan_data: &[],
                    },
                )
                .await
            {
                Ok(a) => a,
                Err(_) => continue,
            };

            let acceptor = match advertiser.accept().await {
                Ok(a) => a,
                Err(_) => continue,
            };

            let conn = match acceptor.with_attribute_server(&*server) {
                Ok(c) => c,
                Err(_) => continue,
            };

            // Subscriber is dropped when the connection ends, so
            // updates don't queue up against an absent peer. Created
            // before the connect request so the engine's version-info
            // update is not missed.
            let mut update_sub = match CHANNEL_UPDATES.subscriber() {
                Ok(s) => s,
                Err(_) => continue,
            };

            request_sender.send(EngineRequest::BleConnected).await;

            loop {
                match select(conn.next(), update_sub.next_message_pure()).await {
                    Either::First(GattConnectionEvent::Disconnected { reason: _ }) => {
                        log::info!("ble: disconnected");
                        request_sender.send(EngineRequest::BleDisconnected).await;
                        break;
                    }
                    Either::First(GattConnectionEvent::Gatt { event }) => {
                        handle_gatt_event(&server, event, &request_sender);
                    }
                    Either::First(_) => {}
                    Either::Second(update) => {
                        apply_update(&server, &conn, update).await;
                    }
                }
            }
        }
    };

    select(runner_task, peripheral_task).await;
}

/// Accept a GATT event, routing command-characteristic writes into the
/// engine task.
fn handle_gatt_event<P: PacketPool>(
    server: &Server<'_>,
    event: GattEvent<'_, '_, P>,
    request_sender: &embassy_sync::channel::Sender<
        'static,
        CriticalSectionRawMutex,
        EngineRequest,
        8,
    >,
) {
    match event {
        GattEvent::Write(write_event) => {
            if write_event.handle() == server.channels.command.handle {
                if let Ok(payload) =
                    heapless::Vec::<u8, MAX_CHANNEL_PAYLOAD>::from_slice(write_event.data())
                {
                    let _ = request_sender.try_send(EngineRequest::BleCommand(payload));
                }
            }
            let _ = write_event.accept();
        }
        GattEvent::Read(read_event) => {
            let _ = read_event.accept();
        }
        GattEvent::Other(other_event) => {
            let _ = other_event.accept();
        }
    }
}

/// Mirror one channel update into the GATT server, notifying when the
/// engine asked for it.
async fn apply_update<'a, P: PacketPool>(
    server: &Server<'a>,
    conn: &GattConnection<'a, '_, P>,
    update: ChannelUpdate,
) {
    match update.channel {
        Channel::State => {
            let mut value = [0u8; STATE_PAYLOAD];
            copy_payload(&mut value, &update.payload);
            let _ = server.set(&server.channels.state, &value);
        }
        Channel::Motion => {
            let mut value = [0u8; MOTION_PAYLOAD];
            copy_payload(&mut value, &update.payload);
            let _ = server.set(&server.channels.motion, &value);
        }
        Channel::AnalogIn0 | Channel::AnalogIn1 | Channel::AnalogIn2 => {
            let mut value = [0u8; ANALOG_IN_PAYLOAD];
            copy_payload(&mut value, &update.payload);
            let characteristic = match update.channel {
                Channel::AnalogIn0 => &server.channels.analog_in_p0,
                Channel::AnalogIn1 => &server.channels.analog_in_p1,
                _ => &server.channels.analog_in_p2,
            };
            let _ = server.set(characteristic, &value);
        }
        Channel::PinEvent | Channel::ActionEvent | Channel::Message => {
            let mut value = [0u8; MAX_CHANNEL_PAYLOAD];
            copy_payload(&mut value, &update.payload);
            let characteristic = match update.channel {
                Channel::PinEvent => &server.channels.pin_event,
                Channel::ActionEvent => &server.channels.action_event,
                _ => &server.channels.message,
            };
            if update.notify {
                let _ = characteristic.notify(conn, &value).await;
            } else {
                let _ = server.set(characteristic, &value);
            }
        }
        Channel::Command => {
            // Version info staged by the engine at connect time; a
            // host read of the command characteristic serves it.
            let mut value = [0u8; MAX_CHANNEL_PAYLOAD];
            copy_payload(&mut value, &update.payload);
            let _ = server.set(&server.channels.command, &value);
        }
    }
}

fn copy_payload<const N: usize>(value: &mut [u8; N], payload: &[u8]) {
    let len = payload.len().min(N);
    value[..len].copy_from_slice(&payload[..len]);
}
