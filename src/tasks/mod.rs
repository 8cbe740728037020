//! Embassy tasks module
//!
//! The engine task owns the protocol engine and the serial port; the
//! BLE task owns the GATT server. They exchange requests and channel
//! updates through static embassy channels, which keeps every buffer
//! single-writer.

pub mod ble;
pub mod engine;

pub use ble::ble_task;
pub use engine::{
    engine_task, ChannelUpdate, EngineRequest, HardwareEvent, CHANNEL_UPDATES, ENGINE_REQUESTS,
    HARDWARE_EVENTS,
};
