//! Bluetooth Low Energy module
//!
//! Exposes the channel set as a GATT service alongside the serial
//! transport.

pub mod service;

pub use service::ChannelService;
