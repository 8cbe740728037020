//! GATT channel service definition
//!
//! One characteristic per logical channel under the device-control
//! service. The 16-bit channel ID is embedded in the characteristic
//! UUID, so both transports address channels by the same number.
//! - Command: write / write-without-response; a read returns version
//!   info
//! - State, motion, analog-in: read
//! - Pin event, action event, message: notify

use trouble_host::prelude::*;

use crate::config::protocol::{
    ANALOG_IN_PAYLOAD, MAX_CHANNEL_PAYLOAD, MOTION_PAYLOAD, STATE_PAYLOAD,
};

/// Device-control channel service
#[gatt_service(uuid = "a62d574e-1b34-4092-8dee-4151f63b2865")]
pub struct ChannelService {
    /// Command channel (0x0100)
    #[characteristic(uuid = "a62d0100-1b34-4092-8dee-4151f63b2865", read, write, write_without_response, value = [0u8; 20])]
    pub command: [u8; MAX_CHANNEL_PAYLOAD],

    /// State snapshot channel (0x0101)
    #[characteristic(uuid = "a62d0101-1b34-4092-8dee-4151f63b2865", read, value = [0u8; 7])]
    pub state: [u8; STATE_PAYLOAD],

    /// Motion snapshot channel (0x0102)
    #[characteristic(uuid = "a62d0102-1b34-4092-8dee-4151f63b2865", read, value = [0u8; 18])]
    pub motion: [u8; MOTION_PAYLOAD],

    /// Pin event channel (0x0110)
    #[characteristic(uuid = "a62d0110-1b34-4092-8dee-4151f63b2865", read, notify, value = [0u8; 20])]
    pub pin_event: [u8; MAX_CHANNEL_PAYLOAD],

    /// Action event channel (0x0111)
    #[characteristic(uuid = "a62d0111-1b34-4092-8dee-4151f63b2865", read, notify, value = [0u8; 20])]
    pub action_event: [u8; MAX_CHANNEL_PAYLOAD],

    /// Analog input P0 (0x0120)
    #[characteristic(uuid = "a62d0120-1b34-4092-8dee-4151f63b2865", read, value = [0u8; 2])]
    pub analog_in_p0: [u8; ANALOG_IN_PAYLOAD],

    /// Analog input P1 (0x0121)
    #[characteristic(uuid = "a62d0121-1b34-4092-8dee-4151f63b2865", read, value = [0u8; 2])]
    pub analog_in_p1: [u8; ANALOG_IN_PAYLOAD],

    /// Analog input P2 (0x0122)
    #[characteristic(uuid = "a62d0122-1b34-4092-8dee-4151f63b2865", read, value = [0u8; 2])]
    pub analog_in_p2: [u8; ANALOG_IN_PAYLOAD],

    /// Labeled message channel (0x0130)
    #[characteristic(uuid = "a62d0130-1b34-4092-8dee-4151f63b2865", read, notify, value = [0u8; 20])]
    pub message: [u8; MAX_CHANNEL_PAYLOAD],
}
