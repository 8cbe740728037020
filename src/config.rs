//! Protocol and hardware configuration constants

/// Protocol constants shared by both transports
pub mod protocol {
    /// Hardware generation reported in version info
    pub const HARDWARE_VERSION: u8 = 2;

    /// Protocol version reported in version info
    pub const PROTOCOL_VERSION: u8 = 2;

    /// Maximum payload length of any channel
    pub const MAX_CHANNEL_PAYLOAD: usize = 20;

    /// State channel payload length
    pub const STATE_PAYLOAD: usize = 7;

    /// Motion channel payload length
    pub const MOTION_PAYLOAD: usize = 18;

    /// Analog-in channel payload length
    pub const ANALOG_IN_PAYLOAD: usize = 2;

    /// Byte offset of the format tag in notify channel buffers
    pub const FORMAT_TAG_INDEX: usize = 19;
}

/// Serial transport constants
pub mod serial {
    /// Start-of-frame sentinel
    pub const SENTINEL: u8 = 0xFF;

    /// Largest possible frame: header(5) + payload(20) + checksum(1)
    pub const FRAME_BUFFER_SIZE: usize = 26;
}

/// Label registry sizing
pub mod registry {
    /// Number of label slots
    pub const SLOTS: usize = 16;

    /// Fixed label width, NUL-padded
    pub const LABEL_SIZE: usize = 8;

    /// Maximum content length carried in a labeled message
    pub const CONTENT_SIZE: usize = 11;
}

/// Sample filter windows
pub mod filters {
    /// Raw samples taken per analog-in refresh (median)
    pub const ANALOG_IN_SAMPLES: usize = 5;

    /// Rolling window length for the ambient light filter (mean)
    pub const LIGHT_LEVEL_SAMPLES: usize = 11;
}

/// Task periods. Tunables, not wire contracts.
pub mod timing {
    /// Snapshot refresh period while a peer is attached [ms]
    pub const UPDATE_PERIOD_MS: u64 = 11;

    /// Notify flush period [ms]
    pub const NOTIFY_PERIOD_MS: u64 = 101;

    /// Gap between successive channel pushes on the serial update
    /// cadence, to bound transmit-buffer pressure [ms]
    pub const SERIAL_UPDATE_GAP_MS: u64 = 20;

    /// How long the serial pump waits mid-frame before abandoning it [ms]
    pub const FRAME_BYTE_TIMEOUT_MS: u64 = 500;
}

/// Edge-connector pin tables
pub mod pins {
    /// Controllable GPIO pins
    pub const GPIO: [u8; 9] = [0, 1, 2, 8, 12, 13, 14, 15, 16];

    /// Pins pulled up when a session starts
    pub const INITIAL_PULL_UP: [u8; 3] = [0, 1, 2];

    /// Pins with analog input channels
    pub const ANALOG_IN: [u8; 3] = [0, 1, 2];

    /// Size of the pin state table (pin indexes 0..=16)
    pub const PIN_COUNT: usize = 17;

    /// Bit positions of touch/button sources in the digital levels word
    pub const STATE_BIT_P0: u8 = 24;
    pub const STATE_BIT_P1: u8 = 25;
    pub const STATE_BIT_P2: u8 = 26;
    pub const STATE_BIT_BUTTON_A: u8 = 27;
    pub const STATE_BIT_BUTTON_B: u8 = 28;
    pub const STATE_BIT_LOGO: u8 = 29;
}

/// Servo defaults applied when a command leaves range/center zero
pub mod servo {
    pub const DEFAULT_RANGE_US: u16 = 2000;
    pub const DEFAULT_CENTER_US: u16 = 1500;
}
