//! Serial port seam
//!
//! The engine drives whatever byte pipe the board provides through this
//! trait: the USB Serial JTAG peripheral on hardware, a scripted mock in
//! tests.

use core::future::Future;

/// Transport faults surfaced by a serial port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    /// The port failed while reading
    ReadFailed,
    /// The port rejected or truncated a write
    WriteFailed,
    /// The peer stalled mid-frame
    Timeout,
}

/// A byte pipe carrying the framed serial transport.
pub trait SerialPort {
    /// Read available bytes, returning how many arrived. Zero means no
    /// data was ready, not end of stream.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, SerialError>>;

    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<(), SerialError>>;

    fn flush(&mut self) -> impl Future<Output = Result<(), SerialError>>;
}
