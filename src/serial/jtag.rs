//! USB Serial JTAG adapter for the serial transport

use embedded_io_async::{Read, Write};
use esp_hal::usb_serial_jtag::{UsbSerialJtagRx, UsbSerialJtagTx};
use esp_hal::Async;

use crate::serial::traits::{SerialError, SerialPort};

/// Serial port over the chip's built-in USB Serial JTAG peripheral.
pub struct JtagSerialPort {
    rx: UsbSerialJtagRx<'static, Async>,
    tx: UsbSerialJtagTx<'static, Async>,
}

impl JtagSerialPort {
    pub fn new(rx: UsbSerialJtagRx<'static, Async>, tx: UsbSerialJtagTx<'static, Async>) -> Self {
        Self { rx, tx }
    }
}

impl SerialPort for JtagSerialPort {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        Read::read(&mut self.rx, buf)
            .await
            .map_err(|_| SerialError::ReadFailed)
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), SerialError> {
        Write::write_all(&mut self.tx, data)
            .await
            .map_err(|_| SerialError::WriteFailed)
    }

    async fn flush(&mut self) -> Result<(), SerialError> {
        Write::flush(&mut self.tx)
            .await
            .map_err(|_| SerialError::WriteFailed)
    }
}
