//! ESP-IDF UART adapter for the companion-module channel.
//!
//! Wraps `esp_idf_hal::uart::UartDriver` behind [`SerialPort`].  Reads use
//! a zero-tick timeout so the link pump never blocks the main loop.

use esp_idf_hal::delay::{NON_BLOCK, TickType};
use esp_idf_hal::uart::UartDriver;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::sys::EspError;

use crate::link::transport::SerialPort;

/// Longest wait for the TX FIFO to drain on flush.
const FLUSH_TIMEOUT_MS: u64 = 50;

pub struct UartSerial<'d> {
    driver: UartDriver<'d>,
}

impl<'d> UartSerial<'d> {
    pub fn new(driver: UartDriver<'d>) -> Self {
        Self { driver }
    }
}

impl SerialPort for UartSerial<'_> {
    type Error = EspError;

    fn set_baud(&mut self, baud: u32) -> Result<(), EspError> {
        self.driver.change_baudrate(Hertz(baud))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, EspError> {
        match self.driver.read(buf, NON_BLOCK) {
            Ok(n) => Ok(n),
            // An empty FIFO reports a timeout on some IDF versions.
            Err(e) if e.code() == esp_idf_svc::sys::ESP_ERR_TIMEOUT as i32 => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, EspError> {
        self.driver.write(data)
    }

    fn flush(&mut self) -> Result<(), EspError> {
        let ticks = TickType::new_millis(FLUSH_TIMEOUT_MS).ticks();
        self.driver.wait_tx_done(ticks)
    }
}
