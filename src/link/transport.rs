//! Serial abstraction: any byte-oriented channel to the companion module.
//!
//! Concrete implementations:
//! - ESP-IDF UART driver (`adapters::uart`)
//! - scripted mocks in the host test-suite
//!
//! [`LinkTransport`](super::LinkTransport) is generic over `SerialPort`, so
//! swapping the channel requires no changes to framing or orchestration.

/// Byte-oriented serial channel.
pub trait SerialPort {
    /// Error type for this channel.
    type Error: core::fmt::Debug;

    /// Reconfigure the line rate.
    fn set_baud(&mut self, baud: u32) -> Result<(), Self::Error>;

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns 0 if no data is available (non-blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data`; returns the number of bytes actually written.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// A null channel that discards all writes and never reads.
/// Useful on boards without a companion module fitted.
pub struct NullSerial;

impl SerialPort for NullSerial {
    type Error = ();

    fn set_baud(&mut self, _baud: u32) -> Result<(), ()> {
        Ok(())
    }

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}
