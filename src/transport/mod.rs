//! Transport layer for byte-link I/O abstraction.

use crate::error::{Error, Result};

mod serial;
pub use serial::SerialTransport;

mod tcp;
pub use tcp::TcpTransport;

mod mock;
pub use mock::MockTransport;

/// Byte pipe to the peer device.
///
/// Reads are non-blocking (or bounded by a very short timeout): `Ok(0)`
/// means nothing is pending right now, not end of stream. A transport that
/// can observe the peer closing the link reports it as
/// [`Error::LinkClosed`].
pub trait Transport: Send {
    /// Read available bytes into `buffer`, returning the count.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write bytes from `data`, returning how many were accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any buffered writes to the wire.
    fn flush(&mut self) -> Result<()>;

    /// Write the whole of `data`, retrying short writes.
    fn write_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let n = self.write(data)?;
            if n == 0 {
                return Err(Error::LinkClosed);
            }
            data = &data[n..];
        }
        Ok(())
    }
}
