//! TCP transport implementation.
//!
//! Used when the device side is reachable over the network (e.g. a
//! WiFi-attached microcontroller or a serial-to-TCP multiplexer). Writes
//! are buffered and pushed out on `flush`; reads use a short timeout so
//! the spin loop stays responsive.

use super::Transport;
use crate::error::{Error, Result};
use crate::protocol::STREAM_BUFFER;
use std::io::{BufWriter, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// TCP transport for network-attached devices.
pub struct TcpTransport {
    reader: TcpStream,
    writer: BufWriter<TcpStream>,
}

impl TcpTransport {
    /// Connect to a device endpoint.
    ///
    /// # Arguments
    /// * `address` - "host:port" of the device side
    pub fn connect(address: &str) -> Result<Self> {
        let stream = TcpStream::connect(address)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(Duration::from_millis(1)))?;
        let writer = BufWriter::with_capacity(STREAM_BUFFER, stream.try_clone()?);

        log::info!("Connected to device at {}", address);

        Ok(TcpTransport {
            reader: stream,
            writer,
        })
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.reader.read(buffer) {
            // A zero-length read on TCP means the peer closed the stream.
            Ok(0) => Err(Error::LinkClosed),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => Err(Error::LinkClosed),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.writer.write(data)?)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
