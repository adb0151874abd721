//! Per-exchange TCP connection to the backend.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, trace};

use conveyor_config::ConnectionSettings;

use super::{LENGTH_PREFIX_BYTES, TRANSPORT_TARGET, TransportError};

/// Exclusively owned connection used for a single request/response exchange.
///
/// The socket is shut down and closed when the value is dropped, whichever
/// path the exchange leaves by.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

/// Opens a connection to the backend, trying each resolved address in turn.
pub fn connect(
    settings: &ConnectionSettings,
    timeout: Duration,
) -> Result<Connection, TransportError> {
    let addresses = resolve(settings)?;
    let mut last_error = None;
    for address in addresses {
        match TcpStream::connect_timeout(&address, timeout) {
            Ok(stream) => {
                trace!(
                    target: TRANSPORT_TARGET,
                    peer = %address,
                    "backend connection established"
                );
                return Ok(Connection {
                    stream,
                    peer: address,
                });
            }
            Err(error) => {
                debug!(
                    target: TRANSPORT_TARGET,
                    peer = %address,
                    error = %error,
                    "backend address unreachable"
                );
                last_error = Some(error);
            }
        }
    }
    Err(last_error.map_or_else(
        || TransportError::ResolveEmpty {
            settings: settings.clone(),
        },
        |source| TransportError::Connect {
            settings: settings.clone(),
            source,
        },
    ))
}

fn resolve(settings: &ConnectionSettings) -> Result<Vec<SocketAddr>, TransportError> {
    let addresses: Vec<SocketAddr> = (settings.host(), settings.port())
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            settings: settings.clone(),
            source,
        })?
        .collect();
    if addresses.is_empty() {
        return Err(TransportError::ResolveEmpty {
            settings: settings.clone(),
        });
    }
    Ok(addresses)
}

impl Connection {
    /// Address of the connected backend.
    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Sends `payload` preceded by its length.
    pub fn send_frame(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        write_frame(&mut self.stream, payload)
    }

    /// Reads the complete response, which ends when the backend closes its
    /// side of the connection. An empty response is an error.
    pub fn receive_all(&mut self) -> Result<Vec<u8>, TransportError> {
        let mut buffer = Vec::new();
        self.stream
            .read_to_end(&mut buffer)
            .map_err(TransportError::Receive)?;
        if buffer.is_empty() {
            return Err(TransportError::EmptyResponse);
        }
        Ok(buffer)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(error) = self.stream.shutdown(Shutdown::Both)
            && error.kind() != io::ErrorKind::NotConnected
        {
            trace!(
                target: TRANSPORT_TARGET,
                peer = %self.peer,
                error = %error,
                "backend connection shutdown failed"
            );
        }
    }
}

/// Encodes the fixed-width length prefix of a frame.
#[expect(
    clippy::little_endian_bytes,
    reason = "the wire format fixes the prefix to little-endian"
)]
#[must_use]
pub fn encode_length_prefix(length: usize) -> [u8; LENGTH_PREFIX_BYTES] {
    (length as u64).to_le_bytes()
}

/// Writes a length-prefixed frame. Both parts must be written in full.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), TransportError> {
    writer
        .write_all(&encode_length_prefix(payload.len()))
        .map_err(TransportError::SendLength)?;
    writer
        .write_all(payload)
        .and_then(|()| writer.flush())
        .map_err(TransportError::SendPayload)
}

/// Reads one length-prefixed frame, as a backend does on accepting a request.
#[expect(
    clippy::little_endian_bytes,
    reason = "the wire format fixes the prefix to little-endian"
)]
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut prefix = [0_u8; LENGTH_PREFIX_BYTES];
    reader
        .read_exact(&mut prefix)
        .map_err(TransportError::Receive)?;
    let announced = u64::from_le_bytes(prefix);
    let length = usize::try_from(announced).map_err(|_| TransportError::FrameTooLarge(announced))?;
    let mut payload = Vec::new();
    reader
        .take(announced)
        .read_to_end(&mut payload)
        .map_err(TransportError::Receive)?;
    if payload.len() != length {
        return Err(TransportError::Receive(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed inside a frame",
        )));
    }
    Ok(payload)
}
