use crate::error::SendError;
use crate::payload::Payload;
use crate::socket::{Connection, Endpoint};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// Opens outbound connections. One connection per transfer: nothing is
/// pooled, retried or reconnected.
#[derive(Clone, Copy, Debug, Default)]
pub struct Transmitter {
    connect_timeout: Option<Duration>,
}

/// Outcome of a completed transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub endpoint: Endpoint,
    pub bytes_sent: usize,
}

impl Transmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Without a timeout, connecting blocks until the OS reports success or
    /// failure.
    pub fn with_connect_timeout(timeout: Option<Duration>) -> Self {
        Self {
            connect_timeout: timeout,
        }
    }

    pub fn connect(&self, endpoint: Endpoint) -> Result<Connection, SendError> {
        let addr = SocketAddr::from(endpoint);
        log::debug!("connecting to {}", endpoint);
        let stream = match self.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        }
        .map_err(|source| SendError::Connection { endpoint, source })?;
        log::info!("connected to {}", endpoint);
        Ok(Connection::new(endpoint, stream))
    }

    /// connect -> send -> close. The connection is released even when the
    /// send fails.
    pub fn transmit(
        &self,
        endpoint: Endpoint,
        payload: &Payload,
    ) -> Result<Transfer, SendError> {
        self.transmit_with(endpoint, payload, |_| {})
    }

    /// Like [`Transmitter::transmit`], calling `on_connect` once the
    /// connection is up and before any byte is written.
    pub fn transmit_with<F>(
        &self,
        endpoint: Endpoint,
        payload: &Payload,
        on_connect: F,
    ) -> Result<Transfer, SendError>
    where
        F: FnOnce(&Connection),
    {
        let mut connection = self.connect(endpoint)?;
        on_connect(&connection);
        let bytes_sent = connection.send(payload.as_bytes())?;
        connection.close()?;
        Ok(Transfer {
            endpoint,
            bytes_sent,
        })
    }
}
