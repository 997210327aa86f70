use crate::socket::Endpoint;
use std::io::{self, Read};
use std::net::{SocketAddr, SocketAddrV4, TcpListener, TcpStream};

const RECV_BUFFER_SIZE: usize = 2000;

/// Receiving end of a transfer. Payloads carry no framing, so a payload ends
/// when the sender closes its side of the connection.
pub struct Sink {
    listener: TcpListener,
}

#[derive(Debug)]
pub struct Received {
    pub peer: SocketAddr,
    pub bytes: Vec<u8>,
}

impl Sink {
    pub fn bind(addr: SocketAddrV4) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        log::info!("listening on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    /// The bound address, with the port resolved if 0 was requested.
    pub fn local_endpoint(&self) -> io::Result<Endpoint> {
        match self.listener.local_addr()? {
            SocketAddr::V4(addr) => Ok(addr.into()),
            SocketAddr::V6(addr) => Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("bound to non-IPv4 address {}", addr),
            )),
        }
    }

    /// Accepts one connection and reads until end-of-stream.
    pub fn receive(&self) -> io::Result<Received> {
        self.accept()?.read_payload()
    }

    /// Waits for the next sender without reading from it.
    pub fn accept(&self) -> io::Result<Incoming> {
        let (stream, peer) = self.listener.accept()?;
        log::debug!("accepted {}", peer);
        Ok(Incoming { stream, peer })
    }
}

/// An accepted connection whose payload has not been read yet.
pub struct Incoming {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Incoming {
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn read_payload(mut self) -> io::Result<Received> {
        let mut bytes = Vec::new();
        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        loop {
            let received_size = match self.stream.read(&mut buffer) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if received_size == 0 {
                break;
            }
            bytes.extend_from_slice(&buffer[..received_size]);
        }
        log::info!("received {} bytes from {}", bytes.len(), self.peer);
        Ok(Received {
            peer: self.peer,
            bytes,
        })
    }
}
