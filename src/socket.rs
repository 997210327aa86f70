use crate::error::SendError;
use std::fmt::{self, Display, Formatter};
use std::io::{self, ErrorKind, Write};
use std::net::{AddrParseError, Ipv4Addr, Shutdown, SocketAddr, SocketAddrV4, TcpStream};
use std::str::FromStr;

/// Destination of a transfer: IPv4 address and TCP port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint(pub Ipv4Addr, pub u16);

impl Endpoint {
    pub fn addr(&self) -> Ipv4Addr {
        self.0
    }

    pub fn port(&self) -> u16 {
        self.1
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0, self.1)
    }
}

impl FromStr for Endpoint {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<SocketAddrV4>().map(Endpoint::from)
    }
}

impl From<SocketAddrV4> for Endpoint {
    fn from(addr: SocketAddrV4) -> Self {
        Endpoint(*addr.ip(), addr.port())
    }
}

impl From<Endpoint> for SocketAddrV4 {
    fn from(endpoint: Endpoint) -> Self {
        SocketAddrV4::new(endpoint.0, endpoint.1)
    }
}

impl From<Endpoint> for SocketAddr {
    fn from(endpoint: Endpoint) -> Self {
        SocketAddr::V4(endpoint.into())
    }
}

/// A byte sink that can be closed gracefully. The write loop in
/// [`Connection::send`] is written against this rather than `TcpStream` so it
/// can be driven by transports that accept short writes.
pub trait Transport: Write {
    /// Signals end of payload to the peer.
    fn close(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        match self.shutdown(Shutdown::Write) {
            // peer already gone; the descriptor is still released on drop
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            result => result,
        }
    }
}

/// An established connection, exclusively owning its transport.
///
/// The transport is closed exactly once: by [`Connection::close`], or by
/// `Drop` when the connection is abandoned (for instance after a failed send).
pub struct Connection<T: Transport = TcpStream> {
    endpoint: Endpoint,
    transport: Option<T>,
    sent: usize,
}

impl<T: Transport> Connection<T> {
    pub fn new(endpoint: Endpoint, transport: T) -> Self {
        Self {
            endpoint,
            transport: Some(transport),
            sent: 0,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Bytes delivered to the transport so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Writes every byte of `bytes`, looping on short writes and retrying
    /// `Interrupted`. Returns the number of bytes written, which is always
    /// `bytes.len()` on success.
    pub fn send(&mut self, bytes: &[u8]) -> Result<usize, SendError> {
        let endpoint = self.endpoint;
        let total = bytes.len();
        let mut sent = 0;
        let result = match self.transport.as_mut() {
            Some(transport) => write_fully(transport, endpoint, bytes, &mut sent),
            None => Err(io::Error::from(ErrorKind::NotConnected)),
        };
        // partial progress counts even when the send fails
        self.sent += sent;
        result.map_err(|source| SendError::Transmission {
            endpoint,
            sent,
            total,
            source,
        })?;
        log::debug!("{}: sent {} bytes", endpoint, sent);
        Ok(sent)
    }

    /// Closes the connection gracefully and releases the transport.
    pub fn close(mut self) -> Result<(), SendError> {
        let (endpoint, sent) = (self.endpoint, self.sent);
        self.release().map_err(|source| SendError::Transmission {
            endpoint,
            sent,
            total: sent,
            source,
        })
    }

    fn release(&mut self) -> io::Result<()> {
        match self.transport.take() {
            Some(mut transport) => {
                log::debug!("{}: closing connection", self.endpoint);
                transport.close()
            }
            None => Ok(()),
        }
    }
}

fn write_fully<W: Write>(
    transport: &mut W,
    endpoint: Endpoint,
    bytes: &[u8],
    sent: &mut usize,
) -> io::Result<()> {
    while *sent < bytes.len() {
        match transport.write(&bytes[*sent..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "transport accepted no bytes",
                ))
            }
            Ok(n) => {
                *sent += n;
                log::trace!("{}: wrote {} bytes ({}/{})", endpoint, n, *sent, bytes.len());
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    transport.flush()
}

impl Connection<TcpStream> {
    /// A second handle on the same socket that can tear the connection down
    /// from another thread, e.g. a Ctrl-C handler.
    pub fn interrupt_handle(&self) -> io::Result<InterruptHandle> {
        let stream = self
            .transport
            .as_ref()
            .ok_or_else(|| io::Error::from(ErrorKind::NotConnected))?
            .try_clone()?;
        Ok(InterruptHandle { stream })
    }
}

impl<T: Transport> Drop for Connection<T> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("{}: failed to close connection: {}", self.endpoint, e);
        }
    }
}

pub struct InterruptHandle {
    stream: TcpStream,
}

impl InterruptHandle {
    pub fn interrupt(&self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            log::debug!("shutdown on interrupt: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Accepts at most `max_write` bytes per call, optionally failing once
    /// `fail_at` bytes have been accepted.
    #[derive(Default)]
    struct ShortWriter {
        max_write: usize,
        fail_at: Option<usize>,
        interrupt_next: bool,
        written: Rc<RefCell<Vec<u8>>>,
        closes: Rc<Cell<usize>>,
        calls: Rc<Cell<usize>>,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.calls.set(self.calls.get() + 1);
            if self.interrupt_next {
                self.interrupt_next = false;
                return Err(ErrorKind::Interrupted.into());
            }
            let mut written = self.written.borrow_mut();
            if self.fail_at.map_or(false, |limit| written.len() >= limit) {
                return Err(ErrorKind::ConnectionReset.into());
            }
            let n = buf.len().min(self.max_write);
            written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for ShortWriter {
        fn close(&mut self) -> io::Result<()> {
            self.closes.set(self.closes.get() + 1);
            Ok(())
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint(Ipv4Addr::new(192, 168, 0, 2), 4000)
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn short_writes_are_continued_until_complete() {
        let writer = ShortWriter {
            max_write: 7,
            ..Default::default()
        };
        let (written, calls) = (writer.written.clone(), writer.calls.clone());
        let data = payload(1000);

        let mut conn = Connection::new(endpoint(), writer);
        assert_eq!(conn.send(&data).unwrap(), data.len());
        conn.close().unwrap();

        assert_eq!(*written.borrow(), data);
        assert_eq!(calls.get(), (1000 + 6) / 7);
    }

    #[test]
    fn interrupted_writes_are_retried() {
        let writer = ShortWriter {
            max_write: usize::MAX,
            interrupt_next: true,
            ..Default::default()
        };
        let written = writer.written.clone();

        let mut conn = Connection::new(endpoint(), writer);
        conn.send(b"hello").unwrap();

        assert_eq!(&written.borrow()[..], b"hello");
    }

    #[test]
    fn zero_length_write_is_a_transmission_error() {
        let writer = ShortWriter {
            max_write: 0,
            ..Default::default()
        };
        let mut conn = Connection::new(endpoint(), writer);
        match conn.send(b"abc") {
            Err(SendError::Transmission { sent, total, source, .. }) => {
                assert_eq!((sent, total), (0, 3));
                assert_eq!(source.kind(), ErrorKind::WriteZero);
            }
            other => panic!("expected Transmission, got {:?}", other),
        }
    }

    #[test]
    fn empty_payload_writes_nothing_and_closes() {
        let writer = ShortWriter::default();
        let (calls, closes) = (writer.calls.clone(), writer.closes.clone());

        let mut conn = Connection::new(endpoint(), writer);
        assert_eq!(conn.send(&[]).unwrap(), 0);
        conn.close().unwrap();

        assert_eq!(calls.get(), 0);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn explicit_close_happens_once() {
        let writer = ShortWriter {
            max_write: 64,
            ..Default::default()
        };
        let closes = writer.closes.clone();

        let mut conn = Connection::new(endpoint(), writer);
        conn.send(&payload(256)).unwrap();
        conn.close().unwrap();

        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn failed_send_still_closes_once_on_drop() {
        let writer = ShortWriter {
            max_write: 10,
            fail_at: Some(30),
            ..Default::default()
        };
        let (written, closes) = (writer.written.clone(), writer.closes.clone());

        {
            let mut conn = Connection::new(endpoint(), writer);
            match conn.send(&payload(100)) {
                Err(SendError::Transmission { sent, total, .. }) => {
                    assert_eq!((sent, total), (30, 100));
                }
                other => panic!("expected Transmission, got {:?}", other),
            }
            assert_eq!(closes.get(), 0);
        }

        assert_eq!(written.borrow().len(), 30);
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn sent_counts_bytes_written_before_a_failure() {
        let writer = ShortWriter {
            max_write: 8,
            fail_at: Some(24),
            ..Default::default()
        };
        let mut conn = Connection::new(endpoint(), writer);
        conn.send(b"0123456789").unwrap();
        assert_eq!(conn.sent(), 10);

        assert!(conn.send(&payload(64)).is_err());
        // 10 from the first send, then two 8-byte writes before the reset
        assert_eq!(conn.sent(), 26);
    }

    #[test]
    fn endpoint_parses_and_displays() {
        let endpoint: Endpoint = "192.168.0.2:4000".parse().unwrap();
        assert_eq!(endpoint, Endpoint(Ipv4Addr::new(192, 168, 0, 2), 4000));
        assert_eq!(endpoint.to_string(), "192.168.0.2:4000");
        assert!("192.168.0.2".parse::<Endpoint>().is_err());
        assert!("[::1]:4000".parse::<Endpoint>().is_err());
    }
}
