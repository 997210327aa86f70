use crate::error::SendError;
use std::fs;
use std::path::Path;

/// The full contents of one file, held in memory until the send completes.
/// No header, length prefix or checksum is added: these are the bytes that go
/// on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    buffer: Vec<u8>,
}

impl Payload {
    /// Reads the whole file in one operation. Nothing is streamed and no size
    /// limit is enforced.
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, SendError> {
        let path = path.as_ref();
        let buffer = fs::read(path).map_err(|source| SendError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("read {} bytes from {}", buffer.len(), path.display());
        Ok(Self { buffer })
    }

    pub fn from_bytes(buffer: Vec<u8>) -> Self {
        Self { buffer }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.buffer
    }
}
