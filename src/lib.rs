pub mod config;
pub mod error;
pub mod payload;
pub mod sink;
pub mod socket;
pub mod tcp;

pub use config::{Config, Overrides};
pub use error::{ConfigError, SendError};
pub use payload::Payload;
pub use sink::{Incoming, Received, Sink};
pub use socket::{Connection, Endpoint, InterruptHandle, Transport};
pub use tcp::{Transfer, Transmitter};

/// Reads `config.file` and sends its bytes to `config.endpoint()`.
///
/// The file is read before any connection is attempted, so a missing file
/// never touches the network.
pub fn push_file(config: &Config) -> Result<Transfer, SendError> {
    push_file_with(config, |_| {})
}

/// [`push_file`] with a hook that sees the live connection before the
/// payload is written, e.g. to take an [`InterruptHandle`].
pub fn push_file_with<F>(config: &Config, on_connect: F) -> Result<Transfer, SendError>
where
    F: FnOnce(&Connection),
{
    let payload = Payload::read_from(&config.file)?;
    let endpoint = config.endpoint();
    log::info!(
        "sending {} ({} bytes) to {}",
        config.file.display(),
        payload.len(),
        endpoint
    );
    Transmitter::with_connect_timeout(config.connect_timeout()).transmit_with(
        endpoint,
        &payload,
        on_connect,
    )
}
