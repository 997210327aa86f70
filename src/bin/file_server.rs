use anyhow::{Context, Result};
use clap::Parser;
use file_push::Sink;
use std::fs;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::{Path, PathBuf};

/// Accept connections one at a time and store each received payload.
#[derive(Parser)]
#[command(version)]
struct Cli {
    local_addr: Ipv4Addr,
    local_port: u16,
    /// Overwritten with every payload received
    file_path: PathBuf,
    /// Exit after the first payload
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let Cli {
        local_addr,
        local_port,
        file_path,
        once,
    } = Cli::parse();
    file_server(SocketAddrV4::new(local_addr, local_port), &file_path, once)
}

fn file_server(addr: SocketAddrV4, file_path: &Path, once: bool) -> Result<()> {
    let sink = Sink::bind(addr).with_context(|| format!("failed to listen on {}", addr))?;

    loop {
        let incoming = sink.accept().context("failed to accept connection")?;
        let peer = incoming.peer();
        let received = match incoming.read_payload() {
            Ok(received) => received,
            Err(e) if !once => {
                log::warn!("dropping incomplete payload from {}: {}", peer, e);
                continue;
            }
            Err(e) => return Err(e).context("failed to receive payload"),
        };
        fs::write(file_path, &received.bytes)
            .with_context(|| format!("failed to write {}", file_path.display()))?;
        log::info!(
            "stored {} bytes from {} in {}",
            received.bytes.len(),
            received.peer,
            file_path.display()
        );
        if once {
            return Ok(());
        }
    }
}
