use anyhow::Result;
use clap::Parser;
use file_push::error::exit_code;
use file_push::{push_file_with, Config, ConfigError, InterruptHandle, Overrides, SendError};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::{self, ExitCode};
use std::sync::{Arc, Mutex};

/// Send a file's raw bytes over one TCP connection, then close it.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// File to send [default: test.mp4]
    #[arg(env = "FILE_PUSH_FILE")]
    file: Option<PathBuf>,
    /// Destination IPv4 address [default: 192.168.0.2]
    #[arg(long, env = "FILE_PUSH_ADDR")]
    addr: Option<Ipv4Addr>,
    /// Destination TCP port [default: 4000]
    #[arg(long, env = "FILE_PUSH_PORT")]
    port: Option<u16>,
    /// Give up connecting after this many seconds
    #[arg(
        long,
        value_name = "SECS",
        env = "FILE_PUSH_CONNECT_TIMEOUT",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    connect_timeout: Option<u64>,
    /// TOML config file
    #[arg(long, env = "FILE_PUSH_CONFIG")]
    config: Option<PathBuf>,
}

/// What a Ctrl-C has to tear down.
enum Stage {
    Idle,
    Sending(InterruptHandle),
    Done,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match file_client(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(failure_code(&e))
        }
    }
}

fn file_client(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?.apply(Overrides {
        addr: cli.addr,
        port: cli.port,
        file: cli.file,
        connect_timeout_secs: cli.connect_timeout,
    });

    let stage = Arc::new(Mutex::new(Stage::Idle));
    let handler_stage = Arc::clone(&stage);
    ctrlc::set_handler(move || {
        let code = match handler_stage.lock().as_deref() {
            Ok(Stage::Done) => 0,
            Ok(Stage::Sending(interrupt)) => {
                interrupt.interrupt();
                exit_code::INTERRUPTED
            }
            _ => exit_code::INTERRUPTED,
        };
        process::exit(code.into());
    })?;

    let result = push_file_with(&config, |connection| match connection.interrupt_handle() {
        Ok(interrupt) => set_stage(&stage, Stage::Sending(interrupt)),
        Err(e) => log::warn!("Ctrl-C will not close the socket: {}", e),
    });
    // drops the cloned socket, if any
    let next = if result.is_ok() { Stage::Done } else { Stage::Idle };
    set_stage(&stage, next);

    let transfer = result?;
    log::info!(
        "sent {} bytes from {} to {}",
        transfer.bytes_sent,
        config.file.display(),
        transfer.endpoint
    );
    Ok(())
}

fn set_stage(stage: &Mutex<Stage>, next: Stage) {
    if let Ok(mut current) = stage.lock() {
        *current = next;
    }
}

fn failure_code(e: &anyhow::Error) -> u8 {
    if let Some(e) = e.downcast_ref::<SendError>() {
        e.exit_code()
    } else if e.downcast_ref::<ConfigError>().is_some() {
        exit_code::CONFIG
    } else {
        1
    }
}
