// src/bin/fieldlink.rs
use std::io::Write as _;
use std::time::Duration;

use clap::{Parser, Subcommand};
use fieldlink::{available_ports, SerialTransport, Session, CMD_READ_TEMPERATURE, CMD_TOGGLE_INDICATOR};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Secure session client for the field link serial protocol")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available serial ports.
    List,
    /// Open a session against a port, then issue one command or drop into an
    /// interactive loop.
    Open {
        #[arg(long)]
        port: String,

        #[arg(long, default_value_t = 115_200)]
        baud: u32,

        #[arg(long, default_value_t = 1000)]
        timeout_ms: u64,

        /// "toggle", "temp", or "raw:<hex-byte>". Omit for an interactive loop.
        #[arg(long)]
        command: Option<String>,
    },
}

fn parse_command(spec: &str) -> anyhow::Result<u8> {
    match spec {
        "toggle" => Ok(CMD_TOGGLE_INDICATOR),
        "temp" => Ok(CMD_READ_TEMPERATURE),
        other => {
            let hex = other.strip_prefix("raw:").ok_or_else(|| {
                anyhow::anyhow!("unrecognized command '{other}'; use toggle, temp, or raw:<hex-byte>")
            })?;
            Ok(u8::from_str_radix(hex, 16)?)
        }
    }
}

fn dispatch(session: &mut Session<SerialTransport>, command: u8) -> anyhow::Result<()> {
    match session.request(command) {
        Ok(resp) => {
            info!(status = "okay", text = %resp.as_text(), "command completed");
            println!("{}", resp.as_text());
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "command failed");
            Err(e.into())
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::List => {
            for port in available_ports() {
                println!("{port}");
            }
        }
        Command::Open {
            port,
            baud,
            timeout_ms,
            command,
        } => {
            info!(port = %port, baud, "opening session");
            let transport = SerialTransport::open(&port, baud, Duration::from_millis(timeout_ms))?;
            let mut session = Session::open(transport)?;
            info!(state = %session.state(), "handshake established");

            if let Some(spec) = command {
                let byte = parse_command(&spec)?;
                dispatch(&mut session, byte)?;
            } else {
                let stdin = std::io::stdin();
                loop {
                    print!("> ");
                    std::io::stdout().flush()?;
                    let mut line = String::new();
                    if stdin.read_line(&mut line)? == 0 {
                        break;
                    }
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if line == "quit" || line == "exit" {
                        break;
                    }
                    match parse_command(line) {
                        Ok(byte) => {
                            if let Err(e) = dispatch(&mut session, byte) {
                                warn!(error = %e, "command failed");
                            }
                        }
                        Err(e) => warn!(error = %e, "could not parse command"),
                    }
                }
            }

            session.close();
            info!("session closed");
        }
    }
    Ok(())
}
