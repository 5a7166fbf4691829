use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Listen for one peer and print received messages.
    Listen(ListenArgs),
    /// Connect and send a single message.
    Send(SendArgs),
    /// Show version information.
    Version,
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Version => version::run(),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Local address to bind (e.g. 127.0.0.1:9020).
    pub addr: SocketAddr,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Remote address to connect to.
    pub addr: SocketAddr,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
}
