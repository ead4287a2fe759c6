use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgGroup, Args, Subcommand};
use simplenet_peer::{DEFAULT_HOST, DEFAULT_PORT};

use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod chat;
pub mod listen;
pub mod relay;
pub mod send;
pub mod version;

/// How long server loops wait for an event before re-checking for Ctrl-C.
pub const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a server and print every event it reports.
    Listen(ListenArgs),
    /// Run a chat relay that broadcasts joins, leaves and messages.
    Relay(RelayArgs),
    /// Send a single value to a server.
    Send(SendArgs),
    /// Interactive client: stdin lines out, server messages in.
    Chat(ChatArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Relay(args) => relay::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Chat(args) => chat::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Port to listen on (0 picks a free port).
    #[arg(default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Host to listen on.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
    /// Send every message back to the client that sent it.
    #[arg(long)]
    pub echo: bool,
}

#[derive(Args, Debug)]
pub struct RelayArgs {
    /// Port to listen on (0 picks a free port).
    #[arg(default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Host to listen on.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["json", "data"])))]
pub struct SendArgs {
    /// Server port.
    #[arg(default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Server host.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,
    /// JSON value to send.
    #[arg(long, conflicts_with = "data")]
    pub json: Option<String>,
    /// Send this text as a JSON string.
    #[arg(long, conflicts_with = "json")]
    pub data: Option<String>,
    /// Wait for one value back and print it.
    #[arg(long)]
    pub wait: bool,
    /// Connect timeout, and read timeout when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Server port.
    #[arg(default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Server host.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Clear `running` on Ctrl-C so server loops can stop cleanly.
pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
