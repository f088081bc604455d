use std::path::PathBuf;

use clap::{Args, Subcommand};
use richpresence_engine::{Dimension, DEFAULT_CONFIG_FILE};
use richpresence_transport::LocalDiscovery;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod probe;
pub mod resolve;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look for a running desktop client and handshake with it.
    Probe(ProbeArgs),
    /// Show how a server address and MOTD would be displayed.
    Resolve(ResolveArgs),
    /// Publish presence for a fixed host state until interrupted.
    Run(RunArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Probe(args) => probe::run(args, format),
        Command::Resolve(args) => resolve::run(args, format),
        Command::Run(args) => run::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// `--ipc-dir` when given, the platform search list otherwise.
pub(crate) fn discovery(ipc_dir: Option<&PathBuf>) -> LocalDiscovery {
    match ipc_dir {
        Some(dir) => LocalDiscovery::with_dir(dir),
        None => LocalDiscovery::from_env(),
    }
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Discord application id to identify with.
    #[arg(long, env = "RICHPRESENCE_APP_ID")]
    pub app_id: String,
    /// Only look for the IPC socket in this directory.
    #[arg(long, value_name = "DIR")]
    pub ipc_dir: Option<PathBuf>,
    /// Handshake timeout per candidate (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Server address as typed in the server list.
    pub address: String,
    /// Server list MOTD.
    #[arg(long, default_value = "")]
    pub motd: String,
    /// Icon key used when the host has no known icon.
    #[arg(long, default_value = "server")]
    pub fallback_icon: String,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Config file; created with defaults when missing.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
    /// Show a multiplayer session on this server.
    #[arg(long, conflicts_with = "singleplayer")]
    pub address: Option<String>,
    /// MOTD of the server given with --address.
    #[arg(long, requires = "address")]
    pub motd: Option<String>,
    /// Show a singleplayer session in this dimension.
    #[arg(long, value_name = "DIMENSION")]
    pub singleplayer: Option<Dimension>,
    /// Only look for the IPC socket in this directory.
    #[arg(long, value_name = "DIR")]
    pub ipc_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
