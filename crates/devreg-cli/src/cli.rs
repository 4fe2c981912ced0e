use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use devreg_server::ServerConfig;

#[derive(Parser)]
#[command(
    name = "devreg",
    about = "Devfile stack registry: publishes stacks to an OCI registry and serves them by name",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// OCI registry `host:port`
    #[arg(long, global = true)]
    pub registry: Option<String>,

    /// Index JSON file
    #[arg(long, global = true)]
    pub index: Option<PathBuf>,

    /// Directory holding `{stack}/devfile.yaml`
    #[arg(long, global = true)]
    pub stacks: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Publish every stack, then serve them over HTTP
    Serve(ServeArgs),
    /// Publish every stack and exit
    Push(PushArgs),
    /// Fetch one stack's devfile.yaml from the registry
    Pull(PullArgs),
    /// Check once whether the registry is up
    Probe(ProbeArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct PushArgs {}

#[derive(Args)]
pub struct PullArgs {
    pub name: String,
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ProbeArgs {}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn load_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(host) = &self.registry {
            config.registry.host = host.clone();
        }
        if let Some(index) = &self.index {
            config.index_path = index.clone();
        }
        if let Some(stacks) = &self.stacks {
            config.registry.stacks_root = stacks.clone();
        }
        if let Command::Serve(ServeArgs { bind: Some(bind) }) = &self.command {
            config.bind_addr = *bind;
        }
        Ok(config)
    }
}
