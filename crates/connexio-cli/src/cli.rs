use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "connexio",
    about = "Connexio: share text, images and files between devices",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the sync server
    Serve(ServeArgs),
    /// Show the persisted current item and saved slots
    Status(StatusArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on [default: 8080]
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Address to bind [default: 0.0.0.0]
    #[arg(long)]
    pub host: Option<IpAddr>,
    /// Data directory [default: ./data]
    #[arg(short, long)]
    pub data: Option<PathBuf>,
    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct StatusArgs {
    #[arg(short, long, default_value = "./data")]
    pub data: PathBuf,
}
