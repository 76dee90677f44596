//! Process flags (§6): `-d <master-multiaddr>`, `-m auto`, `-n <letter>`,
//! `-help`. Realized with `clap`, matching the teacher's habit of a derived
//! `Parser` struct per binary (`discover/src/main.rs`, `botho/src/main.rs`).
//!
//! **[ADD]** flags the distilled spec leaves implicit but a runnable binary
//! needs: the node's own listen address, and the paths to the two on-disk
//! config formats (§6's CSV topology file and `byzantine.config`).

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Use the topology CSV row matching `--letter` literally.
    Manual,
    /// Replace the `--letter` placeholder row with this node's own address.
    Auto,
}

#[derive(Debug, Parser)]
#[command(name = "rc-node")]
#[command(about = "Byzantine-tolerant reliable-communication testbed node")]
pub struct Args {
    /// This node's own listen address.
    #[arg(long, default_value = "127.0.0.1:0")]
    pub listen: SocketAddr,

    /// `-d`: the master's address, if this node reports to one.
    #[arg(short = 'd', long)]
    pub master: Option<SocketAddr>,

    /// `-m`: `auto` replaces the topology CSV's `--letter` row with this
    /// node's own listen address before connecting; `manual` uses it as-is.
    #[arg(short = 'm', long, value_enum, default_value = "manual")]
    pub mode: Mode,

    /// `-n`: this node's letter slot in the topology CSV.
    #[arg(short = 'n', long)]
    pub letter: String,

    /// Path to the topology CSV (§6 "Files").
    #[arg(long, default_value = "topology.csv")]
    pub topology: PathBuf,

    /// Path to `byzantine.config` (§6 "Files").
    #[arg(long, default_value = "byzantine.config")]
    pub byzantine_config: PathBuf,
}
