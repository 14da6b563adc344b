use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

/// Serve and inspect a SkateList trick catalog
#[derive(Parser)]
#[command(name = "skatelist")]
#[command(about = "Static server and catalog tools for a skateboarding trick list", long_about = None)]
pub struct Cli {
    /// Config file (defaults to ./skatelist.toml, then the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
        /// Directory holding index.html and the json/ data
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
    /// Load the catalog and report what it contains
    Check {
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// Load from a running site instead of a directory
        #[arg(short, long, conflicts_with = "root")]
        url: Option<Url>,
    },
    /// Search the catalog the way the page's search bar does
    Search {
        /// Query to search for
        query: String,
        #[arg(short, long)]
        root: Option<PathBuf>,
        #[arg(short, long, conflicts_with = "root")]
        url: Option<Url>,
    },
    /// Feed a recorded event script through the page state and print the effects
    Replay {
        /// JSON array of `{"at_ms": .., "event": {..}}` entries
        events: PathBuf,
        #[arg(short, long)]
        root: Option<PathBuf>,
        #[arg(short, long, conflicts_with = "root")]
        url: Option<Url>,
    },
}
