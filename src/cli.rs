use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "scrapebox")]
#[command(about = "Scrapebox CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a set of targets once and log what came back
    Probe(ProbeArgs),
}

#[derive(clap::Args, Debug)]
pub struct ProbeArgs {
    /// Base URL each target is appended to
    #[arg(long)]
    pub base_url: String,

    /// Target path fragments to fetch, in order
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Minimum delay between consecutive requests, in seconds
    #[arg(long, default_value_t = 2.0)]
    pub min_backoff: f64,
}
