//! `ferroxide` CLI entry point: parses [`cli::Args`] and hands off to [`cli::Runner`].

use ferroxide::cli::{Args, Runner};
use clap::Parser;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let runner = Runner::new(args);

    if let Err(e) = runner.run().await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
