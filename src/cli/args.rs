//! `clap`-derived CLI surface. This is a thin shell over the core `Image`/`Registry`
//! operations (spec §1, §6): it has no behavior of its own beyond parsing and handing
//! off to [`super::runner::Runner`].

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ferroxide",
    version,
    about = "Build, inspect, transfer, and serialize OCI/Docker container images"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Print detailed progress as each step runs.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Pull an image from a v2 registry and write it as a v1 archive.
    Pull {
        /// Registry base URL, e.g. https://registry-1.docker.io.
        #[arg(long, default_value = "https://registry-1.docker.io")]
        hostname: String,
        /// Repository name, e.g. library/busybox.
        image: String,
        /// Tag to pull.
        #[arg(default_value = "latest")]
        tag: String,
        /// Don't download layer blobs until something reads their content.
        #[arg(long)]
        lazy: bool,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Archive path to write.
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Push a v1 archive to a v2 registry.
    Push {
        /// Archive to read (a v1 `docker save` tar).
        #[arg(short, long)]
        file: PathBuf,
        /// Registry base URL.
        #[arg(long, default_value = "https://registry-1.docker.io")]
        hostname: String,
        /// Destination repository name.
        image: String,
        /// Destination tag.
        #[arg(default_value = "latest")]
        tag: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },

    /// Hand an archive to the local container engine (`docker load -i <file>`).
    Load {
        /// Archive to load.
        #[arg(short, long)]
        file: PathBuf,
    },
}
