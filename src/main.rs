//! Crawls GitHub repositories and serves a leaderboard of their contributors.
//!
//! # Overview
//!
//! `contrib-rank` walks the public GitHub repository index, fetches each repository's
//! contributors, and scores every contributor by the share of commits they own in each
//! repository weighted by how many people watch it. The scores are folded into a ranked
//! leaderboard served over HTTP.
//!
//! # Quick Start
//!
//! ```bash
//! export GITHUB_TOKEN=...
//! contrib-rank serve
//! ```
//!
//! Then open `http://localhost:25751/`.
//!
//! # Commands
//!
//! **Run the crawler and web server:**
//! ```bash
//! contrib-rank serve --port 8080 --data-dir ./data
//! ```
//!
//! **Write a commented default configuration:**
//! ```bash
//! contrib-rank init contrib-rank.toml
//! ```
//!
//! **Check a configuration file:**
//! ```bash
//! contrib-rank validate --config contrib-rank.toml
//! ```
//!
//! # Configuration
//!
//! Settings are read from the first of `contrib-rank.toml`, `contrib-rank.yml`,
//! `contrib-rank.yaml` or `contrib-rank.json` in the working directory, or from the file
//! named with `--config`. Every setting is optional.
//!
//! # Data
//!
//! Crawled repositories are kept as one JSON document each under the data directory, together
//! with the crawl queue, so a restarted server resumes where it stopped. Only one server may
//! use a data directory at a time.

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};
use contrib_rank::Result;

mod commands;

use crate::commands::{InitArgs, ServeArgs, ValidateArgs, init_config, serve, validate_config};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "contrib-rank", version, about)]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl GitHub and serve the leaderboard
    Serve(Box<ServeArgs>),
    /// Generate a default configuration file
    Init(InitArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    match &Cli::parse().command {
        Command::Serve(serve_args) => serve(serve_args).await,
        Command::Init(init_args) => init_config(init_args),
        Command::Validate(validate_args) => validate_config(validate_args),
    }
}
