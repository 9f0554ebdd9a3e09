//! Binary crate for the `weather` web front-end.
//!
//! This crate focuses on:
//! - Serving the search form, results and comparison pages
//! - Rendering templates
//! - Interactive configuration and terminal lookups

use clap::Parser;

mod cli;
mod render;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
