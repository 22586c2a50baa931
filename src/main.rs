// reliance-guard - main.rs
// CLI entry point: parse arguments, load config and dispatch

use clap::Parser;
use reliance_guard::cli::{dispatch, Cli};

fn main() -> anyhow::Result<()> {
    dispatch(Cli::parse())
}
