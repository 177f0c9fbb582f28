//! Embedding Service binary.
//!
//! `embedding-service local` starts a development server on port 8000.
//! Inside the managed platform the binary is started without arguments and
//! serves the same API; anywhere else it prints deployment instructions.

use clap::Parser;
use server::deploy::{run, Invocation};

#[derive(Debug, Parser)]
#[command(name = "embedding-service", version, about = "Text embedding HTTP service")]
struct Cli {
    /// Pass `local` to run a development server on this machine.
    /// Any other arguments print deployment instructions.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Values from .env never override variables already set in the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    run(Invocation::from_process(&cli.args)).await
}
