mod cli;
mod copy;

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Copy {
            text,
            backend,
            display,
        } => {
            if let Err(e) = copy::run(text, backend, display).await {
                tracing::error!(error = %e, "copy failed");
                eprintln!("clipwrite copy: {e}");
                std::process::exit(1);
            }
        }
    }
}
