// src/main.rs
mod app;
mod aws;
mod config;
mod error;
mod kubeconfig;
mod timer;
mod token;
mod types;
mod utils;
mod vault;

use std::process::ExitCode;

use clap::Parser;

use types::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    utils::logging::init(&cli.verbosity);

    match app::run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            if let Some(hint) = app::hint(&err) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}
