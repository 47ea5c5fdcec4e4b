mod cli;
mod commands;
mod model;
mod qrels;
mod topics;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::DeriveQrels(args) => commands::derive_qrels::run(args),
        Commands::ExportTsv(args) => commands::export_tsv::run(args),
        Commands::Index(args) => commands::index::run(args),
        Commands::Qpp(args) => commands::qpp::run(args),
        Commands::Generate(args) => commands::generate::run(args),
        Commands::ScoreAnswers(args) => commands::score_answers::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
