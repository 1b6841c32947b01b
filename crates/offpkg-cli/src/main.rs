//! offpkg - offline package repositories CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use offpkg_cli::cmd;
use offpkg_cli::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { dir, no_recursive } => cmd::scan::scan(&dir, !no_recursive),
        Commands::Resolve { plan, config } => cmd::resolve::resolve(&plan, &config).await,
        Commands::Build {
            plan,
            output,
            config,
        } => cmd::build::build(&plan, &output, &config).await,
        Commands::Install(args) => cmd::install::install(args),
        Commands::ExportInstaller {
            dest,
            force,
            installer,
        } => cmd::export::export(&dest, force, installer),
    }
}
