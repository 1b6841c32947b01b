//! offpkg-install - standalone installer for offline repositories

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use offpkg_install::{ConsoleReporter, InstallArgs, install_repository};

#[derive(Debug, Parser)]
#[command(name = "offpkg-install")]
#[command(author, version, about = "Install libraries from an offline offpkg repository archive")]
struct Cli {
    #[command(flatten)]
    install: InstallArgs,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let reporter = ConsoleReporter::new(cli.install.verbose);
    let opts = cli.install.into_options();

    install_repository(&opts, &reporter)
        .with_context(|| format!("Failed to install from {}", opts.archive.display()))?;
    Ok(())
}
