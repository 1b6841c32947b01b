use anyhow::{Context, Result};
use offpkg_install::{ConsoleReporter, InstallArgs, install_repository};

pub fn install(args: InstallArgs) -> Result<()> {
    let reporter = ConsoleReporter::new(args.verbose);
    let opts = args.into_options();

    install_repository(&opts, &reporter)
        .with_context(|| format!("Failed to install from {}", opts.archive.display()))?;
    Ok(())
}
