use std::path::Path;

use anyhow::{Context, Result};
use offpkg_core::BuildRequest;
use offpkg_install::ConsoleReporter;

use crate::cmd::mirror_builder;
use crate::{ConfigArgs, PlanArgs};

pub async fn build(plan: &PlanArgs, output: &Path, config: &ConfigArgs) -> Result<()> {
    let config = config.load()?;
    let target = config.target();
    let builder = mirror_builder(config, false).await?;

    let request = BuildRequest {
        dir: plan.dir.clone(),
        libraries: plan.libraries.iter().cloned().collect(),
        recursive: !plan.no_recursive,
        output: output.to_path_buf(),
    };

    let reporter = ConsoleReporter::new(false);
    let report = builder
        .build(&request, &reporter)
        .await
        .with_context(|| format!("Failed to build {}", output.display()))?;

    println!(
        "Wrote {} ({} libraries for {target})",
        report.archive.display(),
        report.downloaded.len()
    );
    Ok(())
}
