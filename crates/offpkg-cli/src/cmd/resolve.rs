use anyhow::Result;
use offpkg_schema::LibrarySet;

use crate::cmd::mirror_builder;
use crate::{ConfigArgs, PlanArgs};

pub async fn resolve(plan: &PlanArgs, config: &ConfigArgs) -> Result<()> {
    let builder = mirror_builder(config.load()?, true).await?;

    let explicit: LibrarySet = plan.libraries.iter().cloned().collect();
    let planned = builder.plan(plan.dir.as_deref(), &explicit, !plan.no_recursive)?;
    let resolved = builder.resolve(&planned)?;

    for name in &resolved {
        println!("{name}");
    }
    Ok(())
}
