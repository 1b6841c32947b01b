pub mod build;
pub mod export;
pub mod install;
pub mod resolve;
pub mod scan;

use anyhow::{Context, Result};
use offpkg_core::{
    BuildConfig, BuildError, IndexResolver, MirrorFetcher, RepositoryBuilder, ResolveStrategy,
};

/// Builder wired to the configured mirror. The source index is only fetched
/// when resolution happens up front.
pub(crate) async fn mirror_builder(
    config: BuildConfig,
    force_resolver: bool,
) -> Result<RepositoryBuilder> {
    let mirror = MirrorFetcher::new(&config.index_mirror);
    let resolver = if force_resolver || config.resolve_strategy == ResolveStrategy::Upfront {
        let index = mirror
            .source_index()
            .await
            .map_err(BuildError::from)
            .with_context(|| {
                format!("Failed to load the package index from {}", config.index_mirror)
            })?;
        Some(IndexResolver::new(index, config.base_libraries()))
    } else {
        None
    };

    let mut builder = RepositoryBuilder::new(config, Box::new(mirror))?;
    if let Some(resolver) = resolver {
        builder = builder.with_resolver(Box::new(resolver));
    }
    Ok(builder)
}
