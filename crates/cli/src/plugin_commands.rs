//! `validate-plugins` and `build-manifest`.

use std::path::Path;

use {
    marketplace_config::MarketplaceConfig,
    marketplace_plugins::{ExitStatus, Pipeline, ReportFormat, render_build, render_validation},
    tracing::info,
};

pub async fn validate_plugins(
    root: &Path,
    config: MarketplaceConfig,
    path: Option<&Path>,
    format: ReportFormat,
) -> anyhow::Result<ExitStatus> {
    let pipeline = Pipeline::new(root, config);
    let run = match path {
        Some(path) => pipeline.validate_one(path).await?,
        None => pipeline.validate_all().await?,
    };

    print!("{}", render_validation(&run, root, format));
    let status = run.exit_status();
    info!(exit = status.code(), "validate-plugins finished");
    Ok(status)
}

pub async fn build_manifest(
    root: &Path,
    config: MarketplaceConfig,
    format: ReportFormat,
) -> anyhow::Result<ExitStatus> {
    let pipeline = Pipeline::new(root, config);
    let run = pipeline.build_manifest().await?;

    print!("{}", render_build(&run, root, format));
    let status = run.exit_status();
    info!(exit = status.code(), "build-manifest finished");
    Ok(status)
}
