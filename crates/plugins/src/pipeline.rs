//! Load → validate → aggregate over a whole plugin tree.
//!
//! Plugins are loaded and validated on the blocking pool, at most `jobs` at a
//! time. Results are put back in plugin-root order before anything reads
//! them, so the report and manifest never depend on scheduling.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    marketplace_config::MarketplaceConfig,
    tokio::{sync::Semaphore, task::JoinSet},
    tracing::{debug, info, warn},
};

use crate::{
    discover::{FsPluginDiscoverer, PluginDiscoverer},
    error::{AggregationError, Error, LoadError, Result},
    loader::load_plugin,
    manifest::{ManifestStore, RegistryManifest, SaveOutcome, aggregate, timestamp_now},
    types::LoadedPlugin,
    validate::{ValidationResult, Validator, failed_dependency_violations},
};

/// What happened to one plugin folder.
#[derive(Debug)]
pub enum PluginOutcome {
    /// The descriptor could not be loaded; the validator never ran.
    LoadFailed { root: PathBuf, error: LoadError },
    Validated {
        plugin: LoadedPlugin,
        result: ValidationResult,
    },
}

impl PluginOutcome {
    #[must_use]
    pub fn root(&self) -> &Path {
        match self {
            Self::LoadFailed { root, .. } => root,
            Self::Validated { plugin, .. } => &plugin.root,
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(self, Self::Validated { result, .. } if result.ok)
    }
}

/// Outcomes of one validation pass, in plugin-root order.
#[derive(Debug, Default)]
pub struct ValidationRun {
    pub outcomes: Vec<PluginOutcome>,
}

impl ValidationRun {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(PluginOutcome::passed)
    }

    #[must_use]
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    /// Plugins that loaded but have violations.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, PluginOutcome::Validated { result, .. } if !result.ok))
            .count()
    }

    /// Plugins that could not be loaded.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, PluginOutcome::LoadFailed { .. }))
            .count()
    }

    fn validated(&self) -> impl Iterator<Item = (&LoadedPlugin, &ValidationResult)> {
        self.outcomes.iter().filter_map(|o| match o {
            PluginOutcome::Validated { plugin, result } => Some((plugin, result)),
            PluginOutcome::LoadFailed { .. } => None,
        })
    }
}

/// A manifest that made it to disk.
#[derive(Debug)]
pub struct BuiltManifest {
    pub path: PathBuf,
    pub manifest: RegistryManifest,
    pub outcome: SaveOutcome,
}

/// Result of `build-manifest`: validation outcomes plus the aggregation.
#[derive(Debug)]
pub struct BuildRun {
    pub validation: ValidationRun,
    pub manifest: std::result::Result<BuiltManifest, AggregationError>,
}

/// Drives the pipeline for one marketplace checkout.
pub struct Pipeline {
    root: PathBuf,
    config: MarketplaceConfig,
    discoverer: Arc<dyn PluginDiscoverer>,
}

impl Pipeline {
    pub fn new(root: impl Into<PathBuf>, config: MarketplaceConfig) -> Self {
        let root = root.into();
        let discoverer = Arc::new(FsPluginDiscoverer::new(root.join(&config.plugins_dir)));
        Self {
            root,
            config,
            discoverer,
        }
    }

    #[must_use]
    pub fn with_discoverer(mut self, discoverer: Arc<dyn PluginDiscoverer>) -> Self {
        self.discoverer = discoverer;
        self
    }

    /// Where `build-manifest` writes, resolved against the root.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(&self.config.manifest_path)
    }

    /// Validate every discovered plugin.
    pub async fn validate_all(&self) -> Result<ValidationRun> {
        let roots = self.discoverer.discover().await?;
        let loaded = self.load_all(roots).await?;
        let known = known_names(&loaded);
        self.validate_loaded(loaded, known).await
    }

    /// Validate the single plugin at `path`.
    ///
    /// Sibling plugins are still loaded so dependency edges resolve.
    pub async fn validate_one(&self, path: &Path) -> Result<ValidationRun> {
        let siblings = match self.discoverer.discover().await {
            Ok(roots) => roots,
            Err(e) => {
                debug!(%e, "no sibling plugins to resolve dependencies against");
                Vec::new()
            },
        };
        let mut known = known_names(&self.load_all(siblings).await?);

        let target = path.to_path_buf();
        let loaded = tokio::task::spawn_blocking(move || {
            let result = load_plugin(&target);
            (target, result)
        })
        .await
        .map_err(|e| Error::external("plugin load task failed", e))?;
        if let (_, Ok(plugin)) = &loaded {
            known.insert(plugin.name().to_string());
        }
        self.validate_loaded(vec![loaded], known).await
    }

    /// Validate everything, then aggregate and write the manifest.
    ///
    /// Plugins that fail are left out of the manifest. An aggregation error
    /// leaves the previous manifest untouched.
    pub async fn build_manifest(&self) -> Result<BuildRun> {
        let validation = self.validate_all().await?;
        let path = self.manifest_path();

        let manifest = aggregate(
            validation.validated(),
            self.config.marketplace_version.clone(),
            timestamp_now(),
        )
        .and_then(|mut manifest| {
            let outcome = ManifestStore::new(&path).save(&mut manifest)?;
            Ok(BuiltManifest {
                path: path.clone(),
                manifest,
                outcome,
            })
        });
        if let Err(e) = &manifest {
            warn!(path = %path.display(), %e, "manifest not written");
        }

        Ok(BuildRun {
            validation,
            manifest,
        })
    }

    async fn load_all(
        &self,
        roots: Vec<PathBuf>,
    ) -> Result<Vec<(PathBuf, std::result::Result<LoadedPlugin, LoadError>)>> {
        self.run_bounded(roots, |root| {
            let result = load_plugin(&root);
            (root, result)
        })
        .await
    }

    async fn validate_loaded(
        &self,
        loaded: Vec<(PathBuf, std::result::Result<LoadedPlugin, LoadError>)>,
        known: BTreeSet<String>,
    ) -> Result<ValidationRun> {
        let validator = Arc::new(Validator::new(&self.config.validation, known));
        let outcomes = self
            .run_bounded(loaded, move |(root, loaded)| match loaded {
                Ok(plugin) => {
                    let result = validator.validate(&plugin);
                    PluginOutcome::Validated { plugin, result }
                },
                Err(error) => {
                    warn!(root = %root.display(), kind = error.kind(), %error, "skipping plugin");
                    PluginOutcome::LoadFailed { root, error }
                },
            })
            .await?;

        let mut run = ValidationRun { outcomes };
        propagate_dependency_failures(&mut run);
        info!(
            total = run.outcomes.len(),
            passed = run.passed(),
            failed = run.failed(),
            skipped = run.skipped(),
            "validation finished"
        );
        Ok(run)
    }

    /// Run `f` over `items` on the blocking pool, bounded by `jobs`, and
    /// return the results in input order.
    async fn run_bounded<T, R, F>(&self, items: Vec<T>, f: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.config.effective_jobs()));
        let f = Arc::new(f);
        let mut tasks = JoinSet::new();
        let count = items.len();

        for (idx, item) in items.into_iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| Error::external("worker pool closed", e))?;
            let f = Arc::clone(&f);
            tasks.spawn_blocking(move || {
                let _permit = permit;
                (idx, f(item))
            });
        }

        let mut results = Vec::with_capacity(count);
        while let Some(joined) = tasks.join_next().await {
            results.push(joined.map_err(|e| Error::external("plugin task failed", e))?);
        }
        results.sort_by_key(|(idx, _)| *idx);
        Ok(results.into_iter().map(|(_, r)| r).collect())
    }
}

fn known_names(loaded: &[(PathBuf, std::result::Result<LoadedPlugin, LoadError>)]) -> BTreeSet<String> {
    loaded
        .iter()
        .filter_map(|(_, r)| r.as_ref().ok())
        .map(|p| p.name().to_string())
        .collect()
}

/// Fail every passing plugin whose `requires`/`recommends` edge points at a
/// plugin that failed, repeating until nothing changes, so the manifest never
/// carries an edge to a plugin it left out.
fn propagate_dependency_failures(run: &mut ValidationRun) {
    loop {
        let failed: BTreeSet<String> = run
            .validated()
            .filter(|(_, result)| !result.ok)
            .map(|(plugin, _)| plugin.name().to_string())
            .collect();

        let mut changed = false;
        for outcome in &mut run.outcomes {
            let PluginOutcome::Validated { plugin, result } = outcome else {
                continue;
            };
            if !result.ok {
                continue;
            }
            let extra = failed_dependency_violations(&plugin.descriptor, &failed);
            if extra.is_empty() {
                continue;
            }
            warn!(plugin = %plugin.name(), failed = extra.len(), "dependency failed validation");
            *result = result.with_violations(extra);
            changed = true;
        }
        if !changed {
            break;
        }
    }
}
