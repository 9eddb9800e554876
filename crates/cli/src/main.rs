mod plugin_commands;
mod suggest_commands;

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use {
    anyhow::Context,
    clap::{Parser, Subcommand, ValueEnum},
    marketplace_config::{MarketplaceConfig, Severity},
    marketplace_plugins::{ExitStatus, ReportFormat},
    tracing::{debug, error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "marketplace",
    version,
    about = "Validate marketplace plugins and build plugin-manifest.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository root (defaults to the current directory).
    #[arg(long, global = true, env = "MARKETPLACE_ROOT")]
    root: Option<PathBuf>,

    /// Config file (defaults to marketplace.{toml,yaml,yml,json} in the root).
    #[arg(long, global = true, env = "MARKETPLACE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Report format written to stdout.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one plugin folder, or every plugin when no path is given.
    ValidatePlugins {
        /// Plugin folder to validate.
        path: Option<PathBuf>,
    },
    /// Validate every plugin and write the aggregated manifest.
    BuildManifest {
        /// Manifest output path (overrides config value).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Suggest plugins to auto-load for a project.
    Suggest {
        /// Project directory (defaults to the current directory).
        project: Option<PathBuf>,
        /// Manifest to read (defaults to the configured manifest path).
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Print suggestions as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Self::Text,
            OutputFormat::Json => Self::Json,
        }
    }
}

/// Logs go to stderr so reports on stdout stay machine-readable.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Load the explicit config file, or discover one under `root`.
///
/// Diagnostics are logged; only an explicit file that fails to load is an
/// error.
fn load_config(root: &Path, explicit: Option<&Path>) -> anyhow::Result<MarketplaceConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => marketplace_config::find_config_file(root),
    };

    if let Some(path) = &path {
        let validation = marketplace_config::validate_config_file(path);
        for d in &validation.diagnostics {
            match d.severity {
                Severity::Error => {
                    error!(config = %path.display(), key = %d.path, category = d.category, "{}", d.message);
                },
                Severity::Warning => {
                    warn!(config = %path.display(), key = %d.path, category = d.category, "{}", d.message);
                },
                Severity::Info => {
                    info!(config = %path.display(), key = %d.path, category = d.category, "{}", d.message);
                },
            }
        }
    }

    match explicit {
        Some(path) => marketplace_config::load_config(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(marketplace_config::discover_and_load(root)),
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitStatus> {
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    let root = match cli.root {
        Some(root) => cwd.join(root),
        None => cwd.clone(),
    };
    let mut config = load_config(&root, cli.config.as_deref())?;
    debug!(root = %root.display(), ?config, "resolved configuration");
    let format = ReportFormat::from(cli.format);

    match cli.command {
        Commands::ValidatePlugins { path } => {
            let path = path.map(|p| cwd.join(p));
            plugin_commands::validate_plugins(&root, config, path.as_deref(), format).await
        },
        Commands::BuildManifest { output } => {
            if let Some(output) = output {
                config.manifest_path = cwd.join(output);
            }
            plugin_commands::build_manifest(&root, config, format).await
        },
        Commands::Suggest {
            project,
            manifest,
            json,
        } => {
            let project = project.map_or_else(|| cwd.clone(), |p| cwd.join(p));
            let manifest = manifest.map_or_else(
                || root.join(&config.manifest_path),
                |m| cwd.join(m),
            );
            let json = json || matches!(cli.format, OutputFormat::Json);
            suggest_commands::suggest(&project, &manifest, json)
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "marketplace starting");

    match run(cli).await {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("error: {e:#}");
            ExitCode::from(ExitStatus::AggregationFailed.code())
        },
    }
}
