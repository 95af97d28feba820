//! NeuroPixel - Headless command-line client
//!
//! Lists plugins, runs a plugin on a local image file, and validates or
//! submits pipeline graph files against a NeuroPixel backend.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use neuropixel::{
    config::{AppState, ClientConfig, FolderRole},
    picker::FolderSelector,
    pipeline::{PipelineCompiler, PipelineError, PipelineGraph},
    plugins::{params::parse_value, ParamMap, PluginSpec},
    session::ReconcileMode,
    HttpBackend, Workstation,
};

/// NeuroPixel headless client.
#[derive(Parser, Debug)]
#[command(name = "neuropixel", about = "NeuroPixel image workstation client", version)]
struct Cli {
    /// Backend URL, overriding config and environment
    #[arg(long, global = true, value_name = "URL")]
    backend: Option<String>,

    /// Client config file (defaults to the app data directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available plugins grouped by category
    Plugins,

    /// Upload an image and run one plugin on it
    Run {
        /// Local image file
        image: PathBuf,
        /// Plugin name, e.g. gaussian_blur
        plugin: String,
        /// Parameter as NAME=VALUE; ranges as NAME=LOW..HIGH
        #[arg(short, long = "param", value_name = "NAME=VALUE")]
        params: Vec<String>,
        /// Rewrite the image instead of creating a working copy
        #[arg(long)]
        in_place: bool,
    },

    /// Check a pipeline graph file and print its execution order
    Validate {
        /// Graph file; defaults to the last pipeline used
        graph: Option<PathBuf>,
        /// Resolve operator specs against the backend catalog first
        #[arg(long)]
        online: bool,
    },

    /// Submit a pipeline graph file as a batch job
    Submit {
        /// Graph file; defaults to the last pipeline used
        graph: Option<PathBuf>,
        /// Choose the output folder interactively
        #[arg(long)]
        pick_output: bool,
        /// Poll until the job finishes
        #[arg(long)]
        wait: bool,
        /// Give up waiting after this many seconds
        #[arg(long, value_name = "SECS", default_value_t = 600, requires = "wait")]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,neuropixel=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?.with_env_overrides(),
        None => ClientConfig::load_or_default(),
    };
    if let Some(url) = cli.backend {
        config.backend_url = url;
    }
    tracing::debug!("Using backend {}", config.base_url());

    let mut app_state = AppState::load_or_default();
    app_state.cleanup_missing_folders();

    let result = match cli.command {
        Command::Plugins => list_plugins(config).await,
        Command::Run {
            image,
            plugin,
            params,
            in_place,
        } => run_plugin(config, &image, &plugin, &params, in_place).await,
        Command::Validate { graph, online } => {
            let graph = graph_path(graph, &app_state)?;
            app_state.set_last_pipeline(&graph);
            validate_graph(config, &graph, online).await
        }
        Command::Submit {
            graph,
            pick_output,
            wait,
            timeout,
        } => {
            let graph = graph_path(graph, &app_state)?;
            app_state.set_last_pipeline(&graph);
            if pick_output {
                let stdin = io::stdin();
                let mut selector = FolderSelector::detect(stdin.lock(), io::stderr());
                match selector.select_folder("Output folder", FolderRole::Output, &mut app_state)? {
                    Some(folder) => config.batch_output_folder = folder.to_string_lossy().into_owned(),
                    None => bail!("no output folder selected"),
                }
            }
            let wait = wait.then(|| Duration::from_secs(timeout));
            submit_graph(config, &graph, wait).await
        }
    };

    if let Err(e) = app_state.save() {
        tracing::warn!("Failed to save app state: {}", e);
    }
    result
}

fn connect(config: ClientConfig) -> anyhow::Result<Workstation<HttpBackend>> {
    let backend = HttpBackend::new(&config).context("Creating HTTP client")?;
    Ok(Workstation::new(backend, config))
}

async fn list_plugins(config: ClientConfig) -> anyhow::Result<()> {
    let mut workstation = connect(config)?;
    let catalog = workstation.catalog().await?;

    for (category, specs) in catalog.by_category() {
        println!("{}", category);
        for spec in specs {
            println!("  {:<24} {}", spec.name, spec.display_name);
            for param in &spec.params {
                println!("      {} ({})", param.name(), param.type_name());
            }
        }
    }
    Ok(())
}

fn parse_params(spec: &PluginSpec, raw: &[String]) -> anyhow::Result<ParamMap> {
    let mut params = ParamMap::new();
    for entry in raw {
        let (name, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{}'", entry))?;
        let param = spec
            .param(name.trim())
            .ok_or_else(|| anyhow!("plugin '{}' has no parameter '{}'", spec.name, name.trim()))?;
        params.insert(param.name().to_string(), parse_value(param, value.trim())?);
    }
    Ok(params)
}

/// `--in-place` wins; otherwise the configured mode applies
fn reconcile_mode(in_place: bool, configured: ReconcileMode) -> ReconcileMode {
    if in_place {
        ReconcileMode::InPlace
    } else {
        configured
    }
}

async fn run_plugin(
    config: ClientConfig,
    image: &Path,
    plugin: &str,
    raw_params: &[String],
    in_place: bool,
) -> anyhow::Result<()> {
    let mut workstation = connect(config)?;
    let catalog = workstation.catalog().await?;
    let spec = catalog.require(plugin)?;
    let params = parse_params(spec, raw_params)?;

    let file_name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{:?} is not a file", image))?;
    let bytes = std::fs::read(image).with_context(|| format!("Reading {:?}", image))?;
    let id = workstation.upload(&file_name, bytes).await?;

    let mode = reconcile_mode(in_place, workstation.config().reconcile_mode);
    let result_id = workstation
        .run_plugin(&id, plugin, &params, mode)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    if let Some(result) = workstation.session().get(&result_id) {
        println!("{} -> {} ({})", file_name, result.name, result.url);
    }
    Ok(())
}

fn graph_path(arg: Option<PathBuf>, app_state: &AppState) -> anyhow::Result<PathBuf> {
    match arg {
        Some(path) => Ok(path),
        None => app_state
            .get_last_pipeline()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("no graph file given and no recent pipeline to reuse")),
    }
}

fn load_graph(path: &Path) -> anyhow::Result<PipelineGraph> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Reading {:?}", path))?;
    Ok(PipelineGraph::from_json(&json)?)
}

async fn validate_graph(config: ClientConfig, path: &Path, online: bool) -> anyhow::Result<()> {
    let mut graph = load_graph(path)?;
    if online {
        let mut workstation = connect(config)?;
        let catalog = workstation.catalog().await?;
        for id in graph.resolve_specs(&catalog) {
            println!("warning: node {} uses a plugin the backend does not offer", id);
        }
    }

    match PipelineCompiler::compile(&graph) {
        Ok(plan) => {
            println!("Pipeline is runnable. Execution order:");
            for (step, id) in plan.order.iter().enumerate() {
                if let Some(node) = graph.node(*id) {
                    println!("  {}. {} {}", step + 1, id, node.label);
                }
            }
            if !plan.inactive_nodes.is_empty() {
                println!("Not connected to a source and a terminal: {:?}", plan.inactive_nodes);
            }
            Ok(())
        }
        Err(PipelineError::NotRunnable(issues)) => {
            for issue in &issues {
                println!("  - {}", issue);
            }
            bail!("pipeline is not runnable ({} issues)", issues.len())
        }
        Err(e) => Err(e.into()),
    }
}

async fn submit_graph(config: ClientConfig, path: &Path, wait: Option<Duration>) -> anyhow::Result<()> {
    let mut graph = load_graph(path)?;
    let mut workstation = connect(config)?;
    let started = workstation.submit_pipeline(&mut graph).await?;
    println!("Started batch job {}", started.job_id);

    let Some(timeout) = wait else {
        return Ok(());
    };
    let status = workstation
        .wait_for_batch(&started.job_id, Duration::from_secs(1), timeout, |status| {
            println!(
                "  {} {}/{} processed, {} failed",
                status.status, status.processed, status.total, status.failed
            );
        })
        .await?;
    for error in &status.errors {
        println!("  error: {}", error);
    }
    println!("Output written to {}", status.output_folder);
    Ok(())
}
