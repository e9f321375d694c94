use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use waypoint_core::config::AppConfig;
use waypoint_core::types::StateMap;
use waypoint_engine::{WorkflowCatalog, WorkflowEngine};
use waypoint_gateway::GatewayServer;
use waypoint_tools::ToolRegistry;

const DEFAULT_CONFIG: &str = "waypoint.toml";

#[derive(Parser)]
#[command(name = "waypoint", version, about = "In-memory workflow graph engine")]
struct Cli {
    /// Path to config file [default: waypoint.toml, used only if present]
    #[arg(short, long, env = "WAYPOINT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway (default)
    Serve {
        /// Override the bind address from config
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run a workflow template once and print the run as JSON
    Run {
        /// Workflow template name
        workflow: String,
        /// Initial state as a JSON object
        #[arg(long, conflicts_with = "state_file")]
        state: Option<String>,
        /// Read the initial state from a JSON file
        #[arg(long)]
        state_file: Option<PathBuf>,
    },
    /// List workflow templates and their nodes
    Workflows,
    /// Show the effective configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "waypoint", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .init();

    let catalog = Arc::new(WorkflowCatalog::with_builtins());
    let tools = Arc::new(ToolRegistry::with_builtins().with_default_timeout(config.tools.timeout_secs));
    let engine = Arc::new(WorkflowEngine::new(tools));

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => {
            preload_graphs(&engine, &catalog, &config);

            let mut gateway_config = config.gateway.clone();
            if let Some(bind) = bind {
                gateway_config.bind = bind;
            }

            let shutdown = CancellationToken::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown requested");
                    signal.cancel();
                }
            });

            GatewayServer::new(gateway_config, engine, catalog)
                .run(shutdown)
                .await?;
        }
        Commands::Run {
            workflow,
            state,
            state_file,
        } => {
            let initial = match (state, state_file) {
                (Some(raw), _) => parse_state(&raw)?,
                (None, Some(path)) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    parse_state(&raw)?
                }
                (None, None) => StateMap::new(),
            };

            engine.register_workflow(&catalog, workflow.as_str(), &workflow)?;
            let run = engine.run_graph(&workflow, Some(initial)).await?;
            println!("{}", serde_json::to_string_pretty(&run)?);
        }
        Commands::Workflows => {
            for name in catalog.names() {
                let graph = catalog.build(name)?;
                println!("{} (start: {})", name, graph.start_node());
                for key in graph.node_keys() {
                    println!("  - {}", key);
                }
            }
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Completions { .. } => unreachable!("handled before config loading"),
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    // An explicit path must exist; the default one may be absent.
    let config = match path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_default(Path::new(DEFAULT_CONFIG))?,
    };
    Ok(config)
}

fn preload_graphs(engine: &WorkflowEngine, catalog: &WorkflowCatalog, config: &AppConfig) {
    for entry in &config.engine.preload {
        if engine.has_graph(&entry.graph_id) {
            continue;
        }
        match engine.register_workflow(catalog, entry.graph_id.as_str(), &entry.workflow) {
            Ok(_) => info!(graph_id = %entry.graph_id, workflow = %entry.workflow, "Preloaded graph"),
            Err(e) => warn!(graph_id = %entry.graph_id, error = %e, "Skipping preload"),
        }
    }
}

fn parse_state(raw: &str) -> anyhow::Result<StateMap> {
    match serde_json::from_str::<serde_json::Value>(raw).context("parsing initial state")? {
        serde_json::Value::Object(map) => Ok(map),
        other => anyhow::bail!("initial state must be a JSON object, got {}", other),
    }
}
