mod entity_commands;
mod init_commands;

use std::{path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    serde_json::Value,
    sleuth_config::SleuthConfig,
    sleuth_entities::BuiltinSource,
    sleuth_plugins::Registry,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::{entity_commands::LsAction, init_commands::Scaffold};

#[derive(Parser)]
#[command(name = "sleuth", about = "Sleuth: entity plugins for graph investigations")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Config file to load instead of discovering one.
    #[arg(long, global = true, env = "SLEUTH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the plugin service (default when no subcommand is provided).
    Start,
    /// Scaffold a new plugin source file.
    Init {
        /// Human label of the new entity, e.g. "Phone Number".
        label: String,
        #[arg(long)]
        description: Option<String>,
        /// Author name; repeat for several authors.
        #[arg(long = "author")]
        authors: Vec<String>,
        /// Target directory (defaults to `plugins.dir`).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Catalog introspection.
    Ls {
        #[command(subcommand)]
        action: LsAction,
    },
    /// Run one transform and print the produced blueprints.
    Run {
        entity: String,
        transform: String,
        /// Raw input as a JSON object keyed by element label or field name.
        #[arg(long, default_value = "{}")]
        input: String,
    },
    /// Print blueprint templates of one or all entities.
    Blueprints { entity: Option<String> },
}

/// Initialise tracing. Logs go to stderr so command output on stdout stays
/// machine-readable.
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

fn load_config(cli: &Cli) -> anyhow::Result<SleuthConfig> {
    let mut config = match &cli.config {
        Some(path) => sleuth_config::load_config(path)?,
        None => sleuth_config::discover_and_load(),
    };
    if let Some(bind) = &cli.bind {
        config.server.bind.clone_from(bind);
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = load_config(&cli)?;
    let source = BuiltinSource::new(config.plugins.clone());

    match cli.command {
        None | Some(Commands::Start) => {
            info!(version = env!("CARGO_PKG_VERSION"), "sleuth starting");
            sleuth_gateway::start_server(&config, Arc::new(source)).await
        },
        Some(Commands::Init {
            label,
            description,
            authors,
            dir,
        }) => {
            let dir = dir.unwrap_or_else(|| config.plugins.dir.clone());
            let path = Scaffold {
                label,
                description,
                authors,
            }
            .write_to(&dir)?;
            println!("Created {}", path.display());
            Ok(())
        },
        Some(Commands::Ls { action }) => {
            print_json(&entity_commands::list(&Registry::load(&source), &action)?)
        },
        Some(Commands::Run {
            entity,
            transform,
            input,
        }) => {
            let registry = Registry::load(&source);
            let out = entity_commands::run(&registry, &config, &entity, &transform, &input).await?;
            print_json(&out)
        },
        Some(Commands::Blueprints { entity }) => print_json(&entity_commands::blueprints(
            &Registry::load(&source),
            entity.as_deref(),
        )?),
    }
}
