use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use vignette_forge::agent_core::{
    ConversationEngine, EngineEvent, EngineState, MessageKind, SelectionPolicy, VignetteDatabase,
};
use vignette_forge::commands::generate::{generate_vignette, GenerateRequest};
use vignette_forge::commands::history::list_vignettes;
use vignette_forge::commands::Caller;
use vignette_forge::inference::config::{find_config_path, load_config};
use vignette_forge::inference::InferenceClient;

#[derive(Parser)]
#[command(name = "vignette-forge")]
#[command(about = "Generate USMLE-style clinical vignettes with a panel of agents", long_about = None)]
struct Cli {
    /// Path to config.yaml (default: $VIGNETTE_FORGE_CONFIG, then search upward)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the database and logs (default: platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Write logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a generation session and save the result
    Generate {
        /// Clinical topic, e.g. "Multiple Sclerosis"
        #[arg(long)]
        topic: String,
        /// Owner id issued by the authentication layer
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        max_rounds: Option<u32>,
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
    },
    /// List saved vignettes, most recent first
    List {
        #[arg(long)]
        owner: Option<String>,
    },
    /// Check that the active model endpoint is reachable
    Health,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    RoundRobin,
    Adaptive,
}

impl From<PolicyArg> for SelectionPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::RoundRobin => SelectionPolicy::RoundRobin,
            PolicyArg::Adaptive => SelectionPolicy::Adaptive,
        }
    }
}

fn caller(owner: Option<String>) -> Caller {
    match owner {
        Some(owner_id) => Caller::Authenticated { owner_id },
        None => Caller::Anonymous,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = cli.data_dir.clone().unwrap_or_else(vignette_forge::data_dir);
    vignette_forge::init_tracing(&data_dir, cli.json_logs)
        .with_context(|| format!("failed to initialize logging in {}", data_dir.display()))?;

    let db_path = vignette_forge::resolve_db_path(&data_dir);

    match cli.command {
        Commands::Generate {
            topic,
            owner,
            max_rounds,
            policy,
        } => {
            let config_path = match &cli.config {
                Some(path) => path.clone(),
                None => find_config_path(&std::env::current_dir()?)?,
            };
            let config = load_config(&config_path)?;
            tracing::info!(config = %config_path.display(), model = %config.active_model, "config loaded");

            let client = Arc::new(InferenceClient::from_config(config.clone())?);
            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<EngineEvent>();
            let engine = ConversationEngine::from_config(&config.engine, client)?.with_events(tx);
            let store = Mutex::new(VignetteDatabase::open(&db_path)?);

            // Display is just another event subscriber
            let printer = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    if event.state.is_terminal() {
                        break;
                    }
                    if event.state != EngineState::Recording {
                        continue;
                    }
                    if let Some(message) = event.message {
                        let marker = match message.kind {
                            MessageKind::TurnFailure { .. } => " (failed)",
                            _ => "",
                        };
                        eprintln!(
                            "\n--- round {} · {}{marker} ---\n{}",
                            event.round, message.speaker_id, message.content
                        );
                    }
                }
            });

            let request = GenerateRequest {
                max_rounds,
                policy: policy.map(SelectionPolicy::from),
                ..GenerateRequest::new(topic)
            };
            let result = generate_vignette(&caller(owner), request, &engine, &store).await;

            // The printer stops at the terminal event, or when the channel closes
            drop(engine);
            let _ = printer.await;

            let generated = result?;
            eprintln!(
                "\nsaved vignette #{} ({}, {} rounds)\n",
                generated.id,
                generated.status.as_str(),
                generated.round_count
            );
            println!("{}", generated.final_vignette);
        }
        Commands::List { owner } => {
            let store = Mutex::new(VignetteDatabase::open(&db_path)?);
            let vignettes = list_vignettes(&caller(owner), &store)?;
            if vignettes.is_empty() {
                println!("no saved vignettes");
            }
            for v in vignettes {
                println!("#{:<5} {}  {}", v.id, v.created_at, v.topic);
            }
        }
        Commands::Health => {
            let config_path = match &cli.config {
                Some(path) => path.clone(),
                None => find_config_path(&std::env::current_dir()?)?,
            };
            let client = InferenceClient::from_config(load_config(&config_path)?)?;
            let healthy = client.health_check().await?;
            println!(
                "{}: {}",
                client.active_model_name(),
                if healthy { "reachable" } else { "unreachable" }
            );
        }
    }

    Ok(())
}
