//! CLI entry point for cothink

mod chat;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use cothink_agent::{ChatController, SendOutcome};
use cothink_core::config::{expand_tilde, ChatConfig, Config, ConfigLoader};
use cothink_core::logging::init_logging;
use cothink_core::persona::PersonaRegistry;
use cothink_core::session::{ConversationStore, FileStore};
use cothink_providers::{OpenRouterClient, RelayClient, UpstreamChat};
use cothink_relay::{run_server, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cothink")]
#[command(about = "Chat with several AI personas in one shared conversation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay service
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Start an interactive chat
    Chat {
        /// Persona to talk to
        #[arg(short, long)]
        persona: Option<String>,
        /// Ask for 2-3 sentence replies
        #[arg(short, long)]
        concise: bool,
    },
    /// Send one message and print the reply
    Send {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Persona to talk to
        #[arg(short, long)]
        persona: Option<String>,
        /// Ask for 2-3 sentence replies
        #[arg(short, long)]
        concise: bool,
    },
    /// Rewrite a previous message and regenerate the reply
    Edit {
        /// Id of the user message to rewrite
        id: u64,
        /// Replacement text
        #[arg(short, long)]
        message: String,
    },
    /// Show the persisted conversation
    History,
    /// Start a fresh conversation
    Clear,
    /// List available personas
    Personas,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };
    let config = config_loader.load()?;
    let _log_guard = init_logging(&config.logging);

    match cli.command {
        Commands::Serve { port } => {
            info!("Starting relay");
            run_serve(&config, port).await?;
        }
        Commands::Chat { persona, concise } => {
            let controller = build_controller(&config.chat, persona, concise)?;
            chat::run_repl(&controller).await?;
        }
        Commands::Send {
            message,
            persona,
            concise,
        } => {
            let controller = build_controller(&config.chat, persona, concise)?;
            println!("{}", style("Processing...").cyan());
            let outcome = controller.send(&message).await;
            chat::print_outcome(&controller, &outcome);
        }
        Commands::Edit { id, message } => {
            let controller = build_controller(&config.chat, None, false)?;
            println!("{}", style("Processing...").cyan());
            if message.trim().is_empty() {
                anyhow::bail!("replacement text must not be empty");
            }
            let outcome = controller.edit_and_regenerate(id, &message).await;
            if outcome == SendOutcome::Ignored {
                anyhow::bail!("no user message with id {}", id);
            }
            chat::print_outcome(&controller, &outcome);
        }
        Commands::History => {
            let store = open_store(&config.chat);
            let personas = PersonaRegistry::new();
            for message in store.messages() {
                chat::print_message(&personas, message);
            }
        }
        Commands::Clear => {
            let mut store = open_store(&config.chat);
            store.reset();
            if !store.is_saved() {
                anyhow::bail!("conversation was cleared but could not be saved, see the log");
            }
            println!("{}", style("Conversation cleared.").green());
        }
        Commands::Personas => {
            chat::print_personas(&PersonaRegistry::new(), &config.chat.default_persona);
        }
    }

    Ok(())
}

fn open_store(config: &ChatConfig) -> ConversationStore {
    let backend = FileStore::new(expand_tilde(&config.data_dir));
    ConversationStore::open(Box::new(backend), config.session_key.clone())
}

fn build_controller(
    config: &ChatConfig,
    persona: Option<String>,
    concise: bool,
) -> Result<ChatController> {
    let personas = PersonaRegistry::new();
    let relay = RelayClient::new(config.relay_url.clone(), personas.clone());
    let persona = persona.unwrap_or_else(|| config.default_persona.clone());

    let controller = ChatController::new(
        open_store(config),
        Arc::new(relay),
        personas,
        &persona,
        config.history_limit,
    )?;
    controller.set_concise(concise || config.concise_mode);
    Ok(controller)
}

async fn run_serve(config: &Config, port: Option<u16>) -> Result<()> {
    let mut relay_config = config.relay.clone();
    if let Some(port) = port {
        relay_config.port = port;
    }

    let upstream = OpenRouterClient::new(&relay_config.upstream);
    if !upstream.has_api_key() {
        warn!("OPENROUTER_API_KEY is not set, chat requests will be rejected");
    }
    let state = AppState::new(
        Arc::new(upstream),
        PersonaRegistry::new(),
        config.prompt.clone(),
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let server_config = relay_config.clone();
    let mut server =
        tokio::spawn(async move { run_server(state, &server_config, shutdown_rx).await });

    println!(
        "{} http://{}:{}{}",
        style("Relay is running at").green(),
        relay_config.host,
        relay_config.port,
        relay_config.route
    );
    println!("{}", style("Press Ctrl+C to stop.").dim());

    tokio::select! {
        result = &mut server => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\n{}", style("Shutting down...").yellow());
            let _ = shutdown_tx.send(());
            server.await??;
            println!("{}", style("Relay stopped.").green());
        }
    }

    Ok(())
}
