//! PicoClaw CLI entry point: `run` the agent loop, or inspect/prune session
//! backlogs with `sessions list` / `sessions prune` (spec §2 "CLI entrypoint").

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use picoclaw::bus::Bus;
use picoclaw::channel::telegram::TelegramAdapter;
use picoclaw::channel::whatsapp::WhatsAppAdapter;
use picoclaw::channel::ChannelAdapter;
use picoclaw::command::{self, Outcome, Registry, Request, Runtime};
use picoclaw::config::Config;
use picoclaw::logging;
use picoclaw::session::SessionManager;

/// PicoClaw — a multi-channel personal agent.
#[derive(Parser)]
#[command(name = "picoclaw", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the agent loop: dispatch inbound messages against the built-in
    /// commands and relay replies to the configured channel adapters.
    Run,
    /// Inspect or prune a scope's persisted session backlog.
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
}

/// `sessions` subcommands.
#[derive(Subcommand)]
enum SessionsAction {
    /// List sessions for a scope, most recent first.
    List {
        /// Scope key sessions are grouped under, e.g. `telegram:123`.
        #[arg(long)]
        scope: String,
    },
    /// Drop a scope's oldest sessions down to `limit`.
    Prune {
        /// Scope key sessions are grouped under.
        #[arg(long)]
        scope: String,
        /// Number of most-recent sessions to keep.
        #[arg(long)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run => run().await,
        Command::Sessions { action } => sessions(action).await,
    }
}

/// Build channel adapters for every channel enabled in `config`, skipping
/// any whose credentials aren't present in the environment.
fn build_adapters(config: &Config) -> HashMap<String, Arc<dyn ChannelAdapter>> {
    let mut adapters: HashMap<String, Arc<dyn ChannelAdapter>> = HashMap::new();

    let telegram_enabled = config.channels.get("telegram").is_some_and(|c| c.enabled);
    if telegram_enabled {
        match (std::env::var("PICOCLAW_TELEGRAM_BOT_TOKEN"), std::env::var("PICOCLAW_TELEGRAM_BOT_USERNAME")) {
            (Ok(token), Ok(username)) => {
                adapters.insert("telegram".to_owned(), Arc::new(TelegramAdapter::new(token, username)));
            }
            _ => warn!("telegram channel enabled but PICOCLAW_TELEGRAM_BOT_TOKEN/PICOCLAW_TELEGRAM_BOT_USERNAME are not set"),
        }
    }

    let whatsapp_enabled = config.channels.get("whatsapp").is_some_and(|c| c.enabled);
    if whatsapp_enabled {
        let base_url = std::env::var("PICOCLAW_WHATSAPP_BRIDGE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", picoclaw::channel::whatsapp::DEFAULT_BRIDGE_PORT));
        adapters.insert("whatsapp".to_owned(), Arc::new(WhatsAppAdapter::new(base_url)));
    }

    adapters
}

/// Build a [`Request`] for the dispatcher from an inbound bus message,
/// binding its reply closure to whichever channel adapter handles delivery.
fn request_from_bus(msg: picoclaw::bus::BusMessage, adapter: Option<Arc<dyn ChannelAdapter>>) -> Request {
    let chat_id = msg.chat_id;
    let reply: Option<command::ReplyFn> = adapter.map(|adapter| {
        let chat_id = chat_id.clone();
        Arc::new(move |text: String| {
            let adapter = Arc::clone(&adapter);
            let chat_id = chat_id.clone();
            Box::pin(async move { adapter.send(&chat_id, &text).await })
                as std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>>
        }) as command::ReplyFn
    });

    Request {
        channel: msg.channel,
        chat_id,
        sender_id: msg.sender_id,
        message_id: msg.message_id,
        text: msg.content,
        reply,
    }
}

/// Run the agent loop until interrupted.
async fn run() -> anyhow::Result<()> {
    let config_path = Config::resolve_path();
    let config = Config::load(&config_path).await.with_context(|| format!("failed to load {}", config_path.display()))?;

    let logs_dir = std::env::current_dir().context("failed to resolve current directory")?.join("logs");
    let _logging_guard = logging::init_production(&logs_dir)?;

    info!(config = %config_path.display(), "picoclaw starting");

    let session_manager = Arc::new(SessionManager::open(config.session.storage_dir.clone()).await?);
    let session_ops: Arc<dyn command::SessionOps> = session_manager;
    let registry = Registry::new(command::builtin_commands());
    let runtime_config = config.runtime_view();
    let adapters = build_adapters(&config);

    if adapters.is_empty() {
        warn!("no channel adapters configured; set channels.<name>.enabled = true and the matching credentials");
    }

    let mut bus = Bus::default();
    let cancel = CancellationToken::new();

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown.cancel();
        }
    });

    info!("picoclaw ready -- listening for inbound messages");

    while let Some(msg) = bus.consume_inbound(&cancel).await {
        let channel = msg.channel.clone();
        let adapter = adapters.get(&channel).cloned();
        let runtime = Runtime {
            channel: channel.clone(),
            scope: format!("{channel}:{}", msg.chat_id),
            session_ops: Arc::clone(&session_ops),
            config: Some(runtime_config.clone()),
        };
        let request = request_from_bus(msg, adapter);

        match command::execute(Some(&registry), Some(runtime), &request).await {
            Outcome::Handled { command, error: Some(err) } => {
                warn!(%command, error = %err, "command handler returned an error");
            }
            Outcome::Handled { command, error: None } => {
                info!(%command, "command handled");
            }
            Outcome::Rejected { command, reply } => {
                info!(%command, %channel, "command rejected on channel");
                if let Some(reply_fn) = &request.reply {
                    let _ = reply_fn(reply).await;
                }
            }
            Outcome::Passthrough { command: None } => {
                let _ = bus.publish_outbound(picoclaw::bus::BusMessage {
                    channel: request.channel,
                    chat_id: request.chat_id,
                    sender_id: request.sender_id,
                    content: request.text,
                    message_id: request.message_id,
                    metadata: None,
                });
            }
            Outcome::Passthrough { command: Some(name) } => {
                info!(command = %name, "unknown or channel-ineligible command, passed through");
            }
        }
    }

    info!("picoclaw shutting down");
    Ok(())
}

/// Run a one-shot `sessions` subcommand.
async fn sessions(action: SessionsAction) -> anyhow::Result<()> {
    logging::init_cli();

    let config_path = Config::resolve_path();
    let config = Config::load(&config_path).await.with_context(|| format!("failed to load {}", config_path.display()))?;
    let manager = SessionManager::open(config.session.storage_dir.clone()).await?;

    match action {
        SessionsAction::List { scope } => {
            let summaries = manager.list(&scope).await.context("failed to list sessions")?;
            if summaries.is_empty() {
                println!("No sessions found for scope {scope:?}.");
                return Ok(());
            }
            for summary in &summaries {
                let mark = if summary.active { "*" } else { " " };
                let updated =
                    summary.updated.map_or_else(|| "-".to_owned(), |dt| dt.format("%Y-%m-%d %H:%M").to_string());
                println!(
                    "{}. [{mark}] {} ({} msgs, updated {updated})",
                    summary.ordinal, summary.key, summary.message_count
                );
            }
        }
        SessionsAction::Prune { scope, limit } => {
            let deleted = manager.prune(&scope, limit).await.context("failed to prune sessions")?;
            println!("Pruned {} session(s) from scope {scope:?}.", deleted.len());
        }
    }

    Ok(())
}
