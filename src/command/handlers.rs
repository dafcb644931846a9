//! Built-in commands backed by the [`Runtime`] capability bundle
//! (spec §4.4 "Runtime Handlers").

use std::sync::Arc;

use super::definition::Command;
use super::runtime::{Runtime, UNAVAILABLE_REPLY};

/// Metadata for the commands rendered by [`handle_help`]. Not derived from
/// the registry: the registry is assembled from this same table, so
/// render-from-registry would be circular. Kept as a flat table, same shape
/// as the channel whitelist each [`Command`] carries.
const BUILTIN: &[(&str, &str, &str, &[&str])] = &[
    ("start", "/start", "show a welcome message", &[]),
    ("help", "/help", "list available commands", &[]),
    ("new", "/new", "start a new session, pruning old ones", &[]),
    (
        "session",
        "/session [list|resume <index>]",
        "list or resume past sessions",
        &[],
    ),
    (
        "show",
        "/show [model|channel]",
        "show the current model/provider or channel",
        &["telegram"],
    ),
    (
        "list",
        "/list [models|channels]",
        "list configured models or enabled channels",
        &["telegram"],
    ),
];

const GREETING: &str = "Hi, I'm PicoClaw. Send /help to see what I can do.";

/// Fall back to `/new`'s default prune target when no configuration is
/// wired up.
const DEFAULT_BACKLOG_LIMIT: i64 = 20;

fn usable_runtime(runtime: Option<Runtime>) -> Option<Runtime> {
    runtime.filter(Runtime::is_usable)
}

/// `/start` — fixed greeting.
pub async fn handle_start(runtime: Option<Runtime>, _args: String) -> anyhow::Result<String> {
    let Some(_runtime) = usable_runtime(runtime) else {
        return Ok(UNAVAILABLE_REPLY.to_owned());
    };
    Ok(GREETING.to_owned())
}

/// `/help` — one `"<usage> - <description>"` line per channel-visible
/// built-in, newline separated (spec §4.4 and §6 "Help format").
pub async fn handle_help(runtime: Option<Runtime>, _args: String) -> anyhow::Result<String> {
    let Some(runtime) = usable_runtime(runtime) else {
        return Ok(UNAVAILABLE_REPLY.to_owned());
    };
    let lines: Vec<String> = BUILTIN
        .iter()
        .filter(|(_, _, _, channels)| channels.is_empty() || channels.contains(&runtime.channel.as_str()))
        .map(|(_, usage, description, _)| format!("{usage} - {description}"))
        .collect();
    if lines.is_empty() {
        Ok("No commands available.".to_owned())
    } else {
        Ok(lines.join("\n"))
    }
}

/// `/new` (alias `reset`) — start a new session and prune the backlog
/// (spec §4.4).
pub async fn handle_new(runtime: Option<Runtime>, _args: String) -> anyhow::Result<String> {
    let Some(runtime) = usable_runtime(runtime) else {
        return Ok(UNAVAILABLE_REPLY.to_owned());
    };

    let key = match runtime.session_ops.start_new(&runtime.scope).await {
        Ok(key) => key,
        Err(e) => return Ok(format!("Failed to start new session: {e}")),
    };

    let limit = runtime.config.as_ref().map_or(DEFAULT_BACKLOG_LIMIT, |c| c.backlog_limit);
    match runtime.session_ops.prune(&runtime.scope, limit).await {
        Ok(pruned) if pruned.is_empty() => Ok(format!("Started new session: {key}")),
        Ok(pruned) => Ok(format!("Started new session: {key} (pruned {} old session(s))", pruned.len())),
        Err(e) => Ok(format!("Started new session ({key}), but pruning old sessions failed: {e}")),
    }
}

const SESSION_USAGE: &str = "Usage: /session [list|resume <index>]";
const SESSION_RESUME_USAGE: &str = "Usage: /session resume <index>";

/// `/session [list|resume <index>]` (spec §4.4).
pub async fn handle_session(runtime: Option<Runtime>, args: String) -> anyhow::Result<String> {
    let Some(runtime) = usable_runtime(runtime) else {
        return Ok(UNAVAILABLE_REPLY.to_owned());
    };

    let mut tokens = args.split_whitespace();
    match tokens.next() {
        Some("list") => {
            let sessions = runtime.session_ops.list(&runtime.scope).await?;
            if sessions.is_empty() {
                return Ok("No sessions found for current chat.".to_owned());
            }
            let mut lines = vec!["Sessions for current chat:".to_owned()];
            for s in sessions {
                let mark = if s.active { "*" } else { " " };
                let updated = s.updated.map_or_else(|| "-".to_owned(), |dt| dt.format("%Y-%m-%d %H:%M").to_string());
                lines.push(format!(
                    "{}. [{mark}] {} ({} msgs, updated {updated})",
                    s.ordinal, s.key, s.message_count
                ));
            }
            Ok(lines.join("\n"))
        }
        Some("resume") => {
            let Some(raw_idx) = tokens.next() else {
                return Ok(SESSION_RESUME_USAGE.to_owned());
            };
            let Ok(idx) = raw_idx.parse::<i64>() else {
                return Ok(SESSION_RESUME_USAGE.to_owned());
            };
            if idx < 1 {
                return Ok(SESSION_RESUME_USAGE.to_owned());
            }
            match runtime.session_ops.resume(&runtime.scope, idx).await {
                Ok(key) => Ok(format!("Resumed session: {key}")),
                Err(e) => Ok(format!("Failed to resume session: {e}")),
            }
        }
        _ => Ok(SESSION_USAGE.to_owned()),
    }
}

const SHOW_USAGE: &str = "Usage: /show [model|channel]";

/// `/show [model|channel]` — telegram-only (spec §4.4).
pub async fn handle_show(runtime: Option<Runtime>, args: String) -> anyhow::Result<String> {
    let Some(runtime) = usable_runtime(runtime) else {
        return Ok(UNAVAILABLE_REPLY.to_owned());
    };
    let Some(config) = &runtime.config else {
        return Ok(UNAVAILABLE_REPLY.to_owned());
    };

    match args.split_whitespace().next() {
        Some("model") => Ok(format!("Model: {} ({})", config.default_model, config.default_provider)),
        Some("channel") => Ok(format!("Channel: {}", runtime.channel)),
        Some(other) => Ok(format!("Unknown parameter: {other}. Try 'model' or 'channel'.")),
        None => Ok(SHOW_USAGE.to_owned()),
    }
}

const LIST_USAGE: &str = "Usage: /list [models|channels]";

/// `/list [models|channels]` — telegram-only (spec §4.4).
pub async fn handle_list(runtime: Option<Runtime>, args: String) -> anyhow::Result<String> {
    let Some(runtime) = usable_runtime(runtime) else {
        return Ok(UNAVAILABLE_REPLY.to_owned());
    };
    let Some(config) = &runtime.config else {
        return Ok(UNAVAILABLE_REPLY.to_owned());
    };

    match args.split_whitespace().next() {
        Some("models") => Ok(format!(
            "Model: {} ({})\nTo change models, update config.json",
            config.default_model, config.default_provider
        )),
        Some("channels") => {
            let enabled: Vec<_> = config.enabled_channels.iter().filter(|(_, on)| *on).collect();
            if enabled.is_empty() {
                return Ok("No channels enabled.".to_owned());
            }
            let mut lines = vec!["Enabled channels:".to_owned()];
            lines.extend(enabled.into_iter().map(|(name, _)| format!("- {name}")));
            Ok(lines.join("\n"))
        }
        Some(other) => Ok(format!("Unknown parameter: {other}. Try 'models' or 'channels'.")),
        None => Ok(LIST_USAGE.to_owned()),
    }
}

/// The full set of built-in commands, in the declaration order used by
/// `/help` and by channel-eligibility scans (spec §2 component table).
pub fn builtin_commands() -> Vec<Command> {
    let channels = |names: &[&str]| -> Vec<String> { names.iter().map(|s| (*s).to_owned()).collect() };

    let mut commands = Vec::with_capacity(BUILTIN.len());
    for (name, usage, description, whitelist) in BUILTIN {
        let handler = match *name {
            "start" => Some(wrap(handle_start)),
            "help" => Some(wrap(handle_help)),
            "new" => Some(wrap(handle_new)),
            "session" => Some(wrap(handle_session)),
            "show" => Some(wrap(handle_show)),
            "list" => Some(wrap(handle_list)),
            _ => None,
        };
        let aliases = if *name == "new" { vec!["reset".to_owned()] } else { vec![] };
        commands.push(Command {
            name: (*name).to_owned(),
            aliases,
            usage: (*usage).to_owned(),
            description: (*description).to_owned(),
            channels: channels(whitelist),
            handler,
        });
    }
    commands
}

fn wrap<F, Fut>(f: F) -> super::definition::HandlerFn
where
    F: Fn(Option<Runtime>, String) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = anyhow::Result<String>> + Send + 'static,
{
    Arc::new(move |rt, args| Box::pin(f(rt, args)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionManager;

    async fn test_runtime(scope: &str) -> Runtime {
        let mgr = Arc::new(SessionManager::open("").await.unwrap());
        Runtime {
            channel: "telegram".to_owned(),
            scope: scope.to_owned(),
            session_ops: mgr,
            config: None,
        }
    }

    #[tokio::test]
    async fn missing_runtime_yields_unavailable_reply() {
        let reply = handle_start(None, String::new()).await.unwrap();
        assert_eq!(reply, UNAVAILABLE_REPLY);
    }

    #[tokio::test]
    async fn empty_scope_yields_unavailable_reply() {
        let mgr = Arc::new(SessionManager::open("").await.unwrap());
        let runtime = Runtime { channel: "telegram".to_owned(), scope: "  ".to_owned(), session_ops: mgr, config: None };
        let reply = handle_help(Some(runtime), String::new()).await.unwrap();
        assert_eq!(reply, UNAVAILABLE_REPLY);
    }

    #[tokio::test]
    async fn help_omits_telegram_only_commands_on_other_channels() {
        let mgr = Arc::new(SessionManager::open("").await.unwrap());
        let runtime = Runtime { channel: "whatsapp".to_owned(), scope: "s".to_owned(), session_ops: mgr, config: None };
        let reply = handle_help(Some(runtime), String::new()).await.unwrap();
        assert!(!reply.contains("/show"));
        assert!(reply.contains("/help"));
    }

    #[tokio::test]
    async fn new_reports_no_prune_when_nothing_was_pruned() {
        let runtime = test_runtime("S").await;
        let reply = handle_new(Some(runtime), String::new()).await.unwrap();
        assert!(reply.starts_with("Started new session: S#2"));
        assert!(!reply.contains("pruned"));
    }

    #[tokio::test]
    async fn session_list_reports_empty_scope() {
        let runtime = test_runtime("S").await;
        let reply = handle_session(Some(runtime), "list".to_owned()).await.unwrap();
        assert_eq!(reply, "No sessions found for current chat.");
    }

    #[tokio::test]
    async fn session_resume_rejects_non_numeric_index() {
        let runtime = test_runtime("S").await;
        let reply = handle_session(Some(runtime), "resume abc".to_owned()).await.unwrap();
        assert_eq!(reply, SESSION_RESUME_USAGE);
    }

    #[tokio::test]
    async fn session_resume_reports_out_of_range_index_as_a_reply() {
        let runtime = test_runtime("S").await;
        let reply = handle_session(Some(runtime), "resume 2".to_owned()).await.unwrap();
        assert!(reply.starts_with("Failed to resume session:"), "unexpected reply: {reply}");
    }

    #[tokio::test]
    async fn session_with_no_args_shows_usage() {
        let runtime = test_runtime("S").await;
        let reply = handle_session(Some(runtime), String::new()).await.unwrap();
        assert_eq!(reply, SESSION_USAGE);
    }

    #[tokio::test]
    async fn show_without_config_is_unavailable() {
        let runtime = test_runtime("S").await;
        let reply = handle_show(Some(runtime), "model".to_owned()).await.unwrap();
        assert_eq!(reply, UNAVAILABLE_REPLY);
    }

    #[tokio::test]
    async fn show_unknown_parameter_is_reported() {
        let mgr = Arc::new(SessionManager::open("").await.unwrap());
        let runtime = Runtime {
            channel: "telegram".to_owned(),
            scope: "S".to_owned(),
            session_ops: mgr,
            config: Some(super::super::runtime::RuntimeConfig {
                default_provider: "anthropic".to_owned(),
                default_model: "claude".to_owned(),
                backlog_limit: 5,
                enabled_channels: vec![],
            }),
        };
        let reply = handle_show(Some(runtime), "frobnicate".to_owned()).await.unwrap();
        assert_eq!(reply, "Unknown parameter: frobnicate. Try 'model' or 'channel'.");
    }

    #[tokio::test]
    async fn builtin_commands_has_one_entry_per_table_row() {
        assert_eq!(builtin_commands().len(), BUILTIN.len());
    }
}
