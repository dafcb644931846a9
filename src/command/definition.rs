//! Command definitions and the registry that holds them (spec §3 "Command
//! Definition", §4.2 "Registry").

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::runtime::Runtime;

/// A handler's return type: the user-facing reply, or an error to surface
/// back to the caller as `Outcome::Handled`'s `error` field.
pub type HandlerResult = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send>>;

/// A command handler: given the invoking runtime and the raw argument tail
/// (everything after the command token), produce a reply.
pub type HandlerFn = Arc<dyn Fn(Option<Runtime>, String) -> HandlerResult + Send + Sync>;

/// An immutable command registry entry (spec §3 "Command Definition").
///
/// A definition without a `handler` is a passthrough placeholder: it
/// reserves the name without consuming it, so `/name` still shows up in
/// `/help` but always falls through to the LLM tool loop.
#[derive(Clone)]
pub struct Command {
    /// Canonical, case-sensitive name (without the leading `/`).
    pub name: String,
    /// Additional case-sensitive names that resolve to this command.
    pub aliases: Vec<String>,
    /// Short usage string shown in `/help`, e.g. `"/session [list|resume <index>]"`.
    pub usage: String,
    /// One-line description shown in `/help`.
    pub description: String,
    /// Channels this command is available on. Empty means all channels.
    pub channels: Vec<String>,
    /// The handler invoked on a match, or `None` for a passthrough placeholder.
    pub handler: Option<HandlerFn>,
}

impl Command {
    /// Whether this command is visible/available on `channel`.
    pub fn available_on(&self, channel: &str) -> bool {
        self.channels.is_empty() || self.channels.iter().any(|c| c == channel)
    }

    /// Whether `token` matches this command's name or one of its aliases.
    pub fn matches(&self, token: &str) -> bool {
        self.name == token || self.aliases.iter().any(|a| a == token)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("usage", &self.usage)
            .field("description", &self.description)
            .field("channels", &self.channels)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// An ordered, declaration-preserving sequence of [`Command`] definitions
/// (spec §4.2 "Registry").
#[derive(Debug, Clone, Default)]
pub struct Registry {
    commands: Vec<Command>,
}

impl Registry {
    /// Build a registry from an ordered sequence of definitions.
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// All definitions, in declaration order.
    pub fn all(&self) -> &[Command] {
        &self.commands
    }

    /// Definitions available on `channel` (empty whitelist or containing
    /// `channel`), preserving declaration order.
    pub fn for_channel(&self, channel: &str) -> Vec<&Command> {
        self.commands.iter().filter(|c| c.available_on(channel)).collect()
    }

    /// First definition (across all channels) whose name or alias is
    /// `token`, preserving declaration order.
    pub fn find(&self, token: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.matches(token))
    }
}
