//! The channel adapter contract: normalizing platform-native events into
//! [`crate::command::Request`]s and filtering bot-mentions before either the
//! inbound bus or the dispatcher sees them (spec §4.8).
//!
//! Concrete network I/O (teloxide long-polling, the Baileys HTTP bridge) is
//! out of scope; this module implements the adapter-facing *logic* plus a
//! thin shell per transport showing how a real adapter would wire it in.

pub mod telegram;
pub mod whatsapp;

use async_trait::async_trait;

/// Converts platform-native events into [`crate::command::Request`]s and
/// supplies the reply closure bound to the originating message.
///
/// Implementations must not consume generic slash commands themselves:
/// every normalized request is both forwarded onto the inbound bus and
/// handed to the dispatcher, in parallel (spec §4.8).
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// This adapter's channel name, e.g. `"telegram"`.
    fn channel_name(&self) -> &str;

    /// Send `text` back to `chat_id` on this channel.
    async fn send(&self, chat_id: &str, text: &str) -> anyhow::Result<()>;
}

/// Whether a `bot_command` entity targeting `mentioned` (the `@name` suffix,
/// if any) should be treated as addressed to this bot (spec §4.8 "Telegram-
/// specific rule").
///
/// An unqualified command (no `@name` suffix) always forwards. A command
/// qualified with this bot's own username forwards. A command qualified
/// with any other username is filtered out before both bus forwarding and
/// dispatch.
pub fn command_targets_this_bot(mentioned: Option<&str>, own_username: &str) -> bool {
    match mentioned {
        None => true,
        Some(name) => name == own_username,
    }
}

/// Split a raw `bot_command` token (as it appears after the leading `/`,
/// e.g. `"help@my_bot"`) into its bare command and the `@`-qualified
/// username, if present.
pub fn split_mention(token: &str) -> (&str, Option<&str>) {
    match token.split_once('@') {
        Some((cmd, user)) => (cmd, Some(user)),
        None => (token, None),
    }
}
