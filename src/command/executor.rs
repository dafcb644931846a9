//! Three-way command execution outcome (spec §3 "Execution Outcome",
//! §4.3 "Executor").

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::definition::Registry;
use super::matcher::{argument_tail, parse_command};
use super::runtime::Runtime;

/// A reply closure bound to the message that triggered it. Handlers must
/// tolerate its absence (spec §3 "Request").
pub type ReplyFn = Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send + Sync>;

/// An inbound message normalized by a channel adapter (spec §3 "Request").
#[derive(Clone)]
pub struct Request {
    /// Channel the message arrived on, e.g. `"telegram"`.
    pub channel: String,
    /// Platform chat/conversation identifier.
    pub chat_id: String,
    /// Platform sender identifier.
    pub sender_id: String,
    /// Platform message identifier, when the transport provides one.
    pub message_id: Option<String>,
    /// Raw message text.
    pub text: String,
    /// Reply closure, or `None` if the adapter cannot reply (e.g. a system event).
    pub reply: Option<ReplyFn>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("channel", &self.channel)
            .field("chat_id", &self.chat_id)
            .field("sender_id", &self.sender_id)
            .field("message_id", &self.message_id)
            .field("text", &self.text)
            .field("reply", &self.reply.is_some())
            .finish()
    }
}

/// The result of dispatching a [`Request`] against a [`Registry`]
/// (spec §3 "Execution Outcome").
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The command was found, available on this channel, and had a
    /// handler, which ran. `error` carries the handler's error, if any.
    Handled {
        /// The matched command name.
        command: String,
        /// The handler's error, formatted, if it returned one.
        error: Option<String>,
    },
    /// The command is known but not available on this channel.
    Rejected {
        /// The matched command name.
        command: String,
        /// The exact user-facing rejection reply (spec §3 invariant).
        reply: String,
    },
    /// The message is not consumed by the dispatcher; it should proceed to
    /// the LLM tool loop. `command` is set when a command token was parsed
    /// but had no channel-eligible handler (a passthrough placeholder or an
    /// unknown name).
    Passthrough {
        /// The parsed command name, if any.
        command: Option<String>,
    },
}

/// Build the rejection reply for `name` on `channel` (spec §3 invariant,
/// exact string).
fn rejection_reply(name: &str, channel: &str) -> String {
    format!("Command /{name} is not supported on {channel}.")
}

/// Execute `request` against `registry` (spec §4.3).
///
/// `registry` is `None` to model "no dispatcher wired up" — every message
/// is Passthrough in that configuration. `runtime` is threaded through to
/// whichever handler ends up invoked, not consulted by the executor itself.
pub async fn execute(registry: Option<&Registry>, runtime: Option<Runtime>, request: &Request) -> Outcome {
    let Some(name) = parse_command(&request.text) else {
        return Outcome::Passthrough { command: None };
    };

    let Some(registry) = registry else {
        return Outcome::Passthrough { command: Some(name) };
    };

    let args = argument_tail(&request.text);

    if let Some(def) = registry.for_channel(&request.channel).into_iter().find(|c| c.matches(&name)) {
        return match &def.handler {
            Some(handler) => {
                let result = handler(runtime, args).await;
                match result {
                    Ok(reply_text) => {
                        if let Some(reply) = &request.reply {
                            let _ = reply(reply_text).await;
                        }
                        Outcome::Handled { command: name, error: None }
                    }
                    Err(e) => Outcome::Handled { command: name, error: Some(e.to_string()) },
                }
            }
            None => Outcome::Passthrough { command: Some(name) },
        };
    }

    if registry.find(&name).is_some() {
        return Outcome::Rejected {
            command: name.clone(),
            reply: rejection_reply(&name, &request.channel),
        };
    }

    Outcome::Passthrough { command: Some(name) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::definition::Command;

    fn request(channel: &str, text: &str) -> Request {
        Request {
            channel: channel.to_owned(),
            chat_id: "chat".to_owned(),
            sender_id: "sender".to_owned(),
            message_id: None,
            text: text.to_owned(),
            reply: None,
        }
    }

    #[tokio::test]
    async fn non_slash_text_passes_through_with_no_command() {
        let registry = Registry::new(vec![]);
        let outcome = execute(Some(&registry), None, &request("telegram", "hello")).await;
        assert!(matches!(outcome, Outcome::Passthrough { command: None }));
    }

    #[tokio::test]
    async fn unknown_command_passes_through_with_name() {
        let registry = Registry::new(vec![]);
        let outcome = execute(Some(&registry), None, &request("telegram", "/nope")).await;
        assert!(matches!(outcome, Outcome::Passthrough { command: Some(c) } if c == "nope"));
    }

    #[tokio::test]
    async fn wrong_channel_command_is_rejected_with_exact_reply() {
        let registry = Registry::new(vec![Command {
            name: "show".to_owned(),
            aliases: vec![],
            usage: "/show".to_owned(),
            description: String::new(),
            channels: vec!["telegram".to_owned()],
            handler: None,
        }]);
        let outcome = execute(Some(&registry), None, &request("whatsapp", "/show channel")).await;
        match outcome {
            Outcome::Rejected { command, reply } => {
                assert_eq!(command, "show");
                assert_eq!(reply, "Command /show is not supported on whatsapp.");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handler_is_invoked_once_on_match() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let calls2 = calls.clone();
        let registry = Registry::new(vec![Command {
            name: "help".to_owned(),
            aliases: vec![],
            usage: "/help".to_owned(),
            description: String::new(),
            channels: vec!["telegram".to_owned()],
            handler: Some(Arc::new(move |_rt, _args| {
                let calls = calls2.clone();
                Box::pin(async move {
                    calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    Ok("hi".to_owned())
                })
            })),
        }]);

        let outcome = execute(Some(&registry), None, &request("telegram", "/help@my_bot")).await;
        assert!(matches!(outcome, Outcome::Handled { command, error: None } if command == "help"));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bot_mention_suffix_does_not_change_outcome() {
        let registry = Registry::new(vec![Command {
            name: "help".to_owned(),
            aliases: vec![],
            usage: "/help".to_owned(),
            description: String::new(),
            channels: vec![],
            handler: None,
        }]);
        let plain = execute(Some(&registry), None, &request("telegram", "/help")).await;
        let mentioned = execute(Some(&registry), None, &request("telegram", "/help@anybot")).await;
        assert!(matches!(plain, Outcome::Passthrough { command: Some(ref c) } if c == "help"));
        assert!(matches!(mentioned, Outcome::Passthrough { command: Some(ref c) } if c == "help"));
    }

    #[tokio::test]
    async fn handler_error_is_surfaced_in_outcome() {
        let registry = Registry::new(vec![Command {
            name: "boom".to_owned(),
            aliases: vec![],
            usage: "/boom".to_owned(),
            description: String::new(),
            channels: vec![],
            handler: Some(Arc::new(|_rt, _args| Box::pin(async { Err(anyhow::anyhow!("kaboom")) }))),
        }]);
        let outcome = execute(Some(&registry), None, &request("telegram", "/boom")).await;
        match outcome {
            Outcome::Handled { command, error: Some(e) } => {
                assert_eq!(command, "boom");
                assert_eq!(e, "kaboom");
            }
            other => panic!("expected Handled with error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_registry_is_always_passthrough() {
        let outcome = execute(None, None, &request("telegram", "/help")).await;
        assert!(matches!(outcome, Outcome::Passthrough { command: Some(c) } if c == "help"));
    }
}
