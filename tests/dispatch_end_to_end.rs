// End-to-end command dispatch scenarios exercising the public API across
// module boundaries, beyond what each module's own unit tests cover.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use picoclaw::command::{
    self, builtin_commands, execute, Command, Outcome, Registry, Request, Runtime, RuntimeConfig,
    SessionOps,
};
use picoclaw::session::{SessionError, SessionSummary};

struct StubSessionOps {
    started: AtomicUsize,
}

impl StubSessionOps {
    fn new() -> Self {
        Self { started: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl SessionOps for StubSessionOps {
    async fn start_new(&self, scope: &str) -> Result<String, SessionError> {
        let n = self.started.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{scope}#{}", n.saturating_add(2)))
    }

    async fn list(&self, _scope: &str) -> Result<Vec<SessionSummary>, SessionError> {
        Ok(Vec::new())
    }

    async fn resume(&self, scope: &str, idx: i64) -> Result<String, SessionError> {
        Ok(format!("{scope}#{idx}"))
    }

    async fn prune(&self, _scope: &str, _limit: i64) -> Result<Vec<String>, SessionError> {
        Ok(Vec::new())
    }
}

fn runtime(channel: &str, scope: &str) -> Runtime {
    Runtime {
        channel: channel.to_owned(),
        scope: scope.to_owned(),
        session_ops: Arc::new(StubSessionOps::new()),
        config: Some(RuntimeConfig {
            default_provider: "anthropic".to_owned(),
            default_model: "claude-opus-4".to_owned(),
            backlog_limit: 20,
            enabled_channels: vec![("telegram".to_owned(), true)],
        }),
    }
}

fn request(channel: &str, text: &str) -> Request {
    Request {
        channel: channel.to_owned(),
        chat_id: "chat-1".to_owned(),
        sender_id: "user-1".to_owned(),
        message_id: None,
        text: text.to_owned(),
        reply: None,
    }
}

#[tokio::test]
async fn unknown_channel_command_is_rejected_with_exact_reply() {
    let registry = Registry::new(builtin_commands());
    let outcome = execute(Some(&registry), Some(runtime("cli", "agent:main:cli:u1")), &request("cli", "/show"))
        .await;

    match outcome {
        Outcome::Rejected { command, reply } => {
            assert_eq!(command, "show");
            assert_eq!(reply, "Command /show is not supported on cli.");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn bot_mention_suffix_does_not_change_the_outcome() {
    let registry = Registry::new(builtin_commands());
    let scope = "agent:main:telegram:u1";

    let plain = execute(Some(&registry), Some(runtime("telegram", scope)), &request("telegram", "/new")).await;
    let mentioned =
        execute(Some(&registry), Some(runtime("telegram", scope)), &request("telegram", "/new@any_bot_at_all"))
            .await;

    match (plain, mentioned) {
        (Outcome::Handled { command: a, error: None }, Outcome::Handled { command: b, error: None }) => {
            assert_eq!(a, "new");
            assert_eq!(b, "new");
        }
        other => panic!("expected two matching Handled outcomes, got {other:?}"),
    }
}

#[tokio::test]
async fn passthrough_placeholder_definition_never_runs_a_handler() {
    let placeholder = Command {
        name: "placeholder".to_owned(),
        aliases: Vec::new(),
        usage: "/placeholder".to_owned(),
        description: "reserved for the LLM tool loop".to_owned(),
        channels: Vec::new(),
        handler: None,
    };
    let registry = Registry::new(vec![placeholder]);

    let outcome = execute(Some(&registry), None, &request("telegram", "/placeholder do a thing")).await;
    match outcome {
        Outcome::Passthrough { command: Some(name) } => assert_eq!(name, "placeholder"),
        other => panic!("expected Passthrough with the command name, got {other:?}"),
    }
}

#[tokio::test]
async fn plain_text_without_a_leading_slash_passes_through_with_no_command() {
    let registry = Registry::new(builtin_commands());
    let outcome = execute(Some(&registry), None, &request("telegram", "just talking to the bot")).await;
    assert!(matches!(outcome, Outcome::Passthrough { command: None }));
}

#[tokio::test]
async fn unusable_runtime_yields_the_unavailable_reply_through_the_full_stack() {
    let registry = Registry::new(builtin_commands());
    let empty_scope_runtime = Runtime {
        channel: "telegram".to_owned(),
        scope: "   ".to_owned(),
        session_ops: Arc::new(StubSessionOps::new()),
        config: None,
    };

    let captured = Arc::new(std::sync::Mutex::new(None));
    let capture_for_reply = Arc::clone(&captured);
    let mut req = request("telegram", "/new");
    req.reply = Some(Arc::new(move |text: String| {
        let captured = Arc::clone(&capture_for_reply);
        Box::pin(async move {
            *captured.lock().unwrap() = Some(text);
            Ok(())
        }) as std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>>
    }));

    let outcome = execute(Some(&registry), Some(empty_scope_runtime), &req).await;
    match outcome {
        Outcome::Handled { command, error: None } => assert_eq!(command, "new"),
        other => panic!("expected a Handled outcome carrying the unavailable reply, got {other:?}"),
    }
    assert_eq!(captured.lock().unwrap().as_deref(), Some(command::UNAVAILABLE_REPLY));
}

#[tokio::test]
async fn no_registry_always_passes_through_even_for_a_known_looking_command() {
    let outcome = command::execute(None, None, &request("telegram", "/help")).await;
    assert!(matches!(outcome, Outcome::Passthrough { command: Some(ref name) } if name == "help"));
}
