//! Channel-aware command dispatch: registry, matcher, executor, and the
//! built-in runtime-backed handlers (spec §2 "Command Registry" /
//! "Command Matcher" / "Command Executor" / "Runtime Handlers", §4.1-§4.4).

mod definition;
mod executor;
mod handlers;
mod matcher;
mod runtime;

pub use definition::{Command, HandlerFn, HandlerResult, Registry};
pub use executor::{execute, Outcome, ReplyFn, Request};
pub use handlers::builtin_commands;
pub use matcher::{argument_tail, parse_command};
pub use runtime::{Runtime, RuntimeConfig, SessionOps, UNAVAILABLE_REPLY};
