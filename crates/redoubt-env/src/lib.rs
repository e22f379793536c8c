//! Redoubt Env -- the channel between the referee and player sandboxes.
//!
//! A player's program runs in an isolated environment the referee never
//! sees directly; all it holds is an [`Environment`] handle carrying six
//! calls: `run_code` and `read_message` inbound, and the four reply verbs
//! (`select_result`, `confirm`, `bad_action`, `send_event`) outbound.
//! Real sandbox runtimes implement the trait behind an
//! [`EnvironmentsController`]; the crate ships a queue-backed
//! [`ScriptedEnvironment`] so matches and tests run fully in-process.
//!
//! # Ordering contract
//!
//! The referee is single-threaded and cooperative. Replies written during
//! one frame tick must be observable, in write order, before the next
//! `read_message` on the same channel yields -- trivially satisfied by the
//! queue-backed implementation, and binding on any external transport.

#![deny(unsafe_code)]

pub mod protocol;
mod scripted;

pub use protocol::{Command, CommandError, Message, Reply, STATUS_SUCCESS};
pub use scripted::{ScriptedController, ScriptedEnvironment};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while acquiring or starting an environment.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    /// No environment is registered under the requested name.
    #[error("no environment registered for '{0}'")]
    UnknownEnvironment(String),

    /// The sandbox failed to load or start the program.
    #[error("program failed to start: {0}")]
    RunFailed(String),
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// A bidirectional link to one player program.
///
/// One handle is acquired per executable item. Messages flow in via
/// [`run_code`](Environment::run_code) (which yields the program's first
/// message) and [`read_message`](Environment::read_message); replies flow
/// out through the remaining verbs and are delivered in call order.
pub trait Environment {
    /// Load and start the program, returning its first message if the
    /// program produced one.
    fn run_code(&mut self, code: &str) -> Result<Option<Message>, EnvError>;

    /// The next pending message, or `None` when the mailbox is empty and
    /// the agent should suspend.
    fn read_message(&mut self) -> Option<Message>;

    /// Deliver the response list of a `select` request.
    fn select_result(&mut self, data: Vec<serde_json::Value>);

    /// Acknowledge a successful `set_action` or `subscribe`.
    fn confirm(&mut self);

    /// Reject a request; `error`, when present, is the stringified cause.
    fn bad_action(&mut self, error: Option<String>);

    /// Deliver a fired subscription under the program's lookup key.
    fn send_event(&mut self, lookup_key: &str, data: serde_json::Value);
}

// ---------------------------------------------------------------------------
// EnvironmentsController
// ---------------------------------------------------------------------------

/// Hands out [`Environment`] channels by environment name.
pub trait EnvironmentsController {
    /// Acquire a fresh channel for a program running under `env_name`.
    fn acquire(&mut self, env_name: &str) -> Result<Box<dyn Environment>, EnvError>;
}
