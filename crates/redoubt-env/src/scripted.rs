//! Queue-backed in-process environments.
//!
//! [`ScriptedEnvironment`] stands in for a real sandbox: messages are
//! pushed into its inbox from the outside (a test, or a local driver) and
//! replies accumulate in order for inspection. The handle is a cheap
//! clone over shared state, so the referee can own one end while the
//! driver keeps the other. Single-threaded by design, like the referee
//! itself.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde_json::Value;

use crate::protocol::{Message, Reply};
use crate::{EnvError, Environment, EnvironmentsController};

// ---------------------------------------------------------------------------
// ScriptedEnvironment
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct EnvInner {
    inbox: VecDeque<Message>,
    replies: Vec<Reply>,
    ran_code: Option<String>,
}

/// An in-process [`Environment`] fed by hand.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEnvironment {
    inner: Rc<RefCell<EnvInner>>,
}

impl ScriptedEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message for the agent to read; the first queued message
    /// doubles as the `run_code` reply.
    pub fn push_message(&self, message: Message) {
        self.inner.borrow_mut().inbox.push_back(message);
    }

    /// All replies written so far, in delivery order.
    pub fn replies(&self) -> Vec<Reply> {
        self.inner.borrow().replies.clone()
    }

    /// Take the accumulated replies, leaving the log empty.
    pub fn drain_replies(&self) -> Vec<Reply> {
        std::mem::take(&mut self.inner.borrow_mut().replies)
    }

    /// The code `run_code` was started with, if the agent started.
    pub fn ran_code(&self) -> Option<String> {
        self.inner.borrow().ran_code.clone()
    }
}

impl Environment for ScriptedEnvironment {
    fn run_code(&mut self, code: &str) -> Result<Option<Message>, EnvError> {
        let mut inner = self.inner.borrow_mut();
        inner.ran_code = Some(code.to_owned());
        Ok(inner.inbox.pop_front())
    }

    fn read_message(&mut self) -> Option<Message> {
        self.inner.borrow_mut().inbox.pop_front()
    }

    fn select_result(&mut self, data: Vec<Value>) {
        self.inner.borrow_mut().replies.push(Reply::SelectResult(data));
    }

    fn confirm(&mut self) {
        self.inner.borrow_mut().replies.push(Reply::Confirm);
    }

    fn bad_action(&mut self, error: Option<String>) {
        self.inner.borrow_mut().replies.push(Reply::BadAction(error));
    }

    fn send_event(&mut self, lookup_key: &str, data: Value) {
        self.inner.borrow_mut().replies.push(Reply::Event {
            lookup_key: lookup_key.to_owned(),
            data,
        });
    }
}

// ---------------------------------------------------------------------------
// ScriptedController
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ControllerInner {
    spawned: Vec<(String, ScriptedEnvironment)>,
}

/// An [`EnvironmentsController`] that mints [`ScriptedEnvironment`]s and
/// keeps a handle to each, in acquisition order, for the driving side.
#[derive(Debug, Clone, Default)]
pub struct ScriptedController {
    inner: Rc<RefCell<ControllerInner>>,
}

impl ScriptedController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environments handed out so far, with the names they were acquired
    /// under, in acquisition order.
    pub fn spawned(&self) -> Vec<(String, ScriptedEnvironment)> {
        self.inner.borrow().spawned.clone()
    }

    /// The `index`-th environment handed out.
    pub fn environment(&self, index: usize) -> Option<ScriptedEnvironment> {
        self.inner
            .borrow()
            .spawned
            .get(index)
            .map(|(_, env)| env.clone())
    }
}

impl EnvironmentsController for ScriptedController {
    fn acquire(&mut self, env_name: &str) -> Result<Box<dyn Environment>, EnvError> {
        let env = ScriptedEnvironment::new();
        self.inner
            .borrow_mut()
            .spawned
            .push((env_name.to_owned(), env.clone()));
        tracing::debug!(env_name, "scripted environment acquired");
        Ok(Box::new(env))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
