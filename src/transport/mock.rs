use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;

use crate::core::Result;

use super::{AtPort, CommandTransport};

/// In-memory [`CommandTransport`] answering from a scripted table.
///
/// Commands without a scripted reply succeed with an empty response, which
/// matches a bare `OK` from a real device. Every executed command is
/// recorded so tests can assert on the exact order of traffic.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, VecDeque<Result<String>>>>,
    executed: Mutex<Vec<(AtPort, String)>>,
}

impl MockTransport {
    /// Create a transport where every command succeeds with `OK`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next result for `command`.
    ///
    /// Repeated calls for the same command queue up replies consumed in
    /// order; once the queue drains, the command falls back to plain `OK`.
    pub fn reply(&self, command: &str, result: Result<String>) {
        self.replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(command.to_string())
            .or_default()
            .push_back(result);
    }

    /// Script a successful text response for `command`.
    pub fn reply_ok(&self, command: &str, response: &str) {
        self.reply(command, Ok(response.to_string()));
    }

    /// Commands executed so far, in order.
    pub fn executed(&self) -> Vec<(AtPort, String)> {
        self.executed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Commands executed so far, ignoring which port they went to.
    pub fn executed_commands(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|(_, command)| command.clone())
            .collect()
    }
}

#[async_trait]
impl CommandTransport for MockTransport {
    async fn execute(
        &self,
        port: AtPort,
        command: &str,
        _timeout: Duration,
        _allow_cache: bool,
    ) -> Result<String> {
        self.executed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((port, command.to_string()));

        let scripted = self
            .replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get_mut(command)
            .and_then(VecDeque::pop_front);

        scripted.unwrap_or_else(|| Ok(String::new()))
    }
}
