//! Scripted completion service for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::{ChatMessage, CompletionService};
use crate::config::ModelConfig;
use crate::error::{AgentError, Result};

/// Replays canned replies in order and records every request.
pub(crate) struct ScriptedCompletions {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedCompletions {
    pub(crate) fn new(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletions {
    async fn complete(&self, _config: &ModelConfig, messages: Vec<ChatMessage>) -> Result<String> {
        self.calls.lock().unwrap().push(messages);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::Transport("no scripted reply left".into()))
    }
}
