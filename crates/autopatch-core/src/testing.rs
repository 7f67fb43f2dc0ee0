//! In-memory fakes shared by unit and integration tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::error::{AutopatchError, Result};
use crate::model::ModelClient;

/// A [`ModelClient`] that replays scripted responses in order.
///
/// Records every prompt pair it receives so tests can assert on call counts
/// and prompt content. An exhausted script fails the call, which doubles as
/// an assertion that a code path performs no model call.
#[derive(Default)]
pub struct ScriptedModelClient {
    responses: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedModelClient {
    /// Create a client with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn push_response(&self, text: impl Into<String>) {
        self.responses
            .lock()
            .expect("script lock")
            .push_back(Ok(text.into()));
    }

    /// Queue a failing call.
    pub fn push_error(&self, message: impl Into<String>) {
        self.responses
            .lock()
            .expect("script lock")
            .push_back(Err(message.into()));
    }

    /// Prompt pairs received so far.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().expect("prompt lock").clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().expect("prompt lock").len()
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompt lock")
            .push((system_prompt.to_string(), user_prompt.to_string()));

        match self.responses.lock().expect("script lock").pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AutopatchError::Model(message)),
            None => Err(AutopatchError::Model(
                "scripted model client has no more responses".to_string(),
            )),
        }
    }
}
