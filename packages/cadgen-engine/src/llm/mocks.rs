//! Scripted stand-in for the text-generation service, used by unit and
//! end-to-end tests.

use crate::error::LlmError;
use crate::llm::{ChatMessage, Completion, SamplingProfile, TextGenerator};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Error(String),
}

/// Pops one scripted reply per call and records every request for later
/// assertions. An exhausted queue yields `MOCK_RESPONSE`, so tests only
/// script the calls they care about.
#[derive(Clone, Default)]
pub struct MockTextGenerator {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl MockTextGenerator {
    pub fn new<S: Into<String>>(responses: Vec<S>) -> Self {
        let mock = Self::default();
        for response in responses {
            mock.push_response(response);
        }
        mock
    }

    pub fn push_response(&self, text: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Text(text.into()));
    }

    /// Scripts a connection failure for one call.
    pub fn push_error(&self, message: impl Into<String>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply::Error(message.into()));
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        _profile: SamplingProfile,
    ) -> Result<Completion, LlmError> {
        self.calls.lock().unwrap().push(messages.to_vec());

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Text(content)) => Ok(Completion {
                content,
                prompt_tokens: None,
                completion_tokens: None,
            }),
            Some(Reply::Error(message)) => Err(LlmError::Connect(message)),
            None => Ok(Completion {
                content: "MOCK_RESPONSE".to_string(),
                prompt_tokens: None,
                completion_tokens: None,
            }),
        }
    }
}
