use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use poise::serenity_prelude::{GuildId, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::framework::config::AiConfig;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("the ask command isn't set up here")]
    NotConfigured,

    #[error("request to the chat api failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("the chat api sent back an empty reply")]
    EmptyReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// The latest messages between one user and the bot, oldest first.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: VecDeque<ChatMessage>,
}

impl Conversation {
    pub fn push(&mut self, message: ChatMessage, cap: usize) {
        self.messages.push_back(message);

        while self.messages.len() > cap {
            self.messages.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

pub type ConversationKey = (Option<GuildId>, UserId);

/// Longest message discord accepts, in characters.
pub const MESSAGE_LIMIT: usize = 2000;

/// Cuts `text` down to one discord message, marking the cut with `…`.
pub fn fit_message(text: &str) -> String {
    if text.chars().count() <= MESSAGE_LIMIT {
        return text.to_owned();
    }

    let mut fitted: String = text.chars().take(MESSAGE_LIMIT - 1).collect();
    fitted.push('…');
    fitted
}

/// Forwards prompts to an OpenAI-style chat completions endpoint, keeping a
/// short history per user.
#[derive(Debug, Clone)]
pub struct ChatRelay {
    http: reqwest::Client,
    config: AiConfig,
    api_key: Option<String>,
    conversations: Arc<Mutex<HashMap<ConversationKey, Conversation>>>,
}

impl ChatRelay {
    pub fn new(config: AiConfig, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            api_key,
            conversations: Arc::default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip(self, prompt))]
    pub async fn ask(&self, key: ConversationKey, prompt: &str) -> Result<String, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::NotConfigured)?;

        let history: Vec<ChatMessage> = {
            let mut conversations = self.conversations.lock().await;
            let conversation = conversations.entry(key).or_default();
            conversation.push(ChatMessage::new(Role::User, prompt), self.config.history);
            conversation.messages().cloned().collect()
        };

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::new(Role::System, &self.config.system_prompt));
        messages.extend(history);

        debug!(messages = messages.len(), model = %self.config.model, "asking chat api");

        let response: ChatResponse = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&ChatRequest {
                model: &self.config.model,
                messages,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let reply = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(AiError::EmptyReply)?;

        self.conversations
            .lock()
            .await
            .entry(key)
            .or_default()
            .push(ChatMessage::new(Role::Assistant, &reply), self.config.history);

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn conversation_keeps_the_latest_messages() {
        let mut conversation = Conversation::default();

        for i in 0..40 {
            conversation.push(ChatMessage::new(Role::User, i.to_string()), 30);
        }

        assert_eq!(conversation.len(), 30);
        assert_eq!(
            conversation.messages().next().map(|m| m.content.as_str()),
            Some("10")
        );
        assert_eq!(
            conversation.messages().last().map(|m| m.content.as_str()),
            Some("39")
        );
    }

    #[test]
    fn roles_serialize_lowercase() {
        let message = ChatMessage::new(Role::Assistant, "hi");

        assert_eq!(
            serde_json::to_string(&message).expect("serializable"),
            r#"{"role":"assistant","content":"hi"}"#
        );
    }

    #[test]
    fn long_replies_fit_in_one_message() {
        let reply = "é".repeat(MESSAGE_LIMIT + 50);
        let fitted = fit_message(&reply);

        assert_eq!(fitted.chars().count(), MESSAGE_LIMIT);
        assert!(fitted.ends_with('…'));

        assert_eq!(fit_message("short"), "short");
    }

    #[tokio::test]
    async fn unconfigured_relay_refuses() {
        let relay = ChatRelay::new(AiConfig::default(), None);

        assert!(!relay.is_configured());
        assert!(matches!(
            relay.ask((None, UserId::new(1)), "hello").await,
            Err(AiError::NotConfigured)
        ));
    }
}
