use std::fmt::Display;

use tracing::{info, warn};

#[derive(Clone)]
pub struct Secrets {
    discord_token: String,
    openai_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("discord_token", &"<redacted>")
            .field("openai_key", &self.openai_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Secrets {
    /// Reads secrets from the environment, after loading any `.env` file.
    pub fn from_env() -> Result<Self, MissingSecretError> {
        if let Ok(path) = dotenvy::dotenv() {
            info!(path = %path.display(), "loaded .env file");
        }

        let discord_token = get(SecretKey::DiscordToken).ok_or(MissingSecretError {
            secret: SecretKey::DiscordToken,
        })?;

        let openai_key = get(SecretKey::OpenAiKey);
        if openai_key.is_none() {
            warn!(var = %SecretKey::OpenAiKey, "not set, ask command is disabled");
        }

        Ok(Self {
            discord_token,
            openai_key,
        })
    }

    pub fn discord_token(&self) -> &str {
        &self.discord_token
    }

    pub fn openai_key(&self) -> Option<&str> {
        self.openai_key.as_deref()
    }
}

fn get(secret: SecretKey) -> Option<String> {
    std::env::var(secret.to_string())
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SecretKey {
    DiscordToken,
    OpenAiKey,
}

impl Display for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::DiscordToken => "DISCORD_TOKEN",
            Self::OpenAiKey => "OPENAI_API_KEY",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("missing secret: {secret} is not set")]
pub struct MissingSecretError {
    secret: SecretKey,
}
