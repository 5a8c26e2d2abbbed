//! Session configuration.

use parlor_client::DEFAULT_BASE_URL;
use parlor_types::ClientError;

/// Static configuration for a [`ChatSession`](crate::ChatSession).
///
/// # Example
///
/// ```
/// use parlor_session::ChatConfig;
///
/// let config = ChatConfig::new("llama3")
///     .base_url("http://localhost:11434")
///     .system("You are a pirate. Answer everything in pirate language.");
/// ```
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub(crate) base_url: String,
    pub(crate) model: String,
    pub(crate) system: Option<String>,
}

impl ChatConfig {
    /// Configuration for `model` against the default local server.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            model: model.into(),
            system: None,
        }
    }

    /// Override the server base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Seed the conversation with a system prompt. An empty prompt is
    /// treated as absent.
    #[must_use]
    pub fn system(mut self, prompt: impl Into<String>) -> Self {
        self.system = Some(prompt.into());
        self
    }

    /// Configuration from the environment: `PARLOR_MODEL` (required),
    /// `OLLAMA_HOST`, and `PARLOR_SYSTEM_PROMPT`.
    pub fn from_env() -> Result<Self, ClientError> {
        let model = std::env::var("PARLOR_MODEL")
            .map_err(|_| ClientError::InvalidArgument("PARLOR_MODEL not set".into()))?;
        let mut config = Self::new(model);
        if let Ok(url) = std::env::var("OLLAMA_HOST") {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }
        if let Ok(system) = std::env::var("PARLOR_SYSTEM_PROMPT") {
            config.system = Some(system);
        }
        Ok(config)
    }

    /// The configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}
