//! OpenAI-compatible chat-completions backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use locsync_core::{BackendConfig, BatchRequest};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{prompt, TranslateError, Translator, TranslatorContext, TranslatorFactory};

/// Builds a [`ChatBackend`] per target language from the shared backend
/// configuration. The API key is read from the environment at creation time.
#[derive(Debug, Clone)]
pub struct ChatFactory {
    config: BackendConfig,
}

impl ChatFactory {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }
}

impl TranslatorFactory for ChatFactory {
    fn create(&self, context: TranslatorContext) -> Result<Arc<dyn Translator>, TranslateError> {
        let api_key = std::env::var(&self.config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| TranslateError::MissingApiKey {
                var: self.config.api_key_env.clone(),
            })?;
        Ok(Arc::new(ChatBackend::new(&self.config, api_key, context)))
    }
}

/// One language pair bound to one chat endpoint.
#[derive(Clone)]
pub struct ChatBackend {
    inner: Arc<Inner>,
}

struct Inner {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
    model: String,
    system_prompt: String,
    target_language: String,
}

impl ChatBackend {
    pub fn new(config: &BackendConfig, api_key: String, context: TranslatorContext) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self {
            inner: Arc::new(Inner {
                agent,
                endpoint: format!("{}/chat/completions", config.base_url),
                api_key,
                model: config.model.clone(),
                system_prompt: prompt::system_prompt(&context),
                target_language: context.target_language,
            }),
        }
    }

    /// Run one completion on the blocking pool.
    async fn complete(&self, user: String, json_reply: bool) -> Result<String, TranslateError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.complete_blocking(&user, json_reply))
            .await
            .map_err(|e| TranslateError::Backend(format!("request task failed: {e}")))?
    }
}

impl Inner {
    fn complete_blocking(&self, user: &str, json_reply: bool) -> Result<String, TranslateError> {
        let mut body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": user },
            ],
        });
        if json_reply {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let response = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body)
            .map_err(|e| match e {
                ureq::Error::Status(code, response) => {
                    let detail = response.into_string().unwrap_or_default();
                    TranslateError::Backend(format!("HTTP {code}: {}", detail.trim()))
                }
                ureq::Error::Transport(transport) => TranslateError::Backend(transport.to_string()),
            })?;

        let reply: ChatResponse = response
            .into_json()
            .map_err(|e| TranslateError::InvalidResponse(e.to_string()))?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| TranslateError::InvalidResponse("reply has no message content".into()))
    }
}

#[async_trait]
impl Translator for ChatBackend {
    async fn translate(&self, text: &str, description: &str) -> Result<String, TranslateError> {
        let content = self
            .complete(prompt::single_message(text, description), false)
            .await?;
        prompt::parse_single_reply(&content)
    }

    async fn translate_batch(
        &self,
        requests: &[BatchRequest],
    ) -> Result<HashMap<String, String>, TranslateError> {
        debug!(
            language = %self.inner.target_language,
            size = requests.len(),
            "sending batch"
        );
        let content = self.complete(prompt::batch_message(requests)?, true).await?;
        prompt::parse_batch_reply(&content)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

impl std::fmt::Debug for ChatBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatBackend")
            .field("endpoint", &self.inner.endpoint)
            .field("model", &self.inner.model)
            .field("target_language", &self.inner.target_language)
            .finish_non_exhaustive()
    }
}
