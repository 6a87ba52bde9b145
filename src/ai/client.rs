// =============================================================================
// AI Text-Generation API Client
// =============================================================================
//
// Thin client over a generateContent-style endpoint. Two modes:
//
//   generate_text — free-form prose (company overviews, analysis blurbs)
//   generate_json — structured output: the request carries a response schema
//                   and a JSON mime type, and the model's text part is parsed
//                   back into a serde_json::Value before returning
//
// The AI upstream is opaque to the rest of the backend; handlers only see
// strings and JSON values.
// =============================================================================

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::error::ApiError;

/// Upstream request timeout. Generation calls are slower than quote calls,
/// so this is looser than the broker's.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// AI generation client.
#[derive(Clone)]
pub struct AiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl AiClient {
    /// Create a new `AiClient`. A missing `api_key` is tolerated here and
    /// reported as a configuration error on first use, so the server can
    /// start without AI credentials.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            client,
        }
    }

    /// Generate free-form text for `prompt`.
    #[instrument(skip(self, prompt), name = "ai::generate_text")]
    pub async fn generate_text(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        self.generate(&body).await
    }

    /// Generate JSON constrained by `schema`.
    ///
    /// The schema rides in the generation config, so the model is forced to
    /// emit a parseable document; a text part that still fails to parse is an
    /// upstream error, not a panic.
    #[instrument(skip(self, prompt, schema), name = "ai::generate_json")]
    pub async fn generate_json(
        &self,
        prompt: &str,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });

        let text = self.generate(&body).await?;
        serde_json::from_str(&text)
            .with_context(|| "AI returned unparseable JSON despite response schema")
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    fn api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) => Ok(key),
            None => Err(ApiError::Config(
                "AI_API_KEY is not set — AI endpoints are unavailable".into(),
            )
            .into()),
        }
    }

    /// POST the request body and extract the first candidate's text part.
    async fn generate(&self, body: &serde_json::Value) -> Result<String> {
        let key = self.api_key()?;
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, key
        );

        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .context("AI generateContent request failed")?;

        let status = resp.status();
        let payload: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse AI response")?;

        if !status.is_success() {
            return Err(ApiError::upstream(
                format!("AI generateContent returned {status}"),
                Some(payload),
            )
            .into());
        }

        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string);

        match text {
            Some(t) => {
                debug!(chars = t.len(), "AI generation succeeded");
                Ok(t)
            }
            None => Err(ApiError::upstream(
                "AI response carried no text candidate".to_string(),
                Some(payload),
            )
            .into()),
        }
    }
}

impl std::fmt::Debug for AiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}
