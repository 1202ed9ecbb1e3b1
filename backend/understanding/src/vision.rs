/// Vision classification — ask a vision LLM which banknote is in an image.
///
/// One request per call, no retries. Any transport, status, or payload
/// problem becomes `ScanError::ClassificationService`.
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use payguide_core::{Classifier, Denomination, ImageBuffer, ScanError};
use payguide_logging::redact_sensitive_data;
use payguide_media::encode_base64;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Default request timeout for the remote model.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed instruction sent with every image.
pub static CLASSIFICATION_PROMPT: Lazy<String> = Lazy::new(|| {
    let labels: Vec<String> = Denomination::ALL.iter().map(|d| d.model_label()).collect();
    format!(
        "Identify the Nigerian currency note in this image. \
         Reply with exactly one of the following strings and nothing else:\n{}",
        labels.join("\n")
    )
});

/// Supported vision providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionProvider {
    Gemini,
    OpenAi,
}

impl VisionProvider {
    pub fn name(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash",
            Self::OpenAi => "gpt-4o",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::OpenAi => "https://api.openai.com/v1",
        }
    }
}

/// Remote classifier client for one provider/model pair.
pub struct VisionClassifier {
    provider: VisionProvider,
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl VisionClassifier {
    pub fn new(
        provider: VisionProvider,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            provider,
            api_key: api_key.into(),
            model: model.into(),
            base_url: provider.default_base_url().to_string(),
            client,
        })
    }

    pub fn gemini(api_key: impl Into<String>) -> Result<Self> {
        let provider = VisionProvider::Gemini;
        Self::new(provider, api_key, provider.default_model(), DEFAULT_TIMEOUT)
    }

    pub fn openai(api_key: impl Into<String>) -> Result<Self> {
        let provider = VisionProvider::OpenAi;
        Self::new(provider, api_key, provider.default_model(), DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ScanError> {
        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                service_error("request timed out")
            } else {
                service_error(&format!("request failed: {e}"))
            }
        })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let body: String = body.chars().take(300).collect();
            return Err(service_error(&format!("{} returned {status}: {body}", self.provider.name())));
        }
        Ok(resp)
    }

    async fn classify_via_gemini(&self, b64: &str, mime_type: &str) -> Result<String, ScanError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = serde_json::json!({
            "contents": [{ "parts": [
                { "text": CLASSIFICATION_PROMPT.as_str() },
                { "inlineData": { "mimeType": mime_type, "data": b64 } }
            ]}]
        });
        let resp = self
            .post(self.client.post(&url).header("x-goog-api-key", &self.api_key).json(&body))
            .await?;
        let parsed: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| service_error(&format!("malformed Gemini response: {e}")))?;
        Ok(parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default())
    }

    async fn classify_via_openai(&self, b64: &str, mime_type: &str) -> Result<String, ScanError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": CLASSIFICATION_PROMPT.as_str() },
                    { "type": "image_url",
                      "image_url": { "url": format!("data:{};base64,{}", mime_type, b64) } }
                ]
            }],
            "max_tokens": 32
        });
        let resp = self.post(self.client.post(&url).bearer_auth(&self.api_key).json(&body)).await?;
        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| service_error(&format!("malformed OpenAI response: {e}")))?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl Classifier for VisionClassifier {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn classify(&self, image: &ImageBuffer) -> Result<String, ScanError> {
        info!(
            provider = self.provider.name(),
            model = %self.model,
            bytes = image.len(),
            "Classifying banknote image"
        );
        let b64 = encode_base64(&image.data);
        let answer = match self.provider {
            VisionProvider::Gemini => self.classify_via_gemini(&b64, &image.mime_type).await,
            VisionProvider::OpenAi => self.classify_via_openai(&b64, &image.mime_type).await,
        }?;
        let answer = answer.trim().to_string();
        if answer.is_empty() {
            return Err(service_error("empty answer"));
        }
        debug!(answer = %answer, "Classifier replied");
        Ok(answer)
    }
}

fn service_error(message: &str) -> ScanError {
    let message = redact_sensitive_data(message);
    warn!(error = %message, "Classification service error");
    ScanError::ClassificationService(message)
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn image() -> ImageBuffer {
        ImageBuffer::new(vec![0xFF, 0xD8, 0xFF, 0xD9], "image/jpeg", "test.jpg")
    }

    #[test]
    fn prompt_lists_every_label() {
        for d in Denomination::ALL {
            assert!(CLASSIFICATION_PROMPT.contains(&d.model_label()));
        }
        assert!(CLASSIFICATION_PROMPT.contains("nothing else"));
    }

    #[tokio::test]
    async fn gemini_returns_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "contents": [{ "parts": [
                    { "text": CLASSIFICATION_PROMPT.as_str() },
                    { "inlineData": { "mimeType": "image/jpeg", "data": "/9j/2Q==" } }
                ]}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"₦500 - Nigerian Naira\n"}]}}]}"#)
            .create_async()
            .await;

        let classifier = VisionClassifier::gemini("test-key").unwrap().with_base_url(server.url());
        let answer = classifier.classify(&image()).await.unwrap();
        assert_eq!(answer, "₦500 - Nigerian Naira");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn openai_returns_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({ "model": "gpt-4o" })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"₦20 - Nigerian Naira"}}]}"#)
            .create_async()
            .await;

        let classifier = VisionClassifier::openai("sk-test").unwrap().with_base_url(server.url());
        assert_eq!(classifier.classify(&image()).await.unwrap(), "₦20 - Nigerian Naira");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_service_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let classifier = VisionClassifier::gemini("k").unwrap().with_base_url(server.url());
        let err = classifier.classify(&image()).await.unwrap_err();
        match err {
            ScanError::ClassificationService(msg) => {
                assert!(msg.contains("503"), "{msg}");
                assert!(msg.contains("overloaded"), "{msg}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_service_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let classifier = VisionClassifier::openai("k").unwrap().with_base_url(server.url());
        assert!(matches!(
            classifier.classify(&image()).await,
            Err(ScanError::ClassificationService(_))
        ));
    }

    #[tokio::test]
    async fn empty_answer_is_service_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let classifier = VisionClassifier::gemini("k").unwrap().with_base_url(server.url());
        let err = classifier.classify(&image()).await.unwrap_err();
        assert_eq!(err, ScanError::ClassificationService("empty answer".into()));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_service_error() {
        let classifier = VisionClassifier::new(
            VisionProvider::OpenAi,
            "k",
            "gpt-4o",
            Duration::from_millis(500),
        )
        .unwrap()
        .with_base_url("http://127.0.0.1:9");
        assert!(matches!(
            classifier.classify(&image()).await,
            Err(ScanError::ClassificationService(_))
        ));
    }

    #[tokio::test]
    async fn model_override_changes_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-1.5-pro:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"fifty naira"}]}}]}"#)
            .create_async()
            .await;

        let classifier = VisionClassifier::new(VisionProvider::Gemini, "k", "gemini-1.5-pro", DEFAULT_TIMEOUT)
            .unwrap()
            .with_base_url(server.url());
        assert_eq!(classifier.model(), "gemini-1.5-pro");
        assert_eq!(classifier.classify(&image()).await.unwrap(), "fifty naira");
        mock.assert_async().await;
    }
}
