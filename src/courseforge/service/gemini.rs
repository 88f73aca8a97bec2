//! Gemini REST client.
//!
//! Talks to `{api_base}/v1beta/models/{model}:generateContent` with the API key in the
//! `x-goog-api-key` header. Outline, draft and diagram requests use the text model, the
//! enhancement pass uses the enhance model, and images use the image model with an
//! image-only response modality.

use super::prompts;
use super::{GenerativeService, ImagePayload, LessonBrief, ServiceError, ServiceResult};
use crate::config::CourseConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const ENHANCE_TEMPERATURE: f32 = 0.3;
const DIAGRAM_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl GenerateResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|c| c.parts.iter())
    }

    fn text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
        (!text.is_empty()).then_some(text)
    }

    fn image(&self) -> Option<ImagePayload> {
        self.parts()
            .find_map(|p| p.inline_data.as_ref())
            .map(|inline| ImagePayload {
                mime_type: inline
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| "image/png".to_string()),
                data: inline.data.clone(),
            })
    }
}

/// Builds a [`ServiceError`] from a non-success reply, keeping the API's status name
/// (e.g. `RESOURCE_EXHAUSTED`) in the message.
fn error_from_reply(status: u16, body: &str) -> ServiceError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.status.is_empty() => ServiceError::new(
            Some(status),
            format!("{} ({}): {}", status, envelope.error.status, envelope.error.message),
        ),
        Ok(envelope) => ServiceError::new(
            Some(status),
            format!("{}: {}", status, envelope.error.message),
        ),
        Err(_) => ServiceError::new(Some(status), format!("{}: {}", status, body.trim())),
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
    text_model: String,
    enhance_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, config: &CourseConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            enhance_model: config.enhance_model.clone(),
            image_model: config.image_model.clone(),
        }
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        generation_config: Option<GenerationConfig>,
    ) -> ServiceResult<GenerateResponse> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.api_base, model);
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config,
        };

        debug!(model, prompt_len = prompt.len(), "generateContent request");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::new(None, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = error_from_reply(status.as_u16(), &body);
            warn!(model, status = status.as_u16(), "generateContent failed: {}", err);
            return Err(err);
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| ServiceError::new(None, format!("malformed response: {}", e)))
    }

    async fn generate_text(
        &self,
        model: &str,
        prompt: &str,
        temperature: Option<f32>,
    ) -> ServiceResult<String> {
        let config = temperature.map(|t| GenerationConfig {
            temperature: Some(t),
            ..GenerationConfig::default()
        });
        self.generate(model, prompt, config)
            .await?
            .text()
            .ok_or_else(|| ServiceError::new(None, "no text returned"))
    }
}

#[async_trait]
impl GenerativeService for GeminiClient {
    async fn generate_syllabus(
        &self,
        theme: &str,
        context: Option<&str>,
    ) -> ServiceResult<String> {
        let prompt = prompts::syllabus_prompt(theme, context);
        self.generate_text(&self.text_model, &prompt, None).await
    }

    async fn draft_lesson(&self, brief: &LessonBrief<'_>) -> ServiceResult<String> {
        let prompt = prompts::lesson_prompt(brief);
        self.generate_text(&self.text_model, &prompt, None).await
    }

    async fn enhance(&self, markup: &str) -> ServiceResult<String> {
        let prompt = prompts::enhance_prompt(markup);
        self.generate_text(&self.enhance_model, &prompt, Some(ENHANCE_TEMPERATURE))
            .await
    }

    async fn generate_image(&self, prompt: &str) -> ServiceResult<ImagePayload> {
        let prompt = prompts::image_prompt(prompt);
        let config = GenerationConfig {
            response_modalities: Some(vec!["IMAGE"]),
            ..GenerationConfig::default()
        };
        self.generate(&self.image_model, &prompt, Some(config))
            .await?
            .image()
            .ok_or_else(|| ServiceError::new(None, "no image data returned"))
    }

    async fn generate_diagram(&self, concept: &str) -> ServiceResult<String> {
        let prompt = prompts::diagram_prompt(concept);
        self.generate_text(&self.text_model, &prompt, Some(DIAGRAM_TEMPERATURE))
            .await
    }
}
