//! # Generative Service
//!
//! The outbound collaborator that writes outlines, lesson drafts, enhanced markup, images
//! and diagrams. Everything above this module treats it as an opaque async call that either
//! returns content or fails with a [`ServiceError`].
//!
//! Two implementations ship with the crate:
//!
//! - [`gemini::GeminiClient`]: the production client over the Gemini REST API.
//! - [`scripted::ScriptedService`]: a deterministic fake with a call log and scripted
//!   failures, used by the test suites (`test_utils` feature outside this crate).
//!
//! Calls are made strictly one at a time by the callers; implementations never need to
//! handle concurrent requests from the same job.

use async_trait::async_trait;
use thiserror::Error;

pub mod gemini;
pub mod prompts;
#[cfg(any(test, feature = "test_utils"))]
pub mod scripted;

/// Failure of one external call, with the HTTP status when there was one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceError {
    pub status: Option<u16>,
    pub message: String,
}

impl ServiceError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Matches the rate-limit signature: HTTP 429 or `RESOURCE_EXHAUSTED` anywhere in the
    /// message.
    pub fn is_quota_exhausted(&self) -> bool {
        self.status == Some(429)
            || self.message.contains("429")
            || self.message.contains("RESOURCE_EXHAUSTED")
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Base64-encoded image bytes as returned by the image model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

impl ImagePayload {
    pub fn png(data: impl Into<String>) -> Self {
        Self {
            mime_type: "image/png".to_string(),
            data: data.into(),
        }
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Everything the draft stage needs to know about one lesson and its surroundings.
#[derive(Debug, Clone, Copy)]
pub struct LessonBrief<'a> {
    pub theme: &'a str,
    pub outline: &'a str,
    /// Fully qualified, e.g. "Module 2 - Lesson 3: Title".
    pub lesson_title: &'a str,
    pub previous_title: Option<&'a str>,
    pub next_title: Option<&'a str>,
    pub context: Option<&'a str>,
}

#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Writes a course outline for a theme, honoring the optional support material.
    async fn generate_syllabus(&self, theme: &str, context: Option<&str>)
        -> ServiceResult<String>;

    /// First-stage lesson markup, possibly containing image directives.
    async fn draft_lesson(&self, brief: &LessonBrief<'_>) -> ServiceResult<String>;

    /// Restructures draft markup. Callers normalize the raw reply themselves.
    async fn enhance(&self, markup: &str) -> ServiceResult<String>;

    async fn generate_image(&self, prompt: &str) -> ServiceResult<ImagePayload>;

    /// Raw diagram description text for a concept (possibly fenced).
    async fn generate_diagram(&self, concept: &str) -> ServiceResult<String>;
}
