//! # Lesson Pipeline
//!
//! Generates one lesson in three strictly ordered stages, each a single external call:
//!
//! 1. **Draft**: lesson markup from the theme, the full outline and the lesson's neighbours.
//! 2. **Enhance**: restructured markup, normalized locally (see [`markup`]). This is the one
//!    stage allowed to soft-fail: under [`EnhanceFailure::Degrade`] a failed or unusable
//!    enhancement passes the draft through unchanged.
//! 3. **Resolve images**: every image directive replaced, or the lesson fails (see [`images`]).
//!
//! Nothing is retried here. The runner's only side effect is the status text it reports.

use crate::error::{CourseError, Result};
use crate::model::{CourseTree, LessonId, LessonPosition, SyllabusMeta};
use crate::service::{GenerativeService, LessonBrief, ServiceError};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod images;
pub mod markup;

use images::{directive_tags, ImageResolver};

/// Receives human-readable status lines as the pipeline advances.
pub type StatusSink<'a> = Option<&'a (dyn Fn(&str) + Send + Sync)>;

pub(crate) fn report(status: StatusSink<'_>, message: String) {
    debug!(status = %message);
    if let Some(sink) = status {
        sink(&message);
    }
}

/// What to do when the enhancement stage fails or mangles the image directives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhanceFailure {
    /// Keep the draft and carry on.
    #[default]
    Degrade,
    /// Fail the lesson like any other stage.
    Abort,
}

impl std::str::FromStr for EnhanceFailure {
    type Err = CourseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(Self::Degrade),
            "abort" => Ok(Self::Abort),
            other => Err(CourseError::validation(format!(
                "Unknown enhance failure policy '{}' (expected degrade or abort)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for EnhanceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Degrade => write!(f, "degrade"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// A lesson located in its tree, with the titles the draft prompt needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonContext {
    pub id: LessonId,
    pub position: LessonPosition,
    pub title: String,
    pub qualified_title: String,
    pub previous_title: Option<String>,
    pub next_title: Option<String>,
}

impl LessonContext {
    pub fn locate(tree: &CourseTree, id: LessonId) -> Result<Self> {
        let entry = tree.locate(id).ok_or(CourseError::LessonNotFound(id))?;
        let (previous, next) = tree.neighbors(id);
        Ok(Self {
            id,
            position: entry.position,
            title: entry.lesson.title.clone(),
            qualified_title: entry.numbered_title(),
            previous_title: previous.map(|l| l.title.clone()),
            next_title: next.map(|l| l.title.clone()),
        })
    }

    pub fn brief<'a>(&'a self, syllabus: &'a SyllabusMeta) -> LessonBrief<'a> {
        LessonBrief {
            theme: &syllabus.theme,
            outline: &syllabus.markdown,
            lesson_title: &self.qualified_title,
            previous_title: self.previous_title.as_deref(),
            next_title: self.next_title.as_deref(),
            context: syllabus.context.as_deref(),
        }
    }
}

pub struct StageRunner<'a> {
    service: &'a dyn GenerativeService,
    cancel: &'a CancellationToken,
    enhance_failure: EnhanceFailure,
}

impl<'a> StageRunner<'a> {
    pub fn new(service: &'a dyn GenerativeService, cancel: &'a CancellationToken) -> Self {
        Self {
            service,
            cancel,
            enhance_failure: EnhanceFailure::default(),
        }
    }

    pub fn with_enhance_failure(mut self, policy: EnhanceFailure) -> Self {
        self.enhance_failure = policy;
        self
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(CourseError::Cancelled);
        }
        Ok(())
    }

    /// Runs draft, enhance and image resolution for one lesson.
    pub async fn run(&self, brief: &LessonBrief<'_>, status: StatusSink<'_>) -> Result<String> {
        info!(lesson = brief.lesson_title, "generating lesson");

        report(status, "Drafting lesson content...".to_string());
        self.check_cancelled()?;
        let draft = self
            .service
            .draft_lesson(brief)
            .await
            .map_err(|e| CourseError::from_service("drafting lesson", e))?;

        report(status, "Refining layout and code samples...".to_string());
        self.check_cancelled()?;
        let enhanced = self.enhance(&draft).await?;

        report(status, "Resolving images...".to_string());
        ImageResolver::new(self.service, self.cancel)
            .resolve(&enhanced, status)
            .await
    }

    async fn enhance(&self, draft: &str) -> Result<String> {
        let failure = match self.service.enhance(draft).await {
            Ok(reply) => {
                let normalized = markup::normalize_enhanced(&reply);
                if normalized.trim().is_empty() {
                    ServiceError::new(None, "enhancement returned no markup")
                } else if directive_tags(&normalized) != directive_tags(draft) {
                    ServiceError::new(None, "enhancement altered the image directives")
                } else {
                    return Ok(normalized);
                }
            }
            Err(err) => err,
        };

        match self.enhance_failure {
            EnhanceFailure::Degrade => {
                warn!("enhancement failed, keeping draft: {}", failure);
                Ok(draft.to_string())
            }
            EnhanceFailure::Abort => Err(CourseError::generation("enhancing lesson", failure)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::scripted::{quota_error, server_error, Call, ScriptedService};
    use crate::model::SyllabusRecord;
    use crate::store::memory::fixtures::SAMPLE_OUTLINE;

    const DRAFT: &str = r#"<article><section><h2>Step 1</h2><ai-image-placeholder prompt="a rack"></section></article>"#;

    fn record() -> SyllabusRecord {
        SyllabusRecord::new("Rust".into(), None, SAMPLE_OUTLINE.into())
    }

    async fn run(service: &ScriptedService, policy: EnhanceFailure) -> Result<String> {
        let meta = record().meta();
        let ctx = LessonContext::locate(&CourseTree::parse(&meta.markdown), 2).unwrap();
        let cancel = CancellationToken::new();
        StageRunner::new(service, &cancel)
            .with_enhance_failure(policy)
            .run(&ctx.brief(&meta), None)
            .await
    }

    #[test]
    fn context_names_neighbours() {
        let record = record();
        let ctx = LessonContext::locate(&record.tree(), 3).unwrap();
        assert_eq!(ctx.qualified_title, "Module 2 - Lesson 1: Shipping it");
        assert_eq!(ctx.previous_title.as_deref(), Some("First program"));
        assert!(ctx.next_title.is_none());

        let err = LessonContext::locate(&record.tree(), 42).unwrap_err();
        assert!(matches!(err, CourseError::LessonNotFound(42)));
    }

    #[tokio::test]
    async fn stages_run_in_order() {
        let service = ScriptedService::new().with_draft("First program", DRAFT);
        let out = run(&service, EnhanceFailure::Degrade).await.unwrap();

        assert!(out.contains(r#"<img src="data:image/png;base64,IMG1" alt="a rack">"#));
        assert_eq!(
            service.calls(),
            vec![
                Call::Draft("Module 1 - Lesson 2: First program".into()),
                Call::Enhance,
                Call::Image("a rack".into()),
            ]
        );
    }

    #[tokio::test]
    async fn enhance_failure_degrades_to_draft() {
        let service = ScriptedService::new()
            .with_draft("First program", DRAFT)
            .fail_enhance(server_error());
        let out = run(&service, EnhanceFailure::Degrade).await.unwrap();
        assert!(out.starts_with("<article><section><h2>Step 1</h2><img"));
    }

    #[tokio::test]
    async fn enhance_failure_aborts_when_configured() {
        let service = ScriptedService::new()
            .with_draft("First program", DRAFT)
            .fail_enhance(server_error());
        let err = run(&service, EnhanceFailure::Abort).await.unwrap_err();
        assert!(matches!(err, CourseError::Generation { .. }));
        assert!(service.image_calls().is_empty());
    }

    #[tokio::test]
    async fn enhancement_that_drops_directives_is_rejected() {
        let service = ScriptedService::new()
            .with_draft("First program", DRAFT)
            .with_enhance_reply("<article><h2>Step 1</h2></article>");
        let out = run(&service, EnhanceFailure::Degrade).await.unwrap();
        assert!(out.contains("alt=\"a rack\""));
    }

    #[tokio::test]
    async fn enhanced_reply_is_normalized() {
        let service = ScriptedService::new()
            .with_draft("First program", "<article><p>x</p></article>")
            .with_enhance_reply("```html\n<article><h1>Title</h1><pre><b></pre></article>\n```");
        let out = run(&service, EnhanceFailure::Degrade).await.unwrap();
        assert_eq!(out, "<article><pre>&lt;b&gt;</pre></article>");
    }

    #[tokio::test]
    async fn draft_quota_failure_is_retryable() {
        let service = ScriptedService::new().fail_draft("First program", quota_error());
        let err = run(&service, EnhanceFailure::Degrade).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(service.calls().len(), 1);
    }

    #[tokio::test]
    async fn reports_each_stage() {
        let service = ScriptedService::new();
        let meta = record().meta();
        let ctx = LessonContext::locate(&CourseTree::parse(&meta.markdown), 1).unwrap();
        let cancel = CancellationToken::new();
        let seen = std::sync::Mutex::new(Vec::new());
        let sink = |s: &str| seen.lock().unwrap().push(s.to_string());

        StageRunner::new(&service, &cancel)
            .run(&ctx.brief(&meta), Some(&sink))
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "Drafting lesson content...",
                "Refining layout and code samples...",
                "Resolving images...",
            ]
        );
    }
}
