//! Deterministic stand-in for the generative service.
//!
//! Replies are derived from the request (drafts echo the lesson title, enhancement echoes
//! its input) unless a reply or failure has been scripted. Every call is recorded so tests
//! can assert on what was, and was not, requested.

use super::{GenerativeService, ImagePayload, LessonBrief, ServiceError, ServiceResult};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Syllabus(String),
    Draft(String),
    Enhance,
    Image(String),
    Diagram(String),
}

struct Failure {
    matcher: String,
    remaining: Option<usize>,
    error: ServiceError,
}

impl Failure {
    /// Consumes one use of the failure if it applies to `subject`.
    fn take(&mut self, subject: &str) -> Option<ServiceError> {
        if !subject.contains(&self.matcher) || self.remaining == Some(0) {
            return None;
        }
        if let Some(n) = self.remaining.as_mut() {
            *n -= 1;
        }
        Some(self.error.clone())
    }
}

fn take_failure(failures: &mut [Failure], subject: &str) -> Option<ServiceError> {
    failures.iter_mut().find_map(|f| f.take(subject))
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    syllabus: Option<String>,
    drafts: Vec<(String, String)>,
    enhance_reply: Option<String>,
    diagram: Option<String>,
    images_served: usize,
    syllabus_failures: Vec<Failure>,
    draft_failures: Vec<Failure>,
    enhance_failures: Vec<Failure>,
    image_failures: Vec<Failure>,
    diagram_failures: Vec<Failure>,
}

#[derive(Default)]
pub struct ScriptedService {
    state: Mutex<State>,
}

pub fn quota_error() -> ServiceError {
    ServiceError::new(Some(429), "429 (RESOURCE_EXHAUSTED): quota exceeded")
}

pub fn server_error() -> ServiceError {
    ServiceError::new(Some(500), "500 (INTERNAL): backend unavailable")
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    fn edit(self, f: impl FnOnce(&mut State)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn with_syllabus(self, outline: &str) -> Self {
        self.edit(|s| s.syllabus = Some(outline.to_string()))
    }

    /// Draft returned for any lesson whose qualified title contains `title`.
    pub fn with_draft(self, title: &str, markup: &str) -> Self {
        self.edit(|s| s.drafts.push((title.to_string(), markup.to_string())))
    }

    pub fn with_enhance_reply(self, markup: &str) -> Self {
        self.edit(|s| s.enhance_reply = Some(markup.to_string()))
    }

    pub fn with_diagram(self, text: &str) -> Self {
        self.edit(|s| s.diagram = Some(text.to_string()))
    }

    pub fn fail_syllabus(self, error: ServiceError) -> Self {
        self.edit(|s| s.syllabus_failures.push(always("", error)))
    }

    pub fn fail_draft(self, title: &str, error: ServiceError) -> Self {
        self.edit(|s| s.draft_failures.push(always(title, error)))
    }

    pub fn fail_enhance(self, error: ServiceError) -> Self {
        self.edit(|s| s.enhance_failures.push(always("", error)))
    }

    /// Every image request whose prompt contains `prompt` fails.
    pub fn fail_image(self, prompt: &str, error: ServiceError) -> Self {
        self.edit(|s| s.image_failures.push(always(prompt, error)))
    }

    /// The next `times` matching image requests fail, later ones succeed.
    pub fn fail_image_times(self, prompt: &str, times: usize, error: ServiceError) -> Self {
        self.edit(|s| {
            s.image_failures.push(Failure {
                matcher: prompt.to_string(),
                remaining: Some(times),
                error,
            })
        })
    }

    pub fn fail_diagram(self, error: ServiceError) -> Self {
        self.edit(|s| s.diagram_failures.push(always("", error)))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn draft_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Draft(title) => Some(title),
                _ => None,
            })
            .collect()
    }

    pub fn image_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Image(prompt) => Some(prompt),
                _ => None,
            })
            .collect()
    }
}

fn always(matcher: &str, error: ServiceError) -> Failure {
    Failure {
        matcher: matcher.to_string(),
        remaining: None,
        error,
    }
}

/// Draft used when nothing was scripted for a lesson.
pub fn default_draft(lesson_title: &str) -> String {
    format!(
        "<article><section><h2>{}</h2><p>Step by step.</p></section></article>",
        lesson_title
    )
}

#[async_trait]
impl GenerativeService for ScriptedService {
    async fn generate_syllabus(
        &self,
        theme: &str,
        _context: Option<&str>,
    ) -> ServiceResult<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Syllabus(theme.to_string()));
        if let Some(err) = take_failure(&mut state.syllabus_failures, theme) {
            return Err(err);
        }
        Ok(state.syllabus.clone().unwrap_or_else(|| {
            format!(
                "Module 1: {theme} basics\nLesson 1: Getting started\n- Objective: start\n- Topics: a, b"
            )
        }))
    }

    async fn draft_lesson(&self, brief: &LessonBrief<'_>) -> ServiceResult<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Draft(brief.lesson_title.to_string()));
        if let Some(err) = take_failure(&mut state.draft_failures, brief.lesson_title) {
            return Err(err);
        }
        Ok(state
            .drafts
            .iter()
            .find(|(title, _)| brief.lesson_title.contains(title.as_str()))
            .map(|(_, markup)| markup.clone())
            .unwrap_or_else(|| default_draft(brief.lesson_title)))
    }

    async fn enhance(&self, markup: &str) -> ServiceResult<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Enhance);
        if let Some(err) = take_failure(&mut state.enhance_failures, markup) {
            return Err(err);
        }
        Ok(state
            .enhance_reply
            .clone()
            .unwrap_or_else(|| markup.to_string()))
    }

    async fn generate_image(&self, prompt: &str) -> ServiceResult<ImagePayload> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Image(prompt.to_string()));
        if let Some(err) = take_failure(&mut state.image_failures, prompt) {
            return Err(err);
        }
        state.images_served += 1;
        Ok(ImagePayload::png(format!("IMG{}", state.images_served)))
    }

    async fn generate_diagram(&self, concept: &str) -> ServiceResult<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Diagram(concept.to_string()));
        if let Some(err) = take_failure(&mut state.diagram_failures, concept) {
            return Err(err);
        }
        Ok(state
            .diagram
            .clone()
            .unwrap_or_else(|| format!("```mermaid\nflowchart TD\n  A[{}] --> B\n```", concept)))
    }
}
