use crate::config::CourseConfig;
use crate::export::Artifact;
use crate::model::{CourseTree, LessonId, SyllabusMeta, SyllabusRecord};

pub mod backup;
pub mod bulk;
pub mod config;
pub mod delete;
pub mod diagram;
pub mod lesson;
pub mod list;
pub mod syllabus;
pub mod update;
pub mod view;

pub use config::ConfigAction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// One history row as shown by `list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyllabusSummary {
    /// 1-based position in the history, newest first.
    pub position: usize,
    pub id: String,
    pub theme: String,
    pub modules: usize,
    pub lessons: usize,
    pub cached: usize,
}

impl SyllabusSummary {
    pub fn of(position: usize, record: &SyllabusRecord) -> Self {
        let tree = record.tree();
        Self {
            position,
            id: record.id.clone(),
            theme: record.theme.clone(),
            modules: tree.modules.len(),
            lessons: tree.lesson_count(),
            cached: record.cached_lessons.len(),
        }
    }
}

/// A syllabus with its parsed structure, as shown by `show`.
#[derive(Debug, Clone)]
pub struct SyllabusView {
    pub syllabus: SyllabusMeta,
    pub tree: CourseTree,
    pub cached: Vec<LessonId>,
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub summaries: Vec<SyllabusSummary>,
    pub view: Option<SyllabusView>,
    pub artifacts: Vec<Artifact>,
    /// Plain text output (diagram source, preview markup, config values).
    pub text: Option<String>,
    pub config: Option<CourseConfig>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_summaries(mut self, summaries: Vec<SyllabusSummary>) -> Self {
        self.summaries = summaries;
        self
    }

    pub fn with_view(mut self, view: SyllabusView) -> Self {
        self.view = Some(view);
        self
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_config(mut self, config: CourseConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Notice attached when outline text yields no lessons.
pub(crate) fn empty_tree_notice() -> CmdMessage {
    CmdMessage::info(
        "No modules or lessons were recognized in this outline. Expected lines like \
\"Module 1: Title\" and \"Lesson 1: Title\".",
    )
}
