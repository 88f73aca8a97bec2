//! # API Facade
//!
//! The single entry point for every courseforge operation, whatever the UI.
//!
//! The facade owns the long-lived pieces a session needs and hands them to the command
//! functions:
//!
//! - the [`History`] repository over a [`HistoryStore`],
//! - the [`GenerativeService`] (absent when no API key is configured; only commands that
//!   generate anything need it),
//! - the [`JobOrchestrator`] with its progress channel and cancellation token,
//! - the data directory, where `config.json` lives.
//!
//! It does no business logic and no I/O beyond what the commands do. Results come back as
//! [`CmdResult`] for the client to present.
//!
//! `CourseApi<S: HistoryStore>` is generic over the store: `FileStore` in the binary,
//! `InMemoryStore` in tests.

use crate::commands::{self, CmdResult, ConfigAction};
use crate::config::CourseConfig;
use crate::error::{CourseError, Result};
use crate::history::History;
use crate::jobs::{BulkProgress, JobOrchestrator};
use crate::model::LessonId;
use crate::pipeline::StatusSink;
use crate::service::GenerativeService;
use crate::store::HistoryStore;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub use crate::commands::{CmdMessage, MessageLevel};

pub struct CourseApi<S: HistoryStore> {
    history: History<S>,
    service: Option<Box<dyn GenerativeService>>,
    jobs: JobOrchestrator,
    config: CourseConfig,
    data_dir: PathBuf,
}

impl<S: HistoryStore> CourseApi<S> {
    pub fn new(
        store: S,
        service: Option<Box<dyn GenerativeService>>,
        config: CourseConfig,
        data_dir: PathBuf,
    ) -> Result<Self> {
        let jobs = JobOrchestrator::new(CancellationToken::new())
            .with_cache_hit_pause(Duration::from_millis(config.cache_hit_pause_ms))
            .with_enhance_failure(config.enhance_failure);
        Ok(Self {
            history: History::open(store)?,
            service,
            jobs,
            config,
            data_dir,
        })
    }

    pub fn history(&self) -> &History<S> {
        &self.history
    }

    /// Progress of the running bulk job; `None` while idle.
    pub fn subscribe_progress(&self) -> watch::Receiver<Option<BulkProgress>> {
        self.jobs.subscribe()
    }

    /// Cancelling this token stops the current operation at its next external call.
    pub fn cancel_token(&self) -> CancellationToken {
        self.jobs.cancel_token().clone()
    }

    /// Installs a fresh token once the current one has been cancelled; returns the live one.
    pub fn renew_cancel_token(&mut self) -> CancellationToken {
        self.jobs.renew_cancel_token().clone()
    }

    pub async fn create_syllabus(
        &mut self,
        theme: &str,
        context: Option<&str>,
    ) -> Result<CmdResult> {
        let service = require(&self.service)?;
        commands::syllabus::run(&mut self.history, service, theme, context).await
    }

    pub fn list(&self) -> Result<CmdResult> {
        commands::list::run(&self.history)
    }

    pub fn show(&self, selector: &str) -> Result<CmdResult> {
        commands::view::show(&self.history, selector)
    }

    pub fn outline(&self, selector: &str) -> Result<CmdResult> {
        commands::view::outline(&self.history, selector)
    }

    pub fn edit_outline(&mut self, selector: &str, markdown: String) -> Result<CmdResult> {
        commands::update::run(&mut self.history, selector, markdown)
    }

    pub fn delete(&mut self, selector: &str) -> Result<CmdResult> {
        commands::delete::run(&mut self.history, selector)
    }

    pub fn forget_lesson(&mut self, selector: &str, lesson_id: LessonId) -> Result<CmdResult> {
        commands::delete::forget(&mut self.history, selector, lesson_id)
    }

    pub async fn lesson(
        &mut self,
        selector: &str,
        lesson_id: LessonId,
        force: bool,
        status: StatusSink<'_>,
    ) -> Result<CmdResult> {
        let service = require(&self.service)?;
        commands::lesson::run(
            &mut self.history,
            service,
            &self.jobs,
            selector,
            lesson_id,
            force,
            status,
        )
        .await
    }

    pub fn preview(&self, selector: &str, lesson_id: LessonId) -> Result<CmdResult> {
        commands::view::preview(&self.history, selector, lesson_id)
    }

    pub async fn archive(&mut self, selector: &str) -> Result<CmdResult> {
        let service = require(&self.service)?;
        commands::bulk::archive(&mut self.history, service, &mut self.jobs, selector).await
    }

    /// Without an explicit author, the configured default is used.
    pub async fn ebook(&mut self, selector: &str, author: Option<&str>) -> Result<CmdResult> {
        let author = author
            .or(self.config.author.as_deref())
            .unwrap_or_default()
            .to_string();
        let service = require(&self.service)?;
        commands::bulk::ebook(&mut self.history, service, &mut self.jobs, selector, &author)
            .await
    }

    pub async fn diagram(&self, concept: &str) -> Result<CmdResult> {
        let service = require(&self.service)?;
        commands::diagram::run(service, concept).await
    }

    pub fn backup(&self, date: NaiveDate) -> Result<CmdResult> {
        commands::backup::backup(&self.history, date)
    }

    pub fn restore(&mut self, json: &str) -> Result<CmdResult> {
        commands::backup::restore(&mut self.history, json)
    }

    pub fn config(&self, action: ConfigAction) -> Result<CmdResult> {
        commands::config::run(&self.data_dir, action)
    }
}

fn require(service: &Option<Box<dyn GenerativeService>>) -> Result<&dyn GenerativeService> {
    service.as_deref().ok_or_else(|| {
        CourseError::validation(
            "No API key configured. Set GEMINI_API_KEY (or API_KEY) to generate content.",
        )
    })
}
