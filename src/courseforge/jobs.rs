//! # Bulk Jobs
//!
//! Walks every lesson of a syllabus in document order and makes sure each has resolved
//! content, for the archive and ebook deliverables.
//!
//! Per lesson the rule is cache-or-generate: a cached body is reused after a short pause (so
//! progress can be seen), otherwise the [`StageRunner`] runs and its result is cached before
//! the next lesson starts. The first failure ends the job, but everything cached up to that
//! point stays cached, so running the same job again resumes at the lesson that failed.
//!
//! Progress is published on a `watch` channel owned by the orchestrator. Receivers see
//! `None` while idle; the channel goes back to `None` when a job ends, however it ends.
//!
//! Jobs take `&mut self`, so one orchestrator never runs two jobs at once.
//!
//! An ebook job that fails after its cover was generated keeps the cover, and the next ebook
//! job for the same syllabus uses it instead of asking for another one.

use crate::cache::ContentCache;
use crate::error::{CourseError, Result};
use crate::model::{CourseTree, LessonId, SyllabusMeta};
use crate::pipeline::{EnhanceFailure, LessonContext, StageRunner};
use crate::service::{prompts, GenerativeService, ImagePayload};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const DEFAULT_CACHE_HIT_PAUSE: Duration = Duration::from_millis(50);

/// Snapshot of a running job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkProgress {
    /// 1-based index of the lesson being handled, 0 while the cover is generated.
    pub current: usize,
    pub total: usize,
    pub status: String,
    pub lesson_title: String,
}

/// Everything a deliverable needs once a job has finished.
#[derive(Debug, Clone)]
pub struct CollectedCourse {
    pub tree: CourseTree,
    pub lessons: BTreeMap<LessonId, String>,
    pub cover: Option<ImagePayload>,
    /// Lessons served from the cache rather than generated.
    pub reused: usize,
}

pub struct JobOrchestrator {
    progress: watch::Sender<Option<BulkProgress>>,
    cancel: CancellationToken,
    cache_hit_pause: Duration,
    enhance_failure: EnhanceFailure,
    /// Cover of an unfinished ebook job, by syllabus id.
    kept_cover: Option<(String, ImagePayload)>,
}

impl Default for JobOrchestrator {
    fn default() -> Self {
        Self::new(CancellationToken::new())
    }
}

impl JobOrchestrator {
    pub fn new(cancel: CancellationToken) -> Self {
        let (progress, _) = watch::channel(None);
        Self {
            progress,
            cancel,
            cache_hit_pause: DEFAULT_CACHE_HIT_PAUSE,
            enhance_failure: EnhanceFailure::default(),
            kept_cover: None,
        }
    }

    pub fn with_cache_hit_pause(mut self, pause: Duration) -> Self {
        self.cache_hit_pause = pause;
        self
    }

    pub fn with_enhance_failure(mut self, policy: EnhanceFailure) -> Self {
        self.enhance_failure = policy;
        self
    }

    /// Read-only view of job progress.
    pub fn subscribe(&self) -> watch::Receiver<Option<BulkProgress>> {
        self.progress.subscribe()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Swaps a cancelled token for a fresh one so later jobs can run.
    pub fn renew_cancel_token(&mut self) -> &CancellationToken {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        &self.cancel
    }

    pub fn enhance_failure(&self) -> EnhanceFailure {
        self.enhance_failure
    }

    /// Resolves every lesson for the per-lesson archive.
    pub async fn collect_course<C: ContentCache>(
        &mut self,
        service: &dyn GenerativeService,
        cache: &mut C,
        syllabus: &SyllabusMeta,
    ) -> Result<CollectedCourse> {
        let tree = lesson_tree(syllabus)?;
        let result = self.collect_lessons(service, cache, syllabus, tree).await;
        self.finish(&result);
        result
    }

    /// Resolves every lesson plus a best-effort cover for the consolidated document.
    pub async fn collect_ebook<C: ContentCache>(
        &mut self,
        service: &dyn GenerativeService,
        cache: &mut C,
        syllabus: &SyllabusMeta,
        author: &str,
    ) -> Result<CollectedCourse> {
        if author.trim().is_empty() {
            return Err(CourseError::validation(
                "Please enter the author name for the ebook cover.",
            ));
        }
        let tree = lesson_tree(syllabus)?;

        let result = match self.cover(service, syllabus, tree.lesson_count()).await {
            Ok(cover) => match self.collect_lessons(service, cache, syllabus, tree).await {
                Ok(course) => Ok(CollectedCourse { cover, ..course }),
                Err(err) => {
                    self.kept_cover = cover.map(|cover| (syllabus.id.clone(), cover));
                    Err(err)
                }
            },
            Err(err) => Err(err),
        };
        self.finish(&result);
        result
    }

    fn finish(&self, result: &Result<CollectedCourse>) {
        if let Err(err) = result {
            error!("bulk job stopped: {}", err);
        }
        self.progress.send_replace(None);
    }

    fn publish(&self, current: usize, total: usize, status: String, lesson_title: String) {
        self.progress.send_replace(Some(BulkProgress {
            current,
            total,
            status,
            lesson_title,
        }));
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(CourseError::Cancelled);
        }
        Ok(())
    }

    async fn cover(
        &mut self,
        service: &dyn GenerativeService,
        syllabus: &SyllabusMeta,
        total: usize,
    ) -> Result<Option<ImagePayload>> {
        if let Some((id, cover)) = self.kept_cover.take() {
            if id == syllabus.id {
                info!(syllabus = %syllabus.id, "reusing cover from the previous attempt");
                self.publish(
                    0,
                    total,
                    "Reusing cover image...".to_string(),
                    syllabus.theme.clone(),
                );
                self.check_cancelled()?;
                return Ok(Some(cover));
            }
        }
        self.publish(
            0,
            total,
            "Generating cover image...".to_string(),
            syllabus.theme.clone(),
        );
        self.check_cancelled()?;
        match service
            .generate_image(&prompts::cover_prompt(&syllabus.theme))
            .await
        {
            Ok(cover) => Ok(Some(cover)),
            Err(err) => {
                warn!("cover generation failed, continuing without a cover: {}", err);
                Ok(None)
            }
        }
    }

    async fn pause_on_cache_hit(&self) -> Result<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(CourseError::Cancelled),
            _ = tokio::time::sleep(self.cache_hit_pause) => Ok(()),
        }
    }

    async fn collect_lessons<C: ContentCache>(
        &self,
        service: &dyn GenerativeService,
        cache: &mut C,
        syllabus: &SyllabusMeta,
        tree: CourseTree,
    ) -> Result<CollectedCourse> {
        let entries = tree.entries();
        let total = entries.len();
        let mut lessons = BTreeMap::new();
        let mut reused = 0;

        info!(syllabus = %syllabus.id, total, "bulk job started");
        for (index, entry) in entries.iter().enumerate() {
            let current = index + 1;
            let id = entry.lesson.id;
            let label = entry.position.short_label(&entry.lesson.title);

            if let Some(content) = cache.get(&syllabus.id, id) {
                lessons.insert(id, content.to_string());
                reused += 1;
                self.publish(current, total, "Retrieving from cache...".to_string(), label);
                self.check_cancelled()?;
                self.pause_on_cache_hit().await?;
                continue;
            }

            self.publish(
                current,
                total,
                format!("Generating lesson {}/{}...", current, total),
                label,
            );
            let context = LessonContext::locate(&tree, id)?;
            let progress = &self.progress;
            let sink = |status: &str| {
                progress.send_modify(|p| {
                    if let Some(p) = p.as_mut() {
                        p.status = status.to_string();
                    }
                })
            };
            let content = StageRunner::new(service, &self.cancel)
                .with_enhance_failure(self.enhance_failure)
                .run(&context.brief(syllabus), Some(&sink))
                .await?;

            cache.put(&syllabus.id, id, content.clone())?;
            lessons.insert(id, content);
        }
        info!(syllabus = %syllabus.id, total, reused, "bulk job finished");

        Ok(CollectedCourse {
            tree: tree.clone(),
            lessons,
            cover: None,
            reused,
        })
    }
}

fn lesson_tree(syllabus: &SyllabusMeta) -> Result<CourseTree> {
    let tree = CourseTree::parse(&syllabus.markdown);
    if tree.is_empty() {
        return Err(CourseError::validation(
            "The syllabus has no lessons to generate. Check the outline format.",
        ));
    }
    Ok(tree)
}
