use crate::cache::ContentCache;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{CourseError, Result};
use crate::export;
use crate::history::History;
use crate::jobs::JobOrchestrator;
use crate::model::{CourseTree, LessonId};
use crate::pipeline::{LessonContext, StageRunner, StatusSink};
use crate::service::GenerativeService;
use crate::store::HistoryStore;
use tracing::info;

/// Returns a lesson's resolved content, generating it when nothing is cached.
///
/// With `force`, cached content is regenerated. The new body only replaces the cached
/// one once the whole pipeline has succeeded, so a failed regeneration keeps the old text.
#[allow(clippy::too_many_arguments)]
pub async fn run<S: HistoryStore>(
    history: &mut History<S>,
    service: &dyn GenerativeService,
    jobs: &JobOrchestrator,
    selector: &str,
    lesson_id: LessonId,
    force: bool,
    status: StatusSink<'_>,
) -> Result<CmdResult> {
    let syllabus = history.resolve(selector)?.meta();
    let tree = syllabus_tree(&syllabus.markdown)?;
    let entry = tree
        .locate(lesson_id)
        .ok_or(CourseError::LessonNotFound(lesson_id))?;

    let mut result = CmdResult::default();
    let cached = if force {
        None
    } else {
        history.get(&syllabus.id, lesson_id).map(str::to_string)
    };

    let body = match cached {
        Some(body) => {
            info!(syllabus = %syllabus.id, lesson = lesson_id, "serving cached lesson");
            result.add_message(CmdMessage::info(format!(
                "Loaded from cache: {}",
                entry.numbered_title()
            )));
            body
        }
        None => {
            let context = LessonContext::locate(&tree, lesson_id)?;
            let body = StageRunner::new(service, jobs.cancel_token())
                .with_enhance_failure(jobs.enhance_failure())
                .run(&context.brief(&syllabus), status)
                .await?;
            history.put(&syllabus.id, lesson_id, body.clone())?;
            result.add_message(CmdMessage::success(format!(
                "Lesson generated: {}",
                entry.numbered_title()
            )));
            body
        }
    };

    let artifact = export::lesson_artifact(&entry, &body)?;
    Ok(result.with_text(body).with_artifact(artifact))
}

fn syllabus_tree(markdown: &str) -> Result<CourseTree> {
    let tree = CourseTree::parse(markdown);
    if tree.is_empty() {
        return Err(CourseError::validation(
            "The syllabus has no lessons. Check the outline format.",
        ));
    }
    Ok(tree)
}
