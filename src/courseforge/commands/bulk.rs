use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::export;
use crate::history::History;
use crate::jobs::{CollectedCourse, JobOrchestrator};
use crate::service::GenerativeService;
use crate::store::HistoryStore;

/// Resolves every lesson and packs them as one document per lesson.
pub async fn archive<S: HistoryStore>(
    history: &mut History<S>,
    service: &dyn GenerativeService,
    jobs: &mut JobOrchestrator,
    selector: &str,
) -> Result<CmdResult> {
    let syllabus = history.resolve(selector)?.meta();
    let course = jobs.collect_course(service, history, &syllabus).await?;
    let artifact = export::archive::archive_artifact(&syllabus, &course)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Course archive ready: {} lessons{}",
        course.lessons.len(),
        reuse_note(&course)
    )));
    Ok(result.with_artifact(artifact))
}

/// Resolves every lesson plus a cover and renders the consolidated ebook.
pub async fn ebook<S: HistoryStore>(
    history: &mut History<S>,
    service: &dyn GenerativeService,
    jobs: &mut JobOrchestrator,
    selector: &str,
    author: &str,
) -> Result<CmdResult> {
    let syllabus = history.resolve(selector)?.meta();
    let author = author.trim();
    let course = jobs
        .collect_ebook(service, history, &syllabus, author)
        .await?;
    let artifact = export::ebook_artifact(&syllabus, &course, author)?;

    let mut result = CmdResult::default();
    if course.cover.is_none() {
        result.add_message(CmdMessage::warning(
            "The cover image could not be generated; the ebook has a text-only cover.",
        ));
    }
    result.add_message(CmdMessage::success(format!(
        "Ebook ready: {} lessons{}",
        course.lessons.len(),
        reuse_note(&course)
    )));
    Ok(result.with_artifact(artifact))
}

fn reuse_note(course: &CollectedCourse) -> String {
    match course.reused {
        0 => String::new(),
        n => format!(" ({} from cache)", n),
    }
}
