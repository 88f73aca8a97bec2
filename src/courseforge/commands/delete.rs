use crate::cache::ContentCache;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{CourseError, Result};
use crate::history::History;
use crate::model::LessonId;
use crate::store::HistoryStore;

/// Removes a syllabus and everything cached for it.
pub fn run<S: HistoryStore>(history: &mut History<S>, selector: &str) -> Result<CmdResult> {
    let id = history.resolve(selector)?.id.clone();
    let removed = history.remove(&id)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Syllabus deleted: {}",
        removed.theme
    )));
    Ok(result)
}

/// Drops one lesson's generated content so the next request regenerates it.
pub fn forget<S: HistoryStore>(
    history: &mut History<S>,
    selector: &str,
    lesson_id: LessonId,
) -> Result<CmdResult> {
    let record = history.resolve(selector)?;
    let id = record.id.clone();
    let title = record
        .tree()
        .locate(lesson_id)
        .map(|entry| entry.numbered_title())
        .ok_or(CourseError::LessonNotFound(lesson_id))?;

    let mut result = CmdResult::default();
    if history.delete(&id, lesson_id) {
        result.add_message(CmdMessage::success(format!(
            "Generated content removed: {}",
            title
        )));
    } else {
        result.add_message(CmdMessage::info(format!(
            "Nothing cached for {}",
            title
        )));
    }
    Ok(result)
}
