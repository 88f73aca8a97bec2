use crate::commands::{empty_tree_notice, CmdMessage, CmdResult, SyllabusSummary};
use crate::error::{CourseError, Result};
use crate::history::History;
use crate::model::CourseTree;
use crate::store::HistoryStore;

/// Replaces a syllabus' outline text. Lesson ids are re-derived from the new text, so any
/// cached lesson content is discarded.
pub fn run<S: HistoryStore>(
    history: &mut History<S>,
    selector: &str,
    markdown: String,
) -> Result<CmdResult> {
    if markdown.trim().is_empty() {
        return Err(CourseError::validation("The outline text cannot be empty."));
    }

    let (id, dropped) = {
        let record = history.resolve(selector)?;
        (record.id.clone(), record.cached_lessons.len())
    };
    let empty = CourseTree::parse(&markdown).is_empty();
    history.update_markdown(&id, markdown)?;

    let position = history
        .records()
        .iter()
        .position(|r| r.id == id)
        .map(|i| i + 1)
        .unwrap_or(1);
    let summary = SyllabusSummary::of(position, history.find(&id)?);

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Outline updated: {} - {} modules, {} lessons",
        summary.theme, summary.modules, summary.lessons
    )));
    if dropped > 0 {
        result.add_message(CmdMessage::warning(format!(
            "Discarded {} generated lesson(s); they no longer match the outline.",
            dropped
        )));
    }
    if empty {
        result.add_message(empty_tree_notice());
    }
    Ok(result.with_summaries(vec![summary]))
}
