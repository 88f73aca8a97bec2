use crate::cache::ContentCache;
use crate::commands::{empty_tree_notice, CmdResult, SyllabusView};
use crate::error::{CourseError, Result};
use crate::export;
use crate::history::History;
use crate::model::LessonId;
use crate::store::HistoryStore;

/// The parsed structure of a syllabus, with the lessons that currently have content.
pub fn show<S: HistoryStore>(history: &History<S>, selector: &str) -> Result<CmdResult> {
    let record = history.resolve(selector)?;
    let tree = record.tree();
    let cached: Vec<LessonId> = record.cached_lessons.keys().copied().collect();

    let mut result = CmdResult::default();
    if tree.is_empty() {
        result.add_message(empty_tree_notice());
    }
    Ok(result.with_view(SyllabusView {
        syllabus: record.meta(),
        tree,
        cached,
    }))
}

/// The raw outline text as a `syllabus-<slug>.md` download.
pub fn outline<S: HistoryStore>(history: &History<S>, selector: &str) -> Result<CmdResult> {
    let record = history.resolve(selector)?;
    let artifact = export::outline_artifact(&record.meta());
    Ok(CmdResult::default()
        .with_text(record.markdown.clone())
        .with_artifact(artifact))
}

/// Live-preview markup for a lesson that already has content.
pub fn preview<S: HistoryStore>(
    history: &History<S>,
    selector: &str,
    lesson_id: LessonId,
) -> Result<CmdResult> {
    let record = history.resolve(selector)?;
    if record.tree().locate(lesson_id).is_none() {
        return Err(CourseError::LessonNotFound(lesson_id));
    }
    let body = history
        .get(&record.id, lesson_id)
        .ok_or(CourseError::MissingContent(lesson_id))?;
    Ok(CmdResult::default().with_text(export::preview_fragment(body)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::LESSON_CSS;
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;

    fn history() -> History<InMemoryStore> {
        History::open(StoreFixture::new().with_sample().store).unwrap()
    }

    #[test]
    fn show_reports_tree_and_cached_lessons() {
        let mut history = history();
        history.put("sample-id", 2, "<p>two</p>".into()).unwrap();

        let result = show(&history, "1").unwrap();
        let view = result.view.unwrap();
        assert_eq!(view.tree.lesson_count(), 3);
        assert_eq!(view.cached, vec![2]);
        assert!(result.messages.is_empty());
    }

    #[test]
    fn show_flags_unstructured_outline() {
        let history = History::open(
            StoreFixture::new()
                .with_syllabus("x", "X", "just prose")
                .store,
        )
        .unwrap();
        let result = show(&history, "x").unwrap();
        assert!(result.view.unwrap().tree.is_empty());
        assert_eq!(result.messages.len(), 1);
    }

    #[test]
    fn outline_downloads_markdown() {
        let result = outline(&history(), "sample").unwrap();
        assert_eq!(result.artifacts[0].filename, "syllabus-rust-for-beginners.md");
        assert!(result.text.unwrap().starts_with("Module 1: Foundations"));
    }

    #[test]
    fn preview_wraps_cached_content_with_stylesheet() {
        let mut history = history();
        history.put("sample-id", 1, "<p>one</p>".into()).unwrap();
        let text = preview(&history, "1", 1).unwrap().text.unwrap();
        assert!(text.contains(LESSON_CSS));
        assert!(text.contains("<p>one</p>"));
    }

    #[test]
    fn preview_needs_generated_content() {
        let history = history();
        assert!(matches!(
            preview(&history, "1", 1).unwrap_err(),
            CourseError::MissingContent(1)
        ));
        assert!(matches!(
            preview(&history, "1", 9).unwrap_err(),
            CourseError::LessonNotFound(9)
        ));
    }
}
