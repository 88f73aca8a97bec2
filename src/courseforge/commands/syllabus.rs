use crate::commands::{empty_tree_notice, CmdMessage, CmdResult, SyllabusSummary};
use crate::error::{CourseError, Result};
use crate::history::History;
use crate::model::SyllabusRecord;
use crate::service::GenerativeService;
use crate::store::HistoryStore;
use tracing::info;

/// Generates an outline for `theme` and puts it at the top of the history.
pub async fn run<S: HistoryStore>(
    history: &mut History<S>,
    service: &dyn GenerativeService,
    theme: &str,
    context: Option<&str>,
) -> Result<CmdResult> {
    let theme = theme.trim();
    if theme.is_empty() {
        return Err(CourseError::validation("Please enter a course theme."));
    }

    info!(theme, "generating syllabus");
    let markdown = service
        .generate_syllabus(theme, context)
        .await
        .map_err(|e| CourseError::from_service("generating syllabus", e))?;

    let record = SyllabusRecord::new(
        theme.to_string(),
        context.map(str::to_string),
        markdown,
    );
    let summary = SyllabusSummary::of(1, &record);
    let empty = record.tree().is_empty();
    history.prepend(record)?;

    let mut result = CmdResult::default().with_summaries(vec![summary.clone()]);
    result.add_message(CmdMessage::success(format!(
        "Syllabus created ({}): {} - {} modules, {} lessons",
        &summary.id[..8.min(summary.id.len())],
        summary.theme,
        summary.modules,
        summary.lessons
    )));
    if empty {
        result.add_message(empty_tree_notice());
    }
    Ok(result)
}
