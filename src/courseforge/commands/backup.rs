use crate::commands::{CmdMessage, CmdResult};
use crate::error::{CourseError, Result};
use crate::export::Artifact;
use crate::history::History;
use crate::model::SyllabusRecord;
use crate::store::HistoryStore;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::info;

const REQUIRED_FIELDS: &[&str] = &["id", "theme", "markdown"];

/// Full records, cached lessons included, as `backup-courses-YYYY-MM-DD.json`.
pub fn backup<S: HistoryStore>(history: &History<S>, date: NaiveDate) -> Result<CmdResult> {
    let json = serde_json::to_string_pretty(history.records())?;
    let filename = format!("backup-courses-{}.json", date.format("%Y-%m-%d"));

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Backed up {} syllabi",
        history.records().len()
    )));
    Ok(result.with_artifact(Artifact::new(filename, json)))
}

/// Replaces the whole history with the records of a backup file.
pub fn restore<S: HistoryStore>(history: &mut History<S>, json: &str) -> Result<CmdResult> {
    let records = parse_backup(json)?;
    let count = records.len();
    let cached: usize = records.iter().map(|r| r.cached_lessons.len()).sum();
    history.replace_all(records)?;
    info!(count, cached, "history restored from backup");

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Restored {} syllabi ({} cached lessons)",
        count, cached
    )));
    Ok(result)
}

fn invalid() -> CourseError {
    CourseError::validation(
        "Invalid backup file: expected a list of syllabi, each with an id, a theme and an outline.",
    )
}

/// Checks the shape before deserializing, so a bad file never touches the history.
pub fn parse_backup(json: &str) -> Result<Vec<SyllabusRecord>> {
    let value: Value = serde_json::from_str(json).map_err(|_| invalid())?;
    let Value::Array(items) = value else {
        return Err(invalid());
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let complete = REQUIRED_FIELDS.iter().all(|field| {
            item.get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.trim().is_empty())
        });
        if !complete {
            return Err(invalid());
        }
        let mut record: SyllabusRecord = serde_json::from_value(item).map_err(|_| invalid())?;
        record.context = record.context.filter(|c| !c.trim().is_empty());
        records.push(record);
    }
    Ok(records)
}
