use crate::commands::{CmdMessage, CmdResult, SyllabusSummary};
use crate::error::Result;
use crate::history::History;
use crate::store::HistoryStore;

pub fn run<S: HistoryStore>(history: &History<S>) -> Result<CmdResult> {
    let summaries: Vec<SyllabusSummary> = history
        .records()
        .iter()
        .enumerate()
        .map(|(i, record)| SyllabusSummary::of(i + 1, record))
        .collect();

    let mut result = CmdResult::default();
    if summaries.is_empty() {
        result.add_message(CmdMessage::info(
            "No syllabi yet. Create one with: courseforge new \"<theme>\"",
        ));
    }
    Ok(result.with_summaries(summaries))
}
