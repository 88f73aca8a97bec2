use crate::commands::{CmdMessage, CmdResult};
use crate::error::{CourseError, Result};
use crate::export::{slugify, Artifact};
use crate::service::GenerativeService;
use once_cell::sync::Lazy;
use regex::Regex;

static MERMAID_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*```(?:mermaid)?[ \t]*\n?|\n?```\s*$").unwrap());

/// Drops a surrounding code fence, if the model added one.
pub fn strip_fences(text: &str) -> String {
    MERMAID_FENCE.replace_all(text, "").trim().to_string()
}

/// Mermaid source for a free-text concept. Standalone; nothing is stored.
pub async fn run(service: &dyn GenerativeService, concept: &str) -> Result<CmdResult> {
    let concept = concept.trim();
    if concept.is_empty() {
        return Err(CourseError::validation(
            "Please describe the concept to diagram.",
        ));
    }

    let reply = service
        .generate_diagram(concept)
        .await
        .map_err(|e| CourseError::from_service("generating diagram", e))?;
    let source = strip_fences(&reply);
    if source.is_empty() {
        return Err(CourseError::validation(
            "The diagram came back empty. Try describing the concept differently.",
        ));
    }

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success("Diagram generated"));
    let artifact = Artifact::new(format!("diagram-{}.mmd", slugify(concept)), source.clone());
    Ok(result.with_text(source).with_artifact(artifact))
}
