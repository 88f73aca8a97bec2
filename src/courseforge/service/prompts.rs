//! Prompt templates for the generative service.
//!
//! Templates are plain text with `[PLACEHOLDER]` markers, embedded at compile time. Every
//! occurrence of a marker is replaced.

use super::LessonBrief;

const SYLLABUS: &str = include_str!("prompts/syllabus.txt");
const LESSON: &str = include_str!("prompts/lesson.txt");
const ENHANCE: &str = include_str!("prompts/enhance.txt");
const DIAGRAM: &str = include_str!("prompts/diagram.txt");

const NO_SYLLABUS_CONTEXT: &str = "No additional context was provided.";
const NO_LESSON_CONTEXT: &str = "Follow standard academic best practices.";
const NO_PREVIOUS: &str = "none (this is the first lesson)";
const NO_NEXT: &str = "none (this is the last lesson)";

const IMAGE_STYLE: &str = "Style: high-quality corporate vector illustration, flat design, \
white background, minimalist. CRITICAL INSTRUCTION: DO NOT INCLUDE ANY TEXT, LETTERS, \
NUMBERS OR WORDS in the image. Use ONLY visual icons, symbols and metaphors.";

fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("[{}]", key), value)
        })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn syllabus_prompt(theme: &str, context: Option<&str>) -> String {
    fill(
        SYLLABUS,
        &[
            ("COURSE_THEME", theme),
            (
                "SUPPORT_CONTEXT",
                non_blank(context).unwrap_or(NO_SYLLABUS_CONTEXT),
            ),
        ],
    )
}

pub fn lesson_prompt(brief: &LessonBrief<'_>) -> String {
    // The outline goes in last so marker-looking text inside it is left alone.
    let filled = fill(
        LESSON,
        &[
            ("COURSE_THEME", brief.theme),
            ("CURRENT_LESSON", brief.lesson_title),
            ("PREVIOUS_LESSON", brief.previous_title.unwrap_or(NO_PREVIOUS)),
            ("NEXT_LESSON", brief.next_title.unwrap_or(NO_NEXT)),
            (
                "SUPPORT_CONTEXT",
                non_blank(brief.context).unwrap_or(NO_LESSON_CONTEXT),
            ),
        ],
    );
    fill(&filled, &[("FULL_SYLLABUS", brief.outline)])
}

pub fn enhance_prompt(markup: &str) -> String {
    fill(ENHANCE, &[("LESSON_HTML", markup)])
}

pub fn diagram_prompt(concept: &str) -> String {
    fill(DIAGRAM, &[("DIAGRAM_CONCEPT", concept)])
}

/// Appends the house illustration style to a directive's prompt.
pub fn image_prompt(prompt: &str) -> String {
    format!("{}.\n{}", prompt.trim_end_matches('.'), IMAGE_STYLE)
}

pub fn cover_prompt(theme: &str) -> String {
    format!(
        "Book cover design for a course titled '{}'. Professional, modern, high quality, 4k, \
minimalist, nice typography.",
        theme
    )
}
