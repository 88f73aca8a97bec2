//! # Outline Parser
//!
//! Turns the semi-structured outline text produced by the generative service (or edited by
//! hand) into an ordered [`Module`]/[`Lesson`] tree.
//!
//! The parser is deliberately tolerant: generated outlines come with headings, bold markers,
//! bullets and mixed separators, and anything that does not look like one of the four known
//! line shapes is skipped rather than reported.
//!
//! ```text
//! ## **Módulo 1: Fundamentos**      -> module header
//! Aula 1 - Introdução               -> lesson header (needs an open module)
//! - Objetivo: aprender X            -> objective line (needs an open lesson)
//! - Tópicos: a, b; c                -> topics line (needs an open lesson)
//! ```
//!
//! Lesson ids are handed out 1..N per call, so they only identify a lesson relative to the
//! exact text that was parsed.

use crate::model::{Lesson, LessonId, Module};
use once_cell::sync::Lazy;
use regex::Regex;

static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*_]{2,}").unwrap());

static MODULE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:#+\s*)?(?:m[óo]dulo|module)\s*\d+[\s:.\-–—]+(.*)$").unwrap()
});

static LESSON_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:#+\s*)?(?:aula|li[çc][ãa]o|lesson)\s*\d+[\s:.\-–—]+(.*)$").unwrap()
});

static OBJECTIVE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[-*•]\s*(?:objetivo|objective)\s*[:.\-–—]?\s*(.*)$").unwrap()
});

static TOPICS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[-*•]\s*(?:t[óo]picos|topics)\s*[:.\-–—]?\s*(.*)$").unwrap()
});

enum Line<'a> {
    Module(&'a str),
    Lesson(&'a str),
    Objective(&'a str),
    Topics(&'a str),
    Other,
}

fn classify(line: &str) -> Line<'_> {
    let capture = |re: &Regex| {
        re.captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim())
    };

    if let Some(title) = capture(&MODULE_HEADER) {
        Line::Module(title)
    } else if let Some(title) = capture(&LESSON_HEADER) {
        Line::Lesson(title)
    } else if let Some(text) = capture(&OBJECTIVE_LINE) {
        Line::Objective(text)
    } else if let Some(list) = capture(&TOPICS_LINE) {
        Line::Topics(list)
    } else {
        Line::Other
    }
}

fn split_topics(list: &str) -> Vec<String> {
    list.split([',', ';'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses outline text into modules in document order.
pub fn parse(markdown: &str) -> Vec<Module> {
    let mut modules = Vec::new();
    let mut current: Option<Module> = None;
    let mut lesson_open = false;
    let mut next_id: LessonId = 1;

    for raw in markdown.lines() {
        let cleaned = EMPHASIS.replace_all(raw, "");
        let line = cleaned.trim();
        if line.is_empty() {
            continue;
        }

        match classify(line) {
            Line::Module(title) => {
                if let Some(done) = current.take() {
                    modules.push(done);
                }
                current = Some(Module::new(title));
                lesson_open = false;
            }
            Line::Lesson(title) => {
                if let Some(module) = current.as_mut() {
                    module.lessons.push(Lesson::new(next_id, title));
                    next_id += 1;
                    lesson_open = true;
                }
            }
            Line::Objective(text) => {
                if let Some(lesson) = active_lesson(&mut current, lesson_open) {
                    lesson.objective = text.to_string();
                }
            }
            Line::Topics(list) => {
                if let Some(lesson) = active_lesson(&mut current, lesson_open) {
                    lesson.topics = split_topics(list);
                }
            }
            Line::Other => {}
        }
    }

    if let Some(done) = current {
        modules.push(done);
    }
    modules
}

fn active_lesson(current: &mut Option<Module>, lesson_open: bool) -> Option<&mut Lesson> {
    if !lesson_open {
        return None;
    }
    current.as_mut().and_then(|m| m.lessons.last_mut())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference_example() {
        let text = "Módulo 1: Fundamentos\nAula 1: Introdução\n- Objetivo: aprender X\n- Tópicos: a, b, c";
        let modules = parse(text);
        assert_eq!(
            modules,
            vec![Module {
                title: "Fundamentos".into(),
                lessons: vec![Lesson {
                    id: 1,
                    title: "Introdução".into(),
                    objective: "aprender X".into(),
                    topics: vec!["a".into(), "b".into(), "c".into()],
                }],
            }]
        );
    }

    #[test]
    fn assigns_sequential_ids_across_modules() {
        let text = "Module 1: A\nLesson 1: a1\nLesson 2: a2\n\nModule 2: B\nLesson 1: b1\nModule 3: C\n";
        let modules = parse(text);
        assert_eq!(modules.len(), 3);
        assert_eq!(modules[0].lessons.len(), 2);
        assert_eq!(modules[1].lessons.len(), 1);
        assert!(modules[2].lessons.is_empty());

        let ids: Vec<LessonId> = modules
            .iter()
            .flat_map(|m| m.lessons.iter().map(|l| l.id))
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn reparsing_is_deterministic() {
        let text = "## **Módulo 1 — Base**\n### Aula 1. Setup\n- **Objetivo:** x\n- Tópicos: y; z";
        assert_eq!(parse(text), parse(text));
    }

    #[test]
    fn strips_emphasis_and_heading_markers() {
        let text = "## **Module 1: Getting started**\n### __Lesson 1 - Installing__\n- **Objective**: install it";
        let modules = parse(text);
        assert_eq!(modules[0].title, "Getting started");
        assert_eq!(modules[0].lessons[0].title, "Installing");
        assert_eq!(modules[0].lessons[0].objective, "install it");
    }

    #[test]
    fn matches_keywords_case_insensitively() {
        let text = "MÓDULO 1: Upper\nLIÇÃO 1: Shouting\n- OBJETIVO: loud";
        let modules = parse(text);
        assert_eq!(modules[0].title, "Upper");
        assert_eq!(modules[0].lessons[0].title, "Shouting");
        assert_eq!(modules[0].lessons[0].objective, "loud");
    }

    #[test]
    fn drops_lesson_before_any_module() {
        let text = "Lesson 1: Orphan\nModule 1: Real\nLesson 2: Kept";
        let modules = parse(text);
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].lessons.len(), 1);
        assert_eq!(modules[0].lessons[0].title, "Kept");
        assert_eq!(modules[0].lessons[0].id, 1);
    }

    #[test]
    fn drops_details_before_any_lesson() {
        let text = "- Objective: nowhere\nModule 1: M\n- Topics: lost, too\nLesson 1: L";
        let modules = parse(text);
        let lesson = &modules[0].lessons[0];
        assert!(lesson.objective.is_empty());
        assert!(lesson.topics.is_empty());
    }

    #[test]
    fn module_header_closes_the_active_lesson() {
        let text = "Module 1: A\nLesson 1: a\nModule 2: B\n- Objective: belongs to nobody";
        let modules = parse(text);
        assert!(modules[0].lessons[0].objective.is_empty());
    }

    #[test]
    fn repeated_lines_overwrite() {
        let text = "Module 1: A\nLesson 1: a\n- Objective: first\n- Objective: second\n- Topics: x, y\n- Topics: z";
        let lesson = &parse(text)[0].lessons[0];
        assert_eq!(lesson.objective, "second");
        assert_eq!(lesson.topics, vec!["z".to_string()]);
    }

    #[test]
    fn topics_drop_empty_tokens() {
        let text = "Module 1: A\nLesson 1: a\n- Topics: one, , two;; three ,";
        let lesson = &parse(text)[0].lessons[0];
        assert_eq!(lesson.topics, vec!["one", "two", "three"]);
    }

    #[test]
    fn unrecognized_text_yields_empty_tree() {
        assert!(parse("Just some prose.\nNothing structured here.").is_empty());
        assert!(parse("").is_empty());
    }
}
