//! # Export
//!
//! Builds the deliverables from a syllabus, its parsed tree and resolved lesson bodies:
//!
//! - a single-lesson HTML document,
//! - an archive with one such document per lesson (see [`archive`]),
//! - a consolidated ebook with cover, table of contents and page-break rules.
//!
//! Every shape, and the live preview, embeds the same [`LESSON_CSS`] text unchanged, so a
//! downloaded file looks exactly like what was previewed. The ebook appends its pagination
//! rules after it.
//!
//! Assembly is pure: no external calls, no cache access.

use crate::error::{CourseError, Result};
use crate::jobs::CollectedCourse;
use crate::model::{LessonEntry, LessonPosition, SyllabusMeta};
use minijinja::Environment;
use serde::Serialize;

pub mod archive;

/// The canonical lesson stylesheet.
pub const LESSON_CSS: &str = include_str!("lesson.css");
const PAGINATION_CSS: &str = include_str!("pagination.css");

const LESSON_TEMPLATE: &str = include_str!("templates/lesson.html");
const PREVIEW_TEMPLATE: &str = include_str!("templates/preview.html");
const EBOOK_TEMPLATE: &str = include_str!("templates/ebook.html");

const EBOOK_SUBTITLE: &str = "A complete step-by-step guide";
const LESSON_SLUG_LIMIT: usize = 40;

/// A finished deliverable, ready to be written under `filename`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

fn environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template("lesson.html", LESSON_TEMPLATE)?;
    env.add_template("preview.html", PREVIEW_TEMPLATE)?;
    env.add_template("ebook.html", EBOOK_TEMPLATE)?;
    Ok(env)
}

fn render<S: Serialize>(name: &str, data: S) -> Result<String> {
    let env = environment()?;
    let template = env.get_template(name)?;
    Ok(template.render(data)?)
}

/// Lowercase, runs of anything outside `[a-z0-9]` collapsed to `-`, no edge dashes.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// `M01-A02-<slug>.html`, with the slug cut to 40 characters.
pub fn lesson_filename(position: &LessonPosition, title: &str) -> String {
    let slug: String = slugify(title).chars().take(LESSON_SLUG_LIMIT).collect();
    format!(
        "M{:02}-A{:02}-{}.html",
        position.module_index + 1,
        position.lesson_index + 1,
        slug.trim_end_matches('-')
    )
}

pub fn ebook_css() -> String {
    format!("{}\n{}", LESSON_CSS, PAGINATION_CSS)
}

/// Markup shown by the live preview: stylesheet plus the lesson article.
pub fn preview_fragment(body: &str) -> Result<String> {
    #[derive(Serialize)]
    struct Preview<'a> {
        css: &'a str,
        body: &'a str,
    }
    render(
        "preview.html",
        Preview {
            css: LESSON_CSS,
            body,
        },
    )
}

/// Self-contained document for one lesson, headed "Module i - Lesson j: Title".
pub fn lesson_document(heading: &str, body: &str) -> Result<String> {
    #[derive(Serialize)]
    struct Lesson<'a> {
        css: &'a str,
        heading: &'a str,
        body: &'a str,
    }
    render(
        "lesson.html",
        Lesson {
            css: LESSON_CSS,
            heading,
            body,
        },
    )
}

pub fn lesson_artifact(entry: &LessonEntry<'_>, body: &str) -> Result<Artifact> {
    let document = lesson_document(&entry.numbered_title(), body)?;
    Ok(Artifact::new(
        lesson_filename(&entry.position, &entry.lesson.title),
        document,
    ))
}

pub fn outline_artifact(syllabus: &SyllabusMeta) -> Artifact {
    Artifact::new(
        format!("syllabus-{}.md", slugify(&syllabus.theme)),
        syllabus.markdown.clone(),
    )
}

#[derive(Serialize)]
struct EbookLesson<'a> {
    number: usize,
    title: &'a str,
    anchor: String,
    heading: String,
    body: &'a str,
}

#[derive(Serialize)]
struct EbookModule<'a> {
    number: usize,
    title: &'a str,
    lessons: Vec<EbookLesson<'a>>,
}

#[derive(Serialize)]
struct Ebook<'a> {
    css: String,
    theme: &'a str,
    subtitle: &'a str,
    author: &'a str,
    cover: Option<String>,
    modules: Vec<EbookModule<'a>>,
}

/// Consolidated document: cover, table of contents, then one anchored section per lesson.
pub fn ebook_artifact(
    syllabus: &SyllabusMeta,
    course: &CollectedCourse,
    author: &str,
) -> Result<Artifact> {
    let mut modules = Vec::with_capacity(course.tree.modules.len());
    for (module_index, module) in course.tree.modules.iter().enumerate() {
        let mut lessons = Vec::with_capacity(module.lessons.len());
        for (lesson_index, lesson) in module.lessons.iter().enumerate() {
            let position = LessonPosition {
                module_index,
                lesson_index,
            };
            let body = course
                .lessons
                .get(&lesson.id)
                .ok_or(CourseError::MissingContent(lesson.id))?;
            lessons.push(EbookLesson {
                number: lesson_index + 1,
                title: &lesson.title,
                anchor: position.anchor(),
                heading: position.numbered_title(&lesson.title),
                body,
            });
        }
        modules.push(EbookModule {
            number: module_index + 1,
            title: &module.title,
            lessons,
        });
    }

    let document = render(
        "ebook.html",
        Ebook {
            css: ebook_css(),
            theme: &syllabus.theme,
            subtitle: EBOOK_SUBTITLE,
            author: author.trim(),
            cover: course.cover.as_ref().map(|c| c.data_uri()),
            modules,
        },
    )?;

    Ok(Artifact::new(
        format!("ebook-{}.html", slugify(&syllabus.theme)),
        document,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CourseTree;
    use crate::service::ImagePayload;
    use std::collections::BTreeMap;

    const OUTLINE: &str = "Module 1: Basics\nLesson 1: Setup & Install\nLesson 2: Hello\nModule 2: Next\nLesson 1: Ship";

    fn syllabus() -> SyllabusMeta {
        SyllabusMeta {
            id: "s1".into(),
            theme: "Rust: The Basics!".into(),
            context: None,
            markdown: OUTLINE.into(),
        }
    }

    fn course(cover: Option<ImagePayload>) -> CollectedCourse {
        let tree = CourseTree::parse(OUTLINE);
        let lessons: BTreeMap<_, _> = (1..=3).map(|id| (id, format!("<p>body {}</p>", id))).collect();
        CollectedCourse {
            tree,
            lessons,
            cover,
            reused: 0,
        }
    }

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("Rust: The Basics!"), "rust-the-basics");
        assert_eq!(slugify("  --Hello   World--  "), "hello-world");
        assert_eq!(slugify("Introdução"), "introdu-o");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn lesson_filename_pads_indices_and_cuts_slug() {
        let position = LessonPosition {
            module_index: 0,
            lesson_index: 9,
        };
        assert_eq!(lesson_filename(&position, "Setup & Install"), "M01-A10-setup-install.html");

        let long = "a".repeat(39) + " b c";
        let name = lesson_filename(&position, &long);
        assert_eq!(name, format!("M01-A10-{}.html", "a".repeat(39)));
    }

    #[test]
    fn preview_and_download_share_stylesheet() {
        let body = "<section><h2>Step 1</h2></section>";
        let preview = preview_fragment(body).unwrap();
        let document = lesson_document("Module 1 - Lesson 1: Setup", body).unwrap();

        assert!(preview.contains(LESSON_CSS));
        assert!(document.contains(LESSON_CSS));
        assert!(preview.contains(body));
        assert!(document.contains(body));
        assert!(document.contains("<h1>Module 1 - Lesson 1: Setup</h1>"));
    }

    #[test]
    fn lesson_heading_is_escaped_but_body_is_not() {
        let document = lesson_document("A <b> title", "<p>raw</p>").unwrap();
        assert!(document.contains("<title>A &lt;b&gt; title</title>"));
        assert!(document.contains("<p>raw</p>"));
    }

    #[test]
    fn lesson_artifact_uses_numbered_names() {
        let tree = CourseTree::parse(OUTLINE);
        let entry = tree.locate(3).unwrap();
        let artifact = lesson_artifact(&entry, "<p>x</p>").unwrap();
        assert_eq!(artifact.filename, "M02-A01-ship.html");
        let text = String::from_utf8(artifact.bytes).unwrap();
        assert!(text.contains("Module 2 - Lesson 1: Ship"));
    }

    #[test]
    fn outline_artifact_is_raw_markdown() {
        let artifact = outline_artifact(&syllabus());
        assert_eq!(artifact.filename, "syllabus-rust-the-basics.md");
        assert_eq!(artifact.bytes, OUTLINE.as_bytes());
    }

    #[test]
    fn ebook_has_cover_toc_and_anchored_sections() {
        let artifact = ebook_artifact(&syllabus(), &course(Some(ImagePayload::png("QUJD"))), "Ada")
            .unwrap();
        assert_eq!(artifact.filename, "ebook-rust-the-basics.html");
        let html = String::from_utf8(artifact.bytes).unwrap();

        assert!(html.contains(LESSON_CSS));
        assert!(html.contains(".page-break { page-break-before: always; }"));
        assert!(html.contains("break-inside: avoid"));
        assert!(html.contains(r#"src="data:image/png;base64,QUJD""#));
        assert!(html.contains("Author: Ada"));
        assert!(html.contains(r##"<a href="#lesson-1-0">1. Ship</a>"##));
        assert!(html.contains(r#"<div id="lesson-0-1" class="ebook-lesson-container page-break">"#));

        let first = html.find("<p>body 1</p>").unwrap();
        let second = html.find("<p>body 2</p>").unwrap();
        let third = html.find("<p>body 3</p>").unwrap();
        assert!(first < second && second < third);
        assert!(html.find("ebook-toc").unwrap() < first);
    }

    #[test]
    fn ebook_without_cover_has_no_image() {
        let html = String::from_utf8(
            ebook_artifact(&syllabus(), &course(None), "Ada")
                .unwrap()
                .bytes,
        )
        .unwrap();
        assert!(!html.contains("alt=\"Cover\""));
    }

    #[test]
    fn ebook_requires_every_lesson() {
        let mut incomplete = course(None);
        incomplete.lessons.remove(&2);
        let err = ebook_artifact(&syllabus(), &incomplete, "Ada").unwrap_err();
        assert!(matches!(err, CourseError::MissingContent(2)));
    }
}
