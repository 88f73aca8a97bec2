use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Parse-scoped lesson identifier, assigned 1..N in document order.
pub type LessonId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    pub objective: String,
    pub topics: Vec<String>,
}

impl Lesson {
    pub fn new(id: LessonId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            objective: String::new(),
            topics: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub title: String,
    pub lessons: Vec<Lesson>,
}

impl Module {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lessons: Vec::new(),
        }
    }
}

/// 0-based location of a lesson inside a parsed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonPosition {
    pub module_index: usize,
    pub lesson_index: usize,
}

impl LessonPosition {
    /// "Module 2 - Lesson 3: Title"
    pub fn numbered_title(&self, title: &str) -> String {
        format!(
            "Module {} - Lesson {}: {}",
            self.module_index + 1,
            self.lesson_index + 1,
            title
        )
    }

    /// Shorter label used in progress reports.
    pub fn short_label(&self, title: &str) -> String {
        format!(
            "Mod {} / Lesson {}: {}",
            self.module_index + 1,
            self.lesson_index + 1,
            title
        )
    }

    pub fn anchor(&self) -> String {
        format!("lesson-{}-{}", self.module_index, self.lesson_index)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LessonEntry<'a> {
    pub position: LessonPosition,
    pub module: &'a Module,
    pub lesson: &'a Lesson,
}

impl LessonEntry<'_> {
    pub fn numbered_title(&self) -> String {
        self.position.numbered_title(&self.lesson.title)
    }
}

/// The module/lesson structure recomputed from a syllabus' markdown.
///
/// Never stored: every access re-parses the authoritative outline text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CourseTree {
    pub modules: Vec<Module>,
}

impl CourseTree {
    pub fn parse(markdown: &str) -> Self {
        Self {
            modules: crate::parser::parse(markdown),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lesson_count() == 0
    }

    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }

    /// All lessons in module-then-lesson document order.
    pub fn entries(&self) -> Vec<LessonEntry<'_>> {
        self.modules
            .iter()
            .enumerate()
            .flat_map(|(module_index, module)| {
                module
                    .lessons
                    .iter()
                    .enumerate()
                    .map(move |(lesson_index, lesson)| LessonEntry {
                        position: LessonPosition {
                            module_index,
                            lesson_index,
                        },
                        module,
                        lesson,
                    })
            })
            .collect()
    }

    pub fn locate(&self, id: LessonId) -> Option<LessonEntry<'_>> {
        self.entries().into_iter().find(|e| e.lesson.id == id)
    }

    /// Previous and next lessons across module boundaries.
    pub fn neighbors(&self, id: LessonId) -> (Option<&Lesson>, Option<&Lesson>) {
        let entries = self.entries();
        let Some(index) = entries.iter().position(|e| e.lesson.id == id) else {
            return (None, None);
        };
        let previous = index.checked_sub(1).map(|i| entries[i].lesson);
        let next = entries.get(index + 1).map(|e| e.lesson);
        (previous, next)
    }
}

/// The durable projection of a syllabus: everything except generated bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusMeta {
    pub id: String,
    pub theme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub markdown: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyllabusRecord {
    pub id: String,
    pub theme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub markdown: String,
    /// Session cache of resolved lesson markup, keyed by parse-scoped id.
    #[serde(default, alias = "savedLessons")]
    pub cached_lessons: BTreeMap<LessonId, String>,
}

impl SyllabusRecord {
    pub fn new(theme: String, context: Option<String>, markdown: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            theme,
            context: context.filter(|c| !c.trim().is_empty()),
            markdown,
            cached_lessons: BTreeMap::new(),
        }
    }

    pub fn from_meta(meta: SyllabusMeta) -> Self {
        Self {
            id: meta.id,
            theme: meta.theme,
            context: meta.context,
            markdown: meta.markdown,
            cached_lessons: BTreeMap::new(),
        }
    }

    pub fn meta(&self) -> SyllabusMeta {
        SyllabusMeta {
            id: self.id.clone(),
            theme: self.theme.clone(),
            context: self.context.clone(),
            markdown: self.markdown.clone(),
        }
    }

    pub fn tree(&self) -> CourseTree {
        CourseTree::parse(&self.markdown)
    }
}
