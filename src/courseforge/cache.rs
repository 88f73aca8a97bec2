use crate::error::Result;
use crate::model::LessonId;

/// Session cache of resolved lesson markup, keyed by (syllabus id, lesson id).
///
/// Entries only make sense for the outline text that produced the lesson ids; they are never
/// written to durable storage, so a restart loses them.
pub trait ContentCache {
    fn get(&self, syllabus_id: &str, lesson_id: LessonId) -> Option<&str>;

    fn has(&self, syllabus_id: &str, lesson_id: LessonId) -> bool {
        self.get(syllabus_id, lesson_id).is_some()
    }

    /// Fails with `SyllabusNotFound` when the syllabus is unknown.
    fn put(&mut self, syllabus_id: &str, lesson_id: LessonId, content: String) -> Result<()>;

    /// Returns whether an entry was removed.
    fn delete(&mut self, syllabus_id: &str, lesson_id: LessonId) -> bool;
}
