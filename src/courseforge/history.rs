//! # History Repository
//!
//! The in-memory list of syllabus records (newest first) plus the durable store behind it.
//!
//! Two kinds of state live here and are treated differently:
//!
//! - **Metadata** (id, theme, context, outline text) is durable. Every change to it is
//!   followed by a save of the metadata projection.
//! - **Cached lesson bodies** are session state. Writes through [`ContentCache`] touch memory
//!   only and never reach the store.

use crate::cache::ContentCache;
use crate::error::{CourseError, Result};
use crate::model::{LessonId, SyllabusMeta, SyllabusRecord};
use crate::store::HistoryStore;
use tracing::debug;

pub struct History<S: HistoryStore> {
    store: S,
    records: Vec<SyllabusRecord>,
}

impl<S: HistoryStore> History<S> {
    /// Loads the saved history. Records come back with empty caches.
    pub fn open(store: S) -> Result<Self> {
        let records = store
            .load()?
            .into_iter()
            .map(SyllabusRecord::from_meta)
            .collect();
        Ok(Self { store, records })
    }

    pub fn records(&self) -> &[SyllabusRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn find(&self, id: &str) -> Result<&SyllabusRecord> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| CourseError::SyllabusNotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut SyllabusRecord> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CourseError::SyllabusNotFound(id.to_string()))
    }

    /// Finds a record by 1-based history position or by a unique id prefix.
    pub fn resolve(&self, selector: &str) -> Result<&SyllabusRecord> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(CourseError::validation("Please select a syllabus."));
        }

        if let Ok(position) = selector.parse::<usize>() {
            if (1..=self.records.len()).contains(&position) {
                return Ok(&self.records[position - 1]);
            }
        }

        let mut matches = self.records.iter().filter(|r| r.id.starts_with(selector));
        match (matches.next(), matches.next()) {
            (Some(record), None) => Ok(record),
            (Some(_), Some(_)) => Err(CourseError::validation(format!(
                "Selector '{}' matches more than one syllabus.",
                selector
            ))),
            (None, _) => Err(CourseError::SyllabusNotFound(selector.to_string())),
        }
    }

    /// Adds a freshly generated record at the top of the history.
    pub fn prepend(&mut self, record: SyllabusRecord) -> Result<()> {
        self.records.insert(0, record);
        self.persist()
    }

    pub fn remove(&mut self, id: &str) -> Result<SyllabusRecord> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| CourseError::SyllabusNotFound(id.to_string()))?;
        let removed = self.records.remove(index);
        self.persist()?;
        Ok(removed)
    }

    /// Replaces the outline text. Cached bodies were keyed by the old lesson ids, so they
    /// are dropped.
    pub fn update_markdown(&mut self, id: &str, markdown: String) -> Result<()> {
        let record = self.get_mut(id)?;
        record.markdown = markdown;
        let dropped = record.cached_lessons.len();
        record.cached_lessons.clear();
        debug!(syllabus = id, dropped, "outline edited, cache cleared");
        self.persist()
    }

    /// Swaps in a whole history, e.g. from a backup. Cached bodies carried by the records
    /// stay in memory; only metadata is saved.
    pub fn replace_all(&mut self, records: Vec<SyllabusRecord>) -> Result<()> {
        self.records = records;
        self.persist()
    }

    fn persist(&mut self) -> Result<()> {
        let projection: Vec<SyllabusMeta> = self.records.iter().map(SyllabusRecord::meta).collect();
        self.store.save(&projection)
    }
}

impl<S: HistoryStore> ContentCache for History<S> {
    fn get(&self, syllabus_id: &str, lesson_id: LessonId) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.id == syllabus_id)
            .and_then(|r| r.cached_lessons.get(&lesson_id))
            .map(String::as_str)
    }

    fn put(&mut self, syllabus_id: &str, lesson_id: LessonId, content: String) -> Result<()> {
        let record = self.get_mut(syllabus_id)?;
        record.cached_lessons.insert(lesson_id, content);
        debug!(syllabus = syllabus_id, lesson = lesson_id, "lesson cached");
        Ok(())
    }

    fn delete(&mut self, syllabus_id: &str, lesson_id: LessonId) -> bool {
        self.get_mut(syllabus_id)
            .map(|r| r.cached_lessons.remove(&lesson_id).is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::fixtures::{StoreFixture, SAMPLE_OUTLINE};
    use crate::store::memory::InMemoryStore;

    fn sample() -> History<InMemoryStore> {
        History::open(StoreFixture::new().with_sample().store).unwrap()
    }

    #[test]
    fn open_loads_records_with_empty_caches() {
        let history = sample();
        assert_eq!(history.records().len(), 1);
        assert!(history.records()[0].cached_lessons.is_empty());
        assert_eq!(history.records()[0].markdown, SAMPLE_OUTLINE);
    }

    #[test]
    fn cache_writes_do_not_persist() {
        let mut history = sample();
        history.put("sample-id", 1, "<p>one</p>".into()).unwrap();

        assert!(history.has("sample-id", 1));
        assert_eq!(history.find("sample-id").unwrap().cached_lessons.len(), 1);
        assert_eq!(history.store().save_count(), 0);
    }

    #[test]
    fn put_on_unknown_syllabus_fails() {
        let mut history = sample();
        let err = history.put("nope", 1, "x".into()).unwrap_err();
        assert!(matches!(err, CourseError::SyllabusNotFound(_)));
    }

    #[test]
    fn delete_reports_removal() {
        let mut history = sample();
        history.put("sample-id", 2, "two".into()).unwrap();
        assert!(history.delete("sample-id", 2));
        assert!(!history.delete("sample-id", 2));
        assert!(!history.delete("nope", 2));
    }

    #[test]
    fn prepend_puts_newest_first_and_persists_projection() {
        let mut history = sample();
        let record = SyllabusRecord::new("Go".into(), None, "Module 1: Go".into());
        let new_id = record.id.clone();
        history.prepend(record).unwrap();

        assert_eq!(history.records()[0].id, new_id);
        let saved = history.store().saved();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].id, new_id);
    }

    #[test]
    fn restarting_loses_bodies_but_keeps_outline() {
        let mut history = sample();
        history.put("sample-id", 1, "<p>body</p>".into()).unwrap();
        history
            .prepend(SyllabusRecord::new("Go".into(), None, "x".into()))
            .unwrap();

        let saved = history.store().saved().to_vec();
        let mut store = InMemoryStore::new();
        store.save(&saved).unwrap();
        let reopened = History::open(store).unwrap();

        let record = reopened.find("sample-id").unwrap();
        assert!(record.cached_lessons.is_empty());
        assert_eq!(record.markdown, SAMPLE_OUTLINE);
    }

    #[test]
    fn editing_markdown_clears_cache() {
        let mut history = sample();
        history.put("sample-id", 1, "old".into()).unwrap();
        history
            .update_markdown("sample-id", "Module 1: New\nLesson 1: Fresh".into())
            .unwrap();

        assert!(!history.has("sample-id", 1));
        assert_eq!(history.store().saved()[0].markdown, "Module 1: New\nLesson 1: Fresh");
    }

    #[test]
    fn resolve_by_position_and_prefix() {
        let history = History::open(
            StoreFixture::new()
                .with_syllabus("abc-1", "First", "x")
                .with_syllabus("abd-2", "Second", "y")
                .store,
        )
        .unwrap();

        assert_eq!(history.resolve("1").unwrap().id, "abd-2");
        assert_eq!(history.resolve("2").unwrap().id, "abc-1");
        assert_eq!(history.resolve("abc").unwrap().id, "abc-1");
        assert!(matches!(
            history.resolve("ab").unwrap_err(),
            CourseError::Validation(_)
        ));
        assert!(matches!(
            history.resolve("zzz").unwrap_err(),
            CourseError::SyllabusNotFound(_)
        ));
    }

    #[test]
    fn remove_persists() {
        let mut history = sample();
        let removed = history.remove("sample-id").unwrap();
        assert_eq!(removed.theme, "Rust for beginners");
        assert!(history.is_empty());
        assert!(history.store().saved().is_empty());
        assert_eq!(history.store().save_count(), 1);
    }
}
