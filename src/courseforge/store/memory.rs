use super::HistoryStore;
use crate::error::Result;
use crate::model::SyllabusMeta;

/// In-memory storage for tests. Counts saves so callers can check when persistence happened.
#[derive(Default)]
pub struct InMemoryStore {
    records: Vec<SyllabusMeta>,
    saves: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> &[SyllabusMeta] {
        &self.records
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl HistoryStore for InMemoryStore {
    fn load(&self) -> Result<Vec<SyllabusMeta>> {
        Ok(self.records.clone())
    }

    fn save(&mut self, records: &[SyllabusMeta]) -> Result<()> {
        self.records = records.to_vec();
        self.saves += 1;
        Ok(())
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;

    pub const SAMPLE_OUTLINE: &str = "Module 1: Foundations\n\
Lesson 1: Setting up the toolchain\n\
- Objective: install everything\n\
- Topics: rustup, cargo\n\
Lesson 2: First program\n\
- Objective: print a line\n\
Module 2: Going further\n\
Lesson 1: Shipping it\n\
- Topics: release, publish\n";

    pub struct StoreFixture {
        pub store: InMemoryStore,
    }

    impl Default for StoreFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StoreFixture {
        pub fn new() -> Self {
            Self {
                store: InMemoryStore::new(),
            }
        }

        /// Adds a saved syllabus; later calls end up first, as newer history does.
        pub fn with_syllabus(mut self, id: &str, theme: &str, markdown: &str) -> Self {
            let mut records = self.store.records.clone();
            records.insert(
                0,
                SyllabusMeta {
                    id: id.to_string(),
                    theme: theme.to_string(),
                    context: None,
                    markdown: markdown.to_string(),
                },
            );
            self.store.records = records;
            self
        }

        pub fn with_sample(self) -> Self {
            self.with_syllabus("sample-id", "Rust for beginners", SAMPLE_OUTLINE)
        }
    }
}
