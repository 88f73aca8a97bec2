use super::HistoryStore;
use crate::error::{CourseError, Result};
use crate::model::SyllabusMeta;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const HISTORY_FILENAME: &str = "history.json";

/// Keeps the history as a pretty-printed JSON array in `<root>/history.json`.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn history_file(&self) -> PathBuf {
        self.root.join(HISTORY_FILENAME)
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(CourseError::Io)?;
        }
        Ok(())
    }
}

impl HistoryStore for FileStore {
    fn load(&self) -> Result<Vec<SyllabusMeta>> {
        let path = self.history_file();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).map_err(CourseError::Io)?;
        match serde_json::from_str::<Vec<SyllabusMeta>>(&content) {
            Ok(records) => {
                debug!(count = records.len(), path = %path.display(), "history loaded");
                Ok(records)
            }
            Err(err) => {
                // Unreadable history is dropped; the next save overwrites it.
                warn!(path = %path.display(), "ignoring corrupted history: {}", err);
                Ok(Vec::new())
            }
        }
    }

    fn save(&mut self, records: &[SyllabusMeta]) -> Result<()> {
        self.ensure_dir()?;
        let content = serde_json::to_string_pretty(records).map_err(CourseError::Serialization)?;
        fs::write(self.history_file(), content).map_err(CourseError::Io)?;
        debug!(count = records.len(), "history saved");
        Ok(())
    }
}
