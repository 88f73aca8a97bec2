use crate::error::Result;
use crate::model::SyllabusMeta;

pub mod fs;
pub mod memory;

/// Durable storage for the syllabus history.
///
/// Only ever sees the metadata projection: generated lesson bodies cannot be handed to a
/// store, so they never survive a restart.
pub trait HistoryStore {
    /// Loads the saved history, newest first.
    fn load(&self) -> Result<Vec<SyllabusMeta>>;

    /// Replaces the saved history with `records`, newest first.
    fn save(&mut self, records: &[SyllabusMeta]) -> Result<()>;
}
