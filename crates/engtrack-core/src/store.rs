use crate::document::Document;
use crate::error::EngtrackResult;

/// Whole-document persistence. Every top-level operation loads a fresh
/// snapshot and writes the full document back after a mutation.
pub trait EngagementStore {
    fn load(&self) -> EngtrackResult<Document>;
    fn save(&self, document: &Document) -> EngtrackResult<()>;
}
