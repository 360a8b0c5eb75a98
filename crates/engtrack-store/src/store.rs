use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use engtrack_core::{Document, EngagementStore, EngtrackError, EngtrackResult};

use crate::schema::parse_document;

/// Single-file JSON store. The file is opened and closed on every call;
/// no handle or lock is held between operations.
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EngagementStore for JsonStore {
    fn load(&self) -> EngtrackResult<Document> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "store file missing, starting empty");
                return Ok(Document::default());
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!(path = %self.path.display(), "store file is not UTF-8, starting with no data");
                return Ok(Document::default());
            }
            Err(e) => {
                return Err(EngtrackError::Io(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let document = parse_document(&text);
        if let Some((stored, actual)) = document.count_mismatch() {
            warn!(
                stored,
                actual, "metadata.totalRecords does not match the number of engagements"
            );
        }
        debug!(path = %self.path.display(), records = document.len(), "store loaded");
        Ok(document)
    }

    fn save(&self, document: &Document) -> EngtrackResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    EngtrackError::Io(format!("cannot create {}: {e}", parent.display()))
                })?;
            }
        }

        let mut json = serde_json::to_string_pretty(document)?;
        json.push('\n');
        std::fs::write(&self.path, json)
            .map_err(|e| EngtrackError::Io(format!("cannot write {}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), records = document.len(), "store saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engtrack_core::{Engagement, FeedbackAnswer};
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> JsonStore {
        JsonStore::new(dir.path().join("engagements.json"))
    }

    fn make_engagement(name: &str) -> Engagement {
        Engagement {
            client_name: name.into(),
            engagement_type: vec!["Internal".into(), "Cloud".into()],
            date: "2024-03-01".into(),
            ..Engagement::default()
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let doc = test_store(&dir).load().unwrap();
        assert_eq!(doc.metadata.total_records, 0);
        assert!(doc.engagements.is_empty());
    }

    #[test]
    fn test_load_empty_file() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        std::fs::write(store.path(), "").unwrap();
        assert_eq!(store.load().unwrap(), Document::default());
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        std::fs::write(store.path(), "{\"engagements\": [").unwrap();
        assert_eq!(store.load().unwrap(), Document::default());
    }

    #[test]
    fn test_load_legacy_does_not_touch_disk() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        let legacy = r#"[{"clientName": "A"}, {"clientName": "B"}]"#;
        std::fs::write(store.path(), legacy).unwrap();

        let doc = store.load().unwrap();
        assert_eq!(doc.metadata.total_records, 2);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), legacy);

        store.save(&doc).unwrap();
        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk["metadata"]["totalRecords"], 2);
        assert_eq!(on_disk["engagements"][1]["clientName"], "B");
    }

    #[test]
    fn test_add_save_reload_count_matches() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let doc = store.load().unwrap().with_added(make_engagement("Acme"));
        store.save(&doc).unwrap();
        let doc = store.load().unwrap().with_added(make_engagement("Globex"));
        store.save(&doc).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.metadata.total_records, reloaded.engagements.len());
        assert_eq!(reloaded.metadata.total_records, 2);
        assert_eq!(reloaded.engagements[0].client_name, "Acme");
    }

    #[test]
    fn test_null_field_does_not_lose_records_on_add() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        std::fs::write(
            store.path(),
            r#"{"metadata":{"totalRecords":2},"engagements":[
                {"clientName":"Keep1","numberOfUsers":10},
                {"clientName":"Keep2","businessDaysCount":null}
            ]}"#,
        )
        .unwrap();

        let doc = store.load().unwrap();
        assert_eq!(doc.len(), 2);
        store.save(&doc.with_added(make_engagement("New"))).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.client_names(), vec!["Keep1", "Keep2", "New"]);
        assert_eq!(reloaded.metadata.total_records, 3);
    }

    #[test]
    fn test_delete_only_record() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        store
            .save(&Document::default().with_added(make_engagement("Solo")))
            .unwrap();

        let (doc, removed) = store.load().unwrap().without_client("Solo");
        assert_eq!(removed, 1);
        store.save(&doc).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.metadata.total_records, 0);
        assert!(reloaded.engagements.is_empty());
    }

    #[test]
    fn test_mismatch_survives_load_and_is_fixed_by_save() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        std::fs::write(
            store.path(),
            r#"{"metadata": {"totalRecords": 7}, "engagements": [{"clientName": "A"}]}"#,
        )
        .unwrap();

        let doc = store.load().unwrap();
        assert_eq!(doc.count_mismatch(), Some((7, 1)));

        let doc = doc.with_added(make_engagement("B"));
        store.save(&doc).unwrap();
        assert!(store.load().unwrap().count_mismatch().is_none());
    }

    #[test]
    fn test_round_trip_preserves_nested_feedback() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        let mut e = make_engagement("Acme");
        e.client_feedback_questions = vec![
            FeedbackAnswer::new("Q1", "Very"),
            FeedbackAnswer::new("Q2", "Somewhat, with \"quotes\""),
        ];
        e.client_rating = Some(4.5);
        e.set_hours(40, 38);
        store.save(&Document::new(vec![e.clone()])).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.engagements, vec![e]);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path().join("nested").join("db.json"));
        store.save(&Document::default()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_domain_admin_string_normalized_on_load() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        std::fs::write(
            store.path(),
            r#"{"metadata": {"totalRecords": 1}, "engagements": [{"clientName": "A", "domainAdminObtained": "True"}]}"#,
        )
        .unwrap();
        let doc = store.load().unwrap();
        assert!(doc.engagements[0].domain_admin_obtained);

        store.save(&doc).unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"domainAdminObtained\": true"));
    }
}
