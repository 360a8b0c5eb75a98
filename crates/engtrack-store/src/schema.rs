//! Shape detection and repair for the on-disk document.
//!
//! Two shapes exist in the wild: the current `{metadata, engagements}`
//! wrapper and the legacy bare array of records. Both are folded into one
//! [`Document`] here; nothing past this module sees the difference.
//!
//! Records are decoded one at a time. A record with an unreadable field
//! loses that field, not its siblings.

use serde::de::Error as _;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use engtrack_core::{Document, Engagement, Metadata};

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default, rename = "totalRecords")]
    total_records: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentShape {
    #[serde(default)]
    metadata: Option<RawMetadata>,
    #[serde(default)]
    engagements: Option<Vec<Value>>,
}

#[derive(Debug)]
enum StoredShape {
    Current(CurrentShape),
    Legacy(Vec<Value>),
}

impl StoredShape {
    fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Array(_) => Ok(Self::Legacy(serde_json::from_value(value)?)),
            Value::Object(_) => Ok(Self::Current(serde_json::from_value(value)?)),
            other => Err(serde_json::Error::custom(format!(
                "expected an object or array at top level, found {}",
                json_kind(&other)
            ))),
        }
    }

    fn into_document(self) -> Document {
        match self {
            Self::Legacy(records) => {
                debug!(records = records.len(), "upgrading legacy array document");
                Document::new(decode_records(records))
            }
            Self::Current(shape) => {
                let engagements = decode_records(shape.engagements.unwrap_or_default());
                let total_records = match shape.metadata.and_then(|m| m.total_records) {
                    Some(n) => n,
                    None => {
                        debug!("totalRecords missing, backfilling from record count");
                        engagements.len()
                    }
                };
                Document {
                    metadata: Metadata { total_records },
                    engagements,
                }
            }
        }
    }
}

fn decode_records(records: Vec<Value>) -> Vec<Engagement> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| decode_record(index, record))
        .collect()
}

/// Decode one record, dropping any field that cannot be read.
/// Entries that are not JSON objects are skipped.
fn decode_record(index: usize, record: Value) -> Option<Engagement> {
    let err = match Engagement::deserialize(&record) {
        Ok(engagement) => return Some(engagement),
        Err(e) => e,
    };
    let Value::Object(fields) = record else {
        warn!(index, "skipping engagement that is not an object: {err}");
        return None;
    };

    warn!(index, "repairing engagement: {err}");
    let readable: Map<String, Value> = fields
        .into_iter()
        .filter(|(key, value)| {
            let ok = field_is_readable(key, value);
            if !ok {
                warn!(index, field = %key, "dropping unreadable field");
            }
            ok
        })
        .collect();
    Engagement::deserialize(&Value::Object(readable)).ok()
}

fn field_is_readable(key: &str, value: &Value) -> bool {
    let mut single = Map::new();
    single.insert(key.to_string(), value.clone());
    Engagement::deserialize(&Value::Object(single)).is_ok()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Turn store file contents into a document.
///
/// Empty, malformed or unrecognisable content yields an empty document;
/// a corrupt file means starting fresh, never an error. The stored
/// `totalRecords` is kept as found even if it disagrees with the records.
pub fn parse_document(text: &str) -> Document {
    if text.trim().is_empty() {
        debug!("store file is empty");
        return Document::default();
    }

    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!("store file is not valid JSON, starting with no data: {e}");
            return Document::default();
        }
    };

    match StoredShape::from_value(value) {
        Ok(shape) => shape.into_document(),
        Err(e) => {
            warn!("store file has an unexpected shape, starting with no data: {e}");
            Document::default()
        }
    }
}
