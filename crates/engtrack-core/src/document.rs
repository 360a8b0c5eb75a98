use serde::{Deserialize, Serialize};

use crate::engagement::Engagement;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub total_records: usize,
}

/// The whole store file: `{ metadata: { totalRecords }, engagements: [...] }`.
///
/// Mutations consume the document and hand back a new one with
/// `totalRecords` resynchronised to the collection length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub metadata: Metadata,
    pub engagements: Vec<Engagement>,
}

impl Document {
    pub fn new(engagements: Vec<Engagement>) -> Self {
        Self {
            metadata: Metadata {
                total_records: engagements.len(),
            },
            engagements,
        }
    }

    pub fn len(&self) -> usize {
        self.engagements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engagements.is_empty()
    }

    /// `Some((stored, actual))` when `metadata.totalRecords` disagrees with
    /// the number of records actually present.
    pub fn count_mismatch(&self) -> Option<(usize, usize)> {
        let actual = self.engagements.len();
        (self.metadata.total_records != actual).then_some((self.metadata.total_records, actual))
    }

    pub fn with_added(self, engagement: Engagement) -> Self {
        let mut engagements = self.engagements;
        engagements.push(engagement);
        Self::new(engagements)
    }

    /// Drop every record for `client_name`. Returns the new document and the
    /// number of records removed.
    pub fn without_client(self, client_name: &str) -> (Self, usize) {
        let before = self.engagements.len();
        let kept: Vec<Engagement> = self
            .engagements
            .into_iter()
            .filter(|e| e.client_name != client_name)
            .collect();
        let removed = before - kept.len();
        (Self::new(kept), removed)
    }

    /// Apply `update` to every record for `client_name`, recomputing derived
    /// fields afterwards. Returns the new document and the number touched.
    pub fn with_client_updated<F>(self, client_name: &str, mut update: F) -> (Self, usize)
    where
        F: FnMut(&mut Engagement),
    {
        let mut touched = 0;
        let engagements = self
            .engagements
            .into_iter()
            .map(|mut e| {
                if e.client_name == client_name {
                    update(&mut e);
                    e.recompute_derived();
                    touched += 1;
                }
                e
            })
            .collect();
        (Self::new(engagements), touched)
    }

    pub fn find_client(&self, client_name: &str) -> Vec<&Engagement> {
        self.engagements
            .iter()
            .filter(|e| e.client_name == client_name)
            .collect()
    }

    /// Client names sorted ascending, duplicates removed.
    pub fn client_names(&self) -> Vec<String> {
        client_names(&self.engagements)
    }
}

pub fn client_names(engagements: &[Engagement]) -> Vec<String> {
    let mut names: Vec<String> = engagements.iter().map(|e| e.client_name.clone()).collect();
    names.sort();
    names.dedup();
    names
}
