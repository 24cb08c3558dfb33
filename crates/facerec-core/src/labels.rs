//! Label space: the bijection between person names and label ids.
//!
//! Serialized as `{"name_to_id": {...}, "id_to_name": {...}}`. JSON object
//! keys are strings, so `id_to_name` keys are written as the decimal form of
//! the id and parsed back into integers on load.

use crate::types::{LabelId, UNKNOWN_NAME};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSpace {
    name_to_id: BTreeMap<String, LabelId>,
    id_to_name: BTreeMap<LabelId, String>,
}

impl LabelSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, minting the next sequential id if unseen.
    pub fn get_or_insert(&mut self, name: &str) -> LabelId {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.name_to_id.len() as LabelId;
        self.name_to_id.insert(name.to_string(), id);
        self.id_to_name.insert(id, name.to_string());
        id
    }

    pub fn id(&self, name: &str) -> Option<LabelId> {
        self.name_to_id.get(name).copied()
    }

    pub fn name(&self, id: LabelId) -> Option<&str> {
        self.id_to_name.get(&id).map(String::as_str)
    }

    /// Name for `id`, or `"Unknown"` when the id is not in this space.
    pub fn name_or_unknown(&self, id: LabelId) -> &str {
        self.name(id).unwrap_or(UNKNOWN_NAME)
    }

    pub fn len(&self) -> usize {
        self.id_to_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_name.is_empty()
    }

    pub fn name_to_id(&self) -> &BTreeMap<String, LabelId> {
        &self.name_to_id
    }

    pub fn id_to_name(&self) -> &BTreeMap<LabelId, String> {
        &self.id_to_name
    }

    /// True when both maps cover the same pairs and the ids are exactly `0..len`.
    pub fn is_consistent(&self) -> bool {
        self.name_to_id.len() == self.id_to_name.len()
            && self
                .name_to_id
                .iter()
                .all(|(name, id)| self.id_to_name.get(id) == Some(name))
            && self
                .id_to_name
                .keys()
                .enumerate()
                .all(|(i, &id)| i as LabelId == id)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
