use std::collections::HashMap;
use serde_json::Value;
use crate::errors::ValidationError;
use crate::models::EditRecord;

/// Last-write-wins map of object id to its latest edit, ordered by server arrival.
#[derive(Debug)]
pub struct ObjectStore {
    records: HashMap<String, EditRecord>,
    next_seq: u64,
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self { records: HashMap::new(), next_seq: 1 }
    }
}

impl ObjectStore {
    /// Assign the next sequence number and replace whatever was stored for `object_id`.
    pub fn apply_edit(&mut self, object_id: Option<&str>, payload: Value, author_id: &str) -> Result<EditRecord, ValidationError> {
        let object_id = object_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ValidationError::MissingObjectId)?;

        let record = EditRecord {
            object_id: object_id.to_string(),
            payload,
            author_id: author_id.to_string(),
            server_seq: self.next_seq,
        };
        self.next_seq += 1;
        self.records.insert(record.object_id.clone(), record.clone());
        Ok(record)
    }

    /// One record per tracked object, in the order they were last written.
    pub fn snapshot(&self) -> Vec<EditRecord> {
        let mut records: Vec<EditRecord> = self.records.values().cloned().collect();
        records.sort_by_key(|r| r.server_seq);
        records
    }

    pub fn get(&self, object_id: &str) -> Option<&EditRecord> {
        self.records.get(object_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
