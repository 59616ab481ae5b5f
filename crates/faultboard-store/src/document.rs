//! Documents and field-level updates
//!
//! A document is a JSON object keyed by a store-assigned id. Writes are
//! expressed as [`FieldUpdate`]s so that concurrent writers touching
//! different fields, or appending to the same array, do not clobber each
//! other.

use crate::error::StoreError;
use faultboard_graph::{FaultRecord, Record, RecordError, RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Document body
pub type Fields = Map<String, Value>;

/// Stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document id
    pub id: RecordId,
    /// Document body
    pub fields: Fields,
    /// Store revision of the last write to this document
    #[serde(default)]
    pub version: u64,
}

impl Document {
    /// Create a document at version 0
    #[must_use]
    pub fn new(id: impl Into<RecordId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
            version: 0,
        }
    }

    /// Split a flat object (`{"id": .., ...fields}`) into a document
    ///
    /// Returns `None` if the value is not an object or has no string `id`.
    #[must_use]
    pub fn from_flat(value: Value) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };
        let Some(Value::String(id)) = fields.remove("id") else {
            return None;
        };
        Some(Self::new(id, fields))
    }

    /// Field value
    #[inline]
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Decode into a typed record
    ///
    /// # Errors
    /// Propagates schema violations from [`Record::from_document`].
    pub fn decode(&self) -> Result<Record, RecordError> {
        Record::from_document(self.id.as_str(), &self.fields)
    }

    /// Decode, keeping only fault records
    ///
    /// # Errors
    /// Propagates schema violations from [`Record::from_document`].
    pub fn decode_fault(&self) -> Result<Option<FaultRecord>, RecordError> {
        Ok(self.decode()?.into_fault())
    }
}

/// Single-field write
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Replace the value
    Set {
        /// Field name
        field: String,
        /// New value
        value: Value,
    },
    /// Remove the field
    Delete {
        /// Field name
        field: String,
    },
    /// Set the field to the commit time
    ServerTimestamp {
        /// Field name
        field: String,
    },
    /// Append each value not already present
    ArrayUnion {
        /// Field name
        field: String,
        /// Values to add
        values: Vec<Value>,
    },
    /// Remove every object element whose `key` equals `value`
    ArrayRemoveWhere {
        /// Field name
        field: String,
        /// Key inside each element
        key: String,
        /// Value to match
        value: Value,
    },
}

impl FieldUpdate {
    /// Set a field
    #[must_use]
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Set {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Remove a field
    #[must_use]
    pub fn delete(field: impl Into<String>) -> Self {
        Self::Delete {
            field: field.into(),
        }
    }

    /// Array union of one value
    #[must_use]
    pub fn array_union(field: impl Into<String>, value: Value) -> Self {
        Self::ArrayUnion {
            field: field.into(),
            values: vec![value],
        }
    }

    /// Remove array entries by key
    #[must_use]
    pub fn array_remove_where(
        field: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::ArrayRemoveWhere {
            field: field.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    /// Field the update writes
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Set { field, .. }
            | Self::Delete { field }
            | Self::ServerTimestamp { field }
            | Self::ArrayUnion { field, .. }
            | Self::ArrayRemoveWhere { field, .. } => field,
        }
    }

    /// Apply to a document body
    ///
    /// Array transforms treat a missing field as an empty array.
    ///
    /// # Errors
    /// Returns [`StoreError::NotAnArray`] if an array transform hits a
    /// non-array value.
    pub fn apply(&self, id: &RecordId, fields: &mut Fields, now: Timestamp) -> Result<(), StoreError> {
        match self {
            Self::Set { field, value } => {
                fields.insert(field.clone(), value.clone());
            }
            Self::Delete { field } => {
                fields.remove(field);
            }
            Self::ServerTimestamp { field } => {
                let stamp = serde_json::json!({ "seconds": now.seconds, "nanos": now.nanos });
                fields.insert(field.clone(), stamp);
            }
            Self::ArrayUnion { field, values } => {
                let array = array_mut(id, fields, field)?;
                for value in values {
                    if !array.contains(value) {
                        array.push(value.clone());
                    }
                }
            }
            Self::ArrayRemoveWhere { field, key, value } => {
                let array = array_mut(id, fields, field)?;
                array.retain(|element| element.get(key) != Some(value));
            }
        }
        Ok(())
    }
}

fn array_mut<'f>(
    id: &RecordId,
    fields: &'f mut Fields,
    field: &str,
) -> Result<&'f mut Vec<Value>, StoreError> {
    let slot = fields
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    slot.as_array_mut().ok_or_else(|| StoreError::NotAnArray {
        id: id.clone(),
        field: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn array_union_skips_equal_values() {
        let id = RecordId::from("a");
        let mut fields = body(json!({ "relatedTo": [{ "id": "b", "title": "B" }] }));

        FieldUpdate::array_union("relatedTo", json!({ "id": "b", "title": "B" }))
            .apply(&id, &mut fields, Timestamp::EPOCH)
            .unwrap();
        FieldUpdate::array_union("relatedTo", json!({ "id": "b", "title": "B2" }))
            .apply(&id, &mut fields, Timestamp::EPOCH)
            .unwrap();

        assert_eq!(fields["relatedTo"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn array_transforms_create_missing_field() {
        let id = RecordId::from("a");
        let mut fields = body(json!({ "relatedBy": null }));

        FieldUpdate::array_union("relatedBy", json!({ "id": "c" }))
            .apply(&id, &mut fields, Timestamp::EPOCH)
            .unwrap();
        FieldUpdate::array_remove_where("relatedTo", "id", "c")
            .apply(&id, &mut fields, Timestamp::EPOCH)
            .unwrap();

        assert_eq!(fields["relatedBy"], json!([{ "id": "c" }]));
        assert_eq!(fields["relatedTo"], json!([]));
    }

    #[test]
    fn remove_where_ignores_title() {
        let id = RecordId::from("a");
        let mut fields = body(json!({
            "relatedTo": [
                { "id": "b", "title": "old" },
                { "id": "c", "title": "C" },
                { "id": "b", "title": "new" }
            ]
        }));

        FieldUpdate::array_remove_where("relatedTo", "id", "b")
            .apply(&id, &mut fields, Timestamp::EPOCH)
            .unwrap();

        assert_eq!(fields["relatedTo"], json!([{ "id": "c", "title": "C" }]));
    }

    #[test]
    fn array_transform_on_scalar_fails() {
        let id = RecordId::from("a");
        let mut fields = body(json!({ "relatedTo": "oops" }));
        let err = FieldUpdate::array_remove_where("relatedTo", "id", "b")
            .apply(&id, &mut fields, Timestamp::EPOCH)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotAnArray { .. }));
    }

    #[test]
    fn delete_removes_field_and_tolerates_missing() {
        let id = RecordId::from("a");
        let mut fields = body(json!({ "title": "T", "modelNumber": "RB38" }));

        FieldUpdate::delete("modelNumber")
            .apply(&id, &mut fields, Timestamp::EPOCH)
            .unwrap();
        FieldUpdate::delete("serialNumber")
            .apply(&id, &mut fields, Timestamp::EPOCH)
            .unwrap();

        assert_eq!(Value::Object(fields), json!({ "title": "T" }));
    }

    #[test]
    fn server_timestamp_writes_seconds_and_nanos() {
        let id = RecordId::from("a");
        let mut fields = Fields::new();
        FieldUpdate::ServerTimestamp {
            field: "createdAt".into(),
        }
        .apply(&id, &mut fields, Timestamp { seconds: 7, nanos: 9 })
        .unwrap();
        assert_eq!(fields["createdAt"], json!({ "seconds": 7, "nanos": 9 }));
    }

    #[test]
    fn from_flat_extracts_id() {
        let doc = Document::from_flat(json!({ "id": "x", "title": "T" })).unwrap();
        assert_eq!(doc.id.as_str(), "x");
        assert!(!doc.fields.contains_key("id"));
        assert!(Document::from_flat(json!({ "title": "T" })).is_none());
        assert!(Document::from_flat(json!([1, 2])).is_none());
    }
}
