//! Board record model
//!
//! Records are a tagged union over the `category` field. They share a
//! [`RecordBase`]; only [`FaultRecord`]s carry link fields and take part in
//! grouping.
//!
//! The store keeps the document id outside the document body, so decoding
//! goes through [`Record::from_document`], which injects the id before
//! handing the fields to serde.

use crate::error::RecordError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Opaque record identifier assigned by the store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap a raw identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for RecordId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Store timestamp, seconds and nanoseconds since the Unix epoch
///
/// Ordering is chronological. A record whose timestamp is still pending on
/// the server sorts as [`Timestamp::EPOCH`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp {
    /// Whole seconds since the epoch
    pub seconds: i64,
    /// Sub-second nanoseconds
    #[serde(default)]
    pub nanos: u32,
}

impl Timestamp {
    /// The Unix epoch
    pub const EPOCH: Self = Self {
        seconds: 0,
        nanos: 0,
    };

    /// Timestamp at a whole second
    #[inline]
    #[must_use]
    pub const fn from_seconds(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    /// Current wall-clock time
    #[must_use]
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    /// Convert to a chrono datetime, if in range
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanos).single()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self {
            seconds: value.timestamp(),
            nanos: value.timestamp_subsec_nanos(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%d/%m/%Y, %H:%M")),
            None => f.write_str("N/A"),
        }
    }
}

/// Record category tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Q&A entry
    Qa,
    /// Common fault report, the only category eligible for grouping
    CommonFault,
    /// General note
    General,
}

impl Category {
    /// Wire value of the tag
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Qa => "qa",
            Self::CommonFault => "common-fault",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qa" => Ok(Self::Qa),
            "common-fault" => Ok(Self::CommonFault),
            "general" => Ok(Self::General),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// Appliance family derived from a model number prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModelCategory {
    /// Refrigerators (`RB…`)
    Ref,
    /// Dishwashers (`DW…`)
    Dw,
    /// Washing machines (`WW…`, `WM…`, `WF…`, `WD…`)
    Wsm,
    /// Tumble dryers (`TD…`)
    Td,
}

impl ModelCategory {
    /// Classify a model number by prefix, case-insensitively
    #[must_use]
    pub fn from_model_number(model_number: &str) -> Option<Self> {
        let model = model_number.trim().to_ascii_uppercase();
        if model.starts_with("RB") {
            Some(Self::Ref)
        } else if model.starts_with("DW") {
            Some(Self::Dw)
        } else if ["WW", "WM", "WF", "WD"].iter().any(|p| model.starts_with(p)) {
            Some(Self::Wsm)
        } else if model.starts_with("TD") {
            Some(Self::Td)
        } else {
            None
        }
    }

    /// Display label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ref => "REF",
            Self::Dw => "DW",
            Self::Wsm => "WSM",
            Self::Td => "TD",
        }
    }
}

impl FromStr for ModelCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "REF" => Ok(Self::Ref),
            "DW" => Ok(Self::Dw),
            "WSM" => Ok(Self::Wsm),
            "TD" => Ok(Self::Td),
            other => Err(format!("unknown model category: {other}")),
        }
    }
}

/// One side of a stored link: the other record's id and its title at link time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkRef {
    /// Linked record id
    pub id: RecordId,
    /// Title captured when the link was written; may be stale
    #[serde(default)]
    pub title: String,
}

impl LinkRef {
    /// Create a link entry
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<RecordId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Comment attached to a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Comment body
    #[serde(default)]
    pub text: String,
    /// Author display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<String>,
    /// Creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

/// Fields shared by every record category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordBase {
    /// Store-assigned identifier
    pub id: RecordId,
    /// Display title
    pub title: String,
    /// Creation time; `None` while the server timestamp is pending
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    /// Closed records stay linkable targets for grouping
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_closed: bool,
    /// Display name of the author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<String>,
    /// Appliance model number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_number: Option<String>,
    /// Appliance serial number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Service order number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_order_number: Option<String>,
    /// Salesforce case number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salesforce_case_number: Option<String>,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Updates and comments
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,
}

impl RecordBase {
    /// Minimal base with only the required fields set
    #[must_use]
    pub fn new(id: impl Into<RecordId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            created_at: None,
            is_closed: false,
            added_by: None,
            model_number: None,
            serial_number: None,
            service_order_number: None,
            salesforce_case_number: None,
            description: None,
            comments: Vec::new(),
        }
    }

    /// Creation time with pending timestamps mapped to the epoch
    #[inline]
    #[must_use]
    pub fn created_or_epoch(&self) -> Timestamp {
        self.created_at.unwrap_or(Timestamp::EPOCH)
    }

    /// Model family, when the model number has a known prefix
    #[must_use]
    pub fn model_category(&self) -> Option<ModelCategory> {
        self.model_number
            .as_deref()
            .and_then(ModelCategory::from_model_number)
    }
}

/// Explicit `null` decodes like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Q&A entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaRecord {
    /// Shared fields
    #[serde(flatten)]
    pub base: RecordBase,
    /// Eight-digit Q&A question id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_id: Option<String>,
}

/// General note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralRecord {
    /// Shared fields
    #[serde(flatten)]
    pub base: RecordBase,
    /// Tracked on the manufacturer action tracker
    #[serde(default, deserialize_with = "null_as_default")]
    pub on_samsung_tracker: bool,
}

/// Common-fault report
///
/// `related_to` holds links this record initiated and `related_by` links
/// initiated by the other side. The split only records who created the
/// link; for grouping both fields form one undirected relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultRecord {
    /// Shared fields
    #[serde(flatten)]
    pub base: RecordBase,
    /// Outbound link entries
    #[serde(default, deserialize_with = "null_as_default")]
    pub related_to: Vec<LinkRef>,
    /// Inbound link entries
    #[serde(default, deserialize_with = "null_as_default")]
    pub related_by: Vec<LinkRef>,
    /// Tracked on the manufacturer action tracker
    #[serde(default, deserialize_with = "null_as_default")]
    pub on_samsung_tracker: bool,
}

impl FaultRecord {
    /// Unlinked fault record
    #[must_use]
    pub fn new(id: impl Into<RecordId>, title: impl Into<String>) -> Self {
        Self {
            base: RecordBase::new(id, title),
            related_to: Vec::new(),
            related_by: Vec::new(),
            on_samsung_tracker: false,
        }
    }

    /// Record id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &RecordId {
        &self.base.id
    }

    /// Record title
    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.base.title
    }

    /// Whether the record is closed
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.base.is_closed
    }

    /// Creation order key: `(created_at or epoch, id)`
    #[inline]
    #[must_use]
    pub fn sort_key(&self) -> (Timestamp, &RecordId) {
        (self.base.created_or_epoch(), &self.base.id)
    }

    /// Every stored link entry, outbound first
    pub fn linked_entries(&self) -> impl Iterator<Item = &LinkRef> {
        self.related_to.iter().chain(self.related_by.iter())
    }

    /// Undirected neighbor set of this record
    ///
    /// This is the one place where the `relatedTo`/`relatedBy` split is
    /// resolved: both fields are read, duplicates collapse, and a reference
    /// to the record itself is dropped.
    #[must_use]
    pub fn link_targets(&self) -> BTreeSet<RecordId> {
        self.linked_entries()
            .filter(|link| link.id != self.base.id)
            .map(|link| link.id.clone())
            .collect()
    }

    /// Whether either link field mentions `other`
    #[must_use]
    pub fn is_linked_to(&self, other: &RecordId) -> bool {
        self.linked_entries().any(|link| &link.id == other)
    }
}

/// A board record of any category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "kebab-case")]
pub enum Record {
    /// Q&A entry
    Qa(QaRecord),
    /// Common-fault report
    CommonFault(FaultRecord),
    /// General note
    General(GeneralRecord),
}

impl Record {
    /// Decode a store document into a record
    ///
    /// # Errors
    /// Returns [`RecordError::Decode`] if the fields violate the schema
    /// (missing title, unknown category, wrongly typed values).
    pub fn from_document(id: &str, fields: &Map<String, Value>) -> Result<Self, RecordError> {
        let mut body = fields.clone();
        body.insert("id".to_string(), Value::String(id.to_string()));
        serde_json::from_value(Value::Object(body)).map_err(|source| RecordError::Decode {
            id: id.to_string(),
            source,
        })
    }

    /// Encode into document fields, without the id
    ///
    /// # Errors
    /// Returns [`RecordError::Encode`] if serialization fails.
    pub fn to_fields(&self) -> Result<Map<String, Value>, RecordError> {
        let encode_err = |source| RecordError::Encode {
            id: self.id().to_string(),
            source,
        };
        match serde_json::to_value(self).map_err(encode_err)? {
            Value::Object(mut map) => {
                map.remove("id");
                Ok(map)
            }
            _ => Err(RecordError::NotAnObject(self.id().to_string())),
        }
    }

    /// Shared fields
    #[must_use]
    pub fn base(&self) -> &RecordBase {
        match self {
            Self::Qa(r) => &r.base,
            Self::CommonFault(r) => &r.base,
            Self::General(r) => &r.base,
        }
    }

    /// Mutable shared fields
    pub fn base_mut(&mut self) -> &mut RecordBase {
        match self {
            Self::Qa(r) => &mut r.base,
            Self::CommonFault(r) => &mut r.base,
            Self::General(r) => &mut r.base,
        }
    }

    /// Record id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &RecordId {
        &self.base().id
    }

    /// Record title
    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.base().title
    }

    /// Category tag
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Self::Qa(_) => Category::Qa,
            Self::CommonFault(_) => Category::CommonFault,
            Self::General(_) => Category::General,
        }
    }

    /// Whether the record is on the manufacturer action tracker
    #[must_use]
    pub fn on_samsung_tracker(&self) -> bool {
        match self {
            Self::Qa(_) => false,
            Self::CommonFault(r) => r.on_samsung_tracker,
            Self::General(r) => r.on_samsung_tracker,
        }
    }

    /// Borrow as a fault record
    #[must_use]
    pub fn as_fault(&self) -> Option<&FaultRecord> {
        match self {
            Self::CommonFault(r) => Some(r),
            _ => None,
        }
    }

    /// Convert into a fault record
    #[must_use]
    pub fn into_fault(self) -> Option<FaultRecord> {
        match self {
            Self::CommonFault(r) => Some(r),
            _ => None,
        }
    }
}

impl From<FaultRecord> for Record {
    fn from(value: FaultRecord) -> Self {
        Self::CommonFault(value)
    }
}
