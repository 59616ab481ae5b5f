//! Record list filtering
//!
//! A [`RecordFilter`] narrows the status-filtered feed to one view; text
//! search is applied on top of it.

use faultboard_graph::{Category, Groups, ModelCategory, Record, RecordId};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Record list view
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecordFilter {
    /// Every record in the feed
    #[default]
    All,
    /// Records of one category
    Category(Category),
    /// Members of one fault group, oldest first
    Group(RecordId),
    /// Records whose model number belongs to a model family
    Model(ModelCategory),
    /// Records on the manufacturer action tracker
    SamsungTracker,
}

impl RecordFilter {
    /// Whether a record belongs in this view
    #[must_use]
    pub fn matches(&self, record: &Record, groups: &Groups) -> bool {
        match self {
            Self::All => true,
            Self::Category(category) => record.category() == *category,
            Self::Group(group_id) => {
                groups.group_id_of(record.id().as_str()) == Some(group_id)
            }
            Self::Model(model) => record.base().model_category() == Some(*model),
            Self::SamsungTracker => record.on_samsung_tracker(),
        }
    }

    /// Filter and search a feed
    ///
    /// Feed order is kept, except for group views which list members by
    /// ascending creation time.
    #[must_use]
    pub fn apply(&self, records: &[Record], groups: &Groups, search: &str) -> Vec<Record> {
        let mut visible: Vec<Record> = records
            .iter()
            .filter(|r| self.matches(r, groups))
            .filter(|r| matches_search(r, search))
            .cloned()
            .collect();
        if matches!(self, Self::Group(_)) {
            visible.sort_by(|a, b| {
                (a.base().created_or_epoch(), a.id()).cmp(&(b.base().created_or_epoch(), b.id()))
            });
        }
        visible
    }
}

impl fmt::Display for RecordFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Category(c) => f.write_str(c.as_str()),
            Self::Group(id) => write!(f, "group-{id}"),
            Self::Model(m) => write!(f, "model-{}", m.as_str().to_lowercase()),
            Self::SamsungTracker => f.write_str("samsung-action-tracker"),
        }
    }
}

impl FromStr for RecordFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(Self::All);
        }
        if s == "samsung-action-tracker" {
            return Ok(Self::SamsungTracker);
        }
        if let Some(id) = s.strip_prefix("group-") {
            return Ok(Self::Group(RecordId::from(id)));
        }
        if let Some(model) = s.strip_prefix("model-") {
            return ModelCategory::from_str(&model.to_uppercase()).map(Self::Model);
        }
        Category::from_str(s).map(Self::Category)
    }
}

/// Case-insensitive search over a record's top-level values
///
/// An empty or blank term matches everything.
#[must_use]
pub fn matches_search(record: &Record, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    if record.id().as_str().to_lowercase().contains(&term) {
        return true;
    }
    let Ok(fields) = record.to_fields() else {
        return false;
    };
    fields
        .values()
        .any(|value| value_text(value).to_lowercase().contains(&term))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
