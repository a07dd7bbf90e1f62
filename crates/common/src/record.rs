//! Case record model
//!
//! Rows of the case table are schemaless JSON objects. Column order is kept
//! exactly as the storage returned it, which matters for CSV headers and for
//! the fallback identifier hash.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Case number column
pub const CASE_NUMBER: &str = "案号";

/// Court column
pub const COURT: &str = "审理法院";

/// Decision date column (timestamp text)
pub const DECISION_DATE: &str = "裁判日期";

/// Case type column
pub const CASE_TYPE: &str = "案件类型";

/// Application outcome column
pub const OUTCOME: &str = "申请结果";

/// Country where the foreign judgment was rendered
pub const SOURCE_COUNTRY: &str = "判决来源国";

/// Reasoning column
pub const REASONING: &str = "裁判理由";

/// Presentation-only field holding the derived case id
pub const GENERATED_ID: &str = "_generated_id";

/// Columns shown when the table layout cannot be discovered
pub const DEFAULT_COLUMNS: [&str; 3] = [CASE_NUMBER, COURT, DECISION_DATE];

/// Columns that could serve as a real identifier, in order of preference
pub const ID_COLUMN_CANDIDATES: [&str; 5] = ["id", "ID", "Id", CASE_NUMBER, "案件编号"];

/// One case entry as fetched from storage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseRecord(Map<String, Value>);

impl CaseRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Text of a field. Missing fields and nulls read as empty text.
    pub fn text(&self, field: &str) -> String {
        self.0.get(field).map(value_text).unwrap_or_default()
    }

    /// Column names in storage order, without presentation-only fields
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|key| *key != GENERATED_ID)
    }

    /// Derived id previously attached by [`crate::case_id::annotate`]
    pub fn generated_id(&self) -> Option<&str> {
        self.0.get(GENERATED_ID).and_then(Value::as_str)
    }

    /// Compact JSON of the stored fields, in storage order
    pub fn canonical_json(&self) -> serde_json::Result<Vec<u8>> {
        if self.0.contains_key(GENERATED_ID) {
            let stored: Map<String, Value> = self
                .0
                .iter()
                .filter(|(key, _)| key.as_str() != GENERATED_ID)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            serde_json::to_vec(&stored)
        } else {
            serde_json::to_vec(&self.0)
        }
    }
}

/// Render a JSON value as plain text
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
