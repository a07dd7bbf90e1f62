//! Query description shared by all case stores
//!
//! A `CaseQuery` only says *what* to fetch. `PostgrestStore` turns it into
//! PostgREST query parameters, `MemoryStore` evaluates it in-process with
//! [`CaseQuery::matches`] and [`CaseQuery::compare`].

use crate::record::{value_text, CaseRecord};
use chrono::DateTime;
use serde_json::Value;
use std::cmp::Ordering;

/// Filter predicate on one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Exact text equality
    Eq { column: String, value: String },
    /// Case-insensitive substring match
    Contains { column: String, value: String },
    /// Column value >= bound
    Gte { column: String, value: String },
    /// Column value <= bound
    Lte { column: String, value: String },
}

impl Predicate {
    pub fn column(&self) -> &str {
        match self {
            Predicate::Eq { column, .. }
            | Predicate::Contains { column, .. }
            | Predicate::Gte { column, .. }
            | Predicate::Lte { column, .. } => column,
        }
    }

    /// PostgREST operator form, e.g. `ilike.*沪72*`
    pub fn to_postgrest(&self) -> String {
        match self {
            Predicate::Eq { value, .. } => format!("eq.{}", value),
            Predicate::Contains { value, .. } => format!("ilike.*{}*", value),
            Predicate::Gte { value, .. } => format!("gte.{}", value),
            Predicate::Lte { value, .. } => format!("lte.{}", value),
        }
    }

    fn matches(&self, record: &CaseRecord) -> bool {
        let Some(actual) = record.get(self.column()).filter(|v| !v.is_null()) else {
            return false;
        };
        let actual = value_text(actual);

        match self {
            Predicate::Eq { value, .. } => actual == *value,
            Predicate::Contains { value, .. } => {
                actual.to_lowercase().contains(&value.to_lowercase())
            }
            Predicate::Gte { value, .. } => compare_text(&actual, value) != Ordering::Less,
            Predicate::Lte { value, .. } => compare_text(&actual, value) != Ordering::Greater,
        }
    }
}

/// Sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// Filtered, ordered, optionally paginated read of the case table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseQuery {
    columns: Vec<String>,
    predicates: Vec<Predicate>,
    order: Vec<OrderBy>,
    range: Option<(usize, usize)>,
}

impl CaseQuery {
    /// Select every column, no filters
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the returned columns
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Eq {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, column: &str, value: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Contains {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Gte {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn lte(mut self, column: &str, value: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Lte {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    /// Append a sort key. Empty values always sort last.
    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order.push(OrderBy {
            column: column.to_string(),
            descending,
        });
        self
    }

    /// Inclusive row range, zero based
    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.range = Some((from, to.max(from)));
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// `(offset, limit)` of the requested range
    pub fn offset_limit(&self) -> Option<(usize, usize)> {
        self.range.map(|(from, to)| (from, to - from + 1))
    }

    /// PostgREST query parameters for this query
    pub fn to_params(&self) -> Vec<(String, String)> {
        let select = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(",")
        };

        let mut params = vec![("select".to_string(), select)];

        params.extend(
            self.predicates
                .iter()
                .map(|p| (p.column().to_string(), p.to_postgrest())),
        );

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| {
                    let direction = if o.descending { "desc" } else { "asc" };
                    format!("{}.{}.nullslast", o.column, direction)
                })
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }

        if let Some((offset, limit)) = self.offset_limit() {
            params.push(("offset".to_string(), offset.to_string()));
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }

    /// Whether a record passes every predicate
    pub fn matches(&self, record: &CaseRecord) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }

    /// Compare two records by the query's sort keys
    pub fn compare(&self, a: &CaseRecord, b: &CaseRecord) -> Ordering {
        for key in &self.order {
            let left = a.text(&key.column);
            let right = b.text(&key.column);

            let ordering = match (left.is_empty(), right.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) if key.descending => compare_text(&left, &right).reverse(),
                (false, false) => compare_text(&left, &right),
            };

            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Keep only the selected columns, in selection order
    pub fn project(&self, record: &CaseRecord) -> CaseRecord {
        if self.columns.is_empty() {
            return record.clone();
        }
        self.columns.iter().fold(CaseRecord::new(), |acc, column| {
            acc.with(column.clone(), record.get(column).cloned().unwrap_or(Value::Null))
        })
    }
}

/// Timestamps compare chronologically, anything else as text
fn compare_text(left: &str, right: &str) -> Ordering {
    match (
        DateTime::parse_from_rfc3339(left),
        DateTime::parse_from_rfc3339(right),
    ) {
        (Ok(l), Ok(r)) => l.cmp(&r),
        _ => left.cmp(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CASE_NUMBER, CASE_TYPE, COURT, DECISION_DATE};

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_postgrest_params() {
        let query = CaseQuery::new()
            .contains(CASE_NUMBER, "沪72")
            .eq(CASE_TYPE, "民事")
            .gte(DECISION_DATE, "2018-01-01T00:00:00+08:00")
            .order_by(DECISION_DATE, true)
            .range(10, 19);

        let params = query.to_params();
        assert_eq!(param(&params, "select"), Some("*"));
        assert_eq!(param(&params, CASE_NUMBER), Some("ilike.*沪72*"));
        assert_eq!(param(&params, CASE_TYPE), Some("eq.民事"));
        assert_eq!(param(&params, DECISION_DATE), Some("gte.2018-01-01T00:00:00+08:00"));
        assert_eq!(param(&params, "order"), Some("裁判日期.desc.nullslast"));
        assert_eq!(param(&params, "offset"), Some("10"));
        assert_eq!(param(&params, "limit"), Some("10"));
    }

    #[test]
    fn test_select_columns() {
        let params = CaseQuery::new().select([CASE_TYPE]).to_params();
        assert_eq!(param(&params, "select"), Some("案件类型"));
        assert_eq!(param(&params, "order"), None);
        assert_eq!(param(&params, "limit"), None);
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let record = CaseRecord::new().with(COURT, "Shanghai Maritime Court");
        assert!(CaseQuery::new().contains(COURT, "maritime").matches(&record));
        assert!(!CaseQuery::new().contains(COURT, "guangzhou").matches(&record));
        assert!(!CaseQuery::new().contains(CASE_NUMBER, "x").matches(&record));
    }

    #[test]
    fn test_date_bounds_compare_chronologically() {
        // 2018-05-20T00:00:00+00:00 is 08:00 in +08:00
        let record = CaseRecord::new().with(DECISION_DATE, "2018-05-20T00:00:00+00:00");
        let same_day = CaseQuery::new()
            .gte(DECISION_DATE, "2018-05-20T00:00:00+08:00")
            .lte(DECISION_DATE, "2018-05-20T23:59:59+08:00");
        assert!(same_day.matches(&record));

        let later = CaseQuery::new().gte(DECISION_DATE, "2018-05-21T00:00:00+08:00");
        assert!(!later.matches(&record));
    }

    #[test]
    fn test_ordering_puts_empty_last() {
        let query = CaseQuery::new().order_by(DECISION_DATE, true);
        let old = CaseRecord::new().with(DECISION_DATE, "2018-05-20T00:00:00+00:00");
        let new = CaseRecord::new().with(DECISION_DATE, "2020-03-10T00:00:00+00:00");
        let undated = CaseRecord::new();

        let mut rows = vec![undated.clone(), old.clone(), new.clone()];
        rows.sort_by(|a, b| query.compare(a, b));
        assert_eq!(rows, vec![new, old, undated]);
    }

    #[test]
    fn test_project_keeps_selection_order() {
        let record = CaseRecord::new()
            .with(CASE_NUMBER, "(2020)沪72行初45号")
            .with(CASE_TYPE, "行政");
        let projected = CaseQuery::new().select([CASE_TYPE, COURT]).project(&record);
        let columns: Vec<_> = projected.columns().collect();
        assert_eq!(columns, vec![CASE_TYPE, COURT]);
        assert_eq!(projected.text(COURT), "");
    }
}
