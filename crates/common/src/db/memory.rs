//! In-process case store
//!
//! Evaluates [`CaseQuery`] against rows held in memory. Used by tests and by
//! the offline demo mode (`storage.url = "memory://"`).

use super::{CaseQuery, CaseStore};
use crate::errors::Result;
use crate::record::{CaseRecord, CASE_NUMBER, CASE_TYPE, COURT, DECISION_DATE, REASONING};
use async_trait::async_trait;

#[derive(Default)]
pub struct MemoryStore {
    rows: Vec<CaseRecord>,
}

impl MemoryStore {
    pub fn new(rows: Vec<CaseRecord>) -> Self {
        Self { rows }
    }

    /// Store seeded with a few maritime court cases
    pub fn with_sample_cases() -> Self {
        Self::new(sample_cases())
    }
}

#[async_trait]
impl CaseStore for MemoryStore {
    async fn fetch(&self, query: &CaseQuery) -> Result<Vec<CaseRecord>> {
        let mut matched: Vec<&CaseRecord> = self.rows.iter().filter(|r| query.matches(r)).collect();
        // Stable sort keeps insertion order between equal keys
        matched.sort_by(|a, b| query.compare(a, b));

        let selected = match query.offset_limit() {
            Some((offset, limit)) => matched.into_iter().skip(offset).take(limit).collect(),
            None => matched,
        };

        Ok(selected.into_iter().map(|r| query.project(r)).collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Cases used to seed demo and test stores
pub fn sample_cases() -> Vec<CaseRecord> {
    vec![
        CaseRecord::new()
            .with(CASE_NUMBER, "(2018)沪72协外认7号")
            .with(COURT, "上海海事法院")
            .with(DECISION_DATE, "2018-05-20T00:00:00+00:00")
            .with(CASE_TYPE, "民事")
            .with(REASONING, "涉外仲裁裁决承认与执行案例"),
        CaseRecord::new()
            .with(CASE_NUMBER, "(2019)沪72民初123号")
            .with(COURT, "上海海事法院")
            .with(DECISION_DATE, "2019-08-15T00:00:00+00:00")
            .with(CASE_TYPE, "民事")
            .with(REASONING, "海上货物运输合同纠纷"),
        CaseRecord::new()
            .with(CASE_NUMBER, "(2020)沪72行初45号")
            .with(COURT, "上海海事法院")
            .with(DECISION_DATE, "2020-03-10T00:00:00+00:00")
            .with(CASE_TYPE, "行政")
            .with(REASONING, "海事行政处罚案件"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_filters_orders_and_pages() {
        let store = MemoryStore::with_sample_cases();

        let query = CaseQuery::new()
            .eq(CASE_TYPE, "民事")
            .order_by(DECISION_DATE, true);
        let rows = store.fetch(&query).await.unwrap();
        let numbers: Vec<_> = rows.iter().map(|r| r.text(CASE_NUMBER)).collect();
        assert_eq!(numbers, vec!["(2019)沪72民初123号", "(2018)沪72协外认7号"]);

        let page = store.fetch(&query.clone().range(1, 1)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].text(CASE_NUMBER), "(2018)沪72协外认7号");

        let past_end = store.fetch(&query.range(5, 9)).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_select_projects_columns() {
        let store = MemoryStore::new(vec![CaseRecord::new()
            .with(CASE_TYPE, "刑事")
            .with(COURT, "北京")]);

        let rows = store
            .fetch(&CaseQuery::new().select([CASE_TYPE]))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns().collect::<Vec<_>>(), vec![CASE_TYPE]);
        assert!(store.ping().await.is_ok());
    }
}
