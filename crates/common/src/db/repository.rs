//! Repository pattern for case table access
//!
//! Provides the operations the HTTP layer needs on top of a [`CaseStore`]:
//! paginated search, export, lookup by derived case id, filter options and
//! column discovery.

use super::{CaseQuery, CaseStore};
use crate::case_id::{annotate, count_matches, resolve_case};
use crate::config::{AppConfig, SearchConfig};
use crate::errors::Result;
use crate::filter::{page_range, CaseFilter};
use crate::metrics;
use crate::record::{
    CaseRecord, CASE_NUMBER, CASE_TYPE, DECISION_DATE, DEFAULT_COLUMNS, GENERATED_ID,
    ID_COLUMN_CANDIDATES, OUTCOME, SOURCE_COUNTRY,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

/// One page of search results
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    /// Rows annotated with their derived case id
    pub rows: Vec<CaseRecord>,
    pub page: usize,
    pub has_next_page: bool,
}

/// Distinct values offered in the search form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub case_types: Vec<String>,
    pub result_types: Vec<String>,
    pub countries: Vec<String>,
}

/// Column layout of the case table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableColumns {
    pub columns: Vec<String>,
    /// First column that looks like a real identifier
    pub id_column: Option<String>,
}

impl Default for TableColumns {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            id_column: None,
        }
    }
}

/// Repository for case data access
#[derive(Clone)]
pub struct CaseRepository {
    store: Arc<dyn CaseStore>,
    search: SearchConfig,
    batch_size: usize,
}

impl CaseRepository {
    /// Create a new repository over the given store
    pub fn new(store: Arc<dyn CaseStore>, search: SearchConfig, batch_size: usize) -> Self {
        Self {
            store,
            search,
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_config(store: Arc<dyn CaseStore>, config: &AppConfig) -> Self {
        Self::new(store, config.search.clone(), config.storage.batch_size)
    }

    pub fn search_config(&self) -> &SearchConfig {
        &self.search
    }

    /// Ping the store
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    /// Name of the backing store
    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    // ========================================================================
    // Search & export
    // ========================================================================

    /// One page of filtered cases, newest decision first
    pub async fn search_page(&self, filter: &CaseFilter, page: usize) -> Result<SearchPage> {
        let start = Instant::now();
        let page = page.max(1);
        let (from, to) = page_range(page, self.search.page_size);

        let query = filter
            .apply(CaseQuery::new(), &self.search.timezone_offset)?
            .order_by(DECISION_DATE, true)
            .range(from, to);

        let rows: Vec<CaseRecord> = self
            .store
            .fetch(&query)
            .await?
            .into_iter()
            .map(annotate)
            .collect();

        let has_next_page = rows.len() == self.search.page_size;

        metrics::record_search(start.elapsed().as_secs_f64(), rows.len());
        tracing::info!(
            page,
            results = rows.len(),
            has_next_page,
            filters = filter.pairs().len(),
            "Search completed"
        );

        Ok(SearchPage {
            rows,
            page,
            has_next_page,
        })
    }

    /// Every case matching the filter, newest decision first
    pub async fn export(&self, filter: &CaseFilter) -> Result<Vec<CaseRecord>> {
        let query = filter.apply(CaseQuery::new(), &self.search.timezone_offset)?;
        let query = self.scan_order(query).await;

        let rows = self.fetch_all(query).await?;
        metrics::record_export(rows.len());
        Ok(rows)
    }

    // ========================================================================
    // Lookup by derived case id
    // ========================================================================

    /// Find the case whose derived id is `case_id`.
    ///
    /// The id is not a column, so the whole table is scanned. Rows are ranked
    /// newest decision first, then by case number, then by every other column
    /// and finally by their canonical JSON. On a collision the first row in
    /// that ranking is returned, whatever order the store produced.
    pub async fn find_by_case_id(&self, case_id: &str) -> Result<Option<CaseRecord>> {
        let query = self.scan_order(CaseQuery::new()).await;
        let mut records = self.fetch_all(query.clone()).await?;
        records.sort_by(|a, b| {
            query
                .compare(a, b)
                .then_with(|| a.canonical_json().ok().cmp(&b.canonical_json().ok()))
        });

        let found = resolve_case(case_id, &records).cloned();
        metrics::record_case_lookup(found.is_some(), records.len());

        if found.is_some() {
            let matches = count_matches(case_id, &records);
            if matches > 1 {
                metrics::record_case_id_collision();
                tracing::warn!(
                    case_id = %case_id,
                    matches,
                    "Derived case id is shared by several records, using the first"
                );
            }
        } else {
            tracing::warn!(case_id = %case_id, scanned = records.len(), "Case not found");
        }

        Ok(found)
    }

    // ========================================================================
    // Form metadata
    // ========================================================================

    /// Distinct values for the select boxes. Storage failures give empty lists.
    pub async fn filter_options(&self) -> FilterOptions {
        let options = async {
            Ok::<_, crate::errors::AppError>(FilterOptions {
                case_types: self.distinct_values(CASE_TYPE).await?,
                result_types: self.distinct_values(OUTCOME).await?,
                countries: self.distinct_values(SOURCE_COUNTRY).await?,
            })
        };

        match options.await {
            Ok(options) => options,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load filter options");
                FilterOptions::default()
            }
        }
    }

    /// Column names from the first row, with the default layout as fallback
    pub async fn table_columns(&self) -> TableColumns {
        let rows = match self.store.fetch(&CaseQuery::new().range(0, 0)).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read table columns");
                return TableColumns::default();
            }
        };

        let Some(first) = rows.first() else {
            return TableColumns::default();
        };

        let columns: Vec<String> = first.columns().map(str::to_string).collect();
        let id_column = ID_COLUMN_CANDIDATES
            .iter()
            .find(|candidate| columns.iter().any(|c| c.as_str() == **candidate))
            .map(|c| c.to_string());

        match &id_column {
            Some(column) => tracing::debug!(id_column = %column, "Found identifier-like column"),
            None => tracing::debug!("No identifier-like column in case table"),
        }

        TableColumns { columns, id_column }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Add sort keys that leave only identical rows tied: newest decision,
    /// case number, then every other column of the table.
    ///
    /// Offset paging over tied rows may skip or repeat rows between batches.
    async fn scan_order(&self, query: CaseQuery) -> CaseQuery {
        let layout = self.table_columns().await;
        let query = query
            .order_by(DECISION_DATE, true)
            .order_by(CASE_NUMBER, false);

        layout
            .columns
            .iter()
            .filter(|c| !matches!(c.as_str(), DECISION_DATE | CASE_NUMBER | GENERATED_ID))
            .fold(query, |query, column| query.order_by(column, false))
    }

    /// Read every row of `query`, `batch_size` rows per request
    async fn fetch_all(&self, query: CaseQuery) -> Result<Vec<CaseRecord>> {
        let mut rows = Vec::new();
        let mut offset = 0;

        loop {
            let batch = self
                .store
                .fetch(&query.clone().range(offset, offset + self.batch_size - 1))
                .await?;
            let fetched = batch.len();
            rows.extend(batch);

            if fetched < self.batch_size {
                break;
            }
            offset += self.batch_size;
        }

        Ok(rows)
    }

    async fn distinct_values(&self, column: &str) -> Result<Vec<String>> {
        // Ordered by the column itself, so paging cannot lose a value
        let query = CaseQuery::new().select([column]).order_by(column, false);
        let rows = self.fetch_all(query).await?;
        let values: BTreeSet<String> = rows
            .iter()
            .map(|r| r.text(column))
            .filter(|v| !v.is_empty())
            .collect();
        Ok(values.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case_id::derive_case_id;
    use crate::db::memory::sample_cases;
    use crate::db::MemoryStore;
    use crate::errors::AppError;
    use crate::record::{COURT, REASONING};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn repository(rows: Vec<CaseRecord>, page_size: usize, batch_size: usize) -> CaseRepository {
        let search = SearchConfig {
            page_size,
            ..SearchConfig::default()
        };
        CaseRepository::new(Arc::new(MemoryStore::new(rows)), search, batch_size)
    }

    fn numbered_cases(count: usize) -> Vec<CaseRecord> {
        (0..count)
            .map(|i| {
                CaseRecord::new()
                    .with(CASE_NUMBER, format!("(2021)沪72民初{}号", i))
                    .with(COURT, "上海海事法院")
                    .with(DECISION_DATE, format!("2021-01-{:02}T00:00:00+00:00", i % 28 + 1))
            })
            .collect()
    }

    /// Store that always fails, counting calls
    struct FailingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CaseStore for FailingStore {
        async fn fetch(&self, _query: &CaseQuery) -> Result<Vec<CaseRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::StorageUnavailable {
                message: "down".into(),
            })
        }

        async fn ping(&self) -> Result<()> {
            Err(AppError::StorageUnavailable {
                message: "down".into(),
            })
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    /// Sorts like PostgREST, but rows tied on every sort key come back in
    /// reverse insertion order for odd offsets
    struct UnstableTieStore {
        rows: Vec<CaseRecord>,
    }

    #[async_trait]
    impl CaseStore for UnstableTieStore {
        async fn fetch(&self, query: &CaseQuery) -> Result<Vec<CaseRecord>> {
            let mut rows: Vec<&CaseRecord> = self.rows.iter().filter(|r| query.matches(r)).collect();
            let window = query.offset_limit();
            if window.is_some_and(|(offset, _)| offset % 2 == 1) {
                rows.reverse();
            }
            rows.sort_by(|a, b| query.compare(a, b));

            let rows: Vec<&CaseRecord> = match window {
                Some((offset, limit)) => rows.into_iter().skip(offset).take(limit).collect(),
                None => rows,
            };
            Ok(rows.into_iter().map(|r| query.project(r)).collect())
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "unstable"
        }
    }

    fn unstable_repository(rows: Vec<CaseRecord>, batch_size: usize) -> CaseRepository {
        CaseRepository::new(
            Arc::new(UnstableTieStore { rows }),
            SearchConfig::default(),
            batch_size,
        )
    }

    #[tokio::test]
    async fn test_search_page_annotates_and_paginates() {
        let repo = repository(sample_cases(), 2, 1000);

        let first = repo.search_page(&CaseFilter::default(), 1).await.unwrap();
        assert_eq!(first.rows.len(), 2);
        assert!(first.has_next_page);
        assert_eq!(first.rows[0].text(CASE_NUMBER), "(2020)沪72行初45号");
        for row in &first.rows {
            assert_eq!(row.generated_id(), Some(derive_case_id(row).as_str()));
        }

        let second = repo.search_page(&CaseFilter::default(), 2).await.unwrap();
        assert_eq!(second.page, 2);
        assert_eq!(second.rows.len(), 1);
        assert!(!second.has_next_page);
    }

    #[tokio::test]
    async fn test_search_page_applies_filter() {
        let repo = repository(sample_cases(), 10, 1000);
        let filter = CaseFilter {
            date_start: "2019-01-01".into(),
            case_type: "民事".into(),
            ..Default::default()
        };
        let page = repo.search_page(&filter, 1).await.unwrap();
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].text(CASE_NUMBER), "(2019)沪72民初123号");
    }

    #[tokio::test]
    async fn test_search_page_rejects_invalid_date() {
        let repo = repository(sample_cases(), 10, 1000);
        let filter = CaseFilter {
            date_start: "yesterday".into(),
            ..Default::default()
        };
        assert!(matches!(
            repo.search_page(&filter, 1).await,
            Err(AppError::InvalidDate { .. })
        ));
    }

    #[tokio::test]
    async fn test_export_reads_past_batch_size() {
        let repo = repository(numbered_cases(7), 10, 3);
        let rows = repo.export(&CaseFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 7);
        assert!(rows.iter().all(|r| r.generated_id().is_none()));
    }

    #[tokio::test]
    async fn test_find_by_case_id_scans_all_batches() {
        // Oldest decision, so it sits in the last batch
        let cases = numbered_cases(10);
        let oldest = cases[0].clone();
        let repo = repository(cases, 10, 4);

        let found = repo.find_by_case_id(&derive_case_id(&oldest)).await.unwrap();
        assert_eq!(found, Some(oldest));
    }

    #[tokio::test]
    async fn test_find_by_case_id_not_found() {
        let repo = repository(sample_cases(), 10, 1000);
        assert_eq!(repo.find_by_case_id("0000000000").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_by_case_id_collision_is_deterministic() {
        let base = CaseRecord::new()
            .with(CASE_NUMBER, "(2018)沪72协外认7号")
            .with(COURT, "上海海事法院")
            .with(DECISION_DATE, "2018-05-20T00:00:00+00:00");
        let first = base.clone().with(REASONING, "first");
        let second = base.with(REASONING, "second");
        let case_id = derive_case_id(&first);
        assert_eq!(case_id, derive_case_id(&second));

        for rows in [
            vec![first.clone(), second.clone()],
            vec![second.clone(), first.clone()],
        ] {
            let repo = repository(rows.clone(), 10, 1000);
            assert_eq!(repo.find_by_case_id(&case_id).await.unwrap(), Some(first.clone()));

            let repo = unstable_repository(rows, 1);
            assert_eq!(repo.find_by_case_id(&case_id).await.unwrap(), Some(first.clone()));
        }
    }

    #[tokio::test]
    async fn test_find_by_case_id_survives_unstable_tie_order() {
        // No case number and the same date: only the reasoning tells them apart
        let undated = |reasoning: &str| {
            CaseRecord::new()
                .with(CASE_NUMBER, "")
                .with(COURT, "上海海事法院")
                .with(DECISION_DATE, "2019-08-15T00:00:00+00:00")
                .with(REASONING, reasoning)
        };
        let a = undated("alpha");
        let b = undated("beta");
        assert_ne!(derive_case_id(&a), derive_case_id(&b));

        let repo = unstable_repository(vec![a.clone(), b.clone()], 1);
        assert_eq!(repo.find_by_case_id(&derive_case_id(&a)).await.unwrap(), Some(a));
        assert_eq!(repo.find_by_case_id(&derive_case_id(&b)).await.unwrap(), Some(b));
    }

    #[tokio::test]
    async fn test_export_pages_tied_rows_exactly_once() {
        let rows: Vec<CaseRecord> = ["c", "a", "b"]
            .iter()
            .map(|reasoning| {
                CaseRecord::new()
                    .with(DECISION_DATE, "2019-08-15T00:00:00+00:00")
                    .with(REASONING, *reasoning)
            })
            .collect();
        let repo = unstable_repository(rows, 1);

        let exported = repo.export(&CaseFilter::default()).await.unwrap();
        let reasons: Vec<_> = exported.iter().map(|r| r.text(REASONING)).collect();
        assert_eq!(reasons, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_find_by_case_id_propagates_storage_error() {
        let store = Arc::new(FailingStore {
            calls: AtomicUsize::new(0),
        });
        let repo = CaseRepository::new(store.clone(), SearchConfig::default(), 100);
        assert!(repo.find_by_case_id("dac4a93f12").await.is_err());
        // Column discovery degrades, the scan itself fails
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_filter_options_are_sorted_and_distinct() {
        let mut cases = sample_cases();
        cases.push(CaseRecord::new().with(OUTCOME, "承认").with(SOURCE_COUNTRY, "新加坡"));
        cases.push(CaseRecord::new().with(OUTCOME, "不予承认").with(SOURCE_COUNTRY, ""));
        let repo = repository(cases, 10, 2);

        let options = repo.filter_options().await;
        assert_eq!(options.case_types, vec!["民事", "行政"]);
        assert_eq!(options.result_types, vec!["不予承认", "承认"]);
        assert_eq!(options.countries, vec!["新加坡"]);
    }

    #[tokio::test]
    async fn test_filter_options_page_in_value_order() {
        let rows = vec![
            CaseRecord::new().with(CASE_TYPE, "民事"),
            CaseRecord::new().with(CASE_TYPE, "行政"),
        ];
        let repo = unstable_repository(rows, 1);

        let options = repo.filter_options().await;
        assert_eq!(options.case_types, vec!["民事", "行政"]);
    }

    #[tokio::test]
    async fn test_filter_options_degrade_on_failure() {
        let store = Arc::new(FailingStore {
            calls: AtomicUsize::new(0),
        });
        let repo = CaseRepository::new(store, SearchConfig::default(), 100);
        assert_eq!(repo.filter_options().await, FilterOptions::default());
    }

    #[tokio::test]
    async fn test_table_columns() {
        let repo = repository(sample_cases(), 10, 1000);
        let layout = repo.table_columns().await;
        assert_eq!(layout.columns, vec!["案号", "审理法院", "裁判日期", "案件类型", "裁判理由"]);
        assert_eq!(layout.id_column.as_deref(), Some("案号"));

        let empty = repository(Vec::new(), 10, 1000);
        assert_eq!(empty.table_columns().await, TableColumns::default());
    }
}
