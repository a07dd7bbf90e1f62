//! Storage layer for CaseForge
//!
//! Provides:
//! - The `CaseStore` trait over the hosted case table
//! - PostgREST and in-memory store implementations
//! - Query description (`CaseQuery`)
//! - Repository facade used by the HTTP handlers

pub mod memory;
mod postgrest;
mod query;
mod repository;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
pub use query::{CaseQuery, Predicate};
pub use repository::{CaseRepository, FilterOptions, SearchPage, TableColumns};

use crate::config::AppConfig;
use crate::errors::Result;
use crate::record::CaseRecord;
use async_trait::async_trait;
use std::sync::Arc;

/// Read access to the case table
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Run a query and return the matching rows
    async fn fetch(&self, query: &CaseQuery) -> Result<Vec<CaseRecord>>;

    /// Check that the store answers
    async fn ping(&self) -> Result<()>;

    /// Short backend name for logs and metrics
    fn name(&self) -> &'static str;
}

/// Create a store based on configuration
pub fn create_store(config: &AppConfig) -> Result<Arc<dyn CaseStore>> {
    if config.uses_memory_storage() {
        tracing::warn!("Using in-memory case store seeded with sample cases");
        return Ok(Arc::new(MemoryStore::with_sample_cases()));
    }

    let store = PostgrestStore::new(&config.storage)?;
    tracing::info!(endpoint = %store.endpoint(), "Using PostgREST case store");
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_memory_store() {
        let store = create_store(&AppConfig::in_memory()).unwrap();
        assert_eq!(store.name(), "memory");
        assert_eq!(store.fetch(&CaseQuery::new()).await.unwrap().len(), 3);
    }

    #[test]
    fn test_create_postgrest_store() {
        let mut config = AppConfig::in_memory();
        config.storage.url = "https://example.supabase.co".to_string();
        let store = create_store(&config).unwrap();
        assert_eq!(store.name(), "postgrest");
    }
}
