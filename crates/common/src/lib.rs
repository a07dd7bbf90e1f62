//! CaseForge Common Library
//!
//! Shared code for the CaseForge services including:
//! - Case record model and the derived case identifier
//! - Storage access (PostgREST and in-memory stores)
//! - Search filter translation and the repository facade
//! - CSV export
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod case_id;
pub mod config;
pub mod db;
pub mod errors;
pub mod export;
pub mod filter;
pub mod metrics;
pub mod record;

// Re-export commonly used types
pub use case_id::{derive_case_id, resolve_case};
pub use config::AppConfig;
pub use db::{CaseQuery, CaseRepository, CaseStore};
pub use errors::{AppError, Result};
pub use filter::CaseFilter;
pub use record::CaseRecord;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default table holding the case records
pub const DEFAULT_TABLE: &str = "case1";

/// Default number of rows per search page
pub const DEFAULT_PAGE_SIZE: usize = 10;
