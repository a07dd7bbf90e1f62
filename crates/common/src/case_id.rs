//! Derived case identifiers
//!
//! The case table has no primary key column, so every record is given a short
//! surrogate id computed from its contents:
//!
//! - with a case number: `sha256("{case_number}_{court}_{decision_date}")`
//! - without one: `sha256(compact JSON of the whole record)`
//!
//! Both are hex encoded and cut to [`CASE_ID_LEN`] characters. Ids are never
//! stored; a lookup re-derives the id of every candidate record.

use crate::errors::Result;
use crate::record::{CaseRecord, CASE_NUMBER, COURT, DECISION_DATE, GENERATED_ID};
use sha2::{Digest, Sha256};

/// Length of a derived case id
pub const CASE_ID_LEN: usize = 10;

/// Returned when an id cannot be derived
pub const UNKNOWN_CASE_ID: &str = "unknown";

/// Derive the surrogate id of a record. Never fails.
pub fn derive_case_id(record: &CaseRecord) -> String {
    match try_derive(record) {
        Ok(case_id) => case_id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to derive case id");
            UNKNOWN_CASE_ID.to_string()
        }
    }
}

fn try_derive(record: &CaseRecord) -> Result<String> {
    let case_number = record.text(CASE_NUMBER);

    let digest = if case_number.is_empty() {
        Sha256::digest(record.canonical_json()?)
    } else {
        let key = format!(
            "{}_{}_{}",
            case_number,
            record.text(COURT),
            record.text(DECISION_DATE)
        );
        Sha256::digest(key.as_bytes())
    };

    let mut case_id = hex::encode(digest);
    case_id.truncate(CASE_ID_LEN);
    Ok(case_id)
}

/// Return a copy of the record carrying its derived id under `_generated_id`
pub fn annotate(mut record: CaseRecord) -> CaseRecord {
    let case_id = derive_case_id(&record);
    tracing::debug!(
        case_number = %record.text(CASE_NUMBER),
        case_id = %case_id,
        "Derived case id"
    );
    record.insert(GENERATED_ID, case_id);
    record
}

/// Find the first record whose derived id equals `case_id`.
///
/// Records are visited in the order given; when several records share an id
/// the earliest one wins.
pub fn resolve_case<'a, I>(case_id: &str, records: I) -> Option<&'a CaseRecord>
where
    I: IntoIterator<Item = &'a CaseRecord>,
{
    records
        .into_iter()
        .find(|record| derive_case_id(record) == case_id)
}

/// Number of records whose derived id equals `case_id`
pub fn count_matches<'a, I>(case_id: &str, records: I) -> usize
where
    I: IntoIterator<Item = &'a CaseRecord>,
{
    records
        .into_iter()
        .filter(|record| derive_case_id(record) == case_id)
        .count()
}
