//! CSV export of case records

use crate::errors::{AppError, Result};
use crate::record::CaseRecord;
use chrono::{DateTime, TimeZone};

/// Byte order mark so spreadsheet tools detect UTF-8
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Header row: columns of the first record, or `fallback` when there is none
pub fn csv_header(rows: &[CaseRecord], fallback: &[String]) -> Vec<String> {
    match rows.first() {
        Some(first) => first.columns().map(str::to_string).collect(),
        None => fallback.to_vec(),
    }
}

/// Encode rows as BOM-prefixed UTF-8 CSV with CRLF line endings.
///
/// Values are looked up by header name, so rows with missing columns get
/// empty cells and extra columns are dropped.
pub fn write_csv(rows: &[CaseRecord], fallback: &[String]) -> Result<Vec<u8>> {
    let header = csv_header(rows, fallback);

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(UTF8_BOM.to_vec());
    writer.write_record(&header)?;
    for row in rows {
        writer.write_record(header.iter().map(|column| row.text(column)))?;
    }

    writer.into_inner().map_err(|e| AppError::Internal {
        message: format!("Failed to flush CSV: {}", e),
    })
}

/// User-facing download name, e.g. `案例数据_20240102_150405.csv`
pub fn export_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("案例数据_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// `Content-Disposition` value with an ASCII fallback name
pub fn content_disposition<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "attachment; filename=\"cases_{}.csv\"; filename*=UTF-8''{}",
        now.format("%Y%m%d_%H%M%S"),
        urlencoding::encode(&export_file_name(now))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CASE_NUMBER, COURT, DECISION_DATE, REASONING};
    use chrono::Utc;

    fn fallback() -> Vec<String> {
        vec![CASE_NUMBER.to_string(), COURT.to_string(), DECISION_DATE.to_string()]
    }

    #[test]
    fn test_csv_has_bom_and_header_from_first_row() {
        let rows = vec![
            CaseRecord::new()
                .with(CASE_NUMBER, "(2018)沪72协外认7号")
                .with(REASONING, "承认, 执行"),
            CaseRecord::new().with(REASONING, "海事").with("extra", "dropped"),
        ];

        let bytes = write_csv(&rows, &fallback()).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(
            text,
            "案号,裁判理由\r\n(2018)沪72协外认7号,\"承认, 执行\"\r\n,海事\r\n"
        );
    }

    #[test]
    fn test_empty_export_uses_fallback_header() {
        let bytes = write_csv(&[], &fallback()).unwrap();
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text, "案号,审理法院,裁判日期\r\n");
    }

    #[test]
    fn test_file_names() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 15, 4, 5).unwrap();
        assert_eq!(export_file_name(&now), "案例数据_20240102_150405.csv");

        let disposition = content_disposition(&now);
        assert!(disposition.starts_with("attachment; filename=\"cases_20240102_150405.csv\""));
        assert!(disposition.ends_with("filename*=UTF-8''%E6%A1%88%E4%BE%8B%E6%95%B0%E6%8D%AE_20240102_150405.csv"));
    }
}
