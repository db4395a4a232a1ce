//! CSV transaction import
//!
//! Expected columns (matched by header name, case-insensitive):
//! `Date,Description,Amount[,Category]`. Positive amounts are income,
//! everything else is an expense; magnitudes are stored.

use std::collections::HashMap;
use std::io::Read;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::CategoryKind;

/// Category assigned to rows without one
pub const DEFAULT_CATEGORY: &str = "Other";

/// A parsed CSV row, ready to be resolved against a user's categories
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub occurred_at: NaiveDateTime,
    pub description: String,
    /// Unsigned magnitude
    pub amount: f64,
    pub kind: CategoryKind,
    pub category: String,
    pub import_hash: String,
}

/// Parsed rows plus the number of rows dropped for a bad date or amount
#[derive(Debug, Clone, Default)]
pub struct ParsedCsv {
    pub rows: Vec<ImportRow>,
    pub invalid: i64,
}

struct Columns {
    date: usize,
    description: Option<usize>,
    amount: usize,
    category: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        Ok(Self {
            date: find("date")
                .ok_or_else(|| Error::InvalidData("CSV is missing a Date column".into()))?,
            description: find("description"),
            amount: find("amount")
                .ok_or_else(|| Error::InvalidData("CSV is missing an Amount column".into()))?,
            category: find("category"),
        })
    }
}

/// Parse a transaction CSV
pub fn parse_csv<R: Read>(reader: R) -> Result<ParsedCsv> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut parsed = ParsedCsv::default();
    // Repeats of the same (date, description, amount) within one file
    let mut seen: HashMap<(NaiveDateTime, String, u64), u32> = HashMap::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result?;

        let occurred_at = record.get(columns.date).and_then(parse_date);
        let signed = record.get(columns.amount).and_then(parse_amount);

        let (occurred_at, signed) = match (occurred_at, signed) {
            (Some(occurred_at), Some(signed)) => (occurred_at, signed),
            _ => {
                debug!(row = line + 2, "Skipping row with unparseable date or amount");
                parsed.invalid += 1;
                continue;
            }
        };

        let description = columns
            .description
            .and_then(|i| record.get(i))
            .unwrap_or_default()
            .to_string();

        let category = columns
            .category
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string();

        let kind = if signed > 0.0 {
            CategoryKind::Income
        } else {
            CategoryKind::Expense
        };

        let occurrence = seen
            .entry((occurred_at, description.clone(), signed.to_bits()))
            .or_insert(0);
        *occurrence += 1;

        parsed.rows.push(ImportRow {
            import_hash: generate_hash(&occurred_at, &description, signed, *occurrence),
            occurred_at,
            description,
            amount: signed.abs(),
            kind,
            category,
        });
    }

    Ok(parsed)
}

/// Generate a unique hash for deduplication
///
/// `occurrence` numbers identical rows within a file (1, 2, ...) so that two
/// same-day purchases both import, while re-importing the file stays a no-op.
fn generate_hash(
    occurred_at: &NaiveDateTime,
    description: &str,
    amount: f64,
    occurrence: u32,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(occurred_at.to_string().as_bytes());
    hasher.update(description.as_bytes());
    hasher.update(amount.to_be_bytes());
    hasher.update(occurrence.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Parse a date or date-time in common formats; bare dates land at midnight
fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    let date_formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
        "%m-%d-%Y", // 01-15-2024
    ];
    for fmt in date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }

    None
}

/// Parse an amount string, handling currency symbols and commas
fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned.parse::<f64>().ok().filter(|a| a.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_time(NaiveTime::MIN);
        assert_eq!(parse_date("01/15/2024"), Some(expected));
        assert_eq!(parse_date("2024-01-15"), Some(expected));
        assert_eq!(
            parse_date("2024-01-15 09:30:00"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(9, 30, 0)
        );
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("-123.45"), Some(-123.45));
        assert_eq!(parse_amount("(100.00)"), Some(-100.00));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("NaN"), None);
    }

    #[test]
    fn test_parse_csv_signs_and_categories() {
        let csv = r#"Date,Description,Amount,Category
2024-01-15,Paycheck,2500.00,Salary
2024-01-16,SAFEWAY,-82.40,Groceries
01/17/2024,Coffee,-4.50,
"#;

        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.invalid, 0);
        assert_eq!(parsed.rows.len(), 3);

        assert_eq!(parsed.rows[0].kind, CategoryKind::Income);
        assert_eq!(parsed.rows[0].amount, 2500.0);
        assert_eq!(parsed.rows[0].category, "Salary");

        assert_eq!(parsed.rows[1].kind, CategoryKind::Expense);
        assert_eq!(parsed.rows[1].amount, 82.40);

        assert_eq!(parsed.rows[2].category, DEFAULT_CATEGORY);
        assert_eq!(parsed.rows[2].description, "Coffee");
    }

    #[test]
    fn test_parse_csv_without_category_column() {
        let csv = "date,description,amount\n2024-02-01,Bus,-2.75\n";
        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_parse_csv_counts_invalid_rows() {
        let csv = r#"Date,Description,Amount
not-a-date,Mystery,-10.00
2024-01-15,Lunch,twelve
2024-01-15,Lunch,-12.00
"#;

        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.invalid, 2);
    }

    #[test]
    fn test_parse_csv_requires_amount_column() {
        let csv = "Date,Description\n2024-01-15,Lunch\n";
        let err = parse_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Amount"));
    }

    #[test]
    fn test_hash_distinguishes_rows() {
        let csv = r#"Date,Description,Amount
2024-01-15,Lunch,-12.00
2024-01-15,Lunch,-12.50
2024-01-15,Lunch,-12.00
"#;

        let parsed = parse_csv(csv.as_bytes()).unwrap();
        assert_ne!(parsed.rows[0].import_hash, parsed.rows[1].import_hash);
        // Same row twice in one file is two purchases
        assert_ne!(parsed.rows[0].import_hash, parsed.rows[2].import_hash);

        // Hashes are stable across parses of the same file
        let again = parse_csv(csv.as_bytes()).unwrap();
        let hashes: Vec<_> = parsed.rows.iter().map(|r| &r.import_hash).collect();
        let again_hashes: Vec<_> = again.rows.iter().map(|r| &r.import_hash).collect();
        assert_eq!(hashes, again_hashes);
    }
}
