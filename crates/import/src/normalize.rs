use std::sync::OnceLock;

use budgetlens_core::expense::iso_date;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_salutation,
    r"(?i)^Dear\s+Customer,\s*");
re!(re_debited_by,
    r"(?i)^Your\s+account\s+has\s+been\s+debited\s+by\s+");
re!(re_debit_notice,
    r"(?i)^Rs\.?\s*\d+(?:,\d+)*(?:\.\d{2})?\s+has\s+been\s+debited\s+from\s+your\s+account\s+");
re!(re_account_ref,
    r"(?i)^A/c\s+\d+\s+");
re!(re_on_date,
    r"(?i)^on\s+\d{2}[-/]\d{2}[-/]\d{2,4}\s+");
re!(re_for_clause,
    r"(?i)\s+for\s+.*$");
re!(re_thanks_footer,
    r"(?i)\s+Thank\s+you\s+for\s+using\s+our\s+services\.?$");

const MAX_DESCRIPTION_CHARS: usize = 100;
const FALLBACK_DESCRIPTION: &str = "Transaction";

/// Strips SMS boilerplate from a transaction description.
///
/// Patterns are applied once each, in order, mirroring how bank notices are
/// laid out: greeting, debit template, account reference, date prefix, then
/// footer and trailing purpose clause. The result is capped at 100 characters
/// and never empty.
pub fn normalize_description(raw: &str) -> String {
    let stripped = [
        re_salutation(),
        re_debited_by(),
        re_debit_notice(),
        re_account_ref(),
        re_on_date(),
        re_thanks_footer(),
        re_for_clause(),
    ]
    .iter()
    .fold(raw.to_string(), |text, re| re.replace(&text, "").into_owned());

    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return FALLBACK_DESCRIPTION.to_string();
    }

    if trimmed.chars().count() > MAX_DESCRIPTION_CHARS {
        let mut short: String = trimmed.chars().take(MAX_DESCRIPTION_CHARS - 3).collect();
        short.push_str("...");
        return short;
    }

    trimmed.to_string()
}

/// Parses an extracted transaction date, falling back to `now` when the text is
/// missing or unrecognised.
///
/// Accepts ISO forms (`YYYY-MM-DD`, RFC 3339), `DD/MM/YY[YY]` and `DD-MM-YY[YY]`.
pub fn parse_transaction_date(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(text) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return now;
    };

    match parse_date(text) {
        Some(date) => date,
        None => {
            tracing::warn!(date = text, "date parsing failed, using current date");
            now
        }
    }
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if looks_iso(text) {
        return iso_date::parse(text);
    }

    let separator = if text.contains('/') {
        '/'
    } else if text.contains('-') {
        '-'
    } else {
        return None;
    };

    let parts: Vec<&str> = text.split(separator).map(str::trim).collect();
    let [day, month, year] = parts.as_slice() else {
        return None;
    };

    let day: u32 = day.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let year = expand_year(year)?;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

// `24-01-15` is day-first; only a four-digit leading year is ISO.
fn looks_iso(text: &str) -> bool {
    let mut chars = text.chars();
    chars.by_ref().take(4).filter(|c| c.is_ascii_digit()).count() == 4 && chars.next() == Some('-')
}

/// Two-digit years below 50 land in the 2000s, the rest in the 1900s.
fn expand_year(text: &str) -> Option<i32> {
    let year: i32 = text.parse().ok()?;
    if text.len() <= 2 {
        Some(if year < 50 { 2000 + year } else { 1900 + year })
    } else {
        Some(year)
    }
}
