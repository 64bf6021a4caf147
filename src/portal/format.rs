//! Canonical formatting of statuses, dates, amounts and share links.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};

/// Base path of the portal's public document pages.
pub const SHARE_BASE_URL: &str = "https://invoicing.eta.gov.eg/documents/";

/// Length of the share token derived from the document UUID.
const SHARE_TOKEN_LEN: usize = 26;

/// Output date format (day/month/year, as the portal renders it).
const DATE_FORMAT: &str = "%d/%m/%Y";

/// Localized labels for the portal's document states.
const STATUS_LABELS: &[(&str, &str)] = &[
    ("valid", "صالحة"),
    ("invalid", "غير صالحة"),
    ("cancelled", "ملغاة"),
    ("submitted", "مقدمة"),
    ("rejected", "مرفوضة"),
];

/// Map a raw status to its localized label; unknown values pass through.
pub fn localize_status(raw: &str) -> String {
    let trimmed = raw.trim();
    STATUS_LABELS
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(trimmed))
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Reformat an ISO-8601 timestamp or date as `dd/mm/yyyy`.
///
/// Anything that does not parse is returned unchanged.
pub fn format_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return dt.format(DATE_FORMAT).to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return dt.format(DATE_FORMAT).to_string();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.format(DATE_FORMAT).to_string();
    }

    trimmed.to_string()
}

/// Parse an amount from JSON (number or numeric string).
pub fn parse_amount(value: Option<&serde_json::Value>) -> Option<Decimal> {
    match value? {
        serde_json::Value::Number(n) => parse_amount_text(&n.to_string()),
        serde_json::Value::String(s) => parse_amount_text(s),
        _ => None,
    }
}

/// Parse an amount from rendered text, ignoring grouping separators and
/// any currency label around the number.
pub fn parse_amount_text(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .trim()
        .chars()
        .map(arabic_digit_to_ascii)
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | 'e' | 'E' | '+'))
        .collect();
    let cleaned = cleaned.trim_matches(|c| matches!(c, 'e' | 'E' | '+'));
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(cleaned)
        .or_else(|_| Decimal::from_scientific(cleaned))
        .ok()
}

/// Format an amount with two fraction digits and `,` grouping.
///
/// Missing, zero and unparsable amounts render as an empty string.
pub fn format_amount(value: Option<&serde_json::Value>) -> String {
    parse_amount(value).map(format_decimal).unwrap_or_default()
}

/// Text variant of [`format_amount`], used for amounts scraped from markup.
pub fn format_amount_text(text: &str) -> String {
    parse_amount_text(text)
        .map(format_decimal)
        .unwrap_or_default()
}

/// Render a decimal as `1,234.50`; zero renders as an empty string.
pub fn format_decimal(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        return String::new();
    }

    let digits = rounded.abs().to_string();
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), ""));
    let mut fraction = frac_part.to_string();
    while fraction.len() < 2 {
        fraction.push('0');
    }

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if rounded.is_sign_negative() { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}

/// Build the public share link for a document; empty when the id is missing.
pub fn external_link(uuid: &str) -> String {
    let uuid = uuid.trim();
    if uuid.is_empty() {
        return String::new();
    }
    let token: String = uuid.chars().take(SHARE_TOKEN_LEN).collect();
    format!("{}{}/share/{}", SHARE_BASE_URL, uuid, token)
}

/// Convert Arabic-Indic digits to ASCII, leaving other characters alone.
pub fn arabic_digit_to_ascii(c: char) -> char {
    match c {
        '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
        '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
        '\u{066B}' => '.',
        _ => c,
    }
}
