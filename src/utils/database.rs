//! Small helpers shared by every table module: ids, timestamps and JSON columns.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Fixed-width RFC 3339 so that string order in SQLite equals time order.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now() -> String {
    timestamp(Utc::now())
}

/// Accepts a full RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `JOB-1718000000000-3f9a1c2b7`, `NOTIF-...`, `STU-...`
pub fn prefixed_id(prefix: &str) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), &random[..9])
}

pub fn is_valid_id(raw: &str) -> bool {
    uuid::Uuid::parse_str(raw).is_ok()
}

/// `?, ?, ?` for an `IN (...)` clause.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

pub fn to_json<T: Serialize>(value: &T) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Reads a JSON text column into `T`.
pub fn json_column<T: DeserializeOwned>(row: &rusqlite::Row<'_>, column: &str) -> rusqlite::Result<T> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|e| {
        tracing::error!(column, error = %e, "Failed to parse JSON column");
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern and wraps it in `%`.
pub fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Deep-merges `patch` into `target`: objects merge key by key, everything else
/// (arrays included) replaces. `null` values in the patch are skipped.
pub fn merge_json(target: &mut serde_json::Value, patch: &serde_json::Value) {
    use serde_json::Value;

    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                if value.is_null() {
                    continue;
                }
                match existing.get_mut(key) {
                    Some(slot) if slot.is_object() && value.is_object() => merge_json(slot, value),
                    _ => {
                        existing.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timestamps_sort_as_strings() {
        let later = timestamp(parse_datetime("2026-01-01T10:00:00.5Z").unwrap());
        let earlier = timestamp(parse_datetime("2026-01-01T10:00:00.123456Z").unwrap());
        assert!(later > earlier);
        assert_eq!(earlier.len(), later.len());
    }

    #[test]
    fn parses_plain_dates() {
        let at = parse_datetime("2027-03-15").unwrap();
        assert_eq!(timestamp(at), "2027-03-15T00:00:00.000000Z");
        assert!(parse_datetime("15/03/2027").is_none());
    }

    #[test]
    fn prefixed_ids_have_three_parts() {
        let id = prefixed_id("JOB");
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "JOB");
        assert_eq!(parts[2].len(), 9);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn merge_keeps_siblings_and_replaces_arrays() {
        let mut doc = json!({
            "jobPreferences": {"minExpectedSalary": 1, "lookingFor": "Job"},
            "skills": ["rust", "sql"]
        });
        merge_json(
            &mut doc,
            &json!({"jobPreferences": {"minExpectedSalary": 5}, "skills": ["go"], "bio": null}),
        );
        assert_eq!(
            doc,
            json!({
                "jobPreferences": {"minExpectedSalary": 5, "lookingFor": "Job"},
                "skills": ["go"]
            })
        );
    }
}
