use chrono::{DateTime, NaiveDate, NaiveDateTime};

const LABEL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Formats a granule timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(raw: &str) -> Option<String> {
    parse_timestamp(raw).map(|dt| dt.format(LABEL_FORMAT).to_string())
}

/// Marker label lines: `[start, end]`, or whichever one is present.
pub fn temporal_label(start: Option<&str>, end: Option<&str>) -> Vec<String> {
    [start, end]
        .into_iter()
        .flatten()
        .filter_map(format_timestamp)
        .collect()
}

/// Date part of a timestamp (`YYYY-MM-DD`), the unit imagery matching and
/// templating work in.
pub fn date_part(raw: &str) -> Option<&str> {
    let date = raw.split('T').next()?.trim();
    if date.is_empty() { None } else { Some(date) }
}

/// Timestamp with a trailing millisecond field removed
/// (`2020-01-01T10:00:00.000Z` becomes `2020-01-01T10:00:00Z`).
pub fn strip_millis(raw: &str) -> String {
    if let Some(stem) = raw.strip_suffix('Z')
        && let Some((head, millis)) = stem.rsplit_once('.')
        && millis.len() == 3
        && millis.bytes().all(|b| b.is_ascii_digit())
    {
        return format!("{head}Z");
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::{date_part, format_timestamp, strip_millis, temporal_label};

    #[test]
    fn labels_use_second_precision() {
        assert_eq!(
            format_timestamp("2019-04-28T01:02:03.456Z").as_deref(),
            Some("2019-04-28 01:02:03")
        );
        assert_eq!(
            format_timestamp("2019-04-28").as_deref(),
            Some("2019-04-28 00:00:00")
        );
        assert_eq!(format_timestamp("yesterday"), None);
    }

    #[test]
    fn label_skips_missing_ends() {
        assert_eq!(
            temporal_label(None, Some("2020-01-02T00:00:00Z")),
            vec!["2020-01-02 00:00:00".to_string()]
        );
        assert!(temporal_label(None, None).is_empty());
    }

    #[test]
    fn date_and_millis_helpers() {
        assert_eq!(date_part("2020-01-02T03:04:05Z"), Some("2020-01-02"));
        assert_eq!(date_part(""), None);
        assert_eq!(strip_millis("2020-01-02T03:04:05.123Z"), "2020-01-02T03:04:05Z");
        assert_eq!(strip_millis("2020-01-02T03:04:05Z"), "2020-01-02T03:04:05Z");
    }
}
