use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Parse the date formats form inputs produce.
///
/// Accepts RFC 3339 timestamps, `datetime-local` values (`YYYY-MM-DDTHH:MM`,
/// read as UTC) and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Canonical timestamp form used for fingerprints and stored dates.
pub fn canonical(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_agree_on_the_same_instant() {
        let a = parse("2030-05-01").unwrap();
        let b = parse("2030-05-01T00:00:00Z").unwrap();
        let c = parse("2030-05-01T02:00:00+02:00").unwrap();
        let d = parse("2030-05-01T00:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(c, d);
        assert_eq!(canonical(&a), "2030-05-01T00:00:00.000Z");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("").is_none());
        assert!(parse("next tuesday").is_none());
        assert!(parse("2030-13-01").is_none());
    }
}
