use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse an intercept timestamp. Accepts RFC 3339, ASN.1 GeneralizedTime
/// (`20250115143000.123Z`, the `Z` optional), `2025-01-15 14:30:00[.fff]` as UTC, and epoch
/// seconds or milliseconds. Anything else is `None`.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(dt) = parse_generalized_time(s) {
        return Some(dt);
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    if s.len() >= 9 && s.bytes().all(|b| b.is_ascii_digit()) {
        let ts: i64 = s.parse().ok()?;
        return if ts > 1_000_000_000_000 {
            DateTime::from_timestamp_millis(ts)
        } else {
            DateTime::from_timestamp(ts, 0)
        };
    }

    None
}

fn parse_generalized_time(s: &str) -> Option<DateTime<Utc>> {
    let body = s.strip_suffix(['Z', 'z']).unwrap_or(s);
    let (whole, frac) = match body.split_once('.') {
        Some((w, f)) => (w, f),
        None => (body, ""),
    };
    if whole.len() != 14 || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let num = |range: std::ops::Range<usize>| whole[range].parse::<u32>().ok();
    let date = NaiveDate::from_ymd_opt(num(0..4)? as i32, num(4..6)?, num(6..8)?)?;
    let nanos = if frac.is_empty() {
        0
    } else {
        let digits: String = frac.chars().chain(std::iter::repeat('0')).take(9).collect();
        digits.parse::<u32>().ok()?
    };
    let naive = date.and_hms_nano_opt(num(8..10)?, num(10..12)?, num(12..14)?, nanos)?;
    Some(naive.and_utc())
}

/// Milliseconds from `a` to `b`, when both parse.
pub fn millis_between(a: &str, b: &str) -> Option<i64> {
    let a = parse_timestamp(a)?;
    let b = parse_timestamp(b)?;
    Some((b - a).num_milliseconds())
}

/// Whole seconds from milliseconds, halves rounded toward positive infinity
/// (`-1500` ms is `-1` s, `1500` ms is `2` s).
pub fn round_seconds(ms: i64) -> i64 {
    (ms + 500).div_euclid(1000)
}
