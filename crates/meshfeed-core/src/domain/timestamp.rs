use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

const DIVISIONS: [(&str, i64); 7] = [
    ("year", 60 * 60 * 24 * 365),
    ("month", 60 * 60 * 24 * 30),
    ("week", 60 * 60 * 24 * 7),
    ("day", 60 * 60 * 24),
    ("hour", 60 * 60),
    ("minute", 60),
    ("second", 1),
];

/// Parses an RFC3339 timestamp as sent by upstream (`createdAt`, `indexedAt`, `expiresAt`).
pub fn parse_timestamp(input: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(input.trim(), &Rfc3339).ok()
}

/// Human-readable distance between `then` and `now`, e.g. `3 minutes ago` or `in 2 days`.
pub fn relative_time(then: OffsetDateTime, now: OffsetDateTime) -> String {
    let diff: Duration = then - now;
    let diff_ms = diff.whole_milliseconds() as f64;

    for (unit, seconds) in DIVISIONS {
        let delta = diff_ms / (seconds as f64 * 1_000.0);
        if delta.abs() >= 1.0 {
            let amount = delta.round() as i64;
            let magnitude = amount.unsigned_abs();
            let plural = if magnitude == 1 { "" } else { "s" };
            return if amount < 0 {
                format!("{magnitude} {unit}{plural} ago")
            } else {
                format!("in {magnitude} {unit}{plural}")
            };
        }
    }

    String::from("just now")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(input: &str) -> OffsetDateTime {
        parse_timestamp(input).expect("valid timestamp")
    }

    #[test]
    fn past_times_render_with_ago_suffix() {
        let now = at("2024-05-01T12:00:00Z");
        assert_eq!(relative_time(at("2024-05-01T11:57:00Z"), now), "3 minutes ago");
        assert_eq!(relative_time(at("2024-04-30T12:00:00Z"), now), "1 day ago");
    }

    #[test]
    fn future_times_render_with_in_prefix() {
        let now = at("2024-05-01T12:00:00Z");
        assert_eq!(relative_time(at("2024-05-03T12:00:00Z"), now), "in 2 days");
    }

    #[test]
    fn sub_second_distance_is_just_now() {
        let now = at("2024-05-01T12:00:00Z");
        assert_eq!(relative_time(at("2024-05-01T12:00:00.400Z"), now), "just now");
    }

    #[test]
    fn garbage_does_not_parse() {
        assert!(parse_timestamp("yesterday-ish").is_none());
    }
}
