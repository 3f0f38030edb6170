use chrono::{DateTime, Duration, DurationRound, TimeZone, Utc};
use croner::Cron;

use crate::error::{Result, SchedulerError};

/// Parse a 5-field (or 6-field, leading seconds) cron expression.
pub fn parse(expression: &str) -> Result<Cron> {
    Cron::new(expression.trim())
        .with_seconds_optional()
        .parse()
        .map_err(|e| SchedulerError::InvalidExpression {
            expression: expression.to_string(),
            reason: e.to_string(),
        })
}

pub fn is_valid_cron(expression: &str) -> bool {
    parse(expression).is_ok()
}

/// Smallest unit the expression can express.
fn granularity(expression: &str) -> Duration {
    if expression.split_whitespace().count() >= 6 {
        Duration::seconds(1)
    } else {
        Duration::minutes(1)
    }
}

/// First occurrence strictly after `after`, evaluated in `tz`.
pub fn next_after<Tz: TimeZone>(cron: &Cron, after: &DateTime<Tz>) -> Option<DateTime<Utc>> {
    cron.find_next_occurrence(after, false)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Next run of `expression` as seen from `now`.
///
/// A future `starts_at` is the first run itself, rounded down to the
/// expression's granularity, whether or not it lands on the expression's
/// grid. Later runs follow the expression. `None` for a malformed expression
/// or one with no future occurrence.
pub fn next_run<Tz: TimeZone>(
    expression: &str,
    starts_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Option<DateTime<Utc>> {
    let cron = parse(expression).ok()?;
    match starts_at.filter(|s| *s > now) {
        Some(start) => start.duration_trunc(granularity(expression)).ok(),
        None => next_after(&cron, &now.with_timezone(tz)),
    }
}

/// A fixed day-of-month and month means the expression names one calendar
/// date, which is treated as a single-shot schedule.
pub fn is_one_shot(expression: &str) -> bool {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let (dom, month) = match fields.len() {
        5 => (fields[2], fields[3]),
        6 => (fields[3], fields[4]),
        _ => return false,
    };
    is_fixed(dom) && is_fixed(month)
}

fn is_fixed(field: &str) -> bool {
    !field.is_empty() && field.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Sao_Paulo;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn validity() {
        assert!(is_valid_cron("0 9 * * *"));
        assert!(is_valid_cron("30 9 * * 1"));
        assert!(is_valid_cron("*/10 * * * * *"));
        assert!(!is_valid_cron("not a cron"));
        assert!(!is_valid_cron("61 9 * * *"));
        assert!(!is_valid_cron(""));
    }

    #[test]
    fn one_shot_detection() {
        assert!(is_one_shot("30 9 15 6 *"));
        assert!(is_one_shot("0 30 9 15 6 *"));
        assert!(!is_one_shot("30 9 * * 1"));
        assert!(!is_one_shot("0 9 * * *"));
        assert!(!is_one_shot("0 9 1-15 6 *"));
        assert!(!is_one_shot("0 9 15 */2 *"));
        assert!(!is_one_shot("garbage"));
    }

    #[test]
    fn next_run_follows_expression_in_zone() {
        // 2026-10-19 10:00 UTC is 07:00 in São Paulo; next 09:00 local is 12:00 UTC.
        let now = utc("2026-10-19T10:00:00Z");
        let next = next_run("0 9 * * *", None, now, &Sao_Paulo).unwrap();
        assert_eq!(next, utc("2026-10-19T12:00:00Z"));
    }

    #[test]
    fn future_start_is_the_first_run() {
        let now = utc("2026-10-19T10:00:00Z");
        // 09:00 local on the 25th, with stray seconds.
        let start = utc("2026-10-25T12:00:42Z");
        let next = next_run("0 9 * * *", Some(start), now, &Sao_Paulo).unwrap();
        assert_eq!(next, utc("2026-10-25T12:00:00Z"));
    }

    #[test]
    fn start_off_the_grid_is_still_the_first_run() {
        let now = utc("2026-10-19T10:00:00Z");
        // 15:30 local on the 25th, not a 09:00 slot.
        let start = utc("2026-10-25T18:30:00Z");
        let next = next_run("0 9 * * *", Some(start), now, &Sao_Paulo).unwrap();
        assert_eq!(next, utc("2026-10-25T18:30:00Z"));

        // the run after it is back on the expression
        let cron = parse("0 9 * * *").unwrap();
        let after = next_after(&cron, &next.with_timezone(&Sao_Paulo)).unwrap();
        assert_eq!(after, utc("2026-10-26T12:00:00Z"));
    }

    #[test]
    fn past_start_is_ignored() {
        let now = utc("2026-10-19T10:00:00Z");
        let start = utc("2026-10-01T12:00:00Z");
        let next = next_run("0 9 * * *", Some(start), now, &Sao_Paulo).unwrap();
        assert_eq!(next, utc("2026-10-19T12:00:00Z"));
    }

    #[test]
    fn malformed_expression_has_no_next_run() {
        let now = utc("2026-10-19T10:00:00Z");
        assert_eq!(next_run("0 25 * * *", None, now, &Sao_Paulo), None);
    }
}
