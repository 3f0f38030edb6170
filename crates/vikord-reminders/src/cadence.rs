//! Cadence input from the command flows.
//!
//! | Input                     | Expression       | Extra                   |
//! |---------------------------|------------------|-------------------------|
//! | `daily 09:30`             | `30 9 * * *`     |                         |
//! | `weekly mon 09:30`        | `30 9 * * 1`     |                         |
//! | `every 5 days 09:30`      | `30 9 * * *`     | `interval_days = 5`     |
//! | `once 2026-06-15 09:30`   | `30 9 15 6 *`    | `starts_at` = that time |
//! | any 5/6-field cron        | as given         |                         |

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use vikord_scheduler::is_valid_cron;

use crate::error::{ReminderError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cadence {
    pub expression: String,
    pub interval_days: Option<u32>,
    pub starts_at: Option<DateTime<Utc>>,
}

impl Cadence {
    fn cron(expression: String) -> Self {
        Self {
            expression,
            interval_days: None,
            starts_at: None,
        }
    }
}

const USAGE: &str = "Formatos aceitos: `daily HH:MM`, `weekly <dia> HH:MM`, \
    `every <N> days HH:MM`, `once AAAA-MM-DD HH:MM` ou uma expressão cron de 5 campos.";

fn invalid(reason: impl std::fmt::Display) -> ReminderError {
    ReminderError::InvalidCadence(format!("{reason}. {USAGE}"))
}

/// Parse user cadence input. Times are wall-clock in `tz`.
pub fn parse_cadence(input: &str, tz: Tz, now: DateTime<Utc>) -> Result<Cadence> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let keyword = parts.first().map(|s| s.to_lowercase()).unwrap_or_default();

    match (keyword.as_str(), parts.as_slice()) {
        ("daily", [_, time]) => {
            let t = parse_time(time)?;
            Ok(Cadence::cron(format!("{} {} * * *", t.minute(), t.hour())))
        }
        ("weekly", [_, day, time]) => {
            let dow = parse_weekday(day)?;
            let t = parse_time(time)?;
            Ok(Cadence::cron(format!("{} {} * * {dow}", t.minute(), t.hour())))
        }
        ("every", [_, n, unit, time]) if unit.eq_ignore_ascii_case("days") => {
            let n: u32 = n
                .parse()
                .map_err(|_| invalid(format!("`{n}` não é um número de dias")))?;
            if n < 2 {
                return Err(invalid("O intervalo precisa ser de pelo menos 2 dias (use `daily`)"));
            }
            let t = parse_time(time)?;
            Ok(Cadence {
                expression: format!("{} {} * * *", t.minute(), t.hour()),
                interval_days: Some(n),
                starts_at: None,
            })
        }
        ("once", [_, date, time]) => {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|_| invalid(format!("Data inválida: `{date}`")))?;
            let t = parse_time(time)?;
            let at = local_to_utc(date.and_time(t), tz)?;
            if at <= now {
                return Err(invalid("A data precisa estar no futuro"));
            }
            Ok(Cadence {
                expression: format!("{} {} {} {} *", t.minute(), t.hour(), date.day(), date.month()),
                interval_days: None,
                starts_at: Some(at),
            })
        }
        _ if matches!(parts.len(), 5 | 6) => {
            let expression = parts.join(" ");
            if is_valid_cron(&expression) {
                Ok(Cadence::cron(expression))
            } else {
                Err(invalid(format!("Expressão cron inválida: `{expression}`")))
            }
        }
        _ => Err(invalid(format!("Cadência não reconhecida: `{}`", input.trim()))),
    }
}

/// Parse an optional start instant (`YYYY-MM-DD HH:MM`, local to `tz`).
pub fn parse_starts_at(input: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), "%Y-%m-%d %H:%M")
        .map_err(|_| invalid(format!("Data de início inválida: `{}` (use AAAA-MM-DD HH:MM)", input.trim())))?;
    local_to_utc(naive, tz)
}

fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| invalid(format!("Horário inexistente ou ambíguo em {tz}: {naive}")))
}

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| invalid(format!("Horário inválido: `{s}`")))
}

fn parse_weekday(s: &str) -> Result<u32> {
    let lower = s.to_lowercase().replace('á', "a");
    if let Ok(n) = lower.parse::<u32>() {
        return match n {
            0..=6 => Ok(n),
            7 => Ok(0),
            _ => Err(invalid(format!("Dia da semana inválido: `{s}`"))),
        };
    }
    let prefix: String = lower.chars().take(3).collect();
    let dow = match prefix.as_str() {
        "dom" | "sun" => 0,
        "seg" | "mon" => 1,
        "ter" | "tue" => 2,
        "qua" | "wed" => 3,
        "qui" | "thu" => 4,
        "sex" | "fri" => 5,
        "sab" | "sat" => 6,
        _ => return Err(invalid(format!("Dia da semana inválido: `{s}`"))),
    };
    Ok(dow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Sao_Paulo;
    use vikord_scheduler::is_one_shot;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn daily_and_weekly() {
        assert_eq!(parse_cadence("daily 09:30", Sao_Paulo, now()).unwrap().expression, "30 9 * * *");
        assert_eq!(
            parse_cadence("weekly seg 08:00", Sao_Paulo, now()).unwrap().expression,
            "0 8 * * 1"
        );
        assert_eq!(
            parse_cadence("weekly Sábado 08:00", Sao_Paulo, now()).unwrap().expression,
            "0 8 * * 6"
        );
        assert_eq!(parse_cadence("weekly 7 08:00", Sao_Paulo, now()).unwrap().expression, "0 8 * * 0");
    }

    #[test]
    fn every_n_days_rides_a_daily_expression() {
        let c = parse_cadence("every 5 days 07:15", Sao_Paulo, now()).unwrap();
        assert_eq!(c.expression, "15 7 * * *");
        assert_eq!(c.interval_days, Some(5));
        assert!(parse_cadence("every 1 days 07:15", Sao_Paulo, now()).is_err());
        assert!(parse_cadence("every x days 07:15", Sao_Paulo, now()).is_err());
    }

    #[test]
    fn once_is_a_one_shot_with_a_start() {
        let c = parse_cadence("once 2027-06-15 09:30", Sao_Paulo, now()).unwrap();
        assert_eq!(c.expression, "30 9 15 6 *");
        assert!(is_one_shot(&c.expression));
        // São Paulo is UTC-3.
        assert_eq!(c.starts_at, Some(Utc.with_ymd_and_hms(2027, 6, 15, 12, 30, 0).unwrap()));
    }

    #[test]
    fn once_in_the_past_is_rejected() {
        let err = parse_cadence("once 2026-01-01 09:00", Sao_Paulo, now()).unwrap_err();
        assert!(matches!(err, ReminderError::InvalidCadence(_)));
    }

    #[test]
    fn raw_cron_is_validated() {
        assert_eq!(parse_cadence("0 9 * * 1-5", Sao_Paulo, now()).unwrap().expression, "0 9 * * 1-5");
        assert!(parse_cadence("0 99 * * *", Sao_Paulo, now()).is_err());
    }

    #[test]
    fn garbage_gets_a_corrective_message() {
        let err = parse_cadence("sometimes", Sao_Paulo, now()).unwrap_err();
        assert!(err.to_string().contains("Formatos aceitos"));
        assert!(parse_cadence("daily 25:00", Sao_Paulo, now()).is_err());
        assert!(parse_cadence("weekly xyz 09:00", Sao_Paulo, now()).is_err());
    }

    #[test]
    fn starts_at_is_local() {
        let at = parse_starts_at("2026-11-01 09:00", Sao_Paulo).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2026, 11, 1, 12, 0, 0).unwrap());
        assert!(parse_starts_at("tomorrow", Sao_Paulo).is_err());
    }
}
