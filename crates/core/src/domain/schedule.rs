//! Schedule - wall-clock recurrence shared by repeatable jobs and the
//! trigger scheduler.
//!
//! Cron expressions use the six-field form (`sec min hour dom month dow`)
//! and are evaluated in UTC.

use crate::domain::error::{DomainError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Serializable recurrence rule (stored on the job envelope)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepeatRule {
    /// Fixed interval in milliseconds
    Every { every_ms: i64 },
    /// Six-field cron expression
    Cron { expression: String },
}

impl RepeatRule {
    pub fn to_schedule(&self) -> Result<Schedule> {
        match self {
            RepeatRule::Every { every_ms } => Schedule::every_ms(*every_ms),
            RepeatRule::Cron { expression } => Schedule::cron(expression),
        }
    }
}

/// Parsed schedule, ready to compute fire times
#[derive(Debug, Clone)]
pub enum Schedule {
    Cron {
        expression: String,
        parsed: Box<cron::Schedule>,
    },
    Every(i64),
}

impl Schedule {
    pub fn cron(expression: impl Into<String>) -> Result<Self> {
        let expression = expression.into();
        let parsed =
            cron::Schedule::from_str(&expression).map_err(|e| DomainError::InvalidSchedule {
                expression: expression.clone(),
                reason: e.to_string(),
            })?;
        Ok(Schedule::Cron {
            expression,
            parsed: Box::new(parsed),
        })
    }

    pub fn every_ms(every_ms: i64) -> Result<Self> {
        if every_ms <= 0 {
            return Err(DomainError::InvalidSchedule {
                expression: format!("every {}ms", every_ms),
                reason: "interval must be positive".to_string(),
            });
        }
        Ok(Schedule::Every(every_ms))
    }

    /// Next fire time strictly after `now_millis` (epoch ms)
    pub fn next_after(&self, now_millis: i64) -> Option<i64> {
        match self {
            Schedule::Every(every_ms) => now_millis.checked_add(*every_ms),
            Schedule::Cron { parsed, .. } => {
                let now = DateTime::<Utc>::from_timestamp_millis(now_millis)?;
                parsed
                    .after(&now)
                    .next()
                    .map(|next| next.timestamp_millis())
            }
        }
    }

    pub fn to_rule(&self) -> RepeatRule {
        match self {
            Schedule::Every(every_ms) => RepeatRule::Every {
                every_ms: *every_ms,
            },
            Schedule::Cron { expression, .. } => RepeatRule::Cron {
                expression: expression.clone(),
            },
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Cron { expression, .. } => write!(f, "cron({})", expression),
            Schedule::Every(every_ms) => write!(f, "every({}ms)", every_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_every_schedule_adds_interval() {
        let schedule = Schedule::every_ms(60_000).unwrap();
        assert_eq!(schedule.next_after(1_000), Some(61_000));
    }

    #[test]
    fn test_every_schedule_rejects_non_positive() {
        assert!(Schedule::every_ms(0).is_err());
        assert!(Schedule::every_ms(-5).is_err());
    }

    #[test]
    fn test_daily_cron_fires_next_day() {
        let schedule = Schedule::cron("0 0 3 * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 4, 0, 0).unwrap();
        let next = schedule.next_after(now.timestamp_millis()).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 5, 2, 3, 0, 0).unwrap();
        assert_eq!(next, expected.timestamp_millis());
    }

    #[test]
    fn test_invalid_cron_is_rejected() {
        let err = Schedule::cron("every tuesday").unwrap_err();
        assert!(err.to_string().contains("every tuesday"));
    }

    #[test]
    fn test_rule_round_trips_through_schedule() {
        let rule = RepeatRule::Cron {
            expression: "0 */5 * * * *".to_string(),
        };
        assert_eq!(rule.to_schedule().unwrap().to_rule(), rule);
    }
}
