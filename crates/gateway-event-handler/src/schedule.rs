use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use gateway_transformer::script::{evaluate, HttpHelper};
use serde_json::Value;

use crate::error::EventHandlerError;

/// Parsed result of running a DELAYED/RECURRING integration's scheduling
/// script against its transformed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleOutcome {
    /// DELAYED mode: a single unix-ms due time.
    Delayed(DateTime<Utc>),
    /// RECURRING mode: first occurrence plus the recurrence parameters.
    Recurring {
        /// When the first occurrence becomes due.
        first_occurrence: DateTime<Utc>,
        /// Interval between occurrences, in milliseconds.
        interval_ms: u64,
        /// Optional cutoff.
        until: Option<DateTime<Utc>>,
        /// Optional total occurrence count.
        count: Option<u32>,
    },
}

/// Runs `source` (the same sandboxed contract as a SCRIPT-mode transform)
/// against the already-transformed payload and interprets its return value
/// per `recurring`: a bare unix-ms number for DELAYED, or an object
/// `{firstOccurrence, interval, until?, count?}` for RECURRING.
pub async fn run(source: &str, payload: &Value, recurring: bool, http_client: reqwest::Client, timeout: Duration) -> Result<ScheduleOutcome, EventHandlerError> {
    let http = HttpHelper::new(http_client, tokio::runtime::Handle::current(), timeout);
    let result = evaluate(source.to_string(), payload.clone(), http, timeout)
        .await
        .map_err(|err| EventHandlerError::Schedule(err.to_string()))?;
    let value = result.ok_or_else(|| EventHandlerError::Schedule("scheduling script returned null".to_string()))?;

    if recurring {
        parse_recurring(&value)
    } else {
        parse_delayed(&value)
    }
}

fn parse_delayed(value: &Value) -> Result<ScheduleOutcome, EventHandlerError> {
    let ms = value.as_i64().ok_or_else(|| EventHandlerError::Schedule("DELAYED schedule must return a unix-ms timestamp".to_string()))?;
    Ok(ScheduleOutcome::Delayed(millis_to_datetime(ms)?))
}

fn parse_recurring(value: &Value) -> Result<ScheduleOutcome, EventHandlerError> {
    let first_occurrence_ms = value
        .get("firstOccurrence")
        .and_then(Value::as_i64)
        .ok_or_else(|| EventHandlerError::Schedule("RECURRING schedule missing firstOccurrence".to_string()))?;
    let interval_ms = value
        .get("interval")
        .and_then(Value::as_u64)
        .ok_or_else(|| EventHandlerError::Schedule("RECURRING schedule missing interval".to_string()))?;
    let until = match value.get("until").and_then(Value::as_i64) {
        Some(ms) => Some(millis_to_datetime(ms)?),
        None => None,
    };
    let count = value.get("count").and_then(Value::as_u64).map(|c| c as u32);

    Ok(ScheduleOutcome::Recurring { first_occurrence: millis_to_datetime(first_occurrence_ms)?, interval_ms, until, count })
}

fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>, EventHandlerError> {
    Utc.timestamp_millis_opt(ms).single().ok_or_else(|| EventHandlerError::Schedule(format!("timestamp {ms} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delayed_schedule_parses_a_bare_timestamp() {
        let out = run("epoch() * 1000 + 60000", &serde_json::json!({}), false, reqwest::Client::new(), Duration::from_secs(5)).await.unwrap();
        assert!(matches!(out, ScheduleOutcome::Delayed(_)));
    }

    #[tokio::test]
    async fn recurring_schedule_parses_the_recurrence_object() {
        let source = r#"#{ firstOccurrence: epoch() * 1000 + 60000, interval: 60000, count: 3 }"#;
        let out = run(source, &serde_json::json!({}), true, reqwest::Client::new(), Duration::from_secs(5)).await.unwrap();
        match out {
            ScheduleOutcome::Recurring { interval_ms, count, .. } => {
                assert_eq!(interval_ms, 60_000);
                assert_eq!(count, Some(3));
            }
            ScheduleOutcome::Delayed(_) => panic!("expected Recurring"),
        }
    }

    #[tokio::test]
    async fn null_return_is_a_schedule_error() {
        let err = run("()", &serde_json::json!({}), false, reqwest::Client::new(), Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, EventHandlerError::Schedule(_)));
    }
}
