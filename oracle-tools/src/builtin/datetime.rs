//! Time arithmetic for questions about deadlines and elapsed periods

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use oracle_core::{OracleError, ValidationError};
use serde_json::json;

use crate::schema::{ParameterSchema, Property};
use crate::tool::Tool;
use crate::value::{Arguments, Value};

pub const DATETIME_TOOL: &str = "datetime";

const OPERATIONS: [&str; 4] = ["now", "add", "diff", "until"];
const UNITS: [&str; 5] = ["seconds", "minutes", "hours", "days", "weeks"];

pub fn datetime_tool() -> Tool {
    let schema = ParameterSchema::new()
        .required_property(
            "operation",
            Property::string(
                "now: current UTC time; add: timestamp + amount units; \
                 diff: other - timestamp; until: timestamp - now",
            )
            .with_enum(OPERATIONS),
        )
        .property("timestamp", Property::string("RFC 3339 timestamp, e.g. 2026-11-03T00:00:00Z"))
        .property("other", Property::string("Second RFC 3339 timestamp for diff"))
        .property("amount", Property::integer("Number of units to add (may be negative)"))
        .property(
            "unit",
            Property::string("Unit for amount and for reporting differences")
                .with_enum(UNITS)
                .with_default("days"),
        );

    Tool::function(
        DATETIME_TOOL,
        "Date and time arithmetic in UTC: current time, adding offsets, and differences between timestamps.",
        schema,
        |args, _cancel| async move { run(&args, Utc::now()) },
    )
}

fn run(args: &Arguments, now: DateTime<Utc>) -> Result<serde_json::Value, OracleError> {
    let operation = args.get("operation").and_then(Value::as_str).unwrap_or("now");
    let unit = args.get("unit").and_then(Value::as_str).unwrap_or("days");

    match operation {
        "now" => Ok(json!({ "now": now.to_rfc3339() })),
        "add" => {
            let base = timestamp_arg(args, "timestamp")?;
            let amount = args
                .get("amount")
                .and_then(Value::as_i64)
                .ok_or_else(|| ValidationError::new("amount", "amount is required for add"))?;
            let offset = unit_duration(unit, amount)?;
            let result = base
                .checked_add_signed(offset)
                .ok_or_else(|| ValidationError::new("amount", "result is out of range").with_value(amount))?;
            Ok(json!({ "result": result.to_rfc3339() }))
        }
        "diff" => {
            let start = timestamp_arg(args, "timestamp")?;
            let end = timestamp_arg(args, "other")?;
            Ok(describe(end - start, unit))
        }
        "until" => {
            let target = timestamp_arg(args, "timestamp")?;
            let mut out = describe(target - now, unit);
            out["passed"] = json!(target <= now);
            Ok(out)
        }
        other => Err(ValidationError::new("operation", "unsupported operation")
            .with_value(other)
            .into()),
    }
}

fn timestamp_arg(args: &Arguments, field: &str) -> Result<DateTime<Utc>, ValidationError> {
    let raw = args
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::new(field, "timestamp is required for this operation"))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ValidationError::new(field, format!("invalid RFC 3339 timestamp: {e}")).with_value(raw))
}

fn unit_seconds(unit: &str) -> Result<i64, ValidationError> {
    Ok(match unit {
        "seconds" => 1,
        "minutes" => 60,
        "hours" => 3_600,
        "days" => 86_400,
        "weeks" => 604_800,
        other => return Err(ValidationError::new("unit", "unsupported unit").with_value(other)),
    })
}

fn unit_duration(unit: &str, amount: i64) -> Result<ChronoDuration, ValidationError> {
    amount
        .checked_mul(unit_seconds(unit)?)
        .and_then(ChronoDuration::try_seconds)
        .ok_or_else(|| ValidationError::new("amount", "offset is out of range").with_value(amount))
}

fn describe(delta: ChronoDuration, unit: &str) -> serde_json::Value {
    let seconds = delta.num_seconds();
    let per_unit = unit_seconds(unit).unwrap_or(86_400);
    json!({
        "seconds": seconds,
        "unit": unit,
        "value": seconds as f64 / per_unit as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Invocation;
    use chrono::TimeZone;
    use tokio_util::sync::CancellationToken;

    fn args(json: serde_json::Value) -> Arguments {
        crate::value::arguments_from_json(&json).unwrap()
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_add_days() {
        let out = run(
            &args(json!({"operation": "add", "timestamp": "2026-10-30T00:00:00Z", "amount": 5, "unit": "days"})),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(out["result"], "2026-11-04T00:00:00+00:00");
    }

    #[test]
    fn test_diff_in_hours() {
        let out = run(
            &args(json!({
                "operation": "diff",
                "timestamp": "2026-10-19T00:00:00Z",
                "other": "2026-10-20T12:00:00Z",
                "unit": "hours"
            })),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(out["seconds"], 129_600);
        assert_eq!(out["value"], 36.0);
    }

    #[test]
    fn test_until_past_and_future() {
        let future = run(
            &args(json!({"operation": "until", "timestamp": "2026-10-21T12:00:00Z", "unit": "days"})),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(future["value"], 2.0);
        assert_eq!(future["passed"], false);

        let past = run(
            &args(json!({"operation": "until", "timestamp": "2026-10-18T12:00:00Z", "unit": "days"})),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(past["passed"], true);
    }

    #[test]
    fn test_bad_timestamp_is_validation() {
        let err = run(
            &args(json!({"operation": "diff", "timestamp": "yesterday", "other": "2026-10-19T00:00:00Z"})),
            fixed_now(),
        )
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_schema_rejects_unknown_unit() {
        let result = datetime_tool()
            .execute(
                Invocation::with_args(args(json!({"operation": "now", "unit": "fortnights"}))),
                CancellationToken::new(),
            )
            .await;
        assert!(result.error.unwrap().is_validation());
    }

    #[tokio::test]
    async fn test_now_through_tool() {
        let result = datetime_tool()
            .execute(
                Invocation::with_args(args(json!({"operation": "now"}))),
                CancellationToken::new(),
            )
            .await
            .into_result()
            .unwrap();
        assert!(result["now"].as_str().is_some());
    }
}
