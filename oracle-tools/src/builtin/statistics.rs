//! Summary statistics over numeric samples (prices, polls, counts)

use oracle_core::{OracleError, ValidationError};
use serde_json::json;

use crate::schema::{ParameterSchema, Property};
use crate::tool::Tool;
use crate::value::Value;

pub const STATISTICS_TOOL: &str = "statistics";

pub fn statistics_tool() -> Tool {
    let schema = ParameterSchema::new()
        .required_property(
            "operation",
            Property::string("Statistic to compute")
                .with_enum(["mean", "median", "min", "max", "sum", "stdev"]),
        )
        .required_property(
            "values",
            Property::array("Numeric samples", Property::number("Sample value")),
        );

    Tool::function(
        STATISTICS_TOOL,
        "Compute a summary statistic (mean, median, min, max, sum, population stdev) over a list of numbers.",
        schema,
        |args, _cancel| async move {
            let operation = args
                .get("operation")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let values: Vec<f64> = args
                .get("values")
                .and_then(Value::as_array)
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_f64)
                .collect();

            let result = compute(&operation, &values)?;
            Ok::<_, OracleError>(json!({
                "operation": operation,
                "count": values.len(),
                "result": result
            }))
        },
    )
}

pub fn compute(operation: &str, values: &[f64]) -> Result<f64, ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::new("values", "at least one value is required"));
    }
    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();

    Ok(match operation {
        "sum" => sum,
        "mean" => sum / n,
        "min" => values.iter().copied().fold(f64::INFINITY, f64::min),
        "max" => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        "median" => {
            let mut sorted = values.to_vec();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 0 {
                (sorted[mid - 1] + sorted[mid]) / 2.0
            } else {
                sorted[mid]
            }
        }
        "stdev" => {
            let mean = sum / n;
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
        }
        other => {
            return Err(ValidationError::new("operation", "unsupported operation").with_value(other))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Invocation;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_compute() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(compute("mean", &xs).unwrap(), 5.0);
        assert_eq!(compute("stdev", &xs).unwrap(), 2.0);
        assert_eq!(compute("median", &xs).unwrap(), 4.5);
        assert_eq!(compute("median", &[3.0, 1.0, 2.0]).unwrap(), 2.0);
        assert_eq!(compute("min", &xs).unwrap(), 2.0);
        assert_eq!(compute("max", &xs).unwrap(), 9.0);
        assert_eq!(compute("sum", &xs).unwrap(), 40.0);
        assert!(compute("mean", &[]).is_err());
    }

    #[tokio::test]
    async fn test_tool_validates_array_items() {
        let args = crate::value::arguments_from_json(&json!({
            "operation": "mean",
            "values": [0.4, "0.6"]
        }))
        .unwrap();
        let result = statistics_tool()
            .execute(Invocation::with_args(args), CancellationToken::new())
            .await;
        match result.error {
            Some(oracle_core::OracleError::Validation(err)) => assert_eq!(err.field, "values[1]"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tool_accepts_integer_samples() {
        let args = crate::value::arguments_from_json(&json!({
            "operation": "sum",
            "values": [1, 2.5, 3]
        }))
        .unwrap();
        let out = statistics_tool()
            .execute(Invocation::with_args(args), CancellationToken::new())
            .await
            .into_result()
            .unwrap();
        assert_eq!(out["result"], 6.5);
        assert_eq!(out["count"], 3);
    }
}
