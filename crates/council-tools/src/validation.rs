//! Argument checks that run before a tool touches the world data.
//!
//! Messages name the offending field so the model can correct itself on the
//! next round.

use council_core::ToolName;
use serde_json::Value;

pub fn validate_tool_args(tool: ToolName, args: &Value) -> Result<(), String> {
    if !(args.is_object() || args.is_null()) {
        return Err(format!(
            "arguments must be a JSON object, got {}",
            preview(args)
        ));
    }
    match tool {
        ToolName::TravelTime => {
            require_string(args, "origin", "location name is required")?;
            require_string(args, "destination", "location name is required")?;
            Ok(())
        }
        ToolName::ThreatFuture => {
            require_string(args, "threatId", "threat id is required")?;
            match args.get("months") {
                None | Some(Value::Null) => Err("months: elapsed months is required".to_string()),
                Some(value) if number_arg(value).is_none() => Err(format!(
                    "months: expected a number, got {}",
                    preview(value)
                )),
                Some(_) => Ok(()),
            }
        }
        ToolName::Armies | ToolName::CouncilPublic => Ok(()),
    }
}

/// Accept JSON numbers and numeric strings.
pub fn number_arg(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn require_string(args: &Value, field: &str, msg: &str) -> Result<(), String> {
    match args.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(()),
        Some(Value::String(_)) => Err(format!("{field}: {msg} (got empty string)")),
        Some(v) => Err(format!("{field}: expected string, got {}", preview(v))),
        None => Err(format!("{field}: {msg}")),
    }
}

fn preview(value: &Value) -> String {
    value.to_string().chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn travel_requires_both_endpoints() {
        let err = validate_tool_args(ToolName::TravelTime, &json!({"origin": "Aster"}))
            .expect_err("missing destination");
        assert!(err.starts_with("destination:"));
        assert!(
            validate_tool_args(
                ToolName::TravelTime,
                &json!({"origin": "Aster", "destination": "Brack"})
            )
            .is_ok()
        );
    }

    #[test]
    fn blank_and_mistyped_strings_are_rejected() {
        let err = validate_tool_args(
            ToolName::TravelTime,
            &json!({"origin": " ", "destination": "Brack"}),
        )
        .expect_err("blank");
        assert!(err.contains("got empty string"));
        let err = validate_tool_args(ToolName::ThreatFuture, &json!({"threatId": 7, "months": 1}))
            .expect_err("number id");
        assert!(err.starts_with("threatId: expected string"));
    }

    #[test]
    fn months_accepts_numeric_strings_only() {
        assert!(
            validate_tool_args(ToolName::ThreatFuture, &json!({"threatId": "t", "months": "6"}))
                .is_ok()
        );
        let err =
            validate_tool_args(ToolName::ThreatFuture, &json!({"threatId": "t", "months": "soon"}))
                .expect_err("word");
        assert!(err.starts_with("months: expected a number"));
        let err = validate_tool_args(ToolName::ThreatFuture, &json!({"threatId": "t"}))
            .expect_err("missing");
        assert!(err.starts_with("months:"));
    }

    #[test]
    fn listing_tools_take_any_object() {
        assert!(validate_tool_args(ToolName::Armies, &json!({})).is_ok());
        assert!(validate_tool_args(ToolName::CouncilPublic, &Value::Null).is_ok());
        assert!(validate_tool_args(ToolName::Armies, &json!([1, 2])).is_err());
    }
}
