mod definitions;
mod threats;
mod validation;
mod world;

use council_core::{CouncilData, ToolDefinition, ToolHost, ToolName, ToolResult};
use serde_json::{Value, json};
use std::sync::Arc;

pub use definitions::tool_definitions;
pub use threats::{ThreatError, ThreatForecast, clamp_months, future_stage};
pub use validation::validate_tool_args;
pub use world::{LocationOffset, TravelError, TravelResolver};

/// Serves the four world-knowledge tools from static council data.
pub struct CouncilToolHost {
    data: Arc<CouncilData>,
    travel: TravelResolver,
}

impl CouncilToolHost {
    pub fn new(data: Arc<CouncilData>) -> Self {
        let travel = TravelResolver::new(data.world.clone());
        Self { data, travel }
    }

    pub fn travel(&self) -> &TravelResolver {
        &self.travel
    }

    fn run_tool(&self, tool: ToolName, args: &Value) -> ToolResult {
        match tool {
            ToolName::TravelTime => {
                let origin = str_arg(args, "origin");
                let destination = str_arg(args, "destination");
                match self.travel.travel_time(origin, destination) {
                    Ok(days) => ToolResult::ok(json!({
                        "origin": origin,
                        "destination": destination,
                        "days": days,
                    })),
                    Err(TravelError::UnknownLocation(_)) => {
                        ToolResult::error("Unknown origin or destination.")
                    }
                    Err(TravelError::Unreachable { .. }) => {
                        ToolResult::error("No known route between locations.")
                    }
                }
            }
            ToolName::ThreatFuture => {
                let months = args
                    .get("months")
                    .and_then(validation::number_arg)
                    .unwrap_or(0.0);
                match future_stage(&self.data.threats, str_arg(args, "threatId"), months) {
                    Ok(forecast) => ToolResult::ok(json!({
                        "threatId": forecast.threat.id,
                        "months": forecast.months,
                        "summary": forecast.summary,
                    })),
                    Err(ThreatError::UnknownThreat(_)) => ToolResult::error("Unknown threat."),
                }
            }
            ToolName::Armies => to_result(&self.data.armies.armies),
            ToolName::CouncilPublic => to_result(&self.data.public_council()),
        }
    }
}

impl ToolHost for CouncilToolHost {
    fn definitions(&self) -> Vec<ToolDefinition> {
        tool_definitions()
    }

    fn dispatch(&self, name: &str, args: &Value) -> ToolResult {
        let Some(tool) = ToolName::from_api_name(name) else {
            return ToolResult::error("Unknown tool.");
        };
        if let Err(message) = validate_tool_args(tool, args) {
            return ToolResult::error(message);
        }
        self.run_tool(tool, args)
    }
}

fn str_arg<'a>(args: &'a Value, field: &str) -> &'a str {
    args.get(field).and_then(Value::as_str).unwrap_or_default()
}

fn to_result<T: serde::Serialize>(value: &T) -> ToolResult {
    match serde_json::to_value(value) {
        Ok(output) => ToolResult::ok(output),
        Err(err) => ToolResult::error(format!("failed to encode tool output: {err}")),
    }
}
