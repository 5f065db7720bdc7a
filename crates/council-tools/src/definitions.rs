use council_core::{FunctionDefinition, ToolDefinition, ToolName};
use serde_json::json;

fn description(tool: ToolName) -> &'static str {
    match tool {
        ToolName::TravelTime => {
            "Return the total travel days between two named locations (city, town, hamlet or landmark) using the world route graph."
        }
        ToolName::ThreatFuture => {
            "Return how a threat will have developed after the given number of months without intervention."
        }
        ToolName::Armies => "Return the list of army assets with their locations and strengths.",
        ToolName::CouncilPublic => {
            "Return the council roster with public agendas and descriptions."
        }
    }
}

fn parameters(tool: ToolName) -> serde_json::Value {
    match tool {
        ToolName::TravelTime => json!({
            "type": "object",
            "properties": {
                "origin": {"type": "string", "description": "Starting location name"},
                "destination": {"type": "string", "description": "Destination location name"}
            },
            "required": ["origin", "destination"]
        }),
        ToolName::ThreatFuture => json!({
            "type": "object",
            "properties": {
                "threatId": {"type": "string", "description": "Threat identifier"},
                "months": {"type": "number", "description": "Months elapsed from now"}
            },
            "required": ["threatId", "months"]
        }),
        ToolName::Armies | ToolName::CouncilPublic => json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolName::ALL
        .iter()
        .map(|tool| ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: tool.as_api_name().to_string(),
                description: description(*tool).to_string(),
                parameters: parameters(*tool),
            },
        })
        .collect()
}
