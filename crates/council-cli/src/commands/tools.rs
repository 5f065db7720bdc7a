use anyhow::Result;
use council_core::CouncilData;
use council_tools::{TravelResolver, future_stage};
use serde_json::json;

use crate::context::CliContext;
use crate::output::print_json;

// Static lookups only need the data directory, not a session or a client.
fn load_data(ctx: &CliContext) -> Result<CouncilData> {
    let cfg = ctx.config()?;
    let data = CouncilData::load(&cfg.council.data_dir(ctx.workspace()))?;
    data.validate()?;
    Ok(data)
}

pub(crate) fn run_travel(ctx: &CliContext, origin: &str, destination: &str) -> Result<()> {
    let data = load_data(ctx)?;
    let resolver = TravelResolver::new(data.world);
    let days = resolver.travel_time(origin, destination)?;
    if ctx.json {
        print_json(&json!({"origin": origin, "destination": destination, "days": days}))
    } else {
        println!("{origin} -> {destination}: {days} days");
        Ok(())
    }
}

pub(crate) fn run_threat(ctx: &CliContext, threat_id: &str, months: f64) -> Result<()> {
    let data = load_data(ctx)?;
    let forecast = future_stage(&data.threats, threat_id, months)?;
    if ctx.json {
        print_json(&json!({
            "threatId": forecast.threat.id,
            "months": forecast.months,
            "summary": forecast.summary,
        }))
    } else {
        println!(
            "{} in {} months: {}",
            forecast.threat.name, forecast.months, forecast.summary
        );
        Ok(())
    }
}
