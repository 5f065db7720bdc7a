use anyhow::Result;

use crate::context::CliContext;
use crate::output::print_json;

pub(crate) fn run_config(ctx: &CliContext) -> Result<()> {
    let display_cfg = ctx.config()?.redacted()?;
    if ctx.json {
        print_json(&display_cfg)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&display_cfg)?);
    }
    Ok(())
}
