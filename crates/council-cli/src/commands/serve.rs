use anyhow::Result;
use council_jsonrpc::{CouncilRpcHandler, run_stdio_server};

use crate::context::CliContext;

pub(crate) fn run_serve(ctx: &CliContext) -> Result<()> {
    let handler = CouncilRpcHandler::new(ctx.engine()?);
    if ctx.json {
        println!(
            "{}",
            serde_json::json!({"status": "starting", "transport": "stdio"})
        );
    } else {
        eprintln!("council: starting JSON-RPC server on stdio...");
    }
    run_stdio_server(&handler)
}
