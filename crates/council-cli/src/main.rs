use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod context;
mod output;

use commands::config::run_config;
use commands::serve::run_serve;
use commands::session::{
    run_chat, run_commit, run_history, run_input, run_plan, run_reset, run_respond, run_speak,
    run_state, run_updated, run_world_update,
};
use commands::tools::{run_threat, run_travel};
use context::CliContext;

#[derive(Parser)]
#[command(name = "council")]
#[command(about = "War council advisors backed by a tool-calling model", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    /// Workspace holding `data/` and `.council/`. Defaults to the current directory.
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Enable verbose logging to stderr.
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON-RPC on stdio.
    Serve,
    /// Print the session snapshot.
    State,
    /// Print the session version counter.
    Updated,
    /// Record a line of table talk.
    Input(InputArgs),
    /// Put a plan before the council.
    Plan(PlanArgs),
    /// Ask an advisor for a draft response.
    Respond(AdvisorArgs),
    /// Commit an advisor's draft.
    Commit(AdvisorArgs),
    /// Commit an advisor's draft and print the text to voice.
    Speak(AdvisorArgs),
    History(AdvisorArgs),
    Chat,
    /// Clear the session.
    Reset,
    /// Announce a change in the world to every advisor.
    WorldUpdate(WorldUpdateArgs),
    /// Travel time in days between two named locations.
    Travel(TravelArgs),
    /// Forecast a threat some months ahead.
    Threat(ThreatArgs),
    #[command(subcommand)]
    Config(ConfigCmd),
}

#[derive(Args)]
struct InputArgs {
    #[arg(long)]
    from: String,
    /// Advisor the line is addressed to.
    #[arg(long)]
    target: Option<String>,
    text: String,
}

#[derive(Args)]
struct PlanArgs {
    #[arg(long, default_value = "gm")]
    from: String,
    text: String,
}

#[derive(Args)]
struct AdvisorArgs {
    advisor_id: String,
}

#[derive(Args)]
struct WorldUpdateArgs {
    text: String,
}

#[derive(Args)]
struct TravelArgs {
    origin: String,
    destination: String,
}

#[derive(Args)]
struct ThreatArgs {
    threat_id: String,
    #[arg(long, default_value_t = 0.0)]
    months: f64,
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Print the merged config with the API key redacted.
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = CliContext::new(cli.workspace, cli.verbose, cli.json)?;

    match cli.command {
        Commands::Serve => run_serve(&ctx),
        Commands::State => run_state(&ctx),
        Commands::Updated => run_updated(&ctx),
        Commands::Input(args) => run_input(&ctx, &args.from, args.target.as_deref(), &args.text),
        Commands::Plan(args) => run_plan(&ctx, &args.from, &args.text),
        Commands::Respond(args) => run_respond(&ctx, &args.advisor_id),
        Commands::Commit(args) => run_commit(&ctx, &args.advisor_id),
        Commands::Speak(args) => run_speak(&ctx, &args.advisor_id),
        Commands::History(args) => run_history(&ctx, &args.advisor_id),
        Commands::Chat => run_chat(&ctx),
        Commands::Reset => run_reset(&ctx),
        Commands::WorldUpdate(args) => run_world_update(&ctx, &args.text),
        Commands::Travel(args) => run_travel(&ctx, &args.origin, &args.destination),
        Commands::Threat(args) => run_threat(&ctx, &args.threat_id, args.months),
        Commands::Config(ConfigCmd::Show) => run_config(&ctx),
    }
}
