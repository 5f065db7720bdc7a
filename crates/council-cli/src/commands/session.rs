use anyhow::Result;
use serde_json::json;

use crate::context::CliContext;
use crate::output::{print_history, print_json, print_response, support_label};

pub(crate) fn run_state(ctx: &CliContext) -> Result<()> {
    let snapshot = ctx.engine()?.snapshot()?;
    if ctx.json {
        return print_json(&snapshot);
    }
    println!("version {}", snapshot.updated_index);
    if snapshot.plan_text.trim().is_empty() {
        println!("plan: (none)");
    } else {
        println!("plan: {}", snapshot.plan_text);
    }
    if let Some(input) = &snapshot.last_input {
        println!("last input: {}: {}", input.from, input.text);
    }
    println!("chat lines: {}", snapshot.chat_count);
    for status in &snapshot.council {
        println!(
            "  {:<12} {:<24} support {:>5}  draft: {}",
            status.advisor.id,
            status.advisor.name,
            support_label(status.support),
            if status.draft.is_some() { "yes" } else { "no" }
        );
    }
    Ok(())
}

pub(crate) fn run_updated(ctx: &CliContext) -> Result<()> {
    let updated_index = ctx.engine()?.updated_index()?;
    if ctx.json {
        print_json(&json!({"updatedIndex": updated_index}))
    } else {
        println!("{updated_index}");
        Ok(())
    }
}

pub(crate) fn run_input(
    ctx: &CliContext,
    from: &str,
    target: Option<&str>,
    text: &str,
) -> Result<()> {
    let entry = ctx.engine()?.record_input(from, target, text)?;
    if ctx.json {
        print_json(&entry)
    } else {
        println!("recorded {}", entry.id);
        Ok(())
    }
}

pub(crate) fn run_plan(ctx: &CliContext, from: &str, text: &str) -> Result<()> {
    ctx.engine()?.set_plan(from, text)?;
    if ctx.json {
        print_json(&json!({"ok": true}))
    } else {
        println!("plan set");
        Ok(())
    }
}

pub(crate) fn run_respond(ctx: &CliContext, advisor_id: &str) -> Result<()> {
    let draft = ctx.engine()?.generate_response(advisor_id)?;
    if ctx.json {
        print_json(&json!({"draft": draft}))
    } else {
        print_response(&format!("{advisor_id} (draft)"), &draft);
        Ok(())
    }
}

pub(crate) fn run_commit(ctx: &CliContext, advisor_id: &str) -> Result<()> {
    let committed = ctx.engine()?.commit(advisor_id)?;
    if ctx.json {
        print_json(&json!({"committed": committed}))
    } else {
        print_response(&format!("{advisor_id} (committed)"), &committed);
        Ok(())
    }
}

pub(crate) fn run_speak(ctx: &CliContext, advisor_id: &str) -> Result<()> {
    let text = ctx.engine()?.speak(advisor_id)?;
    if ctx.json {
        print_json(&json!({"text": text}))
    } else {
        println!("{text}");
        Ok(())
    }
}

pub(crate) fn run_history(ctx: &CliContext, advisor_id: &str) -> Result<()> {
    let history = ctx.engine()?.history(advisor_id)?;
    if ctx.json {
        print_json(&json!({"history": history}))
    } else {
        print_history(&history);
        Ok(())
    }
}

pub(crate) fn run_chat(ctx: &CliContext) -> Result<()> {
    let chat = ctx.engine()?.chat()?;
    if ctx.json {
        return print_json(&json!({"chat": chat}));
    }
    for entry in &chat {
        match &entry.target_name {
            Some(target) => println!("{} @{}: {}", entry.from, target, entry.text),
            None => println!("{}: {}", entry.from, entry.text),
        }
    }
    Ok(())
}

pub(crate) fn run_reset(ctx: &CliContext) -> Result<()> {
    let engine = ctx.engine()?;
    engine.reset()?;
    if ctx.json {
        print_json(&json!({"ok": true, "updatedIndex": engine.updated_index()?}))
    } else {
        println!("session reset");
        Ok(())
    }
}

pub(crate) fn run_world_update(ctx: &CliContext, text: &str) -> Result<()> {
    let engine = ctx.engine()?;
    engine.add_world_update(text)?;
    if ctx.json {
        print_json(&json!({"ok": true, "updatedIndex": engine.updated_index()?}))
    } else {
        println!("world update recorded");
        Ok(())
    }
}
