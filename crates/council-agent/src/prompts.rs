//! Prompt text for one advisor response.
//!
//! The system prompt carries the persona and rules. The user prompt carries
//! the output contract and a snapshot of the sitting.

use council_core::{Advisor, ChatEntry, CouncilConfig, CouncilData};
use council_store::SessionState;

/// Session facts captured under the store lock and used after it is released.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub plan_text: String,
    pub last_input: Option<ChatEntry>,
    pub world_updates: Vec<String>,
    pub recent_chat: Vec<ChatEntry>,
}

impl PromptContext {
    pub fn capture(state: &SessionState, transcript_window: usize) -> Self {
        Self {
            plan_text: state.plan_text.clone(),
            last_input: state.last_input.clone(),
            world_updates: state.world_updates.clone(),
            recent_chat: state.recent_chat(transcript_window).to_vec(),
        }
    }

    pub fn has_plan(&self) -> bool {
        !self.plan_text.trim().is_empty()
    }
}

pub fn build_system_prompt(advisor: &Advisor) -> String {
    [
        format!(
            "You are {}, {} of {}.",
            advisor.name, advisor.title, advisor.region
        ),
        "Council purpose: advise the Imperial War Council.".to_string(),
        format!("Voice style: {}.", advisor.voice_style),
        format!("Public agenda: {}.", advisor.public_agenda),
        format!(
            "Private agenda (never state it openly): {}.",
            advisor.private_agenda
        ),
        "Rules: Do not invent facts. Use the tools for travel times, threat forecasts, armies and the council roster. \
If you lack data, say \"I do not know\" and ask one specific question."
            .to_string(),
        "Do not use bullet lists or semicolons. Speak in 2-5 sentences and never exceed the max sentences."
            .to_string(),
        "Only output valid JSON.".to_string(),
    ]
    .join("\n")
}

pub fn build_user_prompt(ctx: &PromptContext, data: &CouncilData, limits: &CouncilConfig) -> String {
    let plan = if ctx.has_plan() {
        ctx.plan_text.trim()
    } else {
        "No plan submitted."
    };
    let world_updates = if ctx.world_updates.is_empty() {
        "No recent world updates.".to_string()
    } else {
        ctx.world_updates.join("\n")
    };

    format!(
        "Return STRICT JSON with keys: support and speech.\n\
Support is integer 0-10 only if a plan exists, else null.\n\
Speech must be 2-5 sentences, no bullet lists, no semicolons.\n\
Max sentences: {max_sentences}. Max words: {max_words}.\n\
\n\
Context:\n\
Last input: {last_input}\n\
Current plan: {plan}\n\
World updates: {world_updates}\n\
Threats:\n{threats}\n\
Armies:\n{armies}\n\
Recent transcript:\n{transcript}",
        max_sentences = limits.max_sentences,
        max_words = limits.max_words,
        last_input = format_last_input(ctx.last_input.as_ref()),
        threats = format_threats(data),
        armies = format_armies(data),
        transcript = format_transcript(&ctx.recent_chat),
    )
}

fn format_last_input(entry: Option<&ChatEntry>) -> String {
    let Some(entry) = entry else {
        return "No recent input.".to_string();
    };
    let target = entry
        .target_name
        .as_ref()
        .map(|t| format!(" @{t}"))
        .unwrap_or_default();
    format!("{}{target}: {}", entry.from.to_uppercase(), entry.text)
}

fn format_threats(data: &CouncilData) -> String {
    if data.threats.threats.is_empty() {
        return "None known.".to_string();
    }
    data.threats
        .threats
        .iter()
        .map(|t| {
            format!(
                "- [{}] {}: {} Facts: {}",
                t.id,
                t.name,
                t.description,
                t.known_facts.join(" ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_armies(data: &CouncilData) -> String {
    if data.armies.armies.is_empty() {
        return "None fielded.".to_string();
    }
    data.armies
        .armies
        .iter()
        .map(|a| {
            format!(
                "- {} at {} (inf {}, cav {}, missile {}) abilities: {}",
                a.name,
                a.location,
                a.infantry,
                a.cavalry,
                a.missile,
                a.abilities.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_transcript(recent: &[ChatEntry]) -> String {
    if recent.is_empty() {
        return "No recent transcript.".to_string();
    }
    recent
        .iter()
        .map(ChatEntry::transcript_line)
        .collect::<Vec<_>>()
        .join("\n")
}
