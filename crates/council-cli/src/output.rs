use anyhow::Result;
use council_core::{HistoryEntry, StampedResponse};
use serde::Serialize;

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

pub(crate) fn support_label(support: Option<u8>) -> String {
    support.map_or_else(|| "-".to_string(), |s| format!("{s}/10"))
}

pub(crate) fn print_response(label: &str, response: &StampedResponse) {
    println!("{label} [support {}]", support_label(response.support));
    println!("{}", response.speech);
}

pub(crate) fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("no history");
        return;
    }
    for entry in entries {
        let kind = match entry.kind {
            council_core::HistoryKind::Draft => "draft",
            council_core::HistoryKind::Commit => "commit",
        };
        println!(
            "{} {kind:<6} {:>5}  {}",
            entry.ts.format("%Y-%m-%d %H:%M:%S"),
            support_label(entry.support),
            entry.speech
        );
    }
}
