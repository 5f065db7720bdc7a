//! Versioned session state for a council sitting.
//!
//! The whole state lives in one JSON document. Every mutation is applied to a
//! copy, stamped with the next `updatedIndex`, written to disk, and only then
//! becomes visible, so a failed write leaves the previous state in place.

use anyhow::Result;
use chrono::Utc;
use council_core::{
    AdvisorPublic, ChatEntry, CouncilError, HistoryEntry, HistoryKind, ResponsePayload,
    StampedResponse,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionState {
    pub updated_index: u64,
    pub plan_text: String,
    pub last_input: Option<ChatEntry>,
    pub drafts: BTreeMap<String, StampedResponse>,
    pub last_spoken: BTreeMap<String, StampedResponse>,
    /// Support recorded at the last commit, per advisor.
    pub support: BTreeMap<String, Option<u8>>,
    pub chat: Vec<ChatEntry>,
    /// Most recent first.
    pub history: BTreeMap<String, Vec<HistoryEntry>>,
    pub world_updates: Vec<String>,
}

impl SessionState {
    /// Draft support if present, else the last spoken support.
    #[must_use]
    pub fn support_indicator(&self, advisor_id: &str) -> Option<u8> {
        self.drafts
            .get(advisor_id)
            .and_then(|d| d.support)
            .or_else(|| self.last_spoken.get(advisor_id).and_then(|s| s.support))
    }

    #[must_use]
    pub fn recent_chat(&self, window: usize) -> &[ChatEntry] {
        let start = self.chat.len().saturating_sub(window);
        &self.chat[start..]
    }

    #[must_use]
    pub fn history_for(&self, advisor_id: &str) -> &[HistoryEntry] {
        self.history
            .get(advisor_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn push_history(&mut self, advisor_id: &str, entry: HistoryEntry) {
        self.history
            .entry(advisor_id.to_string())
            .or_default()
            .insert(0, entry);
    }

    #[must_use]
    pub fn snapshot(&self, council: &[AdvisorPublic]) -> SessionSnapshot {
        SessionSnapshot {
            updated_index: self.updated_index,
            council: council
                .iter()
                .map(|advisor| AdvisorStatus {
                    support: self.support_indicator(&advisor.id),
                    draft: self.drafts.get(&advisor.id).cloned(),
                    last_spoken: self.last_spoken.get(&advisor.id).cloned(),
                    advisor: advisor.clone(),
                })
                .collect(),
            plan_text: self.plan_text.clone(),
            last_input: self.last_input.clone(),
            chat_count: self.chat.len(),
        }
    }
}

/// Everything a polling client needs to redraw the council table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub updated_index: u64,
    pub council: Vec<AdvisorStatus>,
    pub plan_text: String,
    pub last_input: Option<ChatEntry>,
    pub chat_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorStatus {
    #[serde(flatten)]
    pub advisor: AdvisorPublic,
    pub support: Option<u8>,
    pub draft: Option<StampedResponse>,
    pub last_spoken: Option<StampedResponse>,
}

pub struct Store {
    path: PathBuf,
    state: SessionState,
    load_warning: Option<String>,
}

impl Store {
    /// Open the state file at `path`. A missing file starts a fresh session;
    /// an unreadable one does too, and leaves a warning for the caller.
    pub fn open(path: &Path) -> Result<Self> {
        let mut load_warning = None;
        let state = if path.exists() {
            match fs::read_to_string(path)
                .map_err(anyhow::Error::from)
                .and_then(|raw| serde_json::from_str::<SessionState>(&raw).map_err(Into::into))
            {
                Ok(state) => state,
                Err(err) => {
                    load_warning = Some(format!(
                        "failed to read session state from {}, starting fresh: {err}",
                        path.display()
                    ));
                    SessionState::default()
                }
            }
        } else {
            SessionState::default()
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            state,
            load_warning,
        })
    }

    pub fn take_load_warning(&mut self) -> Option<String> {
        self.load_warning.take()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn updated_index(&self) -> u64 {
        self.state.updated_index
    }

    /// Append a chat message and make it the last input.
    pub fn record_input(
        &mut self,
        from: &str,
        target_name: Option<&str>,
        text: &str,
    ) -> Result<ChatEntry> {
        if from.trim().is_empty() || text.trim().is_empty() {
            return Err(CouncilError::Validation("from and text required".to_string()).into());
        }
        self.mutate(|state| {
            let entry = ChatEntry::new(from, target_name, text);
            state.chat.push(entry.clone());
            state.last_input = Some(entry.clone());
            Ok(entry)
        })
    }

    /// Replace the plan under debate. The plan also becomes the last input.
    pub fn set_plan(&mut self, from: &str, text: &str) -> Result<()> {
        if from.trim().is_empty() {
            return Err(CouncilError::Validation("from required".to_string()).into());
        }
        self.mutate(|state| {
            state.plan_text = text.to_string();
            state.last_input = Some(ChatEntry::new(from, None, text));
            Ok(())
        })
    }

    pub fn record_draft(
        &mut self,
        advisor_id: &str,
        response: ResponsePayload,
    ) -> Result<StampedResponse> {
        self.mutate(|state| {
            let draft = response.stamped(Utc::now());
            state.drafts.insert(advisor_id.to_string(), draft.clone());
            state.push_history(advisor_id, HistoryEntry::new(HistoryKind::Draft, &draft));
            Ok(draft)
        })
    }

    /// Promote the current draft to the spoken record. The draft stays in
    /// place so it can be spoken again.
    pub fn commit_draft(&mut self, advisor_id: &str) -> Result<StampedResponse> {
        let Some(draft) = self.state.drafts.get(advisor_id).cloned() else {
            return Err(CouncilError::MissingDraft(advisor_id.to_string()).into());
        };
        self.mutate(|state| {
            let committed = StampedResponse {
                ts: Utc::now(),
                ..draft
            };
            state
                .last_spoken
                .insert(advisor_id.to_string(), committed.clone());
            state
                .support
                .insert(advisor_id.to_string(), committed.support);
            state.push_history(advisor_id, HistoryEntry::new(HistoryKind::Commit, &committed));
            Ok(committed)
        })
    }

    /// Prepend an entry to an advisor's history.
    pub fn append_history(&mut self, advisor_id: &str, entry: HistoryEntry) -> Result<()> {
        if advisor_id.trim().is_empty() {
            return Err(CouncilError::Validation("councilorId required".to_string()).into());
        }
        self.mutate(|state| {
            state.push_history(advisor_id, entry);
            Ok(())
        })
    }

    pub fn add_world_update(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CouncilError::Validation("text required".to_string()).into());
        }
        self.mutate(|state| {
            state.world_updates.push(text.to_string());
            Ok(())
        })
    }

    /// Clear the sitting. The version keeps counting up so pollers notice.
    pub fn reset(&mut self) -> Result<()> {
        self.mutate(|state| {
            *state = SessionState {
                updated_index: state.updated_index,
                ..SessionState::default()
            };
            Ok(())
        })
    }

    fn mutate<T>(&mut self, apply: impl FnOnce(&mut SessionState) -> Result<T>) -> Result<T> {
        let mut next = self.state.clone();
        let out = apply(&mut next)?;
        next.updated_index = self.state.updated_index + 1;
        self.persist(&next)
            .map_err(|err| CouncilError::Persistence(format!("{}: {err:#}", self.path.display())))?;
        self.state = next;
        Ok(out)
    }

    fn persist(&self, state: &SessionState) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(state)?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}
