mod answer;
pub mod prompts;
pub mod speech;
pub mod tool_bridge;
pub mod tool_loop;

use anyhow::{Result, anyhow};
use council_core::{
    AppConfig, ChatEntry, CouncilData, CouncilError, CouncilEvent, EventEnvelope, HistoryEntry,
    StampedResponse, ToolHost, ToolResult,
};
use council_llm::{ChatCompletionsClient, LlmClient};
use council_observe::Observer;
use council_store::{SessionSnapshot, Store};
use council_tools::CouncilToolHost;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub use answer::parse_final_answer;
pub use prompts::PromptContext;
pub use tool_loop::{ToolLoopConfig, ToolLoopError, ToolLoopResult, ToolUseLoop};

/// Owns the council data, the session store and the reasoning client, and
/// serves every council operation.
pub struct CouncilEngine {
    cfg: AppConfig,
    data: Arc<CouncilData>,
    tools: CouncilToolHost,
    llm: Box<dyn LlmClient + Send + Sync>,
    store: Mutex<Store>,
    observer: Arc<Observer>,
}

impl CouncilEngine {
    /// Load config, data and session state from `workspace` and talk to the
    /// configured chat-completions endpoint.
    pub fn new(workspace: &Path) -> Result<Self> {
        Self::with_config(workspace, AppConfig::load(workspace)?)
    }

    /// Like `new`, with an already merged config.
    pub fn with_config(workspace: &Path, cfg: AppConfig) -> Result<Self> {
        let data = CouncilData::load(&cfg.council.data_dir(workspace))?;
        let llm = ChatCompletionsClient::new(cfg.llm.clone())?;
        Self::with_llm(workspace, cfg, data, Box::new(llm))
    }

    pub fn with_llm(
        workspace: &Path,
        mut cfg: AppConfig,
        data: CouncilData,
        llm: Box<dyn LlmClient + Send + Sync>,
    ) -> Result<Self> {
        cfg.council.validate();
        data.validate()?;
        let mut observer = Observer::new(workspace)?;
        observer.set_verbose(cfg.verbose);
        let mut store = Store::open(&cfg.council.persistence_path(workspace))?;
        if let Some(warning) = store.take_load_warning() {
            observer.warn_log(&warning);
        }
        observer.verbose_log(&format!(
            "loaded {} advisors, session at version {}",
            data.advisors.len(),
            store.updated_index()
        ));
        let data = Arc::new(data);
        Ok(Self {
            tools: CouncilToolHost::new(Arc::clone(&data)),
            cfg,
            data,
            llm,
            store: Mutex::new(store),
            observer: Arc::new(observer),
        })
    }

    pub fn data(&self) -> &CouncilData {
        &self.data
    }

    fn store(&self) -> Result<MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|_| anyhow!("session store lock poisoned"))
    }

    fn emit(&self, kind: CouncilEvent) {
        if let Err(err) = self.observer.record_event(&EventEnvelope::now(kind)) {
            self.observer
                .verbose_log(&format!("failed to record event: {err}"));
        }
    }

    fn mutated(&self, operation: &str, updated_index: u64) {
        self.observer
            .verbose_log(&format!("{operation} -> version {updated_index}"));
        self.emit(CouncilEvent::StateMutated {
            operation: operation.to_string(),
            updated_index,
        });
    }

    // ── Reads ──

    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        Ok(self.store()?.state().snapshot(&self.data.public_council()))
    }

    pub fn updated_index(&self) -> Result<u64> {
        Ok(self.store()?.updated_index())
    }

    pub fn chat(&self) -> Result<Vec<ChatEntry>> {
        Ok(self.store()?.state().chat.clone())
    }

    pub fn history(&self, advisor_id: &str) -> Result<Vec<HistoryEntry>> {
        if advisor_id.trim().is_empty() {
            return Err(CouncilError::Validation("councilorId required".to_string()).into());
        }
        Ok(self.store()?.state().history_for(advisor_id).to_vec())
    }

    pub fn world_updates(&self) -> Result<Vec<String>> {
        Ok(self.store()?.state().world_updates.clone())
    }

    // ── Mutations ──

    pub fn record_input(
        &self,
        from: &str,
        target_name: Option<&str>,
        text: &str,
    ) -> Result<ChatEntry> {
        let mut store = self.store()?;
        let entry = store.record_input(from, target_name, text)?;
        self.mutated("input", store.updated_index());
        Ok(entry)
    }

    pub fn set_plan(&self, from: &str, text: &str) -> Result<()> {
        let mut store = self.store()?;
        store.set_plan(from, text)?;
        self.mutated("plan", store.updated_index());
        Ok(())
    }

    pub fn add_world_update(&self, text: &str) -> Result<()> {
        let mut store = self.store()?;
        store.add_world_update(text)?;
        self.mutated("world_update", store.updated_index());
        Ok(())
    }

    pub fn reset(&self) -> Result<()> {
        let mut store = self.store()?;
        store.reset()?;
        self.mutated("reset", store.updated_index());
        Ok(())
    }

    /// Run one advisor-response cycle and record the result as a draft.
    ///
    /// The store lock is held only while capturing context and while
    /// recording the draft, never across calls to the reasoning service.
    pub fn generate_response(&self, advisor_id: &str) -> Result<StampedResponse> {
        let advisor = self
            .data
            .advisor(advisor_id)
            .ok_or_else(|| CouncilError::UnknownAdvisor(advisor_id.to_string()))?;
        let ctx = {
            let store = self.store()?;
            PromptContext::capture(store.state(), self.cfg.council.transcript_window)
        };

        let system_prompt = prompts::build_system_prompt(advisor);
        let user_prompt = prompts::build_user_prompt(&ctx, &self.data, &self.cfg.council);
        let observer = Arc::clone(&self.observer);
        let outcome = ToolUseLoop::new(
            self.llm.as_ref(),
            &self.tools,
            ToolLoopConfig {
                model: self.cfg.llm.model.clone(),
                max_tokens: self.cfg.llm.max_tokens,
                temperature: Some(self.cfg.llm.temperature),
                max_rounds: self.cfg.council.max_tool_rounds,
                deadline: Duration::from_secs(self.cfg.council.loop_timeout_seconds),
                advisor_id: advisor_id.to_string(),
            },
            system_prompt,
            user_prompt,
        )
        .with_event_callback(Arc::new(move |event| {
            if let Err(err) = observer.record_event(&EventEnvelope::now(event)) {
                observer.verbose_log(&format!("failed to record event: {err}"));
            }
        }))
        .run();

        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                self.observer
                    .warn_log(&format!("response for {advisor_id} failed: {err}"));
                self.emit(CouncilEvent::ResponseFailed {
                    advisor_id: advisor_id.to_string(),
                    error: err.to_string(),
                });
                return Err(err.into());
            }
        };

        if result.finish_reason == "length" {
            self.observer.verbose_log(&format!(
                "answer from {advisor_id} was cut off at {} tokens",
                self.cfg.llm.max_tokens
            ));
        }
        let (mut payload, parsed) = parse_final_answer(&result.response, ctx.has_plan());
        if !parsed {
            self.observer.verbose_log(&format!(
                "unparseable answer from {advisor_id}, using fallback"
            ));
        }
        payload.speech = speech::normalize(
            &payload.speech,
            self.cfg.council.max_sentences,
            self.cfg.council.max_words,
        );
        self.emit(CouncilEvent::ResponseGenerated {
            advisor_id: advisor_id.to_string(),
            rounds: result.rounds,
            tool_calls: result.tool_calls_made.len(),
            parsed,
        });

        let mut store = self.store()?;
        let draft = store.record_draft(advisor_id, payload)?;
        self.mutated("response", store.updated_index());
        Ok(draft)
    }

    /// Move the advisor's draft into the spoken record.
    pub fn commit(&self, advisor_id: &str) -> Result<StampedResponse> {
        self.require_advisor(advisor_id)?;
        let mut store = self.store()?;
        let committed = store.commit_draft(advisor_id)?;
        self.mutated("commit", store.updated_index());
        Ok(committed)
    }

    /// Same state transition as `commit`. Returns the text to voice.
    pub fn speak(&self, advisor_id: &str) -> Result<String> {
        self.require_advisor(advisor_id)?;
        let mut store = self.store()?;
        let committed = store.commit_draft(advisor_id)?;
        self.mutated("speak", store.updated_index());
        Ok(committed.speech)
    }

    /// Run a tool directly, outside any conversation.
    pub fn call_tool(&self, name: &str, args: &serde_json::Value) -> ToolResult {
        self.tools.dispatch(name, args)
    }

    fn require_advisor(&self, advisor_id: &str) -> Result<()> {
        if self.data.advisor(advisor_id).is_none() {
            return Err(CouncilError::UnknownAdvisor(advisor_id.to_string()).into());
        }
        Ok(())
    }
}
