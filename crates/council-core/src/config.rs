use crate::{Result, runtime_dir};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Smallest word budget that still leaves room for the fallback clause.
pub const MIN_MAX_WORDS: usize = 20;
pub const MIN_SENTENCES: usize = 2;
pub const MAX_SENTENCES: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub council: CouncilConfig,
    /// Mirror verbose log lines to stderr.
    pub verbose: bool,
}

impl AppConfig {
    pub fn user_settings_path() -> Option<PathBuf> {
        let home = std::env::var("HOME")
            .ok()
            .or_else(|| std::env::var("USERPROFILE").ok())?;
        Some(Path::new(&home).join(".council/settings.json"))
    }

    pub fn project_settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.json")
    }

    pub fn project_local_settings_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("settings.local.json")
    }

    pub fn legacy_toml_path(workspace: &Path) -> PathBuf {
        runtime_dir(workspace).join("config.toml")
    }

    /// Merge defaults, legacy TOML, user settings, project settings and local
    /// overrides, in that order.
    pub fn load(workspace: &Path) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;

        let legacy = Self::legacy_toml_path(workspace);
        if legacy.exists() {
            let raw = fs::read_to_string(legacy)?;
            let legacy_cfg: AppConfig = toml::from_str(&raw)?;
            merge_json_value(&mut merged, &serde_json::to_value(legacy_cfg)?);
        }

        let mut paths = Vec::new();
        if let Some(user) = Self::user_settings_path() {
            paths.push(user);
        }
        paths.push(Self::project_settings_path(workspace));
        paths.push(Self::project_local_settings_path(workspace));

        for path in paths {
            if !path.exists() {
                continue;
            }
            let raw = fs::read_to_string(&path)?;
            let value: serde_json::Value = serde_json::from_str(&raw)
                .map_err(|err| anyhow::anyhow!("invalid settings in {}: {err}", path.display()))?;
            merge_json_value(&mut merged, &value);
        }

        let mut cfg: AppConfig = serde_json::from_value(merged)?;
        cfg.council.validate();
        Ok(cfg)
    }

    /// The config as JSON with the API key masked.
    pub fn redacted(&self) -> Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(llm) = value.get_mut("llm").and_then(|entry| entry.as_object_mut())
            && llm.get("api_key").is_some_and(|key| !key.is_null())
        {
            llm.insert("api_key".to_string(), serde_json::json!("***REDACTED***"));
        }
        Ok(value)
    }
}

pub(crate) fn merge_json_value(base: &mut serde_json::Value, overlay: &serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_obj), serde_json::Value::Object(overlay_obj)) => {
            for (key, overlay_value) in overlay_obj {
                if let Some(base_value) = base_obj.get_mut(key) {
                    merge_json_value(base_value, overlay_value);
                } else {
                    base_obj.insert(key.clone(), overlay_value.clone());
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

/// Connection settings for the chat-completions service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Timeout for a single round trip.
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 600,
            timeout_seconds: 60,
        }
    }
}

impl LlmConfig {
    /// Explicit key first, then the configured environment variable.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CouncilConfig {
    pub max_sentences: usize,
    pub max_words: usize,
    pub max_tool_rounds: usize,
    /// Deadline for a whole tool-calling conversation.
    pub loop_timeout_seconds: u64,
    pub transcript_window: usize,
    pub data_dir: String,
    pub persistence_path: String,
    /// Advisor id to synthesis voice, passed through to front-ends.
    pub tts_voices: BTreeMap<String, String>,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            max_sentences: MAX_SENTENCES,
            max_words: 80,
            max_tool_rounds: 6,
            loop_timeout_seconds: 180,
            transcript_window: 10,
            data_dir: "data".to_string(),
            persistence_path: ".council/state.json".to_string(),
            tts_voices: BTreeMap::new(),
        }
    }
}

impl CouncilConfig {
    /// Clamp limits into the range the speech contract can honor.
    pub fn validate(&mut self) {
        self.max_sentences = self.max_sentences.clamp(MIN_SENTENCES, MAX_SENTENCES);
        self.max_words = self.max_words.max(MIN_MAX_WORDS);
        self.max_tool_rounds = self.max_tool_rounds.max(1);
    }

    pub fn data_dir(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.data_dir)
    }

    pub fn persistence_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.persistence_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn project_settings_override_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = AppConfig::project_settings_path(dir.path());
        fs::create_dir_all(settings.parent().unwrap()).unwrap();
        fs::write(
            &settings,
            r#"{"council": {"max_words": 120}, "llm": {"model": "gpt-4.1"}}"#,
        )
        .unwrap();

        let cfg = AppConfig::load(dir.path()).expect("load");
        assert_eq!(cfg.council.max_words, 120);
        assert_eq!(cfg.council.max_sentences, MAX_SENTENCES);
        assert_eq!(cfg.llm.model, "gpt-4.1");
        assert_eq!(cfg.llm.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn local_settings_win_over_project_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let project = AppConfig::project_settings_path(dir.path());
        fs::create_dir_all(project.parent().unwrap()).unwrap();
        fs::write(&project, r#"{"council": {"max_tool_rounds": 3}}"#).unwrap();
        fs::write(
            AppConfig::project_local_settings_path(dir.path()),
            r#"{"council": {"max_tool_rounds": 8}}"#,
        )
        .unwrap();

        let cfg = AppConfig::load(dir.path()).expect("load");
        assert_eq!(cfg.council.max_tool_rounds, 8);
    }

    #[test]
    fn legacy_toml_is_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let legacy = AppConfig::legacy_toml_path(dir.path());
        fs::create_dir_all(legacy.parent().unwrap()).unwrap();
        fs::write(&legacy, "[council]\nmax_words = 64\n").unwrap();

        let cfg = AppConfig::load(dir.path()).expect("load");
        assert_eq!(cfg.council.max_words, 64);
    }

    #[test]
    fn validate_clamps_speech_limits() {
        let mut council = CouncilConfig {
            max_sentences: 9,
            max_words: 3,
            max_tool_rounds: 0,
            ..CouncilConfig::default()
        };
        council.validate();
        assert_eq!(council.max_sentences, MAX_SENTENCES);
        assert_eq!(council.max_words, MIN_MAX_WORDS);
        assert_eq!(council.max_tool_rounds, 1);
    }

    #[test]
    fn redacted_masks_api_key() {
        let cfg = AppConfig {
            llm: LlmConfig {
                api_key: Some("sk-secret".to_string()),
                ..LlmConfig::default()
            },
            ..AppConfig::default()
        };
        let value = cfg.redacted().expect("redact");
        assert_eq!(value["llm"]["api_key"], "***REDACTED***");
        assert!(!value.to_string().contains("sk-secret"));
    }

    #[test]
    fn explicit_api_key_wins_over_env() {
        let cfg = LlmConfig {
            api_key: Some("inline".to_string()),
            api_key_env: "COUNCIL_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        assert_eq!(cfg.resolve_api_key().as_deref(), Some("inline"));

        let blank = LlmConfig {
            api_key: Some("   ".to_string()),
            api_key_env: "COUNCIL_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        assert!(blank.resolve_api_key().is_none());
    }

    proptest! {
        #[test]
        fn merge_json_value_overlay_wins_for_flat_objects(
            base in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..12),
            overlay in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..12),
        ) {
            let mut merged = json!(base);
            merge_json_value(&mut merged, &json!(overlay));
            for (key, value) in &overlay {
                prop_assert_eq!(&merged[key], &json!(value));
            }
            for (key, value) in &base {
                if !overlay.contains_key(key) {
                    prop_assert_eq!(&merged[key], &json!(value));
                }
            }
        }
    }
}
