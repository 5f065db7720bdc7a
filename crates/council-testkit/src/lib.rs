//! Shared fixtures for council tests: a scripted reasoning service, a small
//! world, and a seeded temporary workspace.

use anyhow::{Result, anyhow};
use council_core::{
    Advisor, Army, ArmyRoster, ChatRequest, City, CouncilData, Hamlet, LlmResponse, LlmToolCall,
    NotableLocation, Route, Threat, ThreatRoster, Town, WorldMap,
};
use council_llm::LlmClient;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Script {
    responses: VecDeque<Result<LlmResponse, String>>,
    requests: Vec<ChatRequest>,
}

/// Replays queued responses and remembers every request it saw. Clones share
/// the same script, so a test can keep one handle after handing another to
/// the engine.
#[derive(Clone, Default)]
pub struct ScriptedLlm {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        let llm = Self::default();
        for response in responses {
            llm.push(response);
        }
        llm
    }

    pub fn push(&self, response: LlmResponse) {
        if let Ok(mut script) = self.inner.lock() {
            script.responses.push_back(Ok(response));
        }
    }

    /// Queue a transport-style failure.
    pub fn push_failure(&self, message: &str) {
        if let Ok(mut script) = self.inner.lock() {
            script.responses.push_back(Err(message.to_string()));
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.inner
            .lock()
            .map(|script| script.requests.clone())
            .unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.inner
            .lock()
            .map(|script| script.responses.len())
            .unwrap_or_default()
    }
}

impl LlmClient for ScriptedLlm {
    fn complete_chat(&self, req: &ChatRequest) -> Result<LlmResponse> {
        let mut script = self
            .inner
            .lock()
            .map_err(|_| anyhow!("scripted llm lock poisoned"))?;
        script.requests.push(req.clone());
        match script.responses.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted llm exhausted")),
        }
    }
}

pub fn text_response(text: &str) -> LlmResponse {
    LlmResponse {
        text: text.to_string(),
        finish_reason: "stop".to_string(),
        tool_calls: vec![],
    }
}

/// `(id, name, arguments)` triples.
pub fn tool_call_response(calls: &[(&str, &str, &str)]) -> LlmResponse {
    LlmResponse {
        text: String::new(),
        finish_reason: "tool_calls".to_string(),
        tool_calls: calls
            .iter()
            .map(|(id, name, args)| LlmToolCall {
                id: id.to_string(),
                name: name.to_string(),
                arguments: args.to_string(),
            })
            .collect(),
    }
}

// ── Fixtures ──

pub fn advisor(id: &str, name: &str) -> Advisor {
    Advisor {
        id: id.to_string(),
        name: name.to_string(),
        title: "Marshal".to_string(),
        region: "Northmarch".to_string(),
        description: format!("{name} has held the northern passes for twenty winters."),
        voice_style: "clipped and cold".to_string(),
        public_agenda: "Keep the legions near the passes".to_string(),
        private_agenda: "Secure the succession for her nephew".to_string(),
    }
}

/// Cities A-B (2 days) and B-C (3 days), town T one day from A, hamlet H
/// half a day from T, the isolated city Isle, and a landmark near C.
pub fn sample_world() -> WorldMap {
    WorldMap {
        cities: ["A", "B", "C", "Isle"]
            .iter()
            .map(|name| City {
                name: name.to_string(),
            })
            .collect(),
        routes: vec![
            Route {
                from: "A".to_string(),
                to: "B".to_string(),
                days: 2.0,
            },
            Route {
                from: "B".to_string(),
                to: "C".to_string(),
                days: 3.0,
            },
        ],
        towns: vec![Town {
            name: "T".to_string(),
            nearest_city: "A".to_string(),
            days_to_city: 1.0,
        }],
        hamlets: vec![Hamlet {
            name: "H".to_string(),
            nearest_town: "T".to_string(),
            days_to_town: 0.5,
        }],
        notable_locations: vec![NotableLocation {
            name: "Watchtower".to_string(),
            nearest_city: Some("C".to_string()),
            days_to_city: Some(0.5),
            nearest_town: None,
            days_to_town: None,
        }],
    }
}

pub fn sample_threats() -> ThreatRoster {
    ThreatRoster {
        threats: vec![Threat {
            id: "reavers".to_string(),
            name: "Reaver Fleet".to_string(),
            description: "Raiders harrying the southern coast.".to_string(),
            known_facts: vec!["Twelve longships were sighted off Saltmere.".to_string()],
            event_chain: vec![
                "Raids on fishing villages.".to_string(),
                "Saltmere is besieged.".to_string(),
                "The southern coast falls.".to_string(),
            ],
        }],
    }
}

pub fn sample_armies() -> ArmyRoster {
    ArmyRoster {
        armies: vec![Army {
            name: "First Legion".to_string(),
            location: "A".to_string(),
            infantry: 1200,
            cavalry: 300,
            missile: 200,
            abilities: vec!["Shield wall".to_string()],
        }],
    }
}

pub fn sample_data() -> CouncilData {
    CouncilData {
        advisors: vec![advisor("orrin", "Lord Orrin"), advisor("vess", "Lady Vess")],
        world: sample_world(),
        threats: sample_threats(),
        armies: sample_armies(),
    }
}

/// Write `data` in the on-disk layout under `dir`.
pub fn write_data_dir(dir: &Path, data: &CouncilData) -> Result<()> {
    let council = dir.join("council");
    fs::create_dir_all(&council)?;
    for advisor in &data.advisors {
        fs::write(
            council.join(format!("{}.json", advisor.id)),
            serde_json::to_vec_pretty(advisor)?,
        )?;
    }
    fs::write(dir.join("world.json"), serde_json::to_vec_pretty(&data.world)?)?;
    fs::write(
        dir.join("threats.json"),
        serde_json::to_vec_pretty(&data.threats)?,
    )?;
    fs::write(
        dir.join("armies.json"),
        serde_json::to_vec_pretty(&data.armies)?,
    )?;
    Ok(())
}

/// A temporary workspace with `sample_data()` under `data/`.
pub struct TestWorkspace {
    dir: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn seeded() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        write_data_dir(&dir.path().join("data"), &sample_data())?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join(".council/state.json")
    }
}
