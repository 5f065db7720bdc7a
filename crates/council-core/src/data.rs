//! Static council data: advisors, the world map, threats and armies.
//!
//! Everything here is loaded once at startup from the data directory and is
//! treated as immutable for the lifetime of the process.

use crate::CouncilError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A council member. The private agenda only ever reaches the prompt builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advisor {
    pub id: String,
    pub name: String,
    pub title: String,
    pub region: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub voice_style: String,
    pub public_agenda: String,
    pub private_agenda: String,
}

impl Advisor {
    /// Project the advisor into the shape every read surface is allowed to see.
    #[must_use]
    pub fn public_view(&self) -> AdvisorPublic {
        AdvisorPublic {
            id: self.id.clone(),
            name: self.name.clone(),
            title: self.title.clone(),
            region: self.region.clone(),
            description: self.description.clone(),
            public_agenda: self.public_agenda.clone(),
        }
    }
}

/// Public roster entry. Has no field for the private agenda, so it cannot leak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorPublic {
    pub id: String,
    pub name: String,
    pub title: String,
    pub region: String,
    pub description: String,
    pub public_agenda: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub name: String,
}

/// Undirected route between two cities, weighted in travel days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub from: String,
    pub to: String,
    pub days: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Town {
    pub name: String,
    pub nearest_city: String,
    pub days_to_city: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hamlet {
    pub name: String,
    pub nearest_town: String,
    pub days_to_town: f64,
}

/// A landmark anchored either to a city directly or to a town.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotableLocation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_to_city: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_town: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_to_town: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldMap {
    pub cities: Vec<City>,
    pub routes: Vec<Route>,
    pub towns: Vec<Town>,
    pub hamlets: Vec<Hamlet>,
    pub notable_locations: Vec<NotableLocation>,
}

impl WorldMap {
    /// Reject negative or non-finite travel times. Dangling references are
    /// allowed here and surface as resolution failures at lookup time.
    pub fn validate(&self) -> Result<(), CouncilError> {
        let check = |what: &str, name: &str, days: f64| {
            if days.is_finite() && days >= 0.0 {
                Ok(())
            } else {
                Err(CouncilError::InvalidData(format!(
                    "{what} '{name}' has invalid travel days {days}"
                )))
            }
        };
        for route in &self.routes {
            check("route", &format!("{}-{}", route.from, route.to), route.days)?;
        }
        for town in &self.towns {
            check("town", &town.name, town.days_to_city)?;
        }
        for hamlet in &self.hamlets {
            check("hamlet", &hamlet.name, hamlet.days_to_town)?;
        }
        for notable in &self.notable_locations {
            if let Some(days) = notable.days_to_city {
                check("notable location", &notable.name, days)?;
            }
            if let Some(days) = notable.days_to_town {
                check("notable location", &notable.name, days)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threat {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub known_facts: Vec<String>,
    pub event_chain: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreatRoster {
    #[serde(default)]
    pub threats: Vec<Threat>,
}

impl ThreatRoster {
    pub fn validate(&self) -> Result<(), CouncilError> {
        if let Some(threat) = self.threats.iter().find(|t| t.event_chain.is_empty()) {
            return Err(CouncilError::InvalidData(format!(
                "threat '{}' has an empty event chain",
                threat.id
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Threat> {
        self.threats.iter().find(|t| t.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Army {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub infantry: u32,
    #[serde(default)]
    pub cavalry: u32,
    #[serde(default)]
    pub missile: u32,
    #[serde(default)]
    pub abilities: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArmyRoster {
    #[serde(default)]
    pub armies: Vec<Army>,
}

/// All static data the council runs against.
#[derive(Debug, Clone, Default)]
pub struct CouncilData {
    pub advisors: Vec<Advisor>,
    pub world: WorldMap,
    pub threats: ThreatRoster,
    pub armies: ArmyRoster,
}

impl CouncilData {
    /// Load `council/*.json`, `world.json`, `threats.json` and `armies.json`
    /// from `dir`. Advisors are ordered by file name.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let council_dir = dir.join("council");
        let mut files = Vec::new();
        for entry in fs::read_dir(&council_dir).map_err(|err| {
            anyhow::anyhow!("cannot read advisor directory {}: {err}", council_dir.display())
        })? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();

        let mut advisors = Vec::with_capacity(files.len());
        for path in files {
            advisors.push(read_json::<Advisor>(&path)?);
        }

        let data = Self {
            advisors,
            world: read_json(&dir.join("world.json"))?,
            threats: read_json(&dir.join("threats.json"))?,
            armies: read_json(&dir.join("armies.json"))?,
        };
        data.validate()?;
        Ok(data)
    }

    pub fn validate(&self) -> Result<(), CouncilError> {
        self.world.validate()?;
        self.threats.validate()?;
        let mut seen = std::collections::BTreeSet::new();
        for advisor in &self.advisors {
            if !seen.insert(advisor.id.as_str()) {
                return Err(CouncilError::InvalidData(format!(
                    "duplicate advisor id '{}'",
                    advisor.id
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn advisor(&self, id: &str) -> Option<&Advisor> {
        self.advisors.iter().find(|a| a.id == id)
    }

    #[must_use]
    pub fn public_council(&self) -> Vec<AdvisorPublic> {
        self.advisors.iter().map(Advisor::public_view).collect()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path)
        .map_err(|err| anyhow::anyhow!("cannot read {}: {err}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|err| anyhow::anyhow!("invalid JSON in {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn advisor(id: &str) -> Advisor {
        Advisor {
            id: id.to_string(),
            name: "Lady Vess".to_string(),
            title: "Marshal".to_string(),
            region: "Northmarch".to_string(),
            description: "Veteran of the border wars".to_string(),
            voice_style: "clipped".to_string(),
            public_agenda: "Hold the passes".to_string(),
            private_agenda: "Secure the succession".to_string(),
        }
    }

    #[test]
    fn public_view_never_serializes_private_agenda() {
        let public = advisor("vess").public_view();
        let value = serde_json::to_value(&public).expect("serialize");
        assert!(value.get("private_agenda").is_none());
        assert!(!value.to_string().contains("succession"));
        assert_eq!(value["public_agenda"], "Hold the passes");
    }

    #[test]
    fn notable_location_accepts_town_anchor() {
        let raw = json!({"name": "Old Watchtower", "nearest_town": "Fenwick", "days_to_town": 0.5});
        let notable: NotableLocation = serde_json::from_value(raw).expect("parse");
        assert_eq!(notable.nearest_town.as_deref(), Some("Fenwick"));
        assert!(notable.nearest_city.is_none());
    }

    #[test]
    fn world_validation_rejects_negative_days() {
        let world = WorldMap {
            cities: vec![City { name: "A".into() }, City { name: "B".into() }],
            routes: vec![Route {
                from: "A".into(),
                to: "B".into(),
                days: -1.0,
            }],
            ..WorldMap::default()
        };
        let err = world.validate().expect_err("negative route");
        assert!(err.to_string().contains("invalid travel days"));
    }

    #[test]
    fn threat_roster_rejects_empty_chain() {
        let roster = ThreatRoster {
            threats: vec![Threat {
                id: "plague".into(),
                name: "Grey Plague".into(),
                description: String::new(),
                known_facts: vec![],
                event_chain: vec![],
            }],
        };
        assert!(roster.validate().is_err());
    }

    #[test]
    fn load_reads_data_directory_in_file_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let council = dir.path().join("council");
        fs::create_dir_all(&council).expect("mkdir");
        for id in ["zed", "abel"] {
            fs::write(
                council.join(format!("{id}.json")),
                serde_json::to_vec(&advisor(id)).expect("encode"),
            )
            .expect("write advisor");
        }
        fs::write(
            dir.path().join("world.json"),
            r#"{"cities":[{"name":"A"}],"routes":[]}"#,
        )
        .expect("world");
        fs::write(
            dir.path().join("threats.json"),
            r#"{"threats":[{"id":"t","name":"T","event_chain":["one"]}]}"#,
        )
        .expect("threats");
        fs::write(dir.path().join("armies.json"), r#"{"armies":[]}"#).expect("armies");

        let data = CouncilData::load(dir.path()).expect("load");
        let ids: Vec<_> = data.advisors.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["abel", "zed"]);
        assert!(data.world.towns.is_empty());
        assert_eq!(data.threats.find("t").map(|t| t.event_chain.len()), Some(1));
    }

    #[test]
    fn duplicate_advisor_ids_are_rejected() {
        let data = CouncilData {
            advisors: vec![advisor("vess"), advisor("vess")],
            ..CouncilData::default()
        };
        assert!(data.validate().is_err());
    }
}
