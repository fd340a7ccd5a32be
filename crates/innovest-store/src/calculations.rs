//! Saved calculations: an input/result pair stored under a generated id and
//! shared through a locator URL.

use chrono::{DateTime, Utc};
use innovest_core::{CalculationResult, EngineInput};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::StoreError;
use crate::kv::KvStore;

/// Key namespace for saved calculations.
pub const KEY_PREFIX: &str = "calc:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCalculation {
    pub id: String,
    pub inputs: EngineInput,
    pub result: CalculationResult,
    pub saved_at: DateTime<Utc>,
}

/// Handle returned from a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRef {
    pub id: String,
    pub locator: String,
}

pub struct CalculationStore<K> {
    kv: K,
    share_base: String,
}

impl<K: KvStore> CalculationStore<K> {
    /// `share_base` is the URL locators are built on.
    pub fn new(kv: K, share_base: impl Into<String>) -> Self {
        Self {
            kv,
            share_base: share_base.into(),
        }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// `{share_base}?load={id}`, or `&load=` when the base already has a query.
    pub fn locator(&self, id: &str) -> String {
        let sep = if self.share_base.contains('?') { '&' } else { '?' };
        format!("{}{sep}load={id}", self.share_base)
    }

    pub fn save(&self, inputs: &EngineInput, result: &CalculationResult) -> Result<SavedRef, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let saved = SavedCalculation {
            id: id.clone(),
            inputs: inputs.clone(),
            result: result.clone(),
            saved_at: Utc::now(),
        };
        self.kv.set(&key(&id), &serde_json::to_string(&saved)?)?;
        info!(id, "saved calculation");
        Ok(SavedRef {
            locator: self.locator(&id),
            id,
        })
    }

    pub fn load(&self, id: &str) -> Result<SavedCalculation, StoreError> {
        let text = self
            .kv
            .get(&key(id))?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Every saved calculation, oldest first.
    pub fn list(&self) -> Result<Vec<SavedCalculation>, StoreError> {
        let mut saved = Vec::new();
        for k in self.kv.list(KEY_PREFIX)? {
            if let Some(text) = self.kv.get(&k)? {
                saved.push(serde_json::from_str::<SavedCalculation>(&text)?);
            }
        }
        saved.sort_by(|a, b| a.saved_at.cmp(&b.saved_at).then_with(|| a.id.cmp(&b.id)));
        Ok(saved)
    }
}

fn key(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{FileStore, MemoryStore};
    use innovest_core::{Engine, RegulatoryEnvironment, Stage, TargetMarket, TeamStatus, TechnologyType};

    fn input(tech: TechnologyType) -> EngineInput {
        EngineInput {
            technology_type: tech,
            current_stage: Stage::Prototype,
            target_market: TargetMarket::LargeEnterprise,
            geographic_location: "Remote US".into(),
            team_status: TeamStatus::Partial,
            regulatory_environment: RegulatoryEnvironment::None,
        }
    }

    #[test]
    fn save_then_load_returns_same_pair() {
        let store = CalculationStore::new(MemoryStore::new(), "https://example.org/estimate");
        let inputs = input(TechnologyType::SoftwareSaas);
        let result = Engine::default().calculate(&inputs);

        let saved = store.save(&inputs, &result).unwrap();
        assert_eq!(saved.id.len(), 32);
        assert!(saved.id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(saved.locator, format!("https://example.org/estimate?load={}", saved.id));

        let loaded = store.load(&saved.id).unwrap();
        assert_eq!(loaded.inputs, inputs);
        assert_eq!(loaded.result, result);
    }

    #[test]
    fn ids_are_unique_per_save() {
        let store = CalculationStore::new(MemoryStore::new(), "http://localhost");
        let inputs = input(TechnologyType::SoftwareSaas);
        let result = Engine::default().calculate(&inputs);
        let a = store.save(&inputs, &result).unwrap();
        let b = store.save(&inputs, &result).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn load_unknown_id_is_not_found() {
        let store = CalculationStore::new(MemoryStore::new(), "http://localhost");
        assert!(matches!(store.load("nope"), Err(StoreError::NotFound(id)) if id == "nope"));
    }

    #[test]
    fn locator_appends_to_existing_query() {
        let store = CalculationStore::new(MemoryStore::new(), "http://host/app?lang=en");
        assert_eq!(store.locator("abc"), "http://host/app?lang=en&load=abc");
    }

    #[test]
    fn list_is_ordered_by_save_time_and_ignores_other_keys() {
        let store = CalculationStore::new(MemoryStore::new(), "http://localhost");
        store.kv().set("ai:cached", "{}").unwrap();
        let engine = Engine::default();
        let first = input(TechnologyType::Biotech);
        let second = input(TechnologyType::Robotics);
        let a = store.save(&first, &engine.calculate(&first)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let b = store.save(&second, &engine.calculate(&second)).unwrap();

        let listed = store.list().unwrap();
        let ids: Vec<_> = listed.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), b.id.as_str()]);
        assert!(listed[0].saved_at <= listed[1].saved_at);
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let inputs = input(TechnologyType::Hardware);
        let result = Engine::default().calculate(&inputs);
        let saved = {
            let store = CalculationStore::new(FileStore::open(dir.path()).unwrap(), "http://localhost");
            store.save(&inputs, &result).unwrap()
        };
        let store = CalculationStore::new(FileStore::open(dir.path()).unwrap(), "http://localhost");
        assert_eq!(store.load(&saved.id).unwrap().result, result);
    }
}
