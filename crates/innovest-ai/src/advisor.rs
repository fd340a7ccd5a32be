//! Advisory suggestions over a [`Classifier`], cached in a [`KvStore`].
//!
//! Every public method degrades to `None` when no classifier is configured or
//! the classifier fails, times out, or answers with something unusable.
//! Failures are logged, never returned.

use std::sync::Arc;
use std::time::Duration;

use innovest_core::{
    CellValue, Coefficients, EngineInput, NeedsMatrix, RegulatoryEnvironment, Stage, TargetMarket,
    TeamStatus, TechnologyType,
};
use innovest_store::{KvStore, StoreError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::AdvisorError;
use crate::classifier::Classifier;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Characters of project text sent for input suggestions.
const INPUT_TEXT_LIMIT: usize = 6000;
/// Characters of context and of serialized matrix sent for refinement.
const CONTEXT_LIMIT: usize = 1200;
const MATRIX_LIMIT: usize = 8000;

/// Proposed input values in the classifier's own words. Only values that
/// parse into the domain are applied; see [`apply_suggestion`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InputSuggestion {
    pub technology_type: Option<String>,
    pub current_stage: Option<String>,
    pub target_market: Option<String>,
    pub geographic_location: Option<String>,
    pub team_status: Option<String>,
    pub regulatory_environment: Option<String>,
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MatrixRefinement {
    personas: Vec<String>,
    needs: Vec<String>,
    values: Vec<Vec<CellValue>>,
    #[serde(default)]
    notes: Vec<String>,
}

/// `ai:{task}:{model}:{xxh3 of payload}`.
pub fn cache_key(task: &str, model: &str, payload: &str) -> String {
    format!("ai:{task}:{model}:{:016x}", xxh3_64(payload.as_bytes()))
}

pub struct Advisor<K> {
    classifier: Option<Arc<dyn Classifier>>,
    cache: K,
    timeout: Duration,
}

impl<K: KvStore> Advisor<K> {
    pub fn new(classifier: Option<Arc<dyn Classifier>>, cache: K) -> Self {
        Self {
            classifier,
            cache,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn enabled(&self) -> bool {
        self.classifier.is_some()
    }

    /// Ask for input values describing `text`.
    ///
    /// An answer that is not JSON comes back as a rationale-only suggestion
    /// and is not cached.
    pub async fn suggest_inputs(&self, text: &str) -> Option<InputSuggestion> {
        let classifier = self.classifier.as_deref()?;
        let text = truncate_chars(text, INPUT_TEXT_LIMIT);
        let key = cache_key("inputs", classifier.model(), text);
        if let Some(hit) = self.cached::<InputSuggestion>(&key) {
            return Some(hit);
        }

        let prompt = format!(
            "You are mapping innovation project text to the fixed dropdowns of an investment calculator. \
             Return a JSON object only, with the fields technologyType, currentStage, targetMarket, \
             teamStatus, regulatoryEnvironment, geographicLocation, rationale.\n\
             Allowed values:\n{}\nText:\n{text}",
            allowed_values()
        );
        let answer = self.ask(classifier, "inputs", &prompt).await?;
        match parse_lenient::<InputSuggestion>(&answer) {
            Some(suggestion) => {
                self.store(&key, &suggestion);
                Some(suggestion)
            }
            None => {
                debug!("classifier answer was not JSON, keeping it as rationale");
                Some(InputSuggestion {
                    rationale: Some(answer.trim().to_string()),
                    ..InputSuggestion::default()
                })
            }
        }
    }

    /// Ask for cleaned-up labels and values for `matrix`. The returned matrix
    /// keeps the original's source; an answer with no personas or needs is
    /// discarded.
    pub async fn refine_matrix(&self, context: &str, matrix: &NeedsMatrix) -> Option<NeedsMatrix> {
        let classifier = self.classifier.as_deref()?;
        let payload = match serde_json::to_string(matrix) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "could not serialize matrix for refinement");
                return None;
            }
        };
        let key = cache_key("matrix", classifier.model(), &payload);

        let refinement = match self.cached::<MatrixRefinement>(&key) {
            Some(hit) => hit,
            None => {
                let prompt = format!(
                    "Given a persona x need matrix and brief project context, normalize the labels and infer \
                     the scale. Return JSON with personas, needs, values and 1-3 short notes. Keep numeric \
                     values numeric.\nContext:\n{}\nMatrix JSON:\n{}",
                    truncate_chars(context, CONTEXT_LIMIT),
                    truncate_chars(&payload, MATRIX_LIMIT)
                );
                let answer = self.ask(classifier, "matrix", &prompt).await?;
                let Some(parsed) = parse_lenient::<MatrixRefinement>(&answer) else {
                    warn!("classifier matrix answer was not usable JSON");
                    return None;
                };
                self.store(&key, &parsed);
                parsed
            }
        };

        if refinement.personas.is_empty() || refinement.needs.is_empty() {
            return None;
        }
        for note in &refinement.notes {
            info!(note = %note, "matrix refinement note");
        }
        let mut refined = NeedsMatrix::new(refinement.personas, refinement.needs, refinement.values);
        refined.source = matrix.source.clone();
        Some(refined)
    }

    async fn ask(&self, classifier: &dyn Classifier, task: &str, prompt: &str) -> Option<String> {
        let result = match tokio::time::timeout(self.timeout, classifier.complete(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(AdvisorError::Timeout(self.timeout)),
        };
        match result {
            Ok(answer) => Some(answer),
            Err(e) => {
                warn!(task, model = classifier.model(), error = %e, "classifier unavailable");
                None
            }
        }
    }

    fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key) {
            Ok(Some(text)) => serde_json::from_str(&text).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "advisor cache read failed");
                None
            }
        }
    }

    fn store<T: Serialize>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(StoreError::from)
            .and_then(|text| self.cache.set(key, &text));
        if let Err(e) = result {
            warn!(key, error = %e, "advisor cache write failed");
        }
    }
}

/// Override the fields of `base` whose suggested value parses into the domain.
/// A suggested location is applied only when it names a location table entry.
pub fn apply_suggestion(
    base: &EngineInput,
    suggestion: &InputSuggestion,
    coefficients: &Coefficients,
) -> EngineInput {
    let mut input = base.clone();
    if let Some(v) = parsed::<TechnologyType>(&suggestion.technology_type) {
        input.technology_type = v;
    }
    if let Some(v) = parsed::<Stage>(&suggestion.current_stage) {
        input.current_stage = v;
    }
    if let Some(v) = parsed::<TargetMarket>(&suggestion.target_market) {
        input.target_market = v;
    }
    if let Some(v) = parsed::<TeamStatus>(&suggestion.team_status) {
        input.team_status = v;
    }
    if let Some(v) = parsed::<RegulatoryEnvironment>(&suggestion.regulatory_environment) {
        input.regulatory_environment = v;
    }
    if let Some(loc) = suggestion
        .geographic_location
        .as_deref()
        .and_then(|name| coefficients.resolve_location(name.trim()))
    {
        input.geographic_location = loc.name.clone();
    }
    input
}

fn parsed<T: std::str::FromStr>(value: &Option<String>) -> Option<T> {
    value.as_deref().and_then(|v| v.parse().ok())
}

/// Parse a JSON object, tolerating prose or code fences around it.
fn parse_lenient<T: DeserializeOwned>(answer: &str) -> Option<T> {
    let trimmed = answer.trim();
    if let Ok(v) = serde_json::from_str(trimmed) {
        return Some(v);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (start < end)
        .then(|| serde_json::from_str(&trimmed[start..=end]).ok())
        .flatten()
}

fn allowed_values() -> String {
    fn line<T: std::fmt::Display>(field: &str, values: &[T]) -> String {
        let labels: Vec<String> = values.iter().map(ToString::to_string).collect();
        format!("- {field}: {}", labels.join(" | "))
    }
    [
        line("technologyType", TechnologyType::ALL),
        line("currentStage", Stage::ALL),
        line("targetMarket", TargetMarket::ALL),
        line("teamStatus", TeamStatus::ALL),
        line("regulatoryEnvironment", RegulatoryEnvironment::ALL),
    ]
    .join("\n")
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
