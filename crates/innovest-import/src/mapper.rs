//! Keyword mapping from a parsed project to an estimation input.
//!
//! Each field has an ordered rule list; the first rule whose keyword occurs as
//! a substring of the project's lowercased corpus decides the value. Fields
//! with no match take the injected default. Mapping never fails.

use innovest_core::{EngineInput, RegulatoryEnvironment, Stage, TargetMarket, TeamStatus, TechnologyType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::project::VianeoProject;

/// A keyword and the value it selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordRule<T> {
    pub keyword: &'static str,
    pub value: T,
}

const fn rule<T>(keyword: &'static str, value: T) -> KeywordRule<T> {
    KeywordRule { keyword, value }
}

pub const TECHNOLOGY_RULES: &[KeywordRule<TechnologyType>] = {
    use TechnologyType::*;
    &[
        rule("software", SoftwareSaas),
        rule("saas", SoftwareSaas),
        rule("ai", AiMachineLearning),
        rule("machine", AiMachineLearning),
        rule("biotech", Biotech),
        rule("pharma", Biotech),
        rule("medtech", MedicalDevices),
        rule("device", MedicalDevices),
        rule("robotics", Robotics),
        rule("hardware", Hardware),
        rule("iot", Iot),
        rule("energy", CleanEnergy),
        rule("climate", ClimateTech),
        rule("nuclear", Nuclear),
        rule("agriculture", AgriTech),
        rule("fintech", FinTech),
        rule("blockchain", Blockchain),
    ]
};

pub const STAGE_RULES: &[KeywordRule<Stage>] = {
    use Stage::*;
    &[
        rule("concept", Concept),
        rule("idea", Concept),
        rule("prototype", Prototype),
        rule("mvp", Prototype),
        rule("pilot", Pilot),
        rule("market", MarketReady),
        rule("production", MarketReady),
    ]
};

pub const MARKET_RULES: &[KeywordRule<TargetMarket>] = {
    use TargetMarket::*;
    &[
        rule("enterprise", LargeEnterprise),
        rule("fortune", LargeEnterprise),
        rule("smb", SmallBusiness),
        rule("small", SmallBusiness),
        rule("government", FederalGovernment),
        rule("defense", Military),
        rule("hospital", HospitalSystems),
        rule("pharma", PharmaCompanies),
        rule("insurance", Payers),
        rule("consumer", MassMarketConsumer),
        rule("retail", MassMarketConsumer),
        rule("marketplace", TwoSidedMarketplace),
        rule("platform", MultiSidedPlatform),
        rule("manufacturing", Manufacturing),
        rule("energy", EnergyUtilities),
        rule("agriculture", AgricultureFood),
    ]
};

pub const TEAM_RULES: &[KeywordRule<TeamStatus>] = &[
    rule("no team", TeamStatus::NoTeam),
    rule("none", TeamStatus::NoTeam),
    rule("partial", TeamStatus::Partial),
    rule("core", TeamStatus::Partial),
    rule("full", TeamStatus::Full),
    rule("complete", TeamStatus::Full),
];

pub const REGULATORY_RULES: &[KeywordRule<RegulatoryEnvironment>] = &[
    rule("fda", RegulatoryEnvironment::Heavy),
    rule("epa", RegulatoryEnvironment::Heavy),
    rule("hipaa", RegulatoryEnvironment::Moderate),
    rule("moderate", RegulatoryEnvironment::Moderate),
    rule("heavy", RegulatoryEnvironment::Heavy),
    rule("none", RegulatoryEnvironment::None),
    rule("low", RegulatoryEnvironment::None),
];

/// City/region keywords and the location-table name they resolve to.
pub const LOCATION_RULES: &[(&[&str], &str)] = &[
    (&["bay area", "san francisco", "silicon valley"], "Bay Area (San Francisco)"),
    (&["austin"], "Austin"),
    (&["new york", "nyc"], "New York City"),
    (&["london"], "London"),
    (&["remote"], "Remote US"),
];

/// Values used when no rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapperDefaults {
    pub technology_type: TechnologyType,
    pub current_stage: Stage,
    pub target_market: TargetMarket,
    pub geographic_location: String,
    pub team_status: TeamStatus,
    pub regulatory_environment: RegulatoryEnvironment,
}

impl Default for MapperDefaults {
    fn default() -> Self {
        Self {
            technology_type: TechnologyType::SoftwareSaas,
            current_stage: Stage::Prototype,
            target_market: TargetMarket::MidMarket,
            geographic_location: "Remote US".to_string(),
            team_status: TeamStatus::Partial,
            regulatory_environment: RegulatoryEnvironment::None,
        }
    }
}

/// What decided a mapped field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "keyword")]
pub enum Decision {
    Keyword(String),
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDecision {
    pub field: String,
    pub value: String,
    pub decided_by: Decision,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingTrace {
    pub fields: Vec<FieldDecision>,
}

impl MappingTrace {
    fn record(&mut self, field: &str, value: impl ToString, keyword: Option<&str>) {
        self.fields.push(FieldDecision {
            field: field.to_string(),
            value: value.to_string(),
            decided_by: keyword.map_or(Decision::Default, |k| Decision::Keyword(k.to_string())),
        });
    }

    pub fn defaulted(&self) -> impl Iterator<Item = &FieldDecision> {
        self.fields.iter().filter(|f| f.decided_by == Decision::Default)
    }
}

/// First rule whose keyword occurs in `corpus`.
pub fn first_match<T: Copy>(corpus: &str, rules: &[KeywordRule<T>]) -> Option<KeywordRule<T>> {
    rules.iter().find(|r| corpus.contains(r.keyword)).copied()
}

#[derive(Debug, Clone, Default)]
pub struct InputMapper {
    defaults: MapperDefaults,
}

impl InputMapper {
    pub fn new(defaults: MapperDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &MapperDefaults {
        &self.defaults
    }

    pub fn map(&self, project: &VianeoProject) -> EngineInput {
        self.map_with_trace(project).0
    }

    /// Map and report which keyword (or default) decided each field.
    pub fn map_with_trace(&self, project: &VianeoProject) -> (EngineInput, MappingTrace) {
        let corpus = project.corpus();
        let d = &self.defaults;
        let mut trace = MappingTrace::default();

        let technology_type = pick(&corpus, TECHNOLOGY_RULES, d.technology_type, "technologyType", &mut trace);
        let current_stage = pick(&corpus, STAGE_RULES, d.current_stage, "currentStage", &mut trace);
        let target_market = pick(&corpus, MARKET_RULES, d.target_market, "targetMarket", &mut trace);

        let location = LOCATION_RULES
            .iter()
            .find_map(|(keys, name)| keys.iter().find(|k| corpus.contains(**k)).map(|k| (*k, *name)));
        let geographic_location = match location {
            Some((keyword, name)) => {
                trace.record("geographicLocation", name, Some(keyword));
                name.to_string()
            }
            None => {
                trace.record("geographicLocation", &d.geographic_location, None);
                d.geographic_location.clone()
            }
        };

        let team_status = pick(&corpus, TEAM_RULES, d.team_status, "teamStatus", &mut trace);
        let regulatory_environment = pick(
            &corpus,
            REGULATORY_RULES,
            d.regulatory_environment,
            "regulatoryEnvironment",
            &mut trace,
        );

        debug!(
            project = %project.id,
            defaulted = trace.defaulted().count(),
            "mapped project to inputs"
        );

        let input = EngineInput {
            technology_type,
            current_stage,
            target_market,
            geographic_location,
            team_status,
            regulatory_environment,
        };
        (input, trace)
    }
}

fn pick<T: Copy + std::fmt::Display>(
    corpus: &str,
    rules: &[KeywordRule<T>],
    default: T,
    field: &str,
    trace: &mut MappingTrace,
) -> T {
    match first_match(corpus, rules) {
        Some(r) => {
            trace.record(field, r.value, Some(r.keyword));
            r.value
        }
        None => {
            trace.record(field, default, None);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::FieldSource;
    use proptest::prelude::*;

    fn project(title: &str, fields: &[(&str, &str)]) -> VianeoProject {
        let mut p = VianeoProject::new("p1", title);
        for (k, v) in fields {
            p.set_field(*k, *v, FieldSource::LabelPair);
        }
        p
    }

    #[test]
    fn empty_project_takes_defaults() {
        let (input, trace) = InputMapper::default().map_with_trace(&project("", &[]));
        assert_eq!(input.technology_type, TechnologyType::SoftwareSaas);
        assert_eq!(input.current_stage, Stage::Prototype);
        assert_eq!(input.target_market, TargetMarket::MidMarket);
        assert_eq!(input.geographic_location, "Remote US");
        assert_eq!(input.team_status, TeamStatus::Partial);
        assert_eq!(input.regulatory_environment, RegulatoryEnvironment::None);
        assert_eq!(trace.fields.len(), 6);
        assert_eq!(trace.defaulted().count(), 6);
    }

    #[test]
    fn keywords_resolve_fields() {
        let p = project(
            "Smart insulin device",
            &[
                ("Stage", "Pilot with two hospitals"),
                ("Team", "Full team in Boston"),
                ("Regulation", "FDA 510(k)"),
                ("Office", "San Francisco"),
            ],
        );
        let (input, trace) = InputMapper::default().map_with_trace(&p);
        assert_eq!(input.technology_type, TechnologyType::MedicalDevices);
        assert_eq!(input.current_stage, Stage::Pilot);
        assert_eq!(input.target_market, TargetMarket::HospitalSystems);
        assert_eq!(input.geographic_location, "Bay Area (San Francisco)");
        assert_eq!(input.team_status, TeamStatus::Full);
        assert_eq!(input.regulatory_environment, RegulatoryEnvironment::Heavy);
        assert_eq!(
            trace.fields[0].decided_by,
            Decision::Keyword("device".into())
        );
        assert_eq!(trace.fields[3].value, "Bay Area (San Francisco)");
        assert_eq!(trace.defaulted().count(), 0);
    }

    #[test]
    fn first_declared_rule_wins_not_first_in_text() {
        // "machine" appears before "software" in the text, but software is declared first
        let p = project("Machine vision software", &[]);
        assert_eq!(InputMapper::default().map(&p).technology_type, TechnologyType::SoftwareSaas);
        // "ai" is a plain substring match, so "retail" selects AI before any later rule
        let p = project("Retail analytics", &[]);
        let input = InputMapper::default().map(&p);
        assert_eq!(input.technology_type, TechnologyType::AiMachineLearning);
        assert_eq!(input.target_market, TargetMarket::MassMarketConsumer);
    }

    #[test]
    fn stage_market_keyword_overlap() {
        // "marketplace" contains "market", which maps the stage to Market Ready
        let p = project("Freelancer marketplace", &[]);
        let input = InputMapper::default().map(&p);
        assert_eq!(input.current_stage, Stage::MarketReady);
        assert_eq!(input.target_market, TargetMarket::TwoSidedMarketplace);
    }

    #[test]
    fn location_rules_in_order() {
        let p = project("Offices in London and NYC", &[]);
        assert_eq!(InputMapper::default().map(&p).geographic_location, "New York City");
        let p = project("Fully remote", &[]);
        assert_eq!(InputMapper::default().map(&p).geographic_location, "Remote US");
    }

    #[test]
    fn injected_defaults_apply() {
        let defaults = MapperDefaults {
            target_market: TargetMarket::Universities,
            geographic_location: "Berlin".into(),
            ..MapperDefaults::default()
        };
        let input = InputMapper::new(defaults).map(&project("", &[]));
        assert_eq!(input.target_market, TargetMarket::Universities);
        assert_eq!(input.geographic_location, "Berlin");
    }

    #[test]
    fn trace_serializes_decisions() {
        let (_, trace) = InputMapper::default().map_with_trace(&project("nuclear", &[]));
        let v = serde_json::to_value(&trace).unwrap();
        assert_eq!(v["fields"][0]["decidedBy"]["kind"], "keyword");
        assert_eq!(v["fields"][0]["decidedBy"]["keyword"], "nuclear");
        assert_eq!(v["fields"][1]["decidedBy"]["kind"], "default");
    }

    proptest! {
        #[test]
        fn mapping_is_deterministic(
            title in "[a-zA-Z ]{0,40}",
            values in prop::collection::vec("[a-z ]{0,30}", 0..5),
        ) {
            let mut p = VianeoProject::new("p", title);
            for (i, v) in values.iter().enumerate() {
                p.set_field(format!("f{i}"), v.clone(), FieldSource::JsonProperty);
            }
            let mapper = InputMapper::default();
            prop_assert_eq!(mapper.map_with_trace(&p), mapper.map_with_trace(&p));
        }
    }
}
