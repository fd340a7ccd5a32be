//! Three-phase staged funding derived from the Realistic scenario.
//!
//! Phases 1 and 2 take fixed shares of investment and timeline; phase 3 takes
//! the remainder of both, so the phases always reconcile exactly with the
//! Realistic total and timeline.

use serde::{Deserialize, Serialize};

use crate::engine::CalculationResult;
use crate::error::EstimateError;

struct PhaseText {
    name: &'static str,
    objective: &'static str,
    milestone: &'static str,
    decision_gate: &'static str,
}

const PHASES: [PhaseText; 3] = [
    PhaseText {
        name: "Phase 1: Validate",
        objective: "Proof of concept, initial customer validation, technical feasibility",
        milestone: "Technical milestone achieved",
        decision_gate: "Technical milestone achieved?",
    },
    PhaseText {
        name: "Phase 2: Build",
        objective: "Product development, market validation, initial sales",
        milestone: "Market traction confirmed",
        decision_gate: "Market traction confirmed?",
    },
    PhaseText {
        name: "Phase 3: Scale",
        objective: "Market expansion, team scaling, operations buildout",
        milestone: "Unit economics proven",
        decision_gate: "Unit economics proven?",
    },
];

/// (investment share, duration share) for phases 1 and 2.
const PHASE_SHARES: [(f64, f64); 2] = [(0.15, 0.20), (0.35, 0.40)];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingPhase {
    pub phase: u8,
    pub name: String,
    pub investment: i64,
    pub duration: u32,
    pub objective: String,
    pub milestone: String,
    pub decision_gate: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedFunding {
    pub phases: Vec<FundingPhase>,
    pub total_investment: i64,
    pub total_timeline: u32,
}

/// Split the Realistic scenario into Validate / Build / Scale phases.
pub fn staged_funding(result: &CalculationResult) -> Result<StagedFunding, EstimateError> {
    let realistic = result.realistic()?;
    let total = realistic.total_investment;
    let timeline = realistic.timeline;

    let mut amounts = [0i64; 3];
    let mut durations = [0u32; 3];
    for (i, (invest_share, time_share)) in PHASE_SHARES.iter().enumerate() {
        amounts[i] = (total as f64 * invest_share).round() as i64;
        durations[i] = (f64::from(timeline) * time_share).round() as u32;
    }
    amounts[2] = total - amounts[0] - amounts[1];
    // Shares sum below 1, so the remainder cannot underflow for any timeline.
    durations[2] = timeline.saturating_sub(durations[0] + durations[1]);

    let phases = PHASES
        .iter()
        .zip(amounts.into_iter().zip(durations))
        .enumerate()
        .map(|(i, (text, (investment, duration)))| FundingPhase {
            phase: i as u8 + 1,
            name: text.name.to_string(),
            investment,
            duration,
            objective: text.objective.to_string(),
            milestone: text.milestone.to_string(),
            decision_gate: text.decision_gate.to_string(),
        })
        .collect();

    Ok(StagedFunding {
        phases,
        total_investment: total,
        total_timeline: timeline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EngineInput, RegulatoryEnvironment, Stage, TargetMarket, TeamStatus, TechnologyType};
    use crate::engine::{Engine, ScenarioName};
    use proptest::prelude::*;

    fn input(tech: TechnologyType, stage: Stage, market: TargetMarket) -> EngineInput {
        EngineInput {
            technology_type: tech,
            current_stage: stage,
            target_market: market,
            geographic_location: "Remote US".into(),
            team_status: TeamStatus::Partial,
            regulatory_environment: RegulatoryEnvironment::None,
        }
    }

    #[test]
    fn worked_example_phases() {
        let result = Engine::default().calculate(&input(
            TechnologyType::SoftwareSaas,
            Stage::Prototype,
            TargetMarket::LargeEnterprise,
        ));
        let staged = staged_funding(&result).unwrap();
        let got: Vec<_> = staged.phases.iter().map(|p| (p.investment, p.duration)).collect();
        assert_eq!(got, vec![(230_700, 5), (538_300, 10), (769_000, 9)]);
        assert_eq!(staged.phases[0].name, "Phase 1: Validate");
        assert_eq!(staged.phases[2].decision_gate, "Unit economics proven?");
        assert_eq!(staged.total_investment, 1_538_000);
    }

    #[test]
    fn missing_realistic_is_fatal() {
        let mut result = Engine::default().calculate(&input(
            TechnologyType::Biotech,
            Stage::Concept,
            TargetMarket::Payers,
        ));
        result.scenarios.truncate(1);
        assert_eq!(
            staged_funding(&result).unwrap_err(),
            EstimateError::MissingScenario(ScenarioName::Realistic)
        );
    }

    proptest! {
        #[test]
        fn phases_reconcile_exactly(
            tech in prop::sample::select(TechnologyType::ALL),
            stage in prop::sample::select(Stage::ALL),
            market in prop::sample::select(TargetMarket::ALL),
        ) {
            let result = Engine::default().calculate(&input(tech, stage, market));
            let realistic = result.realistic().unwrap().clone();
            let staged = staged_funding(&result).unwrap();

            prop_assert_eq!(staged.phases.len(), 3);
            let invest: i64 = staged.phases.iter().map(|p| p.investment).sum();
            let months: u32 = staged.phases.iter().map(|p| p.duration).sum();
            prop_assert_eq!(invest, realistic.total_investment);
            prop_assert_eq!(months, realistic.timeline);
        }
    }
}
