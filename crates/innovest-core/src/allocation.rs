//! Distribution of the Realistic scenario's costs across persona × need cells.
//!
//! Each need label selects a driver mix (development / go-to-market /
//! regulatory) by keyword; the cell cost is that mix applied to the Realistic
//! breakdown, scaled by the cell's normalized weight.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::engine::{CalculationResult, CostBreakdown};
use crate::error::EstimateError;
use crate::matrix::NormalizedMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriverWeights {
    pub development: f64,
    pub gtm: f64,
    pub regulatory: f64,
}

impl DriverWeights {
    const REGULATORY: Self = Self::new(0.2, 0.1, 0.7);
    const MARKET: Self = Self::new(0.2, 0.7, 0.1);
    const TECHNOLOGY: Self = Self::new(0.7, 0.2, 0.1);
    const BALANCED: Self = Self::new(0.5, 0.4, 0.1);

    const fn new(development: f64, gtm: f64, regulatory: f64) -> Self {
        Self {
            development,
            gtm,
            regulatory,
        }
    }
}

static REGULATORY_NEED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)regulat|compliance|approval|certif|fda|epa|hipaa|gdpr").unwrap()
});
static MARKET_NEED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)market|sales|pricing|acquisition|demand|distribution|channel|brand|marketing")
        .unwrap()
});
static TECHNOLOGY_NEED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)tech|product|prototype|mvp|build|engineering|performance|scal(ing|ability)|feature")
        .unwrap()
});

/// Driver mix for a need label; regulatory keywords win over market, market
/// over technology.
pub fn driver_weights(need: &str) -> DriverWeights {
    if REGULATORY_NEED.is_match(need) {
        DriverWeights::REGULATORY
    } else if MARKET_NEED.is_match(need) {
        DriverWeights::MARKET
    } else if TECHNOLOGY_NEED.is_match(need) {
        DriverWeights::TECHNOLOGY
    } else {
        DriverWeights::BALANCED
    }
}

/// Cost of one cell given the Realistic breakdown.
pub fn cell_cost(realistic: &CostBreakdown, need: &str, weight: f64) -> i64 {
    let d = driver_weights(need);
    let base = realistic.development as f64 * d.development
        + realistic.gtm_year1 as f64 * d.gtm
        + realistic.regulatory as f64 * d.regulatory;
    (base * weight).round() as i64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostAllocation {
    /// Same shape as the normalized grid.
    pub cells: Vec<Vec<i64>>,
    pub per_persona: BTreeMap<String, i64>,
    pub per_need: BTreeMap<String, i64>,
}

impl CostAllocation {
    pub fn grand_total(&self) -> i64 {
        self.cells.iter().flatten().sum()
    }

    /// Needs ordered by allocated cost, highest first.
    pub fn needs_by_cost(&self) -> Vec<(&str, i64)> {
        let mut needs: Vec<_> = self.per_need.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        needs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        needs
    }
}

/// Allocate the Realistic scenario across every persona × need cell.
pub fn allocate(
    result: &CalculationResult,
    matrix: &NormalizedMatrix,
) -> Result<CostAllocation, EstimateError> {
    let realistic = &result.realistic()?.breakdown;
    let mut per_persona = BTreeMap::new();
    let mut per_need = BTreeMap::new();

    let cells = matrix
        .personas
        .iter()
        .enumerate()
        .map(|(i, persona)| {
            matrix
                .needs
                .iter()
                .enumerate()
                .map(|(j, need)| {
                    let cost = cell_cost(realistic, need, matrix.weight(i, j));
                    *per_persona.entry(persona.clone()).or_insert(0) += cost;
                    *per_need.entry(need.clone()).or_insert(0) += cost;
                    cost
                })
                .collect()
        })
        .collect();

    Ok(CostAllocation {
        cells,
        per_persona,
        per_need,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EngineInput, RegulatoryEnvironment, Stage, TargetMarket, TeamStatus, TechnologyType};
    use crate::engine::{Engine, ScenarioName};
    use crate::matrix::{CellValue, NeedsMatrix};
    use proptest::prelude::*;

    fn saas_result() -> CalculationResult {
        Engine::default().calculate(&EngineInput {
            technology_type: TechnologyType::SoftwareSaas,
            current_stage: Stage::Prototype,
            target_market: TargetMarket::LargeEnterprise,
            geographic_location: "Remote US".into(),
            team_status: TeamStatus::Partial,
            regulatory_environment: RegulatoryEnvironment::None,
        })
    }

    #[test]
    fn driver_priority_order() {
        assert_eq!(driver_weights("FDA approval"), DriverWeights::REGULATORY);
        // regulatory outranks market when both match
        assert_eq!(driver_weights("Market compliance"), DriverWeights::REGULATORY);
        assert_eq!(driver_weights("Pricing"), DriverWeights::MARKET);
        assert_eq!(driver_weights("Product performance"), DriverWeights::TECHNOLOGY);
        assert_eq!(driver_weights("Scalability"), DriverWeights::TECHNOLOGY);
        assert_eq!(driver_weights("Trust"), DriverWeights::BALANCED);
    }

    #[test]
    fn cell_cost_uses_realistic_breakdown() {
        let result = saas_result();
        let r = &result.realistic().unwrap().breakdown;
        // 420000*0.2 + 900000*0.7 + 50000*0.1 = 719000
        assert_eq!(cell_cost(r, "Sales channel", 1.0), 719_000);
        assert_eq!(cell_cost(r, "Sales channel", 0.5), 359_500);
        // 420000*0.5 + 900000*0.4 + 50000*0.1 = 575000
        assert_eq!(cell_cost(r, "Trust", 0.2), 115_000);
        assert_eq!(cell_cost(r, "Trust", 0.0), 0);
    }

    #[test]
    fn allocation_aggregates_by_label() {
        let matrix = NeedsMatrix::new(
            vec!["Clinician".into(), "Admin".into()],
            vec!["Compliance".into(), "Pricing".into()],
            vec![
                vec![CellValue::Number(100.0), CellValue::Number(50.0)],
                vec![CellValue::Number(0.0), CellValue::Number(100.0)],
            ],
        )
        .normalize();
        let alloc = allocate(&saas_result(), &matrix).unwrap();

        // compliance: 420000*0.2 + 900000*0.1 + 50000*0.7 = 209000
        assert_eq!(alloc.cells[0], vec![209_000, 359_500]);
        assert_eq!(alloc.cells[1], vec![0, 719_000]);
        assert_eq!(alloc.per_persona["Clinician"], 568_500);
        assert_eq!(alloc.per_need["Pricing"], 1_078_500);
        assert_eq!(alloc.needs_by_cost()[0], ("Pricing", 1_078_500));
        assert_eq!(alloc.grand_total(), 1_287_500);
    }

    #[test]
    fn missing_realistic_propagates() {
        let mut result = saas_result();
        result.scenarios.retain(|s| s.name == ScenarioName::Optimistic);
        let matrix = NeedsMatrix::new(vec!["P".into()], vec!["N".into()], vec![]).normalize();
        assert!(allocate(&result, &matrix).is_err());
    }

    proptest! {
        #[test]
        fn persona_and_need_sums_agree(
            weights in prop::collection::vec(prop::collection::vec(0.0f64..=1.0, 4), 1..6),
            need_names in prop::collection::vec(
                prop::sample::select(vec!["Compliance", "Pricing", "Build", "Trust"]),
                4,
            ),
        ) {
            let personas: Vec<String> = (0..weights.len()).map(|i| format!("P{}", i % 3)).collect();
            let needs: Vec<String> = need_names.iter().map(|s| s.to_string()).collect();
            let matrix = NormalizedMatrix {
                personas,
                needs,
                weights,
                scale: crate::matrix::MatrixScale::Binary,
            };
            let alloc = allocate(&saas_result(), &matrix).unwrap();
            let by_persona: i64 = alloc.per_persona.values().sum();
            let by_need: i64 = alloc.per_need.values().sum();
            prop_assert_eq!(by_persona, by_need);
            prop_assert_eq!(by_persona, alloc.grand_total());
        }
    }
}
