//! Deterministic three-scenario investment estimation.
//!
//! The engine is a total function over [`EngineInput`]: every enumerated value
//! has a coefficient entry (enforced when [`Coefficients`] is built), so
//! `calculate` never fails. Development cost is the base table cost scaled by
//! the scenario's development multiplier; regulatory cost is taken unscaled;
//! year-1 go-to-market cost is scaled by the scenario's GTM multiplier. The
//! location index and team multiplier are carried on the result as context and
//! do not enter the totals.
//!
//! Each monetary component is rounded once, when it is emitted, and the total
//! is the sum of the emitted components.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::EngineInput;
use crate::coefficients::Coefficients;
use crate::error::EstimateError;

/// Share of scenario development cost reported as the technical subset.
pub const TECHNICAL_SHARE: f64 = 0.15;
/// Risk buffer as a share of scenario development cost.
pub const RISK_BUFFER_RATE: f64 = 0.40;
/// Confidence interval bounds as shares of the Realistic total (±15%).
pub const CONFIDENCE_LOW: f64 = 0.85;
pub const CONFIDENCE_HIGH: f64 = 1.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScenarioName {
    Optimistic,
    Realistic,
    Conservative,
}

impl ScenarioName {
    pub const ALL: [ScenarioName; 3] = [
        ScenarioName::Optimistic,
        ScenarioName::Realistic,
        ScenarioName::Conservative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioName::Optimistic => "Optimistic",
            ScenarioName::Realistic => "Realistic",
            ScenarioName::Conservative => "Conservative",
        }
    }

    /// Fixed multipliers for this scenario.
    pub fn config(self) -> ScenarioConfig {
        match self {
            ScenarioName::Optimistic => ScenarioConfig {
                development: 0.7,
                gtm: 0.6,
                timeline: 0.75,
                break_even: 1.5,
            },
            ScenarioName::Realistic => ScenarioConfig {
                development: 1.2,
                gtm: 1.2,
                timeline: 1.0,
                break_even: 1.75,
            },
            ScenarioName::Conservative => ScenarioConfig {
                development: 1.8,
                gtm: 2.0,
                timeline: 1.5,
                break_even: 2.25,
            },
        }
    }
}

impl fmt::Display for ScenarioName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioConfig {
    pub development: f64,
    pub gtm: f64,
    pub timeline: f64,
    pub break_even: f64,
}

/// Per-scenario cost components, in whole currency units.
///
/// `technical` is a subset of `development` and `gtm_years23` is informational;
/// neither is part of `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub development: i64,
    pub technical: i64,
    pub regulatory: i64,
    pub gtm_year1: i64,
    pub gtm_years23: i64,
    pub risk_buffer: i64,
    pub total: i64,
    pub break_even: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub name: ScenarioName,
    pub total_investment: i64,
    /// Stage baseline months scaled by the scenario's timeline multiplier.
    pub timeline: u32,
    /// Months to break even: `round(timeline * break_even multiplier)`, taken
    /// from this scenario's adjusted `timeline` rather than the stage
    /// baseline. Optimistic at Prototype gives `round(18 * 1.5) = 27`.
    pub break_even: u32,
    pub breakdown: CostBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub min: i64,
    pub max: i64,
}

impl ConfidenceInterval {
    pub fn around(total: i64) -> Self {
        let t = total as f64;
        Self {
            min: (t * CONFIDENCE_LOW).round() as i64,
            max: (t * CONFIDENCE_HIGH).round() as i64,
        }
    }
}

/// Output of one estimation call. Scenarios are in [`ScenarioName::ALL`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub scenarios: Vec<ScenarioResult>,
    pub confidence_interval: ConfidenceInterval,
    pub inputs: EngineInput,
    pub location_index: f64,
    pub team_multiplier: f64,
}

impl CalculationResult {
    pub fn scenario(&self, name: ScenarioName) -> Option<&ScenarioResult> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// The Realistic scenario, which staged funding and cost allocation derive from.
    ///
    /// Always present on engine output; a result loaded from elsewhere may lack it.
    pub fn realistic(&self) -> Result<&ScenarioResult, EstimateError> {
        self.scenario(ScenarioName::Realistic)
            .ok_or(EstimateError::MissingScenario(ScenarioName::Realistic))
    }
}

/// The estimation engine over a fixed coefficient set.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    coefficients: Coefficients,
}

impl Engine {
    pub fn new(coefficients: Coefficients) -> Self {
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    pub fn calculate(&self, input: &EngineInput) -> CalculationResult {
        let scenarios: Vec<ScenarioResult> = ScenarioName::ALL
            .iter()
            .map(|&name| self.scenario(input, name))
            .collect();
        let realistic_total = scenarios[1].total_investment;

        debug!(
            technology = %input.technology_type,
            stage = %input.current_stage,
            market = %input.target_market,
            realistic_total,
            "calculated estimate"
        );

        CalculationResult {
            confidence_interval: ConfidenceInterval::around(realistic_total),
            location_index: self.coefficients.location_index(&input.geographic_location),
            team_multiplier: self.coefficients.team_multiplier(input.team_status),
            inputs: input.clone(),
            scenarios,
        }
    }

    fn scenario(&self, input: &EngineInput, name: ScenarioName) -> ScenarioResult {
        let cfg = name.config();
        let c = &self.coefficients;
        let gtm = c.gtm_cost(input.target_market);

        let development = c.development_cost(input.technology_type, input.current_stage) * cfg.development;
        let regulatory = c.regulatory_cost(input.technology_type);
        let gtm_year1 = gtm.year1 * cfg.gtm;
        let gtm_years23 = gtm.years23 * cfg.gtm;

        let timeline = (f64::from(c.stage_months(input.current_stage)) * cfg.timeline).round() as u32;
        let break_even = (f64::from(timeline) * cfg.break_even).round() as u32;

        let development = round_money(development);
        let regulatory = round_money(regulatory);
        let gtm_year1 = round_money(gtm_year1);
        let risk_buffer = round_money(development as f64 * RISK_BUFFER_RATE);
        let total = development + regulatory + gtm_year1 + risk_buffer;

        ScenarioResult {
            name,
            total_investment: total,
            timeline,
            break_even,
            breakdown: CostBreakdown {
                development,
                technical: round_money(development as f64 * TECHNICAL_SHARE),
                regulatory,
                gtm_year1,
                gtm_years23: round_money(gtm_years23),
                risk_buffer,
                total,
                break_even,
            },
        }
    }
}

fn round_money(v: f64) -> i64 {
    v.round() as i64
}
