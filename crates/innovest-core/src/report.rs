//! Investment report: the data behind each section plus a plain-text rendering.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

use crate::allocation::allocate;
use crate::catalog::{EngineInput, MARKET_GROUPS, TECHNOLOGY_GROUPS, TargetMarket, TechnologyType};
use crate::engine::{CalculationResult, ConfidenceInterval, RISK_BUFFER_RATE, ScenarioResult};
use crate::error::EstimateError;
use crate::funding::StagedFunding;
use crate::matrix::{MatrixScale, NeedsMatrix};

/// Number of needs listed in the needs section, highest cost first.
pub const TOP_NEEDS: usize = 5;

/// Compact currency: `$1.54M`, `$843K`, `$512`.
pub fn format_currency(value: i64) -> String {
    let v = value as f64;
    if value.abs() >= 1_000_000 {
        format!("${:.2}M", v / 1_000_000.0)
    } else if value.abs() >= 1_000 {
        format!("${:.0}K", v / 1_000.0)
    } else {
        format!("${value}")
    }
}

/// Full amount with thousands separators: `$1,538,000`.
pub fn format_amount(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    if value < 0 {
        out.push('-');
    }
    out.push('$');
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub inputs: EngineInput,
    pub location_index: f64,
    pub team_multiplier: f64,
    pub recommended_investment: i64,
    pub timeline_months: u32,
    pub break_even_months: u32,
    pub confidence_interval: ConfidenceInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeedsSection {
    pub scale: MatrixScale,
    pub personas: Vec<String>,
    pub needs: Vec<String>,
    pub weights: Vec<Vec<f64>>,
    /// Highest-cost needs, descending.
    pub top_needs: Vec<(String, i64)>,
    pub per_persona: Vec<(String, i64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub summary: ExecutiveSummary,
    pub scenarios: Vec<ScenarioResult>,
    pub funding: StagedFunding,
    pub methodology: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs: Option<NeedsSection>,
}

impl Report {
    pub fn build(
        result: &CalculationResult,
        funding: &StagedFunding,
        matrix: Option<&NeedsMatrix>,
    ) -> Result<Self, EstimateError> {
        let realistic = result.realistic()?;

        let needs = match matrix {
            Some(m) => {
                let normalized = m.normalize();
                let allocation = allocate(result, &normalized)?;
                let top_needs = allocation
                    .needs_by_cost()
                    .into_iter()
                    .take(TOP_NEEDS)
                    .map(|(need, cost)| (need.to_string(), cost))
                    .collect();
                Some(NeedsSection {
                    scale: normalized.scale,
                    top_needs,
                    per_persona: allocation.per_persona.into_iter().collect(),
                    personas: normalized.personas,
                    needs: normalized.needs,
                    weights: normalized.weights,
                })
            }
            None => None,
        };

        Ok(Self {
            summary: ExecutiveSummary {
                inputs: result.inputs.clone(),
                location_index: result.location_index,
                team_multiplier: result.team_multiplier,
                recommended_investment: realistic.total_investment,
                timeline_months: realistic.timeline,
                break_even_months: realistic.break_even,
                confidence_interval: result.confidence_interval,
            },
            scenarios: result.scenarios.clone(),
            funding: funding.clone(),
            methodology: methodology_lines(),
            needs,
        })
    }

    pub fn render_text(&self) -> String {
        self.to_string()
    }

    fn write_text(&self, out: &mut impl fmt::Write) -> fmt::Result {
        let s = &self.summary;
        writeln!(out, "Innovation Investment Report")?;
        writeln!(out)?;

        heading(out, "Executive Summary")?;
        writeln!(out, "Technology: {}", s.inputs.technology_type)?;
        writeln!(out, "Stage: {}", s.inputs.current_stage)?;
        writeln!(out, "Market: {}", s.inputs.target_market)?;
        writeln!(
            out,
            "Location: {} (cost index {:.2})",
            s.inputs.geographic_location, s.location_index
        )?;
        writeln!(
            out,
            "Team: {} (multiplier {:.2})",
            s.inputs.team_status, s.team_multiplier
        )?;
        writeln!(out, "Regulatory: {}", s.inputs.regulatory_environment)?;
        writeln!(out)?;
        writeln!(
            out,
            "Recommended Investment: {}",
            format_currency(s.recommended_investment)
        )?;
        writeln!(out, "Timeline: {} months", s.timeline_months)?;
        writeln!(out, "Break-even: {} months", s.break_even_months)?;
        writeln!(
            out,
            "Confidence Range: {} - {}",
            format_currency(s.confidence_interval.min),
            format_currency(s.confidence_interval.max)
        )?;
        writeln!(out)?;

        heading(out, "Investment Breakdown")?;
        for sc in &self.scenarios {
            let b = &sc.breakdown;
            writeln!(out, "{}", sc.name)?;
            writeln!(out, "  Total: {}", format_amount(sc.total_investment))?;
            writeln!(out, "  Development: {}", format_amount(b.development))?;
            writeln!(out, "    of which technical: {}", format_amount(b.technical))?;
            writeln!(out, "  Regulatory: {}", format_amount(b.regulatory))?;
            writeln!(out, "  Go-to-Market (year 1): {}", format_amount(b.gtm_year1))?;
            writeln!(out, "  Go-to-Market (years 2-3, excluded): {}", format_amount(b.gtm_years23))?;
            writeln!(out, "  Risk Buffer: {}", format_amount(b.risk_buffer))?;
            writeln!(out, "  Timeline: {} months", sc.timeline)?;
            writeln!(out, "  Break-even: {} months", sc.break_even)?;
        }
        writeln!(out)?;

        heading(out, "Staged Funding Model")?;
        for phase in &self.funding.phases {
            let pct = if self.funding.total_investment == 0 {
                0
            } else {
                (phase.investment as f64 * 100.0 / self.funding.total_investment as f64).round() as i64
            };
            writeln!(out, "{}", phase.name)?;
            writeln!(out, "  Investment: {} ({pct}%)", format_currency(phase.investment))?;
            writeln!(out, "  Duration: {} months", phase.duration)?;
            writeln!(out, "  Objective: {}", phase.objective)?;
            writeln!(out, "  Milestone: {}", phase.milestone)?;
            writeln!(out, "  Decision gate: {}", phase.decision_gate)?;
        }
        writeln!(out)?;

        heading(out, "Methodology")?;
        for line in &self.methodology {
            writeln!(out, "{line}")?;
        }

        if let Some(needs) = &self.needs {
            writeln!(out)?;
            heading(out, "Needs Qualification Matrix")?;
            writeln!(out, "Scale detected: {}", needs.scale)?;
            writeln!(out, "Top needs (cost estimate):")?;
            for (need, cost) in &needs.top_needs {
                writeln!(out, "  - {need}: {}", format_amount(*cost))?;
            }
            writeln!(out, "Persona aggregate costs:")?;
            for (persona, cost) in &needs.per_persona {
                writeln!(out, "  - {persona}: {}", format_amount(*cost))?;
            }
            writeln!(out, "Weights (0..1):")?;
            write!(out, "  {:<12}", "Persona")?;
            for need in &needs.needs {
                write!(out, " {:>10}", truncate_chars(need, 10))?;
            }
            writeln!(out)?;
            for (persona, row) in needs.personas.iter().zip(&needs.weights) {
                write!(out, "  {:<12}", truncate_chars(persona, 12))?;
                for w in row {
                    write!(out, " {w:>10.2}")?;
                }
                writeln!(out)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f)
    }
}

fn heading(out: &mut impl fmt::Write, title: &str) -> fmt::Result {
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "=".repeat(title.chars().count()))
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn methodology_lines() -> Vec<String> {
    vec![
        "Estimates are drawn from versioned coefficient tables covering:".to_string(),
        format!(
            "  - {} technology types across {} categories",
            TechnologyType::ALL.len(),
            TECHNOLOGY_GROUPS.len()
        ),
        format!(
            "  - {} market segments across {} groups",
            TargetMarket::ALL.len(),
            MARKET_GROUPS.len()
        ),
        "  - geographic cost indices (unlisted locations are neutral at 1.0)".to_string(),
        "  - team readiness multipliers and regulatory cost by technology".to_string(),
        "Core formula:".to_string(),
        format!(
            "  TOTAL = DEVELOPMENT + REGULATORY + GTM (YEAR 1) + RISK BUFFER ({:.0}% OF DEVELOPMENT)",
            RISK_BUFFER_RATE * 100.0
        ),
        "  Scenario multipliers scale development, go-to-market and timeline.".to_string(),
        "  Confidence range is the Realistic total -15% / +15%.".to_string(),
    ]
}
