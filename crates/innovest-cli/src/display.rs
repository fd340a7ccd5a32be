//! Terminal rendering: catalog listing, mapping traces, estimate cards, and the
//! saved-calculation table.

use std::sync::Arc;

use arrow::array::{Array, Int64Array, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use innovest_core::catalog::{MARKET_GROUPS, TECHNOLOGY_GROUPS};
use innovest_core::report::format_amount;
use innovest_core::{Coefficients, RegulatoryEnvironment, Stage, TeamStatus, format_currency};
use innovest_import::MappingTrace;
use innovest_import::mapper::Decision;
use innovest_store::SavedCalculation;

// ── Estimate card sections ──

const PROJECT: &[&str] = &["project_id", "title", "scenario"];

const INPUTS: &[&str] = &[
    "technology_type",
    "current_stage",
    "target_market",
    "geographic_location",
    "team_status",
    "regulatory_environment",
];

const COSTS: &[&str] = &[
    "total",
    "development",
    "technical",
    "regulatory",
    "gtm_year1",
    "gtm_years23",
    "risk_buffer",
];

const TIMELINE: &[&str] = &["timeline_months", "break_even_months"];

// ── Catalog ──

pub fn print_catalog(coefficients: &Coefficients) {
    println!("Technology types");
    for (group, members) in TECHNOLOGY_GROUPS {
        println!("  {group}");
        for t in *members {
            println!("    {t}");
        }
    }
    println!();

    print_flat("Stages", Stage::ALL);

    println!("Target markets");
    for (group, members) in MARKET_GROUPS {
        println!("  {group}");
        for m in *members {
            println!("    {m}");
        }
    }
    println!();

    print_flat("Team status", TeamStatus::ALL);
    print_flat("Regulatory environment", RegulatoryEnvironment::ALL);

    println!("Locations (coefficients {})", coefficients.version());
    for loc in coefficients.locations() {
        println!("  {:<32} {:.2}", loc.name, loc.index);
    }
}

fn print_flat<T: std::fmt::Display>(header: &str, values: &[T]) {
    println!("{header}");
    for v in values {
        println!("  {v}");
    }
    println!();
}

// ── Mapping trace ──

pub fn format_trace(trace: &MappingTrace) -> String {
    trace
        .fields
        .iter()
        .map(|f| {
            let by = match &f.decided_by {
                Decision::Keyword(k) => format!("keyword \"{k}\""),
                Decision::Default => "default".to_string(),
            };
            format!("  {:<24} {:<40} {by}", f.field, f.value)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Estimate cards ──

/// One estimate row as a vertical card grouped by section.
pub fn estimate_card(batch: &RecordBatch, row: usize) -> Vec<String> {
    let mut lines = Vec::new();
    card_section(&mut lines, batch, row, "Project", PROJECT);
    card_section(&mut lines, batch, row, "Inputs", INPUTS);
    card_section(&mut lines, batch, row, "Costs", COSTS);
    card_section(&mut lines, batch, row, "Timeline", TIMELINE);
    lines
}

fn card_section(lines: &mut Vec<String>, batch: &RecordBatch, row: usize, header: &str, cols: &[&str]) {
    let schema = batch.schema();
    let mut body = Vec::new();
    for &col_name in cols {
        let Ok(idx) = schema.index_of(col_name) else {
            continue;
        };
        let col = batch.column(idx);
        if row >= col.len() || col.is_null(row) {
            continue;
        }
        let rendered = match schema.field(idx).data_type() {
            DataType::Utf8 => col
                .as_any()
                .downcast_ref::<StringArray>()
                .map(|a| a.value(row).to_string()),
            DataType::Int64 => col
                .as_any()
                .downcast_ref::<Int64Array>()
                .map(|a| format_amount(a.value(row))),
            DataType::UInt32 => col
                .as_any()
                .downcast_ref::<UInt32Array>()
                .map(|a| format!("{} months", a.value(row))),
            other => Some(format!("({other})")),
        };
        if let Some(value) = rendered {
            body.push(format!("  {col_name:<24} {value}"));
        }
    }
    if body.is_empty() {
        return;
    }
    lines.push(header.to_string());
    lines.extend(body);
    lines.push(String::new());
}

// ── Saved calculations ──

pub fn saved_table(saved: &[SavedCalculation]) -> anyhow::Result<String> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("saved_at", DataType::Utf8, false),
        Field::new("technology", DataType::Utf8, false),
        Field::new("stage", DataType::Utf8, false),
        Field::new("realistic", DataType::Utf8, false),
    ]));

    let realistic: Vec<String> = saved
        .iter()
        .map(|s| {
            s.result
                .realistic()
                .map_or_else(|_| "-".to_string(), |r| format_currency(r.total_investment))
        })
        .collect();

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from_iter_values(saved.iter().map(|s| s.id.as_str()))),
            Arc::new(StringArray::from_iter_values(
                saved.iter().map(|s| s.saved_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            )),
            Arc::new(StringArray::from_iter_values(
                saved.iter().map(|s| s.inputs.technology_type.label()),
            )),
            Arc::new(StringArray::from_iter_values(
                saved.iter().map(|s| s.inputs.current_stage.label()),
            )),
            Arc::new(StringArray::from_iter_values(realistic)),
        ],
    )?;
    Ok(arrow::util::pretty::pretty_format_batches(&[batch])?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use innovest_core::{
        Engine, EngineInput, ProjectEstimate, TargetMarket, TechnologyType, estimate_batch,
    };
    use innovest_import::mapper::FieldDecision;

    fn input() -> EngineInput {
        EngineInput {
            technology_type: TechnologyType::SoftwareSaas,
            current_stage: Stage::Prototype,
            target_market: TargetMarket::LargeEnterprise,
            geographic_location: "Remote US".into(),
            team_status: TeamStatus::Partial,
            regulatory_environment: RegulatoryEnvironment::None,
        }
    }

    #[test]
    fn trace_lines_name_the_deciding_keyword() {
        let trace = MappingTrace {
            fields: vec![
                FieldDecision {
                    field: "technologyType".into(),
                    value: "Robotics/Automation".into(),
                    decided_by: Decision::Keyword("robotics".into()),
                },
                FieldDecision {
                    field: "currentStage".into(),
                    value: "Prototype (TRL 4-6)".into(),
                    decided_by: Decision::Default,
                },
            ],
        };
        let text = format_trace(&trace);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("technologyType"));
        assert!(lines[0].ends_with("keyword \"robotics\""));
        assert!(lines[1].ends_with("default"));
    }

    #[test]
    fn card_groups_columns_and_formats_by_type() {
        let result = Engine::default().calculate(&input());
        let batch = estimate_batch(&[ProjectEstimate {
            project_id: "p1",
            title: "Alpha",
            result: &result,
        }])
        .unwrap();

        let lines = estimate_card(&batch, 1);
        assert_eq!(lines[0], "Project");
        assert!(lines.iter().any(|l| l.contains("scenario") && l.ends_with("Realistic")));
        assert!(lines.contains(&"Costs".to_string()));
        let total = format_amount(result.scenarios[1].total_investment);
        assert!(lines.iter().any(|l| l.starts_with("  total") && l.ends_with(&total)));
        let timeline = format!("{} months", result.scenarios[1].timeline);
        assert!(lines.iter().any(|l| l.contains("timeline_months") && l.ends_with(&timeline)));
    }

    #[test]
    fn card_for_missing_row_is_empty() {
        let result = Engine::default().calculate(&input());
        let batch = estimate_batch(&[ProjectEstimate {
            project_id: "p1",
            title: "Alpha",
            result: &result,
        }])
        .unwrap();
        assert!(estimate_card(&batch, 99).is_empty());
    }

    #[test]
    fn saved_table_lists_each_calculation() {
        let result = Engine::default().calculate(&input());
        let saved = vec![SavedCalculation {
            id: "abc123".into(),
            inputs: input(),
            result: result.clone(),
            saved_at: Utc::now(),
        }];
        let table = saved_table(&saved).unwrap();
        assert!(table.contains("abc123"));
        assert!(table.contains("Software/SaaS Platform"));
        assert!(table.contains(&format_currency(result.scenarios[1].total_investment)));
    }
}
