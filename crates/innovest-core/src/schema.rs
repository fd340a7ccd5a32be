//! Arrow schema for flattened estimate rows: one row per (project, scenario).

use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use crate::engine::CalculationResult;

/// A calculation tagged with the project it was computed for.
#[derive(Debug, Clone, Copy)]
pub struct ProjectEstimate<'a> {
    pub project_id: &'a str,
    pub title: &'a str,
    pub result: &'a CalculationResult,
}

/// Schema for estimate rows.
pub fn estimate_schema() -> Schema {
    Schema::new(vec![
        Field::new("project_id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("technology_type", DataType::Utf8, false),
        Field::new("current_stage", DataType::Utf8, false),
        Field::new("target_market", DataType::Utf8, false),
        Field::new("geographic_location", DataType::Utf8, false),
        Field::new("team_status", DataType::Utf8, false),
        Field::new("regulatory_environment", DataType::Utf8, false),
        Field::new("scenario", DataType::Utf8, false),
        Field::new("total", DataType::Int64, false),
        Field::new("development", DataType::Int64, false),
        Field::new("technical", DataType::Int64, false),
        Field::new("regulatory", DataType::Int64, false),
        Field::new("gtm_year1", DataType::Int64, false),
        Field::new("gtm_years23", DataType::Int64, false),
        Field::new("risk_buffer", DataType::Int64, false),
        Field::new("timeline_months", DataType::UInt32, false),
        Field::new("break_even_months", DataType::UInt32, false),
    ])
}

/// Flatten estimates into a single batch, scenarios in result order.
pub fn estimate_batch(estimates: &[ProjectEstimate<'_>]) -> Result<RecordBatch, ArrowError> {
    let mut text: [Vec<String>; 9] = Default::default();
    let mut money: [Vec<i64>; 7] = Default::default();
    let mut months: [Vec<u32>; 2] = Default::default();

    for e in estimates {
        let inputs = &e.result.inputs;
        for s in &e.result.scenarios {
            let b = &s.breakdown;
            let row_text = [
                e.project_id.to_string(),
                e.title.to_string(),
                inputs.technology_type.to_string(),
                inputs.current_stage.to_string(),
                inputs.target_market.to_string(),
                inputs.geographic_location.clone(),
                inputs.team_status.to_string(),
                inputs.regulatory_environment.to_string(),
                s.name.to_string(),
            ];
            for (col, v) in text.iter_mut().zip(row_text) {
                col.push(v);
            }
            let row_money = [
                s.total_investment,
                b.development,
                b.technical,
                b.regulatory,
                b.gtm_year1,
                b.gtm_years23,
                b.risk_buffer,
            ];
            for (col, v) in money.iter_mut().zip(row_money) {
                col.push(v);
            }
            months[0].push(s.timeline);
            months[1].push(s.break_even);
        }
    }

    let columns: Vec<ArrayRef> = text
        .into_iter()
        .map(|col| Arc::new(StringArray::from(col)) as ArrayRef)
        .chain(
            money
                .into_iter()
                .map(|col| Arc::new(Int64Array::from(col)) as ArrayRef),
        )
        .chain(
            months
                .into_iter()
                .map(|col| Arc::new(UInt32Array::from(col)) as ArrayRef),
        )
        .collect();

    let schema: SchemaRef = Arc::new(estimate_schema());
    RecordBatch::try_new(schema, columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EngineInput, RegulatoryEnvironment, Stage, TargetMarket, TeamStatus, TechnologyType};
    use crate::engine::Engine;
    use arrow::array::Array;

    #[test]
    fn estimate_schema_has_expected_fields() {
        let schema = estimate_schema();
        assert_eq!(schema.fields().len(), 18);
        assert!(schema.field_with_name("project_id").is_ok());
        assert!(schema.field_with_name("gtm_years23").is_ok());
        assert_eq!(
            schema.field_with_name("total").unwrap().data_type(),
            &DataType::Int64
        );
    }

    #[test]
    fn one_row_per_project_scenario() {
        let engine = Engine::default();
        let input = EngineInput {
            technology_type: TechnologyType::SoftwareSaas,
            current_stage: Stage::Prototype,
            target_market: TargetMarket::LargeEnterprise,
            geographic_location: "Remote US".into(),
            team_status: TeamStatus::Partial,
            regulatory_environment: RegulatoryEnvironment::None,
        };
        let a = engine.calculate(&input);
        let b = engine.calculate(&EngineInput {
            technology_type: TechnologyType::Biotech,
            ..input
        });
        let batch = estimate_batch(&[
            ProjectEstimate { project_id: "p1", title: "Alpha", result: &a },
            ProjectEstimate { project_id: "p2", title: "Beta", result: &b },
        ])
        .unwrap();

        assert_eq!(batch.num_rows(), 6);
        assert_eq!(batch.num_columns(), 18);

        let scenario = batch
            .column_by_name("scenario")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(scenario.value(1), "Realistic");
        let total = batch
            .column_by_name("total")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(total.value(1), 1_538_000);
        assert_eq!(total.len(), 6);
        let ids = batch
            .column_by_name("project_id")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(ids.value(3), "p2");
    }

    #[test]
    fn empty_input_gives_empty_batch() {
        let batch = estimate_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
    }
}
