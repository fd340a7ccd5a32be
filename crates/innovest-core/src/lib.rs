pub mod allocation;
pub mod catalog;
pub mod coefficients;
pub mod engine;
pub mod error;
pub mod funding;
pub mod matrix;
pub mod report;
pub mod schema;

pub use allocation::{CostAllocation, allocate};
pub use catalog::{EngineInput, RawInput, RegulatoryEnvironment, Stage, TargetMarket, TeamStatus, TechnologyType};
pub use coefficients::Coefficients;
pub use engine::{CalculationResult, Engine, ScenarioName, ScenarioResult};
pub use error::{CoefficientError, EstimateError, InputError};
pub use funding::{StagedFunding, staged_funding};
pub use matrix::{CellValue, MatrixScale, NeedsMatrix, NormalizedMatrix};
pub use report::{Report, format_currency};
pub use schema::{ProjectEstimate, estimate_batch, estimate_schema};
