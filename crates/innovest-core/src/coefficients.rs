//! Coefficient tables driving the estimation engine.
//!
//! Tables are configuration, not logic: [`Coefficients::builtin`] ships the
//! reference set, and a replacement set can be loaded from JSON. Every loaded
//! set is checked for completeness over the enumerated domains, so lookups
//! after construction cannot miss, and for positive, bounded values, so
//! estimates stay positive and their sums cannot overflow.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{Stage, TargetMarket, TeamStatus, TechnologyType};
use crate::error::CoefficientError;

/// Location cost index applied when a name is not in the table.
pub const NEUTRAL_LOCATION_INDEX: f64 = 1.0;

/// Largest accepted cost entry.
pub const MAX_COST: f64 = 1.0e12;
/// Largest accepted stage duration.
pub const MAX_STAGE_MONTHS: u32 = 600;
/// Largest accepted team multiplier or location index.
pub const MAX_FACTOR: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GtmCost {
    pub year1: f64,
    /// Years 2-3 spend; informational, never part of a total.
    pub years23: f64,
    #[serde(default)]
    pub sales_cycle: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub index: f64,
}

/// Plain, unvalidated table data as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoefficientTables {
    pub version: String,
    pub development: BTreeMap<TechnologyType, BTreeMap<Stage, f64>>,
    pub regulatory: BTreeMap<TechnologyType, f64>,
    pub gtm: BTreeMap<TargetMarket, GtmCost>,
    pub stage_months: BTreeMap<Stage, u32>,
    pub locations: Vec<Location>,
    pub team_multipliers: BTreeMap<TeamStatus, f64>,
}

/// A complete, validated coefficient set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CoefficientTables", into = "CoefficientTables")]
pub struct Coefficients {
    tables: CoefficientTables,
}

impl TryFrom<CoefficientTables> for Coefficients {
    type Error = CoefficientError;

    fn try_from(tables: CoefficientTables) -> Result<Self, Self::Error> {
        for &tech in TechnologyType::ALL {
            let stages = tables
                .development
                .get(&tech)
                .ok_or_else(|| incomplete("development", tech))?;
            for &stage in Stage::ALL {
                if !stages.contains_key(&stage) {
                    return Err(incomplete("development", format!("{tech} / {stage}")));
                }
            }
            if !tables.regulatory.contains_key(&tech) {
                return Err(incomplete("regulatory", tech));
            }
        }
        for &market in TargetMarket::ALL {
            if !tables.gtm.contains_key(&market) {
                return Err(incomplete("gtm", market));
            }
        }
        for &stage in Stage::ALL {
            if !tables.stage_months.contains_key(&stage) {
                return Err(incomplete("stageMonths", stage));
            }
        }
        for &team in TeamStatus::ALL {
            if !tables.team_multipliers.contains_key(&team) {
                return Err(incomplete("teamMultipliers", team));
            }
        }
        check_ranges(&tables)?;
        Ok(Self { tables })
    }
}

fn check_ranges(tables: &CoefficientTables) -> Result<(), CoefficientError> {
    for (tech, stages) in &tables.development {
        for (stage, &cost) in stages {
            in_range("development", format!("{tech} / {stage}"), cost, MAX_COST)?;
        }
    }
    for (tech, &cost) in &tables.regulatory {
        in_range("regulatory", tech, cost, MAX_COST)?;
    }
    for (market, cost) in &tables.gtm {
        in_range("gtm", format!("{market} / year1"), cost.year1, MAX_COST)?;
        in_range("gtm", format!("{market} / years23"), cost.years23, MAX_COST)?;
    }
    for (stage, &months) in &tables.stage_months {
        if months == 0 || months > MAX_STAGE_MONTHS {
            return Err(out_of_range("stageMonths", stage, f64::from(months)));
        }
    }
    for (team, &factor) in &tables.team_multipliers {
        in_range("teamMultipliers", team, factor, MAX_FACTOR)?;
    }
    for loc in &tables.locations {
        in_range("locations", &loc.name, loc.index, MAX_FACTOR)?;
    }
    Ok(())
}

/// Accept finite values in `(0, max]`.
fn in_range(
    table: &'static str,
    key: impl ToString,
    value: f64,
    max: f64,
) -> Result<(), CoefficientError> {
    if value.is_finite() && value > 0.0 && value <= max {
        Ok(())
    } else {
        Err(out_of_range(table, key, value))
    }
}

fn out_of_range(table: &'static str, key: impl ToString, value: f64) -> CoefficientError {
    CoefficientError::OutOfRange {
        table,
        key: key.to_string(),
        value,
    }
}

impl From<Coefficients> for CoefficientTables {
    fn from(c: Coefficients) -> Self {
        c.tables
    }
}

fn incomplete(table: &'static str, key: impl ToString) -> CoefficientError {
    CoefficientError::Incomplete {
        table,
        key: key.to_string(),
    }
}

impl Default for Coefficients {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Coefficients {
    /// The reference coefficient set shipped with the engine.
    pub fn builtin() -> Self {
        let development = DEVELOPMENT
            .iter()
            .map(|(tech, costs)| {
                let by_stage = Stage::ALL.iter().copied().zip(costs.iter().copied()).collect();
                (*tech, by_stage)
            })
            .collect();
        let regulatory = REGULATORY.iter().copied().collect();
        let gtm = GTM
            .iter()
            .map(|&(market, year1, years23, cycle)| {
                (
                    market,
                    GtmCost {
                        year1,
                        years23,
                        sales_cycle: cycle.to_string(),
                    },
                )
            })
            .collect();
        let stage_months = Stage::ALL.iter().copied().zip(STAGE_MONTHS).collect();
        let locations = LOCATIONS
            .iter()
            .map(|&(name, index)| Location {
                name: name.to_string(),
                index,
            })
            .collect();
        let team_multipliers = TeamStatus::ALL.iter().copied().zip(TEAM_MULTIPLIERS).collect();

        Self {
            tables: CoefficientTables {
                version: BUILTIN_VERSION.to_string(),
                development,
                regulatory,
                gtm,
                stage_months,
                locations,
                team_multipliers,
            },
        }
    }

    /// Parse and validate a coefficient set from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, CoefficientError> {
        let tables: CoefficientTables = serde_json::from_str(json)?;
        Self::try_from(tables)
    }

    /// Load and validate a coefficient set from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, CoefficientError> {
        let json = std::fs::read_to_string(path).map_err(|source| CoefficientError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let coefficients = Self::from_json_str(&json)?;
        info!(
            path = %path.display(),
            version = %coefficients.version(),
            "loaded coefficient tables"
        );
        Ok(coefficients)
    }

    pub fn version(&self) -> &str {
        &self.tables.version
    }

    pub fn tables(&self) -> &CoefficientTables {
        &self.tables
    }

    // ── Lookups ──

    /// Base development cost for a technology at a stage.
    pub fn development_cost(&self, tech: TechnologyType, stage: Stage) -> f64 {
        self.tables.development[&tech][&stage]
    }

    pub fn regulatory_cost(&self, tech: TechnologyType) -> f64 {
        self.tables.regulatory[&tech]
    }

    pub fn gtm_cost(&self, market: TargetMarket) -> &GtmCost {
        &self.tables.gtm[&market]
    }

    /// Baseline development timeline in months.
    pub fn stage_months(&self, stage: Stage) -> u32 {
        self.tables.stage_months[&stage]
    }

    pub fn team_multiplier(&self, team: TeamStatus) -> f64 {
        self.tables.team_multipliers[&team]
    }

    /// Cost index for a named location; unknown names are neutral (1.0).
    pub fn location_index(&self, name: &str) -> f64 {
        self.resolve_location(name)
            .map_or(NEUTRAL_LOCATION_INDEX, |loc| loc.index)
    }

    /// Exact-name lookup in the location table.
    pub fn resolve_location(&self, name: &str) -> Option<&Location> {
        self.tables.locations.iter().find(|loc| loc.name == name)
    }

    pub fn locations(&self) -> &[Location] {
        &self.tables.locations
    }
}

// ── Reference data ──

const BUILTIN_VERSION: &str = "2024.1";

/// Development cost per stage, in `Stage::ALL` order.
const DEVELOPMENT: &[(TechnologyType, [f64; 4])] = {
    use TechnologyType::*;
    &[
        (SoftwareSaas, [200_000.0, 350_000.0, 500_000.0, 150_000.0]),
        (AiMachineLearning, [250_000.0, 400_000.0, 600_000.0, 200_000.0]),
        (FinTech, [300_000.0, 500_000.0, 700_000.0, 250_000.0]),
        (EdTech, [200_000.0, 350_000.0, 500_000.0, 150_000.0]),
        (Blockchain, [300_000.0, 450_000.0, 650_000.0, 200_000.0]),
        (Biotech, [800_000.0, 2_000_000.0, 3_500_000.0, 500_000.0]),
        (MedicalDevices, [700_000.0, 1_500_000.0, 2_500_000.0, 400_000.0]),
        (Diagnostics, [600_000.0, 1_200_000.0, 2_000_000.0, 350_000.0]),
        (DigitalHealth, [350_000.0, 600_000.0, 900_000.0, 250_000.0]),
        (SyntheticBiology, [900_000.0, 2_200_000.0, 4_000_000.0, 600_000.0]),
        (Hardware, [400_000.0, 750_000.0, 1_200_000.0, 300_000.0]),
        (Robotics, [600_000.0, 1_200_000.0, 2_000_000.0, 400_000.0]),
        (Iot, [350_000.0, 650_000.0, 1_000_000.0, 250_000.0]),
        (Semiconductors, [1_000_000.0, 2_500_000.0, 4_500_000.0, 700_000.0]),
        (AdvancedMaterials, [700_000.0, 1_500_000.0, 2_500_000.0, 450_000.0]),
        (CleanEnergy, [600_000.0, 1_500_000.0, 2_500_000.0, 400_000.0]),
        (ClimateTech, [500_000.0, 1_100_000.0, 1_800_000.0, 350_000.0]),
        (WaterTech, [500_000.0, 1_000_000.0, 1_700_000.0, 300_000.0]),
        (Nuclear, [1_200_000.0, 3_000_000.0, 5_000_000.0, 800_000.0]),
        (AgriTech, [400_000.0, 800_000.0, 1_300_000.0, 250_000.0]),
        (FoodTech, [500_000.0, 1_000_000.0, 1_600_000.0, 300_000.0]),
        (Aquaculture, [500_000.0, 1_000_000.0, 1_700_000.0, 300_000.0]),
        (Aerospace, [1_000_000.0, 2_500_000.0, 4_000_000.0, 700_000.0]),
        (Space, [1_200_000.0, 3_000_000.0, 5_000_000.0, 800_000.0]),
        (Construction, [400_000.0, 800_000.0, 1_300_000.0, 250_000.0]),
        (SupplyChain, [350_000.0, 650_000.0, 1_000_000.0, 200_000.0]),
        (AdvancedManufacturing, [600_000.0, 1_300_000.0, 2_200_000.0, 400_000.0]),
    ]
};

const REGULATORY: &[(TechnologyType, f64)] = {
    use TechnologyType::*;
    &[
        (SoftwareSaas, 50_000.0),
        (AiMachineLearning, 75_000.0),
        (FinTech, 200_000.0),
        (EdTech, 50_000.0),
        (Blockchain, 150_000.0),
        (Biotech, 2_500_000.0),
        (MedicalDevices, 1_500_000.0),
        (Diagnostics, 1_200_000.0),
        (DigitalHealth, 400_000.0),
        (SyntheticBiology, 2_800_000.0),
        (Hardware, 200_000.0),
        (Robotics, 300_000.0),
        (Iot, 150_000.0),
        (Semiconductors, 400_000.0),
        (AdvancedMaterials, 350_000.0),
        (CleanEnergy, 500_000.0),
        (ClimateTech, 300_000.0),
        (WaterTech, 350_000.0),
        (Nuclear, 3_000_000.0),
        (AgriTech, 250_000.0),
        (FoodTech, 400_000.0),
        (Aquaculture, 350_000.0),
        (Aerospace, 1_500_000.0),
        (Space, 2_000_000.0),
        (Construction, 200_000.0),
        (SupplyChain, 150_000.0),
        (AdvancedManufacturing, 300_000.0),
    ]
};

/// (market, year 1, years 2-3, typical sales cycle)
const GTM: &[(TargetMarket, f64, f64, &str)] = {
    use TargetMarket::*;
    &[
        (LargeEnterprise, 750_000.0, 4_500_000.0, "9-18 months"),
        (MidMarket, 550_000.0, 3_200_000.0, "6-12 months"),
        (SmallBusiness, 450_000.0, 2_500_000.0, "3-6 months"),
        (FederalGovernment, 900_000.0, 4_800_000.0, "12-24 months"),
        (StateLocalGovernment, 650_000.0, 3_500_000.0, "9-18 months"),
        (Military, 1_000_000.0, 5_200_000.0, "18-36 months"),
        (InternationalGov, 850_000.0, 4_600_000.0, "12-24 months"),
        (HospitalSystems, 800_000.0, 4_200_000.0, "12-18 months"),
        (PharmaCompanies, 850_000.0, 4_500_000.0, "12-24 months"),
        (Payers, 750_000.0, 4_000_000.0, "12-18 months"),
        (Providers, 500_000.0, 2_800_000.0, "6-12 months"),
        (ResearchInstitutions, 550_000.0, 3_000_000.0, "6-12 months"),
        (Universities, 500_000.0, 2_800_000.0, "6-12 months"),
        (K12, 400_000.0, 2_200_000.0, "6-18 months"),
        (MassMarketConsumer, 700_000.0, 5_000_000.0, "Immediate"),
        (PremiumConsumer, 600_000.0, 3_800_000.0, "1-3 months"),
        (Prosumer, 450_000.0, 2_600_000.0, "1-2 months"),
        (FinancialServices, 800_000.0, 4_300_000.0, "12-18 months"),
        (EnergyUtilities, 750_000.0, 4_000_000.0, "12-24 months"),
        (Manufacturing, 600_000.0, 3_400_000.0, "9-15 months"),
        (AgricultureFood, 500_000.0, 2_800_000.0, "6-12 months"),
        (RealEstate, 550_000.0, 3_000_000.0, "6-15 months"),
        (NonProfit, 350_000.0, 1_800_000.0, "6-12 months"),
        (SocialEnterprise, 400_000.0, 2_200_000.0, "6-12 months"),
        (Foundations, 450_000.0, 2_400_000.0, "6-15 months"),
        (DevelopmentOrgs, 500_000.0, 2_600_000.0, "9-18 months"),
        (TwoSidedMarketplace, 800_000.0, 5_500_000.0, "6-18 months"),
        (MultiSidedPlatform, 850_000.0, 5_800_000.0, "6-18 months"),
        (NetworkEffects, 750_000.0, 5_200_000.0, "6-18 months"),
        (EmergingMarkets, 450_000.0, 2_800_000.0, "6-18 months"),
        (GlobalMultiRegion, 950_000.0, 5_500_000.0, "12-24 months"),
    ]
};

/// Months per stage, in `Stage::ALL` order.
const STAGE_MONTHS: [u32; 4] = [30, 24, 18, 12];

/// In `TeamStatus::ALL` order.
const TEAM_MULTIPLIERS: [f64; 3] = [1.3, 1.1, 1.0];

const LOCATIONS: &[(&str, f64)] = &[
    ("Bay Area (San Francisco)", 1.35),
    ("New York City", 1.30),
    ("Seattle", 1.25),
    ("Boston", 1.22),
    ("Los Angeles", 1.20),
    ("Austin", 1.05),
    ("Denver", 1.03),
    ("Remote US", 1.00),
    ("Chicago", 0.98),
    ("Atlanta", 0.95),
    ("Miami", 0.92),
    ("Toronto", 0.88),
    ("London", 1.15),
    ("Berlin", 0.85),
    ("Singapore", 1.10),
    ("Tel Aviv", 1.05),
    ("São Paulo", 0.65),
    ("Bangalore", 0.45),
    ("Warsaw", 0.55),
    ("Cape Town", 0.50),
];
