//! Closed enumerations for the six estimation inputs.
//!
//! Every value carries a canonical display label, which is also its serialized
//! form, so exported JSON round-trips through the same strings a form shows.
//! Display groups exist for presentation only; they never affect computation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($field:literal) {
            $( $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Every value, in catalog order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical display label.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = InputError;

            /// Exact label match first, then a case-insensitive one.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.label() == s)
                    .or_else(|| {
                        Self::ALL
                            .iter()
                            .copied()
                            .find(|v| v.label().eq_ignore_ascii_case(s))
                    })
                    .ok_or_else(|| InputError::Unknown {
                        field: $field,
                        value: s.to_string(),
                    })
            }
        }
    };
}

labelled_enum! {
    /// Technology type of the innovation project.
    TechnologyType ("technologyType") {
        SoftwareSaas => "Software/SaaS Platform",
        AiMachineLearning => "AI/Machine Learning",
        FinTech => "FinTech/Financial Services",
        EdTech => "EdTech/Learning Platform",
        Blockchain => "Blockchain/Web3",
        Biotech => "Biotech/Pharmaceutical",
        MedicalDevices => "Medical Devices/MedTech",
        Diagnostics => "Diagnostics/Lab Tech",
        DigitalHealth => "Digital Health/Telemedicine",
        SyntheticBiology => "Synthetic Biology",
        Hardware => "Hardware/Physical Product",
        Robotics => "Robotics/Automation",
        Iot => "IoT/Connected Devices",
        Semiconductors => "Semiconductors/Electronics",
        AdvancedMaterials => "Advanced Materials",
        CleanEnergy => "Clean Energy/Renewables",
        ClimateTech => "Climate Tech/Carbon",
        WaterTech => "Water/Environmental Tech",
        Nuclear => "Nuclear/Advanced Nuclear",
        AgriTech => "AgriTech/Precision Agriculture",
        FoodTech => "Food Tech/Alternative Protein",
        Aquaculture => "Aquaculture/Blue Economy",
        Aerospace => "Aerospace/Defense",
        Space => "Space Technology",
        Construction => "Construction/PropTech",
        SupplyChain => "Supply Chain/Logistics Tech",
        AdvancedManufacturing => "Advanced Manufacturing",
    }
}

labelled_enum! {
    /// Development stage as a technology readiness band.
    Stage ("currentStage") {
        Concept => "Concept (TRL 1-3)",
        Prototype => "Prototype (TRL 4-6)",
        Pilot => "Pilot (TRL 7-8)",
        MarketReady => "Market Ready (TRL 9)",
    }
}

labelled_enum! {
    /// Primary go-to-market segment.
    TargetMarket ("targetMarket") {
        LargeEnterprise => "Large Enterprise (Fortune 1000)",
        MidMarket => "Mid-Market B2B (500-5000 employees)",
        SmallBusiness => "Small Business B2B (<500 employees)",
        FederalGovernment => "Federal/National Government",
        StateLocalGovernment => "State/Local Government",
        Military => "Military/Defense",
        InternationalGov => "International Gov/Multilateral",
        HospitalSystems => "Hospital Systems/Integrated Delivery",
        PharmaCompanies => "Pharmaceutical/Biotech Companies",
        Payers => "Insurance/Payers",
        Providers => "Individual Providers/Clinics",
        ResearchInstitutions => "Research Institutions/Labs",
        Universities => "Universities/Higher Ed",
        K12 => "K-12 Education Systems",
        MassMarketConsumer => "Mass Market Consumer (B2C)",
        PremiumConsumer => "Premium/Luxury Consumer",
        Prosumer => "Prosumer/Enthusiast Market",
        FinancialServices => "Financial Services/Banking",
        EnergyUtilities => "Energy/Utilities",
        Manufacturing => "Manufacturing/Industrial",
        AgricultureFood => "Agriculture/Food Production",
        RealEstate => "Real Estate/Construction",
        NonProfit => "NGO/Non-Profit Organizations",
        SocialEnterprise => "Social Enterprises",
        Foundations => "Foundations/Philanthropic",
        DevelopmentOrgs => "Development Organizations",
        TwoSidedMarketplace => "Two-Sided Marketplace",
        MultiSidedPlatform => "Multi-Sided Platform",
        NetworkEffects => "Network Effects Business",
        EmergingMarkets => "Emerging Markets Focus",
        GlobalMultiRegion => "Global/Multi-Region",
    }
}

labelled_enum! {
    TeamStatus ("teamStatus") {
        NoTeam => "No team yet",
        Partial => "Partial team",
        Full => "Full team assembled",
    }
}

labelled_enum! {
    RegulatoryEnvironment ("regulatoryEnvironment") {
        None => "None",
        Moderate => "Moderate",
        Heavy => "Heavy (FDA/EPA level)",
    }
}

// ── Display groups ──

pub const TECHNOLOGY_GROUPS: &[(&str, &[TechnologyType])] = {
    use TechnologyType::*;
    &[
        ("Digital & Software", &[SoftwareSaas, AiMachineLearning, FinTech, EdTech, Blockchain]),
        (
            "Healthcare & Life Sciences",
            &[Biotech, MedicalDevices, Diagnostics, DigitalHealth, SyntheticBiology],
        ),
        (
            "Hardware & Manufacturing",
            &[Hardware, Robotics, Iot, Semiconductors, AdvancedMaterials],
        ),
        ("Energy & Environment", &[CleanEnergy, ClimateTech, WaterTech, Nuclear]),
        ("Agriculture & Food", &[AgriTech, FoodTech, Aquaculture]),
        (
            "Industrial & Infrastructure",
            &[Aerospace, Space, Construction, SupplyChain, AdvancedManufacturing],
        ),
    ]
};

pub const MARKET_GROUPS: &[(&str, &[TargetMarket])] = {
    use TargetMarket::*;
    &[
        ("B2B Enterprise", &[LargeEnterprise, MidMarket, SmallBusiness]),
        (
            "Government & Public Sector",
            &[FederalGovernment, StateLocalGovernment, Military, InternationalGov],
        ),
        (
            "Healthcare & Life Sciences",
            &[HospitalSystems, PharmaCompanies, Payers, Providers],
        ),
        ("Research & Education", &[ResearchInstitutions, Universities, K12]),
        ("Consumer Markets", &[MassMarketConsumer, PremiumConsumer, Prosumer]),
        (
            "Industry Specific",
            &[FinancialServices, EnergyUtilities, Manufacturing, AgricultureFood, RealEstate],
        ),
        (
            "Impact & Non-Profit",
            &[NonProfit, SocialEnterprise, Foundations, DevelopmentOrgs],
        ),
        (
            "Platform & Multi-Sided",
            &[TwoSidedMarketplace, MultiSidedPlatform, NetworkEffects],
        ),
        ("Geographic Focus", &[EmergingMarkets, GlobalMultiRegion]),
    ]
};

impl TechnologyType {
    /// Display group this technology is listed under.
    pub fn group(self) -> &'static str {
        group_of(TECHNOLOGY_GROUPS, self)
    }
}

impl TargetMarket {
    /// Display group this market is listed under.
    pub fn group(self) -> &'static str {
        group_of(MARKET_GROUPS, self)
    }
}

fn group_of<T: PartialEq + Copy>(groups: &[(&'static str, &[T])], value: T) -> &'static str {
    groups
        .iter()
        .find(|(_, members)| members.contains(&value))
        .map(|(name, _)| *name)
        .unwrap_or("Other")
}

// ── Input records ──

/// A validated estimation input.
///
/// The five enumerated fields are guaranteed in-domain by construction. The
/// location is free text: names missing from the location table resolve to a
/// neutral cost index of 1.0 rather than being rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInput {
    pub technology_type: TechnologyType,
    pub current_stage: Stage,
    pub target_market: TargetMarket,
    pub geographic_location: String,
    pub team_status: TeamStatus,
    pub regulatory_environment: RegulatoryEnvironment,
}

/// Unvalidated input as received from a form, command line, or JSON payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawInput {
    pub technology_type: Option<String>,
    pub current_stage: Option<String>,
    pub target_market: Option<String>,
    pub geographic_location: Option<String>,
    pub team_status: Option<String>,
    pub regulatory_environment: Option<String>,
}

impl EngineInput {
    /// Validate a raw record: all six fields present, enumerated fields in-domain.
    pub fn from_raw(raw: &RawInput) -> Result<Self, InputError> {
        Ok(Self {
            technology_type: required("technologyType", &raw.technology_type)?.parse()?,
            current_stage: required("currentStage", &raw.current_stage)?.parse()?,
            target_market: required("targetMarket", &raw.target_market)?.parse()?,
            geographic_location: required("geographicLocation", &raw.geographic_location)?
                .to_string(),
            team_status: required("teamStatus", &raw.team_status)?.parse()?,
            regulatory_environment: required(
                "regulatoryEnvironment",
                &raw.regulatory_environment,
            )?
            .parse()?,
        })
    }
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, InputError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(InputError::Missing(field)),
    }
}
