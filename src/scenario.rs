//! Scenario parameter tables.
//!
//! Every scenario-dependent constant of the decision engine lives here and is
//! looked up once per activation.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::agent::{BusinessCategory, FarmerType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ScenarioKind {
    #[default]
    Basic,
    Trend,
    B2,
    A1,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 4] = [
        ScenarioKind::Basic,
        ScenarioKind::Trend,
        ScenarioKind::B2,
        ScenarioKind::A1,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScenarioKind::Basic => "Basic",
            ScenarioKind::Trend => "Trend",
            ScenarioKind::B2 => "B2",
            ScenarioKind::A1 => "A1",
        }
    }

    pub fn params(self) -> ScenarioParams {
        ScenarioParams::for_kind(self)
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ScenarioKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown scenario '{value}' (expected Basic, Trend, B2 or A1)"))
    }
}

/// Which units leave private use when their owner sells a single unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NatureRule {
    /// Any unit inside the reserve zone.
    ReserveZone,
    /// Reserve-zone units whose suitability is below the threshold.
    MarginalReserveZone { max_suitability: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProtectionPolicy {
    /// No programme: landscape features are left alone.
    Inactive,
    /// Non-hobby owners may cut features on suitable land.
    CutOnly { min_cut_suitability: f64 },
    /// Owners may cut features on highly suitable land, or plant on poor land.
    CutOrPlant {
        min_cut_suitability: f64,
        cut_reluctance: f64,
        max_plant_suitability: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioParams {
    pub kind: ScenarioKind,
    pub exogenous_stop: f64,
    pub growth_bonus: f64,
    pub growth_bonus_expansionist: f64,
    pub index_growth: f64,
    pub yearly_stop_quota: f64,
    /// Added to 1 and multiplied into the shrink rate of owners holding
    /// reserve-zone land.
    pub reserve_pressure: f64,
    /// National-landscape and diversifier stop modifiers.
    pub regional_stop_modifiers: bool,
    /// Exiting owners may flag poor land for the reserve and abandon it.
    pub marginal_land_abandonment: bool,
    /// Small exiting holdings in green surroundings may go to urban newcomers.
    pub urban_newcomers: bool,
    /// Single-unit sellers offer reserve-zone land first.
    pub prefer_reserve_sale: bool,
    /// Historical overwrite: the expand feedback is always 1.
    pub neutral_expand_feedback: bool,
    /// Historical overwrite: a buy decision is replaced by "stable".
    pub discard_buy_intent: bool,
    /// Historical overwrite: a cut decision under cut-or-plant is replaced
    /// by keep.
    pub discard_cut_intent: bool,
    pub nature_rule: NatureRule,
    pub protection: ProtectionPolicy,
}

impl ScenarioParams {
    pub fn for_kind(kind: ScenarioKind) -> Self {
        let base = Self {
            kind,
            exogenous_stop: 1.0,
            growth_bonus: 0.0,
            growth_bonus_expansionist: 0.0,
            index_growth: 0.0,
            yearly_stop_quota: 0.1,
            reserve_pressure: 0.0,
            regional_stop_modifiers: false,
            marginal_land_abandonment: false,
            urban_newcomers: false,
            prefer_reserve_sale: false,
            neutral_expand_feedback: false,
            discard_buy_intent: false,
            discard_cut_intent: false,
            nature_rule: NatureRule::ReserveZone,
            protection: ProtectionPolicy::Inactive,
        };
        match kind {
            ScenarioKind::Basic => base,
            ScenarioKind::Trend => Self {
                exogenous_stop: 1.5,
                growth_bonus: 0.2,
                growth_bonus_expansionist: 0.3,
                index_growth: 0.1,
                yearly_stop_quota: 0.025,
                ..base
            },
            ScenarioKind::B2 => Self {
                exogenous_stop: 1.6,
                growth_bonus: 0.2,
                growth_bonus_expansionist: 0.3,
                index_growth: 0.1,
                yearly_stop_quota: 0.029,
                reserve_pressure: 1.0,
                regional_stop_modifiers: true,
                prefer_reserve_sale: true,
                protection: ProtectionPolicy::CutOrPlant {
                    min_cut_suitability: 0.7,
                    cut_reluctance: 1.5,
                    max_plant_suitability: 0.6,
                },
                ..base
            },
            ScenarioKind::A1 => Self {
                exogenous_stop: 2.0,
                growth_bonus: 0.2,
                growth_bonus_expansionist: 0.4,
                index_growth: 0.3,
                yearly_stop_quota: 0.040,
                marginal_land_abandonment: true,
                urban_newcomers: true,
                nature_rule: NatureRule::MarginalReserveZone {
                    max_suitability: 0.5,
                },
                protection: ProtectionPolicy::CutOnly {
                    min_cut_suitability: 0.5,
                },
                ..base
            },
        }
    }

    /// Overrides the growth index the scenario would otherwise use.
    pub fn with_index_growth(mut self, index_growth: Option<f64>) -> Self {
        if let Some(value) = index_growth {
            self.index_growth = value;
        }
        self
    }

    pub fn growth_bonus_for(&self, farmer_type: FarmerType) -> f64 {
        if farmer_type.is_expansionist() {
            self.growth_bonus_expansionist
        } else {
            self.growth_bonus
        }
    }

    /// Sector-specific shift of the stop rate, taken from structural
    /// statistics per farm type.
    pub fn business_stop(&self, business: BusinessCategory) -> f64 {
        match (self.kind, business) {
            (ScenarioKind::B2, BusinessCategory::Arable) => -0.08,
            (ScenarioKind::B2, BusinessCategory::Dairy) => 0.15,
            (ScenarioKind::B2, BusinessCategory::Grassland) => -0.06,
            (ScenarioKind::B2, BusinessCategory::IntensiveLivestock) => 0.15,
            (ScenarioKind::B2, BusinessCategory::Mixed) => 0.10,
            (ScenarioKind::A1, BusinessCategory::Arable) => 0.06,
            (ScenarioKind::A1, BusinessCategory::Dairy) => 0.09,
            (ScenarioKind::A1, BusinessCategory::Grassland) => -0.11,
            (ScenarioKind::A1, BusinessCategory::IntensiveLivestock) => 0.09,
            (ScenarioKind::A1, BusinessCategory::Mixed) => -0.04,
            _ => 0.0,
        }
    }
}
