//! Landholder agents: state, behavioural types and their transitions.

use std::{collections::VecDeque, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    error::{ModelError, Result},
    land::GridPos,
    rng::{RngExt, SimRng},
};

/// Length of the rolling window of yearly net area transactions.
pub const TRANSACTION_WINDOW: usize = 5;
/// Age of a successor taking over a farm, and of an urban newcomer.
pub const SUCCESSOR_AGE: u32 = 37;
/// Production scale at or below which a holding is run as a hobby.
pub const HOBBY_PRODUCTION_CEILING: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Base rates of the four decision categories for one behavioural type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeParams {
    pub expand: f64,
    pub shrink: f64,
    pub stop: f64,
    pub protect: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FarmerType {
    Hobby,
    Conventional,
    Diversifier,
    ExpansionistConventional,
    ExpansionistDiversifier,
}

/// The only ways a landholder's behavioural type may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Deciding to stop farming ends any expansion ambitions.
    Exit,
    /// Production fell to hobby scale.
    DropToHobby,
    /// A hobby holding grew past hobby scale.
    PromoteFromHobby,
}

impl FarmerType {
    pub const ALL: [FarmerType; 5] = [
        FarmerType::Hobby,
        FarmerType::Conventional,
        FarmerType::Diversifier,
        FarmerType::ExpansionistConventional,
        FarmerType::ExpansionistDiversifier,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(FarmerType::Hobby),
            2 => Some(FarmerType::Conventional),
            3 => Some(FarmerType::Diversifier),
            4 => Some(FarmerType::ExpansionistConventional),
            5 => Some(FarmerType::ExpansionistDiversifier),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            FarmerType::Hobby => 1,
            FarmerType::Conventional => 2,
            FarmerType::Diversifier => 3,
            FarmerType::ExpansionistConventional => 4,
            FarmerType::ExpansionistDiversifier => 5,
        }
    }

    /// Stable key used in metric names.
    pub fn key(self) -> &'static str {
        match self {
            FarmerType::Hobby => "hobby",
            FarmerType::Conventional => "conventional",
            FarmerType::Diversifier => "diversifier",
            FarmerType::ExpansionistConventional => "expansionist_conventional",
            FarmerType::ExpansionistDiversifier => "expansionist_diversifier",
        }
    }

    pub fn params(self) -> TypeParams {
        match self {
            FarmerType::Hobby => TypeParams {
                expand: 0.01,
                shrink: 0.05,
                stop: 0.34,
                protect: 0.20,
            },
            FarmerType::Conventional => TypeParams {
                expand: 0.28,
                shrink: 0.04,
                stop: 0.36,
                protect: 0.32,
            },
            FarmerType::Diversifier => TypeParams {
                expand: 0.35,
                shrink: 0.10,
                stop: 0.32,
                protect: 0.47,
            },
            FarmerType::ExpansionistConventional => TypeParams {
                expand: 0.60,
                shrink: 0.005,
                stop: 0.06,
                protect: 0.20,
            },
            FarmerType::ExpansionistDiversifier => TypeParams {
                expand: 0.64,
                shrink: 0.005,
                stop: 0.05,
                protect: 0.47,
            },
        }
    }

    pub fn is_expansionist(self) -> bool {
        matches!(
            self,
            FarmerType::ExpansionistConventional | FarmerType::ExpansionistDiversifier
        )
    }

    pub fn is_diversifier(self) -> bool {
        matches!(
            self,
            FarmerType::Diversifier | FarmerType::ExpansionistDiversifier
        )
    }

    pub fn reclassify(self, transition: Transition) -> Self {
        match (transition, self) {
            (Transition::Exit, FarmerType::ExpansionistConventional) => FarmerType::Conventional,
            (Transition::Exit, FarmerType::ExpansionistDiversifier) => FarmerType::Diversifier,
            (Transition::DropToHobby, _) => FarmerType::Hobby,
            (Transition::PromoteFromHobby, FarmerType::Hobby) => FarmerType::Conventional,
            (_, current) => current,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessCategory {
    Arable,
    Horticulture,
    PermanentCrops,
    Dairy,
    Grassland,
    IntensiveLivestock,
    Mixed,
}

impl BusinessCategory {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(BusinessCategory::Arable),
            2 => Some(BusinessCategory::Horticulture),
            3 => Some(BusinessCategory::PermanentCrops),
            4 => Some(BusinessCategory::Dairy),
            5 => Some(BusinessCategory::Grassland),
            6 => Some(BusinessCategory::IntensiveLivestock),
            7 => Some(BusinessCategory::Mixed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeTier {
    Hobby,
    Small,
    Medium,
    Large,
}

impl SizeTier {
    pub fn classify(production_scale: f64) -> Self {
        if production_scale <= HOBBY_PRODUCTION_CEILING {
            SizeTier::Hobby
        } else if production_scale <= 50.0 {
            SizeTier::Small
        } else if production_scale <= 100.0 {
            SizeTier::Medium
        } else {
            SizeTier::Large
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CessationIntent {
    #[default]
    Undecided,
    Stop,
    Inherit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionIntent {
    #[default]
    Undecided,
    Buy,
    Sell,
    /// A seller matched this buyer; it is out of the pool until it decides again.
    Bought,
    Sold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionIntent {
    #[default]
    Undecided,
    Cut,
    Keep,
    Plant,
    Done,
}

/// Per-agent uniform draws, carried over between ticks and perturbed rather
/// than redrawn so decisions stay autocorrelated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Draws {
    pub stop: f64,
    pub expand: f64,
    pub protect: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Probabilities {
    pub stop: f64,
    pub expand: f64,
    pub shrink: f64,
    pub protect: f64,
}

/// One row of the landholder table supplied at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandholderRecord {
    pub id: u32,
    pub x: u32,
    pub y: u32,
    pub farmer_type: u8,
    pub business: u8,
    pub age: u32,
    pub production_rate: f64,
    pub production_offset: f64,
    /// Average yearly net area bought (+) or sold (-) before the run.
    pub prior_transaction: f64,
    #[serde(default)]
    pub national_landscape: bool,
}

#[derive(Debug, Clone)]
pub struct Landholder {
    pub id: AgentId,
    pub pos: GridPos,
    pub farmer_type: FarmerType,
    pub age: u32,
    pub business: BusinessCategory,
    pub production_rate: f64,
    pub production_offset: f64,
    pub national_landscape: bool,
    pub(crate) transactions: VecDeque<f64>,
    pub(crate) holding_size: f64,
    pub(crate) previous_holding_size: f64,
    pub(crate) production_scale: f64,
    pub(crate) size_tier: SizeTier,
    pub(crate) protection_cooldown: u32,
    pub(crate) draws: Draws,
    pub(crate) probabilities: Probabilities,
    pub(crate) expand_feedback: f64,
    pub(crate) stop_feedback: f64,
    pub(crate) cessation: CessationIntent,
    pub(crate) expansion: ExpansionIntent,
    pub(crate) protection: ProtectionIntent,
    pub(crate) newcomer: bool,
    pub(crate) features_cut: u32,
    pub(crate) features_planted: u32,
}

impl Landholder {
    /// Builds an agent from its table row. `holding_size` is the area the
    /// land table assigns to it.
    pub fn from_record(
        record: &LandholderRecord,
        holding_size: f64,
        rng: &mut SimRng,
    ) -> Result<Self> {
        let id = AgentId(record.id);
        let farmer_type = FarmerType::from_code(record.farmer_type).ok_or(
            ModelError::UnknownFarmerType {
                id,
                code: record.farmer_type,
            },
        )?;
        let business = BusinessCategory::from_code(record.business).ok_or(
            ModelError::UnknownBusiness {
                id,
                code: record.business,
            },
        )?;

        let transactions: VecDeque<f64> =
            std::iter::repeat(record.prior_transaction)
                .take(TRANSACTION_WINDOW)
                .collect();
        let protection_cooldown = rng.int_inclusive(1, 10);

        let mut agent = Self {
            id,
            pos: GridPos::new(record.x, record.y),
            farmer_type,
            age: record.age,
            business,
            production_rate: record.production_rate,
            production_offset: record.production_offset,
            national_landscape: record.national_landscape,
            transactions,
            holding_size,
            previous_holding_size: holding_size,
            production_scale: 0.0,
            size_tier: SizeTier::Hobby,
            protection_cooldown,
            draws: Draws::default(),
            probabilities: Probabilities::default(),
            expand_feedback: 1.0,
            stop_feedback: 0.0,
            cessation: CessationIntent::Undecided,
            expansion: ExpansionIntent::Undecided,
            protection: ProtectionIntent::Undecided,
            newcomer: false,
            features_cut: 0,
            features_planted: 0,
        };
        agent.draws = agent.initial_draws(rng);
        agent.production_scale = agent.compute_production_scale();
        agent.size_tier = SizeTier::classify(agent.production_scale);
        Ok(agent)
    }

    /// Starting draws seeded from the pre-run transaction history: recent
    /// buyers start low on the expand draw (likely to buy again), recent
    /// sellers start high (likely to sell again).
    fn initial_draws(&self, rng: &mut SimRng) -> Draws {
        let params = self.params();
        let stop = rng.chance();
        let protect = rng.chance();
        let sum = self.transaction_sum();
        let expand = if sum > 0.1 {
            rng.uniform(0.0, params.expand + 0.1)
        } else if sum < -0.1 {
            (0.9 - params.shrink) + rng.uniform(0.0, params.shrink + 0.1)
        } else {
            0.1 + rng.uniform(0.0, 1.0 - params.shrink)
        };
        Draws {
            stop,
            expand: expand.clamp(0.0, 1.0),
            protect,
        }
    }

    pub fn params(&self) -> TypeParams {
        self.farmer_type.params()
    }

    pub fn reclassify(&mut self, transition: Transition) {
        self.farmer_type = self.farmer_type.reclassify(transition);
    }

    pub fn transaction_sum(&self) -> f64 {
        self.transactions.iter().sum()
    }

    pub fn transactions(&self) -> impl Iterator<Item = f64> + '_ {
        self.transactions.iter().copied()
    }

    pub fn holding_size(&self) -> f64 {
        self.holding_size
    }

    pub fn production_scale(&self) -> f64 {
        self.production_scale
    }

    pub fn size_tier(&self) -> SizeTier {
        self.size_tier
    }

    pub fn protection_cooldown(&self) -> u32 {
        self.protection_cooldown
    }

    pub fn cessation(&self) -> CessationIntent {
        self.cessation
    }

    pub fn expansion(&self) -> ExpansionIntent {
        self.expansion
    }

    pub fn protection(&self) -> ProtectionIntent {
        self.protection
    }

    pub fn probabilities(&self) -> Probabilities {
        self.probabilities
    }

    pub fn draws(&self) -> Draws {
        self.draws
    }

    pub fn is_newcomer(&self) -> bool {
        self.newcomer
    }

    pub fn features_cut(&self) -> u32 {
        self.features_cut
    }

    pub fn features_planted(&self) -> u32 {
        self.features_planted
    }

    pub fn wants_to_buy(&self) -> bool {
        self.expansion == ExpansionIntent::Buy
    }

    /// Production in standard units; very small holdings skip the per-area
    /// multiplication so they do not collapse to the offset alone.
    pub(crate) fn compute_production_scale(&self) -> f64 {
        if self.holding_size < 1.0 {
            self.production_rate + self.production_offset
        } else {
            self.holding_size * self.production_rate + self.production_offset
        }
    }

    /// Evicts the oldest yearly transaction and appends the net area change
    /// since the previous bookkeeping.
    pub(crate) fn record_transaction(&mut self, current_holding: f64) {
        let delta = current_holding - self.previous_holding_size;
        if self.transactions.len() >= TRANSACTION_WINDOW {
            self.transactions.pop_front();
        }
        self.transactions.push_back(delta);
        self.previous_holding_size = current_holding;
        self.holding_size = current_holding;
    }

    /// A family member takes over: same identity and type, younger head.
    pub(crate) fn succeed(&mut self) {
        self.age = SUCCESSOR_AGE;
        self.cessation = CessationIntent::Undecided;
    }

    /// The holding is bought whole by an urban newcomer who keeps it as a
    /// hobby farm.
    pub(crate) fn hand_to_newcomer(&mut self, rng: &mut SimRng) {
        self.farmer_type = FarmerType::Hobby;
        self.age = SUCCESSOR_AGE;
        self.newcomer = true;
        self.draws.expand = rng.chance();
        self.cessation = CessationIntent::Undecided;
        self.expansion = ExpansionIntent::Undecided;
        self.protection = ProtectionIntent::Undecided;
    }
}
