//! Read-only, serializable view of the world for renderers and reports.

use serde::Serialize;

use crate::{
    agent::{CessationIntent, ExpansionIntent, FarmerType, ProtectionIntent, SizeTier},
    land::{LandUse, Owner},
    world::World,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UnitSnapshot {
    pub id: u32,
    pub x: u32,
    pub y: u32,
    pub owner: Owner,
    pub size: f64,
    pub suitability: f64,
    pub land_use: LandUse,
    pub has_feature: bool,
    pub feature_length: f64,
    pub reserve_zone: bool,
    pub owner_distance: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LandholderSnapshot {
    pub id: u32,
    pub x: u32,
    pub y: u32,
    pub farmer_type: FarmerType,
    pub age: u32,
    pub holding_size: f64,
    pub units: usize,
    pub feature_units: usize,
    pub production_scale: f64,
    pub size_tier: SizeTier,
    pub transaction_sum: f64,
    pub cessation: CessationIntent,
    pub expansion: ExpansionIntent,
    pub protection: ProtectionIntent,
    pub newcomer: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub tick: u64,
    pub width: u32,
    pub height: u32,
    pub total_area: f64,
    pub units: Vec<UnitSnapshot>,
    pub landholders: Vec<LandholderSnapshot>,
}

impl WorldSnapshot {
    pub fn capture(world: &World, tick: u64, scenario: &str) -> Self {
        let units = world
            .units()
            .iter()
            .map(|unit| UnitSnapshot {
                id: unit.id.0,
                x: unit.pos.x,
                y: unit.pos.y,
                owner: unit.owner(),
                size: unit.size,
                suitability: unit.suitability,
                land_use: unit.land_use,
                has_feature: unit.has_feature,
                feature_length: unit.feature_length,
                reserve_zone: unit.reserve_zone,
                owner_distance: unit.owner_distance(),
            })
            .collect();
        let landholders = world
            .landholders()
            .map(|agent| LandholderSnapshot {
                id: agent.id.0,
                x: agent.pos.x,
                y: agent.pos.y,
                farmer_type: agent.farmer_type,
                age: agent.age,
                holding_size: world.holding_size(agent.id),
                units: world.owned_count(agent.id),
                feature_units: world.feature_units_of(agent.id),
                production_scale: agent.production_scale(),
                size_tier: agent.size_tier(),
                transaction_sum: agent.transaction_sum(),
                cessation: agent.cessation(),
                expansion: agent.expansion(),
                protection: agent.protection(),
                newcomer: agent.is_newcomer(),
            })
            .collect();
        Self {
            scenario: scenario.to_string(),
            tick,
            width: world.width(),
            height: world.height(),
            total_area: world.total_area(),
            units,
            landholders,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
