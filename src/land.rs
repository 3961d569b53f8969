//! Land units: the passive breed.

use serde::{Deserialize, Serialize};

use crate::agent::AgentId;

/// Owner id used by external tables for land handed to the nature reserve.
pub const NATURE_RESERVE_ID: u32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LandId(pub u32);

impl LandId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
}

impl GridPos {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Straight-line distance on the bounded grid (no wrap-around).
    pub fn distance(self, other: GridPos) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    Unowned,
    Landholder(AgentId),
    NatureReserve,
}

impl Owner {
    /// Decodes the owner column of an external table.
    pub fn from_table_id(id: Option<u32>) -> Self {
        match id {
            None => Owner::Unowned,
            Some(NATURE_RESERVE_ID) => Owner::NatureReserve,
            Some(raw) => Owner::Landholder(AgentId(raw)),
        }
    }

    pub fn table_id(self) -> Option<u32> {
        match self {
            Owner::Unowned => None,
            Owner::Landholder(id) => Some(id.0),
            Owner::NatureReserve => Some(NATURE_RESERVE_ID),
        }
    }

    pub fn landholder(self) -> Option<AgentId> {
        match self {
            Owner::Landholder(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandUse {
    Unclassified,
    Nature,
    Grassland,
    Arable,
}

impl LandUse {
    pub fn from_code(code: u8) -> Self {
        match code {
            4 => LandUse::Nature,
            5 => LandUse::Grassland,
            6 => LandUse::Arable,
            _ => LandUse::Unclassified,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            LandUse::Unclassified => 0,
            LandUse::Nature => 4,
            LandUse::Grassland => 5,
            LandUse::Arable => 6,
        }
    }

    /// Counted as surrounding landscape when judging how green a
    /// neighbourhood is.
    pub fn is_classified(self) -> bool {
        self != LandUse::Unclassified
    }
}

/// One row of the land attribute grid supplied at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandUnitRecord {
    pub size: f64,
    pub suitability: f64,
    #[serde(default)]
    pub owner_id: Option<u32>,
    pub land_use: u8,
    pub has_feature: bool,
    pub feature_length: f64,
    pub feature_potential: f64,
    pub reserve_zone: bool,
    #[serde(default)]
    pub soil: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LandUnit {
    pub id: LandId,
    pub pos: GridPos,
    pub size: f64,
    pub suitability: f64,
    pub soil: f64,
    pub land_use: LandUse,
    pub has_feature: bool,
    pub feature_length: f64,
    pub feature_potential: f64,
    pub reserve_zone: bool,
    pub(crate) owner: Owner,
    pub(crate) owner_distance: Option<f64>,
}

impl LandUnit {
    pub fn from_record(id: LandId, pos: GridPos, record: &LandUnitRecord) -> Self {
        Self {
            id,
            pos,
            size: record.size,
            suitability: record.suitability.clamp(0.0, 1.0),
            soil: record.soil,
            land_use: LandUse::from_code(record.land_use),
            has_feature: record.has_feature,
            feature_length: record.feature_length.max(0.0),
            feature_potential: record.feature_potential.max(0.0),
            reserve_zone: record.reserve_zone,
            owner: Owner::from_table_id(record.owner_id),
            owner_distance: None,
        }
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn owner_distance(&self) -> Option<f64> {
        self.owner_distance
    }

    /// Recomputes the cached distance to the owner's home cell. `None` when
    /// the unit has no live private owner.
    pub fn refresh_owner_distance(&mut self, owner_home: Option<GridPos>) {
        self.owner_distance = owner_home.map(|home| self.pos.distance(home));
    }

    /// Share of the feature potential currently present, 1.0 when the unit
    /// has no potential at all.
    pub fn feature_fill(&self) -> f64 {
        if self.feature_potential > 0.0 {
            self.feature_length / self.feature_potential
        } else {
            1.0
        }
    }

    pub fn cut_feature(&mut self) {
        self.has_feature = false;
        self.feature_length = 0.0;
    }

    pub fn plant_feature(&mut self) {
        self.has_feature = true;
        self.feature_length += self.feature_potential / 4.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> LandUnitRecord {
        LandUnitRecord {
            size: 2.0,
            suitability: 0.4,
            owner_id: Some(3),
            land_use: 6,
            has_feature: true,
            feature_length: 0.1,
            feature_potential: 0.8,
            reserve_zone: false,
            soil: 0.5,
        }
    }

    #[test]
    fn owner_table_ids_round_trip_the_sentinel() {
        assert_eq!(Owner::from_table_id(Some(9999)), Owner::NatureReserve);
        assert_eq!(Owner::from_table_id(None), Owner::Unowned);
        assert_eq!(
            Owner::from_table_id(Some(3)),
            Owner::Landholder(AgentId(3))
        );
        assert_eq!(Owner::NatureReserve.table_id(), Some(NATURE_RESERVE_ID));
    }

    #[test]
    fn distance_is_euclidean_without_wrap() {
        let a = GridPos::new(0, 0);
        let b = GridPos::new(3, 4);
        assert!((a.distance(b) - 5.0).abs() < 1e-12);
        let far = GridPos::new(9, 0);
        assert!((a.distance(far) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn refresh_clears_distance_without_owner() {
        let mut unit = LandUnit::from_record(LandId(0), GridPos::new(1, 1), &record());
        unit.refresh_owner_distance(Some(GridPos::new(1, 3)));
        assert_eq!(unit.owner_distance(), Some(2.0));
        unit.refresh_owner_distance(None);
        assert_eq!(unit.owner_distance(), None);
    }

    #[test]
    fn planting_adds_a_quarter_of_potential() {
        let mut unit = LandUnit::from_record(LandId(0), GridPos::new(0, 0), &record());
        unit.cut_feature();
        assert!(!unit.has_feature);
        assert_eq!(unit.feature_length, 0.0);
        unit.plant_feature();
        assert!(unit.has_feature);
        assert!((unit.feature_length - 0.2).abs() < 1e-12);
    }
}
