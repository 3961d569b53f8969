use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    agent::{AgentId, Landholder, LandholderRecord},
    error::{ModelError, Result},
    land::{GridPos, LandId, LandUnit, LandUnitRecord, Owner, NATURE_RESERVE_ID},
    rng::SimRng,
};

/// The two tables an initial-state collaborator hands over at construction.
/// `units` is row-major: cell `(x, y)` sits at index `y * width + x`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitialState {
    pub units: Vec<LandUnitRecord>,
    pub landholders: Vec<LandholderRecord>,
}

pub struct World {
    width: u32,
    height: u32,
    units: Vec<LandUnit>,
    landholders: BTreeMap<AgentId, Landholder>,
    holdings: BTreeMap<Owner, BTreeSet<LandId>>,
    total_area: f64,
}

impl World {
    pub fn from_tables(
        width: u32,
        height: u32,
        state: &InitialState,
        rng: &mut SimRng,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ModelError::EmptyGrid { width, height });
        }
        let capacity = width as usize * height as usize;
        if state.landholders.len() > capacity {
            return Err(ModelError::TooManyLandholders {
                agents: state.landholders.len(),
                capacity,
            });
        }
        if state.units.len() != capacity {
            return Err(ModelError::CellCountMismatch {
                expected: capacity,
                actual: state.units.len(),
            });
        }

        let mut known = BTreeSet::new();
        for record in &state.landholders {
            let id = AgentId(record.id);
            if record.id == NATURE_RESERVE_ID {
                return Err(ModelError::ReservedLandholderId(id));
            }
            if !known.insert(id) {
                return Err(ModelError::DuplicateLandholder(id));
            }
            if record.x >= width || record.y >= height {
                return Err(ModelError::LandholderOffGrid {
                    id,
                    x: record.x,
                    y: record.y,
                });
            }
        }

        let mut units = Vec::with_capacity(capacity);
        let mut holdings: BTreeMap<Owner, BTreeSet<LandId>> = BTreeMap::new();
        for (index, record) in state.units.iter().enumerate() {
            let id = LandId(index as u32);
            if record.size <= 0.0 || !record.size.is_finite() {
                return Err(ModelError::InvalidLandSize(id));
            }
            let pos = GridPos::new(index as u32 % width, index as u32 / width);
            let unit = LandUnit::from_record(id, pos, record);
            if let Owner::Landholder(owner) = unit.owner {
                if !known.contains(&owner) {
                    return Err(ModelError::UnknownOwner { unit: id, owner });
                }
            }
            holdings.entry(unit.owner).or_default().insert(id);
            units.push(unit);
        }
        let total_area = units.iter().map(|unit| unit.size).sum();

        let mut world = Self {
            width,
            height,
            units,
            landholders: BTreeMap::new(),
            holdings,
            total_area,
        };
        for record in &state.landholders {
            let id = AgentId(record.id);
            let holding = world.holding_size(id);
            let agent = Landholder::from_record(record, holding, rng)?;
            world.landholders.insert(id, agent);
        }
        for index in 0..world.units.len() {
            world.refresh_unit(LandId(index as u32));
        }
        Ok(world)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn capacity(&self) -> usize {
        self.units.len()
    }

    pub fn units(&self) -> &[LandUnit] {
        &self.units
    }

    pub fn unit(&self, id: LandId) -> Option<&LandUnit> {
        self.units.get(id.index())
    }

    pub(crate) fn unit_mut(&mut self, id: LandId) -> Option<&mut LandUnit> {
        self.units.get_mut(id.index())
    }

    pub fn landholder(&self, id: AgentId) -> Option<&Landholder> {
        self.landholders.get(&id)
    }

    pub(crate) fn landholder_mut(&mut self, id: AgentId) -> Option<&mut Landholder> {
        self.landholders.get_mut(&id)
    }

    pub fn landholders(&self) -> impl Iterator<Item = &Landholder> {
        self.landholders.values()
    }

    pub fn landholder_ids(&self) -> Vec<AgentId> {
        self.landholders.keys().copied().collect()
    }

    pub fn landholder_count(&self) -> usize {
        self.landholders.len()
    }

    pub fn total_area(&self) -> f64 {
        self.total_area
    }

    /// Units currently held by `owner`, in id order.
    pub fn units_of(&self, owner: Owner) -> Vec<LandId> {
        self.holdings
            .get(&owner)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn owned_units(&self, id: AgentId) -> Vec<LandId> {
        self.units_of(Owner::Landholder(id))
    }

    pub fn owned_count(&self, id: AgentId) -> usize {
        self.holdings
            .get(&Owner::Landholder(id))
            .map_or(0, BTreeSet::len)
    }

    pub fn area_of(&self, owner: Owner) -> f64 {
        self.holdings.get(&owner).map_or(0.0, |set| {
            set.iter().filter_map(|id| self.unit(*id)).map(|unit| unit.size).sum()
        })
    }

    pub fn holding_size(&self, id: AgentId) -> f64 {
        self.area_of(Owner::Landholder(id))
    }

    /// Owned units currently carrying a landscape feature.
    pub fn feature_units_of(&self, id: AgentId) -> usize {
        self.holdings
            .get(&Owner::Landholder(id))
            .map_or(0, |set| {
                set.iter()
                    .filter_map(|unit| self.unit(*unit))
                    .filter(|unit| unit.has_feature)
                    .count()
            })
    }

    /// Population mean of live holding sizes; 0 for an empty population.
    pub fn mean_holding_size(&self) -> f64 {
        if self.landholders.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .landholders
            .keys()
            .map(|id| self.holding_size(*id))
            .sum();
        total / self.landholders.len() as f64
    }

    /// Landholders whose current expansion intent is to buy, in id order.
    pub fn buyers(&self, exclude: AgentId) -> Vec<AgentId> {
        self.landholders
            .values()
            .filter(|agent| agent.id != exclude && agent.wants_to_buy())
            .map(|agent| agent.id)
            .collect()
    }

    /// Moves one unit to a new owner, keeping the owner index and the unit's
    /// cached owner distance in step. Returns the previous owner.
    pub(crate) fn transfer(&mut self, unit: LandId, to: Owner) -> Option<Owner> {
        let from = self.unit(unit)?.owner;
        if from == to {
            return Some(from);
        }
        if let Some(set) = self.holdings.get_mut(&from) {
            set.remove(&unit);
            if set.is_empty() {
                self.holdings.remove(&from);
            }
        }
        self.holdings.entry(to).or_default().insert(unit);
        if let Some(cell) = self.unit_mut(unit) {
            cell.owner = to;
        }
        self.refresh_unit(unit);
        trace!(unit = unit.0, ?from, ?to, "land transfer");
        Some(from)
    }

    /// Land-unit behaviour: resolve the owner and recompute the distance to
    /// its home cell.
    pub(crate) fn refresh_unit(&mut self, unit: LandId) {
        let home = self
            .unit(unit)
            .and_then(|cell| cell.owner.landholder())
            .and_then(|owner| self.landholders.get(&owner))
            .map(|agent| agent.pos);
        if let Some(cell) = self.unit_mut(unit) {
            cell.refresh_owner_distance(home);
        }
    }

    /// Deregisters a landholder that no longer owns any land. A landholder
    /// that still owns units stays registered.
    pub(crate) fn retire_landholder(&mut self, id: AgentId) -> Option<Landholder> {
        if self.owned_count(id) > 0 {
            return None;
        }
        self.landholders.remove(&id)
    }

    /// Checks that the owner index and the registry agree with the unit
    /// table: every unit is indexed under exactly its owner, and every
    /// private owner is a registered landholder.
    pub fn ownership_consistent(&self) -> bool {
        let indexed: usize = self.holdings.values().map(BTreeSet::len).sum();
        if indexed != self.units.len() {
            return false;
        }
        for unit in &self.units {
            let listed = self
                .holdings
                .get(&unit.owner)
                .is_some_and(|set| set.contains(&unit.id));
            if !listed {
                return false;
            }
            if let Owner::Landholder(owner) = unit.owner {
                if !self.landholders.contains_key(&owner) {
                    return false;
                }
            }
        }
        self.landholders.keys().all(|id| {
            let filtered: Vec<LandId> = self
                .units
                .iter()
                .filter(|unit| unit.owner == Owner::Landholder(*id))
                .map(|unit| unit.id)
                .collect();
            filtered == self.owned_units(*id)
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn cell(size: f64, owner: Option<u32>, reserve: bool) -> LandUnitRecord {
        LandUnitRecord {
            size,
            suitability: 0.6,
            owner_id: owner,
            land_use: 6,
            has_feature: false,
            feature_length: 0.0,
            feature_potential: 1.0,
            reserve_zone: reserve,
            soil: 0.5,
        }
    }

    pub(crate) fn holder(id: u32, x: u32, y: u32, farmer_type: u8) -> LandholderRecord {
        LandholderRecord {
            id,
            x,
            y,
            farmer_type,
            business: 1,
            age: 40,
            production_rate: 5.0,
            production_offset: 5.0,
            prior_transaction: 0.0,
            national_landscape: false,
        }
    }

    fn small_world() -> World {
        let state = InitialState {
            units: vec![
                cell(1.0, Some(1), false),
                cell(2.0, Some(1), false),
                cell(3.0, Some(2), true),
                cell(4.0, None, false),
            ],
            landholders: vec![holder(1, 0, 0, 2), holder(2, 1, 1, 4)],
        };
        World::from_tables(2, 2, &state, &mut SimRng::new(1)).unwrap()
    }

    #[test]
    fn builds_index_and_holdings() {
        let world = small_world();
        assert_eq!(world.total_area(), 10.0);
        assert_eq!(world.owned_units(AgentId(1)), vec![LandId(0), LandId(1)]);
        assert_eq!(world.holding_size(AgentId(2)), 3.0);
        assert_eq!(world.landholder(AgentId(1)).unwrap().holding_size(), 3.0);
        assert_eq!(world.unit(LandId(1)).unwrap().owner_distance(), Some(1.0));
        assert_eq!(world.unit(LandId(3)).unwrap().owner_distance(), None);
        assert!(world.ownership_consistent());
    }

    #[test]
    fn transfer_keeps_index_and_distance_in_step() {
        let mut world = small_world();
        world.transfer(LandId(0), Owner::Landholder(AgentId(2)));
        assert_eq!(world.owned_units(AgentId(1)), vec![LandId(1)]);
        assert_eq!(world.owned_units(AgentId(2)), vec![LandId(0), LandId(2)]);
        let distance = world.unit(LandId(0)).unwrap().owner_distance().unwrap();
        assert!((distance - 2f64.sqrt()).abs() < 1e-12);

        world.transfer(LandId(2), Owner::NatureReserve);
        assert_eq!(world.unit(LandId(2)).unwrap().owner_distance(), None);
        assert_eq!(world.area_of(Owner::NatureReserve), 3.0);
        assert!(world.ownership_consistent());
        assert_eq!(world.total_area(), world.units().iter().map(|u| u.size).sum::<f64>());
    }

    #[test]
    fn only_landless_holders_retire() {
        let mut world = small_world();
        assert!(world.retire_landholder(AgentId(2)).is_none());
        world.transfer(LandId(2), Owner::NatureReserve);
        assert!(world.retire_landholder(AgentId(2)).is_some());
        assert!(world.landholder(AgentId(2)).is_none());
        assert!(world.ownership_consistent());
    }

    #[test]
    fn rejects_bad_tables() {
        let mut rng = SimRng::new(1);
        let state = InitialState {
            units: vec![cell(1.0, Some(7), false)],
            landholders: vec![holder(1, 0, 0, 2)],
        };
        assert!(matches!(
            World::from_tables(1, 1, &state, &mut rng),
            Err(ModelError::UnknownOwner { .. })
        ));

        let state = InitialState {
            units: vec![cell(1.0, None, false)],
            landholders: vec![],
        };
        assert!(matches!(
            World::from_tables(2, 1, &state, &mut rng),
            Err(ModelError::CellCountMismatch { expected: 2, actual: 1 })
        ));

        let state = InitialState {
            units: vec![cell(1.0, None, false)],
            landholders: vec![holder(1, 3, 0, 2)],
        };
        assert!(matches!(
            World::from_tables(1, 1, &state, &mut rng),
            Err(ModelError::LandholderOffGrid { .. })
        ));

        let state = InitialState {
            units: vec![cell(0.0, None, false)],
            landholders: vec![],
        };
        assert!(matches!(
            World::from_tables(1, 1, &state, &mut rng),
            Err(ModelError::InvalidLandSize(_))
        ));
    }

    #[test]
    fn mean_holding_of_empty_population_is_zero() {
        let state = InitialState {
            units: vec![cell(1.0, None, false)],
            landholders: vec![],
        };
        let world = World::from_tables(1, 1, &state, &mut SimRng::new(1)).unwrap();
        assert_eq!(world.mean_holding_size(), 0.0);
    }
}
