//! Synthetic initial state for runs without real land and farm registers.

use rand::distributions::{Distribution, WeightedIndex};

use crate::{
    agent::LandholderRecord,
    land::{LandUnitRecord, LandUse},
    rng::{RngExt, SimRng},
    world::InitialState,
};

const LAND_USE_CLASSES: [LandUse; 4] = [
    LandUse::Unclassified,
    LandUse::Arable,
    LandUse::Grassland,
    LandUse::Nature,
];
const LAND_USE_WEIGHTS: [f64; 4] = [0.3, 0.3, 0.35, 0.05];

/// Draws `landholders` farms with ids `1..=landholders` and one unit per
/// grid cell, every unit owned by a uniformly chosen landholder.
pub fn generate(width: u32, height: u32, landholders: usize, rng: &mut SimRng) -> InitialState {
    let records: Vec<LandholderRecord> = (1..=landholders as u32)
        .map(|id| LandholderRecord {
            id,
            x: rng.int_inclusive(0, width.saturating_sub(1)),
            y: rng.int_inclusive(0, height.saturating_sub(1)),
            farmer_type: rng.int_inclusive(1, 5) as u8,
            business: rng.int_inclusive(1, 5) as u8,
            age: rng.int_inclusive(37, 99),
            production_rate: rng.uniform(0.0, 100.0),
            production_offset: rng.uniform(0.0, 1000.0),
            prior_transaction: rng.uniform(-9.0, 63.0),
            national_landscape: rng.chance() < 0.1,
        })
        .collect();
    let ids: Vec<u32> = records.iter().map(|record| record.id).collect();

    let land_use = WeightedIndex::new(LAND_USE_WEIGHTS).ok();
    let cells = width as usize * height as usize;
    let units = (0..cells)
        .map(|_| LandUnitRecord {
            suitability: rng.chance(),
            size: rng.uniform(1.0, 5.0),
            reserve_zone: rng.chance() < 0.5,
            has_feature: rng.chance() < 0.5,
            feature_length: rng.chance(),
            feature_potential: rng.chance(),
            owner_id: rng.pick(&ids).copied(),
            soil: rng.chance(),
            land_use: land_use
                .as_ref()
                .map_or(LandUse::Unclassified, |dist| {
                    LAND_USE_CLASSES[dist.sample(rng)]
                })
                .code(),
        })
        .collect();

    InitialState {
        units,
        landholders: records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    #[test]
    fn generated_tables_build_a_world() {
        let mut rng = SimRng::new(21);
        let state = generate(6, 4, 10, &mut rng);
        assert_eq!(state.units.len(), 24);
        assert_eq!(state.landholders.len(), 10);
        assert!(state
            .units
            .iter()
            .all(|unit| (1.0..5.0).contains(&unit.size) && unit.owner_id.is_some()));
        let world = World::from_tables(6, 4, &state, &mut rng).unwrap();
        assert!(world.ownership_consistent());
    }

    #[test]
    fn no_landholders_leaves_land_unowned() {
        let mut rng = SimRng::new(21);
        let state = generate(3, 3, 0, &mut rng);
        assert!(state.units.iter().all(|unit| unit.owner_id.is_none()));
    }

    #[test]
    fn same_seed_same_tables() {
        let a = generate(5, 5, 8, &mut SimRng::new(3));
        let b = generate(5, 5, 8, &mut SimRng::new(3));
        let sizes = |state: &InitialState| state.units.iter().map(|u| u.size).collect::<Vec<_>>();
        assert_eq!(sizes(&a), sizes(&b));
    }
}
