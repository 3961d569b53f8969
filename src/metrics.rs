//! Aggregate metrics computed by scanning the registries.
//!
//! Every ratio over an empty class is reported as 0.

use std::collections::BTreeMap;

use crate::{agent::FarmerType, land::Owner, world::World};

pub type Metrics = BTreeMap<String, f64>;

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[derive(Default)]
struct TypeTally {
    agents: usize,
    area: f64,
    with_feature: usize,
}

pub fn compute(world: &World) -> Metrics {
    let mut metrics = Metrics::new();
    let landholders = world.landholder_count();
    let total_area = world.total_area();

    metrics.insert("landholders".into(), landholders as f64);
    metrics.insert("total_area".into(), total_area);
    metrics.insert(
        "nature_share".into(),
        ratio(world.area_of(Owner::NatureReserve), total_area),
    );
    let with_feature = world.units().iter().filter(|unit| unit.has_feature).count();
    metrics.insert(
        "mean_landscape_feature".into(),
        ratio(with_feature as f64, world.capacity() as f64),
    );

    let mut tallies: BTreeMap<FarmerType, TypeTally> = BTreeMap::new();
    for agent in world.landholders() {
        let tally = tallies.entry(agent.farmer_type).or_default();
        tally.agents += 1;
        tally.area += world.holding_size(agent.id);
        if world.feature_units_of(agent.id) > 0 {
            tally.with_feature += 1;
        }
    }

    for kind in FarmerType::ALL {
        let key = kind.key();
        let tally = tallies.remove(&kind).unwrap_or_default();
        let agents = tally.agents as f64;
        metrics.insert(
            format!("share_agents_{key}"),
            ratio(agents, landholders as f64),
        );
        metrics.insert(format!("share_area_{key}"), ratio(tally.area, total_area));
        metrics.insert(format!("mean_holding_{key}"), ratio(tally.area, agents));
        metrics.insert(
            format!("share_feature_{key}"),
            ratio(tally.with_feature as f64, agents),
        );
    }
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::AgentId,
        land::LandId,
        rng::SimRng,
        world::{
            tests::{cell, holder},
            InitialState,
        },
    };

    #[test]
    fn shares_and_means_per_type() {
        let mut units = vec![
            cell(2.0, Some(1), false),
            cell(2.0, Some(1), false),
            cell(4.0, Some(2), false),
            cell(2.0, Some(9999), false),
        ];
        units[2].has_feature = true;
        let state = InitialState {
            units,
            landholders: vec![holder(1, 0, 0, 2), holder(2, 1, 1, 2)],
        };
        let world = World::from_tables(2, 2, &state, &mut SimRng::new(1)).unwrap();
        let metrics = compute(&world);
        assert_eq!(metrics["landholders"], 2.0);
        assert_eq!(metrics["total_area"], 10.0);
        assert!((metrics["nature_share"] - 0.2).abs() < 1e-12);
        assert_eq!(metrics["mean_landscape_feature"], 0.25);
        assert_eq!(metrics["share_agents_conventional"], 1.0);
        assert!((metrics["share_area_conventional"] - 0.8).abs() < 1e-12);
        assert_eq!(metrics["mean_holding_conventional"], 4.0);
        assert_eq!(metrics["share_feature_conventional"], 0.5);
    }

    #[test]
    fn feature_share_follows_transfers_within_a_tick() {
        let mut units = vec![cell(1.0, Some(1), false), cell(1.0, Some(2), false)];
        units[1].has_feature = true;
        let state = InitialState {
            units,
            landholders: vec![holder(1, 0, 0, 3), holder(2, 1, 0, 2)],
        };
        let mut world = World::from_tables(2, 1, &state, &mut SimRng::new(1)).unwrap();
        let before = compute(&world);
        assert_eq!(before["share_feature_diversifier"], 0.0);
        assert_eq!(before["share_feature_conventional"], 1.0);

        // Swap the two units without any bookkeeping in between.
        world.transfer(LandId(1), Owner::Landholder(AgentId(1)));
        world.transfer(LandId(0), Owner::Landholder(AgentId(2)));
        let after = compute(&world);
        assert_eq!(after["share_feature_diversifier"], 1.0);
        assert_eq!(after["share_feature_conventional"], 0.0);
    }

    #[test]
    fn empty_classes_report_zero() {
        let state = InitialState {
            units: vec![cell(1.0, None, false)],
            landholders: vec![],
        };
        let world = World::from_tables(1, 1, &state, &mut SimRng::new(1)).unwrap();
        let metrics = compute(&world);
        for kind in FarmerType::ALL {
            assert_eq!(metrics[&format!("mean_holding_{}", kind.key())], 0.0);
            assert_eq!(metrics[&format!("share_agents_{}", kind.key())], 0.0);
        }
        assert!(metrics.values().all(|value| value.is_finite()));
    }

    #[test]
    fn repeated_calls_are_identical() {
        let state = InitialState {
            units: vec![cell(1.0, Some(1), false), cell(3.0, None, true)],
            landholders: vec![holder(1, 0, 0, 5)],
        };
        let world = World::from_tables(2, 1, &state, &mut SimRng::new(1)).unwrap();
        assert_eq!(compute(&world), compute(&world));
    }
}
