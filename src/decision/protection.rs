//! Landscape-feature protection programmes.

use tracing::trace;

use super::{landholder_mut, Turn};
use crate::{
    agent::{FarmerType, ProtectionIntent},
    error::Result,
    land::LandId,
    scenario::ProtectionPolicy,
};

/// Years a landholder stays with a protection decision before revisiting it.
pub const DECISION_INTERVAL: u32 = 6;
/// Units whose feature fill is below this share of potential can be planted.
const PLANTABLE_FILL: f64 = 0.25;

pub(crate) fn run(turn: &mut Turn<'_>) -> Result<()> {
    let policy = turn.params.protection;
    let discard_cut = turn.params.discard_cut_intent;
    let owned = turn.world.owned_units(turn.id);
    let cuttable = |min_suitability: f64| -> Vec<LandId> {
        owned
            .iter()
            .copied()
            .filter(|unit| {
                turn.world
                    .unit(*unit)
                    .is_some_and(|cell| cell.has_feature && cell.suitability > min_suitability)
            })
            .collect()
    };

    let (intent, cut_units) = {
        let agent = turn.agent()?;
        let p = agent.params().protect.clamp(0.0, 1.0);
        let draw = agent.draws.protect;
        let farmer = agent.farmer_type != FarmerType::Hobby;
        let due = agent.protection_cooldown >= DECISION_INTERVAL;
        match policy {
            ProtectionPolicy::Inactive => (None, Vec::new()),
            _ if !due => (None, Vec::new()),
            ProtectionPolicy::CutOnly {
                min_cut_suitability,
            } => {
                let units = cuttable(min_cut_suitability);
                if !units.is_empty() && p < draw && farmer {
                    (Some(ProtectionIntent::Cut), units)
                } else {
                    (Some(ProtectionIntent::Keep), Vec::new())
                }
            }
            ProtectionPolicy::CutOrPlant {
                min_cut_suitability,
                cut_reluctance,
                ..
            } => {
                let units = cuttable(min_cut_suitability);
                if !units.is_empty()
                    && p * cut_reluctance < draw
                    && farmer
                    && !discard_cut
                {
                    (Some(ProtectionIntent::Cut), units)
                } else if p > draw && farmer {
                    (Some(ProtectionIntent::Plant), Vec::new())
                } else {
                    (Some(ProtectionIntent::Keep), Vec::new())
                }
            }
        }
    };

    let agent = landholder_mut(turn.world, turn.id)?;
    agent.probabilities.protect = agent.params().protect.clamp(0.0, 1.0);
    let Some(intent) = intent else {
        return Ok(());
    };
    agent.protection = intent;
    agent.protection_cooldown = 0;

    match intent {
        ProtectionIntent::Cut => cut(turn, &cut_units),
        ProtectionIntent::Plant => {
            if let ProtectionPolicy::CutOrPlant {
                max_plant_suitability,
                ..
            } = policy
            {
                plant(turn, &owned, max_plant_suitability)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Removes the feature from every eligible unit.
fn cut(turn: &mut Turn<'_>, units: &[LandId]) -> Result<()> {
    for &unit in units {
        if let Some(cell) = turn.world.unit_mut(unit) {
            cell.cut_feature();
        }
    }
    let agent = landholder_mut(turn.world, turn.id)?;
    agent.features_cut += units.len() as u32;
    agent.protection = ProtectionIntent::Done;
    trace!(landholder = %turn.id, units = units.len(), "landscape features cut");
    Ok(())
}

/// Grows the feature on one randomly chosen poor, sparsely planted unit.
fn plant(turn: &mut Turn<'_>, owned: &[LandId], max_suitability: f64) -> Result<()> {
    let plantable: Vec<LandId> = owned
        .iter()
        .copied()
        .filter(|unit| {
            turn.world.unit(*unit).is_some_and(|cell| {
                cell.suitability < max_suitability && cell.feature_fill() < PLANTABLE_FILL
            })
        })
        .collect();
    let Some(&unit) = turn.rng.pick(&plantable) else {
        return Ok(());
    };
    if let Some(cell) = turn.world.unit_mut(unit) {
        cell.plant_feature();
    }
    let agent = landholder_mut(turn.world, turn.id)?;
    agent.features_planted += 1;
    agent.protection = ProtectionIntent::Done;
    trace!(landholder = %turn.id, unit = unit.0, "landscape feature planted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::AgentId,
        decision::tests::build,
        rng::SimRng,
        scenario::{ScenarioKind, ScenarioParams},
        world::{
            tests::{cell, holder},
            World,
        },
    };

    fn feature_world(suitability: f64, has_feature: bool, length: f64) -> World {
        let mut units = vec![cell(1.0, Some(1), false); 4];
        for unit in &mut units {
            unit.suitability = suitability;
            unit.has_feature = has_feature;
            unit.feature_length = length;
            unit.feature_potential = 1.0;
        }
        let mut world = build(2, 2, units, vec![holder(1, 0, 0, 2)]);
        world.landholder_mut(AgentId(1)).unwrap().protection_cooldown = DECISION_INTERVAL;
        world
    }

    fn run_with(world: &mut World, params: &ScenarioParams, draw: f64) {
        world.landholder_mut(AgentId(1)).unwrap().draws.protect = draw;
        let mut rng = SimRng::new(6);
        let mut turn = Turn {
            id: AgentId(1),
            world,
            params,
            rng: &mut rng,
            took_over: false,
        };
        run(&mut turn).unwrap();
    }

    #[test]
    fn cutting_clears_every_eligible_unit() {
        let mut world = feature_world(0.8, true, 0.5);
        run_with(&mut world, &ScenarioKind::A1.params(), 0.9);
        assert!(world.units().iter().all(|unit| !unit.has_feature));
        let agent = world.landholder(AgentId(1)).unwrap();
        assert_eq!(agent.protection(), ProtectionIntent::Done);
        assert_eq!(agent.features_cut(), 4);
        assert_eq!(agent.protection_cooldown(), 0);
    }

    #[test]
    fn hobby_farmers_keep_features() {
        let mut world = feature_world(0.8, true, 0.5);
        world.landholder_mut(AgentId(1)).unwrap().farmer_type = FarmerType::Hobby;
        run_with(&mut world, &ScenarioKind::A1.params(), 0.9);
        assert!(world.units().iter().all(|unit| unit.has_feature));
        assert_eq!(
            world.landholder(AgentId(1)).unwrap().protection(),
            ProtectionIntent::Keep
        );
    }

    #[test]
    fn planting_grows_one_unit() {
        let mut world = feature_world(0.3, false, 0.0);
        run_with(&mut world, &ScenarioKind::B2.params(), 0.1);
        let planted: Vec<_> = world.units().iter().filter(|unit| unit.has_feature).collect();
        assert_eq!(planted.len(), 1);
        assert!((planted[0].feature_length - 0.25).abs() < 1e-12);
        assert_eq!(world.landholder(AgentId(1)).unwrap().features_planted(), 1);
    }

    #[test]
    fn legacy_flag_turns_cut_into_keep() {
        let mut world = feature_world(0.8, true, 0.5);
        let mut params = ScenarioKind::B2.params();
        params.discard_cut_intent = true;
        run_with(&mut world, &params, 0.9);
        assert!(world.units().iter().all(|unit| unit.has_feature));
        assert_eq!(
            world.landholder(AgentId(1)).unwrap().protection(),
            ProtectionIntent::Keep
        );

        let mut world = feature_world(0.8, true, 0.5);
        run_with(&mut world, &ScenarioKind::B2.params(), 0.9);
        assert!(world.units().iter().all(|unit| !unit.has_feature));
    }

    #[test]
    fn cooldown_defers_decisions() {
        let mut world = feature_world(0.8, true, 0.5);
        world.landholder_mut(AgentId(1)).unwrap().protection_cooldown = 2;
        run_with(&mut world, &ScenarioKind::A1.params(), 0.9);
        assert!(world.units().iter().all(|unit| unit.has_feature));
        assert_eq!(
            world.landholder(AgentId(1)).unwrap().protection(),
            ProtectionIntent::Undecided
        );
    }

    #[test]
    fn no_programme_without_policy() {
        let mut world = feature_world(0.8, true, 0.5);
        run_with(&mut world, &ScenarioKind::Trend.params(), 0.9);
        assert!(world.units().iter().all(|unit| unit.has_feature));
    }
}
