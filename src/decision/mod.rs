//! Landholder decision engine.
//!
//! Each activation runs, in order: feedback, cessation, expansion or
//! shrinkage, landscape-feature protection and bookkeeping. Every mutation
//! goes through [`World::transfer`] or the owning unit directly, so a later
//! agent in the same tick sees a fully consistent world.

mod bookkeeping;
mod cessation;
mod expansion;
mod feedback;
mod protection;

use tracing::debug;

use crate::{
    agent::{AgentId, ExpansionIntent, Landholder, ProtectionIntent},
    engine::{Behaviour, StepContext},
    error::{ModelError, Result},
    land::{LandId, LandUse, Owner},
    rng::SimRng,
    scenario::ScenarioParams,
    scheduler::{Activation, Breed, EntityKey},
    world::World,
};

pub use feedback::{expand_feedback, stop_feedback, DRAW_PERTURBATION};

/// State shared by the stages of one landholder activation.
pub(crate) struct Turn<'a> {
    pub(crate) id: AgentId,
    pub(crate) world: &'a mut World,
    pub(crate) params: &'a ScenarioParams,
    pub(crate) rng: &'a mut SimRng,
    /// An urban newcomer took over the holding during this activation.
    pub(crate) took_over: bool,
}

impl Turn<'_> {
    pub(crate) fn agent(&self) -> Result<&Landholder> {
        self.world
            .landholder(self.id)
            .ok_or(ModelError::LandholderNotFound(self.id))
    }

    pub(crate) fn is_landless(&self) -> bool {
        self.world.owned_count(self.id) == 0
    }
}

pub(crate) fn landholder_mut(world: &mut World, id: AgentId) -> Result<&mut Landholder> {
    world
        .landholder_mut(id)
        .ok_or(ModelError::LandholderNotFound(id))
}

/// Hands units to the nature reserve and turns them into nature.
pub(crate) fn convert_to_nature(world: &mut World, units: &[LandId]) {
    for &unit in units {
        world.transfer(unit, Owner::NatureReserve);
        if let Some(cell) = world.unit_mut(unit) {
            cell.land_use = LandUse::Nature;
        }
    }
}

/// Runs one landholder's decision pipeline. Reports `Departed` when the
/// landholder ends the activation without land; it is then already gone
/// from the registry.
pub fn activate(
    world: &mut World,
    id: AgentId,
    params: &ScenarioParams,
    rng: &mut SimRng,
) -> Result<Activation> {
    let mut turn = Turn {
        id,
        world,
        params,
        rng,
        took_over: false,
    };

    {
        let agent = landholder_mut(turn.world, id)?;
        agent.expansion = ExpansionIntent::Undecided;
        agent.protection = ProtectionIntent::Undecided;
    }

    feedback::run(&mut turn)?;
    cessation::run(&mut turn)?;
    if !turn.is_landless() {
        expansion::run(&mut turn)?;
        protection::run(&mut turn)?;
        bookkeeping::run(&mut turn)?;
    }

    if turn.is_landless() {
        turn.world.retire_landholder(id);
        debug!(landholder = %id, "landholder left without land");
        return Ok(Activation::Departed);
    }
    Ok(Activation::Continue)
}

/// The landholder breed's behaviour.
#[derive(Debug, Default)]
pub struct LandholderDecisions;

impl LandholderDecisions {
    pub fn new() -> Self {
        Self
    }
}

impl Behaviour for LandholderDecisions {
    fn name(&self) -> &str {
        "landholder_decisions"
    }

    fn breed(&self) -> Breed {
        Breed::Landholder
    }

    fn activate(
        &mut self,
        ctx: &StepContext<'_>,
        world: &mut World,
        key: EntityKey,
        rng: &mut SimRng,
    ) -> Result<Activation> {
        match key {
            EntityKey::Landholder(id) => activate(world, id, ctx.params, rng),
            EntityKey::Land(_) => Ok(Activation::Continue),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        agent::{CessationIntent, LandholderRecord},
        land::LandUnitRecord,
        scenario::ScenarioKind,
        world::{
            tests::{cell, holder},
            InitialState,
        },
    };

    pub(crate) fn build(
        width: u32,
        height: u32,
        units: Vec<LandUnitRecord>,
        landholders: Vec<LandholderRecord>,
    ) -> World {
        let state = InitialState { units, landholders };
        World::from_tables(width, height, &state, &mut SimRng::new(99)).unwrap()
    }

    #[test]
    fn landless_landholder_departs_after_its_activation() {
        let mut world = build(
            2,
            1,
            vec![cell(1.0, Some(1), false), cell(1.0, None, false)],
            vec![holder(1, 0, 0, 2), holder(2, 1, 0, 2)],
        );
        let params = ScenarioKind::Basic.params();
        let mut rng = SimRng::new(4);
        let outcome = activate(&mut world, AgentId(2), &params, &mut rng).unwrap();
        assert_eq!(outcome, Activation::Departed);
        assert!(world.landholder(AgentId(2)).is_none());
        assert!(world.ownership_consistent());
    }

    #[test]
    fn probabilities_stay_in_unit_interval() {
        let mut units = vec![cell(3.0, Some(1), true); 9];
        units[4] = cell(3.0, Some(2), false);
        let mut records = vec![holder(1, 0, 0, 5), holder(2, 2, 2, 1)];
        records[0].prior_transaction = -40.0;
        records[0].age = 70;
        records[1].prior_transaction = 500.0;
        let mut world = build(3, 3, units, records);
        let mut rng = SimRng::new(8);
        for kind in ScenarioKind::ALL {
            let params = kind.params().with_index_growth(Some(5.0));
            for id in [AgentId(1), AgentId(2)] {
                if world.landholder(id).is_none() {
                    continue;
                }
                activate(&mut world, id, &params, &mut rng).unwrap();
                if let Some(agent) = world.landholder(id) {
                    let p = agent.probabilities();
                    for value in [p.stop, p.expand, p.shrink, p.protect] {
                        assert!((0.0..=1.0).contains(&value), "{value} out of range");
                    }
                    let d = agent.draws();
                    for value in [d.stop, d.expand, d.protect] {
                        assert!((0.0..=1.0).contains(&value));
                    }
                }
            }
        }
        assert!(world.ownership_consistent());
    }

    #[test]
    fn young_landholders_never_decide_on_cessation() {
        let mut world = build(
            2,
            1,
            vec![cell(1.0, Some(1), false), cell(1.0, Some(1), false)],
            vec![holder(1, 0, 0, 2)],
        );
        let params = ScenarioKind::A1.params();
        let mut rng = SimRng::new(3);
        activate(&mut world, AgentId(1), &params, &mut rng).unwrap();
        let agent = world.landholder(AgentId(1)).unwrap();
        assert_eq!(agent.cessation(), CessationIntent::Undecided);
        assert_eq!(agent.age, 41);
    }

    #[test]
    fn missing_landholder_is_an_error() {
        let mut world = build(1, 1, vec![cell(1.0, None, false)], vec![]);
        let params = ScenarioKind::Basic.params();
        let err = activate(&mut world, AgentId(7), &params, &mut SimRng::new(1)).unwrap_err();
        assert_eq!(err, ModelError::LandholderNotFound(AgentId(7)));
    }
}
