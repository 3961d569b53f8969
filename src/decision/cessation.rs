//! Farm cessation: stop, hand over to a successor, or divest.

use tracing::debug;

use super::{convert_to_nature, landholder_mut, Turn};
use crate::{
    agent::{AgentId, CessationIntent, FarmerType, Landholder, Transition},
    error::Result,
    land::{GridPos, LandId, LandUnit, LandUse},
    market::{self, MatchRule},
    rng::RngExt,
    scenario::ScenarioParams,
    world::World,
};

/// Only landholders older than this weigh stopping against inheriting.
pub const DECISION_AGE: u32 = 50;
pub const INHERITANCE_AGE: u32 = 65;
/// At this age a pending succession or exit happens regardless of draws.
pub const FORCED_AGE: u32 = 84;
pub const SUCCESSION_CHANCE: f64 = 0.1;
/// Units sold per buyer while a large holding is broken up.
pub const DIVESTMENT_BATCH: usize = 5;

const ABANDON_SUITABILITY: f64 = 0.5;
const NEWCOMER_MAX_HOLDING: f64 = 10.0;
const NEWCOMER_RADIUS: f64 = 10.0;
const NEWCOMER_NATURE_SHARE: f64 = 0.1;

pub(crate) fn stop_probability(agent: &Landholder, params: &ScenarioParams) -> f64 {
    if agent.cessation != CessationIntent::Undecided {
        return 0.0;
    }
    let mut p = agent.params().stop
        * params.exogenous_stop
        * (1.0 + params.business_stop(agent.business))
        * (1.0 + agent.stop_feedback);
    if params.regional_stop_modifiers {
        p *= if agent.national_landscape { 0.9 } else { 1.1 };
        p *= if agent.farmer_type.is_diversifier() {
            0.9
        } else {
            1.1
        };
    }
    p.clamp(0.0, 1.0)
}

pub(crate) fn run(turn: &mut Turn<'_>) -> Result<()> {
    let params = *turn.params;
    let agent = landholder_mut(turn.world, turn.id)?;
    agent.probabilities.stop = stop_probability(agent, &params);

    if agent.age > DECISION_AGE && agent.cessation == CessationIntent::Undecided {
        if agent.draws.stop < agent.probabilities.stop {
            agent.cessation = CessationIntent::Stop;
            agent.reclassify(Transition::Exit);
            agent.draws.expand = 0.5 + turn.rng.uniform(0.0, 0.5);
            debug!(landholder = %agent.id, age = agent.age, "decided to stop farming");
        } else {
            agent.cessation = CessationIntent::Inherit;
        }
    }

    let age = agent.age;
    let cessation = agent.cessation;
    match cessation {
        CessationIntent::Inherit if age >= INHERITANCE_AGE => {
            let draw = turn.rng.chance();
            if draw < SUCCESSION_CHANCE || age >= FORCED_AGE {
                agent.succeed();
                debug!(landholder = %agent.id, "farm handed to successor");
            }
        }
        CessationIntent::Stop => {
            let draw = turn.rng.chance();
            if draw < params.yearly_stop_quota || age >= FORCED_AGE {
                divest(turn)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Disposes of the holding of a landholder that stops farming: reserve land
/// goes to nature, large holdings are broken up in batches, and the rest goes
/// to one buyer unless an urban newcomer takes the farm over.
fn divest(turn: &mut Turn<'_>) -> Result<()> {
    let id = turn.id;
    let params = *turn.params;

    if params.marginal_land_abandonment {
        for unit in turn.world.owned_units(id) {
            let draw = turn.rng.chance();
            if let Some(cell) = turn.world.unit_mut(unit) {
                if (draw + cell.suitability) / 2.0 < 0.5 {
                    cell.reserve_zone = true;
                }
            }
        }
    }
    let reserve = owned_where(turn.world, id, |cell| cell.reserve_zone);
    convert_to_nature(turn.world, &reserve);
    if turn.is_landless() {
        return Ok(());
    }

    if params.marginal_land_abandonment {
        let draw = turn.rng.chance();
        if turn.agent()?.farmer_type != FarmerType::Hobby && draw > 0.5 {
            let poor = owned_where(turn.world, id, |cell| {
                cell.suitability < ABANDON_SUITABILITY
            });
            convert_to_nature(turn.world, &poor);
        }
        if turn.is_landless() {
            return Ok(());
        }
    }

    while turn.world.owned_count(id) > DIVESTMENT_BATCH {
        let owned = turn.world.owned_units(id);
        let batch = turn.rng.sample(&owned, DIVESTMENT_BATCH);
        if market::sell(turn.world, id, &batch, MatchRule::Scored, turn.rng).is_none() {
            break;
        }
    }

    if params.urban_newcomers && newcomer_takes_over(turn)? {
        return Ok(());
    }

    let rest = turn.world.owned_units(id);
    market::sell(turn.world, id, &rest, MatchRule::Scored, turn.rng);
    Ok(())
}

/// Small holdings in green surroundings may be bought whole by urban
/// newcomers who keep them as hobby farms.
fn newcomer_takes_over(turn: &mut Turn<'_>) -> Result<bool> {
    let draw = turn.rng.chance();
    if draw <= 0.5 || turn.world.holding_size(turn.id) >= NEWCOMER_MAX_HOLDING {
        return Ok(false);
    }
    let home = turn.agent()?.pos;
    let green = surrounding_nature_share(turn.world, home, NEWCOMER_RADIUS)
        .is_some_and(|share| share > NEWCOMER_NATURE_SHARE);
    if !green {
        return Ok(false);
    }
    let agent = landholder_mut(turn.world, turn.id)?;
    agent.hand_to_newcomer(turn.rng);
    turn.took_over = true;
    debug!(landholder = %turn.id, "holding taken over by urban newcomer");
    Ok(true)
}

/// Share of nature among the classified units strictly within `radius` of
/// `home`; `None` when there are no classified units around.
pub(crate) fn surrounding_nature_share(
    world: &World,
    home: GridPos,
    radius: f64,
) -> Option<f64> {
    let mut around = 0usize;
    let mut nature = 0usize;
    for unit in world.units() {
        if !unit.land_use.is_classified() || unit.pos.distance(home) >= radius {
            continue;
        }
        around += 1;
        if unit.land_use == LandUse::Nature {
            nature += 1;
        }
    }
    (around > 0).then(|| nature as f64 / around as f64)
}

fn owned_where(world: &World, id: AgentId, keep: impl Fn(&LandUnit) -> bool) -> Vec<LandId> {
    world
        .owned_units(id)
        .into_iter()
        .filter(|unit| world.unit(*unit).is_some_and(&keep))
        .collect()
}
