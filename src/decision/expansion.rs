//! Expansion and shrinkage: buy intents for the market, single-unit sales.

use super::{convert_to_nature, landholder_mut, Turn};
use crate::{
    agent::{CessationIntent, ExpansionIntent, Landholder},
    error::Result,
    land::{LandId, LandUnit},
    market::{self, MatchRule},
    scenario::{NatureRule, ScenarioParams},
};

/// Landholders that sold more than this over the window do not buy.
const BUY_FLOOR: f64 = -1.0;
/// Landholders that bought more than this over the window do not sell.
const SELL_CEILING: f64 = 1.0;

pub(crate) fn expand_probability(agent: &Landholder, params: &ScenarioParams) -> f64 {
    let bonus = params.growth_bonus_for(agent.farmer_type);
    (agent.params().expand * agent.expand_feedback * (1.0 + bonus)).clamp(0.0, 1.0)
}

pub(crate) fn shrink_probability(
    agent: &Landholder,
    params: &ScenarioParams,
    holds_reserve_land: bool,
) -> f64 {
    let pressure = if holds_reserve_land {
        params.reserve_pressure
    } else {
        0.0
    };
    (agent.params().shrink * (1.0 + pressure)).clamp(0.0, 1.0)
}

/// Whether a unit offered for sale leaves private use instead of going to
/// the market.
pub(crate) fn goes_to_nature(unit: &LandUnit, rule: NatureRule) -> bool {
    match rule {
        NatureRule::ReserveZone => unit.reserve_zone,
        NatureRule::MarginalReserveZone { max_suitability } => {
            unit.reserve_zone && unit.suitability < max_suitability
        }
    }
}

pub(crate) fn run(turn: &mut Turn<'_>) -> Result<()> {
    let params = *turn.params;
    let owned = turn.world.owned_units(turn.id);
    let holds_reserve_land = owned
        .iter()
        .filter_map(|unit| turn.world.unit(*unit))
        .any(|unit| unit.reserve_zone);

    let agent = landholder_mut(turn.world, turn.id)?;
    agent.probabilities.expand = expand_probability(agent, &params);
    agent.probabilities.shrink = shrink_probability(agent, &params, holds_reserve_land);

    let draw = agent.draws.expand;
    let sum = agent.transaction_sum();
    if agent.probabilities.expand > draw
        && agent.cessation != CessationIntent::Stop
        && sum > BUY_FLOOR
    {
        agent.expansion = if params.discard_buy_intent {
            ExpansionIntent::Undecided
        } else {
            ExpansionIntent::Buy
        };
    }
    if 1.0 - agent.probabilities.shrink < draw && owned.len() > 1 && sum < SELL_CEILING {
        agent.expansion = ExpansionIntent::Sell;
    }

    if agent.expansion == ExpansionIntent::Sell {
        sell_one(turn, &owned)?;
    }
    Ok(())
}

fn sell_one(turn: &mut Turn<'_>, owned: &[LandId]) -> Result<()> {
    let Some(unit) = pick_unit_for_sale(turn, owned) else {
        return Ok(());
    };
    let to_nature = turn
        .world
        .unit(unit)
        .is_some_and(|cell| goes_to_nature(cell, turn.params.nature_rule));

    let sold = if to_nature {
        convert_to_nature(turn.world, &[unit]);
        true
    } else {
        market::sell(turn.world, turn.id, &[unit], MatchRule::Nearest, turn.rng).is_some()
    };
    if sold {
        landholder_mut(turn.world, turn.id)?.expansion = ExpansionIntent::Sold;
    }
    Ok(())
}

/// Reserve-zone land first where the scenario prefers it, otherwise the unit
/// farthest from the farmstead (lowest id on ties).
fn pick_unit_for_sale(turn: &mut Turn<'_>, owned: &[LandId]) -> Option<LandId> {
    if turn.params.prefer_reserve_sale {
        let reserve: Vec<LandId> = owned
            .iter()
            .copied()
            .filter(|unit| turn.world.unit(*unit).is_some_and(|cell| cell.reserve_zone))
            .collect();
        if let Some(unit) = turn.rng.pick(&reserve) {
            return Some(*unit);
        }
    }
    let mut farthest: Option<(f64, LandId)> = None;
    for &unit in owned {
        let distance = turn
            .world
            .unit(unit)
            .and_then(LandUnit::owner_distance)
            .unwrap_or(0.0);
        if farthest.map_or(true, |(best, _)| distance > best) {
            farthest = Some((distance, unit));
        }
    }
    farthest.map(|(_, unit)| unit)
}
