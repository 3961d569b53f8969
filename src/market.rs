//! Land-market matcher.
//!
//! A seller offers one or more units to the landholders currently flagged as
//! buyers. Single-unit sales go to the nearest buyer; divestments rank the ten
//! nearest buyers by size, proximity and type with a random tie-break. A sale
//! with nobody to buy is not an error: the units stay with the seller.

use tracing::debug;

use crate::{
    agent::{AgentId, ExpansionIntent},
    land::{LandId, Owner},
    rng::{RngExt, SimRng},
    world::World,
};

/// Number of nearest buyers considered by the scored rule.
pub const SHORTLIST_LEN: usize = 10;
/// Buyers closer than this to the seller gain a proximity point.
pub const NEARBY_DISTANCE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Nearest,
    Scored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sale {
    pub buyer: AgentId,
    pub units: Vec<LandId>,
    pub area: f64,
}

/// Picks the buyer for `seller` under `rule`, or `None` when the pool is empty.
pub fn select_buyer(
    world: &World,
    seller: AgentId,
    rule: MatchRule,
    rng: &mut SimRng,
) -> Option<AgentId> {
    let home = world.landholder(seller)?.pos;
    let seller_holding = world.holding_size(seller);

    let mut candidates: Vec<(f64, AgentId)> = world
        .buyers(seller)
        .into_iter()
        .filter_map(|id| world.landholder(id))
        .map(|buyer| (home.distance(buyer.pos), buyer.id))
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    match rule {
        MatchRule::Nearest => candidates.first().map(|(_, id)| *id),
        MatchRule::Scored => {
            candidates.truncate(SHORTLIST_LEN);
            let mut best: Option<(f64, AgentId)> = None;
            for (distance, id) in candidates {
                let Some(buyer) = world.landholder(id) else {
                    continue;
                };
                let mut score = rng.uniform(0.0, 1.0);
                if world.holding_size(id) > seller_holding {
                    score += 1.0;
                }
                if distance < NEARBY_DISTANCE {
                    score += 1.0;
                }
                if buyer.farmer_type.is_expansionist() {
                    score += 1.0;
                }
                if best.map_or(true, |(top, _)| score > top) {
                    best = Some((score, id));
                }
            }
            best.map(|(_, id)| id)
        }
    }
}

/// Transfers `units` from `seller` to a matched buyer. Units the seller no
/// longer owns are skipped. The buyer leaves the pool until it decides again.
pub fn sell(
    world: &mut World,
    seller: AgentId,
    units: &[LandId],
    rule: MatchRule,
    rng: &mut SimRng,
) -> Option<Sale> {
    if units.is_empty() {
        return None;
    }
    let buyer = select_buyer(world, seller, rule, rng)?;
    let mut sold = Vec::with_capacity(units.len());
    let mut area = 0.0;
    for &unit in units {
        let owned = world
            .unit(unit)
            .is_some_and(|cell| cell.owner() == Owner::Landholder(seller));
        if !owned {
            continue;
        }
        world.transfer(unit, Owner::Landholder(buyer));
        area += world.unit(unit).map_or(0.0, |cell| cell.size);
        sold.push(unit);
    }
    if let Some(agent) = world.landholder_mut(buyer) {
        agent.expansion = ExpansionIntent::Bought;
    }
    debug!(%seller, %buyer, units = sold.len(), area, ?rule, "land sale");
    Some(Sale {
        buyer,
        units: sold,
        area,
    })
}
