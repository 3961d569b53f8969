//! End-of-activation bookkeeping.

use super::{landholder_mut, Turn};
use crate::{
    agent::{FarmerType, SizeTier, Transition, HOBBY_PRODUCTION_CEILING},
    error::Result,
};

pub(crate) fn run(turn: &mut Turn<'_>) -> Result<()> {
    let holding = turn.world.holding_size(turn.id);
    let took_over = turn.took_over;

    let agent = landholder_mut(turn.world, turn.id)?;
    agent.record_transaction(holding);
    agent.production_scale = agent.compute_production_scale();
    agent.size_tier = SizeTier::classify(agent.production_scale);

    // Newcomers keep the type they arrived with for their first year.
    if !took_over {
        if agent.farmer_type != FarmerType::Hobby
            && agent.production_scale <= HOBBY_PRODUCTION_CEILING
        {
            agent.reclassify(Transition::DropToHobby);
        } else if agent.farmer_type == FarmerType::Hobby
            && agent.production_scale > HOBBY_PRODUCTION_CEILING
        {
            agent.reclassify(Transition::PromoteFromHobby);
        }
    }

    agent.age += 1;
    agent.protection_cooldown = agent.protection_cooldown.saturating_add(1);
    Ok(())
}
