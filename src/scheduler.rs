//! Breed scheduler: activates every registered entity once per step, one
//! breed at a time, each breed in a freshly shuffled order.

use std::collections::{BTreeMap, BTreeSet};

use crate::{agent::AgentId, error::Result, land::LandId, rng::SimRng};

/// Breeds in activation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Breed {
    LandUnit,
    Landholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKey {
    Land(LandId),
    Landholder(AgentId),
}

impl EntityKey {
    pub fn breed(self) -> Breed {
        match self {
            EntityKey::Land(_) => Breed::LandUnit,
            EntityKey::Landholder(_) => Breed::Landholder,
        }
    }
}

/// What an activated entity reports back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Continue,
    /// The activated entity left the simulation and must be deregistered.
    Departed,
}

#[derive(Debug, Default)]
pub struct BreedScheduler {
    members: BTreeMap<Breed, BTreeSet<EntityKey>>,
    steps: u64,
}

impl BreedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: EntityKey) -> bool {
        self.members.entry(key.breed()).or_default().insert(key)
    }

    pub fn remove(&mut self, key: EntityKey) -> bool {
        self.members
            .get_mut(&key.breed())
            .is_some_and(|set| set.remove(&key))
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.members
            .get(&key.breed())
            .is_some_and(|set| set.contains(&key))
    }

    pub fn count(&self, breed: Breed) -> usize {
        self.members.get(&breed).map_or(0, BTreeSet::len)
    }

    pub fn members(&self, breed: Breed) -> impl Iterator<Item = EntityKey> + '_ {
        self.members.get(&breed).into_iter().flatten().copied()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Runs one step. Every member registered when its breed pass starts is
    /// activated exactly once, unless it is removed earlier in that pass.
    /// Members added during a pass wait for the next step.
    pub fn step<F>(&mut self, rng: &mut SimRng, mut activate: F) -> Result<()>
    where
        F: FnMut(EntityKey, &mut SimRng) -> Result<Activation>,
    {
        let breeds: Vec<Breed> = self.members.keys().copied().collect();
        for breed in breeds {
            let mut order: Vec<EntityKey> = self.members(breed).collect();
            rng.shuffle(&mut order);
            for key in order {
                if !self.contains(key) {
                    continue;
                }
                if activate(key, rng)? == Activation::Departed {
                    self.remove(key);
                }
            }
        }
        self.steps += 1;
        Ok(())
    }
}
