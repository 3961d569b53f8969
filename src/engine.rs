//! Simulation clock: owns the world, the breed scheduler and the run's
//! random stream, and advances them one tick at a time.

use tracing::{debug, info};

use crate::{
    config::ModelConfig,
    decision::LandholderDecisions,
    error::Result,
    metrics::{self, Metrics},
    rng::SimRng,
    scenario::ScenarioParams,
    scheduler::{Activation, Breed, BreedScheduler, EntityKey},
    snapshot::WorldSnapshot,
    synthetic,
    world::{InitialState, World},
};

pub struct StepContext<'a> {
    pub params: &'a ScenarioParams,
}

/// Per-tick behaviour of one breed.
pub trait Behaviour {
    fn name(&self) -> &str;
    fn breed(&self) -> Breed;
    fn activate(
        &mut self,
        ctx: &StepContext<'_>,
        world: &mut World,
        key: EntityKey,
        rng: &mut SimRng,
    ) -> Result<Activation>;
}

/// Land units only refresh their owner and the distance to it.
#[derive(Debug, Default)]
pub struct LandUnitRefresh;

impl LandUnitRefresh {
    pub fn new() -> Self {
        Self
    }
}

impl Behaviour for LandUnitRefresh {
    fn name(&self) -> &str {
        "land_unit_refresh"
    }

    fn breed(&self) -> Breed {
        Breed::LandUnit
    }

    fn activate(
        &mut self,
        _ctx: &StepContext<'_>,
        world: &mut World,
        key: EntityKey,
        _rng: &mut SimRng,
    ) -> Result<Activation> {
        if let EntityKey::Land(unit) = key {
            world.refresh_unit(unit);
        }
        Ok(Activation::Continue)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsFrame {
    pub tick: u64,
    pub metrics: Metrics,
}

pub struct ModelSettings {
    pub name: String,
    pub params: ScenarioParams,
    pub seed: u64,
}

pub struct ModelBuilder {
    settings: ModelSettings,
    behaviours: Vec<Box<dyn Behaviour>>,
}

impl ModelBuilder {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            settings,
            behaviours: Vec::new(),
        }
    }

    pub fn with_behaviour(mut self, behaviour: impl Behaviour + 'static) -> Self {
        self.behaviours.push(Box::new(behaviour));
        self
    }

    /// Land-unit refresh plus the landholder decision engine.
    pub fn with_default_behaviours(self) -> Self {
        self.with_behaviour(LandUnitRefresh::new())
            .with_behaviour(LandholderDecisions::new())
    }

    /// Builds the model from initial tables, drawing the landholders'
    /// starting state from the run's stream.
    pub fn build(self, width: u32, height: u32, state: &InitialState) -> Result<Model> {
        let rng = SimRng::new(self.settings.seed);
        self.build_with_rng(width, height, state, rng)
    }

    fn build_with_rng(
        self,
        width: u32,
        height: u32,
        state: &InitialState,
        mut rng: SimRng,
    ) -> Result<Model> {
        let world = World::from_tables(width, height, state, &mut rng)?;
        let mut scheduler = BreedScheduler::new();
        for unit in world.units() {
            scheduler.add(EntityKey::Land(unit.id));
        }
        for id in world.landholder_ids() {
            scheduler.add(EntityKey::Landholder(id));
        }
        let mut model = Model {
            name: self.settings.name,
            world,
            scheduler,
            rng,
            params: self.settings.params,
            behaviours: self.behaviours,
            tick: 0,
            history: Vec::new(),
        };
        model.record_frame();
        Ok(model)
    }
}

pub struct Model {
    name: String,
    world: World,
    scheduler: BreedScheduler,
    rng: SimRng,
    params: ScenarioParams,
    behaviours: Vec<Box<dyn Behaviour>>,
    tick: u64,
    history: Vec<MetricsFrame>,
}

impl Model {
    /// Validates the configuration, generates a synthetic initial state and
    /// builds the model with the default behaviours.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = SimRng::new(config.seed);
        let state = synthetic::generate(
            config.width,
            config.height,
            config.initial_landholders,
            &mut rng,
        );
        let settings = ModelSettings {
            name: config.display_name(),
            params: config.scenario_params(),
            seed: config.seed,
        };
        let model = ModelBuilder::new(settings)
            .with_default_behaviours()
            .build_with_rng(config.width, config.height, &state, rng)?;
        let behaviours: Vec<&str> = model.behaviours().collect();
        info!(
            scenario = %config.scenario,
            landholders = model.world.landholder_count(),
            units = model.world.capacity(),
            ?behaviours,
            "model initialised"
        );
        Ok(model)
    }

    /// Advances the clock by one tick and records its metrics.
    pub fn step(&mut self) -> Result<MetricsFrame> {
        let ctx = StepContext {
            params: &self.params,
        };
        let world = &mut self.world;
        let behaviours = &mut self.behaviours;
        self.scheduler.step(&mut self.rng, |key, rng| {
            match behaviours
                .iter_mut()
                .find(|behaviour| behaviour.breed() == key.breed())
            {
                Some(behaviour) => behaviour.activate(&ctx, world, key, rng),
                None => Ok(Activation::Continue),
            }
        })?;
        self.tick += 1;
        let frame = self.record_frame();
        debug!(
            tick = self.tick,
            landholders = self.world.landholder_count(),
            nature_share = frame.metrics.get("nature_share").copied().unwrap_or_default(),
            "tick complete"
        );
        Ok(frame)
    }

    pub fn run(&mut self, ticks: u64) -> Result<()> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(())
    }

    fn record_frame(&mut self) -> MetricsFrame {
        let frame = MetricsFrame {
            tick: self.tick,
            metrics: metrics::compute(&self.world),
        };
        self.history.push(frame.clone());
        frame
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn params(&self) -> &ScenarioParams {
        &self.params
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn scheduler(&self) -> &BreedScheduler {
        &self.scheduler
    }

    pub fn behaviours(&self) -> impl Iterator<Item = &str> + '_ {
        self.behaviours.iter().map(|behaviour| behaviour.name())
    }

    /// Aggregate metrics of the current state. Repeated calls without a
    /// step in between return identical maps.
    pub fn metrics(&self) -> Metrics {
        metrics::compute(&self.world)
    }

    /// Metrics recorded at construction and after every tick.
    pub fn history(&self) -> &[MetricsFrame] {
        &self.history
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(&self.world, self.tick, &self.name)
    }
}
