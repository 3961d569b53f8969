//! Feedback from past transactions on the coming decisions.

use super::{landholder_mut, Turn};
use crate::{agent::Draws, error::Result, rng::RngExt};

/// Standard deviation of the perturbation applied to each carried-over draw.
pub const DRAW_PERTURBATION: f64 = 0.06;

/// Holdings below this area (ha) use the small-holding bands.
const SMALL_HOLDING: f64 = 10.0;
/// Rolling sums at or below this do not influence the expand option.
const NEUTRAL_SUM: f64 = 2.0;

/// Multiplier on the expand base rate, from where the rolling transaction
/// sum sits relative to the population mean holding size. Landholders that
/// already grew well beyond the mean are damped; the result is clamped to
/// `[0, 1 + growth]`.
pub fn expand_feedback(sum: f64, holding: f64, mean: f64, growth: f64) -> f64 {
    let mut feedback = 1.0;
    let (upper_band, lower_band) = if holding < SMALL_HOLDING {
        (0.86, 0.61)
    } else {
        (0.73, 0.45)
    };
    if sum > mean && sum <= 2.0 * mean {
        feedback = upper_band + growth;
    }
    if sum > NEUTRAL_SUM && sum <= mean {
        feedback = lower_band + growth;
    }
    if sum > 2.0 * mean {
        feedback = 0.20 + growth;
    }
    if sum > 4.0 * mean {
        feedback = 0.05 + growth;
    }
    if sum <= NEUTRAL_SUM {
        feedback = 1.0;
    }
    feedback.clamp(0.0, (1.0 + growth).max(0.0))
}

/// Additive term on the stop rate: landholders that did not buy land lately
/// are more likely to stop.
pub fn stop_feedback(sum: f64) -> f64 {
    if sum < 0.1 {
        0.14
    } else {
        -0.14
    }
}

pub(crate) fn run(turn: &mut Turn<'_>) -> Result<()> {
    let mean = turn.world.mean_holding_size();
    let holding = turn.world.holding_size(turn.id);
    let growth = turn.params.index_growth;
    let (sum, previous) = {
        let agent = turn.agent()?;
        (agent.transaction_sum(), agent.draws)
    };

    let draws = Draws {
        expand: smooth(turn, previous.expand),
        protect: smooth(turn, previous.protect),
        stop: smooth(turn, previous.stop),
    };

    let agent = landholder_mut(turn.world, turn.id)?;
    agent.expand_feedback = if turn.params.neutral_expand_feedback {
        1.0
    } else {
        expand_feedback(sum, holding, mean, growth)
    };
    agent.stop_feedback = stop_feedback(sum);
    agent.draws = draws;
    Ok(())
}

fn smooth(turn: &mut Turn<'_>, previous: f64) -> f64 {
    turn.rng
        .normal(previous, DRAW_PERTURBATION)
        .clamp(0.0, 1.0)
}
