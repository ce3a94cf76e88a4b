//! Sequential back-end of the simulation

use crate::{
    random::RandomGenerator,
    scheduling::{batches, Batch},
};
use eyre::Result;
use log::debug;

/// Simulate events in sequential mode
///
/// Batched logic is used even in sequential mode, in order to achieve
/// reproducibility with respect to multi-threaded runs.
pub fn run_simulation_impl<R>(
    num_events: usize,
    mut rng: RandomGenerator,
    simulate_batch: impl Fn(Batch, &mut RandomGenerator) -> R,
    mut consume: impl FnMut(R) -> Result<()>,
) -> Result<()> {
    for batch in batches(num_events) {
        let mut batch_rng = rng.clone();
        rng.jump();
        consume(simulate_batch(batch, &mut batch_rng))?;
        debug!(
            "Finished batch {} ({} of {num_events} events)",
            batch.id,
            batch.first_event + batch.size
        );
    }
    Ok(())
}
