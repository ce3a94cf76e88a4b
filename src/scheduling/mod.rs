//! This module takes care of scheduling the analysis work, encapsulating use
//! of multiple threads

#[cfg(not(feature = "multi-threading"))]
mod sequential;
#[cfg(feature = "multi-threading")]
mod multi_threading;

use crate::random::RandomGenerator;

use eyre::Result;

/// Size of the simulated event batches
///
/// Events are grouped in batches, each with its own random number stream, so
/// that sequential and parallel runs produce the same results.
pub const EVENT_BATCH_SIZE: usize = 1000;

/// A contiguous range of events, simulated with one random number stream
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    /// Position of the batch in the run
    pub id: usize,

    /// Number of the first event of the batch within the run
    pub first_event: usize,

    /// Number of events in the batch
    pub size: usize,
}
//
impl Batch {
    /// Numbers of the events of this batch
    pub fn events(&self) -> std::ops::Range<usize> {
        self.first_event..self.first_event + self.size
    }
}

/// Split a run of `num_events` events into batches
pub fn batches(num_events: usize) -> impl Iterator<Item = Batch> {
    let num_batches = (num_events + EVENT_BATCH_SIZE - 1) / EVENT_BATCH_SIZE;
    (0..num_batches).map(move |id| {
        let first_event = id * EVENT_BATCH_SIZE;
        Batch {
            id,
            first_event,
            size: EVENT_BATCH_SIZE.min(num_events - first_event),
        }
    })
}

/// Run the simulation in the manner that was configured at build time.
///
/// Takes as parameters the total number of events to be simulated, the seed
/// of the random number generator, a kernel that simulates a batch of events
/// given its own random number generator, and a consumer of batch results.
///
/// Batch `n` uses the master generator after `n` jumps. The consumer sees the
/// batch results in batch order, as soon as all previous batches are done,
/// and its first error stops the simulation.
pub fn run_simulation<R: Send>(
    num_events: usize,
    seed: u64,
    simulate_batch: impl Send + Sync + Fn(Batch, &mut RandomGenerator) -> R,
    consume: impl FnMut(R) -> Result<()>,
) -> Result<()> {
    let rng = RandomGenerator::new(seed);

    #[cfg(not(feature = "multi-threading"))]
    {
        sequential::run_simulation_impl(num_events, rng, simulate_batch, consume)
    }

    #[cfg(feature = "multi-threading")]
    {
        multi_threading::run_simulation_impl(num_events, rng, simulate_batch, consume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::bail;

    #[test]
    fn batches_cover_all_events() {
        let all: Vec<_> = batches(2500).collect();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2], Batch { id: 2, first_event: 2000, size: 500 });
        let events: Vec<_> = all.iter().flat_map(Batch::events).collect();
        assert_eq!(events, (0..2500).collect::<Vec<_>>());
        assert_eq!(batches(0).count(), 0);
        assert_eq!(batches(EVENT_BATCH_SIZE).count(), 1);
    }

    #[test]
    fn batches_are_consumed_in_order() {
        let num_batches = 37;
        let mut seen = Vec::new();
        run_simulation(
            num_batches * EVENT_BATCH_SIZE - 1,
            7,
            |batch, _| batch,
            |batch| {
                seen.push(batch);
                Ok(())
            },
        )
        .unwrap();
        let ids: Vec<_> = seen.iter().map(|batch| batch.id).collect();
        assert_eq!(ids, (0..num_batches).collect::<Vec<_>>());
        let first_events: Vec<_> = seen.iter().map(|batch| batch.first_event).collect();
        assert!(first_events.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(seen.last().map(|batch| batch.size), Some(EVENT_BATCH_SIZE - 1));
    }

    /// First draw of every batch stream, in consumption order
    fn first_draws(seed: u64) -> Vec<u64> {
        let mut draws = Vec::new();
        run_simulation(
            5 * EVENT_BATCH_SIZE,
            seed,
            |_, rng| (rng.random() * 1e9) as u64,
            |draw| {
                draws.push(draw);
                Ok(())
            },
        )
        .unwrap();
        draws
    }

    #[test]
    fn batch_streams_follow_the_jumped_master() {
        let mut master = RandomGenerator::new(3);
        let expected: Vec<u64> = (0..5)
            .map(|_| {
                let mut stream = master.clone();
                master.jump();
                (stream.random() * 1e9) as u64
            })
            .collect();
        assert_eq!(first_draws(3), expected);
        assert_ne!(first_draws(3), first_draws(4));
    }

    #[test]
    fn consumer_errors_stop_the_run() {
        let mut consumed = 0;
        let result = run_simulation(
            10 * EVENT_BATCH_SIZE,
            1,
            |batch, _| batch.id,
            |id| {
                consumed += 1;
                if id == 2 {
                    bail!("disk full");
                }
                Ok(())
            },
        );
        assert!(result.is_err());
        assert_eq!(consumed, 3);
    }
}
