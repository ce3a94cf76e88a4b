//! Multi-threaded back-end of the simulation

use crate::{
    random::RandomGenerator,
    scheduling::{batches, Batch},
};
use eyre::Result;
use log::debug;

use std::sync::Mutex;

/// Number of batches that are simulated concurrently, per thread
const BATCHES_PER_THREAD: usize = 2;

/// Simulate events in multi-threaded mode
///
/// Batches are simulated in waves of a few batches per thread. Every batch
/// gets a clone of the random number generator, which is then jumped, exactly
/// as in sequential mode. Once a wave is over, its results are handed to the
/// consumer in batch order.
pub fn run_simulation_impl<R: Send>(
    num_events: usize,
    mut rng: RandomGenerator,
    simulate_batch: impl Send + Sync + Fn(Batch, &mut RandomGenerator) -> R,
    mut consume: impl FnMut(R) -> Result<()>,
) -> Result<()> {
    let batches: Vec<Batch> = batches(num_events).collect();
    let wave_size = BATCHES_PER_THREAD * rayon::current_num_threads().max(1);
    for wave in batches.chunks(wave_size) {
        let accumulator = ReproducibleAccumulator::new(wave.len());

        // This function is a synchronization scope: it will only return
        // once all inner tasks have been executed
        rayon::scope(|scope| {
            for (task_id, &batch) in wave.iter().enumerate() {
                let mut task_rng = rng.clone();
                rng.jump();
                let accumulator_ref = &accumulator;
                let simulate_batch_ref = &simulate_batch;
                scope.spawn(move |_| {
                    let result = simulate_batch_ref(batch, &mut task_rng);
                    accumulator_ref.set_task_result(task_id, result);
                    debug!("Finished batch {}", batch.id);
                });
            }
        });

        for result in accumulator.into_results() {
            consume(result)?;
        }
    }
    Ok(())
}

/// Storage for the results of parallel tasks, handed out in task order
struct ReproducibleAccumulator<R> {
    /// Storage for the intermediary results of parallel tasks
    results: Box<[Mutex<Option<R>>]>,
}
//
impl<R> ReproducibleAccumulator<R> {
    /// Set up results storage for N parallel tasks
    fn new(num_tasks: usize) -> Self {
        assert!(num_tasks > 0, "There should be at least one task");
        Self {
            results: (0..num_tasks)
                .map(|_| Mutex::new(None))
                .collect::<Vec<_>>()
                .into_boxed_slice(),
        }
    }

    /// Integrate the results of the n-th task
    fn set_task_result(&self, task_id: usize, result: R) {
        let mut lock = self.results[task_id]
            .lock()
            .expect("Mutex data should be valid");
        assert!(lock.is_none(), "Tasks should not report results twice");
        *lock = Some(result);
    }

    /// Extract the results in task order
    fn into_results(self) -> impl Iterator<Item = R> {
        self.results.into_vec().into_iter().map(|entry| {
            entry
                .into_inner()
                .expect("Mutex data should be valid")
                .expect("Result should be ready")
        })
    }
}
