//! Navigation of decay trees within an event record

use crate::event::Event;
use log::warn;
use particle_id::ParticleID;

/// Maximal depth of decay chains followed by `trace_to_final_state`
///
/// Collider decay chains are a handful of steps deep. Anything deeper
/// indicates a cyclic, malformed record.
pub const MAX_DECAY_DEPTH: usize = 256;

/// Resolve a particle to its final-state descendants
///
/// A final-state particle resolves to itself. Otherwise, the daughters are
/// followed recursively in depth-first, index-ascending order. Daughter
/// indices outside of the event are skipped and so is an out-of-range
/// `start`, which yields an empty result. No deduplication is performed.
pub fn trace_to_final_state(event: &Event, start: usize) -> Vec<usize> {
    let mut final_state = Vec::new();
    trace_impl(event, start, 0, &mut final_state);
    final_state
}

fn trace_impl(event: &Event, index: usize, depth: usize, final_state: &mut Vec<usize>) {
    let Some(particle) = event.get(index) else {
        return;
    };
    if particle.is_final() {
        final_state.push(index);
        return;
    }
    if depth >= MAX_DECAY_DEPTH {
        warn!("Decay chain of particle {index} exceeds {MAX_DECAY_DEPTH} steps, ignoring the rest");
        return;
    }
    for daughter in particle.daughter_range() {
        if daughter < event.len() {
            trace_impl(event, daughter, depth + 1, final_state);
        }
    }
}

/// Indices of all particles which list `mother` as one of their mothers
pub fn decay_products(event: &Event, mother: usize) -> Vec<usize> {
    event
        .records()
        .iter()
        .enumerate()
        .filter(|(_, particle)| particle.has_mother(mother))
        .map(|(idx, _)| idx)
        .collect()
}

/// Indices of particles of the given species and statuses
///
/// This is how the decayed Higgs bosons of an event are located.
pub fn find_decayed(event: &Event, ids: &[ParticleID], statuses: &[i32]) -> Vec<usize> {
    event
        .records()
        .iter()
        .enumerate()
        .filter(|(_, particle)| ids.contains(&particle.id) && statuses.contains(&particle.status))
        .map(|(idx, _)| idx)
        .collect()
}
