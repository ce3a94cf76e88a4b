//! This module defines the properties and storage of generated events

use crate::{momentum::Momentum, random::RandomGenerator};
use particle_id::ParticleID;

/// Status codes, following the Pythia 8 event record conventions
///
/// Positive codes denote final-state particles, negative codes particles that
/// have decayed or branched. The magnitude records the production stage.
pub mod status {
    /// Whole-event system record
    pub const SYSTEM: i32 = -11;
    /// Incoming beam particle
    pub const BEAM: i32 = -12;
    /// Incoming parton of the hardest subprocess
    pub const INCOMING: i32 = -21;
    /// Outgoing particle of the hardest subprocess
    pub const OUTGOING: i32 = 23;
    /// Resonance produced in the hard process, before its decay
    pub const RESONANCE: i32 = 62;
    /// Higgs that has decayed, as selected by the analysis drivers
    pub const DECAYED_RESONANCE: i32 = -RESONANCE;
    /// Product of a resonance decay
    pub const DECAY_PRODUCT: i32 = 91;
    /// Primary hadron produced by fragmentation
    pub const HADRON: i32 = 83;

    /// The status a particle takes once it has decayed or fragmented
    pub fn decayed(status: i32) -> i32 {
        -status.abs()
    }
}

/// Index of the system record in every event
pub const SYSTEM_INDEX: usize = 0;

/// One entry of an event record
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ParticleRecord {
    /// Particle species
    pub id: ParticleID,
    /// Lifecycle status, see the `status` module
    pub status: i32,
    /// 4-momentum in GeV
    pub momentum: Momentum,
    /// Indices of the mothers, 0 meaning "none"
    pub mothers: [usize; 2],
    /// Inclusive index range of the direct daughters
    ///
    /// An empty range (`daughters[1] < daughters[0]`, or both 0) means that
    /// no daughters were recorded.
    pub daughters: [usize; 2],
}
//
impl ParticleRecord {
    /// Build a record without any daughters
    pub fn new(id: ParticleID, status: i32, momentum: Momentum, mothers: [usize; 2]) -> Self {
        Self {
            id,
            status,
            momentum,
            mothers,
            daughters: [0, 0],
        }
    }

    /// Whether the particle is stable within the record
    pub fn is_final(&self) -> bool {
        self.status > 0
    }

    /// Whether the particle has `mother` as one of its mothers
    pub fn has_mother(&self, mother: usize) -> bool {
        mother != 0 && self.mothers.contains(&mother)
    }

    /// Iterate over the recorded daughter range (possibly empty)
    ///
    /// Index 0 is never a daughter, so the range starts at 1 at the earliest.
    pub fn daughter_range(&self) -> std::ops::RangeInclusive<usize> {
        let [first, last] = self.daughters;
        first.max(1)..=last
    }
}

/// Storage for one simulated collision
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Event {
    records: Vec<ParticleRecord>,
}
//
impl Event {
    /// Build an event from its records
    pub fn new(records: Vec<ParticleRecord>) -> Self {
        Self { records }
    }

    /// Number of records, including the system record
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Truth that the record is completely empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Access one record, if the index is valid
    pub fn get(&self, index: usize) -> Option<&ParticleRecord> {
        self.records.get(index)
    }

    /// Access all records
    pub fn records(&self) -> &[ParticleRecord] {
        &self.records
    }

    /// Iterate over the indices and records of final-state particles
    pub fn final_state(&self) -> impl Iterator<Item = (usize, &ParticleRecord)> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, particle)| particle.is_final())
    }

    /// Indices of the incoming partons of the hard process
    pub fn incoming_partons(&self) -> impl Iterator<Item = usize> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, particle)| particle.status == status::INCOMING)
            .map(|(idx, _)| idx)
    }
}

/// Incremental construction of event records
///
/// Daughters must be pushed contiguously right after the decay of their
/// mother is decided, so that they form an index range.
#[derive(Default)]
pub struct EventBuilder {
    records: Vec<ParticleRecord>,
}
//
impl EventBuilder {
    /// Start a new, empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a particle and return its index
    pub fn push(&mut self, record: ParticleRecord) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    /// Append particles as the daughters of `mother`, and mark it as decayed
    ///
    /// Returns the index range of the new daughters.
    pub fn decay(
        &mut self,
        mother: usize,
        daughters: impl IntoIterator<Item = (ParticleID, i32, Momentum)>,
    ) -> std::ops::Range<usize> {
        let first = self.records.len();
        for (id, status, momentum) in daughters {
            self.push(ParticleRecord::new(id, status, momentum, [mother, 0]));
        }
        let last = self.records.len();
        if last > first {
            let record = &mut self.records[mother];
            record.daughters = [first, last - 1];
            record.status = status::decayed(record.status);
        }
        first..last
    }

    /// Access a record under construction
    pub fn get(&self, index: usize) -> &ParticleRecord {
        &self.records[index]
    }

    /// Modify a record under construction
    pub fn get_mut(&mut self, index: usize) -> &mut ParticleRecord {
        &mut self.records[index]
    }

    /// Number of records so far
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// Finish the event
    pub fn build(self) -> Event {
        Event::new(self.records)
    }
}

/// A successfully generated event along with its incoming partons
#[derive(Clone, PartialEq, Debug)]
pub struct GeneratedEvent {
    /// The event record
    pub event: Event,
    /// Species of the two incoming partons of the hard process
    pub incoming: [ParticleID; 2],
}
//
impl GeneratedEvent {
    /// Pair an event with the incoming partons found in its own record
    ///
    /// Returns `None` if the record does not contain two incoming partons.
    pub fn from_record(event: Event) -> Option<Self> {
        let incoming = {
            let mut partons = event.incoming_partons();
            let first = partons.next()?;
            let second = partons.next()?;
            [event.get(first)?.id, event.get(second)?.id]
        };
        Some(Self { event, incoming })
    }
}

/// Source of simulated events
///
/// Generation may fail for individual events, which is signalled by `None`.
/// Such events are to be skipped, not treated as fatal.
pub trait EventSource {
    /// Generate the next event
    fn generate(&self, rng: &mut RandomGenerator) -> Option<GeneratedEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::momentum::momentum;

    fn pid(id: i32) -> ParticleID {
        ParticleID::new(id)
    }

    #[test]
    fn builder_sets_daughter_ranges() {
        let mut builder = EventBuilder::new();
        let system = builder.push(ParticleRecord::new(
            pid(90),
            status::SYSTEM,
            momentum(125., 0., 0., 0.),
            [0, 0],
        ));
        let higgs = builder.push(ParticleRecord::new(
            pid(25),
            status::RESONANCE,
            momentum(125., 0., 0., 0.),
            [system, 0],
        ));
        let photons = builder.decay(
            higgs,
            [
                (pid(22), status::DECAY_PRODUCT, momentum(62.5, 0., 0., 62.5)),
                (pid(22), status::DECAY_PRODUCT, momentum(62.5, 0., 0., -62.5)),
            ],
        );
        assert_eq!(photons, 2..4);
        let event = builder.build();
        let higgs = event.get(higgs).unwrap();
        assert_eq!(higgs.daughters, [2, 3]);
        assert_eq!(higgs.status, status::DECAYED_RESONANCE);
        assert!(!higgs.is_final());
        assert_eq!(higgs.daughter_range().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(event.final_state().count(), 2);
        assert!(event.get(42).is_none());
    }

    #[test]
    fn empty_daughter_ranges() {
        let mut record = ParticleRecord::new(pid(22), 1, momentum(1., 0., 0., 1.), [0, 0]);
        assert_eq!(record.daughter_range().count(), 0);
        record.daughters = [5, 3];
        assert_eq!(record.daughter_range().count(), 0);
        assert!(!record.has_mother(0));
    }

    #[test]
    fn incoming_partons_from_record() {
        let records = vec![
            ParticleRecord::new(pid(90), status::SYSTEM, momentum(0., 0., 0., 0.), [0, 0]),
            ParticleRecord::new(pid(21), status::INCOMING, momentum(1., 0., 0., 1.), [0, 0]),
            ParticleRecord::new(pid(-2), status::INCOMING, momentum(1., 0., 0., -1.), [0, 0]),
        ];
        let generated = GeneratedEvent::from_record(Event::new(records)).unwrap();
        assert_eq!(generated.incoming, [pid(21), pid(-2)]);
        assert!(GeneratedEvent::from_record(Event::default()).is_none());
    }
}
