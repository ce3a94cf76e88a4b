//! This module allows collecting analysis results across generated events

use crate::{
    channel::ProductionChannel,
    numeric::Float,
    pipeline::{DecayRecord, ParticleRow},
};

/// Event and decay counts of an analysis run
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStatistics {
    /// Number of events that were requested from the generator
    pub requested_events: usize,

    /// Number of events that were successfully generated
    pub generated_events: usize,

    /// Number of events whose generation failed
    pub failed_events: usize,

    /// Number of Higgs candidates found in generated events
    pub higgs_candidates: usize,

    /// Higgs candidates per production channel, indexed by channel code
    pub channel_candidates: [usize; ProductionChannel::COUNT],

    /// Number of Higgs candidates that decayed into two photons
    pub diphoton_decays: usize,

    /// Number of decay records that were produced
    pub records: usize,
}
//
impl RunStatistics {
    /// Fraction of Higgs candidates that decayed into two photons
    ///
    /// Returns `None` if no Higgs candidate was found.
    pub fn diphoton_ratio(&self) -> Option<Float> {
        (self.higgs_candidates > 0)
            .then(|| self.diphoton_decays as Float / self.higgs_candidates as Float)
    }

    /// Account for a Higgs candidate from a given production channel
    pub fn count_candidate(&mut self, channel: ProductionChannel) {
        self.higgs_candidates += 1;
        self.channel_candidates[usize::from(channel.code())] += 1;
    }

    /// Number of Higgs candidates from a given production channel
    pub fn candidates_from(&self, channel: ProductionChannel) -> usize {
        self.channel_candidates[usize::from(channel.code())]
    }

    /// Merge the counts of another batch of events
    pub fn merge(&mut self, other: &Self) {
        self.requested_events += other.requested_events;
        self.generated_events += other.generated_events;
        self.failed_events += other.failed_events;
        self.higgs_candidates += other.higgs_candidates;
        for (count, other_count) in self.channel_candidates.iter_mut().zip(other.channel_candidates) {
            *count += other_count;
        }
        self.diphoton_decays += other.diphoton_decays;
        self.records += other.records;
    }
}

/// Results of the analysis of a batch of events
///
/// Batches are written out as soon as they are complete, so only the counts
/// outlive them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultsAccumulator {
    /// Decay records, in event order
    pub records: Vec<DecayRecord>,

    /// Dumped particles, in event order
    pub particles: Vec<ParticleRow>,

    /// Counts for the summary
    pub stats: RunStatistics,
}
//
impl ResultsAccumulator {
    /// Prepare for results collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one event that failed to generate
    pub fn record_failure(&mut self) {
        self.stats.requested_events += 1;
        self.stats.failed_events += 1;
    }

    /// Add one decay record
    pub fn push(&mut self, record: DecayRecord) {
        self.stats.records += 1;
        self.records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diphoton_ratio() {
        let mut stats = RunStatistics::default();
        assert_eq!(stats.diphoton_ratio(), None);
        stats.higgs_candidates = 400;
        stats.diphoton_decays = 1;
        assert_eq!(stats.diphoton_ratio(), Some(0.0025));
    }

    #[test]
    fn merge_adds_counts() {
        let mut first = ResultsAccumulator::new();
        first.record_failure();
        first.stats.count_candidate(ProductionChannel::GluonFusion);
        first.stats.count_candidate(ProductionChannel::WAssociated);
        let mut second = ResultsAccumulator::new();
        second.record_failure();
        second.stats.generated_events = 5;
        second.stats.diphoton_decays = 1;
        second.stats.count_candidate(ProductionChannel::GluonFusion);
        first.stats.merge(&second.stats);

        let mut channel_candidates = [0; ProductionChannel::COUNT];
        channel_candidates[1] = 2;
        channel_candidates[5] = 1;
        assert_eq!(
            first.stats,
            RunStatistics {
                requested_events: 2,
                generated_events: 5,
                failed_events: 2,
                higgs_candidates: 3,
                channel_candidates,
                diphoton_decays: 1,
                records: 0,
            }
        );
        assert_eq!(first.stats.candidates_from(ProductionChannel::GluonFusion), 2);
        assert_eq!(first.stats.candidates_from(ProductionChannel::Unknown), 0);
    }
}
