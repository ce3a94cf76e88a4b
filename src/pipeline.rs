//! Per-event analysis: locate the Higgs bosons, measure their decays, and
//! match the decay products to jets

use crate::{
    accumulator::{ResultsAccumulator, RunStatistics},
    association::{associate_with, ParticleJetMap},
    channel::{classify, ProductionChannel},
    clustering::{Jet, JetClusterer},
    config::Configuration,
    decay::{decay_products, find_decayed},
    event::{Event, EventSource, GeneratedEvent},
    kinematics::{invariant_mass, subset_invariant_masses},
    momentum::{self, Momentum},
    numeric::Float,
    random::RandomGenerator,
    scheduling::{self, Batch},
};
use eyre::Result;
use log::{trace, warn};
use particle_id::{sm_elementary_particles::photon, ParticleID};

/// Kinematics of the jet matched to a decay product
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JetMatch {
    /// Jet ordinal, 0 being the hardest jet
    pub ordinal: usize,
    /// Transverse momentum
    pub pt: Float,
    /// Pseudorapidity
    pub eta: Float,
    /// Azimuthal angle
    pub phi: Float,
    /// Invariant mass
    pub mass: Float,
}
//
impl JetMatch {
    fn new(ordinal: usize, jet: &Jet) -> Self {
        Self {
            ordinal,
            pt: jet.pt(),
            eta: jet.eta(),
            phi: jet.phi(),
            mass: jet.mass(),
        }
    }
}

/// Everything that is recorded about one Higgs decay
#[derive(Clone, Debug, PartialEq)]
pub struct DecayRecord {
    /// Number of the event within the run
    pub event: usize,
    /// Index of the Higgs in the event record
    pub higgs_index: usize,
    /// Species of the Higgs
    pub higgs_id: ParticleID,
    /// Production mechanism of the event
    pub channel: ProductionChannel,
    /// Species of the direct decay products
    pub decay_products: Vec<ParticleID>,
    /// Invariant mass of all decay products
    pub inv_mass: Float,
    /// Invariant masses of the decay product subsets, empty if disabled
    pub subset_masses: Vec<Float>,
    /// Higgs transverse momentum
    pub higgs_pt: Float,
    /// Higgs rapidity
    pub higgs_rapidity: Float,
    /// Jet matched to each decay product, if any
    pub jets: Vec<Option<JetMatch>>,
    /// Number of jets above the multiplicity threshold, if jets were clustered
    pub jet_multiplicity: Option<usize>,
}

/// Kinematics of one particle of the event record, for the particle dump
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParticleRow {
    /// Number of the event within the run
    pub event: usize,
    /// Species of the particle
    pub id: ParticleID,
    /// 4-momentum of the particle
    pub momentum: Momentum,
}

/// Analysis chain, from event generation to decay records
pub struct Pipeline<'cfg, G, C> {
    cfg: &'cfg Configuration,
    source: G,
    clusterer: C,
    lhe_channels: Option<Vec<ProductionChannel>>,
}
//
impl<'cfg, G: EventSource, C: JetClusterer> Pipeline<'cfg, G, C> {
    /// Set up the analysis of events from `source`
    pub fn new(cfg: &'cfg Configuration, source: G, clusterer: C) -> Self {
        Self {
            cfg,
            source,
            clusterer,
            lhe_channels: None,
        }
    }

    /// Take production channels from a Les Houches event file instead of
    /// the incoming partons of the generated events
    ///
    /// Event `n` of the run gets entry `n` of `channels`.
    pub fn with_lhe_channels(mut self, channels: Vec<ProductionChannel>) -> Self {
        self.lhe_channels = Some(channels);
        self
    }

    /// Production channel of an event
    pub fn channel_of(&self, event_number: usize, generated: &GeneratedEvent) -> ProductionChannel {
        match &self.lhe_channels {
            Some(channels) => channels.get(event_number).copied().unwrap_or_else(|| {
                if event_number == channels.len() {
                    warn!(
                        "Les Houches file only has {} events, further events are of unknown channel",
                        channels.len()
                    );
                }
                ProductionChannel::Unknown
            }),
            None => {
                let [parton1, parton2] = generated.incoming;
                classify(parton1, parton2)
            }
        }
    }

    /// Select the particles of an event that go to the particle dump
    fn dump_particles(&self, event_number: usize, event: &Event, results: &mut ResultsAccumulator) {
        if self.cfg.particle_dump.is_none() {
            return;
        }
        let selected = event.records().iter().filter(|particle| {
            self.cfg
                .particle_dump_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&particle.id))
        });
        results.particles.extend(selected.map(|particle| ParticleRow {
            event: event_number,
            id: particle.id,
            momentum: particle.momentum,
        }));
    }

    /// Analyze one generated event
    pub fn analyze_event(
        &self,
        event_number: usize,
        generated: &GeneratedEvent,
        results: &mut ResultsAccumulator,
    ) {
        let cfg = self.cfg;
        let event = &generated.event;
        results.stats.requested_events += 1;
        results.stats.generated_events += 1;
        let channel = self.channel_of(event_number, generated);
        self.dump_particles(event_number, event, results);

        let jets = if cfg.clustering {
            self.clusterer.cluster_event(event)
        } else {
            Vec::new()
        };
        let jet_map = ParticleJetMap::new(&jets);
        let jet_multiplicity = cfg.clustering.then(|| {
            jets.iter()
                .filter(|jet| jet.pt() > cfg.jet_multiplicity_pt)
                .count()
        });

        for higgs_index in find_decayed(event, &cfg.higgs_ids, &cfg.decayed_statuses) {
            let Some(higgs) = event.get(higgs_index) else {
                continue;
            };
            results.stats.count_candidate(channel);
            let products = decay_products(event, higgs_index);
            let (ids, momenta): (Vec<ParticleID>, Vec<Momentum>) = products
                .iter()
                .filter_map(|&idx| event.get(idx))
                .map(|particle| (particle.id, particle.momentum))
                .unzip();
            if ids.len() == 2 && ids.iter().all(|&id| id == photon) {
                results.stats.diphoton_decays += 1;
            }
            if products.len() < cfg.min_decay_products {
                trace!(
                    "Event {event_number}: skipping Higgs {higgs_index} with {} decay products",
                    products.len()
                );
                continue;
            }

            let subset_masses = if cfg.subset_masses {
                match subset_invariant_masses(&momenta) {
                    Ok(subsets) => subsets.into_iter().map(|subset| subset.mass).collect(),
                    Err(err) => {
                        warn!("Event {event_number}, Higgs {higgs_index}: {err}");
                        Vec::new()
                    }
                }
            } else {
                Vec::new()
            };
            let matched_jets = associate_with(event, &products, &jet_map)
                .into_iter()
                .map(|ordinal| ordinal.map(|ordinal| JetMatch::new(ordinal, &jets[ordinal])))
                .collect();

            let record = DecayRecord {
                event: event_number,
                higgs_index,
                higgs_id: higgs.id,
                channel,
                inv_mass: invariant_mass(&momenta),
                decay_products: ids,
                subset_masses,
                higgs_pt: momentum::pt(&higgs.momentum),
                higgs_rapidity: momentum::rapidity(&higgs.momentum),
                jets: matched_jets,
                jet_multiplicity,
            };
            trace!("{record:?}");
            results.push(record);
        }
    }

    /// Generate and analyze a batch of events
    pub fn simulate_batch(&self, batch: Batch, rng: &mut RandomGenerator) -> ResultsAccumulator {
        let mut results = ResultsAccumulator::new();
        for event_number in batch.events() {
            match self.source.generate(rng) {
                Some(generated) => self.analyze_event(event_number, &generated, &mut results),
                None => {
                    trace!("Event {event_number}: generation failed");
                    results.record_failure();
                }
            }
        }
        results
    }
}
//
impl<'cfg, G, C> Pipeline<'cfg, G, C>
where
    G: EventSource + Sync,
    C: JetClusterer + Sync,
{
    /// Run the whole analysis, as configured
    ///
    /// The results of every batch of events are handed to `output` in event
    /// order, as soon as they are available. Only the counts are kept until
    /// the end of the run.
    pub fn run(
        &self,
        mut output: impl FnMut(&ResultsAccumulator) -> Result<()>,
    ) -> Result<RunStatistics> {
        let mut stats = RunStatistics::default();
        scheduling::run_simulation(
            self.cfg.num_events,
            self.cfg.seed,
            |batch, rng| self.simulate_batch(batch, rng),
            |results| {
                stats.merge(&results.stats);
                output(&results)
            },
        )?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clustering::JetDefinition,
        event::{status, ParticleRecord},
        momentum::momentum,
        numeric::approx_eq,
    };

    fn record(id: i32, status: i32, p: Momentum, mothers: [usize; 2], daughters: [usize; 2]) -> ParticleRecord {
        let mut record = ParticleRecord::new(ParticleID::new(id), status, p, mothers);
        record.daughters = daughters;
        record
    }

    /// g g → H → γ γ, with the Higgs at index 5
    fn diphoton_event() -> GeneratedEvent {
        let zero = momentum(0., 0., 0., 0.);
        let higgs = momentum(130., 30., 0., 20.);
        let photon1 = momentum(65., 65., 0., 0.);
        let photon2 = higgs - photon1;
        let event = Event::new(vec![
            record(90, status::SYSTEM, zero, [0, 0], [0, 0]),
            record(2212, status::BEAM, zero, [0, 0], [3, 3]),
            record(2212, status::BEAM, zero, [0, 0], [4, 4]),
            record(21, status::INCOMING, momentum(75., 0., 0., 75.), [1, 0], [5, 5]),
            record(21, status::INCOMING, momentum(55., 0., 0., -55.), [2, 0], [5, 5]),
            record(25, status::DECAYED_RESONANCE, higgs, [3, 4], [6, 7]),
            record(22, status::DECAY_PRODUCT, photon1, [5, 0], [0, 0]),
            record(22, status::DECAY_PRODUCT, photon2, [5, 0], [0, 0]),
        ]);
        GeneratedEvent::from_record(event).unwrap()
    }

    struct NoEvents;
    //
    impl EventSource for NoEvents {
        fn generate(&self, _rng: &mut RandomGenerator) -> Option<GeneratedEvent> {
            None
        }
    }

    #[test]
    fn diphoton_decay_record() {
        let cfg = Configuration::default();
        let pipeline = Pipeline::new(&cfg, NoEvents, JetDefinition::default());
        let mut results = ResultsAccumulator::new();
        pipeline.analyze_event(17, &diphoton_event(), &mut results);

        assert_eq!(results.stats.higgs_candidates, 1);
        assert_eq!(results.stats.diphoton_decays, 1);
        assert_eq!(results.records.len(), 1);
        let record = &results.records[0];
        assert_eq!(record.event, 17);
        assert_eq!(record.higgs_index, 5);
        assert_eq!(record.channel, ProductionChannel::GluonFusion);
        assert_eq!(record.decay_products, vec![photon, photon]);
        let expected_mass = momentum::mass(&momentum(130., 30., 0., 20.));
        assert!(approx_eq(record.inv_mass, expected_mass, 1e-9));
        assert_eq!(record.subset_masses.len(), 1);
        assert!(approx_eq(record.subset_masses[0], expected_mass, 1e-9));
        assert!(approx_eq(record.higgs_pt, 30., 1e-12));
        assert_eq!(record.jets.len(), 2);
        assert!(record.jets.iter().all(Option::is_some));
        assert_eq!(record.jet_multiplicity, Some(2));
    }

    #[test]
    fn disabled_clustering_and_thresholds() {
        let cfg = Configuration {
            clustering: false,
            subset_masses: false,
            ..Configuration::default()
        };
        let pipeline = Pipeline::new(&cfg, NoEvents, JetDefinition::default());
        let mut results = ResultsAccumulator::new();
        pipeline.analyze_event(0, &diphoton_event(), &mut results);
        let record = &results.records[0];
        assert_eq!(record.jets, vec![None, None]);
        assert_eq!(record.jet_multiplicity, None);
        assert!(record.subset_masses.is_empty());

        let cfg = Configuration {
            min_decay_products: 3,
            ..Configuration::default()
        };
        let pipeline = Pipeline::new(&cfg, NoEvents, JetDefinition::default());
        let mut results = ResultsAccumulator::new();
        pipeline.analyze_event(0, &diphoton_event(), &mut results);
        assert!(results.records.is_empty());
        assert_eq!(results.stats.higgs_candidates, 1);
    }

    #[test]
    fn lhe_channels_by_event_number() {
        let cfg = Configuration::default();
        let pipeline = Pipeline::new(&cfg, NoEvents, JetDefinition::default())
            .with_lhe_channels(vec![ProductionChannel::ZAssociated]);
        let generated = diphoton_event();
        assert_eq!(pipeline.channel_of(0, &generated), ProductionChannel::ZAssociated);
        assert_eq!(pipeline.channel_of(1, &generated), ProductionChannel::Unknown);
        assert_eq!(pipeline.channel_of(2, &generated), ProductionChannel::Unknown);
    }

    #[test]
    fn failed_events_are_counted() {
        let cfg = Configuration {
            num_events: 1500,
            ..Configuration::default()
        };
        let mut batches = 0;
        let stats = Pipeline::new(&cfg, NoEvents, JetDefinition::default())
            .run(|results| {
                batches += 1;
                assert!(results.records.is_empty());
                Ok(())
            })
            .unwrap();
        assert_eq!(batches, 2);
        assert_eq!(stats.requested_events, 1500);
        assert_eq!(stats.failed_events, 1500);
        assert_eq!(stats.generated_events, 0);
    }

    #[test]
    fn candidates_are_counted_per_channel() {
        let cfg = Configuration::default();
        let pipeline = Pipeline::new(&cfg, NoEvents, JetDefinition::default())
            .with_lhe_channels(vec![ProductionChannel::ZAssociated]);
        let mut results = ResultsAccumulator::new();
        pipeline.analyze_event(0, &diphoton_event(), &mut results);
        pipeline.analyze_event(1, &diphoton_event(), &mut results);
        let stats = results.stats;
        assert_eq!(stats.higgs_candidates, 2);
        assert_eq!(stats.candidates_from(ProductionChannel::ZAssociated), 1);
        assert_eq!(stats.candidates_from(ProductionChannel::Unknown), 1);
    }

    #[test]
    fn particle_dump_selection() {
        let cfg = Configuration::default();
        let pipeline = Pipeline::new(&cfg, NoEvents, JetDefinition::default());
        let mut results = ResultsAccumulator::new();
        pipeline.analyze_event(4, &diphoton_event(), &mut results);
        assert!(results.particles.is_empty());

        let cfg = Configuration {
            particle_dump: Some("particles.csv".into()),
            ..Configuration::default()
        };
        let pipeline = Pipeline::new(&cfg, NoEvents, JetDefinition::default());
        let mut results = ResultsAccumulator::new();
        pipeline.analyze_event(4, &diphoton_event(), &mut results);
        assert_eq!(
            results.particles,
            vec![ParticleRow {
                event: 4,
                id: ParticleID::new(25),
                momentum: momentum(130., 30., 0., 20.),
            }]
        );

        let cfg = Configuration {
            particle_dump_ids: None,
            ..cfg
        };
        let pipeline = Pipeline::new(&cfg, NoEvents, JetDefinition::default());
        let mut results = ResultsAccumulator::new();
        pipeline.analyze_event(4, &diphoton_event(), &mut results);
        assert_eq!(results.particles.len(), diphoton_event().event.len());
        assert!(results.particles.iter().all(|row| row.event == 4));
    }
}
