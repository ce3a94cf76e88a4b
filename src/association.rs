//! Matching of decay products to the jets their descendants ended up in

use std::collections::HashMap;

use crate::{clustering::Jet, decay::trace_to_final_state, event::Event};

/// Lookup table from final-state particle index to jet ordinal
///
/// Jet ordinals are positions in the jet list, which is sorted by decreasing
/// transverse momentum.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParticleJetMap(HashMap<usize, usize>);
//
impl ParticleJetMap {
    /// Index the constituents of a jet collection
    pub fn new(jets: &[Jet]) -> Self {
        let map = jets
            .iter()
            .enumerate()
            .flat_map(|(ordinal, jet)| jet.constituents.iter().map(move |&idx| (idx, ordinal)))
            .collect();
        Self(map)
    }

    /// Jet containing a given final-state particle, if any
    pub fn jet_of(&self, particle: usize) -> Option<usize> {
        self.0.get(&particle).copied()
    }
}

/// Find, for each decay product, the jet that its descendants went into
///
/// The output is aligned with `decay_products`. When descendants of one
/// decay product end up in several jets, the last descendant in depth-first
/// order decides. Decay products without any clustered descendant map to
/// `None`.
pub fn associate(event: &Event, decay_products: &[usize], jets: &[Jet]) -> Vec<Option<usize>> {
    let jet_map = ParticleJetMap::new(jets);
    associate_with(event, decay_products, &jet_map)
}

/// Same as `associate`, reusing a prebuilt jet map
pub fn associate_with(
    event: &Event,
    decay_products: &[usize],
    jet_map: &ParticleJetMap,
) -> Vec<Option<usize>> {
    decay_products
        .iter()
        .map(|&product| {
            trace_to_final_state(event, product)
                .into_iter()
                .filter_map(|descendant| jet_map.jet_of(descendant))
                .last()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clustering::{JetClusterer, JetDefinition},
        decay::{decay_products, find_decayed},
        event::{status, ParticleRecord},
        kinematics::invariant_mass,
        momentum::{momentum, Momentum},
        numeric::approx_eq,
    };
    use particle_id::ParticleID;

    fn record(id: i32, status: i32, p: Momentum, mothers: [usize; 2], daughters: [usize; 2]) -> ParticleRecord {
        let mut record = ParticleRecord::new(ParticleID::new(id), status, p, mothers);
        record.daughters = daughters;
        record
    }

    fn jet(constituents: Vec<usize>) -> Jet {
        Jet {
            momentum: momentum(1., 0., 0., 0.),
            constituents,
        }
    }

    /// system, beam, Higgs -> two photons
    fn diphoton_event() -> Event {
        let zero = momentum(0., 0., 0., 0.);
        Event::new(vec![
            record(90, status::SYSTEM, momentum(126., 0., 0., 0.), [0, 0], [0, 0]),
            record(2212, status::BEAM, zero, [0, 0], [0, 0]),
            record(25, status::DECAYED_RESONANCE, momentum(126., 0., 0., 0.), [0, 0], [3, 4]),
            record(22, status::DECAY_PRODUCT, momentum(63., 0., 0., 62.), [2, 0], [0, 0]),
            record(22, status::DECAY_PRODUCT, momentum(63., 0., 0., -62.), [2, 0], [0, 0]),
        ])
    }

    #[test]
    fn no_jets_no_association() {
        let event = diphoton_event();
        assert_eq!(associate(&event, &[3, 4], &[]), vec![None, None]);
        assert_eq!(ParticleJetMap::new(&[]).jet_of(3), None);
    }

    #[test]
    fn last_descendant_wins() {
        let p = momentum(1., 0., 0., 0.5);
        let event = Event::new(vec![
            record(90, status::SYSTEM, p, [0, 0], [0, 0]),
            record(25, status::DECAYED_RESONANCE, p, [0, 0], [2, 2]),
            record(5, -91, p, [1, 0], [3, 4]),
            record(211, status::HADRON, p, [2, 0], [0, 0]),
            record(-211, status::HADRON, p, [2, 0], [0, 0]),
        ]);
        let jets = [jet(vec![4]), jet(vec![3])];
        assert_eq!(associate(&event, &[2], &jets), vec![Some(0)]);
        let jets = [jet(vec![3]), jet(vec![4])];
        assert_eq!(associate(&event, &[2], &jets), vec![Some(1)]);
    }

    #[test]
    fn unclustered_products_are_unmatched() {
        let event = diphoton_event();
        let jets = [jet(vec![3])];
        assert_eq!(associate(&event, &[3, 4], &jets), vec![Some(0), None]);
    }

    #[test]
    fn higgs_to_diphoton_end_to_end() {
        let event = diphoton_event();
        let higgs = find_decayed(&event, &[ParticleID::new(25)], &[status::DECAYED_RESONANCE]);
        assert_eq!(higgs, vec![2]);
        let products = decay_products(&event, higgs[0]);
        assert_eq!(products, vec![3, 4]);
        let momenta: Vec<_> = products.iter().map(|&i| event.records()[i].momentum).collect();
        assert!(approx_eq(invariant_mass(&momenta), 126., 1e-6));

        // Both photons run along the beam axis, out of reach of any jet
        let jets = JetDefinition::default().cluster_event(&event);
        assert!(jets.is_empty());
        assert_eq!(associate(&event, &products, &jets), vec![None, None]);
    }

    #[test]
    fn back_to_back_photons_land_in_separate_jets() {
        let mut records = diphoton_event().records().to_vec();
        records[3].momentum = momentum(63., 0., 62., 0.);
        records[4].momentum = momentum(63., 0., -62., 0.);
        let event = Event::new(records);
        let jets = JetDefinition::default().cluster_event(&event);
        assert_eq!(jets.len(), 2);
        let matched = associate(&event, &[3, 4], &jets);
        assert!(matched.iter().all(Option::is_some));
        assert_ne!(matched[0], matched[1]);
    }
}
