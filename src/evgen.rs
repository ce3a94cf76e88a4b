//! This module provides event generation facilities
//!
//! `ToyHiggsGenerator` is a small Monte Carlo that produces event records of
//! Higgs production in proton collisions, followed by the decay of the Higgs
//! and of every unstable particle, and a collinear fragmentation of coloured
//! partons into pions. It makes no attempt at physical accuracy beyond exact
//! energy-momentum conservation and realistic record structure.

use crate::{
    config::Configuration,
    event::{status, EventBuilder, EventSource, GeneratedEvent, ParticleRecord, SYSTEM_INDEX},
    momentum::{self, momentum, Momentum},
    numeric::Float,
    random::RandomGenerator,
};
use nalgebra::Vector3;
use particle_id::{
    sm_elementary_particles::{bottom, gluon, photon},
    ParticleID,
};
use prefix_num_ops::real::*;

/// Top quark mass (GeV)
pub const TOP_MASS: Float = 172.5;

/// W boson mass (GeV)
const W_MASS: Float = 80.38;

/// Z boson mass (GeV)
const Z_MASS: Float = 91.19;

const PROTON: ParticleID = ParticleID::new(2212);
const SYSTEM: ParticleID = ParticleID::new(90);
const HIGGS: ParticleID = ParticleID::new(25);

const TOP: i32 = 6;
const TAU: i32 = 15;
const Z_BOSON: i32 = 23;
const W_BOSON: i32 = 24;
const TAU_NEUTRINO: i32 = 16;
const CHARGED_PION: i32 = 211;
const NEUTRAL_PION: i32 = 111;

/// Higgs decay modes and their branching ratios
const HIGGS_DECAYS: [(Float, [i32; 2]); 9] = [
    (0.58, [5, -5]),
    (0.21, [24, -24]),
    (0.08, [21, 21]),
    (0.063, [15, -15]),
    (0.029, [4, -4]),
    (0.026, [23, 23]),
    (0.0023, [22, 22]),
    (0.0015, [23, 22]),
    (0.0002, [13, -13]),
];

/// Z decay modes and their branching ratios
const Z_DECAYS: [(Float, [i32; 2]); 11] = [
    (0.156, [1, -1]),
    (0.116, [2, -2]),
    (0.156, [3, -3]),
    (0.12, [4, -4]),
    (0.152, [5, -5]),
    (0.034, [11, -11]),
    (0.034, [13, -13]),
    (0.034, [15, -15]),
    (0.067, [12, -12]),
    (0.067, [14, -14]),
    (0.067, [16, -16]),
];

/// W⁺ decay modes and their branching ratios, W⁻ is charge conjugated
const W_PLUS_DECAYS: [(Float, [i32; 2]); 5] = [
    (0.33, [2, -1]),
    (0.33, [4, -3]),
    (0.11, [-11, 12]),
    (0.11, [-13, 14]),
    (0.11, [-15, 16]),
];

/// Rest mass of a particle species (GeV), zero for light species
fn rest_mass(id: i32) -> Float {
    match id.abs() {
        4 => 1.27,
        5 => 4.18,
        6 => TOP_MASS,
        13 => 0.105_66,
        15 => 1.777,
        23 => Z_MASS,
        24 => W_MASS,
        111 => 0.135,
        211 => 0.139_57,
        _ => 0.,
    }
}

/// Truth that a species fragments into hadrons
fn is_coloured(id: i32) -> bool {
    let id = id.abs();
    id <= bottom.id() || id == gluon.id()
}

/// Hard processes known to the generator
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum HardProcess {
    /// g g → H g
    GluonFusion,
    /// q q' → H q q'
    VectorBosonFusion,
    /// q V → H q'
    VectorAssociated,
    /// t t̄ → H t t̄ or q q̄ → H t t̄
    TopAssociated,
}
//
impl HardProcess {
    const ALL: [HardProcess; 4] = [
        HardProcess::GluonFusion,
        HardProcess::VectorBosonFusion,
        HardProcess::VectorAssociated,
        HardProcess::TopAssociated,
    ];
}

/// Minimal center-of-mass energy of a hard process with Higgs mass `higgs_mass`
pub fn production_threshold(higgs_mass: Float, with_top_pairs: bool) -> Float {
    if with_top_pairs {
        higgs_mass + 2. * TOP_MASS
    } else {
        higgs_mass
    }
}

/// Generator of toy Higgs production events
#[derive(Clone, Debug)]
pub struct ToyHiggsGenerator {
    /// Total center-of-mass energy of the collision
    e_cm: Float,

    /// Higgs boson mass
    higgs_mass: Float,

    /// Probability that an event fails to generate
    failure_rate: Float,

    /// Relative weights of the hard processes, in `HardProcess::ALL` order
    process_weights: [Float; 4],
}
//
impl ToyHiggsGenerator {
    /// Set up event generation from the simulation configuration
    pub fn new(cfg: &Configuration) -> Self {
        Self {
            e_cm: cfg.e_cm,
            higgs_mass: cfg.higgs_mass,
            failure_rate: cfg.failure_rate,
            process_weights: [cfg.frac_ggf, cfg.frac_vbf, cfg.frac_vh, cfg.frac_tth],
        }
    }

    /// Beam energy
    fn e_beam(&self) -> Float {
        self.e_cm / 2.
    }

    /// Pick incoming partons and hard process final state
    fn hard_process(&self, rng: &mut RandomGenerator) -> ([i32; 2], Vec<i32>) {
        let h = HIGGS.id();
        match HardProcess::ALL[rng.pick_weighted(&self.process_weights)] {
            HardProcess::GluonFusion => ([21, 21], vec![h, 21]),
            HardProcess::VectorBosonFusion => {
                let a = random_quark(rng, 5);
                let mut b = random_quark(rng, 5);
                while b.abs() == a.abs() {
                    b = random_quark(rng, 5);
                }
                ([a, b], vec![h, a, b])
            }
            HardProcess::VectorAssociated => {
                if rng.chance(0.5) {
                    let q = random_quark(rng, 5);
                    ([q, Z_BOSON], vec![h, q])
                } else {
                    // Isospin partner keeps the charge balanced
                    let q = random_quark(rng, 4);
                    let flavour = q.abs();
                    let (w, partner) = if flavour % 2 == 0 {
                        (-W_BOSON, flavour - 1)
                    } else {
                        (W_BOSON, flavour + 1)
                    };
                    ([q, q.signum() * w], vec![h, q.signum() * partner])
                }
            }
            HardProcess::TopAssociated => {
                let incoming = if rng.chance(0.5) {
                    [TOP, -TOP]
                } else {
                    let q = random_quark(rng, 5).abs();
                    [q, -q]
                };
                (incoming, vec![h, TOP, -TOP])
            }
        }
    }

    /// Pick the partonic center-of-mass energy and the longitudinal boost
    ///
    /// Returns the incoming parton momenta.
    fn incoming_momenta(&self, rng: &mut RandomGenerator, threshold: Float) -> [Momentum; 2] {
        let sqrt_s_hat = (threshold + rng.exponential(0.5 * threshold)).min(self.e_cm);
        let tau = (sqrt_s_hat / self.e_cm).powi(2);
        let max_rapidity = -0.5 * ln(tau);
        let y = rng.uniform(-max_rapidity, max_rapidity);
        let sqrt_tau = sqrt(tau);
        let e1 = (sqrt_tau * exp(y)).min(1.) * self.e_beam();
        let e2 = (sqrt_tau * exp(-y)).min(1.) * self.e_beam();
        [momentum(e1, 0., 0., e1), momentum(e2, 0., 0., -e2)]
    }

    /// Decay, fragment, or leave alone the particle at `index`
    fn evolve(&self, rng: &mut RandomGenerator, builder: &mut EventBuilder, index: usize) {
        let particle = *builder.get(index);
        let id = particle.id.id();
        if particle.id == HIGGS && particle.status == status::RESONANCE {
            decay(rng, builder, index, &HIGGS_DECAYS, false);
            return;
        }
        match id.abs() {
            Z_BOSON => decay(rng, builder, index, &Z_DECAYS, false),
            W_BOSON => decay(rng, builder, index, &W_PLUS_DECAYS, id < 0),
            TOP => {
                let decays = [(1., [W_BOSON, bottom.id()])];
                decay(rng, builder, index, &decays, id < 0)
            }
            TAU => {
                let decays = [(1., [TAU_NEUTRINO, -CHARGED_PION])];
                decay(rng, builder, index, &decays, id < 0)
            }
            _ if is_coloured(id) => fragment(rng, builder, index),
            _ => {}
        }
    }
}

impl EventSource for ToyHiggsGenerator {
    fn generate(&self, rng: &mut RandomGenerator) -> Option<GeneratedEvent> {
        if rng.chance(self.failure_rate) {
            return None;
        }

        // Hard process kinematics
        let (incoming_ids, outgoing_ids) = self.hard_process(rng);
        let masses: Vec<Float> = outgoing_ids
            .iter()
            .map(|&id| if id == HIGGS.id() { self.higgs_mass } else { rest_mass(id) })
            .collect();
        let threshold: Float = masses.iter().sum();
        let incoming = self.incoming_momenta(rng, threshold);
        let outgoing = split(rng, &(incoming[0] + incoming[1]), &masses);

        // System and beams
        let mut builder = EventBuilder::new();
        let e_beam = self.e_beam();
        builder.push(ParticleRecord::new(
            SYSTEM,
            status::SYSTEM,
            momentum(self.e_cm, 0., 0., 0.),
            [0, 0],
        ));
        let beams = [
            momentum(e_beam, 0., 0., e_beam),
            momentum(e_beam, 0., 0., -e_beam),
        ];
        for beam in beams {
            builder.push(ParticleRecord::new(PROTON, status::BEAM, beam, [SYSTEM_INDEX, 0]));
        }

        // Incoming partons, each coming from one beam
        let mut parton_indices = [0; 2];
        for (side, (&id, p)) in incoming_ids.iter().zip(incoming).enumerate() {
            let beam = side + 1;
            let parton = builder.push(ParticleRecord::new(
                ParticleID::new(id),
                status::INCOMING,
                p,
                [beam, 0],
            ));
            builder.get_mut(beam).daughters = [parton, parton];
            parton_indices[side] = parton;
        }

        // Hard process outgoing particles
        let first_outgoing = builder.len();
        for (&id, p) in outgoing_ids.iter().zip(outgoing) {
            let status = if id == HIGGS.id() { status::RESONANCE } else { status::OUTGOING };
            builder.push(ParticleRecord::new(ParticleID::new(id), status, p, parton_indices));
        }
        let last_outgoing = builder.len() - 1;
        for parton in parton_indices {
            builder.get_mut(parton).daughters = [first_outgoing, last_outgoing];
        }

        // Everything appended after this point is processed in turn
        let mut next = first_outgoing;
        while next < builder.len() {
            self.evolve(rng, &mut builder, next);
            next += 1;
        }

        GeneratedEvent::from_record(builder.build())
    }
}

/// Random quark or antiquark with flavour up to `max_flavour`
fn random_quark(rng: &mut RandomGenerator, max_flavour: i32) -> i32 {
    let flavour = rng.int_in(1, max_flavour);
    if rng.chance(0.5) {
        flavour
    } else {
        -flavour
    }
}

/// Two-body decay of `parent` into particles of masses `m1` and `m2`
///
/// The decay is isotropic in the parent rest frame. The second momentum is
/// computed as the difference to the parent, which conserves 4-momentum to
/// rounding accuracy.
fn two_body(rng: &mut RandomGenerator, parent: &Momentum, m1: Float, m2: Float) -> [Momentum; 2] {
    let m = momentum::mass(parent);
    let p_star2 = (m.powi(2) - (m1 + m2).powi(2)) * (m.powi(2) - (m1 - m2).powi(2));
    let p_star = if p_star2 > 0. && m > 0. {
        sqrt(p_star2) / (2. * m)
    } else {
        0.
    };
    let (cos_theta, phi) = rng.direction();
    let sin_theta = sqrt((1. - cos_theta.powi(2)).max(0.));
    let direction = Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta);
    let spatial = p_star * direction;
    let at_rest = momentum(
        sqrt(p_star.powi(2) + m1.powi(2)),
        spatial[0],
        spatial[1],
        spatial[2],
    );
    let first = if parent[momentum::E] > 0. {
        momentum::boost(&at_rest, &momentum::velocity(parent))
    } else {
        at_rest
    };
    [first, parent - first]
}

/// Split `total` into particles of the given masses
///
/// Proceeds as a chain of two-body decays, where the remainder system gets a
/// random mass between its threshold and the available energy.
fn split(rng: &mut RandomGenerator, total: &Momentum, masses: &[Float]) -> Vec<Momentum> {
    match masses {
        [] => Vec::new(),
        [_] => vec![*total],
        [first_mass, rest @ ..] => {
            let rest_threshold: Float = rest.iter().sum();
            let rest_mass = if rest.len() == 1 {
                rest_threshold
            } else {
                let available = momentum::mass(total) - first_mass;
                rng.uniform(rest_threshold, available.max(rest_threshold))
            };
            let [first, remainder] = two_body(rng, total, *first_mass, rest_mass);
            let mut result = vec![first];
            result.extend(split(rng, &remainder, rest));
            result
        }
    }
}

/// Masses of a pair of vector bosons from the decay of a parent of mass `m`
///
/// Below threshold, the first boson is on-shell when possible and the second
/// is off-shell.
fn daughter_masses(rng: &mut RandomGenerator, m: Float, products: [i32; 2]) -> [Float; 2] {
    let [id1, id2] = products;
    let on_shell1 = rest_mass(id1);
    let on_shell2 = rest_mass(id2);
    if on_shell1 + on_shell2 < m {
        return [on_shell1, on_shell2];
    }
    let vector = |id: i32| matches!(id.abs(), Z_BOSON | W_BOSON);
    if vector(id1) {
        let m1 = on_shell1.min(0.8 * m);
        let m2 = if vector(id2) {
            on_shell2.min(rng.uniform(0.05, 0.95) * (m - m1))
        } else {
            on_shell2
        };
        [m1, m2]
    } else {
        [on_shell1, on_shell2]
    }
}

/// Decay the particle at `index` according to a table of decay modes
///
/// Modes that are kinematically closed are ignored. If `conjugate` is set,
/// all product species are charge conjugated.
fn decay(
    rng: &mut RandomGenerator,
    builder: &mut EventBuilder,
    index: usize,
    modes: &[(Float, [i32; 2])],
    conjugate: bool,
) {
    let parent = builder.get(index).momentum;
    let m = momentum::mass(&parent);
    let open = |products: [i32; 2]| {
        let [id1, id2] = products;
        let vector = |id: i32| matches!(id.abs(), Z_BOSON | W_BOSON);
        vector(id1) || vector(id2) || rest_mass(id1) + rest_mass(id2) < m
    };
    let weights: Vec<Float> = modes
        .iter()
        .map(|&(weight, products)| if open(products) { weight } else { 0. })
        .collect();
    if weights.iter().all(|&w| w <= 0.) {
        return;
    }
    let (_, products) = modes[rng.pick_weighted(&weights)];
    let products = if conjugate {
        products.map(conjugated)
    } else {
        products
    };
    let [m1, m2] = daughter_masses(rng, m, products);
    let [p1, p2] = two_body(rng, &parent, m1, m2);
    builder.decay(
        index,
        [
            (ParticleID::new(products[0]), status::DECAY_PRODUCT, p1),
            (ParticleID::new(products[1]), status::DECAY_PRODUCT, p2),
        ],
    );
}

/// Charge conjugate of a species, for the species used in decay tables
fn conjugated(id: i32) -> i32 {
    if id == gluon.id() || id == photon.id() || id.abs() == Z_BOSON {
        id
    } else {
        -id
    }
}

/// Collinear fragmentation of a coloured parton into 2 to 4 pions
fn fragment(rng: &mut RandomGenerator, builder: &mut EventBuilder, index: usize) {
    let parent = builder.get(index).momentum;
    let num_hadrons = rng.int_in(2, 4) as usize;
    let shares: Vec<Float> = (0..num_hadrons).map(|_| rng.uniform(0.1, 1.)).collect();
    let sum: Float = shares.iter().sum();
    let mut remainder = parent;
    let mut hadrons = Vec::with_capacity(num_hadrons);
    for (i, share) in shares.iter().enumerate() {
        let p = if i + 1 == num_hadrons {
            remainder
        } else {
            parent * (share / sum)
        };
        remainder -= p;
        let id = match rng.int_in(0, 2) {
            0 => CHARGED_PION,
            1 => -CHARGED_PION,
            _ => NEUTRAL_PION,
        };
        hadrons.push((ParticleID::new(id), status::HADRON, p));
    }
    builder.decay(index, hadrons);
}
