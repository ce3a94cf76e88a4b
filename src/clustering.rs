//! Jet clustering of final-state particles
//!
//! Jets are clustered with `jetty`. Its clustering history is replayed to keep
//! track of the event indices of the constituents of every jet, so that decay
//! products can later be matched to jets.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use crate::{
    event::Event,
    momentum::{self, Momentum, E, X, Y, Z},
    numeric::Float,
};
use jetty::{anti_kt_f, cambridge_aachen_f, kt_f, ClusterHistory, ClusterStep, PseudoJet};
use thiserror::Error;

/// Jet clustering algorithms
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum JetAlgorithm {
    /// The [anti-kt](https://arxiv.org/abs/0802.1189) algorithm
    #[default]
    AntiKt,
    /// The [kt](https://arxiv.org/abs/hep-ph/9305266) algorithm
    Kt,
    /// The [Cambridge](https://arxiv.org/abs/hep-ph/9707323)/[Aachen](https://arxiv.org/abs/hep-ph/9907280) algorithm
    CambridgeAachen,
}

impl Display for JetAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JetAlgorithm::AntiKt => "anti-kt",
            JetAlgorithm::Kt => "kt",
            JetAlgorithm::CambridgeAachen => "Cambridge/Aachen",
        };
        write!(f, "{name}")
    }
}

/// Error for unrecognized jet algorithm names
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown jet algorithm: {0}")]
pub struct UnknownJetAlgorithm(String);

impl FromStr for JetAlgorithm {
    type Err = UnknownJetAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anti_kt" | "antikt" | "anti-kt" => Ok(Self::AntiKt),
            "kt" => Ok(Self::Kt),
            "Cambridge/Aachen" | "Cambridge-Aachen" | "Cambridge_Aachen"
            | "cambridge/aachen" | "cambridge-aachen" | "cambridge_aachen" => {
                Ok(Self::CambridgeAachen)
            }
            _ => Err(UnknownJetAlgorithm(s.to_string())),
        }
    }
}

/// Final-state particle handed to a jet clusterer
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ClusterInput {
    /// Index of the particle in its event
    pub index: usize,
    /// 4-momentum of the particle
    pub momentum: Momentum,
}

/// A clustered jet
#[derive(Clone, PartialEq, Debug)]
pub struct Jet {
    /// Sum of the constituent 4-momenta
    pub momentum: Momentum,
    /// Event indices of the constituents, in ascending order
    pub constituents: Vec<usize>,
}
//
impl Jet {
    /// Jet made of a single particle
    fn from_input(input: &ClusterInput) -> Self {
        Self {
            momentum: input.momentum,
            constituents: vec![input.index],
        }
    }

    /// Recombine two jets in the E scheme
    fn combine(mut self, other: Self) -> Self {
        self.momentum += other.momentum;
        self.constituents.extend(other.constituents);
        self
    }

    fn pseudojet(&self) -> PseudoJet {
        to_pseudojet(&self.momentum)
    }

    /// Transverse momentum
    pub fn pt(&self) -> Float {
        let pt: f64 = self.pseudojet().pt().into();
        pt as Float
    }

    /// Pseudorapidity
    pub fn eta(&self) -> Float {
        momentum::eta(&self.momentum)
    }

    /// Azimuthal angle in [0, 2π)
    pub fn phi(&self) -> Float {
        let phi: f64 = self.pseudojet().phi().into();
        phi as Float
    }

    /// Invariant mass
    pub fn mass(&self) -> Float {
        momentum::mass(&self.momentum)
    }
}

/// Convert a 4-momentum to a `jetty` pseudojet
fn to_pseudojet(p: &Momentum) -> PseudoJet {
    [p[E] as f64, p[X] as f64, p[Y] as f64, p[Z] as f64].into()
}

/// Anything that groups final-state particles into jets
///
/// Jets must be returned in order of decreasing transverse momentum, so that
/// the position in the output is the jet ordinal.
pub trait JetClusterer {
    /// Cluster the given particles into jets
    fn cluster(&self, inputs: &[ClusterInput]) -> Vec<Jet>;

    /// Cluster all final-state particles of an event
    fn cluster_event(&self, event: &Event) -> Vec<Jet> {
        let inputs: Vec<_> = event
            .final_state()
            .map(|(index, particle)| ClusterInput {
                index,
                momentum: particle.momentum,
            })
            .collect();
        if inputs.is_empty() {
            return Vec::new();
        }
        self.cluster(&inputs)
    }
}

/// Jet definition for sequential recombination clustering
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct JetDefinition {
    /// Jet algorithm
    pub algorithm: JetAlgorithm,
    /// Jet radius parameter
    pub radius: Float,
    /// Minimum jet transverse momentum
    pub min_pt: Float,
}
//
impl Default for JetDefinition {
    fn default() -> Self {
        Self {
            algorithm: JetAlgorithm::AntiKt,
            radius: 0.4,
            min_pt: 0.,
        }
    }
}
//
impl JetClusterer for JetDefinition {
    fn cluster(&self, inputs: &[ClusterInput]) -> Vec<Jet> {
        // Particles along the beam axis have no rapidity and cannot be
        // clustered with a finite radius
        let inputs: Vec<_> = inputs
            .iter()
            .filter(|input| momentum::pt2(&input.momentum) > 0.)
            .collect();
        let pseudojets: Vec<PseudoJet> = inputs.iter().map(|input| to_pseudojet(&input.momentum)).collect();
        let r = self.radius as f64;
        let steps: Vec<ClusterStep> = match self.algorithm {
            JetAlgorithm::AntiKt => ClusterHistory::new(pseudojets, anti_kt_f(r)).collect(),
            JetAlgorithm::Kt => ClusterHistory::new(pseudojets, kt_f(r)).collect(),
            JetAlgorithm::CambridgeAachen => {
                ClusterHistory::new(pseudojets, cambridge_aachen_f(r)).collect()
            }
        };

        // Replay the history. The inputs come first, every recombination
        // appends a new pseudojet.
        let mut history: Vec<Option<Jet>> = inputs.iter().map(|input| Some(Jet::from_input(input))).collect();
        let mut jets = Vec::new();
        for step in steps {
            match step {
                ClusterStep::Combine([i, j]) => {
                    let first = history.get_mut(i).and_then(Option::take);
                    let second = history.get_mut(j).and_then(Option::take);
                    let combined = match (first, second) {
                        (Some(first), Some(second)) => Some(first.combine(second)),
                        (first, second) => first.or(second),
                    };
                    history.push(combined);
                }
                ClusterStep::Jet(i) => {
                    if let Some(jet) = history.get_mut(i).and_then(Option::take) {
                        jets.push(jet);
                    }
                }
            }
        }

        jets.retain(|jet| jet.pt() >= self.min_pt);
        for jet in &mut jets {
            jet.constituents.sort_unstable();
        }
        jets.sort_by(|a, b| b.pt().total_cmp(&a.pt()));
        jets
    }
}
