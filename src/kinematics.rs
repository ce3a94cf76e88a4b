//! Invariant masses of decay products

use crate::{
    momentum::{self, Momentum},
    numeric::Float,
};
use thiserror::Error;

/// Largest number of momenta accepted by `subset_invariant_masses`
///
/// The number of subsets grows as 2ⁿ. Decay multiplicities are in the single
/// digits, so this bound is only hit by malformed input.
pub const MAX_SUBSET_INPUTS: usize = 12;

/// Errors from the kinematic calculations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KinematicsError {
    /// Too many inputs for the combinatorial enumeration
    #[error("Refusing to enumerate the subsets of {count} momenta (at most {max} supported)")]
    TooManyInputs {
        /// Number of momenta that were passed
        count: usize,
        /// Largest supported number of momenta
        max: usize,
    },
}

/// Invariant mass of the sum of `momenta`
///
/// Negative squared masses, which only arise from accumulated round-off, are
/// clamped to zero. An empty input has zero mass.
pub fn invariant_mass<'a>(momenta: impl IntoIterator<Item = &'a Momentum>) -> Float {
    momentum::mass(&momentum::total(momenta))
}

/// Invariant mass of a subset of decay products
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SubsetMass {
    /// Bit `b` is set if input `b` belongs to the subset
    pub members: u32,
    /// Invariant mass of the subset
    pub mass: Float,
}
//
impl SubsetMass {
    /// Number of momenta in the subset
    pub fn len(&self) -> usize {
        self.members.count_ones() as usize
    }

    /// Truth that the subset is empty (never the case for enumerated subsets)
    pub fn is_empty(&self) -> bool {
        self.members == 0
    }
}

/// Invariant masses of all subsets with at least two members
///
/// Subsets are enumerated by ascending bitmask, bit `b` selecting
/// `momenta[b]`. For n inputs, there are 2ⁿ - n - 1 such subsets.
pub fn subset_invariant_masses(momenta: &[Momentum]) -> Result<Vec<SubsetMass>, KinematicsError> {
    let count = momenta.len();
    if count > MAX_SUBSET_INPUTS {
        return Err(KinematicsError::TooManyInputs {
            count,
            max: MAX_SUBSET_INPUTS,
        });
    }
    let num_subsets = 1u32 << count;
    let masses = (1..num_subsets)
        .filter(|members| members.count_ones() >= 2)
        .map(|members| {
            let selected = momenta
                .iter()
                .enumerate()
                .filter(|&(b, _)| members & (1 << b) != 0)
                .map(|(_, p)| p);
            SubsetMass {
                members,
                mass: invariant_mass(selected),
            }
        })
        .collect();
    Ok(masses)
}
