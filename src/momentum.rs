//! This module implements some domain-specific 4-momentum handling logic.

use crate::numeric::Float;
use nalgebra::{SVector, Vector3};
use num_traits::Zero;
use prefix_num_ops::real::*;

/// 4-momentum dimension
pub const MOMENTUM_DIM: usize = 4;

/// Relativistic 4-momentum
pub type Momentum = SVector<Float, MOMENTUM_DIM>;

/// Convenience const for accessing the X coordinate of a 4-vector
pub const X: usize = 0;

/// Convenience const for accessing the Y coordinate of a 4-vector
pub const Y: usize = 1;

/// Convenience const for accessing the Z coordinate of a 4-vector
pub const Z: usize = 2;

/// Convenience const for accessing the E coordinate of a 4-vector
pub const E: usize = 3;

/// Cap on |rapidity| and |pseudorapidity| for momenta along the beam axis
pub const MAX_RAPIDITY: Float = 1e5;

/// Build a 4-momentum from its energy and spatial components
pub fn momentum(e: Float, px: Float, py: Float, pz: Float) -> Momentum {
    Momentum::new(px, py, pz, e)
}

/// Sum a collection of 4-momenta
pub fn total<'a>(momenta: impl IntoIterator<Item = &'a Momentum>) -> Momentum {
    momenta
        .into_iter()
        .fold(Momentum::zero(), |acc, p| acc + p)
}

/// Squared invariant mass E² - |p|², which may be negative due to round-off
pub fn mass2(p: &Momentum) -> Float {
    p[E] * p[E] - p.xyz().norm_squared()
}

/// Invariant mass, with negative squared masses clamped to zero
pub fn mass(p: &Momentum) -> Float {
    let m2 = mass2(p);
    if m2 > 0. {
        sqrt(m2)
    } else {
        0.
    }
}

/// Squared transverse momentum
pub fn pt2(p: &Momentum) -> Float {
    p[X] * p[X] + p[Y] * p[Y]
}

/// Transverse momentum
pub fn pt(p: &Momentum) -> Float {
    sqrt(pt2(p))
}

/// Azimuthal angle in (-π, π]
pub fn phi(p: &Momentum) -> Float {
    if p[X] == 0. && p[Y] == 0. {
        0.
    } else {
        p[Y].atan2(p[X])
    }
}

/// Rapidity ½ ln((E + pz) / (E - pz))
pub fn rapidity(p: &Momentum) -> Float {
    let plus = p[E] + p[Z];
    let minus = p[E] - p[Z];
    if plus <= 0. {
        -MAX_RAPIDITY
    } else if minus <= 0. {
        MAX_RAPIDITY
    } else {
        (0.5 * ln(plus / minus)).clamp(-MAX_RAPIDITY, MAX_RAPIDITY)
    }
}

/// Pseudorapidity ½ ln((|p| + pz) / (|p| - pz))
pub fn eta(p: &Momentum) -> Float {
    let abs_p = p.xyz().norm();
    let plus = abs_p + p[Z];
    let minus = abs_p - p[Z];
    if plus <= 0. {
        -MAX_RAPIDITY
    } else if minus <= 0. {
        MAX_RAPIDITY
    } else {
        (0.5 * ln(plus / minus)).clamp(-MAX_RAPIDITY, MAX_RAPIDITY)
    }
}

/// Lorentz boost of `p` by the velocity `beta` (|beta| < 1)
pub fn boost(p: &Momentum, beta: &Vector3<Float>) -> Momentum {
    let beta2 = beta.norm_squared();
    if beta2 <= 0. {
        return *p;
    }
    let gamma = 1. / sqrt(1. - beta2);
    let beta_p = beta.dot(&p.xyz());
    let gamma2 = (gamma - 1.) / beta2;
    let xyz = p.xyz() + (gamma2 * beta_p + gamma * p[E]) * beta;
    Momentum::new(xyz[X], xyz[Y], xyz[Z], gamma * (p[E] + beta_p))
}

/// Velocity of the rest frame of `p`, for use with `boost`
pub fn velocity(p: &Momentum) -> Vector3<Float> {
    p.xyz() / p[E]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::approx_eq;

    #[test]
    fn mass_of_higgs_at_rest() {
        let p = momentum(125., 0., 0., 0.);
        assert!(approx_eq(mass(&p), 125., 1e-12));
    }

    #[test]
    fn spacelike_mass_is_clamped() {
        let p = momentum(1., 0., 0., 1. + 1e-9);
        assert!(mass2(&p) < 0.);
        assert_eq!(mass(&p), 0.);
    }

    #[test]
    fn beam_axis_rapidity_is_capped() {
        let p = momentum(10., 0., 0., 10.);
        assert_eq!(rapidity(&p), MAX_RAPIDITY);
        assert_eq!(eta(&p), MAX_RAPIDITY);
        let p = momentum(10., 0., 0., -10.);
        assert_eq!(eta(&p), -MAX_RAPIDITY);
    }

    #[test]
    fn boost_preserves_mass() {
        let p = momentum(5., 1., 2., 3.);
        let m = mass(&p);
        let boosted = boost(&p, &Vector3::new(0.3, -0.2, 0.6));
        assert!(approx_eq(mass(&boosted), m, 1e-9));
        let back = boost(&boosted, &Vector3::new(-0.3, 0.2, -0.6));
        for coord in 0..MOMENTUM_DIM {
            assert!(approx_eq(back[coord], p[coord], 1e-9));
        }
    }

    #[test]
    fn boost_to_lab_frame() {
        let parent = momentum(10., 0., 0., 8.);
        let at_rest = momentum(mass(&parent), 0., 0., 0.);
        let lab = boost(&at_rest, &velocity(&parent));
        for coord in 0..MOMENTUM_DIM {
            assert!(approx_eq(lab[coord], parent[coord], 1e-9));
        }
    }

    #[test]
    fn transverse_quantities() {
        let p = momentum(10., 3., 4., 0.);
        assert!(approx_eq(pt(&p), 5., 1e-12));
        assert!(approx_eq(phi(&p), (4. as Float).atan2(3.), 1e-12));
        assert_eq!(eta(&p), 0.);
        let p = momentum(10., -3., -4., 0.);
        assert!(phi(&p) < 0.);
    }
}
