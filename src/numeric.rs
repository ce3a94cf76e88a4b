//! Basic numerical concepts used throughout the crate

#![allow(missing_docs)]

// Floating-point precision is configured here
#[cfg(feature = "f32")]
pub type Float = f32;
#[cfg(feature = "f32")]
pub use std::f32 as reals;
#[cfg(not(feature = "f32"))]
pub type Float = f64;
#[cfg(not(feature = "f32"))]
pub use std::f64 as reals;

/// Relative comparison of floating-point numbers
#[cfg(test)]
pub fn approx_eq(a: Float, b: Float, rel_tol: Float) -> bool {
    let scale = a.abs().max(b.abs()).max(1.);
    (a - b).abs() <= rel_tol * scale
}
