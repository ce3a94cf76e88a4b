//! Higgs tracer: follow Higgs boson decays through collider event records
//!
//!
//! # Introduction (for the physicist)
//!
//! Simulated proton collisions produce Higgs bosons through several
//! mechanisms (gluon fusion, vector boson fusion, associated production with
//! a vector boson or a top quark pair). The Higgs then decays, and its decay
//! products shower, decay further and hadronize, until only stable particles
//! remain. Those are grouped into jets by a clustering algorithm.
//!
//! This program records, for every Higgs decay, the production mechanism,
//! the invariant mass of the decay products and of every subset thereof, and
//! the jet that each decay product ended up in.
//!
//!
//! # Introduction (for the computer guy)
//!
//! The program is a pipeline:
//!
//! * read in the configuration
//! * generate events in batches, each batch with its own random stream
//!     * locate the decayed Higgs bosons in the event record
//!     * walk their decay trees down to the final state
//!     * cluster the final state into jets and match decay products to jets
//!     * compute invariant masses and classify the production channel
//! * merge the batches in order, then write the records and a run summary.
//!
//! The event generator and the jet clusterer sit behind the `EventSource`
//! and `JetClusterer` traits, so that other implementations can be plugged
//! in. The crate ships a toy generator and a sequential recombination
//! clusterer.

#![warn(missing_docs)]

pub mod accumulator;
pub mod association;
pub mod channel;
pub mod clustering;
pub mod config;
pub mod decay;
pub mod event;
pub mod evgen;
pub mod kinematics;
pub mod momentum;
pub mod numeric;
pub mod output;
pub mod pipeline;
pub mod random;
pub mod scheduling;
