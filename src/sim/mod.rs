//! The two simulation engines: a single-trajectory stabilizer-tableau
//! simulator for exact, per-shot state tracking, and a batched Pauli-frame
//! simulator for drawing many noisy samples cheaply. Both implement
//! `circuit::Dispatch` so a caller can drive either one from the same
//! operation sequence.

pub mod frame_sim;
pub mod tableau_sim;

pub use frame_sim::FrameSimulator;
pub use tableau_sim::TableauSimulator;
