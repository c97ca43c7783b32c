//! Bit-packed Clifford-tableau and Pauli-frame simulation core.
//!
//! This crate is the numerical engine underneath a stabilizer-circuit
//! simulator: fixed-width symplectic Pauli algebra (`pauli`), a Clifford
//! tableau with both the column-major (cheap prepend) and scoped-transposed
//! (cheap append) views over it (`tableau`), a measurement log
//! (`measurement`), and the two execution engines built on top of them —
//! single-trajectory state tracking and batched Pauli-frame Monte Carlo
//! (`sim`). `circuit` ties operations together into something a caller can
//! dispatch over.

pub mod bits;
pub mod circuit;
pub mod error;
pub mod measurement;
pub mod pauli;
pub mod rng;
pub mod sim;
pub mod tableau;

pub use error::{CoreError, CoreResult};
