//! Pauli-string algebra: the symplectic `(x, z, sign)` representation and
//! the phase-accumulator multiplication trick it enables.

pub mod string;

pub use string::{code_to_char, pauli_code, PauliStringMut, PauliStringOwned};
