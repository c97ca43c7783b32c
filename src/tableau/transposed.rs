//! A scoped, row-major (qubit-major) view over a `Tableau`, cheap to
//! *append* a gate to instead of prepend.
//!
//! While a `Tableau` stores one `PauliStringOwned` per generator (cheap
//! prepend, expensive arbitrary append), simulators stepping through a
//! circuit gate-by-gate want the opposite trade-off: each step touches only
//! the rows of the qubits the gate acts on. `TransposedTableauScope::enter`
//! builds that row-major cache; `finish` (or `Drop`) scatters it back.

use crate::bits::{BitTable, BitVec};
use crate::pauli::PauliStringOwned;
use crate::tableau::core::Tableau;

struct Half {
    xt: BitTable,
    zt: BitTable,
    signs: BitVec,
}

impl Half {
    fn from_generators(num_qubits: usize, generators: &[PauliStringOwned]) -> Half {
        let mut xt = BitTable::new(num_qubits, num_qubits);
        let mut zt = BitTable::new(num_qubits, num_qubits);
        let mut signs = BitVec::new(num_qubits);
        for (col, p) in generators.iter().enumerate() {
            signs.set(col, p.sign());
            for row in 0..num_qubits {
                let code = p.get(row);
                xt.set(row, col, code & 1 != 0);
                zt.set(row, col, code & 2 != 0);
            }
        }
        Half { xt, zt, signs }
    }

    fn to_generators(&self, num_qubits: usize) -> Vec<PauliStringOwned> {
        (0..num_qubits)
            .map(|col| {
                let mut p = PauliStringOwned::identity(num_qubits);
                p.set_sign(self.signs.get(col));
                for row in 0..num_qubits {
                    let code = (self.xt.get(row, col) as u8) | ((self.zt.get(row, col) as u8) << 1);
                    p.set(row, code);
                }
                p
            })
            .collect()
    }

    fn swap_rows(&mut self, q: usize) {
        for col in 0..self.xt.cols_padded() {
            let x = self.xt.get(q, col);
            let z = self.zt.get(q, col);
            self.xt.set(q, col, z);
            self.zt.set(q, col, x);
        }
    }
}

pub struct TransposedTableauScope<'a> {
    tableau: &'a mut Tableau,
    num_qubits: usize,
    x_half: Half,
    z_half: Half,
    committed: bool,
}

impl<'a> TransposedTableauScope<'a> {
    pub fn enter(tableau: &'a mut Tableau) -> Self {
        let n = tableau.num_qubits();
        let x_generators: Vec<PauliStringOwned> = (0..n).map(|k| tableau.x_output(k).clone()).collect();
        let z_generators: Vec<PauliStringOwned> = (0..n).map(|k| tableau.z_output(k).clone()).collect();
        TransposedTableauScope {
            tableau,
            num_qubits: n,
            x_half: Half::from_generators(n, &x_generators),
            z_half: Half::from_generators(n, &z_generators),
            committed: false,
        }
    }

    /// `X_q <-> Z_q` in every generator: appending `H` at qubit `q`.
    pub fn append_h(&mut self, q: usize) {
        self.x_half.swap_rows(q);
        self.z_half.swap_rows(q);
    }

    /// Appending `X` at qubit `q`: flips the sign of every generator whose
    /// image anticommutes with `X_q`, i.e. every generator with a `Z` or `Y`
    /// component at `q`.
    pub fn append_x(&mut self, q: usize) {
        for half in [&mut self.x_half, &mut self.z_half] {
            for col in 0..self.num_qubits {
                if half.zt.get(q, col) {
                    let cur = half.signs.get(col);
                    half.signs.set(col, !cur);
                }
            }
        }
    }

    /// Appending `SWAP` between qubits `a` and `b`.
    pub fn append_swap(&mut self, a: usize, b: usize) {
        for half in [&mut self.x_half, &mut self.z_half] {
            for col in 0..self.num_qubits {
                let xa = half.xt.get(a, col);
                let xb = half.xt.get(b, col);
                half.xt.set(a, col, xb);
                half.xt.set(b, col, xa);
                let za = half.zt.get(a, col);
                let zb = half.zt.get(b, col);
                half.zt.set(a, col, zb);
                half.zt.set(b, col, za);
            }
        }
    }

    /// Appending `CX(control, target)`: `X_target ^= X_control`,
    /// `Z_control ^= Z_target`, matched across every generator column at
    /// once.
    pub fn append_cx(&mut self, control: usize, target: usize) {
        for half in [&mut self.x_half, &mut self.z_half] {
            for col in 0..self.num_qubits {
                let xc = half.xt.get(control, col);
                let xt = half.xt.get(target, col);
                half.xt.set(target, col, xt ^ xc);
                let zc = half.zt.get(control, col);
                let zt = half.zt.get(target, col);
                half.zt.set(control, col, zc ^ zt);
            }
        }
    }

    pub fn x_obs_z_bit(&self, generator: usize, qubit: usize) -> bool {
        self.x_half.zt.get(qubit, generator)
    }

    pub fn z_obs_x_bit(&self, generator: usize, qubit: usize) -> bool {
        self.z_half.xt.get(qubit, generator)
    }

    pub fn finish(mut self) {
        self.commit();
        self.committed = true;
    }

    fn commit(&mut self) {
        let n = self.num_qubits;
        for (k, p) in self.x_half.to_generators(n).into_iter().enumerate() {
            self.tableau.set_generator_images(k, p, self.tableau.z_output(k).clone());
        }
        for (k, p) in self.z_half.to_generators(n).into_iter().enumerate() {
            self.tableau.set_generator_images(k, self.tableau.x_output(k).clone(), p);
        }
    }
}

impl<'a> Drop for TransposedTableauScope<'a> {
    fn drop(&mut self) {
        if !self.committed {
            self.commit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_h_matches_prepend_h() {
        let mut by_prepend = Tableau::identity(3);
        by_prepend.prepend_named("H", &[1]).unwrap();

        let mut by_scope = Tableau::identity(3);
        {
            let mut scope = TransposedTableauScope::enter(&mut by_scope);
            scope.append_h(1);
            scope.finish();
        }
        assert_eq!(by_prepend, by_scope);
    }

    #[test]
    fn scoped_cx_matches_prepend_cx() {
        let mut by_prepend = Tableau::identity(2);
        by_prepend.prepend_named("CX", &[0, 1]).unwrap();

        let mut by_scope = Tableau::identity(2);
        {
            let mut scope = TransposedTableauScope::enter(&mut by_scope);
            scope.append_cx(0, 1);
            scope.finish();
        }
        assert_eq!(by_prepend, by_scope);
    }
}
