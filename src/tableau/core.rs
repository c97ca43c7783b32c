//! The Clifford tableau: for each qubit `k`, the image of the generators
//! `X_k` and `Z_k` under conjugation by the circuit simulated so far.
//!
//! Storage is column-major — `x_out[k]`/`z_out[k]` are full `PauliStringOwned`
//! values, one per generator. This makes *prepending* a new generator cheap
//! (append a column) at the cost of a full-width pass to *apply* the tableau
//! to an arbitrary Pauli string.
//! `tableau::transposed` builds a row-major scratch view on top of this for
//! the operations (measurement, frame stepping) that want the opposite
//! trade-off.

use crate::error::{CoreError, CoreResult};
use crate::pauli::PauliStringOwned;
use crate::tableau::gates::{self, GateEntry};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tableau {
    num_qubits: usize,
    x_out: Vec<PauliStringOwned>,
    z_out: Vec<PauliStringOwned>,
}

impl Tableau {
    pub fn identity(num_qubits: usize) -> Self {
        let x_out = (0..num_qubits)
            .map(|k| {
                let mut p = PauliStringOwned::identity(num_qubits);
                p.set(k, 1); // X_k
                p
            })
            .collect();
        let z_out = (0..num_qubits)
            .map(|k| {
                let mut p = PauliStringOwned::identity(num_qubits);
                p.set(k, 2); // Z_k
                p
            })
            .collect();
        Tableau { num_qubits, x_out, z_out }
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn random<R: rand::RngCore>(num_qubits: usize, rng: &mut R) -> Tableau {
        crate::tableau::random::random_tableau(num_qubits, rng)
    }

    pub fn x_output(&self, k: usize) -> &PauliStringOwned {
        &self.x_out[k]
    }

    pub fn z_output(&self, k: usize) -> &PauliStringOwned {
        &self.z_out[k]
    }

    /// Only used when hand-building the small canonical gate tableaus in
    /// `tableau::gates`.
    pub(crate) fn set_generator_images(&mut self, k: usize, x_image: PauliStringOwned, z_image: PauliStringOwned) {
        self.x_out[k] = x_image;
        self.z_out[k] = z_image;
    }

    /// The generator of `Y_k`'s image, derived as `i * X_out[k] * Z_out[k]`.
    pub fn eval_y_output(&self, k: usize) -> PauliStringOwned {
        let mut acc = self.x_out[k].clone();
        let mut rhs = self.z_out[k].clone();
        let log_i = acc.as_mut().right_mul_returning_log_i(&rhs.as_mut());
        // X * Z = -iY, so one extra factor of i recovers +Y.
        let total = (log_i + 1) & 3;
        debug_assert_eq!(total & 1, 0);
        if total & 2 != 0 {
            acc.sign_flip();
        }
        acc
    }

    /// Grows the tableau to `new_num_qubits`, with the new qubits left as
    /// untouched identity generators.
    pub fn expand(&self, new_num_qubits: usize) -> Tableau {
        assert!(new_num_qubits >= self.num_qubits);
        let mut out = Tableau::identity(new_num_qubits);
        for k in 0..self.num_qubits {
            out.x_out[k] = self.x_out[k].extended_to(new_num_qubits);
            out.z_out[k] = self.z_out[k].extended_to(new_num_qubits);
        }
        out
    }

    /// Embeds a (typically 1- or 2-qubit) tableau into an `n`-qubit space,
    /// acting on `targets` and as identity elsewhere.
    pub fn embed_into(&self, n: usize, targets: &[usize]) -> Tableau {
        assert_eq!(self.num_qubits, targets.len());
        let mut out = Tableau::identity(n);
        for li in 0..self.num_qubits {
            let mut x_col = PauliStringOwned::identity(n);
            let mut src_x = self.x_out[li].clone();
            {
                let src_view = src_x.as_mut();
                let mut dst_view = x_col.as_mut();
                src_view.scatter_into(&mut dst_view, targets);
            }
            out.x_out[targets[li]] = x_col;

            let mut z_col = PauliStringOwned::identity(n);
            let mut src_z = self.z_out[li].clone();
            {
                let src_view = src_z.as_mut();
                let mut dst_view = z_col.as_mut();
                src_view.scatter_into(&mut dst_view, targets);
            }
            out.z_out[targets[li]] = z_col;
        }
        out
    }

    /// Evaluates what this tableau maps an arbitrary `num_qubits`-wide Pauli
    /// string `p` to, by decomposing `p` into generators and multiplying
    /// their stored images together.
    pub fn apply(&self, p: &PauliStringOwned) -> PauliStringOwned {
        assert_eq!(p.len(), self.num_qubits);
        let mut acc = PauliStringOwned::identity(self.num_qubits);
        let mut log_i_total: u8 = 0;
        for q in 0..self.num_qubits {
            let code = p.get(q);
            if code == 0 {
                continue;
            }
            if code & 1 != 0 {
                let mut rhs = self.x_out[q].clone();
                log_i_total = (log_i_total + acc.as_mut().right_mul_returning_log_i(&rhs.as_mut())) & 3;
            }
            if code & 2 != 0 {
                let mut rhs = self.z_out[q].clone();
                log_i_total = (log_i_total + acc.as_mut().right_mul_returning_log_i(&rhs.as_mut())) & 3;
            }
            if code == 3 {
                // X * Z = -iY: cancel the spurious -i so the decomposition yields +Y.
                log_i_total = (log_i_total + 1) & 3;
            }
        }
        debug_assert_eq!(log_i_total & 1, 0, "a Clifford conjugation must preserve Hermiticity");
        if log_i_total & 2 != 0 {
            acc.sign_flip();
        }
        if p.sign() {
            acc.sign_flip();
        }
        acc
    }

    /// Composition: the tableau for "apply `self` first, then `other`".
    pub fn then(&self, other: &Tableau) -> Tableau {
        assert_eq!(self.num_qubits, other.num_qubits);
        let mut out = Tableau::identity(self.num_qubits);
        for k in 0..self.num_qubits {
            out.x_out[k] = other.apply(&self.x_out[k]);
            out.z_out[k] = other.apply(&self.z_out[k]);
        }
        out
    }

    pub fn compose(&self, other: &Tableau) -> Tableau {
        self.then(other)
    }

    /// Prepends a registered gate (by canonical name or alias) acting on
    /// `targets`, so the new tableau is `gate.then(self)`.
    pub fn prepend_named(&mut self, name: &str, targets: &[usize]) -> CoreResult<()> {
        let entry: &GateEntry = gates::lookup(name).ok_or_else(|| CoreError::Parse {
            op_index: 0,
            message: format!("unknown gate '{name}'"),
        })?;
        if entry.tableau.num_qubits() != targets.len() {
            return Err(CoreError::AlgebraViolation(format!(
                "gate '{name}' takes {} qubit(s), got {}",
                entry.tableau.num_qubits(),
                targets.len()
            )));
        }
        let embedded = entry.tableau.embed_into(self.num_qubits, targets);
        *self = embedded.then(self);
        Ok(())
    }

    /// Appends a registered gate acting on `targets`, so the new tableau is
    /// `self.then(gate)`. This is the direction a simulator wants: the gate
    /// happens *after* everything already played, so it conjugates the
    /// current generator images from the outside. `prepend_named` is the
    /// opposite composition, for building a tableau up from a known gate
    /// sequence read back-to-front.
    pub fn append_named(&mut self, name: &str, targets: &[usize]) -> CoreResult<()> {
        let entry: &GateEntry = gates::lookup(name).ok_or_else(|| CoreError::Parse {
            op_index: 0,
            message: format!("unknown gate '{name}'"),
        })?;
        if entry.tableau.num_qubits() != targets.len() {
            return Err(CoreError::AlgebraViolation(format!(
                "gate '{name}' takes {} qubit(s), got {}",
                entry.tableau.num_qubits(),
                targets.len()
            )));
        }
        let embedded = entry.tableau.embed_into(self.num_qubits, targets);
        *self = self.then(&embedded);
        Ok(())
    }

    /// Inverse tableau, computed by inverting the linear symplectic action
    /// over GF(2) and then fixing each generator's sign by a round-trip
    /// through the forward tableau.
    pub fn inverse(&self) -> Tableau {
        let n = self.num_qubits;
        let m = self.to_symplectic_matrix();
        let m_inv = m
            .gaussian_inverse(2 * n)
            .expect("a valid Clifford tableau's symplectic matrix is always invertible over GF(2)");

        let mut out = Tableau::identity(n);
        for k in 0..n {
            out.x_out[k] = Self::row_to_pauli(&m_inv, k, n);
            out.z_out[k] = Self::row_to_pauli(&m_inv, n + k, n);
        }

        for k in 0..n {
            let mut target = PauliStringOwned::identity(n);
            target.set(k, 1);
            let round_trip = self.apply(&out.x_out[k]);
            if round_trip.sign() != target.sign() {
                out.x_out[k].sign_flip();
            }

            let mut target_z = PauliStringOwned::identity(n);
            target_z.set(k, 2);
            let round_trip_z = self.apply(&out.z_out[k]);
            if round_trip_z.sign() != target_z.sign() {
                out.z_out[k].sign_flip();
            }
        }
        out
    }

    fn to_symplectic_matrix(&self) -> crate::bits::BitTable {
        let n = self.num_qubits;
        let mut m = crate::bits::BitTable::new(2 * n, 2 * n);
        for k in 0..n {
            Self::write_row(&mut m, k, &self.x_out[k]);
            Self::write_row(&mut m, n + k, &self.z_out[k]);
        }
        m
    }

    fn write_row(m: &mut crate::bits::BitTable, row: usize, p: &PauliStringOwned) {
        for q in 0..p.len() {
            let code = p.get(q);
            m.set(row, q, code & 1 != 0);
            m.set(row, p.len() + q, code & 2 != 0);
        }
    }

    fn row_to_pauli(m: &crate::bits::BitTable, row: usize, n: usize) -> PauliStringOwned {
        let mut p = PauliStringOwned::identity(n);
        for q in 0..n {
            let x = m.get(row, q);
            let z = m.get(row, n + q);
            p.set(q, (x as u8) | ((z as u8) << 1));
        }
        p
    }

    /// `true` if every generator image anticommutes appropriately: each
    /// `X_k`/`Z_k` pair anticommutes with itself and commutes with every
    /// other pair — the defining property of a valid Clifford tableau.
    pub fn satisfies_invariants(&self) -> bool {
        for k in 0..self.num_qubits {
            if self.x_out[k].commutes(&self.z_out[k]) {
                return false;
            }
            for j in 0..self.num_qubits {
                if j == k {
                    continue;
                }
                if !self.x_out[k].commutes(&self.x_out[j]) {
                    return false;
                }
                if !self.z_out[k].commutes(&self.z_out[j]) {
                    return false;
                }
                if !self.x_out[k].commutes(&self.z_out[j]) {
                    return false;
                }
            }
        }
        true
    }
}
