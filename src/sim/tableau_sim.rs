//! Single-trajectory stabilizer-state simulation.
//!
//! The simulator's state *is* a `Tableau`: the `z_output`s are exactly the
//! Aaronson-Gottesman stabilizer generators of the current state, and the
//! `x_output`s double as their destabilizers, which is what makes
//! single-qubit-basis measurement tractable without ever materializing a
//! state vector.

use rand::RngCore;

use crate::circuit::{Dispatch, Operation, Target};
use crate::error::{CoreError, CoreResult};
use crate::measurement::MeasurementRecord;
use crate::pauli::PauliStringOwned;
use crate::tableau::{Tableau, TransposedTableauScope};

pub struct TableauSimulator {
    tableau: Tableau,
    pub record: MeasurementRecord,
}

impl TableauSimulator {
    pub fn new(num_qubits: usize) -> Self {
        TableauSimulator { tableau: Tableau::identity(num_qubits), record: MeasurementRecord::new() }
    }

    /// Like `new`, but the measurement record auto-trims once it exceeds
    /// `high_water_mark` rows, keeping only the most recent `keep` (see
    /// `MeasurementRecord::with_high_water_mark`).
    pub fn new_with_high_water_mark(num_qubits: usize, high_water_mark: usize, keep: usize) -> Self {
        TableauSimulator {
            tableau: Tableau::identity(num_qubits),
            record: MeasurementRecord::with_high_water_mark(high_water_mark, keep),
        }
    }

    pub fn num_qubits(&self) -> usize {
        self.tableau.num_qubits()
    }

    pub fn tableau(&self) -> &Tableau {
        &self.tableau
    }

    /// Applies a registered unitary gate, evolving the state forward (as
    /// opposed to `Tableau::prepend_named`, which builds a tableau up
    /// front-to-back from a gate sequence already known in full).
    ///
    /// `H`, `X`, `SWAP`, and `CX` go through `TransposedTableauScope`, which
    /// touches only the rows of the targeted qubits instead of every
    /// generator column individually; every other gate falls back to the
    /// generic `Tableau::append_named` path.
    pub fn unitary(&mut self, name: &str, targets: &[usize]) -> CoreResult<()> {
        tracing::trace!(gate = name, ?targets, "applying unitary");
        let canonical = crate::tableau::lookup_gate(name).map(|entry| entry.canonical_name);
        match (canonical, targets) {
            (Some("H"), &[q]) => {
                let mut scope = TransposedTableauScope::enter(&mut self.tableau);
                scope.append_h(q);
                scope.finish();
                Ok(())
            }
            (Some("X"), &[q]) => {
                let mut scope = TransposedTableauScope::enter(&mut self.tableau);
                scope.append_x(q);
                scope.finish();
                Ok(())
            }
            (Some("SWAP"), &[a, b]) => {
                let mut scope = TransposedTableauScope::enter(&mut self.tableau);
                scope.append_swap(a, b);
                scope.finish();
                Ok(())
            }
            (Some("CX"), &[control, target]) => {
                let mut scope = TransposedTableauScope::enter(&mut self.tableau);
                scope.append_cx(control, target);
                scope.finish();
                Ok(())
            }
            _ => self.tableau.append_named(name, targets),
        }
    }

    /// Measures qubit `q` in the Z basis, per the standard
    /// stabilizer-tableau algorithm: random if some stabilizer's
    /// destabilizer has X-support at `q`, deterministic (read off the sign
    /// of the stabilizer product with that support) otherwise.
    pub fn measure_z(&mut self, q: usize, rng: &mut impl RngCore, forced: Option<bool>) -> CoreResult<bool> {
        let n = self.tableau.num_qubits();
        let anticommuting: Vec<usize> = (0..n).filter(|&j| self.tableau.z_output(j).get(q) & 1 != 0).collect();

        let outcome = if let Some(&pivot) = anticommuting.first() {
            for &j in &anticommuting {
                if j == pivot {
                    continue;
                }
                self.multiply_generator_pair(j, pivot);
            }
            let outcome = forced.unwrap_or_else(|| rng.next_u32() & 1 == 1);
            let old_stabilizer = self.tableau.z_output(pivot).clone();
            let mut new_stabilizer = PauliStringOwned::identity(n);
            new_stabilizer.set(q, 2);
            new_stabilizer.set_sign(outcome);
            self.tableau.set_generator_images(pivot, old_stabilizer, new_stabilizer);
            outcome
        } else {
            let mut acc = PauliStringOwned::identity(n);
            for j in 0..n {
                if self.tableau.x_output(j).get(q) & 1 != 0 {
                    let mut rhs = self.tableau.z_output(j).clone();
                    acc.as_mut().mul_commuting_assign(&rhs.as_mut());
                }
            }
            let outcome = acc.sign();
            if let Some(wanted) = forced {
                if wanted != outcome {
                    return Err(CoreError::PostselectionFailure { qubit: q, forced: wanted });
                }
            }
            outcome
        };
        tracing::debug!(qubit = q, outcome, "measured in Z basis");
        self.record.record(outcome);
        Ok(outcome)
    }

    pub fn measure_x(&mut self, q: usize, rng: &mut impl RngCore, forced: Option<bool>) -> CoreResult<bool> {
        self.tableau.append_named("H", &[q])?;
        let outcome = self.measure_z(q, rng, forced)?;
        self.tableau.append_named("H", &[q])?;
        Ok(outcome)
    }

    pub fn measure_y(&mut self, q: usize, rng: &mut impl RngCore, forced: Option<bool>) -> CoreResult<bool> {
        self.tableau.append_named("H_YZ", &[q])?;
        let outcome = self.measure_z(q, rng, forced)?;
        self.tableau.append_named("H_YZ", &[q])?;
        Ok(outcome)
    }

    pub fn reset_z(&mut self, q: usize, rng: &mut impl RngCore) -> CoreResult<()> {
        if self.measure_z(q, rng, None)? {
            self.tableau.append_named("X", &[q])?;
        }
        Ok(())
    }

    pub fn reset_x(&mut self, q: usize, rng: &mut impl RngCore) -> CoreResult<()> {
        if self.measure_x(q, rng, None)? {
            self.tableau.append_named("Z", &[q])?;
        }
        Ok(())
    }

    pub fn reset_y(&mut self, q: usize, rng: &mut impl RngCore) -> CoreResult<()> {
        if self.measure_y(q, rng, None)? {
            self.tableau.append_named("X", &[q])?;
        }
        Ok(())
    }

    /// A noisy measurement: the reported outcome is flipped independently
    /// with probability `flip_probability`, but the state collapse uses the
    /// true (unflipped) result.
    pub fn measure_z_noisy(&mut self, q: usize, flip_probability: f64, rng: &mut impl RngCore) -> CoreResult<bool> {
        crate::rng::check_probability(flip_probability)?;
        let true_outcome = self.measure_z(q, rng, None)?;
        let reported = true_outcome ^ crate::rng::biased_bit(rng, flip_probability);
        if reported != true_outcome {
            self.record.overwrite_last(reported);
        }
        Ok(reported)
    }

    /// Peeks at what a Z-basis measurement of `q` would report, if and only
    /// if that outcome is deterministic; `None` if the true measurement
    /// would be random (peeking must not collapse state).
    pub fn peek_z(&self, q: usize) -> Option<bool> {
        Self::peek_z_on(&self.tableau, q)
    }

    fn peek_z_on(tableau: &Tableau, q: usize) -> Option<bool> {
        let n = tableau.num_qubits();
        if (0..n).any(|j| tableau.z_output(j).get(q) & 1 != 0) {
            return None;
        }
        let mut acc = PauliStringOwned::identity(n);
        for j in 0..n {
            if tableau.x_output(j).get(q) & 1 != 0 {
                let mut rhs = tableau.z_output(j).clone();
                acc.as_mut().mul_commuting_assign(&rhs.as_mut());
            }
        }
        Some(acc.sign())
    }

    /// Returns the expectation value of an arbitrary multi-qubit Pauli
    /// observable against the current state: `+1` if it's stabilized, `-1`
    /// if anti-stabilized, `0` if it's neither (the state isn't an
    /// eigenstate of it). Computed by decomposing `pauli` against the
    /// tableau's own output-side generators: `inverse().apply(pauli)` gives
    /// `pauli`'s coordinates in the `{x_out[k], z_out[k]}` basis, so any
    /// leftover X-type bit means `pauli` isn't expressible as a product of
    /// the current Z-stabilizers alone.
    pub fn peek_observable_expectation(&self, pauli: &PauliStringOwned) -> i8 {
        let decomposed = self.tableau.inverse().apply(pauli);
        let n = self.tableau.num_qubits();
        if (0..n).any(|q| decomposed.get(q) & 1 != 0) {
            return 0;
        }
        if decomposed.sign() {
            -1
        } else {
            1
        }
    }

    /// Returns the single-qubit Bloch-axis code (`I=0,X=1,Z=2,Y=3`) and sign
    /// the state at `q` is a deterministic eigenstate of, without
    /// collapsing anything; `(0, false)` if `q` isn't pinned to any single
    /// axis. Works by rotating a scratch copy of the tableau into each
    /// candidate basis and re-using the Z-basis determinism check.
    pub fn peek_bloch(&self, q: usize) -> (u8, bool) {
        if let Some(sign) = self.peek_z(q) {
            return (2, sign);
        }
        let mut rotated = self.tableau.clone();
        if rotated.append_named("H", &[q]).is_ok() {
            if let Some(sign) = Self::peek_z_on(&rotated, q) {
                return (1, sign);
            }
        }
        let mut rotated = self.tableau.clone();
        if rotated.append_named("H_YZ", &[q]).is_ok() {
            if let Some(sign) = Self::peek_z_on(&rotated, q) {
                return (3, sign);
            }
        }
        (0, false)
    }

    /// Applies `X` to `q` iff the measurement-record entry at `record_offset`
    /// (a negative lookback offset) came out `true`.
    pub fn classically_controlled_x(&mut self, q: usize, record_offset: isize) -> CoreResult<()> {
        if self.record.lookback(record_offset) == Some(true) {
            self.tableau.append_named("X", &[q])?;
        }
        Ok(())
    }

    /// Applies `Z` to `q` iff the measurement-record entry at `record_offset`
    /// came out `true`.
    pub fn classically_controlled_z(&mut self, q: usize, record_offset: isize) -> CoreResult<()> {
        if self.record.lookback(record_offset) == Some(true) {
            self.tableau.append_named("Z", &[q])?;
        }
        Ok(())
    }

    /// Composes stabilizer generator `source` into generator `pivot`
    /// (pivot := pivot * source), used to clear duplicate anticommuting
    /// support during random-outcome measurement.
    fn multiply_generator_pair(&mut self, source: usize, pivot: usize) {
        let n = self.tableau.num_qubits();
        let mut new_x = self.tableau.x_output(pivot).clone();
        let src_x = self.tableau.x_output(source).clone();
        new_x.as_mut().mul_commuting_assign(&src_x.as_mut());

        let mut new_z = self.tableau.z_output(pivot).clone();
        let src_z = self.tableau.z_output(source).clone();
        new_z.as_mut().mul_commuting_assign(&src_z.as_mut());

        let _ = n;
        self.tableau.set_generator_images(pivot, new_x, new_z);
    }
}

impl Dispatch for TableauSimulator {
    fn dispatch(&mut self, op: &Operation) -> CoreResult<()> {
        op.validate_unitary()?;
        let qubits: Vec<usize> = op.targets.iter().filter_map(Target::qubit).collect();
        match op.gate_name.as_str() {
            "M" | "MZ" => {
                for &q in &qubits {
                    self.measure_z(q, &mut rand::rng(), None)?;
                }
                Ok(())
            }
            "MX" => {
                for &q in &qubits {
                    self.measure_x(q, &mut rand::rng(), None)?;
                }
                Ok(())
            }
            "MY" => {
                for &q in &qubits {
                    self.measure_y(q, &mut rand::rng(), None)?;
                }
                Ok(())
            }
            "R" | "RZ" => {
                for &q in &qubits {
                    self.reset_z(q, &mut rand::rng())?;
                }
                Ok(())
            }
            _ => self.unitary(&op.gate_name, &qubits),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn bell_pair_measurements_agree() {
        let mut sim = TableauSimulator::new(2);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        sim.unitary("H", &[0]).unwrap();
        sim.unitary("CX", &[0, 1]).unwrap();
        let a = sim.measure_z(0, &mut rng, None).unwrap();
        let b = sim.measure_z(1, &mut rng, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fresh_qubit_measures_zero_deterministically() {
        let mut sim = TableauSimulator::new(1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(sim.peek_z(0), Some(false));
        let outcome = sim.measure_z(0, &mut rng, None).unwrap();
        assert!(!outcome);
    }

    #[test]
    fn x_basis_plus_state_measures_zero() {
        let mut sim = TableauSimulator::new(1);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        sim.unitary("H", &[0]).unwrap();
        let outcome = sim.measure_x(0, &mut rng, None).unwrap();
        assert!(!outcome);
    }

    #[test]
    fn reset_after_x_gate_returns_to_zero() {
        let mut sim = TableauSimulator::new(1);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        sim.unitary("X", &[0]).unwrap();
        sim.reset_z(0, &mut rng).unwrap();
        assert_eq!(sim.peek_z(0), Some(false));
    }

    #[test]
    fn postselection_failure_on_contradictory_forced_outcome() {
        let mut sim = TableauSimulator::new(1);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let err = sim.measure_z(0, &mut rng, Some(true)).unwrap_err();
        assert!(matches!(err, CoreError::PostselectionFailure { qubit: 0, forced: true }));
    }

    #[test]
    fn single_qubit_plus_state_x_measurement_is_random_over_many_seeds() {
        let mut saw_true = false;
        let mut saw_false = false;
        for seed in 0..20 {
            let mut sim = TableauSimulator::new(1);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            sim.unitary("H", &[0]).unwrap();
            let outcome = sim.measure_z(0, &mut rng, None).unwrap();
            if outcome {
                saw_true = true;
            } else {
                saw_false = true;
            }
        }
        assert!(saw_true && saw_false);
    }

    #[test]
    fn peek_bloch_identifies_a_fresh_qubit_as_plus_z() {
        let sim = TableauSimulator::new(1);
        assert_eq!(sim.peek_bloch(0), (2, false));
    }

    #[test]
    fn peek_bloch_identifies_the_plus_state_as_plus_x() {
        let mut sim = TableauSimulator::new(1);
        sim.unitary("H", &[0]).unwrap();
        assert_eq!(sim.peek_bloch(0), (1, false));
    }

    #[test]
    fn peek_bloch_is_trivial_for_one_half_of_a_bell_pair() {
        let mut sim = TableauSimulator::new(2);
        sim.unitary("H", &[0]).unwrap();
        sim.unitary("CX", &[0, 1]).unwrap();
        assert_eq!(sim.peek_bloch(0), (0, false));
    }

    #[test]
    fn classical_control_applies_x_only_after_a_true_measurement() {
        let mut sim = TableauSimulator::new(2);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        sim.unitary("X", &[0]).unwrap();
        sim.measure_z(0, &mut rng, None).unwrap(); // records true
        sim.classically_controlled_x(1, -1).unwrap();
        assert_eq!(sim.peek_z(1), Some(true));
    }

    fn single_qubit_pauli(n: usize, q: usize, code: u8) -> PauliStringOwned {
        let mut p = PauliStringOwned::identity(n);
        p.set(q, code);
        p
    }

    #[test]
    fn peek_observable_expectation_on_fresh_qubit_is_plus_one_for_z() {
        let sim = TableauSimulator::new(1);
        let z = single_qubit_pauli(1, 0, 2);
        assert_eq!(sim.peek_observable_expectation(&z), 1);
    }

    #[test]
    fn peek_observable_expectation_flips_sign_after_x_gate() {
        let mut sim = TableauSimulator::new(1);
        sim.unitary("X", &[0]).unwrap();
        let z = single_qubit_pauli(1, 0, 2);
        assert_eq!(sim.peek_observable_expectation(&z), -1);
    }

    #[test]
    fn peek_observable_expectation_is_zero_for_an_unpinned_axis() {
        let mut sim = TableauSimulator::new(1);
        sim.unitary("H", &[0]).unwrap();
        let z = single_qubit_pauli(1, 0, 2);
        assert_eq!(sim.peek_observable_expectation(&z), 0);
        let x = single_qubit_pauli(1, 0, 1);
        assert_eq!(sim.peek_observable_expectation(&x), 1);
    }

    #[test]
    fn peek_observable_expectation_trivial_for_one_half_of_a_bell_pair() {
        let mut sim = TableauSimulator::new(2);
        sim.unitary("H", &[0]).unwrap();
        sim.unitary("CX", &[0, 1]).unwrap();
        let z0 = single_qubit_pauli(2, 0, 2);
        assert_eq!(sim.peek_observable_expectation(&z0), 0);
        let mut zz = PauliStringOwned::identity(2);
        zz.set(0, 2);
        zz.set(1, 2);
        assert_eq!(sim.peek_observable_expectation(&zz), 1);
    }

    #[test]
    fn high_water_mark_constructor_bounds_the_live_record_window() {
        let mut sim = TableauSimulator::new_with_high_water_mark(1, 4, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..20 {
            sim.measure_z(0, &mut rng, Some(false)).unwrap();
        }
        assert_eq!(sim.record.len(), 20);
        assert_eq!(sim.record.lookback(-1), Some(false));
    }

    #[test]
    fn measure_z_noisy_rejects_an_out_of_range_probability() {
        let mut sim = TableauSimulator::new(1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = sim.measure_z_noisy(0, 1.5, &mut rng).unwrap_err();
        assert!(matches!(err, CoreError::NumericRange(_)));
    }
}
