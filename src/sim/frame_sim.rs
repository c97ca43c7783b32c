//! Batched Pauli-frame Monte Carlo sampling.
//!
//! Instead of tracking one evolving stabilizer state, `FrameSimulator` plays
//! the same noiseless reference circuit once and tracks, for a whole batch
//! of shots at once, the Pauli error that has accumulated relative to that
//! reference: an `X`-bit table and a `Z`-bit table, one row per shot, one
//! column per qubit. Noise channels flip bits directly; unitary gates permute
//! and XOR columns the same way they permute and XOR Pauli generators in the
//! tableau picture, just without ever needing to know the *sign* of
//! anything. This is the standard trick for sampling a noisy circuit many
//! times cheaply, and is what makes `sample_to_writer` tractable for large
//! shot counts.

use std::io::Write;

use itertools::Itertools;
use rand::RngCore;

use crate::bits::BitTable;
use crate::circuit::{Dispatch, Operation, Target};
use crate::error::{CoreError, CoreResult};
use crate::measurement::MeasurementRecord;
use crate::pauli::PauliStringOwned;
use crate::rng::{check_channel_weights, check_probability, sparse_hits, weighted_choice};

pub struct FrameSimulator {
    num_qubits: usize,
    num_shots: usize,
    xs: BitTable,
    zs: BitTable,
    /// Per-shot measurement records, built up column by column as
    /// measurements are dispatched.
    pub records: Vec<MeasurementRecord>,
    /// Per-shot external classical inputs (e.g. a detector-frame sweep from
    /// the caller), indexed `[shot][sweep_index]`.
    pub sweep_bits: Vec<Vec<bool>>,
    /// Whether each shot has already fired an error within the currently
    /// open `CORRELATED_ERROR`/`ELSE_CORRELATED_ERROR` chain.
    correlated_group_done: Vec<bool>,
    /// Whether a `CORRELATED_ERROR`/`ELSE_CORRELATED_ERROR` chain is
    /// currently open; any other gate closes it.
    correlated_group_open: bool,
}

impl FrameSimulator {
    pub fn new(num_qubits: usize, num_shots: usize) -> Self {
        tracing::debug!(num_qubits, num_shots, "starting frame simulation batch");
        FrameSimulator {
            num_qubits,
            num_shots,
            xs: BitTable::new(num_shots, num_qubits),
            zs: BitTable::new(num_shots, num_qubits),
            records: (0..num_shots).map(|_| MeasurementRecord::new()).collect(),
            sweep_bits: vec![Vec::new(); num_shots],
            correlated_group_done: vec![false; num_shots],
            correlated_group_open: false,
        }
    }

    /// Like `new`, but every shot's measurement record auto-trims once it
    /// exceeds `high_water_mark` rows, keeping only the most recent `keep`
    /// (see `MeasurementRecord::with_high_water_mark`). Use this for long
    /// runs where only a bounded lookback is ever needed, so memory doesn't
    /// grow with the number of measurements per shot.
    pub fn new_with_high_water_mark(num_qubits: usize, num_shots: usize, high_water_mark: usize, keep: usize) -> Self {
        let mut sim = Self::new(num_qubits, num_shots);
        sim.records = (0..num_shots).map(|_| MeasurementRecord::with_high_water_mark(high_water_mark, keep)).collect();
        sim
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn num_shots(&self) -> usize {
        self.num_shots
    }

    /// Directly reads/writes a shot's tracked frame bits, e.g. to seed a
    /// simulator with a specific starting Pauli error rather than the
    /// trivial (no-error) frame every `new` batch starts with.
    pub fn x_frame(&self, shot: usize, q: usize) -> bool {
        self.xs.get(shot, q)
    }

    pub fn z_frame(&self, shot: usize, q: usize) -> bool {
        self.zs.get(shot, q)
    }

    pub fn set_x_frame(&mut self, shot: usize, q: usize, value: bool) {
        self.xs.set(shot, q, value);
    }

    pub fn set_z_frame(&mut self, shot: usize, q: usize, value: bool) {
        self.zs.set(shot, q, value);
    }

    /// Applies the effect of a unitary gate on the tracked Pauli frame: this
    /// is the Heisenberg-picture action of the gate restricted to how it
    /// permutes/XORs X- and Z-type error bits, not a full tableau evaluation
    /// (signs never matter for a frame, only whether an error is present).
    ///
    /// Routed through the same named-gate registry `TableauSimulator` uses,
    /// so every registered gate is supported here automatically and the two
    /// simulators can never silently drift out of sync on gate coverage.
    pub fn unitary(&mut self, name: &str, targets: &[usize]) -> CoreResult<()> {
        self.correlated_group_open = false;
        let entry = crate::tableau::lookup_gate(name)
            .ok_or_else(|| CoreError::Parse { op_index: 0, message: format!("unsupported frame gate '{name}'") })?;
        let k = targets.len();
        for shot in 0..self.num_shots {
            let mut p = PauliStringOwned::identity(k);
            for (local, &q) in targets.iter().enumerate() {
                let code = (self.xs.get(shot, q) as u8) | ((self.zs.get(shot, q) as u8) << 1);
                p.set(local, code);
            }
            let out = entry.tableau.apply(&p);
            for (local, &q) in targets.iter().enumerate() {
                let code = out.get(local);
                self.xs.set(shot, q, code & 1 != 0);
                self.zs.set(shot, q, code & 2 != 0);
            }
        }
        Ok(())
    }

    /// Flips the X-error bit on `q` for every shot sampled by `sparse_hits`
    /// with probability `p` — cheaper than one coin flip per shot when `p`
    /// is small and `num_shots` is large.
    pub fn x_error(&mut self, q: usize, p: f64, rng: &mut impl RngCore) -> CoreResult<()> {
        check_probability(p)?;
        for shot in sparse_hits(rng, self.num_shots, p) {
            let cur = self.xs.get(shot, q);
            self.xs.set(shot, q, !cur);
        }
        Ok(())
    }

    pub fn z_error(&mut self, q: usize, p: f64, rng: &mut impl RngCore) -> CoreResult<()> {
        check_probability(p)?;
        for shot in sparse_hits(rng, self.num_shots, p) {
            let cur = self.zs.get(shot, q);
            self.zs.set(shot, q, !cur);
        }
        Ok(())
    }

    pub fn y_error(&mut self, q: usize, p: f64, rng: &mut impl RngCore) -> CoreResult<()> {
        check_probability(p)?;
        for shot in sparse_hits(rng, self.num_shots, p) {
            let x = self.xs.get(shot, q);
            let z = self.zs.get(shot, q);
            self.xs.set(shot, q, !x);
            self.zs.set(shot, q, !z);
        }
        Ok(())
    }

    /// A single-qubit depolarizing channel: with total probability `p`, one
    /// of X, Y, Z is applied uniformly at random, independently per shot.
    /// `p >= 3/4` over-mixes (it would make the channel's four outcomes no
    /// longer distinguishable as a small perturbation) and is rejected.
    pub fn depolarize1(&mut self, q: usize, p: f64, rng: &mut impl RngCore) -> CoreResult<()> {
        check_probability(p)?;
        if p >= 0.75 {
            return Err(CoreError::NumericRange(format!("DEPOLARIZE1 probability {p} over-mixes (must be < 3/4)")));
        }
        for shot in sparse_hits(rng, self.num_shots, p) {
            match weighted_choice(rng, &[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]) {
                0 => self.xs.set(shot, q, !self.xs.get(shot, q)),
                1 => {
                    self.xs.set(shot, q, !self.xs.get(shot, q));
                    self.zs.set(shot, q, !self.zs.get(shot, q));
                }
                _ => self.zs.set(shot, q, !self.zs.get(shot, q)),
            }
        }
        Ok(())
    }

    /// A two-qubit depolarizing channel: with total probability `p`, one of
    /// the 15 nontrivial two-qubit Pauli errors is applied uniformly at
    /// random to `(a, b)`, independently per shot.
    pub fn depolarize2(&mut self, a: usize, b: usize, p: f64, rng: &mut impl RngCore) -> CoreResult<()> {
        check_probability(p)?;
        let weights = [1.0 / 15.0; 15];
        for shot in sparse_hits(rng, self.num_shots, p) {
            let choice = weighted_choice(rng, &weights) + 1; // 1..=15, packed as two base-4 digits.
            let code_a = (choice & 0x3) as u8;
            let code_b = ((choice >> 2) & 0x3) as u8;
            Self::apply_code(&mut self.xs, &mut self.zs, shot, a, code_a);
            Self::apply_code(&mut self.xs, &mut self.zs, shot, b, code_b);
        }
        Ok(())
    }

    /// A custom single-qubit Pauli channel: `weights` give `P(X), P(Y), P(Z)`
    /// (summing to at most 1; the remainder is the no-error outcome).
    pub fn pauli_channel_1(&mut self, q: usize, weights: [f64; 3], rng: &mut impl RngCore) -> CoreResult<()> {
        check_channel_weights(&weights)?;
        let total: f64 = weights.iter().sum();
        for shot in sparse_hits(rng, self.num_shots, total) {
            let normalized = [weights[0] / total, weights[1] / total, weights[2] / total];
            let code = match weighted_choice(rng, &normalized) {
                0 => 1,
                1 => 3,
                _ => 2,
            };
            Self::apply_code(&mut self.xs, &mut self.zs, shot, q, code);
        }
        Ok(())
    }

    fn apply_code(xs: &mut BitTable, zs: &mut BitTable, shot: usize, q: usize, code: u8) {
        if code & 1 != 0 {
            let x = xs.get(shot, q);
            xs.set(shot, q, !x);
        }
        if code & 2 != 0 {
            let z = zs.get(shot, q);
            zs.set(shot, q, !z);
        }
    }

    /// Starts a new `CORRELATED_ERROR(p) <pauli-targets>` group: per shot,
    /// independently with probability `p`, applies the named Pauli to every
    /// listed qubit and marks that shot "done" for the group. Any following
    /// `else_correlated_error` calls only consider shots not yet done, which
    /// is what gives the chain its `(1 - cum) * p` effective-probability
    /// semantics without tracking `cum` explicitly.
    pub fn correlated_error(&mut self, targets: &[(usize, u8)], p: f64, rng: &mut impl RngCore) -> CoreResult<()> {
        check_probability(p)?;
        self.correlated_group_done = vec![false; self.num_shots];
        self.correlated_group_open = true;
        self.apply_correlated_branch(targets, p, rng);
        Ok(())
    }

    /// Continues an open `CORRELATED_ERROR` chain. Rejected if no group is
    /// currently open (e.g. not preceded by `CORRELATED_ERROR`, or preceded
    /// by some other gate that closed the group).
    pub fn else_correlated_error(&mut self, targets: &[(usize, u8)], p: f64, rng: &mut impl RngCore) -> CoreResult<()> {
        if !self.correlated_group_open {
            return Err(CoreError::AlgebraViolation(
                "ELSE_CORRELATED_ERROR with no preceding open CORRELATED_ERROR group".to_string(),
            ));
        }
        check_probability(p)?;
        self.apply_correlated_branch(targets, p, rng);
        Ok(())
    }

    fn apply_correlated_branch(&mut self, targets: &[(usize, u8)], p: f64, rng: &mut impl RngCore) {
        for shot in 0..self.num_shots {
            if self.correlated_group_done[shot] {
                continue;
            }
            if crate::rng::biased_bit(rng, p) {
                for &(q, code) in targets {
                    Self::apply_code(&mut self.xs, &mut self.zs, shot, q, code);
                }
                self.correlated_group_done[shot] = true;
            }
        }
    }

    /// Flips qubit `q`'s tracked X-frame on every shot whose referenced
    /// measurement-record bit (own shot's record) came out `true`, the
    /// frame-simulator form of a classically-controlled `X`.
    pub fn classically_controlled_x(&mut self, q: usize, record_offset: isize) {
        for shot in 0..self.num_shots {
            if self.records[shot].lookback(record_offset) == Some(true) {
                let cur = self.xs.get(shot, q);
                self.xs.set(shot, q, !cur);
            }
        }
    }

    /// XORs sweep bit `sweep_index` (from each shot's externally supplied
    /// `sweep_bits`) into qubit `q`'s tracked X-frame.
    pub fn apply_sweep_controlled_x(&mut self, q: usize, sweep_index: usize) {
        for shot in 0..self.num_shots {
            if self.sweep_bits[shot].get(sweep_index).copied().unwrap_or(false) {
                let cur = self.xs.get(shot, q);
                self.xs.set(shot, q, !cur);
            }
        }
    }

    /// Measures qubit `q` in the Z basis for every shot: the reported bit is
    /// the XORed-in frame error (the reference circuit's own outcome is
    /// assumed `false`, since the frame only tracks the *deviation* from a
    /// noiseless reference trajectory).
    pub fn measure_z(&mut self, q: usize) {
        for shot in 0..self.num_shots {
            let outcome = self.xs.get(shot, q);
            self.records[shot].record(outcome);
        }
    }

    /// Resets qubit `q` to `|0>` for every shot, clearing any accumulated
    /// frame error there.
    pub fn reset_z(&mut self, q: usize) {
        for shot in 0..self.num_shots {
            self.xs.set(shot, q, false);
            self.zs.set(shot, q, false);
        }
    }

    /// Streams every shot's measurement record to `out`, one line per shot,
    /// ASCII `0`/`1` per bit.
    pub fn sample_to_writer(&mut self, out: &mut impl Write) -> CoreResult<()> {
        for record in &mut self.records {
            record.flush(out)?;
            out.write_all(b"\n").map_err(|e| CoreError::Io(e.to_string()))?;
        }
        Ok(())
    }
}

impl Dispatch for FrameSimulator {
    fn dispatch(&mut self, op: &Operation) -> CoreResult<()> {
        let qubits: Vec<usize> = op.targets.iter().filter_map(Target::qubit).collect();
        // Any op other than an (ELSE_)CORRELATED_ERROR closes a currently open chain.
        if !matches!(op.gate_name.as_str(), "CORRELATED_ERROR" | "ELSE_CORRELATED_ERROR") {
            self.correlated_group_open = false;
        }
        match op.gate_name.as_str() {
            "M" | "MZ" => {
                for &q in &qubits {
                    self.measure_z(q);
                }
                Ok(())
            }
            "R" | "RZ" => {
                for &q in &qubits {
                    self.reset_z(q);
                }
                Ok(())
            }
            "X_ERROR" => {
                let p = op.argument.unwrap_or(0.0);
                let mut rng = rand::rng();
                for &q in &qubits {
                    self.x_error(q, p, &mut rng)?;
                }
                Ok(())
            }
            "Z_ERROR" => {
                let p = op.argument.unwrap_or(0.0);
                let mut rng = rand::rng();
                for &q in &qubits {
                    self.z_error(q, p, &mut rng)?;
                }
                Ok(())
            }
            "Y_ERROR" => {
                let p = op.argument.unwrap_or(0.0);
                let mut rng = rand::rng();
                for &q in &qubits {
                    self.y_error(q, p, &mut rng)?;
                }
                Ok(())
            }
            "DEPOLARIZE1" => {
                let p = op.argument.unwrap_or(0.0);
                let mut rng = rand::rng();
                for &q in &qubits {
                    self.depolarize1(q, p, &mut rng)?;
                }
                Ok(())
            }
            "DEPOLARIZE2" => {
                let p = op.argument.unwrap_or(0.0);
                let mut rng = rand::rng();
                for (a, b) in qubits.iter().copied().tuples() {
                    self.depolarize2(a, b, p, &mut rng)?;
                }
                Ok(())
            }
            "CORRELATED_ERROR" | "ELSE_CORRELATED_ERROR" => {
                let p = op.argument.unwrap_or(0.0);
                let targets: Vec<(usize, u8)> = op
                    .targets
                    .iter()
                    .filter_map(|t| Some((t.qubit()?, t.pauli_code()?)))
                    .collect();
                let mut rng = rand::rng();
                if op.gate_name == "CORRELATED_ERROR" {
                    self.correlated_error(&targets, p, &mut rng)
                } else {
                    self.else_correlated_error(&targets, p, &mut rng)
                }
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
    fn noiseless_circuit_always_measures_zero() {
        let mut sim = FrameSimulator::new(2, 8);
        sim.unitary("H", &[0]).unwrap();
        sim.unitary("CX", &[0, 1]).unwrap();
        sim.measure_z(0);
        sim.measure_z(1);
        for record in &sim.records {
            assert_eq!(record.lookback(-1), Some(false));
            assert_eq!(record.lookback(-2), Some(false));
        }
    }

    #[test]
    fn x_error_with_probability_one_flips_every_shot() {
        let mut sim = FrameSimulator::new(1, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        sim.x_error(0, 1.0, &mut rng).unwrap();
        sim.measure_z(0);
        for record in &sim.records {
            assert_eq!(record.lookback(-1), Some(true));
        }
    }

    #[test]
    fn z_error_alone_does_not_affect_z_basis_measurement() {
        let mut sim = FrameSimulator::new(1, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        sim.z_error(0, 1.0, &mut rng).unwrap();
        sim.measure_z(0);
        for record in &sim.records {
            assert_eq!(record.lookback(-1), Some(false));
        }
    }

    #[test]
    fn cx_propagates_x_error_from_control_to_target() {
        let mut sim = FrameSimulator::new(2, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        sim.x_error(0, 1.0, &mut rng).unwrap();
        sim.unitary("CX", &[0, 1]).unwrap();
        sim.measure_z(0);
        sim.measure_z(1);
        for record in &sim.records {
            assert_eq!(record.lookback(-2), Some(true));
            assert_eq!(record.lookback(-1), Some(true));
        }
    }

    #[test]
    fn reset_clears_an_injected_error() {
        let mut sim = FrameSimulator::new(1, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        sim.x_error(0, 1.0, &mut rng).unwrap();
        sim.reset_z(0);
        sim.measure_z(0);
        for record in &sim.records {
            assert_eq!(record.lookback(-1), Some(false));
        }
    }

    #[test]
    fn high_water_mark_keeps_memory_bounded_across_many_measurements() {
        let mut sim = FrameSimulator::new_with_high_water_mark(1, 2, 8, 2);
        sim.x_error(0, 1.0, &mut ChaCha8Rng::seed_from_u64(11)).unwrap();
        for _ in 0..50 {
            sim.measure_z(0);
        }
        for record in &sim.records {
            assert!(record.lookback(-1).is_some());
            assert_eq!(record.len(), 50);
        }
        let mut out = Vec::new();
        sim.sample_to_writer(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().all(|l| l.len() == 50 && l.chars().all(|c| c == '1')));
    }

    #[test]
    fn sample_to_writer_emits_one_line_per_shot() {
        let mut sim = FrameSimulator::new(1, 3);
        sim.measure_z(0);
        let mut out = Vec::new();
        sim.sample_to_writer(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().all(|l| l == "0"));
    }

    #[test]
    fn correlated_error_with_probability_one_always_fires() {
        let mut sim = FrameSimulator::new(2, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        sim.correlated_error(&[(0, 1), (1, 1)], 1.0, &mut rng).unwrap();
        sim.measure_z(0);
        sim.measure_z(1);
        for record in &sim.records {
            assert_eq!(record.lookback(-2), Some(true));
            assert_eq!(record.lookback(-1), Some(true));
        }
    }

    #[test]
    fn else_branch_is_skipped_once_the_group_has_already_fired() {
        let mut sim = FrameSimulator::new(1, 4);
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        sim.correlated_error(&[(0, 1)], 1.0, &mut rng).unwrap();
        // The group already fired for every shot, so this must be a no-op
        // even though its own probability is 1.
        sim.else_correlated_error(&[(0, 2)], 1.0, &mut rng).unwrap();
        sim.measure_z(0);
        for record in &sim.records {
            // Only the X from the first branch should show up in a Z measurement.
            assert_eq!(record.lookback(-1), Some(true));
        }
    }

    #[test]
    fn else_correlated_error_with_no_open_group_is_rejected() {
        let mut sim = FrameSimulator::new(1, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let err = sim.else_correlated_error(&[(0, 1)], 1.0, &mut rng).unwrap_err();
        assert!(matches!(err, CoreError::AlgebraViolation(_)));
    }

    #[test]
    fn an_intervening_gate_closes_the_correlated_error_group() {
        let mut sim = FrameSimulator::new(1, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        sim.correlated_error(&[(0, 1)], 1.0, &mut rng).unwrap();
        sim.unitary("I", &[0]).unwrap();
        let err = sim.else_correlated_error(&[(0, 2)], 1.0, &mut rng).unwrap_err();
        assert!(matches!(err, CoreError::AlgebraViolation(_)));
    }

    #[test]
    fn depolarize1_rejects_an_over_mixing_probability() {
        let mut sim = FrameSimulator::new(1, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let err = sim.depolarize1(0, 0.75, &mut rng).unwrap_err();
        assert!(matches!(err, CoreError::NumericRange(_)));
    }

    #[test]
    fn pauli_channel_1_rejects_weights_summing_above_one() {
        let mut sim = FrameSimulator::new(1, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let err = sim.pauli_channel_1(0, [0.5, 0.4, 0.3], &mut rng).unwrap_err();
        assert!(matches!(err, CoreError::NumericRange(_)));
    }

    #[test]
    fn missing_gate_coverage_is_closed_for_every_registered_gate() {
        let mut sim = FrameSimulator::new(2, 1);
        for name in [
            "CY", "H_YZ", "SQRT_X", "SQRT_X_DAG", "SQRT_Y", "SQRT_Y_DAG", "ISWAP", "ISWAP_DAG", "XCX", "XCY", "XCZ",
            "YCX", "YCY", "YCZ",
        ] {
            let targets: Vec<usize> = if crate::tableau::lookup_gate(name).unwrap().tableau.num_qubits() == 1 {
                vec![0]
            } else {
                vec![0, 1]
            };
            sim.unitary(name, &targets).unwrap();
        }
    }

    #[test]
    fn h_xy_toggles_z_when_x_is_set_instead_of_being_a_no_op() {
        let mut sim = FrameSimulator::new(1, 1);
        sim.set_x_frame(0, 0, true);
        sim.unitary("H_XY", &[0]).unwrap();
        assert!(sim.x_frame(0, 0));
        assert!(sim.z_frame(0, 0));
    }

    #[test]
    fn classical_control_flips_only_shots_with_a_true_record() {
        let mut sim = FrameSimulator::new(1, 2);
        sim.measure_z(0); // records `false` for both shots
        sim.records[0].overwrite_last(true);
        sim.classically_controlled_x(0, -1);
        sim.measure_z(0);
        assert_eq!(sim.records[0].lookback(-1), Some(true));
        assert_eq!(sim.records[1].lookback(-1), Some(false));
    }

    #[test]
    fn sweep_controlled_x_only_affects_shots_with_the_bit_set() {
        let mut sim = FrameSimulator::new(1, 2);
        sim.sweep_bits[0] = vec![true];
        sim.sweep_bits[1] = vec![false];
        sim.apply_sweep_controlled_x(0, 0);
        sim.measure_z(0);
        assert_eq!(sim.records[0].lookback(-1), Some(true));
        assert_eq!(sim.records[1].lookback(-1), Some(false));
    }
}
