//! Circuit operation encoding: a gate name plus its targets, and the
//! dispatch glue that lets either engine in `sim` walk a sequence of them
//! without the caller needing to know which engine it's talking to.

use crate::error::{CoreError, CoreResult};
use crate::tableau::lookup_gate;

/// A single qubit (or measurement-record lookback) a gate reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Qubit(usize),
    /// A negative offset into the measurement record, as Stim-family
    /// formats use for classically-controlled gates.
    MeasurementRecord(isize),
    Sweep(usize),
    /// A Pauli-axis-tagged qubit, used by MPP and `CORRELATED_ERROR` to say
    /// which single-qubit Pauli factor sits at that qubit.
    PauliX(usize),
    PauliY(usize),
    PauliZ(usize),
}

impl Target {
    pub fn qubit(&self) -> Option<usize> {
        match self {
            Target::Qubit(q) | Target::PauliX(q) | Target::PauliY(q) | Target::PauliZ(q) => Some(*q),
            _ => None,
        }
    }

    /// The symplectic Pauli code (`I=0,X=1,Z=2,Y=3`) this target carries, if
    /// any — `None` for plain qubit/record/sweep targets.
    pub fn pauli_code(&self) -> Option<u8> {
        match self {
            Target::PauliX(_) => Some(1),
            Target::PauliZ(_) => Some(2),
            Target::PauliY(_) => Some(3),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    pub gate_name: String,
    pub targets: Vec<Target>,
    pub argument: Option<f64>,
}

impl Operation {
    pub fn new(gate_name: impl Into<String>, targets: Vec<Target>) -> Self {
        Operation { gate_name: gate_name.into(), targets, argument: None }
    }

    pub fn with_argument(mut self, argument: f64) -> Self {
        self.argument = Some(argument);
        self
    }

    /// Checks the operation names a registered unitary gate with the right
    /// arity for its qubit targets. Non-unitary operations (measurement,
    /// reset, noise channels) are dispatched by the engines directly and
    /// are not validated here.
    pub fn validate_unitary(&self) -> CoreResult<()> {
        let Some(entry) = lookup_gate(&self.gate_name) else {
            return Ok(());
        };
        let qubit_targets = self.targets.iter().filter(|t| t.qubit().is_some()).count();
        if qubit_targets != entry.tableau.num_qubits() {
            return Err(CoreError::Parse {
                op_index: 0,
                message: format!(
                    "gate '{}' takes {} qubit target(s), got {}",
                    self.gate_name,
                    entry.tableau.num_qubits(),
                    qubit_targets
                ),
            });
        }
        Ok(())
    }
}

/// Anything that can execute a named, targeted circuit operation: both
/// `sim::TableauSimulator` and `sim::FrameSimulator` implement this so a
/// caller can walk one `Vec<Operation>` against either engine.
pub trait Dispatch {
    fn dispatch(&mut self, op: &Operation) -> CoreResult<()>;
}

pub fn run_all<D: Dispatch>(engine: &mut D, ops: &[Operation]) -> CoreResult<()> {
    for (index, op) in ops.iter().enumerate() {
        engine.dispatch(op).map_err(|e| match e {
            CoreError::Parse { message, .. } => CoreError::Parse { op_index: index, message },
            other => other,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_unitary_checks_arity() {
        let op = Operation::new("CX", vec![Target::Qubit(0), Target::Qubit(1)]);
        assert!(op.validate_unitary().is_ok());

        let bad = Operation::new("CX", vec![Target::Qubit(0)]);
        assert!(bad.validate_unitary().is_err());
    }

    #[test]
    fn unregistered_gate_names_are_left_to_the_engine() {
        let op = Operation::new("M", vec![Target::Qubit(0)]);
        assert!(op.validate_unitary().is_ok());
    }

    #[test]
    fn pauli_targets_report_their_qubit_and_axis() {
        let t = Target::PauliY(3);
        assert_eq!(t.qubit(), Some(3));
        assert_eq!(t.pauli_code(), Some(3));
        assert_eq!(Target::Qubit(2).pauli_code(), None);
    }
}
