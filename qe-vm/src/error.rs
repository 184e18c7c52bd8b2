//! The VM error model: a recoverable half the interpreter can retry from,
//! and a fatal half that must abort the whole query, both wrapped by an
//! `InterpreterError<StorageError>`/`RuntimeError<StorageError>`-style split
//! generic over the storage collaborator's own error type so this crate
//! never has to know its concrete shape.

use std::fmt;

use qe_asm::Slot;
use thiserror::Error;

/// Error codes an opcode can leave in `Bytecode::err`, mapped 1:1 from
/// `vm/bytecode.go`'s `bcerr` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VmError {
    /// The scratch arena for boxing output is exhausted; caller should
    /// grow scratch and retry the same instruction.
    #[error("insufficient scratch space")]
    MoreScratch,
    /// A hash lookup missed; `errinfo` names the hash slot. Caller must
    /// populate the referenced radix tree and retry at the same pc
    /// (miss-and-refill).
    #[error("missing radix tree entry in slot {0}")]
    NeedRadix(Slot),
    /// An internal bounds/sanity check failed; fatal for the query.
    #[error("internal assertion failed")]
    Corrupt,
    /// A radix-tree bounds check failed; fatal for the query.
    #[error("radix tree bounds-check failed")]
    TreeCorrupt,
}

impl VmError {
    /// `true` for the two error codes the driver may retry after
    /// adjusting scratch/radix state.
    pub const fn is_recoverable(self) -> bool {
        matches!(self, VmError::MoreScratch | VmError::NeedRadix(_))
    }

    pub const fn is_fatal(self) -> bool {
        !self.is_recoverable()
    }
}

/// The error surface the interpreter returns to its driver: either a VM
/// error (recoverable or fatal, see [`VmError`]) or an error from the
/// storage collaborator, which always propagates unchanged.
#[derive(Debug)]
pub enum InterpreterError<StorageError> {
    Vm(VmError),
    Storage(StorageError),
}

impl<StorageError> InterpreterError<StorageError> {
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, InterpreterError::Vm(e) if e.is_recoverable())
    }

    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    pub fn vm_error(&self) -> Option<VmError> {
        match self {
            InterpreterError::Vm(e) => Some(*e),
            InterpreterError::Storage(_) => None,
        }
    }
}

impl<StorageError: PartialEq> PartialEq for InterpreterError<StorageError> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (InterpreterError::Vm(a), InterpreterError::Vm(b)) => a == b,
            (InterpreterError::Storage(a), InterpreterError::Storage(b)) => a == b,
            _ => false,
        }
    }
}

impl<StorageError: fmt::Debug> fmt::Display for InterpreterError<StorageError> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpreterError::Vm(e) => write!(f, "{e}"),
            InterpreterError::Storage(e) => write!(f, "storage error: {e:?}"),
        }
    }
}

impl<StorageError: fmt::Debug> std::error::Error for InterpreterError<StorageError> {}

impl<StorageError> From<VmError> for InterpreterError<StorageError> {
    fn from(e: VmError) -> Self {
        InterpreterError::Vm(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_classification_splits_vmerror_variants() {
        assert!(VmError::MoreScratch.is_recoverable());
        assert!(VmError::NeedRadix(3).is_recoverable());
        assert!(VmError::Corrupt.is_fatal());
        assert!(VmError::TreeCorrupt.is_fatal());
    }

    #[test]
    fn interpreter_error_forwards_recoverability() {
        let e: InterpreterError<String> = VmError::NeedRadix(1).into();
        assert!(e.is_recoverable());
        let e2: InterpreterError<String> = InterpreterError::Storage("io broke".to_string());
        assert!(e2.is_fatal());
    }
}
