//! Runtime interpreter error implementation

use std::{fmt, io};

use bbx_asm::{ContainerError, Opcode, PanicReason};
use thiserror::Error;

/// Interpreter error variants.
#[derive(Debug, Error)]
pub enum InterpreterError {
    /// The execution faulted at a well-formed instruction.
    #[error("execution error: {0}")]
    PanicInstruction(PanicContext),
    /// The execution faulted before an instruction could be formed,
    /// e.g. on an unknown opcode byte or truncated operands.
    #[error("execution error at pc {pc}: {reason}")]
    Panic {
        /// Fault reason.
        reason: PanicReason,
        /// Program counter of the fault.
        pc: usize,
    },
    /// The container failed validation at load time.
    #[error("invalid container: {0}")]
    Container(#[from] ContainerError),
    /// I/O and OS related errors.
    #[error("unrecoverable error: {0}")]
    Io(#[from] io::Error),
}

impl InterpreterError {
    /// Attach instruction context to a runtime error.
    pub fn from_runtime(error: RuntimeError, opcode: Opcode, pc: usize) -> Self {
        match error {
            RuntimeError::Recoverable(reason) => {
                Self::PanicInstruction(PanicContext { reason, opcode, pc })
            }
            RuntimeError::Halt(e) => Self::Io(e),
        }
    }

    /// Return the specified panic reason that caused this error, if
    /// applicable.
    pub const fn panic_reason(&self) -> Option<PanicReason> {
        match self {
            Self::PanicInstruction(PanicContext { reason, .. }) => Some(*reason),
            Self::Panic { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// A fault reason tied to the opcode and program counter it occurred at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PanicContext {
    /// Fault reason.
    pub reason: PanicReason,
    /// Opcode that was executing.
    pub opcode: Opcode,
    /// Program counter of the instruction.
    pub pc: usize,
}

impl fmt::Display for PanicContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at pc {} ({})", self.reason, self.pc, self.opcode)
    }
}

#[derive(Debug)]
/// Runtime error description raised while executing one instruction.
pub enum RuntimeError {
    /// Specified fault of the program being run.
    Recoverable(PanicReason),
    /// Unspecified error of the host environment.
    Halt(io::Error),
}

impl From<PanicReason> for RuntimeError {
    fn from(reason: PanicReason) -> Self {
        Self::Recoverable(reason)
    }
}

impl From<io::Error> for RuntimeError {
    fn from(e: io::Error) -> Self {
        Self::Halt(e)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable(e) => e.fmt(f),
            Self::Halt(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Recoverable(e) => Some(e),
            Self::Halt(e) => Some(e),
        }
    }
}
