use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
/// Runtime fault representation for the interpreter.
///
/// Every fault is fatal; the interpreter wraps the reason together with
/// the offending opcode and program counter before surfacing it.
pub enum PanicReason {
    /// The byte at the program counter is not a known opcode.
    InvalidOpcode,
    /// The instruction's operand bytes run past the end of the program.
    TruncatedInstruction,
    /// An operand names a register outside the register file.
    InvalidRegister,
    /// An operand names a slot outside the file-descriptor table.
    InvalidFileDescriptor,
    /// `WRITE` was given a stream descriptor other than stdout/stderr.
    InvalidWriteDescriptor,
    /// The file-descriptor slot has no open file.
    FileNotOpen,
    /// Division or modulus by zero.
    DivisionByZero,
    /// Pop from an empty value stack.
    StackUnderflow,
    /// `RET` without a live call frame.
    CallStackUnderflow,
    /// `FREE` beyond the current value-stack capacity.
    FreeOutOfBounds,
    /// Absolute stack index outside the allocated capacity.
    StackIndexOutOfBounds,
    /// Variable slot outside the current call frame.
    FrameSlotOutOfBounds,
    /// Branch or call target outside the container.
    JumpOutOfBounds,
    /// Data-table offset outside the data region.
    DataOffsetOutOfBounds,
    /// `FOPEN` with an empty file name.
    InvalidFilenameLength,
}

impl fmt::Display for PanicReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for PanicReason {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl From<PanicReason> for std::io::Error {
    fn from(reason: PanicReason) -> Self {
        use std::io;

        io::Error::new(io::ErrorKind::Other, reason)
    }
}
