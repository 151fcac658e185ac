use core::fmt;

use crate::PanicReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[repr(u8)]
/// Raw opcode byte of every instruction variant.
///
/// The operand bytes that follow each opcode have a fixed shape per
/// variant; [`crate::Instruction`] owns that knowledge. Gaps between the
/// groups are reserved.
pub enum Opcode {
    /// Stop execution with exit code 0.
    HALT = 0x00,
    /// Stop execution with an explicit 1-byte exit code.
    HALTC = 0x01,
    /// Print a single literal character.
    PRINT = 0x02,
    /// Print a newline.
    NEWLINE = 0x03,
    /// Clear the terminal.
    CLRSCR = 0x04,
    /// Print the number of live value-stack cells.
    PRINTSS = 0x05,
    /// Print a register in decimal.
    PRINTREG = 0x06,
    /// Print a zero-terminated string from the data table or the stack.
    PRINTSTR = 0x07,
    /// Write an inline string to stdout or stderr.
    WRITE = 0x08,
    /// Loop marker emitted by the higher-level front-end; executes as a
    /// no-op.
    CONTINUE = 0x09,
    /// Loop marker emitted by the higher-level front-end; executes as a
    /// no-op.
    BREAK = 0x0a,

    /// Copy one register into another.
    MOVREG = 0x10,
    /// Load a 32-bit immediate into a register (sign-extended).
    MOVIMM = 0x11,
    /// Push a register onto the value stack.
    PUSHREG = 0x12,
    /// Push a 32-bit immediate onto the value stack (sign-extended).
    PUSHIMM = 0x13,
    /// Pop the top of the value stack into a register.
    POP = 0x14,

    /// `rd += rs`
    ADD = 0x20,
    /// `rd -= rs`
    SUB = 0x21,
    /// `rd *= rs`
    MUL = 0x22,
    /// `rd /= rs`; division by zero is fatal.
    DIV = 0x23,
    /// `rd %= rs`; modulus by zero is fatal.
    MOD = 0x24,
    /// `rd &= rs`
    AND = 0x25,
    /// `rd |= rs`
    OR = 0x26,
    /// `rd ^= rs`
    XOR = 0x27,
    /// Bitwise complement of a register.
    NOT = 0x28,
    /// Increment a register.
    INC = 0x29,
    /// Decrement a register.
    DEC = 0x2a,
    /// Compare two registers; writes the flags register.
    CMP = 0x2b,

    /// Unconditional jump to an absolute container offset.
    JMP = 0x30,
    /// Jump when the flags register is zero.
    JE = 0x31,
    /// Jump when the flags register is non-zero.
    JNE = 0x32,
    /// Jump when the flags register is non-zero.
    JL = 0x33,
    /// Jump when the flags register is zero.
    JGE = 0x34,
    /// Jump when the flags register is non-zero.
    JB = 0x35,
    /// Jump when the flags register is zero.
    JAE = 0x36,
    /// Push a call frame and jump.
    CALL = 0x37,
    /// Pop the current call frame and return.
    RET = 0x38,

    /// Ensure the value-stack capacity is at least the operand.
    ALLOC = 0x40,
    /// Grow the value-stack capacity by the operand.
    GROW = 0x41,
    /// Set the value-stack capacity exactly.
    RESIZE = 0x42,
    /// Shrink the value-stack capacity by the operand.
    FREE = 0x43,
    /// Load a stack cell by absolute index.
    LOAD = 0x44,
    /// Load a stack cell by register-held index.
    LOADREG = 0x45,
    /// Store a register into a stack cell by absolute index.
    STORE = 0x46,
    /// Store a register into a stack cell by register-held index.
    STOREREG = 0x47,
    /// Load a frame-relative variable slot.
    LOADVAR = 0x48,
    /// Load a frame-relative variable slot by register-held index.
    LOADVARREG = 0x49,
    /// Store into a frame-relative variable slot.
    STOREVAR = 0x4a,
    /// Store into a frame-relative variable slot by register-held index.
    STOREVARREG = 0x4b,

    /// Load the data-table offset of a string entry.
    LOADSTR = 0x50,
    /// Load an 8-bit data-table entry.
    LOADBYTE = 0x51,
    /// Load a 16-bit data-table entry.
    LOADWORD = 0x52,
    /// Load a 32-bit data-table entry.
    LOADDWORD = 0x53,
    /// Load a 64-bit data-table entry.
    LOADQWORD = 0x54,

    /// Read a line from stdin onto the value stack; leaves a tagged
    /// stack pointer in the register.
    READSTR = 0x60,
    /// Read a single character from stdin.
    READCHAR = 0x61,
    /// Read a decimal integer line from stdin.
    READ = 0x62,
    /// Non-blocking keypress poll; -1 when no key is available.
    GETKEY = 0x63,
    /// Uniform random integer in an inclusive range.
    RAND = 0x64,
    /// Block the VM thread for a number of milliseconds.
    SLEEP = 0x65,

    /// Open a file into a descriptor slot.
    FOPEN = 0x70,
    /// Close a descriptor slot.
    FCLOSE = 0x71,
    /// Read one byte from an open file; -1 at end of file.
    FREAD = 0x72,
    /// Write the low byte of a register to an open file.
    FWRITEREG = 0x73,
    /// Write an immediate byte to an open file.
    FWRITEIMM = 0x74,
    /// Seek from the start of an open file to a register-held offset.
    FSEEKREG = 0x75,
    /// Seek from the start of an open file to an immediate offset.
    FSEEKIMM = 0x76,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl TryFrom<u8> for Opcode {
    type Error = PanicReason;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        use Opcode::*;
        match b {
            0x00 => Ok(HALT),
            0x01 => Ok(HALTC),
            0x02 => Ok(PRINT),
            0x03 => Ok(NEWLINE),
            0x04 => Ok(CLRSCR),
            0x05 => Ok(PRINTSS),
            0x06 => Ok(PRINTREG),
            0x07 => Ok(PRINTSTR),
            0x08 => Ok(WRITE),
            0x09 => Ok(CONTINUE),
            0x0a => Ok(BREAK),
            0x10 => Ok(MOVREG),
            0x11 => Ok(MOVIMM),
            0x12 => Ok(PUSHREG),
            0x13 => Ok(PUSHIMM),
            0x14 => Ok(POP),
            0x20 => Ok(ADD),
            0x21 => Ok(SUB),
            0x22 => Ok(MUL),
            0x23 => Ok(DIV),
            0x24 => Ok(MOD),
            0x25 => Ok(AND),
            0x26 => Ok(OR),
            0x27 => Ok(XOR),
            0x28 => Ok(NOT),
            0x29 => Ok(INC),
            0x2a => Ok(DEC),
            0x2b => Ok(CMP),
            0x30 => Ok(JMP),
            0x31 => Ok(JE),
            0x32 => Ok(JNE),
            0x33 => Ok(JL),
            0x34 => Ok(JGE),
            0x35 => Ok(JB),
            0x36 => Ok(JAE),
            0x37 => Ok(CALL),
            0x38 => Ok(RET),
            0x40 => Ok(ALLOC),
            0x41 => Ok(GROW),
            0x42 => Ok(RESIZE),
            0x43 => Ok(FREE),
            0x44 => Ok(LOAD),
            0x45 => Ok(LOADREG),
            0x46 => Ok(STORE),
            0x47 => Ok(STOREREG),
            0x48 => Ok(LOADVAR),
            0x49 => Ok(LOADVARREG),
            0x4a => Ok(STOREVAR),
            0x4b => Ok(STOREVARREG),
            0x50 => Ok(LOADSTR),
            0x51 => Ok(LOADBYTE),
            0x52 => Ok(LOADWORD),
            0x53 => Ok(LOADDWORD),
            0x54 => Ok(LOADQWORD),
            0x60 => Ok(READSTR),
            0x61 => Ok(READCHAR),
            0x62 => Ok(READ),
            0x63 => Ok(GETKEY),
            0x64 => Ok(RAND),
            0x65 => Ok(SLEEP),
            0x70 => Ok(FOPEN),
            0x71 => Ok(FCLOSE),
            0x72 => Ok(FREAD),
            0x73 => Ok(FWRITEREG),
            0x74 => Ok(FWRITEIMM),
            0x75 => Ok(FSEEKREG),
            0x76 => Ok(FSEEKIMM),
            _ => Err(PanicReason::InvalidOpcode),
        }
    }
}
