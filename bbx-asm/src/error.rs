use std::io;

use thiserror::Error;

/// Assembler error variants.
///
/// Every error is fatal and carries the 1-based source line it was
/// detected on; expanded macro lines report the invocation site.
#[derive(Debug, Error)]
pub enum AsmError {
    /// I/O and OS related errors.
    #[error("unrecoverable error: {0}")]
    Io(#[from] io::Error),
    /// The first significant line of the input is not `%asm`.
    #[error("line {line}: file must start with %asm")]
    MissingAsmHeader {
        /// Offending line.
        line: usize,
    },
    /// No `%main` or `%entry` section was found.
    #[error("missing %main or %entry section")]
    MissingCodeSection,
    /// A `%data` section opened after the code section.
    #[error("line {line}: %data section must come before %main/%entry")]
    DataAfterCode {
        /// Offending line.
        line: usize,
    },
    /// A non-directive line appeared before any section marker.
    #[error("line {line}: code outside of section; use %data or %main/%entry")]
    OutsideSection {
        /// Offending line.
        line: usize,
    },
    /// A data directive appeared outside the `%data` section.
    #[error("line {line}: {directive} must be inside the %data section")]
    DataOutsideSection {
        /// Offending line.
        line: usize,
        /// Directive mnemonic.
        directive: String,
    },
    /// A label was declared outside the code section.
    #[error("line {line}: labels must be inside the %main/%entry section")]
    LabelOutsideCode {
        /// Offending line.
        line: usize,
    },
    /// The same label was declared twice.
    #[error("line {line}: duplicate label `{name}`")]
    DuplicateLabel {
        /// Offending line.
        line: usize,
        /// Label name.
        name: String,
    },
    /// A branch or call names a label that was never declared.
    #[error("line {line}: unknown label `{name}`")]
    UnknownLabel {
        /// Offending line.
        line: usize,
        /// Label name.
        name: String,
    },
    /// The same data name was declared twice, or the table is full.
    #[error("line {line}: cannot declare data entry `${name}`: duplicate name or table full")]
    BadDataEntry {
        /// Offending line.
        line: usize,
        /// Entry name.
        name: String,
    },
    /// An instruction names a data entry that was never declared.
    #[error("line {line}: undefined data entry `${name}`")]
    UnknownData {
        /// Offending line.
        line: usize,
        /// Entry name.
        name: String,
    },
    /// A `FRAME` directive that does not follow a label.
    #[error("line {line}: FRAME must immediately follow a label")]
    StrayFrame {
        /// Offending line.
        line: usize,
    },
    /// The mnemonic is not part of the instruction set.
    #[error("line {line}: unknown instruction `{mnemonic}`")]
    UnknownInstruction {
        /// Offending line.
        line: usize,
        /// Mnemonic token.
        mnemonic: String,
    },
    /// Malformed operands for a known mnemonic.
    #[error("line {line}: syntax error: {msg}")]
    Syntax {
        /// Offending line.
        line: usize,
        /// Description of the expected shape.
        msg: String,
    },
    /// A register token that does not name a register.
    #[error("line {line}: invalid register `{token}`")]
    InvalidRegister {
        /// Offending line.
        line: usize,
        /// Offending token.
        token: String,
    },
    /// A file-descriptor token that does not name a descriptor slot.
    #[error("line {line}: invalid file descriptor `{token}`")]
    InvalidFd {
        /// Offending line.
        line: usize,
        /// Offending token.
        token: String,
    },
    /// A string literal without a closing quote.
    #[error("line {line}: unterminated string literal")]
    UnterminatedString {
        /// Offending line.
        line: usize,
    },
    /// Macro expansion exceeded the nesting limit.
    #[error("line {line}: macro expansion exceeds depth limit of {limit}")]
    MacroDepth {
        /// Invocation site.
        line: usize,
        /// The nesting limit.
        limit: usize,
    },
    /// A `%macro` block without `%endmacro`.
    #[error("line {line}: %macro without matching %endmacro")]
    UnterminatedMacro {
        /// Line of the `%macro` marker.
        line: usize,
    },
    /// `%endmacro` outside a macro definition.
    #[error("line {line}: %endmacro without %macro")]
    StrayEndmacro {
        /// Offending line.
        line: usize,
    },
}
