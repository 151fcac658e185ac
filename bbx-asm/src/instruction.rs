use crate::{FileId, Opcode, PanicReason, RegisterId, FDS, REGISTERS};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Instruction representation carrying decoded operands.
///
/// Operand widths are fixed per variant and there is no length prefix in
/// the bytecode, so [`size`](Self::size), [`encode`](Self::encode) and
/// [`decode`](Self::decode) must agree byte for byte. All three are
/// implemented on this one type; the assembler and the interpreter share
/// it and cannot drift apart.
pub enum Instruction {
    /// Stop execution with exit code 0.
    Halt,
    /// Stop execution with the given exit code.
    HaltCode(u8),
    /// Print a single character.
    Print(u8),
    /// Print a newline.
    Newline,
    /// Clear the terminal.
    Clrscr,
    /// Print the number of live value-stack cells.
    PrintStackSize,
    /// Print a register in decimal.
    PrintReg(RegisterId),
    /// Print a zero-terminated string named by a tagged register value.
    PrintStr(RegisterId),
    /// Write an inline string to stdout (fd 1) or stderr (fd 2).
    Write {
        /// Stream descriptor: 1 for stdout, 2 for stderr.
        fd: u8,
        /// Inline payload, at most 255 bytes.
        bytes: Vec<u8>,
    },
    /// No-op loop marker.
    Continue,
    /// No-op loop marker.
    Break,

    /// Copy `rs` into `rd`.
    MovReg(RegisterId, RegisterId),
    /// Load a sign-extended immediate into `rd`.
    MovImm(RegisterId, i32),
    /// Push a register onto the value stack.
    PushReg(RegisterId),
    /// Push a sign-extended immediate onto the value stack.
    PushImm(i32),
    /// Pop the top of the value stack into a register.
    Pop(RegisterId),

    /// `rd = rd + rs`
    Add(RegisterId, RegisterId),
    /// `rd = rd - rs`
    Sub(RegisterId, RegisterId),
    /// `rd = rd * rs`
    Mul(RegisterId, RegisterId),
    /// `rd = rd / rs`
    Div(RegisterId, RegisterId),
    /// `rd = rd % rs`
    Mod(RegisterId, RegisterId),
    /// `rd = rd & rs`
    And(RegisterId, RegisterId),
    /// `rd = rd | rs`
    Or(RegisterId, RegisterId),
    /// `rd = rd ^ rs`
    Xor(RegisterId, RegisterId),
    /// `r = !r`
    Not(RegisterId),
    /// `r = r + 1`
    Inc(RegisterId),
    /// `r = r - 1`
    Dec(RegisterId),
    /// Write the flags register from comparing `ra` against `rb`.
    Cmp(RegisterId, RegisterId),

    /// Unconditional jump to an absolute container offset.
    Jmp(u32),
    /// Jump when the flags register is zero.
    Je(u32),
    /// Jump when the flags register is non-zero.
    Jne(u32),
    /// Jump when the flags register is non-zero.
    Jl(u32),
    /// Jump when the flags register is zero.
    Jge(u32),
    /// Jump when the flags register is non-zero.
    Jb(u32),
    /// Jump when the flags register is zero.
    Jae(u32),
    /// Push a call frame reserving `frame` variable slots and jump.
    Call {
        /// Absolute container offset of the callee.
        addr: u32,
        /// Number of variable slots to reserve above the frame base.
        frame: u32,
    },
    /// Pop the current call frame and return.
    Ret,

    /// Ensure the value-stack capacity is at least `n` zeroed cells.
    Alloc(u32),
    /// Grow the value-stack capacity by `n` cells.
    Grow(u32),
    /// Set the value-stack capacity to exactly `n` cells.
    Resize(u32),
    /// Shrink the value-stack capacity by `n` cells.
    Free(u32),
    /// Load the stack cell at an absolute index.
    Load(RegisterId, u32),
    /// Load the stack cell indexed by the value of `rk`.
    LoadReg(RegisterId, RegisterId),
    /// Store a register into the stack cell at an absolute index.
    Store(RegisterId, u32),
    /// Store a register into the stack cell indexed by the value of `rk`.
    StoreReg(RegisterId, RegisterId),
    /// Load a frame-relative variable slot.
    LoadVar(RegisterId, u32),
    /// Load the variable slot indexed by the value of `rk`.
    LoadVarReg(RegisterId, RegisterId),
    /// Store into a frame-relative variable slot.
    StoreVar(RegisterId, u32),
    /// Store into the variable slot indexed by the value of `rk`.
    StoreVarReg(RegisterId, RegisterId),

    /// Load the data-table offset of a string entry into a register.
    LoadStr(RegisterId, u32),
    /// Load an 8-bit data-table entry.
    LoadByte(RegisterId, u32),
    /// Load a 16-bit data-table entry.
    LoadWord(RegisterId, u32),
    /// Load a 32-bit data-table entry.
    LoadDword(RegisterId, u32),
    /// Load a 64-bit data-table entry.
    LoadQword(RegisterId, u32),

    /// Read a line onto the value stack; leaves a tagged pointer in the
    /// register.
    ReadStr(RegisterId),
    /// Read a single character; -1 at end of input.
    ReadChar(RegisterId),
    /// Read a decimal integer line.
    Read(RegisterId),
    /// Non-blocking keypress poll; -1 when no key is available.
    GetKey(RegisterId),
    /// Uniform random integer in `[min, max]`.
    Rand {
        /// Destination register.
        r: RegisterId,
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },
    /// Block the VM thread for the given number of milliseconds.
    Sleep(u32),

    /// Open a file into a descriptor slot.
    Fopen {
        /// 0 read, 1 write, 2 append.
        mode: u8,
        /// Destination descriptor slot.
        fd: FileId,
        /// File name bytes, 1..=255 of them.
        name: Vec<u8>,
    },
    /// Close a descriptor slot.
    Fclose(FileId),
    /// Read one byte from an open file; -1 at end of file.
    Fread(FileId, RegisterId),
    /// Write the low byte of a register to an open file.
    FwriteReg(FileId, RegisterId),
    /// Write an immediate byte to an open file.
    FwriteImm(FileId, u32),
    /// Seek from the start of an open file to a register-held offset.
    FseekReg(FileId, RegisterId),
    /// Seek from the start of an open file to an immediate offset.
    FseekImm(FileId, u32),
}

impl Instruction {
    /// The opcode byte of this instruction.
    pub const fn opcode(&self) -> Opcode {
        use Instruction::*;
        match self {
            Halt => Opcode::HALT,
            HaltCode(_) => Opcode::HALTC,
            Print(_) => Opcode::PRINT,
            Newline => Opcode::NEWLINE,
            Clrscr => Opcode::CLRSCR,
            PrintStackSize => Opcode::PRINTSS,
            PrintReg(_) => Opcode::PRINTREG,
            PrintStr(_) => Opcode::PRINTSTR,
            Write { .. } => Opcode::WRITE,
            Continue => Opcode::CONTINUE,
            Break => Opcode::BREAK,
            MovReg(..) => Opcode::MOVREG,
            MovImm(..) => Opcode::MOVIMM,
            PushReg(_) => Opcode::PUSHREG,
            PushImm(_) => Opcode::PUSHIMM,
            Pop(_) => Opcode::POP,
            Add(..) => Opcode::ADD,
            Sub(..) => Opcode::SUB,
            Mul(..) => Opcode::MUL,
            Div(..) => Opcode::DIV,
            Mod(..) => Opcode::MOD,
            And(..) => Opcode::AND,
            Or(..) => Opcode::OR,
            Xor(..) => Opcode::XOR,
            Not(_) => Opcode::NOT,
            Inc(_) => Opcode::INC,
            Dec(_) => Opcode::DEC,
            Cmp(..) => Opcode::CMP,
            Jmp(_) => Opcode::JMP,
            Je(_) => Opcode::JE,
            Jne(_) => Opcode::JNE,
            Jl(_) => Opcode::JL,
            Jge(_) => Opcode::JGE,
            Jb(_) => Opcode::JB,
            Jae(_) => Opcode::JAE,
            Call { .. } => Opcode::CALL,
            Ret => Opcode::RET,
            Alloc(_) => Opcode::ALLOC,
            Grow(_) => Opcode::GROW,
            Resize(_) => Opcode::RESIZE,
            Free(_) => Opcode::FREE,
            Load(..) => Opcode::LOAD,
            LoadReg(..) => Opcode::LOADREG,
            Store(..) => Opcode::STORE,
            StoreReg(..) => Opcode::STOREREG,
            LoadVar(..) => Opcode::LOADVAR,
            LoadVarReg(..) => Opcode::LOADVARREG,
            StoreVar(..) => Opcode::STOREVAR,
            StoreVarReg(..) => Opcode::STOREVARREG,
            LoadStr(..) => Opcode::LOADSTR,
            LoadByte(..) => Opcode::LOADBYTE,
            LoadWord(..) => Opcode::LOADWORD,
            LoadDword(..) => Opcode::LOADDWORD,
            LoadQword(..) => Opcode::LOADQWORD,
            ReadStr(_) => Opcode::READSTR,
            ReadChar(_) => Opcode::READCHAR,
            Read(_) => Opcode::READ,
            GetKey(_) => Opcode::GETKEY,
            Rand { .. } => Opcode::RAND,
            Sleep(_) => Opcode::SLEEP,
            Fopen { .. } => Opcode::FOPEN,
            Fclose(_) => Opcode::FCLOSE,
            Fread(..) => Opcode::FREAD,
            FwriteReg(..) => Opcode::FWRITEREG,
            FwriteImm(..) => Opcode::FWRITEIMM,
            FseekReg(..) => Opcode::FSEEKREG,
            FseekImm(..) => Opcode::FSEEKIMM,
        }
    }

    /// Encoded length in bytes, opcode included.
    ///
    /// The layout pass advances the program counter by this amount; the
    /// emission pass appends exactly this many bytes.
    pub fn size(&self) -> usize {
        use Instruction::*;
        let operands = match self {
            Halt | Newline | Clrscr | PrintStackSize | Continue | Break | Ret => 0,

            HaltCode(_) | Print(_) | PrintReg(_) | PrintStr(_) | PushReg(_) | Pop(_) | Not(_)
            | Inc(_) | Dec(_) | ReadStr(_) | ReadChar(_) | Read(_) | GetKey(_) | Fclose(_) => 1,

            MovReg(..) | Add(..) | Sub(..) | Mul(..) | Div(..) | Mod(..) | And(..) | Or(..)
            | Xor(..) | Cmp(..) | LoadReg(..) | StoreReg(..) | LoadVarReg(..) | StoreVarReg(..)
            | Fread(..) | FwriteReg(..) | FseekReg(..) => 2,

            PushImm(_) | Jmp(_) | Je(_) | Jne(_) | Jl(_) | Jge(_) | Jb(_) | Jae(_) | Alloc(_)
            | Grow(_) | Resize(_) | Free(_) | Sleep(_) => 4,

            MovImm(..) | Load(..) | Store(..) | LoadVar(..) | StoreVar(..) | LoadStr(..)
            | LoadByte(..) | LoadWord(..) | LoadDword(..) | LoadQword(..) | FwriteImm(..)
            | FseekImm(..) => 5,

            Call { .. } => 8,
            Rand { .. } => 17,

            Write { bytes, .. } => 2 + bytes.len(),
            Fopen { name, .. } => 3 + name.len(),
        };

        1 + operands
    }

    /// Append the encoded form to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        use Instruction::*;

        buf.push(self.opcode() as u8);

        match self {
            Halt | Newline | Clrscr | PrintStackSize | Continue | Break | Ret => {}

            HaltCode(b) | Print(b) => buf.push(*b),

            PrintReg(r) | PrintStr(r) | PushReg(r) | Pop(r) | Not(r) | Inc(r) | Dec(r)
            | ReadStr(r) | ReadChar(r) | Read(r) | GetKey(r) => buf.push(*r),

            Fclose(fd) => buf.push(*fd),

            Write { fd, bytes } => {
                debug_assert!(bytes.len() <= u8::MAX as usize);
                buf.push(*fd);
                buf.push(bytes.len() as u8);
                buf.extend_from_slice(bytes);
            }

            MovReg(a, b) | Add(a, b) | Sub(a, b) | Mul(a, b) | Div(a, b) | Mod(a, b)
            | And(a, b) | Or(a, b) | Xor(a, b) | Cmp(a, b) | LoadReg(a, b) | StoreReg(a, b)
            | LoadVarReg(a, b) | StoreVarReg(a, b) => {
                buf.push(*a);
                buf.push(*b);
            }

            Fread(fd, r) | FwriteReg(fd, r) | FseekReg(fd, r) => {
                buf.push(*fd);
                buf.push(*r);
            }

            MovImm(r, imm) => {
                buf.push(*r);
                buf.extend_from_slice(&imm.to_le_bytes());
            }

            PushImm(imm) => buf.extend_from_slice(&imm.to_le_bytes()),

            Jmp(a) | Je(a) | Jne(a) | Jl(a) | Jge(a) | Jb(a) | Jae(a) | Alloc(a) | Grow(a)
            | Resize(a) | Free(a) | Sleep(a) => buf.extend_from_slice(&a.to_le_bytes()),

            Call { addr, frame } => {
                buf.extend_from_slice(&addr.to_le_bytes());
                buf.extend_from_slice(&frame.to_le_bytes());
            }

            Load(r, v) | Store(r, v) | LoadVar(r, v) | StoreVar(r, v) | LoadStr(r, v)
            | LoadByte(r, v) | LoadWord(r, v) | LoadDword(r, v) | LoadQword(r, v) => {
                buf.push(*r);
                buf.extend_from_slice(&v.to_le_bytes());
            }

            FwriteImm(fd, v) | FseekImm(fd, v) => {
                buf.push(*fd);
                buf.extend_from_slice(&v.to_le_bytes());
            }

            Rand { r, min, max } => {
                buf.push(*r);
                buf.extend_from_slice(&min.to_le_bytes());
                buf.extend_from_slice(&max.to_le_bytes());
            }

            Fopen { mode, fd, name } => {
                debug_assert!(!name.is_empty() && name.len() <= u8::MAX as usize);
                buf.push(*mode);
                buf.push(*fd);
                buf.push(name.len() as u8);
                buf.extend_from_slice(name);
            }
        }
    }

    /// Encoded form as a fresh buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.size());
        self.encode(&mut buf);
        buf
    }

    /// Decode the instruction starting at `offset` within `bytes`.
    ///
    /// Returns the instruction and the offset of the one that follows.
    /// Register and descriptor operands are validated here, so the
    /// interpreter can index its register file and descriptor table
    /// without further checks.
    pub fn decode(bytes: &[u8], offset: usize) -> Result<(Self, usize), PanicReason> {
        use Instruction::*;

        let mut at = offset;
        let op = Opcode::try_from(take_u8(bytes, &mut at)?)?;

        let instruction = match op {
            Opcode::HALT => Halt,
            Opcode::HALTC => HaltCode(take_u8(bytes, &mut at)?),
            Opcode::PRINT => Print(take_u8(bytes, &mut at)?),
            Opcode::NEWLINE => Newline,
            Opcode::CLRSCR => Clrscr,
            Opcode::PRINTSS => PrintStackSize,
            Opcode::PRINTREG => PrintReg(take_reg(bytes, &mut at)?),
            Opcode::PRINTSTR => PrintStr(take_reg(bytes, &mut at)?),
            Opcode::WRITE => {
                let fd = take_u8(bytes, &mut at)?;
                let len = take_u8(bytes, &mut at)? as usize;
                Write {
                    fd,
                    bytes: take_slice(bytes, &mut at, len)?.to_vec(),
                }
            }
            Opcode::CONTINUE => Continue,
            Opcode::BREAK => Break,

            Opcode::MOVREG => MovReg(take_reg(bytes, &mut at)?, take_reg(bytes, &mut at)?),
            Opcode::MOVIMM => MovImm(take_reg(bytes, &mut at)?, take_i32(bytes, &mut at)?),
            Opcode::PUSHREG => PushReg(take_reg(bytes, &mut at)?),
            Opcode::PUSHIMM => PushImm(take_i32(bytes, &mut at)?),
            Opcode::POP => Pop(take_reg(bytes, &mut at)?),

            Opcode::ADD => Add(take_reg(bytes, &mut at)?, take_reg(bytes, &mut at)?),
            Opcode::SUB => Sub(take_reg(bytes, &mut at)?, take_reg(bytes, &mut at)?),
            Opcode::MUL => Mul(take_reg(bytes, &mut at)?, take_reg(bytes, &mut at)?),
            Opcode::DIV => Div(take_reg(bytes, &mut at)?, take_reg(bytes, &mut at)?),
            Opcode::MOD => Mod(take_reg(bytes, &mut at)?, take_reg(bytes, &mut at)?),
            Opcode::AND => And(take_reg(bytes, &mut at)?, take_reg(bytes, &mut at)?),
            Opcode::OR => Or(take_reg(bytes, &mut at)?, take_reg(bytes, &mut at)?),
            Opcode::XOR => Xor(take_reg(bytes, &mut at)?, take_reg(bytes, &mut at)?),
            Opcode::NOT => Not(take_reg(bytes, &mut at)?),
            Opcode::INC => Inc(take_reg(bytes, &mut at)?),
            Opcode::DEC => Dec(take_reg(bytes, &mut at)?),
            Opcode::CMP => Cmp(take_reg(bytes, &mut at)?, take_reg(bytes, &mut at)?),

            Opcode::JMP => Jmp(take_u32(bytes, &mut at)?),
            Opcode::JE => Je(take_u32(bytes, &mut at)?),
            Opcode::JNE => Jne(take_u32(bytes, &mut at)?),
            Opcode::JL => Jl(take_u32(bytes, &mut at)?),
            Opcode::JGE => Jge(take_u32(bytes, &mut at)?),
            Opcode::JB => Jb(take_u32(bytes, &mut at)?),
            Opcode::JAE => Jae(take_u32(bytes, &mut at)?),
            Opcode::CALL => Call {
                addr: take_u32(bytes, &mut at)?,
                frame: take_u32(bytes, &mut at)?,
            },
            Opcode::RET => Ret,

            Opcode::ALLOC => Alloc(take_u32(bytes, &mut at)?),
            Opcode::GROW => Grow(take_u32(bytes, &mut at)?),
            Opcode::RESIZE => Resize(take_u32(bytes, &mut at)?),
            Opcode::FREE => Free(take_u32(bytes, &mut at)?),
            Opcode::LOAD => Load(take_reg(bytes, &mut at)?, take_u32(bytes, &mut at)?),
            Opcode::LOADREG => LoadReg(take_reg(bytes, &mut at)?, take_reg(bytes, &mut at)?),
            Opcode::STORE => Store(take_reg(bytes, &mut at)?, take_u32(bytes, &mut at)?),
            Opcode::STOREREG => StoreReg(take_reg(bytes, &mut at)?, take_reg(bytes, &mut at)?),
            Opcode::LOADVAR => LoadVar(take_reg(bytes, &mut at)?, take_u32(bytes, &mut at)?),
            Opcode::LOADVARREG => LoadVarReg(take_reg(bytes, &mut at)?, take_reg(bytes, &mut at)?),
            Opcode::STOREVAR => StoreVar(take_reg(bytes, &mut at)?, take_u32(bytes, &mut at)?),
            Opcode::STOREVARREG => StoreVarReg(take_reg(bytes, &mut at)?, take_reg(bytes, &mut at)?),

            Opcode::LOADSTR => LoadStr(take_reg(bytes, &mut at)?, take_u32(bytes, &mut at)?),
            Opcode::LOADBYTE => LoadByte(take_reg(bytes, &mut at)?, take_u32(bytes, &mut at)?),
            Opcode::LOADWORD => LoadWord(take_reg(bytes, &mut at)?, take_u32(bytes, &mut at)?),
            Opcode::LOADDWORD => LoadDword(take_reg(bytes, &mut at)?, take_u32(bytes, &mut at)?),
            Opcode::LOADQWORD => LoadQword(take_reg(bytes, &mut at)?, take_u32(bytes, &mut at)?),

            Opcode::READSTR => ReadStr(take_reg(bytes, &mut at)?),
            Opcode::READCHAR => ReadChar(take_reg(bytes, &mut at)?),
            Opcode::READ => Read(take_reg(bytes, &mut at)?),
            Opcode::GETKEY => GetKey(take_reg(bytes, &mut at)?),
            Opcode::RAND => Rand {
                r: take_reg(bytes, &mut at)?,
                min: take_i64(bytes, &mut at)?,
                max: take_i64(bytes, &mut at)?,
            },
            Opcode::SLEEP => Sleep(take_u32(bytes, &mut at)?),

            Opcode::FOPEN => {
                let mode = take_u8(bytes, &mut at)?;
                let fd = take_fd(bytes, &mut at)?;
                let len = take_u8(bytes, &mut at)? as usize;
                Fopen {
                    mode,
                    fd,
                    name: take_slice(bytes, &mut at, len)?.to_vec(),
                }
            }
            Opcode::FCLOSE => Fclose(take_fd(bytes, &mut at)?),
            Opcode::FREAD => Fread(take_fd(bytes, &mut at)?, take_reg(bytes, &mut at)?),
            Opcode::FWRITEREG => FwriteReg(take_fd(bytes, &mut at)?, take_reg(bytes, &mut at)?),
            Opcode::FWRITEIMM => FwriteImm(take_fd(bytes, &mut at)?, take_u32(bytes, &mut at)?),
            Opcode::FSEEKREG => FseekReg(take_fd(bytes, &mut at)?, take_reg(bytes, &mut at)?),
            Opcode::FSEEKIMM => FseekImm(take_fd(bytes, &mut at)?, take_u32(bytes, &mut at)?),
        };

        Ok((instruction, at))
    }
}

fn take_u8(bytes: &[u8], at: &mut usize) -> Result<u8, PanicReason> {
    let b = *bytes.get(*at).ok_or(PanicReason::TruncatedInstruction)?;
    *at += 1;
    Ok(b)
}

fn take_reg(bytes: &[u8], at: &mut usize) -> Result<RegisterId, PanicReason> {
    let r = take_u8(bytes, at)?;
    if usize::from(r) >= REGISTERS {
        return Err(PanicReason::InvalidRegister);
    }
    Ok(r)
}

fn take_fd(bytes: &[u8], at: &mut usize) -> Result<FileId, PanicReason> {
    let fd = take_u8(bytes, at)?;
    if usize::from(fd) >= FDS {
        return Err(PanicReason::InvalidFileDescriptor);
    }
    Ok(fd)
}

fn take_slice<'a>(bytes: &'a [u8], at: &mut usize, len: usize) -> Result<&'a [u8], PanicReason> {
    let end = at.checked_add(len).ok_or(PanicReason::TruncatedInstruction)?;
    let slice = bytes.get(*at..end).ok_or(PanicReason::TruncatedInstruction)?;
    *at = end;
    Ok(slice)
}

fn take_u32(bytes: &[u8], at: &mut usize) -> Result<u32, PanicReason> {
    let raw = take_slice(bytes, at, 4)?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn take_i32(bytes: &[u8], at: &mut usize) -> Result<i32, PanicReason> {
    Ok(take_u32(bytes, at)? as i32)
}

fn take_i64(bytes: &[u8], at: &mut usize) -> Result<i64, PanicReason> {
    let raw = take_slice(bytes, at, 8)?;
    let mut b = [0u8; 8];
    b.copy_from_slice(raw);
    Ok(i64::from_le_bytes(b))
}
