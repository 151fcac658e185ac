//! Per-mnemonic instruction parsing, shared by both assembler passes.
//!
//! Mnemonic dispatch is a single table over the whole token, so
//! overlapping names (`PRINT`, `PRINTREG`, `PRINT_STACKSIZE`) cannot
//! shadow each other.

use crate::lex::{is_register, mnemonic, parse_fd, parse_int, parse_register, quoted, split_operands};
use crate::{AsmError, Instruction};

/// Name resolution performed while parsing an instruction.
///
/// The layout pass resolves labels to a placeholder (operand widths do
/// not depend on the value) and frame hints to zero; the emission pass
/// resolves against the finished tables.
pub(crate) trait Resolver {
    /// Absolute container offset of a label.
    fn label(&self, name: &str, line: usize) -> Result<u32, AsmError>;
    /// Data-table offset of a data entry.
    fn data_offset(&self, name: &str, line: usize) -> Result<u32, AsmError>;
    /// Frame hint attached to a label by a `FRAME` directive.
    fn frame_hint(&self, name: &str) -> Option<u32>;
}

/// Parse one code line into an [`Instruction`].
pub(crate) fn parse_instruction(
    text: &str,
    line: usize,
    resolver: &dyn Resolver,
) -> Result<Instruction, AsmError> {
    let (head, rest) = mnemonic(text);
    let operands = split_operands(rest);

    let syntax = |msg: &str| AsmError::Syntax {
        line,
        msg: msg.to_owned(),
    };

    let instruction = match head.to_ascii_uppercase().as_str() {
        "HALT" => match operands.as_slice() {
            [] => Instruction::Halt,
            &[code] => Instruction::HaltCode(parse_halt_code(code, line)?),
            _ => return Err(syntax("expected HALT [code]")),
        },

        "PRINT" => {
            let bytes = rest.trim().as_bytes();
            match bytes {
                [b'\'', c, ..] => Instruction::Print(*c),
                _ => return Err(syntax("expected PRINT '<char>")),
            }
        }

        "NEWLINE" => no_operands(Instruction::Newline, &operands, "NEWLINE", line)?,
        "CLRSCR" => no_operands(Instruction::Clrscr, &operands, "CLRSCR", line)?,
        "PRINT_STACKSIZE" => no_operands(Instruction::PrintStackSize, &operands, "PRINT_STACKSIZE", line)?,
        "CONTINUE" => no_operands(Instruction::Continue, &operands, "CONTINUE", line)?,
        "BREAK" => no_operands(Instruction::Break, &operands, "BREAK", line)?,
        "RET" => no_operands(Instruction::Ret, &operands, "RET", line)?,

        "PRINTREG" => Instruction::PrintReg(one_register(&operands, "PRINTREG", line)?),
        "PRINTSTR" => Instruction::PrintStr(one_register(&operands, "PRINTSTR", line)?),
        "READSTR" => Instruction::ReadStr(one_register(&operands, "READSTR", line)?),
        "READCHAR" => Instruction::ReadChar(one_register(&operands, "READCHAR", line)?),
        "READ" => Instruction::Read(one_register(&operands, "READ", line)?),
        "GETKEY" => Instruction::GetKey(one_register(&operands, "GETKEY", line)?),
        "POP" => Instruction::Pop(one_register(&operands, "POP", line)?),
        "NOT" => Instruction::Not(one_register(&operands, "NOT", line)?),
        "INC" => Instruction::Inc(one_register(&operands, "INC", line)?),
        "DEC" => Instruction::Dec(one_register(&operands, "DEC", line)?),

        "WRITE" => {
            let &[fd, _] = operands.as_slice() else {
                return Err(syntax("expected WRITE <stdout|stderr>, \"<string>\""));
            };
            let fd = parse_stream_fd(fd, line)?;
            let mut bytes = quoted(rest, line)?.as_bytes().to_vec();
            bytes.truncate(u8::MAX as usize);
            Instruction::Write { fd, bytes }
        }

        "MOV" => {
            let &[dst, src] = operands.as_slice() else {
                return Err(syntax("expected MOV <register>, <register|immediate>"));
            };
            let rd = parse_register(dst, line)?;
            if is_register(src) {
                Instruction::MovReg(rd, parse_register(src, line)?)
            } else {
                Instruction::MovImm(rd, parse_int(src, line)? as i32)
            }
        }

        "PUSH" => {
            let &[operand] = operands.as_slice() else {
                return Err(syntax("expected PUSH <register|immediate>"));
            };
            if is_register(operand) {
                Instruction::PushReg(parse_register(operand, line)?)
            } else {
                Instruction::PushImm(parse_int(operand, line)? as i32)
            }
        }

        "ADD" => binary(Instruction::Add, &operands, "ADD", line)?,
        "SUB" => binary(Instruction::Sub, &operands, "SUB", line)?,
        "MUL" => binary(Instruction::Mul, &operands, "MUL", line)?,
        "DIV" => binary(Instruction::Div, &operands, "DIV", line)?,
        "MOD" => binary(Instruction::Mod, &operands, "MOD", line)?,
        "AND" => binary(Instruction::And, &operands, "AND", line)?,
        "OR" => binary(Instruction::Or, &operands, "OR", line)?,
        "XOR" => binary(Instruction::Xor, &operands, "XOR", line)?,
        "CMP" => binary(Instruction::Cmp, &operands, "CMP", line)?,

        "JMP" => Instruction::Jmp(branch_target(&operands, "JMP", line, resolver)?),
        "JE" => Instruction::Je(branch_target(&operands, "JE", line, resolver)?),
        "JNE" => Instruction::Jne(branch_target(&operands, "JNE", line, resolver)?),
        "JL" => Instruction::Jl(branch_target(&operands, "JL", line, resolver)?),
        "JGE" => Instruction::Jge(branch_target(&operands, "JGE", line, resolver)?),
        "JB" => Instruction::Jb(branch_target(&operands, "JB", line, resolver)?),
        "JAE" => Instruction::Jae(branch_target(&operands, "JAE", line, resolver)?),

        "CALL" => {
            let (target, frame) = match operands.as_slice() {
                &[target] => (target, None),
                &[target, frame] => (target, Some(parse_int(frame, line)? as u32)),
                _ => return Err(syntax("expected CALL <label>[, <frame size>]")),
            };
            let name = target.strip_prefix('.').unwrap_or(target);
            let frame = frame
                .or_else(|| resolver.frame_hint(name))
                .unwrap_or(0);
            Instruction::Call {
                addr: resolver.label(name, line)?,
                frame,
            }
        }

        "ALLOC" => Instruction::Alloc(one_count(&operands, "ALLOC", line)?),
        "GROW" => Instruction::Grow(one_count(&operands, "GROW", line)?),
        "RESIZE" => Instruction::Resize(one_count(&operands, "RESIZE", line)?),
        "FREE" => Instruction::Free(one_count(&operands, "FREE", line)?),
        "SLEEP" => Instruction::Sleep(one_count(&operands, "SLEEP", line)?),

        "LOAD" => indexed(Instruction::Load, Instruction::LoadReg, &operands, "LOAD", line)?,
        "STORE" => indexed(Instruction::Store, Instruction::StoreReg, &operands, "STORE", line)?,
        "LOADVAR" => indexed(Instruction::LoadVar, Instruction::LoadVarReg, &operands, "LOADVAR", line)?,
        "STOREVAR" => indexed(Instruction::StoreVar, Instruction::StoreVarReg, &operands, "STOREVAR", line)?,

        "LOADSTR" => data_ref(Instruction::LoadStr, &operands, "LOADSTR", line, resolver)?,
        "LOADBYTE" => data_ref(Instruction::LoadByte, &operands, "LOADBYTE", line, resolver)?,
        "LOADWORD" => data_ref(Instruction::LoadWord, &operands, "LOADWORD", line, resolver)?,
        "LOADDWORD" => data_ref(Instruction::LoadDword, &operands, "LOADDWORD", line, resolver)?,
        "LOADQWORD" => data_ref(Instruction::LoadQword, &operands, "LOADQWORD", line, resolver)?,

        "RAND" => {
            let &[r, min, max] = operands.as_slice() else {
                return Err(syntax("expected RAND <register>, <min>, <max>"));
            };
            Instruction::Rand {
                r: parse_register(r, line)?,
                min: parse_int(min, line)?,
                max: parse_int(max, line)?,
            }
        }

        "FOPEN" => {
            let &[mode, fd, _] = operands.as_slice() else {
                return Err(syntax("expected FOPEN <r|w|a>, <file descriptor>, \"<name>\""));
            };
            let mode = match mode.to_ascii_lowercase().as_str() {
                "r" => 0,
                "w" => 1,
                "a" => 2,
                _ => return Err(syntax("invalid mode: expected r, w, or a")),
            };
            let name = quoted(rest, line)?.as_bytes().to_vec();
            if name.is_empty() || name.len() > u8::MAX as usize {
                return Err(syntax("file name must be 1..=255 bytes"));
            }
            Instruction::Fopen {
                mode,
                fd: parse_fd(fd, line)?,
                name,
            }
        }

        "FCLOSE" => {
            let &[fd] = operands.as_slice() else {
                return Err(syntax("expected FCLOSE <file descriptor>"));
            };
            Instruction::Fclose(parse_fd(fd, line)?)
        }

        "FREAD" => {
            let &[fd, r] = operands.as_slice() else {
                return Err(syntax("expected FREAD <file descriptor>, <register>"));
            };
            Instruction::Fread(parse_fd(fd, line)?, parse_register(r, line)?)
        }

        "FWRITE" => {
            let &[fd, value] = operands.as_slice() else {
                return Err(syntax("expected FWRITE <file descriptor>, <register|immediate>"));
            };
            let fd = parse_fd(fd, line)?;
            if is_register(value) {
                Instruction::FwriteReg(fd, parse_register(value, line)?)
            } else {
                Instruction::FwriteImm(fd, parse_int(value, line)? as u32)
            }
        }

        "FSEEK" => {
            let &[fd, offset] = operands.as_slice() else {
                return Err(syntax("expected FSEEK <file descriptor>, <register|immediate>"));
            };
            let fd = parse_fd(fd, line)?;
            if is_register(offset) {
                Instruction::FseekReg(fd, parse_register(offset, line)?)
            } else {
                Instruction::FseekImm(fd, parse_int(offset, line)? as u32)
            }
        }

        _ => {
            return Err(AsmError::UnknownInstruction {
                line,
                mnemonic: head.to_owned(),
            })
        }
    };

    Ok(instruction)
}

fn parse_halt_code(token: &str, line: usize) -> Result<u8, AsmError> {
    if token.eq_ignore_ascii_case("OK") {
        Ok(0)
    } else if token.eq_ignore_ascii_case("BAD") {
        Ok(1)
    } else {
        // the halt byte is the actual exit code, modulo 256
        Ok(parse_int(token, line)? as u8)
    }
}

fn parse_stream_fd(token: &str, line: usize) -> Result<u8, AsmError> {
    if token.eq_ignore_ascii_case("stdout") || token == "1" {
        Ok(1)
    } else if token.eq_ignore_ascii_case("stderr") || token == "2" {
        Ok(2)
    } else {
        Err(AsmError::Syntax {
            line,
            msg: format!("invalid stream descriptor `{token}` (only stdout=1, stderr=2 allowed)"),
        })
    }
}

fn no_operands(
    instruction: Instruction,
    operands: &[&str],
    name: &str,
    line: usize,
) -> Result<Instruction, AsmError> {
    if operands.is_empty() {
        Ok(instruction)
    } else {
        Err(AsmError::Syntax {
            line,
            msg: format!("{name} takes no operands"),
        })
    }
}

fn one_register(operands: &[&str], name: &str, line: usize) -> Result<u8, AsmError> {
    let &[r] = operands else {
        return Err(AsmError::Syntax {
            line,
            msg: format!("expected {name} <register>"),
        });
    };
    parse_register(r, line)
}

fn one_count(operands: &[&str], name: &str, line: usize) -> Result<u32, AsmError> {
    let &[n] = operands else {
        return Err(AsmError::Syntax {
            line,
            msg: format!("expected {name} <count>"),
        });
    };
    Ok(parse_int(n, line)? as u32)
}

fn binary(
    build: fn(u8, u8) -> Instruction,
    operands: &[&str],
    name: &str,
    line: usize,
) -> Result<Instruction, AsmError> {
    let &[a, b] = operands else {
        return Err(AsmError::Syntax {
            line,
            msg: format!("expected {name} <register>, <register>"),
        });
    };
    Ok(build(parse_register(a, line)?, parse_register(b, line)?))
}

fn branch_target(
    operands: &[&str],
    name: &str,
    line: usize,
    resolver: &dyn Resolver,
) -> Result<u32, AsmError> {
    let &[target] = operands else {
        return Err(AsmError::Syntax {
            line,
            msg: format!("expected {name} <label>"),
        });
    };
    resolver.label(target.strip_prefix('.').unwrap_or(target), line)
}

fn indexed(
    imm: fn(u8, u32) -> Instruction,
    reg: fn(u8, u8) -> Instruction,
    operands: &[&str],
    name: &str,
    line: usize,
) -> Result<Instruction, AsmError> {
    let &[r, index] = operands else {
        return Err(AsmError::Syntax {
            line,
            msg: format!("expected {name} <register>, <index|register>"),
        });
    };
    let r = parse_register(r, line)?;
    if is_register(index) {
        Ok(reg(r, parse_register(index, line)?))
    } else {
        Ok(imm(r, parse_int(index, line)? as u32))
    }
}

fn data_ref(
    build: fn(u8, u32) -> Instruction,
    operands: &[&str],
    name: &str,
    line: usize,
    resolver: &dyn Resolver,
) -> Result<Instruction, AsmError> {
    // the register and the $name are accepted in either order
    let &[a, b] = operands else {
        return Err(AsmError::Syntax {
            line,
            msg: format!("expected {name} <register>, $<name>"),
        });
    };
    let (entry, register) = if let Some(entry) = a.strip_prefix('$') {
        (entry, b)
    } else if let Some(entry) = b.strip_prefix('$') {
        (entry, a)
    } else {
        return Err(AsmError::Syntax {
            line,
            msg: format!("{name} needs a $<name> operand"),
        });
    };

    Ok(build(
        parse_register(register, line)?,
        resolver.data_offset(entry, line)?,
    ))
}
