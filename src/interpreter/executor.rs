//! Fetch/decode/execute loop.

use std::time::Duration;

use bbx_asm::{Instruction, Word};
use tracing::trace;

use super::Interpreter;
use crate::error::{InterpreterError, RuntimeError};
use crate::platform::Platform;
use crate::state::{ExecuteState, ProgramState};

impl<P> Interpreter<P>
where
    P: Platform,
{
    /// Run the loaded program to completion.
    ///
    /// Returns the program's halt state; running off the end of the
    /// container halts with exit code 0.
    pub fn run(&mut self) -> Result<ProgramState, InterpreterError> {
        loop {
            if self.pc >= self.program.len() {
                return Ok(ProgramState::Halt(0));
            }

            match self.execute()? {
                ExecuteState::Proceed => (),
                ExecuteState::Halted(code) => return Ok(ProgramState::Halt(code)),
            }
        }
    }

    /// Fetch, decode and execute a single instruction.
    pub fn execute(&mut self) -> Result<ExecuteState, InterpreterError> {
        let pc = self.pc;
        let (instruction, next) =
            Instruction::decode(&self.program, pc).map_err(|reason| InterpreterError::Panic { reason, pc })?;

        trace!(pc, opcode = %instruction.opcode(), "execute");

        let opcode = instruction.opcode();
        self.pc = next;

        self.instruction(instruction)
            .map_err(|e| InterpreterError::from_runtime(e, opcode, pc))
    }

    fn instruction(&mut self, instruction: Instruction) -> Result<ExecuteState, RuntimeError> {
        use Instruction::*;

        match instruction {
            Halt => return Ok(ExecuteState::Halted(0)),
            HaltCode(code) => return Ok(ExecuteState::Halted(code)),

            Print(c) => self.print_char(c)?,
            Newline => self.print_char(b'\n')?,
            Clrscr => self.clear_screen()?,
            PrintStackSize => self.print_stack_size()?,
            PrintReg(r) => self.print_reg(r)?,
            PrintStr(r) => self.print_str(r)?,
            Write { fd, bytes } => self.write_str(fd, &bytes)?,

            // loop markers for the higher-level front-end
            Continue | Break => (),

            MovReg(rd, rs) => {
                let value = self.reg(rs);
                self.set_reg(rd, value);
            }
            MovImm(rd, imm) => self.set_reg(rd, Word::from(imm)),
            PushReg(rs) => {
                let value = self.reg(rs);
                self.stack.push(value);
            }
            PushImm(imm) => self.stack.push(Word::from(imm)),
            Pop(r) => {
                let value = self.stack.pop()?;
                self.set_reg(r, value);
            }

            Add(rd, rs) => self.alu_binary(rd, rs, Word::wrapping_add),
            Sub(rd, rs) => self.alu_binary(rd, rs, Word::wrapping_sub),
            Mul(rd, rs) => self.alu_binary(rd, rs, Word::wrapping_mul),
            Div(rd, rs) => self.alu_checked(rd, rs, Word::wrapping_div)?,
            Mod(rd, rs) => self.alu_checked(rd, rs, Word::wrapping_rem)?,
            And(rd, rs) => self.alu_binary(rd, rs, |a, b| a & b),
            Or(rd, rs) => self.alu_binary(rd, rs, |a, b| a | b),
            Xor(rd, rs) => self.alu_binary(rd, rs, |a, b| a ^ b),
            Not(r) => {
                let value = !self.reg(r);
                self.set_reg(r, value);
            }
            Inc(r) => {
                let value = self.reg(r).wrapping_add(1);
                self.set_reg(r, value);
            }
            Dec(r) => {
                let value = self.reg(r).wrapping_sub(1);
                self.set_reg(r, value);
            }
            Cmp(ra, rb) => self.cmp(ra, rb),

            Jmp(addr) => self.jump(addr)?,
            Je(addr) => self.branch(addr, false)?,
            Jne(addr) => self.branch(addr, true)?,
            Jl(addr) => self.branch(addr, true)?,
            Jge(addr) => self.branch(addr, false)?,
            Jb(addr) => self.branch(addr, true)?,
            Jae(addr) => self.branch(addr, false)?,
            Call { addr, frame } => self.call(addr, frame)?,
            Ret => self.ret()?,

            Alloc(n) => self.stack.alloc(n as usize),
            Grow(n) => self.stack.grow(n as usize),
            Resize(n) => self.stack.resize(n as usize),
            Free(n) => self.stack.free(n as usize)?,

            Load(r, index) => {
                let value = self.stack.load(index as usize)?;
                self.set_reg(r, value);
            }
            LoadReg(r, rk) => {
                let index = self.reg(rk) as usize;
                let value = self.stack.load(index)?;
                self.set_reg(r, value);
            }
            Store(r, index) => {
                let value = self.reg(r);
                self.stack.store(index as usize, value)?;
            }
            StoreReg(r, rk) => {
                let index = self.reg(rk) as usize;
                let value = self.reg(r);
                self.stack.store(index, value)?;
            }
            LoadVar(r, slot) => {
                let index = self.slot_index(slot as usize)?;
                let value = self.stack.load(index)?;
                self.set_reg(r, value);
            }
            LoadVarReg(r, rk) => {
                let index = self.slot_index(self.reg(rk) as usize)?;
                let value = self.stack.load(index)?;
                self.set_reg(r, value);
            }
            StoreVar(r, slot) => {
                let index = self.slot_index(slot as usize)?;
                let value = self.reg(r);
                self.stack.store(index, value)?;
            }
            StoreVarReg(r, rk) => {
                let index = self.slot_index(self.reg(rk) as usize)?;
                let value = self.reg(r);
                self.stack.store(index, value)?;
            }

            LoadStr(r, offset) => self.set_reg(r, Word::from(offset)),
            LoadByte(r, offset) => {
                let value = self.data_int(offset, 1)?;
                self.set_reg(r, value);
            }
            LoadWord(r, offset) => {
                let value = self.data_int(offset, 2)?;
                self.set_reg(r, value);
            }
            LoadDword(r, offset) => {
                let value = self.data_int(offset, 4)?;
                self.set_reg(r, value);
            }
            LoadQword(r, offset) => {
                let value = self.data_int(offset, 8)?;
                self.set_reg(r, value);
            }

            ReadStr(r) => self.read_str(r)?,
            ReadChar(r) => self.read_char(r)?,
            Read(r) => self.read_int(r)?,
            GetKey(r) => self.getkey(r)?,
            Rand { r, min, max } => self.rand(r, min, max),
            Sleep(ms) => self.platform.sleep(Duration::from_millis(u64::from(ms))),

            Fopen { mode, fd, name } => self.fopen(mode, fd, &name)?,
            Fclose(fd) => self.fclose(fd)?,
            Fread(fd, r) => self.fread(fd, r)?,
            FwriteReg(fd, r) => {
                let byte = self.reg(r) as u8;
                self.fwrite(fd, byte)?;
            }
            FwriteImm(fd, value) => self.fwrite(fd, value as u8)?,
            FseekReg(fd, r) => {
                let offset = self.reg(r) as u64;
                self.fseek(fd, offset)?;
            }
            FseekImm(fd, offset) => self.fseek(fd, u64::from(offset))?,
        }

        Ok(ExecuteState::Proceed)
    }
}
