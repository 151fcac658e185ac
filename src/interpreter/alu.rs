//! Arithmetic and comparison.

use bbx_asm::{PanicReason, RegisterId, Word};

use super::Interpreter;
use crate::consts::REG_FLAGS;

impl<P> Interpreter<P> {
    pub(crate) fn alu_binary(&mut self, rd: RegisterId, rs: RegisterId, f: fn(Word, Word) -> Word) {
        let result = f(self.reg(rd), self.reg(rs));
        self.set_reg(rd, result);
    }

    /// Division-family operation; the guard rejects a zero divisor
    /// before `f` runs.
    pub(crate) fn alu_checked(
        &mut self,
        rd: RegisterId,
        rs: RegisterId,
        f: fn(Word, Word) -> Word,
    ) -> Result<(), PanicReason> {
        let divisor = self.reg(rs);
        if divisor == 0 {
            return Err(PanicReason::DivisionByZero);
        }
        self.set_reg(rd, f(self.reg(rd), divisor));
        Ok(())
    }

    /// `CMP ra, rb` stores 1 in the flags register when `ra < rb`
    /// (i.e. `r[rb] - r[ra]` is strictly positive) and 0 otherwise.
    /// The conditional jumps all key off this single cell.
    pub(crate) fn cmp(&mut self, ra: RegisterId, rb: RegisterId) {
        let flag = Word::from(self.reg(ra) < self.reg(rb));
        self.registers[REG_FLAGS] = flag;
    }
}
