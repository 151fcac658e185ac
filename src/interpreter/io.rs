//! Console, data-table and file-descriptor I/O.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};

use bbx_asm::{FileId, PanicReason, RegisterId, Word};
use rand::rngs::OsRng;
use rand::Rng;

use super::Interpreter;
use crate::consts::STACK_TAG;
use crate::error::RuntimeError;
use crate::platform::Platform;

/// User-visible streams of the VM.
///
/// Defaults to the process streams; tests swap in captured buffers.
/// Every user-visible write opcode flushes its stream before the next
/// instruction runs.
pub struct Console {
    input: Box<dyn BufRead>,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Console {
    /// Build a console over arbitrary streams.
    pub fn new(
        input: impl BufRead + 'static,
        out: impl Write + 'static,
        err: impl Write + 'static,
    ) -> Self {
        Self {
            input: Box::new(input),
            out: Box::new(out),
            err: Box::new(err),
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout(), io::stderr())
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

/// A 32-bit string reference: either an offset into the data table or,
/// with the top bit set, an index into the value stack. Serialized to
/// the tagged form only at the register boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StrRef {
    Data(u32),
    Stack(u32),
}

impl StrRef {
    pub(crate) fn from_tagged(word: Word) -> Self {
        let raw = word as u32;
        if raw & STACK_TAG != 0 {
            Self::Stack(raw & !STACK_TAG)
        } else {
            Self::Data(raw)
        }
    }

    pub(crate) fn to_tagged(self) -> Word {
        match self {
            Self::Data(offset) => Word::from(offset),
            Self::Stack(index) => Word::from(index | STACK_TAG),
        }
    }
}

impl<P> Interpreter<P> {
    /// `WRITE`: inline string to stdout or stderr.
    pub(crate) fn write_str(&mut self, fd: u8, bytes: &[u8]) -> Result<(), RuntimeError> {
        let stream: &mut dyn Write = match fd {
            1 => self.console.out.as_mut(),
            2 => self.console.err.as_mut(),
            _ => return Err(PanicReason::InvalidWriteDescriptor.into()),
        };
        stream.write_all(bytes)?;
        stream.flush()?;
        Ok(())
    }

    pub(crate) fn print_char(&mut self, c: u8) -> Result<(), RuntimeError> {
        self.console.out.write_all(&[c])?;
        self.console.out.flush()?;
        Ok(())
    }

    /// ANSI clear plus cursor home.
    pub(crate) fn clear_screen(&mut self) -> Result<(), RuntimeError> {
        self.console.out.write_all(b"\x1b[2J\x1b[1;1H")?;
        self.console.out.flush()?;
        Ok(())
    }

    pub(crate) fn print_reg(&mut self, r: RegisterId) -> Result<(), RuntimeError> {
        write!(self.console.out, "{}", self.reg(r))?;
        self.console.out.flush()?;
        Ok(())
    }

    pub(crate) fn print_stack_size(&mut self) -> Result<(), RuntimeError> {
        writeln!(self.console.out, "{}", self.stack.sp())?;
        self.console.out.flush()?;
        Ok(())
    }

    /// `PRINTSTR`: zero-terminated bytes from the data table or from
    /// the value stack, selected by the register's tag bit.
    pub(crate) fn print_str(&mut self, r: RegisterId) -> Result<(), RuntimeError> {
        match StrRef::from_tagged(self.reg(r)) {
            StrRef::Data(offset) => {
                let bytes = self.data_str(offset)?.to_vec();
                self.console.out.write_all(&bytes)?;
            }
            StrRef::Stack(index) => {
                let mut at = index as usize;
                loop {
                    let cell = self.stack.load(at)?;
                    if cell == 0 {
                        break;
                    }
                    self.console.out.write_all(&[cell as u8])?;
                    at += 1;
                }
            }
        }
        self.console.out.flush()?;
        Ok(())
    }

    /// Zero-terminated bytes at a data-table offset; a missing
    /// terminator stops at the end of the region.
    pub(crate) fn data_str(&self, offset: u32) -> Result<&[u8], PanicReason> {
        let region = self.data_region();
        let tail = region
            .get(offset as usize..)
            .ok_or(PanicReason::DataOffsetOutOfBounds)?;
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        Ok(&tail[..end])
    }

    /// Little-endian integer of `width` bytes at a data-table offset,
    /// zero-extended except for the full 64-bit width.
    pub(crate) fn data_int(&self, offset: u32, width: usize) -> Result<Word, PanicReason> {
        let region = self.data_region();
        let start = offset as usize;
        let bytes = region
            .get(start..start + width)
            .ok_or(PanicReason::DataOffsetOutOfBounds)?;

        let mut raw = [0u8; 8];
        raw[..width].copy_from_slice(bytes);
        Ok(Word::from_le_bytes(raw))
    }

    /// `READSTR`: push a line of input cell by cell plus a zero
    /// terminator, leaving a tagged stack reference in `r`.
    pub(crate) fn read_str(&mut self, r: RegisterId) -> Result<(), RuntimeError> {
        let start = self.stack.sp() as u32;

        let mut line = String::new();
        self.console.input.read_line(&mut line)?;
        for &b in line.trim_end_matches(['\n', '\r']).as_bytes() {
            self.stack.push(Word::from(b));
        }
        self.stack.push(0);

        self.set_reg(r, StrRef::Stack(start).to_tagged());
        Ok(())
    }

    /// `READCHAR`: one byte of input, -1 at end of input.
    pub(crate) fn read_char(&mut self, r: RegisterId) -> Result<(), RuntimeError> {
        let mut byte = [0u8; 1];
        let value = match self.console.input.read(&mut byte)? {
            0 => -1,
            _ => Word::from(byte[0]),
        };
        self.set_reg(r, value);
        Ok(())
    }

    /// `READ`: a decimal integer line; unparsable input reads as 0.
    pub(crate) fn read_int(&mut self, r: RegisterId) -> Result<(), RuntimeError> {
        let mut line = String::new();
        self.console.input.read_line(&mut line)?;
        self.set_reg(r, line.trim().parse().unwrap_or(0));
        Ok(())
    }

    /// `RAND`: uniform in `[min, max]` from the OS entropy source. A
    /// full-width span returns the raw 64 bits; reversed bounds swap.
    pub(crate) fn rand(&mut self, r: RegisterId, min: Word, max: Word) {
        let (min, max) = if min > max { (max, min) } else { (min, max) };
        let value = if min == Word::MIN && max == Word::MAX {
            OsRng.gen()
        } else {
            OsRng.gen_range(min..=max)
        };
        self.set_reg(r, value);
    }

    pub(crate) fn fopen(&mut self, mode: u8, fd: FileId, name: &[u8]) -> Result<(), RuntimeError> {
        if name.is_empty() {
            return Err(PanicReason::InvalidFilenameLength.into());
        }
        let path = String::from_utf8_lossy(name).into_owned();

        let mut options = OpenOptions::new();
        match mode {
            0 => options.read(true),
            1 => options.write(true).create(true).truncate(true),
            _ => options.append(true).create(true),
        };

        // replacing an occupied slot drops, and therefore closes, the
        // previous handle
        self.files[usize::from(fd)] = Some(options.open(path)?);
        Ok(())
    }

    pub(crate) fn fclose(&mut self, fd: FileId) -> Result<(), RuntimeError> {
        self.files[usize::from(fd)]
            .take()
            .ok_or(PanicReason::FileNotOpen)?;
        Ok(())
    }

    pub(crate) fn fread(&mut self, fd: FileId, r: RegisterId) -> Result<(), RuntimeError> {
        let file = self.file_mut(fd)?;
        let mut byte = [0u8; 1];
        let value = match file.read(&mut byte)? {
            0 => -1,
            _ => Word::from(byte[0]),
        };
        self.set_reg(r, value);
        Ok(())
    }

    pub(crate) fn fwrite(&mut self, fd: FileId, byte: u8) -> Result<(), RuntimeError> {
        let file = self.file_mut(fd)?;
        file.write_all(&[byte])?;
        file.flush()?;
        Ok(())
    }

    pub(crate) fn fseek(&mut self, fd: FileId, offset: u64) -> Result<(), RuntimeError> {
        self.file_mut(fd)?.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn file_mut(&mut self, fd: FileId) -> Result<&mut File, PanicReason> {
        self.files[usize::from(fd)]
            .as_mut()
            .ok_or(PanicReason::FileNotOpen)
    }
}

impl<P> Interpreter<P>
where
    P: Platform,
{
    /// `GETKEY`: non-blocking keypress, -1 when no key is pending.
    pub(crate) fn getkey(&mut self, r: RegisterId) -> Result<(), RuntimeError> {
        let value = match self.platform.poll_key()? {
            Some(key) => Word::from(key),
            None => -1,
        };
        self.set_reg(r, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_string_references_round_trip() {
        for reference in [StrRef::Data(0), StrRef::Data(17), StrRef::Stack(0), StrRef::Stack(42)] {
            assert_eq!(StrRef::from_tagged(reference.to_tagged()), reference);
        }
    }

    #[test]
    fn stack_tag_is_the_top_bit() {
        assert_eq!(StrRef::Stack(5).to_tagged(), Word::from(0x8000_0005u32));
        assert_eq!(StrRef::from_tagged(3), StrRef::Data(3));
    }
}
