//! Container loading.

use std::fs;
use std::path::Path;

use bbx_asm::ContainerHeader;
use tracing::debug;

use super::Interpreter;
use crate::error::InterpreterError;

impl<P> Interpreter<P> {
    /// Validate and take ownership of a container, positioning the
    /// program counter at the first code byte.
    pub fn load(&mut self, container: Vec<u8>) -> Result<(), InterpreterError> {
        let header = ContainerHeader::parse(&container)?;

        self.code_base = header.code_base();
        self.pc = self.code_base;
        self.program = container;

        debug!(
            data_count = header.data_count,
            data_size = header.data_size,
            code_base = self.code_base,
            "container loaded",
        );

        Ok(())
    }

    /// Read a container from disk and [`load`](Self::load) it.
    pub fn load_file(&mut self, path: &Path) -> Result<(), InterpreterError> {
        let container = fs::read(path)?;
        self.load(container)
    }
}
