//! Test helpers.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::interpreter::Console;

/// A clonable in-memory sink for capturing VM output in tests.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Bytes written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().expect("buffer poisoned").clone()
    }

    /// Bytes written so far, as lossy UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("buffer poisoned").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A console over an in-memory input plus captured stdout and stderr.
pub fn capture_console(input: &str) -> (Console, SharedBuffer, SharedBuffer) {
    let out = SharedBuffer::default();
    let err = SharedBuffer::default();
    let console = Console::new(
        io::Cursor::new(input.as_bytes().to_vec()),
        out.clone(),
        err.clone(),
    );
    (console, out, err)
}
