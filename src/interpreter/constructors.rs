//! Exposed constructors API for the [`Interpreter`]

use super::{Console, Interpreter, ValueStack};
use crate::consts::*;
use crate::platform::{OsPlatform, Platform};

impl<P> Interpreter<P>
where
    P: Platform,
{
    /// Create a new interpreter instance over a platform implementation.
    pub fn with_platform(platform: P) -> Self {
        Self {
            registers: [0; REGISTERS],
            program: Vec::new(),
            code_base: 0,
            pc: 0,
            stack: ValueStack::default(),
            frames: Vec::new(),
            files: Default::default(),
            console: Console::default(),
            platform,
        }
    }

    /// Replace the console streams, e.g. to capture output in tests.
    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }
}

impl Interpreter<OsPlatform> {
    /// Create a new interpreter over the native platform.
    pub fn new() -> Self {
        Self::with_platform(OsPlatform::default())
    }
}

impl Default for Interpreter<OsPlatform> {
    fn default() -> Self {
        Self::new()
    }
}
