//! Host platform abstraction.
//!
//! The few opcodes that need more than the standard library — the
//! non-blocking, non-echoing `GETKEY` poll — go through this trait, with
//! one implementation per supported platform. Everything else
//! (`SLEEP`, entropy via the OS RNG, stream I/O) is portable and lives
//! with the interpreter.

use std::io;
use std::time::Duration;

#[cfg(unix)]
mod posix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use posix::PosixPlatform;
#[cfg(windows)]
pub use windows::WindowsPlatform;

/// Platform selected for the current target.
#[cfg(unix)]
pub type OsPlatform = PosixPlatform;

/// Platform selected for the current target.
#[cfg(windows)]
pub type OsPlatform = WindowsPlatform;

/// Host services the interpreter cannot provide portably.
pub trait Platform {
    /// Poll for a pending keypress without blocking and without echo.
    ///
    /// Returns `None` when no key is available.
    fn poll_key(&mut self) -> io::Result<Option<u8>>;

    /// Block the executing thread for the given duration.
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
