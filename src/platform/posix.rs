//! POSIX terminal handling.

use std::io;
use std::mem::MaybeUninit;

use super::Platform;

/// Platform implementation over termios and fcntl.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixPlatform;

impl Platform for PosixPlatform {
    /// Temporarily place stdin into non-canonical, non-echo,
    /// non-blocking mode, try to read one byte, then restore the
    /// original state.
    fn poll_key(&mut self) -> io::Result<Option<u8>> {
        let fd = libc::STDIN_FILENO;

        // Safety: plain C struct filled in by tcgetattr before use
        unsafe {
            let mut saved = MaybeUninit::<libc::termios>::uninit();
            if libc::tcgetattr(fd, saved.as_mut_ptr()) != 0 {
                return Err(io::Error::last_os_error());
            }
            let saved = saved.assume_init();

            let mut raw = saved;
            raw.c_lflag &= !(libc::ICANON | libc::ECHO);
            raw.c_cc[libc::VMIN] = 0;
            raw.c_cc[libc::VTIME] = 0;
            if libc::tcsetattr(fd, libc::TCSANOW, &raw) != 0 {
                return Err(io::Error::last_os_error());
            }

            let flags = libc::fcntl(fd, libc::F_GETFL);
            libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);

            let mut byte = 0u8;
            let n = libc::read(fd, &mut byte as *mut u8 as *mut libc::c_void, 1);

            libc::fcntl(fd, libc::F_SETFL, flags);
            libc::tcsetattr(fd, libc::TCSANOW, &saved);

            if n == 1 {
                Ok(Some(byte))
            } else {
                Ok(None)
            }
        }
    }
}
