//! Windows console handling.

use std::io;

use windows_sys::Win32::Foundation::INVALID_HANDLE_VALUE;
use windows_sys::Win32::System::Console::{
    GetNumberOfConsoleInputEvents, GetStdHandle, ReadConsoleInputW, INPUT_RECORD, KEY_EVENT,
    STD_INPUT_HANDLE,
};

use super::Platform;

/// Platform implementation over the Win32 console input queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsPlatform;

impl Platform for WindowsPlatform {
    /// Drain pending console input records, returning the first
    /// key-down character, if any.
    fn poll_key(&mut self) -> io::Result<Option<u8>> {
        // Safety: Win32 console calls on the process stdin handle
        unsafe {
            let handle = GetStdHandle(STD_INPUT_HANDLE);
            if handle == INVALID_HANDLE_VALUE {
                return Err(io::Error::last_os_error());
            }

            loop {
                let mut pending = 0u32;
                if GetNumberOfConsoleInputEvents(handle, &mut pending) == 0 {
                    return Err(io::Error::last_os_error());
                }
                if pending == 0 {
                    return Ok(None);
                }

                let mut record: INPUT_RECORD = std::mem::zeroed();
                let mut read = 0u32;
                if ReadConsoleInputW(handle, &mut record, 1, &mut read) == 0 {
                    return Err(io::Error::last_os_error());
                }
                if read == 0 {
                    return Ok(None);
                }

                if record.EventType == KEY_EVENT {
                    let key = record.Event.KeyEvent;
                    if key.bKeyDown != 0 {
                        let c = key.uChar.UnicodeChar;
                        if c != 0 {
                            return Ok(Some(c as u8));
                        }
                    }
                }
            }
        }
    }
}
