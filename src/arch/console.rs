//! Diagnostic console for setup-time logging.
//!
//! Output goes to whatever [`ConsoleSink`] the application installs; with no
//! sink installed, messages are dropped. The tick and switch handlers never
//! print.

use core::fmt::{self, Write};
use spin::Once;

/// Destination for console output.
pub trait ConsoleSink: Sync {
    /// Write a string fragment.
    fn write_str(&self, s: &str);
}

static SINK: Once<&'static dyn ConsoleSink> = Once::new();

/// Install the console sink. Only the first call wins; returns whether this
/// call installed `sink`.
pub fn set_sink(sink: &'static dyn ConsoleSink) -> bool {
    let mut installed = false;
    SINK.call_once(|| {
        installed = true;
        sink
    });
    installed
}

/// Whether a sink has been installed.
pub fn has_sink() -> bool {
    SINK.get().is_some()
}

/// `fmt::Write` adapter over the installed sink, for use with `write!`.
pub struct ConsoleWriter;

impl Write for ConsoleWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if let Some(sink) = SINK.get() {
            sink.write_str(s);
        }
        Ok(())
    }
}

/// A stream opened on first use and kept open afterwards.
#[cfg(any(test, all(feature = "semihosting", target_arch = "arm", target_os = "none")))]
pub(crate) struct LazyStream<S> {
    stream: spin::Mutex<Option<S>>,
}

#[cfg(any(test, all(feature = "semihosting", target_arch = "arm", target_os = "none")))]
impl<S> LazyStream<S> {
    pub(crate) const fn new() -> Self {
        Self {
            stream: spin::Mutex::new(None),
        }
    }

    /// Run `write` on the stream, opening it with `open` first if needed.
    /// A failed open is retried on the next call.
    pub(crate) fn with(&self, open: impl FnOnce() -> Option<S>, write: impl FnOnce(&mut S)) {
        let mut slot = self.stream.lock();
        if slot.is_none() {
            *slot = open();
        }
        if let Some(stream) = slot.as_mut() {
            write(stream);
        }
    }
}

/// Sink that forwards to the host debugger via ARM semihosting.
///
/// Semihosting halts the core while the host services the call; keep it for
/// debugging and QEMU. The host stdout handle is opened once, on the first
/// write.
#[cfg(all(feature = "semihosting", target_arch = "arm", target_os = "none"))]
pub struct SemihostingSink {
    stdout: LazyStream<cortex_m_semihosting::hio::HostStream>,
}

#[cfg(all(feature = "semihosting", target_arch = "arm", target_os = "none"))]
impl SemihostingSink {
    pub const fn new() -> Self {
        Self {
            stdout: LazyStream::new(),
        }
    }
}

#[cfg(all(feature = "semihosting", target_arch = "arm", target_os = "none"))]
impl Default for SemihostingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(feature = "semihosting", target_arch = "arm", target_os = "none"))]
impl ConsoleSink for SemihostingSink {
    fn write_str(&self, s: &str) {
        self.stdout.with(
            || cortex_m_semihosting::hio::hstdout().ok(),
            |out| {
                let _ = out.write_all(s.as_bytes());
            },
        );
    }
}

/// Print a formatted string to the console.
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = write!($crate::arch::console::ConsoleWriter, $($arg)*);
    }};
}

/// Print a formatted string to the console with a newline.
#[macro_export]
macro_rules! kprintln {
    () => {
        $crate::kprint!("\n")
    };
    ($($arg:tt)*) => {{
        $crate::kprint!($($arg)*);
        $crate::kprint!("\n");
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use core::cell::Cell;

    #[test]
    fn test_lazy_stream_opens_once() {
        let stream: LazyStream<Vec<u8>> = LazyStream::new();
        let opens = Cell::new(0);
        let open = || {
            opens.set(opens.get() + 1);
            Some(Vec::new())
        };

        for fragment in ["[sched] ", "thread 0", "\n"] {
            stream.with(open, |out| out.extend_from_slice(fragment.as_bytes()));
        }

        assert_eq!(opens.get(), 1);
        stream.with(|| None, |out| assert_eq!(out.as_slice(), b"[sched] thread 0\n"));
    }

    #[test]
    fn test_lazy_stream_retries_failed_open() {
        let stream: LazyStream<Vec<u8>> = LazyStream::new();
        let mut writes = 0;

        stream.with(|| None, |_| writes += 1);
        assert_eq!(writes, 0);

        stream.with(|| Some(Vec::new()), |_| writes += 1);
        assert_eq!(writes, 1);
    }
}
