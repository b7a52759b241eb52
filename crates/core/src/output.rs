//! Host stdout with per-thread redirection.
//!
//! Plugin code writes through [`stdout()`] (or [`host_println!`]) instead of
//! the process stdout. Each thread keeps a stack of redirect targets:
//! - empty stack: bytes go to the real process stdout
//! - [`suppress()`] pushes a discard sink
//! - [`capture()`] pushes an in-memory buffer for the duration of a closure
//!
//! The innermost target wins. Targets are popped by RAII guards, so a panic
//! or an early `?` return can never leave a redirect behind, and one thread's
//! redirect is invisible to every other thread.
//!
//! [`host_println!`]: crate::host_println

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::marker::PhantomData;

enum Sink {
    Discard,
    Buffer(Vec<u8>),
}

thread_local! {
    static SINKS: RefCell<Vec<Sink>> = const { RefCell::new(Vec::new()) };
}

/// Writer for the host stdout of the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct HostStdout;

/// Handle to the current thread's host stdout
pub fn stdout() -> HostStdout {
    HostStdout
}

impl Write for HostStdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let redirected = SINKS.with(|sinks| match sinks.borrow_mut().last_mut() {
            Some(Sink::Discard) => true,
            Some(Sink::Buffer(bytes)) => {
                bytes.extend_from_slice(buf);
                true
            }
            None => false,
        });

        if redirected {
            Ok(buf.len())
        } else {
            io::stdout().write(buf)
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if SINKS.with(|sinks| sinks.borrow().is_empty()) {
            io::stdout().flush()
        } else {
            Ok(())
        }
    }
}

/// Write one formatted line to the host stdout, ignoring write errors.
#[doc(hidden)]
pub fn write_line(args: fmt::Arguments<'_>) {
    let mut out = stdout();
    let _ = out.write_fmt(args);
    let _ = out.write_all(b"\n");
}

/// Write formatted text to the host stdout, ignoring write errors.
#[doc(hidden)]
pub fn write_fmt(args: fmt::Arguments<'_>) {
    let _ = stdout().write_fmt(args);
}

/// `println!` for plugin code: goes through the redirectable host stdout.
#[macro_export]
macro_rules! host_println {
    () => {
        $crate::output::write_line(::std::format_args!(""))
    };
    ($($arg:tt)*) => {
        $crate::output::write_line(::std::format_args!($($arg)*))
    };
}

/// `print!` for plugin code: goes through the redirectable host stdout.
#[macro_export]
macro_rules! host_print {
    ($($arg:tt)*) => {
        $crate::output::write_fmt(::std::format_args!($($arg)*))
    };
}

/// Active discard scope. Dropping it releases the scope.
///
/// Not `Send`: the scope belongs to the thread that opened it.
#[must_use = "output is only suppressed while the guard is alive"]
pub struct SuppressGuard {
    _not_send: PhantomData<*const ()>,
}

/// Discard host stdout writes on this thread until the guard is dropped.
pub fn suppress() -> SuppressGuard {
    SINKS.with(|sinks| sinks.borrow_mut().push(Sink::Discard));
    SuppressGuard {
        _not_send: PhantomData,
    }
}

impl Drop for SuppressGuard {
    fn drop(&mut self) {
        SINKS.with(|sinks| {
            sinks.borrow_mut().pop();
        });
    }
}

/// Whether host stdout writes on this thread are currently discarded
pub fn is_suppressed() -> bool {
    SINKS.with(|sinks| matches!(sinks.borrow().last(), Some(Sink::Discard)))
}

struct CaptureGuard {
    finished: bool,
    _not_send: PhantomData<*const ()>,
}

impl CaptureGuard {
    fn push() -> Self {
        SINKS.with(|sinks| sinks.borrow_mut().push(Sink::Buffer(Vec::new())));
        Self {
            finished: false,
            _not_send: PhantomData,
        }
    }

    fn finish(mut self) -> Vec<u8> {
        self.finished = true;
        SINKS.with(|sinks| match sinks.borrow_mut().pop() {
            Some(Sink::Buffer(bytes)) => bytes,
            _ => Vec::new(),
        })
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if !self.finished {
            SINKS.with(|sinks| {
                sinks.borrow_mut().pop();
            });
        }
    }
}

/// Run `f` and collect everything it wrote to this thread's host stdout.
///
/// Writes made inside a nested [`suppress()`] scope are not collected.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, String) {
    let guard = CaptureGuard::push();
    let result = f();
    let bytes = guard.finish();
    (result, String::from_utf8_lossy(&bytes).into_owned())
}
