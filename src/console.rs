//! Console log sink
//!
//! Transport diagnostics go through the `log` facade. This module routes
//! them to the kernel console: the embedding kernel installs a write hook
//! for its UART or framebuffer, and the logger formats each record onto it.
//! Under test the console captures output in a buffer instead.

use core::fmt::{self, Write};
use spin::Mutex;

/// Output hook installed by the embedding kernel
pub type ConsoleWriter = fn(&str);

/// Console writer interface
pub struct Console {
    writer: Option<ConsoleWriter>,
    #[cfg(test)]
    buffer: heapless::String<4096>,
}

impl Console {
    /// Create a console with no output attached
    pub const fn new() -> Self {
        Console {
            writer: None,
            #[cfg(test)]
            buffer: heapless::String::new(),
        }
    }

    /// Write a string to the console
    pub fn write_str(&mut self, s: &str) {
        #[cfg(test)]
        {
            if self.buffer.push_str(s).is_err() {
                self.buffer.clear();
                let _ = self.buffer.push_str(s);
            }
        }

        if let Some(writer) = self.writer {
            writer(s);
        }
    }
}

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Console::write_str(self, s);
        Ok(())
    }
}

/// Global console instance
static CONSOLE: Mutex<Console> = Mutex::new(Console::new());

/// Attach the kernel's output hook
pub fn init(writer: ConsoleWriter) {
    CONSOLE.lock().writer = Some(writer);
}

/// Print formatted text to the console
pub fn print(args: fmt::Arguments) {
    let _ = CONSOLE.lock().write_fmt(args);
}

/// Format one log record as a console line
fn write_record(out: &mut impl Write, record: &log::Record) -> fmt::Result {
    writeln!(out, "[{:<5}] {}: {}", record.level(), record.target(), record.args())
}

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let _ = write_record(&mut *CONSOLE.lock(), record);
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Install the console as the `log` backend
pub fn init_logger(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
