//! Log destinations: where a [`FormattedEvent`] ends up.
//!
//! A destination never fails outward. Write errors are reported through
//! [`crate::obs`] and the line is dropped.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use runlog_state::Level;

use crate::format::{FormatMode, FormattedEvent};
use crate::obs;

/// Anything the [`Logger`](crate::Logger) fans events out to.
pub trait Destination: Send + Sync {
    fn name(&self) -> &str;

    /// Events below this level are not passed to [`Destination::emit`].
    fn min_level(&self) -> Level;

    fn emit(&self, event: &FormattedEvent);
}

/// Writes plain-formatted lines to stdout or an injected writer.
pub struct ConsoleDestination {
    level: Level,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleDestination {
    pub fn stdout(level: Level) -> Self {
        Self::with_writer(level, io::stdout())
    }

    pub fn with_writer(level: Level, writer: impl Write + Send + 'static) -> Self {
        Self {
            level,
            writer: Mutex::new(Box::new(writer)),
        }
    }
}

impl Destination for ConsoleDestination {
    fn name(&self) -> &str {
        "console"
    }

    fn min_level(&self) -> Level {
        self.level
    }

    fn emit(&self, event: &FormattedEvent) {
        let line = event.render(FormatMode::Plain);
        let Ok(mut writer) = self.writer.lock() else {
            obs::emit_destination_fault(self.name(), &"writer lock poisoned");
            return;
        };
        if let Err(e) = writeln!(writer, "{line}").and_then(|_| writer.flush()) {
            obs::emit_destination_fault(self.name(), &e);
        }
    }
}

/// In-memory writer whose contents can be read back; cloning shares the buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self
            .inner
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "buffer lock poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SourceLocation;
    use crate::format::{RawEvent, RecordFormatter};

    #[test]
    fn console_writes_one_plain_line_per_event() {
        let buffer = SharedBuffer::new();
        let console = ConsoleDestination::with_writer(Level::Debug, buffer.clone());
        let event = RecordFormatter::default().format(RawEvent::new(
            Level::Info,
            "hello",
            SourceLocation::new("src/a.rs", 1, "app::a", Some("main")),
        ));

        console.emit(&event);
        console.emit(&event);

        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("INFO a - main: hello"));
        assert_eq!(lines[0], lines[1]);
    }
}
