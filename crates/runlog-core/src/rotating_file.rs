//! Size-bounded file destination.
//!
//! Lines are appended to `path`. Before a write that would push the file past
//! `max_bytes`, the file is rolled: `path.(n-1)` becomes `path.n`, ...,
//! `path` becomes `path.1`, and a fresh `path` is opened. With zero backups
//! the file is truncated instead. A `max_bytes` of zero disables rotation.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use runlog_state::Level;

use crate::destination::Destination;
use crate::error::LoggerError;
use crate::format::{FormatMode, FormattedEvent};
use crate::obs;

struct OpenFile {
    file: File,
    size: u64,
}

/// Appends plain-formatted lines to a file with bounded disk usage.
pub struct RotatingFileDestination {
    level: Level,
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
    state: Mutex<OpenFile>,
}

fn open_append(path: &Path) -> io::Result<OpenFile> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let size = file.metadata()?.len();
    Ok(OpenFile { file, size })
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

impl RotatingFileDestination {
    /// Open (creating parent folders) the file at `path`.
    pub fn open(
        path: impl Into<PathBuf>,
        level: Level,
        max_bytes: u64,
        backup_count: usize,
    ) -> Result<Self, LoggerError> {
        let path = path.into();
        let open_error = |source| LoggerError::OpenFile {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(open_error)?;
        }
        let state = open_append(&path).map_err(open_error)?;
        Ok(Self {
            level,
            path,
            max_bytes,
            backup_count,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rotate(&self, state: &mut OpenFile) -> io::Result<()> {
        state.file.flush()?;
        if self.backup_count > 0 {
            for index in (1..self.backup_count).rev() {
                let from = backup_path(&self.path, index);
                if from.exists() {
                    fs::rename(&from, backup_path(&self.path, index + 1))?;
                }
            }
            fs::rename(&self.path, backup_path(&self.path, 1))?;
            *state = open_append(&self.path)?;
        } else {
            state.file.set_len(0)?;
            state.size = 0;
        }
        obs::emit_file_rotated(&self.path.display().to_string(), self.backup_count);
        Ok(())
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "file lock poisoned"))?;
        let bytes = line.len() as u64 + 1;
        if self.max_bytes > 0 && state.size > 0 && state.size + bytes > self.max_bytes {
            self.rotate(&mut state)?;
        }
        writeln!(state.file, "{line}")?;
        state.size += bytes;
        Ok(())
    }
}

impl Destination for RotatingFileDestination {
    fn name(&self) -> &str {
        "file"
    }

    fn min_level(&self) -> Level {
        self.level
    }

    fn emit(&self, event: &FormattedEvent) {
        if let Err(e) = self.write_line(&event.render(FormatMode::Plain)) {
            obs::emit_destination_fault(self.name(), &e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SourceLocation;
    use crate::format::{RawEvent, RecordFormatter};

    fn event(message: &str) -> FormattedEvent {
        RecordFormatter::default().format(RawEvent::new(
            Level::Info,
            message,
            SourceLocation::new("src/a.rs", 1, "app::a", Some("main")),
        ))
    }

    fn line_len(message: &str) -> u64 {
        event(message).render(FormatMode::Plain).len() as u64 + 1
    }

    #[test]
    fn creates_missing_folder_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/logs/log.txt");
        let file = RotatingFileDestination::open(&path, Level::Info, 0, 1).unwrap();

        file.emit(&event("one"));
        file.emit(&event("two"));

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().last().unwrap().ends_with("two"));
    }

    #[test]
    fn rolls_over_and_keeps_bounded_backups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        // room for exactly one line per file
        let max = line_len("message-0") + 1;
        let file = RotatingFileDestination::open(&path, Level::Info, max, 2).unwrap();

        for i in 0..4 {
            file.emit(&event(&format!("message-{i}")));
        }

        let current = fs::read_to_string(&path).unwrap();
        let first_backup = fs::read_to_string(backup_path(&path, 1)).unwrap();
        let second_backup = fs::read_to_string(backup_path(&path, 2)).unwrap();

        assert!(current.trim_end().ends_with("message-3"));
        assert!(first_backup.trim_end().ends_with("message-2"));
        assert!(second_backup.trim_end().ends_with("message-1"));
        assert!(!backup_path(&path, 3).exists());
    }

    #[test]
    fn zero_backups_truncates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        let max = line_len("message-0") + 1;
        let file = RotatingFileDestination::open(&path, Level::Info, max, 0).unwrap();

        file.emit(&event("message-0"));
        file.emit(&event("message-1"));

        let current = fs::read_to_string(&path).unwrap();
        assert_eq!(current.lines().count(), 1);
        assert!(current.trim_end().ends_with("message-1"));
        assert!(!backup_path(&path, 1).exists());
    }
}
