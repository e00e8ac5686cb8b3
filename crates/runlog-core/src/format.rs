//! Turning raw log events into display strings.
//!
//! [`RecordFormatter::format`] runs once per log call and produces a
//! [`FormattedEvent`]: placeholders substituted, error trace rendered. Every
//! destination then renders that value in the mode it needs, so the trace is
//! never rendered twice.

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use runlog_state::Level;

use crate::context::{LogArg, LogContext, SourceLocation};

/// Error attached to a log event.
pub type EventError = Arc<dyn StdError + Send + Sync + 'static>;

/// A log call as made by the caller, before any formatting.
#[derive(Clone)]
pub struct RawEvent {
    pub level: Level,
    pub template: String,
    pub args: Vec<LogArg>,
    /// Explicit context. When absent, `args` are decoded positionally.
    pub context: Option<LogContext>,
    pub location: SourceLocation,
    pub timestamp: DateTime<Utc>,
    pub error: Option<EventError>,
    pub stack: Option<String>,
}

impl RawEvent {
    pub fn new(level: Level, template: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            level,
            template: template.into(),
            args: Vec::new(),
            context: None,
            location,
            timestamp: Utc::now(),
            error: None,
            stack: None,
        }
    }

    pub fn with_args(mut self, args: Vec<LogArg>) -> Self {
        self.args = args;
        self
    }

    pub fn with_context(mut self, context: LogContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_error(mut self, error: impl StdError + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(error));
        self
    }

    /// Capture the current call stack and attach it to the event.
    pub fn with_stack(mut self) -> Self {
        self.stack = Some(Backtrace::force_capture().to_string());
        self
    }
}

impl std::fmt::Debug for RawEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawEvent")
            .field("level", &self.level)
            .field("template", &self.template)
            .field("args", &self.args)
            .field("context", &self.context)
            .field("location", &self.location)
            .field("error", &self.error.as_ref().map(|e| e.to_string()))
            .finish_non_exhaustive()
    }
}

/// Renders an attached error into trace text.
pub trait TraceRenderer: Send + Sync {
    fn render(&self, error: &(dyn StdError + 'static)) -> String;
}

/// Renders an error and its `source()` chain:
///
/// ```text
/// Error: outer
/// Caused by:
///     0: middle
///     1: root
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorChainRenderer;

impl TraceRenderer for ErrorChainRenderer {
    fn render(&self, error: &(dyn StdError + 'static)) -> String {
        let mut out = format!("Error: {error}");
        let mut source = error.source();
        if source.is_some() {
            out.push_str("\nCaused by:");
        }
        let mut depth = 0;
        while let Some(cause) = source {
            let _ = write!(out, "\n    {depth}: {cause}");
            depth += 1;
            source = cause.source();
        }
        out
    }
}

/// Output shape for [`FormattedEvent::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    /// `timestamp.millis LEVEL module - function: message`, for humans
    Plain,
    /// Substituted message only; structured fields are stored separately
    Raw,
}

/// A log event after substitution and trace rendering.
#[derive(Debug, Clone)]
pub struct FormattedEvent {
    raw: RawEvent,
    message: String,
    trace: Option<String>,
}

impl FormattedEvent {
    pub fn raw(&self) -> &RawEvent {
        &self.raw
    }

    pub fn level(&self) -> Level {
        self.raw.level
    }

    pub fn location(&self) -> &SourceLocation {
        &self.raw.location
    }

    /// Message with placeholders substituted, or the template on mismatch.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }

    pub fn render(&self, mode: FormatMode) -> String {
        let mut out = match mode {
            FormatMode::Raw => self.message.clone(),
            FormatMode::Plain => {
                let loc = &self.raw.location;
                format!(
                    "{} {} {} - {}: {}",
                    self.raw.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                    self.raw.level,
                    loc.module_name(),
                    loc.function.unwrap_or("<module>"),
                    self.message
                )
            }
        };
        for tail in [self.trace.as_deref(), self.raw.stack.as_deref()]
            .into_iter()
            .flatten()
        {
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(tail);
        }
        out
    }
}

/// Substitute `{}` placeholders with `args` in order. `{{` and `}}` are
/// literal braces.
///
/// Returns `None` when the placeholder count differs from the argument
/// count or a brace is unbalanced.
pub fn substitute(template: &str, args: &[LogArg]) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut remaining = args.iter();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('{', Some('{')) | ('}', Some('}')) => {
                chars.next();
                out.push(c);
            }
            ('{', Some('}')) => {
                chars.next();
                let _ = write!(out, "{}", remaining.next()?);
            }
            ('{', _) | ('}', _) => return None,
            _ => out.push(c),
        }
    }
    if remaining.next().is_some() {
        return None;
    }
    Some(out)
}

/// Builds [`FormattedEvent`]s.
#[derive(Clone)]
pub struct RecordFormatter {
    renderer: Arc<dyn TraceRenderer>,
}

impl Default for RecordFormatter {
    fn default() -> Self {
        Self::new(Arc::new(ErrorChainRenderer))
    }
}

impl RecordFormatter {
    pub fn new(renderer: Arc<dyn TraceRenderer>) -> Self {
        Self { renderer }
    }

    /// Substitute arguments and render the attached error, once.
    ///
    /// Never fails: a template that does not match its arguments is kept
    /// verbatim.
    pub fn format(&self, raw: RawEvent) -> FormattedEvent {
        let message = if raw.args.is_empty() {
            raw.template.clone()
        } else {
            substitute(&raw.template, &raw.args).unwrap_or_else(|| raw.template.clone())
        };
        let trace = raw
            .error
            .as_ref()
            .map(|error| self.renderer.render(&**error));
        FormattedEvent {
            raw,
            message,
            trace,
        }
    }
}
