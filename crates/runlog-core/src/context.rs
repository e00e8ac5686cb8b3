//! Log call context: who emitted a line and from where.
//!
//! Call sites should build a [`LogContext`] explicitly. The positional
//! convention (1 to 4 loose values meaning component, computer, task, step)
//! is still accepted through [`decode`] for code that has not migrated.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Well-known subsystems that emit log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    Api = 0,
    Supervisor = 1,
    Worker = 2,
}

impl ComponentType {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Integer code of the subsystem that emitted a log line.
///
/// This is the single normalization point: named [`ComponentType`] values
/// and raw codes both convert into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Component(pub i32);

impl From<i32> for Component {
    fn from(code: i32) -> Self {
        Component(code)
    }
}

impl From<ComponentType> for Component {
    fn from(kind: ComponentType) -> Self {
        Component(kind.code())
    }
}

/// Structured context attached to a log line.
///
/// Constructors only allow the nested shapes: a step needs a task, a task
/// needs a computer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContext {
    component: Component,
    computer: Option<String>,
    task: Option<i64>,
    step: Option<i64>,
}

impl LogContext {
    pub fn component(component: impl Into<Component>) -> Self {
        Self {
            component: component.into(),
            computer: None,
            task: None,
            step: None,
        }
    }

    pub fn computer(component: impl Into<Component>, computer: impl Into<String>) -> Self {
        Self {
            computer: Some(computer.into()),
            ..Self::component(component)
        }
    }

    pub fn task(component: impl Into<Component>, computer: impl Into<String>, task: i64) -> Self {
        Self {
            task: Some(task),
            ..Self::computer(component, computer)
        }
    }

    pub fn step(
        component: impl Into<Component>,
        computer: impl Into<String>,
        task: i64,
        step: i64,
    ) -> Self {
        Self {
            step: Some(step),
            ..Self::task(component, computer, task)
        }
    }

    pub fn component_code(&self) -> i32 {
        self.component.0
    }

    pub fn computer_name(&self) -> Option<&str> {
        self.computer.as_deref()
    }

    pub fn task_id(&self) -> Option<i64> {
        self.task
    }

    pub fn step_index(&self) -> Option<i64> {
        self.step
    }

    pub(crate) fn into_parts(self) -> (i32, Option<String>, Option<i64>, Option<i64>) {
        (self.component.0, self.computer, self.task, self.step)
    }
}

/// One loosely typed value passed to a log call.
///
/// These double as format arguments and, in the positional convention, as
/// context values.
#[derive(Debug, Clone, PartialEq)]
pub enum LogArg {
    Int(i64),
    Float(f64),
    Text(String),
    Component(ComponentType),
}

impl fmt::Display for LogArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogArg::Int(v) => write!(f, "{v}"),
            LogArg::Float(v) => write!(f, "{v}"),
            LogArg::Text(v) => f.write_str(v),
            LogArg::Component(c) => write!(f, "{c:?}"),
        }
    }
}

macro_rules! log_arg_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for LogArg {
            fn from(v: $t) -> Self {
                LogArg::Int(i64::from(v))
            }
        })*
    };
}

log_arg_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for LogArg {
    fn from(v: f32) -> Self {
        LogArg::Float(f64::from(v))
    }
}

impl From<f64> for LogArg {
    fn from(v: f64) -> Self {
        LogArg::Float(v)
    }
}

impl From<&str> for LogArg {
    fn from(v: &str) -> Self {
        LogArg::Text(v.to_string())
    }
}

impl From<String> for LogArg {
    fn from(v: String) -> Self {
        LogArg::Text(v)
    }
}

impl From<&String> for LogArg {
    fn from(v: &String) -> Self {
        LogArg::Text(v.clone())
    }
}

impl From<ComponentType> for LogArg {
    fn from(v: ComponentType) -> Self {
        LogArg::Component(v)
    }
}

fn describe(arg: &LogArg) -> String {
    match arg {
        LogArg::Int(v) => format!("integer {v}"),
        LogArg::Float(v) => format!("float {v}"),
        LogArg::Text(v) => format!("text {v:?}"),
        LogArg::Component(c) => format!("component {c:?}"),
    }
}

fn component_of(arg: &LogArg) -> Result<Component, DecodeError> {
    match arg {
        LogArg::Component(kind) => Ok(Component::from(*kind)),
        LogArg::Int(code) => i32::try_from(*code)
            .map(Component)
            .map_err(|_| DecodeError::InvalidField {
                field: "component",
                found: describe(arg),
            }),
        other => Err(DecodeError::InvalidField {
            field: "component",
            found: describe(other),
        }),
    }
}

fn computer_of(arg: &LogArg) -> Result<String, DecodeError> {
    match arg {
        LogArg::Text(name) => Ok(name.clone()),
        LogArg::Int(id) => Ok(id.to_string()),
        other => Err(DecodeError::InvalidField {
            field: "computer",
            found: describe(other),
        }),
    }
}

fn integer_of(field: &'static str, arg: &LogArg) -> Result<i64, DecodeError> {
    match arg {
        LogArg::Int(v) => Ok(*v),
        other => Err(DecodeError::InvalidField {
            field,
            found: describe(other),
        }),
    }
}

/// Decode positional context values by count.
///
/// | count | fields |
/// |---|---|
/// | 1 | component |
/// | 2 | component, computer |
/// | 3 | component, computer, task |
/// | 4 | component, computer, task, step |
pub fn decode(args: &[LogArg]) -> Result<LogContext, DecodeError> {
    match args {
        [] => Err(DecodeError::MissingComponent),
        [component] => Ok(LogContext::component(component_of(component)?)),
        [component, computer] => Ok(LogContext::computer(
            component_of(component)?,
            computer_of(computer)?,
        )),
        [component, computer, task] => Ok(LogContext::task(
            component_of(component)?,
            computer_of(computer)?,
            integer_of("task", task)?,
        )),
        [component, computer, task, step] => Ok(LogContext::step(
            component_of(component)?,
            computer_of(computer)?,
            integer_of("task", task)?,
            integer_of("step", step)?,
        )),
        more => Err(DecodeError::TooManyValues { count: more.len() }),
    }
}

/// Where a log call was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    /// Source file as reported by `file!()`
    pub file: &'static str,
    pub line: u32,
    /// Rust module path as reported by `module_path!()`
    pub module: &'static str,
    /// Enclosing function, when known
    pub function: Option<&'static str>,
}

impl SourceLocation {
    pub fn new(
        file: &'static str,
        line: u32,
        module: &'static str,
        function: Option<&'static str>,
    ) -> Self {
        Self {
            file,
            line,
            module,
            function,
        }
    }

    /// Last segment of the Rust module path.
    pub fn module_name(&self) -> &'static str {
        self.module.rsplit("::").next().unwrap_or(self.module)
    }

    /// Dotted path of the file relative to `root`, with `:function` appended
    /// when the function is known.
    ///
    /// An empty `root` selects every file compiled from the local workspace:
    /// `file!()` is relative for workspace members and absolute for
    /// dependencies built from the registry or git.
    ///
    /// Returns `None` when the file is not under `root`.
    pub fn dotted_path(&self, root: &Path) -> Option<String> {
        let file = Path::new(self.file);
        let relative = if root.as_os_str().is_empty() {
            file.is_relative().then_some(file)?
        } else {
            file.strip_prefix(root).ok()?
        };
        let relative = relative.to_string_lossy();
        let without_ext = relative.strip_suffix(".rs").unwrap_or(&relative);
        let mut dotted = without_ext.replace(['/', '\\'], ".");
        if let Some(function) = self.function {
            dotted.push(':');
            dotted.push_str(function);
        }
        Some(dotted)
    }
}

/// Name of the enclosing function, for use in macros.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let name = name.strip_suffix("::f").unwrap_or(name);
        name.rsplit("::")
            .find(|segment| *segment != "{{closure}}")
            .unwrap_or(name)
    }};
}

/// [`SourceLocation`] of the macro call site.
#[macro_export]
macro_rules! here {
    () => {
        $crate::SourceLocation::new(
            file!(),
            line!(),
            module_path!(),
            Some($crate::__function_name!()),
        )
    };
}
