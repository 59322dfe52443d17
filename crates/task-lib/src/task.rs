//! The current task: environment snapshot, output streams and shared state.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use crate::command::TaskCommand;
use crate::error::Result;
use crate::result::TaskResult;
use crate::vars::VariableStore;

/// A writer shared between the task and running tools.
pub(crate) type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

static CURRENT: OnceLock<Task> = OnceLock::new();

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn shared(writer: impl Write + Send + 'static) -> SharedWriter {
    Arc::new(Mutex::new(Box::new(writer)))
}

#[derive(Debug)]
pub(crate) struct DirState {
    pub(crate) cwd: PathBuf,
    pub(crate) stack: Vec<PathBuf>,
}

/// State for one automation task.
///
/// A task reads its inputs, variables and endpoints from a snapshot of the
/// environment the agent launched it with, and reports back by writing
/// logging commands to its output stream. Use [`Task::current`] for the
/// process-wide instance or [`Task::with_env`] for an isolated one.
///
/// # Examples
///
/// ```
/// use task_lib::{Task, TaskResult};
///
/// let task = Task::with_env([("INPUT_TARGET", " release ")], "/tmp");
/// task.set_std_stream(std::io::sink());
/// assert_eq!(task.get_input("target", true)?.as_deref(), Some("release"));
///
/// task.set_result(TaskResult::Failed, "boom");
/// task.set_result(TaskResult::Succeeded, "fine");
/// assert_eq!(task.result(), TaskResult::Failed);
/// # Ok::<(), task_lib::Error>(())
/// ```
pub struct Task {
    pub(crate) vars: Mutex<VariableStore>,
    pub(crate) result: Mutex<Option<TaskResult>>,
    pub(crate) dirs: Mutex<DirState>,
    pub(crate) resources: Mutex<HashMap<String, String>>,
    out: Mutex<SharedWriter>,
    err: Mutex<SharedWriter>,
}

impl Task {
    /// Builds a task from the process environment and working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn from_env() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self::with_env(std::env::vars(), cwd))
    }

    /// Builds a task from explicit environment variables.
    ///
    /// `cwd` becomes the task working directory that relative paths and
    /// spawned tools resolve against.
    #[must_use]
    pub fn with_env<I, K, V>(vars: I, cwd: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env = vars.into_iter().map(|(k, v)| (k.into(), v.into()));
        Self {
            vars: Mutex::new(VariableStore::load(env)),
            result: Mutex::new(None),
            dirs: Mutex::new(DirState {
                cwd: cwd.into(),
                stack: Vec::new(),
            }),
            resources: Mutex::new(HashMap::new()),
            out: Mutex::new(shared(std::io::stdout())),
            err: Mutex::new(shared(std::io::stderr())),
        }
    }

    /// Returns the process-wide task, built from the environment on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the task has not been built yet and the current
    /// directory cannot be determined.
    pub fn current() -> Result<&'static Task> {
        if let Some(task) = CURRENT.get() {
            return Ok(task);
        }
        let task = Self::from_env()?;
        Ok(CURRENT.get_or_init(|| task))
    }

    /// Redirects logging commands and tool output.
    pub fn set_std_stream(&self, writer: impl Write + Send + 'static) {
        *lock(&self.out) = shared(writer);
    }

    /// Redirects tool error output.
    pub fn set_err_stream(&self, writer: impl Write + Send + 'static) {
        *lock(&self.err) = shared(writer);
    }

    pub(crate) fn out_stream(&self) -> SharedWriter {
        Arc::clone(&lock(&self.out))
    }

    pub(crate) fn err_stream(&self) -> SharedWriter {
        Arc::clone(&lock(&self.err))
    }

    /// Writes a logging command to the output stream.
    pub fn write_command(&self, command: &TaskCommand) {
        write_line(&self.out_stream(), &command.to_string());
    }

    /// Emits a logging command with the given properties.
    pub fn command<K, V>(
        &self,
        command: &str,
        properties: impl IntoIterator<Item = (K, V)>,
        message: &str,
    ) where
        K: Into<String>,
        V: Into<String>,
    {
        let mut cmd = TaskCommand::new(command, message);
        cmd.properties = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.write_command(&cmd);
    }

    /// Logs a debug message, shown when the pipeline runs with diagnostics.
    pub fn debug(&self, message: impl AsRef<str>) {
        self.write_command(&TaskCommand::new("task.debug", message.as_ref()));
    }

    /// Logs a warning issue.
    pub fn warning(&self, message: impl AsRef<str>) {
        self.write_command(
            &TaskCommand::new("task.issue", message.as_ref()).property("type", "warning"),
        );
    }

    /// Logs an error issue. This does not fail the task; see [`Task::set_result`].
    pub fn error(&self, message: impl AsRef<str>) {
        self.write_command(
            &TaskCommand::new("task.issue", message.as_ref()).property("type", "error"),
        );
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("result", &*lock(&self.result))
            .field("dirs", &*lock(&self.dirs))
            .finish_non_exhaustive()
    }
}

/// Writes one line; output failures are not task failures.
pub(crate) fn write_line(writer: &SharedWriter, line: &str) {
    let mut w = lock(writer);
    let _ = writeln!(w, "{line}");
    let _ = w.flush();
}
