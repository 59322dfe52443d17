use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::command::TaskCommand;
use crate::task::{Task, lock};

/// In-memory writer that can be inspected after the task wrote to it.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&lock(&self.0)).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        lock(&self.0).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Builds a task over `vars` rooted at the process directory, capturing its output.
pub fn captured_task(vars: &[(&str, &str)]) -> (Task, SharedBuf) {
    let cwd = std::env::current_dir().unwrap_or_else(|_| "/".into());
    captured_task_in(vars, &cwd)
}

/// Builds a task over `vars` rooted at `cwd`, capturing its output.
pub fn captured_task_in(vars: &[(&str, &str)], cwd: &Path) -> (Task, SharedBuf) {
    let task = Task::with_env(vars.iter().copied(), cwd);
    let out = SharedBuf::default();
    task.set_std_stream(out.clone());
    task.set_err_stream(out.clone());
    (task, out)
}

/// Like [`captured_task_in`], with the error stream in its own buffer.
pub fn captured_task_split(vars: &[(&str, &str)], cwd: &Path) -> (Task, SharedBuf, SharedBuf) {
    let (task, out) = captured_task_in(vars, cwd);
    let err = SharedBuf::default();
    task.set_err_stream(err.clone());
    (task, out, err)
}

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Sets process environment variables for one test, restoring them on drop.
pub struct EnvGuard<'a> {
    _lock: MutexGuard<'a, ()>,
    vars: Vec<(String, Option<String>)>,
}

impl EnvGuard<'_> {
    pub fn new() -> Self {
        Self {
            _lock: lock(&ENV_LOCK),
            vars: Vec::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        if !self.vars.iter().any(|(k, _)| k == key) {
            self.vars.push((key.to_string(), std::env::var(key).ok()));
        }
        // SAFETY: ENV_LOCK serializes environment changes between tests
        unsafe { std::env::set_var(key, value) };
    }
}

impl Drop for EnvGuard<'_> {
    fn drop(&mut self) {
        for (key, original) in &self.vars {
            // SAFETY: ENV_LOCK is still held
            match original {
                Some(value) => unsafe { std::env::set_var(key, value) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

/// Parses every logging command written to `out`.
pub fn commands(out: &SharedBuf) -> Vec<TaskCommand> {
    out.contents()
        .lines()
        .filter_map(|line| TaskCommand::parse(line).ok())
        .collect()
}

/// Debug messages written to `out`.
pub fn debug_messages(out: &SharedBuf) -> Vec<String> {
    commands(out)
        .into_iter()
        .filter(|c| c.command == "task.debug")
        .map(|c| c.message)
        .collect()
}
