//! Running external tools with streamed output.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;

use crate::error::{Error, Result};
use crate::task::{SharedWriter, Task, lock, write_line};
use crate::vars::secret_env_keys;

/// Callback invoked once per output line, without the line ending.
pub type LineListener = Box<dyn FnMut(&str) + Send>;

/// Options for [`ToolRunner::exec`] and [`ToolRunner::exec_sync`].
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Working directory; defaults to the task working directory.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables for the tool.
    pub env: HashMap<String, String>,
    /// Do not forward the command line or output to the task streams.
    pub silent: bool,
    /// Fail when the tool writes to stderr. Stderr is then forwarded to the
    /// error stream instead of the output stream.
    pub fail_on_std_err: bool,
    /// Do not fail on a non-zero exit code.
    pub ignore_return_code: bool,
}

/// Output of [`ToolRunner::exec_sync`].
#[derive(Debug)]
pub struct ExecResult {
    /// Exit code, or `-1` if the tool did not start or was killed by a signal.
    pub code: i32,
    /// Everything the tool wrote to stdout.
    pub stdout: String,
    /// Everything the tool wrote to stderr.
    pub stderr: String,
    /// Why the tool could not be run, if it could not.
    pub error: Option<Error>,
}

/// Tool arguments, either as one command-line string or already split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Args {
    /// A command line, split with [`ToolRunner::line`] rules.
    Line(String),
    /// Individual arguments.
    List(Vec<String>),
}

impl From<&str> for Args {
    fn from(line: &str) -> Self {
        Self::Line(line.to_string())
    }
}

impl From<String> for Args {
    fn from(line: String) -> Self {
        Self::Line(line)
    }
}

impl From<Vec<String>> for Args {
    fn from(args: Vec<String>) -> Self {
        Self::List(args)
    }
}

impl From<&[&str]> for Args {
    fn from(args: &[&str]) -> Self {
        Self::List(args.iter().map(|a| (*a).to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Args {
    fn from(args: [&str; N]) -> Self {
        Self::List(args.iter().map(|a| (*a).to_string()).collect())
    }
}

/// Builder for one external tool invocation.
///
/// ```no_run
/// use task_lib::{ExecOptions, Task};
///
/// let task = Task::current()?;
/// let code = task
///     .tool("git")
///     .arg("log")
///     .line("--oneline -n 5")
///     .on_stdout_line(|line| println!("commit {line}"))
///     .exec(&ExecOptions::default())?;
/// assert_eq!(code, 0);
/// # Ok::<(), task_lib::Error>(())
/// ```
pub struct ToolRunner<'t> {
    task: &'t Task,
    tool: PathBuf,
    args: Vec<String>,
    stdout_listeners: Vec<LineListener>,
    stderr_listeners: Vec<LineListener>,
    pipe: Option<Box<ToolRunner<'t>>>,
}

impl std::fmt::Debug for ToolRunner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRunner")
            .field("tool", &self.tool)
            .field("args", &self.args)
            .field("pipe", &self.pipe)
            .finish_non_exhaustive()
    }
}

impl Task {
    /// Starts building an invocation of `tool`.
    ///
    /// A bare name is looked up on `PATH` when the tool is started.
    pub fn tool(&self, tool: impl Into<PathBuf>) -> ToolRunner<'_> {
        let tool = tool.into();
        self.debug(format!("toolRunner toolPath: {}", tool.display()));
        ToolRunner {
            task: self,
            tool,
            args: Vec::new(),
            stdout_listeners: Vec::new(),
            stderr_listeners: Vec::new(),
            pipe: None,
        }
    }

    /// Runs `tool` with `args`, streaming its output.
    ///
    /// # Errors
    ///
    /// See [`ToolRunner::exec`].
    pub fn exec(
        &self,
        tool: impl Into<PathBuf>,
        args: impl Into<Args>,
        options: &ExecOptions,
    ) -> Result<i32> {
        self.tool(tool).with_args(args).exec(options)
    }

    /// Runs `tool` with `args` and collects its output.
    pub fn exec_sync(
        &self,
        tool: impl Into<PathBuf>,
        args: impl Into<Args>,
        options: &ExecOptions,
    ) -> ExecResult {
        self.tool(tool).with_args(args).exec_sync(options)
    }
}

impl<'t> ToolRunner<'t> {
    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends `arg` only when `condition` holds.
    #[must_use]
    pub fn arg_if(self, condition: bool, arg: impl Into<String>) -> Self {
        if condition { self.arg(arg) } else { self }
    }

    /// Appends the arguments of a command-line string.
    ///
    /// Spaces separate arguments except inside double quotes; `\"` inside
    /// quotes is a literal quote.
    #[must_use]
    pub fn line(mut self, line: &str) -> Self {
        self.args.extend(split_arg_string(line));
        self
    }

    fn with_args(self, args: impl Into<Args>) -> Self {
        match args.into() {
            Args::Line(line) => self.line(&line),
            Args::List(list) => self.args(list),
        }
    }

    /// Calls `listener` for every stdout line.
    ///
    /// When piping, this receives the output of the last tool.
    #[must_use]
    pub fn on_stdout_line(mut self, listener: impl FnMut(&str) + Send + 'static) -> Self {
        self.stdout_listeners.push(Box::new(listener));
        self
    }

    /// Calls `listener` for every stderr line of this tool.
    #[must_use]
    pub fn on_stderr_line(mut self, listener: impl FnMut(&str) + Send + 'static) -> Self {
        self.stderr_listeners.push(Box::new(listener));
        self
    }

    /// Feeds this tool's stdout into `next`'s stdin.
    #[must_use]
    pub fn pipe_exec_output_to_tool(mut self, next: ToolRunner<'t>) -> Self {
        self.pipe = Some(Box::new(next));
        self
    }

    /// The command line as shown in the log.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut line = self.tool.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        if let Some(next) = &self.pipe {
            line.push_str(" | ");
            line.push_str(&next.command_line());
        }
        line
    }

    /// Runs the tool, forwarding output line by line while it runs.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolStart`] if a tool could not be started.
    /// - [`Error::ToolFailed`] on a non-zero exit code, unless
    ///   `ignore_return_code` is set.
    /// - [`Error::ToolWroteToStderr`] if `fail_on_std_err` is set and the
    ///   tool wrote to stderr.
    pub fn exec(self, options: &ExecOptions) -> Result<i32> {
        let task = self.task;
        let outcome = self.run(options, false)?;

        if !options.ignore_return_code
            && let Some((tool, code)) = outcome.failed()
        {
            task.debug(format!("{tool} failed with return code: {code}"));
            return Err(Error::ToolFailed { tool, code });
        }
        if options.fail_on_std_err && outcome.wrote_stderr {
            return Err(Error::ToolWroteToStderr { tool: outcome.tool });
        }
        Ok(outcome.code)
    }

    /// Runs the tool to completion and returns its collected output.
    ///
    /// Output is not streamed. Unless `silent`, it is written to the output
    /// and error streams once the tool exits. The exit code never makes this
    /// fail; errors starting the tool are reported in [`ExecResult::error`].
    pub fn exec_sync(self, options: &ExecOptions) -> ExecResult {
        let task = self.task;
        match self.run(options, true) {
            Ok(outcome) => {
                if !options.silent {
                    write_lines(&task.out_stream(), &outcome.stdout);
                    write_lines(&task.err_stream(), &outcome.stderr);
                }
                ExecResult {
                    code: outcome.code,
                    stdout: outcome.stdout,
                    stderr: outcome.stderr,
                    error: None,
                }
            }
            Err(error) => ExecResult {
                code: -1,
                stdout: String::new(),
                stderr: String::new(),
                error: Some(error),
            },
        }
    }

    fn build_command(&self, options: &ExecOptions) -> Command {
        let mut command = Command::new(&self.tool);
        for key in secret_env_keys() {
            command.env_remove(key);
        }
        command
            .args(&self.args)
            .current_dir(options.cwd.clone().unwrap_or_else(|| self.task.cwd()))
            .envs(lock(&self.task.vars).exported())
            .envs(&options.env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }

    fn start(&self, mut command: Command) -> Result<Child> {
        command.spawn().map_err(|source| Error::ToolStart {
            tool: self.tool.display().to_string(),
            source,
        })
    }

    fn run(mut self, options: &ExecOptions, capture: bool) -> Result<Outcome> {
        let task = self.task;
        let sink = Sink {
            out: task.out_stream(),
            err: if options.fail_on_std_err {
                task.err_stream()
            } else {
                task.out_stream()
            },
            live: !options.silent && !capture,
            capture,
        };
        task.debug(format!("exec tool: {}", self.tool.display()));
        task.debug("arguments:");
        for arg in &self.args {
            task.debug(format!("   {arg}"));
        }
        if !options.silent {
            write_line(&sink.out, &format!("[command]{}", self.command_line()));
        }

        let mut command = self.build_command(options);
        command.stdin(Stdio::null());
        let mut first = self.start(command)?;
        let mut second = match self.pipe.as_deref() {
            Some(next) => {
                let piped = first.stdout.take().map(Stdio::from).unwrap_or_else(Stdio::null);
                let mut command = next.build_command(options);
                command.stdin(piped);
                match next.start(command) {
                    Ok(child) => Some(child),
                    Err(e) => {
                        let _ = first.kill();
                        let _ = first.wait();
                        return Err(e);
                    }
                }
            }
            None => None,
        };

        let first_stderr = first.stderr.take();
        let (second_stderr, stdout) = match second.as_mut() {
            Some(child) => (child.stderr.take(), child.stdout.take()),
            None => (None, first.stdout.take()),
        };
        let first_listeners = std::mem::take(&mut self.stderr_listeners);
        let pipe_listeners = match self.pipe.as_deref_mut() {
            Some(next) => std::mem::take(&mut next.stderr_listeners),
            None => Vec::new(),
        };

        let (stdout_text, stderr_text, wrote_stderr) = thread::scope(|scope| {
            let first_err = first_stderr
                .map(|r| scope.spawn(|| sink.pump_stderr(r, first_listeners)));
            let second_err =
                second_stderr.map(|r| scope.spawn(|| sink.pump_stderr(r, pipe_listeners)));

            let stdout_text = match stdout {
                Some(reader) => sink.pump_stdout(reader, &mut self.stdout_listeners),
                None => Ok(String::new()),
            };

            let mut stderr_text = String::new();
            let mut wrote = false;
            for handle in [first_err, second_err].into_iter().flatten() {
                let (text, any) = handle
                    .join()
                    .unwrap_or_else(|_| Ok((String::new(), false)))?;
                stderr_text.push_str(&text);
                wrote |= any;
            }
            Ok::<_, Error>((stdout_text?, stderr_text, wrote))
        })?;

        let first_code = exit_code(first.wait()?);
        let (tool, code, upstream) = match (second.as_mut(), self.pipe.as_deref()) {
            (Some(child), Some(next)) => (
                next.tool.display().to_string(),
                exit_code(child.wait()?),
                Some((self.tool.display().to_string(), first_code)),
            ),
            _ => (self.tool.display().to_string(), first_code, None),
        };
        tracing::debug!(%tool, code, "tool exited");
        task.debug(format!("rc:{code}"));

        Ok(Outcome {
            tool,
            code,
            upstream,
            stdout: stdout_text,
            stderr: stderr_text,
            wrote_stderr,
        })
    }
}

struct Outcome {
    tool: String,
    code: i32,
    upstream: Option<(String, i32)>,
    stdout: String,
    stderr: String,
    wrote_stderr: bool,
}

impl Outcome {
    /// The first tool in the pipeline that exited non-zero.
    fn failed(&self) -> Option<(String, i32)> {
        match &self.upstream {
            Some((tool, code)) if *code != 0 => Some((tool.clone(), *code)),
            _ if self.code != 0 => Some((self.tool.clone(), self.code)),
            _ => None,
        }
    }
}

struct Sink {
    out: SharedWriter,
    err: SharedWriter,
    live: bool,
    capture: bool,
}

impl Sink {
    fn pump_stdout(&self, reader: impl Read, listeners: &mut [LineListener]) -> Result<String> {
        let mut text = String::new();
        for_each_line(reader, |line| {
            if self.live {
                write_line(&self.out, line);
            }
            for listener in listeners.iter_mut() {
                listener(line);
            }
            if self.capture {
                text.push_str(line);
                text.push('\n');
            }
        })?;
        Ok(text)
    }

    fn pump_stderr(
        &self,
        reader: impl Read,
        mut listeners: Vec<LineListener>,
    ) -> Result<(String, bool)> {
        let mut text = String::new();
        let mut wrote = false;
        for_each_line(reader, |line| {
            wrote = true;
            if self.live {
                write_line(&self.err, line);
            }
            for listener in &mut listeners {
                listener(line);
            }
            if self.capture {
                text.push_str(line);
                text.push('\n');
            }
        })?;
        Ok((text, wrote))
    }
}

fn for_each_line(reader: impl Read, mut on_line: impl FnMut(&str)) -> Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        on_line(line.trim_end_matches(['\n', '\r']));
    }
}

fn write_lines(writer: &SharedWriter, text: &str) {
    for line in text.lines() {
        write_line(writer, line);
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Splits a command-line string into arguments.
fn split_arg_string(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut arg = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut last_was_space = true;

    for c in line.chars() {
        if c == ' ' && !in_quotes {
            if !last_was_space {
                args.push(std::mem::take(&mut arg));
            }
            last_was_space = true;
            continue;
        }
        last_was_space = false;

        match c {
            '"' if escaped => append(&mut arg, &mut escaped, c),
            '"' => in_quotes = !in_quotes,
            '\\' if escaped => append(&mut arg, &mut escaped, c),
            '\\' if in_quotes => escaped = true,
            _ => append(&mut arg, &mut escaped, c),
        }
    }
    if !last_was_space {
        args.push(arg.trim().to_string());
    }
    args
}

fn append(arg: &mut String, escaped: &mut bool, c: char) {
    if *escaped && c != '"' {
        arg.push('\\');
    }
    arg.push(c);
    *escaped = false;
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::test_utils::{EnvGuard, captured_task, captured_task_in, captured_task_split};

    #[test]
    fn splits_quoted_argument_strings() {
        assert_eq!(split_arg_string("a  b"), vec!["a", "b"]);
        assert_eq!(
            split_arg_string(r#"-a "b c" "d\"e" f\g"#),
            vec!["-a", "b c", "d\"e", r"f\g"]
        );
        assert_eq!(split_arg_string(r#""x\\y""#), vec![r"x\\y"]);
        assert!(split_arg_string("   ").is_empty());
    }

    #[test]
    fn builder_collects_arguments() {
        let (task, _) = captured_task(&[]);
        let runner = task
            .tool("tool")
            .arg("one")
            .args(["two", "three"])
            .arg_if(false, "skipped")
            .arg_if(true, "four")
            .line("--five \"six seven\"");
        assert_eq!(
            runner.command_line(),
            "tool one two three four --five six seven"
        );
        assert_eq!(runner.args.len(), 6);
    }

    #[test]
    fn args_convert_from_lines_and_lists() {
        assert_eq!(Args::from("a b"), Args::Line("a b".into()));
        assert_eq!(
            Args::from(["a", "b"]),
            Args::List(vec!["a".into(), "b".into()])
        );
    }

    #[cfg(unix)]
    #[test]
    fn exec_streams_output_and_logs_command() {
        let (task, out) = captured_task(&[]);
        let code = task
            .tool("sh")
            .args(["-c", "echo hello; echo world"])
            .exec(&ExecOptions::default())
            .unwrap();
        assert_eq!(code, 0);
        let contents = out.contents();
        assert!(contents.contains("[command]sh -c echo hello; echo world\n"));
        assert!(contents.contains("hello\nworld\n"));
    }

    #[cfg(unix)]
    #[test]
    fn exec_calls_line_listeners() {
        let (task, _) = captured_task(&[]);
        let stdout = Arc::new(Mutex::new(Vec::new()));
        let stderr = Arc::new(Mutex::new(Vec::new()));
        let (so, se) = (Arc::clone(&stdout), Arc::clone(&stderr));
        task.tool("sh")
            .args(["-c", "echo out1; echo err1 >&2; echo out2"])
            .on_stdout_line(move |l| so.lock().unwrap().push(l.to_string()))
            .on_stderr_line(move |l| se.lock().unwrap().push(l.to_string()))
            .exec(&ExecOptions::default())
            .unwrap();
        assert_eq!(*stdout.lock().unwrap(), vec!["out1", "out2"]);
        assert_eq!(*stderr.lock().unwrap(), vec!["err1"]);
    }

    #[cfg(unix)]
    #[test]
    fn exec_fails_on_non_zero_exit_unless_ignored() {
        let (task, _) = captured_task(&[]);
        let err = task
            .exec("sh", ["-c", "exit 3"], &ExecOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::ToolFailed { code: 3, .. }));

        let options = ExecOptions {
            ignore_return_code: true,
            ..ExecOptions::default()
        };
        assert_eq!(task.exec("sh", ["-c", "exit 3"], &options).unwrap(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn exec_fails_on_stderr_when_asked() {
        let (task, _) = captured_task(&[]);
        assert_eq!(
            task.exec("sh", ["-c", "echo oops >&2"], &ExecOptions::default())
                .unwrap(),
            0
        );

        let options = ExecOptions {
            fail_on_std_err: true,
            ..ExecOptions::default()
        };
        assert!(matches!(
            task.exec("sh", ["-c", "echo oops >&2"], &options),
            Err(Error::ToolWroteToStderr { .. })
        ));
    }

    #[test]
    fn exec_reports_tools_that_cannot_start() {
        let (task, _) = captured_task(&[]);
        let err = task
            .exec("definitely-not-a-real-tool-name", "", &ExecOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::ToolStart { .. }));

        let result = task.exec_sync(
            "definitely-not-a-real-tool-name",
            "",
            &ExecOptions::default(),
        );
        assert_eq!(result.code, -1);
        assert!(matches!(result.error, Some(Error::ToolStart { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn exec_sync_collects_output_without_failing() {
        let (task, out) = captured_task(&[]);
        let options = ExecOptions {
            silent: true,
            ..ExecOptions::default()
        };
        let result = task.exec_sync("sh", ["-c", "echo a; echo b >&2; exit 2"], &options);
        assert_eq!(result.code, 2);
        assert_eq!(result.stdout, "a\n");
        assert_eq!(result.stderr, "b\n");
        assert!(result.error.is_none());
        assert!(!out.contents().contains("[command]"));
    }

    #[cfg(unix)]
    #[test]
    fn exec_uses_task_directory_and_environment() {
        let dir = tempfile::tempdir().unwrap();
        let (task, _) = captured_task_in(&[], dir.path());
        task.set_variable("build.flavor", "release", false);
        task.set_variable("build.token", "hidden", true);

        let mut options = ExecOptions {
            silent: true,
            ..ExecOptions::default()
        };
        options.env.insert("EXTRA".into(), "yes".into());
        let result = task.exec_sync(
            "sh",
            ["-c", "pwd; echo $BUILD_FLAVOR; echo $EXTRA; echo x$BUILD_TOKEN"],
            &options,
        );
        let lines: Vec<&str> = result.stdout.lines().collect();
        let pwd = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(std::fs::canonicalize(lines[0]).unwrap(), pwd);
        assert_eq!(&lines[1..], ["release", "yes", "x"]);
    }

    #[cfg(unix)]
    #[test]
    fn pipes_output_into_next_tool() {
        let (task, out) = captured_task(&[]);
        let grep = task.tool("grep").arg("b");
        let code = task
            .tool("printf")
            .arg("a\\nb\\nc\\n")
            .pipe_exec_output_to_tool(grep)
            .exec(&ExecOptions::default())
            .unwrap();
        assert_eq!(code, 0);
        let contents = out.contents();
        assert!(contents.contains("[command]printf a\\nb\\nc\\n | grep b\n"));
        assert!(contents.contains("\nb\n"));
        assert!(!contents.contains("\na\n"));
    }

    #[cfg(unix)]
    #[test]
    fn pipe_reports_failing_upstream_tool() {
        let (task, _) = captured_task(&[]);
        let cat = task.tool("cat");
        let err = task
            .tool("sh")
            .args(["-c", "echo x; exit 4"])
            .pipe_exec_output_to_tool(cat)
            .exec(&ExecOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::ToolFailed { code: 4, ref tool } if tool == "sh"));
    }

    #[cfg(unix)]
    #[test]
    fn fail_on_std_err_routes_stderr_to_error_stream() {
        let cwd = std::env::current_dir().unwrap();
        let (task, out, err) = captured_task_split(&[], &cwd);
        task.exec("sh", ["-c", "echo plain >&2"], &ExecOptions::default())
            .unwrap();
        assert!(out.contents().contains("plain\n"));
        assert!(err.contents().is_empty());

        let options = ExecOptions {
            fail_on_std_err: true,
            ..ExecOptions::default()
        };
        assert!(task.exec("sh", ["-c", "echo loud >&2"], &options).is_err());
        assert_eq!(err.contents(), "loud\n");
        assert!(!out.contents().contains("loud"));
    }

    #[cfg(unix)]
    #[test]
    fn exec_sync_writes_buffered_output_to_its_own_streams() {
        let cwd = std::env::current_dir().unwrap();
        let (task, out, err) = captured_task_split(&[], &cwd);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let lines = Arc::clone(&seen);

        let result = task
            .tool("sh")
            .args(["-c", "echo a; echo b >&2"])
            .on_stdout_line(move |l| lines.lock().unwrap().push(l.to_string()))
            .exec_sync(&ExecOptions::default());
        assert_eq!(result.code, 0);
        assert_eq!(*seen.lock().unwrap(), vec!["a"]);
        let contents = out.contents();
        assert!(contents.contains("[command]sh -c echo a; echo b >&2\n"));
        assert!(contents.ends_with("]rc:0\na\n"));
        assert_eq!(err.contents(), "b\n");
    }

    #[cfg(unix)]
    #[test]
    fn secret_variables_do_not_reach_tools() {
        let mut env = EnvGuard::new();
        env.set("SECRET_TOOLRUNNER_TOKEN", "hunter2");
        env.set("TOOLRUNNER_VISIBLE", "shown");
        let task = Task::from_env().unwrap();
        task.set_std_stream(std::io::sink());

        assert_eq!(
            task.get_variable("toolrunner.token").as_deref(),
            Some("hunter2")
        );
        let options = ExecOptions {
            silent: true,
            ..ExecOptions::default()
        };
        let result = task.exec_sync(
            "sh",
            ["-c", "echo x$SECRET_TOOLRUNNER_TOKEN; echo $TOOLRUNNER_VISIBLE"],
            &options,
        );
        assert_eq!(result.stdout, "x\nshown\n");
    }
}
