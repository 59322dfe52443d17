//! Filesystem helpers.
//!
//! Relative paths resolve against the task working directory, which
//! [`Task::cd`], [`Task::pushd`] and [`Task::popd`] move without touching the
//! process-wide current directory.

use std::fs::{self, Metadata, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::task::{Task, lock};

/// Options for [`Task::write_file`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Append instead of truncating.
    pub append: bool,
    /// Unix permission bits for newly created files.
    pub mode: Option<u32>,
}

/// Options for [`Task::ls`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LsOptions {
    /// `-R`: list subdirectories recursively.
    pub recursive: bool,
    /// `-A`: include entries starting with `.`.
    pub all: bool,
}

/// Options for [`Task::cp`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// `-r`: copy directories recursively.
    pub recursive: bool,
    /// `-f`: overwrite existing files.
    pub force: bool,
}

/// Options for [`Task::mv`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveOptions {
    /// `-f`: replace an existing destination.
    pub force: bool,
}

fn has_flag(flags: &str, flag: char) -> bool {
    flags
        .split_whitespace()
        .filter_map(|f| f.strip_prefix('-'))
        .any(|f| f.contains(flag))
}

impl LsOptions {
    /// Parses shell-style flags such as `"-RA"`.
    #[must_use]
    pub fn from_flags(flags: &str) -> Self {
        Self {
            recursive: has_flag(flags, 'R'),
            all: has_flag(flags, 'A'),
        }
    }
}

impl CopyOptions {
    /// Parses shell-style flags such as `"-rf"`.
    #[must_use]
    pub fn from_flags(flags: &str) -> Self {
        Self {
            recursive: has_flag(flags, 'r') || has_flag(flags, 'R'),
            force: has_flag(flags, 'f'),
        }
    }
}

impl MoveOptions {
    /// Parses shell-style flags: `-f` forces, `-n` never clobbers.
    #[must_use]
    pub fn from_flags(flags: &str) -> Self {
        Self {
            force: has_flag(flags, 'f') && !has_flag(flags, 'n'),
        }
    }
}

/// Name of the host operating system: `Linux`, `Darwin`, `Windows_NT`, or
/// the raw OS name elsewhere.
#[must_use]
pub fn os_type() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows_NT",
        other => other,
    }
}

/// Lexically normalizes a path: drops `.`, folds `..` into its parent.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

fn op_failed(operation: &'static str, message: impl Into<String>) -> Error {
    Error::OperationFailed {
        operation,
        message: message.into(),
    }
}

impl Task {
    /// Returns the task working directory.
    #[must_use]
    pub fn cwd(&self) -> PathBuf {
        lock(&self.dirs).cwd.clone()
    }

    /// Anchors a relative path at the working directory.
    pub(crate) fn path_of(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd().join(path)
        }
    }

    /// Resolves a sequence of path segments into a normalized absolute path.
    ///
    /// Segments are joined right to left until an absolute path is formed;
    /// the working directory anchors the result otherwise. Empty segments
    /// are ignored.
    ///
    /// ```
    /// let task = task_lib::Task::with_env(Vec::<(String, String)>::new(), "/work");
    /// assert_eq!(task.resolve(["src", "../out", "app"]), std::path::PathBuf::from("/work/out/app"));
    /// assert_eq!(task.resolve(["a", "/abs", "b"]), std::path::PathBuf::from("/abs/b"));
    /// ```
    pub fn resolve<P: AsRef<Path>>(&self, segments: impl IntoIterator<Item = P>) -> PathBuf {
        let mut joined = PathBuf::new();
        for segment in segments {
            let segment = segment.as_ref();
            if segment.as_os_str().is_empty() {
                continue;
            }
            if segment.is_absolute() {
                joined = segment.to_path_buf();
            } else {
                joined.push(segment);
            }
        }
        normalize(&self.path_of(joined))
    }

    /// Gets metadata for a path, following symlinks.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the path cannot be stat'ed.
    pub fn stats(&self, path: impl AsRef<Path>) -> Result<Metadata> {
        Ok(fs::metadata(self.path_of(path))?)
    }

    /// Returns whether a path exists.
    ///
    /// # Errors
    ///
    /// Returns an I/O error for failures other than the path being missing.
    pub fn exist(&self, path: impl AsRef<Path>) -> Result<bool> {
        match fs::metadata(self.path_of(path)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Checks that a path exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PathNotFound`] naming the path as `name`.
    pub fn check_path(&self, path: impl AsRef<Path>, name: &str) -> Result<()> {
        let path = path.as_ref();
        self.debug(format!("check path : {}", path.display()));
        if !self.exist(path)? {
            return Err(Error::PathNotFound {
                name: name.to_string(),
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Writes data to a file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or written.
    pub fn write_file(
        &self,
        path: impl AsRef<Path>,
        data: impl AsRef<[u8]>,
        options: WriteOptions,
    ) -> Result<()> {
        let mut open = OpenOptions::new();
        open.create(true);
        if options.append {
            open.append(true);
        } else {
            open.write(true).truncate(true);
        }
        #[cfg(unix)]
        if let Some(mode) = options.mode {
            use std::os::unix::fs::OpenOptionsExt;
            open.mode(mode);
        }
        let mut file = open.open(self.path_of(path))?;
        file.write_all(data.as_ref())?;
        Ok(())
    }

    /// Changes the working directory. An empty path is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PathNotFound`] or [`Error::NotADirectory`] if the
    /// target is not an existing directory.
    pub fn cd(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Ok(());
        }
        let target = self.directory_target(path)?;
        lock(&self.dirs).cwd = target;
        Ok(())
    }

    /// Pushes the working directory onto the stack and changes to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the target is not an existing directory.
    pub fn pushd(&self, path: impl AsRef<Path>) -> Result<()> {
        let target = self.directory_target(path.as_ref())?;
        let mut dirs = lock(&self.dirs);
        let previous = std::mem::replace(&mut dirs.cwd, target);
        dirs.stack.push(previous);
        Ok(())
    }

    /// Changes back to the most recently pushed directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DirectoryStackEmpty`] if nothing was pushed.
    pub fn popd(&self) -> Result<()> {
        let mut dirs = lock(&self.dirs);
        let previous = dirs.stack.pop().ok_or(Error::DirectoryStackEmpty)?;
        dirs.cwd = previous;
        Ok(())
    }

    fn directory_target(&self, path: &Path) -> Result<PathBuf> {
        let target = self.resolve([path]);
        match fs::metadata(&target) {
            Ok(meta) if meta.is_dir() => Ok(target),
            Ok(_) => Err(Error::NotADirectory(target)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::PathNotFound {
                name: "directory".to_string(),
                path: target,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Creates a directory and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the path is empty or a
    /// non-directory is in the way.
    pub fn mkdir_p(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(op_failed("mkdirP", "path cannot be empty"));
        }
        let target = self.resolve([path]);
        self.debug(format!("mkdirP: {}", target.display()));
        fs::create_dir_all(&target).map_err(|e| {
            op_failed(
                "mkdirP",
                format!("Unable to create directory '{}'. {e}", target.display()),
            )
        })
    }

    /// Returns the path a tool would run from, had it been invoked.
    ///
    /// Bare names search `PATH`; names containing a separator resolve
    /// against the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] if `check` and the tool is not found,
    /// or [`Error::ToolLookup`] if the search itself fails.
    pub fn which(&self, tool: &str, check: bool) -> Result<Option<PathBuf>> {
        self.debug(format!("which '{tool}'"));
        let search_path = lock(&self.vars)
            .env("PATH")
            .map(std::ffi::OsString::from)
            .or_else(|| std::env::var_os("PATH"));

        let found = if tool.is_empty() {
            None
        } else {
            match which::which_in(tool, search_path, self.cwd()) {
                Ok(path) => Some(path),
                Err(which::Error::CannotFindBinaryPath) => None,
                Err(e) => return Err(Error::ToolLookup(e.to_string())),
            }
        };

        match &found {
            Some(path) => self.debug(format!("found: '{}'", path.display())),
            None if check => return Err(Error::ToolNotFound(tool.to_string())),
            None => self.debug("not found"),
        }
        Ok(found)
    }

    /// Lists directory contents, or the path itself for files.
    ///
    /// With no paths the working directory is listed. Entries are sorted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if a path does not exist.
    pub fn ls<P: AsRef<Path>>(
        &self,
        options: LsOptions,
        paths: impl IntoIterator<Item = P>,
    ) -> Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = paths.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
        if paths.is_empty() {
            paths.push(PathBuf::from("."));
        }

        let mut entries = Vec::new();
        for path in paths {
            let full = self.path_of(&path);
            let meta = fs::metadata(&full).map_err(|_| {
                op_failed("ls", format!("no such file or directory: {}", path.display()))
            })?;
            if meta.is_dir() {
                list_dir(&full, options, &mut entries)?;
            } else {
                entries.push(path);
            }
        }
        entries.sort();
        Ok(entries)
    }

    /// Copies a file or directory.
    ///
    /// A destination that is an existing directory receives the source under
    /// its own name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] unless `continue_on_error`, in which
    /// case the failure is logged as a warning.
    pub fn cp(
        &self,
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        options: CopyOptions,
        continue_on_error: bool,
    ) -> Result<()> {
        let result = copy_path(&self.path_of(source), &self.path_of(dest), options);
        self.settle("cp", result, continue_on_error)
    }

    /// Moves a file or directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] unless `continue_on_error`, in which
    /// case the failure is logged as a warning.
    pub fn mv(
        &self,
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        options: MoveOptions,
        continue_on_error: bool,
    ) -> Result<()> {
        let result = move_path(&self.path_of(source), &self.path_of(dest), options);
        self.settle("mv", result, continue_on_error)
    }

    /// Removes a path recursively. Symlinks are removed, not followed.
    /// A missing path is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] unless `continue_on_error`, in which
    /// case the failure is logged as a warning.
    pub fn rm_rf(&self, path: impl AsRef<Path>, continue_on_error: bool) -> Result<()> {
        let path = self.path_of(path);
        self.debug(format!("rm -rf {}", path.display()));
        let result = match fs::symlink_metadata(&path) {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&path),
            Ok(_) => remove_link_or_file(&path),
        }
        .map_err(|e| op_failed("rmRF", format!("{}: {e}", path.display())));
        self.settle("rmRF", result, continue_on_error)
    }

    fn settle(&self, operation: &str, result: Result<()>, continue_on_error: bool) -> Result<()> {
        match result {
            Err(e) if continue_on_error => {
                self.warning(format!("{operation}: {e}"));
                Ok(())
            }
            other => other,
        }
    }
}

fn list_dir(dir: &Path, options: LsOptions, out: &mut Vec<PathBuf>) -> Result<()> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(if options.recursive { usize::MAX } else { 1 })
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || options.all || !entry.file_name().to_string_lossy().starts_with('.')
        });
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if let Ok(relative) = entry.path().strip_prefix(dir) {
            out.push(relative.to_path_buf());
        }
    }
    Ok(())
}

fn destination_for(source: &Path, dest: &Path) -> PathBuf {
    match source.file_name() {
        Some(name) if dest.is_dir() => dest.join(name),
        _ => dest.to_path_buf(),
    }
}

/// Whether both paths exist and resolve to the same file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn same_file_error(operation: &'static str, source: &Path, target: &Path) -> Error {
    op_failed(
        operation,
        format!(
            "'{}' and '{}' are the same file",
            source.display(),
            target.display()
        ),
    )
}

fn copy_path(source: &Path, dest: &Path, options: CopyOptions) -> Result<()> {
    let meta = fs::metadata(source).map_err(|_| {
        op_failed("cp", format!("no such file or directory: {}", source.display()))
    })?;
    let target = destination_for(source, dest);
    if same_file(source, &target) {
        return Err(same_file_error("cp", source, &target));
    }

    if meta.is_dir() {
        if !options.recursive {
            return Err(op_failed(
                "cp",
                format!("omitting directory {}", source.display()),
            ));
        }
        if normalize(&target).starts_with(normalize(source)) {
            return Err(op_failed(
                "cp",
                format!("cannot copy {} into itself", source.display()),
            ));
        }
        return copy_dir(source, &target, options.force)
            .map_err(|e| op_failed("cp", format!("{}: {e}", source.display())));
    }

    if target.exists() && !options.force {
        return Err(op_failed(
            "cp",
            format!("dest file already exists: {}", target.display()),
        ));
    }
    fs::copy(source, &target)
        .map(|_| ())
        .map_err(|e| op_failed("cp", format!("{}: {e}", source.display())))
}

fn copy_dir(source: &Path, dest: &Path, force: bool) -> std::io::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(std::io::Error::other)?;
        let to = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&to)?;
        } else if to.symlink_metadata().is_ok() && !force {
            tracing::debug!("skipping existing file: {}", to.display());
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &to)?;
        } else {
            fs::copy(entry.path(), &to)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> std::io::Result<()> {
    let link = fs::read_link(from)?;
    if to.symlink_metadata().is_ok() {
        fs::remove_file(to)?;
    }
    std::os::unix::fs::symlink(link, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::copy(from, to).map(|_| ())
}

fn move_path(source: &Path, dest: &Path, options: MoveOptions) -> Result<()> {
    if fs::symlink_metadata(source).is_err() {
        return Err(op_failed(
            "mv",
            format!("no such file or directory: {}", source.display()),
        ));
    }
    let target = destination_for(source, dest);
    if same_file(source, &target) {
        return Err(same_file_error("mv", source, &target));
    }

    if let Ok(existing) = fs::symlink_metadata(&target) {
        if !options.force {
            return Err(op_failed(
                "mv",
                format!("dest file already exists: {}", target.display()),
            ));
        }
        let removed = if existing.is_dir() {
            fs::remove_dir_all(&target)
        } else {
            fs::remove_file(&target)
        };
        removed.map_err(|e| op_failed("mv", format!("{}: {e}", target.display())))?;
    }

    match fs::rename(source, &target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            copy_path(
                source,
                &target,
                CopyOptions {
                    recursive: true,
                    force: true,
                },
            )?;
            let removed = if source.is_dir() {
                fs::remove_dir_all(source)
            } else {
                fs::remove_file(source)
            };
            removed.map_err(|e| op_failed("mv", format!("{}: {e}", source.display())))
        }
        Err(e) => Err(op_failed("mv", format!("{}: {e}", source.display()))),
    }
}

fn remove_link_or_file(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        // Windows directory symlinks need remove_dir.
        Err(e) if cfg!(windows) && path.is_dir() => fs::remove_dir(path).or(Err(e)),
        other => other,
    }
}
