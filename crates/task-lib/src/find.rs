//! Recursive filesystem traversal and the legacy semicolon pattern finder.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::fs::normalize;
use crate::matching::{ensure_rooted, is_rooted};
use crate::task::Task;

/// Options for [`Task::find`]. All default to `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindOptions {
    /// Report broken symlinks as files instead of failing.
    pub allow_broken_symbolic_links: bool,
    /// Descend into the root when it is a symlink to a directory.
    pub follow_specified_symbolic_link: bool,
    /// Descend into symlinked directories below the root.
    pub follow_symbolic_links: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            allow_broken_symbolic_links: true,
            follow_specified_symbolic_link: true,
            follow_symbolic_links: true,
        }
    }
}

impl Task {
    /// Recursively lists `path` and everything below it, root first.
    ///
    /// Children are visited in name order. A missing root yields no results.
    /// Symlinked directories whose target is already an ancestor are reported
    /// but not descended into.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if an entry cannot be read, or if a symlink is
    /// broken and `allow_broken_symbolic_links` is off.
    pub fn find(
        &self,
        path: impl AsRef<Path>,
        options: Option<&FindOptions>,
    ) -> Result<Vec<PathBuf>> {
        let options = options.copied().unwrap_or_default();
        let root = normalize(&self.path_of(path));
        self.debug(format!("findPath: '{}'", root.display()));
        self.debug(format!("findOptions: {options:?}"));

        match fs::symlink_metadata(&root) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.debug("0 results");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
            Ok(_) => {}
        }

        let walker = WalkDir::new(&root)
            .follow_links(options.follow_symbolic_links)
            .follow_root_links(options.follow_specified_symbolic_link)
            .sort_by_file_name();

        let mut result = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => result.push(entry.into_path()),
                Err(e) => result.push(self.settle_walk_error(e, options)?),
            }
        }

        self.debug(format!("{} results", result.len()));
        Ok(result)
    }

    /// Turns a link the walker could not descend into a reported item.
    fn settle_walk_error(&self, error: walkdir::Error, options: FindOptions) -> Result<PathBuf> {
        let Some(path) = error.path().map(Path::to_path_buf) else {
            return Err(std::io::Error::from(error).into());
        };
        if let Some(ancestor) = error.loop_ancestor() {
            self.debug(format!(
                "Symlink cycle detected: '{}' -> '{}'",
                path.display(),
                ancestor.display()
            ));
            tracing::debug!(path = %path.display(), "skipping symlink cycle");
            return Ok(path);
        }
        let broken = error
            .io_error()
            .is_some_and(|e| e.kind() == ErrorKind::NotFound)
            && fs::symlink_metadata(&path).is_ok_and(|m| m.file_type().is_symlink());
        if broken && options.allow_broken_symbolic_links {
            self.debug(format!("  {} (broken symlink)", path.display()));
            return Ok(path);
        }
        Err(std::io::Error::from(error).into())
    }

    /// Finds files or directories with the legacy pattern syntax.
    ///
    /// `pattern` holds `;`-separated patterns (`;;` is a literal `;`), each
    /// optionally prefixed with `+:` (include) or `-:` (exclude). `**`
    /// spans directories, `*` and `?` stay within one. Unrooted patterns are
    /// joined to `root`, which defaults to the working directory. When
    /// neither kind is requested, files are returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for an empty pattern or one ending in
    /// a separator, or an I/O error from the traversal.
    pub fn legacy_find_files(
        &self,
        root: Option<&Path>,
        pattern: &str,
        include_files: bool,
        include_directories: bool,
    ) -> Result<Vec<PathBuf>> {
        if pattern.is_empty() {
            return Err(Error::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern cannot be empty".into(),
            });
        }
        self.debug(format!("legacyFindFiles rootDirectory: '{root:?}'"));
        self.debug(format!("pattern: '{pattern}'"));

        let include_files = include_files || !include_directories;
        let root = match root {
            Some(root) if !root.as_os_str().is_empty() => self.path_of(root),
            _ => self.cwd(),
        };
        let root = root.to_string_lossy().into_owned();

        let mut includes = Vec::new();
        let mut excludes = Vec::new();
        for raw in split_legacy_patterns(pattern) {
            if raw.is_empty() {
                continue;
            }
            let (body, include) = if let Some(rest) = raw.strip_prefix("+:") {
                (rest, true)
            } else if let Some(rest) = raw.strip_prefix("-:") {
                (rest, false)
            } else {
                (raw.as_str(), true)
            };
            if body.ends_with('/') || (cfg!(windows) && body.ends_with('\\')) {
                return Err(Error::InvalidPattern {
                    pattern: body.to_string(),
                    reason: "pattern cannot end with a directory separator".into(),
                });
            }
            let rooted = if is_rooted(body) {
                body.to_string()
            } else {
                ensure_rooted(&root, body)
            };
            if include {
                includes.push(rooted);
            } else {
                excludes.push(rooted);
            }
        }

        let mut matching = BTreeSet::new();
        for pattern in &includes {
            self.debug(format!("including pattern: '{pattern}'"));
            let Some(find_path) = legacy_find_path(pattern) else {
                self.debug("skipping pattern without a directory");
                continue;
            };
            let regex = legacy_regex(pattern)?;
            for item in self.find(&find_path, None)? {
                let is_dir = fs::metadata(&item).is_ok_and(|m| m.is_dir());
                let wanted = if is_dir {
                    include_directories
                } else {
                    include_files
                };
                if wanted && legacy_matches(&regex, &item, include_directories) {
                    matching.insert(item);
                }
            }
        }

        for pattern in &excludes {
            self.debug(format!("excluding pattern: '{pattern}'"));
            let regex = legacy_regex(pattern)?;
            matching.retain(|item| !legacy_matches(&regex, item, include_directories));
        }

        let found: Vec<PathBuf> = matching.into_iter().collect();
        self.debug(format!("{} matches", found.len()));
        Ok(found)
    }
}

/// Splits on `;`, treating `;;` as a literal semicolon.
fn split_legacy_patterns(pattern: &str) -> Vec<String> {
    let mut patterns = Vec::new();
    let mut current = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c != ';' {
            current.push(c);
        } else if chars.peek() == Some(&';') {
            chars.next();
            current.push(';');
        } else {
            patterns.push(std::mem::take(&mut current));
        }
    }
    patterns.push(current);
    patterns
}

/// Directory to search from: the text before the first wildcard up to its
/// last separator, or the parent of a wildcard-free pattern.
fn legacy_find_path(pattern: &str) -> Option<PathBuf> {
    let head = match pattern.find(['*', '?']) {
        Some(index) => &pattern[..index],
        None => pattern,
    };
    let separators: &[char] = if cfg!(windows) { &['/', '\\'] } else { &['/'] };
    if let Some(dir) = head.strip_suffix(separators) {
        let dir = if dir.is_empty() || dir.ends_with(':') { head } else { dir };
        return Some(PathBuf::from(dir));
    }
    Path::new(head)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

fn legacy_regex(pattern: &str) -> Result<Regex> {
    let normalized = if cfg!(windows) {
        pattern.replace('\\', "/")
    } else {
        pattern.to_string()
    };
    let chars: Vec<char> = normalized.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;
    while i < chars.len() {
        let rest = &chars[i..];
        if rest.starts_with(&['/', '*', '*', '/']) {
            out.push_str("((/.+/)|(/))");
            i += 4;
        } else if rest.starts_with(&['*', '*']) {
            out.push_str(".*");
            i += 2;
        } else if rest[0] == '*' {
            out.push_str("[^/]*");
            i += 1;
        } else if rest[0] == '?' {
            out.push_str("[^/]");
            i += 1;
        } else {
            out.push_str(&regex::escape(rest[0].encode_utf8(&mut [0; 4])));
            i += 1;
        }
    }
    out.push('$');

    RegexBuilder::new(&out)
        .case_insensitive(cfg!(windows))
        .build()
        .map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

fn legacy_matches(regex: &Regex, item: &Path, include_directories: bool) -> bool {
    let text = item.to_string_lossy();
    let text = if cfg!(windows) {
        text.replace('\\', "/")
    } else {
        text.into_owned()
    };
    // a directory pattern like **/dir/** needs the trailing slash
    regex.is_match(&text) || (include_directories && regex.is_match(&format!("{text}/")))
}
