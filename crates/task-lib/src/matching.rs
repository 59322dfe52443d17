//! Applying glob pattern lists to paths and to the filesystem.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::error::Result;
use crate::find::FindOptions;
use crate::glob::{MatchOptions, Pattern, brace_expand};
use crate::task::Task;

/// One parsed entry of a pattern list.
struct PatternEntry {
    patterns: Vec<String>,
    include: bool,
}

/// Trims, drops comments, strips negation and expands braces.
fn parse_pattern(raw: &str, options: &MatchOptions) -> Option<PatternEntry> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || (!options.nocomment && trimmed.starts_with('#')) {
        return None;
    }

    let (body, include) = if options.nonegate {
        (trimmed, true)
    } else {
        let bangs = trimmed.chars().take_while(|&c| c == '!').count();
        let odd = bangs % 2 == 1;
        let include = bangs == 0 || odd == options.flip_negate;
        (&trimmed[bangs..], include)
    };

    let patterns = if options.nobrace {
        vec![body.to_string()]
    } else {
        brace_expand(body)
    };
    Some(PatternEntry { patterns, include })
}

/// Options for matching one already-parsed pattern.
fn literal_options(options: &MatchOptions) -> MatchOptions {
    MatchOptions {
        nobrace: true,
        nocomment: true,
        nonegate: true,
        ..*options
    }
}

pub(crate) fn is_rooted(path: &str) -> bool {
    if cfg!(windows) {
        let bytes = path.as_bytes();
        path.starts_with(['/', '\\'])
            || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
    } else {
        path.starts_with('/')
    }
}

fn is_basename_only(pattern: &str) -> bool {
    if cfg!(windows) {
        !pattern.contains(['/', '\\'])
    } else {
        !pattern.contains('/')
    }
}

pub(crate) fn ensure_rooted(root: &str, path: &str) -> String {
    if is_rooted(path) {
        return path.to_string();
    }
    let separator = if cfg!(windows) { ['/', '\\'].as_slice() } else { ['/'].as_slice() };
    if root.ends_with(separator) {
        format!("{root}{path}")
    } else {
        format!("{root}/{path}")
    }
}

/// Roots a pattern, escaping glob characters in the root.
fn ensure_pattern_rooted(root: &str, pattern: &str) -> String {
    if is_rooted(pattern) {
        return pattern.to_string();
    }
    let mut escaped = String::with_capacity(root.len());
    for c in root.chars() {
        match c {
            '*' => escaped.push_str("[*]"),
            '?' => escaped.push_str("[?]"),
            '[' => escaped.push_str("[[]"),
            _ => escaped.push(c),
        }
    }
    ensure_rooted(&escaped, pattern)
}

/// Returns a predicate testing paths against `pattern`.
///
/// ```
/// let keep = task_lib::filter("*.log", &task_lib::MatchOptions::default())?;
/// let logs: Vec<&str> = ["a.log", "b.txt"].into_iter().filter(|p| keep(*p)).collect();
/// assert_eq!(logs, ["a.log"]);
/// # Ok::<(), task_lib::Error>(())
/// ```
///
/// # Errors
///
/// Returns [`crate::Error::InvalidPattern`] if the pattern cannot be compiled.
pub fn filter(pattern: &str, options: &MatchOptions) -> Result<impl Fn(&str) -> bool + use<>> {
    let compiled = Pattern::new(pattern, options)?;
    Ok(move |path: &str| compiled.matches(path))
}

impl Task {
    /// Applies include and exclude patterns to a list of paths.
    ///
    /// Patterns are applied in order. Leading `!` makes a pattern exclude
    /// what earlier patterns included. Unrooted patterns are rooted at
    /// `pattern_root` when given, except basename-only patterns under
    /// `match_base`. The result keeps the order of `list`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidPattern`] for a pattern that cannot be
    /// compiled.
    pub fn match_paths<S, P>(
        &self,
        list: &[S],
        patterns: &[P],
        pattern_root: Option<&str>,
        options: Option<&MatchOptions>,
    ) -> Result<Vec<String>>
    where
        S: AsRef<str>,
        P: AsRef<str>,
    {
        let options = options.copied().unwrap_or_default();
        let match_options = literal_options(&options);
        self.debug(format!("patternRoot: '{}'", pattern_root.unwrap_or("")));
        self.debug(format!("options: {options:?}"));

        let mut selected = vec![false; list.len()];
        for raw in patterns {
            let raw = raw.as_ref();
            self.debug(format!("pattern: '{raw}'"));
            let Some(entry) = parse_pattern(raw, &options) else {
                self.debug("skipping empty or comment pattern");
                continue;
            };

            for pattern in &entry.patterns {
                let pattern = match pattern_root {
                    Some(root)
                        if !is_rooted(pattern)
                            && !(options.match_base && is_basename_only(pattern)) =>
                    {
                        ensure_rooted(root, pattern)
                    }
                    _ => pattern.clone(),
                };
                let kind = if entry.include { "include" } else { "exclude" };
                self.debug(format!("{kind} pattern: '{pattern}'"));

                let compiled = Pattern::new(&pattern, &match_options)?;
                for (item, flag) in list.iter().zip(selected.iter_mut()) {
                    if compiled.matches(item.as_ref()) {
                        *flag = entry.include;
                    }
                }
            }
        }

        let mut seen = BTreeSet::new();
        Ok(list
            .iter()
            .zip(selected)
            .filter(|(_, keep)| *keep)
            .map(|(item, _)| item.as_ref().to_string())
            .filter(|item| seen.insert(item.clone()))
            .collect())
    }

    /// Finds paths on disk matching include and exclude patterns.
    ///
    /// Unrooted patterns are rooted at `default_root`, which falls back to
    /// the `system.defaultWorkingDirectory` variable and then to the working
    /// directory. A relative root resolves against the working directory.
    /// Each include pattern searches from its longest literal
    /// prefix; exclude patterns remove paths matched so far. The result is
    /// sorted.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid pattern or a failed traversal.
    pub fn find_match<P: AsRef<str>>(
        &self,
        default_root: Option<&str>,
        patterns: &[P],
        find_options: Option<&FindOptions>,
        match_options: Option<&MatchOptions>,
    ) -> Result<Vec<PathBuf>> {
        let default_root = match default_root.filter(|r| !r.is_empty()) {
            Some(root) => root.to_string(),
            None => self
                .get_variable("system.defaultWorkingDirectory")
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| self.cwd().to_string_lossy().into_owned()),
        };
        // traversal yields absolute paths
        let default_root = self.resolve([default_root]).to_string_lossy().into_owned();
        let find_options = find_options.copied().unwrap_or_default();
        let options = match_options.copied().unwrap_or_default();
        let match_options = literal_options(&options);
        self.debug(format!("defaultRoot: '{default_root}'"));

        let mut results: BTreeMap<String, String> = BTreeMap::new();
        for raw in patterns {
            let raw = raw.as_ref();
            self.debug(format!("pattern: '{raw}'"));
            let Some(entry) = parse_pattern(raw, &options) else {
                self.debug("skipping empty or comment pattern");
                continue;
            };

            for pattern in &entry.patterns {
                let base_only = options.match_base && !is_rooted(pattern) && is_basename_only(pattern);
                if entry.include {
                    self.include_matches(
                        &default_root,
                        pattern,
                        base_only,
                        &find_options,
                        &match_options,
                        &mut results,
                    )?;
                } else {
                    let pattern = if base_only {
                        pattern.clone()
                    } else {
                        ensure_pattern_rooted(&default_root, pattern)
                    };
                    self.debug(format!("exclude pattern: '{pattern}'"));
                    let compiled = Pattern::new(&pattern, &match_options)?;
                    let before = results.len();
                    results.retain(|_, path| !compiled.matches(path));
                    self.debug(format!("{} matches removed", before - results.len()));
                }
            }
        }

        let mut found: Vec<String> = results.into_values().collect();
        found.sort();
        self.debug(format!("{} final results", found.len()));
        Ok(found.into_iter().map(PathBuf::from).collect())
    }

    fn include_matches(
        &self,
        default_root: &str,
        pattern: &str,
        base_only: bool,
        find_options: &FindOptions,
        match_options: &MatchOptions,
        results: &mut BTreeMap<String, String>,
    ) -> Result<()> {
        let (find_path, adjusted, stat_only) = if base_only {
            (default_root.to_string(), pattern.to_string(), false)
        } else {
            let rooted = ensure_pattern_rooted(default_root, pattern);
            let prefix_options = MatchOptions {
                nocase: false,
                ..*match_options
            };
            let parsed = Pattern::new(&rooted, &prefix_options)?;
            let (literals, all_literal) = parsed.literal_prefix();
            (literal_path(&literals), rooted, all_literal)
        };
        self.debug(format!("include pattern: '{adjusted}'"));

        if find_path.is_empty() {
            self.debug("skipping pattern without a literal root");
            return Ok(());
        }
        self.debug(format!("findPath: '{find_path}'"));
        self.debug(format!("statOnly: '{stat_only}'"));

        let mut add = |path: String| {
            let key = if cfg!(windows) {
                path.to_uppercase()
            } else {
                path.clone()
            };
            results.entry(key).or_insert(path);
        };

        if stat_only {
            if self.exist(&find_path)? {
                add(find_path);
            }
            return Ok(());
        }

        let compiled = Pattern::new(&adjusted, match_options)?;
        let mut count = 0usize;
        for path in self.find(&find_path, Some(find_options))? {
            let path = path.to_string_lossy().into_owned();
            if compiled.matches(&path) {
                count += 1;
                add(path);
            }
        }
        self.debug(format!("{count} matches"));
        Ok(())
    }
}

/// Joins literal segments back into a path, keeping a bare root.
fn literal_path(segments: &[&str]) -> String {
    let mut path = segments.join("/");
    if segments.len() == 1 && segments[0].is_empty() {
        path.push('/');
    }
    if cfg!(windows) && path.len() == 2 && path.ends_with(':') {
        path.push('/');
    }
    path
}
