//! Glob pattern compilation and matching.
//!
//! Patterns follow minimatch conventions: `*`, `?`, `[...]`, `**`
//! globstar, extglob groups, brace expansion, leading `!` negation and `#`
//! comments, each switchable through [`MatchOptions`]. Paths are matched
//! segment by segment on `/`; on Windows `\` is treated as a separator too.

mod brace;

pub use brace::brace_expand;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Options controlling glob matching.
///
/// The [`Default`] is what the task helpers use: dot files match, braces
/// are not expanded, and matching is case-insensitive only on Windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOptions {
    /// Log the compiled pattern through `tracing`.
    pub debug: bool,
    /// Do not expand `{a,b}` and `{1..3}`.
    pub nobrace: bool,
    /// Treat `**` like `*`.
    pub noglobstar: bool,
    /// Let wildcards match names starting with `.`.
    pub dot: bool,
    /// Disable extglob groups such as `+(a|b)`.
    pub noext: bool,
    /// Match case-insensitively.
    pub nocase: bool,
    /// Return the pattern itself when nothing matches.
    pub nonull: bool,
    /// Match slash-free patterns against the basename of each path.
    pub match_base: bool,
    /// Do not treat a leading `#` as a comment.
    pub nocomment: bool,
    /// Do not treat a leading `!` as negation.
    pub nonegate: bool,
    /// Invert what negated patterns return.
    pub flip_negate: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            debug: false,
            nobrace: true,
            noglobstar: false,
            dot: true,
            noext: false,
            nocase: cfg!(windows),
            nonull: false,
            match_base: false,
            nocomment: false,
            nonegate: false,
            flip_negate: false,
        }
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Magic(Matcher),
    GlobStar,
}

#[derive(Debug, Clone)]
struct Matcher {
    regex: Regex,
    negated: bool,
    leading_dot: bool,
}

impl Matcher {
    fn matches(&self, name: &str, dot: bool) -> bool {
        if !self.leading_dot {
            if name == "." || name == ".." {
                return false;
            }
            if !dot && name.starts_with('.') {
                return false;
            }
        }
        self.regex.is_match(name) != self.negated
    }
}

/// A compiled glob pattern.
///
/// ```
/// use task_lib::glob::{MatchOptions, Pattern};
///
/// let pattern = Pattern::new("src/**/*.rs", &MatchOptions::default())?;
/// assert!(pattern.matches("src/lib.rs"));
/// assert!(pattern.matches("src/glob/mod.rs"));
/// assert!(!pattern.matches("tests/lib.rs"));
/// # Ok::<(), task_lib::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    options: MatchOptions,
    set: Vec<Vec<Segment>>,
    negate: bool,
    comment: bool,
    empty: bool,
}

impl Pattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if a segment cannot be compiled,
    /// including `!(...)` groups that do not span a whole path segment.
    pub fn new(pattern: &str, options: &MatchOptions) -> Result<Self> {
        let mut compiled = Self {
            source: pattern.to_string(),
            options: *options,
            set: Vec::new(),
            negate: false,
            comment: false,
            empty: false,
        };

        if !options.nocomment && pattern.starts_with('#') {
            compiled.comment = true;
            return Ok(compiled);
        }
        if pattern.is_empty() {
            compiled.empty = true;
            return Ok(compiled);
        }

        let mut body = pattern;
        if !options.nonegate {
            let bangs = body.chars().take_while(|&c| c == '!').count();
            compiled.negate = bangs % 2 == 1;
            body = &body[bangs..];
        }

        let normalized = if cfg!(windows) {
            body.replace('\\', "/")
        } else {
            body.to_string()
        };
        let expanded = if options.nobrace {
            vec![normalized]
        } else {
            brace_expand(&normalized)
        };

        for alternative in expanded {
            let segments = split_path(&alternative)
                .into_iter()
                .map(|part| compile_segment(part, pattern, options))
                .collect::<Result<Vec<_>>>()?;
            compiled.set.push(segments);
        }

        if options.debug {
            tracing::debug!(pattern, set = ?compiled.set, "compiled glob");
        }
        Ok(compiled)
    }

    /// The pattern as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern was negated with a leading `!`.
    #[must_use]
    pub fn is_negated(&self) -> bool {
        self.negate
    }

    /// Whether the pattern is a `#` comment.
    #[must_use]
    pub fn is_comment(&self) -> bool {
        self.comment
    }

    /// Tests a path against the pattern.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        if self.comment {
            return false;
        }
        if self.empty {
            return path.is_empty();
        }

        let path = if cfg!(windows) {
            path.replace('\\', "/")
        } else {
            path.to_string()
        };
        let file = split_path(&path);
        let basename = file.iter().rev().find(|s| !s.is_empty()).copied();

        let hit = self.set.iter().any(|segments| {
            if self.options.match_base && segments.len() == 1 {
                basename.is_some_and(|name| self.match_segments(&[name], segments))
            } else {
                self.match_segments(&file, segments)
            }
        });

        match (hit, self.options.flip_negate) {
            (true, true) => true,
            (true, false) => !self.negate,
            (false, true) => false,
            (false, false) => self.negate,
        }
    }

    /// Leading literal segments of the first alternative, unescaped, and
    /// whether every segment is literal.
    pub(crate) fn literal_prefix(&self) -> (Vec<&str>, bool) {
        let Some(segments) = self.set.first() else {
            return (Vec::new(), true);
        };
        let literals: Vec<&str> = segments
            .iter()
            .map_while(|s| match s {
                Segment::Literal(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        let all_literal = literals.len() == segments.len();
        (literals, all_literal)
    }

    fn match_segments(&self, file: &[&str], pattern: &[Segment]) -> bool {
        let dot = self.options.dot;
        let skippable = |name: &str| name != "." && name != ".." && (dot || !name.starts_with('.'));

        let (mut fi, mut pi) = (0, 0);
        while fi < file.len() && pi < pattern.len() {
            let name = file[fi];
            match &pattern[pi] {
                Segment::GlobStar => {
                    let rest = &pattern[pi + 1..];
                    if rest.is_empty() {
                        return file[fi..].iter().all(|f| skippable(f));
                    }
                    let mut fr = fi;
                    while fr < file.len() {
                        if self.match_segments(&file[fr..], rest) {
                            return true;
                        }
                        if !skippable(file[fr]) {
                            break;
                        }
                        fr += 1;
                    }
                    return false;
                }
                Segment::Literal(text) => {
                    let equal = if self.options.nocase {
                        text.to_lowercase() == name.to_lowercase()
                    } else {
                        text == name
                    };
                    if !equal {
                        return false;
                    }
                }
                Segment::Magic(matcher) => {
                    if !matcher.matches(name, dot) {
                        return false;
                    }
                }
            }
            fi += 1;
            pi += 1;
        }

        if fi == file.len() {
            // a trailing globstar also matches its parent
            pattern[pi..].iter().all(|s| matches!(s, Segment::GlobStar))
        } else {
            // only a trailing slash may remain
            fi == file.len() - 1 && file[fi].is_empty()
        }
    }
}

/// Applies a single pattern to a list, keeping list order.
///
/// With `nonull`, the pattern itself is returned when nothing matches.
///
/// # Errors
///
/// Returns [`Error::InvalidPattern`] if the pattern cannot be compiled.
pub fn match_list<S: AsRef<str>>(
    list: &[S],
    pattern: &str,
    options: &MatchOptions,
) -> Result<Vec<String>> {
    let compiled = Pattern::new(pattern, options)?;
    let mut matched: Vec<String> = list
        .iter()
        .map(AsRef::as_ref)
        .filter(|item| compiled.matches(item))
        .map(str::to_string)
        .collect();
    if options.nonull && matched.is_empty() {
        matched.push(pattern.to_string());
    }
    Ok(matched)
}

/// Splits on runs of `/`, keeping a leading and trailing empty segment.
fn split_path(path: &str) -> Vec<&str> {
    let parts: Vec<&str> = path.split('/').collect();
    let last = parts.len() - 1;
    parts
        .into_iter()
        .enumerate()
        .filter(|(i, part)| !part.is_empty() || *i == 0 || *i == last)
        .map(|(_, part)| part)
        .collect()
}

fn invalid(pattern: &str, reason: impl Into<String>) -> Error {
    Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

fn compile_segment(part: &str, pattern: &str, options: &MatchOptions) -> Result<Segment> {
    if part == "**" && !options.noglobstar {
        return Ok(Segment::GlobStar);
    }

    let chars: Vec<char> = part.chars().collect();
    let leading_dot = chars.first() == Some(&'.');

    // a whole-segment !(...) is the only negative group a regex can express
    if !options.noext
        && chars.len() > 2
        && chars[0] == '!'
        && chars[1] == '('
        && group_end(&chars, 1) == Some(chars.len() - 1)
    {
        let inner = compile_alternatives(&chars[2..chars.len() - 1], pattern, options)?;
        return Ok(Segment::Magic(Matcher {
            regex: build_regex(&inner, pattern, options)?,
            negated: true,
            leading_dot,
        }));
    }

    let fragment = compile_fragment(&chars, pattern, options)?;
    if !fragment.magic {
        return Ok(Segment::Literal(fragment.literal));
    }
    Ok(Segment::Magic(Matcher {
        regex: build_regex(&fragment.regex, pattern, options)?,
        negated: false,
        leading_dot,
    }))
}

fn build_regex(body: &str, pattern: &str, options: &MatchOptions) -> Result<Regex> {
    RegexBuilder::new(&format!("^(?:{body})$"))
        .case_insensitive(options.nocase)
        .build()
        .map_err(|e| invalid(pattern, e.to_string()))
}

struct Fragment {
    regex: String,
    literal: String,
    magic: bool,
}

fn compile_fragment(chars: &[char], pattern: &str, options: &MatchOptions) -> Result<Fragment> {
    let escapes = !cfg!(windows);
    let mut out = Fragment {
        regex: String::new(),
        literal: String::new(),
        magic: false,
    };
    let push_literal = |out: &mut Fragment, c: char| {
        out.regex.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
        out.literal.push(c);
    };

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if !options.noext && matches!(c, '?' | '*' | '+' | '@' | '!') && next == Some('(') {
            if let Some(end) = group_end(chars, i + 1) {
                if c == '!' {
                    return Err(invalid(
                        pattern,
                        "!(...) is only supported as a whole path segment",
                    ));
                }
                let inner = compile_alternatives(&chars[i + 2..end], pattern, options)?;
                let quantifier = match c {
                    '?' => "?",
                    '*' => "*",
                    '+' => "+",
                    _ => "",
                };
                out.regex.push_str(&format!("(?:{inner}){quantifier}"));
                out.magic = true;
                i = end + 1;
                continue;
            }
        }

        match c {
            '\\' if escapes => {
                match next {
                    Some(escaped) => push_literal(&mut out, escaped),
                    None => push_literal(&mut out, '\\'),
                }
                i += 2;
                continue;
            }
            '*' => {
                while chars.get(i + 1) == Some(&'*') {
                    i += 1;
                }
                out.regex.push_str(".*");
                out.magic = true;
            }
            '?' => {
                out.regex.push('.');
                out.magic = true;
            }
            '[' => match parse_class(chars, i, escapes) {
                Some((class, end)) => {
                    out.regex.push_str(&class);
                    out.magic = true;
                    i = end;
                    continue;
                }
                None => push_literal(&mut out, '['),
            },
            _ => push_literal(&mut out, c),
        }
        i += 1;
    }
    Ok(out)
}

fn compile_alternatives(chars: &[char], pattern: &str, options: &MatchOptions) -> Result<String> {
    let mut alternatives = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' if !cfg!(windows) => i += 1,
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => {
                alternatives.push(compile_fragment(&chars[start..i], pattern, options)?.regex);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    alternatives.push(compile_fragment(&chars[start.min(chars.len())..], pattern, options)?.regex);
    Ok(alternatives.join("|"))
}

/// Index of the `)` closing the group opened at `open`.
fn group_end(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '\\' if !cfg!(windows) => i += 1,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

const POSIX_CLASSES: &[&str] = &[
    "alnum", "alpha", "ascii", "blank", "cntrl", "digit", "graph", "lower", "print", "punct",
    "space", "upper", "word", "xdigit",
];

/// Translates `[...]` starting at `open` into a regex class.
/// Returns the class and the index just past `]`, or `None` if unterminated.
fn parse_class(chars: &[char], open: usize, escapes: bool) -> Option<(String, usize)> {
    let mut i = open + 1;
    let negated = matches!(chars.get(i), Some('!' | '^'));
    if negated {
        i += 1;
    }

    let mut body = String::new();
    let mut first = true;
    loop {
        let c = *chars.get(i)?;
        match c {
            ']' if !first => break,
            '[' if chars.get(i + 1) == Some(&':') => {
                let rest: String = chars[i + 2..].iter().collect();
                match rest.find(":]") {
                    Some(end) if POSIX_CLASSES.contains(&&rest[..end]) => {
                        body.push_str(&format!("[:{}:]", &rest[..end]));
                        i += 2 + rest[..end].chars().count() + 2;
                    }
                    _ => {
                        body.push_str("\\[");
                        i += 1;
                    }
                }
            }
            '\\' if escapes && i + 1 < chars.len() => {
                body.push('\\');
                body.push(chars[i + 1]);
                i += 2;
            }
            '-' => {
                body.push('-');
                i += 1;
            }
            '[' | ']' | '\\' | '^' | '&' | '~' => {
                body.push('\\');
                body.push(c);
                i += 1;
            }
            _ => {
                body.push(c);
                i += 1;
            }
        }
        first = false;
    }

    let caret = if negated { "^" } else { "" };
    Some((format!("[{caret}{body}]"), i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> MatchOptions {
        MatchOptions {
            nocase: false,
            ..MatchOptions::default()
        }
    }

    fn is_match(pattern: &str, path: &str, options: &MatchOptions) -> bool {
        Pattern::new(pattern, options).unwrap().matches(path)
    }

    #[test]
    fn star_and_question_stay_within_segment() {
        let o = opts();
        assert!(is_match("*.txt", "a.txt", &o));
        assert!(!is_match("*.txt", "dir/a.txt", &o));
        assert!(is_match("/src/?.rs", "/src/a.rs", &o));
        assert!(!is_match("/src/?.rs", "/src/ab.rs", &o));
    }

    #[test]
    fn globstar_spans_segments() {
        let o = opts();
        assert!(is_match("/r/**/*.rs", "/r/a.rs", &o));
        assert!(is_match("/r/**/*.rs", "/r/x/y/a.rs", &o));
        assert!(is_match("/r/**", "/r", &o));
        assert!(is_match("/r/**", "/r/x/y", &o));
        assert!(!is_match("/r/**", "/other/x", &o));
    }

    #[test]
    fn globstar_is_plain_star_with_noglobstar() {
        let o = MatchOptions {
            noglobstar: true,
            ..opts()
        };
        assert!(is_match("/r/**", "/r/x", &o));
        assert!(!is_match("/r/**", "/r/x/y", &o));
    }

    #[test]
    fn dot_option_controls_hidden_names() {
        let hidden = MatchOptions { dot: false, ..opts() };
        assert!(!is_match("*", ".git", &hidden));
        assert!(!is_match("/r/**/a", "/r/.git/a", &hidden));
        assert!(is_match(".*", ".git", &hidden));

        assert!(is_match("*", ".git", &opts()));
        assert!(is_match("/r/**/a", "/r/.git/a", &opts()));
        assert!(!is_match("*", "..", &opts()));
    }

    #[test]
    fn character_classes() {
        let o = opts();
        assert!(is_match("file[0-9].log", "file7.log", &o));
        assert!(!is_match("file[!0-9].log", "file7.log", &o));
        assert!(is_match("file[!0-9].log", "fileX.log", &o));
        assert!(is_match("[[:upper:]]*", "Readme", &o));
        assert!(is_match("[]]", "]", &o));
        assert!(is_match("a[", "a[", &o));
    }

    #[cfg(unix)]
    #[test]
    fn escapes_make_literals() {
        let o = opts();
        assert!(is_match(r"a\*b", "a*b", &o));
        assert!(!is_match(r"a\*b", "axb", &o));
        let p = Pattern::new(r"/x/a\*b/*", &o).unwrap();
        assert_eq!(p.literal_prefix(), (vec!["", "x", "a*b"], false));
    }

    #[test]
    fn extglob_groups() {
        let o = opts();
        assert!(is_match("*.+(js|ts)", "a.ts", &o));
        assert!(is_match("a?(b)c", "ac", &o));
        assert!(is_match("a?(b)c", "abc", &o));
        assert!(is_match("@(foo|bar).txt", "bar.txt", &o));
        assert!(!is_match("@(foo|bar).txt", "baz.txt", &o));
        assert!(is_match("/d/!(*.tmp)", "/d/keep.txt", &o));
        assert!(!is_match("/d/!(*.tmp)", "/d/drop.tmp", &o));
        assert!(Pattern::new("a!(b)c", &o).is_err());

        let noext = MatchOptions { noext: true, ..opts() };
        assert!(is_match("+(a)", "+(a)", &noext));
    }

    #[test]
    fn braces_only_when_enabled() {
        let braces = MatchOptions {
            nobrace: false,
            ..opts()
        };
        assert!(is_match("*.{js,ts}", "a.ts", &braces));
        assert!(!is_match("*.{js,ts}", "a.ts", &opts()));
        assert!(is_match("*.{js,ts}", "a.{js,ts}", &opts()));
    }

    #[test]
    fn negation_comment_and_flip() {
        let o = opts();
        assert!(!is_match("!*.txt", "a.txt", &o));
        assert!(is_match("!*.txt", "a.rs", &o));
        assert!(is_match("!!*.txt", "a.txt", &o));
        assert!(!is_match("#*", "#x", &o));

        let nonegate = MatchOptions { nonegate: true, ..opts() };
        assert!(is_match("!a", "!a", &nonegate));
        let nocomment = MatchOptions { nocomment: true, ..opts() };
        assert!(is_match("#*", "#x", &nocomment));

        let flip = MatchOptions {
            flip_negate: true,
            ..opts()
        };
        assert!(is_match("!*.txt", "a.txt", &flip));
        assert!(!is_match("!*.txt", "a.rs", &flip));
    }

    #[test]
    fn match_base_and_nocase() {
        let base = MatchOptions {
            match_base: true,
            ..opts()
        };
        assert!(is_match("*.rs", "/deep/tree/lib.rs", &base));
        assert!(!is_match("tree/*.rs", "/deep/tree/lib.rs", &base));

        let nocase = MatchOptions { nocase: true, ..opts() };
        assert!(is_match("/SRC/*.RS", "/src/lib.rs", &nocase));
        assert!(!is_match("/SRC/*.RS", "/src/lib.rs", &opts()));
    }

    #[test]
    fn trailing_slash_and_empty_pattern() {
        let o = opts();
        assert!(is_match("/a/b", "/a/b/", &o));
        assert!(is_match("/a//b", "/a/b", &o));
        assert!(is_match("", "", &o));
        assert!(!is_match("", "a", &o));
    }

    #[test]
    fn match_list_keeps_order_and_nonull() {
        let list = ["b.txt", "a.rs", "a.txt"];
        assert_eq!(
            match_list(&list, "*.txt", &opts()).unwrap(),
            vec!["b.txt", "a.txt"]
        );
        let nonull = MatchOptions { nonull: true, ..opts() };
        assert_eq!(match_list(&list, "*.md", &nonull).unwrap(), vec!["*.md"]);
    }

    #[test]
    fn literal_prefix_reports_stat_only() {
        let p = Pattern::new("/a/b/c.txt", &opts()).unwrap();
        assert_eq!(p.literal_prefix(), (vec!["", "a", "b", "c.txt"], true));
        let p = Pattern::new("/a/*/c.txt", &opts()).unwrap();
        assert_eq!(p.literal_prefix(), (vec!["", "a"], false));
    }
}
