//! Brace expansion: `a{b,c}d` → `abd`, `acd`; `{1..3}` → `1`, `2`, `3`.

/// Expands braces in a pattern.
///
/// Supports comma lists (nested), numeric sequences with optional step and
/// zero padding, and single-character sequences. Braces without a comma or
/// sequence are kept literally, as are escaped braces.
///
/// ```
/// use task_lib::glob::brace_expand;
///
/// assert_eq!(brace_expand("*.{js,ts}"), vec!["*.js", "*.ts"]);
/// assert_eq!(brace_expand("v{1..3}"), vec!["v1", "v2", "v3"]);
/// assert_eq!(brace_expand("{a}"), vec!["{a}"]);
/// ```
#[must_use]
pub fn brace_expand(pattern: &str) -> Vec<String> {
    let chars: Vec<char> = pattern.chars().collect();
    expand(&chars)
}

fn expand(chars: &[char]) -> Vec<String> {
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '{' => {
                if let Some(close) = matching_close(chars, i)
                    && let Some(options) = body_options(&chars[i + 1..close])
                {
                    let pre: String = chars[..i].iter().collect();
                    let posts = expand(&chars[close + 1..]);
                    let mut out = Vec::new();
                    for option in options {
                        for post in &posts {
                            out.push(format!("{pre}{option}{post}"));
                        }
                    }
                    return out;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    vec![chars.iter().collect()]
}

fn matching_close(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '{' => depth += 1,
            '}' => {
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

/// Alternatives for a brace body, or `None` if the body is not expandable.
fn body_options(body: &[char]) -> Option<Vec<String>> {
    let parts = split_top_level(body);
    if parts.len() > 1 {
        return Some(parts.iter().flat_map(|p| expand(p)).collect());
    }
    let text: String = body.iter().collect();
    sequence(&text)
}

fn split_top_level(body: &[char]) -> Vec<&[char]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            '\\' => i += 1,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&body[start.min(body.len())..]);
    parts
}

fn sequence(text: &str) -> Option<Vec<String>> {
    let pieces: Vec<&str> = text.split("..").collect();
    if !(2..=3).contains(&pieces.len()) {
        return None;
    }
    let step = match pieces.get(2) {
        Some(s) => s.parse::<i64>().ok()?.unsigned_abs().max(1),
        None => 1,
    };

    if let (Ok(start), Ok(end)) = (pieces[0].parse::<i64>(), pieces[1].parse::<i64>()) {
        let width = if has_padding(pieces[0]) || has_padding(pieces[1]) {
            pieces[0].len().max(pieces[1].len())
        } else {
            0
        };
        let values = stepped(start, end, step);
        return Some(
            values
                .into_iter()
                .map(|n| {
                    if n < 0 {
                        format!("-{:0>w$}", n.unsigned_abs(), w = width.saturating_sub(1))
                    } else {
                        format!("{n:0>width$}")
                    }
                })
                .collect(),
        );
    }

    let mut a = pieces[0].chars();
    let mut b = pieces[1].chars();
    match (a.next(), a.next(), b.next(), b.next()) {
        (Some(start), None, Some(end), None) => Some(
            stepped(i64::from(u32::from(start)), i64::from(u32::from(end)), step)
                .into_iter()
                .filter_map(|c| u32::try_from(c).ok().and_then(char::from_u32))
                .map(String::from)
                .collect(),
        ),
        _ => None,
    }
}

fn has_padding(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    digits.len() > 1 && digits.starts_with('0')
}

fn stepped(start: i64, end: i64, step: u64) -> Vec<i64> {
    let step = i64::try_from(step).unwrap_or(i64::MAX);
    let mut out = Vec::new();
    let mut n = start;
    if start <= end {
        while n <= end {
            out.push(n);
            n = n.saturating_add(step);
            if n == i64::MAX {
                break;
            }
        }
    } else {
        while n >= end {
            out.push(n);
            n = n.saturating_sub(step);
            if n == i64::MIN {
                break;
            }
        }
    }
    out
}
