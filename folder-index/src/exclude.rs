//! Exclusion rule matching.
//!
//! Patterns are globs matched against the whole slash-separated path
//! relative to a project root. `**` matches any run of characters including
//! `/`, and a `**/` component may also match nothing, so `**/out` covers a
//! top-level `out`. `*` matches any run without `/`, `?` matches exactly one
//! character, and everything else (including `.`) is literal. Matching is
//! case-sensitive.

use regex::RegexSet;
use tracing::warn;

use crate::config::ExclusionRules;

/// Enabled exclusion rules compiled into a single matcher.
#[derive(Debug, Clone)]
pub struct ExclusionMatcher {
    set: RegexSet,
    patterns: Vec<String>,
}

impl ExclusionMatcher {
    /// Compile the enabled rules of `rules`. Disabled rules are dropped.
    pub fn new(rules: &ExclusionRules) -> Self {
        let patterns: Vec<String> = rules
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(pattern, _)| pattern.clone())
            .collect();

        match RegexSet::new(patterns.iter().map(|pattern| glob_to_regex(pattern))) {
            Ok(set) => Self { set, patterns },
            Err(e) => {
                warn!("Failed to compile exclusion rules, excluding nothing: {e}");
                Self::empty()
            }
        }
    }

    /// A matcher that excludes nothing.
    pub fn empty() -> Self {
        Self {
            set: RegexSet::empty(),
            patterns: Vec::new(),
        }
    }

    /// Whether `relative_path` is excluded.
    ///
    /// The path is tried as given and with a trailing `/`, so directory-only
    /// patterns such as `build/` match the directory `build`.
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        if self.set.is_empty() {
            return false;
        }
        self.set.is_match(relative_path) || self.set.is_match(&format!("{relative_path}/"))
    }

    /// Patterns that made it into the matcher.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for ExclusionMatcher {
    fn default() -> Self {
        Self::empty()
    }
}

/// One-shot check of `relative_path` against `rules`.
///
/// Compiles the rules on every call; hold an [`ExclusionMatcher`] when
/// checking many paths.
pub fn is_excluded(relative_path: &str, rules: &ExclusionRules) -> bool {
    ExclusionMatcher::new(rules).is_excluded(relative_path)
}

/// Anchored regex source for a glob pattern.
fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^");
    let mut buf = [0u8; 4];
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                let after_separator = i > 0 && chars[i - 1] == '/';
                match chars.get(i + 2) {
                    // Leading or inner `**/`: zero or more whole segments.
                    Some('/') if i == 0 || after_separator => {
                        out.push_str("(?:.*/)?");
                        i += 3;
                    }
                    // Trailing `/**`: the directory itself or anything below.
                    None if after_separator => {
                        out.pop();
                        out.push_str("(?:/.*)?");
                        i += 2;
                    }
                    _ => {
                        out.push_str(".*");
                        i += 2;
                    }
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push('.');
                i += 1;
            }
            c => {
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                i += 1;
            }
        }
    }

    out.push('$');
    out
}
