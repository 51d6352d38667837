//! Exclude globs for scans of the target tree.
//!
//! Supported syntax: `*` (within a segment), `**` (across segments), `?`, and
//! `[...]` classes. A pattern without `/` matches at any depth. A pattern that
//! does not compile to a valid regex is matched literally instead.

use regex::Regex;

/// Directories never worth descending into when scanning a target.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git/**", "node_modules/**", "target/**", ".trellis/**"];

#[derive(Debug, Clone)]
enum Rule {
    Pattern(Regex),
    Literal(String),
}

impl Rule {
    fn matches(&self, path: &str) -> bool {
        match self {
            Rule::Pattern(re) => re.is_match(path),
            Rule::Literal(lit) => {
                path == lit
                    || path.ends_with(&format!("/{lit}"))
                    || path.starts_with(&format!("{lit}/"))
            }
        }
    }
}

/// A set of exclude globs matched against `/`-separated relative paths.
#[derive(Debug, Clone, Default)]
pub struct ExcludeMatcher {
    rules: Vec<Rule>,
}

impl ExcludeMatcher {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .filter_map(|p| {
                let pattern = p.as_ref().trim().trim_start_matches("./");
                if pattern.is_empty() {
                    return None;
                }
                Some(match Regex::new(&glob_to_regex(pattern)) {
                    Ok(re) => Rule::Pattern(re),
                    Err(err) => {
                        tracing::debug!("exclude '{pattern}' matched literally: {err}");
                        Rule::Literal(pattern.trim_matches('/').to_string())
                    }
                })
            })
            .collect();
        Self { rules }
    }

    /// [`DEFAULT_EXCLUDES`] followed by `extra`.
    pub fn with_defaults<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns: Vec<String> = DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect();
        patterns.extend(extra.into_iter().map(|p| p.as_ref().to_string()));
        Self::new(patterns)
    }

    pub fn is_excluded(&self, relative_path: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(relative_path))
    }
}

/// Translate a glob into an anchored regex.
pub fn glob_to_regex(pattern: &str) -> String {
    let anywhere = !pattern.trim_end_matches('/').contains('/');
    let pattern = pattern.trim_start_matches('/');
    let mut out = String::from("^");
    if anywhere {
        out.push_str("(?:.*/)?");
    }

    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                // Pass the class through; an unterminated one fails to compile.
                out.push('[');
                if chars.get(i + 1) == Some(&'!') {
                    out.push('^');
                    i += 1;
                }
            }
            ']' => out.push(']'),
            '/' if i + 1 == chars.len() => out.push_str("(?:/.*)?"),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    if !pattern.ends_with('/') {
        // A matched directory excludes everything beneath it.
        out.push_str("(?:/.*)?");
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_stays_within_segment() {
        let m = ExcludeMatcher::new(["docs/*.md"]);
        assert!(m.is_excluded("docs/a.md"));
        assert!(!m.is_excluded("docs/sub/a.md"));
        assert!(!m.is_excluded("other/docs/a.md"));
    }

    #[test]
    fn double_star_crosses_segments() {
        let m = ExcludeMatcher::new(["vendor/**"]);
        assert!(m.is_excluded("vendor/a/b/c.md"));
        assert!(!m.is_excluded("src/vendor.md"));

        let m = ExcludeMatcher::new(["**/generated/*.md"]);
        assert!(m.is_excluded("generated/x.md"));
        assert!(m.is_excluded("a/b/generated/x.md"));
    }

    #[test]
    fn bare_name_matches_at_any_depth() {
        let m = ExcludeMatcher::new(["node_modules"]);
        assert!(m.is_excluded("node_modules"));
        assert!(m.is_excluded("web/node_modules/pkg/index.js"));
        assert!(!m.is_excluded("node_modules_backup/x"));
    }

    #[test]
    fn question_mark_and_classes() {
        let m = ExcludeMatcher::new(["log?.txt", "[ab].md", "[!c]x.md"]);
        assert!(m.is_excluded("log1.txt"));
        assert!(!m.is_excluded("log10.txt"));
        assert!(m.is_excluded("a.md"));
        assert!(!m.is_excluded("c.md"));
        assert!(m.is_excluded("dx.md"));
        assert!(!m.is_excluded("cx.md"));
    }

    #[test]
    fn invalid_glob_falls_back_to_literal() {
        let m = ExcludeMatcher::new(["weird[name"]);
        assert!(m.is_excluded("weird[name"));
        assert!(m.is_excluded("deep/weird[name"));
        assert!(!m.is_excluded("weirdname"));
    }

    #[test]
    fn defaults_skip_state_and_vcs_dirs() {
        let m = ExcludeMatcher::with_defaults(["*.bak"]);
        assert!(m.is_excluded(".git/config"));
        assert!(m.is_excluded(".trellis/manifest.json"));
        assert!(m.is_excluded("notes/old.bak"));
        assert!(!m.is_excluded("CLAUDE.md.trellis-new"));
    }

    #[test]
    fn empty_matcher_excludes_nothing() {
        let m = ExcludeMatcher::default();
        assert!(!m.is_excluded("anything"));
    }
}
