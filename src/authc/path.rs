//! Ant-style path patterns (`?`, `*`, `**`) for matching the login endpoint.

use regex::Regex;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct PathPattern {
    pattern: String,
    regex: Option<Regex>,
}

impl PathPattern {
    /// Compile an ant-style pattern. An invalid pattern never matches.
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let normalized = trim_trailing_slash(pattern.trim());
        let regex = match Regex::new(&to_regex(&normalized)) {
            Ok(regex) => Some(regex),
            Err(err) => {
                warn!("Invalid path pattern {pattern:?}, it will never match: {err}");
                None
            }
        };
        Self {
            pattern: normalized,
            regex,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.regex
            .as_ref()
            .is_some_and(|regex| regex.is_match(&normalize(path)))
    }
}

/// Strip the query and fragment and a trailing slash (except for the root).
fn normalize(path: &str) -> String {
    trim_trailing_slash(path.split(['?', '#']).next().unwrap_or_default().trim())
}

fn trim_trailing_slash(path: &str) -> String {
    if path.len() > 1 {
        path.trim_end_matches('/').to_string()
    } else {
        path.to_string()
    }
}

fn to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                // `/**` also matches the bare parent path
                if out.ends_with('/') && chars.peek().is_none() {
                    out.pop();
                    out.push_str("(/.*)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}
