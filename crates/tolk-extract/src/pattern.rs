use crate::error::ExtractError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static WILDCARD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[?*]+/?").unwrap());

/// A path pattern matched against slash-separated paths relative to the
/// extraction root.
///
/// `?` matches one character and `*` one or more characters within a path
/// segment, `**/` any number of leading directories and `**` anything
/// including slashes. Patterns always match the whole path; a leading `^` or
/// `./` is accepted and ignored.
#[derive(Clone, Debug)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

fn wildcard(token: &str) -> Option<&'static str> {
    Some(match token {
        "?" => "[^/]",
        "?/" => "[^/]/",
        "*" => "[^/]+",
        "*/" => "[^/]+/",
        "**/" => "(?:.+/)*?",
        "**" => "(?:.+/)*?[^/]+",
        _ => return None,
    })
}

impl PathPattern {
    pub fn new(pattern: &str) -> Result<Self, ExtractError> {
        let body = pattern
            .strip_prefix('^')
            .or_else(|| pattern.strip_prefix("./"))
            .unwrap_or(pattern);

        let mut buf = String::from("^");
        let mut last = 0;
        for m in WILDCARD_RE.find_iter(body) {
            buf.push_str(&regex::escape(&body[last..m.start()]));
            let symbol = wildcard(m.as_str()).ok_or_else(|| ExtractError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: format!("unsupported wildcard '{}'", m.as_str()),
            })?;
            buf.push_str(symbol);
            last = m.end();
        }
        buf.push_str(&regex::escape(&body[last..]));
        buf.push('$');

        let regex = Regex::new(&buf).map_err(|e| ExtractError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Whether `path` (relative, forward slashes) matches.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for PathPattern {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for PathPattern {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("**.py", "foo.py", true)]
    #[case("**.py", "app/views/foo.py", true)]
    #[case("**.py", "foo.pyc", false)]
    #[case("*.py", "foo.py", true)]
    #[case("*.py", "app/foo.py", false)]
    #[case("**/templates/**.html", "app/templates/index.html", true)]
    #[case("**/templates/**.html", "app/templates/nested/index.html", true)]
    #[case("**/templates/**.html", "templates/index.html", true)]
    #[case("**/templates/**.html", "app/templates.html", false)]
    #[case("jinja2/*.html", "jinja2/foo.html", true)]
    #[case("jinja2/*.html", "jinja2/sub/foo.html", false)]
    #[case("./foo.?s", "foo.js", true)]
    #[case("^foo.?s", "foo.ts", true)]
    #[case("foo.?s", "foo.jss", false)]
    #[case("media/**/*.js", "media/js/app.js", true)]
    #[case("media/**/*.js", "media/app.js", true)]
    fn test_matches(#[case] pattern: &str, #[case] path: &str, #[case] expected: bool) {
        let pattern = PathPattern::new(pattern).unwrap();
        assert_eq!(pattern.matches(path), expected, "{pattern} vs {path}");
    }

    #[test]
    fn test_literal_characters_are_escaped() {
        let pattern = PathPattern::new("a+b.(py)").unwrap();
        assert!(pattern.matches("a+b.(py)"));
        assert!(!pattern.matches("aab.(py)"));
    }

    #[test]
    fn test_invalid_wildcard() {
        assert!(matches!(
            PathPattern::new("***.py"),
            Err(ExtractError::InvalidPattern { .. })
        ));
    }
}
