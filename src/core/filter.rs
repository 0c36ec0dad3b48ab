//! Bucket name filter parsed from a `--prefix` argument
//!
//! `s3://<name-pattern>[/<sub-path>]` selects buckets whose name matches the
//! pattern and, in raw mode, restricts the object listing to keys starting
//! with the sub-path. Any other string is used verbatim as the name pattern.

use crate::error::{AnalyserError, Result};
use glob::{MatchOptions, Pattern as GlobPattern};

const SCHEME: &str = "s3://";

/// Characters that make a name pattern a glob
const GLOB_CHARS: [char; 4] = ['?', '*', '[', '!'];

/// Case-sensitive matching, `/` is an ordinary character
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Parsed bucket filter
#[derive(Debug, Clone)]
pub struct BucketFilter {
    raw: String,
    pattern: String,
    sub_path: Option<String>,
    glob: Option<GlobPattern>,
}

impl BucketFilter {
    /// Parse a prefix argument
    pub fn parse(prefix: &str) -> Result<Self> {
        let (pattern, sub_path) = match prefix.strip_prefix(SCHEME) {
            Some(rest) if !rest.is_empty() && !rest.starts_with('/') => match rest.split_once('/')
            {
                Some((name, path)) if !path.is_empty() => (name, Some(path.to_string())),
                Some((name, _)) => (name, None),
                None => (rest, None),
            },
            _ => (prefix, None),
        };

        let glob = if is_glob(pattern) {
            let compiled = GlobPattern::new(&to_glob_syntax(pattern))
                .map_err(|e| AnalyserError::invalid_filter(prefix, e.to_string()))?;
            Some(compiled)
        } else {
            None
        };

        Ok(Self {
            raw: prefix.to_string(),
            pattern: pattern.to_string(),
            sub_path,
            glob,
        })
    }

    /// Parse an optional prefix argument
    pub fn parse_optional(prefix: Option<&str>) -> Result<Option<Self>> {
        prefix.map(Self::parse).transpose()
    }

    /// The argument as given
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Bucket name pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Object key prefix used by raw traversal
    pub fn sub_path(&self) -> Option<&str> {
        self.sub_path.as_deref()
    }

    /// Whether the name pattern contains glob syntax
    pub fn is_glob(&self) -> bool {
        self.glob.is_some()
    }

    /// Exact bucket name, when the pattern is not a glob
    pub fn exact_name(&self) -> Option<&str> {
        match self.glob {
            Some(_) => None,
            None => Some(&self.pattern),
        }
    }

    /// Check a bucket name against the pattern
    pub fn matches(&self, bucket: &str) -> bool {
        match &self.glob {
            Some(glob) => glob.matches_with(bucket, MATCH_OPTIONS),
            None => bucket == self.pattern,
        }
    }
}

/// Check if a pattern contains glob syntax
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(GLOB_CHARS)
}

/// Rewrite a shell-style name pattern into what `glob::Pattern` accepts.
///
/// Runs of `*` collapse to one `*` (bucket names have no path components) and
/// a `[` without a closing `]` is matched literally.
fn to_glob_syntax(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                out.push('*');
                while chars.get(i + 1) == Some(&'*') {
                    i += 1;
                }
            }
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.extend(&chars[i..=end]);
                    i = end;
                }
                None => out.push_str("[[]"),
            },
            c => out.push(c),
        }
        i += 1;
    }
    out
}

/// Index of the `]` closing the class opened at `start`. A `]` right after
/// `[` or `[!` is part of the class.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    (j..chars.len()).find(|&k| chars[k] == ']')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uri_with_sub_path() {
        let filter = BucketFilter::parse("s3://hm.samp*/logs/2024").unwrap();
        assert_eq!(filter.pattern(), "hm.samp*");
        assert_eq!(filter.sub_path(), Some("logs/2024"));
        assert!(filter.is_glob());
        assert_eq!(filter.exact_name(), None);
    }

    #[test]
    fn test_parse_uri_trailing_slash() {
        let filter = BucketFilter::parse("s3://demo/").unwrap();
        assert_eq!(filter.pattern(), "demo");
        assert_eq!(filter.sub_path(), None);
        assert_eq!(filter.exact_name(), Some("demo"));
    }

    #[test]
    fn test_parse_verbatim() {
        let filter = BucketFilter::parse("prod-*").unwrap();
        assert_eq!(filter.pattern(), "prod-*");
        assert!(filter.matches("prod-logs"));
        assert!(!filter.matches("dev-logs"));

        let filter = BucketFilter::parse("s3://").unwrap();
        assert_eq!(filter.pattern(), "s3://");
    }

    #[test]
    fn test_glob_matching_is_case_sensitive() {
        let filter = BucketFilter::parse("s3://Data*").unwrap();
        assert!(filter.matches("Data-lake"));
        assert!(!filter.matches("data-lake"));
    }

    #[test]
    fn test_character_classes() {
        let filter = BucketFilter::parse("s3://log-[ab]").unwrap();
        assert!(filter.matches("log-a"));
        assert!(!filter.matches("log-c"));

        let filter = BucketFilter::parse("s3://log-[!ab]").unwrap();
        assert!(filter.matches("log-c"));
        assert!(!filter.matches("log-a"));
    }

    #[test]
    fn test_exact_name_matches_only_itself() {
        let filter = BucketFilter::parse("s3://hm.samples").unwrap();
        assert!(!filter.is_glob());
        assert!(filter.matches("hm.samples"));
        assert!(!filter.matches("hm.samples2"));
    }

    #[test]
    fn test_repeated_stars_act_as_one() {
        let filter = BucketFilter::parse("s3://prod**").unwrap();
        assert!(filter.matches("prod"));
        assert!(filter.matches("prod-logs"));
        assert!(!filter.matches("dev-prod"));

        let filter = BucketFilter::parse("s3://logs-**-eu").unwrap();
        assert!(filter.matches("logs-app-eu"));
        assert!(filter.matches("logs--eu"));
        assert!(!filter.matches("logs-app-us"));
    }

    #[test]
    fn test_unclosed_bracket_is_literal() {
        let filter = BucketFilter::parse("s3://a[").unwrap();
        assert!(filter.is_glob());
        assert!(filter.matches("a["));
        assert!(!filter.matches("a"));

        let filter = BucketFilter::parse("s3://x[*").unwrap();
        assert!(filter.matches("x[yz"));
        assert!(!filter.matches("xyz"));
    }

    #[test]
    fn test_bracket_first_in_class() {
        let filter = BucketFilter::parse("s3://v[]1]").unwrap();
        assert!(filter.matches("v]"));
        assert!(filter.matches("v1"));
        assert!(!filter.matches("v2"));
    }

    #[test]
    fn test_glob_syntax_rewrite() {
        assert_eq!(to_glob_syntax("prod**"), "prod*");
        assert_eq!(to_glob_syntax("a***b*"), "a*b*");
        assert_eq!(to_glob_syntax("a["), "a[[]");
        assert_eq!(to_glob_syntax("a[!b]c"), "a[!b]c");
        assert_eq!(to_glob_syntax("[!]"), "[[]!]");
    }

    #[test]
    fn test_is_glob() {
        assert!(is_glob("a*"));
        assert!(is_glob("a?"));
        assert!(is_glob("[ab]"));
        assert!(is_glob("!x"));
        assert!(!is_glob("plain.name"));
    }
}
