use regex::Regex;
use tracelog_record::{Record, Value};

use crate::Filter;

/// One named redaction rule: a compiled pattern and the placeholder name
/// substituted for each match, rendered as `[REDACTED_<NAME>]`.
struct Pattern {
    name: &'static str,
    regex: Regex,
}

fn default_patterns() -> Vec<(&'static str, &'static str)> {
    vec![
        ("EMAIL", r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}"),
        ("SSN", r"\b\d{3}-\d{2}-\d{4}\b"),
        ("PAN", r"\b(?:\d[ -]?){15}\d\b"),
        ("PHONE", r"\b(?:\+?1[-. ]?)?\(?\d{3}\)?[-. ]?\d{3}[-. ]?\d{4}\b"),
        ("IPV4", r"\b(?:\d{1,3}\.){3}\d{1,3}\b"),
        ("PASSWORD", r"(?i)(password|passwd|pwd)\s*[:=]\s*\S+"),
        ("TOKEN", r"(?i)(api[-_]?key|token)\s*[:=]\s*\S+"),
    ]
}

/// Error constructing a [`RedactFilter`] from caller-supplied patterns.
#[derive(Debug, thiserror::Error)]
pub enum RedactError {
    #[error("invalid redaction pattern {name:?}: {source}")]
    InvalidPattern { name: String, #[source] source: regex::Error },
}

/// Transformer: scrubs matches of named patterns from the message and from
/// string-typed field values, replacing each with `[REDACTED_<NAME>]`
/// (spec §4.5). Non-string field values are left untouched.
pub struct RedactFilter {
    patterns: Vec<Pattern>,
}

impl RedactFilter {
    /// Build with only the given default pattern names enabled (case-insensitive
    /// match against `EMAIL`, `SSN`, `PAN`, `PHONE`, `IPV4`, `PASSWORD`, `TOKEN`).
    ///
    /// # Errors
    ///
    /// Never fails for default names; kept fallible for symmetry with
    /// [`RedactFilter::with_custom_patterns`].
    pub fn with_defaults(enabled: &[&str]) -> Result<Self, RedactError> {
        let mut patterns = Vec::new();
        for (name, src) in default_patterns() {
            if enabled.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                let regex = Regex::new(src).expect("built-in pattern is valid");
                patterns.push(Pattern { name, regex });
            }
        }
        Ok(Self { patterns })
    }

    /// Build from all default patterns, enabled unconditionally.
    #[must_use]
    pub fn all_defaults() -> Self {
        let patterns = default_patterns()
            .into_iter()
            .map(|(name, src)| Pattern { name, regex: Regex::new(src).expect("built-in pattern is valid") })
            .collect();
        Self { patterns }
    }

    /// Add caller-supplied named patterns on top of whatever is already configured.
    ///
    /// # Errors
    ///
    /// Returns [`RedactError::InvalidPattern`] if a pattern fails to compile.
    pub fn with_custom_patterns(
        mut self,
        patterns: impl IntoIterator<Item = (&'static str, &'static str)>,
    ) -> Result<Self, RedactError> {
        for (name, src) in patterns {
            let regex = Regex::new(src)
                .map_err(|source| RedactError::InvalidPattern { name: name.to_owned(), source })?;
            self.patterns.push(Pattern { name, regex });
        }
        Ok(self)
    }

    fn scrub(&self, text: &str) -> String {
        let mut out = text.to_owned();
        for pattern in &self.patterns {
            if pattern.regex.is_match(&out) {
                let placeholder = format!("[REDACTED_{}]", pattern.name);
                out = pattern.regex.replace_all(&out, placeholder.as_str()).into_owned();
            }
        }
        out
    }
}

impl Filter for RedactFilter {
    fn apply(&self, record: &mut Record) -> bool {
        record.message = self.scrub(&record.message);
        for value in record.fields.values_mut() {
            if let Value::String(s) = value {
                *s = self.scrub(s);
            }
        }
        true
    }
}
