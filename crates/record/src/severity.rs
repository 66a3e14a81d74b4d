use std::fmt;

/// Log severity. Ordered: `Debug < Info < Warning < Error < Critical`.
///
/// A threshold `T` admits exactly the severities `>= T` (see [`Severity::admits`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Severity {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
    Critical = 4,
}

impl Severity {
    /// All variants, ascending.
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    /// Uppercase name as used by the JSON and pretty serializers.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    /// True iff `self >= threshold`.
    #[must_use]
    pub fn admits(self, threshold: Severity) -> bool {
        self >= threshold
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned by [`std::str::FromStr`] for [`Severity`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("unrecognized severity: {0}")]
pub struct ParseSeverityError(String);

impl std::str::FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Severity::Debug),
            "INFO" => Ok(Severity::Info),
            "WARNING" | "WARN" => Ok(Severity::Warning),
            "ERROR" => Ok(Severity::Error),
            "CRITICAL" | "FATAL" => Ok(Severity::Critical),
            other => Err(ParseSeverityError(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Severity;

    #[test]
    fn severity_is_monotone() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn threshold_admits_exactly_gte() {
        for &t in &Severity::ALL {
            for &s in &Severity::ALL {
                assert_eq!(s.admits(t), s >= t);
            }
        }
    }

    #[test]
    fn round_trips_through_name() {
        for &s in &Severity::ALL {
            let parsed: Severity = s.name().parse().unwrap();
            assert_eq!(parsed, s);
        }
    }

    #[test]
    fn parse_accepts_common_aliases() {
        assert_eq!("warn".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("fatal".parse::<Severity>().unwrap(), Severity::Critical);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!("chatty".parse::<Severity>().is_err());
    }
}
