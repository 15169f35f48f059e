//! Domain error types.
//!
//! These errors represent route patterns that cannot be scheduled as
//! written. They are distinct from file and parse errors.

use super::{PatternId, StationName};

/// Domain-level errors for route pattern validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Pattern has no stations at all
    #[error("pattern {0} has no stations")]
    EmptyPattern(PatternId),

    /// A station appears more than once in one pattern
    #[error("pattern {pattern} calls at {station} more than once")]
    DuplicateStation {
        pattern: PatternId,
        station: StationName,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let pattern = PatternId::new("x").unwrap();
        let err = DomainError::EmptyPattern(pattern.clone());
        assert_eq!(err.to_string(), "pattern x has no stations");

        let err = DomainError::DuplicateStation {
            pattern,
            station: StationName::new("a").unwrap(),
        };
        assert_eq!(err.to_string(), "pattern x calls at a more than once");
    }
}
