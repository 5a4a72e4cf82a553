#![forbid(unsafe_code)]

//! Errors raised while performing or reversing an action.
//!
//! Most failure modes of the framework are silent by contract: an action
//! whose target cannot be addressed simply does nothing. The errors here
//! cover the remaining cases, where the host mutation itself fails.

use thiserror::Error;

/// Result of performing or reversing an action.
pub type ActionResult<T = ()> = Result<T, ActionError>;

/// Errors that can occur while an action touches its target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// A date setter produced a point in time chrono cannot represent.
    #[error("date out of range after {setter}")]
    DateOutOfRange {
        /// Name of the setter that overflowed.
        setter: &'static str,
    },
    /// An array write would pad further past the end than arrays may grow
    /// in one step.
    #[error("index {index} is out of reach for an array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    /// The target container does not have the shape the action expects.
    #[error("expected {expected} target, found {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// A step inside a composite action failed.
    #[error("step {index} of '{description}' failed: {source}")]
    Step {
        index: usize,
        description: String,
        #[source]
        source: Box<ActionError>,
    },
    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_date_out_of_range() {
        let err = ActionError::DateOutOfRange {
            setter: "set_full_year",
        };
        assert!(err.to_string().contains("set_full_year"));
    }

    #[test]
    fn test_display_index_out_of_range() {
        let err = ActionError::IndexOutOfRange { index: 1 << 40, len: 2 };
        assert_eq!(
            err.to_string(),
            "index 1099511627776 is out of reach for an array of length 2"
        );
    }

    #[test]
    fn test_display_step_includes_source() {
        let err = ActionError::Step {
            index: 1,
            description: "Patch document".into(),
            source: Box::new(ActionError::Other("boom".into())),
        };
        let text = err.to_string();
        assert!(text.contains("step 1"));
        assert!(text.contains("boom"));
    }
}
