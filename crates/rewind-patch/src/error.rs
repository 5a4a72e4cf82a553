#![forbid(unsafe_code)]

//! Patch errors.

use rewind_core::ActionError;
use thiserror::Error;

pub type PatchResult<T> = Result<T, PatchError>;

/// Errors raised while building or applying a patch.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The patch document could not be parsed.
    #[error("invalid patch document: {0}")]
    Json(#[from] serde_json::Error),
    /// An action built from the patch failed.
    #[error(transparent)]
    Action(#[from] ActionError),
    /// The operation exists in the patch vocabulary but is not supported.
    #[error("unsupported patch operation '{op}'")]
    UnsupportedOperation { op: &'static str },
    #[error("invalid pointer '{pointer}': {reason}")]
    InvalidPointer {
        pointer: String,
        reason: &'static str,
    },
    /// A diff tuple carried an opcode outside the configured set.
    #[error("unknown diff opcode {0}")]
    UnknownOpcode(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = PatchError::UnsupportedOperation { op: "test" };
        assert_eq!(err.to_string(), "unsupported patch operation 'test'");

        let err = PatchError::InvalidPointer {
            pointer: "a/b".into(),
            reason: "must start with '/'",
        };
        assert_eq!(err.to_string(), "invalid pointer 'a/b': must start with '/'");
    }

    #[test]
    fn test_action_error_is_transparent() {
        let err: PatchError = ActionError::Other("boom".into()).into();
        assert_eq!(err.to_string(), "boom");
    }
}
