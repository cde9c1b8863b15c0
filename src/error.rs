//! Error taxonomy shared by the solver, the AD tapes and the compiler.

use thiserror::Error;

/// Errors surfaced by solving, tracing, compiling or replaying.
///
/// Every error is fail-fast: no operation returns a partially computed
/// solution alongside an error, and nothing is retried internally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Input lengths disagree with the operation's contract.
    #[error("shape mismatch for `{name}`: expected length {expected}, got {actual}")]
    ShapeMismatch {
        name: &'static str,
        expected: String,
        actual: usize,
    },

    /// A forward-elimination pivot fell below the configured epsilon or was
    /// not finite.
    #[error("singular system: pivot {pivot:e} at row {row}")]
    SingularSystem { row: usize, pivot: f64 },

    /// The compiled path could not produce an executable program.
    #[error("compilation failed: {reason}")]
    Compilation { reason: String },
}

impl Error {
    pub(crate) fn shape(name: &'static str, expected: impl ToString, actual: usize) -> Self {
        Error::ShapeMismatch {
            name,
            expected: expected.to_string(),
            actual,
        }
    }

    pub(crate) fn compilation(reason: impl Into<String>) -> Self {
        Error::Compilation {
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout trisolve.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = Error::shape("b", 4, 3);
        assert_eq!(
            err.to_string(),
            "shape mismatch for `b`: expected length 4, got 3"
        );

        let err = Error::SingularSystem { row: 2, pivot: 0.0 };
        assert!(err.to_string().contains("row 2"));
    }
}
