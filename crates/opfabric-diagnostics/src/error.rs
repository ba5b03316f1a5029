//! The dispatch kernel's error taxonomy.

use thiserror::Error;

/// Result type for kernel operations.
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// The three error kinds the kernel's public surface is caught by.
///
/// Every [`DispatchError`] variant belongs to exactly one kind; see
/// [`DispatchError::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller violated the registry contract (duplicate signature,
    /// unknown name to remove, malformed operation).
    Argument,
    /// No implementation matches at dispatch time.
    Operation,
    /// A retry was refused by policy, looped, or exceeded the retry cap.
    Retry,
}

/// Errors raised by the dispatch kernel.
///
/// These are distinct from failures raised by user-supplied operation
/// functions, which propagate as [`anyhow::Error`](https://docs.rs/anyhow)
/// and are never wrapped here.
#[derive(Debug, Error, Clone)]
pub enum DispatchError {
    /// A token did not match the representation-token grammar.
    #[error("malformed representation token: {token:?}")]
    MalformedToken {
        /// The offending token text.
        token: String,
    },

    /// `add_operation` was called with a `(name, signature)` pair that is
    /// already registered.
    #[error("operation {name:?} is already registered for signature {signature}")]
    DuplicateSignature {
        /// The operation name.
        name: String,
        /// The conflicting signature, formatted for display.
        signature: String,
    },

    /// `remove_operation` was given a signature that has no matching entry.
    #[error("no operation {name:?} registered for signature {signature}")]
    NoSuchSignature {
        /// The operation name.
        name: String,
        /// The signature that was not found, formatted for display.
        signature: String,
    },

    /// `remove_operation` (without a signature) was given an unknown name.
    #[error("no operations registered under name {name:?}")]
    NoSuchName {
        /// The operation name.
        name: String,
    },

    /// `Operation` construction was given an arity that did not match its
    /// declared operand names.
    #[error(
        "operation {name:?} declares {operand_count} operand(s) but signature has arity {arity}"
    )]
    ArityMismatch {
        /// The operation name.
        name: String,
        /// Declared operand count (length of the `operands` list).
        operand_count: usize,
        /// The signature's arity.
        arity: usize,
    },

    /// `lookup_operation` was called for a name with no registered
    /// operations at all.
    #[error("no such operation: {name:?}")]
    UnknownOperation {
        /// The operation name that was looked up.
        name: String,
    },

    /// `lookup_operation`'s call shape (arity and list/scalar-ness of each
    /// operand) has no matching bucket.
    #[error("no operation {name:?} matches arity/shape {shape}")]
    ShapeMismatch {
        /// The operation name.
        name: String,
        /// The actual-call prototype, formatted for display.
        shape: String,
    },

    /// A bucket was found but no candidate signature matched the operands'
    /// representation sets.
    #[error("no implementation of {name:?} matches the supplied representations")]
    NoMatchingImplementation {
        /// The operation name.
        name: String,
    },

    /// A retry was requested for an operation name excluded by
    /// `retry_allow`/`retry_deny` policy.
    #[error("retry of {name:?} refused by policy")]
    RetryRefused {
        /// The operation name.
        name: String,
    },

    /// The same representation profile was retried twice within one
    /// top-level call.
    #[error("retry of {name:?} looped: profile {profile:?} was already attempted")]
    RetryLoop {
        /// The operation name.
        name: String,
        /// The repeated profile.
        profile: Vec<String>,
    },

    /// A call exceeded [`crate::MAX_RETRY_ATTEMPTS`] without settling.
    #[error("retry of {name:?} exceeded the retry cap")]
    RetryCapExceeded {
        /// The operation name.
        name: String,
    },

    /// A retry profile's length did not equal the operand count.
    #[error(
        "retry profile for {name:?} has {actual} entries, expected {expected} (one per operand)"
    )]
    RetryProfileArity {
        /// The operation name.
        name: String,
        /// Length of the profile the operation function supplied.
        actual: usize,
        /// The operand count it should have matched.
        expected: usize,
    },
}

impl DispatchError {
    /// Which of the three public error kinds this variant belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedToken { .. }
            | Self::DuplicateSignature { .. }
            | Self::NoSuchSignature { .. }
            | Self::NoSuchName { .. }
            | Self::ArityMismatch { .. } => ErrorKind::Argument,

            Self::UnknownOperation { .. }
            | Self::ShapeMismatch { .. }
            | Self::NoMatchingImplementation { .. } => ErrorKind::Operation,

            Self::RetryRefused { .. }
            | Self::RetryLoop { .. }
            | Self::RetryCapExceeded { .. }
            | Self::RetryProfileArity { .. } => ErrorKind::Retry,
        }
    }
}
