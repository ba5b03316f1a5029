//! Error taxonomy for the `opfabric` dispatch kernel.
//!
//! This crate has no dependency on `opfabric-core` so it can be reused by
//! any future façade (CLI, service binding, etc.) without pulling in the
//! dispatch machinery itself — the same separation the teacher workspace
//! draws between its evaluator and its diagnostics crate.

mod error;

pub use error::{DispatchError, DispatchResult, ErrorKind};

/// Maximum number of retry hops a single top-level call will follow before
/// giving up with [`DispatchError::RetryCapExceeded`].
///
/// The cycle guard is the primary protection against runaway retry chains;
/// this constant is defence in depth for chains the guard doesn't catch
/// (e.g. a long cycle through many distinct profiles that never repeats).
pub const MAX_RETRY_ATTEMPTS: usize = 10;
