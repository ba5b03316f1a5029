//! `Operation`: a bound triple of (callable, name, signature).

use std::sync::Arc;

use opfabric_diagnostics::DispatchError;

use crate::context::OperationContext;
use crate::signature::Signature;
use crate::value::Value;

/// What an operation function returns on success: either a finished value,
/// or a request to retry under a different representation profile.
///
/// This is the sum-typed realization of the Python source's
/// `RetryOperation` exception (spec §9's design note on exceptions-as-
/// control-flow): Rust operation functions don't throw to retry, they
/// return `Ok(Outcome::Retry(profile))`.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The operation completed; this is its result.
    Done(Value),
    /// Re-dispatch this call under the given per-operand representation
    /// profile (one token per operand, in operand order).
    Retry(Vec<String>),
}

/// The signature of a registered operation's implementation.
///
/// Operation functions receive the context (so they may themselves invoke
/// other operations through the call façade), the operand slice, and the
/// trailing parameter slice. Failures other than a retry request propagate
/// as an arbitrary [`anyhow::Error`] — the kernel never inspects or
/// swallows them.
pub type OperationFn =
    Arc<dyn Fn(&mut OperationContext, &[Value], &[Value]) -> anyhow::Result<Outcome> + Send + Sync>;

/// A registered implementation of an operation name: a callable bound to a
/// [`Signature`], plus the operand/parameter names it was declared with.
#[derive(Clone)]
pub struct Operation {
    function: OperationFn,
    name: String,
    signature: Signature,
    operands: Vec<String>,
    parameters: Vec<String>,
}

impl Operation {
    /// The function this operation dispatches to.
    pub fn function(&self) -> &OperationFn {
        &self.function
    }

    /// The operation's registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The operation's signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Number of operand slots (equals `signature.arity()`).
    pub fn operand_count(&self) -> usize {
        self.signature.arity()
    }

    /// The leading, signature-indexed formal parameter names.
    pub fn operands(&self) -> &[String] {
        &self.operands
    }

    /// The trailing, non-dispatched formal parameter names.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.function, &other.function)
            && self.name == other.name
            && self.signature == other.signature
    }
}

/// Builds an [`Operation`], explicitly naming operand and parameter
/// positions.
///
/// Rust has no runtime introspection of a closure's formal parameter
/// names, so unlike the Python source this builder requires the caller to
/// state them (spec §9's "Runtime parameter introspection" design note,
/// resolved here in favor of an explicit builder — see `DESIGN.md`).
pub struct OperationBuilder {
    function: OperationFn,
    name: String,
    operands: Vec<String>,
    parameters: Vec<String>,
}

impl OperationBuilder {
    /// Start building an operation around `function`, named `name`.
    pub fn new(name: impl Into<String>, function: OperationFn) -> Self {
        Self {
            function,
            name: name.into(),
            operands: Vec::new(),
            parameters: Vec::new(),
        }
    }

    /// Name the leading, signature-indexed operand parameters.
    pub fn operands<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operands = names.into_iter().map(Into::into).collect();
        self
    }

    /// Name the trailing, non-dispatched parameters.
    pub fn parameters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters = names.into_iter().map(Into::into).collect();
        self
    }

    /// Finish construction against `signature`, failing if the declared
    /// operand count doesn't match the signature's arity.
    pub fn build(self, signature: Signature) -> Result<Operation, DispatchError> {
        if self.operands.len() != signature.arity() {
            return Err(DispatchError::ArityMismatch {
                name: self.name,
                operand_count: self.operands.len(),
                arity: signature.arity(),
            });
        }
        Ok(Operation {
            function: self.function,
            name: self.name,
            signature,
            operands: self.operands,
            parameters: self.parameters,
        })
    }
}

/// Factory mirroring the Python source's `operation(*tokens, name=…)`
/// decorator: wrap `function` as an operation builder, ready to have its
/// operand/parameter names and signature attached.
pub fn operation(name: impl Into<String>, function: OperationFn) -> OperationBuilder {
    OperationBuilder::new(name, function)
}
