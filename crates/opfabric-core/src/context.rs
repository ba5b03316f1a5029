//! `OperationContext`: the registry, retry policy, and call façades.

use std::collections::HashSet;

use opfabric_diagnostics::{DispatchError, DispatchResult, MAX_RETRY_ATTEMPTS};

use crate::operation::{Operation, Outcome};
use crate::registry::Registry;
use crate::signature::Signature;
use crate::token::RepresentationToken;
use crate::value::{DataObject, Operand, Value};

/// Holds the operation registry, the retry allow/deny policy, and exposes
/// the two equivalent call façades (`o`, `op`).
///
/// A context is not safe for concurrent mutation from multiple threads;
/// registration, removal, and dispatch over the same context require an
/// external mutual-exclusion discipline (spec §5). Distinct contexts are
/// fully independent.
pub struct OperationContext {
    registry: Registry,
    /// If non-empty, only names in this set may retry.
    pub retry_allow: HashSet<String>,
    /// Names in this set may never retry, taking precedence over `retry_allow`.
    pub retry_deny: HashSet<String>,
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationContext {
    /// Create a new, empty context.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            retry_allow: HashSet::new(),
            retry_deny: HashSet::new(),
        }
    }

    /// Register `operation`, failing if its `(name, signature)` pair is
    /// already present.
    pub fn add_operation(&mut self, operation: Operation) -> DispatchResult<()> {
        log::trace!(
            "registering operation {:?}{}",
            operation.name(),
            operation.signature()
        );
        self.registry.add(operation)
    }

    /// Remove a single registered signature under `name`, or (with `signature`
    /// `None`) every operation registered under `name`.
    pub fn remove_operation(&mut self, name: &str, signature: Option<&Signature>) -> DispatchResult<()> {
        log::trace!("removing operation {name:?}");
        self.registry.remove(name, signature)
    }

    /// Describe the canonical operand/parameter shape of `name`: the
    /// first still-registered operation under that name.
    pub fn operation_prototype(&self, name: &str) -> DispatchResult<OperationPrototype> {
        let op = self
            .registry
            .first_registered(name)
            .ok_or_else(|| DispatchError::UnknownOperation { name: name.to_string() })?;
        Ok(OperationPrototype {
            operand_count: op.operand_count(),
            operands: op.operands().to_vec(),
            parameters: op.parameters().to_vec(),
        })
    }

    /// Resolve the best implementation of `name` for the given operands,
    /// using their live `representations()`.
    pub fn lookup_operation(&self, name: &str, operands: &[Operand]) -> DispatchResult<Operation> {
        let profile: Vec<Vec<RepresentationToken>> =
            operands.iter().map(Operand::extract_signatures).collect();
        self.lookup_with_profile(name, operands, &profile)
    }

    fn lookup_with_profile(
        &self,
        name: &str,
        operands: &[Operand],
        profile: &[Vec<RepresentationToken>],
    ) -> DispatchResult<Operation> {
        if !self.registry.is_registered(name) {
            return Err(DispatchError::UnknownOperation { name: name.to_string() });
        }

        let shape = call_shape(operands);
        let bucket = self
            .registry
            .bucket(name, &shape)
            .ok_or_else(|| DispatchError::ShapeMismatch {
                name: name.to_string(),
                shape: shape.to_string(),
            })?;

        let mut first_any = None;
        let mut first_concrete = None;
        for entry in bucket {
            if !entry.signature.matches_profile(profile) {
                continue;
            }
            if first_any.is_none() {
                first_any = Some(entry);
            }
            if first_concrete.is_none() && !entry.signature.has_wildcard_slot() {
                first_concrete = Some(entry);
            }
        }

        first_concrete
            .or(first_any)
            .map(|e| e.operation.clone())
            .ok_or_else(|| DispatchError::NoMatchingImplementation { name: name.to_string() })
    }

    /// Dispatch, execute, and (if requested) retry `name` against
    /// `operands` and trailing `params`.
    ///
    /// This is the full protocol of spec §4.3: lookup, execution, retry
    /// policy, cycle guard, and the retry cap. The cycle-guard set is
    /// local to this call — a nested call through the façade starts with
    /// its own, fresh guard (spec §5).
    pub fn call(&mut self, name: &str, operands: &[Value], params: &[Value]) -> anyhow::Result<Value> {
        let operand_views: Vec<Operand> = operands
            .iter()
            .map(|v| {
                v.as_operand().ok_or_else(|| DispatchError::ShapeMismatch {
                    name: name.to_string(),
                    shape: "non-operand value in operand position".to_string(),
                })
            })
            .collect::<Result<_, _>>()?;

        let mut tried: HashSet<Vec<String>> = HashSet::new();
        let mut override_profile: Option<Vec<String>> = None;

        for attempt in 0..=MAX_RETRY_ATTEMPTS {
            if attempt == MAX_RETRY_ATTEMPTS {
                return Err(DispatchError::RetryCapExceeded { name: name.to_string() }.into());
            }

            let op = match &override_profile {
                None => self.lookup_operation(name, &operand_views)?,
                Some(profile) => {
                    let forced: Vec<Vec<RepresentationToken>> = profile
                        .iter()
                        .map(|tok| RepresentationToken::parse(tok).map(|t| vec![t]))
                        .collect::<Result<_, _>>()?;
                    self.lookup_with_profile(name, &operand_views, &forced)?
                }
            };

            log::debug!("dispatching {name:?} to signature {}", op.signature());

            match (op.function())(self, operands, params)? {
                Outcome::Done(value) => return Ok(value),
                Outcome::Retry(profile) => {
                    if profile.len() != op.operand_count() {
                        return Err(DispatchError::RetryProfileArity {
                            name: name.to_string(),
                            actual: profile.len(),
                            expected: op.operand_count(),
                        }
                        .into());
                    }
                    if !self.retry_allowed(name) {
                        return Err(DispatchError::RetryRefused { name: name.to_string() }.into());
                    }
                    if !tried.insert(profile.clone()) {
                        return Err(DispatchError::RetryLoop {
                            name: name.to_string(),
                            profile,
                        }
                        .into());
                    }
                    log::trace!("retrying {name:?} with profile {profile:?}");
                    override_profile = Some(profile);
                }
            }
        }

        unreachable!("loop always returns before exhausting MAX_RETRY_ATTEMPTS + 1 iterations")
    }

    fn retry_allowed(&self, name: &str) -> bool {
        if self.retry_deny.contains(name) {
            return false;
        }
        if !self.retry_allow.is_empty() && !self.retry_allow.contains(name) {
            return false;
        }
        true
    }

    /// The `o` call façade: `ctx.o(name).call(operands, params)`.
    pub fn o<'a>(&'a mut self, name: &str) -> Invocation<'a> {
        Invocation {
            ctx: self,
            name: name.to_string(),
        }
    }

    /// The `op` call façade, semantically identical to [`o`](Self::o).
    pub fn op<'a>(&'a mut self, name: &str) -> Invocation<'a> {
        self.o(name)
    }
}

fn call_shape(operands: &[Operand]) -> Signature {
    let tokens = operands
        .iter()
        .map(|o| {
            if o.is_list() {
                RepresentationToken::wildcard().into_list()
            } else {
                RepresentationToken::wildcard()
            }
        })
        .collect::<Vec<_>>();
    // Tokens built here are always well-formed wildcards; constructing the
    // signature cannot fail.
    Signature::new(tokens.iter().map(ToString::to_string)).expect("wildcard tokens are always valid")
}

/// The operand/parameter/arity shape of a registered operation name,
/// exposed so callers can introspect what an operation name expects
/// without retrieving a specific implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationPrototype {
    /// Number of operand slots.
    pub operand_count: usize,
    /// Operand parameter names, in order.
    pub operands: Vec<String>,
    /// Trailing parameter names, in order.
    pub parameters: Vec<String>,
}

/// A callable bound to `(ctx, name)`, returned by [`OperationContext::o`]
/// / [`OperationContext::op`].
///
/// Obtaining an `Invocation` never fails — only calling it can, at which
/// point an unknown name surfaces as [`DispatchError::UnknownOperation`]
/// (spec §4.5).
pub struct Invocation<'a> {
    ctx: &'a mut OperationContext,
    name: String,
}

impl<'a> Invocation<'a> {
    /// Perform the full dispatch-and-execute protocol for this invocation.
    pub fn call(self, operands: &[Value], params: &[Value]) -> anyhow::Result<Value> {
        self.ctx.call(&self.name, operands, params)
    }
}

/// The representations common to every given object, in the order the
/// first object lists them (spec §4.4).
pub fn common_representations(objects: &[&dyn DataObject]) -> Vec<RepresentationToken> {
    let Some((first, rest)) = objects.split_first() else {
        return Vec::new();
    };
    first
        .representations()
        .into_iter()
        .filter(|tok| rest.iter().all(|obj| obj.representations().iter().any(|t| t == tok)))
        .collect()
}
