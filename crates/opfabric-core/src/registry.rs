//! The bucket storage backing [`crate::context::OperationContext`].
//!
//! One bucket per `(name, prototype)` pair; each bucket lists concrete
//! signatures in registration order, as spec §3 requires.

use std::collections::HashMap;

use opfabric_diagnostics::DispatchError;

use crate::operation::Operation;
use crate::signature::Signature;

/// One registered implementation, tagged with its global registration
/// order so `operation_prototype` can deterministically pick "the first
/// registered" operation for a name even after other entries are removed.
pub(crate) struct Entry {
    pub(crate) seq: u64,
    pub(crate) signature: Signature,
    pub(crate) operation: Operation,
}

#[derive(Default)]
pub(crate) struct Registry {
    buckets: HashMap<String, HashMap<Signature, Vec<Entry>>>,
    next_seq: u64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, operation: Operation) -> Result<(), DispatchError> {
        let proto = operation.signature().as_prototype();
        let name = operation.name().to_string();
        let bucket = self.buckets.entry(name.clone()).or_default().entry(proto).or_default();

        if bucket.iter().any(|e| e.signature == *operation.signature()) {
            return Err(DispatchError::DuplicateSignature {
                name,
                signature: operation.signature().to_string(),
            });
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        bucket.push(Entry {
            seq,
            signature: operation.signature().clone(),
            operation,
        });
        Ok(())
    }

    pub(crate) fn remove(&mut self, name: &str, signature: Option<&Signature>) -> Result<(), DispatchError> {
        match signature {
            Some(sig) => {
                let proto = sig.as_prototype();
                let removed = self
                    .buckets
                    .get_mut(name)
                    .and_then(|protos| protos.get_mut(&proto))
                    .map(|bucket| {
                        let before = bucket.len();
                        bucket.retain(|e| e.signature != *sig);
                        before != bucket.len()
                    })
                    .unwrap_or(false);
                if !removed {
                    return Err(DispatchError::NoSuchSignature {
                        name: name.to_string(),
                        signature: sig.to_string(),
                    });
                }
                Ok(())
            }
            None => {
                if self.buckets.remove(name).is_none() {
                    return Err(DispatchError::NoSuchName { name: name.to_string() });
                }
                Ok(())
            }
        }
    }

    pub(crate) fn is_registered(&self, name: &str) -> bool {
        self.buckets.get(name).is_some_and(|protos| protos.values().any(|b| !b.is_empty()))
    }

    pub(crate) fn bucket(&self, name: &str, prototype: &Signature) -> Option<&[Entry]> {
        self.buckets.get(name)?.get(prototype).map(Vec::as_slice)
    }

    /// The operation with the smallest registration sequence number across
    /// every bucket registered under `name`.
    pub(crate) fn first_registered(&self, name: &str) -> Option<&Operation> {
        self.buckets
            .get(name)?
            .values()
            .flatten()
            .min_by_key(|e| e.seq)
            .map(|e| &e.operation)
    }
}
