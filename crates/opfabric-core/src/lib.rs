//! A multiple-dispatch operation kernel for a data-processing framework.
//!
//! Library authors register many implementations of the same operation
//! name, each specialised for the *representations* its operand objects
//! support (for example `sql`, `rows`, `text`), and [`OperationContext`]
//! dispatches each call to the best-matching implementation. Implementations
//! may request a retry under a different operand-representation profile,
//! driving a fallback chain from specialised to general.
//!
//! # Example
//!
//! ```ignore
//! use opfabric_core::{operation, OperationContext, Outcome, Signature, Value};
//! use std::sync::Arc;
//!
//! let mut ctx = OperationContext::new();
//! let upper = operation("upper", Arc::new(|_ctx, operands, _params| {
//!     let text = operands[0].as_text().unwrap_or_default().to_uppercase();
//!     Ok(Outcome::Done(Value::Text(text)))
//! }))
//! .operands(["obj"])
//! .build(Signature::new(["text"]).unwrap())
//! .unwrap();
//! ctx.add_operation(upper).unwrap();
//! ```
//!
//! # Architecture
//!
//! - [`token`]: representation tokens, the atoms signatures are built from.
//! - [`signature`]: ordered tuples of tokens, matching, and prototype
//!   derivation.
//! - [`operation`]: a bound triple of (callable, name, signature) plus the
//!   retry sum type operation functions return.
//! - [`registry`]: the `(name, prototype)`-keyed bucket storage backing
//!   dispatch.
//! - [`context`]: [`OperationContext`], the registry, retry policy, and the
//!   call façades (`o`, `op`).
//! - [`value`]: the `DataObject` contract and the `Value` currency operands,
//!   parameters, and return values share.

pub mod context;
pub mod operation;
pub mod registry;
pub mod signature;
pub mod token;
pub mod value;

pub use context::{common_representations, Invocation, OperationContext, OperationPrototype};
pub use operation::{operation, Operation, OperationBuilder, OperationFn, Outcome};
pub use signature::Signature;
pub use token::RepresentationToken;
pub use value::{DataObject, Operand, Value};

pub use opfabric_diagnostics::{DispatchError, DispatchResult, ErrorKind};
