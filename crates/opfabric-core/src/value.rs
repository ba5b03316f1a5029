//! The data-object contract and the `Value` currency operations pass
//! between themselves, the kernel, and their callers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::token::RepresentationToken;

/// The external data-object contract (spec §6): anything used as an
/// operand implements this.
///
/// The kernel only ever calls [`representations`](DataObject::representations);
/// named accessors (`rows()`, `text()`, `sql()`, …) live on the concrete
/// object types operation implementations work with, entirely outside the
/// kernel's view.
pub trait DataObject: Send + Sync {
    /// This object's representations, in preference order (most preferred
    /// first).
    fn representations(&self) -> Vec<RepresentationToken>;

    /// Upcast to [`Any`] so operation implementations that know the
    /// concrete object type behind an operand can recover it with
    /// `downcast_ref`. The kernel itself never calls this; implementors
    /// provide it as `fn as_any(&self) -> &dyn Any { self }`.
    fn as_any(&self) -> &dyn Any;
}

/// An operand passed to an operation: either a single data-object or a
/// sequence of them.
#[derive(Clone)]
pub enum Operand {
    /// A single data-object.
    Single(Arc<dyn DataObject>),
    /// A sequence of data-objects (dispatched against the `[]`-suffixed
    /// prototype bucket).
    List(Vec<Arc<dyn DataObject>>),
}

impl Operand {
    /// Representation tokens this operand presents during lookup.
    ///
    /// A single object's representations are used unchanged; a list's
    /// representations come from its first element (spec §4.4's default
    /// policy — see [`crate::context::common_representations`] for the
    /// intersection-based alternative), each list-suffixed.
    pub fn extract_signatures(&self) -> Vec<RepresentationToken> {
        match self {
            Self::Single(obj) => obj.representations(),
            Self::List(objs) => objs
                .first()
                .map(|first| {
                    first
                        .representations()
                        .into_iter()
                        .map(RepresentationToken::into_list)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Whether this operand is shaped as a list (drives which prototype
    /// bucket a call resolves against).
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}

/// The value currency operation parameters, return values, and (boxed)
/// operands share.
///
/// Only [`Value::Object`] and [`Value::ObjectList`] are legal in operand
/// position; every variant is legal as a trailing parameter or as a
/// return value.
#[derive(Clone)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// Text.
    Text(String),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A single data-object, carried as a value (e.g. returned unchanged
    /// by an operation that mutates it in place).
    Object(Arc<dyn DataObject>),
    /// A sequence of data-objects.
    ObjectList(Vec<Arc<dyn DataObject>>),
    /// An opaque host payload the kernel never inspects.
    Any(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// View this value as an [`Operand`], if it is operand-shaped.
    pub fn as_operand(&self) -> Option<Operand> {
        match self {
            Self::Object(obj) => Some(Operand::Single(obj.clone())),
            Self::ObjectList(objs) => Some(Operand::List(objs.clone())),
            _ => None,
        }
    }

    /// Build a `Value` from an [`Operand`].
    pub fn from_operand(operand: Operand) -> Self {
        match operand {
            Operand::Single(obj) => Self::Object(obj),
            Operand::List(objs) => Self::ObjectList(objs),
        }
    }

    /// Convenience constructor for a single data-object operand.
    pub fn object(obj: Arc<dyn DataObject>) -> Self {
        Self::Object(obj)
    }

    /// Convenience constructor for an opaque host payload.
    pub fn any<T: Any + Send + Sync + 'static>(value: T) -> Self {
        Self::Any(Arc::new(value))
    }

    /// Borrow the text out of a `Value::Text`, if that's what this is.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => write!(f, "Bool({b:?})"),
            Self::Int(i) => write!(f, "Int({i:?})"),
            Self::Float(x) => write!(f, "Float({x:?})"),
            Self::Text(s) => write!(f, "Text({s:?})"),
            Self::List(items) => f.debug_list().entries(items).finish(),
            Self::Object(_) => write!(f, "Object(..)"),
            Self::ObjectList(objs) => write!(f, "ObjectList(len={})", objs.len()),
            Self::Any(_) => write!(f, "Any(..)"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}
