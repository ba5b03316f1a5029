//! Representation tokens: the atoms signatures are built from.

use std::fmt;

use opfabric_diagnostics::DispatchError;

/// A single representation token.
///
/// Per the grammar `token ::= ("*" | ident) "[]"?`, a token is either a
/// bare identifier (`sql`), the wildcard `*`, or either of those with a
/// list suffix (`sql[]`, `*[]`). Two orthogonal bits fall out of that:
/// list vs scalar, and wildcard vs concrete.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepresentationToken {
    bare: String,
    list: bool,
}

impl RepresentationToken {
    /// Parse a token, rejecting anything that doesn't match the grammar.
    pub fn parse(raw: &str) -> Result<Self, DispatchError> {
        let (bare, list) = match raw.strip_suffix("[]") {
            Some(bare) => (bare, true),
            None => (raw, false),
        };
        let valid = bare == "*"
            || (!bare.is_empty()
                && bare
                    .chars()
                    .enumerate()
                    .all(|(i, c)| if i == 0 { is_ident_start(c) } else { is_ident_cont(c) }));
        if !valid {
            return Err(DispatchError::MalformedToken {
                token: raw.to_string(),
            });
        }
        Ok(Self {
            bare: bare.to_string(),
            list,
        })
    }

    /// The wildcard token `*`.
    pub fn wildcard() -> Self {
        Self {
            bare: "*".to_string(),
            list: false,
        }
    }

    /// This token's bare identifier (or `*`), without the list suffix.
    pub fn bare(&self) -> &str {
        &self.bare
    }

    /// Whether this token carries the `[]` list suffix.
    pub fn is_list(&self) -> bool {
        self.list
    }

    /// Whether this token is the wildcard (`*` or `*[]`).
    pub fn is_wildcard(&self) -> bool {
        self.bare == "*"
    }

    /// Does this token, used as a signature slot, accept the concrete
    /// token `other`?
    ///
    /// List-ness must agree exactly; a scalar token never matches a list
    /// token and vice versa. Otherwise the slot accepts `other` iff it is
    /// the wildcard or the bare identifiers are equal.
    pub fn matches(&self, other: &RepresentationToken) -> bool {
        self.list == other.list && (self.is_wildcard() || self.bare == other.bare)
    }

    /// This token with its bare identifier replaced by `*`, preserving the
    /// list suffix.
    pub fn as_prototype(&self) -> Self {
        Self {
            bare: "*".to_string(),
            list: self.list,
        }
    }

    /// This token with the list suffix appended (used when extracting the
    /// representation set of a list-of-objects operand).
    pub fn into_list(self) -> Self {
        Self {
            list: true,
            ..self
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_cont(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl fmt::Display for RepresentationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.bare, if self.list { "[]" } else { "" })
    }
}

impl TryFrom<&str> for RepresentationToken {
    type Error = DispatchError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl TryFrom<String> for RepresentationToken {
    type Error = DispatchError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}
