//! Signatures: ordered tuples of representation tokens.

use std::fmt;

use opfabric_diagnostics::DispatchError;

use crate::token::RepresentationToken;

/// A fixed-length ordered sequence of representation tokens describing one
/// candidate argument profile for an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(Vec<RepresentationToken>);

impl Signature {
    /// Build a signature from tokens, failing if any token is malformed.
    pub fn new<I, S>(tokens: I) -> Result<Self, DispatchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = tokens
            .into_iter()
            .map(|s| RepresentationToken::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(tokens))
    }

    /// The empty signature (a 0-arity operation).
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Number of operand slots this signature describes.
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    /// The tokens, in operand order.
    pub fn tokens(&self) -> &[RepresentationToken] {
        &self.0
    }

    /// Pointwise match against a single concrete token per slot (arities
    /// must agree). This is the direct analogue of a single-token
    /// `RepresentationToken::matches` lifted across a whole signature.
    pub fn matches(&self, tokens: &[RepresentationToken]) -> bool {
        self.0.len() == tokens.len() && self.0.iter().zip(tokens).all(|(slot, tok)| slot.matches(tok))
    }

    /// Does this signature match an actual per-operand representation-set
    /// profile?
    ///
    /// `actual` holds, for each operand position, the set of concrete
    /// representation tokens that operand currently offers (in preference
    /// order). A position qualifies if at least one token in its set is
    /// accepted by this signature's token at that position. Arities must
    /// agree or this trivially fails.
    pub fn matches_profile(&self, actual: &[Vec<RepresentationToken>]) -> bool {
        if self.0.len() != actual.len() {
            return false;
        }
        self.0
            .iter()
            .zip(actual.iter())
            .all(|(slot, reps)| reps.iter().any(|rep| slot.matches(rep)))
    }

    /// Whether any slot in this signature is the wildcard.
    ///
    /// Used to rank dispatch candidates: a signature with zero wildcard
    /// slots is preferred over one with at least one, independent of
    /// registration order (spec §4.3 step 5).
    pub fn has_wildcard_slot(&self) -> bool {
        self.0.iter().any(RepresentationToken::is_wildcard)
    }

    /// Derive this signature's prototype: same arity, every slot's bare
    /// identifier replaced by `*`, list suffix preserved.
    pub fn as_prototype(&self) -> Self {
        Self(self.0.iter().map(RepresentationToken::as_prototype).collect())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, tok) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{tok}")?;
        }
        write!(f, ")")
    }
}

impl<const N: usize> TryFrom<[&str; N]> for Signature {
    type Error = DispatchError;

    fn try_from(tokens: [&str; N]) -> Result<Self, Self::Error> {
        Self::new(tokens)
    }
}

impl TryFrom<&[&str]> for Signature {
    type Error = DispatchError;

    fn try_from(tokens: &[&str]) -> Result<Self, Self::Error> {
        Self::new(tokens.iter().copied())
    }
}

impl TryFrom<Vec<&str>> for Signature {
    type Error = DispatchError;

    fn try_from(tokens: Vec<&str>) -> Result<Self, Self::Error> {
        Self::new(tokens)
    }
}

impl PartialEq<[&str]> for Signature {
    fn eq(&self, other: &[&str]) -> bool {
        self.0.len() == other.len()
            && self.0.iter().zip(other.iter()).all(|(tok, s)| tok.bare() == strip_list(s).0
                && tok.is_list() == strip_list(s).1)
    }
}

impl<const N: usize> PartialEq<[&str; N]> for Signature {
    fn eq(&self, other: &[&str; N]) -> bool {
        self == other.as_slice()
    }
}

fn strip_list(s: &str) -> (&str, bool) {
    match s.strip_suffix("[]") {
        Some(bare) => (bare, true),
        None => (s, false),
    }
}
