//! Permission catalog: fixed base actions plus per-node extra vocabularies.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// The four base actions every node understands.
pub const BASE_ACTIONS: [&str; 4] = ["create", "edit", "delete", "view"];

/// Returns true if `token` is one of the fixed base actions.
pub fn is_base_action(token: &str) -> bool {
    BASE_ACTIONS.contains(&token)
}

/// Permission token.
///
/// Tokens are modeled as opaque strings: either one of the four base actions
/// or a free-form extra capability declared on a node (e.g. "export",
/// "approve"). Whether a token is *valid* depends on the node it targets;
/// see [`PermissionVocabulary`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionToken(Cow<'static, str>);

impl PermissionToken {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_base_action(&self) -> bool {
        is_base_action(self.as_str())
    }
}

impl core::fmt::Display for PermissionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PermissionToken {
    fn from(value: &str) -> Self {
        Self(Cow::Owned(value.to_string()))
    }
}

impl From<String> for PermissionToken {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

/// Extra-permission vocabulary declared on a node.
///
/// Ordered and duplicate-free; declaration order is preserved because the
/// management UI renders tokens in the order an administrator entered them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionVocabulary {
    extras: Vec<PermissionToken>,
}

impl PermissionVocabulary {
    pub fn new(extras: impl IntoIterator<Item = PermissionToken>) -> Self {
        let mut out: Vec<PermissionToken> = Vec::new();
        for token in extras {
            if !out.contains(&token) {
                out.push(token);
            }
        }
        Self { extras: out }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A token is allowed on this node if it is a base action or a declared
    /// extra. This is the write-time validity check for grants.
    pub fn allows(&self, token: &str) -> bool {
        is_base_action(token) || self.extras.iter().any(|t| t.as_str() == token)
    }

    pub fn extras(&self) -> &[PermissionToken] {
        &self.extras
    }

    pub fn is_empty(&self) -> bool {
        self.extras.is_empty()
    }
}

impl FromIterator<PermissionToken> for PermissionVocabulary {
    fn from_iter<I: IntoIterator<Item = PermissionToken>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// The token set carried by a grant.
///
/// May be empty: an empty set still means "the node is visible to the role",
/// it just authorizes no actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    tokens: Vec<PermissionToken>,
}

impl PermissionSet {
    pub fn new(tokens: impl IntoIterator<Item = PermissionToken>) -> Self {
        let mut out: Vec<PermissionToken> = Vec::new();
        for token in tokens {
            if !out.contains(&token) {
                out.push(token);
            }
        }
        Self { tokens: out }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t.as_str() == token)
    }

    pub fn tokens(&self) -> &[PermissionToken] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

impl FromIterator<PermissionToken> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionToken>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_actions_are_always_allowed() {
        let vocab = PermissionVocabulary::empty();
        for action in BASE_ACTIONS {
            assert!(vocab.allows(action));
        }
    }

    #[test]
    fn declared_extras_are_allowed() {
        let vocab = PermissionVocabulary::new([
            PermissionToken::new("export"),
            PermissionToken::new("approve"),
        ]);
        assert!(vocab.allows("export"));
        assert!(vocab.allows("approve"));
        assert!(!vocab.allows("transfer"));
    }

    #[test]
    fn vocabulary_preserves_order_and_dedupes() {
        let vocab = PermissionVocabulary::new([
            PermissionToken::new("export"),
            PermissionToken::new("approve"),
            PermissionToken::new("export"),
        ]);
        let extras: Vec<&str> = vocab.extras().iter().map(|t| t.as_str()).collect();
        assert_eq!(extras, vec!["export", "approve"]);
    }

    #[test]
    fn empty_set_is_visible_but_actionless() {
        let set = PermissionSet::empty();
        assert!(set.is_empty());
        assert!(!set.contains("view"));
    }
}
