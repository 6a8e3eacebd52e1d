//! Finalizer tokens

use serde::{Deserialize, Serialize};

/// Ordered set of finalizer tokens
///
/// Insertion order is preserved so serialized Works stay stable. Every
/// operation is idempotent: adding a present token or removing an absent
/// one reports `false` and leaves the set untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinalizerSet(Vec<String>);

impl FinalizerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }

    /// Returns `true` if the token was added
    pub fn add(&mut self, token: impl Into<String>) -> bool {
        let token = token.into();
        if self.contains(&token) {
            return false;
        }
        self.0.push(token);
        true
    }

    /// Returns `true` if the token was present
    pub fn remove(&mut self, token: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|t| t != token);
        self.0.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for FinalizerSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = FinalizerSet::new();
        for token in iter {
            set.add(token);
        }
        set
    }
}
