use serde::{Deserialize, Serialize};
use std::fmt;

/// Label returned by a node's finalize phase, used to pick the next node.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Action(String);

impl Action {
    /// Label used when a node returns no action.
    pub const DEFAULT: &'static str = "default";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }

    /// Maps an absent or empty action to [`Action::DEFAULT`].
    pub fn resolve(action: Option<&Action>) -> Action {
        match action {
            Some(action) if !action.0.is_empty() => action.clone(),
            _ => Action::default(),
        }
    }
}

impl Default for Action {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Action {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Action {
    fn from(label: &str) -> Self {
        Self(label.to_string())
    }
}

impl From<String> for Action {
    fn from(label: String) -> Self {
        Self(label)
    }
}

impl PartialEq<str> for Action {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Action {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absent_and_empty() {
        assert!(Action::resolve(None).is_default());
        assert!(Action::resolve(Some(&Action::from(""))).is_default());
        assert_eq!(Action::resolve(Some(&Action::from("search"))), "search");
    }

    #[test]
    fn test_display_and_default() {
        assert_eq!(Action::default().to_string(), "default");
        assert_eq!(Action::new("answer").as_str(), "answer");
    }
}
