//! # Selectors
//!
//! Resource and action identifiers as they appear in rules, plus the
//! identifier normalization shared by every entry point of the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved identifier meaning "every resource" or "every action".
pub const ANY: &str = "*";

/// Normalize a resource or action identifier to lower-camel case.
///
/// Only the first character is lower-cased, so `"SubmitOrder"` becomes
/// `"submitOrder"` while `"submitOrder"` is left untouched. The `*`
/// sentinel passes through unchanged.
///
/// # Example
///
/// ```
/// use platform_acl::normalize_identifier;
///
/// assert_eq!(normalize_identifier("Login"), "login");
/// assert_eq!(normalize_identifier("SubmitOrder"), "submitOrder");
/// assert_eq!(normalize_identifier("index"), "index");
/// ```
pub fn normalize_identifier(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The resource or action half of a rule.
///
/// Either a concrete (normalized) identifier or the `*` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Selector {
    /// Matches every identifier.
    Any,
    /// Matches exactly one identifier.
    Named(String),
}

impl Selector {
    /// Parse a selector, normalizing concrete identifiers.
    ///
    /// # Example
    ///
    /// ```
    /// use platform_acl::Selector;
    ///
    /// assert_eq!(Selector::parse("*"), Selector::Any);
    /// assert_eq!(Selector::parse("Shop"), Selector::Named("shop".to_string()));
    /// ```
    pub fn parse(s: &str) -> Self {
        if s == ANY {
            Selector::Any
        } else {
            Selector::Named(normalize_identifier(s))
        }
    }

    /// Get the string form (`*` for [`Selector::Any`]).
    pub fn as_str(&self) -> &str {
        match self {
            Selector::Any => ANY,
            Selector::Named(id) => id,
        }
    }

    /// Check whether this is the `*` sentinel.
    pub fn is_any(&self) -> bool {
        matches!(self, Selector::Any)
    }

    /// Check whether this selector covers an already normalized identifier.
    pub fn matches(&self, id: &str) -> bool {
        match self {
            Selector::Any => true,
            Selector::Named(name) => name == id,
        }
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        Selector::parse(s)
    }
}

impl From<String> for Selector {
    fn from(s: String) -> Self {
        Selector::parse(&s)
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        match selector {
            Selector::Any => ANY.to_string(),
            Selector::Named(id) => id,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
