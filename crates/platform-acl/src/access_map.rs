//! # Access Map
//!
//! The full permission matrix of one role: every catalog resource mapped to
//! each of its actions and whether the role may perform it.

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Resource -> (action -> allowed) for a single role.
///
/// Entries follow catalog registration order. Serializes as a nested map
/// with `1` for allowed and `0` for denied actions.
///
/// # Example
///
/// ```
/// use platform_acl::AclConfig;
///
/// let engine = AclConfig::from_json(r#"{
///     "roles": { "guest": [] },
///     "resources": { "login": ["index", "submit"] },
///     "allow": { "guest": { "login": ["*"] } }
/// }"#).unwrap().build().unwrap();
///
/// let map = engine.access_map("guest").unwrap();
/// assert_eq!(map.get("login", "submit"), Some(true));
/// assert_eq!(
///     serde_json::to_string(&map).unwrap(),
///     r#"{"login":{"index":1,"submit":1}}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessMap {
    role: String,
    entries: IndexMap<String, IndexMap<String, bool>>,
}

impl AccessMap {
    pub(crate) fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            entries: IndexMap::new(),
        }
    }

    pub(crate) fn add_resource(&mut self, resource: &str) {
        self.entries.entry(resource.to_string()).or_default();
    }

    pub(crate) fn insert(&mut self, resource: &str, action: &str, allowed: bool) {
        self.entries
            .entry(resource.to_string())
            .or_default()
            .insert(action.to_string(), allowed);
    }

    /// The role this map was computed for.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Whether `action` on `resource` is allowed, if both are in the map.
    pub fn get(&self, resource: &str, action: &str) -> Option<bool> {
        self.entries.get(resource)?.get(action).copied()
    }

    /// The action column of one resource.
    pub fn actions(&self, resource: &str) -> Option<&IndexMap<String, bool>> {
        self.entries.get(resource)
    }

    /// Resources in catalog order.
    pub fn resources(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Every `(resource, action, allowed)` cell in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, bool)> + '_ {
        self.entries.iter().flat_map(|(resource, actions)| {
            actions
                .iter()
                .map(move |(action, allowed)| (resource.as_str(), action.as_str(), *allowed))
        })
    }

    /// Only the allowed `(resource, action)` pairs.
    pub fn allowed(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.iter()
            .filter(|(_, _, allowed)| *allowed)
            .map(|(resource, action, _)| (resource, action))
    }

    /// Number of `(resource, action)` cells.
    pub fn len(&self) -> usize {
        self.entries.values().map(IndexMap::len).sum()
    }

    /// Check if the map has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for AccessMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (resource, actions) in &self.entries {
            let flags: IndexMap<&str, u8> = actions
                .iter()
                .map(|(action, allowed)| (action.as_str(), u8::from(*allowed)))
                .collect();
            map.serialize_entry(resource, &flags)?;
        }
        map.end()
    }
}
