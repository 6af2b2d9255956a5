//! # Resource Catalog
//!
//! The protectable resources known to the engine and the actions each of them
//! recognizes. The catalog is supplied by the host application, typically
//! generated from its routing table at startup.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{AclError, AclResult};
use crate::selector::{normalize_identifier, ANY};

/// A registered resource and its fixed action list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    /// Normalized resource identifier.
    pub id: String,
    /// Recognized actions in registration order, without the `*` sentinel.
    pub actions: Vec<String>,
    /// Whether the resource was registered with the `*` action.
    ///
    /// Such a resource accepts any action.
    pub any_action: bool,
}

impl Resource {
    /// Check if the resource recognizes an already normalized action.
    pub fn recognizes(&self, action: &str) -> bool {
        self.any_action || self.actions.iter().any(|a| a == action)
    }
}

/// Catalog of resources in registration order.
///
/// # Example
///
/// ```
/// use platform_acl::ResourceCatalog;
///
/// let mut catalog = ResourceCatalog::new();
/// catalog.add_resource("Login", ["index", "Submit"]).unwrap();
///
/// assert!(catalog.has_action("login", "submit"));
/// assert!(!catalog.has_action("login", "logout"));
/// assert!(catalog.add_resource("login", ["index"]).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    resources: IndexMap<String, Resource>,
}

impl ResourceCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource with the actions it recognizes.
    ///
    /// Identifiers are normalized; duplicate actions are dropped keeping the
    /// first occurrence. Including `*` makes the resource accept any action.
    ///
    /// # Errors
    ///
    /// - `DuplicateResource` if the (normalized) id is already registered
    /// - `InvalidIdentifier` for an empty id, a `*` resource id or an empty action
    pub fn add_resource<I, S>(&mut self, id: &str, actions: I) -> AclResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if id.is_empty() || id == ANY {
            return Err(AclError::InvalidIdentifier(id.to_string()));
        }
        let id = normalize_identifier(id);
        if self.resources.contains_key(&id) {
            return Err(AclError::DuplicateResource(id));
        }

        let mut resource = Resource {
            id: id.clone(),
            actions: Vec::new(),
            any_action: false,
        };
        for action in actions {
            let action = action.as_ref();
            if action.is_empty() {
                return Err(AclError::InvalidIdentifier(action.to_string()));
            }
            if action == ANY {
                resource.any_action = true;
                continue;
            }
            let action = normalize_identifier(action);
            if !resource.actions.contains(&action) {
                resource.actions.push(action);
            }
        }

        self.resources.insert(id, resource);
        Ok(())
    }

    /// Check if a resource is registered.
    pub fn contains(&self, resource: &str) -> bool {
        self.resources.contains_key(&normalize_identifier(resource))
    }

    /// Look up a registered resource.
    pub fn get(&self, resource: &str) -> Option<&Resource> {
        self.resources.get(&normalize_identifier(resource))
    }

    /// Check if `resource` recognizes `action`.
    ///
    /// Returns `false` for unknown resources.
    pub fn has_action(&self, resource: &str, action: &str) -> bool {
        self.get(resource)
            .map(|r| r.recognizes(&normalize_identifier(action)))
            .unwrap_or(false)
    }

    /// Iterate over `(resource, actions)` pairs in registration order.
    ///
    /// The `*` sentinel is never part of the yielded action lists.
    pub fn resources(&self) -> impl Iterator<Item = (&str, &[String])> + '_ {
        self.resources
            .values()
            .map(|r| (r.id.as_str(), r.actions.as_slice()))
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_resource() {
        let mut catalog = ResourceCatalog::new();
        catalog.add_resource("login", ["index", "submit"]).unwrap();
        catalog.add_resource("shop", ["view", "buy"]).unwrap();

        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("login"));
        assert!(catalog.has_action("shop", "buy"));
        assert!(!catalog.has_action("shop", "index"));
        assert!(!catalog.has_action("missing", "index"));
    }

    #[test]
    fn test_duplicate_resource() {
        let mut catalog = ResourceCatalog::new();
        catalog.add_resource("login", ["index"]).unwrap();
        assert_eq!(
            catalog.add_resource("Login", ["submit"]),
            Err(AclError::DuplicateResource("login".to_string()))
        );
        assert_eq!(catalog.get("login").unwrap().actions, vec!["index"]);
    }

    #[test]
    fn test_reserved_and_empty_identifiers() {
        let mut catalog = ResourceCatalog::new();
        assert!(matches!(
            catalog.add_resource("*", ["index"]),
            Err(AclError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            catalog.add_resource("", ["index"]),
            Err(AclError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            catalog.add_resource("login", [""]),
            Err(AclError::InvalidIdentifier(_))
        ));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_any_action_sentinel() {
        let mut catalog = ResourceCatalog::new();
        catalog.add_resource("reports", ["*", "export"]).unwrap();

        assert!(catalog.has_action("reports", "export"));
        assert!(catalog.has_action("reports", "anything"));

        let listed: Vec<_> = catalog.resources().collect();
        assert_eq!(listed, vec![("reports", &["export".to_string()][..])]);
    }

    #[test]
    fn test_identifiers_are_normalized() {
        let mut catalog = ResourceCatalog::new();
        catalog
            .add_resource("UserProfile", ["Edit", "edit", "viewHistory"])
            .unwrap();

        let resource = catalog.get("userProfile").unwrap();
        assert_eq!(resource.id, "userProfile");
        assert_eq!(resource.actions, vec!["edit", "viewHistory"]);
        assert!(catalog.has_action("UserProfile", "ViewHistory"));
    }

    #[test]
    fn test_resources_in_registration_order() {
        let mut catalog = ResourceCatalog::new();
        catalog.add_resource("zeta", ["a"]).unwrap();
        catalog.add_resource("alpha", ["b"]).unwrap();
        catalog.add_resource("mid", Vec::<String>::new()).unwrap();

        let ids: Vec<_> = catalog.resources().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);

        // Restartable: a second pass yields the same sequence.
        let again: Vec<_> = catalog.resources().map(|(id, _)| id).collect();
        assert_eq!(ids, again);
    }
}
