//! # Role Graph
//!
//! Roles and their direct "inherits from" edges. A role inherits every rule of
//! the roles it points at, transitively. The graph is kept acyclic: an edge
//! that would close a cycle is rejected before it is inserted.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{AclError, AclResult};

/// Directed, acyclic inheritance graph over role identifiers.
///
/// Roles and edges keep their registration order, which makes
/// [`RoleGraph::lineage`] deterministic.
///
/// # Example
///
/// ```
/// use platform_acl::RoleGraph;
///
/// let mut graph = RoleGraph::new();
/// graph.add_role("guest").unwrap();
/// graph.add_role("admin").unwrap();
/// graph.add_inherit("admin", "guest").unwrap();
///
/// assert!(graph.inherits("admin", "guest").unwrap());
/// assert!(!graph.inherits("guest", "admin").unwrap());
/// assert!(graph.add_inherit("guest", "admin").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoleGraph {
    /// Role -> directly inherited roles, in edge-registration order.
    edges: IndexMap<String, Vec<String>>,
}

impl RoleGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a role. Registering an existing role is a no-op.
    ///
    /// # Errors
    ///
    /// `InvalidIdentifier` for an empty id.
    pub fn add_role(&mut self, id: impl Into<String>) -> AclResult<()> {
        let id = id.into();
        if id.is_empty() {
            return Err(AclError::InvalidIdentifier(id));
        }
        self.edges.entry(id).or_default();
        Ok(())
    }

    /// Record that `parent` inherits the permissions of `child`.
    ///
    /// Adding an edge that already exists is a no-op.
    ///
    /// # Errors
    ///
    /// - `UnknownRole` if either role was never registered
    /// - `Cycle` if `parent` is already reachable from `child`
    pub fn add_inherit(&mut self, parent: &str, child: &str) -> AclResult<()> {
        for id in [parent, child] {
            if !self.contains(id) {
                return Err(AclError::UnknownRole(id.to_string()));
            }
        }

        if let Some(path) = self.find_path(child, parent) {
            return Err(AclError::Cycle {
                path: format!("{} -> {}", parent, path.join(" -> ")),
            });
        }

        let direct = self.edges.entry(parent.to_string()).or_default();
        if !direct.iter().any(|existing| existing == child) {
            direct.push(child.to_string());
        }
        Ok(())
    }

    /// Check if a role is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    /// Iterate over registered roles in registration order.
    pub fn roles(&self) -> impl Iterator<Item = &str> + '_ {
        self.edges.keys().map(String::as_str)
    }

    /// Roles directly inherited by `role`, or `None` if it is unknown.
    pub fn direct_inherits(&self, role: &str) -> Option<&[String]> {
        self.edges.get(role).map(Vec::as_slice)
    }

    /// Number of registered roles.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Check if no role is registered.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// The role itself followed by every role it transitively inherits.
    ///
    /// Traversal is breadth-first and follows edges in registration order.
    /// Each entry carries its distance from `role` (0 for the role itself).
    ///
    /// # Errors
    ///
    /// `UnknownRole` if `role` was never registered.
    pub fn lineage(&self, role: &str) -> AclResult<Vec<(&str, usize)>> {
        let (start, _) = self
            .edges
            .get_key_value(role)
            .ok_or_else(|| AclError::UnknownRole(role.to_string()))?;

        let mut order = vec![(start.as_str(), 0)];
        let mut seen = HashSet::from([start.as_str()]);
        let mut cursor = 0;

        while cursor < order.len() {
            let (current, distance) = order[cursor];
            cursor += 1;
            for next in &self.edges[current] {
                if seen.insert(next.as_str()) {
                    order.push((next.as_str(), distance + 1));
                }
            }
        }

        Ok(order)
    }

    /// Check if `other` is reachable from `role` (reflexive).
    ///
    /// # Errors
    ///
    /// `UnknownRole` if `role` was never registered.
    pub fn inherits(&self, role: &str, other: &str) -> AclResult<bool> {
        Ok(self.lineage(role)?.iter().any(|(id, _)| *id == other))
    }

    /// Shortest inheritance path from `from` to `to`, both ends included.
    fn find_path(&self, from: &str, to: &str) -> Option<Vec<&str>> {
        let (start, _) = self.edges.get_key_value(from)?;
        let start = start.as_str();

        let mut previous: HashMap<&str, &str> = HashMap::new();
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = vec![current];
                let mut cursor = current;
                while let Some(&prev) = previous.get(cursor) {
                    path.push(prev);
                    cursor = prev;
                }
                path.reverse();
                return Some(path);
            }
            for next in &self.edges[current] {
                if seen.insert(next.as_str()) {
                    previous.insert(next.as_str(), current);
                    queue.push_back(next.as_str());
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(roles: &[&str]) -> RoleGraph {
        let mut graph = RoleGraph::new();
        for role in roles {
            graph.add_role(*role).unwrap();
        }
        graph
    }

    #[test]
    fn test_add_role_is_idempotent() {
        let mut graph = graph(&["guest"]);
        graph.add_role("guest").unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.roles().collect::<Vec<_>>(), vec!["guest"]);
    }

    #[test]
    fn test_empty_role_rejected() {
        let mut graph = RoleGraph::new();
        assert_eq!(
            graph.add_role(""),
            Err(AclError::InvalidIdentifier(String::new()))
        );
        assert!(graph.is_empty());
    }

    #[test]
    fn test_inherit_unknown_role() {
        let mut graph = graph(&["admin"]);
        assert_eq!(
            graph.add_inherit("admin", "guest"),
            Err(AclError::UnknownRole("guest".to_string()))
        );
        assert_eq!(
            graph.add_inherit("ghost", "admin"),
            Err(AclError::UnknownRole("ghost".to_string()))
        );
    }

    #[test]
    fn test_two_role_cycle() {
        let mut graph = graph(&["a", "b"]);
        graph.add_inherit("a", "b").unwrap();
        assert_eq!(
            graph.add_inherit("b", "a"),
            Err(AclError::Cycle {
                path: "b -> a -> b".to_string()
            })
        );
        // The rejected edge was not inserted.
        assert!(!graph.inherits("b", "a").unwrap());
    }

    #[test]
    fn test_self_cycle() {
        let mut graph = graph(&["a"]);
        assert_eq!(
            graph.add_inherit("a", "a"),
            Err(AclError::Cycle {
                path: "a -> a".to_string()
            })
        );
    }

    #[test]
    fn test_long_cycle() {
        let mut graph = graph(&["a", "b", "c"]);
        graph.add_inherit("a", "b").unwrap();
        graph.add_inherit("b", "c").unwrap();
        let err = graph.add_inherit("c", "a").unwrap_err();
        assert_eq!(
            err,
            AclError::Cycle {
                path: "c -> a -> b -> c".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_edge_is_noop() {
        let mut graph = graph(&["admin", "guest"]);
        graph.add_inherit("admin", "guest").unwrap();
        graph.add_inherit("admin", "guest").unwrap();
        assert_eq!(graph.direct_inherits("admin").unwrap().len(), 1);
    }

    #[test]
    fn test_inherits_is_reflexive_and_transitive() {
        let mut graph = graph(&["guest", "member", "admin"]);
        graph.add_inherit("member", "guest").unwrap();
        graph.add_inherit("admin", "member").unwrap();

        assert!(graph.inherits("admin", "admin").unwrap());
        assert!(graph.inherits("admin", "guest").unwrap());
        assert!(!graph.inherits("guest", "member").unwrap());
        assert!(graph.inherits("ghost", "guest").is_err());
    }

    #[test]
    fn test_lineage_is_breadth_first_in_edge_order() {
        // admin -> [editor, auditor]; editor -> [guest]; auditor -> [viewer, guest]
        let mut graph = graph(&["guest", "viewer", "editor", "auditor", "admin"]);
        graph.add_inherit("admin", "editor").unwrap();
        graph.add_inherit("admin", "auditor").unwrap();
        graph.add_inherit("editor", "guest").unwrap();
        graph.add_inherit("auditor", "viewer").unwrap();
        graph.add_inherit("auditor", "guest").unwrap();

        let lineage = graph.lineage("admin").unwrap();
        assert_eq!(
            lineage,
            vec![
                ("admin", 0),
                ("editor", 1),
                ("auditor", 1),
                ("guest", 2),
                ("viewer", 2),
            ]
        );
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let mut graph = graph(&["base", "left", "right", "top"]);
        graph.add_inherit("left", "base").unwrap();
        graph.add_inherit("right", "base").unwrap();
        graph.add_inherit("top", "left").unwrap();
        graph.add_inherit("top", "right").unwrap();
        assert_eq!(graph.lineage("top").unwrap().len(), 4);
    }
}
