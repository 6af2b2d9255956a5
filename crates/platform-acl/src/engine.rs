//! # Access Engine
//!
//! Composes the role graph, resource catalog and rule set with a default
//! policy into an immutable decision component.
//!
//! ## Decision algorithm
//!
//! 1. The queried role must be registered.
//! 2. The resource must be registered, unless the engine runs with
//!    [`UnknownResourcePolicy::Deny`], which denies it instead.
//! 3. Candidate roles are the queried role followed by every inherited role
//!    in breadth-first order ([`RoleGraph::lineage`]).
//! 4. The first candidate with an explicit rule decides; within a single
//!    role deny wins over allow.
//! 5. Without an explicit rule the default policy applies.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::access_map::AccessMap;
use crate::config::{AclConfig, ConflictPolicy, DefaultPolicy, EngineOptions, UnknownResourcePolicy};
use crate::error::{AclError, AclResult};
use crate::resources::ResourceCatalog;
use crate::roles::RoleGraph;
use crate::rules::{Effect, RuleSet};
use crate::selector::{normalize_identifier, Selector};

/// Where a decision came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DecisionSource {
    /// An explicit rule of `role`, found `distance` inheritance steps away
    /// from the queried role.
    Rule {
        /// Role owning the deciding rule.
        role: String,
        /// 0 for the queried role itself.
        distance: usize,
        /// Polarity of the deciding rule.
        effect: Effect,
    },
    /// No rule applied.
    Default {
        /// The engine's default policy.
        policy: DefaultPolicy,
    },
    /// The resource is not registered and the engine denies unknown resources.
    UnknownResource,
}

/// Outcome of a query together with its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Whether access is granted.
    pub allowed: bool,
    /// What decided it.
    pub source: DecisionSource,
}

/// Immutable permission model answering access queries.
///
/// The engine owns its components and exposes them read-only, so it can be
/// shared across threads behind an `Arc` without locking. To change rules,
/// build a new engine and swap the `Arc`.
///
/// # Example
///
/// ```
/// use platform_acl::{AccessEngine, DefaultPolicy, EngineOptions, ResourceCatalog, RoleGraph, RuleSet};
///
/// let mut roles = RoleGraph::new();
/// roles.add_role("guest").unwrap();
/// roles.add_role("admin").unwrap();
/// roles.add_inherit("admin", "guest").unwrap();
///
/// let mut catalog = ResourceCatalog::new();
/// catalog.add_resource("shop", ["view", "buy"]).unwrap();
///
/// let mut rules = RuleSet::new();
/// rules.allow("guest", "shop", "*");
/// rules.deny("admin", "shop", "buy");
///
/// let engine = AccessEngine::new(roles, catalog, rules, DefaultPolicy::Deny, EngineOptions::default()).unwrap();
/// assert!(engine.is_allowed("admin", "shop", "view").unwrap());
/// assert!(!engine.is_allowed("admin", "shop", "buy").unwrap());
/// assert!(engine.is_allowed("nobody", "shop", "view").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct AccessEngine {
    roles: RoleGraph,
    catalog: ResourceCatalog,
    rules: RuleSet,
    default_policy: DefaultPolicy,
    options: EngineOptions,
}

impl AccessEngine {
    /// Validate the model and build an engine from it.
    ///
    /// # Errors
    ///
    /// - `UnknownRole` if a rule belongs to an unregistered role
    /// - `UnknownResource` if a rule names an unregistered resource
    /// - `UnknownAction` if a rule names an action its resource does not recognize
    /// - `ConflictingRule` if a triple is both allowed and denied under
    ///   [`ConflictPolicy::Reject`]
    pub fn new(
        roles: RoleGraph,
        catalog: ResourceCatalog,
        rules: RuleSet,
        default_policy: DefaultPolicy,
        options: EngineOptions,
    ) -> AclResult<Self> {
        for rule in rules.iter() {
            if !roles.contains(&rule.role) {
                return Err(AclError::UnknownRole(rule.role));
            }
            let Selector::Named(resource) = &rule.resource else {
                continue;
            };
            let Some(entry) = catalog.get(resource) else {
                return Err(AclError::UnknownResource(resource.clone()));
            };
            if let Selector::Named(action) = &rule.action {
                if !entry.recognizes(action) {
                    return Err(AclError::UnknownAction {
                        resource: resource.clone(),
                        action: action.clone(),
                    });
                }
            }
        }

        let conflicts = rules.conflicts();
        if let Some(conflict) = conflicts.first() {
            match options.conflicts {
                ConflictPolicy::Reject => {
                    return Err(AclError::ConflictingRule {
                        role: conflict.role.clone(),
                        resource: conflict.resource.to_string(),
                        action: conflict.action.to_string(),
                    });
                }
                ConflictPolicy::DenyWins => {
                    debug!(count = conflicts.len(), "Conflicting rules resolved as deny");
                }
            }
        }

        info!(
            roles = roles.len(),
            resources = catalog.len(),
            rules = rules.len(),
            default_policy = default_policy.as_str(),
            "Access engine built"
        );

        Ok(Self {
            roles,
            catalog,
            rules,
            default_policy,
            options,
        })
    }

    /// Build an engine from configuration tables.
    pub fn from_config(config: &AclConfig) -> AclResult<Self> {
        config.build()
    }

    /// Check whether `role` may perform `action` on `resource`.
    ///
    /// Resource and action identifiers are normalized to lower-camel case.
    /// Denial is an ordinary `Ok(false)`.
    ///
    /// # Errors
    ///
    /// - `UnknownRole` if `role` is not registered
    /// - `UnknownResource` if `resource` is not registered and unknown
    ///   resources are rejected
    pub fn is_allowed(&self, role: &str, resource: &str, action: &str) -> AclResult<bool> {
        self.decide(role, resource, action).map(|decision| decision.allowed)
    }

    /// Like [`AccessEngine::is_allowed`], also reporting what decided.
    pub fn decide(&self, role: &str, resource: &str, action: &str) -> AclResult<Decision> {
        let lineage = self.roles.lineage(role)?;
        let resource = normalize_identifier(resource);
        let action = normalize_identifier(action);

        if !self.catalog.contains(&resource) {
            return match self.options.unknown_resources {
                UnknownResourcePolicy::Reject => Err(AclError::UnknownResource(resource)),
                UnknownResourcePolicy::Deny => {
                    warn!(role, resource = %resource, action = %action, "Denying access to unknown resource");
                    Ok(Decision {
                        allowed: false,
                        source: DecisionSource::UnknownResource,
                    })
                }
            };
        }

        let decision = self.resolve(&lineage, &resource, &action);
        debug!(
            role,
            resource = %resource,
            action = %action,
            allowed = decision.allowed,
            "Access decision"
        );
        Ok(decision)
    }

    /// Compute the permission matrix of `role` over the whole catalog.
    ///
    /// Only listed actions are enumerated; the `*` sentinel never appears.
    ///
    /// # Errors
    ///
    /// `UnknownRole` if `role` is not registered.
    pub fn access_map(&self, role: &str) -> AclResult<AccessMap> {
        let lineage = self.roles.lineage(role)?;
        let mut map = AccessMap::new(role);

        for (resource, actions) in self.catalog.resources() {
            map.add_resource(resource);
            for action in actions {
                let decision = self.resolve(&lineage, resource, action);
                map.insert(resource, action, decision.allowed);
            }
        }

        Ok(map)
    }

    fn resolve(&self, lineage: &[(&str, usize)], resource: &str, action: &str) -> Decision {
        for &(candidate, distance) in lineage {
            if let Some(effect) = self
                .rules
                .lookup_normalized(candidate, resource, action)
                .effect()
            {
                return Decision {
                    allowed: effect.is_allow(),
                    source: DecisionSource::Rule {
                        role: candidate.to_string(),
                        distance,
                        effect,
                    },
                };
            }
        }

        Decision {
            allowed: self.default_policy.is_allow(),
            source: DecisionSource::Default {
                policy: self.default_policy,
            },
        }
    }

    /// The role graph.
    pub fn roles(&self) -> &RoleGraph {
        &self.roles
    }

    /// The resource catalog.
    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    /// The rule set.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// The default policy.
    pub fn default_policy(&self) -> DefaultPolicy {
        self.default_policy
    }

    /// The strictness options.
    pub fn options(&self) -> EngineOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop_engine(default_policy: DefaultPolicy, options: EngineOptions) -> AccessEngine {
        let mut roles = RoleGraph::new();
        for role in ["guest", "member", "admin"] {
            roles.add_role(role).unwrap();
        }
        roles.add_inherit("member", "guest").unwrap();
        roles.add_inherit("admin", "member").unwrap();

        let mut catalog = ResourceCatalog::new();
        catalog.add_resource("shop", ["view", "buy", "refund"]).unwrap();
        catalog.add_resource("login", ["index", "submit"]).unwrap();

        let mut rules = RuleSet::new();
        rules.allow("guest", "shop", "view");
        rules.allow("guest", "login", "*");
        rules.allow("member", "shop", "buy");
        rules.deny("member", "login", "index");
        rules.allow("admin", "*", "*");

        AccessEngine::new(roles, catalog, rules, default_policy, options).unwrap()
    }

    #[test]
    fn test_direct_and_inherited_rules() {
        let engine = shop_engine(DefaultPolicy::Deny, EngineOptions::default());

        assert!(engine.is_allowed("guest", "shop", "view").unwrap());
        assert!(!engine.is_allowed("guest", "shop", "buy").unwrap());
        assert!(engine.is_allowed("member", "shop", "view").unwrap());
        assert!(engine.is_allowed("member", "shop", "buy").unwrap());
        assert!(engine.is_allowed("member", "login", "submit").unwrap());
        assert!(!engine.is_allowed("member", "login", "index").unwrap());
    }

    #[test]
    fn test_closest_role_decides() {
        let engine = shop_engine(DefaultPolicy::Deny, EngineOptions::default());

        // admin's own allow-all beats member's deny on login:index.
        assert!(engine.is_allowed("admin", "login", "index").unwrap());
        assert_eq!(
            engine.decide("admin", "login", "index").unwrap().source,
            DecisionSource::Rule {
                role: "admin".to_string(),
                distance: 0,
                effect: Effect::Allow,
            }
        );

        // member's deny is closer than guest's allow.
        assert_eq!(
            engine.decide("member", "login", "index").unwrap().source,
            DecisionSource::Rule {
                role: "member".to_string(),
                distance: 0,
                effect: Effect::Deny,
            }
        );
    }

    #[test]
    fn test_default_policy() {
        let deny = shop_engine(DefaultPolicy::Deny, EngineOptions::default());
        let allow = shop_engine(DefaultPolicy::Allow, EngineOptions::default());

        assert!(!deny.is_allowed("guest", "shop", "refund").unwrap());
        assert!(allow.is_allowed("guest", "shop", "refund").unwrap());
        assert_eq!(
            allow.decide("guest", "shop", "refund").unwrap().source,
            DecisionSource::Default {
                policy: DefaultPolicy::Allow
            }
        );
    }

    #[test]
    fn test_unknown_role_is_an_error() {
        let engine = shop_engine(DefaultPolicy::Allow, EngineOptions::lenient());
        assert_eq!(
            engine.is_allowed("ghost", "shop", "view"),
            Err(AclError::UnknownRole("ghost".to_string()))
        );
        assert_eq!(
            engine.access_map("ghost"),
            Err(AclError::UnknownRole("ghost".to_string()))
        );
    }

    #[test]
    fn test_unknown_resource_modes() {
        let strict = shop_engine(DefaultPolicy::Allow, EngineOptions::default());
        assert_eq!(
            strict.is_allowed("admin", "Blog", "view"),
            Err(AclError::UnknownResource("blog".to_string()))
        );

        let lenient = shop_engine(DefaultPolicy::Allow, EngineOptions::lenient());
        let decision = lenient.decide("admin", "blog", "view").unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.source, DecisionSource::UnknownResource);
    }

    #[test]
    fn test_unlisted_action_is_evaluated() {
        let engine = shop_engine(DefaultPolicy::Deny, EngineOptions::default());
        // Not in the catalog's action list, but covered by admin's `*` rule.
        assert!(engine.is_allowed("admin", "shop", "audit").unwrap());
        assert!(!engine.is_allowed("guest", "shop", "audit").unwrap());
    }

    #[test]
    fn test_query_normalization() {
        let engine = shop_engine(DefaultPolicy::Deny, EngineOptions::default());
        assert!(engine.is_allowed("guest", "Shop", "View").unwrap());
        assert!(engine.is_allowed("guest", "Login", "Submit").unwrap());
    }

    #[test]
    fn test_access_map() {
        let engine = shop_engine(DefaultPolicy::Deny, EngineOptions::default());
        let map = engine.access_map("member").unwrap();

        assert_eq!(map.role(), "member");
        assert_eq!(map.get("shop", "view"), Some(true));
        assert_eq!(map.get("shop", "buy"), Some(true));
        assert_eq!(map.get("shop", "refund"), Some(false));
        assert_eq!(map.get("login", "index"), Some(false));
        assert_eq!(map.get("login", "submit"), Some(true));
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn test_rule_validation() {
        let mut roles = RoleGraph::new();
        roles.add_role("guest").unwrap();
        let mut catalog = ResourceCatalog::new();
        catalog.add_resource("shop", ["view"]).unwrap();

        let build = |rules: RuleSet| {
            AccessEngine::new(
                roles.clone(),
                catalog.clone(),
                rules,
                DefaultPolicy::Deny,
                EngineOptions::default(),
            )
        };

        let mut rules = RuleSet::new();
        rules.allow("ghost", "shop", "view");
        assert_eq!(build(rules).unwrap_err(), AclError::UnknownRole("ghost".to_string()));

        let mut rules = RuleSet::new();
        rules.allow("guest", "blog", "*");
        assert_eq!(build(rules).unwrap_err(), AclError::UnknownResource("blog".to_string()));

        let mut rules = RuleSet::new();
        rules.deny("guest", "shop", "buy");
        assert_eq!(
            build(rules).unwrap_err(),
            AclError::UnknownAction {
                resource: "shop".to_string(),
                action: "buy".to_string()
            }
        );

        // Actions are not checked when the resource is `*`.
        let mut rules = RuleSet::new();
        rules.allow("guest", "*", "anything");
        assert!(build(rules).is_ok());
    }

    #[test]
    fn test_conflict_policies() {
        let mut roles = RoleGraph::new();
        roles.add_role("guest").unwrap();
        let mut catalog = ResourceCatalog::new();
        catalog.add_resource("shop", ["view"]).unwrap();
        let mut rules = RuleSet::new();
        rules.allow("guest", "shop", "view");
        rules.deny("guest", "shop", "view");

        let engine = AccessEngine::new(
            roles.clone(),
            catalog.clone(),
            rules.clone(),
            DefaultPolicy::Allow,
            EngineOptions::default(),
        )
        .unwrap();
        assert!(!engine.is_allowed("guest", "shop", "view").unwrap());

        let err = AccessEngine::new(roles, catalog, rules, DefaultPolicy::Allow, EngineOptions::strict())
            .unwrap_err();
        assert_eq!(
            err,
            AclError::ConflictingRule {
                role: "guest".to_string(),
                resource: "shop".to_string(),
                action: "view".to_string(),
            }
        );
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AccessEngine>();
    }
}
