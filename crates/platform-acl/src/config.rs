//! Access-control configuration.
//!
//! The permission model is described by plain tables (roles, resources,
//! allow and deny rules) plus a default policy and engine options. Tables are
//! insertion-ordered so that registration order follows the configuration
//! document, and a key repeated within one table is a parse error rather than
//! a silent overwrite. Engine options can be overridden from environment
//! variables.

use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::engine::AccessEngine;
use crate::error::{AclError, AclResult};
use crate::resources::ResourceCatalog;
use crate::roles::RoleGraph;
use crate::rules::{Effect, Rule, RuleSet};

/// Environment variable overriding [`AclConfig::default_policy`].
pub const ENV_DEFAULT_POLICY: &str = "ACL_DEFAULT_POLICY";
/// Environment variable overriding [`EngineOptions::unknown_resources`].
pub const ENV_UNKNOWN_RESOURCES: &str = "ACL_UNKNOWN_RESOURCES";
/// Environment variable overriding [`EngineOptions::conflicts`].
pub const ENV_CONFLICTS: &str = "ACL_CONFLICTS";

/// Verdict returned when no explicit rule applies.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPolicy {
    /// Everything not explicitly denied is allowed.
    Allow,
    /// Everything not explicitly allowed is denied.
    #[default]
    Deny,
}

impl DefaultPolicy {
    /// Get the string representation of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultPolicy::Allow => "allow",
            DefaultPolicy::Deny => "deny",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "allow" => Some(DefaultPolicy::Allow),
            "deny" => Some(DefaultPolicy::Deny),
            _ => None,
        }
    }

    /// Check if the policy grants access.
    pub fn is_allow(&self) -> bool {
        matches!(self, DefaultPolicy::Allow)
    }
}

/// How queries against unregistered resources are answered.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnknownResourcePolicy {
    /// Fail the query with `UnknownResource`.
    #[default]
    Reject,
    /// Answer with an implicit deny.
    Deny,
}

impl UnknownResourcePolicy {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "reject" | "strict" | "error" => Some(UnknownResourcePolicy::Reject),
            "deny" | "lenient" => Some(UnknownResourcePolicy::Deny),
            _ => None,
        }
    }
}

/// How a triple recorded as both allowed and denied is handled.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Keep both rules; deny takes precedence at query time.
    #[default]
    DenyWins,
    /// Refuse to build the engine with `ConflictingRule`.
    Reject,
}

impl ConflictPolicy {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "deny_wins" | "deny-wins" | "denywins" => Some(ConflictPolicy::DenyWins),
            "reject" | "strict" => Some(ConflictPolicy::Reject),
            _ => None,
        }
    }
}

/// Engine strictness options.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineOptions {
    /// Handling of queries against unregistered resources.
    #[serde(default)]
    pub unknown_resources: UnknownResourcePolicy,

    /// Handling of conflicting allow/deny rules at construction.
    #[serde(default)]
    pub conflicts: ConflictPolicy,
}

impl EngineOptions {
    /// Options that deny unknown resources instead of failing.
    pub fn lenient() -> Self {
        Self {
            unknown_resources: UnknownResourcePolicy::Deny,
            ..Self::default()
        }
    }

    /// Options that reject unknown resources and conflicting rules.
    pub fn strict() -> Self {
        Self {
            unknown_resources: UnknownResourcePolicy::Reject,
            conflicts: ConflictPolicy::Reject,
        }
    }

    /// Load options from environment variables.
    ///
    /// Environment variables:
    /// - `ACL_UNKNOWN_RESOURCES`: `reject` (default) or `deny`
    /// - `ACL_CONFLICTS`: `deny_wins` (default) or `reject`
    pub fn from_env() -> AclResult<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`; unset keys keep their value.
    pub fn with_overrides<F>(mut self, lookup: F) -> AclResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_UNKNOWN_RESOURCES) {
            self.unknown_resources = UnknownResourcePolicy::parse(&value)
                .ok_or_else(|| invalid_value(ENV_UNKNOWN_RESOURCES, &value, "reject, deny"))?;
        }
        if let Some(value) = lookup(ENV_CONFLICTS) {
            self.conflicts = ConflictPolicy::parse(&value)
                .ok_or_else(|| invalid_value(ENV_CONFLICTS, &value, "deny_wins, reject"))?;
        }
        Ok(self)
    }
}

fn invalid_value(key: &str, value: &str, expected: &str) -> AclError {
    AclError::Config {
        key: key.to_string(),
        message: format!("unrecognized value {value:?} (expected one of: {expected})"),
    }
}

/// Rule table: role -> (resource or `*`) -> list of actions (or `*`).
pub type RuleTable = IndexMap<String, IndexMap<String, Vec<String>>>;

/// Full permission-model configuration.
///
/// # Example
///
/// ```
/// use platform_acl::AclConfig;
///
/// let config = AclConfig::from_json(r#"{
///     "roles": { "guest": [], "admin": ["guest"] },
///     "resources": { "login": ["index", "submit"], "shop": ["view", "buy"] },
///     "allow": { "guest": { "login": ["*"] }, "admin": { "*": ["*"] } },
///     "deny": { "admin": { "shop": ["buy"] } },
///     "default_policy": "deny"
/// }"#).unwrap();
///
/// let engine = config.build().unwrap();
/// assert!(engine.is_allowed("admin", "login", "submit").unwrap());
/// assert!(!engine.is_allowed("admin", "shop", "buy").unwrap());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AclConfig {
    /// Role -> directly inherited roles.
    #[serde(default, deserialize_with = "unique_map")]
    pub roles: IndexMap<String, Vec<String>>,

    /// Resource -> recognized actions.
    #[serde(default, deserialize_with = "unique_map")]
    pub resources: IndexMap<String, Vec<String>>,

    /// Allow rules.
    #[serde(default, deserialize_with = "unique_rule_table")]
    pub allow: RuleTable,

    /// Deny rules.
    #[serde(default, deserialize_with = "unique_rule_table")]
    pub deny: RuleTable,

    /// Verdict when no rule applies.
    #[serde(default)]
    pub default_policy: DefaultPolicy,

    /// Strictness options.
    #[serde(default)]
    pub options: EngineOptions,
}

impl AclConfig {
    /// Parse a configuration from a JSON document.
    pub fn from_json(json: &str) -> AclResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply `ACL_DEFAULT_POLICY`, `ACL_UNKNOWN_RESOURCES` and `ACL_CONFLICTS`
    /// from the environment.
    pub fn with_env(self) -> AclResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`; unset keys keep their value.
    pub fn with_overrides<F>(mut self, lookup: F) -> AclResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DEFAULT_POLICY) {
            self.default_policy = DefaultPolicy::parse(&value)
                .ok_or_else(|| invalid_value(ENV_DEFAULT_POLICY, &value, "allow, deny"))?;
        }
        self.options = self.options.with_overrides(lookup)?;
        Ok(self)
    }

    /// Build the role graph.
    ///
    /// All roles are registered before any edge, so a role may inherit one
    /// declared later in the table.
    pub fn role_graph(&self) -> AclResult<RoleGraph> {
        let mut graph = RoleGraph::new();
        for role in self.roles.keys() {
            graph.add_role(role.as_str())?;
        }
        for (role, inherits) in &self.roles {
            for child in inherits {
                graph.add_inherit(role, child)?;
            }
        }
        Ok(graph)
    }

    /// Build the resource catalog.
    pub fn resource_catalog(&self) -> AclResult<ResourceCatalog> {
        let mut catalog = ResourceCatalog::new();
        for (resource, actions) in &self.resources {
            catalog.add_resource(resource, actions)?;
        }
        Ok(catalog)
    }

    /// Build the rule set from the allow and deny tables.
    pub fn rule_set(&self) -> RuleSet {
        let allow = expand_table(&self.allow, Effect::Allow);
        let deny = expand_table(&self.deny, Effect::Deny);
        allow.chain(deny).collect()
    }

    /// Build an immutable engine from this configuration.
    ///
    /// # Errors
    ///
    /// Any construction error; no engine is returned in that case.
    pub fn build(&self) -> AclResult<AccessEngine> {
        AccessEngine::new(
            self.role_graph()?,
            self.resource_catalog()?,
            self.rule_set(),
            self.default_policy,
            self.options,
        )
    }
}

fn expand_table(table: &RuleTable, effect: Effect) -> impl Iterator<Item = Rule> + '_ {
    table.iter().flat_map(move |(role, resources)| {
        resources.iter().flat_map(move |(resource, actions)| {
            actions
                .iter()
                .map(move |action| Rule::new(role.as_str(), resource.as_str(), action.as_str(), effect))
        })
    })
}

/// Map that refuses repeated keys while deserializing.
struct UniqueMap<V>(IndexMap<String, V>);

struct UniqueMapVisitor<V>(PhantomData<V>);

impl<'de, V> Visitor<'de> for UniqueMapVisitor<V>
where
    V: Deserialize<'de>,
{
    type Value = UniqueMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map with unique keys")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(key) = access.next_key::<String>()? {
            if map.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate key `{key}`")));
            }
            let value = access.next_value()?;
            map.insert(key, value);
        }
        Ok(UniqueMap(map))
    }
}

impl<'de, V> Deserialize<'de> for UniqueMap<V>
where
    V: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(UniqueMapVisitor(PhantomData))
    }
}

fn unique_map<'de, D, V>(deserializer: D) -> Result<IndexMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    UniqueMap::deserialize(deserializer).map(|map| map.0)
}

fn unique_rule_table<'de, D>(deserializer: D) -> Result<RuleTable, D::Error>
where
    D: Deserializer<'de>,
{
    let table: IndexMap<String, UniqueMap<Vec<String>>> = unique_map(deserializer)?;
    Ok(table
        .into_iter()
        .map(|(role, resources)| (role, resources.0))
        .collect())
}
