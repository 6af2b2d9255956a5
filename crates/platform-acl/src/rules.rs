//! # Rules
//!
//! Explicit allow and deny entries keyed by role, resource and action.
//! Resource and action may each be the `*` sentinel.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::selector::{normalize_identifier, Selector};

/// Polarity of a rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Grants access.
    Allow,
    /// Refuses access.
    Deny,
}

impl Effect {
    /// Get the string representation of the effect.
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Deny => "deny",
        }
    }

    /// Check if this effect grants access.
    pub fn is_allow(&self) -> bool {
        matches!(self, Effect::Allow)
    }
}

/// A single explicit rule.
///
/// # Example
///
/// ```
/// use platform_acl::{Effect, Rule};
///
/// let rule = Rule::new("guest", "Shop", "*", Effect::Allow);
/// assert_eq!(rule.to_string(), "allow guest shop:*");
/// assert!(rule.matches("guest", "shop", "view"));
/// assert!(!rule.matches("admin", "shop", "view"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rule {
    /// Role the rule belongs to.
    pub role: String,
    /// Resource identifier or `*`.
    pub resource: Selector,
    /// Action identifier or `*`.
    pub action: Selector,
    /// Allow or deny.
    pub effect: Effect,
}

impl Rule {
    /// Create a rule, normalizing the resource and action.
    pub fn new(
        role: impl Into<String>,
        resource: impl Into<Selector>,
        action: impl Into<Selector>,
        effect: Effect,
    ) -> Self {
        Self {
            role: role.into(),
            resource: resource.into(),
            action: action.into(),
            effect,
        }
    }

    /// Check if this rule applies to a query on normalized identifiers.
    pub fn matches(&self, role: &str, resource: &str, action: &str) -> bool {
        self.role == role && self.resource.matches(resource) && self.action.matches(action)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}:{}",
            self.effect.as_str(),
            self.role,
            self.resource,
            self.action
        )
    }
}

/// Outcome of looking up one role's rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMatch {
    /// At least one allow rule matched and no deny rule did.
    ExplicitAllow,
    /// At least one deny rule matched.
    ExplicitDeny,
    /// Nothing matched.
    NoRule,
}

impl RuleMatch {
    /// The effect behind an explicit match.
    pub fn effect(&self) -> Option<Effect> {
        match self {
            RuleMatch::ExplicitAllow => Some(Effect::Allow),
            RuleMatch::ExplicitDeny => Some(Effect::Deny),
            RuleMatch::NoRule => None,
        }
    }
}

type Targets = IndexSet<(Selector, Selector)>;

/// Allow and deny rules, stored per role and per polarity.
///
/// Recording the same triple with both polarities is accepted; deny wins
/// during [`RuleSet::lookup`].
///
/// # Example
///
/// ```
/// use platform_acl::{RuleMatch, RuleSet};
///
/// let mut rules = RuleSet::new();
/// rules.allow("guest", "shop", "*");
/// rules.deny("guest", "shop", "checkout");
///
/// assert_eq!(rules.lookup("guest", "shop", "view"), RuleMatch::ExplicitAllow);
/// assert_eq!(rules.lookup("guest", "shop", "checkout"), RuleMatch::ExplicitDeny);
/// assert_eq!(rules.lookup("admin", "shop", "view"), RuleMatch::NoRule);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    allow: IndexMap<String, Targets>,
    deny: IndexMap<String, Targets>,
}

impl RuleSet {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an allow rule.
    pub fn allow(
        &mut self,
        role: impl Into<String>,
        resource: impl Into<Selector>,
        action: impl Into<Selector>,
    ) {
        self.add(Rule::new(role, resource, action, Effect::Allow));
    }

    /// Record a deny rule.
    pub fn deny(
        &mut self,
        role: impl Into<String>,
        resource: impl Into<Selector>,
        action: impl Into<Selector>,
    ) {
        self.add(Rule::new(role, resource, action, Effect::Deny));
    }

    /// Record a rule of either polarity. Re-adding a rule is a no-op.
    pub fn add(&mut self, rule: Rule) {
        let table = match rule.effect {
            Effect::Allow => &mut self.allow,
            Effect::Deny => &mut self.deny,
        };
        table
            .entry(rule.role)
            .or_default()
            .insert((rule.resource, rule.action));
    }

    /// Resolve the rules of a single role for a query.
    ///
    /// A stored rule matches when its resource and action are equal to the
    /// queried ones or are `*`. Deny takes precedence over allow.
    pub fn lookup(&self, role: &str, resource: &str, action: &str) -> RuleMatch {
        self.lookup_normalized(
            role,
            &normalize_identifier(resource),
            &normalize_identifier(action),
        )
    }

    pub(crate) fn lookup_normalized(&self, role: &str, resource: &str, action: &str) -> RuleMatch {
        if Self::any_match(self.deny.get(role), resource, action) {
            RuleMatch::ExplicitDeny
        } else if Self::any_match(self.allow.get(role), resource, action) {
            RuleMatch::ExplicitAllow
        } else {
            RuleMatch::NoRule
        }
    }

    fn any_match(targets: Option<&Targets>, resource: &str, action: &str) -> bool {
        let Some(targets) = targets else {
            return false;
        };
        let resource = Selector::Named(resource.to_string());
        let action = Selector::Named(action.to_string());

        // Most specific first; all four forms are equivalent for the verdict.
        let candidates = [
            (resource.clone(), action.clone()),
            (resource, Selector::Any),
            (Selector::Any, action),
            (Selector::Any, Selector::Any),
        ];
        candidates.iter().any(|key| targets.contains(key))
    }

    /// Iterate over every stored rule, allow rules first.
    pub fn iter(&self) -> impl Iterator<Item = Rule> + '_ {
        let allow = Self::expand(&self.allow, Effect::Allow);
        let deny = Self::expand(&self.deny, Effect::Deny);
        allow.chain(deny)
    }

    fn expand(
        table: &IndexMap<String, Targets>,
        effect: Effect,
    ) -> impl Iterator<Item = Rule> + '_ {
        table.iter().flat_map(move |(role, targets)| {
            targets.iter().map(move |(resource, action)| Rule {
                role: role.clone(),
                resource: resource.clone(),
                action: action.clone(),
                effect,
            })
        })
    }

    /// Triples recorded with both polarities, reported as their deny rule.
    pub fn conflicts(&self) -> Vec<Rule> {
        Self::expand(&self.deny, Effect::Deny)
            .filter(|rule| {
                self.allow
                    .get(&rule.role)
                    .map(|targets| targets.contains(&(rule.resource.clone(), rule.action.clone())))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Total number of stored rules.
    pub fn len(&self) -> usize {
        self.allow.values().chain(self.deny.values()).map(IndexSet::len).sum()
    }

    /// Check if no rule is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        let mut set = RuleSet::new();
        for rule in iter {
            set.add(rule);
        }
        set
    }
}
