//! # Platform ACL (Access-Control Decision Engine)
//!
//! This crate answers "may role R perform action A on resource X?" for the
//! Relay platform, from a permission model that is built once at startup and
//! queried read-only afterwards.
//!
//! ## Overview
//!
//! The platform-acl crate handles:
//! - **Roles**: Named principals that inherit rules from other roles
//! - **Resources**: Protectable entities, each with a fixed action list
//! - **Rules**: Explicit allow/deny entries with a `*` sentinel for
//!   "all resources" and "all actions"
//! - **Engine**: Inheritance-aware resolution with a default policy
//! - **Access Maps**: The full allow/deny matrix of one role
//! - **Dispatch Guard**: Per-request check wired to host callbacks
//!
//! ## Architecture
//!
//! ```text
//! AclConfig (roles, resources, allow, deny, default_policy, options)
//!   └─ AccessEngine (immutable, shared behind Arc)
//!        ├─ RoleGraph        acyclic inheritance, BFS lineage
//!        ├─ ResourceCatalog  resource -> actions
//!        └─ RuleSet          role -> allow / deny targets
//!              ▲
//!   DispatchGuard ── resolve role + controller/action ── on_allowed / on_denied
//! ```
//!
//! ## Resolution
//!
//! The queried role and then every inherited role, closest first, are looked
//! up in turn. The first role with a matching rule decides; within one role
//! deny wins over allow. Without a matching rule the default policy applies.
//! Unknown roles are always errors, never a silent deny.
//!
//! ## Usage
//!
//! ```rust
//! use platform_acl::AclConfig;
//!
//! let config = AclConfig::from_json(r#"{
//!     "roles": { "guest": [], "admin": ["guest"] },
//!     "resources": { "shop": ["view", "buy"], "login": ["index", "submit"] },
//!     "allow": { "guest": { "shop": ["*"], "login": ["*"] } },
//!     "deny": { "admin": { "shop": ["view"] } },
//!     "default_policy": "deny"
//! }"#).unwrap();
//!
//! let engine = config.build().unwrap();
//!
//! // Inherited from guest
//! assert!(engine.is_allowed("admin", "shop", "buy").unwrap());
//! // admin's own deny is closer than guest's allow
//! assert!(!engine.is_allowed("admin", "shop", "view").unwrap());
//! // Unknown roles are errors
//! assert!(engine.is_allowed("nobody", "shop", "view").is_err());
//!
//! let map = engine.access_map("guest").unwrap();
//! assert_eq!(map.get("login", "submit"), Some(true));
//! ```
//!
//! ## Identifier Normalization
//!
//! Resource and action identifiers are normalized to lower-camel case (first
//! character lower-cased) everywhere they enter the engine, so `"Login"` and
//! `"login"` name the same resource. Role identifiers are case-sensitive.
//!
//! ## Configuration
//!
//! - `ACL_DEFAULT_POLICY`: `allow` or `deny`
//! - `ACL_UNKNOWN_RESOURCES`: `reject` (error) or `deny` (implicit deny)
//! - `ACL_CONFLICTS`: `deny_wins` or `reject`

pub mod access_map;
pub mod config;
pub mod engine;
pub mod error;
pub mod guard;
pub mod resources;
pub mod roles;
pub mod rules;
pub mod selector;

// Re-export main types for convenience
pub use access_map::AccessMap;
pub use config::{
    AclConfig, ConflictPolicy, DefaultPolicy, EngineOptions, RuleTable, UnknownResourcePolicy,
};
pub use engine::{AccessEngine, Decision, DecisionSource};
pub use error::{AclError, AclResult};
pub use guard::{AccessRequest, DispatchGuard};
pub use resources::{Resource, ResourceCatalog};
pub use roles::RoleGraph;
pub use rules::{Effect, Rule, RuleMatch, RuleSet};
pub use selector::{normalize_identifier, Selector, ANY};
