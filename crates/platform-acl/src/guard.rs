//! Dispatch guard
//!
//! Thin adapter run by the host application before handling a request. It
//! resolves the active role and the targeted controller/action through
//! caller-supplied hooks, asks the engine, and hands the outcome to one of two
//! callbacks whose return value becomes the guard's own.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::engine::AccessEngine;
use crate::error::AclResult;
use crate::selector::normalize_identifier;

/// The normalized triple a guard checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessRequest {
    /// Active role.
    pub role: String,
    /// Controller, normalized to lower-camel case.
    pub resource: String,
    /// Action, normalized to lower-camel case.
    pub action: String,
}

type Resolver<Req, Out> = Box<dyn Fn(&Req) -> Out + Send + Sync>;
type Outcome<T> = Box<dyn Fn(&AccessRequest) -> T + Send + Sync>;

/// Per-request access check wired to host callbacks.
///
/// `Req` is the host's request type and `T` whatever the callbacks return,
/// typically a flag telling the host whether to continue dispatching.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use platform_acl::{AclConfig, DispatchGuard};
///
/// struct Request { role: &'static str, path: &'static str }
///
/// let engine = AclConfig::from_json(r#"{
///     "roles": { "guest": [] },
///     "resources": { "login": ["index", "submit"] },
///     "allow": { "guest": { "login": ["index"] } }
/// }"#).unwrap().build().unwrap();
///
/// let guard = DispatchGuard::new(
///     Arc::new(engine),
///     |req: &Request| {
///         let (controller, action) = req.path.split_once('/').unwrap_or((req.path, "index"));
///         (controller.to_string(), action.to_string())
///     },
///     |req: &Request| req.role.to_string(),
///     |_| true,
///     |_| false,
/// );
///
/// assert!(guard.before_dispatch(&Request { role: "guest", path: "Login/Index" }).unwrap());
/// assert!(!guard.before_dispatch(&Request { role: "guest", path: "login/submit" }).unwrap());
/// ```
pub struct DispatchGuard<Req, T> {
    engine: Arc<AccessEngine>,
    resolve_request: Resolver<Req, (String, String)>,
    resolve_role: Resolver<Req, String>,
    on_allowed: Outcome<T>,
    on_denied: Outcome<T>,
}

impl<Req, T> DispatchGuard<Req, T> {
    /// Create a guard.
    ///
    /// # Arguments
    ///
    /// * `engine` - Shared engine to query
    /// * `resolve_request` - Extracts `(controller, action)` from a request
    /// * `resolve_role` - Extracts the active role from a request
    /// * `on_allowed` - Called when access is granted
    /// * `on_denied` - Called when access is refused
    pub fn new<RR, RO, OA, OD>(
        engine: Arc<AccessEngine>,
        resolve_request: RR,
        resolve_role: RO,
        on_allowed: OA,
        on_denied: OD,
    ) -> Self
    where
        RR: Fn(&Req) -> (String, String) + Send + Sync + 'static,
        RO: Fn(&Req) -> String + Send + Sync + 'static,
        OA: Fn(&AccessRequest) -> T + Send + Sync + 'static,
        OD: Fn(&AccessRequest) -> T + Send + Sync + 'static,
    {
        Self {
            engine,
            resolve_request: Box::new(resolve_request),
            resolve_role: Box::new(resolve_role),
            on_allowed: Box::new(on_allowed),
            on_denied: Box::new(on_denied),
        }
    }

    /// The engine this guard queries.
    pub fn engine(&self) -> &Arc<AccessEngine> {
        &self.engine
    }

    /// Check a request and dispatch to the matching callback.
    ///
    /// # Errors
    ///
    /// Engine errors (unknown role, unknown resource in strict mode) are
    /// returned unchanged and neither callback runs.
    pub fn before_dispatch(&self, request: &Req) -> AclResult<T> {
        let role = (self.resolve_role)(request);
        let (controller, action) = (self.resolve_request)(request);
        let access = AccessRequest {
            role,
            resource: normalize_identifier(&controller),
            action: normalize_identifier(&action),
        };

        let allowed = self
            .engine
            .is_allowed(&access.role, &access.resource, &access.action)
            .map_err(|e| {
                warn!(
                    role = %access.role,
                    resource = %access.resource,
                    action = %access.action,
                    error = %e,
                    "Access check failed"
                );
                e
            })?;

        if allowed {
            Ok((self.on_allowed)(&access))
        } else {
            debug!(
                role = %access.role,
                resource = %access.resource,
                action = %access.action,
                "Request denied"
            );
            Ok((self.on_denied)(&access))
        }
    }
}

impl<Req, T> fmt::Debug for DispatchGuard<Req, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchGuard")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
