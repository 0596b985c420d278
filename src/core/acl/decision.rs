//! Request authorization
//!
//! Evaluation is pure: it never fails and never touches storage. Anything
//! that does not positively match a rule is denied.

use super::{Acl, Capabilities, PatternMatcher, Permissions};
use crate::error::UnknownOperation;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Kind of request being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
    /// Endpoint documentation; always allowed
    Help,
    /// Identity alias probe; never granted by a path rule
    AliasLookahead,
    Revoke,
    Renew,
    Rollback,
}

impl Operation {
    /// Capability a path rule must grant for this operation
    ///
    /// `None` for operations no capability covers.
    pub fn required_capability(self) -> Option<Capabilities> {
        match self {
            Operation::Create => Some(Capabilities::CREATE),
            Operation::Read => Some(Capabilities::READ),
            Operation::Update | Operation::Revoke | Operation::Renew | Operation::Rollback => {
                Some(Capabilities::UPDATE)
            }
            Operation::Delete => Some(Capabilities::DELETE),
            Operation::List => Some(Capabilities::LIST),
            Operation::Help | Operation::AliasLookahead => None,
        }
    }

    /// Whether request data is subject to parameter constraints
    pub fn checks_parameters(self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::List => "list",
            Operation::Help => "help",
            Operation::AliasLookahead => "alias-lookahead",
            Operation::Revoke => "revoke",
            Operation::Renew => "renew",
            Operation::Rollback => "rollback",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "create" => Operation::Create,
            "read" => Operation::Read,
            "update" => Operation::Update,
            "delete" => Operation::Delete,
            "list" => Operation::List,
            "help" => Operation::Help,
            "alias-lookahead" => Operation::AliasLookahead,
            "revoke" => Operation::Revoke,
            "renew" => Operation::Renew,
            "rollback" => Operation::Rollback,
            _ => return Err(UnknownOperation(s.to_string())),
        })
    }
}

/// Response-wrapping request attached to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapInfo {
    pub ttl: Duration,
}

/// Request descriptor handed over by the router
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub operation: Operation,

    /// Path relative to the API root, without a leading `/`
    pub path: String,

    pub data: HashMap<String, Value>,

    pub wrap_info: Option<WrapInfo>,
}

impl Request {
    pub fn new(operation: Operation, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = match path.strip_prefix('/') {
            Some(stripped) => stripped.to_string(),
            None => path,
        };

        Request {
            operation,
            path,
            data: HashMap::new(),
            wrap_info: None,
        }
    }

    /// Add a request parameter
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Ask for the response to be wrapped with the given TTL
    pub fn with_wrap_ttl(mut self, ttl: Duration) -> Self {
        self.wrap_info = Some(WrapInfo { ttl });
        self
    }
}

/// Outcome of evaluating a request against an [`Acl`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AclResults {
    pub allowed: bool,

    /// Sudo was granted on the resolved rule, independent of `allowed`
    pub root_privs: bool,

    pub is_root: bool,

    /// Capabilities of the resolved rule
    pub capabilities: Capabilities,
}

/// Router-supplied context for [`Acl::check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckOptions {
    /// The endpoint requires sudo
    pub root_privs_required: bool,

    /// The endpoint is reachable without a token
    pub unauthenticated: bool,
}

/// Outcome of [`Acl::check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthResults {
    /// Raw ACL verdict; `None` when the ACL was skipped
    pub acl_results: Option<AclResults>,
    pub allowed: bool,
    pub root_privs: bool,
}

impl Acl {
    /// Decide whether `request` is permitted
    ///
    /// # Examples
    ///
    /// ```
    /// use lockbox::{Acl, Operation, Policy, Request};
    ///
    /// let policy = Policy::parse(r#"path "secret/*" { capabilities = ["read", "list"] }"#).unwrap();
    /// let acl = Acl::new([&policy]).unwrap();
    ///
    /// let read = acl.allow_operation(&Request::new(Operation::Read, "secret/foo"));
    /// assert!(read.allowed);
    /// assert!(!read.root_privs);
    ///
    /// let update = acl.allow_operation(&Request::new(Operation::Update, "secret/foo"));
    /// assert!(!update.allowed);
    /// ```
    pub fn allow_operation(&self, request: &Request) -> AclResults {
        if self.is_root() {
            return AclResults {
                allowed: true,
                root_privs: true,
                is_root: true,
                capabilities: Capabilities::all().difference(Capabilities::DENY),
            };
        }

        if request.operation == Operation::Help {
            return AclResults {
                allowed: true,
                ..Default::default()
            };
        }

        let Some(permissions) = self.permissions_for(&request.path) else {
            debug!(path = %request.path, op = %request.operation, "no matching rule");
            return AclResults::default();
        };

        let mut results = AclResults {
            root_privs: permissions.capabilities.contains(Capabilities::SUDO),
            capabilities: permissions.capabilities,
            ..Default::default()
        };

        results.allowed = permits(permissions, request);
        debug!(
            path = %request.path,
            op = %request.operation,
            allowed = results.allowed,
            root_privs = results.root_privs,
            "evaluated request"
        );
        results
    }

    /// Authorize a request the way the router does
    ///
    /// Unauthenticated endpoints bypass the ACL. Endpoints that need sudo
    /// are denied unless the resolved rule grants it.
    pub fn check(&self, request: &Request, options: CheckOptions) -> AuthResults {
        if options.unauthenticated {
            return AuthResults {
                acl_results: None,
                allowed: true,
                root_privs: false,
            };
        }

        let acl_results = self.allow_operation(request);
        let mut results = AuthResults {
            acl_results: Some(acl_results),
            allowed: acl_results.allowed,
            root_privs: acl_results.root_privs,
        };

        if acl_results.is_root {
            return results;
        }

        if results.allowed && options.root_privs_required && !acl_results.root_privs {
            debug!(path = %request.path, "sudo required");
            results.allowed = false;
        }

        results
    }
}

fn permits(permissions: &Permissions, request: &Request) -> bool {
    let Some(required) = request.operation.required_capability() else {
        return false;
    };
    if permissions.is_deny() || !permissions.capabilities.contains(required) {
        return false;
    }

    if !wrapping_ttl_permitted(permissions, request.wrap_info) {
        return false;
    }

    if request.operation.checks_parameters() {
        return parameters_permitted(permissions, &request.data);
    }

    true
}

fn wrapping_ttl_permitted(permissions: &Permissions, wrap_info: Option<WrapInfo>) -> bool {
    let max = permissions.max_wrapping_ttl;
    let min = permissions.min_wrapping_ttl;

    if !max.is_zero() {
        match wrap_info {
            Some(wrap) if wrap.ttl <= max => {}
            _ => return false,
        }
    }
    if !min.is_zero() {
        match wrap_info {
            Some(wrap) if wrap.ttl >= min => {}
            _ => return false,
        }
    }

    // Merging can produce bounds parsing would have refused
    !(!max.is_zero() && min > max)
}

fn parameters_permitted(permissions: &Permissions, data: &HashMap<String, Value>) -> bool {
    for name in &permissions.required_parameters {
        if !data.contains_key(name.as_str()) {
            return false;
        }
    }

    if data.is_empty() {
        return true;
    }

    let denied = &permissions.denied_parameters;
    if !denied.is_empty() {
        if denied.contains_key("*") {
            return false;
        }

        for (name, value) in data {
            if let Some(list) = denied.get(&name.to_lowercase()) {
                if PatternMatcher::value_in_list(value, list) {
                    return false;
                }
            }
        }
    }

    let allowed = &permissions.allowed_parameters;
    if allowed.is_empty() {
        return true;
    }

    let allowed_all = allowed.contains_key("*");
    if allowed_all && allowed.len() == 1 {
        return true;
    }

    data.iter().all(|(name, value)| match allowed.get(&name.to_lowercase()) {
        Some(list) => PatternMatcher::value_in_list(value, list),
        None => allowed_all,
    })
}
