//! Policy document structure
//!
//! A policy is a named, ordered list of path rules. Each rule grants a
//! capability set on either one exact path or every path under a prefix,
//! optionally narrowed by parameter and response-wrapping constraints.

use super::parser;
use super::Capabilities;
use crate::error::PolicyError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Name of the in-memory policy that bypasses every check.
pub const ROOT_POLICY_NAME: &str = "root";

/// Parameter name (lower-case) to admitted or rejected values.
///
/// An empty value list matches any value for that parameter.
pub type ParameterMap = HashMap<String, Vec<Value>>;

/// Kind of policy document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyType {
    /// Path-based access control policy
    #[default]
    Acl,
    /// Role governing policy
    Rgp,
    /// Endpoint governing policy
    Egp,
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PolicyType::Acl => "acl",
            PolicyType::Rgp => "rgp",
            PolicyType::Egp => "egp",
        })
    }
}

/// Compiled permissions of a path rule
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Permissions {
    /// Granted capabilities
    pub capabilities: Capabilities,

    /// Shortest response-wrapping TTL a request may ask for (zero = unset)
    pub min_wrapping_ttl: Duration,

    /// Longest response-wrapping TTL a request may ask for (zero = unset)
    pub max_wrapping_ttl: Duration,

    /// Parameters a mutating request may carry
    pub allowed_parameters: ParameterMap,

    /// Parameters a mutating request must not carry
    pub denied_parameters: ParameterMap,

    /// Parameters a mutating request must carry
    pub required_parameters: Vec<String>,
}

impl Permissions {
    /// Permissions holding nothing but an explicit deny.
    pub fn deny() -> Self {
        Permissions {
            capabilities: Capabilities::DENY,
            ..Default::default()
        }
    }

    /// Create permissions granting the given capabilities with no constraints.
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Permissions {
            capabilities,
            ..Default::default()
        }
    }

    pub fn is_deny(&self) -> bool {
        self.capabilities.is_deny()
    }
}

/// A single `path` block of a policy
#[derive(Debug, Clone, PartialEq)]
pub struct PathRule {
    /// Path, or path prefix when `glob` is set; never starts with `/`
    pub prefix: String,

    /// Whether the rule covers every path starting with `prefix`
    pub glob: bool,

    pub permissions: Permissions,
}

impl PathRule {
    /// Create a rule from a raw path as written in policy text
    ///
    /// A leading `/` is dropped and a trailing `*` turns the rule into a glob.
    pub fn new(raw_path: &str, permissions: Permissions) -> Self {
        let prefix = raw_path.strip_prefix('/').unwrap_or(raw_path);
        let (prefix, glob) = match prefix.strip_suffix('*') {
            Some(stripped) => (stripped, true),
            None => (prefix, false),
        };

        PathRule {
            prefix: prefix.to_string(),
            glob,
            permissions,
        }
    }
}

/// Complete policy document
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    /// Lower-case policy name
    pub name: String,

    pub policy_type: PolicyType,

    /// Source text the policy was parsed from
    pub raw: String,

    /// Path rules in document order
    pub rules: Vec<PathRule>,
}

impl Policy {
    /// Create a new empty ACL policy
    pub fn new(name: impl Into<String>) -> Self {
        Policy {
            name: name.into(),
            policy_type: PolicyType::Acl,
            raw: String::new(),
            rules: Vec::new(),
        }
    }

    /// The root policy; never persisted
    pub fn root() -> Self {
        Self::new(ROOT_POLICY_NAME)
    }

    /// Parse policy text (HCL or JSON)
    ///
    /// # Examples
    ///
    /// ```
    /// use lockbox::{Capabilities, Policy};
    ///
    /// let policy = Policy::parse(r#"
    ///     path "secret/*" {
    ///         capabilities = ["read", "list"]
    ///     }
    /// "#).unwrap();
    ///
    /// assert_eq!(policy.rules[0].prefix, "secret/");
    /// assert!(policy.rules[0].glob);
    /// assert_eq!(
    ///     policy.rules[0].permissions.capabilities,
    ///     Capabilities::READ | Capabilities::LIST
    /// );
    /// ```
    pub fn parse(raw: &str) -> Result<Self, PolicyError> {
        parser::parse_acl_policy(raw)
    }

    /// Add a rule to this policy
    pub fn add_rule(&mut self, rule: PathRule) {
        self.rules.push(rule);
    }

    pub fn is_root(&self) -> bool {
        self.name == ROOT_POLICY_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_rule_strips_markers() {
        let rule = PathRule::new("/secret/*", Permissions::default());
        assert_eq!(rule.prefix, "secret/");
        assert!(rule.glob);

        let rule = PathRule::new("sys/mounts", Permissions::default());
        assert_eq!(rule.prefix, "sys/mounts");
        assert!(!rule.glob);
    }

    #[test]
    fn test_path_rule_only_strips_one_marker() {
        let rule = PathRule::new("//a**", Permissions::default());
        assert_eq!(rule.prefix, "/a*");
        assert!(rule.glob);
    }

    #[test]
    fn test_root_policy() {
        let root = Policy::root();
        assert!(root.is_root());
        assert!(root.rules.is_empty());
        assert_eq!(root.policy_type, PolicyType::Acl);
        assert!(!Policy::new("admin").is_root());
    }

    #[test]
    fn test_deny_permissions() {
        let deny = Permissions::deny();
        assert!(deny.is_deny());
        assert_eq!(deny.capabilities, Capabilities::DENY);
        assert!(deny.allowed_parameters.is_empty());
    }

    #[test]
    fn test_policy_type_serde() {
        assert_eq!(serde_json::to_string(&PolicyType::Acl).unwrap(), "\"acl\"");
        assert_eq!(
            serde_json::from_str::<PolicyType>("\"egp\"").unwrap(),
            PolicyType::Egp
        );
        assert_eq!(PolicyType::Rgp.to_string(), "rgp");
    }
}
