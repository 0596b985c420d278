//! Merged access control list
//!
//! An [`Acl`] is the union of every policy attached to a caller. Rules for
//! the same path are folded together:
//! - An explicit deny, once present, is never weakened
//! - Capabilities otherwise accumulate
//! - Wrapping TTL bounds narrow toward the smallest nonzero value
//! - Parameter lists widen, and an empty list absorbs everything

use super::capability::{DENY_CAPABILITY, ROOT_CAPABILITY};
use super::prefix::PrefixTree;
use super::{Permissions, Policy, PolicyType};
use crate::error::AclError;
use tracing::{debug, trace};

/// Effective permissions for a set of policies
///
/// Immutable once built; share it freely between threads.
#[derive(Debug, Clone, Default)]
pub struct Acl {
    exact_rules: PrefixTree<Permissions>,
    glob_rules: PrefixTree<Permissions>,
    root: bool,
}

impl Acl {
    /// Build an ACL from policies
    ///
    /// Every policy is type-checked before any rule is merged, so an error
    /// never leaves a half-built ACL behind.
    ///
    /// # Examples
    ///
    /// ```
    /// use lockbox::{Acl, Policy};
    ///
    /// let readers = Policy::parse(r#"path "secret/*" { capabilities = ["read"] }"#).unwrap();
    /// let writers = Policy::parse(r#"path "secret/*" { capabilities = ["update"] }"#).unwrap();
    ///
    /// let acl = Acl::new([&readers, &writers]).unwrap();
    /// assert_eq!(acl.capabilities("secret/app"), vec!["read", "update"]);
    /// assert_eq!(acl.capabilities("sys/mounts"), vec!["deny"]);
    /// ```
    pub fn new<'a, I>(policies: I) -> Result<Self, AclError>
    where
        I: IntoIterator<Item = &'a Policy>,
    {
        let policies: Vec<&Policy> = policies.into_iter().collect();

        if let Some(policy) = policies.iter().find(|p| p.policy_type != PolicyType::Acl) {
            return Err(AclError::UnsupportedPolicyType {
                name: policy.name.clone(),
                policy_type: policy.policy_type,
            });
        }

        let mut acl = Acl::default();
        for policy in policies {
            if policy.is_root() {
                acl.root = true;
            }

            for rule in &policy.rules {
                let tree = if rule.glob {
                    &mut acl.glob_rules
                } else {
                    &mut acl.exact_rules
                };

                match tree.get_mut(&rule.prefix) {
                    Some(existing) => merge_permissions(existing, &rule.permissions),
                    None => {
                        tree.insert(rule.prefix.clone(), rule.permissions.clone());
                    }
                }
            }
        }

        debug!(
            root = acl.root,
            exact = acl.exact_rules.len(),
            glob = acl.glob_rules.len(),
            "built acl"
        );

        Ok(acl)
    }

    /// Whether the root policy was part of the set
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// Resolve the permissions governing `path`
    ///
    /// An exact rule wins outright; otherwise the glob rule with the longest
    /// matching prefix applies.
    pub fn permissions_for(&self, path: &str) -> Option<&Permissions> {
        if let Some(permissions) = self.exact_rules.get(path) {
            trace!(path, "matched exact rule");
            return Some(permissions);
        }

        self.glob_rules.longest_prefix(path).map(|(prefix, permissions)| {
            trace!(path, prefix, "matched glob rule");
            permissions
        })
    }

    /// Capability names granted on `path`
    ///
    /// Returns `["root"]` for a root ACL and `["deny"]` when nothing is
    /// granted.
    pub fn capabilities(&self, path: &str) -> Vec<&'static str> {
        if self.root {
            return vec![ROOT_CAPABILITY];
        }

        let names = match self.permissions_for(path) {
            Some(permissions) if !permissions.is_deny() => permissions.capabilities.names(),
            _ => Vec::new(),
        };

        if names.is_empty() {
            vec![DENY_CAPABILITY]
        } else {
            names
        }
    }

    /// Exact-path rules keyed by path
    pub fn exact_rules(&self) -> impl Iterator<Item = (&str, &Permissions)> {
        self.exact_rules.iter()
    }

    /// Glob rules keyed by prefix
    pub fn glob_rules(&self) -> impl Iterator<Item = (&str, &Permissions)> {
        self.glob_rules.iter()
    }
}

/// Fold `new` into `existing` for the same path
pub(crate) fn merge_permissions(existing: &mut Permissions, new: &Permissions) {
    if existing.is_deny() {
        return;
    }
    if new.is_deny() {
        *existing = Permissions::deny();
        return;
    }

    existing.capabilities |= new.capabilities;

    if !new.min_wrapping_ttl.is_zero()
        && (existing.min_wrapping_ttl.is_zero() || new.min_wrapping_ttl < existing.min_wrapping_ttl)
    {
        existing.min_wrapping_ttl = new.min_wrapping_ttl;
    }
    if !new.max_wrapping_ttl.is_zero()
        && (existing.max_wrapping_ttl.is_zero() || new.max_wrapping_ttl < existing.max_wrapping_ttl)
    {
        existing.max_wrapping_ttl = new.max_wrapping_ttl;
    }

    merge_parameters(&mut existing.allowed_parameters, &new.allowed_parameters);
    merge_parameters(&mut existing.denied_parameters, &new.denied_parameters);

    for name in &new.required_parameters {
        if !existing.required_parameters.contains(name) {
            existing.required_parameters.push(name.clone());
        }
    }
}

fn merge_parameters(existing: &mut super::ParameterMap, new: &super::ParameterMap) {
    for (key, values) in new {
        match existing.get_mut(key) {
            Some(current) if values.is_empty() || current.is_empty() => current.clear(),
            Some(current) => current.extend(values.iter().cloned()),
            None => {
                existing.insert(key.clone(), values.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::acl::{Capabilities, PathRule};
    use serde_json::json;
    use std::time::Duration;

    fn policy(name: &str, rules: Vec<PathRule>) -> Policy {
        let mut policy = Policy::new(name);
        for rule in rules {
            policy.add_rule(rule);
        }
        policy
    }

    fn caps(path: &str, capabilities: Capabilities) -> PathRule {
        PathRule::new(path, Permissions::with_capabilities(capabilities))
    }

    #[test]
    fn test_exact_and_glob_are_separate() {
        let p = policy(
            "p",
            vec![
                caps("secret/foo", Capabilities::READ),
                caps("secret/foo*", Capabilities::LIST),
            ],
        );
        let acl = Acl::new([&p]).unwrap();

        assert_eq!(acl.capabilities("secret/foo"), vec!["read"]);
        assert_eq!(acl.capabilities("secret/foobar"), vec!["list"]);
        assert_eq!(acl.exact_rules().count(), 1);
        assert_eq!(acl.glob_rules().count(), 1);
    }

    #[test]
    fn test_capabilities_accumulate() {
        let a = policy("a", vec![caps("x", Capabilities::READ)]);
        let b = policy("b", vec![caps("x", Capabilities::UPDATE | Capabilities::SUDO)]);
        let acl = Acl::new([&a, &b]).unwrap();

        assert_eq!(acl.capabilities("x"), vec!["sudo", "read", "update"]);
    }

    #[test]
    fn test_deny_wins_in_either_order() {
        let allow = policy("allow", vec![caps("x", Capabilities::READ)]);
        let deny = policy("deny", vec![PathRule::new("x", Permissions::deny())]);

        for acl in [
            Acl::new([&allow, &deny]).unwrap(),
            Acl::new([&deny, &allow]).unwrap(),
        ] {
            assert_eq!(acl.permissions_for("x"), Some(&Permissions::deny()));
            assert_eq!(acl.capabilities("x"), vec!["deny"]);
        }
    }

    #[test]
    fn test_deny_clears_parameters() {
        let mut perms = Permissions::with_capabilities(Capabilities::CREATE);
        perms.allowed_parameters.insert("foo".into(), vec![]);
        perms.required_parameters.push("bar".into());
        let allow = policy("allow", vec![PathRule::new("x", perms)]);
        let deny = policy("deny", vec![PathRule::new("x", Permissions::deny())]);

        let acl = Acl::new([&allow, &deny]).unwrap();
        let merged = acl.permissions_for("x").unwrap();
        assert!(merged.allowed_parameters.is_empty());
        assert!(merged.required_parameters.is_empty());
    }

    #[test]
    fn test_ttl_narrows() {
        let mut first = Permissions::with_capabilities(Capabilities::READ);
        first.max_wrapping_ttl = Duration::from_secs(600);
        let mut second = Permissions::with_capabilities(Capabilities::READ);
        second.max_wrapping_ttl = Duration::from_secs(300);
        second.min_wrapping_ttl = Duration::from_secs(10);
        let mut third = Permissions::with_capabilities(Capabilities::READ);
        third.max_wrapping_ttl = Duration::from_secs(900);

        let policies = [
            policy("a", vec![PathRule::new("x", first)]),
            policy("b", vec![PathRule::new("x", second)]),
            policy("c", vec![PathRule::new("x", third)]),
        ];
        let acl = Acl::new(&policies).unwrap();
        let merged = acl.permissions_for("x").unwrap();

        assert_eq!(merged.max_wrapping_ttl, Duration::from_secs(300));
        assert_eq!(merged.min_wrapping_ttl, Duration::from_secs(10));
    }

    #[test]
    fn test_parameter_merge() {
        let mut first = Permissions::with_capabilities(Capabilities::UPDATE);
        first.allowed_parameters.insert("a".into(), vec![json!("1")]);
        first.allowed_parameters.insert("b".into(), vec![json!("1")]);
        first.allowed_parameters.insert("c".into(), vec![]);
        first.required_parameters = vec!["r1".into()];

        let mut second = Permissions::with_capabilities(Capabilities::UPDATE);
        second.allowed_parameters.insert("a".into(), vec![json!("2")]);
        second.allowed_parameters.insert("b".into(), vec![]);
        second.allowed_parameters.insert("c".into(), vec![json!("3")]);
        second.allowed_parameters.insert("d".into(), vec![json!("4")]);
        second.required_parameters = vec!["r1".into(), "r2".into()];

        let a = policy("a", vec![PathRule::new("x", first)]);
        let b = policy("b", vec![PathRule::new("x", second)]);
        let acl = Acl::new([&a, &b]).unwrap();
        let merged = acl.permissions_for("x").unwrap();

        assert_eq!(merged.allowed_parameters["a"], vec![json!("1"), json!("2")]);
        assert!(merged.allowed_parameters["b"].is_empty());
        assert!(merged.allowed_parameters["c"].is_empty());
        assert_eq!(merged.allowed_parameters["d"], vec![json!("4")]);
        assert_eq!(merged.required_parameters, vec!["r1".to_string(), "r2".to_string()]);
    }

    #[test]
    fn test_merge_does_not_touch_source() {
        let a = policy("a", vec![caps("x", Capabilities::READ)]);
        let b = policy("b", vec![caps("x", Capabilities::LIST)]);
        let _ = Acl::new([&a, &b]).unwrap();

        assert_eq!(a.rules[0].permissions.capabilities, Capabilities::READ);
    }

    #[test]
    fn test_longest_glob_wins() {
        let p = policy(
            "p",
            vec![
                caps("a/*", Capabilities::READ),
                caps("a/b/*", Capabilities::LIST),
            ],
        );
        let acl = Acl::new([&p]).unwrap();

        assert_eq!(acl.capabilities("a/b/c"), vec!["list"]);
        assert_eq!(acl.capabilities("a/c"), vec!["read"]);
    }

    #[test]
    fn test_root_capabilities() {
        let root = Policy::root();
        let acl = Acl::new([&root]).unwrap();
        assert!(acl.is_root());
        assert_eq!(acl.capabilities("anything"), vec!["root"]);
    }

    #[test]
    fn test_rejects_non_acl_policy() {
        let good = policy("good", vec![caps("x", Capabilities::READ)]);
        let mut bad = Policy::new("bad");
        bad.policy_type = PolicyType::Egp;

        let err = Acl::new([&good, &bad]).unwrap_err();
        assert!(matches!(
            err,
            AclError::UnsupportedPolicyType { ref name, policy_type: PolicyType::Egp } if name == "bad"
        ));
    }

    #[test]
    fn test_empty_acl_denies() {
        let acl = Acl::new(std::iter::empty::<&Policy>()).unwrap();
        assert!(!acl.is_root());
        assert!(acl.permissions_for("secret/foo").is_none());
        assert_eq!(acl.capabilities("secret/foo"), vec!["deny"]);
    }
}
