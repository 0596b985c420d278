//! Path-based access control
//!
//! Policies are written as `path` blocks granting capabilities:
//! - Parsing compiles policy text into a [`Policy`]
//! - [`Acl::new`] merges any number of policies into one rule set
//! - [`Acl::allow_operation`] decides a single [`Request`]
//!
//! Exact rules take precedence over globs; among globs the longest
//! prefix wins. Nothing is allowed without a matching rule.

#[allow(clippy::module_inception)]
mod acl;
pub mod capability;
mod decision;
mod parser;
mod pattern;
mod policy;
mod prefix;

pub use acl::Acl;
pub use capability::Capabilities;
pub use decision::{AclResults, AuthResults, CheckOptions, Operation, Request, WrapInfo};
pub use parser::parse_acl_policy;
pub use pattern::PatternMatcher;
pub use policy::{ParameterMap, PathRule, Permissions, Policy, PolicyType, ROOT_POLICY_NAME};
pub use prefix::PrefixTree;
