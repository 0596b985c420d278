//! Policies every store ships with

use crate::core::acl::ROOT_POLICY_NAME;

pub const DEFAULT_POLICY_NAME: &str = "default";
pub const RESPONSE_WRAPPING_POLICY_NAME: &str = "response-wrapping";
pub const CONTROL_GROUP_POLICY_NAME: &str = "control-group";

/// Cannot be created, modified or deleted through the store API
pub const IMMUTABLE_POLICIES: [&str; 3] = [
    ROOT_POLICY_NAME,
    RESPONSE_WRAPPING_POLICY_NAME,
    CONTROL_GROUP_POLICY_NAME,
];

/// Never attached to tokens directly, so hidden from listings
pub const NON_ASSIGNABLE_POLICIES: [&str; 2] =
    [RESPONSE_WRAPPING_POLICY_NAME, CONTROL_GROUP_POLICY_NAME];

/// Granted to every token unless explicitly opted out
pub const DEFAULT_POLICY: &str = r#"
# Allow tokens to look up their own properties
path "auth/token/lookup-self" {
    capabilities = ["read"]
}

# Allow tokens to renew themselves
path "auth/token/renew-self" {
    capabilities = ["update"]
}

# Allow tokens to revoke themselves
path "auth/token/revoke-self" {
    capabilities = ["update"]
}

# Allow a token to look up its own capabilities on a path
path "sys/capabilities-self" {
    capabilities = ["update"]
}

# Allow a token to renew a lease via lease_id in the request body
path "sys/renew" {
    capabilities = ["update"]
}
path "sys/leases/renew" {
    capabilities = ["update"]
}

# Allow looking up lease properties
path "sys/leases/lookup" {
    capabilities = ["update"]
}

# Allow a token to manage its own cubbyhole
path "cubbyhole/*" {
    capabilities = ["create", "read", "update", "delete", "list"]
}

# Allow a token to wrap arbitrary values in a response-wrapping token
path "sys/wrapping/wrap" {
    capabilities = ["update"]
}

# Allow a token to look up the creation time and TTL of a given
# response-wrapping token
path "sys/wrapping/lookup" {
    capabilities = ["update"]
}

# Allow a token to unwrap a response-wrapping token
path "sys/wrapping/unwrap" {
    capabilities = ["update"]
}

# Allow general purpose tools
path "sys/tools/hash" {
    capabilities = ["update"]
}
path "sys/tools/hash/*" {
    capabilities = ["update"]
}
path "sys/tools/random" {
    capabilities = ["update"]
}
path "sys/tools/random/*" {
    capabilities = ["update"]
}
"#;

/// Attached to response-wrapping tokens
pub const RESPONSE_WRAPPING_POLICY: &str = r#"
path "cubbyhole/response" {
    capabilities = ["create", "read"]
}

path "sys/wrapping/unwrap" {
    capabilities = ["update"]
}
"#;

pub fn is_immutable(name: &str) -> bool {
    IMMUTABLE_POLICIES.contains(&name)
}

pub fn is_non_assignable(name: &str) -> bool {
    NON_ASSIGNABLE_POLICIES.contains(&name)
}
