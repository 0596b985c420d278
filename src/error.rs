use crate::core::acl::PolicyType;
use thiserror::Error;

/// Errors raised while turning policy text into a [`Policy`](crate::Policy).
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("failed to parse policy: {0}")]
    Hcl(#[from] hcl::Error),

    #[error("failed to parse policy: {0}")]
    Json(#[from] serde_json::Error),

    #[error("policy document must be an object of `name` and `path` entries")]
    InvalidRoot,

    #[error("invalid key `{0}` at policy root")]
    UnknownKey(String),

    #[error("path {path:?}: invalid key `{key}`")]
    UnknownPathKey { path: String, key: String },

    #[error("invalid path block: {0}")]
    InvalidPathBlock(String),

    #[error("path {path:?}: invalid policy `{policy}`")]
    InvalidLegacyPolicy { path: String, policy: String },

    #[error("path {path:?}: invalid capability `{capability}`")]
    InvalidCapability { path: String, capability: String },

    #[error("path {path:?}: `{key}` must be {expected}")]
    InvalidValue {
        path: String,
        key: String,
        expected: &'static str,
    },

    #[error("path {path:?}: error parsing {key}: {reason}")]
    InvalidDuration {
        path: String,
        key: &'static str,
        reason: String,
    },

    #[error("path {path:?}: max_wrapping_ttl cannot be less than min_wrapping_ttl")]
    InvertedWrappingTtl { path: String },
}

/// Errors raised while merging policies into an [`Acl`](crate::Acl).
#[derive(Error, Debug)]
pub enum AclError {
    #[error("unable to build ACL from policy `{name}`: unsupported policy type `{policy_type}`")]
    UnsupportedPolicyType {
        name: String,
        policy_type: PolicyType,
    },
}

/// Operation name that does not map onto an [`Operation`](crate::Operation).
#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown operation `{0}`")]
pub struct UnknownOperation(pub String);

/// Errors raised by the [`PolicyStore`](crate::PolicyStore).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode policy entry: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode stored policy `{name}`: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse policy `{name}`: {source}")]
    Parse {
        name: String,
        #[source]
        source: PolicyError,
    },

    #[error("failed to construct ACL: {0}")]
    Acl(#[from] AclError),

    #[error("cannot {op} {name} policy")]
    Immutable { name: String, op: &'static str },

    #[error("policy name missing")]
    MissingName,

    #[error("rules of policy `{name}` do not match its text")]
    RulesMismatch { name: String },

    #[error("unknown policy type `{0}`, cannot set")]
    UnsupportedPolicyType(PolicyType),
}

impl StoreError {
    /// Whether the failure came from the storage collaborator and may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Io(_))
    }
}

/// Errors raised while loading a [`StoreConfig`](crate::StoreConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
