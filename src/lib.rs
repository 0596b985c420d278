//! # Lockbox - Policy & ACL Authorization Engine
//!
//! `lockbox` decides whether a request against a secrets API is permitted,
//! given the named policies attached to the caller:
//!
//! - **Policy parsing** from HCL or JSON `path` blocks
//! - **ACL merging** with deny-override and tightest-TTL-wins
//! - **Request evaluation** covering capabilities, parameter filters,
//!   wrapping TTL bounds and sudo detection
//! - **Policy store** with pluggable storage, LRU caching and built-in policies
//!
//! ## Quick Start
//!
//! ```rust
//! use lockbox::{Operation, Policy, PolicyStore, Request, Result};
//!
//! # fn main() -> Result<()> {
//! let store = PolicyStore::in_memory();
//! store.setup()?;
//!
//! let mut policy = Policy::parse(r#"
//!     path "secret/*" {
//!         capabilities = ["read", "list"]
//!     }
//! "#).expect("valid policy");
//! policy.name = "readers".to_string();
//! store.set(policy)?;
//!
//! let acl = store.build_acl(&["default", "readers"])?;
//!
//! assert!(acl.allow_operation(&Request::new(Operation::Read, "secret/app")).allowed);
//! assert!(!acl.allow_operation(&Request::new(Operation::Update, "secret/app")).allowed);
//! assert_eq!(acl.capabilities("cubbyhole/notes"), vec!["read", "list", "update", "delete", "create"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Parameter Constraints
//!
//! ```rust
//! use lockbox::{Acl, Operation, Policy, Request};
//!
//! let policy = Policy::parse(r#"
//!     path "auth/token/create" {
//!         capabilities       = ["create", "update"]
//!         allowed_parameters = { "policies" = ["dev-*"] }
//!         denied_parameters  = { "no_parent" = [] }
//!     }
//! "#).unwrap();
//! let acl = Acl::new([&policy]).unwrap();
//!
//! let create = Request::new(Operation::Create, "auth/token/create");
//! assert!(acl.allow_operation(&create.clone().with_data("policies", "dev-web")).allowed);
//! assert!(!acl.allow_operation(&create.clone().with_data("policies", "admin")).allowed);
//! assert!(!acl.allow_operation(&create.with_data("no_parent", true)).allowed);
//! ```

pub mod core;
pub mod error;

pub use crate::core::acl;
pub use crate::core::acl::{
    Acl, AclResults, AuthResults, Capabilities, CheckOptions, Operation, PathRule, Permissions,
    Policy, PolicyType, Request, WrapInfo,
};
pub use crate::core::config::StoreConfig;
pub use crate::core::store::{MemoryStorage, PolicyEntry, PolicyStore, Storage};
pub use crate::error::{AclError, ConfigError, PolicyError, Result, StoreError, UnknownOperation};
