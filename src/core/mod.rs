//! Authorization engine internals

pub mod acl;
pub mod config;
pub mod store;
