//! Capability bits granted by a path rule.
//!
//! Capabilities are stored as a bitset; the string names only exist at the
//! policy-text and capability-query boundaries.

use bitflags::bitflags;

pub const DENY_CAPABILITY: &str = "deny";
pub const CREATE_CAPABILITY: &str = "create";
pub const READ_CAPABILITY: &str = "read";
pub const UPDATE_CAPABILITY: &str = "update";
pub const DELETE_CAPABILITY: &str = "delete";
pub const LIST_CAPABILITY: &str = "list";
pub const SUDO_CAPABILITY: &str = "sudo";
pub const ROOT_CAPABILITY: &str = "root";

bitflags! {
    /// Operations a path rule permits.
    ///
    /// | Capability | Operations |
    /// |------------|------------|
    /// | [`DENY`](Self::DENY) | none; absorbs every other bit |
    /// | [`CREATE`](Self::CREATE) | create |
    /// | [`READ`](Self::READ) | read |
    /// | [`UPDATE`](Self::UPDATE) | update, revoke, renew, rollback |
    /// | [`DELETE`](Self::DELETE) | delete |
    /// | [`LIST`](Self::LIST) | list |
    /// | [`SUDO`](Self::SUDO) | root-protected endpoints |
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u32 {
        const DENY   = 0b0000_0001;
        const CREATE = 0b0000_0010;
        const READ   = 0b0000_0100;
        const UPDATE = 0b0000_1000;
        const DELETE = 0b0001_0000;
        const LIST   = 0b0010_0000;
        const SUDO   = 0b0100_0000;
    }
}

impl Capabilities {
    /// Expansion of the legacy `policy = "read"` shorthand.
    pub const LEGACY_READ: Self = Self::READ.union(Self::LIST);

    /// Expansion of the legacy `policy = "write"` shorthand.
    pub const LEGACY_WRITE: Self = Self::CREATE
        .union(Self::READ)
        .union(Self::UPDATE)
        .union(Self::DELETE)
        .union(Self::LIST);

    /// Expansion of the legacy `policy = "sudo"` shorthand.
    pub const LEGACY_SUDO: Self = Self::LEGACY_WRITE.union(Self::SUDO);

    /// Parses a single capability name as it appears in a `capabilities` list.
    ///
    /// Names are matched exactly; `"Read"` is not a capability.
    ///
    /// ```
    /// use lockbox::Capabilities;
    ///
    /// assert_eq!(Capabilities::parse("read"), Some(Capabilities::READ));
    /// assert_eq!(Capabilities::parse("sudo"), Some(Capabilities::SUDO));
    /// assert_eq!(Capabilities::parse("root"), None);
    /// ```
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            DENY_CAPABILITY => Some(Self::DENY),
            CREATE_CAPABILITY => Some(Self::CREATE),
            READ_CAPABILITY => Some(Self::READ),
            UPDATE_CAPABILITY => Some(Self::UPDATE),
            DELETE_CAPABILITY => Some(Self::DELETE),
            LIST_CAPABILITY => Some(Self::LIST),
            SUDO_CAPABILITY => Some(Self::SUDO),
            _ => None,
        }
    }

    /// Maps a legacy single-word `policy` value onto its capability set.
    #[must_use]
    pub fn from_legacy_policy(policy: &str) -> Option<Self> {
        match policy {
            "deny" => Some(Self::DENY),
            "read" => Some(Self::LEGACY_READ),
            "write" => Some(Self::LEGACY_WRITE),
            "sudo" => Some(Self::LEGACY_SUDO),
            _ => None,
        }
    }

    /// Whether the set carries an explicit deny.
    #[must_use]
    pub fn is_deny(self) -> bool {
        self.contains(Self::DENY)
    }

    /// Capability names in display order: sudo, read, list, update, delete, create.
    ///
    /// The deny bit is never listed here; callers decide how to present it.
    ///
    /// ```
    /// use lockbox::Capabilities;
    ///
    /// let caps = Capabilities::CREATE | Capabilities::READ | Capabilities::SUDO;
    /// assert_eq!(caps.names(), vec!["sudo", "read", "create"]);
    /// ```
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        const ORDER: [(Capabilities, &str); 6] = [
            (Capabilities::SUDO, SUDO_CAPABILITY),
            (Capabilities::READ, READ_CAPABILITY),
            (Capabilities::LIST, LIST_CAPABILITY),
            (Capabilities::UPDATE, UPDATE_CAPABILITY),
            (Capabilities::DELETE, DELETE_CAPABILITY),
            (Capabilities::CREATE, CREATE_CAPABILITY),
        ];

        ORDER
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_names() {
        for (name, bit) in [
            ("deny", Capabilities::DENY),
            ("create", Capabilities::CREATE),
            ("read", Capabilities::READ),
            ("update", Capabilities::UPDATE),
            ("delete", Capabilities::DELETE),
            ("list", Capabilities::LIST),
            ("sudo", Capabilities::SUDO),
        ] {
            assert_eq!(Capabilities::parse(name), Some(bit), "{name}");
        }
    }

    #[test]
    fn test_parse_rejects_unknown_and_mixed_case() {
        assert_eq!(Capabilities::parse("write"), None);
        assert_eq!(Capabilities::parse("READ"), None);
        assert_eq!(Capabilities::parse(""), None);
    }

    #[test]
    fn test_legacy_policy_mapping() {
        assert_eq!(
            Capabilities::from_legacy_policy("deny"),
            Some(Capabilities::DENY)
        );
        assert_eq!(
            Capabilities::from_legacy_policy("read"),
            Some(Capabilities::READ | Capabilities::LIST)
        );

        let write = Capabilities::from_legacy_policy("write").unwrap();
        assert!(write.contains(Capabilities::CREATE | Capabilities::UPDATE | Capabilities::DELETE));
        assert!(!write.contains(Capabilities::SUDO));

        let sudo = Capabilities::from_legacy_policy("sudo").unwrap();
        assert_eq!(sudo, write | Capabilities::SUDO);

        assert_eq!(Capabilities::from_legacy_policy("admin"), None);
    }

    #[test]
    fn test_names_order_skips_deny() {
        assert_eq!(
            Capabilities::all().names(),
            vec!["sudo", "read", "list", "update", "delete", "create"]
        );
        assert!(Capabilities::DENY.names().is_empty());
        assert!(Capabilities::empty().names().is_empty());
    }
}
