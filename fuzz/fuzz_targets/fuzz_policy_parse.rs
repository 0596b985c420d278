#![no_main]
use libfuzzer_sys::fuzz_target;
use lockbox::{Acl, Capabilities, Policy};

// Parsing arbitrary text must never panic, and anything it accepts must
// respect the deny and TTL invariants
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(policy) = Policy::parse(text) else {
        return;
    };

    for rule in &policy.rules {
        let perms = &rule.permissions;
        if perms.is_deny() {
            assert_eq!(perms.capabilities, Capabilities::DENY);
            assert!(perms.allowed_parameters.is_empty());
            assert!(perms.denied_parameters.is_empty());
        }
        if !perms.max_wrapping_ttl.is_zero() {
            assert!(perms.max_wrapping_ttl >= perms.min_wrapping_ttl);
        }
    }

    let acl = Acl::new([&policy]).unwrap();
    for rule in &policy.rules {
        let _ = acl.capabilities(&rule.prefix);
    }
});
