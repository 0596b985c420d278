#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lockbox::{Acl, Capabilities, Operation, PathRule, Permissions, Policy, Request};
use std::time::Duration;

#[derive(Arbitrary, Debug)]
struct FuzzRule {
    path: String,
    bits: u8,
    min_ttl: u16,
    max_ttl: u16,
    allowed: Vec<(String, Vec<String>)>,
    denied: Vec<(String, Vec<String>)>,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    policies: Vec<Vec<FuzzRule>>,
    op: u8,
    path: String,
    data: Vec<(String, String)>,
    wrap_ttl: Option<u16>,
}

const OPERATIONS: [Operation; 10] = [
    Operation::Create,
    Operation::Read,
    Operation::Update,
    Operation::Delete,
    Operation::List,
    Operation::Help,
    Operation::AliasLookahead,
    Operation::Revoke,
    Operation::Renew,
    Operation::Rollback,
];

fn to_map(entries: Vec<(String, Vec<String>)>) -> lockbox::acl::ParameterMap {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_lowercase(), v.into_iter().map(serde_json::Value::from).collect()))
        .collect()
}

fuzz_target!(|input: FuzzInput| {
    let policies: Vec<Policy> = input
        .policies
        .into_iter()
        .enumerate()
        .map(|(i, rules)| {
            let mut policy = Policy::new(format!("p{i}"));
            for rule in rules {
                let caps = Capabilities::from_bits_truncate(rule.bits as u32);
                let perms = if caps.is_deny() {
                    Permissions::deny()
                } else {
                    Permissions {
                        capabilities: caps,
                        min_wrapping_ttl: Duration::from_secs(rule.min_ttl as u64),
                        max_wrapping_ttl: Duration::from_secs(rule.max_ttl as u64),
                        allowed_parameters: to_map(rule.allowed),
                        denied_parameters: to_map(rule.denied),
                        required_parameters: Vec::new(),
                    }
                };
                policy.add_rule(PathRule::new(&rule.path, perms));
            }
            policy
        })
        .collect();

    let acl = Acl::new(&policies).unwrap();

    let op = OPERATIONS[input.op as usize % OPERATIONS.len()];
    let mut request = Request::new(op, input.path);
    for (k, v) in input.data {
        request = request.with_data(k, v);
    }
    if let Some(ttl) = input.wrap_ttl {
        request = request.with_wrap_ttl(Duration::from_secs(ttl as u64));
    }

    let results = acl.allow_operation(&request);

    // A deny rule never allows anything but help
    if let Some(perms) = acl.permissions_for(&request.path) {
        if perms.is_deny() && op != Operation::Help {
            assert!(!results.allowed);
        }
    } else if op != Operation::Help {
        assert!(!results.allowed);
    }
});
