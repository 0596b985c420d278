//! Policy text parsing
//!
//! Two surface syntaxes compile to the same [`Policy`]:
//!
//! ```hcl
//! name = "deploy"
//!
//! path "secret/app/*" {
//!   capabilities       = ["create", "update"]
//!   allowed_parameters = { "env" = ["prod-*"] }
//!   max_wrapping_ttl   = "1h"
//! }
//! ```
//!
//! and the equivalent JSON document
//! `{"name": "deploy", "path": {"secret/app/*": {"capabilities": [...]}}}`.
//!
//! Unknown keys are errors at every level, and no partially parsed policy
//! is ever returned.

use super::{Capabilities, ParameterMap, PathRule, Permissions, Policy, PolicyType};
use crate::error::PolicyError;
use hcl::{Expression, Structure};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::trace;

const KEY_NAME: &str = "name";
const KEY_PATH: &str = "path";

const KEY_POLICY: &str = "policy";
const KEY_CAPABILITIES: &str = "capabilities";
const KEY_ALLOWED_PARAMETERS: &str = "allowed_parameters";
const KEY_DENIED_PARAMETERS: &str = "denied_parameters";
const KEY_REQUIRED_PARAMETERS: &str = "required_parameters";
const KEY_MIN_WRAPPING_TTL: &str = "min_wrapping_ttl";
const KEY_MAX_WRAPPING_TTL: &str = "max_wrapping_ttl";

/// Source-format independent view of a policy document.
#[derive(Debug, Default)]
struct RawDocument {
    name: Option<String>,
    paths: Vec<RawPath>,
}

/// One `path` block before compilation.
#[derive(Debug)]
struct RawPath {
    path: String,
    entries: Vec<(String, Value)>,
}

/// Parse ACL policy text into a [`Policy`].
pub fn parse_acl_policy(raw: &str) -> Result<Policy, PolicyError> {
    let input = raw.trim();

    let document = if input.starts_with('{') {
        read_json(input)?
    } else {
        read_hcl(input)?
    };

    let mut rules = Vec::with_capacity(document.paths.len());
    for raw_path in document.paths {
        rules.push(compile_path(raw_path)?);
    }

    let name = document
        .name
        .map(|name| name.trim().to_lowercase())
        .unwrap_or_default();

    trace!(name = %name, rules = rules.len(), "parsed policy");

    Ok(Policy {
        name,
        policy_type: PolicyType::Acl,
        raw: raw.to_string(),
        rules,
    })
}

fn read_hcl(input: &str) -> Result<RawDocument, PolicyError> {
    let body = hcl::parse(input)?;
    let mut document = RawDocument::default();

    for structure in body.into_inner() {
        match structure {
            Structure::Attribute(attribute) => {
                let key = attribute.key().to_string();
                let value = literal(attribute.expr).ok_or_else(|| PolicyError::InvalidValue {
                    path: String::new(),
                    key: key.clone(),
                    expected: "a literal value",
                })?;

                match key.as_str() {
                    KEY_NAME => document.name = Some(root_string(KEY_NAME, value)?),
                    KEY_PATH => collect_paths(value, &mut document.paths)?,
                    _ => return Err(PolicyError::UnknownKey(key)),
                }
            }
            Structure::Block(block) => {
                if block.identifier() != KEY_PATH {
                    return Err(PolicyError::UnknownKey(block.identifier().to_string()));
                }

                let path = match block.labels.as_slice() {
                    [label] => label.as_str().to_string(),
                    labels => {
                        return Err(PolicyError::InvalidPathBlock(format!(
                            "expected exactly one path label, found {}",
                            labels.len()
                        )))
                    }
                };

                let entries = hcl_block_entries(&path, block.body)?;
                document.paths.push(RawPath { path, entries });
            }
        }
    }

    Ok(document)
}

/// Flattens a `path` block body. Nested label-less blocks such as
/// `allowed_parameters { ... }` are read as object-valued attributes.
fn hcl_block_entries(path: &str, body: hcl::Body) -> Result<Vec<(String, Value)>, PolicyError> {
    let mut entries = Vec::new();

    for structure in body.into_inner() {
        match structure {
            Structure::Attribute(attribute) => {
                let key = attribute.key().to_string();
                let value = literal(attribute.expr).ok_or_else(|| PolicyError::InvalidValue {
                    path: path.to_string(),
                    key: key.clone(),
                    expected: "a literal value",
                })?;
                entries.push((key, value));
            }
            Structure::Block(block) => {
                let key = block.identifier().to_string();
                if !block.labels.is_empty() || block.body.blocks().next().is_some() {
                    return Err(PolicyError::UnknownPathKey {
                        path: path.to_string(),
                        key,
                    });
                }

                let mut object = Map::new();
                for attribute in block.body.into_attributes() {
                    let name = attribute.key().to_string();
                    let value =
                        literal(attribute.expr).ok_or_else(|| PolicyError::InvalidValue {
                            path: path.to_string(),
                            key: key.clone(),
                            expected: "a literal value",
                        })?;
                    object.insert(name, value);
                }
                entries.push((key, Value::Object(object)));
            }
        }
    }

    Ok(entries)
}

/// Converts a literal HCL expression. Variables, function calls and other
/// non-literal expressions yield `None`.
fn literal(expr: Expression) -> Option<Value> {
    let value = match expr {
        Expression::Null => Value::Null,
        Expression::Bool(b) => Value::Bool(b),
        Expression::Number(n) => {
            if let Some(u) = n.as_u64() {
                Value::from(u)
            } else if let Some(i) = n.as_i64() {
                Value::from(i)
            } else {
                Value::Number(serde_json::Number::from_f64(n.as_f64()?)?)
            }
        }
        Expression::String(s) => Value::String(s),
        Expression::Array(items) => Value::Array(
            items
                .into_iter()
                .map(literal)
                .collect::<Option<Vec<_>>>()?,
        ),
        Expression::Object(object) => Value::Object(
            object
                .into_iter()
                .map(|(key, value)| Some((key.to_string(), literal(value)?)))
                .collect::<Option<Map<_, _>>>()?,
        ),
        Expression::TemplateExpr(template) => Value::String(template.to_string()),
        Expression::Parenthesis(inner) => literal(*inner)?,
        _ => return None,
    };

    Some(value)
}

fn read_json(input: &str) -> Result<RawDocument, PolicyError> {
    let Value::Object(root) = serde_json::from_str::<Value>(input)? else {
        return Err(PolicyError::InvalidRoot);
    };

    let mut document = RawDocument::default();
    for (key, value) in root {
        match key.as_str() {
            KEY_NAME => document.name = Some(root_string(KEY_NAME, value)?),
            KEY_PATH => collect_paths(value, &mut document.paths)?,
            _ => return Err(PolicyError::UnknownKey(key)),
        }
    }

    Ok(document)
}

/// Accepts `{"<path>": {...}}` or a list of such objects.
fn collect_paths(value: Value, out: &mut Vec<RawPath>) -> Result<(), PolicyError> {
    match value {
        Value::Object(paths) => {
            for (path, body) in paths {
                let Value::Object(entries) = body else {
                    return Err(PolicyError::InvalidPathBlock(format!(
                        "path {path:?} must be an object"
                    )));
                };
                out.push(RawPath {
                    path,
                    entries: entries.into_iter().collect(),
                });
            }
            Ok(())
        }
        Value::Array(items) => items
            .into_iter()
            .try_for_each(|item| collect_paths(item, out)),
        other => Err(PolicyError::InvalidPathBlock(format!(
            "expected an object of paths, found {other}"
        ))),
    }
}

fn root_string(key: &str, value: Value) -> Result<String, PolicyError> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(PolicyError::InvalidValue {
            path: String::new(),
            key: key.to_string(),
            expected: "a string",
        }),
    }
}

/// Path block fields after key validation.
#[derive(Default)]
struct PathFields {
    policy: Option<String>,
    capabilities: Vec<String>,
    allowed_parameters: Option<ParameterMap>,
    denied_parameters: Option<ParameterMap>,
    required_parameters: Vec<String>,
    min_wrapping_ttl: Option<Value>,
    max_wrapping_ttl: Option<Value>,
}

fn compile_path(raw: RawPath) -> Result<PathRule, PolicyError> {
    let path = raw.path;
    let mut fields = PathFields::default();

    for (key, value) in raw.entries {
        match key.as_str() {
            KEY_POLICY => fields.policy = Some(expect_string(&path, &key, value)?),
            KEY_CAPABILITIES => fields.capabilities = expect_string_list(&path, &key, value)?,
            KEY_ALLOWED_PARAMETERS => {
                fields.allowed_parameters = Some(expect_parameter_map(&path, &key, value)?)
            }
            KEY_DENIED_PARAMETERS => {
                fields.denied_parameters = Some(expect_parameter_map(&path, &key, value)?)
            }
            KEY_REQUIRED_PARAMETERS => {
                fields.required_parameters = expect_string_list(&path, &key, value)?
            }
            KEY_MIN_WRAPPING_TTL => fields.min_wrapping_ttl = Some(value),
            KEY_MAX_WRAPPING_TTL => fields.max_wrapping_ttl = Some(value),
            _ => return Err(PolicyError::UnknownPathKey { path, key }),
        }
    }

    let permissions = compile_permissions(&path, fields)?;
    Ok(PathRule::new(&path, permissions))
}

fn compile_permissions(path: &str, fields: PathFields) -> Result<Permissions, PolicyError> {
    // Legacy shorthand expands ahead of the explicit list
    let mut names: Vec<&str> = Vec::new();
    if let Some(policy) = fields.policy.as_deref() {
        let expanded = Capabilities::from_legacy_policy(policy).ok_or_else(|| {
            PolicyError::InvalidLegacyPolicy {
                path: path.to_string(),
                policy: policy.to_string(),
            }
        })?;
        names.extend(expanded.names());
        if expanded.is_deny() {
            names.push(super::capability::DENY_CAPABILITY);
        }
    }
    names.extend(fields.capabilities.iter().map(String::as_str));

    let mut capabilities = Capabilities::empty();
    for name in names {
        let bit = Capabilities::parse(name).ok_or_else(|| PolicyError::InvalidCapability {
            path: path.to_string(),
            capability: name.to_string(),
        })?;

        // Deny is absolute: nothing else on this rule is considered
        if bit.is_deny() {
            return Ok(Permissions::deny());
        }
        capabilities |= bit;
    }

    let mut permissions = Permissions::with_capabilities(capabilities);

    if let Some(value) = fields.min_wrapping_ttl {
        permissions.min_wrapping_ttl = parse_duration_second(&value).map_err(|reason| {
            PolicyError::InvalidDuration {
                path: path.to_string(),
                key: KEY_MIN_WRAPPING_TTL,
                reason,
            }
        })?;
    }
    if let Some(value) = fields.max_wrapping_ttl {
        permissions.max_wrapping_ttl = parse_duration_second(&value).map_err(|reason| {
            PolicyError::InvalidDuration {
                path: path.to_string(),
                key: KEY_MAX_WRAPPING_TTL,
                reason,
            }
        })?;
    }
    if !permissions.max_wrapping_ttl.is_zero()
        && permissions.max_wrapping_ttl < permissions.min_wrapping_ttl
    {
        return Err(PolicyError::InvertedWrappingTtl {
            path: path.to_string(),
        });
    }

    if let Some(allowed) = fields.allowed_parameters {
        permissions.allowed_parameters = lowercase_keys(allowed);
    }
    if let Some(denied) = fields.denied_parameters {
        permissions.denied_parameters = lowercase_keys(denied);
    }

    for name in fields.required_parameters {
        let name = name.to_lowercase();
        if !permissions.required_parameters.contains(&name) {
            permissions.required_parameters.push(name);
        }
    }

    Ok(permissions)
}

fn lowercase_keys(map: ParameterMap) -> ParameterMap {
    map.into_iter()
        .map(|(key, values)| (key.to_lowercase(), values))
        .collect()
}

fn expect_string(path: &str, key: &str, value: Value) -> Result<String, PolicyError> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(invalid_value(path, key, "a string")),
    }
}

fn expect_string_list(path: &str, key: &str, value: Value) -> Result<Vec<String>, PolicyError> {
    let Value::Array(items) = value else {
        return Err(invalid_value(path, key, "a list of strings"));
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => Ok(s),
            _ => Err(invalid_value(path, key, "a list of strings")),
        })
        .collect()
}

fn expect_parameter_map(path: &str, key: &str, value: Value) -> Result<ParameterMap, PolicyError> {
    let Value::Object(map) = value else {
        return Err(invalid_value(path, key, "a map of parameter names to value lists"));
    };

    map.into_iter()
        .map(|(name, values)| match values {
            Value::Array(values) => Ok((name, values)),
            _ => Err(invalid_value(path, key, "a map of parameter names to value lists")),
        })
        .collect()
}

fn invalid_value(path: &str, key: &str, expected: &'static str) -> PolicyError {
    PolicyError::InvalidValue {
        path: path.to_string(),
        key: key.to_string(),
        expected,
    }
}

/// Parses a duration given as whole seconds (number or numeric string) or
/// as a unit string such as `"90s"`, `"1h30m"`.
pub(crate) fn parse_duration_second(value: &Value) -> Result<Duration, String> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(Duration::from_secs)
            .ok_or_else(|| format!("invalid duration {n}")),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Ok(Duration::ZERO)
            } else if s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| e.to_string())
            } else {
                humantime::parse_duration(s).map_err(|e| e.to_string())
            }
        }
        other => Err(format!("invalid duration {other}")),
    }
}
