//! Lockbox CLI
//!
//! Offline policy tooling: validate policy files, query capabilities and
//! dry-run authorization decisions.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use lockbox::core::store::sanitize_name;
use lockbox::{
    CheckOptions, MemoryStorage, Operation, Policy, PolicyStore, Request, StoreConfig,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "lockbox")]
#[command(about = "Policy and ACL authorization toolkit")]
struct Args {
    /// Store configuration file (TOML)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse policy files and print their rules
    FmtCheck {
        /// Policy files (HCL or JSON)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the capabilities a policy set grants on a path
    Capabilities {
        #[command(flatten)]
        policies: PolicyArgs,

        /// Request path
        #[arg(long)]
        path: String,
    },

    /// Evaluate a single request against a policy set
    Authorize {
        #[command(flatten)]
        policies: PolicyArgs,

        /// Operation (create, read, update, delete, list, help, revoke, renew, rollback)
        #[arg(long)]
        op: Operation,

        /// Request path
        #[arg(long)]
        path: String,

        /// Request parameter as key=value; values are read as JSON when possible
        #[arg(long = "data", value_parser = parse_key_value)]
        data: Vec<(String, Value)>,

        /// Requested response-wrapping TTL (e.g. 300, 5m, 1h30m)
        #[arg(long, value_parser = parse_ttl)]
        wrap_ttl: Option<Duration>,

        /// Treat the path as sudo-protected
        #[arg(long)]
        sudo_required: bool,
    },
}

#[derive(clap::Args, Debug)]
struct PolicyArgs {
    /// Policy file to load; repeatable
    #[arg(short = 'p', long = "policy")]
    policies: Vec<PathBuf>,

    /// Include the root policy
    #[arg(long)]
    root: bool,

    /// Include the built-in default policy
    #[arg(long)]
    with_default: bool,
}

fn parse_key_value(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid parameter '{}', expected key=value", s))?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn parse_ttl(s: &str) -> Result<Duration, String> {
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| format!("invalid duration '{}': {}", s, e))
}

fn read_policy(path: &Path) -> anyhow::Result<Policy> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut policy =
        Policy::parse(&text).with_context(|| format!("failed to parse {}", path.display()))?;

    // Unnamed policies take their file name
    if policy.name.is_empty() {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .context("policy file name is not valid UTF-8")?;
        policy.name = sanitize_name(stem);
    }

    Ok(policy)
}

/// Load policy files into a fresh in-memory store and return the name set
fn load_store(args: &PolicyArgs, config: &StoreConfig) -> anyhow::Result<(PolicyStore, Vec<String>)> {
    let store = PolicyStore::new(Arc::new(MemoryStorage::new()), config);
    store.setup()?;

    let mut names = Vec::new();
    for path in &args.policies {
        let policy = read_policy(path)?;
        if policy.is_root() {
            bail!("{}: the root policy cannot be loaded from a file", path.display());
        }
        names.push(policy.name.clone());
        store
            .set(policy)
            .with_context(|| format!("failed to load {}", path.display()))?;
    }

    if args.with_default {
        names.push("default".to_string());
    }
    if args.root {
        names.push("root".to_string());
    }

    debug!(?names, "resolved policy set");
    Ok((store, names))
}

fn fmt_check(files: &[PathBuf]) -> ExitCode {
    let mut failed = false;

    for file in files {
        match read_policy(file) {
            Ok(policy) => {
                println!("{}: policy \"{}\", {} rule(s)", file.display(), policy.name, policy.rules.len());
                for rule in &policy.rules {
                    let caps = if rule.permissions.is_deny() {
                        vec!["deny"]
                    } else {
                        rule.permissions.capabilities.names()
                    };
                    println!(
                        "  path \"{}{}\" [{}]",
                        rule.prefix,
                        if rule.glob { "*" } else { "" },
                        caps.join(", ")
                    );
                }
            }
            Err(err) => {
                failed = true;
                eprintln!("{:#}", err);
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => StoreConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => StoreConfig::default(),
    };

    match args.command {
        Command::FmtCheck { files } => Ok(fmt_check(&files)),

        Command::Capabilities { policies, path } => {
            let (store, names) = load_store(&policies, &config)?;
            let acl = store.build_acl(&names)?;
            let path = path.strip_prefix('/').unwrap_or(&path);

            println!("{}", acl.capabilities(path).join(", "));
            Ok(ExitCode::SUCCESS)
        }

        Command::Authorize {
            policies,
            op,
            path,
            data,
            wrap_ttl,
            sudo_required,
        } => {
            let (store, names) = load_store(&policies, &config)?;
            let acl = store.build_acl(&names)?;

            let mut request = Request::new(op, path);
            for (key, value) in data {
                request = request.with_data(key, value);
            }
            if let Some(ttl) = wrap_ttl {
                request = request.with_wrap_ttl(ttl);
            }

            let results = acl.check(
                &request,
                CheckOptions {
                    root_privs_required: sudo_required,
                    unauthenticated: false,
                },
            );

            info!(op = %request.operation, path = %request.path, allowed = results.allowed, "authorization");
            println!(
                "{} {} {}: {} (sudo: {})",
                if results.allowed { "ALLOW" } else { "DENY" },
                request.operation,
                request.path,
                names.join(","),
                results.root_privs
            );

            Ok(if results.allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
