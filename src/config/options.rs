// src/config/options.rs

//! Execution options (working directory + environment) shared by every
//! process of a pipeline.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;

use toml::Value;
use tracing::{debug, warn};

/// Where and with which environment pipeline processes are started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    pub working_dir: PathBuf,
    /// Complete environment for the children; the inherited one is not
    /// consulted once this has been set.
    pub env: BTreeMap<OsString, OsString>,
}

impl Default for ExecutionOptions {
    /// Current working directory and environment of this process.
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env: std::env::vars_os().collect(),
        }
    }
}

impl ExecutionOptions {
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Replace (not extend) the environment.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.env = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }
}

/// Resolve raw options into concrete [`ExecutionOptions`].
///
/// Only a table is looked at. A string `cwd` (or `working_dir`) overrides the
/// working directory and a table `env` (or `environment`) replaces the whole
/// environment. Anything malformed is treated as absent, so this never fails.
pub fn resolve_options(raw: Option<&Value>) -> ExecutionOptions {
    let mut opts = ExecutionOptions::default();

    let Some(table) = raw.and_then(Value::as_table) else {
        if let Some(other) = raw {
            debug!(found = other.type_str(), "options are not a table; using defaults");
        }
        return opts;
    };

    if let Some(cwd) = lookup(table, &["cwd", "working_dir"]).and_then(Value::as_str) {
        opts.working_dir = PathBuf::from(cwd);
    }

    if let Some(env) = lookup(table, &["env", "environment"]).and_then(Value::as_table) {
        opts.env = env
            .iter()
            .filter_map(|(key, value)| match env_value(value) {
                Some(v) => Some((OsString::from(key), OsString::from(v))),
                None => {
                    warn!(
                        var = %key,
                        found = value.type_str(),
                        "ignoring environment variable with non-scalar value"
                    );
                    None
                }
            })
            .collect();
    }

    opts
}

/// Shallow merge of option tables: keys from `overrides` win.
///
/// Non-table inputs are dropped, the same way [`resolve_options`] ignores
/// them.
pub fn merge_options(defaults: Option<&Value>, overrides: Option<&Value>) -> Option<Value> {
    let defaults = defaults.and_then(Value::as_table);
    let overrides = overrides.and_then(Value::as_table);

    match (defaults, overrides) {
        (None, None) => None,
        (Some(d), None) => Some(Value::Table(d.clone())),
        (None, Some(o)) => Some(Value::Table(o.clone())),
        (Some(d), Some(o)) => {
            let mut merged = d.clone();
            for (key, value) in o {
                merged.insert(key.clone(), value.clone());
            }
            Some(Value::Table(merged))
        }
    }
}

fn lookup<'a>(table: &'a toml::Table, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| table.get(*k))
}

fn env_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}
