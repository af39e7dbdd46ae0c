//! Tool options
//!
//! Options are a free-form string-keyed map; which keys matter depends on the
//! selected variant. Each variant (and each optional sub-flow) declares the keys
//! it cannot do without in an [`OptionSchema`], checked before any stage is
//! built.

use crate::command::Arg;
use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single option value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<OptionValue>),
    Table(BTreeMap<String, OptionValue>),
}

impl OptionValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Table(_) => "table",
        }
    }

    /// Whether the value counts as "not set" for a required key
    fn is_blank(&self) -> bool {
        match self {
            Self::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{}", s),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(" "))
            }
            Self::Table(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                write!(f, "{}", parts.join(" "))
            }
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<&str>> for OptionValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(OptionValue::from).collect())
    }
}

/// Options map handed to a flow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(BTreeMap<String, OptionValue>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    /// Whether the key is present with a non-blank value
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_blank())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Read a string option; integers and floats are accepted and rendered
    pub fn get_str(&self, key: &str) -> BuildResult<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) if v.is_blank() => Ok(None),
            Some(OptionValue::String(s)) => Ok(Some(s.clone())),
            Some(v @ (OptionValue::Integer(_) | OptionValue::Float(_))) => Ok(Some(v.to_string())),
            Some(other) => Err(BuildError::invalid_option(
                key,
                format!("expected a string, found a {}", other.kind()),
            )),
        }
    }

    /// Read a string option that the variant cannot do without
    pub fn require_str(&self, key: &str, variant: impl fmt::Display) -> BuildResult<String> {
        self.get_str(key)?
            .ok_or_else(|| BuildError::missing_option(key, variant))
    }

    /// Read a boolean flag, `false` when absent
    pub fn get_bool(&self, key: &str) -> BuildResult<bool> {
        match self.get(key) {
            None => Ok(false),
            Some(OptionValue::Bool(b)) => Ok(*b),
            Some(other) => Err(BuildError::invalid_option(
                key,
                format!("expected a boolean, found a {}", other.kind()),
            )),
        }
    }

    /// Read a boolean flag with an explicit default
    pub fn get_bool_or(&self, key: &str, default: bool) -> BuildResult<bool> {
        if self.get(key).is_none() {
            return Ok(default);
        }
        self.get_bool(key)
    }

    /// Extra command line arguments
    ///
    /// A list becomes one literal token per element; a plain string is taken
    /// as a pre-formed shell fragment and passed through unquoted.
    pub fn args(&self, key: &str) -> BuildResult<Vec<Arg>> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(v) if v.is_blank() => Ok(Vec::new()),
            Some(OptionValue::String(s)) => Ok(vec![Arg::raw(s.clone())]),
            Some(OptionValue::List(items)) => Ok(items
                .iter()
                .map(|item| Arg::literal(item.to_string()))
                .collect()),
            Some(other) => Err(BuildError::invalid_option(
                key,
                format!("expected a string or a list, found a {}", other.kind()),
            )),
        }
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Declarative list of option keys a variant or sub-flow requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionSchema {
    pub required: &'static [&'static str],
}

impl OptionSchema {
    pub const EMPTY: OptionSchema = OptionSchema { required: &[] };

    pub const fn requires(required: &'static [&'static str]) -> Self {
        Self { required }
    }

    /// Check every required key, reporting the first one missing
    pub fn validate(&self, owner: impl fmt::Display, options: &Options) -> BuildResult<()> {
        match self.required.iter().find(|key| !options.is_set(key)) {
            Some(key) => Err(BuildError::missing_option(*key, owner)),
            None => Ok(()),
        }
    }
}
