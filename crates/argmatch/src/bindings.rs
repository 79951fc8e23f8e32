//! Bound argument values handed to handler callbacks.

use std::collections::HashMap;

use crate::schema::Value;

#[derive(Debug, Clone)]
pub(crate) enum Binding {
    Single(Value),
    Pairs(Vec<(String, Option<String>)>),
}

/// The name-keyed view of a successful attempt: every declared parameter
/// resolved to a value (bound or defaulted), plus the variadic tail and the
/// open-keyword sink.
///
/// Lookups use the *declared* parameter name; public renames and aliases
/// only change what the command line accepts, not what callbacks read.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    pub(crate) values: HashMap<String, Binding>,
    pub(crate) trailing: Vec<String>,
    pub(crate) keywords: Vec<(String, Option<String>)>,
}

impl Bindings {
    /// Raw value of a flag, option or positional parameter.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.values.get(name) {
            Some(Binding::Single(v)) => Some(v),
            _ => None,
        }
    }

    /// String value of an option or positional parameter.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Integer value of a typed option.
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    /// Float value of a typed option (integers widen).
    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_float)
    }

    /// Whether a flag was given. Absent flags read as `false`.
    pub fn get_flag(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Accumulated `(suffix, value)` pairs of a prefix parameter.
    pub fn prefix_pairs(&self, name: &str) -> &[(String, Option<String>)] {
        match self.values.get(name) {
            Some(Binding::Pairs(pairs)) => pairs,
            _ => &[],
        }
    }

    /// Positional arguments absorbed by the variadic catch-all.
    pub fn trailing(&self) -> &[String] {
        &self.trailing
    }

    /// Unknown `name=value` options absorbed by the open-keyword sink.
    pub fn keywords(&self) -> &[(String, Option<String>)] {
        &self.keywords
    }
}
