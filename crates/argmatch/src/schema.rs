//! Declarative handler schemas.
//!
//! A handler is declared as a [`HandlerSpec`] (or [`CommonSpec`] for shared
//! option sets) listing its parameters as [`Param`] values. Specs are plain
//! data: validation and slot assignment happen once, when
//! [`MatcherBuilder::build`](crate::MatcherBuilder::build) turns every spec
//! into an immutable definition.
//!
//! # Name inference
//!
//! [`Param::inferred`] offers the suffix convention as a convenience on top
//! of the explicit constructors: a name ending in `Flag`, `Option`,
//! `OptionInt`, `OptionFloat` or `Prefix` declares that parameter kind, with
//! the camel-cased stem turned into a hyphenated public name
//! (`dryRunFlag` → flag `dry-run`). Anything else is a positional. The
//! inferred form lowers to the same explicit schema and carries no special
//! behavior of its own.

use std::fmt;

/// A bound or default argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// What a declared parameter matches on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParamKind {
    /// Boolean presence option; binds `false` when absent.
    Flag,
    /// A flag whose presence is mandatory for the handler to match.
    RequiredFlag,
    /// Named argument taking a string value.
    Opt,
    /// Named argument converted to an integer at bind time.
    IntOpt,
    /// Named argument converted to a float at bind time.
    FloatOpt,
    /// Repeatable name/value accumulator (`-Dkey=val`).
    Prefix,
    /// Argument identified by position.
    Positional,
    /// Catch-all for positionals beyond the declared set.
    Variadic,
    /// Catch-all for unknown `name=value` options (non-getopt mode only).
    OpenKeywords,
}

/// One declared parameter of a handler.
#[derive(Debug, Clone)]
pub struct Param {
    pub(crate) kind: ParamKind,
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) default: Option<Value>,
    pub(crate) help: Option<String>,
    pub(crate) var_name: Option<String>,
}

impl Param {
    fn with(kind: ParamKind, name: impl Into<String>) -> Self {
        Param {
            kind,
            name: name.into(),
            aliases: Vec::new(),
            default: None,
            help: None,
            var_name: None,
        }
    }

    /// A boolean flag; binds `false` when not given.
    pub fn flag(name: impl Into<String>) -> Self {
        Param::with(ParamKind::Flag, name)
    }

    /// A flag that must be present for the handler to be invokable.
    pub fn required_flag(name: impl Into<String>) -> Self {
        Param::with(ParamKind::RequiredFlag, name)
    }

    /// A named argument requiring a string value.
    pub fn option(name: impl Into<String>) -> Self {
        Param::with(ParamKind::Opt, name)
    }

    /// A named argument whose value must parse as an integer.
    pub fn int_option(name: impl Into<String>) -> Self {
        Param::with(ParamKind::IntOpt, name)
    }

    /// A named argument whose value must parse as a float.
    pub fn float_option(name: impl Into<String>) -> Self {
        Param::with(ParamKind::FloatOpt, name)
    }

    /// A repeatable prefix accumulating `(suffix, value)` pairs.
    pub fn prefix(name: impl Into<String>) -> Self {
        Param::with(ParamKind::Prefix, name)
    }

    /// An argument identified by position.
    pub fn positional(name: impl Into<String>) -> Self {
        Param::with(ParamKind::Positional, name)
    }

    /// Absorbs any positional arguments beyond the declared set.
    pub fn variadic() -> Self {
        Param::with(ParamKind::Variadic, "...")
    }

    /// Absorbs unknown `name=value` options. Inert in getopt mode.
    pub fn open_keywords() -> Self {
        Param::with(ParamKind::OpenKeywords, "")
    }

    /// Declares the parameter kind from the name's suffix convention.
    pub fn inferred(name: &str) -> Self {
        const SUFFIXES: [(&str, ParamKind); 5] = [
            ("OptionInt", ParamKind::IntOpt),
            ("OptionFloat", ParamKind::FloatOpt),
            ("Option", ParamKind::Opt),
            ("Flag", ParamKind::Flag),
            ("Prefix", ParamKind::Prefix),
        ];
        for (suffix, kind) in SUFFIXES {
            if let Some(stem) = name.strip_suffix(suffix) {
                if !stem.is_empty() {
                    return Param::with(kind, hyphenate(stem));
                }
            }
        }
        Param::positional(name)
    }

    /// Adds an alternative public name for the same slot.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Default value used when the parameter is not provided.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Help text shown in the options section of the usage output.
    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.help = Some(text.into());
        self
    }

    /// Display name for the option's value in usage output (`-m MODE`).
    pub fn var_name(mut self, name: impl Into<String>) -> Self {
        self.var_name = Some(name.into());
        self
    }
}

/// Converts a camelCase stem into its hyphenated public form.
fn hyphenate(stem: &str) -> String {
    let mut out = String::new();
    let mut after_lower = false;
    for ch in stem.chars() {
        let ch = if after_lower && ch.is_uppercase() {
            out.push('-');
            ch.to_ascii_lowercase()
        } else {
            ch
        };
        out.push(ch);
        after_lower = ch.is_lowercase();
    }
    out
}

/// Declaration of one primary handler: a complete, independently invocable
/// command alternative.
#[derive(Debug, Clone)]
pub struct HandlerSpec {
    pub(crate) name: String,
    pub(crate) doc: Option<String>,
    pub(crate) priority: i32,
    pub(crate) exclusive: bool,
    pub(crate) params: Vec<Param>,
}

impl HandlerSpec {
    pub fn new(name: impl Into<String>) -> Self {
        HandlerSpec {
            name: name.into(),
            doc: None,
            priority: 0,
            exclusive: false,
            params: Vec::new(),
        }
    }

    /// Builds the parameter list through the suffix convention.
    pub fn from_names<I, S>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut spec = HandlerSpec::new(name);
        spec.params = params.into_iter().map(|n| Param::inferred(n.as_ref())).collect();
        spec
    }

    /// Documentation rendered in the alternatives section of the usage.
    pub fn doc(mut self, text: impl Into<String>) -> Self {
        self.doc = Some(text.into());
        self
    }

    /// Handlers are tried in descending priority, registration order on ties.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Excludes this handler from commons declared without an `applies`
    /// pattern.
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn params<I>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = Param>,
    {
        self.params.extend(params);
        self
    }
}

/// Declaration of a common handler: a shared option set applied across the
/// primaries it accepts.
#[derive(Debug, Clone)]
pub struct CommonSpec {
    pub(crate) name: String,
    pub(crate) priority: i32,
    pub(crate) applies: Option<String>,
    pub(crate) params: Vec<Param>,
}

impl CommonSpec {
    pub fn new(name: impl Into<String>) -> Self {
        CommonSpec {
            name: name.into(),
            priority: 0,
            applies: None,
            params: Vec::new(),
        }
    }

    /// Restricts applicability to primaries whose name matches one of the
    /// comma-separated patterns (`*` is a wildcard): `"run_static, run_*"`.
    /// Without a pattern the common applies to every non-exclusive primary.
    pub fn applies(mut self, patterns: impl Into<String>) -> Self {
        self.applies = Some(patterns.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn params<I>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = Param>,
    {
        self.params.extend(params);
        self
    }
}
