//! Shared parsing and formatting configuration.

use std::collections::HashMap;

/// Immutable configuration consulted by the tokenizer, the handler
/// definitions and the usage formatter.
///
/// The option prefix decides the parsing dialect: the prefix `--` enables
/// getopt mode, where single-character names become short options written
/// `-x` and long options keep the full prefix. Any other prefix puts every
/// name in one namespace.
#[derive(Debug, Clone)]
pub(crate) struct UsageMode {
    option: String,
    assigner: String,
    getopt: bool,
    pub(crate) options_help: HashMap<String, String>,
    pub(crate) var_names: HashMap<String, String>,
}

impl UsageMode {
    pub(crate) fn new(option: impl Into<String>, assigner: impl Into<String>) -> Self {
        let option = option.into();
        let getopt = option == "--";
        UsageMode {
            option,
            assigner: assigner.into(),
            getopt,
            options_help: HashMap::new(),
            var_names: HashMap::new(),
        }
    }

    pub(crate) fn getopt(&self) -> bool {
        self.getopt
    }

    pub(crate) fn option_prefix(&self) -> &str {
        &self.option
    }

    pub(crate) fn assigner(&self) -> &str {
        &self.assigner
    }

    /// Prefix rendered or parsed for one concrete name (`-` for shorts).
    pub(crate) fn option_prefix_for(&self, name: &str) -> &str {
        if !self.getopt || name.chars().count() > 1 {
            &self.option
        } else {
            "-"
        }
    }

    /// Separator between a name and its value (a space for shorts).
    pub(crate) fn delimiter_for(&self, name: &str) -> &str {
        if !self.getopt || name.chars().count() > 1 {
            &self.assigner
        } else {
            " "
        }
    }

    /// Help text registered under any of the given aliases.
    pub(crate) fn help_for(&self, aliases: &[String]) -> Option<&str> {
        aliases
            .iter()
            .find_map(|a| self.options_help.get(a))
            .map(String::as_str)
    }

    /// Display variable name for an option: an explicit override for any of
    /// its aliases, or the upper-cased fallback name.
    pub(crate) fn var_name_for(&self, aliases: &[String], fallback: &str) -> String {
        aliases
            .iter()
            .find_map(|a| self.var_names.get(a))
            .cloned()
            .unwrap_or_else(|| fallback.to_uppercase().replace('-', "_"))
    }
}
