//! Validated handler definitions.
//!
//! A [`HandlerDefinition`] is the immutable slot model built once per
//! declared handler: every public name (including aliases) resolves to one
//! slot, positionals keep declaration order, and the short/long namespaces
//! are populated according to the parsing dialect. All schema validation
//! happens here so that matching never has to second-guess the declaration.

use std::collections::{BTreeMap, HashMap, HashSet};

use regex::Regex;

use crate::error::{DefinitionError, UsageError};
use crate::mode::UsageMode;
use crate::schema::{Param, ParamKind, Value};

pub(crate) type SlotId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotKind {
    Flag,
    Option,
    Prefix,
    Positional,
}

impl SlotKind {
    /// Label used in "missing required …" messages.
    pub(crate) fn label(self) -> &'static str {
        match self {
            SlotKind::Flag => "flag",
            SlotKind::Option => "option",
            SlotKind::Prefix => "prefix",
            SlotKind::Positional => "parameter",
        }
    }
}

/// Value converter attached to a typed option slot.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Converter {
    Int,
    Float,
}

impl Converter {
    pub(crate) fn apply(self, name: &str, raw: &str) -> Result<Value, UsageError> {
        let invalid = || UsageError::InvalidValue {
            name: name.to_string(),
        };
        match self {
            Converter::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| invalid()),
            Converter::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| invalid()),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SlotMeta {
    /// Declared name; the stable key callbacks read bindings through.
    pub(crate) key: String,
    /// Public name shown on the command line, moved by renames.
    pub(crate) public: String,
    pub(crate) kind: SlotKind,
}

/// Immutable slot model of one declared handler.
#[derive(Debug, Clone)]
pub(crate) struct HandlerDefinition {
    pub(crate) name: String,
    pub(crate) doc: Option<String>,
    pub(crate) priority: i32,
    pub(crate) exclusive: bool,
    pub(crate) applies: Option<Regex>,
    pub(crate) flags: BTreeMap<String, SlotId>,
    pub(crate) options: BTreeMap<String, SlotId>,
    pub(crate) prefixes: BTreeMap<String, SlotId>,
    pub(crate) converters: HashMap<SlotId, Converter>,
    pub(crate) positional_slots: Vec<SlotId>,
    pub(crate) variadic: bool,
    open_keywords: bool,
    getopt: bool,
    pub(crate) defaults: HashMap<SlotId, Value>,
    pub(crate) slots: Vec<SlotMeta>,
    /// Long namespace (every name when not in getopt mode).
    pub(crate) defs: HashSet<String>,
    /// Short namespace; only populated in getopt mode.
    pub(crate) short_defs: HashSet<String>,
}

impl HandlerDefinition {
    pub(crate) fn build(
        name: &str,
        doc: Option<String>,
        priority: i32,
        exclusive: bool,
        applies: Option<&str>,
        params: &[Param],
        mode: &UsageMode,
    ) -> Result<Self, DefinitionError> {
        let mut def = HandlerDefinition {
            name: name.to_string(),
            doc,
            priority,
            exclusive,
            applies: applies.map(compile_applies).transpose()?,
            flags: BTreeMap::new(),
            options: BTreeMap::new(),
            prefixes: BTreeMap::new(),
            converters: HashMap::new(),
            positional_slots: Vec::new(),
            variadic: false,
            open_keywords: false,
            getopt: mode.getopt(),
            defaults: HashMap::new(),
            slots: Vec::new(),
            defs: HashSet::new(),
            short_defs: HashSet::new(),
        };

        for param in params {
            def.add_param(param)?;
        }
        Ok(def)
    }

    fn add_param(&mut self, param: &Param) -> Result<(), DefinitionError> {
        match param.kind {
            ParamKind::Variadic => {
                self.variadic = true;
                return Ok(());
            }
            ParamKind::OpenKeywords => {
                self.open_keywords = true;
                return Ok(());
            }
            _ => {}
        }
        if param.name.is_empty() {
            return Err(DefinitionError::EmptyName {
                handler: self.name.clone(),
            });
        }

        let kind = match param.kind {
            ParamKind::Flag | ParamKind::RequiredFlag => SlotKind::Flag,
            ParamKind::Opt | ParamKind::IntOpt | ParamKind::FloatOpt => SlotKind::Option,
            ParamKind::Prefix => SlotKind::Prefix,
            ParamKind::Positional => SlotKind::Positional,
            ParamKind::Variadic | ParamKind::OpenKeywords => unreachable!(),
        };
        let slot = self.slots.len();
        self.slots.push(SlotMeta {
            key: param.name.clone(),
            public: param.name.clone(),
            kind,
        });

        match kind {
            SlotKind::Positional => {
                if self.variadic {
                    return Err(DefinitionError::PositionalAfterVariadic {
                        name: param.name.clone(),
                        handler: self.name.clone(),
                    });
                }
                self.positional_slots.push(slot);
            }
            _ => {
                self.register_name(&param.name, slot, kind)?;
                for alias in &param.aliases {
                    if self.getopt && is_short(&param.name) == is_short(alias) {
                        return Err(DefinitionError::AliasPairing {
                            first: param.name.clone(),
                            second: alias.clone(),
                        });
                    }
                    self.register_name(alias, slot, kind)?;
                }
            }
        }

        match param.kind {
            ParamKind::IntOpt => {
                self.converters.insert(slot, Converter::Int);
            }
            ParamKind::FloatOpt => {
                self.converters.insert(slot, Converter::Float);
            }
            _ => {}
        }
        if let Some(default) = &param.default {
            self.defaults.insert(slot, default.clone());
        } else if param.kind == ParamKind::Flag {
            // Plain flags are optional; only RequiredFlag demands presence.
            self.defaults.insert(slot, Value::Bool(false));
        }
        Ok(())
    }

    fn register_name(
        &mut self,
        name: &str,
        slot: SlotId,
        kind: SlotKind,
    ) -> Result<(), DefinitionError> {
        let namespace = if self.getopt && is_short(name) {
            &mut self.short_defs
        } else {
            &mut self.defs
        };
        if !namespace.insert(name.to_string()) {
            return Err(DefinitionError::DuplicateOption {
                name: name.to_string(),
                handler: self.name.clone(),
            });
        }
        let map = match kind {
            SlotKind::Flag => &mut self.flags,
            SlotKind::Option => &mut self.options,
            SlotKind::Prefix => &mut self.prefixes,
            SlotKind::Positional => return Ok(()),
        };
        map.insert(name.to_string(), slot);
        Ok(())
    }

    /// Moves the public name of an option or positional. Unknown names are
    /// ignored so one rename table can serve every handler.
    pub(crate) fn apply_rename(&mut self, old: &str, new: &str) -> Result<(), DefinitionError> {
        let old_is_short = self.getopt && is_short(old);
        let known = if old_is_short {
            self.short_defs.contains(old)
        } else {
            self.defs.contains(old)
        };
        if known {
            let target = if self.getopt && is_short(new) {
                &mut self.short_defs
            } else {
                &mut self.defs
            };
            if target.contains(new) {
                return Err(DefinitionError::RenameCollision {
                    name: new.to_string(),
                    handler: self.name.clone(),
                });
            }
            target.insert(new.to_string());
            if old_is_short {
                self.short_defs.remove(old);
            } else {
                self.defs.remove(old);
            }
            for map in [&mut self.flags, &mut self.options, &mut self.prefixes] {
                if let Some(slot) = map.remove(old) {
                    map.insert(new.to_string(), slot);
                    if self.slots[slot].public == old {
                        self.slots[slot].public = new.to_string();
                    }
                    break;
                }
            }
        } else {
            let mut changed = false;
            for &slot in &self.positional_slots {
                if self.slots[slot].public == old {
                    changed = true;
                } else if changed && self.slots[slot].public == new {
                    return Err(DefinitionError::RenameCollision {
                        name: new.to_string(),
                        handler: self.name.clone(),
                    });
                }
            }
            let renamed: Vec<SlotId> = self
                .positional_slots
                .iter()
                .copied()
                .filter(|&slot| self.slots[slot].public == old)
                .collect();
            for slot in renamed {
                self.slots[slot].public = new.to_string();
            }
        }
        Ok(())
    }

    /// Applies one engine-wide alias pair: whichever of the two names this
    /// definition knows, the other becomes an alias of the same slot.
    /// Unknown pairs are ignored.
    pub(crate) fn apply_alias(&mut self, first: &str, second: &str) -> Result<(), DefinitionError> {
        if self.getopt {
            let (short, long) = if first.chars().count() > second.chars().count() {
                (second, first)
            } else {
                (first, second)
            };
            if !is_short(short) || is_short(long) {
                return Err(DefinitionError::AliasPairing {
                    first: short.to_string(),
                    second: long.to_string(),
                });
            }
            if self.defs.contains(long) {
                return self.add_alias(long, short, true);
            }
            if self.short_defs.contains(short) {
                return self.add_alias(short, long, false);
            }
            Ok(())
        } else {
            let (known, alias) = if self.defs.contains(second) {
                (second, first)
            } else {
                (first, second)
            };
            if self.defs.contains(known) {
                return self.add_alias(known, alias, false);
            }
            Ok(())
        }
    }

    fn add_alias(
        &mut self,
        known: &str,
        alias: &str,
        alias_is_short: bool,
    ) -> Result<(), DefinitionError> {
        let namespace = if alias_is_short && self.getopt {
            &mut self.short_defs
        } else {
            &mut self.defs
        };
        if namespace.contains(alias) {
            return Err(DefinitionError::AliasCollision {
                name: known.to_string(),
                alias: alias.to_string(),
                handler: self.name.clone(),
            });
        }
        namespace.insert(alias.to_string());
        for map in [&mut self.flags, &mut self.options, &mut self.prefixes] {
            if let Some(&slot) = map.get(known) {
                map.insert(alias.to_string(), slot);
            }
        }
        Ok(())
    }

    /// The open-keyword sink only operates outside getopt mode, where an
    /// unknown long name cannot be a mistyped short cluster.
    pub(crate) fn open_keywords_active(&self) -> bool {
        self.open_keywords && !self.getopt
    }

    pub(crate) fn public_name(&self, slot: SlotId) -> &str {
        &self.slots[slot].public
    }

    /// Aliases of a named slot, shortest first, from one of the name maps.
    pub(crate) fn aliases_of(map: &BTreeMap<String, SlotId>, slot: SlotId) -> Vec<String> {
        let mut aliases: Vec<String> = map
            .iter()
            .filter(|(_, &s)| s == slot)
            .map(|(n, _)| n.clone())
            .collect();
        aliases.sort_by_key(|a| a.chars().count());
        aliases
    }
}

fn is_short(name: &str) -> bool {
    name.chars().count() == 1
}

/// Compiles `"run_static, run_*"` into `^(run_static|run_.*)$`.
fn compile_applies(patterns: &str) -> Result<Regex, DefinitionError> {
    let parts: Vec<String> = patterns
        .split(',')
        .map(|p| regex::escape(p.trim()).replace("\\*", ".*"))
        .filter(|p| !p.is_empty())
        .collect();
    let source = format!("^({})$", parts.join("|"));
    Regex::new(&source).map_err(|_| DefinitionError::InvalidApplies {
        pattern: patterns.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn getopt() -> UsageMode {
        UsageMode::new("--", "=")
    }

    fn build(params: &[Param], mode: &UsageMode) -> Result<HandlerDefinition, DefinitionError> {
        HandlerDefinition::build("sample", None, 0, false, None, params, mode)
    }

    #[test]
    fn test_every_name_maps_to_one_slot() {
        let def = build(
            &[
                Param::option("source").alias("s"),
                Param::flag("recursive").alias("r"),
                Param::positional("destination"),
            ],
            &getopt(),
        )
        .unwrap();
        assert_eq!(def.options["source"], def.options["s"]);
        assert_eq!(def.flags["recursive"], def.flags["r"]);
        assert_eq!(def.positional_slots.len(), 1);
        assert!(def.defs.contains("source"));
        assert!(def.short_defs.contains("s"));
        assert!(!def.defs.contains("s"));
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let err = build(
            &[Param::flag("verbose"), Param::option("verbose")],
            &getopt(),
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateOption { .. }));
    }

    #[test]
    fn test_one_char_names_collide_in_both_dialects() {
        let mode = UsageMode::new("/", ":");
        let err = build(&[Param::flag("v"), Param::option("v")], &mode).unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateOption { .. }));
        // Both land in the short namespace under getopt.
        assert!(build(&[Param::flag("v"), Param::option("v")], &getopt()).is_err());
    }

    #[test]
    fn test_getopt_alias_must_pair_short_and_long() {
        let err = build(&[Param::flag("verbose").alias("loud")], &getopt()).unwrap_err();
        assert!(matches!(err, DefinitionError::AliasPairing { .. }));
        assert!(build(&[Param::flag("verbose").alias("v")], &getopt()).is_ok());
    }

    #[test]
    fn test_positional_after_variadic_is_rejected() {
        let err = build(
            &[Param::positional("first"), Param::variadic(), Param::positional("last")],
            &getopt(),
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::PositionalAfterVariadic { .. }));
    }

    #[test]
    fn test_engine_alias_attaches_to_the_known_name() {
        let mut def = build(&[Param::option("mode")], &getopt()).unwrap();
        def.apply_alias("m", "mode").unwrap();
        assert_eq!(def.options["m"], def.options["mode"]);
        assert!(def.short_defs.contains("m"));
        // Pairs this handler knows nothing about are ignored.
        def.apply_alias("x", "extra").unwrap();
        assert!(!def.defs.contains("extra"));
    }

    #[test]
    fn test_engine_alias_collision_is_rejected() {
        let mut def = build(&[Param::option("mode"), Param::flag("m")], &getopt()).unwrap();
        let err = def.apply_alias("m", "mode").unwrap_err();
        assert!(matches!(err, DefinitionError::AliasCollision { .. }));
    }

    #[test]
    fn test_rename_moves_the_public_name() {
        let mut def = build(&[Param::flag("d"), Param::positional("dest")], &getopt()).unwrap();
        def.apply_rename("d", "dry-run").unwrap();
        assert!(def.flags.contains_key("dry-run"));
        assert!(!def.flags.contains_key("d"));
        def.apply_rename("dest", "target").unwrap();
        let slot = def.positional_slots[0];
        assert_eq!(def.public_name(slot), "target");
    }

    #[test]
    fn test_rename_collision_is_rejected() {
        let mut def = build(
            &[Param::flag("quiet"), Param::flag("silent")],
            &getopt(),
        )
        .unwrap();
        let err = def.apply_rename("quiet", "silent").unwrap_err();
        assert!(matches!(err, DefinitionError::RenameCollision { .. }));
    }

    #[test]
    fn test_plain_flags_default_to_false_required_flags_do_not() {
        let def = build(
            &[Param::flag("quiet"), Param::required_flag("confirm")],
            &getopt(),
        )
        .unwrap();
        let quiet = def.flags["quiet"];
        let confirm = def.flags["confirm"];
        assert_eq!(def.defaults.get(&quiet), Some(&Value::Bool(false)));
        assert_eq!(def.defaults.get(&confirm), None);
    }

    #[test]
    fn test_typed_converters() {
        assert_eq!(
            Converter::Int.apply("port", "8080").unwrap(),
            Value::Int(8080)
        );
        assert_eq!(
            Converter::Float.apply("ratio", "0.5").unwrap(),
            Value::Float(0.5)
        );
        let err = Converter::Int.apply("port", "http").unwrap_err();
        assert_eq!(err.to_string(), "incorrect value for port");
    }

    #[test]
    fn test_applies_pattern_compiles_wildcards() {
        let re = compile_applies("run_static, run_*").unwrap();
        assert!(re.is_match("run_static"));
        assert!(re.is_match("run_bottle"));
        assert!(!re.is_match("help"));
    }
}
