//! Per-attempt binding state.
//!
//! An [`Attempt`] is created fresh for every candidate handler on every
//! resolution pass and discarded afterwards; nothing is shared or reset
//! between attempts. It consumes tokens from the shared tokenizer, binding
//! them into its definition's slots, and decides at the end whether the
//! handler is invokable.
//!
//! Failures come in two strengths. A *soft* rejection
//! ([`TokenFate::Rejected`]) means this handler cannot absorb the current
//! token but another candidate in the chain might. A *hard* error (`Err`)
//! means the command line itself is broken — a flag given a value, an option
//! with nothing to consume, a failed conversion — and aborts the whole pass.

use std::collections::HashMap;

use crate::bindings::{Binding, Bindings};
use crate::definition::{HandlerDefinition, SlotId, SlotKind};
use crate::error::UsageError;
use crate::schema::Value;
use crate::token::CommandLine;

/// What became of one offered token.
#[derive(Debug)]
pub(crate) enum TokenFate {
    Consumed,
    Rejected(UsageError),
}

#[derive(Debug)]
pub(crate) struct Attempt<'d> {
    def: &'d HandlerDefinition,
    bound: HashMap<SlotId, Value>,
    prefix_bound: HashMap<SlotId, Vec<(String, Option<String>)>>,
    positionals: Vec<String>,
    keywords: Vec<(String, Option<String>)>,
}

impl<'d> Attempt<'d> {
    pub(crate) fn new(def: &'d HandlerDefinition) -> Self {
        let prefix_bound = def
            .prefixes
            .values()
            .map(|&slot| (slot, Vec::new()))
            .collect();
        Attempt {
            def,
            bound: HashMap::new(),
            prefix_bound,
            positionals: Vec::new(),
            keywords: Vec::new(),
        }
    }

    /// Offers the current token to this attempt. May consume further tokens
    /// (an option's value) or only part of one (a short cluster character).
    pub(crate) fn handle_token(&mut self, cl: &mut CommandLine) -> Result<TokenFate, UsageError> {
        if cl.is_option {
            if cl.is_short {
                return self.handle_short(cl);
            }
            return self.handle_long(cl);
        }
        if !self.def.variadic && self.positionals.len() >= self.def.positional_slots.len() {
            return Ok(TokenFate::Rejected(UsageError::Unexpected {
                arg: cl.arg.clone(),
            }));
        }
        self.positionals.push(cl.arg.clone());
        cl.set_arg_handled()?;
        Ok(TokenFate::Consumed)
    }

    fn handle_long(&mut self, cl: &mut CommandLine) -> Result<TokenFate, UsageError> {
        let name = cl.name.clone();
        let known = self.def.defs.contains(&name);
        if known && self.try_option(cl)? {
            return Ok(TokenFate::Consumed);
        }
        if known {
            if let Some(&slot) = self.def.flags.get(&name) {
                if cl.split {
                    return Err(UsageError::FlagWithValue { name });
                }
                self.bound.insert(slot, Value::Bool(true));
                cl.set_arg_handled()?;
                return Ok(TokenFate::Consumed);
            }
        }
        if let Some((slot, remainder)) = self.split_prefix(&name) {
            let (pair_name, pair_value);
            if remainder.is_empty() {
                // Only `--D name=value` (getopt, separate token) is valid
                // once the remainder is missing.
                let dangling = if cl.split || !cl.is_getopt() {
                    true
                } else {
                    cl.set_arg_handled()?
                };
                if dangling {
                    return Err(UsageError::PrefixUsage {
                        arg: cl.arg.clone(),
                    });
                }
                pair_name = cl.name.clone();
                pair_value = cl.value.clone();
            } else {
                pair_name = remainder;
                pair_value = cl.value.clone();
            }
            if let Some(pairs) = self.prefix_bound.get_mut(&slot) {
                pairs.push((pair_name, pair_value));
            }
            cl.set_arg_handled()?;
            return Ok(TokenFate::Consumed);
        }
        if self.def.open_keywords_active() {
            self.keywords.push((name, cl.value.clone()));
            cl.set_arg_handled()?;
            return Ok(TokenFate::Consumed);
        }
        Ok(TokenFate::Rejected(UsageError::Unexpected {
            arg: cl.arg.clone(),
        }))
    }

    fn handle_short(&mut self, cl: &mut CommandLine) -> Result<TokenFate, UsageError> {
        let name = cl.name.clone();
        if !self.def.short_defs.contains(&name) {
            return Ok(TokenFate::Rejected(UsageError::UnexpectedFlag {
                name,
                arg: cl.arg.clone(),
            }));
        }
        if let Some(&slot) = self.def.flags.get(&name) {
            self.bound.insert(slot, Value::Bool(true));
            cl.set_short_arg_handled()?;
            return Ok(TokenFate::Consumed);
        }
        if self.try_option(cl)? {
            return Ok(TokenFate::Consumed);
        }
        // Present in the short namespace but neither flag nor option.
        let Some(&slot) = self.def.prefixes.get(&name) else {
            return Ok(TokenFate::Rejected(UsageError::UnexpectedFlag {
                name,
                arg: cl.arg.clone(),
            }));
        };
        let content = match cl.value.clone() {
            Some(attached) => attached,
            None => {
                if cl.set_arg_handled()? {
                    return Err(UsageError::IncorrectPrefix { name });
                }
                cl.arg.clone()
            }
        };
        let (_, pair_name, pair_value) = cl.separate(&content);
        if let Some(pairs) = self.prefix_bound.get_mut(&slot) {
            pairs.push((pair_name, pair_value));
        }
        cl.set_arg_handled()?;
        Ok(TokenFate::Consumed)
    }

    /// Binds the current token as an option value if its name is one.
    /// Returns whether it was handled.
    fn try_option(&mut self, cl: &mut CommandLine) -> Result<bool, UsageError> {
        let name = cl.name.clone();
        let Some(&slot) = self.def.options.get(&name) else {
            return Ok(false);
        };
        let raw = match cl.value.clone() {
            Some(v) => v,
            None => {
                // The value may follow as a separate token in getopt mode,
                // provided that token is a plain unsplit argument.
                if !cl.is_getopt() {
                    return Err(UsageError::OptionMissingValue { name });
                }
                let dangling = cl.set_arg_handled()?;
                if dangling || cl.split {
                    return Err(UsageError::OptionMissingValue { name });
                }
                cl.arg.clone()
            }
        };
        let value = match self.def.converters.get(&slot) {
            Some(converter) => converter.apply(&name, &raw)?,
            None => Value::Str(expand_value(&raw)),
        };
        self.bound.insert(slot, value);
        cl.set_arg_handled()?;
        Ok(true)
    }

    fn split_prefix(&self, name: &str) -> Option<(SlotId, String)> {
        let mut best: Option<(&str, SlotId)> = None;
        for (prefix, &slot) in &self.def.prefixes {
            if self.def.defs.contains(prefix) && name.starts_with(prefix.as_str()) {
                let longer = best.map_or(true, |(b, _)| prefix.len() > b.len());
                if longer {
                    best = Some((prefix, slot));
                }
            }
        }
        best.map(|(prefix, slot)| (slot, name[prefix.len()..].to_string()))
    }

    fn something_provided(&self) -> bool {
        !self.bound.is_empty()
            || !self.positionals.is_empty()
            || !self.keywords.is_empty()
            || self.prefix_bound.values().any(|pairs| !pairs.is_empty())
    }

    /// Whether the handler can be invoked with what was bound so far.
    /// Commons (`required == false`) are only checked once they received
    /// anything at all.
    pub(crate) fn check_invokable(&self, required: bool) -> Result<(), UsageError> {
        if !required && !self.something_provided() {
            return Ok(());
        }
        self.build_bindings().map(|_| ())
    }

    /// Resolves every slot to its bound value, a positional from the buffer,
    /// or its default — reporting the first mandatory slot left empty.
    pub(crate) fn build_bindings(&self) -> Result<Bindings, UsageError> {
        let mut values = HashMap::new();
        let mut queue = self.positionals.iter();
        let mut pending = self.positionals.len();
        for (slot, meta) in self.def.slots.iter().enumerate() {
            if meta.kind == SlotKind::Prefix {
                let pairs = self.prefix_bound.get(&slot).cloned().unwrap_or_default();
                values.insert(meta.key.clone(), Binding::Pairs(pairs));
                continue;
            }
            let value = if let Some(v) = self.bound.get(&slot) {
                v.clone()
            } else if meta.kind == SlotKind::Positional && pending > 0 {
                pending -= 1;
                Value::Str(queue.next().cloned().unwrap_or_default())
            } else if let Some(default) = self.def.defaults.get(&slot) {
                default.clone()
            } else {
                return Err(UsageError::MissingRequired {
                    kind: meta.kind.label(),
                    name: meta.public.clone(),
                });
            };
            values.insert(meta.key.clone(), Binding::Single(value));
        }
        Ok(Bindings {
            values,
            trailing: queue.cloned().collect(),
            keywords: self.keywords.clone(),
        })
    }
}

/// Untyped option values get home-directory and environment expansion, the
/// same treatment a shell would have applied.
pub(crate) fn expand_value(raw: &str) -> String {
    expand_user(&expand_vars(raw))
}

fn expand_vars(input: &str) -> String {
    let mut out = String::new();
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }
        if chars.peek() == Some(&'{') {
            chars.next();
            let mut name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                name.push(c);
            }
            match std::env::var(&name) {
                Ok(value) if closed => out.push_str(&value),
                _ => {
                    out.push_str("${");
                    out.push_str(&name);
                    if closed {
                        out.push('}');
                    }
                }
            }
        } else {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                out.push('$');
            } else {
                match std::env::var(&name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => {
                        out.push('$');
                        out.push_str(&name);
                    }
                }
            }
        }
    }
    out
}

fn expand_user(input: &str) -> String {
    if input == "~" {
        if let Some(home) = dirs::home_dir() {
            return home.to_string_lossy().into_owned();
        }
    } else if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().into_owned();
        }
    }
    input.to_string()
}
