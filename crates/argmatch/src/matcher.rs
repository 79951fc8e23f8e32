//! Handler registration and resolution.
//!
//! [`MatcherBuilder`] collects declared handlers and validates them eagerly
//! into an immutable [`Matcher`]. [`Matcher::process`] then resolves one
//! `argv` per call: candidates are tried in descending priority, each
//! against a fresh replay of the input, and the first fully satisfiable one
//! is invoked — its applicable commons first, then the primary itself. When
//! nothing matches, the error from the attempt that progressed furthest
//! through the input is surfaced, so the user sees the most informative
//! complaint rather than the first one.
//!
//! # Example
//!
//! ```rust
//! use argmatch::{ArgOrder, HandlerSpec, Matcher, Outcome, Param};
//!
//! let matcher = Matcher::builder()
//!     .handler(
//!         HandlerSpec::new("copy")
//!             .param(Param::option("source").alias("s"))
//!             .param(Param::flag("recursive").alias("r"))
//!             .param(Param::positional("destination")),
//!         |args| Ok(format!("{} -> {}", args.get_str("source").unwrap_or(""),
//!                           args.get_str("destination").unwrap_or(""))),
//!     )
//!     .build()?;
//!
//! match matcher.process(["-s", "a.txt", "-r", "out/"], ArgOrder::Free)? {
//!     Outcome::Done(line) => assert_eq!(line, "a.txt -> out/"),
//!     Outcome::Help(text) => println!("{text}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::attempt::{Attempt, TokenFate};
use crate::bindings::Bindings;
use crate::definition::HandlerDefinition;
use crate::error::{DefinitionError, ProcessError, UsageError};
use crate::mode::UsageMode;
use crate::schema::{CommonSpec, HandlerSpec, Param};
use crate::token::CommandLine;
use crate::usage::Usage;

/// Ordering rule for options relative to positional arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgOrder {
    /// Options may appear anywhere on the command line.
    Free,
    /// GNU ordering: no options after the first positional argument.
    Gnu,
}

/// Result of a successful [`Matcher::process`] call.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The winning handler's return value.
    Done(T),
    /// The implicit help handler matched; carries the rendered usage text.
    Help(String),
}

type PrimaryFn<T> = Rc<RefCell<dyn FnMut(&Bindings) -> Result<T, anyhow::Error>>>;
type CommonFn = Rc<RefCell<dyn FnMut(&Bindings) -> Result<(), anyhow::Error>>>;

pub(crate) struct Primary<T> {
    pub(crate) def: HandlerDefinition,
    /// `None` marks the implicit help handler.
    callback: Option<PrimaryFn<T>>,
}

pub(crate) struct Common {
    pub(crate) def: HandlerDefinition,
    callback: CommonFn,
}

impl Common {
    pub(crate) fn applies_to(&self, primary: &HandlerDefinition) -> bool {
        match &self.def.applies {
            Some(pattern) => pattern.is_match(&primary.name),
            None => !primary.exclusive,
        }
    }
}

enum CandidateOutcome {
    Matched {
        bindings: Bindings,
        common_bindings: Vec<Option<Bindings>>,
    },
    Failed(UsageError),
}

/// The argument matching engine. Built once, immutable afterwards; every
/// [`process`](Matcher::process) call replays the input against the declared
/// handlers with fresh per-attempt state.
pub struct Matcher<T> {
    mode: UsageMode,
    primaries: Vec<Primary<T>>,
    commons: Vec<Common>,
}

impl<T> Matcher<T> {
    pub fn builder() -> MatcherBuilder<T> {
        MatcherBuilder::new()
    }

    /// Resolves `argv` (program name excluded) against the declared
    /// handlers and invokes the winner.
    pub fn process<I, S>(&self, argv: I, order: ArgOrder) -> Result<Outcome<T>, ProcessError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = argv.into_iter().map(Into::into).collect();
        let mut cl = CommandLine::new(&args, &self.mode, order == ArgOrder::Gnu);
        let mut best: Option<((usize, usize), UsageError)> = None;

        for primary in &self.primaries {
            let commons: Vec<&Common> = self
                .commons
                .iter()
                .filter(|c| c.applies_to(&primary.def))
                .collect();
            debug!("trying handler `{}`", primary.def.name);
            match self.try_candidate(primary, &commons, &mut cl)? {
                CandidateOutcome::Matched {
                    bindings,
                    common_bindings,
                } => {
                    debug!("matched handler `{}`", primary.def.name);
                    for (common, common_bindings) in commons.iter().zip(common_bindings) {
                        if let Some(b) = common_bindings {
                            (&mut *common.callback.borrow_mut())(&b)?;
                        }
                    }
                    return match &primary.callback {
                        Some(callback) => {
                            Ok(Outcome::Done((&mut *callback.borrow_mut())(&bindings)?))
                        }
                        None => Ok(Outcome::Help(self.usage().render())),
                    };
                }
                CandidateOutcome::Failed(problem) => {
                    let position = cl.position();
                    debug!(
                        "handler `{}` rejected at {:?}: {}",
                        primary.def.name, position, problem
                    );
                    if best.as_ref().map_or(true, |(p, _)| position > *p) {
                        best = Some((position, problem));
                    }
                }
            }
        }
        Err(best.map(|(_, e)| e).unwrap_or(UsageError::NoMatch).into())
    }

    /// Like [`process`](Matcher::process), but reports usage failures as a
    /// single line on stderr and returns the caller's sentinel instead of
    /// an error. Help output goes to stdout.
    pub fn process_or<I, S>(&self, argv: I, order: ArgOrder, fallback: T) -> T
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self.process(argv, order) {
            Ok(Outcome::Done(value)) => value,
            Ok(Outcome::Help(text)) => {
                println!("{text}");
                fallback
            }
            Err(err) => {
                eprintln!("{err}");
                fallback
            }
        }
    }

    /// The usage formatter over this matcher's handler set.
    pub fn usage(&self) -> Usage<'_> {
        let alternatives = self
            .primaries
            .iter()
            .map(|p| {
                let mut chain = vec![&p.def];
                chain.extend(
                    self.commons
                        .iter()
                        .filter(|c| c.applies_to(&p.def))
                        .map(|c| &c.def),
                );
                chain
            })
            .collect();
        Usage::new(&self.mode, alternatives)
    }

    /// Replays the input against one primary and its commons. `Err` means a
    /// hard usage error that aborts the whole pass.
    fn try_candidate(
        &self,
        primary: &Primary<T>,
        commons: &[&Common],
        cl: &mut CommandLine<'_>,
    ) -> Result<CandidateOutcome, UsageError> {
        cl.reset()?;
        let mut attempt = Attempt::new(&primary.def);
        let mut common_attempts: Vec<Attempt<'_>> =
            commons.iter().map(|c| Attempt::new(&c.def)).collect();

        'tokens: while !cl.finished() {
            let mut problem = match attempt.handle_token(cl)? {
                TokenFate::Consumed => continue 'tokens,
                TokenFate::Rejected(e) => e,
            };
            for common in common_attempts.iter_mut() {
                match common.handle_token(cl)? {
                    TokenFate::Consumed => continue 'tokens,
                    TokenFate::Rejected(e) => problem = e,
                }
            }
            // Nobody in the chain could absorb the token; the last
            // rejection stands as this candidate's failure.
            return Ok(CandidateOutcome::Failed(problem));
        }

        for common in &common_attempts {
            if let Err(e) = common.check_invokable(false) {
                return Ok(CandidateOutcome::Failed(e));
            }
        }
        if let Err(e) = attempt.check_invokable(true) {
            return Ok(CandidateOutcome::Failed(e));
        }
        let bindings = match attempt.build_bindings() {
            Ok(b) => b,
            Err(e) => return Ok(CandidateOutcome::Failed(e)),
        };
        // Commons run with whatever they can satisfy; one that cannot be
        // invoked (nothing bound, no full defaults) is skipped silently.
        let common_bindings = common_attempts
            .iter()
            .map(|a| a.build_bindings().ok())
            .collect();
        Ok(CandidateOutcome::Matched {
            bindings,
            common_bindings,
        })
    }
}

/// Builder collecting handler declarations and engine-wide configuration.
pub struct MatcherBuilder<T> {
    option_prefix: String,
    assigner: String,
    aliases: Vec<(String, String)>,
    renames: Vec<(String, String)>,
    options_help: HashMap<String, String>,
    var_names: HashMap<String, String>,
    default_help: bool,
    handlers: Vec<(HandlerSpec, PrimaryFn<T>)>,
    commons: Vec<(CommonSpec, CommonFn)>,
}

impl<T> MatcherBuilder<T> {
    fn new() -> Self {
        MatcherBuilder {
            option_prefix: "--".to_string(),
            assigner: "=".to_string(),
            aliases: Vec::new(),
            renames: Vec::new(),
            options_help: HashMap::new(),
            var_names: HashMap::new(),
            default_help: true,
            handlers: Vec::new(),
            commons: Vec::new(),
        }
    }

    /// Option prefix; `--` selects getopt mode with `-x` shorts.
    pub fn option_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.option_prefix = prefix.into();
        self
    }

    /// Separator between option names and inline values.
    pub fn assigner(mut self, assigner: impl Into<String>) -> Self {
        self.assigner = assigner.into();
        self
    }

    /// Engine-wide alias pair, applied to every handler knowing either name.
    pub fn alias(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        self.aliases.push((first.into(), second.into()));
        self
    }

    /// Engine-wide public rename of an option or positional parameter.
    pub fn rename(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.renames.push((old.into(), new.into()));
        self
    }

    /// Help text for an option, shown by the usage formatter.
    pub fn option_help(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.options_help.insert(name.into(), text.into());
        self
    }

    /// Display variable name for an option's value (`-m MODE`).
    pub fn var_name(mut self, name: impl Into<String>, var: impl Into<String>) -> Self {
        self.var_names.insert(name.into(), var.into());
        self
    }

    /// Whether the implicit exclusive `--help` handler is registered.
    /// Enabled by default.
    pub fn default_help(mut self, enabled: bool) -> Self {
        self.default_help = enabled;
        self
    }

    /// Registers a primary handler with its callback.
    pub fn handler<F>(mut self, spec: HandlerSpec, callback: F) -> Self
    where
        F: FnMut(&Bindings) -> Result<T, anyhow::Error> + 'static,
    {
        self.handlers.push((spec, Rc::new(RefCell::new(callback))));
        self
    }

    /// Registers a common handler applied across the primaries it accepts.
    pub fn common<F>(mut self, spec: CommonSpec, callback: F) -> Self
    where
        F: FnMut(&Bindings) -> Result<(), anyhow::Error> + 'static,
    {
        self.commons.push((spec, Rc::new(RefCell::new(callback))));
        self
    }

    /// Validates every declaration and builds the immutable matcher.
    pub fn build(self) -> Result<Matcher<T>, DefinitionError> {
        let MatcherBuilder {
            option_prefix,
            assigner,
            mut aliases,
            renames,
            options_help,
            var_names,
            default_help,
            handlers,
            commons: common_specs,
        } = self;
        if handlers.is_empty() {
            return Err(DefinitionError::NoHandlers);
        }
        let mut mode = UsageMode::new(option_prefix, assigner);
        mode.options_help = options_help;
        mode.var_names = var_names;

        if default_help {
            mode.options_help
                .insert("help".to_string(), "shows this help message".to_string());
            if mode.getopt() {
                aliases.push(("h".to_string(), "help".to_string()));
            }
        }

        // Per-param help and var names fill whatever the engine-wide
        // tables left open.
        let param_lists = handlers
            .iter()
            .map(|(spec, _)| &spec.params)
            .chain(common_specs.iter().map(|(spec, _)| &spec.params));
        for params in param_lists {
            for param in params {
                if let Some(text) = &param.help {
                    mode.options_help
                        .entry(param.name.clone())
                        .or_insert_with(|| text.clone());
                }
                if let Some(var) = &param.var_name {
                    mode.var_names
                        .entry(param.name.clone())
                        .or_insert_with(|| var.clone());
                }
            }
        }

        let finish = |mut def: HandlerDefinition| -> Result<HandlerDefinition, DefinitionError> {
            for (old, new) in &renames {
                def.apply_rename(old, new)?;
            }
            for (first, second) in &aliases {
                def.apply_alias(first, second)?;
            }
            Ok(def)
        };

        let mut primaries = Vec::new();
        for (spec, callback) in handlers {
            let def = HandlerDefinition::build(
                &spec.name,
                spec.doc.clone(),
                spec.priority,
                spec.exclusive,
                None,
                &spec.params,
                &mode,
            )?;
            primaries.push(Primary {
                def: finish(def)?,
                callback: Some(callback),
            });
        }
        primaries.sort_by_key(|p| std::cmp::Reverse(p.def.priority));

        if default_help {
            let spec = HandlerSpec::new("help")
                .exclusive()
                .doc("shows the help message")
                .param(Param::required_flag("help"));
            let def = HandlerDefinition::build(
                &spec.name,
                spec.doc.clone(),
                spec.priority,
                spec.exclusive,
                None,
                &spec.params,
                &mode,
            )?;
            primaries.push(Primary {
                def: finish(def)?,
                callback: None,
            });
        }

        let mut commons = Vec::new();
        for (spec, callback) in common_specs {
            let def = HandlerDefinition::build(
                &spec.name,
                None,
                spec.priority,
                false,
                spec.applies.as_deref(),
                &spec.params,
                &mode,
            )?;
            commons.push(Common {
                def: finish(def)?,
                callback,
            });
        }
        commons.sort_by_key(|c| std::cmp::Reverse(c.def.priority));

        Ok(Matcher {
            mode,
            primaries,
            commons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_without_handlers_fails() {
        let result = Matcher::<()>::builder().build();
        assert!(matches!(result, Err(DefinitionError::NoHandlers)));
    }

    #[test]
    fn test_priority_orders_candidates_stably() {
        let matcher = Matcher::builder()
            .default_help(false)
            .handler(
                HandlerSpec::new("low").param(Param::positional("a")),
                |_| Ok("low"),
            )
            .handler(
                HandlerSpec::new("high")
                    .priority(5)
                    .param(Param::positional("a")),
                |_| Ok("high"),
            )
            .build()
            .unwrap();
        // Both accept one positional; the higher priority wins.
        match matcher.process(["x"], ArgOrder::Free).unwrap() {
            Outcome::Done(v) => assert_eq!(v, "high"),
            Outcome::Help(_) => panic!("unexpected help"),
        }
    }

    #[test]
    fn test_help_handler_is_exclusive_and_last() {
        let matcher = Matcher::builder()
            .handler(
                HandlerSpec::new("only").param(Param::positional("a")),
                |_| Ok(()),
            )
            .build()
            .unwrap();
        let outcome = matcher.process(["--help"], ArgOrder::Free).unwrap();
        assert!(matches!(outcome, Outcome::Help(_)));
        // The short alias works in getopt mode.
        let outcome = matcher.process(["-h"], ArgOrder::Free).unwrap();
        assert!(matches!(outcome, Outcome::Help(_)));
    }

    #[test]
    fn test_handler_error_propagates() {
        let matcher = Matcher::<()>::builder()
            .default_help(false)
            .handler(HandlerSpec::new("fail"), |_| {
                Err(anyhow::anyhow!("backend exploded"))
            })
            .build()
            .unwrap();
        let err = matcher.process::<_, String>([], ArgOrder::Free).unwrap_err();
        assert!(matches!(err, ProcessError::Handler(_)));
        assert!(err.to_string().contains("backend exploded"));
    }

    #[test]
    fn test_process_or_returns_the_sentinel_on_failure() {
        let matcher = Matcher::builder()
            .default_help(false)
            .handler(
                HandlerSpec::new("one").param(Param::option("mode")),
                |_| Ok(0),
            )
            .build()
            .unwrap();
        assert_eq!(matcher.process_or(["--nope=1"], ArgOrder::Free, 2), 2);
        assert_eq!(
            matcher.process_or(["--mode=x"], ArgOrder::Free, 2),
            0
        );
    }
}
