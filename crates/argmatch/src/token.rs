//! Command line tokenizer.
//!
//! [`CommandLine`] is a stateful cursor over the raw argument vector. One
//! argv element can carry several logical tokens (in getopt mode `-cov` may
//! mean `-c -o -v`), so callers report consumption back through
//! [`set_arg_handled`](CommandLine::set_arg_handled) and
//! [`set_short_arg_handled`](CommandLine::set_short_arg_handled) instead of
//! iterating element by element. `reset` rewinds the whole scan so the same
//! input can be replayed against the next candidate handler.

use crate::error::UsageError;
use crate::mode::UsageMode;

/// Cursor over `argv` (program name excluded) with the current token
/// decomposed into name/value parts.
#[derive(Debug)]
pub(crate) struct CommandLine<'a> {
    args: &'a [String],
    option: String,
    assigner: String,
    getopt: bool,
    gnu: bool,
    /// False once GNU ordering has seen the first positional.
    can_be_option: bool,
    /// Index of the next unread element; the current token is `next - 1`.
    next: usize,
    done: bool,
    /// The whole raw token, prefix included.
    pub(crate) arg: String,
    pub(crate) name: String,
    pub(crate) value: Option<String>,
    pub(crate) is_option: bool,
    pub(crate) is_short: bool,
    /// Whether the current token carried an explicit name/value separator.
    pub(crate) split: bool,
}

impl<'a> CommandLine<'a> {
    pub(crate) fn new(args: &'a [String], mode: &UsageMode, gnu: bool) -> Self {
        CommandLine {
            args,
            option: mode.option_prefix().to_string(),
            assigner: mode.assigner().to_string(),
            getopt: mode.getopt(),
            gnu,
            can_be_option: true,
            next: 0,
            done: args.is_empty(),
            arg: String::new(),
            name: String::new(),
            value: None,
            is_option: false,
            is_short: false,
            split: false,
        }
    }

    /// Rewinds to the first argument, restoring the full scan state
    /// (including the GNU positional latch) before the next attempt.
    pub(crate) fn reset(&mut self) -> Result<(), UsageError> {
        self.next = 0;
        self.can_be_option = true;
        self.done = self.args.is_empty();
        if !self.done {
            self.advance()?;
        }
        Ok(())
    }

    pub(crate) fn finished(&self) -> bool {
        self.done
    }

    pub(crate) fn is_getopt(&self) -> bool {
        self.getopt
    }

    /// Current scan position as `(argv index, consumed chars within the
    /// element)`, used to rank competing failures. Positions compare
    /// lexicographically; exhausted input sorts after every token.
    pub(crate) fn position(&self) -> (usize, usize) {
        if self.done {
            return (self.args.len(), 0);
        }
        let pending = self.value.as_ref().map_or(0, |v| v.chars().count());
        (self.next, self.arg.chars().count() - pending)
    }

    /// Splits `what` into name and value on the configured assigner.
    /// Both sides must be non-empty for the split to count.
    pub(crate) fn separate(&self, what: &str) -> (bool, String, Option<String>) {
        for (idx, _) in what.match_indices(&self.assigner) {
            if idx >= 1 && idx + self.assigner.len() < what.len() {
                let name = what[..idx].to_string();
                let value = what[idx + self.assigner.len()..].to_string();
                return (true, name, Some(value));
            }
        }
        (false, what.to_string(), None)
    }

    /// Reports the current argument as consumed. Returns `true` when there
    /// is nothing left or the next token is itself an option — which is how
    /// callers detect a dangling option with no value to take.
    pub(crate) fn set_arg_handled(&mut self) -> Result<bool, UsageError> {
        if self.next >= self.args.len() {
            self.done = true;
            return Ok(true);
        }
        self.advance()
    }

    /// Reports one short option character as consumed; the rest of the
    /// cluster (if any) becomes the next current token.
    pub(crate) fn set_short_arg_handled(&mut self) -> Result<(), UsageError> {
        match self.value.take() {
            Some(rest) => {
                let mut chars = rest.chars();
                self.name = chars.next().map(|c| c.to_string()).unwrap_or_default();
                let remainder: String = chars.collect();
                self.value = if remainder.is_empty() {
                    None
                } else {
                    Some(remainder)
                };
                Ok(())
            }
            None => self.set_arg_handled().map(|_| ()),
        }
    }

    /// Reads and decomposes the next argument. Returns whether it is an
    /// option. Hard usage errors (empty argument, option after positionals
    /// under GNU ordering) abort the whole resolution pass.
    fn advance(&mut self) -> Result<bool, UsageError> {
        self.arg = self.args[self.next].clone();
        self.next += 1;
        self.is_option = false;
        self.is_short = false;
        self.split = false;
        log::trace!("token {:?} (can_be_option={})", self.arg, self.can_be_option);

        let long = self.arg.starts_with(&self.option);
        let short = self.getopt && self.arg.starts_with('-');
        let body: String;
        if self.can_be_option {
            if long {
                body = self.arg[self.option.len()..].to_string();
                self.is_option = true;
            } else if short {
                body = self.arg[1..].to_string();
                self.is_option = true;
                self.is_short = true;
            } else {
                body = self.arg.clone();
                self.can_be_option = !self.gnu;
            }
        } else if long || short {
            return Err(UsageError::OptionAfterPositionals {
                arg: self.arg.clone(),
            });
        } else {
            body = self.arg.clone();
        }
        if body.is_empty() {
            return Err(UsageError::Malformed {
                arg: self.arg.clone(),
            });
        }

        if self.is_short {
            let mut chars = body.chars();
            self.name = chars.next().map(|c| c.to_string()).unwrap_or_default();
            let rest: String = chars.collect();
            self.value = if rest.is_empty() { None } else { Some(rest) };
        } else {
            let (split, name, value) = self.separate(&body);
            self.split = split;
            self.name = name;
            self.value = value;
        }
        Ok(self.is_option)
    }
}
