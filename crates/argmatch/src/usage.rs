//! Usage text rendering.
//!
//! Pure formatting over the built handler definitions: parsing never
//! consults anything in this module. With a single command alternative the
//! usage line is fully expanded, defaults included; with several, a
//! `[common options]` summary and the name-intersection of positional
//! parameters stand in, followed by every alternative's own expansion.
//! Output is a deterministic function of the definitions — two matchers
//! built from identical declarations render byte-identical text.

use crate::definition::HandlerDefinition;
use crate::mode::UsageMode;
use crate::schema::Value;

/// Layout configuration for [`Usage::render_with`].
#[derive(Debug, Clone)]
pub struct UsageOptions {
    /// Total line width before wrapping.
    pub width: usize,
    /// Column where option/alternative documentation starts.
    pub column: usize,
    /// Indent for option and alternative listings.
    pub indent: usize,
    /// Whether the leading `Usage:` line is rendered.
    pub include_usage: bool,
    /// Whether the per-alternative expansions are rendered.
    pub include_alternatives: bool,
}

impl Default for UsageOptions {
    fn default() -> Self {
        UsageOptions {
            width: 72,
            column: 24,
            indent: 2,
            include_usage: true,
            include_alternatives: true,
        }
    }
}

/// Usage formatter over a matcher's alternatives (each one a primary
/// followed by its applicable commons).
pub struct Usage<'m> {
    mode: &'m UsageMode,
    alternatives: Vec<Vec<&'m HandlerDefinition>>,
}

/// Read-only rendering descriptor for one argument.
#[derive(Debug, Clone)]
struct ArgInfo {
    kind: InfoKind,
    /// Longest alias, or the positional name.
    name: String,
    /// All public names, shortest first.
    aliases: Vec<String>,
    default_provided: bool,
    default_value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InfoKind {
    Plain,
    Flag,
    Option,
    Prefix,
    Var,
}

impl ArgInfo {
    fn var_args() -> Self {
        ArgInfo {
            kind: InfoKind::Var,
            name: "...".to_string(),
            aliases: Vec::new(),
            default_provided: true,
            default_value: None,
        }
    }

    fn takes_value(&self) -> bool {
        matches!(self.kind, InfoKind::Option | InfoKind::Prefix)
    }

    fn prefix_for<'a>(&self, mode: &'a UsageMode, name: &str) -> &'a str {
        match self.kind {
            InfoKind::Plain | InfoKind::Var => "",
            _ => mode.option_prefix_for(name),
        }
    }

    fn suffix_for(&self, mode: &UsageMode, name: &str) -> String {
        if !self.takes_value() {
            return String::new();
        }
        let var = mode.var_name_for(&self.aliases, &self.name);
        format!("{}{}", mode.delimiter_for(name), var)
    }

    /// Rendering for usage lines: `--mode=MODE`, bracketed when optional,
    /// with a non-trivial default shown after the name.
    fn display(&self, mode: &UsageMode) -> String {
        if self.kind == InfoKind::Var {
            return self.name.clone();
        }
        let core = format!(
            "{}{}{}",
            self.prefix_for(mode, &self.name),
            self.name,
            self.suffix_for(mode, &self.name)
        );
        if !self.default_provided {
            return core;
        }
        let default = match &self.default_value {
            Some(Value::Bool(_)) | None => String::new(),
            Some(value) => format!(" ({value})"),
        };
        format!("[{core}{default}]")
    }

    /// Produces, for example, `-m MODE, --mode MODE`.
    fn aliases_as_str(&self, mode: &UsageMode) -> String {
        self.aliases
            .iter()
            .map(|a| format!("{}{}{}", self.prefix_for(mode, a), a, self.suffix_for(mode, a)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn doc<'a>(&self, mode: &'a UsageMode) -> Option<&'a str> {
        mode.help_for(&self.aliases)
    }
}

impl<'m> Usage<'m> {
    pub(crate) fn new(mode: &'m UsageMode, alternatives: Vec<Vec<&'m HandlerDefinition>>) -> Self {
        Usage { mode, alternatives }
    }

    /// Renders with the default layout (width 72, docs at column 24).
    pub fn render(&self) -> String {
        self.render_with(&UsageOptions::default())
    }

    pub fn render_with(&self, opts: &UsageOptions) -> String {
        let mut layout = Layout::new(opts.width);
        let all_options = self.all_options();
        let alternatives = self.alternatives.len();

        if opts.include_usage {
            layout.add_text("Usage:", 0);
            if alternatives == 1 {
                let mut units: Vec<String> = self
                    .options_for(0)
                    .iter()
                    .map(|i| i.display(self.mode))
                    .collect();
                units.extend(self.parameters_for(0).iter().map(|i| i.display(self.mode)));
                layout.add_units(units, 0);
            } else {
                if !all_options.is_empty() {
                    layout.add_text("[common options]", 0);
                }
                layout.add_text(&self.all_parameters(), 0);
            }
            layout.newline();
        }

        if !all_options.is_empty() {
            layout.newline();
            layout.add_text("options:", 0);
            for info in &all_options {
                layout.newline();
                layout.add_text(&info.aliases_as_str(self.mode), opts.indent);
                if let Some(doc) = info.doc(self.mode) {
                    layout.add_text(doc, opts.column);
                }
            }
        }

        if opts.include_alternatives && alternatives > 1 {
            layout.newline();
            layout.newline();
            layout.add_text("alternatives:", 0);
            for index in 0..alternatives {
                let mut units: Vec<String> = self
                    .options_for(index)
                    .iter()
                    .map(|i| i.display(self.mode))
                    .collect();
                units.extend(
                    self.parameters_for(index)
                        .iter()
                        .map(|i| i.display(self.mode)),
                );
                layout.newline();
                layout.newline();
                layout.add_text("*", 0);
                layout.add_units(units, opts.indent);
                if let Some(doc) = &self.alternatives[index][0].doc {
                    layout.newline();
                    for line in doc.split('\n') {
                        if !line.trim().is_empty() {
                            layout.add_text(line, opts.column);
                        }
                    }
                }
            }
        }
        layout.render()
    }

    /// Options of one definition: flags, then value options, then prefixes,
    /// alphabetically within each group.
    fn options_of(&self, def: &HandlerDefinition) -> Vec<ArgInfo> {
        let mut out = Vec::new();
        for (map, kind) in [
            (&def.flags, InfoKind::Flag),
            (&def.options, InfoKind::Option),
            (&def.prefixes, InfoKind::Prefix),
        ] {
            let mut slots: Vec<usize> = map.values().copied().collect();
            slots.sort_unstable();
            slots.dedup();
            let mut group: Vec<ArgInfo> = slots
                .into_iter()
                .map(|slot| {
                    let aliases = HandlerDefinition::aliases_of(map, slot);
                    let name = aliases.last().cloned().unwrap_or_default();
                    let default_value = def.defaults.get(&slot).cloned();
                    ArgInfo {
                        kind,
                        name,
                        aliases,
                        default_provided: default_value.is_some(),
                        default_value,
                    }
                })
                .collect();
            group.sort_by(|a, b| a.name.cmp(&b.name));
            out.extend(group);
        }
        out
    }

    /// Positional parameters of one alternative, walking the primary first
    /// and stopping at the first variadic member. Once a mandatory
    /// parameter is seen scanning from the end, everything before it is
    /// rendered mandatory too.
    fn parameters_for(&self, index: usize) -> Vec<ArgInfo> {
        let mut out = Vec::new();
        'defs: for def in &self.alternatives[index] {
            for &slot in &def.positional_slots {
                let default_value = def.defaults.get(&slot).cloned();
                out.push(ArgInfo {
                    kind: InfoKind::Plain,
                    name: def.public_name(slot).to_string(),
                    aliases: vec![def.public_name(slot).to_string()],
                    default_provided: default_value.is_some(),
                    default_value,
                });
            }
            if def.variadic {
                out.push(ArgInfo::var_args());
                break 'defs;
            }
        }
        let mut mandatory_seen = false;
        for info in out.iter_mut().rev() {
            if mandatory_seen {
                info.default_provided = false;
            } else {
                mandatory_seen = !info.default_provided;
            }
        }
        out
    }

    /// Options of one alternative, commons included, mandatory first.
    fn options_for(&self, index: usize) -> Vec<ArgInfo> {
        let mut out = self.collect_options(index);
        out.sort_by(|a, b| {
            (a.default_provided, a.name.to_lowercase())
                .cmp(&(b.default_provided, b.name.to_lowercase()))
        });
        out
    }

    /// Every option across all alternatives, listed once: flags first,
    /// then value options, alphabetically.
    fn all_options(&self) -> Vec<ArgInfo> {
        let mut out: Vec<ArgInfo> = Vec::new();
        for index in 0..self.alternatives.len() {
            for info in self.collect_options(index) {
                if !out.iter().any(|seen| seen.name == info.name) {
                    out.push(info);
                }
            }
        }
        out.sort_by(|a, b| {
            (a.takes_value(), a.name.to_lowercase()).cmp(&(b.takes_value(), b.name.to_lowercase()))
        });
        out
    }

    fn collect_options(&self, index: usize) -> Vec<ArgInfo> {
        let mut out: Vec<ArgInfo> = Vec::new();
        for def in &self.alternatives[index] {
            for info in self.options_of(def) {
                if !out.iter().any(|seen| seen.name == info.name) {
                    out.push(info);
                }
            }
            if def.open_keywords_active() {
                break;
            }
        }
        out
    }

    /// The positional summary shown when several alternatives exist: the
    /// shared name per position, or `argN` where the alternatives disagree.
    fn all_parameters(&self) -> String {
        let mut per_alternative: Vec<Vec<ArgInfo>> = Vec::new();
        let mut var_args = false;
        for index in 0..self.alternatives.len() {
            let params = self.parameters_for(index);
            if params.iter().any(|p| p.kind == InfoKind::Var) {
                var_args = true;
            }
            per_alternative.push(
                params
                    .into_iter()
                    .filter(|p| p.kind != InfoKind::Var)
                    .collect(),
            );
        }
        let longest = per_alternative.iter().map(Vec::len).max().unwrap_or(0);
        let mut names = Vec::new();
        for position in 0..longest {
            let mut name: Option<String> = None;
            for params in &per_alternative {
                if let Some(info) = params.get(position) {
                    match &name {
                        None => name = Some(info.name.clone()),
                        Some(current) if *current != info.name => {
                            name = Some(format!("arg{}", position + 1));
                            break;
                        }
                        _ => {}
                    }
                }
            }
            names.push(name.unwrap_or_default());
        }
        if var_args {
            names.push("...".to_string());
        }
        names.join(" ")
    }
}

/// Width-aware line assembly: content placed at a column either continues
/// the current line (padded out) or starts a new one, and wraps back to its
/// column when the width is exceeded.
struct Layout {
    lines: Vec<String>,
    width: usize,
}

impl Layout {
    fn new(width: usize) -> Self {
        Layout {
            lines: vec![String::new()],
            width,
        }
    }

    fn newline(&mut self) {
        self.lines.push(String::new());
    }

    /// Adds text, splitting on spaces for wrapping.
    fn add_text(&mut self, text: &str, column: usize) {
        self.add_units(text.split(' ').map(str::to_string).collect(), column);
    }

    /// Adds pre-rendered units that must not be split internally.
    fn add_units(&mut self, units: Vec<String>, column: usize) {
        let mut current = self.lines.pop().unwrap_or_default();
        if column > 0 && !current.is_empty() && current.chars().count() + 1 > column {
            self.lines.push(current);
            current = String::new();
        }
        let mut started = column == 0 && !current.trim().is_empty();
        let len = current.chars().count();
        if len < column {
            current.push_str(&" ".repeat(column - len));
        }
        for unit in units {
            if started && current.chars().count() + unit.chars().count() >= self.width {
                self.lines.push(current);
                current = " ".repeat(column);
                started = false;
            }
            if !unit.is_empty() || started {
                if started {
                    current.push(' ');
                }
                current.push_str(&unit);
                started = true;
            }
        }
        self.lines.push(current.trim_end().to_string());
    }

    fn render(self) -> String {
        self.lines.join("\n")
    }
}
