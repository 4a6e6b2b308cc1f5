// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive REPL for the bastion engine
//!
//! Tab completes dot commands and builtin names inside `require('...')`.

use bastion_runtime::boa_engine::JsValue;
use bastion_runtime::{CapabilityFlags, Engine};
use owo_colors::OwoColorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Config, Editor, Helper};
use std::path::{Path, PathBuf};
use tracing::debug;

const HISTORY_FILE: &str = ".bastion_history";
const MAX_HISTORY_SIZE: usize = 1000;

/// Dot commands with their usage line
const COMMANDS: &[(&str, &str)] = &[
    (".builtins", "List builtin modules and their trust"),
    (".clear", "Clear the screen"),
    (".exit", "Exit the REPL"),
    (".help", "Show this help message"),
    (".load <file>", "Run a script file"),
    (".version", "Show version information"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplCommand {
    Builtins,
    Clear,
    Exit,
    Help,
    Load,
    Version,
}

impl ReplCommand {
    /// Split a dot command from its argument. Anything else is script input.
    fn parse(line: &str) -> Option<(Self, &str)> {
        let rest = line.trim().strip_prefix('.')?;
        let (name, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let command = match name {
            "builtins" => Self::Builtins,
            "clear" => Self::Clear,
            "exit" | "quit" => Self::Exit,
            "help" => Self::Help,
            "load" => Self::Load,
            "version" => Self::Version,
            _ => return None,
        };
        Some((command, arg.trim()))
    }
}

/// Completion, hints and continuation lines for the editor
#[derive(Helper)]
struct BastionHelper {
    builtins: Vec<String>,
}

impl BastionHelper {
    /// Start of the word under the cursor and the names that can finish it
    fn candidates(&self, line: &str, pos: usize) -> Option<(usize, Vec<&str>)> {
        let before = line.get(..pos)?;

        if let Some(word) = before.strip_prefix('.') {
            if word.contains(char::is_whitespace) {
                return None;
            }
            let names = COMMANDS
                .iter()
                .filter_map(|(usage, _)| usage.split(' ').next())
                .filter(|name| name.starts_with(before))
                .collect();
            return Some((0, names));
        }

        let partial = require_argument(before)?;
        let names = self
            .builtins
            .iter()
            .map(String::as_str)
            .filter(|name| name.starts_with(partial))
            .collect();
        Some((pos - partial.len(), names))
    }
}

/// Text typed so far inside an unclosed `require('` at the end of `before`
fn require_argument(before: &str) -> Option<&str> {
    let call = before.rfind("require(")?;
    let argument = &before[call + "require(".len()..];
    let quote = argument
        .chars()
        .next()
        .filter(|c| matches!(c, '\'' | '"' | '`'))?;
    let partial = &argument[quote.len_utf8()..];
    (!partial.contains(quote)).then_some(partial)
}

impl Completer for BastionHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let Some((start, names)) = self.candidates(line, pos) else {
            return Ok((pos, Vec::new()));
        };
        let pairs = names
            .into_iter()
            .map(|name| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for BastionHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let (start, names) = self.candidates(line, pos)?;
        let typed = pos - start;
        match names.as_slice() {
            [only] if only.len() > typed => Some((&only[typed..]).dimmed().to_string()),
            _ => None,
        }
    }
}

impl Highlighter for BastionHelper {}

impl Validator for BastionHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();
        if ReplCommand::parse(input).is_none() && is_incomplete(input) {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

/// Whether `input` leaves a bracket, template literal or block comment open.
///
/// Mismatched closers count as complete so the parser can report them.
fn is_incomplete(input: &str) -> bool {
    let mut closers = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '(' => closers.push(')'),
            '[' => closers.push(']'),
            '{' => closers.push('}'),
            ')' | ']' | '}' => {
                if closers.pop() != Some(c) {
                    return false;
                }
            }
            '\'' | '"' | '`' => {
                let mut closed = false;
                while let Some(s) = chars.next() {
                    if s == '\\' {
                        chars.next();
                    } else if s == c {
                        closed = true;
                        break;
                    } else if s == '\n' && c != '`' {
                        break;
                    }
                }
                if !closed && c == '`' {
                    return true;
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.next_if(|&s| s != '\n').is_some() {}
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = ' ';
                loop {
                    match chars.next() {
                        Some('/') if previous == '*' => break,
                        Some(s) => previous = s,
                        None => return true,
                    }
                }
            }
            _ => {}
        }
    }

    !closers.is_empty()
}

/// The interactive REPL around an [`Engine`]
pub struct Repl {
    engine: Engine,
    editor: Editor<BastionHelper, DefaultHistory>,
    history_path: Option<PathBuf>,
}

impl Repl {
    /// Create a REPL that evaluates with `engine`.
    ///
    /// Script output goes to the terminal. Script stdin stays empty, the
    /// editor owns the terminal input.
    pub fn new(mut engine: Engine) -> rustyline::Result<Self> {
        let config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(MAX_HISTORY_SIZE)?
            .auto_add_history(true)
            .build();

        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(BastionHelper {
            builtins: engine.builtin_names(),
        }));

        let history_path = dirs::data_local_dir().map(|dir| dir.join("bastion").join(HISTORY_FILE));
        if let Some(path) = &history_path {
            if let Err(e) = editor.load_history(path) {
                debug!(path = %path.display(), error = %e, "no history loaded");
            }
        }

        engine.connect_stdio(std::io::empty(), std::io::stdout(), std::io::stderr());

        Ok(Self {
            engine,
            editor,
            history_path,
        })
    }

    /// Read and evaluate lines until `.exit` or end of input
    pub fn run(&mut self) -> rustyline::Result<()> {
        println!(
            "{} {}  {} {}",
            "bastion".bright_cyan().bold(),
            bastion_runtime::VERSION.dimmed(),
            "local modules under".dimmed(),
            self.engine.anchor().display().cyan()
        );
        println!("{}", "Type .help for commands".dimmed());

        let prompt = format!("{} ", "bastion>".bright_green().bold());
        let outcome = loop {
            match self.editor.readline(&prompt) {
                Ok(line) if line.trim().is_empty() => {}
                Ok(line) => match ReplCommand::parse(&line) {
                    Some((ReplCommand::Exit, _)) => break Ok(()),
                    Some((command, arg)) => self.command(command, arg),
                    None => {
                        let result = self.engine.eval(&line);
                        print_result(result);
                    }
                },
                Err(ReadlineError::Interrupted) => {}
                Err(ReadlineError::Eof) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.save_history();
        outcome
    }

    fn command(&mut self, command: ReplCommand, arg: &str) {
        match command {
            ReplCommand::Builtins => {
                for name in self.engine.builtin_names() {
                    let Some(flags) = self.engine.builtin_flags(&name) else {
                        continue;
                    };
                    let restricted = self.engine.is_restricted(&name);
                    let label = trust_label(flags, restricted);
                    if restricted {
                        println!("  {:16} {}", name.cyan(), label.red());
                    } else {
                        println!("  {:16} {}", name.cyan(), label);
                    }
                }
            }
            ReplCommand::Clear => print!("\x1B[2J\x1B[H"),
            ReplCommand::Exit => {}
            ReplCommand::Help => {
                for (usage, description) in COMMANDS {
                    println!("  {:16} {}", usage.cyan(), description.dimmed());
                }
            }
            ReplCommand::Load if arg.is_empty() => {
                eprintln!("{}: .load needs a file path", "Error".red().bold());
            }
            ReplCommand::Load => print_result(self.engine.run_file(Path::new(arg))),
            ReplCommand::Version => println!("bastion {}", bastion_runtime::VERSION),
        }
    }

    fn save_history(&mut self) {
        let Some(path) = &self.history_path else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                debug!(path = %parent.display(), error = %e, "cannot create history directory");
                return;
            }
        }
        if let Err(e) = self.editor.save_history(path) {
            debug!(path = %path.display(), error = %e, "history not saved");
        }
    }
}

fn print_result(result: bastion_runtime::Result<JsValue>) {
    match result {
        Ok(value) => println!("{}", format_value(&value)),
        Err(e) => crate::report(&e),
    }
}

fn format_value(value: &JsValue) -> String {
    match value.as_string() {
        Some(s) => format!("'{}'", s.to_std_string_escaped()).green().to_string(),
        None if value.is_undefined() => "undefined".dimmed().to_string(),
        None => value.display().to_string(),
    }
}

/// How a builtin was registered and whether scripts can load it right now
fn trust_label(flags: CapabilityFlags, restricted: bool) -> String {
    let tier = if flags.dangerous {
        "dangerous"
    } else if flags.remote_safe {
        "remote-safe"
    } else {
        "trusted only"
    };
    if restricted {
        format!("{tier}, restricted")
    } else {
        tier.to_string()
    }
}
