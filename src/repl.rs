// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive REPL (Read-Eval-Print Loop) for lodge.
//!
//! Input runs in one persistent scope whose `require` resolves against the
//! working directory and shares the loader's cache.

use lodge_loader::{ModuleLoader, ModuleState};
use lodge_script::{Engine, Value};
use owo_colors::OwoColorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Config, Editor, Helper};
use std::borrow::Cow;
use std::fmt::Display;
use std::path::PathBuf;

/// REPL configuration constants
const HISTORY_FILE: &str = ".lodge_history";
const MAX_HISTORY_SIZE: usize = 1000;

const KEYWORDS: &[&str] = &[
    "const", "else", "function", "if", "let", "return", "throw", "typeof", "var", "while",
];

const LITERALS: &[&str] = &["true", "false", "null", "undefined", "NaN", "Infinity"];

const BINDINGS: &[&str] = &["console", "require", "module", "exports", "__filename", "__dirname"];

/// REPL commands that can be executed with a dot prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    Clear,
    Version,
    Load,
    Resolve,
    Cache,
    Reset,
}

impl ReplCommand {
    /// Parse a REPL command from input string
    pub fn parse(input: &str) -> Option<(Self, Option<&str>)> {
        let rest = input.trim().strip_prefix('.')?;

        let mut parts = rest.splitn(2, char::is_whitespace);
        let cmd = parts.next()?.to_lowercase();
        let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

        let command = match cmd.as_str() {
            "help" | "h" | "?" => ReplCommand::Help,
            "exit" | "quit" | "q" => ReplCommand::Exit,
            "clear" | "cls" => ReplCommand::Clear,
            "version" | "v" => ReplCommand::Version,
            "load" | "l" => ReplCommand::Load,
            "resolve" | "r" => ReplCommand::Resolve,
            "cache" => ReplCommand::Cache,
            "reset" => ReplCommand::Reset,
            _ => return None,
        };
        Some((command, arg))
    }

    /// Get all available commands for help/completion
    pub fn all_commands() -> &'static [(&'static str, &'static str)] {
        &[
            (".help", "Show this help message"),
            (".exit", "Exit the REPL"),
            (".clear", "Clear the screen"),
            (".version", "Show version information"),
            (".load <spec>", "Load a module and print its exports"),
            (".resolve <spec>", "Print the path a specifier resolves to"),
            (".cache", "List cached modules and their state"),
            (".reset", "Clear the module cache"),
        ]
    }
}

/// Helper struct for rustyline that provides completion, hints, and validation
#[derive(Default)]
struct LodgeHelper {
    /// Keywords, bindings and commands for completion
    words: Vec<String>,
}

impl LodgeHelper {
    fn new() -> Self {
        let members = ["console.log", "console.error", "console.warn", "console.info"];
        let commands = ReplCommand::all_commands()
            .iter()
            .filter_map(|(usage, _)| usage.split_whitespace().next());

        let words = KEYWORDS
            .iter()
            .chain(LITERALS)
            .chain(BINDINGS)
            .chain(members.iter())
            .copied()
            .chain(commands)
            .map(String::from)
            .collect();

        Self { words }
    }

    /// Start of the word being typed
    fn word_start(line: &str) -> usize {
        line.rfind(|c: char| !c.is_alphanumeric() && c != '_' && c != '.' && c != '$')
            .map(|i| i + 1)
            .unwrap_or(0)
    }
}

impl Completer for LodgeHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = Self::word_start(&line[..pos]);
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((pos, vec![]));
        }

        let matches: Vec<Pair> = self
            .words
            .iter()
            .filter(|w| w.starts_with(word))
            .map(|w| Pair {
                display: w.clone(),
                replacement: w[word.len()..].to_string(),
            })
            .collect();

        Ok((pos, matches))
    }
}

impl Hinter for LodgeHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if pos < line.len() {
            return None;
        }

        let word = &line[Self::word_start(line)..];
        if word.len() < 2 {
            return None;
        }

        self.words
            .iter()
            .find(|w| w.starts_with(word) && w.len() > word.len())
            .map(|w| (&w[word.len()..]).dimmed().to_string())
    }
}

impl Highlighter for LodgeHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let mut result = String::with_capacity(line.len() * 2);
        let mut current_word = String::new();

        for c in line.chars() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                current_word.push(c);
                continue;
            }
            if !current_word.is_empty() {
                result.push_str(&highlight_word(&current_word));
                current_word.clear();
            }
            let colored = match c {
                '(' | ')' | '[' | ']' | '{' | '}' => c.yellow().to_string(),
                '+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' | '!' | '&' | '|' => {
                    c.cyan().to_string()
                }
                '"' | '\'' => c.green().to_string(),
                '.' if line.starts_with('.') => c.magenta().to_string(),
                _ => c.to_string(),
            };
            result.push_str(&colored);
        }

        if !current_word.is_empty() {
            result.push_str(&highlight_word(&current_word));
        }

        Cow::Owned(result)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn highlight_word(word: &str) -> String {
    if KEYWORDS.contains(&word) {
        word.magenta().bold().to_string()
    } else if LITERALS.contains(&word) {
        word.blue().to_string()
    } else if BINDINGS.contains(&word) {
        word.cyan().to_string()
    } else if word.chars().all(|c| c.is_ascii_digit() || c == '.') {
        word.yellow().to_string()
    } else {
        word.to_string()
    }
}

impl Validator for LodgeHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();

        if !is_balanced(input) {
            return Ok(ValidationResult::Incomplete);
        }

        // A trailing operator means the expression continues on the next line
        let trimmed = input.trim();
        if !trimmed.starts_with('.') && trimmed.ends_with(['+', '-', '*', '/', '=', ',', '\\']) {
            return Ok(ValidationResult::Incomplete);
        }

        Ok(ValidationResult::Valid(None))
    }
}

/// Check if brackets, braces, and parentheses are balanced
fn is_balanced(input: &str) -> bool {
    let mut stack = Vec::new();
    let mut in_string = None;
    let mut escape_next = false;

    for c in input.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }

        if c == '\\' && in_string.is_some() {
            escape_next = true;
            continue;
        }

        match in_string {
            Some(quote) if c == quote => in_string = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => in_string = Some(c),
                '(' => stack.push(')'),
                '[' => stack.push(']'),
                '{' => stack.push('}'),
                ')' | ']' | '}' => {
                    if stack.pop() != Some(c) {
                        // Mismatched; let the parser report it
                        return true;
                    }
                }
                _ => {}
            },
        }
    }

    stack.is_empty() && in_string.is_none()
}

impl Helper for LodgeHelper {}

/// The interactive REPL
pub struct Repl {
    engine: Engine,
    loader: ModuleLoader,
    cwd: PathBuf,
    editor: Editor<LodgeHelper, DefaultHistory>,
    history_path: PathBuf,
}

impl Repl {
    /// Create a new REPL evaluating in `cwd`
    pub fn new(loader: ModuleLoader, cwd: PathBuf) -> rustyline::Result<Self> {
        let config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(MAX_HISTORY_SIZE)?
            .auto_add_history(true)
            .build();

        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(LodgeHelper::new()));

        let history_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lodge")
            .join(HISTORY_FILE);

        // History is best effort; a missing or unwritable file is not an error
        if let Some(parent) = history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = editor.load_history(&history_path);

        let mut engine = Engine::new();
        loader.anonymous_scope(&cwd, "[repl]").install(&mut engine);

        Ok(Self {
            engine,
            loader,
            cwd,
            editor,
            history_path,
        })
    }

    /// Run the REPL main loop
    pub fn run(&mut self) -> rustyline::Result<()> {
        self.print_banner();

        loop {
            let prompt = format!("{} ", "lodge>".bright_green().bold());

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();

                    if trimmed.is_empty() {
                        continue;
                    }

                    if let Some((cmd, arg)) = ReplCommand::parse(trimmed) {
                        match self.execute_command(cmd, arg) {
                            CommandResult::Continue => continue,
                            CommandResult::Exit => break,
                        }
                    }

                    self.eval_and_print(trimmed);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "^D".dimmed());
                    break;
                }
                Err(err) => {
                    eprintln!("{}: {:?}", "Error".red().bold(), err);
                    break;
                }
            }
        }

        let _ = self.editor.save_history(&self.history_path);
        Ok(())
    }

    fn print_banner(&self) {
        println!(
            "{} {} in {}",
            "lodge".bright_cyan().bold(),
            env!("CARGO_PKG_VERSION").yellow(),
            self.cwd.display().dimmed()
        );
        println!(
            "Type {} for help, {} to exit",
            ".help".green(),
            ".exit".green()
        );
        println!();
    }

    fn execute_command(&mut self, cmd: ReplCommand, arg: Option<&str>) -> CommandResult {
        match cmd {
            ReplCommand::Help => self.print_help(),
            ReplCommand::Exit => return CommandResult::Exit,
            ReplCommand::Clear => print!("\x1B[2J\x1B[H"),
            ReplCommand::Version => {
                println!("{} {}", "lodge".bright_cyan().bold(), env!("CARGO_PKG_VERSION").yellow());
            }
            ReplCommand::Load => match arg {
                Some(spec) => match self.loader.load(spec, &self.cwd) {
                    Ok(exports) => println!("{}", format_value(&exports)),
                    Err(e) => print_error(&e),
                },
                None => print_missing_argument(".load"),
            },
            ReplCommand::Resolve => match arg {
                Some(spec) => match self.loader.resolve(spec, &self.cwd) {
                    Ok(path) => println!("{}", path.display().green()),
                    Err(e) => print_error(&e),
                },
                None => print_missing_argument(".resolve"),
            },
            ReplCommand::Cache => self.print_cache(),
            ReplCommand::Reset => {
                let count = self.loader.cache().len();
                self.loader.clear_cache();
                println!("{}", format!("Cleared {} cached module(s)", count).dimmed());
            }
        }
        CommandResult::Continue
    }

    fn print_help(&self) {
        println!();
        println!("{}", "REPL Commands:".white().bold());
        println!();

        for (cmd, desc) in ReplCommand::all_commands() {
            println!("  {:18} {}", cmd.cyan(), desc.dimmed());
        }

        println!();
        println!("{}", "Keyboard Shortcuts:".white().bold());
        println!();
        println!("  {:18} {}", "Ctrl+C".yellow(), "Cancel current input".dimmed());
        println!("  {:18} {}", "Ctrl+D".yellow(), "Exit REPL".dimmed());
        println!("  {:18} {}", "Tab".yellow(), "Autocomplete".dimmed());
        println!();
    }

    fn print_cache(&self) {
        let records = self.loader.cache().records();
        if records.is_empty() {
            println!("{}", "(no cached modules)".dimmed());
            return;
        }

        for record in records {
            let state = match record.state() {
                ModuleState::Loaded => "loaded".green().to_string(),
                ModuleState::Executing => "executing".yellow().to_string(),
                ModuleState::Failed(reason) => format!("{} ({})", "failed".red(), reason),
            };
            println!("  {}  {}", record.filename().display(), state);
        }
    }

    fn eval_and_print(&mut self, input: &str) {
        match self.engine.eval(input) {
            Ok(value) => println!("{}", format_value(&value)),
            Err(e) => print_error(&e),
        }
    }
}

/// Result of executing a REPL command
enum CommandResult {
    Continue,
    Exit,
}

/// Format a value for display with syntax coloring
fn format_value(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".blue().dimmed().to_string(),
        Value::Null => "null".blue().to_string(),
        Value::Boolean(_) | Value::Number(_) => value.inspect().yellow().to_string(),
        Value::String(s) => format!("'{}'", s).green().to_string(),
        Value::Function(_) => value.inspect().magenta().to_string(),
        Value::Array(_) | Value::Object(_) => value.inspect(),
    }
}

/// Print a formatted error message, coloring the part before the first colon
fn print_error(error: &dyn Display) {
    let error_str = error.to_string();

    if let Some(colon_pos) = error_str.find(':') {
        let (error_type, message) = error_str.split_at(colon_pos);
        eprintln!("{}{}", error_type.red().bold(), message);
    } else {
        eprintln!("{}", error_str.red());
    }
}

fn print_missing_argument(command: &str) {
    eprintln!(
        "{}: {} {}",
        "Error".red().bold(),
        command.cyan(),
        "requires a module specifier".dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_command_parse() {
        assert!(matches!(
            ReplCommand::parse(".help"),
            Some((ReplCommand::Help, None))
        ));
        assert!(matches!(
            ReplCommand::parse(".exit"),
            Some((ReplCommand::Exit, None))
        ));
        assert!(matches!(
            ReplCommand::parse(".load ./lib/util"),
            Some((ReplCommand::Load, Some("./lib/util")))
        ));
        assert!(matches!(
            ReplCommand::parse("  .resolve   ./a  "),
            Some((ReplCommand::Resolve, Some("./a")))
        ));
        assert!(matches!(
            ReplCommand::parse(".reset"),
            Some((ReplCommand::Reset, None))
        ));
        assert!(ReplCommand::parse(".unknown").is_none());
        assert!(ReplCommand::parse("not a command").is_none());
    }

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced("(1 + 2)"));
        assert!(is_balanced("({ a: 1 });"));
        assert!(is_balanced("function f() { return 1; }"));
        assert!(!is_balanced("(1 + 2"));
        assert!(!is_balanced("{ a: 1"));
        assert!(is_balanced("'string with (unbalanced'"));
        assert!(!is_balanced("'open string"));
    }

    #[test]
    fn test_completion_words() {
        let helper = LodgeHelper::new();
        for word in ["typeof", "require", "console.log", ".resolve", ".cache"] {
            assert!(helper.words.iter().any(|w| w == word), "{}", word);
        }
    }

    #[test]
    fn test_word_start() {
        assert_eq!(LodgeHelper::word_start("let x = cons"), 8);
        assert_eq!(LodgeHelper::word_start("console.lo"), 0);
    }

    #[test]
    fn test_format_value_keeps_text() {
        assert!(format_value(&Value::from("hi")).contains("'hi'"));
        assert!(format_value(&Value::Number(3.0)).contains('3'));
    }
}
