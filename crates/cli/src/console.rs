//! Interactive console.
//!
//! The same session pipeline as the socket front-end, driven by a
//! rustyline editor with history and verb completion. `EXIT` (or
//! Ctrl-D) leaves the loop; Ctrl-C just re-prompts.

use grove_executor::{Executor, Session};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};
use std::sync::Arc;
use tracing::warn;

const VERBS: &[&str] = &[
    "SET", "GET", "KILL", "QUERY", "ZW", "WRITE", "SIMSEARCH", "EXACTSEARCH", "FSEARCH",
    "TSTART", "TCOMMIT", "TROLLBACK", "COMMIT", "ROLLBACK", "STATS", "HELP", "EXIT",
];

/// Run the console REPL until EXIT/EOF. Returns when the operator is
/// done; the caller then shuts the server down.
pub fn run_console(executor: Arc<Executor>) {
    let mut session = Session::new(executor.clone());

    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();
    let mut editor: Editor<GroveHelper, _> = match Editor::with_config(config) {
        Ok(e) => e,
        Err(e) => {
            warn!(target: "grove::console", error = %e, "console editor unavailable");
            return;
        }
    };
    editor.set_helper(Some(GroveHelper));

    let history_path = history_file();
    if let Some(path) = &history_path {
        let _ = editor.load_history(path);
    }

    print!("{}", executor.banner());
    let _ = std::io::Write::flush(&mut std::io::stdout());

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(trimmed);

                let reply = session.execute_line(trimmed);
                println!("{}", reply.text);
                if reply.close {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("console error: {}", e);
                break;
            }
        }
    }

    if let Some(path) = &history_path {
        let _ = editor.save_history(path);
    }
}

fn history_file() -> Option<String> {
    std::env::var("HOME").ok().map(|h| format!("{}/.grove_history", h))
}

struct GroveHelper;

impl Helper for GroveHelper {}
impl Validator for GroveHelper {}
impl Highlighter for GroveHelper {}

impl Hinter for GroveHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Completer for GroveHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_pos = &line[..pos];
        // only the leading verb is completed
        if line_to_pos.contains(char::is_whitespace) {
            return Ok((pos, vec![]));
        }
        let prefix = line_to_pos.to_ascii_uppercase();
        let start = pos - line_to_pos.len();
        let candidates = VERBS
            .iter()
            .filter(|v| v.starts_with(&prefix))
            .map(|v| Pair {
                display: v.to_string(),
                replacement: v.to_string(),
            })
            .collect();
        Ok((start, candidates))
    }
}
