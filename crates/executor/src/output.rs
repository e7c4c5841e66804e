//! Protocol text rendering.
//!
//! The canonical round-trip form is the contract here: integer
//! subscripts and numeric values render bare, strings double-quoted
//! with `"` escaped as `""`. `NULL` is the missing-value literal.

use grove_core::{Path, Subscript, Value};

/// Banner headline sent on connect.
pub const WELCOME: &str = "Welcome to MUMPS-like Database Server";

/// Fixed verb enumeration served by `HELP` and the connect banner.
pub const HELP_TEXT: &str = "\
Available commands:
  SET/S ^global=value                    - Set global value
  SET/S ^global(subscript)=value         - Set subscript value
  GET/G ^global                          - Get global value
  GET/G ^global(subscript)               - Get subscript value
  KILL/K ^global                         - Delete global
  KILL/K ^global(subscript)              - Delete subscript
  QUERY ^global DEPTH n                  - Query with depth
  ZW [pattern|^global]                   - List globals or dump a subtree
  WRITE/W expression                     - Write data to output
  SIMSEARCH text [IN global] [TOP n]     - Semantic similarity search
  EXACTSEARCH text [IN global]           - Exact text search
  FSEARCH/FS value                       - Fast search by value using indexes
  TSTART/BEGIN TRANSACTION               - Start transaction
  TCOMMIT/COMMIT                         - Commit transaction
  TROLLBACK/ROLLBACK                     - Rollback transaction
  STATS/$S                               - Show statistics
  HELP                                   - Show this help message
  EXIT                                   - Exit the session";

/// Full connect banner: welcome line, help block, trailing blank line.
pub fn banner() -> String {
    format!("{}\n{}\n\n", WELCOME, HELP_TEXT)
}

/// Render a value for responses: `NULL`, bare numerics, quoted strings.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => format!("{}", f),
        Value::Str(s) => quote(s),
    }
}

/// Render one subscript in round-trip form.
pub fn format_subscript(sub: &Subscript) -> String {
    match sub {
        Subscript::Int(n) => n.to_string(),
        Subscript::Str(s) => quote(s),
    }
}

/// Render a path as `(s1,s2,...)`, empty string for the root.
pub fn format_path_parens(path: &Path) -> String {
    if path.is_empty() {
        return String::new();
    }
    let inner = path
        .elements()
        .iter()
        .map(format_subscript)
        .collect::<Vec<_>>()
        .join(",");
    format!("({})", inner)
}

/// One canonical `^G(subs)=value` line.
pub fn zwrite_line(global: &str, path: &Path, value: &Value) -> String {
    format!("{}{}={}", global, format_path_parens(path), format_value(value))
}

/// Render a QUERY result path as `[1, "a"]`.
pub fn format_query_path(path: &Path) -> String {
    let inner = path
        .elements()
        .iter()
        .map(format_subscript)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", inner)
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}
