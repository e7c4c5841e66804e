//! Intrinsic function evaluation (`$ORDER`).
//!
//! Value expressions in `SET` pass through here before being written.
//! Every `$ORDER(...)` occurrence is replaced by its result:
//!
//! - `$ORDER(^G)` — neighbor among the sorted global names
//! - `$ORDER(^G, subs...)` — neighbor among the ordered children at
//!   the addressed tree level
//! - optional trailing `-1` walks backwards
//!
//! Bare identifier subscript elements naming session locals are
//! substituted with the variable's current textual value (empty when
//! unset); quoted and numeric elements are used literally. An empty
//! last element asks for the first (or last) child; off-the-end yields
//! the empty string.

use crate::parser::{split_elements, RawElement};
use grove_core::{is_local_variable_name, normalize_global_name, Path, Subscript};
use tracing::debug;

/// Read surface `$ORDER` needs: the caller's locals plus an ordered
/// view of the store (routed through the active transaction when one
/// is open).
pub trait OrderContext {
    fn local(&self, name: &str) -> Option<String>;
    fn global_names(&self) -> Vec<String>;
    fn child_subscripts(&self, global: &str, path: &Path) -> Vec<Subscript>;
}

/// Replace every `$ORDER(...)` call in `expr` with its result.
pub fn process_functions(expr: &str, ctx: &dyn OrderContext) -> String {
    let mut result = expr.to_string();
    // re-scan after each substitution; results never contain `$ORDER`
    while let Some((start, end, args)) = find_order_call(&result) {
        let replacement = execute_order(&args, ctx);
        debug!(target: "grove::functions", call = &result[start..end], result = %replacement, "$ORDER evaluated");
        result.replace_range(start..end, &replacement);
    }
    result
}

/// Locate the next `$ORDER(` call and its argument list. Returns the
/// byte range of the whole call and the raw text between its parens.
fn find_order_call(expr: &str) -> Option<(usize, usize, String)> {
    let upper = expr.to_ascii_uppercase();
    let start = upper.find("$ORDER")?;
    let after_name = start + "$ORDER".len();
    let rest = &expr[after_name..];
    let open_offset = rest.find(|c: char| !c.is_whitespace())?;
    if rest[open_offset..].chars().next() != Some('(') {
        return None;
    }
    let args_start = after_name + open_offset + 1;

    let mut in_quotes = false;
    let mut quote_char = '"';
    for (i, c) in expr[args_start..].char_indices() {
        if in_quotes {
            if c == quote_char {
                in_quotes = false;
            }
        } else if c == '"' || c == '\'' {
            in_quotes = true;
            quote_char = c;
        } else if c == ')' {
            let args_end = args_start + i;
            return Some((start, args_end + 1, expr[args_start..args_end].to_string()));
        }
    }
    None
}

/// Evaluate one `$ORDER` argument list.
fn execute_order(args: &str, ctx: &dyn OrderContext) -> String {
    let elements = split_elements(args);
    if elements.is_empty() {
        return String::new();
    }

    let global = elements[0].text.trim().to_string();
    if global.is_empty() {
        return String::new();
    }

    // a trailing unquoted -1 is the direction; +1 is the default and is
    // never written, so a bare trailing 1 stays a subscript
    let mut rest: &[RawElement] = &elements[1..];
    let mut direction = 1i64;
    if let Some(last) = rest.last() {
        if !last.quoted && last.text == "-1" {
            direction = -1;
            rest = &rest[..rest.len() - 1];
        }
    }

    if rest.is_empty() {
        next_global(&global, direction, ctx)
    } else {
        next_subscript(&global, rest, direction, ctx)
    }
}

/// Neighbor of `current` among the sorted global names, without the
/// leading `^`.
fn next_global(current: &str, direction: i64, ctx: &dyn OrderContext) -> String {
    let names = ctx.global_names();
    if names.is_empty() {
        return String::new();
    }
    let normalized = normalize_global_name(current);
    let position = names.iter().position(|n| *n == normalized);
    let next_index = match position {
        None => return strip_caret(&names[0]),
        Some(i) => i as i64 + direction,
    };
    if next_index < 0 || next_index as usize >= names.len() {
        return String::new();
    }
    strip_caret(&names[next_index as usize])
}

/// Neighbor of the last path element among the ordered children of the
/// path prefix.
fn next_subscript(
    global: &str,
    elements: &[RawElement],
    direction: i64,
    ctx: &dyn OrderContext,
) -> String {
    // substitute locals, then split prefix / current
    let resolved: Vec<String> = elements.iter().map(|e| resolve_element(e, ctx)).collect();
    let (current, prefix_texts) = match resolved.split_last() {
        Some((last, prefix)) => (last.clone(), prefix),
        None => return String::new(),
    };

    let prefix: Path = prefix_texts
        .iter()
        .map(|t| Subscript::from_text(t))
        .collect();
    let children = ctx.child_subscripts(&normalize_global_name(global), &prefix);
    if children.is_empty() {
        return String::new();
    }
    let child_texts: Vec<String> = children.iter().map(Subscript::as_text).collect();

    if current.is_empty() {
        return if direction >= 0 {
            child_texts[0].clone()
        } else {
            child_texts[child_texts.len() - 1].clone()
        };
    }

    let position = child_texts.iter().position(|t| *t == current);
    match position {
        None => {
            if direction >= 0 {
                child_texts[0].clone()
            } else {
                child_texts[child_texts.len() - 1].clone()
            }
        }
        Some(i) => {
            let next = i as i64 + direction;
            if next < 0 || next as usize >= child_texts.len() {
                String::new()
            } else {
                child_texts[next as usize].clone()
            }
        }
    }
}

fn resolve_element(element: &RawElement, ctx: &dyn OrderContext) -> String {
    if !element.quoted && is_local_variable_name(&element.text) {
        return ctx.local(&element.text).unwrap_or_default();
    }
    element.text.clone()
}

fn strip_caret(name: &str) -> String {
    name.strip_prefix('^').unwrap_or(name).to_string()
}
