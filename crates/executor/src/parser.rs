//! Line parser.
//!
//! The command verb is case-insensitive; payload text is preserved.
//! Fixed verbs are matched by direct comparison, everything else by one
//! compiled pattern per verb, tried in a fixed order.
//!
//! Subscript lists (`(...)` payloads) split on commas outside quotes;
//! a doubled quote inside a quoted element is the escape for one quote
//! character. Quoted elements stay strings, unquoted numeric text is
//! canonicalized per the subscript rules.

use crate::command::Command;
use grove_core::{Error, Path, Result, Subscript};
use once_cell::sync::Lazy;
use regex::Regex;

static ZWRITE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^ZW(?:RITE)?(?:\s+(.+))?$").unwrap());
static WRITE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^W(?:RITE)?\s+(.+)$").unwrap());
static SET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^S(?:ET)?\s+([A-Za-z_^][^\s(=]*)(?:\(([^)]*)\))?\s*=\s*(.+)$").unwrap()
});
static GET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^G(?:ET)?\s+(\^?[^\s(]+)(?:\(([^)]*)\))?$").unwrap());
static KILL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^K(?:ILL)?\s+(\^?[^\s(]+)(?:\(([^)]*)\))?$").unwrap());
static QUERY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^QUERY\s+([^\s(]+)(?:\(([^)]*)\))?(?:\s+DEPTH\s+(-?\d+))?$").unwrap()
});
static SIMSEARCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^SIMSEARCH\s+(.+?)(?:\s+IN\s+(\^\S+))?(?:\s+TOP\s+(\d+))?$").unwrap()
});
static EXACTSEARCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^EXACTSEARCH\s+(.+?)(?:\s+IN\s+(\^\S+))?$").unwrap());
static FSEARCH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:FSEARCH|FS)\s+(.+)$").unwrap());

/// Parse one logical line into a command.
pub fn parse(input: &str) -> Result<Command> {
    let line = input.trim();
    if line.is_empty() {
        return Err(Error::Parse("Empty command".to_string()));
    }

    // fixed verbs first
    if eq_any(line, &["TSTART", "BEGIN TRANSACTION"]) {
        return Ok(Command::TxnBegin);
    }
    if eq_any(line, &["TCOMMIT", "COMMIT"]) {
        return Ok(Command::TxnCommit);
    }
    if eq_any(line, &["TROLLBACK", "ROLLBACK"]) {
        return Ok(Command::TxnRollback);
    }
    if eq_any(line, &["STATS", "$S"]) {
        return Ok(Command::Stats);
    }
    if line.eq_ignore_ascii_case("HELP") {
        return Ok(Command::Help);
    }
    if line.eq_ignore_ascii_case("EXIT") {
        return Ok(Command::Exit);
    }

    if let Some(caps) = ZWRITE.captures(line) {
        return Ok(Command::ZWrite {
            arg: caps.get(1).map(|m| m.as_str().trim().to_string()),
        });
    }
    if let Some(caps) = WRITE.captures(line) {
        return Ok(Command::Write {
            expr: caps[1].trim().to_string(),
        });
    }
    if let Some(caps) = SET.captures(line) {
        return Ok(Command::Set {
            target: caps[1].to_string(),
            path: parse_subscripts(caps.get(2).map_or("", |m| m.as_str())),
            expr: caps[3].trim().to_string(),
        });
    }
    if let Some(caps) = GET.captures(line) {
        return Ok(Command::Get {
            global: caps[1].to_string(),
            path: parse_subscripts(caps.get(2).map_or("", |m| m.as_str())),
        });
    }
    if let Some(caps) = KILL.captures(line) {
        return Ok(Command::Kill {
            global: caps[1].to_string(),
            path: parse_subscripts(caps.get(2).map_or("", |m| m.as_str())),
        });
    }
    if let Some(caps) = QUERY.captures(line) {
        let depth = match caps.get(3) {
            Some(m) => Some(
                m.as_str()
                    .parse::<i64>()
                    .map_err(|_| Error::Parse(format!("Invalid QUERY depth: {}", m.as_str())))?,
            ),
            None => None,
        };
        return Ok(Command::Query {
            global: caps[1].to_string(),
            path: parse_subscripts(caps.get(2).map_or("", |m| m.as_str())),
            depth,
        });
    }
    if let Some(caps) = SIMSEARCH.captures(line) {
        let top_k = match caps.get(3) {
            Some(m) => Some(
                m.as_str()
                    .parse::<usize>()
                    .map_err(|_| Error::Parse(format!("Invalid TOP value: {}", m.as_str())))?,
            ),
            None => None,
        };
        return Ok(Command::SimilaritySearch {
            query: caps[1].trim().to_string(),
            global: caps.get(2).map(|m| m.as_str().to_string()),
            top_k,
        });
    }
    if let Some(caps) = EXACTSEARCH.captures(line) {
        return Ok(Command::ExactSearch {
            query: caps[1].trim().to_string(),
            global: caps.get(2).map(|m| m.as_str().to_string()),
        });
    }
    if let Some(caps) = FSEARCH.captures(line) {
        return Ok(Command::FastSearch {
            value: caps[1].trim().to_string(),
        });
    }

    Err(Error::Parse(format!("Unknown command: {}", line)))
}

fn eq_any(line: &str, verbs: &[&str]) -> bool {
    verbs.iter().any(|v| line.eq_ignore_ascii_case(v))
}

// =========================================================================
// Element splitting
// =========================================================================

/// One comma-separated element, with its quoting remembered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawElement {
    /// Element text; for quoted elements the quotes are stripped and
    /// doubled quotes unescaped.
    pub text: String,
    pub quoted: bool,
}

/// Split `inner` on commas outside quotes. Both `"` and `'` quote; a
/// doubled quote character inside a quoted run is one literal quote.
pub fn split_elements(inner: &str) -> Vec<RawElement> {
    let mut elements = Vec::new();
    let mut current = String::new();
    let mut was_quoted = false;
    let mut in_quotes = false;
    let mut quote_char = '"';

    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == quote_char {
                if chars.peek() == Some(&quote_char) {
                    chars.next();
                    current.push(quote_char);
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == '"' || c == '\'' {
            in_quotes = true;
            quote_char = c;
            was_quoted = true;
        } else if c == ',' {
            elements.push(RawElement {
                text: if was_quoted {
                    current.clone()
                } else {
                    current.trim().to_string()
                },
                quoted: was_quoted,
            });
            current.clear();
            was_quoted = false;
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() || was_quoted {
        elements.push(RawElement {
            text: if was_quoted {
                current
            } else {
                current.trim().to_string()
            },
            quoted: was_quoted,
        });
    }
    elements
}

/// Parse a subscript list into typed, canonicalized subscripts.
pub fn parse_subscripts(inner: &str) -> Path {
    if inner.trim().is_empty() {
        return Path::root();
    }
    split_elements(inner)
        .into_iter()
        .map(|e| element_to_subscript(&e))
        .collect()
}

fn element_to_subscript(element: &RawElement) -> Subscript {
    if element.quoted {
        return Subscript::Str(element.text.clone());
    }
    let text = element.text.as_str();
    if text.contains('.') {
        if let Ok(f) = text.parse::<f64>() {
            return Subscript::from_float(f);
        }
    }
    Subscript::from_text(text)
}

/// Split a WRITE-style expression list on commas outside quotes,
/// keeping each part's raw text (quotes included).
pub fn split_expression(expr: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = '"';

    for c in expr.chars() {
        if c == '"' || c == '\'' {
            if !in_quotes {
                in_quotes = true;
                quote_char = c;
            } else if c == quote_char {
                in_quotes = false;
            }
            current.push(c);
        } else if c == ',' && !in_quotes {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Parse a `^global[(subscripts)]` reference into `(name, path)`.
pub fn parse_global_ref(text: &str) -> Result<(String, Path)> {
    let trimmed = text.trim();
    if !trimmed.starts_with('^') {
        return Err(Error::Parse(format!("not a global reference: {}", trimmed)));
    }
    match trimmed.find('(') {
        None => Ok((trimmed.to_string(), Path::root())),
        Some(open) => {
            if !trimmed.ends_with(')') {
                return Err(Error::Parse(format!(
                    "unbalanced subscript list: {}",
                    trimmed
                )));
            }
            let name = &trimmed[..open];
            let inner = &trimmed[open + 1..trimmed.len() - 1];
            if name.len() < 2 {
                return Err(Error::Parse(format!("missing global name: {}", trimmed)));
            }
            Ok((name.to_string(), parse_subscripts(inner)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Subscript {
        Subscript::Int(n)
    }

    #[test]
    fn transaction_verbs_and_aliases() {
        assert_eq!(parse("TSTART").unwrap(), Command::TxnBegin);
        assert_eq!(parse("begin transaction").unwrap(), Command::TxnBegin);
        assert_eq!(parse("COMMIT").unwrap(), Command::TxnCommit);
        assert_eq!(parse("tcommit").unwrap(), Command::TxnCommit);
        assert_eq!(parse("ROLLBACK").unwrap(), Command::TxnRollback);
        assert_eq!(parse("TROLLBACK").unwrap(), Command::TxnRollback);
    }

    #[test]
    fn stats_and_dollar_s() {
        assert_eq!(parse("STATS").unwrap(), Command::Stats);
        assert_eq!(parse("$s").unwrap(), Command::Stats);
    }

    #[test]
    fn set_global_with_path() {
        let cmd = parse("SET ^G(1,\"a\")=value").unwrap();
        assert_eq!(
            cmd,
            Command::Set {
                target: "^G".to_string(),
                path: Path::new(vec![int(1), Subscript::from("a")]),
                expr: "value".to_string(),
            }
        );
    }

    #[test]
    fn set_short_alias_and_local() {
        let cmd = parse("S node=\"\"").unwrap();
        assert_eq!(
            cmd,
            Command::Set {
                target: "node".to_string(),
                path: Path::root(),
                expr: "\"\"".to_string(),
            }
        );
    }

    #[test]
    fn set_value_may_contain_equals() {
        let cmd = parse("SET ^G=a=b").unwrap();
        assert_eq!(
            cmd,
            Command::Set {
                target: "^G".to_string(),
                path: Path::root(),
                expr: "a=b".to_string(),
            }
        );
    }

    #[test]
    fn get_and_kill_with_aliases() {
        assert_eq!(
            parse("GET ^A").unwrap(),
            Command::Get {
                global: "^A".to_string(),
                path: Path::root()
            }
        );
        assert_eq!(
            parse("g ^A(2)").unwrap(),
            Command::Get {
                global: "^A".to_string(),
                path: Path::new(vec![int(2)])
            }
        );
        assert_eq!(
            parse("K ^A(1)").unwrap(),
            Command::Kill {
                global: "^A".to_string(),
                path: Path::new(vec![int(1)])
            }
        );
    }

    #[test]
    fn query_with_and_without_depth() {
        assert_eq!(
            parse("QUERY ^G DEPTH 2").unwrap(),
            Command::Query {
                global: "^G".to_string(),
                path: Path::root(),
                depth: Some(2),
            }
        );
        assert_eq!(
            parse("QUERY ^G(1)").unwrap(),
            Command::Query {
                global: "^G".to_string(),
                path: Path::new(vec![int(1)]),
                depth: None,
            }
        );
        assert_eq!(
            parse("query ^G depth -1").unwrap(),
            Command::Query {
                global: "^G".to_string(),
                path: Path::root(),
                depth: Some(-1),
            }
        );
    }

    #[test]
    fn write_keeps_raw_expression() {
        assert_eq!(
            parse("WRITE \"x=\",^G(1)").unwrap(),
            Command::Write {
                expr: "\"x=\",^G(1)".to_string()
            }
        );
        assert_eq!(
            parse("W hello").unwrap(),
            Command::Write {
                expr: "hello".to_string()
            }
        );
    }

    #[test]
    fn zwrite_variants() {
        assert_eq!(parse("ZW").unwrap(), Command::ZWrite { arg: None });
        assert_eq!(
            parse("zwrite ^P").unwrap(),
            Command::ZWrite {
                arg: Some("^P".to_string())
            }
        );
        assert_eq!(
            parse("ZW pat").unwrap(),
            Command::ZWrite {
                arg: Some("pat".to_string())
            }
        );
    }

    #[test]
    fn searches() {
        assert_eq!(
            parse("FSEARCH apple").unwrap(),
            Command::FastSearch {
                value: "apple".to_string()
            }
        );
        assert_eq!(
            parse("fs apple pie").unwrap(),
            Command::FastSearch {
                value: "apple pie".to_string()
            }
        );
        assert_eq!(
            parse("EXACTSEARCH foo IN ^G").unwrap(),
            Command::ExactSearch {
                query: "foo".to_string(),
                global: Some("^G".to_string()),
            }
        );
        assert_eq!(
            parse("SIMSEARCH foo TOP 5").unwrap(),
            Command::SimilaritySearch {
                query: "foo".to_string(),
                global: None,
                top_k: Some(5),
            }
        );
        assert_eq!(
            parse("SIMSEARCH red fruit IN ^F TOP 3").unwrap(),
            Command::SimilaritySearch {
                query: "red fruit".to_string(),
                global: Some("^F".to_string()),
                top_k: Some(3),
            }
        );
    }

    #[test]
    fn empty_and_unknown_lines_fail() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
        assert!(parse("FROB ^G").is_err());
    }

    #[test]
    fn split_elements_respects_quotes() {
        let elems = split_elements("1,\"a,b\",'c',2");
        assert_eq!(
            elems,
            vec![
                RawElement {
                    text: "1".to_string(),
                    quoted: false
                },
                RawElement {
                    text: "a,b".to_string(),
                    quoted: true
                },
                RawElement {
                    text: "c".to_string(),
                    quoted: true
                },
                RawElement {
                    text: "2".to_string(),
                    quoted: false
                },
            ]
        );
    }

    #[test]
    fn split_elements_unescapes_doubled_quotes() {
        let elems = split_elements("\"say \"\"hi\"\"\"");
        assert_eq!(elems.len(), 1);
        assert_eq!(elems[0].text, "say \"hi\"");
        assert!(elems[0].quoted);
    }

    #[test]
    fn subscript_typing() {
        let path = parse_subscripts("1,\"10\",x,2.0,1.5");
        assert_eq!(
            path,
            Path::new(vec![
                int(1),
                Subscript::from("10"), // quoted stays a string
                Subscript::from("x"),
                int(2), // float that round-trips to an integer
                Subscript::from("1.5"),
            ])
        );
    }

    #[test]
    fn empty_quoted_subscript_survives() {
        let path = parse_subscripts("\"\"");
        assert_eq!(path, Path::new(vec![Subscript::from("")]));
    }

    #[test]
    fn global_ref_parsing() {
        assert_eq!(
            parse_global_ref("^G").unwrap(),
            ("^G".to_string(), Path::root())
        );
        assert_eq!(
            parse_global_ref("^G(1,\"a\")").unwrap(),
            (
                "^G".to_string(),
                Path::new(vec![int(1), Subscript::from("a")])
            )
        );
        assert!(parse_global_ref("G(1)").is_err());
        assert!(parse_global_ref("^G(1").is_err());
    }

    #[test]
    fn split_expression_keeps_quotes() {
        assert_eq!(
            split_expression("\"x=\",^G(1),var"),
            vec!["\"x=\"", "^G(1)", "var"]
        );
        assert_eq!(split_expression("\"a,b\",c"), vec!["\"a,b\"", "c"]);
    }
}
