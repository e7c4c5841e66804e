//! Executor and per-connection sessions.
//!
//! [`Executor`] bundles the shared handles (store, embeddings, config,
//! optional auth policy). [`Session`] owns everything per-connection:
//! the local-variable map and the optional open transaction. Dispatch
//! is one `match` over [`Command`]; every recoverable failure renders
//! as an `ERROR: <message>` line and the session keeps serving.

use crate::command::Command;
use crate::functions::{self, OrderContext};
use crate::output::{
    self, banner, format_path_parens, format_query_path, format_value, zwrite_line,
};
use crate::parser::{self, parse_global_ref, split_expression};
use grove_core::{
    is_local_variable_name, normalize_global_name, Config, Error, Path, Result, Subscript, Value,
};
use grove_engine::{GlobalStore, MutationKind, MutationObserver, Transaction};
use grove_intelligence::EmbeddingStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Pluggable command gate. When no policy is installed every command
/// is allowed.
pub trait AuthPolicy: Send + Sync {
    fn allow(&self, command: &Command) -> bool;
}

/// Shared execution context handed to every session.
pub struct Executor {
    store: Arc<GlobalStore>,
    embeddings: Arc<EmbeddingStore>,
    config: Arc<Config>,
    auth: Option<Arc<dyn AuthPolicy>>,
}

impl Executor {
    pub fn new(
        store: Arc<GlobalStore>,
        embeddings: Arc<EmbeddingStore>,
        config: Arc<Config>,
    ) -> Executor {
        Executor {
            store,
            embeddings,
            config,
            auth: None,
        }
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthPolicy>) -> Executor {
        self.auth = Some(auth);
        self
    }

    pub fn store(&self) -> &Arc<GlobalStore> {
        &self.store
    }

    pub fn embeddings(&self) -> &Arc<EmbeddingStore> {
        &self.embeddings
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Connect banner (welcome + help + blank line).
    pub fn banner(&self) -> String {
        banner()
    }
}

/// Keeps the value index, embeddings and the tree in step: registered
/// as a store observer so transaction commits flow through too.
pub struct EmbeddingObserver {
    embeddings: Arc<EmbeddingStore>,
}

impl EmbeddingObserver {
    pub fn new(embeddings: Arc<EmbeddingStore>) -> EmbeddingObserver {
        EmbeddingObserver { embeddings }
    }
}

impl MutationObserver for EmbeddingObserver {
    fn on_mutation(&self, kind: MutationKind, global: &str, path: &Path, value: Option<&Value>) {
        match kind {
            MutationKind::Set => {
                if let Some(value) = value {
                    self.embeddings.store(global, path, value);
                }
            }
            MutationKind::Kill => {
                if path.is_empty() {
                    self.embeddings.remove_global(global);
                } else {
                    self.embeddings.remove(global, path);
                }
            }
        }
    }
}

/// One response: the text to send, plus whether the session closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub close: bool,
}

impl Reply {
    fn text(text: impl Into<String>) -> Reply {
        Reply {
            text: text.into(),
            close: false,
        }
    }
}

/// Per-connection REPL state: locals and the optional open transaction.
pub struct Session {
    executor: Arc<Executor>,
    locals: HashMap<String, String>,
    txn: Option<Transaction>,
}

impl Session {
    pub fn new(executor: Arc<Executor>) -> Session {
        Session {
            executor,
            locals: HashMap::new(),
            txn: None,
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.txn.is_some()
    }

    /// Parse and execute one input line. Never fails: malformed input
    /// becomes an `ERROR:` reply and the session stays usable.
    pub fn execute_line(&mut self, line: &str) -> Reply {
        match parser::parse(line) {
            Ok(command) => self.execute(command),
            Err(e) => Reply::text(format!("ERROR: {}", e)),
        }
    }

    /// Execute a typed command.
    pub fn execute(&mut self, command: Command) -> Reply {
        if let Some(auth) = &self.executor.auth {
            if !auth.allow(&command) {
                return Reply::text(format!("ERROR: access denied: {}", command.verb()));
            }
        }
        match self.dispatch(command) {
            Ok(reply) => reply,
            Err(e) => Reply::text(format!("ERROR: {}", e)),
        }
    }

    fn dispatch(&mut self, command: Command) -> Result<Reply> {
        match command {
            Command::Set { target, path, expr } => self.handle_set(&target, &path, &expr),
            Command::Get { global, path } => self.handle_get(&global, &path),
            Command::Kill { global, path } => self.handle_kill(&global, &path),
            Command::Query {
                global,
                path,
                depth,
            } => self.handle_query(&global, &path, depth),
            Command::Write { expr } => self.handle_write(&expr),
            Command::ZWrite { arg } => self.handle_zwrite(arg.as_deref()),
            Command::FastSearch { value } => self.handle_fast_search(&value),
            Command::ExactSearch { query, global } => {
                self.handle_exact_search(&query, global.as_deref())
            }
            Command::SimilaritySearch {
                query,
                global,
                top_k,
            } => self.handle_similarity_search(&query, global.as_deref(), top_k),
            Command::TxnBegin => self.handle_txn_begin(),
            Command::TxnCommit => self.handle_txn_commit(),
            Command::TxnRollback => self.handle_txn_rollback(),
            Command::Stats => Ok(Reply::text(self.render_stats())),
            Command::Help => Ok(Reply::text(output::HELP_TEXT)),
            Command::Exit => Ok(Reply {
                text: "BYE".to_string(),
                close: true,
            }),
        }
    }

    // =========================================================================
    // Data commands
    // =========================================================================

    fn handle_set(&mut self, target: &str, path: &Path, expr: &str) -> Result<Reply> {
        if expr.trim().is_empty() {
            return Err(Error::Validation("Value cannot be empty".to_string()));
        }
        let processed = functions::process_functions(expr, &*self);

        if !target.starts_with('^') {
            if !is_local_variable_name(target) {
                return Err(Error::Validation(format!(
                    "Invalid variable name: {}",
                    target
                )));
            }
            if !path.is_empty() {
                return Err(Error::Validation(
                    "Local variables do not take subscripts".to_string(),
                ));
            }
            let text = Value::parse_literal(&processed).as_text();
            debug!(target: "grove::session", name = target, value = %text, "local variable set");
            self.locals.insert(target.to_string(), text);
            return Ok(Reply::text("OK"));
        }

        let value = Value::parse_literal(&processed);
        match &mut self.txn {
            Some(txn) => txn.set(target, path, value)?,
            None => self.executor.store.set(target, path, value)?,
        }
        Ok(Reply::text("OK"))
    }

    fn handle_get(&mut self, global: &str, path: &Path) -> Result<Reply> {
        let name = require_global(global, "GET")?;
        let value = match &self.txn {
            Some(txn) => txn.get(&name, path)?,
            None => self.executor.store.get(&name, path)?,
        };
        Ok(Reply::text(match value {
            Some(v) => format_value(&v),
            None => "NULL".to_string(),
        }))
    }

    fn handle_kill(&mut self, global: &str, path: &Path) -> Result<Reply> {
        let name = require_global(global, "KILL")?;
        match &mut self.txn {
            Some(txn) => txn.kill(&name, path)?,
            None => self.executor.store.kill(&name, path)?,
        }
        Ok(Reply::text("OK"))
    }

    fn handle_query(&mut self, global: &str, path: &Path, depth: Option<i64>) -> Result<Reply> {
        let config = self.executor.config();
        let depth = depth.unwrap_or(config.query_default_depth);
        if depth < -1 {
            return Err(Error::Validation(format!("Invalid query depth: {}", depth)));
        }
        if depth > config.query_max_depth {
            return Err(Error::DepthExceeded {
                requested: depth,
                max: config.query_max_depth,
            });
        }

        let results = self.executor.store.query(global, path, depth)?;
        if results.is_empty() {
            return Ok(Reply::text("NO RESULTS"));
        }

        let mut text = String::from("QUERY RESULTS:\n");
        for (i, (result_path, value)) in results.iter().enumerate() {
            text.push_str(&format!("{:3}. ", i + 1));
            if !result_path.is_empty() {
                text.push_str(&format!("Path: {}", format_query_path(result_path)));
                text.push_str(" - ");
            }
            text.push_str(&format!("Value: {}\n", format_value(value)));
        }
        text.push_str(&format!("\nTotal: {} result(s)", results.len()));
        Ok(Reply::text(text))
    }

    fn handle_write(&mut self, expr: &str) -> Result<Reply> {
        let mut out = String::new();
        for part in split_expression(expr) {
            if part.is_empty() {
                continue;
            }
            if is_string_literal(&part) {
                out.push_str(&literal_text(&part));
            } else if part.starts_with('^') {
                let (name, path) = parse_global_ref(&part)?;
                let value = self.read(&name, &path)?;
                out.push_str(&value.map(|v| v.as_text()).unwrap_or_default());
            } else if is_local_variable_name(&part) {
                match self.locals.get(&part) {
                    Some(text) => out.push_str(text),
                    None => {
                        // fall back to the same-named global, MUMPS-style
                        let value = self.read(&normalize_global_name(&part), &Path::root())?;
                        out.push_str(&value.map(|v| v.as_text()).unwrap_or_default());
                    }
                }
            } else {
                out.push_str(&part);
            }
        }
        Ok(Reply::text(out))
    }

    fn handle_zwrite(&mut self, arg: Option<&str>) -> Result<Reply> {
        match arg {
            None => Ok(Reply::text(self.render_global_list(None))),
            Some(arg) if arg.starts_with('^') => {
                let (name, path) = parse_global_ref(arg)?;
                let nodes = self.executor.store.collect_nodes(&name, &path)?;
                if nodes.is_empty() {
                    return Ok(Reply::text(format!("NO NODES IN GLOBAL: {}", name)));
                }
                let lines: Vec<String> = nodes
                    .iter()
                    .map(|(node_path, value)| zwrite_line(&name, node_path, value))
                    .collect();
                Ok(Reply::text(lines.join("\n")))
            }
            Some(filter) => Ok(Reply::text(self.render_global_list(Some(filter)))),
        }
    }

    fn render_global_list(&self, filter: Option<&str>) -> String {
        let all = self.global_names();
        if all.is_empty() {
            return "NO GLOBALS".to_string();
        }
        let (header, names) = match filter {
            None => ("GLOBALS LIST:".to_string(), all.clone()),
            Some(filter) => {
                let needle = filter.to_lowercase();
                let matched: Vec<String> = all
                    .iter()
                    .filter(|n| n.to_lowercase().contains(&needle))
                    .cloned()
                    .collect();
                if matched.is_empty() {
                    return format!("NO GLOBALS MATCHING PATTERN: '{}'", filter);
                }
                (format!("GLOBALS MATCHING '{}':", filter), matched)
            }
        };

        let mut text = header;
        text.push('\n');
        for (i, name) in names.iter().enumerate() {
            text.push_str(&format!("{:3}. {}\n", i + 1, name));
        }
        text.push_str(&format!("\nTotal: {} global(s)", names.len()));
        if filter.is_some() && names.len() != all.len() {
            text.push_str(&format!(" (filtered from {})", all.len()));
        }
        text
    }

    fn handle_fast_search(&mut self, value: &str) -> Result<Reply> {
        let needle = value.trim();
        if needle.is_empty() {
            return Err(Error::Validation(
                "Search value cannot be empty".to_string(),
            ));
        }
        let hits = self.executor.store.fast_search(needle);
        if hits.is_empty() {
            return Ok(Reply::text(format!("NO RESULTS FOUND FOR: '{}'", needle)));
        }
        let mut text = String::from("FAST SEARCH RESULTS:\n");
        for (i, hit) in hits.iter().enumerate() {
            text.push_str(&format!(
                "{:3}. {}{} = {}\n",
                i + 1,
                hit.global,
                format_path_parens(&hit.path),
                format_value(&hit.value)
            ));
        }
        text.push_str(&format!("\nTotal: {} result(s)", hits.len()));
        Ok(Reply::text(text))
    }

    fn handle_exact_search(&mut self, query: &str, global: Option<&str>) -> Result<Reply> {
        let hits = self.executor.store.exact_search(query, global);
        if hits.is_empty() {
            return Ok(Reply::text("NO EXACT MATCHES FOUND"));
        }
        let mut text = String::from("EXACT SEARCH RESULTS:\n");
        for hit in &hits {
            text.push_str(&format!(
                "{}{} = {}\n",
                hit.global,
                format_path_parens(&hit.path),
                format_value(&hit.value)
            ));
        }
        Ok(Reply::text(text.trim_end().to_string()))
    }

    fn handle_similarity_search(
        &mut self,
        query: &str,
        global: Option<&str>,
        top_k: Option<usize>,
    ) -> Result<Reply> {
        let config = self.executor.config();
        let top_k = top_k
            .unwrap_or(config.search_default_topk)
            .min(config.search_max_topk);
        let scope = global.map(normalize_global_name);
        let hits = self
            .executor
            .embeddings
            .similarity_search(query, top_k, scope.as_deref());
        if hits.is_empty() {
            return Ok(Reply::text("NO SIMILAR RESULTS FOUND"));
        }
        let mut text = String::from("SIMILARITY SEARCH RESULTS:\n");
        for hit in &hits {
            text.push_str(&format!(
                "Similarity: {:.4} - {}{} = {}\n",
                hit.similarity,
                hit.global,
                format_path_parens(&hit.path),
                format_value(&hit.value)
            ));
        }
        Ok(Reply::text(text.trim_end().to_string()))
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    fn handle_txn_begin(&mut self) -> Result<Reply> {
        if self.txn.is_some() {
            return Err(Error::TransactionAlreadyActive);
        }
        self.txn = Some(Transaction::begin(&self.executor.store));
        Ok(Reply::text("TRANSACTION STARTED"))
    }

    fn handle_txn_commit(&mut self) -> Result<Reply> {
        let txn = self.txn.take().ok_or(Error::TransactionNotActive)?;
        debug!(target: "grove::session", ops = txn.staged_ops(), "committing transaction");
        txn.commit(&self.executor.store);
        Ok(Reply::text("TRANSACTION COMMITTED"))
    }

    fn handle_txn_rollback(&mut self) -> Result<Reply> {
        self.txn.take().ok_or(Error::TransactionNotActive)?;
        Ok(Reply::text("TRANSACTION ROLLED BACK"))
    }

    // =========================================================================
    // Stats
    // =========================================================================

    fn render_stats(&self) -> String {
        let mut stats = self.executor.store.stats();
        stats.embedding_count = self.executor.embeddings.count();
        stats.auto_embedding_enabled = self.executor.embeddings.is_enabled();
        stats.to_string()
    }

    // =========================================================================
    // Shared read surface
    // =========================================================================

    fn read(&self, global: &str, path: &Path) -> Result<Option<Value>> {
        match &self.txn {
            Some(txn) => txn.get(global, path),
            None => self.executor.store.get(global, path),
        }
    }

    fn global_names(&self) -> Vec<String> {
        match &self.txn {
            Some(txn) => txn.global_names(),
            None => self.executor.store.global_names(),
        }
    }
}

impl OrderContext for Session {
    fn local(&self, name: &str) -> Option<String> {
        self.locals.get(name).cloned()
    }

    fn global_names(&self) -> Vec<String> {
        Session::global_names(self)
    }

    fn child_subscripts(&self, global: &str, path: &Path) -> Vec<Subscript> {
        let result = match &self.txn {
            Some(txn) => txn.child_subscripts(global, path),
            None => self.executor.store.child_subscripts(global, path),
        };
        result.unwrap_or_default()
    }
}

fn require_global(name: &str, verb: &str) -> Result<String> {
    if name.starts_with('^') {
        Ok(name.to_string())
    } else {
        Err(Error::Validation(format!(
            "{} operates on globals; '{}' is not a global name",
            verb, name
        )))
    }
}

fn is_string_literal(part: &str) -> bool {
    (part.starts_with('"') && part.ends_with('"') && part.len() >= 2)
        || (part.starts_with('\'') && part.ends_with('\'') && part.len() >= 2)
}

fn literal_text(part: &str) -> String {
    let quote = part.chars().next().unwrap_or('"');
    let inner = &part[1..part.len() - 1];
    inner.replace(&format!("{}{}", quote, quote), &quote.to_string())
}
