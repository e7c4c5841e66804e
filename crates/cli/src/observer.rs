//! AOF mutation observer.
//!
//! Bridges the store's mutation seam to the append-only log: every
//! successful SET/KILL becomes one line of command syntax, so the log
//! replays through the ordinary parser/executor pipeline on startup.

use grove_core::{Path, Value};
use grove_durability::AofWriter;
use grove_engine::{MutationKind, MutationObserver};
use grove_executor::output::{format_path_parens, zwrite_line};
use std::sync::Arc;

pub struct AofObserver {
    writer: Arc<AofWriter>,
}

impl AofObserver {
    pub fn new(writer: Arc<AofWriter>) -> AofObserver {
        AofObserver { writer }
    }

    /// The command-syntax record for one mutation.
    pub fn record(kind: MutationKind, global: &str, path: &Path, value: Option<&Value>) -> String {
        match kind {
            MutationKind::Set => {
                let value = value.cloned().unwrap_or(Value::Null);
                format!("SET {}", zwrite_line(global, path, &value))
            }
            MutationKind::Kill => format!("KILL {}{}", global, format_path_parens(path)),
        }
    }
}

impl MutationObserver for AofObserver {
    fn on_mutation(&self, kind: MutationKind, global: &str, path: &Path, value: Option<&Value>) {
        self.writer
            .append(&AofObserver::record(kind, global, path, value));
    }
}
