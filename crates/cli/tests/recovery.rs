//! Crash-recovery scenarios: snapshot plus AOF tail reproduce the
//! pre-crash store.

use grove_core::{Config, Path, Subscript, Value};
use grove_durability::{load_snapshot, replay, write_snapshot, AofWriter};
use grove_engine::GlobalStore;
use grove_executor::{Executor, Session};
use grove_intelligence::{EmbeddingClient, EmbeddingStore};
use std::sync::Arc;

// the observer module is private to the binary; tests link it by path
#[path = "../src/observer.rs"]
mod observer;
use observer::AofObserver;

struct Fixture {
    store: Arc<GlobalStore>,
    executor: Arc<Executor>,
}

fn fixture() -> Fixture {
    let config = Arc::new(Config::default());
    let store = Arc::new(GlobalStore::new(config.cache_max_size));
    let embeddings = Arc::new(EmbeddingStore::new(EmbeddingClient::disabled(), 0.85));
    let executor = Arc::new(Executor::new(store.clone(), embeddings, config));
    Fixture { store, executor }
}

fn run(session: &mut Session, line: &str) -> String {
    session.execute_line(line).text
}

fn replay_into(fixture: &Fixture, aof_path: &std::path::Path) {
    let mut session = Session::new(fixture.executor.clone());
    replay(aof_path, |line| {
        !run(&mut session, line).starts_with("ERROR:")
    })
    .unwrap();
}

#[test]
fn snapshot_plus_aof_tail_recovers_final_state() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("database.snapshot");
    let aof_path = dir.path().join("commands.aof");

    // --- original process ---
    let writing = fixture();
    let aof = Arc::new(AofWriter::start(&aof_path).unwrap());
    writing
        .store
        .add_observer(Arc::new(AofObserver::new(aof.clone())));

    let mut session = Session::new(writing.executor.clone());
    assert_eq!(run(&mut session, "SET ^P(1,\"name\")=\"John\""), "OK");
    assert_eq!(run(&mut session, "SET ^P(1,\"age\")=35"), "OK");

    // snapshot taken mid-stream
    write_snapshot(&snapshot_path, &writing.store.export()).unwrap();

    assert_eq!(run(&mut session, "SET ^P(2,\"name\")=\"Jane\""), "OK");
    assert_eq!(run(&mut session, "KILL ^P(1,\"age\")"), "OK");
    assert_eq!(run(&mut session, "SET ^C=7"), "OK");

    let expected = writing.store.export();
    aof.stop(); // drain, then "crash"

    // --- restarted process ---
    let restored = fixture();
    if let Some(image) = load_snapshot(&snapshot_path).unwrap() {
        restored.store.replace_all(image);
    }
    replay_into(&restored, &aof_path);

    assert_eq!(restored.store.export(), expected);
}

#[test]
fn full_replay_without_snapshot_recovers_state() {
    let dir = tempfile::tempdir().unwrap();
    let aof_path = dir.path().join("commands.aof");

    let writing = fixture();
    let aof = Arc::new(AofWriter::start(&aof_path).unwrap());
    writing
        .store
        .add_observer(Arc::new(AofObserver::new(aof.clone())));

    let mut session = Session::new(writing.executor.clone());
    run(&mut session, "SET ^A=1");
    run(&mut session, "SET ^A=2"); // overwrite survives replay
    run(&mut session, "SET ^B(\"x\")=\"y\"");
    run(&mut session, "KILL ^A");

    let expected = writing.store.export();
    aof.stop();

    let restored = fixture();
    replay_into(&restored, &aof_path);
    assert_eq!(restored.store.export(), expected);

    assert_eq!(restored.store.get("^A", &Path::root()).unwrap(), None);
    assert_eq!(
        restored
            .store
            .get("^B", &Path::new(vec![Subscript::from("x")]))
            .unwrap(),
        Some(Value::from("y"))
    );
}

#[test]
fn replay_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let aof_path = dir.path().join("commands.aof");

    let writing = fixture();
    let aof = Arc::new(AofWriter::start(&aof_path).unwrap());
    writing
        .store
        .add_observer(Arc::new(AofObserver::new(aof.clone())));

    let mut session = Session::new(writing.executor.clone());
    run(&mut session, "SET ^G(1)=\"one\"");
    run(&mut session, "KILL ^MISSING");
    let expected = writing.store.export();
    aof.stop();

    // replay the same log twice onto one store
    let restored = fixture();
    replay_into(&restored, &aof_path);
    replay_into(&restored, &aof_path);
    assert_eq!(restored.store.export(), expected);
}

#[test]
fn transaction_commit_reaches_the_aof() {
    let dir = tempfile::tempdir().unwrap();
    let aof_path = dir.path().join("commands.aof");

    let writing = fixture();
    let aof = Arc::new(AofWriter::start(&aof_path).unwrap());
    writing
        .store
        .add_observer(Arc::new(AofObserver::new(aof.clone())));

    let mut session = Session::new(writing.executor.clone());
    run(&mut session, "TSTART");
    run(&mut session, "SET ^T(1)=\"staged\"");
    run(&mut session, "COMMIT");
    // a rolled-back transaction leaves no records
    run(&mut session, "TSTART");
    run(&mut session, "SET ^T(2)=\"discarded\"");
    run(&mut session, "ROLLBACK");

    let expected = writing.store.export();
    aof.stop();

    let text = std::fs::read_to_string(&aof_path).unwrap();
    assert!(text.contains("SET ^T(1)=\"staged\""));
    assert!(!text.contains("discarded"));

    let restored = fixture();
    replay_into(&restored, &aof_path);
    assert_eq!(restored.store.export(), expected);
}

#[test]
fn values_with_quotes_survive_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let aof_path = dir.path().join("commands.aof");

    let writing = fixture();
    let aof = Arc::new(AofWriter::start(&aof_path).unwrap());
    writing
        .store
        .add_observer(Arc::new(AofObserver::new(aof.clone())));

    let mut session = Session::new(writing.executor.clone());
    run(&mut session, "SET ^Q=\"say \"\"hi\"\"\"");
    let expected = writing.store.export();
    aof.stop();

    let restored = fixture();
    replay_into(&restored, &aof_path);
    assert_eq!(restored.store.export(), expected);
    assert_eq!(
        restored.store.get("^Q", &Path::root()).unwrap(),
        Some(Value::from("say \"hi\""))
    );
}
