//! Grove server binary.
//!
//! Modes:
//! - `--socket` / `-s`: socket listener only
//! - `--console` / `-c`: interactive console only
//! - `--both` / `-b`: both (the default with no flags)
//!
//! Startup order: config, snapshot load, full AOF replay, persistence
//! observers, background snapshot timer, then the chosen front-ends.
//! Shutdown drains the AOF queue and writes a final snapshot.

mod console;
mod observer;
mod server;

use clap::{Arg, ArgAction, Command as ClapCommand};
use grove_core::Config;
use grove_durability::{load_snapshot, replay, write_snapshot, AofWriter};
use grove_engine::GlobalStore;
use grove_executor::{EmbeddingObserver, Executor, Session};
use grove_intelligence::{EmbeddingClient, EmbeddingStore};
use observer::AofObserver;
use server::SocketServer;
use std::io::BufRead;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const CONFIG_FILE: &str = "grove.conf";

fn main() -> ExitCode {
    let cli = ClapCommand::new("grove")
        .about("MUMPS-like hierarchical in-memory database server")
        .arg(
            Arg::new("socket")
                .short('s')
                .long("socket")
                .action(ArgAction::SetTrue)
                .help("Start the socket listener only"),
        )
        .arg(
            Arg::new("console")
                .short('c')
                .long("console")
                .action(ArgAction::SetTrue)
                .help("Start the interactive console only"),
        )
        .arg(
            Arg::new("both")
                .short('b')
                .long("both")
                .action(ArgAction::SetTrue)
                .help("Start both front-ends (default)"),
        );

    let matches = match cli.try_get_matches() {
        Ok(m) => m,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_tracing();

    let mut socket_mode = matches.get_flag("socket");
    let mut console_mode = matches.get_flag("console");
    if matches.get_flag("both") || (!socket_mode && !console_mode) {
        socket_mode = true;
        console_mode = true;
    }

    match run(socket_mode, console_mode) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(target: "grove::main", error = %e, "startup failed");
            eprintln!("Failed to start server: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(socket_mode: bool, console_mode: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(Config::load(CONFIG_FILE));

    let store = Arc::new(GlobalStore::new(config.cache_max_size));
    let embeddings = Arc::new(EmbeddingStore::new(
        EmbeddingClient::new(
            config.auto_embedding_enabled,
            config.embedding_url(),
            config.embedding_model.clone(),
        ),
        config.similarity_threshold,
    ));
    let executor = Arc::new(Executor::new(
        store.clone(),
        embeddings.clone(),
        config.clone(),
    ));

    // 1. snapshot
    match load_snapshot(&config.snapshot_file) {
        Ok(Some(image)) => store.replace_all(image),
        Ok(None) => info!(target: "grove::main", "starting with empty database"),
        Err(e) => {
            warn!(target: "grove::main", error = %e, "snapshot unreadable, starting empty");
        }
    }

    // 2. AOF replay through the ordinary command pipeline; the AOF
    //    observer is not registered yet, so replay does not re-log
    let mut replay_session = Session::new(executor.clone());
    replay(&config.aof_file, |line| {
        !replay_session.execute_line(line).text.starts_with("ERROR:")
    })?;
    drop(replay_session);

    // 3. persistence and embedding observers
    let aof = Arc::new(AofWriter::start(&config.aof_file)?);
    store.add_observer(Arc::new(AofObserver::new(aof.clone())));
    store.add_observer(Arc::new(EmbeddingObserver::new(embeddings.clone())));

    // 4. backfill embeddings for data restored from disk
    if embeddings.is_enabled() {
        let store_ref = store.clone();
        let embeddings_ref = embeddings.clone();
        std::thread::Builder::new()
            .name("grove-embed-backfill".to_string())
            .spawn(move || {
                for (global, root) in store_ref.export() {
                    for (path, value) in root.all_paths() {
                        embeddings_ref.store(&global, &path, &value);
                    }
                }
                info!(target: "grove::embed", count = embeddings_ref.count(), "embedding backfill finished");
            })?;
    }

    // 5. periodic snapshots
    let running = Arc::new(AtomicBool::new(true));
    let snapshot_thread = {
        let store = store.clone();
        let config = config.clone();
        let running = running.clone();
        std::thread::Builder::new()
            .name("grove-snapshot".to_string())
            .spawn(move || snapshot_loop(store, config, running))?
    };

    // 6. front-ends
    let server = if socket_mode {
        let server = Arc::new(SocketServer::bind(
            &config.bind_addr(),
            executor.clone(),
            running.clone(),
        )?);
        let acceptor = server.clone();
        std::thread::Builder::new()
            .name("grove-acceptor".to_string())
            .spawn(move || acceptor.run())?;
        println!("Socket server started on {}", config.bind_addr());
        Some(server)
    } else {
        None
    };

    if console_mode {
        console::run_console(executor);
    } else {
        wait_for_shutdown_command();
    }

    // 7. shutdown
    info!(target: "grove::main", "shutting down");
    running.store(false, Ordering::SeqCst);
    if let Some(server) = &server {
        server.close_clients();
    }
    let _ = snapshot_thread.join();

    aof.stop();

    if let Err(e) = write_snapshot(&config.snapshot_file, &store.export()) {
        error!(target: "grove::main", error = %e, "final snapshot failed");
    } else {
        info!(target: "grove::main", "final snapshot saved");
    }
    info!(target: "grove::main", "server shutdown complete");
    Ok(())
}

/// Socket-only mode: block until the operator types q/quit/exit.
fn wait_for_shutdown_command() {
    println!();
    println!("Server running in socket mode. Press 'q' + Enter to shutdown.");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let word = line.trim().to_lowercase();
        if word == "q" || word == "quit" || word == "exit" {
            break;
        }
    }
}

fn snapshot_loop(store: Arc<GlobalStore>, config: Arc<Config>, running: Arc<AtomicBool>) {
    let interval = config.snapshot_interval();
    let mut next_save = Instant::now() + interval;
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
        if Instant::now() < next_save {
            continue;
        }
        next_save = Instant::now() + interval;
        if let Err(e) = write_snapshot(&config.snapshot_file, &store.export()) {
            error!(target: "grove::snapshot", error = %e, "periodic snapshot failed");
        }
    }
}
