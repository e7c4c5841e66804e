//! Line-oriented socket front-end.
//!
//! One thread per accepted connection. Each connection gets the banner,
//! then a read/execute/respond loop with the `> ` prompt written after
//! every response. `EXIT` answers `BYE` and closes; malformed input
//! answers `ERROR: ...` and keeps the session open.
//!
//! The acceptor polls a non-blocking listener so shutdown can stop it
//! without another connection; open client sockets are shut down to
//! unblock their readers.

use grove_executor::{Executor, Session};
use parking_lot::Mutex;
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct SocketServer {
    listener: TcpListener,
    executor: Arc<Executor>,
    running: Arc<AtomicBool>,
    clients: Arc<Mutex<Vec<TcpStream>>>,
}

impl SocketServer {
    pub fn bind(
        addr: &str,
        executor: Arc<Executor>,
        running: Arc<AtomicBool>,
    ) -> std::io::Result<SocketServer> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        info!(target: "grove::server", %addr, "socket server listening");
        Ok(SocketServer {
            listener,
            executor,
            running,
            clients: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Accept loop; returns when the running flag drops.
    pub fn run(&self) {
        while self.running.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    info!(target: "grove::server", %peer, "client connected");
                    if let Ok(tracked) = stream.try_clone() {
                        self.clients.lock().push(tracked);
                    }
                    let executor = self.executor.clone();
                    let running = self.running.clone();
                    let spawned = std::thread::Builder::new()
                        .name(format!("grove-session-{}", peer))
                        .spawn(move || handle_client(stream, executor, running));
                    if let Err(e) = spawned {
                        error!(target: "grove::server", error = %e, "failed to spawn session thread");
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    if self.running.load(Ordering::SeqCst) {
                        warn!(target: "grove::server", error = %e, "accept failed");
                    }
                }
            }
        }
        info!(target: "grove::server", "socket server stopped accepting");
    }

    /// Unblock every open session read; their threads then wind down.
    pub fn close_clients(&self) {
        for client in self.clients.lock().drain(..) {
            let _ = client.shutdown(Shutdown::Both);
        }
    }
}

fn handle_client(stream: TcpStream, executor: Arc<Executor>, running: Arc<AtomicBool>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    if let Err(e) = serve(stream, executor, running) {
        warn!(target: "grove::server", %peer, error = %e, "session ended with I/O error");
    }
    info!(target: "grove::server", %peer, "client disconnected");
}

fn serve(
    stream: TcpStream,
    executor: Arc<Executor>,
    running: Arc<AtomicBool>,
) -> std::io::Result<()> {
    let mut writer = stream.try_clone()?;
    let reader = BufReader::new(stream);
    let mut session = Session::new(executor.clone());

    writer.write_all(executor.banner().as_bytes())?;
    writer.flush()?;

    for line in reader.lines() {
        let line = line?;
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            writer.write_all(b"> ")?;
            writer.flush()?;
            continue;
        }

        let reply = session.execute_line(trimmed);
        writer.write_all(reply.text.as_bytes())?;
        writer.write_all(b"\n")?;
        if reply.close {
            writer.flush()?;
            break;
        }
        writer.write_all(b"> ")?;
        writer.flush()?;
    }
    Ok(())
}
