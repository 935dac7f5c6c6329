//! JSON-RPC transport over a language server's stdio pipes.
//!
//! The server multiplexes everything it has to say over one output pipe:
//! responses to our requests, its own requests to us, and a stream of
//! notifications, in whatever order its internal scheduling produces
//! them. A dedicated reader thread feeds the pipe through a
//! [`MessageFramer`] and dispatches each decoded message; responses are
//! matched to callers purely by request id through a session-owned
//! correlation table, so any number of requests may be in flight at once
//! and responses may arrive in any order.
//!
//! [`Connection`] is the transport proper and works over any reader and
//! writer pair, which keeps it testable without a child process.
//! [`Session`] owns the spawned server process and its pipes.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use serde_json::Value;
use tracing::{debug, trace, warn};

use super::Result;
use super::error::LspError;
use super::framing::MessageFramer;
use super::launcher::ServerLauncher;
use super::message::{Message, RequestId, ResponseError};

/// Lock a mutex, recovering the guard if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How a pending request was completed.
enum Completion {
    /// The server answered with a `result` payload.
    Result(Value),
    /// The server answered with an `error` envelope.
    Error(ResponseError),
}

/// The correlation table: one single-use completion handle per in-flight
/// request id.
///
/// Ids come from a strictly increasing session-scoped counter and are
/// never reused. An entry is removed the instant its response is
/// observed, so a duplicate response finds no entry and is dropped by the
/// dispatcher. Once drained the table is invalid and rejects new
/// registrations; a table lives exactly as long as its session.
struct PendingRequests {
    next_id: i64,
    table: HashMap<i64, mpsc::Sender<Completion>>,
    closed: bool,
}

impl PendingRequests {
    fn new() -> Self {
        Self {
            next_id: 0,
            table: HashMap::new(),
            closed: false,
        }
    }

    /// Allocate the next request id and register its completion handle.
    fn register(&mut self) -> Result<(i64, mpsc::Receiver<Completion>)> {
        if self.closed {
            return Err(LspError::ServerExited);
        }
        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = mpsc::channel();
        self.table.insert(id, tx);
        Ok((id, rx))
    }

    /// Complete and remove a pending request. Returns `false` when no
    /// request with this id is waiting.
    fn complete(&mut self, id: i64, completion: Completion) -> bool {
        match self.table.remove(&id) {
            Some(tx) => {
                // The caller may have given up already; that is its
                // business, not a dispatch failure.
                let _ = tx.send(completion);
                true
            }
            None => false,
        }
    }

    /// Remove a registration whose request never made it onto the wire.
    fn forget(&mut self, id: i64) {
        self.table.remove(&id);
    }

    /// Reject everything still pending and invalidate the table.
    ///
    /// Dropping a sender makes the matching `recv` fail, which callers
    /// surface as [`LspError::ServerExited`].
    fn drain(&mut self) -> usize {
        self.closed = true;
        let orphaned = self.table.len();
        self.table.clear();
        orphaned
    }
}

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;
type SharedPending = Arc<Mutex<PendingRequests>>;

/// A JSON-RPC connection over an arbitrary reader/writer pair.
pub struct Connection {
    writer: SharedWriter,
    pending: SharedPending,
}

impl Connection {
    /// Start a connection over the given streams.
    ///
    /// Spawns the reader thread that frames and dispatches every message
    /// the server emits. The thread exits when the stream does, rejecting
    /// any requests still pending at that point.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let writer: SharedWriter = Arc::new(Mutex::new(Box::new(writer)));
        let pending: SharedPending = Arc::new(Mutex::new(PendingRequests::new()));

        let reader_writer = Arc::clone(&writer);
        let reader_pending = Arc::clone(&pending);
        thread::spawn(move || read_loop(reader, &reader_writer, &reader_pending));

        Self { writer, pending }
    }

    /// Send a request and block until its response arrives.
    ///
    /// # Errors
    ///
    /// - [`LspError::Io`] if the request cannot be written; the pending
    ///   registration is rolled back.
    /// - [`LspError::ServerError`] if the server answers with an error
    ///   envelope.
    /// - [`LspError::ServerExited`] if the server's stream closes before
    ///   the response arrives, or the session has already shut down.
    pub fn request(&self, method: &str, params: Value) -> Result<Value> {
        let (id, rx) = lock(&self.pending).register()?;

        trace!(method, id, "sending request");
        let message = Message::request(id, method, params);
        if let Err(error) = write_message(&self.writer, &message) {
            lock(&self.pending).forget(id);
            return Err(error);
        }

        match rx.recv() {
            Ok(Completion::Result(result)) => Ok(result),
            Ok(Completion::Error(error)) => {
                Err(LspError::server_error(error.code, error.message))
            }
            Err(_) => Err(LspError::ServerExited),
        }
    }

    /// Send a notification. Never blocks on the server.
    ///
    /// # Errors
    ///
    /// Returns [`LspError::Io`] if the pipe is not writable.
    pub fn notify(&self, method: &str, params: Value) -> Result<()> {
        trace!(method, "sending notification");
        write_message(&self.writer, &Message::notification(method, params))
    }
}

/// Frame a message and write it out under the writer lock.
fn write_message(writer: &SharedWriter, message: &Message) -> Result<()> {
    let framed = message.to_wire().map_err(LspError::Serialize)?;
    trace!(bytes = framed.len(), "writing message");

    let mut writer = lock(writer);
    writer.write_all(&framed)?;
    writer.flush()?;
    Ok(())
}

/// Pump the server's output stream until it closes.
fn read_loop(mut reader: impl Read, writer: &SharedWriter, pending: &SharedPending) {
    let mut framer = MessageFramer::new();
    let mut buf = [0u8; 8192];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                framer.feed(&buf[..n]);
                while let Some(message) = framer.next_message() {
                    dispatch(message, writer, pending);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(error) => {
                warn!(%error, "failed to read from server, closing connection");
                break;
            }
        }
    }

    let orphaned = lock(pending).drain();
    if orphaned > 0 {
        warn!(orphaned, "server stream closed with requests still pending");
    }
    debug!("reader loop finished");
}

/// Route one decoded message to the right place.
fn dispatch(message: Message, writer: &SharedWriter, pending: &SharedPending) {
    match (message.id.clone(), message.method.as_deref()) {
        // Server->client request: acknowledge with a null result so
        // servers waiting on e.g. configuration round trips don't stall.
        (Some(id), Some(method)) => {
            trace!(method, %id, "acknowledging server request");
            let ack = Message::response(id, Value::Null);
            if let Err(error) = write_message(writer, &ack) {
                warn!(%error, "failed to acknowledge server request");
            }
        }

        // Response: complete the matching pending request, if any. A
        // duplicate or late response matches nothing and is dropped.
        (Some(id), None) => {
            let completion = match message.error {
                Some(error) => Completion::Error(error),
                None => Completion::Result(message.result.unwrap_or(Value::Null)),
            };
            match id.as_number() {
                Some(id) => {
                    if !lock(pending).complete(id, completion) {
                        warn!(id, "response for unknown request id, dropping");
                    }
                }
                None => warn!(%id, "response with non-numeric id, dropping"),
            }
        }

        (None, Some(method)) => handle_notification(method, &message),

        (None, None) => warn!("message with neither id nor method, dropping"),
    }
}

/// Server notifications carry no completion to resolve; a few known-noisy
/// methods are explicit no-ops, everything else is just logged.
fn handle_notification(method: &str, message: &Message) {
    match method {
        "window/logMessage" | "window/showMessage" | "telemetry/event" | "language/status"
        | "$/progress" => {
            trace!(method, params = ?message.params, "server notification");
        }
        _ => trace!(method, "unhandled server notification"),
    }
}

/// A running language server process and the connection to it.
pub struct Session {
    child: Child,
    connection: Connection,
}

impl Session {
    /// Spawn a language server and connect to its stdio pipes.
    ///
    /// The server's stderr is inherited: it is a diagnostic sink, not
    /// part of the protocol.
    ///
    /// # Errors
    ///
    /// Returns an error if the executable is missing or the process fails
    /// to spawn. This is the only failure that is fatal to a whole run.
    ///
    /// # Panics
    ///
    /// Panics if stdin/stdout are unavailable after spawning, which
    /// cannot happen with `Stdio::piped()`.
    #[must_use = "session holds a running server process that should be shut down"]
    pub fn start(launcher: &dyn ServerLauncher, workspace_root: &Path) -> Result<Self> {
        let command = launcher.command();
        let args = launcher.args(workspace_root)?;

        debug!(
            command,
            args = ?args,
            workspace = %workspace_root.display(),
            "starting language server"
        );

        let mut child = Command::new(command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    LspError::not_found(command, launcher.install_hint())
                } else {
                    LspError::spawn_failed(command, e)
                }
            })?;

        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");
        let connection = Connection::new(stdout, stdin);

        Ok(Self { child, connection })
    }

    /// The JSON-RPC connection to the server.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Send a request and block until its response arrives.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub fn request(&self, method: &str, params: Value) -> Result<Value> {
        self.connection.request(method, params)
    }

    /// Send a notification.
    ///
    /// # Errors
    ///
    /// See [`Connection::notify`].
    pub fn notify(&self, method: &str, params: Value) -> Result<()> {
        self.connection.notify(method, params)
    }

    /// Gracefully shut the server down: `shutdown` request, `exit`
    /// notification, then wait for the process.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown round trip fails.
    pub fn shutdown(&mut self) -> Result<()> {
        debug!("shutting down language server");

        let _ = self.request("shutdown", Value::Null)?;
        self.notify("exit", Value::Null)?;

        match self.child.wait() {
            Ok(status) => {
                if !status.success() {
                    warn!(exit_code = ?status.code(), "language server exited with non-zero status");
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to wait for language server exit");
            }
        }

        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Best-effort cleanup; the pipes may already be gone.
        if let Err(e) = self.notify("exit", Value::Null) {
            trace!(error = %e, "exit notification failed during cleanup");
        }

        if let Err(e) = self.child.kill() {
            if e.kind() != std::io::ErrorKind::InvalidInput {
                warn!(error = %e, "failed to kill language server during cleanup");
            }
        }

        // Reap the process to prevent zombies.
        let _ = self.child.wait();
    }
}
