//! Stdio transport: spawns a child process and speaks newline-delimited
//! JSON-RPC over its stdin/stdout.
//!
//! Writing and reading are split: a single background task owns stdout
//! exclusively and demultiplexes incoming lines to whichever in-flight
//! call is waiting on that response id, so concurrent `send_request`
//! callers never block on each other to read a reply that isn't theirs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::{oneshot, Mutex};

use super::protocol::{JsonRpcRequest, JsonRpcResponse};

/// Non-JSON lines tolerated on stdout (e.g. a misconfigured server
/// leaking log output) before the reader gives up on the process.
const STRAY_LINE_BUDGET: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("remote process has exited")]
    ProcessExited,
    #[error("timeout waiting for response")]
    Timeout,
}

type PendingReplies = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// Spawned child process, communicating over stdin/stdout.
///
/// stdout is owned entirely by the background reader task; callers never
/// touch it directly, so there is no read-side lock to contend over.
pub struct StdioTransport {
    stdin: Mutex<ChildStdin>,
    child: Mutex<Child>,
    pending: PendingReplies,
    next_id: AtomicU64,
    alive: Arc<AtomicBool>,
    reader: tokio::task::JoinHandle<()>,
}

impl StdioTransport {
    pub fn spawn(command: &str, args: &[String]) -> Result<Self, TransportError> {
        let mut cmd = tokio::process::Command::new(command);
        cmd.args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let mut child = cmd.spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "failed to capture child stdin",
            ))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "failed to capture child stdout",
            ))
        })?;

        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));
        let reader = tokio::spawn(read_loop(BufReader::new(stdout), pending.clone(), alive.clone()));

        Ok(Self {
            stdin: Mutex::new(stdin),
            child: Mutex::new(child),
            pending,
            next_id: AtomicU64::new(1),
            alive,
            reader,
        })
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn write_line(&self, json: &str) -> Result<(), TransportError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TransportError::ProcessExited);
        }
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(json.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Send a request and wait for the matching response. Registers a
    /// one-shot slot for this request's id *before* writing, so a reply
    /// that arrives while we're still flushing stdin is never missed.
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, TransportError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TransportError::ProcessExited);
        }

        let id = self.next_request_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let req = JsonRpcRequest::new(id, method, params);
        let json = serde_json::to_string(&req)?;
        if let Err(e) = self.write_line(&json).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(Duration::from_secs(30), rx).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(_)) => Err(TransportError::ProcessExited),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(TransportError::Timeout)
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub async fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.reader.abort();
        let mut child = self.child.lock().await;
        {
            let mut stdin = self.stdin.lock().await;
            let _ = stdin.shutdown().await;
        }
        let wait = tokio::time::timeout(Duration::from_secs(5), child.wait()).await;
        if wait.is_err() {
            let _ = child.kill().await;
        }
    }
}

/// Reads stdout to completion, routing each parsed response to whichever
/// pending call registered that id and dropping anything else (stray
/// output, notifications, or a response nobody's waiting for anymore
/// because it already timed out).
async fn read_loop(mut stdout: BufReader<ChildStdout>, pending: PendingReplies, alive: Arc<AtomicBool>) {
    let mut stray = 0usize;
    loop {
        let mut line = String::new();
        match stdout.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<JsonRpcResponse>(trimmed) {
            Ok(resp) => {
                if let Some(tx) = pending.lock().await.remove(&resp.id) {
                    let _ = tx.send(resp);
                }
            }
            Err(_) => {
                stray += 1;
                if stray >= STRAY_LINE_BUDGET {
                    break;
                }
            }
        }
    }
    alive.store(false, Ordering::SeqCst);
    pending.lock().await.clear();
}
