//! Bridge to a WhatsApp Web driver running as a child process.
//!
//! The bridge speaks newline-delimited JSON over the child's stdio:
//!
//! - Commands (`init`, `send`) go to stdin, each carrying a ulid `id`.
//! - The child answers with `ack` frames correlated by `id`, and pushes
//!   unsolicited lifecycle frames (`qr`, `ready`, `disconnected`, ...) that
//!   become [`DriverEvent`]s.
//!
//! A send with no ack blocks its caller until the ack arrives or the child
//! exits; the gateway applies no timeout of its own.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{info, warn};
use ulid::Ulid;

use super::{DriverError, DriverEvent, Receipt, SessionDriver};

/// Environment variable carrying the auth storage path to the child.
pub const AUTH_DIR_ENV: &str = "WAGATE_AUTH_DIR";

type AckResult = Result<Option<Receipt>, String>;
type PendingAcks = Arc<DashMap<String, oneshot::Sender<AckResult>>>;

// ============================================================================
// Wire frames
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CommandFrame<'a> {
    Init {
        id: &'a str,
    },
    Send {
        id: &'a str,
        to: &'a str,
        body: &'a str,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BridgeFrame {
    Ack {
        id: String,
        ok: bool,
        #[serde(default)]
        receipt: Option<Receipt>,
        #[serde(default)]
        error: Option<String>,
    },
    Qr {
        code: String,
    },
    Ready,
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    AuthFailure {
        reason: String,
    },
    Error {
        reason: String,
    },
    Message {
        from: String,
        body: String,
    },
}

// ============================================================================
// SubprocessDriver
// ============================================================================

/// [`SessionDriver`] implementation over a child-process bridge.
#[derive(Debug)]
pub struct SubprocessDriver {
    stdin: Mutex<ChildStdin>,
    pending: PendingAcks,
}

impl SubprocessDriver {
    /// Spawn the bridge command and start forwarding its frames.
    ///
    /// Lifecycle frames are delivered on `events`; child exit is reported as
    /// `DriverEvent::Disconnected` and fails every in-flight command.
    pub fn spawn(
        command: &[String],
        auth_dir: &Path,
        events: mpsc::UnboundedSender<DriverEvent>,
    ) -> Result<Self, DriverError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| DriverError::Protocol("empty bridge command".to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .env(AUTH_DIR_ENV, auth_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DriverError::Protocol("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DriverError::Protocol("bridge stdout unavailable".to_string()))?;

        let pending: PendingAcks = Arc::new(DashMap::new());

        tokio::spawn(read_loop(stdout, events, Arc::clone(&pending)));
        // Reap the child so an exited bridge does not linger as a zombie.
        tokio::spawn(async move {
            let _ = child.wait().await;
        });

        Ok(Self {
            stdin: Mutex::new(stdin),
            pending,
        })
    }

    /// Write one command line and wait for its ack.
    async fn issue(&self, id: String, frame: CommandFrame<'_>) -> Result<Option<Receipt>, DriverError> {
        let mut line = serde_json::to_string(&frame)
            .map_err(|e| DriverError::Protocol(e.to_string()))?;
        line.push('\n');

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);

        {
            let mut stdin = self.stdin.lock().await;
            if let Err(e) = stdin.write_all(line.as_bytes()).await {
                self.pending.remove(&id);
                return Err(e.into());
            }
            if let Err(e) = stdin.flush().await {
                self.pending.remove(&id);
                return Err(e.into());
            }
        }

        match rx.await {
            Ok(Ok(receipt)) => Ok(receipt),
            Ok(Err(message)) => Err(DriverError::Rejected(message)),
            // Sender dropped: the reader observed child exit.
            Err(_) => Err(DriverError::NotRunning),
        }
    }
}

#[async_trait::async_trait]
impl SessionDriver for SubprocessDriver {
    async fn initialize(&self) -> Result<(), DriverError> {
        let id = Ulid::new().to_string();
        self.issue(id.clone(), CommandFrame::Init { id: &id }).await?;
        Ok(())
    }

    async fn send_message(&self, destination: &str, body: &str) -> Result<Receipt, DriverError> {
        let id = Ulid::new().to_string();
        let receipt = self
            .issue(
                id.clone(),
                CommandFrame::Send {
                    id: &id,
                    to: destination,
                    body,
                },
            )
            .await?;
        receipt.ok_or_else(|| DriverError::Protocol("send ack carried no receipt".to_string()))
    }
}

// ============================================================================
// Reader
// ============================================================================

async fn read_loop(
    stdout: ChildStdout,
    events: mpsc::UnboundedSender<DriverEvent>,
    pending: PendingAcks,
) {
    let mut lines = BufReader::new(stdout).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed reading from bridge, stopping");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let frame: BridgeFrame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, line = %line, "Discarding unparseable bridge frame");
                continue;
            }
        };

        let event = match frame {
            BridgeFrame::Ack {
                id,
                ok,
                receipt,
                error,
            } => {
                let Some((_, tx)) = pending.remove(&id) else {
                    warn!(id = %id, "Ack for unknown command");
                    continue;
                };
                let result = if ok {
                    Ok(receipt)
                } else {
                    Err(error.unwrap_or_else(|| "unspecified driver error".to_string()))
                };
                let _ = tx.send(result);
                continue;
            }
            BridgeFrame::Qr { code } => DriverEvent::Qr(code),
            BridgeFrame::Ready => DriverEvent::Ready,
            BridgeFrame::Disconnected { reason } => DriverEvent::Disconnected(reason),
            BridgeFrame::AuthFailure { reason } => DriverEvent::AuthFailure(reason),
            BridgeFrame::Error { reason } => DriverEvent::Error(reason),
            BridgeFrame::Message { from, body } => DriverEvent::Message { from, body },
        };

        if events.send(event).is_err() {
            break;
        }
    }

    info!("Bridge process exited");
    // Fail in-flight commands by dropping their ack senders.
    pending.clear();
    let _ = events.send(DriverEvent::Disconnected(
        "bridge process exited".to_string(),
    ));
}
