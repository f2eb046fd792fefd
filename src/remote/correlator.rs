//! Pairing of `EVAL` commands with their `EVALOUT` answers.
//!
//! Answers are matched purely by tag, so they may arrive in any order and
//! interleaved with unrelated engine traffic. Each request owns its own
//! deadline; whichever comes first, the answer or the deadline, settles the
//! request and the other becomes a no-op.

use crate::remote::codec::RemoteCommand;
use crate::remote::CommandSink;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const DEFAULT_EVAL_TIMEOUT: Duration = Duration::from_millis(2000);

type PendingTable = Arc<Mutex<HashMap<u64, SyncSender<String>>>>;

/// Tag allocator and table of outstanding evaluation requests.
#[derive(Clone)]
pub struct Correlator {
    next_tag: Arc<AtomicU64>,
    pending: PendingTable,
    timeout: Duration,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(DEFAULT_EVAL_TIMEOUT)
    }
}

impl Correlator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            next_tag: Arc::new(AtomicU64::new(0)),
            pending: Arc::default(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `EVAL <tag> <frame> <expr>` and return a handle to its answer.
    ///
    /// The request is registered before the command is written, so an
    /// answer can never arrive for an unknown tag.
    pub fn evaluate(&self, sink: &dyn CommandSink, frame: usize, expr: &str) -> PendingEval {
        let tag = self.next_tag.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::sync_channel(1);
        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(tag, tx);
        }

        let cmd = RemoteCommand::Eval {
            tag,
            frame,
            expr: expr.to_string(),
        };
        if let Err(e) = sink.send(&cmd) {
            // dropping the sender settles the request right away
            warn!(target: "remote", "EVAL {tag}: {e}");
            self.forget(tag);
        }

        PendingEval {
            tag,
            deadline: Instant::now() + self.timeout,
            rx,
            pending: self.pending.clone(),
        }
    }

    /// Deliver an `EVALOUT` answer. Returns `false` for unknown or already settled tags.
    pub fn resolve(&self, tag: u64, value: String) -> bool {
        let Some(tx) = self.pending.lock().ok().and_then(|mut p| p.remove(&tag)) else {
            debug!(target: "remote", "EVALOUT for unknown tag {tag}");
            return false;
        };
        tx.try_send(value).is_ok()
    }

    pub fn is_pending(&self, tag: u64) -> bool {
        self.pending
            .lock()
            .map(|p| p.contains_key(&tag))
            .unwrap_or(false)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    fn forget(&self, tag: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&tag);
        }
    }
}

/// Outstanding evaluation. Dropping it without waiting cancels the request.
pub struct PendingEval {
    tag: u64,
    deadline: Instant,
    rx: Receiver<String>,
    pending: PendingTable,
}

impl PendingEval {
    pub fn tag(&self) -> u64 {
        self.tag
    }

    /// Block until the answer arrives or the deadline passes, `None` on timeout.
    pub fn wait(self) -> Option<String> {
        let left = self.deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(left) {
            Ok(value) => Some(value),
            Err(RecvTimeoutError::Timeout) => {
                debug!(target: "remote", "EVAL {} timed out", self.tag);
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for PendingEval {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&self.tag);
        }
    }
}

/// Wait for a batch of requests issued together, keeping input order.
pub fn wait_all(requests: Vec<PendingEval>) -> Vec<Option<String>> {
    requests.into_iter().map(PendingEval::wait).collect()
}
