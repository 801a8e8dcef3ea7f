//! Best-effort delivery of simulation results to an external sink.
//!
//! RULE: nothing in here ever fails the caller. Delivery is retried with
//! linear backoff (`attempt × base_delay`) and then given up on with an
//! error log line.

use crate::{simulation::SimulationResponse, types::SimulationId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{
    fs::OpenOptions,
    io::Write,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
    time::Duration,
};
use uuid::Uuid;

/// Receives serialized payloads. May fail or time out.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, payload: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay:   Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay:   Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Retry loop runs on the caller's thread.
    Inline,
    /// Retry loop runs on a worker thread. `NotificationRetrier::flush`
    /// waits for outstanding workers.
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Abandoned { attempts: u32 },
    /// Handed to a background thread; the outcome is only logged.
    Dispatched,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    pub event_id:      Uuid,
    pub simulation_id: SimulationId,
    pub sent_at:       NaiveDateTime,
    pub body:          SimulationResponse,
}

impl NotificationEnvelope {
    pub fn new(body: SimulationResponse, sent_at: NaiveDateTime) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            simulation_id: body.simulation_id,
            sent_at,
            body,
        }
    }
}

pub struct NotificationRetrier {
    sink:    Arc<dyn NotificationSink>,
    policy:  RetryPolicy,
    mode:    DispatchMode,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl NotificationRetrier {
    pub fn new(sink: Arc<dyn NotificationSink>, policy: RetryPolicy, mode: DispatchMode) -> Self {
        Self { sink, policy, mode, workers: Mutex::new(Vec::new()) }
    }

    /// Block until every background delivery has finished or given up.
    pub fn flush(&self) {
        let pending: Vec<_> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if !pending.is_empty() {
            log::debug!("notify: waiting for {} background deliveries", pending.len());
        }
        for handle in pending {
            if handle.join().is_err() {
                log::error!("notify: background delivery panicked");
            }
        }
    }

    /// Serialize and deliver. Serialization failure is logged and dropped
    /// like any other delivery failure.
    pub fn send(&self, envelope: &NotificationEnvelope) -> DeliveryOutcome {
        let payload = match serde_json::to_string(envelope) {
            Ok(p) => p,
            Err(e) => {
                log::error!(
                    "notify: cannot serialize simulation {}: {e}",
                    envelope.simulation_id
                );
                return DeliveryOutcome::Abandoned { attempts: 0 };
            }
        };
        self.send_payload(envelope.simulation_id, payload)
    }

    pub fn send_payload(&self, simulation_id: SimulationId, payload: String) -> DeliveryOutcome {
        match self.mode {
            DispatchMode::Inline => deliver_with_retry(&*self.sink, self.policy, simulation_id, &payload),
            DispatchMode::Background => {
                let sink = Arc::clone(&self.sink);
                let policy = self.policy;
                let spawned = thread::Builder::new()
                    .name(format!("notify-{simulation_id}"))
                    .spawn(move || {
                        deliver_with_retry(&*sink, policy, simulation_id, &payload);
                    });
                match spawned {
                    Ok(handle) => {
                        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
                        workers.retain(|h| !h.is_finished());
                        workers.push(handle);
                        DeliveryOutcome::Dispatched
                    }
                    Err(e) => {
                        log::error!("notify: cannot spawn worker for simulation {simulation_id}: {e}");
                        DeliveryOutcome::Abandoned { attempts: 0 }
                    }
                }
            }
        }
    }
}

fn deliver_with_retry(
    sink: &dyn NotificationSink,
    policy: RetryPolicy,
    simulation_id: SimulationId,
    payload: &str,
) -> DeliveryOutcome {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match sink.deliver(payload) {
            Ok(()) => {
                log::debug!("notify: simulation {simulation_id} delivered on attempt {attempt}");
                return DeliveryOutcome::Delivered { attempts: attempt };
            }
            Err(e) => {
                log::warn!(
                    "notify: attempt {attempt}/{max_attempts} for simulation {simulation_id} failed: {e}"
                );
                if attempt < max_attempts {
                    thread::sleep(policy.delay_after(attempt));
                }
            }
        }
    }

    log::error!("notify: giving up on simulation {simulation_id} after {max_attempts} attempts");
    DeliveryOutcome::Abandoned { attempts: max_attempts }
}

// ── Sinks ──────────────────────────────────────────────────────

/// Writes payloads to the log. Always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, payload: &str) -> anyhow::Result<()> {
        log::info!("notify: {payload}");
        Ok(())
    }
}

/// Appends one JSON payload per line to an outbox file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

impl NotificationSink for FileSink {
    fn deliver(&self, payload: &str) -> anyhow::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| anyhow::anyhow!("Cannot open outbox {}: {e}", self.path.display()))?;
        writeln!(file, "{payload}")?;
        Ok(())
    }
}
