//! Task progress multiplexer.
//!
//! Long-running engine operations report progress as a stream of
//! events rather than a single reply. The multiplexer keys those
//! streams by [`TaskToken`] and drives each observer through a strict
//! lifecycle:
//!
//! ```text
//! start_task ──► running ──┬── complete ──► retired
//!                          └── error    ──► retired
//! ```
//!
//! Progress events for a running task invoke the observer in arrival
//! order. The first terminal event retires the token; anything that
//! arrives afterward - more progress, a second terminal - is dropped
//! without touching the observer. Unknown tokens are ignored the same
//! way, so a stale engine stream can never corrupt a live task.

use crate::transport::{InvokeArgs, Transport};
use crate::BridgeError;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tether_event::{TaskEvent, TaskStatus};
use tether_types::TaskToken;

/// Observer callbacks for one task's lifetime.
///
/// All callbacks are optional; an absent callback drops its events.
/// `on_progress` may fire many times, the terminal pair at most once
/// total between them.
#[derive(Default)]
pub struct TaskObserver {
    on_progress: Option<Box<dyn FnMut(&TaskEvent) + Send>>,
    on_complete: Option<Box<dyn FnOnce(Value) + Send>>,
    on_error: Option<Box<dyn FnOnce(Value) + Send>>,
}

impl TaskObserver {
    /// Creates an observer with no callbacks attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a progress callback receiving the full decoded event.
    ///
    /// The event carries the task token, the step counters (absent
    /// counters stay `None`, they are not defaulted), and the complete
    /// payload, so engine-supplied extra fields reach the handler.
    #[must_use]
    pub fn on_progress(mut self, f: impl FnMut(&TaskEvent) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Attaches a completion callback receiving the final payload.
    #[must_use]
    pub fn on_complete(mut self, f: impl FnOnce(Value) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Attaches a failure callback receiving the engine's error payload.
    #[must_use]
    pub fn on_error(mut self, f: impl FnOnce(Value) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for TaskObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskObserver")
            .field("on_progress", &self.on_progress.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

struct TaskRecord {
    observer: TaskObserver,
    retired: bool,
}

/// Multiplexer for concurrent task event streams.
///
/// The outer map lock is held only for lookup and insertion; event
/// delivery runs under the per-task lock, which keeps each stream's
/// callbacks ordered without serializing unrelated tasks.
pub struct TaskMultiplexer {
    transport: Arc<dyn Transport>,
    start_operation: String,
    tasks: Mutex<HashMap<TaskToken, Arc<Mutex<TaskRecord>>>>,
}

impl TaskMultiplexer {
    /// Creates a multiplexer that starts tasks via `start_operation`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, start_operation: impl Into<String>) -> Self {
        Self {
            transport,
            start_operation: start_operation.into(),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a task of `total_steps` steps and registers its observer.
    ///
    /// The task token travels to the engine as a plain argument; the
    /// engine stamps it into every event of the resulting stream.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::InvalidArgument`] if `total_steps` is zero. A
    ///   zero-step task has no progress to report and no terminal step
    ///   to reach.
    /// - [`BridgeError::Transport`] if dispatch fails; the observer is
    ///   deregistered before the error is returned.
    pub fn start_task(
        &self,
        total_steps: u64,
        observer: TaskObserver,
    ) -> Result<TaskToken, BridgeError> {
        if total_steps == 0 {
            return Err(BridgeError::InvalidArgument(
                "total_steps must be at least 1".to_string(),
            ));
        }

        let token = TaskToken::new();
        let record = Arc::new(Mutex::new(TaskRecord {
            observer,
            retired: false,
        }));
        self.tasks.lock().insert(token, record);

        // Bare UUID on the wire: the engine stamps this exact string
        // into the `token` field of every event it emits for the task.
        let mut args = InvokeArgs::new();
        args.insert("token".to_string(), token.uuid().to_string());
        args.insert("total_steps".to_string(), total_steps.to_string());

        if let Err(e) = self
            .transport
            .send_invocation(&self.start_operation, args, None)
        {
            self.tasks.lock().remove(&token);
            return Err(e);
        }
        tracing::debug!(%token, total_steps, "task started");
        Ok(token)
    }

    /// Delivers a decoded task event to its observer.
    ///
    /// Returns `true` if a live task consumed the event. Unknown tokens
    /// and events for retired tasks return `false` without side
    /// effects.
    pub fn deliver(&self, event: &TaskEvent) -> bool {
        let record = match self.tasks.lock().get(&event.token) {
            Some(record) => Arc::clone(record),
            None => {
                tracing::debug!(token = %event.token, "task event for unknown token dropped");
                return false;
            }
        };

        // Per-task lock keeps the stream ordered; the outer map lock
        // is already released so other tasks proceed in parallel.
        let mut record = record.lock();
        if record.retired {
            tracing::debug!(token = %event.token, "task event after terminal dropped");
            return false;
        }

        match event.status {
            TaskStatus::Progress => {
                if let Some(on_progress) = record.observer.on_progress.as_mut() {
                    on_progress(event);
                }
            }
            TaskStatus::Complete => {
                record.retired = true;
                if let Some(on_complete) = record.observer.on_complete.take() {
                    on_complete(event.payload.clone());
                }
            }
            TaskStatus::Error => {
                record.retired = true;
                if let Some(on_error) = record.observer.on_error.take() {
                    on_error(event.payload.clone());
                }
            }
        }

        if record.retired {
            drop(record);
            self.tasks.lock().remove(&event.token);
            tracing::debug!(token = %event.token, "task retired");
        }
        true
    }

    /// Returns the number of currently running tasks.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl std::fmt::Debug for TaskMultiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskMultiplexer")
            .field("start_operation", &self.start_operation)
            .field("running", &self.running_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::LoopbackTransport;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tether_types::ErrorCode;

    fn multiplexer() -> (TaskMultiplexer, Arc<LoopbackTransport>) {
        let transport = Arc::new(LoopbackTransport::new());
        let mux = TaskMultiplexer::new(Arc::clone(&transport) as Arc<dyn Transport>, "start_task");
        (mux, transport)
    }

    fn progress(token: TaskToken, step: u64, total: u64) -> TaskEvent {
        TaskEvent {
            token,
            status: TaskStatus::Progress,
            step: Some(step),
            total_steps: Some(total),
            payload: Value::Null,
        }
    }

    fn complete(token: TaskToken, payload: Value) -> TaskEvent {
        TaskEvent {
            token,
            status: TaskStatus::Complete,
            step: None,
            total_steps: None,
            payload,
        }
    }

    #[test]
    fn zero_steps_rejected() {
        let (mux, transport) = multiplexer();
        let err = mux.start_task(0, TaskObserver::new()).unwrap_err();
        assert_eq!(err.code(), "BRIDGE_INVALID_ARGUMENT");
        // Nothing was sent and nothing registered
        assert!(transport.sent_invocations().is_empty());
        assert_eq!(mux.running_count(), 0);
    }

    #[test]
    fn start_transmits_token_and_steps() {
        let (mux, transport) = multiplexer();
        let token = mux.start_task(3, TaskObserver::new()).unwrap();

        let sent = transport.sent_invocations();
        assert_eq!(sent[0].name, "start_task");
        assert_eq!(sent[0].args["token"], token.uuid().to_string());
        assert_eq!(sent[0].args["total_steps"], "3");
        assert_eq!(mux.running_count(), 1);
    }

    #[test]
    fn progress_then_complete_in_order() {
        let (mux, _transport) = multiplexer();
        let steps = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(AtomicUsize::new(0));

        let steps2 = Arc::clone(&steps);
        let done2 = Arc::clone(&done);
        let token = mux
            .start_task(
                3,
                TaskObserver::new()
                    .on_progress(move |event| {
                        steps2
                            .lock()
                            .push((event.step.unwrap(), event.total_steps.unwrap()));
                    })
                    .on_complete(move |payload| {
                        assert_eq!(payload, json!({"emitted": 120}));
                        done2.fetch_add(1, Ordering::SeqCst);
                    }),
            )
            .unwrap();

        assert!(mux.deliver(&progress(token, 1, 3)));
        assert!(mux.deliver(&progress(token, 2, 3)));
        assert!(mux.deliver(&progress(token, 3, 3)));
        assert!(mux.deliver(&complete(token, json!({"emitted": 120}))));

        assert_eq!(*steps.lock(), vec![(1, 3), (2, 3), (3, 3)]);
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(mux.running_count(), 0);
    }

    #[test]
    fn events_after_terminal_are_dropped() {
        let (mux, _transport) = multiplexer();
        let progress_count = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        let pc = Arc::clone(&progress_count);
        let dc = Arc::clone(&done);
        let token = mux
            .start_task(
                2,
                TaskObserver::new()
                    .on_progress(move |_| {
                        pc.fetch_add(1, Ordering::SeqCst);
                    })
                    .on_complete(move |_| {
                        dc.fetch_add(1, Ordering::SeqCst);
                    }),
            )
            .unwrap();

        assert!(mux.deliver(&complete(token, Value::Null)));
        // Straggler progress and a duplicate terminal: both ignored
        assert!(!mux.deliver(&progress(token, 2, 2)));
        assert!(!mux.deliver(&complete(token, Value::Null)));

        assert_eq!(progress_count.load(Ordering::SeqCst), 0);
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn error_retires_and_preserves_payload() {
        let (mux, _transport) = multiplexer();
        let failed = Arc::new(AtomicUsize::new(0));

        let failed2 = Arc::clone(&failed);
        let token = mux
            .start_task(
                2,
                TaskObserver::new().on_error(move |payload| {
                    assert_eq!(payload, json!({"reason": "gpu lost"}));
                    failed2.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        let event = TaskEvent {
            token,
            status: TaskStatus::Error,
            step: None,
            total_steps: None,
            payload: json!({"reason": "gpu lost"}),
        };
        assert!(mux.deliver(&event));
        assert_eq!(failed.load(Ordering::SeqCst), 1);
        assert_eq!(mux.running_count(), 0);
    }

    #[test]
    fn unknown_token_is_noop() {
        let (mux, _transport) = multiplexer();
        assert!(!mux.deliver(&progress(TaskToken::new(), 1, 2)));
    }

    #[test]
    fn concurrent_tasks_do_not_cross() {
        let (mux, _transport) = multiplexer();
        let a_steps = Arc::new(Mutex::new(Vec::new()));
        let b_steps = Arc::new(Mutex::new(Vec::new()));

        let a2 = Arc::clone(&a_steps);
        let token_a = mux
            .start_task(
                2,
                TaskObserver::new().on_progress(move |event| a2.lock().push(event.step.unwrap())),
            )
            .unwrap();
        let b2 = Arc::clone(&b_steps);
        let token_b = mux
            .start_task(
                2,
                TaskObserver::new().on_progress(move |event| b2.lock().push(event.step.unwrap())),
            )
            .unwrap();

        mux.deliver(&progress(token_a, 1, 2));
        mux.deliver(&progress(token_b, 1, 2));
        mux.deliver(&complete(token_a, Value::Null));
        mux.deliver(&progress(token_b, 2, 2));

        assert_eq!(*a_steps.lock(), vec![1]);
        assert_eq!(*b_steps.lock(), vec![1, 2]);
        assert_eq!(mux.running_count(), 1);
    }

    #[test]
    fn progress_handler_receives_full_event() {
        let (mux, _transport) = multiplexer();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen2 = Arc::clone(&seen);
        let token = mux
            .start_task(
                2,
                TaskObserver::new().on_progress(move |event| {
                    seen2.lock().push((event.step, event.payload.clone()));
                }),
            )
            .unwrap();

        // Engine-supplied extra fields travel with the event
        let enriched = TaskEvent::from_payload(json!({
            "token": token.uuid().to_string(),
            "status": "progress",
            "step": 1,
            "total_steps": 2,
            "velocity": 3.5,
        }))
        .unwrap();
        assert!(mux.deliver(&enriched));

        // A stepless progress event is observable as None, not zero
        let stepless = TaskEvent::from_payload(json!({
            "token": token.uuid().to_string(),
            "status": "progress",
        }))
        .unwrap();
        assert!(mux.deliver(&stepless));

        let seen = seen.lock();
        assert_eq!(seen[0].0, Some(1));
        assert_eq!(seen[0].1["velocity"], 3.5);
        assert_eq!(seen[1].0, None);
    }

    #[test]
    fn send_failure_deregisters_observer() {
        let (mux, transport) = multiplexer();
        transport.fail_next_sends(true);

        let err = mux.start_task(3, TaskObserver::new()).unwrap_err();
        assert_eq!(err.code(), "BRIDGE_TRANSPORT");
        assert_eq!(mux.running_count(), 0);
    }
}
