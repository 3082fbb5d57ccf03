//! Side-channel dispatch of spoken task commands.
//!
//! Each extracted command runs on its own task so the relay loop never
//! waits on the task service. The outcome goes back to the engine as a
//! synthetic conversation turn.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::prompts::{MISSING_TASK_PROMPT, prompt_events, task_created_prompt, task_failed_prompt};
use crate::core::realtime::ClientEvent;
use crate::core::tasks::{TaskBackend, TaskReceipt, TaskRequest};

/// What a dispatch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Phrase without a task; the caller was asked for one
    AskedForTask,
    /// Same command as the previous dispatch; nothing sent
    Duplicate,
    /// Task created
    Created(TaskReceipt),
    /// Task service failed; the caller hears an apology
    Failed(String),
}

/// Call metadata captured when the command was heard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchContext {
    pub voice: String,
    pub stream_id: Option<String>,
}

/// Sends commands to the task service on behalf of one call.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn TaskBackend>,
    last_dispatched: Arc<Mutex<Option<String>>>,
    engine: mpsc::Sender<ClientEvent>,
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn TaskBackend>,
        last_dispatched: Arc<Mutex<Option<String>>>,
        engine: mpsc::Sender<ClientEvent>,
    ) -> Self {
        Self {
            backend,
            last_dispatched,
            engine,
        }
    }

    /// Run [`Dispatcher::dispatch`] on its own task.
    pub fn spawn(&self, command: String, context: DispatchContext) -> JoinHandle<DispatchOutcome> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.dispatch(command, context).await })
    }

    pub async fn dispatch(&self, command: String, context: DispatchContext) -> DispatchOutcome {
        if command.is_empty() {
            *self.last_dispatched.lock() = Some(String::new());
            info!("Activation phrase without a task, asking the caller");
            self.prompt(MISSING_TASK_PROMPT.to_string()).await;
            return DispatchOutcome::AskedForTask;
        }

        // Check and record before any I/O so an immediate repeat is dropped
        // even while the first request is still in flight.
        {
            let mut last = self.last_dispatched.lock();
            if last.as_deref() == Some(command.as_str()) {
                debug!(command = %command, "Duplicate task command ignored");
                return DispatchOutcome::Duplicate;
            }
            *last = Some(command.clone());
        }

        info!(command = %command, stream_id = ?context.stream_id, "Dispatching task command");
        let request = TaskRequest::new(&command, &context.voice, context.stream_id);

        match self.backend.create_task(&request).await {
            Ok(receipt) => {
                info!(reference = %receipt.reference, "Background task created");
                self.prompt(task_created_prompt(&command, &receipt.reference))
                    .await;
                DispatchOutcome::Created(receipt)
            }
            Err(e) => {
                warn!(error = %e, "Background task creation failed");
                let reason = e.to_string();
                self.prompt(task_failed_prompt(&reason)).await;
                DispatchOutcome::Failed(reason)
            }
        }
    }

    async fn prompt(&self, text: String) {
        for event in prompt_events(text) {
            if self.engine.send(event).await.is_err() {
                debug!("Call already ended, dispatch result discarded");
                return;
            }
        }
    }
}
