//! Background task service (the relay's side channel).

mod client;

pub use client::{
    TASK_REQUEST_TIMEOUT, TASK_SOURCE, TITLE_MAX_CHARS, TaskBackend, TaskMetadata, TaskReceipt,
    TaskRequest, TaskResult, TaskServiceClient, TaskServiceConfig, TaskServiceError,
};
