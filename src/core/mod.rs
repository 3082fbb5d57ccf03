pub mod personality;
pub mod realtime;
pub mod relay;
pub mod tasks;
pub mod telephony;

// Re-export commonly used types for convenience
pub use realtime::{
    ClientEvent, EngineConnection, OpenAIRealtimeVoice, RealtimeConfig, RealtimeError,
    RealtimeResult, ServerEvent, SessionConfig,
};

pub use relay::{CallEnd, CallRelay, Session, SilenceWatchdog, WatchdogState, extract_command};

pub use tasks::{TaskBackend, TaskServiceClient, TaskServiceConfig, TaskServiceError};

pub use telephony::{TelephonyCommand, TelephonyEvent};
