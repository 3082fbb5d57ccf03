//! Synthetic conversation turns the relay injects into the engine.
//!
//! Every prompt is a user-role `input_text` item followed by
//! `response.create`, so the engine speaks its answer immediately.

use crate::core::realtime::ClientEvent;

/// Sent once, shortly after the session update.
pub const GREETING_PROMPT: &str = "Say hello and introduce yourself";

/// Sent when the caller has been quiet for the watchdog window.
pub const SILENCE_FILLER_PROMPT: &str = "The caller has been quiet for a while. \
If you are currently in Developer Mode (activated by the caller saying 'Foxtrot Oscar Tango'), \
continue in Developer Mode: ask a concise, high-signal, technical clarifying question or propose \
next actionable steps related to the most recent topic. Keep responses succinct and professional. \
Otherwise (toddler mode), say something engaging to get a 4-year-old talking again, like asking \
about their favorite color, toys, or pets. Keep it light and fun!";

/// Sent when the activation phrase was spoken without a task.
pub const MISSING_TASK_PROMPT: &str = "The caller spoke the trigger phrase 'Foxtrot Oscar Tangeo' \
but did not provide a task. Ask them, succinctly: 'What task should I start for you? Say one short sentence.'";

/// Confirmation after the task service accepted a task.
pub fn task_created_prompt(task: &str, reference: &str) -> String {
    format!(
        "Background agent task created from phone: '{task}'. \
         If the caller asks, you can mention reference: {reference}. \
         Acknowledge briefly and ask if they want to add details."
    )
}

/// Apology after the task service failed.
pub fn task_failed_prompt(reason: &str) -> String {
    format!(
        "Attempted to create a background agent task from phone but failed: {reason}. \
         Apologize briefly and ask the caller to repeat the request or try again later."
    )
}

/// The two engine events that make up one synthetic turn.
pub fn prompt_events(text: impl Into<String>) -> [ClientEvent; 2] {
    [ClientEvent::user_text(text), ClientEvent::ResponseCreate]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_events_order() {
        let [item, response] = prompt_events("hi");
        assert_eq!(item, ClientEvent::user_text("hi"));
        assert_eq!(response, ClientEvent::ResponseCreate);
    }

    #[test]
    fn test_task_prompts() {
        let ok = task_created_prompt("build me a report", "https://tasks/1");
        assert!(ok.contains("'build me a report'"));
        assert!(ok.contains("reference: https://tasks/1."));

        let failed = task_failed_prompt("HTTP 500: boom");
        assert!(failed.contains("failed: HTTP 500: boom."));
        assert!(failed.contains("Apologize briefly"));
    }
}
