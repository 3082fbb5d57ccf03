//! Activation-phrase extraction from caller transcripts.

use once_cell::sync::Lazy;
use regex::Regex;

/// "foxtrot oscar tango", also accepting the "tangeo" spelling, any case,
/// any whitespace between the words.
static ACTIVATION_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bfoxtrot\s+oscar\s+tan(?:geo|go)\b").expect("activation phrase regex")
});

const TRIM_PUNCTUATION: &[char] = &[',', '.', ';', ':', '!', '-', '?'];

/// Return the text following the activation phrase, trimmed.
///
/// `None` means the phrase was not spoken. `Some("")` means it was spoken
/// with nothing after it.
pub fn extract_command(transcript: &str) -> Option<String> {
    let found = ACTIVATION_PHRASE.find(transcript)?;
    let rest = transcript[found.end()..]
        .trim_matches(|c: char| c.is_whitespace() || TRIM_PUNCTUATION.contains(&c));
    Some(rest.to_string())
}
