use regex::Regex;
use std::sync::OnceLock;

fn request_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:remind\s+me|(?:set|create|add|schedule|make)\s+(?:me\s+)?(?:a\s+)?(?:new\s+)?reminder|don'?t\s+let\s+me\s+forget)\b",
        )
        .expect("reminder request pattern should compile")
    })
}

/// Cheap keyword check for utterances that ask for a reminder. Used to keep
/// ordinary chat that happens to mention a time ("how was your day today?")
/// away from the scheduler.
pub fn is_reminder_request(text: &str) -> bool {
    request_regex().is_match(text)
}
