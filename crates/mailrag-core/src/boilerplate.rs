//! Conversational boilerplate removal.
//!
//! Drops a leading greeting line and everything from the closing
//! salutation or signature onward, so that only substantive content is
//! embedded.
//!
//! # Algorithm
//!
//! 1. Split the body into trimmed, non-empty lines.
//! 2. If the first line (lowercased) contains any opening salutation as a
//!    substring, drop it.
//! 3. Keep lines until the first one that starts with a closing
//!    salutation or contains the sender's name anywhere (both
//!    lowercased); that line and everything after it are discarded.
//! 4. Join the kept lines with single spaces.
//!
//! # Known limitations
//!
//! Both checks are deliberately naive. The opening check is a substring
//! match, so a first line such as "This is urgent" matches `"hi"`. The
//! sender check stops at any line that mentions the sender by name, so
//! legitimate content that names the sender mid-body is cut along with
//! the signature.

/// Greetings recognised on the first body line (substring match).
pub const OPENING_SALUTATIONS: &[&str] = &[
    "hi",
    "hello",
    "dear",
    "good morning",
    "good afternoon",
    "hi there",
    "hey",
    "greetings",
    "good day",
];

/// Sign-offs that end the substantive content (prefix match).
pub const CLOSING_SALUTATIONS: &[&str] = &[
    "best regards",
    "best",
    "sincerely",
    "regards",
    "thanks",
    "thank you",
    "warm regards",
    "best wishes",
    "cheers",
    "take care",
    "looking forward to your response",
    "talk soon",
    "all the best",
    "yours truly",
    "respectfully",
    "cordially",
    "with appreciation",
    "many thanks",
    "appreciatively",
    "with best regards",
];

/// Removes greeting and signature lines from a message body.
#[derive(Debug, Clone)]
pub struct BoilerplateStripper {
    opening: Vec<String>,
    closing: Vec<String>,
}

impl Default for BoilerplateStripper {
    fn default() -> Self {
        Self::new(
            OPENING_SALUTATIONS.iter().copied(),
            CLOSING_SALUTATIONS.iter().copied(),
        )
    }
}

impl BoilerplateStripper {
    /// Build a stripper with custom salutation sets. Entries are
    /// lowercased on construction.
    pub fn new<O, C>(opening: O, closing: C) -> Self
    where
        O: IntoIterator,
        O::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        Self {
            opening: opening
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
            closing: closing
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Return the cleaned body: substantive lines joined by single spaces.
    ///
    /// The result may be empty, e.g. when the body is only a sign-off.
    pub fn strip(&self, body: &str, sender: &str) -> String {
        let mut lines = body
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .peekable();

        if let Some(first) = lines.peek() {
            let first = first.to_lowercase();
            if self.opening.iter().any(|s| first.contains(s.as_str())) {
                lines.next();
            }
        }

        let sender = sender.trim().to_lowercase();
        let mut kept: Vec<&str> = Vec::new();
        for line in lines {
            let lower = line.to_lowercase();
            if self.closing.iter().any(|s| lower.starts_with(s.as_str())) {
                break;
            }
            if !sender.is_empty() && lower.contains(&sender) {
                break;
            }
            kept.push(line);
        }

        kept.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_greeting_and_signature() {
        let body = "Hi Team,\nThe deployment is delayed due to a config issue. We expect it resolved by Friday.\nThanks,\nAlice";
        let cleaned = BoilerplateStripper::default().strip(body, "Alice");
        assert_eq!(
            cleaned,
            "The deployment is delayed due to a config issue. We expect it resolved by Friday."
        );
    }

    #[test]
    fn test_joins_lines_with_single_space() {
        let body = "Dear Bob,\n\n  First line.  \n\nSecond line.\nRegards";
        let cleaned = BoilerplateStripper::default().strip(body, "Carol");
        assert_eq!(cleaned, "First line. Second line.");
    }

    #[test]
    fn test_only_signature_is_empty() {
        let cleaned = BoilerplateStripper::default().strip("Thanks, Alice", "Alice");
        assert!(cleaned.is_empty());
    }

    #[test]
    fn test_empty_body() {
        assert!(BoilerplateStripper::default().strip("", "Alice").is_empty());
        assert!(BoilerplateStripper::default()
            .strip("\n\n   \n", "Alice")
            .is_empty());
    }

    #[test]
    fn test_sender_name_stops_accumulation() {
        let body = "Status update follows.\nalice will be out next week.\nMore text.";
        let cleaned = BoilerplateStripper::default().strip(body, "Alice");
        assert_eq!(cleaned, "Status update follows.");
    }

    #[test]
    fn test_closing_is_prefix_match_only() {
        let body = "Project notes.\nWe said thanks to the vendor.\nEnd.";
        let cleaned = BoilerplateStripper::default().strip(body, "Zed");
        assert_eq!(cleaned, "Project notes. We said thanks to the vendor. End.");
    }

    #[test]
    fn test_opening_substring_over_match() {
        let body = "This line contains hi inside a word.\nKept line.";
        let cleaned = BoilerplateStripper::default().strip(body, "Zed");
        assert_eq!(cleaned, "Kept line.");
    }

    #[test]
    fn test_custom_sets_are_case_insensitive() {
        let stripper = BoilerplateStripper::new(["YO"], ["LATER"]);
        let cleaned = stripper.strip("yo folks\nreal content\nlater!", "nobody");
        assert_eq!(cleaned, "real content");
    }

    #[test]
    fn test_empty_sender_never_matches() {
        let cleaned = BoilerplateStripper::default().strip("Content here.", "  ");
        assert_eq!(cleaned, "Content here.");
    }
}
