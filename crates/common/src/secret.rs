//! Secret wrapper for API keys and other sensitive values

use std::fmt;
use zeroize::Zeroize;

/// Longest prefix of a secret ever shown in logs.
const MAX_PREFIX_CHARS: usize = 8;

/// Sensitive value - redacted in Debug/Display/logs
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    /// Create a new secret value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the inner value (use sparingly)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl Secret<String> {
    /// Short, non-secret label for logs: the first few characters followed by `...`.
    ///
    /// Never reveals more than half of the value, so short keys are not leaked
    /// whole. An empty or single-character secret yields just `...`.
    pub fn prefix_label(&self) -> String {
        let total = self.0.chars().count();
        let shown = (total / 2).min(MAX_PREFIX_CHARS);
        let prefix: String = self.0.chars().take(shown).collect();
        format!("{prefix}...")
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_are_redacted() {
        let secret = Secret::new(String::from("pub_1234567890abcdef"));
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn expose_returns_inner_value() {
        let secret = Secret::new(String::from("pub_1234567890abcdef"));
        assert_eq!(secret.expose(), "pub_1234567890abcdef");
    }

    #[test]
    fn prefix_label_caps_at_eight_chars() {
        let secret = Secret::new(String::from("pub_1234567890abcdef"));
        assert_eq!(secret.prefix_label(), "pub_1234...");
    }

    #[test]
    fn prefix_label_never_shows_more_than_half() {
        let secret = Secret::new(String::from("keyA"));
        assert_eq!(secret.prefix_label(), "ke...");

        let tiny = Secret::new(String::from("k"));
        assert_eq!(tiny.prefix_label(), "...");
    }

    #[test]
    fn prefix_label_respects_char_boundaries() {
        let secret = Secret::new(String::from("ключ-ключ-ключ"));
        assert_eq!(secret.prefix_label(), "ключ-кл...");
    }
}
