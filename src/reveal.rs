//! Typewriter Reveal
//!
//! Cosmetic per-character reveal of a reply that is already fully in
//! memory. Nothing here touches the network.

use std::time::Duration;

/// Reveals `text` one character at a time
#[derive(Debug, Clone)]
pub struct Typewriter {
    text: String,
    /// Byte offset of the revealed prefix, always on a char boundary
    shown: usize,
}

impl Typewriter {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            shown: 0,
        }
    }

    /// Full text being revealed
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Currently revealed prefix
    pub fn revealed(&self) -> &str {
        &self.text[..self.shown]
    }

    pub fn is_done(&self) -> bool {
        self.shown == self.text.len()
    }

    /// Reveal one more character and return it, or `None` when done
    pub fn next_char(&mut self) -> Option<char> {
        let ch = self.text[self.shown..].chars().next()?;
        self.shown += ch.len_utf8();
        Some(ch)
    }

    /// Drive the reveal, handing each new character to `sink` and pausing
    /// `delay` after it.
    pub async fn run<F>(mut self, delay: Duration, mut sink: F)
    where
        F: FnMut(char),
    {
        while let Some(ch) = self.next_char() {
            sink(ch);
            tokio::time::sleep(delay).await;
        }
    }
}
