//! System clipboard via `arboard`
//!
//! Desktop clipboards don't expose a change counter everywhere, so one is
//! synthesized: every read hashes the text and bumps the counter when the
//! hash differs from the previous read.

use std::sync::Mutex;

use sha2::{Digest, Sha256};

use super::collaborators::Clipboard;

/// Hash-derived change counter.
#[derive(Debug, Default)]
struct ChangeTracker {
    last_hash: Option<[u8; 32]>,
    counter: u64,
}

impl ChangeTracker {
    /// Start at change 0 with `text` as the known content.
    fn starting_from(text: Option<&str>) -> Self {
        Self {
            last_hash: text.map(hash_text),
            counter: 0,
        }
    }

    /// Record a read of `text` and return the counter for it.
    fn observe(&mut self, text: Option<&str>) -> u64 {
        let hash = text.map(hash_text);
        if self.last_hash != hash {
            self.counter += 1;
            self.last_hash = hash;
        }
        self.counter
    }
}

fn hash_text(text: &str) -> [u8; 32] {
    Sha256::digest(text.as_bytes()).into()
}

pub struct SystemClipboard {
    tracker: Mutex<ChangeTracker>,
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClipboard {
    /// Whatever is on the clipboard now becomes change 0.
    pub fn new() -> Self {
        Self {
            tracker: Mutex::new(ChangeTracker::starting_from(Self::read_text().as_deref())),
        }
    }

    fn read_text() -> Option<String> {
        let mut clipboard = match arboard::Clipboard::new() {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!("Clipboard unavailable: {}", e);
                return None;
            }
        };
        clipboard.get_text().ok()
    }

    /// One clipboard read, with the counter advanced if the content changed.
    fn observe(&self) -> (u64, Option<String>) {
        let text = Self::read_text();
        let mut tracker = self.tracker.lock().unwrap_or_else(|e| e.into_inner());
        (tracker.observe(text.as_deref()), text)
    }
}

impl Clipboard for SystemClipboard {
    fn current_text(&self) -> Option<String> {
        self.observe().1
    }

    fn change_counter(&self) -> u64 {
        self.observe().0
    }

    /// Counter and text come from a single read, so they always agree.
    fn snapshot(&self) -> Option<(u64, Option<String>)> {
        Some(self.observe())
    }
}
