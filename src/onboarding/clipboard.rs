//! Clipboard watcher
//!
//! While the auth page is waiting for a code, the clipboard is polled for
//! text shaped like an authorization code so the user doesn't have to paste
//! it by hand.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::collaborators::Clipboard;
use super::monitors::{EventSink, MonitorPayload};
use super::ticker::Ticker;
use super::types::ClipboardSnapshot;
use crate::error::WizardError;

/// Shape of an authorization code as pasted from the provider's callback
/// page: `<code>#<state>`, both URL-safe base64, matched against the whole
/// trimmed clipboard text.
pub const DEFAULT_CODE_PATTERN: &str = r"^[A-Za-z0-9_-]{16,}#[A-Za-z0-9_-]{16,}$";

static DEFAULT_REGEX: Lazy<Arc<Regex>> =
    Lazy::new(|| Arc::new(Regex::new(DEFAULT_CODE_PATTERN).expect("default code pattern is valid")));

/// Compiled authorization-code pattern.
#[derive(Debug, Clone)]
pub struct CodeMatcher {
    pattern: Arc<Regex>,
}

impl CodeMatcher {
    pub fn new(pattern: &str) -> Result<Self, WizardError> {
        Ok(Self {
            pattern: Arc::new(Regex::new(pattern)?),
        })
    }

    /// The code in `text`, if the trimmed text matches.
    pub fn extract(&self, text: &str) -> Option<String> {
        let candidate = text.trim();
        if candidate.is_empty() {
            return None;
        }
        self.pattern
            .is_match(candidate)
            .then(|| candidate.to_string())
    }
}

impl Default for CodeMatcher {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_REGEX.clone(),
        }
    }
}

/// Polls the clipboard and reports each new code once.
pub struct ClipboardWatcher {
    clipboard: Arc<dyn Clipboard>,
    matcher: CodeMatcher,
    last_seen: u64,
}

impl ClipboardWatcher {
    /// `last_seen` is the change counter already consumed; content at or
    /// before it is never reported.
    pub fn new(clipboard: Arc<dyn Clipboard>, matcher: CodeMatcher, last_seen: u64) -> Self {
        Self {
            clipboard,
            matcher,
            last_seen,
        }
    }

    pub fn poll(&mut self) -> ClipboardSnapshot {
        let unchanged = ClipboardSnapshot {
            change_counter: self.last_seen,
            code: None,
        };
        if self.clipboard.change_counter() == self.last_seen {
            return unchanged;
        }

        // A torn read is retried on the next tick
        let Some((change_counter, text)) = self.clipboard.snapshot() else {
            tracing::trace!("Clipboard changed mid-read, skipping tick");
            return unchanged;
        };
        if change_counter == self.last_seen {
            return unchanged;
        }
        self.last_seen = change_counter;

        let code = text.and_then(|text| self.matcher.extract(&text));
        if code.is_some() {
            tracing::debug!("Clipboard change #{} looks like an auth code", change_counter);
        }
        ClipboardSnapshot {
            change_counter,
            code,
        }
    }

    pub(super) async fn run(mut self, mut ticker: Box<dyn Ticker>, sink: EventSink) {
        loop {
            ticker.tick().await;
            let snapshot = self.poll();
            if snapshot.code.is_some() && !sink.send(MonitorPayload::Clipboard(snapshot)) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::test_helpers::helpers::MockClipboard;

    const CODE: &str = "Xk9fQ2mZp8LrT4vWbN3c#s7Gd1HhJq5Yt0uEwA2x";

    #[test]
    fn test_default_pattern_accepts_code_with_state() {
        let matcher = CodeMatcher::default();
        assert_eq!(matcher.extract(CODE).as_deref(), Some(CODE));
        assert_eq!(
            matcher.extract(&format!("  {}\n", CODE)).as_deref(),
            Some(CODE)
        );
    }

    #[test]
    fn test_default_pattern_rejects_other_text() {
        let matcher = CodeMatcher::default();
        assert!(matcher.extract("").is_none());
        assert!(matcher.extract("hello world").is_none());
        // Missing state part
        assert!(matcher.extract("Xk9fQ2mZp8LrT4vWbN3c").is_none());
        // Too short on either side
        assert!(matcher.extract("abc#def").is_none());
        // Embedded in prose
        assert!(matcher.extract(&format!("my code is {}", CODE)).is_none());
        // URL
        assert!(matcher.extract("https://example.com/callback#token").is_none());
    }

    #[test]
    fn test_custom_pattern() {
        let matcher = CodeMatcher::new(r"^\d{6}$").unwrap();
        assert_eq!(matcher.extract("123456").as_deref(), Some("123456"));
        assert!(matcher.extract(CODE).is_none());
        assert!(CodeMatcher::new("(").is_err());
    }

    #[test]
    fn test_poll_reports_new_code_once() {
        let clipboard = Arc::new(MockClipboard::new());
        let mut watcher = ClipboardWatcher::new(clipboard.clone(), CodeMatcher::default(), 0);

        clipboard.set_text(CODE);
        let first = watcher.poll();
        assert_eq!(first.change_counter, 1);
        assert_eq!(first.code.as_deref(), Some(CODE));

        let second = watcher.poll();
        assert_eq!(second.change_counter, 1);
        assert!(second.code.is_none());
    }

    #[test]
    fn test_poll_ignores_content_before_baseline() {
        let clipboard = Arc::new(MockClipboard::new());
        clipboard.set_text(CODE);
        let baseline = clipboard.change_counter();

        let mut watcher = ClipboardWatcher::new(clipboard.clone(), CodeMatcher::default(), baseline);
        assert!(watcher.poll().code.is_none());
    }

    /// Clipboard whose content is replaced by `next` on the first text read,
    /// as if the user copied between the counter read and the text read.
    struct ChangesMidRead {
        inner: MockClipboard,
        next: std::sync::Mutex<Option<String>>,
    }

    impl Clipboard for ChangesMidRead {
        fn current_text(&self) -> Option<String> {
            if let Some(next) = self.next.lock().unwrap().take() {
                self.inner.set_text(&next);
            }
            self.inner.current_text()
        }

        fn change_counter(&self) -> u64 {
            self.inner.change_counter()
        }
    }

    #[test]
    fn test_code_copied_mid_read_is_reported_once() {
        let inner = MockClipboard::new();
        inner.set_text("just some notes");
        let clipboard = Arc::new(ChangesMidRead {
            inner,
            next: std::sync::Mutex::new(Some(CODE.to_string())),
        });
        let mut watcher = ClipboardWatcher::new(clipboard, CodeMatcher::default(), 0);

        let reported: Vec<ClipboardSnapshot> = (0..3)
            .map(|_| watcher.poll())
            .filter(|snapshot| snapshot.code.is_some())
            .collect();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].change_counter, 2);
        assert_eq!(reported[0].code.as_deref(), Some(CODE));
    }

    #[test]
    fn test_poll_non_code_change_yields_nothing() {
        let clipboard = Arc::new(MockClipboard::new());
        let mut watcher = ClipboardWatcher::new(clipboard.clone(), CodeMatcher::default(), 0);

        clipboard.set_text("just some notes");
        let snapshot = watcher.poll();
        assert_eq!(snapshot.change_counter, 1);
        assert!(snapshot.code.is_none());
    }
}
