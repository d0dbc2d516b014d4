//! Authentication sub-flow
//!
//! `Idle -> ChallengeIssued -> AwaitingCode -> Exchanging -> Connected`,
//! with `Failed` as a retryable detour. The state lives here and is only
//! mutated by the orchestrator; the exchange itself runs as a monitor task
//! whose result is fed back through [`AuthFlowMonitor::on_exchange_result`].

use std::sync::Arc;
use std::time::Duration;

use super::collaborators::{AuthGrant, AuthProvider};
use super::monitors::{EventSink, MonitorPayload};
use super::pkce::Pkce;
use super::types::AuthFlowState;
use crate::config::SecretString;
use crate::error::CollaboratorError;

/// Work for the orchestrator: run this exchange in the background.
#[derive(Debug)]
pub struct ExchangeRequest {
    pub code: SecretString,
    pub verifier: SecretString,
}

#[derive(Debug)]
pub struct AuthFlowMonitor {
    state: AuthFlowState,
    pkce: Option<Pkce>,
    authorize_url: Option<String>,
    /// Code found on the clipboard, waiting for the user to confirm it
    detected_code: Option<SecretString>,
    status: Option<String>,
    connected: bool,
    auto_detect_clipboard: bool,
    auto_connect_clipboard: bool,
}

impl AuthFlowMonitor {
    pub fn new(auto_detect_clipboard: bool, auto_connect_clipboard: bool) -> Self {
        Self {
            state: AuthFlowState::Idle,
            pkce: None,
            authorize_url: None,
            detected_code: None,
            status: None,
            connected: false,
            auto_detect_clipboard,
            auto_connect_clipboard,
        }
    }

    pub fn state(&self) -> AuthFlowState {
        self.state
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn authorize_url(&self) -> Option<&str> {
        self.authorize_url.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn has_detected_code(&self) -> bool {
        self.detected_code.is_some()
    }

    pub fn auto_detect_clipboard(&self) -> bool {
        self.auto_detect_clipboard
    }

    pub fn auto_connect_clipboard(&self) -> bool {
        self.auto_connect_clipboard
    }

    pub fn set_auto_detect_clipboard(&mut self, enabled: bool) {
        self.auto_detect_clipboard = enabled;
    }

    pub fn set_auto_connect_clipboard(&mut self, enabled: bool) {
        self.auto_connect_clipboard = enabled;
    }

    /// Whether the clipboard watcher should be armed right now.
    pub fn wants_clipboard(&self) -> bool {
        self.state == AuthFlowState::AwaitingCode && self.auto_detect_clipboard
    }

    fn transition(&mut self, to: AuthFlowState) {
        tracing::debug!("Auth flow {:?} -> {:?}", self.state, to);
        self.state = to;
    }

    /// `Idle | Failed -> ChallengeIssued` with a fresh PKCE pair.
    pub fn request_challenge(&mut self, provider: &dyn AuthProvider) -> bool {
        if !matches!(self.state, AuthFlowState::Idle | AuthFlowState::Failed) {
            return false;
        }
        match provider.begin_challenge() {
            Ok(pkce) => {
                self.authorize_url = Some(provider.authorize_url(&pkce));
                self.pkce = Some(pkce);
                self.detected_code = None;
                self.status = None;
                self.transition(AuthFlowState::ChallengeIssued);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to start auth challenge: {}", e);
                self.status = Some(e.status_text());
                self.transition(AuthFlowState::Failed);
                false
            }
        }
    }

    /// `ChallengeIssued -> AwaitingCode` once the user has been sent to the
    /// authorize URL.
    pub fn challenge_delivered(&mut self) -> bool {
        if self.state != AuthFlowState::ChallengeIssued {
            return false;
        }
        self.status = Some("Waiting for the authorization code...".to_string());
        self.transition(AuthFlowState::AwaitingCode);
        true
    }

    /// A code typed or pasted by the user.
    pub fn submit_code(&mut self, raw: &str) -> Option<ExchangeRequest> {
        if self.state != AuthFlowState::AwaitingCode {
            return None;
        }
        let code = normalize_code(raw);
        if code.is_empty() {
            self.status = Some("Paste the code from the browser first".to_string());
            return None;
        }
        self.begin_exchange(SecretString::new(code))
    }

    /// A code found by the clipboard watcher. Exchanged right away when
    /// auto-connect is on, otherwise held for [`Self::confirm_detected_code`].
    pub fn on_clipboard_code(&mut self, code: String) -> Option<ExchangeRequest> {
        if !self.wants_clipboard() {
            return None;
        }
        let code = SecretString::new(code);
        tracing::info!("Detected auth code on clipboard ({})", code.fingerprint());
        if self.auto_connect_clipboard {
            return self.begin_exchange(code);
        }
        self.detected_code = Some(code);
        self.status = Some("Found a code on your clipboard. Connect?".to_string());
        None
    }

    /// Explicit user confirmation of a detected code.
    pub fn confirm_detected_code(&mut self) -> Option<ExchangeRequest> {
        if self.state != AuthFlowState::AwaitingCode {
            return None;
        }
        let code = self.detected_code.take()?;
        self.begin_exchange(code)
    }

    fn begin_exchange(&mut self, code: SecretString) -> Option<ExchangeRequest> {
        let verifier = self.pkce.as_ref()?.verifier.clone();
        self.detected_code = None;
        self.status = Some("Connecting...".to_string());
        self.transition(AuthFlowState::Exchanging);
        Some(ExchangeRequest { code, verifier })
    }

    pub fn on_exchange_result(&mut self, result: Result<AuthGrant, CollaboratorError>) {
        if self.state != AuthFlowState::Exchanging {
            return;
        }
        match result {
            Ok(_grant) => {
                self.connected = true;
                self.pkce = None;
                self.status = Some("Connected".to_string());
                self.transition(AuthFlowState::Connected);
                tracing::info!("Authorization exchange succeeded");
            }
            Err(e) => {
                tracing::warn!("Authorization exchange failed: {}", e);
                self.status = Some(e.status_text());
                self.transition(AuthFlowState::Failed);
            }
        }
    }

    /// `Failed -> ChallengeIssued` with a new PKCE pair.
    pub fn retry(&mut self, provider: &dyn AuthProvider) -> bool {
        if self.state != AuthFlowState::Failed {
            return false;
        }
        self.request_challenge(provider)
    }

    /// Drop everything in progress. A completed connection survives.
    pub fn reset(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        if self.state != AuthFlowState::Idle {
            self.transition(AuthFlowState::Idle);
        }
        self.pkce = None;
        self.authorize_url = None;
        self.detected_code = None;
        self.status = None;
    }
}

/// First line of pasted input, whitespace trimmed.
pub fn normalize_code(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Background half of the exchange: one bounded call, one result.
pub(super) async fn run_exchange(
    provider: Arc<dyn AuthProvider>,
    request: ExchangeRequest,
    timeout: Duration,
    sink: EventSink,
) {
    let result =
        match tokio::time::timeout(timeout, provider.exchange(&request.code, &request.verifier))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Timeout(timeout)),
        };
    sink.send(MonitorPayload::AuthExchange(result));
}
