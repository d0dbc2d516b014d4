use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::auth::AuthFlowMonitor;
use super::clipboard::CodeMatcher;
use super::collaborators::{AuthProvider, Clipboard, PeerDiscovery, PermissionProbe};
use super::monitors::MonitorEvent;
use super::permissions;
use super::planner::page_order;
use super::store::OnboardingStore;
use super::ticker::{Clock, MonitorHandle};
use super::types::*;
use crate::config::OnboardingConfig;
use crate::error::WizardError;

/// Everything the wizard talks to but does not own.
#[derive(Clone)]
pub struct Collaborators {
    pub discovery: Arc<dyn PeerDiscovery>,
    pub permissions: Arc<dyn PermissionProbe>,
    pub clipboard: Arc<dyn Clipboard>,
    pub auth: Arc<dyn AuthProvider>,
    pub store: Arc<dyn OnboardingStore>,
}

/// Onboarding session state. The single writer for everything the wizard
/// shows; monitor tasks only ever send results back to it.
///
/// Methods that start monitors spawn tokio tasks and must be called from
/// within a runtime.
pub struct WizardOrchestrator {
    pub(super) session_id: Uuid,
    pub(super) config: OnboardingConfig,
    pub(super) matcher: CodeMatcher,
    pub(super) collaborators: Collaborators,
    pub(super) clock: Arc<dyn Clock>,

    pub(super) mode: ConnectionMode,
    pub(super) needs_bootstrap: bool,
    /// Index into the current page order
    pub(super) position: usize,
    /// Page the host is showing, if the wizard is open
    pub(super) visible: Option<WizardPage>,

    pub(super) monitors: BTreeMap<MonitorKind, MonitorHandle>,
    pub(super) next_generation: u64,
    pub(super) events_tx: mpsc::UnboundedSender<MonitorEvent>,
    pub(super) events_rx: mpsc::UnboundedReceiver<MonitorEvent>,

    pub(super) auth: AuthFlowMonitor,
    /// Last clipboard change counter consumed
    pub(super) last_clipboard_change: u64,
    pub(super) peer_probe: Option<PeerProbeResult>,
    pub(super) permissions: Option<PermissionSnapshot>,

    /// Chat kickoff fires once per session
    pub(super) did_auto_kickoff: bool,
    pub(super) pending_kickoff: bool,
    pub(super) show_advanced_connection: bool,

    pub(super) finished: bool,
    pub(super) completion_persisted: bool,
}

impl WizardOrchestrator {
    pub fn new(
        config: &OnboardingConfig,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
        mode: ConnectionMode,
        needs_bootstrap: bool,
    ) -> Result<Self, WizardError> {
        let matcher = CodeMatcher::new(&config.code_pattern)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        // Whatever is on the clipboard before the session started is not a code for it
        let last_clipboard_change = collaborators.clipboard.change_counter();
        let session_id = Uuid::new_v4();

        tracing::info!(
            "Onboarding session {} ({} mode, bootstrap={})",
            session_id,
            mode,
            needs_bootstrap
        );

        Ok(Self {
            session_id,
            auth: AuthFlowMonitor::new(config.auto_detect_clipboard, config.auto_connect_clipboard),
            config: config.clone(),
            matcher,
            collaborators,
            clock,
            mode,
            needs_bootstrap,
            position: 0,
            visible: None,
            monitors: BTreeMap::new(),
            next_generation: 0,
            events_tx,
            events_rx,
            last_clipboard_change,
            peer_probe: None,
            permissions: None,
            did_auto_kickoff: false,
            pending_kickoff: false,
            show_advanced_connection: false,
            finished: false,
            completion_persisted: false,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    pub fn needs_bootstrap(&self) -> bool {
        self.needs_bootstrap
    }

    /// Pages for the current mode. Derived on every call, never stored.
    pub fn page_order(&self) -> Vec<WizardPage> {
        page_order(self.mode, self.needs_bootstrap)
    }

    pub fn current_index(&self) -> usize {
        self.position
    }

    pub fn current_page(&self) -> WizardPage {
        let order = self.page_order();
        debug_assert!(self.position < order.len(), "position out of range");
        order[self.position]
    }

    pub fn is_last_page(&self) -> bool {
        self.position + 1 == self.page_order().len()
    }

    /// Page the host is currently showing.
    pub fn visible_page(&self) -> Option<WizardPage> {
        self.visible
    }

    pub fn is_open(&self) -> bool {
        self.visible.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Label for the forward button.
    pub fn button_title(&self) -> &'static str {
        if self.is_last_page() { "Finish" } else { "Next" }
    }

    /// Whether the forward button should be enabled. Only the permissions
    /// page holds the user back, and only until required grants are in.
    pub fn next_enabled(&self) -> bool {
        match self.current_page() {
            WizardPage::Permissions => self
                .permissions
                .as_ref()
                .is_some_and(permissions::required_granted),
            _ => true,
        }
    }

    pub fn permission_guidance(&self) -> String {
        permissions::guidance(self.permissions.as_ref())
    }

    pub fn permissions(&self) -> Option<&PermissionSnapshot> {
        self.permissions.as_ref()
    }

    pub fn peer_probe(&self) -> Option<&PeerProbeResult> {
        self.peer_probe.as_ref()
    }

    /// True when discovery found the service this app expects, so the
    /// connection page can offer to skip setup.
    pub fn peer_already_running(&self) -> bool {
        self.peer_probe.as_ref().is_some_and(|p| p.matches_expected)
    }

    /// Kinds with a live handle.
    pub fn live_monitors(&self) -> Vec<MonitorKind> {
        self.monitors.keys().copied().collect()
    }

    pub fn auth_state(&self) -> AuthFlowState {
        self.auth.state()
    }

    pub fn auth_status(&self) -> Option<&str> {
        self.auth.status()
    }

    pub fn authorize_url(&self) -> Option<&str> {
        self.auth.authorize_url()
    }

    pub fn auth_connected(&self) -> bool {
        self.auth.is_connected()
    }

    /// A clipboard code is waiting for [`Self::confirm_detected_code`].
    pub fn has_detected_code(&self) -> bool {
        self.auth.has_detected_code()
    }

    pub fn auto_detect_clipboard(&self) -> bool {
        self.auth.auto_detect_clipboard()
    }

    pub fn auto_connect_clipboard(&self) -> bool {
        self.auth.auto_connect_clipboard()
    }

    pub fn show_advanced_connection(&self) -> bool {
        self.show_advanced_connection
    }

    pub fn set_show_advanced_connection(&mut self, show: bool) {
        self.show_advanced_connection = show;
    }

    /// True exactly once, the first time the chat page is shown in this
    /// session. The host starts the bootstrap conversation when it is.
    pub fn take_chat_kickoff(&mut self) -> bool {
        std::mem::take(&mut self.pending_kickoff)
    }

    fn auth_page_visible(&self) -> bool {
        self.visible == Some(WizardPage::Auth)
    }

    /// The user was sent to the authorize URL.
    pub fn challenge_delivered(&mut self) -> bool {
        if !self.auth_page_visible() || !self.auth.challenge_delivered() {
            return false;
        }
        self.reconcile_monitors();
        true
    }

    /// A code typed or pasted by the user.
    pub fn submit_code(&mut self, raw: &str) -> bool {
        if !self.auth_page_visible() {
            return false;
        }
        let Some(request) = self.auth.submit_code(raw) else {
            return false;
        };
        self.start_exchange(request);
        self.reconcile_monitors();
        true
    }

    /// Use the code the clipboard watcher found.
    pub fn confirm_detected_code(&mut self) -> bool {
        if !self.auth_page_visible() {
            return false;
        }
        let Some(request) = self.auth.confirm_detected_code() else {
            return false;
        };
        self.start_exchange(request);
        self.reconcile_monitors();
        true
    }

    /// Start over with a new challenge after a failure.
    pub fn retry_auth(&mut self) -> bool {
        if !self.auth_page_visible() {
            return false;
        }
        let provider = self.collaborators.auth.clone();
        let retried = self.auth.retry(provider.as_ref());
        self.reconcile_monitors();
        retried
    }

    pub fn set_auto_detect_clipboard(&mut self, enabled: bool) {
        self.auth.set_auto_detect_clipboard(enabled);
        self.reconcile_monitors();
    }

    pub fn set_auto_connect_clipboard(&mut self, enabled: bool) {
        self.auth.set_auto_connect_clipboard(enabled);
    }

    /// Side effects of a page becoming visible.
    pub(super) fn enter_page(&mut self, page: WizardPage) {
        tracing::debug!("Entering {} page", page);
        match page {
            WizardPage::Auth => {
                if self.auth.state() == AuthFlowState::Idle {
                    let provider = self.collaborators.auth.clone();
                    self.auth.request_challenge(provider.as_ref());
                }
            }
            WizardPage::Chat => {
                if !self.did_auto_kickoff {
                    self.did_auto_kickoff = true;
                    self.pending_kickoff = true;
                }
            }
            _ => {}
        }
    }

    /// Side effects of a page going away. Monitors are stopped by the
    /// caller's reconcile.
    pub(super) fn exit_page(&mut self, page: WizardPage) {
        tracing::debug!("Leaving {} page", page);
        if page == WizardPage::Auth {
            self.auth.reset();
        }
    }
}
