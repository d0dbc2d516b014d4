//! In-memory collaborators for the onboarding tests.

pub mod helpers {
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use crate::config::{OnboardingConfig, SecretString};
    use crate::error::{CollaboratorError, Result};
    use crate::onboarding::collaborators::{
        AuthGrant, AuthProvider, Clipboard, PeerDiscovery, PermissionProbe,
    };
    use crate::onboarding::pkce::{Pkce, build_authorize_url};
    use crate::onboarding::store::{MemoryOnboardingStore, OnboardingRecord, OnboardingStore};
    use crate::onboarding::ticker::ManualClock;
    use crate::onboarding::types::*;
    use crate::onboarding::wizard::{Collaborators, WizardOrchestrator};

    /// A code the default pattern accepts.
    pub const VALID_CODE: &str = "Xk9fQ2mZp8LrT4vWbN3c#s7Gd1HhJq5Yt0uEwA2x";

    #[derive(Default)]
    pub struct MockClipboard {
        text: Mutex<Option<String>>,
        counter: AtomicU64,
    }

    impl MockClipboard {
        pub fn new() -> Self {
            Self::default()
        }

        /// Replace the clipboard text, bumping the change counter.
        pub fn set_text(&self, text: &str) {
            *self.text.lock().unwrap() = Some(text.to_string());
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Clipboard for MockClipboard {
        fn current_text(&self) -> Option<String> {
            self.text.lock().unwrap().clone()
        }

        fn change_counter(&self) -> u64 {
            self.counter.load(Ordering::SeqCst)
        }
    }

    /// Memory store that counts saves and can be made read-only.
    #[derive(Default)]
    pub struct RecordingStore {
        inner: MemoryOnboardingStore,
        saves: AtomicUsize,
        fail_saves: AtomicBool,
    }

    impl RecordingStore {
        /// Number of successful saves.
        pub fn saves(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }

        pub fn set_fail_saves(&self, fail: bool) {
            self.fail_saves.store(fail, Ordering::SeqCst);
        }
    }

    impl OnboardingStore for RecordingStore {
        fn load(&self) -> anyhow::Result<OnboardingRecord> {
            self.inner.load()
        }

        fn save(&self, record: &OnboardingRecord) -> anyhow::Result<()> {
            if self.fail_saves.load(Ordering::SeqCst) {
                anyhow::bail!("onboarding store is read-only");
            }
            self.inner.save(record)?;
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn clear(&self) -> anyhow::Result<()> {
            self.inner.clear()
        }
    }

    pub fn sample_peer() -> PeerProbeResult {
        PeerProbeResult {
            port: 18789,
            pid: 4242,
            command: "setupflow-gateway --port 18789".to_string(),
            matches_expected: true,
        }
    }

    enum DiscoveryBehavior {
        Return(Option<PeerProbeResult>),
        Fail,
        Stall,
        /// Waits for a permit from `release()` before answering
        Gated(Option<PeerProbeResult>),
    }

    pub struct MockDiscovery {
        behavior: DiscoveryBehavior,
        gate: Semaphore,
        calls: AtomicUsize,
    }

    impl MockDiscovery {
        fn with(behavior: DiscoveryBehavior) -> Self {
            Self {
                behavior,
                gate: Semaphore::new(0),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn returning(result: Option<PeerProbeResult>) -> Self {
            Self::with(DiscoveryBehavior::Return(result))
        }

        pub fn failing() -> Self {
            Self::with(DiscoveryBehavior::Fail)
        }

        pub fn stalled() -> Self {
            Self::with(DiscoveryBehavior::Stall)
        }

        pub fn gated(result: Option<PeerProbeResult>) -> Self {
            Self::with(DiscoveryBehavior::Gated(result))
        }

        pub fn release(&self) {
            self.gate.add_permits(1);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PeerDiscovery for MockDiscovery {
        async fn find_expected_peer(&self) -> Result<Option<PeerProbeResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                DiscoveryBehavior::Return(result) => Ok(result.clone()),
                DiscoveryBehavior::Fail => {
                    Err(CollaboratorError::Unavailable("discovery offline".to_string()))
                }
                DiscoveryBehavior::Stall => std::future::pending().await,
                DiscoveryBehavior::Gated(result) => {
                    if let Ok(permit) = self.gate.acquire().await {
                        permit.forget();
                    }
                    Ok(result.clone())
                }
            }
        }
    }

    pub struct MockPermissions {
        statuses: Mutex<BTreeMap<PermissionKind, PermissionStatus>>,
        failing: Mutex<BTreeSet<PermissionKind>>,
    }

    impl MockPermissions {
        pub fn all(status: PermissionStatus) -> Self {
            Self {
                statuses: Mutex::new(PermissionKind::ALL.iter().map(|k| (*k, status)).collect()),
                failing: Mutex::new(BTreeSet::new()),
            }
        }

        pub fn set(&self, kind: PermissionKind, status: PermissionStatus) {
            self.statuses.lock().unwrap().insert(kind, status);
        }

        pub fn fail(&self, kind: PermissionKind) {
            self.failing.lock().unwrap().insert(kind);
        }
    }

    #[async_trait]
    impl PermissionProbe for MockPermissions {
        async fn status(&self, kind: PermissionKind) -> Result<PermissionStatus> {
            if self.failing.lock().unwrap().contains(&kind) {
                return Err(CollaboratorError::Unavailable("TCC unavailable".to_string()));
            }
            Ok(self
                .statuses
                .lock()
                .unwrap()
                .get(&kind)
                .copied()
                .unwrap_or(PermissionStatus::Undetermined))
        }
    }

    pub fn sample_grant() -> AuthGrant {
        AuthGrant {
            access_token: SecretString::from("sk-ant-oat01-test"),
            refresh_token: Some(SecretString::from("sk-ant-ort01-test")),
            expires_in_secs: Some(3600),
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ExchangeBehavior {
        Succeed,
        Reject,
        Stall,
    }

    pub struct MockAuth {
        challenge_fails: bool,
        exchange: Mutex<ExchangeBehavior>,
        exchanged_codes: Mutex<Vec<String>>,
    }

    impl MockAuth {
        fn with(challenge_fails: bool, exchange: ExchangeBehavior) -> Self {
            Self {
                challenge_fails,
                exchange: Mutex::new(exchange),
                exchanged_codes: Mutex::new(Vec::new()),
            }
        }

        pub fn succeeding() -> Self {
            Self::with(false, ExchangeBehavior::Succeed)
        }

        pub fn rejecting() -> Self {
            Self::with(false, ExchangeBehavior::Reject)
        }

        pub fn stalling() -> Self {
            Self::with(false, ExchangeBehavior::Stall)
        }

        pub fn failing_challenge() -> Self {
            Self::with(true, ExchangeBehavior::Succeed)
        }

        pub fn exchanged_codes(&self) -> Vec<String> {
            self.exchanged_codes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AuthProvider for MockAuth {
        fn begin_challenge(&self) -> Result<Pkce> {
            if self.challenge_fails {
                return Err(CollaboratorError::Network("connection refused".to_string()));
            }
            Ok(Pkce::generate())
        }

        fn authorize_url(&self, pkce: &Pkce) -> String {
            build_authorize_url(
                "https://auth.test/authorize",
                "test-client",
                "https://auth.test/callback",
                "user:inference",
                pkce,
            )
        }

        async fn exchange(&self, code: &SecretString, _verifier: &SecretString) -> Result<AuthGrant> {
            self.exchanged_codes
                .lock()
                .unwrap()
                .push(code.expose_secret().to_string());
            let behavior = *self.exchange.lock().unwrap();
            match behavior {
                ExchangeBehavior::Succeed => Ok(sample_grant()),
                ExchangeBehavior::Reject => {
                    Err(CollaboratorError::Rejected("invalid_grant".to_string()))
                }
                ExchangeBehavior::Stall => std::future::pending().await,
            }
        }
    }

    /// A wizard wired to mocks, plus handles to drive them.
    pub struct TestWizard {
        pub wizard: WizardOrchestrator,
        pub clock: ManualClock,
        pub clipboard: Arc<MockClipboard>,
        pub discovery: Arc<MockDiscovery>,
        pub permissions: Arc<MockPermissions>,
        pub auth: Arc<MockAuth>,
        pub store: Arc<RecordingStore>,
    }

    pub struct TestWizardBuilder {
        config: OnboardingConfig,
        mode: ConnectionMode,
        needs_bootstrap: bool,
        discovery: MockDiscovery,
        permissions: MockPermissions,
        auth: MockAuth,
    }

    impl TestWizardBuilder {
        pub fn new(mode: ConnectionMode, needs_bootstrap: bool) -> Self {
            Self {
                config: OnboardingConfig::default(),
                mode,
                needs_bootstrap,
                discovery: MockDiscovery::returning(Some(sample_peer())),
                permissions: MockPermissions::all(PermissionStatus::Granted),
                auth: MockAuth::succeeding(),
            }
        }

        pub fn auto_connect(mut self, enabled: bool) -> Self {
            self.config.auto_connect_clipboard = enabled;
            self
        }

        pub fn auto_detect(mut self, enabled: bool) -> Self {
            self.config.auto_detect_clipboard = enabled;
            self
        }

        pub fn discovery(mut self, discovery: MockDiscovery) -> Self {
            self.discovery = discovery;
            self
        }

        pub fn permissions(mut self, permissions: MockPermissions) -> Self {
            self.permissions = permissions;
            self
        }

        pub fn auth(mut self, auth: MockAuth) -> Self {
            self.auth = auth;
            self
        }

        pub fn build(self) -> TestWizard {
            let clock = ManualClock::new();
            let clipboard = Arc::new(MockClipboard::new());
            let discovery = Arc::new(self.discovery);
            let permissions = Arc::new(self.permissions);
            let auth = Arc::new(self.auth);
            let store = Arc::new(RecordingStore::default());

            let collaborators = Collaborators {
                discovery: discovery.clone(),
                permissions: permissions.clone(),
                clipboard: clipboard.clone(),
                auth: auth.clone(),
                store: store.clone(),
            };
            let wizard = WizardOrchestrator::new(
                &self.config,
                collaborators,
                Arc::new(clock.clone()),
                self.mode,
                self.needs_bootstrap,
            )
            .unwrap();

            TestWizard {
                wizard,
                clock,
                clipboard,
                discovery,
                permissions,
                auth,
                store,
            }
        }
    }

    impl TestWizard {
        /// Wait until at least `n` results are queued, without applying them.
        pub async fn wait_queued(&self, n: usize) {
            tokio::time::timeout(Duration::from_secs(2), async {
                while self.wizard.queued_events() < n {
                    tokio::task::yield_now().await;
                }
            })
            .await
            .expect("monitor result never arrived");
        }

        /// Fire one tick, wait for `n` results and apply them.
        pub async fn tick_and_apply(&mut self, n: usize) -> usize {
            self.clock.tick();
            self.wait_queued(n).await;
            self.wizard.apply_pending()
        }

        /// Wait for the in-flight exchange to report back and apply it.
        pub async fn settle_exchange(&mut self) {
            self.wait_queued(1).await;
            self.wizard.apply_pending();
        }

        /// Walk forward until `page` is current.
        pub fn go_to(&mut self, page: WizardPage) {
            while self.wizard.current_page() != page {
                assert_ne!(
                    self.wizard.advance(),
                    Navigation::Finished,
                    "{} not in page order",
                    page
                );
            }
        }
    }
}
