//! Popup authorization handshake
//!
//! One [`AuthorizationHandshake`] drives a single provider card: it asks the
//! procedure service for an authorization URL, opens it in a centered popup,
//! then waits on the provider's redirect channel. The first redirect that
//! passes the [`DeliveryGuard`] is exchanged for a credential, which is handed
//! to the stamp store.
//!
//! The handshake is the client half of the flow and runs wherever the user's
//! wallet lives. The HTTP service only relays callbacks: it publishes each
//! one on its own [`RedirectHub`] for clients embedded in the same process,
//! and hands the same message to browser clients through the callback page.

pub mod channel;
pub mod guard;
pub mod popup;
pub mod procedure;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

pub use channel::{channel_name, RedirectHub, RedirectSubscription};
pub use guard::{Admission, DeliveryGuard, DEFAULT_DELIVERY_WINDOW};
pub use popup::{LoggingPopupOpener, PopupGeometry, PopupOpener};
pub use procedure::{AuthUrlSource, ProcedureClient};

use crate::issuance::{
    CredentialIssuer, HttpCredentialIssuer, Signer, Stamp, StampRequest, StampStore,
};
use crate::models::{HandshakeError, IssuanceError, Proofs, RedirectMessage};
use crate::settings::HandshakeSettings;
use crate::utils::logging::LoggingHelper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    AwaitingRedirect,
    Verifying,
}

/// What happened to one redirect message
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeOutcome {
    /// Addressed to another provider
    Ignored,
    /// Dropped as a duplicate delivery
    Suppressed,
    Issued(Stamp),
    /// Verification or storage failed; details are logged only
    NotIssued,
}

/// External collaborators of a handshake
#[derive(Clone)]
pub struct HandshakeServices {
    pub auth_urls: Arc<dyn AuthUrlSource>,
    pub popup: Arc<dyn PopupOpener>,
    pub issuer: Arc<dyn CredentialIssuer>,
    pub signer: Arc<dyn Signer>,
    pub store: Arc<dyn StampStore>,
}

impl HandshakeServices {
    /// HTTP procedure and issuer clients from settings, with a logging popup opener
    #[must_use]
    pub fn from_settings(
        settings: &HandshakeSettings,
        http: &reqwest::Client,
        signer: Arc<dyn Signer>,
        store: Arc<dyn StampStore>,
    ) -> Self {
        Self {
            auth_urls: Arc::new(ProcedureClient::new(&settings.procedure_url, http.clone())),
            popup: Arc::new(LoggingPopupOpener),
            issuer: Arc::new(HttpCredentialIssuer::new(&settings.issuer_url, http.clone())),
            signer,
            store,
        }
    }
}

pub struct AuthorizationHandshake {
    provider_id: String,
    target: String,
    callback: String,
    version: String,
    geometry: PopupGeometry,
    state: HandshakeState,
    guard: DeliveryGuard,
    services: HandshakeServices,
}

impl AuthorizationHandshake {
    /// Handshake for `provider_id` (e.g. `Github`) whose popup redirects to `callback`
    #[must_use]
    pub fn new(
        provider_id: &str,
        callback: impl Into<String>,
        settings: &HandshakeSettings,
        services: HandshakeServices,
    ) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            target: provider_id.to_lowercase(),
            callback: callback.into(),
            version: settings.version.clone(),
            geometry: PopupGeometry::from_settings(settings),
            state: HandshakeState::Idle,
            guard: DeliveryGuard::new(Duration::from_millis(settings.debounce_ms)),
            services,
        }
    }

    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Redirect target this handshake answers to
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state == HandshakeState::Verifying
    }

    /// Listen on this provider's redirect channel
    ///
    /// Keep the subscription for as long as the initiating view is
    /// interested; dropping it releases the listener.
    #[must_use]
    pub fn subscribe(&self, hub: &RedirectHub) -> RedirectSubscription {
        hub.subscribe(&channel_name(&self.target))
    }

    /// Fetch the authorization URL and open it in the popup
    ///
    /// # Errors
    ///
    /// Returns the `HandshakeError` from the URL source or the popup opener;
    /// the handshake is then back in `Idle`.
    pub async fn start(&mut self) -> Result<(), HandshakeError> {
        let result = self.open_authorization_window().await;
        self.state = match &result {
            Ok(()) => HandshakeState::AwaitingRedirect,
            Err(e) => {
                log::warn!("Authorization for {} not started: {e}", self.provider_id);
                HandshakeState::Idle
            }
        };
        result
    }

    async fn open_authorization_window(&self) -> Result<(), HandshakeError> {
        let auth_url = self
            .services
            .auth_urls
            .generate_auth_url(&self.target, &self.callback)
            .await?;
        self.services.popup.open(&auth_url, &self.geometry)
    }

    /// Process one redirect message
    pub async fn handle_message(&mut self, message: RedirectMessage) -> HandshakeOutcome {
        if message.target != self.target {
            LoggingHelper::log_redirect_ignored(&self.target, &message.target);
            return HandshakeOutcome::Ignored;
        }
        let admission = self.guard.admit(&message.delivery_id(), Instant::now());
        if let Admission::Suppressed { same_delivery } = admission {
            LoggingHelper::log_redirect_suppressed(&self.provider_id, same_delivery);
            return HandshakeOutcome::Suppressed;
        }

        self.state = HandshakeState::Verifying;
        let outcome = match self.issue(message).await {
            Ok(stamp) => {
                LoggingHelper::log_stamp_saved(&self.provider_id);
                HandshakeOutcome::Issued(stamp)
            }
            Err(e) => {
                LoggingHelper::log_stamp_failed(&self.provider_id, &e);
                HandshakeOutcome::NotIssued
            }
        };
        self.guard.mark_processed(Instant::now());
        self.state = HandshakeState::Idle;
        outcome
    }

    async fn issue(&self, message: RedirectMessage) -> Result<Stamp, IssuanceError> {
        LoggingHelper::log_saving_stamp(&self.provider_id, &message.data.state);
        let request = StampRequest {
            provider_type: self.provider_id.clone(),
            version: self.version.clone(),
            address: self.services.signer.address(),
            proofs: Proofs::new(message.data.state, message.data.code),
        };
        let issued = self
            .services
            .issuer
            .fetch_verifiable_credential(&request, self.services.signer.as_ref())
            .await?;

        let stamp = Stamp::new(self.provider_id.clone(), issued.credential);
        self.services.store.add_stamp(stamp.clone()).await?;
        Ok(stamp)
    }

    /// Consume redirects until one is processed
    ///
    /// Returns `None` if the channel closes first.
    pub async fn listen(
        &mut self,
        subscription: &mut RedirectSubscription,
    ) -> Option<HandshakeOutcome> {
        while let Some(message) = subscription.recv().await {
            match self.handle_message(message).await {
                HandshakeOutcome::Ignored | HandshakeOutcome::Suppressed => {}
                outcome => return Some(outcome),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issuance::MemoryStampStore;
    use crate::testing::constants::TEST_ADDRESS;
    use crate::testing::mock::{
        MockAuthUrlSource, MockCredentialIssuer, MockSigner, RecordingPopupOpener,
    };

    const CALLBACK: &str = "http://localhost:8080/github/callback";

    struct Harness {
        handshake: AuthorizationHandshake,
        auth_urls: Arc<MockAuthUrlSource>,
        popup: Arc<RecordingPopupOpener>,
        issuer: Arc<MockCredentialIssuer>,
        store: Arc<MemoryStampStore>,
    }

    fn harness(auth_urls: MockAuthUrlSource, issuer: MockCredentialIssuer) -> Harness {
        let auth_urls = Arc::new(auth_urls);
        let popup = Arc::new(RecordingPopupOpener::default());
        let issuer = Arc::new(issuer);
        let store = Arc::new(MemoryStampStore::new());
        let services = HandshakeServices {
            auth_urls: auth_urls.clone(),
            popup: popup.clone(),
            issuer: issuer.clone(),
            signer: Arc::new(MockSigner::new(TEST_ADDRESS)),
            store: store.clone(),
        };
        let handshake = AuthorizationHandshake::new(
            "Github",
            CALLBACK,
            &HandshakeSettings::default(),
            services,
        );
        Harness {
            handshake,
            auth_urls,
            popup,
            issuer,
            store,
        }
    }

    fn issuing() -> Harness {
        harness(
            MockAuthUrlSource::returning("https://a"),
            MockCredentialIssuer::issuing(),
        )
    }

    #[test]
    fn test_target_is_lowercased_provider() {
        let h = issuing();
        assert_eq!(h.handshake.provider_id(), "Github");
        assert_eq!(h.handshake.target(), "github");
        assert_eq!(h.handshake.state(), HandshakeState::Idle);
    }

    #[test]
    fn test_services_from_settings() {
        let services = HandshakeServices::from_settings(
            &HandshakeSettings::default(),
            &reqwest::Client::new(),
            Arc::new(MockSigner::new(TEST_ADDRESS)),
            Arc::new(MemoryStampStore::new()),
        );
        assert_eq!(services.signer.address(), TEST_ADDRESS);
        let geometry = PopupGeometry::centered(1920, 1080, 600, 800);
        assert!(services.popup.open("https://a", &geometry).is_ok());
    }

    #[tokio::test]
    async fn test_start_opens_centered_popup() {
        let mut h = harness(
            MockAuthUrlSource::returning("https://auth.example/authorize"),
            MockCredentialIssuer::issuing(),
        );
        h.handshake.start().await.unwrap();

        assert_eq!(h.handshake.state(), HandshakeState::AwaitingRedirect);
        assert_eq!(
            h.auth_urls.requests(),
            vec![("github".to_string(), CALLBACK.to_string())]
        );
        let opened = h.popup.opened();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].0, "https://auth.example/authorize");
        assert_eq!(opened[0].1, PopupGeometry::centered(1920, 1080, 600, 800));
    }

    #[tokio::test]
    async fn test_start_failure_stays_idle() {
        let mut h = harness(
            MockAuthUrlSource::failing(),
            MockCredentialIssuer::issuing(),
        );
        let result = h.handshake.start().await;

        assert!(matches!(result, Err(HandshakeError::AuthUrl(_))));
        assert_eq!(h.handshake.state(), HandshakeState::Idle);
        assert!(h.popup.opened().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_target_ignored() {
        let mut h = issuing();
        let outcome = h
            .handshake
            .handle_message(RedirectMessage::new("twitter", "code", "state"))
            .await;

        assert_eq!(outcome, HandshakeOutcome::Ignored);
        assert_eq!(h.issuer.calls(), 0);
    }

    #[tokio::test]
    async fn test_redirect_issues_and_stores_stamp() {
        let mut h = issuing();
        let outcome = h
            .handshake
            .handle_message(RedirectMessage::new("github", "code-1", "state-1"))
            .await;

        assert!(
            matches!(outcome, HandshakeOutcome::Issued(ref stamp) if stamp.provider == "Github")
        );
        assert_eq!(h.handshake.state(), HandshakeState::Idle);
        assert!(!h.handshake.is_loading());

        let request = h.issuer.last_request().unwrap();
        assert_eq!(request.provider_type, "Github");
        assert_eq!(request.version, "0.0.0");
        assert_eq!(request.address, TEST_ADDRESS);
        assert_eq!(request.proofs, Proofs::new("state-1", "code-1"));
        assert!(h.store.get("Github").is_some());
    }

    #[tokio::test]
    async fn test_issuer_failure_returns_to_idle() {
        let mut h = harness(
            MockAuthUrlSource::returning("https://a"),
            MockCredentialIssuer::failing(),
        );
        let outcome = h
            .handshake
            .handle_message(RedirectMessage::new("github", "code", "state"))
            .await;

        assert_eq!(outcome, HandshakeOutcome::NotIssued);
        assert_eq!(h.handshake.state(), HandshakeState::Idle);
        assert!(h.store.stamps().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_redirects_issue_once() {
        let mut h = issuing();
        let message = RedirectMessage::new("github", "code", "state");

        let first = h.handshake.handle_message(message.clone()).await;
        assert!(matches!(first, HandshakeOutcome::Issued(_)));
        tokio::time::advance(Duration::from_millis(100)).await;
        let repeat = h.handshake.handle_message(message.clone()).await;
        assert_eq!(repeat, HandshakeOutcome::Suppressed);
        assert_eq!(h.issuer.calls(), 1);

        tokio::time::advance(Duration::from_millis(400)).await;
        let later = h.handshake.handle_message(message).await;
        assert!(matches!(later, HandshakeOutcome::Issued(_)));
        assert_eq!(h.issuer.calls(), 2);
    }

    #[tokio::test]
    async fn test_listen_skips_foreign_messages() {
        let hub = RedirectHub::new();
        let mut h = issuing();
        let mut subscription = h.handshake.subscribe(&hub);
        assert_eq!(subscription.name(), "github_oauth_channel");

        hub.publish("github_oauth_channel", RedirectMessage::new("twitter", "c", "s"));
        hub.publish("github_oauth_channel", RedirectMessage::new("github", "c", "s"));

        let outcome = h.handshake.listen(&mut subscription).await;
        assert!(matches!(outcome, Some(HandshakeOutcome::Issued(_))));
        assert_eq!(h.issuer.calls(), 1);
    }
}
