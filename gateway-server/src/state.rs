//! Application State
//!
//! Shared state for the gateway, accessible from all route handlers.

use identity_proof::{CircuitStore, ProvingBackend};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::services::{
    AccountService, PaymentAuthorizer, ProofTokenProtocol, RequestAuthenticator,
    SessionTokenIssuer, SigningHelper,
};
use crate::store::{CacheStore, Store};

/// Request-signing scheme a route is protected by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Rsa,
    Hmac,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    rsa: RequestAuthenticator,
    hmac: RequestAuthenticator,
    sessions: Arc<SessionTokenIssuer>,
    accounts: AccountService,
    proofs: ProofTokenProtocol,
    payments: PaymentAuthorizer,
    signing: SigningHelper,
    store: Arc<dyn Store>,
    start_time: Instant,
}

impl AppState {
    /// Build every service; fails without a secret or a loadable partner RSA key.
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        cache: Arc<dyn CacheStore>,
        backend: Arc<dyn ProvingBackend>,
    ) -> Result<Self> {
        if config.secret.is_empty() {
            return Err(GatewayError::KeyLoad("GATEWAY_SECRET is not set".into()));
        }

        let window = config.signature_window();
        let rsa = RequestAuthenticator::rsa(&config.secret, window, &config.public_key_path)?;
        let hmac = RequestAuthenticator::hmac(&config.secret, window);

        let sessions = Arc::new(SessionTokenIssuer::new(
            &config.secret,
            chrono::Duration::hours(config.access_token_expire_hours),
            chrono::Duration::days(config.refresh_token_expire_days),
        ));
        let accounts = AccountService::new(store.clone(), sessions.clone());
        let proofs = ProofTokenProtocol::new(
            backend,
            CircuitStore::new(&config.circuit_dir),
            store.clone(),
            cache,
            config.proof_cache_ttl(),
        )
        .single_use(config.single_use_proof_tokens);
        let payments = PaymentAuthorizer::new(store.clone());
        let signing = SigningHelper::new(&config.secret);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                rsa,
                hmac,
                sessions,
                accounts,
                proofs,
                payments,
                signing,
                store,
                start_time: Instant::now(),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn authenticator(&self, scheme: Scheme) -> &RequestAuthenticator {
        match scheme {
            Scheme::Rsa => &self.inner.rsa,
            Scheme::Hmac => &self.inner.hmac,
        }
    }

    pub fn sessions(&self) -> &SessionTokenIssuer {
        &self.inner.sessions
    }

    pub fn accounts(&self) -> &AccountService {
        &self.inner.accounts
    }

    pub fn proofs(&self) -> &ProofTokenProtocol {
        &self.inner.proofs
    }

    pub fn payments(&self) -> &PaymentAuthorizer {
        &self.inner.payments
    }

    pub fn signing(&self) -> &SigningHelper {
        &self.inner.signing
    }

    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get server uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }
}
