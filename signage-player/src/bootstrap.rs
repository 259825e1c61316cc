//! Startup state machine that turns an unpaired device into a paired screen.

use std::time::Duration;

use anyhow::Context;
use signage_shared::pairing::{PairedScreen, PairingStatus};
use tokio::sync::watch;
use tokio::time::{Instant, interval_at, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::identity::ensure_device_id;
use crate::server::PairingApi;
use crate::store::{PlayerCredentials, PlayerStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapState {
    Initializing,
    Pairing {
        device_id: String,
        pairing_code: String,
    },
    Paired(PlayerCredentials),
    Error(String),
}

impl BootstrapState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BootstrapState::Paired(_) | BootstrapState::Error(_))
    }
}

pub struct PlayerBootstrap<A> {
    api: A,
    store: PlayerStore,
    poll_interval: Duration,
    state: watch::Sender<BootstrapState>,
}

impl<A: PairingApi> PlayerBootstrap<A> {
    pub fn new(api: A, store: PlayerStore, poll_interval: Duration) -> Self {
        let (state, _) = watch::channel(BootstrapState::Initializing);
        Self {
            api,
            store,
            poll_interval,
            state,
        }
    }

    /// Follows every state transition, starting from the current one.
    pub fn subscribe(&self) -> watch::Receiver<BootstrapState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> BootstrapState {
        self.state.borrow().clone()
    }

    /// Drives the device to `Paired` or `Error`.
    ///
    /// Returns early with the current state when `shutdown` fires.
    pub async fn run(&self, shutdown: CancellationToken) -> BootstrapState {
        self.transition(BootstrapState::Initializing);

        match self.store.load() {
            Ok(stored) => {
                if let Some(credentials) = stored.credentials() {
                    info!("using stored screen credentials");
                    return self.transition(BootstrapState::Paired(credentials));
                }
            }
            Err(e) => return self.fail(e.context("Failed to load player state")),
        }

        let device_id = match ensure_device_id(&self.store) {
            Ok(id) => id,
            Err(e) => return self.fail(e),
        };

        loop {
            let response = tokio::select! {
                _ = shutdown.cancelled() => return self.state(),
                res = self.api.initiate_pairing(&device_id) => match res {
                    Ok(response) => response,
                    Err(e) => return self.fail(e.context("Failed to initiate pairing")),
                },
            };

            let pairing_code = response.pairing_code;
            info!(%device_id, %pairing_code, "waiting for an administrator to pair this screen");
            self.transition(BootstrapState::Pairing {
                device_id: device_id.clone(),
                pairing_code,
            });

            // a zero lifetime means the server did not say, so keep polling
            let deadline = (response.expires_in > 0)
                .then(|| Instant::now() + Duration::from_secs(response.expires_in));
            match self.poll_until_paired(&device_id, deadline, &shutdown).await {
                Some(state) => return state,
                None => info!(%device_id, "pairing code expired, requesting a new one"),
            }
        }
    }

    /// Polls until paired or cancelled. Returns `None` once the code's
    /// lifetime is over; a last status check runs at the deadline so a
    /// pairing completed just before expiry is not lost.
    async fn poll_until_paired(
        &self,
        device_id: &str,
        deadline: Option<Instant>,
        shutdown: &CancellationToken,
    ) -> Option<BootstrapState> {
        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        let expiry = async {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(expiry);

        loop {
            let expired = tokio::select! {
                _ = shutdown.cancelled() => return Some(self.state()),
                _ = ticker.tick() => false,
                _ = &mut expiry => true,
            };

            match self.api.pairing_status(device_id).await {
                Ok(PairingStatus::Paired(screen)) => return Some(self.complete(screen)),
                Ok(PairingStatus::Pending) => debug!(%device_id, "pairing still pending"),
                Err(e) => warn!(%device_id, "pairing status check failed: {e:#}"),
            }

            if expired {
                return None;
            }
        }
    }

    fn complete(&self, screen: PairedScreen) -> BootstrapState {
        let saved = self
            .store
            .update(|s| s.apply_pairing(&screen))
            .context("Failed to persist screen credentials");
        match saved.map(|s| s.credentials()) {
            Ok(Some(credentials)) => {
                info!(screen_id = %screen.screen_id, "screen paired");
                self.transition(BootstrapState::Paired(credentials))
            }
            Ok(None) => self.fail(anyhow::anyhow!("Server returned an empty auth token")),
            Err(e) => self.fail(e),
        }
    }

    fn fail(&self, e: anyhow::Error) -> BootstrapState {
        error!("bootstrap failed: {e:#}");
        self.transition(BootstrapState::Error(format!("{e:#}")))
    }

    fn transition(&self, next: BootstrapState) -> BootstrapState {
        self.state.send_replace(next.clone());
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use signage_shared::pairing::InitiatePairingResponse;
    use signage_shared::screen::ScreenId;

    const POLL: Duration = Duration::from_secs(5);

    #[derive(Default)]
    struct MockApi {
        fail_initiate: bool,
        /// Code lifetime handed out by `initiate_pairing`; 900 s when unset
        expires_in: Option<u64>,
        statuses: Mutex<VecDeque<Result<PairingStatus>>>,
        initiate_calls: AtomicUsize,
        status_calls: AtomicUsize,
    }

    impl MockApi {
        fn with_statuses(statuses: Vec<Result<PairingStatus>>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl PairingApi for MockApi {
        async fn initiate_pairing(&self, _device_id: &str) -> Result<InitiatePairingResponse> {
            let issued = self.initiate_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_initiate {
                return Err(anyhow!("connection refused"));
            }
            let pairing_code = match issued {
                0 => "ABC234".to_string(),
                n => format!("NEW{n:03}"),
            };
            Ok(InitiatePairingResponse {
                pairing_code,
                expires_in: self.expires_in.unwrap_or(900),
            })
        }

        async fn pairing_status(&self, _device_id: &str) -> Result<PairingStatus> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(PairingStatus::Pending))
        }
    }

    fn paired(screen: i64) -> Result<PairingStatus> {
        Ok(PairingStatus::Paired(PairedScreen {
            auth_token: "token-1".to_string(),
            screen_id: ScreenId::from(screen),
            playlist_id: Some("pl-1".to_string()),
            name: None,
        }))
    }

    fn store() -> (tempfile::TempDir, PlayerStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PlayerStore::new(dir.path().join("player-state.json"));
        (dir, store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_pairs_within_one_poll_interval() {
        let (_dir, store) = store();
        let api = MockApi::with_statuses(vec![paired(7)]);
        let bootstrap = PlayerBootstrap::new(api, store.clone(), POLL);

        let started = Instant::now();
        let state = bootstrap.run(CancellationToken::new()).await;

        assert!(started.elapsed() <= POLL);
        match state {
            BootstrapState::Paired(creds) => {
                assert_eq!(creds.auth_token, "token-1");
                assert_eq!(creds.screen_id, Some(ScreenId::from(7)));
            }
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(bootstrap.api.initiate_calls.load(Ordering::SeqCst), 1);

        let stored = store.load().unwrap();
        assert_eq!(stored.auth_token.as_deref(), Some("token-1"));
        assert_eq!(stored.playlist_id.as_deref(), Some("pl-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_code_is_published_before_pairing() {
        let (_dir, store) = store();
        let api = MockApi::with_statuses(vec![Ok(PairingStatus::Pending), paired(3)]);
        let bootstrap = PlayerBootstrap::new(api, store, POLL);
        let mut rx = bootstrap.subscribe();

        let watcher = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                let done = state.is_terminal();
                seen.push(state);
                if done {
                    break;
                }
            }
            seen
        });

        bootstrap.run(CancellationToken::new()).await;
        let seen = watcher.await.unwrap();

        assert!(seen.iter().any(|s| matches!(
            s,
            BootstrapState::Pairing { pairing_code, .. } if pairing_code == "ABC234"
        )));
        assert!(matches!(seen.last(), Some(BootstrapState::Paired(_))));
        assert_eq!(bootstrap.api.status_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initiation_failure_is_terminal() {
        let (_dir, store) = store();
        let api = MockApi {
            fail_initiate: true,
            ..MockApi::default()
        };
        let bootstrap = PlayerBootstrap::new(api, store, POLL);

        let state = bootstrap.run(CancellationToken::new()).await;

        match state {
            BootstrapState::Error(reason) => assert!(reason.contains("connection refused")),
            other => panic!("unexpected state {other:?}"),
        }
        assert_eq!(bootstrap.api.status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_errors_are_retried() {
        let (_dir, store) = store();
        let api = MockApi::with_statuses(vec![
            Err(anyhow!("timeout")),
            Err(anyhow!("503")),
            paired(9),
        ]);
        let bootstrap = PlayerBootstrap::new(api, store, POLL);

        let state = bootstrap.run(CancellationToken::new()).await;

        assert!(matches!(state, BootstrapState::Paired(_)));
        assert_eq!(bootstrap.api.status_calls.load(Ordering::SeqCst), 3);
        assert_eq!(bootstrap.api.initiate_calls.load(Ordering::SeqCst), 1);
    }

    fn pairing_codes(
        mut rx: watch::Receiver<BootstrapState>,
    ) -> tokio::task::JoinHandle<Vec<String>> {
        tokio::spawn(async move {
            let mut codes = Vec::new();
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                match state {
                    BootstrapState::Pairing { pairing_code, .. } => codes.push(pairing_code),
                    s if s.is_terminal() => break,
                    _ => {}
                }
            }
            codes
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_code_is_replaced() {
        let (_dir, store) = store();
        let api = MockApi {
            expires_in: Some(12),
            // polls at 5 s and 10 s, the last check at the 12 s deadline, then
            // the first poll of the new code at 17 s
            statuses: Mutex::new(
                vec![
                    Ok(PairingStatus::Pending),
                    Ok(PairingStatus::Pending),
                    Ok(PairingStatus::Pending),
                    paired(5),
                ]
                .into(),
            ),
            ..MockApi::default()
        };
        let bootstrap = PlayerBootstrap::new(api, store.clone(), POLL);
        let codes = pairing_codes(bootstrap.subscribe());

        let started = Instant::now();
        let state = bootstrap.run(CancellationToken::new()).await;

        assert!(matches!(state, BootstrapState::Paired(_)));
        assert_eq!(codes.await.unwrap(), vec!["ABC234", "NEW001"]);
        assert_eq!(bootstrap.api.initiate_calls.load(Ordering::SeqCst), 2);
        assert_eq!(bootstrap.api.status_calls.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(17));
        assert_eq!(store.load().unwrap().screen_id, Some(ScreenId::from(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pairing_at_expiry_is_not_lost() {
        let (_dir, store) = store();
        let api = MockApi {
            expires_in: Some(7),
            statuses: Mutex::new(vec![Ok(PairingStatus::Pending), paired(2)].into()),
            ..MockApi::default()
        };
        let bootstrap = PlayerBootstrap::new(api, store, POLL);

        let state = bootstrap.run(CancellationToken::new()).await;

        assert!(matches!(state, BootstrapState::Paired(_)));
        assert_eq!(bootstrap.api.initiate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_lifetime_keeps_the_code() {
        let (_dir, store) = store();
        let api = MockApi {
            expires_in: Some(0),
            ..MockApi::default()
        };
        let bootstrap = PlayerBootstrap::new(api, store, POLL);
        let shutdown = CancellationToken::new();

        let cancel = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            cancel.cancel();
        });
        let state = bootstrap.run(shutdown).await;

        assert!(matches!(
            state,
            BootstrapState::Pairing { ref pairing_code, .. } if pairing_code == "ABC234"
        ));
        assert_eq!(bootstrap.api.initiate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stored_token_skips_pairing() {
        let (_dir, store) = store();
        store
            .update(|s| {
                s.auth_token = Some("saved".to_string());
                s.screen_id = Some(ScreenId::from(4));
            })
            .unwrap();
        let bootstrap = PlayerBootstrap::new(MockApi::default(), store, POLL);

        let state = bootstrap.run(CancellationToken::new()).await;

        assert!(matches!(state, BootstrapState::Paired(ref c) if c.auth_token == "saved"));
        assert_eq!(bootstrap.api.initiate_calls.load(Ordering::SeqCst), 0);
        assert_eq!(bootstrap.api.status_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_pairing() {
        let (_dir, store) = store();
        let bootstrap = PlayerBootstrap::new(MockApi::default(), store, POLL);
        let shutdown = CancellationToken::new();

        let cancel = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(POLL * 3).await;
            cancel.cancel();
        });
        let state = bootstrap.run(shutdown).await;

        assert!(matches!(state, BootstrapState::Pairing { .. }));
        assert!(bootstrap.api.status_calls.load(Ordering::SeqCst) >= 2);
    }
}
