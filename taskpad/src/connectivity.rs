//! Connectivity monitoring service.
//!
//! [`ConnectivityMonitor`] is an explicit service object constructed once at
//! process start and shared by handle — there is no ambient global. It
//! caches the current online/offline boolean and broadcasts transition
//! edges over a [`watch`] channel; steady state is never re-announced.
//!
//! The actual detection mechanism is pluggable via [`ConnectivityProbe`]:
//! the binary probes the remote base URL over HTTP, tests flip a
//! [`StaticProbe`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use url::Url;

/// One-shot asynchronous reachability check.
pub trait ConnectivityProbe: Send + Sync {
    /// Probes once, returning whether the network looks reachable.
    fn check(&self) -> impl std::future::Future<Output = bool> + Send;
}

/// Shared connectivity state with edge-only change notification.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the given initial state.
    #[must_use]
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        Self { state }
    }

    /// Current snapshot of the cached connectivity state.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.state.borrow()
    }

    /// Feeds a connectivity observation. Subscribers are notified only when
    /// the state actually transitions; returns whether it did.
    pub fn set_online(&self, online: bool) -> bool {
        self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        })
    }

    /// Subscribes to transition edges. The receiver observes the state at
    /// subscription time and is woken on every subsequent transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Runs a one-shot probe and folds the result into the cached state.
    ///
    /// Returns the probed value.
    pub async fn refresh<P: ConnectivityProbe>(&self, probe: &P) -> bool {
        let online = probe.check().await;
        if self.set_online(online) {
            tracing::info!(online, "connectivity changed");
        }
        online
    }
}

/// Probe that issues an HTTP HEAD request against the remote base URL.
///
/// Any response at all — including an error status — proves reachability;
/// only a transport-level failure (DNS, refused, timeout) counts as
/// offline.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    http: reqwest::Client,
    url: Url,
}

impl HttpProbe {
    /// Builds a probe against `url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`reqwest::Error`] if the client cannot be
    /// constructed.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent("taskpad/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self { http, url })
    }
}

impl ConnectivityProbe for HttpProbe {
    async fn check(&self) -> bool {
        match self.http.head(self.url.clone()).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "connectivity probe failed");
                false
            }
        }
    }
}

/// Probe with a fixed, flippable answer, for tests and offline mode.
#[derive(Debug, Default)]
pub struct StaticProbe {
    online: AtomicBool,
}

impl StaticProbe {
    /// Creates a probe that reports the given state.
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    /// Changes the reported state.
    pub fn set(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl ConnectivityProbe for StaticProbe {
    async fn check(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
