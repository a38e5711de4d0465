use std::{sync::Arc, time::Duration};

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use shared::domain::Directory;

pub mod api;
pub mod markup;
pub mod view;

pub use api::{ActivitiesApi, ApiError, HttpActivitiesApi};

/// How long sign-up banners stay visible before surfaces auto-hide them.
pub const SIGNUP_BANNER_TTL: Duration = Duration::from_secs(5);
/// How long unregister banners stay visible.
pub const UNREGISTER_BANNER_TTL: Duration = Duration::from_secs(4);

/// Static list-area message shown when the directory cannot be loaded.
pub const DIRECTORY_UNAVAILABLE_MESSAGE: &str =
    "Failed to load activities. Please try again later.";

const SIGNUP_FALLBACK_DETAIL: &str = "An error occurred";
const SIGNUP_TRANSPORT_MESSAGE: &str = "Failed to sign up. Please try again.";
const UNREGISTER_FALLBACK_DETAIL: &str = "Failed to unregister";
const UNREGISTER_TRANSPORT_MESSAGE: &str = "Failed to unregister. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

/// Transient message with an attached display lifetime. Surfaces hide the
/// banner once `ttl` has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub text: String,
    pub ttl: Duration,
}

impl Banner {
    fn success(text: impl Into<String>, ttl: Duration) -> Self {
        Self {
            kind: BannerKind::Success,
            text: text.into(),
            ttl,
        }
    }

    fn error(text: impl Into<String>, ttl: Duration) -> Self {
        Self {
            kind: BannerKind::Error,
            text: text.into(),
            ttl,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The rendered list and the selection options must be replaced with
    /// this snapshot.
    DirectoryReplaced { directory: Directory },
    /// The list area must display [`DIRECTORY_UNAVAILABLE_MESSAGE`].
    DirectoryUnavailable,
    BannerRaised(Banner),
}

struct DirectoryState {
    directory: Directory,
    /// Monotonic reload counter. A reload only applies its result while its
    /// own generation is still the latest; anything older is stale.
    reload_generation: u64,
}

/// Keeps the displayed activity directory consistent with server state and
/// mediates user actions against it.
///
/// The client holds only an ephemeral snapshot: every reload discards and
/// rebuilds it from the server's reply. Attached surfaces consume the
/// broadcast event stream; one-shot callers read method results directly.
pub struct DirectoryClient {
    api: Arc<dyn ActivitiesApi>,
    inner: Mutex<DirectoryState>,
    events: broadcast::Sender<ClientEvent>,
}

impl DirectoryClient {
    pub fn new(api: Arc<dyn ActivitiesApi>) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            api,
            inner: Mutex::new(DirectoryState {
                directory: Directory::new(),
                reload_generation: 0,
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Clone of the current snapshot.
    pub async fn directory(&self) -> Directory {
        self.inner.lock().await.directory.clone()
    }

    /// Fetches the directory once and replaces the snapshot. No retry; a
    /// failure surfaces as `DirectoryUnavailable` and the returned error.
    ///
    /// Overlapping reloads resolve by generation: a reload that finishes
    /// after a newer one has started drops its result instead of clobbering
    /// the fresher snapshot.
    pub async fn reload_directory(&self) -> Result<(), ApiError> {
        let generation = {
            let mut inner = self.inner.lock().await;
            inner.reload_generation += 1;
            inner.reload_generation
        };

        match self.api.fetch_directory().await {
            Ok(directory) => {
                let mut inner = self.inner.lock().await;
                if inner.reload_generation != generation {
                    debug!(generation, "directory: dropping stale reload result");
                    return Ok(());
                }
                inner.directory = directory.clone();
                info!(activities = directory.len(), "directory: snapshot replaced");
                let _ = self.events.send(ClientEvent::DirectoryReplaced { directory });
                Ok(())
            }
            Err(err) => {
                error!("directory: reload failed: {err}");
                let inner = self.inner.lock().await;
                if inner.reload_generation == generation {
                    let _ = self.events.send(ClientEvent::DirectoryUnavailable);
                }
                Err(err)
            }
        }
    }

    /// Registers `email` for `activity`. On success raises a success banner
    /// with the server's message and then refreshes the directory; a
    /// rejected or failed request raises an error banner and leaves the
    /// previous snapshot displayed.
    pub async fn sign_up(&self, activity: &str, email: &str) -> Result<String, ApiError> {
        match self.api.sign_up(activity, email).await {
            Ok(reply) => {
                info!(activity, "signup: accepted");
                let _ = self.events.send(ClientEvent::BannerRaised(Banner::success(
                    reply.message.clone(),
                    SIGNUP_BANNER_TTL,
                )));
                // Refresh follows the mutation response, and only on success.
                if let Err(err) = self.reload_directory().await {
                    warn!("signup: refresh after accepted sign-up failed: {err}");
                }
                Ok(reply.message)
            }
            Err(err) => {
                let text = match &err {
                    ApiError::Rejected { detail, .. } => {
                        warn!(activity, "signup: rejected by server");
                        detail
                            .clone()
                            .unwrap_or_else(|| SIGNUP_FALLBACK_DETAIL.to_string())
                    }
                    other => {
                        error!(activity, "signup: request failed: {other}");
                        SIGNUP_TRANSPORT_MESSAGE.to_string()
                    }
                };
                let _ = self
                    .events
                    .send(ClientEvent::BannerRaised(Banner::error(text, SIGNUP_BANNER_TTL)));
                Err(err)
            }
        }
    }

    /// Removes `email` from one activity's roster. Same contract as
    /// [`sign_up`](Self::sign_up), with the unregister banner lifetime.
    pub async fn unregister(&self, activity: &str, email: &str) -> Result<String, ApiError> {
        match self.api.unregister(activity, email).await {
            Ok(reply) => {
                info!(activity, "unregister: accepted");
                let _ = self.events.send(ClientEvent::BannerRaised(Banner::success(
                    reply.message.clone(),
                    UNREGISTER_BANNER_TTL,
                )));
                if let Err(err) = self.reload_directory().await {
                    warn!("unregister: refresh after accepted removal failed: {err}");
                }
                Ok(reply.message)
            }
            Err(err) => {
                let text = match &err {
                    ApiError::Rejected { detail, .. } => {
                        warn!(activity, "unregister: rejected by server");
                        detail
                            .clone()
                            .unwrap_or_else(|| UNREGISTER_FALLBACK_DETAIL.to_string())
                    }
                    other => {
                        error!(activity, "unregister: request failed: {other}");
                        UNREGISTER_TRANSPORT_MESSAGE.to_string()
                    }
                };
                let _ = self.events.send(ClientEvent::BannerRaised(Banner::error(
                    text,
                    UNREGISTER_BANNER_TTL,
                )));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
