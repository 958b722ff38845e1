//! Position sync reporting
//!
//! Forwards throttled playback-position updates to the remote state
//! service so playback can resume from any client. Sync is best-effort
//! telemetry: a failed delivery is logged and dropped, never allowed to
//! interrupt playback.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::{
    error::{Error, Result},
    session::PlaybackSession,
    types::{ControllerConfig, SessionState, SyncTick},
};

/// Remote sink for playback-state updates.
#[async_trait]
pub trait StateSink: Send + Sync {
    /// Deliver one state update.
    async fn push_state(&self, tick: &SyncTick) -> Result<()>;
}

/// Sink posting updates to `{serverAddress}/api/v1/state`.
///
/// Fire-and-forget: the service sends no meaningful response body and
/// callers only care about transport-level failure.
pub struct HttpStateSink {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpStateSink {
    pub fn new(config: &ControllerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        let endpoint = config.server_address.join("api/v1/state")?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl StateSink for HttpStateSink {
    async fn push_state(&self, tick: &SyncTick) -> Result<()> {
        self.client
            .post(self.endpoint.clone())
            .json(tick)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| Error::SyncDelivery(e.to_string()))?;

        debug!(playtime = tick.playtime, filename = %tick.filename, "State update delivered");
        Ok(())
    }
}

/// Quantizes a stream of raw engine positions down to at most one emission
/// per interval of elapsed playback.
///
/// An update passes when the floor of the position, taken modulo the
/// interval, is zero and that second has not been emitted before. This
/// bounds request volume regardless of how chatty the engine's native
/// notification cadence is. State is private to one reporter instance and
/// never shared across sessions.
#[derive(Debug)]
pub struct QuantizationFilter {
    interval: u64,
    last_forwarded: Option<u64>,
}

impl QuantizationFilter {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            last_forwarded: None,
        }
    }

    /// Offer a raw position; returns the quantized second to forward, or
    /// `None` when the update is suppressed.
    pub fn offer(&mut self, position: f64) -> Option<u64> {
        let second = position.floor() as u64;
        if second % self.interval != 0 {
            return None;
        }
        if self.last_forwarded == Some(second) {
            return None;
        }

        self.last_forwarded = Some(second);
        Some(second)
    }
}

/// Forwards quantized position updates from one session to a sink.
///
/// Attached to exactly one session for its lifetime; superseding a session
/// detaches its reporter, so a stale reporter never emits against a
/// torn-down engine. An in-flight delivery keeps the asset name captured
/// at filter-pass time even if the source changes before it completes.
pub struct SyncReporter {
    handle: JoinHandle<()>,
}

impl SyncReporter {
    /// Attach a fresh reporter to a session.
    pub fn attach(
        session: Arc<PlaybackSession>,
        sink: Arc<dyn StateSink>,
        interval: u64,
    ) -> Self {
        let mut positions = session.subscribe_position();
        let mut states = session.subscribe_state();
        let session_id = session.id();

        let handle = tokio::spawn(async move {
            let mut filter = QuantizationFilter::new(interval);
            loop {
                tokio::select! {
                    changed = positions.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let position = *positions.borrow_and_update();
                        let Some(second) = filter.offer(position) else {
                            continue;
                        };
                        let Some(source) = session.current_source().await else {
                            continue;
                        };

                        let tick = SyncTick {
                            filename: source.asset_name,
                            playtime: second,
                        };
                        if let Err(error) = sink.push_state(&tick).await {
                            // Best effort only; playback must not notice.
                            warn!(%error, session_id = %session_id, "State sync delivery failed");
                        }
                    }
                    changed = states.changed() => {
                        if changed.is_err()
                            || *states.borrow_and_update() == SessionState::TornDown
                        {
                            break;
                        }
                    }
                }
            }
            debug!(session_id = %session_id, "Sync reporter finished");
        });

        Self { handle }
    }

    /// Detach immediately, cancelling interest in pending updates.
    pub fn detach(&self) {
        self.handle.abort();
    }
}

impl Drop for SyncReporter {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
