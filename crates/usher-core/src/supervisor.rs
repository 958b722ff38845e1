//! Session supervision
//!
//! The supervisor reacts to play requests from the catalog UI, drives
//! negotiation, resolution, session start and reporter attachment in
//! sequence, and guarantees that at most one playback session is alive at
//! any time. It owns the "current player" state explicitly; nothing here
//! is process-wide.

use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::{
    codec::{negotiate, CodecProbe},
    error::{Error, Result},
    resolve::SourceResolver,
    session::{EngineEvents, EngineFactory, PlaybackSession},
    sync::{StateSink, SyncReporter},
    types::{AssetDescriptor, ControllerConfig, PlayVariant},
};

/// The live session together with its attachments
struct ActiveSession {
    session: Arc<PlaybackSession>,
    reporter: SyncReporter,
    pump: JoinHandle<()>,
}

/// Drives play requests end to end and owns the single live session
pub struct SessionSupervisor {
    config: ControllerConfig,
    probe: Arc<dyn CodecProbe>,
    factory: Arc<dyn EngineFactory>,
    sink: Arc<dyn StateSink>,
    resolver: SourceResolver,
    active: RwLock<Option<ActiveSession>>,
}

impl SessionSupervisor {
    pub fn new(
        config: ControllerConfig,
        probe: Arc<dyn CodecProbe>,
        factory: Arc<dyn EngineFactory>,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        let resolver = SourceResolver::new(config.server_address.clone());
        Self {
            config,
            probe,
            factory,
            sink,
            resolver,
            active: RwLock::new(None),
        }
    }

    /// Start playback of an asset, superseding any current session.
    ///
    /// Resolution runs first: a resolution failure is returned to the
    /// caller and the live session, if any, is left untouched. On success
    /// the previous session is torn down before the new one starts, its
    /// reporter is discarded, and a fresh reporter is attached to the new
    /// session.
    #[instrument(skip(self, asset), fields(asset = %asset.name, variant = ?variant))]
    pub async fn request_play(
        &self,
        asset: &AssetDescriptor,
        variant: PlayVariant,
    ) -> Result<Arc<PlaybackSession>> {
        let source = match variant {
            PlayVariant::Negotiated => {
                let playable =
                    negotiate(self.probe.as_ref(), &asset.codecs, &asset.transcoded_codecs);
                self.resolver.resolve(asset, &playable)?
            }
            PlayVariant::Transmuxed => self.resolver.resolve_transmuxed(asset)?,
        };

        self.shutdown_active().await;

        let session = Arc::new(PlaybackSession::new(Arc::clone(&self.factory)));
        let events = session.start(source).await?;

        // The reporter subscribes before any engine event is pumped, so the
        // first position report cannot race past it.
        let reporter = SyncReporter::attach(
            Arc::clone(&session),
            Arc::clone(&self.sink),
            self.config.sync_interval_secs,
        );
        let pump = spawn_event_pump(Arc::clone(&session), events);

        info!(session_id = %session.id(), "Playback session started");

        *self.active.write().await = Some(ActiveSession {
            session: Arc::clone(&session),
            reporter,
            pump,
        });

        Ok(session)
    }

    /// Tear down the active session, if any. Idempotent.
    ///
    /// Detaches the reporter first so it cannot emit against the released
    /// engine, then releases the engine, then cancels the event pump; any
    /// notification still in flight from the superseded session lands in a
    /// closed channel and disappears.
    pub async fn shutdown_active(&self) {
        let Some(active) = self.active.write().await.take() else {
            return;
        };

        active.reporter.detach();
        active.session.teardown().await;
        active.pump.abort();
        info!(session_id = %active.session.id(), "Superseded session torn down");
    }

    /// The live session, if any
    pub async fn active_session(&self) -> Option<Arc<PlaybackSession>> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|active| Arc::clone(&active.session))
    }

    /// Resume playback on the live session.
    pub async fn play(&self) -> Result<()> {
        self.active_session()
            .await
            .ok_or(Error::NoActiveSession)?
            .play()
            .await
    }

    /// Pause the live session.
    pub async fn pause(&self) -> Result<()> {
        self.active_session()
            .await
            .ok_or(Error::NoActiveSession)?
            .pause()
            .await
    }

    /// Seek the live session to an absolute position.
    pub async fn seek(&self, position: f64) -> Result<()> {
        self.active_session()
            .await
            .ok_or(Error::NoActiveSession)?
            .seek(position)
            .await
    }

    /// Latest position of the live session, if any
    pub async fn position(&self) -> Option<f64> {
        self.active_session().await.map(|session| session.position())
    }
}

/// Forward engine notifications into the session until the engine's event
/// channel closes.
fn spawn_event_pump(session: Arc<PlaybackSession>, mut events: EngineEvents) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            session.handle_engine_event(event).await;
        }
        debug!(session_id = %session.id(), "Engine event channel closed");
    })
}
