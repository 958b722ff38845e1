//! Playback session lifecycle
//!
//! Owns exactly one live playback-engine instance at a time and drives the
//! `Idle -> Loading -> Playing <-> Paused -> TornDown` machine around it:
//! - `start` acquires the engine resource, `teardown` is the guaranteed
//!   release, invoked on every exit path
//! - the resume seek is issued only after the engine reports readiness
//! - the latest engine-reported position is exposed to subscribers over a
//!   watch channel, without additional buffering

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::{Error, Result},
    types::{SessionId, SessionState, SourceDescriptor},
};

/// One live instance of the external decode/playback engine.
///
/// Created bound to a single source; the owning session is the only holder
/// and releases it with an explicit `shutdown` before dropping it.
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Begin or resume playback.
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the source loaded.
    async fn pause(&self) -> Result<()>;

    /// Jump to an absolute position in seconds. Undefined behavior in the
    /// engine before it has reported readiness; the session never calls
    /// this earlier.
    async fn seek(&self, position: f64) -> Result<()>;

    /// Latest position known to the engine, in seconds.
    async fn position(&self) -> f64;

    /// Release decode resources. Called exactly once per instance.
    async fn shutdown(&self);
}

/// Notifications delivered by an engine to its owning session.
///
/// Cadence of `TimeUpdate` is engine-determined and may be sub-second.
/// Updates arrive in non-decreasing position order except immediately
/// after a seek, where one lower position is expected.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Source loaded; safe to seek and play
    Ready,
    /// Periodic position report in seconds
    TimeUpdate(f64),
    /// Fatal load or decode failure
    Fatal(String),
}

/// Event stream of one engine instance; closes when the instance dies
pub type EngineEvents = mpsc::Receiver<EngineEvent>;

/// Creates engine instances bound to a resolved source.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    /// Instantiate an engine for the given source. The returned receiver
    /// carries the instance's notifications for its whole lifetime.
    async fn create(
        &self,
        source: &SourceDescriptor,
    ) -> Result<(Box<dyn PlaybackEngine>, EngineEvents)>;
}

/// Playback session wrapping exactly one live engine instance
pub struct PlaybackSession {
    /// Unique session ID
    id: SessionId,
    /// Engine factory used by `start`
    factory: Arc<dyn EngineFactory>,
    /// The live engine instance, if any
    engine: RwLock<Option<Box<dyn PlaybackEngine>>>,
    /// Currently loaded source
    source: RwLock<Option<SourceDescriptor>>,
    /// Lifecycle state broadcaster
    state_tx: watch::Sender<SessionState>,
    /// Latest engine-reported position broadcaster
    position_tx: watch::Sender<f64>,
    /// Last fatal error, kept until the next `start`
    last_error: RwLock<Option<Error>>,
}

impl PlaybackSession {
    /// Create an idle session; no engine instance exists yet.
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let (position_tx, _) = watch::channel(0.0);

        Self {
            id: SessionId::new(),
            factory,
            engine: RwLock::new(None),
            source: RwLock::new(None),
            state_tx,
            position_tx,
            last_error: RwLock::new(None),
        }
    }

    /// Get session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Latest engine-reported position in seconds
    pub fn position(&self) -> f64 {
        *self.position_tx.borrow()
    }

    /// Subscribe to position updates. The channel holds only the latest
    /// value; a slow subscriber observes the newest position, not a backlog.
    pub fn subscribe_position(&self) -> watch::Receiver<f64> {
        self.position_tx.subscribe()
    }

    /// Currently loaded source, if any
    pub async fn current_source(&self) -> Option<SourceDescriptor> {
        self.source.read().await.clone()
    }

    /// Last fatal error message, kept until the next `start`
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.as_ref().map(|e| e.to_string())
    }

    /// Load a source into a fresh engine instance.
    ///
    /// Valid from `Idle`, `TornDown` and `Error` only. Any instance left
    /// over from an errored run is shut down first. Returns the new
    /// engine's event stream; the embedder forwards each event to
    /// [`handle_engine_event`](Self::handle_engine_event).
    #[instrument(skip(self, source), fields(session_id = %self.id, url = %source.url))]
    pub async fn start(&self, source: SourceDescriptor) -> Result<EngineEvents> {
        let state = self.state();
        if !matches!(
            state,
            SessionState::Idle | SessionState::TornDown | SessionState::Error
        ) {
            return Err(Error::InvalidStateTransition {
                from: state.to_string(),
                to: SessionState::Loading.to_string(),
            });
        }

        // Explicit release of any instance a fatal error left behind.
        if let Some(previous) = self.engine.write().await.take() {
            previous.shutdown().await;
        }

        info!(asset = %source.asset_name, resume_at = source.resume_at, "Starting playback session");

        self.set_state(SessionState::Loading)?;
        *self.last_error.write().await = None;
        self.position_tx.send_replace(0.0);
        *self.source.write().await = Some(source.clone());

        match self.factory.create(&source).await {
            Ok((engine, events)) => {
                *self.engine.write().await = Some(engine);
                Ok(events)
            }
            Err(error) => {
                let message = error.to_string();
                self.fail(Error::EngineLoad(message.clone())).await;
                Err(Error::EngineLoad(message))
            }
        }
    }

    /// Handle one engine notification.
    pub async fn handle_engine_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::Ready => self.on_ready().await,
            EngineEvent::TimeUpdate(position) => {
                // Position reports are only meaningful while a source is
                // actively loaded; late events from a released engine are
                // dropped.
                if matches!(
                    self.state(),
                    SessionState::Playing | SessionState::Paused
                ) {
                    self.position_tx.send_replace(position);
                }
            }
            EngineEvent::Fatal(message) => {
                let error = if self.state() == SessionState::Loading {
                    Error::EngineLoad(message)
                } else {
                    Error::EngineDecode(message)
                };
                self.fail(error).await;
            }
        }
    }

    async fn on_ready(&self) {
        if self.state() != SessionState::Loading {
            debug!(state = %self.state(), "Ready event outside loading, ignoring");
            return;
        }

        let resume_at = self
            .current_source()
            .await
            .map(|source| source.resume_at)
            .unwrap_or(0);

        let guard = self.engine.read().await;
        let Some(engine) = guard.as_ref() else {
            return;
        };

        // Seek only after readiness, and only when there is a recorded
        // position to resume from.
        if resume_at > 0 {
            debug!(resume_at, "Resuming at recorded position");
            if let Err(error) = engine.seek(resume_at as f64).await {
                warn!(%error, "Resume seek failed");
            }
        }

        if let Err(error) = engine.play().await {
            drop(guard);
            self.fail(Error::EngineLoad(error.to_string())).await;
            return;
        }

        let _ = self.set_state(SessionState::Playing);
    }

    /// Resume playback after a pause. A no-op while already playing.
    pub async fn play(&self) -> Result<()> {
        match self.state() {
            SessionState::Paused => {
                if let Some(engine) = self.engine.read().await.as_ref() {
                    engine.play().await?;
                }
                self.set_state(SessionState::Playing)
            }
            SessionState::Playing => Ok(()),
            state => Err(Error::InvalidStateTransition {
                from: state.to_string(),
                to: SessionState::Playing.to_string(),
            }),
        }
    }

    /// Pause playback. A no-op while already paused.
    pub async fn pause(&self) -> Result<()> {
        match self.state() {
            SessionState::Playing => {
                if let Some(engine) = self.engine.read().await.as_ref() {
                    engine.pause().await?;
                }
                self.set_state(SessionState::Paused)
            }
            SessionState::Paused => Ok(()),
            state => Err(Error::InvalidStateTransition {
                from: state.to_string(),
                to: SessionState::Paused.to_string(),
            }),
        }
    }

    /// Seek to an absolute position. Valid while playing or paused.
    pub async fn seek(&self, position: f64) -> Result<()> {
        let state = self.state();
        if !matches!(state, SessionState::Playing | SessionState::Paused) {
            return Err(Error::InvalidStateTransition {
                from: state.to_string(),
                to: state.to_string(),
            });
        }

        if let Some(engine) = self.engine.read().await.as_ref() {
            engine.seek(position).await?;
        }
        Ok(())
    }

    /// Release the engine instance unconditionally.
    ///
    /// Idempotent: calling it twice, or on an idle session, is a no-op.
    /// Must run whenever the hosting view is dismissed or a new session
    /// replaces this one; a leaked instance keeps consuming decode
    /// resources against a defunct source.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn teardown(&self) {
        let engine = self.engine.write().await.take();
        if let Some(engine) = engine {
            info!("Releasing engine instance");
            engine.shutdown().await;
        }

        match self.state() {
            SessionState::Idle | SessionState::TornDown => {}
            _ => {
                let _ = self.set_state(SessionState::TornDown);
            }
        }
    }

    /// Transition to new state
    fn set_state(&self, target: SessionState) -> Result<()> {
        let current = self.state();
        if !current.can_transition_to(target) {
            return Err(Error::InvalidStateTransition {
                from: current.to_string(),
                to: target.to_string(),
            });
        }

        self.state_tx.send_replace(target);
        debug!(from = %current, to = %target, "Session state transition");
        Ok(())
    }

    async fn fail(&self, error: Error) {
        warn!(%error, "Session entered error state");
        *self.last_error.write().await = Some(error);
        let _ = self.set_state(SessionState::Error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{source_fixture, RecordingFactory};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_session_starts_idle() {
        let factory = Arc::new(RecordingFactory::default());
        let session = PlaybackSession::new(factory);

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.position(), 0.0);
        assert!(session.current_source().await.is_none());
    }

    #[tokio::test]
    async fn test_start_loads_and_ready_begins_playback() {
        let factory = Arc::new(RecordingFactory::default());
        let session = PlaybackSession::new(factory.clone());

        session.start(source_fixture(0)).await.unwrap();
        assert_eq!(session.state(), SessionState::Loading);

        session.handle_engine_event(EngineEvent::Ready).await;
        assert_eq!(session.state(), SessionState::Playing);

        // resume_at of zero issues no seek
        let calls = factory.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["create", "play"]);
    }

    #[tokio::test]
    async fn test_resume_seek_happens_after_ready_only() {
        let factory = Arc::new(RecordingFactory::default());
        let session = PlaybackSession::new(factory.clone());

        session.start(source_fixture(42)).await.unwrap();

        // No seek may be issued while the engine is still loading.
        assert_eq!(factory.calls.lock().unwrap().clone(), vec!["create"]);

        session.handle_engine_event(EngineEvent::Ready).await;

        let calls = factory.calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["create", "seek:42", "play"]);
    }

    #[tokio::test]
    async fn test_time_updates_expose_latest_position() {
        let factory = Arc::new(RecordingFactory::default());
        let session = PlaybackSession::new(factory);

        session.start(source_fixture(0)).await.unwrap();
        session.handle_engine_event(EngineEvent::Ready).await;

        session.handle_engine_event(EngineEvent::TimeUpdate(1.4)).await;
        session.handle_engine_event(EngineEvent::TimeUpdate(2.9)).await;
        assert_eq!(session.position(), 2.9);
    }

    #[tokio::test]
    async fn test_time_updates_before_ready_are_dropped() {
        let factory = Arc::new(RecordingFactory::default());
        let session = PlaybackSession::new(factory);

        session.start(source_fixture(0)).await.unwrap();
        session.handle_engine_event(EngineEvent::TimeUpdate(7.0)).await;
        assert_eq!(session.position(), 0.0);
    }

    #[tokio::test]
    async fn test_play_pause_toggle() {
        let factory = Arc::new(RecordingFactory::default());
        let session = PlaybackSession::new(factory);

        session.start(source_fixture(0)).await.unwrap();
        session.handle_engine_event(EngineEvent::Ready).await;

        session.pause().await.unwrap();
        assert_eq!(session.state(), SessionState::Paused);

        session.play().await.unwrap();
        assert_eq!(session.state(), SessionState::Playing);

        // Toggling into the current state is a no-op, not an error.
        session.play().await.unwrap();
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let factory = Arc::new(RecordingFactory::default());
        let session = PlaybackSession::new(factory.clone());

        session.start(source_fixture(0)).await.unwrap();
        session.handle_engine_event(EngineEvent::Ready).await;

        session.teardown().await;
        assert_eq!(session.state(), SessionState::TornDown);
        assert_eq!(factory.live.load(Ordering::SeqCst), 0);

        // Second call must be a no-op.
        session.teardown().await;
        assert_eq!(session.state(), SessionState::TornDown);

        let shutdowns = factory
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| *c == "shutdown")
            .count();
        assert_eq!(shutdowns, 1);
    }

    #[tokio::test]
    async fn test_teardown_on_idle_is_noop() {
        let factory = Arc::new(RecordingFactory::default());
        let session = PlaybackSession::new(factory);

        session.teardown().await;
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_fatal_during_loading_is_load_failure() {
        let factory = Arc::new(RecordingFactory::default());
        let session = PlaybackSession::new(factory);

        session.start(source_fixture(0)).await.unwrap();
        session
            .handle_engine_event(EngineEvent::Fatal("container rejected".to_string()))
            .await;

        assert_eq!(session.state(), SessionState::Error);
        let message = session.last_error().await.unwrap();
        assert!(message.contains("load"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn test_fatal_while_playing_then_fresh_start_recovers() {
        let factory = Arc::new(RecordingFactory::default());
        let session = PlaybackSession::new(factory.clone());

        session.start(source_fixture(0)).await.unwrap();
        session.handle_engine_event(EngineEvent::Ready).await;
        session
            .handle_engine_event(EngineEvent::Fatal("decode failure".to_string()))
            .await;
        assert_eq!(session.state(), SessionState::Error);

        // The only recovery path from Error is a fresh start; the defunct
        // instance is released before the new one is created.
        session.start(source_fixture(0)).await.unwrap();
        assert_eq!(session.state(), SessionState::Loading);
        assert_eq!(factory.live.load(Ordering::SeqCst), 1);
        assert!(session.last_error().await.is_none());
    }

    #[tokio::test]
    async fn test_start_rejected_while_playing() {
        let factory = Arc::new(RecordingFactory::default());
        let session = PlaybackSession::new(factory);

        session.start(source_fixture(0)).await.unwrap();
        session.handle_engine_event(EngineEvent::Ready).await;

        let result = session.start(source_fixture(0)).await;
        assert!(matches!(
            result,
            Err(Error::InvalidStateTransition { .. })
        ));
    }
}
