//! Recording fakes for the engine, probe and sink seams, shared by the
//! unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use url::Url;

use crate::error::{Error, Result};
use crate::session::{EngineEvent, EngineEvents, EngineFactory, PlaybackEngine};
use crate::sync::StateSink;
use crate::types::{AssetDescriptor, SourceDescriptor, SyncTick};

/// Engine fake recording the order of calls made against it
pub(crate) struct RecordingEngine {
    calls: Arc<Mutex<Vec<String>>>,
    live: Arc<AtomicUsize>,
}

#[async_trait]
impl PlaybackEngine for RecordingEngine {
    async fn play(&self) -> Result<()> {
        self.calls.lock().unwrap().push("play".to_string());
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.calls.lock().unwrap().push("pause".to_string());
        Ok(())
    }

    async fn seek(&self, position: f64) -> Result<()> {
        self.calls.lock().unwrap().push(format!("seek:{position}"));
        Ok(())
    }

    async fn position(&self) -> f64 {
        0.0
    }

    async fn shutdown(&self) {
        self.calls.lock().unwrap().push("shutdown".to_string());
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Factory fake handing out recording engines and keeping the event
/// senders so tests can emit engine notifications
#[derive(Default)]
pub(crate) struct RecordingFactory {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub live: Arc<AtomicUsize>,
    pub sources: Mutex<Vec<SourceDescriptor>>,
    pub senders: Mutex<Vec<mpsc::Sender<EngineEvent>>>,
}

impl RecordingFactory {
    pub fn last_sender(&self) -> mpsc::Sender<EngineEvent> {
        self.senders.lock().unwrap().last().unwrap().clone()
    }
}

#[async_trait]
impl EngineFactory for RecordingFactory {
    async fn create(
        &self,
        source: &SourceDescriptor,
    ) -> Result<(Box<dyn PlaybackEngine>, EngineEvents)> {
        let (tx, rx) = mpsc::channel(64);
        self.senders.lock().unwrap().push(tx);
        self.sources.lock().unwrap().push(source.clone());
        self.calls.lock().unwrap().push("create".to_string());
        self.live.fetch_add(1, Ordering::SeqCst);

        let engine = RecordingEngine {
            calls: Arc::clone(&self.calls),
            live: Arc::clone(&self.live),
        };
        Ok((Box::new(engine), rx))
    }
}

/// Sink fake collecting delivered ticks, optionally failing every call
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub ticks: Mutex<Vec<SyncTick>>,
    pub fail: bool,
}

#[async_trait]
impl StateSink for RecordingSink {
    async fn push_state(&self, tick: &SyncTick) -> Result<()> {
        if self.fail {
            return Err(Error::SyncDelivery("connection refused".to_string()));
        }
        self.ticks.lock().unwrap().push(tick.clone());
        Ok(())
    }
}

pub(crate) fn asset_fixture() -> AssetDescriptor {
    AssetDescriptor {
        ext: ".mkv".to_string(),
        name: "movie.mkv".to_string(),
        key: "abc123".to_string(),
        size: 1024,
        playtime: 0,
        codecs: vec!["hevc".to_string(), "opus".to_string()],
        transcoded_codecs: vec!["avc1.64001e".to_string(), "mp4a.40.2".to_string()],
        hls_manifest: "/movie/hls-manifest.m3u8".to_string(),
        hls_transcoding_manifest: "/movie/hls-transcoding-manifest.m3u8".to_string(),
        hls_transmuxing_manifest: "/movie/hls-transmuxing-manifest.m3u8".to_string(),
    }
}

pub(crate) fn source_fixture(resume_at: u64) -> SourceDescriptor {
    let asset = asset_fixture();
    SourceDescriptor {
        url: Url::parse("http://x/movie/hls-manifest.m3u8?playableCodecs=avc1.64001e").unwrap(),
        mime_type: crate::resolve::HLS_MIME_TYPE.to_string(),
        resume_at,
        asset_name: asset.name,
    }
}

/// Let spawned reporter and pump tasks drain on the current-thread runtime.
pub(crate) async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
