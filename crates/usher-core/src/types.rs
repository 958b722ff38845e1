//! Core types for the Usher playback controller

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Opaque codec identifier (fourcc/profile tag, e.g. "avc1.64001f").
///
/// Equality is exact-string; the controller never interprets the tag.
pub type CodecId = String;

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry from the remote catalog (`GET /api/v1/files`)
///
/// Immutable once fetched; the controller only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    /// File extension
    #[serde(default)]
    pub ext: String,
    /// Display name, also the key under which playback state is stored
    pub name: String,
    /// Stable catalog key
    pub key: String,
    /// File size in bytes
    pub size: i64,
    /// Last known playtime in seconds; the service reports -1 for files
    /// that were never played
    pub playtime: i64,
    /// Device-native codec tags, in the server's preference order
    pub codecs: Vec<CodecId>,
    /// Codec tags the server can transcode to on demand
    pub transcoded_codecs: Vec<CodecId>,
    /// Primary adaptive manifest path, server-relative
    pub hls_manifest: String,
    /// Transcoding manifest path
    pub hls_transcoding_manifest: String,
    /// Transmuxed ("re-wrapped") fallback manifest path
    pub hls_transmuxing_manifest: String,
}

impl AssetDescriptor {
    /// Resume offset for a new session, clamped to zero for files the
    /// service has no recorded playtime for.
    pub fn resume_position(&self) -> u64 {
        self.playtime.max(0) as u64
    }
}

/// A fully resolved playback source
///
/// Constructed fresh per play request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Absolute manifest URL the engine loads
    pub url: Url,
    /// Container MIME type
    pub mime_type: String,
    /// Position in seconds to seek to once the engine is ready
    pub resume_at: u64,
    /// Catalog name of the asset this source was resolved from
    pub asset_name: String,
}

/// Which resolution path a play request takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayVariant {
    /// Negotiate codecs against the local runtime, then resolve the
    /// primary manifest
    Negotiated,
    /// Resolve the transmuxed fallback manifest unconditionally
    Transmuxed,
}

/// One state update pushed to the remote service (`POST /api/v1/state`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTick {
    /// Catalog name of the asset the position belongs to
    pub filename: String,
    /// Whole seconds of playback position
    pub playtime: u64,
}

/// Playback session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No engine instance exists
    Idle,
    /// Engine created and loading the source
    Loading,
    /// Content is playing
    Playing,
    /// Playback paused, position queries remain valid
    Paused,
    /// Engine released; terminal unless a fresh start follows
    TornDown,
    /// Fatal engine failure; only a fresh start recovers
    Error,
}

impl SessionState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            // From Idle
            (Idle, Loading) |
            // From Loading
            (Loading, Playing) | (Loading, TornDown) | (Loading, Error) |
            // From Playing
            (Playing, Paused) | (Playing, TornDown) | (Playing, Error) |
            // From Paused
            (Paused, Playing) | (Paused, TornDown) |
            // From TornDown
            (TornDown, Loading) |
            // From Error
            (Error, Loading) | (Error, TornDown)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Loading => write!(f, "loading"),
            SessionState::Playing => write!(f, "playing"),
            SessionState::Paused => write!(f, "paused"),
            SessionState::TornDown => write!(f, "torn down"),
            SessionState::Error => write!(f, "error"),
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Base address of the remote catalog+state service
    pub server_address: Url,
    /// Quantization interval for position sync, in seconds
    pub sync_interval_secs: u64,
    /// Request timeout for catalog and state calls in milliseconds
    pub request_timeout_ms: u64,
}

impl ControllerConfig {
    pub fn new(server_address: Url) -> Self {
        Self {
            server_address,
            sync_interval_secs: 5,
            request_timeout_ms: 10_000,
        }
    }
}
