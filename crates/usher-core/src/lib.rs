//! Usher Core - playback controller for adaptively-streamed media
//!
//! This crate decides which encoded variant the local playback engine can
//! decode, resolves it into a playable source, runs the playback-session
//! lifecycle around one engine instance, and reports playback progress to
//! the remote state service so a later session can resume where this one
//! left off:
//! - Codec negotiation against a runtime capability probe
//! - Source resolution (negotiated manifest or transmuxed fallback)
//! - Session lifecycle with explicit engine acquisition and release
//! - Quantized position sync, best effort by design
//!
//! The decode engine, the capability probe and the remote service are
//! external collaborators behind the [`PlaybackEngine`], [`CodecProbe`]
//! and [`StateSink`] seams; the crate ships HTTP implementations for the
//! remote service only.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────┐   ┌──────────────┐
//!  │    Codec     │   │    Source    │
//!  │  Negotiator  ├──▶│   Resolver   │
//!  └──────────────┘   └──────┬───────┘
//!                            │
//!                     ┌──────┴───────┐
//!                     │   Session    │
//!                     │  Supervisor  │
//!                     └──────┬───────┘
//!                            │
//!  ┌──────────────┐   ┌──────┴───────┐
//!  │  Sync        │◀──┤   Playback   │
//!  │  Reporter    │   │   Session    │
//!  └──────────────┘   └──────────────┘
//! ```

pub mod catalog;
pub mod codec;
pub mod error;
pub mod resolve;
pub mod session;
pub mod supervisor;
pub mod sync;
pub mod types;

#[cfg(test)]
mod testutil;

pub use catalog::CatalogClient;
pub use codec::{negotiate, CodecProbe};
pub use error::{Error, Result};
pub use resolve::{SourceResolver, HLS_MIME_TYPE};
pub use session::{EngineEvent, EngineEvents, EngineFactory, PlaybackEngine, PlaybackSession};
pub use supervisor::SessionSupervisor;
pub use sync::{HttpStateSink, QuantizationFilter, StateSink, SyncReporter};
pub use types::*;
