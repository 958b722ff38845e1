//! Codec negotiation
//!
//! Filters an asset's advertised codec variants down to the ordered subset
//! the local runtime can actually decode. Native variants are tried before
//! transcoded fallbacks.

use tracing::debug;

use crate::types::CodecId;

/// Capability probe for the local decode runtime.
///
/// `can_decode` must be synchronous and free of observable side effects;
/// negotiation queries it once per candidate codec.
pub trait CodecProbe: Send + Sync {
    /// Whether the runtime can probably decode the given codec tag.
    fn can_decode(&self, codec: &str) -> bool;
}

impl<F> CodecProbe for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn can_decode(&self, codec: &str) -> bool {
        self(codec)
    }
}

/// Select the codec variants the runtime can play.
///
/// Concatenates native then transcoded candidates, preserving each list's
/// order, and keeps those the probe accepts. A stable filter: given the
/// same probe behavior, output order is a strict function of input order.
/// An empty result is a valid terminal outcome ("no compatible variant"),
/// not an error.
pub fn negotiate(
    probe: &dyn CodecProbe,
    native: &[CodecId],
    transcoded: &[CodecId],
) -> Vec<CodecId> {
    let playable: Vec<CodecId> = native
        .iter()
        .chain(transcoded.iter())
        .filter(|codec| probe.can_decode(codec))
        .cloned()
        .collect();

    debug!(
        candidates = native.len() + transcoded.len(),
        playable = playable.len(),
        "codec negotiation finished"
    );

    playable
}
