//! Source resolution
//!
//! Turns an asset descriptor plus a negotiated codec list into the absolute
//! manifest URL the playback engine loads. The negotiated path advertises
//! the playable codecs to the server as repeated query parameters; the
//! transmuxed path resolves the fallback manifest unmodified.

use url::Url;

use crate::{
    error::{Error, Result},
    types::{AssetDescriptor, CodecId, SourceDescriptor},
};

/// Container type of every resolved source: HLS playlist
pub const HLS_MIME_TYPE: &str = "application/x-mpegURL";

/// Resolves playback sources against one configured server address
#[derive(Debug, Clone)]
pub struct SourceResolver {
    server_address: Url,
}

impl SourceResolver {
    pub fn new(server_address: Url) -> Self {
        Self { server_address }
    }

    /// Resolve the negotiated source for an asset.
    ///
    /// Appends one `playableCodecs=<codec>` pair per negotiated codec,
    /// percent-encoded and order preserved. Fails with `NoPlayableCodec`
    /// when the negotiated list is empty; no URL is constructed in that
    /// case and the caller must surface the failure instead of attempting
    /// playback.
    pub fn resolve(
        &self,
        asset: &AssetDescriptor,
        playable_codecs: &[CodecId],
    ) -> Result<SourceDescriptor> {
        if playable_codecs.is_empty() {
            return Err(Error::NoPlayableCodec);
        }

        let mut url = self.manifest_url(&asset.hls_manifest)?;
        {
            let mut pairs = url.query_pairs_mut();
            for codec in playable_codecs {
                pairs.append_pair("playableCodecs", codec);
            }
        }

        Ok(SourceDescriptor {
            url,
            mime_type: HLS_MIME_TYPE.to_string(),
            resume_at: asset.resume_position(),
            asset_name: asset.name.clone(),
        })
    }

    /// Resolve the transmuxed fallback source.
    ///
    /// Bypasses codec negotiation entirely; the server re-wraps the media
    /// into an always-supported container, so this cannot fail for lack of
    /// codec support.
    pub fn resolve_transmuxed(&self, asset: &AssetDescriptor) -> Result<SourceDescriptor> {
        let url = self.manifest_url(&asset.hls_transmuxing_manifest)?;

        Ok(SourceDescriptor {
            url,
            mime_type: HLS_MIME_TYPE.to_string(),
            resume_at: asset.resume_position(),
            asset_name: asset.name.clone(),
        })
    }

    // The server address and the server-relative manifest path are joined
    // textually, not via Url::join: a trailing slash on the configured
    // address is part of the address and survives into the path.
    fn manifest_url(&self, manifest_path: &str) -> Result<Url> {
        let joined = format!("{}{}", self.server_address, manifest_path);
        Url::parse(&joined).map_err(Error::from)
    }
}
