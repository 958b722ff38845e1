//! Command implementations

use anyhow::{bail, Context};
use tabled::{Table, Tabled};
use url::Url;

use usher_core::{
    negotiate, AssetDescriptor, CatalogClient, ControllerConfig, SourceResolver,
};

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Playtime")]
    playtime: String,
    #[tabled(rename = "Codecs")]
    codecs: String,
    #[tabled(rename = "Transcoded")]
    transcoded: String,
}

impl From<&AssetDescriptor> for FileRow {
    fn from(asset: &AssetDescriptor) -> Self {
        let playtime = if asset.playtime < 0 {
            "-".to_string()
        } else {
            format!("{}s", asset.playtime)
        };
        Self {
            name: asset.name.clone(),
            playtime,
            codecs: asset.codecs.join(", "),
            transcoded: asset.transcoded_codecs.join(", "),
        }
    }
}

/// Fetch the catalog and print it as a table.
pub async fn list(server: Url) -> anyhow::Result<()> {
    let config = ControllerConfig::new(server);
    let catalog = CatalogClient::new(&config)?;
    let files = catalog.list_files().await.context("fetching catalog")?;

    let rows: Vec<FileRow> = files.iter().map(FileRow::from).collect();
    println!("Found {} files.", files.len());
    println!("{}", Table::new(rows));

    Ok(())
}

/// Run negotiation and resolution for one asset and print the source the
/// playback engine would load.
pub async fn resolve(
    server: Url,
    name: String,
    decodable: Vec<String>,
    transmuxed: bool,
) -> anyhow::Result<()> {
    let config = ControllerConfig::new(server);
    let catalog = CatalogClient::new(&config)?;
    let files = catalog.list_files().await.context("fetching catalog")?;

    let Some(asset) = files.iter().find(|f| f.name == name) else {
        bail!("no catalog entry named {name:?}");
    };

    let resolver = SourceResolver::new(config.server_address.clone());
    let source = if transmuxed {
        resolver.resolve_transmuxed(asset)?
    } else {
        let probe = move |codec: &str| decodable.iter().any(|c| c == codec);
        let playable = negotiate(&probe, &asset.codecs, &asset.transcoded_codecs);
        if playable.is_empty() {
            bail!(
                "no playable codec for {name:?}; retry with --transmuxed or \
                 widen --decodable"
            );
        }
        resolver.resolve(asset, &playable)?
    };

    println!("url:       {}", source.url);
    println!("mime type: {}", source.mime_type);
    println!("resume at: {}s", source.resume_at);

    Ok(())
}
