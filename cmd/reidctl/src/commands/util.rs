//! Shared helpers for CLI commands.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use strayid_blob::FsBlobStore;
use strayid_embed::HttpEmbedder;
use strayid_kv::RedbStore;
use strayid_reid::{Config, Profile, ReidService};

use crate::Cli;

/// Opens the service over redb + filesystem blobs + the HTTP embedder.
pub fn open_service(cli: &Cli) -> anyhow::Result<ReidService> {
    let data = Path::new(&cli.data);
    std::fs::create_dir_all(data)?;
    let store = Arc::new(RedbStore::open(data.join("reid.redb"))?);
    let blobs = Arc::new(FsBlobStore::open(data.join("photos"))?);
    let embedder = Arc::new(HttpEmbedder::new(&cli.embed_url)?);
    Ok(ReidService::new(store, blobs, embedder, Config::default()))
}

/// Reads a photo file into memory.
pub fn read_photo(path: &str) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| anyhow::anyhow!("reading {path}: {e}"))
}

/// Parses one of the string-keyed enums (species, angle, status).
pub fn parse_enum<T>(s: &str) -> anyhow::Result<T>
where
    T: FromStr<Err = String>,
{
    s.parse().map_err(anyhow::Error::msg)
}

/// Prints a serializable value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line human summary of a profile.
pub fn profile_line(p: &Profile) -> String {
    let bio = if p.biometrics.has_embedding {
        "embedded"
    } else {
        "no-embedding"
    };
    format!(
        "#{:05}  {}  {}  {}  photos={}  {}",
        p.number, p.id, p.name, p.attrs.species, p.photo_count, bio
    )
}
