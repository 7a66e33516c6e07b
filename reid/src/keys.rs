//! Key layout for the document store.
//!
//! Creation-time ordering is baked into index keys: the timestamp is
//! inverted (`i64::MAX - micros`) and zero-padded so an ascending key scan
//! walks records newest-first. The record id is appended as the secondary
//! sort key, which makes ordering total when timestamps collide.

/// Counter key for profile sequence numbers.
pub const SEQ_PROFILE: &str = "seq:profile";

/// Build the document key for a profile.
pub fn profile_key(id: &str) -> String {
    format!("profile:{id}")
}

/// Build the creation-time index key for a profile.
pub fn profile_ts_key(created_micros: i64, id: &str) -> String {
    format!("profile_ts:{:019}:{id}", rev_ts(created_micros))
}

/// Prefix for scanning the profile creation-time index.
pub fn profile_ts_prefix() -> &'static str {
    "profile_ts:"
}

/// Marker key for the embedded-profile index (the `has_embedding` filter
/// enforced at the query layer).
pub fn profile_emb_key(id: &str) -> String {
    format!("profile_emb:{id}")
}

pub fn profile_emb_prefix() -> &'static str {
    "profile_emb:"
}

/// Build the document key for one profile photo's metadata.
pub fn photo_key(profile_id: &str, photo_id: &str) -> String {
    format!("photo:{profile_id}:{photo_id}")
}

/// Prefix for scanning all photo metadata of one profile.
pub fn photo_prefix(profile_id: &str) -> String {
    format!("photo:{profile_id}:")
}

/// Build the document key for a sighting.
pub fn sighting_key(id: &str) -> String {
    format!("sighting:{id}")
}

/// Build the creation-time index key for a sighting.
pub fn sighting_ts_key(created_micros: i64, id: &str) -> String {
    format!("sighting_ts:{:019}:{id}", rev_ts(created_micros))
}

pub fn sighting_ts_prefix() -> &'static str {
    "sighting_ts:"
}

/// Marker key for the embedded-sighting index (the candidate population
/// for search-time matching).
pub fn sighting_emb_key(id: &str) -> String {
    format!("sighting_emb:{id}")
}

pub fn sighting_emb_prefix() -> &'static str {
    "sighting_emb:"
}

/// Build the document key for a match result (keyed 1:1 by sighting id).
pub fn match_key(sighting_id: &str) -> String {
    format!("match:{sighting_id}")
}

fn rev_ts(micros: i64) -> i64 {
    i64::MAX - micros.max(0)
}
